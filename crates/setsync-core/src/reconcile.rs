//! Reconciliation at link transitions.
//!
//! Nothing here is timer driven: a pending request is only resolved by a
//! matching report, or by the link going away.

use crate::enumeration::{BitfieldEnumSetting, EnumSetting, SettingEnum};
use crate::list::IncrementalListAssembler;
use crate::ranged::RangedSetting;
use crate::setting::ValueSetting;
use std::fmt::Debug;
use tracing::{debug, trace};

// ============================================================================
// Reconcile Trait
// ============================================================================

/// Anything that must react when the device link comes up or goes away.
pub trait Reconcile {
    /// The link came up; local values win the first report.
    fn on_connect(&mut self);

    /// The link came up; device reports are adopted as they come.
    fn on_connect_adopting(&mut self);

    /// The link went away. Returns whether anything observable changed.
    fn on_disconnect(&mut self) -> bool;
}

impl<T: Clone + PartialEq + Debug> Reconcile for ValueSetting<T> {
    fn on_connect(&mut self) {
        ValueSetting::on_connect(self);
    }

    fn on_connect_adopting(&mut self) {
        ValueSetting::on_connect_adopting(self);
    }

    fn on_disconnect(&mut self) -> bool {
        ValueSetting::on_disconnect(self)
    }
}

impl<T: PartialOrd + Copy + Debug> Reconcile for RangedSetting<T> {
    fn on_connect(&mut self) {
        RangedSetting::on_connect(self);
    }

    fn on_connect_adopting(&mut self) {
        RangedSetting::on_connect_adopting(self);
    }

    fn on_disconnect(&mut self) -> bool {
        RangedSetting::on_disconnect(self)
    }
}

impl<E: SettingEnum> Reconcile for EnumSetting<E> {
    fn on_connect(&mut self) {
        EnumSetting::on_connect(self);
    }

    fn on_connect_adopting(&mut self) {
        EnumSetting::on_connect_adopting(self);
    }

    fn on_disconnect(&mut self) -> bool {
        EnumSetting::on_disconnect(self)
    }
}

impl<E: SettingEnum> Reconcile for BitfieldEnumSetting<E> {
    fn on_connect(&mut self) {
        self.as_enum_mut().on_connect();
    }

    fn on_connect_adopting(&mut self) {
        self.as_enum_mut().on_connect_adopting();
    }

    fn on_disconnect(&mut self) -> bool {
        self.as_enum_mut().on_disconnect()
    }
}

impl<T: Clone + PartialEq + Debug, K: PartialEq> Reconcile for IncrementalListAssembler<T, K> {
    fn on_connect(&mut self) {}

    fn on_connect_adopting(&mut self) {}

    fn on_disconnect(&mut self) -> bool {
        IncrementalListAssembler::on_disconnect(self)
    }
}

// ============================================================================
// Policy
// ============================================================================

/// How long a component outlives its device connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentLifetime {
    /// Unpublished as soon as the device disconnects.
    Transient,
    /// Kept published while disconnected, backed by persisted values.
    Durable,
}

/// What the owning controller does after converging its settings on
/// disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisconnectAction {
    /// Remove the component.
    Unpublish,
    /// Persist confirmed values and keep the component published.
    PersistAndKeep,
}

/// Connect/disconnect rules for the settings of one peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationPolicy {
    lifetime: ComponentLifetime,
}

impl ReconciliationPolicy {
    /// Create a policy for a component with the given lifetime.
    pub const fn new(lifetime: ComponentLifetime) -> Self {
        ReconciliationPolicy { lifetime }
    }

    /// The component lifetime.
    pub fn lifetime(&self) -> ComponentLifetime {
        self.lifetime
    }

    /// Bring every item online.
    ///
    /// A durable component holding local values (persisted presets, or a
    /// previous session) resyncs with local priority on the first report.
    /// Anything else adopts what the device reports.
    pub fn connect(&self, items: &mut [&mut dyn Reconcile], has_local_values: bool) {
        let local_priority = self.lifetime == ComponentLifetime::Durable && has_local_values;
        trace!(local_priority, "settings resyncing");
        for item in items.iter_mut() {
            if local_priority {
                item.on_connect();
            } else {
                item.on_connect_adopting();
            }
        }
    }

    /// Whether the component may be published now that the device is
    /// connected. Publication waits for the minimum capability set.
    pub fn should_publish_on_connect(&self, capabilities_reported: bool) -> bool {
        capabilities_reported
    }

    /// Whether the component may be published while no device is connected.
    pub fn should_publish_offline(&self, has_persisted_data: bool) -> bool {
        self.lifetime == ComponentLifetime::Durable && has_persisted_data
    }

    /// Converge every item to local ground truth and decide what to do with
    /// the component.
    ///
    /// Returns whether anything observable changed, plus the action.
    pub fn disconnect(
        &self,
        items: &mut [&mut dyn Reconcile],
        has_persisted_data: bool,
    ) -> (bool, DisconnectAction) {
        let mut changed = false;
        for item in items.iter_mut() {
            changed |= item.on_disconnect();
        }
        let action = if self.should_publish_offline(has_persisted_data) {
            DisconnectAction::PersistAndKeep
        } else {
            DisconnectAction::Unpublish
        };
        debug!(?action, changed, "settings converged on disconnect");
        (changed, action)
    }
}
