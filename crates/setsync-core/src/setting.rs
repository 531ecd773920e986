//! Optimistic value setting.
//!
//! A [`ValueSetting`] holds the value last known to be in effect on the device
//! (`confirmed`) and, while the user waits for the device to catch up, the value
//! the user asked for (`requested`). Observers always see the requested value
//! while one is pending.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::trace;

// ============================================================================
// State Types
// ============================================================================

/// Confirmation state of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    /// The exposed value is the confirmed one.
    UpToDate,
    /// A user request is waiting for the device to report it back.
    Updating,
}

impl std::fmt::Display for UpdateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateState::UpToDate => write!(f, "up-to-date"),
            UpdateState::Updating => write!(f, "updating"),
        }
    }
}

/// Link state as seen by a single setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    /// No device; edits apply directly to the confirmed value.
    Offline,
    /// Connected, waiting for the first report since the connection came up.
    Resyncing,
    /// Connected and resynchronized.
    Online,
}

impl LinkState {
    /// Whether a device is there to receive commands.
    pub fn is_connected(&self) -> bool {
        !matches!(self, LinkState::Offline)
    }
}

// ============================================================================
// Value Setting
// ============================================================================

/// A single remote-controlled value with optimistic local updates.
///
/// All operations are synchronous state transitions. Commands are handed to a
/// `send` closure supplied by the caller, which is expected to encode and
/// enqueue them without waiting for an acknowledgement.
#[derive(Debug, Clone)]
pub struct ValueSetting<T> {
    confirmed: T,
    requested: Option<T>,
    link: LinkState,
}

impl<T: Clone + PartialEq + Debug> ValueSetting<T> {
    /// Create an offline setting whose confirmed value is `initial`.
    pub fn new(initial: T) -> Self {
        ValueSetting {
            confirmed: initial,
            requested: None,
            link: LinkState::Offline,
        }
    }

    /// The value exposed to observers: the pending request if any, otherwise
    /// the confirmed value.
    pub fn value(&self) -> &T {
        self.requested.as_ref().unwrap_or(&self.confirmed)
    }

    /// The value last known to be in effect.
    pub fn confirmed(&self) -> &T {
        &self.confirmed
    }

    /// The outstanding user request, if any.
    pub fn requested(&self) -> Option<&T> {
        self.requested.as_ref()
    }

    /// Current confirmation state.
    pub fn state(&self) -> UpdateState {
        if self.requested.is_some() {
            UpdateState::Updating
        } else {
            UpdateState::UpToDate
        }
    }

    /// Whether a request is outstanding.
    pub fn is_updating(&self) -> bool {
        self.requested.is_some()
    }

    /// Current link state.
    pub fn link(&self) -> LinkState {
        self.link
    }

    /// Request a new value.
    ///
    /// Returns `false` and does nothing if `value` already is the exposed value.
    /// While connected the value becomes the pending request and `send` is
    /// invoked with it; a request already pending is replaced, not queued.
    /// While offline the value is adopted as confirmed right away and nothing
    /// is sent.
    pub fn set_value<S>(&mut self, value: T, send: S) -> bool
    where
        S: FnOnce(&T),
    {
        if *self.value() == value {
            return false;
        }
        if self.link.is_connected() {
            trace!(?value, confirmed = ?self.confirmed, "setting request");
            send(&value);
            self.requested = Some(value);
        } else {
            trace!(?value, "offline setting edit");
            self.confirmed = value;
            self.requested = None;
        }
        true
    }

    /// Process a value reported by the device.
    ///
    /// The report always becomes the confirmed value. A pending request equal
    /// to the report is satisfied; a different pending request stays
    /// outstanding and is not re-sent.
    ///
    /// Returns whether the exposed value or the state changed.
    pub fn on_remote_value_reported(&mut self, value: T) -> bool {
        let before_value = self.value().clone();
        let before_state = self.state();

        if self.requested.as_ref() == Some(&value) {
            self.requested = None;
        } else if let Some(requested) = &self.requested {
            trace!(?value, ?requested, "report does not match pending request");
        }
        self.confirmed = value;
        if self.link == LinkState::Resyncing {
            self.link = LinkState::Online;
        }

        *self.value() != before_value || self.state() != before_state
    }

    /// The link came up; the next report is a resynchronization point.
    pub fn on_connect(&mut self) {
        self.link = LinkState::Resyncing;
    }

    /// The link came up and the device holds the only meaningful value:
    /// reports are adopted as they come, nothing is pushed back.
    pub fn on_connect_adopting(&mut self) {
        self.link = LinkState::Online;
    }

    /// The link went away.
    ///
    /// A pending request is promoted to confirmed since no acknowledgement can
    /// arrive anymore. Returns whether the state changed.
    pub fn on_disconnect(&mut self) -> bool {
        self.link = LinkState::Offline;
        match self.requested.take() {
            Some(requested) => {
                trace!(?requested, "promoting pending request on disconnect");
                self.confirmed = requested;
                true
            }
            None => false,
        }
    }

    /// Resynchronize against the value a freshly connected device reports.
    ///
    /// The local value wins: when it differs from `device_value` it is pushed
    /// to the device through `send` and becomes the pending request.
    ///
    /// Returns whether the state changed.
    pub fn on_reconnect<S>(&mut self, device_value: T, send: S) -> bool
    where
        S: FnOnce(&T),
    {
        self.link = LinkState::Online;
        let local = self.value().clone();
        let before_state = self.state();
        if local == device_value {
            self.confirmed = device_value;
            self.requested = None;
        } else {
            trace!(?local, device = ?device_value, "re-asserting local value");
            send(&local);
            self.confirmed = device_value;
            self.requested = Some(local);
        }
        self.state() != before_state
    }

    /// Route a device report: the first report after [`on_connect`] is handled
    /// by [`on_reconnect`], later ones by [`on_remote_value_reported`].
    ///
    /// [`on_connect`]: ValueSetting::on_connect
    /// [`on_reconnect`]: ValueSetting::on_reconnect
    /// [`on_remote_value_reported`]: ValueSetting::on_remote_value_reported
    pub fn apply_report<S>(&mut self, value: T, send: S) -> bool
    where
        S: FnOnce(&T),
    {
        match self.link {
            LinkState::Resyncing if self.requested.is_none() => self.on_reconnect(value, send),
            _ => self.on_remote_value_reported(value),
        }
    }

    /// Load a persisted value. Only effective while offline.
    pub fn restore(&mut self, value: T) -> bool {
        if self.link.is_connected() || self.confirmed == value {
            return false;
        }
        self.confirmed = value;
        self.requested = None;
        true
    }
}

impl<T: Default + Clone + PartialEq + Debug> Default for ValueSetting<T> {
    fn default() -> Self {
        ValueSetting::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn online(initial: u32) -> ValueSetting<u32> {
        let mut setting = ValueSetting::new(initial);
        setting.on_reconnect(initial, |_| panic!("nothing to push"));
        setting
    }

    #[test]
    fn test_duplicate_request_sends_once() {
        let mut sent = Vec::new();
        let mut setting = online(1);

        assert!(setting.set_value(2, |v| sent.push(*v)));
        assert!(!setting.set_value(2, |v| sent.push(*v)));
        assert_eq!(sent, vec![2]);
    }

    #[test]
    fn test_request_is_visible_immediately() {
        let mut setting = online(1);
        setting.set_value(5, |_| {});

        assert_eq!(*setting.value(), 5);
        assert_eq!(*setting.confirmed(), 1);
        assert_eq!(setting.requested(), Some(&5));
        assert_eq!(setting.state(), UpdateState::Updating);
    }

    #[test]
    fn test_matching_report_converges() {
        let mut setting = online(1);
        setting.set_value(5, |_| {});

        assert!(setting.on_remote_value_reported(5));
        assert_eq!(setting.state(), UpdateState::UpToDate);
        assert_eq!(*setting.value(), 5);
        assert_eq!(*setting.confirmed(), 5);
    }

    #[test]
    fn test_contradicting_report_keeps_request() {
        let mut setting = online(1);
        setting.set_value(5, |_| {});

        assert!(!setting.on_remote_value_reported(3));
        assert_eq!(*setting.confirmed(), 3);
        assert_eq!(*setting.value(), 5);
        assert!(setting.is_updating());
    }

    #[test]
    fn test_new_request_replaces_pending_one() {
        let mut sent = Vec::new();
        let mut setting = online(1);
        setting.set_value(5, |v| sent.push(*v));
        setting.set_value(1, |v| sent.push(*v));

        assert_eq!(sent, vec![5, 1]);
        assert_eq!(setting.requested(), Some(&1));
        assert!(setting.on_remote_value_reported(1));
        assert!(!setting.is_updating());
    }

    #[test]
    fn test_disconnect_promotes_request() {
        let mut setting = online(1);
        setting.set_value(5, |_| {});

        assert!(setting.on_disconnect());
        assert_eq!(*setting.value(), 5);
        assert_eq!(*setting.confirmed(), 5);
        assert_eq!(setting.state(), UpdateState::UpToDate);
        assert_eq!(setting.link(), LinkState::Offline);
    }

    #[test]
    fn test_offline_edit_applies_without_sending() {
        let mut setting = ValueSetting::new(1u32);

        assert!(setting.set_value(7, |_| panic!("offline edits are not sent")));
        assert_eq!(*setting.confirmed(), 7);
        assert_eq!(setting.state(), UpdateState::UpToDate);
    }

    #[test]
    fn test_reconnect_pushes_local_value() {
        let mut sent = Vec::new();
        let mut setting = ValueSetting::new(1u32);
        setting.set_value(7, |_| {});

        assert!(setting.on_reconnect(3, |v| sent.push(*v)));
        assert_eq!(sent, vec![7]);
        assert_eq!(*setting.value(), 7);
        assert_eq!(*setting.confirmed(), 3);
        assert_eq!(setting.state(), UpdateState::Updating);
    }

    #[test]
    fn test_reconnect_with_matching_value_is_quiet() {
        let mut setting = ValueSetting::new(4u32);

        assert!(!setting.on_reconnect(4, |_| panic!("values match")));
        assert_eq!(setting.state(), UpdateState::UpToDate);
        assert_eq!(setting.link(), LinkState::Online);
    }

    #[test]
    fn test_apply_report_resyncs_once() {
        let mut sent = Vec::new();
        let mut setting = ValueSetting::new(2u32);
        setting.on_connect();

        setting.apply_report(9, |v| sent.push(*v));
        assert_eq!(sent, vec![2]);
        assert_eq!(setting.link(), LinkState::Online);

        // a later contradicting report no longer triggers a push
        setting.apply_report(8, |v| sent.push(*v));
        assert_eq!(sent, vec![2]);
        assert_eq!(*setting.value(), 2);
    }

    #[test]
    fn test_request_during_resync_is_sent() {
        let mut sent = Vec::new();
        let mut setting = ValueSetting::new(2u32);
        setting.on_connect();

        setting.set_value(6, |v| sent.push(*v));
        setting.apply_report(6, |v| sent.push(*v));

        assert_eq!(sent, vec![6]);
        assert_eq!(setting.state(), UpdateState::UpToDate);
        assert_eq!(setting.link(), LinkState::Online);
    }

    #[test]
    fn test_restore_only_offline() {
        let mut setting = ValueSetting::new(0u32);
        assert!(setting.restore(3));
        assert_eq!(*setting.value(), 3);

        setting.on_connect();
        assert!(!setting.restore(4));
        assert_eq!(*setting.value(), 3);
    }

    #[test]
    fn test_adopting_connect_takes_device_value() {
        let mut setting = ValueSetting::new(String::from("stale"));
        setting.on_connect_adopting();
        assert!(setting.apply_report("device".to_string(), |_| panic!("nothing to push")));
        assert_eq!(setting.value(), "device");
        assert_eq!(setting.state(), UpdateState::UpToDate);
        assert_eq!(setting.link(), LinkState::Online);
    }
}
