//! Per-peripheral change coalescing.

use crate::component::{ComponentId, ComponentStore};

/// What a peripheral must do with its component at the end of a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushAction {
    /// Publish a fresh snapshot.
    Publish,
    /// Replace the published snapshot.
    Update,
    /// Remove the component.
    Unpublish,
}

/// Collects every change made during one callback or user call so observers
/// get at most one notification for it.
///
/// Peripherals mark changes and publication wishes as they go, then drain
/// the notifier once at the end.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    id: ComponentId,
    wanted: bool,
    dirty: bool,
}

impl ChangeNotifier {
    /// Notifier for the component `id`, initially not wanting publication.
    pub fn new(id: ComponentId) -> Self {
        Self {
            id,
            wanted: false,
            dirty: false,
        }
    }

    /// The component this notifier is for.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// The component should be published.
    pub fn publish(&mut self) {
        self.wanted = true;
    }

    /// The component should go away.
    pub fn unpublish(&mut self) {
        self.wanted = false;
    }

    /// Whether the component should be published.
    pub fn wants_publication(&self) -> bool {
        self.wanted
    }

    /// Record a change if `changed`.
    pub fn changed(&mut self, changed: bool) {
        self.dirty |= changed;
    }

    /// Whether a change is waiting for the next flush.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Record a change.
    pub fn mark(&mut self) {
        self.dirty = true;
    }

    /// Drain pending changes and decide what to tell the registry.
    pub fn take_action(&mut self, components: &ComponentStore) -> Option<FlushAction> {
        let dirty = std::mem::take(&mut self.dirty);
        match (self.wanted, components.is_published(self.id)) {
            (true, false) => Some(FlushAction::Publish),
            (false, true) => Some(FlushAction::Unpublish),
            (true, true) if dirty => Some(FlushAction::Update),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_changes_coalesce() {
        let components = ComponentStore::new("dev");
        let mut notifier = ChangeNotifier::new(ComponentId::WifiScanner);
        notifier.mark();
        notifier.changed(true);
        // not published and not wanted: nothing to say
        assert_eq!(notifier.take_action(&components), None);

        notifier.publish();
        notifier.mark();
        assert_eq!(notifier.take_action(&components), Some(FlushAction::Publish));
    }

    #[test]
    fn test_clean_published_component_is_quiet() {
        let mut components = ComponentStore::new("dev");
        components.publish(crate::component::Component::WifiScanner(
            crate::wifi_scanner::WifiScannerState::default(),
        ));
        let mut notifier = ChangeNotifier::new(ComponentId::WifiScanner);
        notifier.publish();
        assert_eq!(notifier.take_action(&components), None);
        notifier.changed(true);
        assert_eq!(notifier.take_action(&components), Some(FlushAction::Update));
        assert_eq!(notifier.take_action(&components), None);
        notifier.unpublish();
        assert_eq!(notifier.take_action(&components), Some(FlushAction::Unpublish));
    }
}
