//! Common interface of peripheral controllers.

use crate::component::{Component, ComponentId};
use crate::host::PeripheralContext;
use crate::notifier::{ChangeNotifier, FlushAction};
use setsync_protocol::Event;

/// Mirrors one device feature and publishes it as a [`Component`].
///
/// The device controller drives every peripheral through the same cycle:
/// a connectivity change or a decoded event is handled, then
/// [`flush`](PeripheralController::flush) turns the changes recorded during
/// the callback into at most one registry notification.
pub trait PeripheralController {
    /// Which component this controller publishes.
    fn id(&self) -> ComponentId;

    /// Current snapshot.
    fn snapshot(&self) -> Component;

    /// Change tracking for the current callback.
    fn notifier(&mut self) -> &mut ChangeNotifier;

    /// The device link came up.
    fn on_connected(&mut self, ctx: &mut PeripheralContext<'_>);

    /// The device link went away.
    fn on_disconnected(&mut self, ctx: &mut PeripheralContext<'_>);

    /// Handle a decoded event. Returns whether the event was meant for this
    /// peripheral.
    fn on_event(&mut self, ctx: &mut PeripheralContext<'_>, event: &Event) -> bool;

    /// Report the changes of the current callback to the registry.
    fn flush(&mut self, ctx: &mut PeripheralContext<'_>) {
        let Some(action) = self.notifier().take_action(ctx.components) else {
            return;
        };
        match action {
            FlushAction::Publish => ctx.components.publish(self.snapshot()),
            FlushAction::Update => ctx.components.update(self.snapshot()),
            FlushAction::Unpublish => {
                ctx.components.unpublish(self.id());
            }
        }
    }
}
