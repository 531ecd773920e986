//! Outbound command channel.

use crate::commands::Command;

/// Fire-and-forget command channel to the device.
///
/// Implementations enqueue and return; they never report delivery. A command
/// lost on the way is only noticed through the event feed, or not at all.
pub trait CommandSender {
    /// Enqueue a command.
    fn send(&mut self, command: Command);
}

/// Records commands, handy for tests and dry runs.
impl CommandSender for Vec<Command> {
    fn send(&mut self, command: Command) {
        self.push(command);
    }
}

/// Forwards commands to a transport thread. A disconnected receiver drops the
/// command, as a dead link would.
impl CommandSender for crossbeam_channel::Sender<Command> {
    fn send(&mut self, command: Command) {
        if let Err(err) = crossbeam_channel::Sender::send(self, command) {
            log::debug!("dropping command {}: receiver gone", err.into_inner());
        }
    }
}

/// Any `FnMut(Command)` closure is a sender.
impl<F: FnMut(Command)> CommandSender for F {
    fn send(&mut self, command: Command) {
        self(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sender_forwards() {
        let (mut tx, rx) = crossbeam_channel::unbounded::<Command>();
        CommandSender::send(&mut tx, Command::TriggerCalibration);
        assert_eq!(rx.try_recv().ok(), Some(Command::TriggerCalibration));
    }

    #[test]
    fn test_channel_sender_tolerates_closed_receiver() {
        let (mut tx, rx) = crossbeam_channel::unbounded::<Command>();
        drop(rx);
        CommandSender::send(&mut tx, Command::UpdateAuthorizedChannels);
    }

    #[test]
    fn test_closure_sender() {
        let mut seen = Vec::new();
        {
            let mut sender = |command: Command| seen.push(command.name());
            CommandSender::send(&mut sender, Command::TriggerCalibration);
        }
        assert_eq!(seen, vec!["trigger_calibration"]);

        let mut boxed: Box<dyn CommandSender> = Box::new(Vec::<Command>::new());
        boxed.send(Command::UpdateAuthorizedChannels);
    }
}
