use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::types::{ClientCommand, ClientEvent};

/// Broadcast event stream type used by frontend subscribers.
pub type EventStream = broadcast::Receiver<ClientEvent>;

/// Errors returned by client channel operations.
#[derive(Debug, Error)]
pub enum ClientChannelError {
    /// The command receiver side is closed.
    #[error("command channel is closed")]
    CommandChannelClosed,
}

/// Command/event channel pair shared by the runtime and frontend bridges.
#[derive(Clone, Debug)]
pub struct ClientChannels {
    command_tx: mpsc::Sender<ClientCommand>,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl ClientChannels {
    /// Create a new channel set and return it with the command receiver.
    pub fn new(command_buffer: usize, event_buffer: usize) -> (Self, mpsc::Receiver<ClientCommand>) {
        let (command_tx, command_rx) = mpsc::channel(command_buffer.max(1));
        let (event_tx, _) = broadcast::channel(event_buffer.max(1));
        (
            Self {
                command_tx,
                event_tx,
            },
            command_rx,
        )
    }

    /// Subscribe to emitted client events.
    pub fn subscribe(&self) -> EventStream {
        self.event_tx.subscribe()
    }

    /// Send one command to the runtime.
    pub async fn send_command(&self, command: ClientCommand) -> Result<(), ClientChannelError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ClientChannelError::CommandChannelClosed)
    }

    /// Emit an event to all subscribers. Best-effort: with no subscriber the
    /// event is dropped.
    pub fn emit(&self, event: ClientEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Emit events in order.
    pub fn emit_all(&self, events: impl IntoIterator<Item = ClientEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClientLifecycleState;

    #[tokio::test]
    async fn delivers_commands_in_order() {
        let (channels, mut rx) = ClientChannels::new(8, 8);
        channels
            .send_command(ClientCommand::Join {
                passcode: "ABCD".into(),
            })
            .await
            .expect("command send should work");
        channels
            .send_command(ClientCommand::RefreshChats)
            .await
            .expect("command send should work");

        match rx.recv().await.expect("receiver should have a command") {
            ClientCommand::Join { passcode } => assert_eq!(passcode, "ABCD"),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(rx.recv().await, Some(ClientCommand::RefreshChats));
    }

    #[tokio::test]
    async fn fans_out_events_to_subscribers() {
        let (channels, _) = ClientChannels::new(4, 16);
        let mut a = channels.subscribe();
        let mut b = channels.subscribe();

        channels.emit(ClientEvent::StateChanged {
            state: ClientLifecycleState::Joining,
        });

        let event_a = a.recv().await.expect("subscriber a should receive event");
        let event_b = b.recv().await.expect("subscriber b should receive event");
        assert_eq!(event_a, event_b);
    }

    #[tokio::test]
    async fn emit_all_preserves_order() {
        let (channels, _) = ClientChannels::new(4, 16);
        let mut events = channels.subscribe();

        channels.emit_all([
            ClientEvent::SendControl { enabled: false },
            ClientEvent::ChatSelected { chat_id: Some(7) },
            ClientEvent::SendControl { enabled: true },
        ]);

        assert_eq!(
            events.recv().await.expect("first event"),
            ClientEvent::SendControl { enabled: false }
        );
        assert_eq!(
            events.recv().await.expect("second event"),
            ClientEvent::ChatSelected { chat_id: Some(7) }
        );
        assert_eq!(
            events.recv().await.expect("third event"),
            ClientEvent::SendControl { enabled: true }
        );
    }

    #[test]
    fn emit_without_subscribers_is_dropped() {
        let (channels, _) = ClientChannels::new(1, 1);
        channels.emit(ClientEvent::Alert {
            message: "nobody listening".into(),
        });
        let mut late = channels.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn reports_closed_command_channel() {
        let (channels, rx) = ClientChannels::new(1, 1);
        drop(rx);
        let err = channels
            .send_command(ClientCommand::NewChat)
            .await
            .expect_err("closed receiver should fail");
        assert!(matches!(err, ClientChannelError::CommandChannelClosed));
    }
}
