use crate::{
    error::ClientError,
    types::{ClientCommand, ClientEvent, ClientLifecycleState},
};

#[derive(Debug, Clone)]
pub struct ClientStateMachine {
    state: ClientLifecycleState,
    has_session: bool,
}

impl Default for ClientStateMachine {
    fn default() -> Self {
        Self {
            state: ClientLifecycleState::Cold,
            has_session: false,
        }
    }
}

impl ClientStateMachine {
    pub fn state(&self) -> ClientLifecycleState {
        self.state
    }

    pub fn apply(&mut self, command: &ClientCommand) -> Result<Vec<ClientEvent>, ClientError> {
        use ClientCommand::*;

        match command {
            Join { .. } => self.transition_from_any_of(
                &[ClientLifecycleState::Cold, ClientLifecycleState::Joined],
                ClientLifecycleState::Joining,
                "join",
            ),
            RefreshChats | OpenChat { .. } | NewChat | DeleteChat { .. } => {
                if self.state == ClientLifecycleState::Joined {
                    Ok(Vec::new())
                } else {
                    Err(ClientError::invalid_state(self.state, "session command"))
                }
            }
            // Send without a session is reported as "no chat selected" by the runtime.
            SendMessage { .. } | AttachImage { .. } | ClearImage | SetVisibility { .. } => {
                Ok(Vec::new())
            }
        }
    }

    /// Resolve a pending join. A failed re-join falls back to the previous session.
    pub fn on_join_result(&mut self, success: bool) -> Result<ClientEvent, ClientError> {
        if self.state != ClientLifecycleState::Joining {
            return Err(ClientError::invalid_state(self.state, "on_join_result"));
        }

        if success {
            self.has_session = true;
        }
        let next = if self.has_session {
            ClientLifecycleState::Joined
        } else {
            ClientLifecycleState::Cold
        };

        self.state = next;
        Ok(ClientEvent::StateChanged { state: next })
    }

    fn transition_from_any_of(
        &mut self,
        expected: &[ClientLifecycleState],
        next: ClientLifecycleState,
        action: &str,
    ) -> Result<Vec<ClientEvent>, ClientError> {
        if !expected.contains(&self.state) {
            return Err(ClientError::invalid_state(self.state, action));
        }
        self.state = next;
        Ok(vec![ClientEvent::StateChanged { state: next }])
    }
}
