use std::sync::Arc;

use groupchat_core::{
    ChatId, ChatSummary, ClientChannelError, ClientChannels, ClientCommand, ClientError,
    ClientEvent, ClientStateMachine, ErrorCategory, EventStream, MessagePane, PaneItem, PaneOp,
    PendingImage, PollCursor, PollerKind, RuntimeConfig, SendMessageRequest, SendOutcome,
    SendRejection, SessionId, SessionInfo, normalization, normalize_send_outcome,
    types::{LOADING_INDICATOR_KEY, WELCOME_MESSAGE_KEY},
    unix_now, user_facing_message,
};
use tokio::{
    sync::{Mutex, mpsc},
    time,
};
use tracing::{debug, info, trace, warn};

use crate::{api::ChatApi, poller::Poller};

const COMMAND_BUFFER: usize = 128;
const EVENT_BUFFER: usize = 512;
const UNTITLED_CHAT: &str = "New Chat";

#[derive(Clone, Debug)]
pub struct ClientRuntimeHandle {
    channels: ClientChannels,
}

impl ClientRuntimeHandle {
    pub async fn send(&self, command: ClientCommand) -> Result<(), ClientChannelError> {
        self.channels.send_command(command).await
    }

    pub fn subscribe(&self) -> EventStream {
        self.channels.subscribe()
    }
}

/// Spawn the client controller on the current tokio runtime.
pub fn spawn_runtime(api: Arc<dyn ChatApi>, config: RuntimeConfig) -> ClientRuntimeHandle {
    let (channels, command_rx) = ClientChannels::new(COMMAND_BUFFER, EVENT_BUFFER);
    let runtime = ClientRuntime::new(api, config, channels.clone(), command_rx);
    tokio::spawn(async move {
        runtime.run().await;
    });

    ClientRuntimeHandle { channels }
}

/// Send awaiting its reply; doubles as the send lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlightSend {
    chat_id: ChatId,
    send_id: u64,
}

/// Everything the controller knows about the joined session.
#[derive(Debug)]
struct ClientState {
    session: Option<SessionInfo>,
    current_chat_id: Option<ChatId>,
    message_cursor: PollCursor,
    chat_cursor: PollCursor,
    pending_image: Option<PendingImage>,
    pane: MessagePane,
    send_in_flight: Option<InFlightSend>,
    next_send_id: u64,
    visible: bool,
}

impl ClientState {
    fn new(config: &RuntimeConfig) -> Self {
        Self {
            session: None,
            current_chat_id: None,
            message_cursor: PollCursor::default(),
            chat_cursor: PollCursor::default(),
            pending_image: None,
            pane: MessagePane::new(config.pane_max_items),
            send_in_flight: None,
            next_send_id: 0,
            visible: true,
        }
    }

    fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|session| session.session_id)
    }

    fn is_current(&self, chat_id: ChatId) -> bool {
        self.current_chat_id == Some(chat_id)
    }

    fn sending_in(&self, chat_id: ChatId) -> bool {
        self.send_in_flight.is_some_and(|send| send.chat_id == chat_id)
    }
}

/// State shared between the command loop, poller ticks and send tasks.
///
/// The state lock is only held across synchronous sections, never across a
/// request or a poller start/stop.
struct SharedClient {
    api: Arc<dyn ChatApi>,
    channels: ClientChannels,
    config: RuntimeConfig,
    state: Mutex<ClientState>,
    message_poller: Poller,
    chat_poller: Poller,
}

impl SharedClient {
    async fn require_session(&self) -> Result<SessionId, ClientError> {
        self.state.lock().await.session_id().ok_or_else(|| {
            ClientError::new(
                ErrorCategory::Config,
                "no_session",
                "no session is joined; send Join first",
            )
        })
    }

    fn apply_pane_ops(&self, state: &mut ClientState, chat_id: Option<ChatId>, ops: Vec<PaneOp>) {
        if ops.is_empty() {
            return;
        }
        if let Err(err) = state.pane.apply_ops(&ops) {
            warn!(?chat_id, error = %err, "pane ops did not apply cleanly");
        }
        self.channels.emit(ClientEvent::PaneDelta { chat_id, ops });
    }

    /// Drop the welcome placeholder once the chat gets real content.
    fn placeholder_removal(state: &ClientState) -> Option<PaneOp> {
        state
            .pane
            .contains_key(WELCOME_MESSAGE_KEY)
            .then(|| PaneOp::Remove {
                key: WELCOME_MESSAGE_KEY.to_owned(),
            })
    }

    async fn stop_pollers(&self) {
        self.message_poller.stop().await;
        self.chat_poller.stop().await;
    }

    /// (Re)start the pollers that apply to the current state.
    async fn start_pollers(self: &Arc<Self>) {
        let (visible, has_chat, has_session) = {
            let state = self.state.lock().await;
            (
                state.visible,
                state.current_chat_id.is_some(),
                state.session.is_some(),
            )
        };

        if !visible {
            debug!("client hidden; pollers stay stopped");
            return;
        }
        if has_chat {
            self.start_message_poller().await;
        }
        if has_session {
            self.start_chat_poller().await;
        }
    }

    /// Start only the pollers that apply and are not already running.
    async fn resume_pollers(self: &Arc<Self>) {
        let (has_chat, has_session) = {
            let state = self.state.lock().await;
            (state.current_chat_id.is_some(), state.session.is_some())
        };

        if has_chat && !self.message_poller.is_running().await {
            self.start_message_poller().await;
        }
        if has_session && !self.chat_poller.is_running().await {
            self.start_chat_poller().await;
        }
    }

    async fn start_message_poller(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.message_poller
            .start(self.config.message_poll_interval(), move || {
                let weak = weak.clone();
                async move {
                    if let Some(shared) = weak.upgrade() {
                        shared.poll_messages().await;
                    }
                }
            })
            .await;
    }

    async fn start_chat_poller(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.chat_poller
            .start(self.config.chat_poll_interval(), move || {
                let weak = weak.clone();
                async move {
                    if let Some(shared) = weak.upgrade() {
                        shared.poll_chats().await;
                    }
                }
            })
            .await;
    }

    /// Message poller tick.
    async fn poll_messages(&self) {
        let (chat_id, last_check) = {
            let state = self.state.lock().await;
            let Some(chat_id) = state.current_chat_id else {
                return;
            };
            if state.sending_in(chat_id) {
                trace!(chat_id, "send in flight; skipping message poll");
                return;
            }
            (chat_id, state.message_cursor.value())
        };

        let poll = match self.api.check_new_messages(chat_id, last_check).await {
            Ok(poll) => poll,
            Err(err) => {
                debug!(chat_id, error = %err, "message poll failed");
                return;
            }
        };

        let mut state = self.state.lock().await;
        if !state.is_current(chat_id) || state.sending_in(chat_id) {
            trace!(chat_id, "discarding message poll for inactive chat");
            return;
        }

        let items: Vec<PaneItem> = state
            .message_cursor
            .filter_new(&poll.new_messages)
            .into_iter()
            .map(PaneItem::message)
            .collect();
        let newest = items.iter().filter_map(|item| item.timestamp).max();

        if !items.is_empty() {
            debug!(chat_id, count = items.len(), "rendering polled messages");
            let mut ops: Vec<PaneOp> = Self::placeholder_removal(&state).into_iter().collect();
            ops.extend(items.into_iter().map(PaneOp::Append));
            self.apply_pane_ops(&mut state, Some(chat_id), ops);
        }

        if let Some(current_time) = poll.current_time {
            state.message_cursor.advance_to(current_time);
        }
        if let Some(newest) = newest {
            state.message_cursor.advance_to(newest);
        }
    }

    /// Chat-list poller tick.
    async fn poll_chats(&self) {
        let (session_id, last_check) = {
            let state = self.state.lock().await;
            let Some(session_id) = state.session_id() else {
                return;
            };
            (session_id, state.chat_cursor.value())
        };

        let poll = match self.api.check_new_chats(session_id, last_check).await {
            Ok(poll) => poll,
            Err(err) => {
                debug!(session_id, error = %err, "chat poll failed");
                return;
            }
        };

        if !poll.has_new_chats {
            return;
        }

        debug!(session_id, "new chats detected; reloading chat list");
        self.refresh_chats().await;

        let mut state = self.state.lock().await;
        if state.session_id() == Some(session_id)
            && let Some(current_time) = poll.current_time
        {
            state.chat_cursor.advance_to(current_time);
        }
    }

    /// Fetch and publish the full chat list.
    async fn refresh_chats(&self) {
        let Some(session_id) = self.state.lock().await.session_id() else {
            return;
        };

        match self.api.list_chats(session_id).await {
            Ok(chats) => {
                let state = self.state.lock().await;
                if state.session_id() != Some(session_id) {
                    return;
                }
                trace!(session_id, count = chats.len(), "chat list refreshed");
                self.channels.emit(ClientEvent::ChatListUpdated {
                    chats,
                    active_chat_id: state.current_chat_id,
                });
            }
            Err(err) => {
                warn!(session_id, error = %err, "failed to load chat list");
                self.channels.emit(ClientEvent::ChatListFailed {
                    message: normalization::LOAD_CHATS_FAILED_TEXT.to_owned(),
                });
            }
        }
    }

    /// Navigate to a chat: stop pollers, load it, then re-enable send and restart pollers.
    ///
    /// Returns whether the messages loaded.
    async fn switch_chat(self: &Arc<Self>, chat_id: ChatId) -> bool {
        self.stop_pollers().await;

        let loaded = self.load_messages(chat_id).await;
        if loaded {
            self.refresh_chats().await;
        }

        self.channels
            .emit(ClientEvent::SendControl { enabled: true });
        self.start_pollers().await;
        loaded
    }

    async fn load_messages(&self, chat_id: ChatId) -> bool {
        {
            let mut state = self.state.lock().await;
            state.current_chat_id = Some(chat_id);
            state.send_in_flight = None;
            if let Err(err) = state.pane.apply_ops(&[PaneOp::Clear]) {
                warn!(chat_id, error = %err, "failed to clear pane");
            }
        }
        self.channels.emit(ClientEvent::ChatSelected {
            chat_id: Some(chat_id),
        });
        self.channels
            .emit(ClientEvent::SendControl { enabled: false });

        let result = self.api.messages(chat_id).await;

        let mut state = self.state.lock().await;
        if !state.is_current(chat_id) {
            debug!(chat_id, "chat changed while loading; dropping messages");
            return false;
        }

        match result {
            Ok(transcript) => {
                let title = transcript
                    .title
                    .filter(|title| !title.trim().is_empty())
                    .unwrap_or_else(|| UNTITLED_CHAT.to_owned());
                self.channels.emit(ClientEvent::ChatTitleChanged { title });

                let ops = match transcript.messages.last() {
                    Some(last) => {
                        state.message_cursor.reset(last.timestamp);
                        transcript
                            .messages
                            .iter()
                            .map(|message| PaneOp::Append(PaneItem::message(message)))
                            .collect()
                    }
                    None => {
                        state.message_cursor.reset(unix_now());
                        let (group_name, passcode) = state
                            .session
                            .as_ref()
                            .map(|session| (session.group_name.as_str(), session.passcode.as_str()))
                            .unwrap_or_default();
                        vec![PaneOp::Append(PaneItem::welcome(group_name, passcode))]
                    }
                };
                debug!(
                    chat_id,
                    messages = transcript.messages.len(),
                    cursor = state.message_cursor.value(),
                    "chat loaded"
                );
                self.apply_pane_ops(&mut state, Some(chat_id), ops);
                true
            }
            Err(err) => {
                warn!(chat_id, error = %err, "failed to load chat messages");
                self.apply_pane_ops(
                    &mut state,
                    Some(chat_id),
                    vec![PaneOp::Append(PaneItem::load_error(
                        normalization::LOAD_MESSAGES_FAILED_TEXT,
                    ))],
                );
                false
            }
        }
    }

    async fn load_session_info(&self, session_id: SessionId) {
        match self.api.session_info(session_id).await {
            Ok(details) => {
                let mut state = self.state.lock().await;
                if let Some(session) = state.session.as_mut()
                    && session.session_id == session_id
                {
                    session.group_name = details.group_name.clone();
                    self.channels.emit(ClientEvent::SessionInfoLoaded {
                        group_name: details.group_name,
                        passcode: details.passcode,
                    });
                }
            }
            Err(err) => warn!(session_id, error = %err, "failed to load session info"),
        }
    }

    /// Await the send request for at most the send timeout and render its outcome.
    ///
    /// A timeout only ends the wait; the request task keeps running and its
    /// result is dropped.
    ///
    /// Only the send still holding the lock settles the pane; an outcome
    /// superseded by navigation or a later send is dropped.
    async fn run_send(self: Arc<Self>, send: InFlightSend, request: SendMessageRequest) {
        let chat_id = send.chat_id;
        let api = self.api.clone();
        let request_task = tokio::spawn(async move { api.send_message(request).await });

        let outcome = match time::timeout(self.config.send_timeout(), request_task).await {
            Ok(Ok(Ok(text))) => SendOutcome::Reply { text },
            Ok(Ok(Err(error))) => {
                warn!(chat_id, error = %error, "send failed");
                SendOutcome::Failure { error }
            }
            Ok(Err(join_err)) => SendOutcome::Failure {
                error: ClientError::new(
                    ErrorCategory::Internal,
                    "send_task_failed",
                    join_err.to_string(),
                ),
            },
            Err(_) => {
                warn!(
                    chat_id,
                    timeout_ms = self.config.send_timeout_ms,
                    "timed out waiting for reply"
                );
                SendOutcome::TimedOut
            }
        };

        let replied = matches!(outcome, SendOutcome::Reply { .. });
        {
            let mut state = self.state.lock().await;
            if state.send_in_flight != Some(send) || !state.is_current(chat_id) {
                debug!(
                    chat_id,
                    send_id = send.send_id,
                    "send superseded; dropping outcome"
                );
                return;
            }
            state.send_in_flight = None;

            let loading_present = state.pane.contains_key(LOADING_INDICATOR_KEY);
            let ops = normalize_send_outcome(&outcome, loading_present);
            self.apply_pane_ops(&mut state, Some(chat_id), ops);
            if replied {
                state.message_cursor.advance_to(unix_now());
            }
            self.channels
                .emit(ClientEvent::SendControl { enabled: true });
        }

        if replied {
            // Titles may change server-side after the first message.
            self.refresh_chats().await;
        }
    }
}

struct ClientRuntime {
    shared: Arc<SharedClient>,
    command_rx: mpsc::Receiver<ClientCommand>,
    state_machine: ClientStateMachine,
}

impl ClientRuntime {
    fn new(
        api: Arc<dyn ChatApi>,
        config: RuntimeConfig,
        channels: ClientChannels,
        command_rx: mpsc::Receiver<ClientCommand>,
    ) -> Self {
        let shared = SharedClient {
            api,
            state: Mutex::new(ClientState::new(&config)),
            message_poller: Poller::new(PollerKind::Messages, channels.clone()),
            chat_poller: Poller::new(PollerKind::Chats, channels.clone()),
            channels,
            config,
        };

        Self {
            shared: Arc::new(shared),
            command_rx,
            state_machine: ClientStateMachine::default(),
        }
    }

    async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            if let Err(err) = self.handle_command(command).await {
                warn!(code = %err.code, message = %err.message, "command failed");
                self.shared.channels.emit(ClientEvent::CommandFailed {
                    code: err.code,
                    message: err.message,
                });
            }
        }
    }

    async fn handle_command(&mut self, command: ClientCommand) -> Result<(), ClientError> {
        match command {
            ClientCommand::Join { passcode } => self.handle_join(passcode).await,
            ClientCommand::RefreshChats => self.handle_refresh_chats().await,
            ClientCommand::OpenChat { chat_id } => self.handle_open_chat(chat_id).await,
            ClientCommand::NewChat => self.handle_new_chat().await,
            ClientCommand::DeleteChat { chat_id } => self.handle_delete_chat(chat_id).await,
            ClientCommand::AttachImage { image } => {
                self.handle_attach_image(image).await;
                Ok(())
            }
            ClientCommand::ClearImage => {
                self.handle_clear_image().await;
                Ok(())
            }
            ClientCommand::SendMessage { text } => {
                self.handle_send_message(text).await;
                Ok(())
            }
            ClientCommand::SetVisibility { visible } => {
                self.handle_set_visibility(visible).await;
                Ok(())
            }
        }
    }

    async fn handle_join(&mut self, passcode: String) -> Result<(), ClientError> {
        let passcode = passcode.trim().to_owned();
        if passcode.is_empty() {
            self.emit_join_failure(normalization::EMPTY_PASSCODE_TEXT.to_owned());
            return Ok(());
        }

        let (candidate, transition_events) = self.validate_transition(ClientCommand::Join {
            passcode: String::new(),
        })?;
        self.commit_transition(candidate, transition_events);

        let joined = match self.shared.api.join_session(&passcode).await {
            Ok(joined) => joined,
            Err(err) => {
                warn!(error = %err, "join failed");
                self.finish_join(false);
                self.emit_join_failure(user_facing_message(
                    &err,
                    normalization::JOIN_FAILED_TEXT,
                    normalization::JOIN_NETWORK_TEXT,
                ));
                return Ok(());
            }
        };

        info!(
            session_id = joined.session_id,
            chat_id = joined.chat_id,
            "joined session"
        );
        let session = SessionInfo {
            session_id: joined.session_id,
            chat_id: joined.chat_id,
            group_name: joined.group_name,
            passcode,
        };

        self.shared.stop_pollers().await;
        {
            let mut state = self.shared.state.lock().await;
            state.session = Some(session.clone());
            state.current_chat_id = None;
            state.chat_cursor.reset(unix_now());
        }
        self.finish_join(true);
        self.shared.channels.emit(ClientEvent::JoinResult {
            success: true,
            session: Some(session.clone()),
            error_message: None,
        });

        if !self.shared.switch_chat(session.chat_id).await {
            self.shared.refresh_chats().await;
        }
        self.shared.load_session_info(session.session_id).await;
        Ok(())
    }

    async fn handle_refresh_chats(&mut self) -> Result<(), ClientError> {
        self.validate_transition(ClientCommand::RefreshChats)?;
        self.shared.refresh_chats().await;
        Ok(())
    }

    async fn handle_open_chat(&mut self, chat_id: ChatId) -> Result<(), ClientError> {
        self.validate_transition(ClientCommand::OpenChat { chat_id })?;

        {
            let state = self.shared.state.lock().await;
            if state.is_current(chat_id) && !state.pane.is_empty() {
                debug!(chat_id, "chat already open");
                return Ok(());
            }
        }

        self.shared.switch_chat(chat_id).await;
        Ok(())
    }

    async fn handle_new_chat(&mut self) -> Result<(), ClientError> {
        self.validate_transition(ClientCommand::NewChat)?;
        let session_id = self.shared.require_session().await?;

        match self.shared.api.new_chat(session_id).await {
            Ok(chat_id) => {
                info!(session_id, chat_id, "created chat");
                self.shared.stop_pollers().await;
                // Peers detect the new chat through their own chat cursors.
                self.shared.state.lock().await.chat_cursor.reset(unix_now());
                self.shared.switch_chat(chat_id).await;
            }
            Err(err) => {
                warn!(session_id, error = %err, "failed to create chat");
                self.shared.channels.emit(ClientEvent::Alert {
                    message: normalization::new_chat_failed_text(&err),
                });
            }
        }
        Ok(())
    }

    async fn handle_delete_chat(&mut self, chat_id: ChatId) -> Result<(), ClientError> {
        self.validate_transition(ClientCommand::DeleteChat { chat_id })?;
        let session_id = self.shared.require_session().await?;

        if let Err(err) = self.shared.api.delete_chat(chat_id).await {
            warn!(chat_id, error = %err, "failed to delete chat");
            self.shared.channels.emit(ClientEvent::Alert {
                message: normalization::delete_failed_text(&err),
            });
            return Ok(());
        }
        info!(chat_id, "deleted chat");

        let was_current = self.shared.state.lock().await.is_current(chat_id);
        if was_current {
            self.shared.stop_pollers().await;
            {
                let mut state = self.shared.state.lock().await;
                state.current_chat_id = None;
                state.send_in_flight = None;
                if let Err(err) = state.pane.apply_ops(&[PaneOp::Clear]) {
                    warn!(chat_id, error = %err, "failed to clear pane");
                }
            }
            self.shared
                .channels
                .emit(ClientEvent::ChatSelected { chat_id: None });
            self.shared.channels.emit(ClientEvent::ChatTitleChanged {
                title: normalization::NO_CHAT_TITLE.to_owned(),
            });
            self.shared
                .channels
                .emit(ClientEvent::SendControl { enabled: false });

            match self.shared.api.list_chats(session_id).await {
                Ok(chats) => match most_recent_chat(&chats) {
                    Some(next) => {
                        debug!(chat_id = next, "falling back to most recent chat");
                        self.shared.switch_chat(next).await;
                    }
                    None => {
                        let mut state = self.shared.state.lock().await;
                        self.shared.apply_pane_ops(
                            &mut state,
                            None,
                            vec![PaneOp::Append(PaneItem::no_chats())],
                        );
                        drop(state);
                        self.shared.start_pollers().await;
                    }
                },
                Err(err) => {
                    warn!(session_id, error = %err, "failed to load remaining chats");
                    self.shared.start_pollers().await;
                }
            }
        }

        self.shared.refresh_chats().await;
        Ok(())
    }

    async fn handle_attach_image(&mut self, image: PendingImage) {
        if !image.mime_type.starts_with("image/") {
            self.shared.channels.emit(ClientEvent::Alert {
                message: normalization::INVALID_IMAGE_TEXT.to_owned(),
            });
            return;
        }

        debug!(mime_type = %image.mime_type, "image attached");
        let event = ClientEvent::AttachmentChanged {
            mime_type: Some(image.mime_type.clone()),
            data_url: Some(image.data_url()),
        };
        self.shared.state.lock().await.pending_image = Some(image);
        self.shared.channels.emit(event);
    }

    async fn handle_clear_image(&mut self) {
        self.shared.state.lock().await.pending_image = None;
        self.shared.channels.emit(ClientEvent::AttachmentChanged {
            mime_type: None,
            data_url: None,
        });
    }

    async fn handle_send_message(&mut self, text: String) {
        let text = text.trim().to_owned();

        let prepared = {
            let mut state = self.shared.state.lock().await;
            prepare_send(&mut state, text)
        };

        let (send, request, ops, had_image) = match prepared {
            Ok(prepared) => prepared,
            Err(reason) => {
                debug!(?reason, "send rejected");
                self.shared
                    .channels
                    .emit(ClientEvent::SendRejected { reason });
                return;
            }
        };

        {
            let mut state = self.shared.state.lock().await;
            self.shared.apply_pane_ops(&mut state, Some(send.chat_id), ops);
        }
        if had_image {
            self.shared.channels.emit(ClientEvent::AttachmentChanged {
                mime_type: None,
                data_url: None,
            });
        }
        self.shared
            .channels
            .emit(ClientEvent::SendControl { enabled: false });

        debug!(chat_id = send.chat_id, send_id = send.send_id, "send dispatched");
        tokio::spawn(self.shared.clone().run_send(send, request));
    }

    async fn handle_set_visibility(&mut self, visible: bool) {
        let changed = {
            let mut state = self.shared.state.lock().await;
            let changed = state.visible != visible;
            state.visible = visible;
            changed
        };
        if !changed {
            return;
        }

        debug!(visible, "visibility changed");
        if visible {
            self.shared.resume_pollers().await;
        } else {
            self.shared.stop_pollers().await;
        }
    }

    fn validate_transition(
        &self,
        command: ClientCommand,
    ) -> Result<(ClientStateMachine, Vec<ClientEvent>), ClientError> {
        let mut candidate = self.state_machine.clone();
        let events = candidate.apply(&command)?;
        Ok((candidate, events))
    }

    fn commit_transition(&mut self, candidate: ClientStateMachine, events: Vec<ClientEvent>) {
        self.state_machine = candidate;
        self.shared.channels.emit_all(events);
    }

    fn finish_join(&mut self, success: bool) {
        match self.state_machine.on_join_result(success) {
            Ok(event) => self.shared.channels.emit(event),
            Err(err) => self.shared.channels.emit(ClientEvent::CommandFailed {
                code: err.code,
                message: err.message,
            }),
        }
    }

    fn emit_join_failure(&self, message: String) {
        self.shared.channels.emit(ClientEvent::JoinResult {
            success: false,
            session: None,
            error_message: Some(message),
        });
    }
}

type PreparedSend = (InFlightSend, SendMessageRequest, Vec<PaneOp>, bool);

/// Validate a send against the current state and take the pending image.
fn prepare_send(state: &mut ClientState, text: String) -> Result<PreparedSend, SendRejection> {
    if text.is_empty() && state.pending_image.is_none() {
        return Err(SendRejection::Empty);
    }
    let Some(chat_id) = state.current_chat_id else {
        return Err(SendRejection::NoChatSelected);
    };
    if state.sending_in(chat_id) {
        return Err(SendRejection::InFlight);
    }

    let image = state.pending_image.take();
    let send = InFlightSend {
        chat_id,
        send_id: state.next_send_id,
    };
    state.next_send_id += 1;
    state.send_in_flight = Some(send);

    let mut ops: Vec<PaneOp> = SharedClient::placeholder_removal(state).into_iter().collect();
    ops.push(PaneOp::Append(PaneItem::user_echo(
        text.clone(),
        image.as_ref().map(PendingImage::data_url),
    )));
    ops.push(PaneOp::Append(PaneItem::loading()));

    let had_image = image.is_some();
    let (image_data, mime_type) = match image {
        Some(image) => (Some(image.data_base64), Some(image.mime_type)),
        None => (None, None),
    };

    Ok((
        send,
        SendMessageRequest {
            chat_id,
            message: text,
            image_data,
            mime_type,
        },
        ops,
        had_image,
    ))
}

/// Most recent chat by timestamp; ties keep server order.
fn most_recent_chat(chats: &[ChatSummary]) -> Option<ChatId> {
    let mut best: Option<&ChatSummary> = None;
    for chat in chats {
        let newer = match best {
            Some(current) => chat.timestamp.unwrap_or(i64::MIN) > current.timestamp.unwrap_or(i64::MIN),
            None => true,
        };
        if newer {
            best = Some(chat);
        }
    }
    best.map(|chat| chat.chat_id)
}
