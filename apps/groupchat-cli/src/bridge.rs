//! Runtime bridge that wires client events into view snapshots and user
//! actions into client commands.

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use arboard::Clipboard;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use groupchat_client::ClientRuntimeHandle;
use groupchat_core::{
    ChatId, ClientCommand, ClientEvent, EventStream, PendingImage,
    normalization::INVALID_IMAGE_TEXT,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

use crate::{
    config::CliConfig,
    state::{ClientViewState, ViewSnapshot},
};

const COPIED_RESPONSE_TEXT: &str = "Copied Response!";
const COPIED_CODE_TEXT: &str = "Copied!";
const NOTHING_TO_COPY_TEXT: &str = "No response to copy yet.";

/// Callback used to publish new view snapshots.
pub type UiUpdateCallback = Arc<dyn Fn(ViewSnapshot) + Send + Sync + 'static>;

/// Bridges terminal actions and runtime events.
pub struct CliBridge {
    command_tx: mpsc::UnboundedSender<ClientCommand>,
    state: Arc<Mutex<ClientViewState>>,
    clipboard: Mutex<Option<Clipboard>>,
    ui_update: UiUpdateCallback,
    command_task: tokio::task::JoinHandle<()>,
    event_task: tokio::task::JoinHandle<()>,
}

impl CliBridge {
    /// Start command/event workers on the current tokio runtime.
    pub fn spawn(
        config: &CliConfig,
        runtime: ClientRuntimeHandle,
        ui_update: UiUpdateCallback,
    ) -> Arc<Self> {
        info!(
            server_url = %config.server_url,
            pane_max_items = config.pane_max_items,
            "spawning cli bridge"
        );

        let state = Arc::new(Mutex::new(ClientViewState::new(config.pane_max_items)));
        let mut events = runtime.subscribe();

        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<ClientCommand>();
        let command_task = tokio::spawn(async move {
            debug!("cli command worker started");
            while let Some(command) = command_rx.recv().await {
                debug!(command = command_kind(&command), "forwarding client command");
                if let Err(err) = runtime.send(command).await {
                    error!(error = %err, "client runtime stopped accepting commands");
                    break;
                }
            }
            debug!("cli command worker exiting");
        });

        let state_for_events = Arc::clone(&state);
        let ui_update_for_events = Arc::clone(&ui_update);
        let event_task = tokio::spawn(async move {
            debug!("cli event worker started");
            while let Some(event) = recv_event(&mut events).await {
                trace!(event = event_kind(&event), "received client event");
                let snapshot = {
                    let mut state = lock(&state_for_events);
                    state.handle_event(event);
                    publish(&mut state)
                };
                (ui_update_for_events)(snapshot);
            }
            warn!("cli event worker exiting: client event stream closed");
        });

        let bridge = Arc::new(Self {
            command_tx,
            state,
            clipboard: Mutex::new(None),
            ui_update,
            command_task,
            event_task,
        });
        bridge.publish_snapshot();
        bridge
    }

    /// Join the session identified by `passcode`.
    pub fn submit_passcode(&self, passcode: String) {
        self.enqueue_command(ClientCommand::Join { passcode });
    }

    pub fn refresh_chats(&self) {
        self.enqueue_command(ClientCommand::RefreshChats);
    }

    pub fn new_chat(&self) {
        self.enqueue_command(ClientCommand::NewChat);
    }

    /// Chat ID at a 1-based position of the last rendered chat list.
    pub fn chat_id_at(&self, position: usize) -> Option<ChatId> {
        lock(&self.state).chat_id_at(position)
    }

    /// Open the chat at a 1-based sidebar position.
    pub fn open_chat_at(&self, position: usize) {
        match self.chat_id_at(position) {
            Some(chat_id) => {
                info!(chat_id, "opening chat");
                self.enqueue_command(ClientCommand::OpenChat { chat_id });
            }
            None => {
                warn!(position, "chat selection ignored: position out of range");
                self.notify(format!("No chat at position {position}."));
            }
        }
    }

    /// Delete a chat by ID; confirmation is the caller's job.
    pub fn delete_chat(&self, chat_id: ChatId) {
        info!(chat_id, "deleting chat");
        self.enqueue_command(ClientCommand::DeleteChat { chat_id });
    }

    pub fn send_message(&self, text: String) {
        self.enqueue_command(ClientCommand::SendMessage { text });
    }

    /// Read an image from disk and attach it to the next message.
    pub async fn attach_image(&self, path: &Path) {
        let Some(mime_type) = image_mime_type(path) else {
            warn!(path = %path.display(), "rejected non-image attachment");
            self.notify(INVALID_IMAGE_TEXT);
            return;
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed reading attachment");
                self.notify(format!("Could not read {}: {err}", path.display()));
                return;
            }
        };

        match PendingImage::new(mime_type.as_str(), STANDARD.encode(&bytes)) {
            Ok(image) => {
                debug!(%mime_type, size = bytes.len(), "attaching image");
                self.enqueue_command(ClientCommand::AttachImage { image });
            }
            Err(err) => self.notify(err.message),
        }
    }

    pub fn clear_image(&self) {
        self.enqueue_command(ClientCommand::ClearImage);
    }

    /// Pause or resume background polling.
    pub fn set_visible(&self, visible: bool) {
        self.enqueue_command(ClientCommand::SetVisibility { visible });
    }

    /// Copy the full text of the latest assistant reply.
    pub fn copy_last_reply(&self) {
        let text = lock(&self.state)
            .last_assistant_reply()
            .map(|item| item.text.clone());
        let Some(text) = text else {
            self.notify(NOTHING_TO_COPY_TEXT);
            return;
        };
        self.copy_with_feedback(&text, COPIED_RESPONSE_TEXT);
    }

    /// Copy the `position`th (1-based) code block of the latest assistant reply.
    pub fn copy_code_block(&self, position: usize) {
        let code = {
            let state = lock(&self.state);
            position
                .checked_sub(1)
                .and_then(|index| state.last_code_blocks().get(index))
                .map(|block| block.code.clone())
        };
        let Some(code) = code else {
            self.notify(format!("No code block {position} in the last response."));
            return;
        };
        self.copy_with_feedback(&code, COPIED_CODE_TEXT);
    }

    /// Latest snapshot without waiting for an event.
    pub fn snapshot(&self) -> ViewSnapshot {
        lock(&self.state).snapshot()
    }

    fn copy_with_feedback(&self, text: &str, feedback: &str) {
        match self.copy_to_clipboard(text) {
            Ok(()) => {
                info!(len = text.len(), "copied to clipboard");
                self.notify(feedback);
            }
            Err(err) => {
                error!(error = %err, "failed to copy to clipboard");
                self.notify("Failed to copy to clipboard.");
            }
        }
    }

    fn copy_to_clipboard(&self, text: &str) -> Result<(), String> {
        let mut clipboard_slot = lock(&self.clipboard);

        if let Some(clipboard) = clipboard_slot.as_mut()
            && clipboard.set_text(text.to_owned()).is_ok()
        {
            return Ok(());
        }

        // Stale or missing handle: retry once with a fresh one.
        let mut clipboard = Clipboard::new().map_err(|err| err.to_string())?;
        let result = clipboard
            .set_text(text.to_owned())
            .map_err(|err| err.to_string());
        *clipboard_slot = Some(clipboard);
        result
    }

    fn notify(&self, text: impl Into<String>) {
        let snapshot = {
            let mut state = lock(&self.state);
            state.set_notice(text);
            publish(&mut state)
        };
        (self.ui_update)(snapshot);
    }

    fn enqueue_command(&self, command: ClientCommand) {
        trace!(command = command_kind(&command), "enqueue_command");
        if self.command_tx.send(command).is_err() {
            error!("client command channel closed");
            self.notify("Client runtime stopped.");
        }
    }

    fn publish_snapshot(&self) {
        let snapshot = self.snapshot();
        (self.ui_update)(snapshot);
    }
}

impl Drop for CliBridge {
    fn drop(&mut self) {
        info!("shutting down cli bridge tasks");
        self.command_task.abort();
        self.event_task.abort();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot the state; notices are shown once.
fn publish(state: &mut ClientViewState) -> ViewSnapshot {
    let snapshot = state.snapshot();
    state.take_notice();
    snapshot
}

/// Image MIME type guessed from the file extension; non-image guesses are dropped.
fn image_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_owned())
}

async fn recv_event(events: &mut EventStream) -> Option<ClientEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "cli event worker lagged behind runtime");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

fn command_kind(command: &ClientCommand) -> &'static str {
    match command {
        ClientCommand::Join { .. } => "Join",
        ClientCommand::RefreshChats => "RefreshChats",
        ClientCommand::OpenChat { .. } => "OpenChat",
        ClientCommand::NewChat => "NewChat",
        ClientCommand::DeleteChat { .. } => "DeleteChat",
        ClientCommand::AttachImage { .. } => "AttachImage",
        ClientCommand::ClearImage => "ClearImage",
        ClientCommand::SendMessage { .. } => "SendMessage",
        ClientCommand::SetVisibility { .. } => "SetVisibility",
    }
}

fn event_kind(event: &ClientEvent) -> &'static str {
    match event {
        ClientEvent::StateChanged { .. } => "StateChanged",
        ClientEvent::JoinResult { .. } => "JoinResult",
        ClientEvent::SessionInfoLoaded { .. } => "SessionInfoLoaded",
        ClientEvent::ChatListUpdated { .. } => "ChatListUpdated",
        ClientEvent::ChatListFailed { .. } => "ChatListFailed",
        ClientEvent::ChatSelected { .. } => "ChatSelected",
        ClientEvent::ChatTitleChanged { .. } => "ChatTitleChanged",
        ClientEvent::PaneDelta { .. } => "PaneDelta",
        ClientEvent::SendControl { .. } => "SendControl",
        ClientEvent::SendRejected { .. } => "SendRejected",
        ClientEvent::AttachmentChanged { .. } => "AttachmentChanged",
        ClientEvent::PollerStatus(_) => "PollerStatus",
        ClientEvent::Alert { .. } => "Alert",
        ClientEvent::CommandFailed { .. } => "CommandFailed",
    }
}
