use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reply::{CodeBlock, extract_code_blocks};

/// Server-assigned session identifier.
pub type SessionId = i64;
/// Server-assigned chat identifier.
pub type ChatId = i64;

pub const LOADING_INDICATOR_KEY: &str = "loading-indicator";
pub const WELCOME_MESSAGE_KEY: &str = "welcome-message";
pub const NO_CHATS_MESSAGE_KEY: &str = "no-chats-message";
pub const ERROR_MESSAGE_KEY: &str = "error-message";

/// Current wall-clock time in Unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// High-level client lifecycle state reported to the frontend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientLifecycleState {
    /// No session has been joined yet.
    Cold,
    /// A join request is in flight.
    Joining,
    /// A session is active and chat commands are accepted.
    Joined,
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Sender {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant", alias = "gemini", alias = "model")]
    Assistant,
}

/// Background refresh task identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PollerKind {
    /// Polls the current chat for messages newer than the message cursor.
    Messages,
    /// Polls the session for chats created since the chat-list cursor.
    Chats,
}

/// Runtime tuning values supplied when the client runtime is spawned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Message poller period in milliseconds.
    pub message_poll_interval_ms: u64,
    /// Chat-list poller period in milliseconds.
    pub chat_poll_interval_ms: u64,
    /// How long the UI waits for a send reply before showing a timeout.
    pub send_timeout_ms: u64,
    /// Retention cap for the rendered message pane.
    pub pane_max_items: usize,
}

impl RuntimeConfig {
    pub fn message_poll_interval(&self) -> Duration {
        Duration::from_millis(self.message_poll_interval_ms.max(1))
    }

    pub fn chat_poll_interval(&self) -> Duration {
        Duration::from_millis(self.chat_poll_interval_ms.max(1))
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms.max(1))
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            message_poll_interval_ms: 2_000,
            chat_poll_interval_ms: 3_000,
            send_timeout_ms: 25_000,
            pane_max_items: 1_000,
        }
    }
}

/// Session captured after a successful join.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub session_id: SessionId,
    /// Chat opened right after joining.
    pub chat_id: ChatId,
    pub group_name: String,
    /// Passcode echoed from the join form.
    pub passcode: String,
}

/// `POST /join_session` success payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JoinedSession {
    pub session_id: SessionId,
    pub chat_id: ChatId,
    pub group_name: String,
}

/// `GET /get_session_info/{id}` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDetails {
    pub group_name: String,
    pub passcode: String,
}

/// One sidebar entry from `GET /get_chats/{session_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatSummary {
    pub chat_id: ChatId,
    pub title: String,
    /// Creation (or last activity) time in Unix seconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// One stored chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    /// Unix seconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// `GET /get_messages/{chat_id}` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChatTranscript {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// `GET /check_new_messages/{chat_id}` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NewMessagesPoll {
    #[serde(default)]
    pub has_new_messages: bool,
    #[serde(default)]
    pub new_messages: Vec<ChatMessage>,
    #[serde(default)]
    pub current_time: Option<i64>,
}

/// `GET /check_new_chats/{session_id}` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct NewChatsPoll {
    #[serde(default)]
    pub has_new_chats: bool,
    #[serde(default)]
    pub current_time: Option<i64>,
}

/// `POST /new_chat_in_session` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewChatCreated {
    pub chat_id: ChatId,
}

/// `POST /delete_chat/{chat_id}` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DeleteChatResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /send_message` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub chat_id: ChatId,
    pub message: String,
    pub image_data: Option<String>,
    pub mime_type: Option<String>,
}

/// `POST /send_message` response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SendMessageReply {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Image attached to the composer, waiting to be sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingImage {
    /// Base64 payload without the data-URL prefix.
    pub data_base64: String,
    /// MIME type, always `image/*`.
    pub mime_type: String,
}

impl PendingImage {
    /// Build a pending image, rejecting non-image MIME types.
    pub fn new(
        mime_type: impl Into<String>,
        data_base64: impl Into<String>,
    ) -> Result<Self, crate::error::ClientError> {
        let mime_type = mime_type.into().trim().to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            return Err(crate::error::ClientError::new(
                crate::error::ErrorCategory::Config,
                "invalid_image",
                crate::normalization::INVALID_IMAGE_TEXT,
            ));
        }
        Ok(Self {
            data_base64: data_base64.into(),
            mime_type,
        })
    }

    /// Data URL used for the optimistic local echo.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data_base64)
    }
}

/// Kind of a rendered pane entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaneItemKind {
    /// A real chat message (stored or optimistic).
    Message,
    /// Placeholder shown for an empty chat.
    Welcome,
    /// Placeholder shown when the session has no chats left.
    EmptyState,
    /// Transient "assistant is typing" placeholder.
    Loading,
    /// Inline failure bubble.
    Error,
}

/// One rendered entry in the message pane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaneItem {
    /// Stable key for placeholders that may later be removed.
    pub key: Option<String>,
    pub kind: PaneItemKind,
    pub sender: Sender,
    pub text: String,
    /// Local data URL for an attached image.
    pub image_data_url: Option<String>,
    pub timestamp: Option<i64>,
    /// Fenced code blocks of assistant replies, exposed as copy targets.
    pub code_blocks: Vec<CodeBlock>,
}

impl PaneItem {
    fn new(kind: PaneItemKind, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            key: None,
            kind,
            sender,
            text: text.into(),
            image_data_url: None,
            timestamp: None,
            code_blocks: Vec::new(),
        }
    }

    fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_owned());
        self
    }

    /// Render a stored or polled message.
    pub fn message(message: &ChatMessage) -> Self {
        let mut item = match message.sender {
            Sender::Assistant => Self::assistant_reply(message.text.clone()),
            Sender::User => Self::new(PaneItemKind::Message, Sender::User, message.text.clone()),
        };
        item.timestamp = Some(message.timestamp);
        item
    }

    /// Optimistic echo of the local user's message.
    pub fn user_echo(text: impl Into<String>, image_data_url: Option<String>) -> Self {
        let mut item = Self::new(PaneItemKind::Message, Sender::User, text);
        item.image_data_url = image_data_url;
        item
    }

    /// Assistant reply with code-block copy targets.
    pub fn assistant_reply(text: impl Into<String>) -> Self {
        let mut item = Self::new(PaneItemKind::Message, Sender::Assistant, text);
        item.code_blocks = extract_code_blocks(&item.text);
        item
    }

    pub fn welcome(group_name: &str, passcode: &str) -> Self {
        Self::new(
            PaneItemKind::Welcome,
            Sender::Assistant,
            crate::normalization::welcome_text(group_name, passcode),
        )
        .with_key(WELCOME_MESSAGE_KEY)
    }

    pub fn no_chats() -> Self {
        Self::new(
            PaneItemKind::EmptyState,
            Sender::Assistant,
            crate::normalization::NO_CHATS_TEXT,
        )
        .with_key(NO_CHATS_MESSAGE_KEY)
    }

    pub fn loading() -> Self {
        Self::new(PaneItemKind::Loading, Sender::Assistant, "loading").with_key(LOADING_INDICATOR_KEY)
    }

    /// Inline error bubble without a stable key.
    pub fn error(text: impl Into<String>) -> Self {
        Self::new(PaneItemKind::Error, Sender::Assistant, text)
    }

    /// Inline error bubble that replaces a chat's content after a failed load.
    pub fn load_error(text: impl Into<String>) -> Self {
        Self::error(text).with_key(ERROR_MESSAGE_KEY)
    }

    /// Whether the text part has visible content.
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

/// Incremental pane operation applied by frontend pane stores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PaneOp {
    /// Append item at the end of the pane.
    Append(PaneItem),
    /// Remove the item with the given key.
    Remove { key: String },
    /// Clear the pane.
    Clear,
}

/// Why a send request was refused before any request was issued.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SendRejection {
    /// Neither text nor image.
    Empty,
    /// No chat is selected.
    NoChatSelected,
    /// A previous send is still awaiting its reply.
    InFlight,
}

/// Poller status updates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollerStatus {
    pub poller: PollerKind,
    pub running: bool,
}

/// Command channel input accepted by the client runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientCommand {
    /// Join the group session identified by a passcode.
    Join { passcode: String },
    /// Re-fetch and re-render the chat list.
    RefreshChats,
    /// Select a chat and load its messages.
    OpenChat { chat_id: ChatId },
    /// Create a new chat in the current session and switch to it.
    NewChat,
    /// Delete a chat (already confirmed by the user).
    DeleteChat { chat_id: ChatId },
    /// Attach (or replace) the composer image.
    AttachImage { image: PendingImage },
    /// Drop the composer image.
    ClearImage,
    /// Send composer text and pending image to the current chat.
    SendMessage { text: String },
    /// Page/window visibility change; hidden suspends pollers.
    SetVisibility { visible: bool },
}

/// Event channel output emitted by the client runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ClientEvent {
    /// Lifecycle transition.
    StateChanged { state: ClientLifecycleState },
    /// Outcome of a join attempt.
    JoinResult {
        success: bool,
        session: Option<SessionInfo>,
        /// User-facing failure text when `success == false`.
        error_message: Option<String>,
    },
    /// Group name and passcode confirmed by the server.
    SessionInfoLoaded { group_name: String, passcode: String },
    /// Full chat list replacement.
    ChatListUpdated {
        chats: Vec<ChatSummary>,
        active_chat_id: Option<ChatId>,
    },
    /// Chat list could not be loaded.
    ChatListFailed { message: String },
    /// Current chat switched (or unset); the pane was cleared.
    ChatSelected { chat_id: Option<ChatId> },
    /// Header title for the current chat.
    ChatTitleChanged { title: String },
    /// Pane operations to apply in order.
    PaneDelta {
        chat_id: Option<ChatId>,
        ops: Vec<PaneOp>,
    },
    /// Send control enabled/disabled (doubles as the send lock).
    SendControl { enabled: bool },
    /// Send refused locally.
    SendRejected { reason: SendRejection },
    /// Pending composer image changed.
    AttachmentChanged {
        mime_type: Option<String>,
        data_url: Option<String>,
    },
    /// Poller started or stopped.
    PollerStatus(PollerStatus),
    /// Blocking notice for the user (delete/new-chat failures).
    Alert { message: String },
    /// A command was refused by the runtime.
    CommandFailed { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_now_tracks_utc_seconds() {
        let before = chrono::Utc::now().timestamp();
        let now = unix_now();
        let after = chrono::Utc::now().timestamp();
        assert!(before <= now && now <= after);
        assert!(now > 1_600_000_000);
    }

    #[test]
    fn sender_accepts_legacy_assistant_names() {
        let message: ChatMessage =
            serde_json::from_str(r#"{"sender":"gemini","text":"hi","timestamp":5}"#)
                .expect("legacy sender should decode");
        assert_eq!(message.sender, Sender::Assistant);

        let encoded = serde_json::to_string(&Sender::Assistant).expect("sender should encode");
        assert_eq!(encoded, r#""assistant""#);
    }

    #[test]
    fn chat_summary_tolerates_missing_timestamp() {
        let chat: ChatSummary = serde_json::from_str(r#"{"chat_id":3,"title":"New Chat"}"#)
            .expect("chat should decode");
        assert_eq!(chat.timestamp, None);
    }

    #[test]
    fn send_request_serializes_absent_image_as_null() {
        let body = serde_json::to_value(SendMessageRequest {
            chat_id: 10,
            message: "hello".into(),
            image_data: None,
            mime_type: None,
        })
        .expect("request should encode");
        assert_eq!(body["chat_id"], 10);
        assert!(body["image_data"].is_null());
    }

    #[test]
    fn pending_image_rejects_non_image_mime() {
        let err = PendingImage::new("application/pdf", "AAAA").expect_err("pdf is not an image");
        assert_eq!(err.code, "invalid_image");

        let image = PendingImage::new("Image/PNG", "AAAA").expect("png is an image");
        assert_eq!(image.data_url(), "data:image/png;base64,AAAA");
    }

    #[test]
    fn assistant_messages_expose_code_blocks() {
        let item = PaneItem::message(&ChatMessage {
            sender: Sender::Assistant,
            text: "try:\n```rust\nfn main() {}\n```".into(),
            timestamp: 7,
        });
        assert_eq!(item.code_blocks.len(), 1);
        assert_eq!(item.timestamp, Some(7));

        let user = PaneItem::message(&ChatMessage {
            sender: Sender::User,
            text: "```not code```".into(),
            timestamp: 8,
        });
        assert!(user.code_blocks.is_empty());
    }
}
