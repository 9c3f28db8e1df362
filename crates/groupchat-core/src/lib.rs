//! Core client contract shared between the runtime and frontend consumers.
//!
//! This crate defines the command/event protocol, lifecycle model, polling
//! cursor and message-pane helpers, and common error/channel abstractions.

/// Async command/event channel primitives.
pub mod channel;
/// Polling high-water mark.
pub mod cursor;
/// Stable client error types and HTTP classification helpers.
pub mod error;
/// User-facing text and send-outcome normalization.
pub mod normalization;
/// Rendered message pane buffer.
pub mod pane;
/// Code-block extraction for assistant replies.
pub mod reply;
/// Client lifecycle state machine.
pub mod state_machine;
/// Wire payloads and frontend-facing protocol types.
pub mod types;

pub use channel::{ClientChannelError, ClientChannels, EventStream};
pub use cursor::PollCursor;
pub use error::{ClientError, ErrorCategory, classify_http_status};
pub use normalization::{SendOutcome, normalize_send_outcome, user_facing_message};
pub use pane::{MessagePane, PaneMergeError};
pub use reply::{CodeBlock, extract_code_blocks};
pub use state_machine::ClientStateMachine;
pub use types::{
    ChatId, ChatMessage, ChatSummary, ChatTranscript, ClientCommand, ClientEvent,
    ClientLifecycleState, DeleteChatResult, JoinedSession, NewChatCreated, NewChatsPoll,
    NewMessagesPoll, PaneItem, PaneItemKind, PaneOp, PendingImage, PollerKind, PollerStatus,
    RuntimeConfig, SendMessageReply, SendMessageRequest, SendRejection, Sender, SessionDetails,
    SessionId, SessionInfo, unix_now,
};
