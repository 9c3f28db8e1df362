use crate::{
    error::{ClientError, ErrorCategory},
    types::{LOADING_INDICATOR_KEY, PaneItem, PaneOp},
};

pub const NO_CHATS_TEXT: &str = "No chats available. Create a new chat to start conversation.";
pub const LOAD_MESSAGES_FAILED_TEXT: &str = "Error loading chat messages.";
pub const LOAD_CHATS_FAILED_TEXT: &str = "Error loading chats";
pub const SEND_TIMEOUT_TEXT: &str = "Timed out waiting for response.";
pub const SEND_NETWORK_TEXT: &str = "Network error. Check your connection.";
pub const EMPTY_PASSCODE_TEXT: &str = "Please enter a passcode";
pub const JOIN_FAILED_TEXT: &str = "Failed to join session";
pub const JOIN_NETWORK_TEXT: &str = "Network error. Please try again.";
pub const DELETE_NETWORK_TEXT: &str = "Network error while trying to delete chat.";
pub const NEW_CHAT_NETWORK_TEXT: &str = "Network error starting new chat";
pub const INVALID_IMAGE_TEXT: &str = "Please select a valid image file.";
pub const NO_CHAT_TITLE: &str = "Select a Chat";

/// Outcome of a send request as observed by the UI wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server answered with a reply text.
    Reply { text: String },
    /// The request failed (application or transport error).
    Failure { error: ClientError },
    /// No answer within the UI wait; the request itself keeps running.
    TimedOut,
}

/// Convert a send outcome to the pane operations that settle the loading placeholder.
///
/// `loading_present` says whether the placeholder is still in the pane; the
/// remove op is only emitted when it is.
pub fn normalize_send_outcome(outcome: &SendOutcome, loading_present: bool) -> Vec<PaneOp> {
    let mut ops = Vec::with_capacity(2);
    if loading_present {
        ops.push(PaneOp::Remove {
            key: LOADING_INDICATOR_KEY.to_owned(),
        });
    }

    let item = match outcome {
        SendOutcome::Reply { text } => PaneItem::assistant_reply(text.clone()),
        SendOutcome::Failure { error } if error.is_transport() => PaneItem::error(SEND_NETWORK_TEXT),
        SendOutcome::Failure { error } => PaneItem::error(format!("[ERROR]: {}", error.message)),
        SendOutcome::TimedOut => PaneItem::error(SEND_TIMEOUT_TEXT),
    };
    ops.push(PaneOp::Append(item));
    ops
}

/// Pick the user-facing text for a failed request.
///
/// Server-supplied messages win; transport failures map to `network_text`;
/// anything else uses `fallback`.
pub fn user_facing_message(error: &ClientError, fallback: &str, network_text: &str) -> String {
    if error.category == ErrorCategory::Rejected && !error.message.trim().is_empty() {
        error.message.clone()
    } else if error.is_transport() {
        network_text.to_owned()
    } else {
        fallback.to_owned()
    }
}

/// Alert text for a failed delete.
pub fn delete_failed_text(error: &ClientError) -> String {
    if error.is_transport() {
        return DELETE_NETWORK_TEXT.to_owned();
    }
    let reason = if error.category == ErrorCategory::Rejected && !error.message.trim().is_empty() {
        error.message.as_str()
    } else {
        "Unknown error"
    };
    format!("Failed to delete chat: {reason}")
}

/// Alert text for a failed new-chat request.
pub fn new_chat_failed_text(error: &ClientError) -> String {
    if error.is_transport() {
        NEW_CHAT_NETWORK_TEXT.to_owned()
    } else {
        format!("Failed to start new chat: {}", error.message)
    }
}

pub fn welcome_text(group_name: &str, passcode: &str) -> String {
    format!(
        "Welcome to \"{group_name}\"! This is a shared group chat. Everyone with passcode \"{passcode}\" can see and contribute to this conversation. Start by saying hello!"
    )
}
