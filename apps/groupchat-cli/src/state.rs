//! Frontend-facing state reducer for `groupchat-cli`.

use chrono::{DateTime, Local, TimeZone};
use groupchat_core::{
    ChatId, ChatSummary, ClientEvent, ClientLifecycleState, CodeBlock, PaneItem, PaneItemKind,
    PaneOp, PollerKind, PollerStatus, SendRejection, Sender,
};
use tracing::{debug, trace, warn};

const NO_CHATS_SIDEBAR_TEXT: &str = "No chats yet";

/// Which screen the terminal shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    Chat,
}

/// Sidebar chat row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRowView {
    pub chat_id: ChatId,
    pub title: String,
    pub created: String,
    pub is_active: bool,
}

/// Full UI snapshot emitted after state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub screen: Screen,
    pub lifecycle: ClientLifecycleState,
    pub login_error: Option<String>,
    pub group_name: Option<String>,
    pub passcode: Option<String>,
    pub chats: Vec<ChatRowView>,
    /// Shown in place of the chat list when it is empty or failed to load.
    pub chat_list_notice: Option<String>,
    pub active_chat_id: Option<ChatId>,
    pub title: String,
    pub pane: Vec<PaneItem>,
    pub send_enabled: bool,
    pub attachment: Option<String>,
    pub notice: Option<String>,
    pub message_poller_running: bool,
    pub chat_poller_running: bool,
}

/// Mutable view state fed by runtime events.
#[derive(Debug, Clone)]
pub struct ClientViewState {
    pane_max_items: usize,
    screen: Screen,
    lifecycle: ClientLifecycleState,
    login_error: Option<String>,
    group_name: Option<String>,
    passcode: Option<String>,
    chats: Vec<ChatSummary>,
    chat_list_error: Option<String>,
    active_chat_id: Option<ChatId>,
    title: String,
    pane: Vec<PaneItem>,
    send_enabled: bool,
    attachment: Option<String>,
    notice: Option<String>,
    message_poller_running: bool,
    chat_poller_running: bool,
}

impl ClientViewState {
    pub fn new(pane_max_items: usize) -> Self {
        Self {
            pane_max_items: pane_max_items.max(1),
            screen: Screen::Login,
            lifecycle: ClientLifecycleState::Cold,
            login_error: None,
            group_name: None,
            passcode: None,
            chats: Vec::new(),
            chat_list_error: None,
            active_chat_id: None,
            title: String::new(),
            pane: Vec::new(),
            send_enabled: false,
            attachment: None,
            notice: None,
            message_poller_running: false,
            chat_poller_running: false,
        }
    }

    /// Current immutable snapshot for rendering.
    pub fn snapshot(&self) -> ViewSnapshot {
        let chat_list_notice = match (&self.chat_list_error, self.chats.is_empty()) {
            (Some(error), _) => Some(error.clone()),
            (None, true) if self.screen == Screen::Chat => Some(NO_CHATS_SIDEBAR_TEXT.to_owned()),
            _ => None,
        };

        ViewSnapshot {
            screen: self.screen,
            lifecycle: self.lifecycle,
            login_error: self.login_error.clone(),
            group_name: self.group_name.clone(),
            passcode: self.passcode.clone(),
            chats: self
                .chats
                .iter()
                .map(|chat| ChatRowView {
                    chat_id: chat.chat_id,
                    title: chat.title.clone(),
                    created: created_label(chat.timestamp, &Local),
                    is_active: self.active_chat_id == Some(chat.chat_id),
                })
                .collect(),
            chat_list_notice,
            active_chat_id: self.active_chat_id,
            title: self.title.clone(),
            pane: self.pane.clone(),
            send_enabled: self.send_enabled,
            attachment: self.attachment.clone(),
            notice: self.notice.clone(),
            message_poller_running: self.message_poller_running,
            chat_poller_running: self.chat_poller_running,
        }
    }

    /// Chat ID shown at a 1-based sidebar position.
    pub fn chat_id_at(&self, position: usize) -> Option<ChatId> {
        position
            .checked_sub(1)
            .and_then(|index| self.chats.get(index))
            .map(|chat| chat.chat_id)
    }

    /// Most recent assistant reply in the pane.
    pub fn last_assistant_reply(&self) -> Option<&PaneItem> {
        self.pane
            .iter()
            .rev()
            .find(|item| item.kind == PaneItemKind::Message && item.sender == Sender::Assistant)
    }

    /// Code blocks of the most recent assistant reply.
    pub fn last_code_blocks(&self) -> &[CodeBlock] {
        self.last_assistant_reply()
            .map(|item| item.code_blocks.as_slice())
            .unwrap_or_default()
    }

    /// Set a one-shot notice line (clipboard feedback, local errors).
    pub fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
    }

    /// Remove and return the pending notice.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    /// Feed one runtime event into the reducer.
    pub fn handle_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::StateChanged { state } => {
                self.lifecycle = state;
            }
            ClientEvent::JoinResult {
                success,
                session,
                error_message,
            } => {
                if success {
                    self.screen = Screen::Chat;
                    self.login_error = None;
                    if let Some(session) = session {
                        self.group_name = Some(session.group_name);
                        self.passcode = Some(session.passcode);
                    }
                } else {
                    self.login_error = error_message;
                }
            }
            ClientEvent::SessionInfoLoaded {
                group_name,
                passcode,
            } => {
                self.group_name = Some(group_name);
                self.passcode = Some(passcode);
            }
            ClientEvent::ChatListUpdated {
                chats,
                active_chat_id,
            } => {
                debug!(chat_count = chats.len(), "chat list replaced");
                self.chats = chats;
                self.chat_list_error = None;
                self.active_chat_id = active_chat_id;
            }
            ClientEvent::ChatListFailed { message } => {
                warn!(%message, "chat list failed to load");
                self.chats.clear();
                self.chat_list_error = Some(message);
            }
            ClientEvent::ChatSelected { chat_id } => {
                debug!(?chat_id, "view selected chat");
                self.active_chat_id = chat_id;
                self.pane.clear();
            }
            ClientEvent::ChatTitleChanged { title } => {
                self.title = title;
            }
            ClientEvent::PaneDelta { chat_id, ops } => {
                if chat_id.is_some() && chat_id != self.active_chat_id {
                    trace!(?chat_id, "dropping pane delta for inactive chat");
                    return;
                }
                apply_pane_lenient(&mut self.pane, &ops);
                trim_front(&mut self.pane, self.pane_max_items);
            }
            ClientEvent::SendControl { enabled } => {
                self.send_enabled = enabled;
            }
            ClientEvent::SendRejected { reason } => {
                if let Some(text) = rejection_text(reason) {
                    self.notice = Some(text.to_owned());
                }
            }
            ClientEvent::AttachmentChanged { mime_type, .. } => {
                self.attachment = mime_type;
            }
            ClientEvent::PollerStatus(PollerStatus { poller, running }) => match poller {
                PollerKind::Messages => self.message_poller_running = running,
                PollerKind::Chats => self.chat_poller_running = running,
            },
            ClientEvent::Alert { message } => {
                self.notice = Some(message);
            }
            ClientEvent::CommandFailed { code, message } => {
                warn!(%code, %message, "runtime refused command");
                self.notice = Some(format!("{code}: {message}"));
            }
        }
    }
}

/// Sidebar hover text for a chat creation time.
pub fn created_label<Tz: TimeZone>(timestamp: Option<i64>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let local = timestamp
        .filter(|ts| *ts > 0)
        .and_then(|ts| DateTime::from_timestamp(ts, 0))
        .map(|utc| utc.with_timezone(tz));

    match local {
        Some(at) => format!(
            "Created: {} at {}",
            at.format("%-m/%-d/%Y"),
            at.format("%H:%M")
        ),
        None => "Created: N/A at N/A".to_owned(),
    }
}

fn rejection_text(reason: SendRejection) -> Option<&'static str> {
    match reason {
        SendRejection::Empty => None,
        SendRejection::NoChatSelected => Some("Open or create a chat first."),
        SendRejection::InFlight => Some("Still waiting for the previous response."),
    }
}

fn apply_pane_lenient(items: &mut Vec<PaneItem>, ops: &[PaneOp]) {
    for op in ops {
        match op {
            PaneOp::Append(item) => items.push(item.clone()),
            PaneOp::Remove { key } => {
                if let Some(index) = items
                    .iter()
                    .position(|item| item.key.as_deref() == Some(key.as_str()))
                {
                    items.remove(index);
                }
            }
            PaneOp::Clear => items.clear(),
        }
    }
}

fn trim_front(items: &mut Vec<PaneItem>, max_items: usize) {
    if items.len() > max_items {
        let excess = items.len() - max_items;
        items.drain(0..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use groupchat_core::{SessionInfo, types::LOADING_INDICATOR_KEY};

    fn chat(chat_id: ChatId, timestamp: Option<i64>) -> ChatSummary {
        ChatSummary {
            chat_id,
            title: format!("Chat {chat_id}"),
            timestamp,
        }
    }

    fn joined_state() -> ClientViewState {
        let mut state = ClientViewState::new(10);
        state.handle_event(ClientEvent::JoinResult {
            success: true,
            session: Some(SessionInfo {
                session_id: 1,
                chat_id: 10,
                group_name: "Team".into(),
                passcode: "ABCD".into(),
            }),
            error_message: None,
        });
        state.handle_event(ClientEvent::ChatListUpdated {
            chats: vec![chat(10, Some(1_000)), chat(20, None)],
            active_chat_id: Some(10),
        });
        state.handle_event(ClientEvent::ChatSelected { chat_id: Some(10) });
        state
    }

    #[test]
    fn failed_join_stays_on_login_with_error() {
        let mut state = ClientViewState::new(10);
        state.handle_event(ClientEvent::JoinResult {
            success: false,
            session: None,
            error_message: Some("Invalid passcode".into()),
        });

        let snapshot = state.snapshot();
        assert_eq!(snapshot.screen, Screen::Login);
        assert_eq!(snapshot.login_error.as_deref(), Some("Invalid passcode"));
    }

    #[test]
    fn successful_join_switches_screen_and_marks_active_chat() {
        let snapshot = joined_state().snapshot();
        assert_eq!(snapshot.screen, Screen::Chat);
        assert_eq!(snapshot.group_name.as_deref(), Some("Team"));
        assert_eq!(snapshot.chats.len(), 2);
        assert!(snapshot.chats[0].is_active);
        assert!(!snapshot.chats[1].is_active);
        assert_eq!(snapshot.chats[1].created, "Created: N/A at N/A");
        assert_eq!(snapshot.chat_list_notice, None);
    }

    #[test]
    fn empty_chat_list_shows_sidebar_notice() {
        let mut state = joined_state();
        state.handle_event(ClientEvent::ChatListUpdated {
            chats: Vec::new(),
            active_chat_id: None,
        });
        assert_eq!(
            state.snapshot().chat_list_notice.as_deref(),
            Some(NO_CHATS_SIDEBAR_TEXT)
        );

        state.handle_event(ClientEvent::ChatListFailed {
            message: "Error loading chats".into(),
        });
        assert_eq!(
            state.snapshot().chat_list_notice.as_deref(),
            Some("Error loading chats")
        );
    }

    #[test]
    fn created_label_formats_positive_timestamps_only() {
        assert_eq!(
            created_label(Some(1_700_000_000), &Utc),
            "Created: 11/14/2023 at 22:13"
        );
        assert_eq!(created_label(Some(0), &Utc), "Created: N/A at N/A");
        assert_eq!(created_label(Some(-5), &Utc), "Created: N/A at N/A");
        assert_eq!(created_label(None, &Utc), "Created: N/A at N/A");
    }

    #[test]
    fn pane_delta_is_applied_leniently_and_trimmed() {
        let mut state = joined_state();
        state.handle_event(ClientEvent::PaneDelta {
            chat_id: Some(10),
            ops: vec![PaneOp::Remove {
                key: LOADING_INDICATOR_KEY.into(),
            }],
        });
        assert!(state.snapshot().pane.is_empty());

        let ops = (0..12)
            .map(|i| PaneOp::Append(PaneItem::error(format!("line {i}"))))
            .collect();
        state.handle_event(ClientEvent::PaneDelta {
            chat_id: Some(10),
            ops,
        });

        let pane = state.snapshot().pane;
        assert_eq!(pane.len(), 10);
        assert_eq!(pane[0].text, "line 2");
    }

    #[test]
    fn pane_delta_for_other_chat_is_ignored() {
        let mut state = joined_state();
        state.handle_event(ClientEvent::PaneDelta {
            chat_id: Some(20),
            ops: vec![PaneOp::Append(PaneItem::error("stale"))],
        });
        assert!(state.snapshot().pane.is_empty());
    }

    #[test]
    fn chat_selection_clears_pane() {
        let mut state = joined_state();
        state.handle_event(ClientEvent::PaneDelta {
            chat_id: Some(10),
            ops: vec![PaneOp::Append(PaneItem::user_echo("hi", None))],
        });
        state.handle_event(ClientEvent::ChatSelected { chat_id: Some(20) });

        let snapshot = state.snapshot();
        assert!(snapshot.pane.is_empty());
        assert_eq!(snapshot.active_chat_id, Some(20));
    }

    #[test]
    fn last_reply_exposes_code_blocks() {
        let mut state = joined_state();
        state.handle_event(ClientEvent::PaneDelta {
            chat_id: Some(10),
            ops: vec![
                PaneOp::Append(PaneItem::assistant_reply("first")),
                PaneOp::Append(PaneItem::assistant_reply("run:\n```sh\nls -la\n```\n")),
                PaneOp::Append(PaneItem::user_echo("thanks", None)),
            ],
        });

        let reply = state.last_assistant_reply().expect("reply should exist");
        assert!(reply.text.starts_with("run:"));
        let blocks = state.last_code_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code, "ls -la");
    }

    #[test]
    fn chat_id_at_uses_one_based_positions() {
        let state = joined_state();
        assert_eq!(state.chat_id_at(0), None);
        assert_eq!(state.chat_id_at(1), Some(10));
        assert_eq!(state.chat_id_at(2), Some(20));
        assert_eq!(state.chat_id_at(3), None);
    }

    #[test]
    fn alerts_and_rejections_become_notices() {
        let mut state = joined_state();
        state.handle_event(ClientEvent::SendRejected {
            reason: SendRejection::Empty,
        });
        assert_eq!(state.take_notice(), None);

        state.handle_event(ClientEvent::SendRejected {
            reason: SendRejection::InFlight,
        });
        assert!(state.take_notice().is_some());

        state.handle_event(ClientEvent::Alert {
            message: "Failed to delete chat: locked".into(),
        });
        assert_eq!(
            state.take_notice().as_deref(),
            Some("Failed to delete chat: locked")
        );
        assert_eq!(state.take_notice(), None);
    }
}
