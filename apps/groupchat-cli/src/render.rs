//! Plain line renderer: turns successive snapshots into terminal output.

use groupchat_core::{ClientLifecycleState, PaneItem, PaneItemKind, Sender};
use tracing::debug;

use crate::state::{Screen, ViewSnapshot};

/// Remembers the last snapshot and prints only what changed.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    previous: Option<ViewSnapshot>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for `snapshot` given what was shown before.
    pub fn render(&mut self, snapshot: &ViewSnapshot) -> Vec<String> {
        let mut lines = Vec::new();
        let previous = self.previous.take();
        let prev = previous.as_ref();

        if snapshot.lifecycle == ClientLifecycleState::Joining
            && prev.is_some_and(|p| p.lifecycle != ClientLifecycleState::Joining)
        {
            lines.push("Joining...".to_owned());
        }

        if prev.is_none_or(|p| {
            p.message_poller_running != snapshot.message_poller_running
                || p.chat_poller_running != snapshot.chat_poller_running
        }) {
            debug!(
                messages = snapshot.message_poller_running,
                chats = snapshot.chat_poller_running,
                "poller status"
            );
        }

        if snapshot.screen == Screen::Chat && prev.is_none_or(|p| p.screen != Screen::Chat) {
            lines.push(format!(
                "Joined {}. Passcode: {}",
                snapshot.group_name.as_deref().unwrap_or("session"),
                snapshot.passcode.as_deref().unwrap_or("?")
            ));
        }

        if let Some(error) = &snapshot.login_error
            && prev.is_none_or(|p| p.login_error.as_ref() != Some(error))
        {
            lines.push(format!("Login failed: {error}"));
        }

        let list_changed = prev.is_none_or(|p| {
            p.chats != snapshot.chats || p.chat_list_notice != snapshot.chat_list_notice
        });
        if list_changed && snapshot.screen == Screen::Chat {
            lines.extend(chat_list_lines(snapshot));
        }

        let chat_changed = prev.is_none_or(|p| p.active_chat_id != snapshot.active_chat_id);
        if !snapshot.title.is_empty()
            && (chat_changed || prev.is_none_or(|p| p.title != snapshot.title))
        {
            lines.push(format!("== {} ==", snapshot.title));
        }

        let shown = match prev {
            Some(p) if !chat_changed => common_prefix(&p.pane, &snapshot.pane),
            _ => 0,
        };
        lines.extend(snapshot.pane[shown..].iter().map(pane_line));

        if prev.is_none_or(|p| p.attachment != snapshot.attachment) {
            match (&snapshot.attachment, prev.and_then(|p| p.attachment.as_ref())) {
                (Some(mime), _) => lines.push(format!("Attached {mime}")),
                (None, Some(_)) => lines.push("Attachment cleared".to_owned()),
                (None, None) => {}
            }
        }

        if let Some(notice) = &snapshot.notice {
            lines.push(format!("! {notice}"));
        }

        self.previous = Some(snapshot.clone());
        lines
    }
}

/// Numbered chat list; positions are what `/open` and `/delete` take.
pub fn chat_list_lines(snapshot: &ViewSnapshot) -> Vec<String> {
    if let Some(notice) = &snapshot.chat_list_notice {
        return vec![format!("Chats: {notice}")];
    }

    let mut lines = vec!["Chats:".to_owned()];
    lines.extend(snapshot.chats.iter().enumerate().map(|(index, chat)| {
        format!(
            " {} [{}] {}  ({})",
            if chat.is_active { '*' } else { ' ' },
            index + 1,
            chat.title,
            chat.created
        )
    }));
    lines
}

fn common_prefix(before: &[PaneItem], after: &[PaneItem]) -> usize {
    before
        .iter()
        .zip(after)
        .take_while(|(a, b)| a == b)
        .count()
}

fn pane_line(item: &PaneItem) -> String {
    match item.kind {
        PaneItemKind::Message => {
            let who = match item.sender {
                Sender::User => "you",
                Sender::Assistant => "assistant",
            };
            let mut line = format!("{who}: {}", item.text);
            if item.image_data_url.is_some() {
                line.push_str(" [image]");
            }
            if !item.code_blocks.is_empty() {
                line.push_str(&format!(
                    "\n  ({} code block(s), /copy-code <n> to copy)",
                    item.code_blocks.len()
                ));
            }
            line
        }
        PaneItemKind::Welcome | PaneItemKind::EmptyState => format!("* {}", item.text),
        PaneItemKind::Loading => "assistant: ...".to_owned(),
        PaneItemKind::Error => format!("error: {}", item.text),
    }
}
