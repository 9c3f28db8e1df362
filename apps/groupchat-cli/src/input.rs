//! Line-oriented command parsing for the terminal client.

use std::path::PathBuf;

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Join(String),
    NewChat,
    OpenChat(usize),
    DeleteChat(usize),
    AttachImage(PathBuf),
    ClearImage,
    CopyReply,
    CopyCode(usize),
    Hide,
    Show,
    ListChats,
    Help,
    Quit,
    Send(String),
    Nothing,
    /// Malformed slash command with a usage hint.
    Invalid(String),
}

pub const HELP_TEXT: &str = "\
commands:
  /join <passcode>   join a session
  /new               start a new chat
  /chats             refresh and list chats
  /open <n>          open chat number n
  /delete <n>        delete chat number n
  /image <path>      attach an image to the next message
  /clear-image       drop the attached image
  /copy              copy the last response
  /copy-code <n>     copy code block n of the last response
  /hide, /show       pause or resume background polling
  /help              show this help
  /quit              exit
anything else is sent as a message";

/// Parse one input line.
///
/// Lines starting with `//` send the rest (with one slash) as a message.
pub fn parse_line(line: &str) -> UserAction {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return UserAction::Nothing;
    }
    if let Some(escaped) = trimmed.strip_prefix("//") {
        return UserAction::Send(format!("/{escaped}"));
    }
    let Some(command) = trimmed.strip_prefix('/') else {
        return UserAction::Send(trimmed.to_owned());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name {
        "join" if !arg.is_empty() => UserAction::Join(arg.to_owned()),
        "join" => UserAction::Invalid("usage: /join <passcode>".into()),
        "new" => UserAction::NewChat,
        "chats" => UserAction::ListChats,
        "open" => position(arg, "/open <n>").map_or_else(UserAction::Invalid, UserAction::OpenChat),
        "delete" => {
            position(arg, "/delete <n>").map_or_else(UserAction::Invalid, UserAction::DeleteChat)
        }
        "image" if !arg.is_empty() => UserAction::AttachImage(PathBuf::from(arg)),
        "image" => UserAction::Invalid("usage: /image <path>".into()),
        "clear-image" => UserAction::ClearImage,
        "copy" => UserAction::CopyReply,
        "copy-code" => {
            position(arg, "/copy-code <n>").map_or_else(UserAction::Invalid, UserAction::CopyCode)
        }
        "hide" => UserAction::Hide,
        "show" => UserAction::Show,
        "help" => UserAction::Help,
        "quit" | "exit" => UserAction::Quit,
        other => UserAction::Invalid(format!("unknown command /{other}; try /help")),
    }
}

/// Whether a `y/N` confirmation answer means yes.
pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn position(arg: &str, usage: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(format!("usage: {usage} (n starts at 1)")),
    }
}
