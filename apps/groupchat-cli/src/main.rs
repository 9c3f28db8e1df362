mod bridge;
mod config;
mod input;
mod logging;
mod render;
mod state;

use std::{
    io::{self, Write},
    process::ExitCode,
    sync::{Arc, Mutex, PoisonError},
};

use bridge::{CliBridge, UiUpdateCallback};
use config::CliConfig;
use groupchat_client::{HttpChatApi, HttpChatApiConfig, spawn_runtime};
use input::{HELP_TEXT, UserAction, is_confirmation, parse_line};
use render::{TerminalRenderer, chat_list_lines};
use state::ViewSnapshot;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

const DELETE_CONFIRM_PROMPT: &str =
    "Are you sure you want to delete this chat? This action cannot be undone. [y/N] ";

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    info!("starting groupchat-cli");

    let config = match CliConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            eprintln!("groupchat-cli: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        server_url = %config.server_url,
        message_poll_ms = config.message_poll_ms,
        chat_poll_ms = config.chat_poll_ms,
        "cli config loaded"
    );

    let api = match HttpChatApi::new(HttpChatApiConfig::new(
        config.server_url.as_str(),
        config.request_timeout(),
    )) {
        Ok(api) => api,
        Err(err) => {
            error!(error = %err, "failed to build http client");
            eprintln!("groupchat-cli: {err}");
            return ExitCode::FAILURE;
        }
    };
    let runtime = spawn_runtime(Arc::new(api), config.runtime_config());

    let renderer = Mutex::new(TerminalRenderer::new());
    let ui_update: UiUpdateCallback = Arc::new(move |snapshot: ViewSnapshot| {
        let lines = renderer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .render(&snapshot);
        print_lines(&lines);
    });
    let bridge = CliBridge::spawn(&config, runtime, ui_update);

    match config.passcode.clone() {
        Some(passcode) => {
            info!("joining session from GROUPCHAT_PASSCODE");
            bridge.submit_passcode(passcode);
        }
        None => println!("Enter /join <passcode> to start, /help for commands."),
    }

    if let Err(err) = run_input_loop(&bridge).await {
        error!(error = %err, "stdin read failed");
        return ExitCode::FAILURE;
    }

    info!("groupchat-cli exiting");
    ExitCode::SUCCESS
}

async fn run_input_loop(bridge: &CliBridge) -> io::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let action = parse_line(&line);
        debug!(?action, "user input");
        match action {
            UserAction::Quit => break,
            UserAction::Nothing => {}
            UserAction::Help => println!("{HELP_TEXT}"),
            UserAction::Invalid(usage) => println!("{usage}"),
            UserAction::Join(passcode) => bridge.submit_passcode(passcode),
            UserAction::NewChat => bridge.new_chat(),
            UserAction::ListChats => {
                print_lines(&chat_list_lines(&bridge.snapshot()));
                bridge.refresh_chats();
            }
            UserAction::OpenChat(position) => bridge.open_chat_at(position),
            UserAction::DeleteChat(position) => {
                let Some(chat_id) = bridge.chat_id_at(position) else {
                    println!("No chat at position {position}.");
                    continue;
                };
                print!("{DELETE_CONFIRM_PROMPT}");
                io::stdout().flush()?;
                let answer = lines.next_line().await?.unwrap_or_default();
                if is_confirmation(&answer) {
                    bridge.delete_chat(chat_id);
                }
            }
            UserAction::AttachImage(path) => bridge.attach_image(&path).await,
            UserAction::ClearImage => bridge.clear_image(),
            UserAction::CopyReply => bridge.copy_last_reply(),
            UserAction::CopyCode(position) => bridge.copy_code_block(position),
            UserAction::Hide => bridge.set_visible(false),
            UserAction::Show => bridge.set_visible(true),
            UserAction::Send(text) => bridge.send_message(text),
        }
    }

    Ok(())
}

fn print_lines(lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    for line in lines {
        let _ = writeln!(stdout, "{line}");
    }
    let _ = stdout.flush();
}
