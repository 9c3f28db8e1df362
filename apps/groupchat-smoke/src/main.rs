use std::{env, time::Duration};

use groupchat_client::{ChatApi, HttpChatApi, HttpChatApiConfig};

#[tokio::main]
async fn main() {
    let server_url =
        env::var("GROUPCHAT_SERVER_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_owned());

    let api = match HttpChatApi::new(HttpChatApiConfig::new(server_url, Duration::from_secs(30))) {
        Ok(api) => api,
        Err(err) => {
            eprintln!("Failed to build client: {err}");
            std::process::exit(1);
        }
    };
    println!("HTTP client ready for {}", api.base_url());

    let Ok(passcode) = env::var("GROUPCHAT_PASSCODE") else {
        println!("Set GROUPCHAT_PASSCODE to run a live join smoke.");
        return;
    };

    let joined = match api.join_session(passcode.trim()).await {
        Ok(joined) => joined,
        Err(err) => {
            eprintln!("Join failed: {err}");
            std::process::exit(1);
        }
    };
    println!(
        "Joined '{}' (session {}, chat {})",
        joined.group_name, joined.session_id, joined.chat_id
    );

    match api.list_chats(joined.session_id).await {
        Ok(chats) => {
            for chat in chats {
                println!("  chat {}: {}", chat.chat_id, chat.title);
            }
        }
        Err(err) => {
            eprintln!("Listing chats failed: {err}");
            std::process::exit(1);
        }
    }
}
