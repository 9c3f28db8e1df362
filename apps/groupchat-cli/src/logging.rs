//! Tracing/logging bootstrap for the terminal client.

use std::env;

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,groupchat_cli=info,groupchat_client=info";

/// Initialize the global tracing subscriber, writing to stderr.
///
/// Precedence:
/// 1) `RUST_LOG`
/// 2) `GROUPCHAT_CLI_LOG`
/// 3) `GROUPCHAT_LOG`
/// 4) internal default filter
pub fn init() {
    let env_filter = filter_from_env();
    let _ = tracing_subscriber::fmt()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .try_init();
}

fn filter_from_env() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    for key in ["GROUPCHAT_CLI_LOG", "GROUPCHAT_LOG"] {
        if let Some(value) = env::var(key).ok().filter(|v| !v.trim().is_empty())
            && let Ok(filter) = EnvFilter::try_new(value)
        {
            return filter;
        }
    }

    EnvFilter::new(DEFAULT_FILTER)
}
