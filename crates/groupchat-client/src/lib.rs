//! Group chat client runtime.
//!
//! A single controller task owns the session state and talks to the server
//! through [`ChatApi`]. Frontends drive it with `ClientCommand`s and observe
//! it through the `ClientEvent` broadcast stream.

pub mod api;
pub mod http;
pub mod poller;
pub mod runtime;

#[cfg(test)]
mod fake;

pub use api::ChatApi;
pub use http::{HttpChatApi, HttpChatApiConfig};
pub use poller::Poller;
pub use runtime::{ClientRuntimeHandle, spawn_runtime};
