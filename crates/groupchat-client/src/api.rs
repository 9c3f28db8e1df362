use async_trait::async_trait;
use groupchat_core::{
    ChatId, ChatSummary, ChatTranscript, ClientError, JoinedSession, NewChatsPoll,
    NewMessagesPoll, SendMessageRequest, SessionDetails, SessionId,
};

/// Server operations the client runtime depends on.
///
/// Application failures (the server answered with an `error` field) come back
/// as `ErrorCategory::Rejected` carrying the server's text; failures below the
/// HTTP layer come back as `Network` or `Serialization`.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn join_session(&self, passcode: &str) -> Result<JoinedSession, ClientError>;

    async fn session_info(&self, session_id: SessionId) -> Result<SessionDetails, ClientError>;

    /// Chats of a session, newest first.
    async fn list_chats(&self, session_id: SessionId) -> Result<Vec<ChatSummary>, ClientError>;

    /// Create a chat and return its id.
    async fn new_chat(&self, session_id: SessionId) -> Result<ChatId, ClientError>;

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ClientError>;

    async fn messages(&self, chat_id: ChatId) -> Result<ChatTranscript, ClientError>;

    async fn check_new_messages(
        &self,
        chat_id: ChatId,
        last_check: i64,
    ) -> Result<NewMessagesPoll, ClientError>;

    async fn check_new_chats(
        &self,
        session_id: SessionId,
        last_check: i64,
    ) -> Result<NewChatsPoll, ClientError>;

    /// Send a message and wait for the assistant's reply text.
    async fn send_message(&self, request: SendMessageRequest) -> Result<String, ClientError>;
}
