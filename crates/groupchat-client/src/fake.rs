use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use groupchat_core::{
    ChatId, ChatMessage, ChatSummary, ChatTranscript, ClientError, ErrorCategory, JoinedSession,
    NewChatsPoll, NewMessagesPoll, SendMessageRequest, SessionDetails, SessionId,
};

use crate::api::ChatApi;

/// Request recorded by the in-memory server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApiCall {
    Join(String),
    SessionInfo(SessionId),
    ListChats(SessionId),
    NewChat(SessionId),
    DeleteChat(ChatId),
    Messages(ChatId),
    CheckNewMessages { chat_id: ChatId, last_check: i64 },
    CheckNewChats { session_id: SessionId, last_check: i64 },
    SendMessage(SendMessageRequest),
}

#[derive(Debug, Clone)]
pub(crate) enum SendBehavior {
    Reply(String),
    /// Reply once the (tokio) clock has moved on by the delay.
    ReplyAfter(Duration, String),
    Fail(ClientError),
    Hang,
}

#[derive(Debug)]
struct FakeState {
    passcode: String,
    session: JoinedSession,
    chats: Vec<ChatSummary>,
    transcripts: HashMap<ChatId, ChatTranscript>,
    message_polls: VecDeque<NewMessagesPoll>,
    new_chats: NewChatsPoll,
    next_chat_id: ChatId,
    send: SendBehavior,
    queued_sends: VecDeque<SendBehavior>,
    delete_error: Option<ClientError>,
    calls: Vec<ApiCall>,
}

/// In-memory `ChatApi` used by runtime tests.
#[derive(Debug)]
pub(crate) struct FakeChatApi {
    state: Mutex<FakeState>,
}

impl FakeChatApi {
    /// Server with one session `1` ("Team", passcode "ABCD") whose initial chat `10` is empty.
    pub(crate) fn new() -> Self {
        let mut transcripts = HashMap::new();
        transcripts.insert(
            10,
            ChatTranscript {
                title: Some("New Chat".into()),
                messages: Vec::new(),
            },
        );

        Self {
            state: Mutex::new(FakeState {
                passcode: "ABCD".into(),
                session: JoinedSession {
                    session_id: 1,
                    chat_id: 10,
                    group_name: "Team".into(),
                },
                chats: vec![ChatSummary {
                    chat_id: 10,
                    title: "New Chat".into(),
                    timestamp: Some(1_000),
                }],
                transcripts,
                message_polls: VecDeque::new(),
                new_chats: NewChatsPoll::default(),
                next_chat_id: 11,
                send: SendBehavior::Reply("hello from the assistant".into()),
                queued_sends: VecDeque::new(),
                delete_error: None,
                calls: Vec::new(),
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        let mut state = self.state.lock().expect("fake state lock poisoned");
        f(&mut state)
    }

    /// Add a chat (appended in server order) with its messages.
    pub(crate) fn add_chat(&self, chat_id: ChatId, timestamp: i64, messages: Vec<ChatMessage>) {
        self.with_state(|state| {
            state.chats.push(ChatSummary {
                chat_id,
                title: format!("Chat {chat_id}"),
                timestamp: Some(timestamp),
            });
            state.transcripts.insert(
                chat_id,
                ChatTranscript {
                    title: Some(format!("Chat {chat_id}")),
                    messages,
                },
            );
        });
    }

    pub(crate) fn set_messages(&self, chat_id: ChatId, messages: Vec<ChatMessage>) {
        self.with_state(|state| {
            state
                .transcripts
                .entry(chat_id)
                .or_default()
                .messages = messages;
        });
    }

    pub(crate) fn push_message_poll(&self, poll: NewMessagesPoll) {
        self.with_state(|state| state.message_polls.push_back(poll));
    }

    pub(crate) fn set_send_behavior(&self, send: SendBehavior) {
        self.with_state(|state| state.send = send);
    }

    /// Behaviour for the next send only; later sends fall back to `set_send_behavior`.
    pub(crate) fn push_send_behavior(&self, send: SendBehavior) {
        self.with_state(|state| state.queued_sends.push_back(send));
    }

    pub(crate) fn set_new_chats(&self, poll: NewChatsPoll) {
        self.with_state(|state| state.new_chats = poll);
    }

    pub(crate) fn set_delete_error(&self, error: ClientError) {
        self.with_state(|state| state.delete_error = Some(error));
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.with_state(|state| state.calls.clone())
    }

    fn record(&self, call: ApiCall) {
        self.with_state(|state| state.calls.push(call));
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn join_session(&self, passcode: &str) -> Result<JoinedSession, ClientError> {
        self.record(ApiCall::Join(passcode.to_owned()));
        self.with_state(|state| {
            if state.passcode == passcode {
                Ok(state.session.clone())
            } else {
                Err(ClientError::rejected("Invalid passcode").with_status(401))
            }
        })
    }

    async fn session_info(&self, session_id: SessionId) -> Result<SessionDetails, ClientError> {
        self.record(ApiCall::SessionInfo(session_id));
        self.with_state(|state| {
            Ok(SessionDetails {
                group_name: state.session.group_name.clone(),
                passcode: state.passcode.clone(),
            })
        })
    }

    async fn list_chats(&self, session_id: SessionId) -> Result<Vec<ChatSummary>, ClientError> {
        self.record(ApiCall::ListChats(session_id));
        self.with_state(|state| Ok(state.chats.clone()))
    }

    async fn new_chat(&self, session_id: SessionId) -> Result<ChatId, ClientError> {
        self.record(ApiCall::NewChat(session_id));
        self.with_state(|state| {
            let chat_id = state.next_chat_id;
            state.next_chat_id += 1;
            state.chats.insert(
                0,
                ChatSummary {
                    chat_id,
                    title: "New Chat".into(),
                    timestamp: Some(2_000),
                },
            );
            state.transcripts.insert(chat_id, ChatTranscript::default());
            Ok(chat_id)
        })
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ClientError> {
        self.record(ApiCall::DeleteChat(chat_id));
        self.with_state(|state| {
            if let Some(err) = state.delete_error.clone() {
                return Err(err);
            }
            state.chats.retain(|chat| chat.chat_id != chat_id);
            state.transcripts.remove(&chat_id);
            Ok(())
        })
    }

    async fn messages(&self, chat_id: ChatId) -> Result<ChatTranscript, ClientError> {
        self.record(ApiCall::Messages(chat_id));
        self.with_state(|state| {
            state.transcripts.get(&chat_id).cloned().ok_or_else(|| {
                ClientError::rejected("Chat not found").with_status(404)
            })
        })
    }

    async fn check_new_messages(
        &self,
        chat_id: ChatId,
        last_check: i64,
    ) -> Result<NewMessagesPoll, ClientError> {
        self.record(ApiCall::CheckNewMessages {
            chat_id,
            last_check,
        });
        self.with_state(|state| {
            Ok(state.message_polls.pop_front().unwrap_or(NewMessagesPoll {
                has_new_messages: false,
                new_messages: Vec::new(),
                current_time: Some(last_check),
            }))
        })
    }

    async fn check_new_chats(
        &self,
        session_id: SessionId,
        last_check: i64,
    ) -> Result<NewChatsPoll, ClientError> {
        self.record(ApiCall::CheckNewChats {
            session_id,
            last_check,
        });
        self.with_state(|state| Ok(state.new_chats.clone()))
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<String, ClientError> {
        self.record(ApiCall::SendMessage(request));
        let behavior = self.with_state(|state| {
            state
                .queued_sends
                .pop_front()
                .unwrap_or_else(|| state.send.clone())
        });
        match behavior {
            SendBehavior::Reply(text) => Ok(text),
            SendBehavior::ReplyAfter(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            SendBehavior::Fail(err) => Err(err),
            SendBehavior::Hang => {
                std::future::pending::<()>().await;
                Err(ClientError::new(
                    ErrorCategory::Internal,
                    "unreachable",
                    "pending future resolved",
                ))
            }
        }
    }
}
