use std::time::Duration;

use async_trait::async_trait;
use groupchat_core::{
    ChatId, ChatSummary, ChatTranscript, ClientError, DeleteChatResult, ErrorCategory,
    JoinedSession, NewChatCreated, NewChatsPoll, NewMessagesPoll, SendMessageReply,
    SendMessageRequest, SessionDetails, SessionId, classify_http_status,
};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, trace};
use url::Url;

use crate::api::ChatApi;

#[derive(Debug, Clone)]
pub struct HttpChatApiConfig {
    pub base_url: String,
    /// Transport-level timeout for every request.
    pub request_timeout: Duration,
}

impl HttpChatApiConfig {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout,
        }
    }
}

/// `ChatApi` over the group chat server's JSON endpoints.
#[derive(Debug, Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Serialize)]
struct JoinSessionBody<'a> {
    passcode: &'a str,
}

#[derive(Debug, Serialize)]
struct NewChatBody {
    session_id: SessionId,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

impl HttpChatApi {
    pub fn new(config: HttpChatApiConfig) -> Result<Self, ClientError> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| {
                ClientError::new(ErrorCategory::Config, "http_client_build_error", err.to_string())
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        trace!(%url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_response(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ClientError> {
        trace!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        decode_response(response).await
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn join_session(&self, passcode: &str) -> Result<JoinedSession, ClientError> {
        let url = endpoint(&self.base_url, "join_session")?;
        self.post_json(url, &JoinSessionBody { passcode }).await
    }

    async fn session_info(&self, session_id: SessionId) -> Result<SessionDetails, ClientError> {
        let url = endpoint(&self.base_url, &format!("get_session_info/{session_id}"))?;
        self.get_json(url).await
    }

    async fn list_chats(&self, session_id: SessionId) -> Result<Vec<ChatSummary>, ClientError> {
        let url = endpoint(&self.base_url, &format!("get_chats/{session_id}"))?;
        self.get_json(url).await
    }

    async fn new_chat(&self, session_id: SessionId) -> Result<ChatId, ClientError> {
        let url = endpoint(&self.base_url, "new_chat_in_session")?;
        let created: NewChatCreated = self.post_json(url, &NewChatBody { session_id }).await?;
        Ok(created.chat_id)
    }

    async fn delete_chat(&self, chat_id: ChatId) -> Result<(), ClientError> {
        let url = endpoint(&self.base_url, &format!("delete_chat/{chat_id}"))?;
        let result: DeleteChatResult = self.post_json(url, &serde_json::json!({})).await?;
        if result.success {
            Ok(())
        } else {
            Err(ClientError::rejected(result.error.unwrap_or_default()))
        }
    }

    async fn messages(&self, chat_id: ChatId) -> Result<ChatTranscript, ClientError> {
        let url = endpoint(&self.base_url, &format!("get_messages/{chat_id}"))?;
        self.get_json(url).await
    }

    async fn check_new_messages(
        &self,
        chat_id: ChatId,
        last_check: i64,
    ) -> Result<NewMessagesPoll, ClientError> {
        let url = poll_endpoint(
            &self.base_url,
            &format!("check_new_messages/{chat_id}"),
            last_check,
        )?;
        self.get_json(url).await
    }

    async fn check_new_chats(
        &self,
        session_id: SessionId,
        last_check: i64,
    ) -> Result<NewChatsPoll, ClientError> {
        let url = poll_endpoint(
            &self.base_url,
            &format!("check_new_chats/{session_id}"),
            last_check,
        )?;
        self.get_json(url).await
    }

    async fn send_message(&self, request: SendMessageRequest) -> Result<String, ClientError> {
        let url = endpoint(&self.base_url, "send_message")?;
        debug!(
            chat_id = request.chat_id,
            has_image = request.image_data.is_some(),
            "sending message"
        );
        let reply: SendMessageReply = self.post_json(url, &request).await?;
        reply_text(reply)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(raw.trim()).map_err(|err| {
        ClientError::new(
            ErrorCategory::Config,
            "invalid_base_url",
            format!("invalid server URL '{raw}': {err}"),
        )
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::new(
            ErrorCategory::Config,
            "invalid_base_url",
            format!("server URL must use http or https, got '{}'", url.scheme()),
        ));
    }

    // Relative joins replace the last path segment unless the base ends in '/'.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn endpoint(base: &Url, path: &str) -> Result<Url, ClientError> {
    base.join(path).map_err(|err| {
        ClientError::new(
            ErrorCategory::Internal,
            "invalid_endpoint",
            format!("cannot build endpoint '{path}': {err}"),
        )
    })
}

fn poll_endpoint(base: &Url, path: &str, last_check: i64) -> Result<Url, ClientError> {
    let mut url = endpoint(base, path)?;
    url.query_pairs_mut()
        .append_pair("last_check", &last_check.to_string());
    Ok(url)
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(map_transport_error)?;

    if !(200..300).contains(&status) {
        return Err(error_from_status(status, &body));
    }

    serde_json::from_slice(&body).map_err(|err| {
        ClientError::new(
            ErrorCategory::Serialization,
            "invalid_response_body",
            err.to_string(),
        )
        .with_status(status)
    })
}

fn error_from_status(status: u16, body: &[u8]) -> ClientError {
    if let Ok(ErrorBody {
        error: Some(message),
    }) = serde_json::from_slice::<ErrorBody>(body)
        && !message.trim().is_empty()
    {
        return ClientError::rejected(message).with_status(status);
    }

    ClientError::new(
        classify_http_status(status),
        format!("http_{status}"),
        format!("server responded with status {status}"),
    )
    .with_status(status)
}

fn reply_text(reply: SendMessageReply) -> Result<String, ClientError> {
    if let Some(error) = reply.error {
        return Err(ClientError::rejected(error));
    }
    reply.response.ok_or_else(|| {
        ClientError::new(
            ErrorCategory::Serialization,
            "missing_response",
            "send reply had neither 'response' nor 'error'",
        )
    })
}

fn map_transport_error(err: reqwest::Error) -> ClientError {
    let category = if err.is_decode() {
        ErrorCategory::Serialization
    } else {
        ErrorCategory::Network
    };
    let code = if err.is_timeout() {
        "request_timeout"
    } else {
        "request_failed"
    };
    let mapped = ClientError::new(category, code, err.to_string());
    match err.status() {
        Some(status) => mapped.with_status(status.as_u16()),
        None => mapped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_endpoints_under_base_path() {
        let base = parse_base_url("http://127.0.0.1:5000").expect("base url should parse");
        assert_eq!(
            endpoint(&base, "get_chats/7").expect("endpoint").as_str(),
            "http://127.0.0.1:5000/get_chats/7"
        );

        let nested = parse_base_url("https://chat.example.org/api").expect("base url should parse");
        assert_eq!(
            endpoint(&nested, "join_session").expect("endpoint").as_str(),
            "https://chat.example.org/api/join_session"
        );
    }

    #[test]
    fn poll_endpoints_carry_last_check() {
        let base = parse_base_url("http://localhost:5000/").expect("base url should parse");
        let url = poll_endpoint(&base, "check_new_messages/10", 100).expect("endpoint");
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/check_new_messages/10?last_check=100"
        );
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = parse_base_url("ftp://example.org").expect_err("ftp must be rejected");
        assert_eq!(err.code, "invalid_base_url");
        parse_base_url("not a url").expect_err("garbage must be rejected");
    }

    #[test]
    fn non_ok_status_with_error_field_is_rejected() {
        let err = error_from_status(401, br#"{"error":"Invalid passcode"}"#);
        assert_eq!(err.category, ErrorCategory::Rejected);
        assert_eq!(err.message, "Invalid passcode");
        assert_eq!(err.status, Some(401));
    }

    #[test]
    fn non_ok_status_without_error_field_is_classified() {
        let err = error_from_status(502, b"<html>bad gateway</html>");
        assert_eq!(err.category, ErrorCategory::Server);
        assert_eq!(err.code, "http_502");

        let err = error_from_status(404, br#"{"error":""}"#);
        assert_eq!(err.category, ErrorCategory::Config);
    }

    #[test]
    fn send_reply_prefers_error_field() {
        let err = reply_text(SendMessageReply {
            response: None,
            error: Some("Chat not found".into()),
        })
        .expect_err("error field must fail");
        assert_eq!(err.category, ErrorCategory::Rejected);

        let text = reply_text(SendMessageReply {
            response: Some("hi".into()),
            error: None,
        })
        .expect("response should be accepted");
        assert_eq!(text, "hi");

        let err = reply_text(SendMessageReply::default()).expect_err("empty reply must fail");
        assert!(err.is_transport());
    }
}
