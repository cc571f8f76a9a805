//! HTTP client for the chat backend.
//!
//! Covers the chat endpoint and the session and message REST API. Every
//! request carries the caller's ID token as a bearer token.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tripmate_core::{CoreError, SessionId, UserId};

use crate::config::ChatConfig;
use crate::error::{ChatError, Result, GENERIC_API_ERROR};
use crate::types::{
    AddMessageRequest, AddMessageResponse, ApiErrorResponse, ChatSession, CreateSessionRequest,
    Role, StoredMessage, UpdateSessionRequest,
};

/// Client for the chat backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    config: ChatConfig,
    base_url: String,
}

impl ChatClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// URL of the chat endpoint, with the session ID when there is one.
    #[must_use]
    pub fn chat_url(&self, session_id: Option<&SessionId>) -> String {
        match session_id {
            Some(id) => format!("{}{}/{id}", self.base_url, self.config.chat_path),
            None => format!("{}{}/", self.base_url, self.config.chat_path),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Build headers for authenticated requests.
    fn auth_headers(token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ChatError::Api {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: "invalid characters in auth token".to_string(),
            })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// Handle API error responses.
    async fn handle_error(response: Response) -> ChatError {
        let status = response.status().as_u16();
        let message = response
            .json::<ApiErrorResponse>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .unwrap_or_else(|| GENERIC_API_ERROR.to_string());
        tracing::warn!(status, message = %message, "Chat backend returned an error");
        ChatError::Api { status, message }
    }

    /// Send a request with a bounded timeout and return the success response.
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .timeout(self.config.request_timeout())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }
        Ok(response)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ChatError::Parse(e.to_string()))
    }

    /// Map a 404 on a session-scoped endpoint to `SessionNotFound`.
    fn session_not_found(error: ChatError, session_id: &SessionId) -> ChatError {
        match error {
            ChatError::Api { status: 404, .. } => CoreError::SessionNotFound(*session_id).into(),
            other => other,
        }
    }

    // =========================================================================
    // Chat
    // =========================================================================

    /// Post a chat message.
    ///
    /// Returns the success response with its body unread, so a streaming body
    /// can be consumed incrementally. Streaming requests are not bounded by
    /// the request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Http` if the request fails and `ChatError::Api`
    /// for a non-success status.
    pub async fn post_chat(
        &self,
        session_id: Option<&SessionId>,
        body: &serde_json::Value,
        token: &str,
    ) -> Result<Response> {
        let url = self.chat_url(session_id);
        tracing::debug!(url = %url, streaming = self.config.streaming, "Posting chat message");

        let mut request = self
            .client
            .post(&url)
            .headers(Self::auth_headers(token)?)
            .json(body);
        if !self.config.streaming {
            request = request.timeout(self.config.request_timeout());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }
        Ok(response)
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Create a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn create_session(
        &self,
        token: &str,
        title: &str,
        mood: Option<&str>,
        style: Option<&str>,
    ) -> Result<ChatSession> {
        let request = CreateSessionRequest {
            title: title.to_string(),
            mood: mood.map(str::to_string),
            style: style.map(str::to_string),
        };

        let response = self
            .execute(
                self.client
                    .post(self.url("/session"))
                    .headers(Self::auth_headers(token)?)
                    .json(&request),
            )
            .await?;
        let session: ChatSession = Self::parse(response).await?;

        tracing::info!(session_id = %session.session_id, "Created chat session");
        Ok(session)
    }

    /// Get a session.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::SessionNotFound` (wrapped) if the session does not
    /// exist or belongs to someone else.
    pub async fn get_session(&self, token: &str, session_id: &SessionId) -> Result<ChatSession> {
        let response = self
            .execute(
                self.client
                    .get(self.url(&format!("/session/{session_id}")))
                    .headers(Self::auth_headers(token)?),
            )
            .await
            .map_err(|e| Self::session_not_found(e, session_id))?;
        Self::parse(response).await
    }

    /// List the sessions of a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn list_user_sessions(&self, token: &str, uid: &UserId) -> Result<Vec<ChatSession>> {
        let response = self
            .execute(
                self.client
                    .get(self.url(&format!("/session/user/{uid}")))
                    .headers(Self::auth_headers(token)?),
            )
            .await?;
        Self::parse(response).await
    }

    /// Update the title, mood, or style of a session.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::SessionNotFound` (wrapped) if the session does not exist.
    pub async fn update_session(
        &self,
        token: &str,
        session_id: &SessionId,
        update: &UpdateSessionRequest,
    ) -> Result<()> {
        self.execute(
            self.client
                .patch(self.url(&format!("/session/{session_id}")))
                .headers(Self::auth_headers(token)?)
                .json(update),
        )
        .await
        .map_err(|e| Self::session_not_found(e, session_id))?;
        Ok(())
    }

    /// Delete a session.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::SessionNotFound` (wrapped) if the session does not exist.
    pub async fn delete_session(&self, token: &str, session_id: &SessionId) -> Result<()> {
        self.execute(
            self.client
                .delete(self.url(&format!("/session/{session_id}")))
                .headers(Self::auth_headers(token)?),
        )
        .await
        .map_err(|e| Self::session_not_found(e, session_id))?;

        tracing::info!(session_id = %session_id, "Deleted chat session");
        Ok(())
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// List the stored messages of a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::SessionNotFound` (wrapped) if the session does not exist.
    pub async fn list_messages(
        &self,
        token: &str,
        session_id: &SessionId,
    ) -> Result<Vec<StoredMessage>> {
        let response = self
            .execute(
                self.client
                    .get(self.url(&format!("/message/session/{session_id}")))
                    .headers(Self::auth_headers(token)?),
            )
            .await
            .map_err(|e| Self::session_not_found(e, session_id))?;
        Self::parse(response).await
    }

    /// Store a message in a session.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::SessionNotFound` (wrapped) if the session does not exist.
    pub async fn add_message(
        &self,
        token: &str,
        session_id: &SessionId,
        role: Role,
        content: &str,
    ) -> Result<AddMessageResponse> {
        let request = AddMessageRequest {
            session_id: *session_id,
            role,
            content: content.to_string(),
        };
        let response = self
            .execute(
                self.client
                    .post(self.url("/message"))
                    .headers(Self::auth_headers(token)?)
                    .json(&request),
            )
            .await
            .map_err(|e| Self::session_not_found(e, session_id))?;
        Self::parse(response).await
    }

    /// Delete a stored message.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Api` with status 404 if the message does not exist
    /// and 403 if it belongs to someone else's session.
    pub async fn delete_message(&self, token: &str, message_id: &uuid::Uuid) -> Result<()> {
        self.execute(
            self.client
                .delete(self.url(&format!("/message/{message_id}")))
                .headers(Self::auth_headers(token)?),
        )
        .await?;
        Ok(())
    }
}
