//! Conversation assembler.
//!
//! Drives one HTTP exchange per [`ConversationAssembler::send`], turns the
//! response into text fragments, and grows a single assistant message in the
//! transcript as fragments arrive.
//!
//! Per send the transcript goes `idle -> sending -> streaming* -> completed |
//! failed -> idle`: the user message is appended before the request, the
//! assistant message appears with the first non-empty fragment, and `loading`
//! is cleared before `send` returns.
//!
//! Concurrent sends on one assembler are not serialized. Each patches only its
//! own assistant message, but `loading` is cleared by whichever finishes
//! first; callers should not send while `loading` is true. Dropping a `send`
//! future cancels the request and leaves `loading` set until the next send or
//! reset.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::{Map, Value};
use tripmate_core::{SessionId, Subscription};

use crate::client::ChatClient;
use crate::decoder::{DiagnosticSink, ReplyField, StreamDecoder, TracingSink};
use crate::error::Result;
use crate::transcript::{TranscriptListener, TranscriptStore, TurnHandle};
use crate::types::{ChatResponse, Message, TranscriptState};

/// Assistant text of the send in progress.
#[derive(Debug, Default)]
struct Turn {
    text: String,
    handle: Option<TurnHandle>,
    fragments: usize,
    session_id: Option<SessionId>,
}

impl Turn {
    fn into_response(self, payload: Value) -> ChatResponse {
        ChatResponse {
            text: self.text,
            payload,
            session_id: self.session_id,
        }
    }
}

/// Assembles streamed chat responses into an observable transcript.
pub struct ConversationAssembler {
    client: ChatClient,
    transcript: Arc<TranscriptStore>,
    sink: Arc<dyn DiagnosticSink>,
    decoder: StreamDecoder,
    reply_field: ReplyField,
}

impl ConversationAssembler {
    /// Create an assembler with a fresh transcript.
    #[must_use]
    pub fn new(client: ChatClient) -> Self {
        Self::with_transcript(client, TranscriptStore::shared())
    }

    /// Create an assembler writing to an existing transcript.
    #[must_use]
    pub fn with_transcript(client: ChatClient, transcript: Arc<TranscriptStore>) -> Self {
        let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingSink);
        let reply_field = client.config().reply_field();
        Self {
            decoder: StreamDecoder::new(Arc::clone(&sink)),
            client,
            transcript,
            sink,
            reply_field,
        }
    }

    /// Report skipped records to `sink` instead of the log.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.decoder = StreamDecoder::new(Arc::clone(&sink));
        self.sink = sink;
        self
    }

    /// The underlying HTTP client.
    #[must_use]
    pub const fn client(&self) -> &ChatClient {
        &self.client
    }

    /// The transcript this assembler writes to.
    #[must_use]
    pub const fn transcript(&self) -> &Arc<TranscriptStore> {
        &self.transcript
    }

    /// Snapshot of the transcript.
    #[must_use]
    pub fn state(&self) -> TranscriptState {
        self.transcript.state()
    }

    /// Register a listener for transcript changes.
    pub fn subscribe(&self, listener: TranscriptListener) -> Subscription {
        self.transcript.subscribe(listener)
    }

    /// Clear the transcript. Replies still streaming stop updating it.
    pub fn reset(&self) {
        self.transcript.reset();
        tracing::debug!("Transcript reset");
    }

    /// Send a user message and assemble the reply into the transcript.
    ///
    /// The request body is `{"message": user_text, ...extra}`; keys of `extra`
    /// win over `message`. On failure the error's message is recorded in the
    /// transcript and any text already streamed stays in place.
    ///
    /// # Errors
    ///
    /// Returns `ChatError::Api` for a non-success status (with the backend's
    /// `detail`), `ChatError::Http` for transport failures including a broken
    /// stream, and `ChatError::Parse` if a single-shot body is not JSON.
    pub async fn send(
        &self,
        session_id: Option<&SessionId>,
        user_text: &str,
        auth_token: &str,
        extra: Map<String, Value>,
    ) -> Result<ChatResponse> {
        self.transcript.begin_send(user_text);

        let mut turn = Turn::default();
        let result = self
            .exchange(&mut turn, session_id, user_text, auth_token, extra)
            .await;

        match result {
            Ok(payload) => {
                tracing::info!(
                    session_id = ?turn.session_id.or_else(|| session_id.copied()),
                    fragments = turn.fragments,
                    chars = turn.text.len(),
                    "Chat reply complete"
                );
                self.transcript.finish_send(None);
                Ok(turn.into_response(payload))
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    fragments = turn.fragments,
                    partial_chars = turn.text.len(),
                    "Chat send failed"
                );
                self.transcript.finish_send(Some(e.to_string()));
                Err(e)
            }
        }
    }

    async fn exchange(
        &self,
        turn: &mut Turn,
        session_id: Option<&SessionId>,
        user_text: &str,
        auth_token: &str,
        extra: Map<String, Value>,
    ) -> Result<Value> {
        let mut body = Map::new();
        body.insert("message".to_string(), Value::String(user_text.to_string()));
        body.extend(extra);

        let response = self
            .client
            .post_chat(session_id, &Value::Object(body), auth_token)
            .await?;

        let payload = if self.client.config().streaming {
            let records = self.decoder.decode(response.bytes_stream());
            let mut records = std::pin::pin!(records);

            let mut last = Value::Null;
            while let Some(record) = records.next().await {
                let record = record?;
                self.apply(turn, &record);
                last = record;
            }
            last
        } else {
            let bytes = response.bytes().await?;
            let payload: Value = serde_json::from_slice(&bytes)?;
            self.apply(turn, &payload);
            payload
        };

        Ok(payload)
    }

    /// Fold one decoded record into the turn.
    fn apply(&self, turn: &mut Turn, record: &Value) {
        if let Some(id) = record
            .get("session_id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<SessionId>().ok())
        {
            turn.session_id = Some(id);
        }

        match self.reply_field.extract(record) {
            Ok(Some(fragment)) => self.append(turn, fragment),
            Ok(None) => {}
            Err(e) => self.sink.report(&e),
        }
    }

    /// Append a fragment and upsert the assistant message.
    fn append(&self, turn: &mut Turn, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        turn.fragments += 1;
        turn.text.push_str(fragment);

        match turn.handle {
            Some(handle) => {
                if !self.transcript.patch(handle, &turn.text) {
                    tracing::debug!("Transcript was reset; dropping fragment");
                }
            }
            None => turn.handle = Some(self.transcript.push_assistant(&turn.text)),
        }
    }

    /// Replace the transcript with a session's stored history.
    ///
    /// Returns the number of messages loaded. The transcript is left as is
    /// on failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be fetched.
    pub async fn load_history(&self, session_id: &SessionId, auth_token: &str) -> Result<usize> {
        let stored = self.client.list_messages(auth_token, session_id).await?;
        let messages: Vec<Message> = stored.into_iter().map(Message::from).collect();
        let count = messages.len();

        self.transcript.replace_messages(messages);
        tracing::info!(session_id = %session_id, count, "Loaded chat history");
        Ok(count)
    }
}

impl std::fmt::Debug for ConversationAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationAssembler")
            .field("client", &self.client)
            .field("reply_field", &self.reply_field)
            .finish_non_exhaustive()
    }
}
