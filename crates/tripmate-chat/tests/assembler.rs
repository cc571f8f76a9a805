//! End-to-end tests of the conversation assembler against a mock backend.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tripmate_chat::{
    ChatClient, ChatConfig, ChatError, ConversationAssembler, DecodeError, Message,
    TranscriptState,
};
use tripmate_core::SessionId;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION: &str = "550e8400-e29b-41d4-a716-446655440000";

fn session_id() -> SessionId {
    SESSION.parse().unwrap()
}

#[derive(Default)]
struct Diagnostics(Mutex<Vec<String>>);

impl Diagnostics {
    fn count(&self) -> usize {
        self.0.lock().len()
    }
}

fn assembler_for(config: ChatConfig) -> (ConversationAssembler, Arc<Diagnostics>) {
    let diagnostics = Arc::new(Diagnostics::default());
    let sink = Arc::clone(&diagnostics);
    let assembler = ConversationAssembler::new(ChatClient::new(config).unwrap())
        .with_diagnostics(Arc::new(move |e: &DecodeError| {
            sink.0.lock().push(e.to_string());
        }));
    (assembler, diagnostics)
}

async fn streaming_server(body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;
    server
}

fn assistant_messages(state: &TranscriptState) -> Vec<&Message> {
    state
        .messages
        .iter()
        .filter(|m| m.role == tripmate_chat::Role::Assistant)
        .collect()
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn fragments_grow_a_single_assistant_message() {
    let server =
        streaming_server("{\"response\":\"Hel\"}\n{\"response\":\"lo\",\"done\":true}\n").await;
    let (assembler, diagnostics) = assembler_for(ChatConfig::new(server.uri()));

    let reply = assembler.send(None, "hi", "tok", Map::new()).await.unwrap();

    assert_eq!(reply.text, "Hello");
    assert_eq!(reply.payload, json!({"response": "lo", "done": true}));
    assert!(reply.session_id.is_none());

    let state = assembler.state();
    assert_eq!(
        state.messages,
        vec![Message::user("hi"), Message::assistant("Hello")]
    );
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(diagnostics.count(), 0);
}

#[tokio::test]
async fn subscribers_see_the_reply_grow() {
    let server = streaming_server("{\"response\":\"Hel\"}\n{\"response\":\"lo\"}\n").await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = assembler.subscribe(Arc::new(move |state: &TranscriptState| {
        sink.lock().push(state.clone());
    }));

    assembler.send(None, "hi", "tok", Map::new()).await.unwrap();

    let seen = seen.lock();
    assert!(seen[0].loading);
    assert_eq!(seen[0].messages, vec![Message::user("hi")]);

    let replies: Vec<String> = seen
        .iter()
        .filter_map(|s| assistant_messages(s).first().map(|m| m.content.clone()))
        .collect();
    assert_eq!(replies.first().map(String::as_str), Some("Hel"));
    assert_eq!(replies.last().map(String::as_str), Some("Hello"));
    assert!(seen.iter().all(|s| assistant_messages(s).len() <= 1));
    assert!(!seen.last().unwrap().loading);
}

#[tokio::test]
async fn malformed_line_is_skipped() {
    let server =
        streaming_server("{\"response\":\"a\"}\n###bad###\n{\"response\":\"b\"}\n").await;
    let (assembler, diagnostics) = assembler_for(ChatConfig::new(server.uri()));

    let reply = assembler.send(None, "hi", "tok", Map::new()).await.unwrap();

    assert_eq!(reply.text, "ab");
    assert_eq!(diagnostics.count(), 1);
    assert!(assembler.state().error.is_none());
}

#[tokio::test]
async fn trailing_record_without_newline_is_delivered() {
    let server = streaming_server("{\"response\":\"x\"}").await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()));

    let reply = assembler.send(None, "hi", "tok", Map::new()).await.unwrap();

    assert_eq!(reply.text, "x");
    assert_eq!(assistant_messages(&assembler.state()).len(), 1);
}

#[tokio::test]
async fn records_without_text_do_not_create_a_message() {
    let server = streaming_server("{\"response\":\"\"}\n{}\n{\"response\":null}\n").await;
    let (assembler, diagnostics) = assembler_for(ChatConfig::new(server.uri()));

    let reply = assembler.send(None, "hi", "tok", Map::new()).await.unwrap();

    assert_eq!(reply.text, "");
    assert_eq!(assembler.state().messages, vec![Message::user("hi")]);
    assert_eq!(diagnostics.count(), 0);
}

#[tokio::test]
async fn record_without_reply_field_is_reported_not_surfaced() {
    let server = streaming_server("{\"status\":\"thinking\"}\n{\"response\":\"Go\"}\n").await;
    let (assembler, diagnostics) = assembler_for(ChatConfig::new(server.uri()));

    let reply = assembler.send(None, "hi", "tok", Map::new()).await.unwrap();

    assert_eq!(reply.text, "Go");
    assert_eq!(diagnostics.count(), 1);
    assert!(assembler.state().error.is_none());
}

#[tokio::test]
async fn empty_body_completes_without_reply() {
    let server = streaming_server("").await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()));

    let reply = assembler.send(None, "hi", "tok", Map::new()).await.unwrap();

    assert_eq!(reply.payload, Value::Null);
    assert_eq!(assembler.state().messages, vec![Message::user("hi")]);
    assert!(!assembler.state().loading);
}

#[tokio::test]
async fn request_carries_session_extra_fields_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/chat/{SESSION}")))
        .and(header("authorization", "Bearer id-token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"message": "Plan day two", "mood": "cheerful"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                format!("{{\"response\":\"Sure\",\"session_id\":\"{SESSION}\"}}\n"),
                "application/x-ndjson",
            ),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()));

    let mut extra = Map::new();
    extra.insert("mood".to_string(), json!("cheerful"));
    let reply = assembler
        .send(Some(&session_id()), "Plan day two", "id-token", extra)
        .await
        .unwrap();

    assert_eq!(reply.text, "Sure");
    assert_eq!(reply.session_id, Some(session_id()));
}

#[tokio::test]
async fn each_send_starts_a_fresh_assistant_message() {
    let server = streaming_server("{\"response\":\"ok\"}\n").await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()));

    assembler.send(None, "one", "tok", Map::new()).await.unwrap();
    assembler.send(None, "two", "tok", Map::new()).await.unwrap();

    assert_eq!(
        assembler.state().messages,
        vec![
            Message::user("one"),
            Message::assistant("ok"),
            Message::user("two"),
            Message::assistant("ok"),
        ]
    );
}

// =============================================================================
// Single-shot
// =============================================================================

#[tokio::test]
async fn single_shot_reply_is_one_update() {
    let server = MockServer::start().await;
    let body = json!({"reply": "Bring water.", "session_id": SESSION});
    Mock::given(method("POST"))
        .and(path("/chat/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
        .mount(&server)
        .await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()).single_shot());

    let reply = assembler.send(None, "hi", "tok", Map::new()).await.unwrap();

    assert_eq!(reply.text, "Bring water.");
    assert_eq!(reply.payload, body);
    assert_eq!(reply.session_id, Some(session_id()));
    assert_eq!(
        assembler.state().messages,
        vec![Message::user("hi"), Message::assistant("Bring water.")]
    );
}

#[tokio::test]
async fn single_shot_invalid_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()).single_shot());

    let result = assembler.send(None, "hi", "tok", Map::new()).await;

    assert!(matches!(result, Err(ChatError::Parse(_))));
    let state = assembler.state();
    assert!(state.error.is_some());
    assert!(!state.loading);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn api_error_records_detail_without_assistant_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"detail": "rate limited"})))
        .mount(&server)
        .await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()));

    let result = assembler.send(None, "hi", "tok", Map::new()).await;

    assert!(matches!(result, Err(ChatError::Api { status: 429, .. })));
    let state = assembler.state();
    assert_eq!(state.error.as_deref(), Some("rate limited"));
    assert_eq!(state.messages, vec![Message::user("hi")]);
    assert!(!state.loading);
}

#[tokio::test]
async fn api_error_without_detail_uses_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()));

    let _ = assembler.send(None, "hi", "tok", Map::new()).await;

    assert_eq!(assembler.state().error.as_deref(), Some("API error"));
}

#[tokio::test]
async fn next_send_clears_previous_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "busy"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("{\"response\":\"ok\"}\n", "application/x-ndjson"),
        )
        .mount(&server)
        .await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()));

    assert!(assembler.send(None, "a", "tok", Map::new()).await.is_err());
    assert_eq!(assembler.state().error.as_deref(), Some("busy"));

    assembler.send(None, "b", "tok", Map::new()).await.unwrap();
    assert!(assembler.state().error.is_none());
}

#[tokio::test]
async fn connection_failure_is_an_http_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let (assembler, _) = assembler_for(ChatConfig::new(format!("http://{addr}")));

    let result = assembler.send(None, "hi", "tok", Map::new()).await;

    assert!(matches!(result, Err(ChatError::Http(_))));
    let state = assembler.state();
    assert!(state.error.as_deref().unwrap().starts_with("HTTP error"));
    assert_eq!(state.messages, vec![Message::user("hi")]);
    assert!(!state.loading);
}

/// Serve one request, answer with a truncated body, and close.
async fn truncating_server(partial_body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some(end) = text.find("\r\n\r\n") {
                let content_length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if request.len() >= end + 4 + content_length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }

        let head = concat!(
            "HTTP/1.1 200 OK\r\n",
            "content-type: application/x-ndjson\r\n",
            "content-length: 4096\r\n\r\n",
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(partial_body.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        socket.shutdown().await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn mid_stream_failure_keeps_partial_text() {
    let base_url = truncating_server("{\"response\":\"Partial\"}\n").await;
    let (assembler, _) = assembler_for(ChatConfig::new(base_url));

    let result = assembler.send(None, "hi", "tok", Map::new()).await;

    assert!(matches!(result, Err(ChatError::Http(_))));
    let state = assembler.state();
    assert_eq!(
        state.messages,
        vec![Message::user("hi"), Message::assistant("Partial")]
    );
    assert!(state.error.is_some());
    assert!(!state.loading);
}

// =============================================================================
// Reset and history
// =============================================================================

#[tokio::test]
async fn reset_clears_everything_and_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "No message provided"})),
        )
        .mount(&server)
        .await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()));
    let _ = assembler.send(None, "", "tok", Map::new()).await;
    assert!(assembler.state().error.is_some());

    assembler.reset();
    let once = assembler.state();
    assembler.reset();

    assert_eq!(once, TranscriptState::default());
    assert_eq!(assembler.state(), once);
}

#[tokio::test]
async fn load_history_replaces_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/message/session/{SESSION}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "6ba7b810-9dad-11d1-80b4-00c04fd430c8",
                "role": "user",
                "content": "Where to camp?",
                "created_at": "2025-06-01T09:30:00"
            },
            {
                "id": "6ba7b811-9dad-11d1-80b4-00c04fd430c8",
                "role": "assistant",
                "content": "Try Big Sur.",
                "created_at": "2025-06-01T09:30:03"
            }
        ])))
        .mount(&server)
        .await;
    let (assembler, _) = assembler_for(ChatConfig::new(server.uri()));
    assembler.transcript().begin_send("stale");

    let count = assembler.load_history(&session_id(), "tok").await.unwrap();

    assert_eq!(count, 2);
    assert_eq!(
        assembler.state().messages,
        vec![Message::user("Where to camp?"), Message::assistant("Try Big Sur.")]
    );
}
