//! Newline-delimited JSON decoding of chat response bodies.
//!
//! The chat endpoint streams one JSON object per line with no end marker
//! besides connection close:
//!
//! ```text
//! {"response":"Pack a "}
//! {"response":"rain jacket."}
//! ```
//!
//! [`LineDecoder`] is the synchronous core: it buffers raw bytes and yields a
//! value per complete line. [`StreamDecoder`] drives it from an HTTP body
//! stream. Lines that fail to decode are reported to a [`DiagnosticSink`] and
//! skipped; they never end the stream.

use std::borrow::Cow;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde_json::Value;
use thiserror::Error;

use crate::error::ChatError;

const NEWLINE: u8 = b'\n';

/// Number of characters of an offending line kept in diagnostics.
const LINE_PREVIEW_CHARS: usize = 80;

/// A record that could not be turned into a fragment.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The line is not valid UTF-8.
    #[error("record is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The line is not valid JSON.
    #[error("invalid JSON record {line:?}: {source}")]
    InvalidJson {
        /// Start of the offending line.
        line: String,
        /// Parser error.
        #[source]
        source: serde_json::Error,
    },

    /// The record is an object without the reply field.
    #[error("record has no `{0}` field")]
    MissingField(String),

    /// The reply field is present but not a string.
    #[error("`{field}` field is {found}, expected a string")]
    InvalidField {
        /// Name of the reply field.
        field: String,
        /// JSON type found instead.
        found: &'static str,
    },

    /// The record is not a JSON object.
    #[error("record is {0}, expected an object")]
    NotAnObject(&'static str),
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Receiver of decode errors that are not surfaced to the user.
pub trait DiagnosticSink: Send + Sync {
    /// Report a skipped record.
    fn report(&self, error: &DecodeError);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&DecodeError) + Send + Sync,
{
    fn report(&self, error: &DecodeError) {
        self(error);
    }
}

/// Sink that logs every report at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, error: &DecodeError) {
        tracing::warn!(error = %error, "Skipping chat record");
    }
}

// =============================================================================
// Reply field
// =============================================================================

/// Name of the field carrying assistant text in each record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyField(Cow<'static, str>);

impl ReplyField {
    /// A custom field name.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// `response`, used by the streaming endpoint.
    #[must_use]
    pub const fn response() -> Self {
        Self(Cow::Borrowed("response"))
    }

    /// `reply`, used by the single-shot endpoint.
    #[must_use]
    pub const fn reply() -> Self {
        Self(Cow::Borrowed("reply"))
    }

    /// The field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Extract the text fragment carried by `record`.
    ///
    /// Returns `Ok(None)` for an empty object or a `null` field: such records
    /// carry no text but are not malformed.
    ///
    /// # Errors
    ///
    /// Returns `DecodeError::NotAnObject` for non-object records,
    /// `DecodeError::MissingField` for a non-empty object without the field,
    /// and `DecodeError::InvalidField` if the field is not a string.
    pub fn extract<'a>(&self, record: &'a Value) -> Result<Option<&'a str>, DecodeError> {
        let object = record
            .as_object()
            .ok_or_else(|| DecodeError::NotAnObject(json_type(record)))?;

        match object.get(self.name()) {
            Some(Value::String(text)) => Ok(Some(text.as_str())),
            Some(Value::Null) => Ok(None),
            Some(other) => Err(DecodeError::InvalidField {
                field: self.name().to_string(),
                found: json_type(other),
            }),
            None if object.is_empty() => Ok(None),
            None => Err(DecodeError::MissingField(self.name().to_string())),
        }
    }
}

impl Default for ReplyField {
    fn default() -> Self {
        Self::response()
    }
}

// =============================================================================
// Line decoder
// =============================================================================

/// Incremental NDJSON decoder.
///
/// Holds the bytes after the last newline seen; the buffer never contains a
/// complete line between calls. Lines are decoded as UTF-8 only once complete,
/// so multi-byte characters may be split across chunks.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buffered bytes not yet terminated by a newline.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Feed a chunk and return the records completed by it, in order.
    pub fn push(&mut self, chunk: &[u8], sink: &dyn DiagnosticSink) -> Vec<Value> {
        let scan_from = self.buffer.len();
        self.buffer.extend_from_slice(chunk);

        let Some(last_newline) = self.buffer[scan_from..]
            .iter()
            .rposition(|&b| b == NEWLINE)
            .map(|pos| scan_from + pos)
        else {
            return Vec::new();
        };

        let rest = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, rest);

        complete
            .split(|&b| b == NEWLINE)
            .filter_map(|line| decode_line(line, sink))
            .collect()
    }

    /// Decode whatever remains once the source is exhausted.
    ///
    /// A final record without a trailing newline is still delivered.
    pub fn finish(&mut self, sink: &dyn DiagnosticSink) -> Option<Value> {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest, sink)
    }
}

/// Decode one line, reporting failures. Blank lines yield nothing.
fn decode_line(line: &[u8], sink: &dyn DiagnosticSink) -> Option<Value> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    let text = match std::str::from_utf8(line) {
        Ok(text) => text,
        Err(e) => {
            sink.report(&DecodeError::InvalidUtf8(e));
            return None;
        }
    };

    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(source) => {
            sink.report(&DecodeError::InvalidJson {
                line: text.chars().take(LINE_PREVIEW_CHARS).collect(),
                source,
            });
            None
        }
    }
}

// =============================================================================
// Stream adapter
// =============================================================================

/// Decodes a chunked body stream into JSON records.
#[derive(Clone)]
pub struct StreamDecoder {
    sink: Arc<dyn DiagnosticSink>,
}

impl StreamDecoder {
    /// Create a decoder reporting skipped records to `sink`.
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    /// Decode `source` into a lazy, finite stream of records.
    ///
    /// Yields one value per complete non-blank line, in order, then the
    /// trailing unterminated record if any. A transport error from the source
    /// is yielded once and ends the stream.
    pub fn decode<S, B, E>(&self, source: S) -> impl Stream<Item = Result<Value, ChatError>>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<ChatError>,
    {
        let sink = Arc::clone(&self.sink);
        async_stream::stream! {
            let mut decoder = LineDecoder::new();
            let mut source = std::pin::pin!(source);

            while let Some(chunk) = source.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let error: ChatError = e.into();
                        tracing::debug!(
                            error = %error,
                            buffered = decoder.buffered(),
                            "Chat stream read failed"
                        );
                        yield Err(error);
                        return;
                    }
                };

                for value in decoder.push(chunk.as_ref(), sink.as_ref()) {
                    yield Ok(value);
                }
            }

            if let Some(value) = decoder.finish(sink.as_ref()) {
                yield Ok(value);
            }
        }
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl std::fmt::Debug for StreamDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDecoder").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct CollectingSink(Mutex<Vec<String>>);

    impl DiagnosticSink for CollectingSink {
        fn report(&self, error: &DecodeError) {
            self.0.lock().push(error.to_string());
        }
    }

    impl CollectingSink {
        fn count(&self) -> usize {
            self.0.lock().len()
        }
    }

    fn decode_chunks(chunks: &[&[u8]], sink: &dyn DiagnosticSink) -> Vec<Value> {
        let mut decoder = LineDecoder::new();
        let mut values = Vec::new();
        for chunk in chunks {
            values.extend(decoder.push(chunk, sink));
        }
        values.extend(decoder.finish(sink));
        values
    }

    // -------------------------------------------------------------------------
    // LineDecoder
    // -------------------------------------------------------------------------

    #[test]
    fn record_split_across_chunks() {
        let sink = CollectingSink::default();
        let values = decode_chunks(&[b"{\"respo", b"nse\":\"Hi\"}\n"], &sink);
        assert_eq!(values, vec![json!({"response": "Hi"})]);
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn buffer_keeps_only_incomplete_tail() {
        let sink = CollectingSink::default();
        let mut decoder = LineDecoder::new();

        let values = decoder.push(b"{\"a\":1}\n{\"b\"", &sink);
        assert_eq!(values, vec![json!({"a": 1})]);
        assert_eq!(decoder.buffered(), 4);

        let values = decoder.push(b":2}\n", &sink);
        assert_eq!(values, vec![json!({"b": 2})]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn bad_line_is_reported_and_skipped() {
        let sink = CollectingSink::default();
        let values = decode_chunks(
            &[b"{\"response\":\"a\"}\n###bad###\n{\"response\":\"b\"}\n"],
            &sink,
        );
        assert_eq!(
            values,
            vec![json!({"response": "a"}), json!({"response": "b"})]
        );
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn trailing_record_without_newline() {
        let sink = CollectingSink::default();
        let values = decode_chunks(&[b"{\"response\":\"x\"}"], &sink);
        assert_eq!(values, vec![json!({"response": "x"})]);
    }

    #[test]
    fn blank_lines_and_crlf_are_ignored() {
        let sink = CollectingSink::default();
        let values = decode_chunks(&[b"\r\n  \n{\"a\":1}\r\n\n"], &sink);
        assert_eq!(values, vec![json!({"a": 1})]);
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let sink = CollectingSink::default();
        let body = "{\"response\":\"Caf\u{e9} \u{1f3d5}\"}\n".as_bytes();
        let split = body.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let values = decode_chunks(&[&body[..split], &body[split..]], &sink);
        assert_eq!(values, vec![json!({"response": "Caf\u{e9} \u{1f3d5}"})]);
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn invalid_utf8_line_is_reported() {
        let sink = CollectingSink::default();
        let values = decode_chunks(&[b"\xff\xfe\n{\"a\":1}\n"], &sink);
        assert_eq!(values, vec![json!({"a": 1})]);
        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn finish_on_empty_buffer_yields_nothing() {
        let sink = CollectingSink::default();
        let mut decoder = LineDecoder::new();
        assert!(decoder.finish(&sink).is_none());
        decoder.push(b"   ", &sink);
        assert!(decoder.finish(&sink).is_none());
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn closure_sink_receives_reports() {
        let seen = Mutex::new(0usize);
        let sink = |_: &DecodeError| *seen.lock() += 1;
        let values = decode_chunks(&[b"nope\n"], &sink);
        assert!(values.is_empty());
        assert_eq!(*seen.lock(), 1);
    }

    // -------------------------------------------------------------------------
    // ReplyField
    // -------------------------------------------------------------------------

    #[test]
    fn extract_string_field() {
        let field = ReplyField::response();
        let record = json!({"response": "Hello", "done": false});
        assert_eq!(field.extract(&record).unwrap(), Some("Hello"));
    }

    #[test]
    fn extract_empty_object_and_null_are_no_ops() {
        let field = ReplyField::response();
        assert_eq!(field.extract(&json!({})).unwrap(), None);
        assert_eq!(field.extract(&json!({"response": null})).unwrap(), None);
    }

    #[test]
    fn extract_missing_field() {
        let field = ReplyField::reply();
        let record = json!({"response": "wrong field"});
        let result = field.extract(&record);
        assert!(matches!(result, Err(DecodeError::MissingField(f)) if f == "reply"));
    }

    #[test]
    fn extract_non_string_field() {
        let field = ReplyField::response();
        let record = json!({"response": 42});
        let result = field.extract(&record);
        assert!(matches!(
            result,
            Err(DecodeError::InvalidField { found: "a number", .. })
        ));
    }

    #[test]
    fn extract_non_object() {
        let field = ReplyField::response();
        assert!(matches!(
            field.extract(&json!(["a"])),
            Err(DecodeError::NotAnObject("an array"))
        ));
        assert!(matches!(
            field.extract(&json!("a")),
            Err(DecodeError::NotAnObject("a string"))
        ));
    }

    // -------------------------------------------------------------------------
    // StreamDecoder
    // -------------------------------------------------------------------------

    fn source(chunks: Vec<Vec<u8>>) -> impl Stream<Item = Result<Vec<u8>, ChatError>> {
        stream::iter(chunks.into_iter().map(Ok))
    }

    #[tokio::test]
    async fn stream_yields_records_in_order() {
        let decoder = StreamDecoder::default();
        let chunks = vec![
            b"{\"response\":\"He".to_vec(),
            b"l\"}\n{\"response\":\"lo\"}".to_vec(),
        ];

        let values: Vec<Value> = decoder
            .decode(source(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(
            values,
            vec![json!({"response": "Hel"}), json!({"response": "lo"})]
        );
    }

    #[tokio::test]
    async fn stream_error_is_yielded_once_and_ends() {
        let decoder = StreamDecoder::default();
        let items: Vec<Result<Vec<u8>, ChatError>> = vec![
            Ok(b"{\"response\":\"a\"}\n{\"resp".to_vec()),
            Err(ChatError::Parse("connection reset".to_string())),
            Ok(b"onse\":\"b\"}\n".to_vec()),
        ];

        let results: Vec<_> = decoder.decode(stream::iter(items)).collect().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap(), &json!({"response": "a"}));
        assert!(matches!(results[1], Err(ChatError::Parse(_))));
    }

    #[tokio::test]
    async fn empty_stream_yields_nothing() {
        let decoder = StreamDecoder::default();
        let values: Vec<_> = decoder.decode(source(Vec::new())).collect().await;
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn stream_reports_to_configured_sink() {
        let sink = Arc::new(CollectingSink::default());
        let decoder = StreamDecoder::new(sink.clone());

        let values: Vec<_> = decoder
            .decode(source(vec![b"{oops}\n{\"a\":1}\n".to_vec()]))
            .collect()
            .await;
        assert_eq!(values.len(), 1);
        assert_eq!(sink.count(), 1);
    }
}
