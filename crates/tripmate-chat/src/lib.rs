//! Streaming chat-response assembler for the tripmate assistant.
//!
//! The assistant backend answers a chat message with a chunked body of
//! newline-delimited JSON records, each carrying a piece of the reply. This
//! crate turns that body into a growing assistant message inside an
//! observable transcript.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────┐  POST /chat/{id}   ┌────────────┐
//! │ ConversationAssembler  │───────────────────▶│ ChatClient │──▶ backend
//! └───────────┬────────────┘                    └─────┬──────┘
//!             │ fragments                             │ byte chunks
//!             │                              ┌────────▼───────┐
//!             │◀─────────────────────────────│ StreamDecoder  │
//!             │                              └────────────────┘
//! ┌───────────▼────────────┐
//! │   TranscriptStore      │──▶ subscribers (snapshots)
//! └────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tripmate_chat::{ChatClient, ChatConfig, ConversationAssembler, TranscriptState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChatClient::new(ChatConfig::new("http://localhost:8000"))?;
//! let assembler = ConversationAssembler::new(client);
//!
//! let _subscription = assembler.subscribe(Arc::new(|state: &TranscriptState| {
//!     if let Some(last) = state.messages.last() {
//!         println!("{}: {}", last.role, last.content);
//!     }
//! }));
//!
//! let reply = assembler
//!     .send(None, "What should I pack for Yosemite?", "id-token", Default::default())
//!     .await?;
//! println!("{}", reply.text);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod assembler;
pub mod client;
pub mod config;
pub mod decoder;
pub mod error;
pub mod transcript;
pub mod types;

pub use assembler::ConversationAssembler;
pub use client::ChatClient;
pub use config::ChatConfig;
pub use decoder::{
    DecodeError, DiagnosticSink, LineDecoder, ReplyField, StreamDecoder, TracingSink,
};
pub use error::{ChatError, Result, GENERIC_API_ERROR};
pub use transcript::{TranscriptListener, TranscriptStore, TurnHandle};
pub use types::{
    AddMessageRequest, AddMessageResponse, ChatResponse, ChatSession, CreateSessionRequest,
    Message, Role, StoredMessage, TranscriptState, UpdateSessionRequest,
};
