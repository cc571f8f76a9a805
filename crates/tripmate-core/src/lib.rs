//! Core types and utilities for tripmate.
//!
//! This crate provides the foundational types used throughout the tripmate workspace:
//!
//! - **Identifiers**: Strongly-typed IDs for trips, documents, users, and chat sessions
//! - **Error types**: Common error definitions shared across crates
//! - **Observers**: Listener registries whose subscriptions unregister on drop
//!
//! # Example
//!
//! ```
//! use tripmate_core::{DocumentId, SessionId, TripId};
//!
//! let trip_id = TripId::new("summer-2025").unwrap();
//! let document_id = DocumentId::generate();
//! let session_id = SessionId::generate();
//! # let _ = (trip_id, document_id, session_id);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod observe;

pub use error::{CoreError, Result};
pub use ids::{DocumentId, IdError, SessionId, TripId, UserId, MAX_ID_LEN};
pub use observe::{Listener, Listeners, Subscription};
