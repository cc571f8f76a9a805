//! Key encoding utilities for `RocksDB`.
//!
//! Document keys are `scope || 0x00 || document_id`, where `scope` is the trip
//! ID for trip-scoped collections and empty for global ones. Identifiers never
//! contain NUL, so a scope prefix scan cannot match a different scope.

use tripmate_core::DocumentId;

use crate::types::Scope;

const SEPARATOR: u8 = 0x00;

/// Encode the prefix shared by every document in a scope.
#[must_use]
pub fn scope_prefix(scope: &Scope) -> Vec<u8> {
    let scope_bytes = match scope {
        Scope::Global => &[][..],
        Scope::Trip(trip_id) => trip_id.as_bytes(),
    };
    let mut key = Vec::with_capacity(scope_bytes.len() + 1);
    key.extend_from_slice(scope_bytes);
    key.push(SEPARATOR);
    key
}

/// Encode a document key: `scope || 0x00 || document_id`.
#[must_use]
pub fn document_key(scope: &Scope, document_id: &DocumentId) -> Vec<u8> {
    let mut key = scope_prefix(scope);
    key.extend_from_slice(document_id.as_bytes());
    key
}
