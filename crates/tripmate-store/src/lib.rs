//! Document storage layer for tripmate.
//!
//! Trips, itineraries, packing lists, tasks, and user profiles are stored as
//! JSON documents keyed by `(scope, collection, document_id)`, where the scope
//! is the owning trip for trip-scoped collections.
//!
//! # Architecture
//!
//! - [`DocumentStore`]: raw CRUD over documents, implemented by [`RocksStore`]
//!   with one column family per collection
//! - [`RecordService`]: typed CRUD over [`Record`]s, reporting every outcome as
//!   a [`ServiceResponse`] the views can display directly
//!
//! # Example
//!
//! ```no_run
//! use tripmate_core::UserId;
//! use tripmate_store::{RecordService, RocksStore};
//!
//! let store = RocksStore::open("/tmp/tripmate-db").unwrap();
//! let service = RecordService::new(store);
//!
//! let user = UserId::new("alice").unwrap();
//! let trips = service.list_trips_for_user(&user);
//! assert!(trips.success);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod keys;
pub mod records;
pub mod rocks;
pub mod schema;
pub mod service;
pub mod types;

pub use config::StoreConfig;
pub use error::{Result, StoreError};
pub use records::{
    EventCategory, ItineraryDay, ItineraryEvent, PackingCategory, PackingItem, PackingType,
    Record, Stored, Task, TaskFilter, TaskPriority, TaskStatus, Trip, TripLocation, TripStatus,
    UserPreferences, UserProfile,
};
pub use rocks::RocksStore;
pub use service::{RecordService, ServiceResponse};
pub use types::{Collection, Document, Scope, ServerTimestamp};

use tripmate_core::DocumentId;

/// The storage trait defining all document operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, a remote document database, in-memory for testing).
pub trait DocumentStore: Send + Sync {
    /// Insert or replace a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put(&self, document: &Document) -> Result<()>;

    /// Get a document by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get(
        &self,
        scope: &Scope,
        collection: Collection,
        document_id: &DocumentId,
    ) -> Result<Option<Document>>;

    /// Delete a document by ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the document doesn't exist.
    fn delete(&self, scope: &Scope, collection: Collection, document_id: &DocumentId)
        -> Result<()>;

    /// List all documents of a collection within a scope.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list(&self, scope: &Scope, collection: Collection) -> Result<Vec<Document>>;

    /// Create a document with a generated ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the scope does not fit the
    /// collection, or `StoreError::InvalidBody` if `data` is not an object.
    fn create(
        &self,
        scope: &Scope,
        collection: Collection,
        data: serde_json::Value,
    ) -> Result<Document> {
        self.create_with_id(scope, collection, DocumentId::generate(), data)
    }

    /// Create or overwrite a document with a caller-chosen ID.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidPath` if the scope does not fit the
    /// collection, or `StoreError::InvalidBody` if `data` is not an object.
    fn create_with_id(
        &self,
        scope: &Scope,
        collection: Collection,
        document_id: DocumentId,
        data: serde_json::Value,
    ) -> Result<Document> {
        validate_path(scope, collection)?;
        validate_body(&data)?;

        let now = ServerTimestamp::now();
        let document = Document {
            id: document_id,
            scope: scope.clone(),
            collection,
            data,
            created_at: now,
            updated_at: now,
        };
        self.put(&document)?;
        Ok(document)
    }

    /// Merge `patch` into an existing document and refresh `updated_at`.
    ///
    /// Top-level fields of `patch` replace those of the stored body; a `null`
    /// value removes the field.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the document doesn't exist, or
    /// `StoreError::InvalidBody` if `patch` is not an object.
    fn update(
        &self,
        scope: &Scope,
        collection: Collection,
        document_id: &DocumentId,
        patch: serde_json::Value,
    ) -> Result<Document> {
        validate_path(scope, collection)?;
        validate_body(&patch)?;

        let mut document = self
            .get(scope, collection, document_id)?
            .ok_or(StoreError::NotFound)?;

        if let (Some(body), serde_json::Value::Object(fields)) =
            (document.data.as_object_mut(), patch)
        {
            for (key, value) in fields {
                if value.is_null() {
                    body.remove(&key);
                } else {
                    body.insert(key, value);
                }
            }
        }
        document.updated_at = ServerTimestamp::now();

        self.put(&document)?;
        Ok(document)
    }

    /// Delete every document of a collection within a scope.
    ///
    /// Returns the number of deleted documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_all(&self, scope: &Scope, collection: Collection) -> Result<usize> {
        let documents = self.list(scope, collection)?;
        for document in &documents {
            self.delete(scope, collection, &document.id)?;
        }
        Ok(documents.len())
    }
}

/// Check that a scope fits a collection.
///
/// # Errors
///
/// Returns `StoreError::InvalidPath` for a trip-scoped collection without a
/// trip, or a global collection with one.
pub fn validate_path(scope: &Scope, collection: Collection) -> Result<()> {
    match (collection.is_trip_scoped(), scope) {
        (true, Scope::Trip(_)) | (false, Scope::Global) => Ok(()),
        (true, Scope::Global) => Err(StoreError::InvalidPath(format!(
            "{collection} documents must belong to a trip"
        ))),
        (false, Scope::Trip(trip_id)) => Err(StoreError::InvalidPath(format!(
            "{collection} documents are not scoped to a trip (got {trip_id})"
        ))),
    }
}

fn validate_body(data: &serde_json::Value) -> Result<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::InvalidBody(
            "document body must be a JSON object".to_string(),
        ))
    }
}
