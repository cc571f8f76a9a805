//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `DocumentStore` trait.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options,
};
use tripmate_core::DocumentId;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::all_column_families;
use crate::types::{Collection, Document, Scope};
use crate::DocumentStore;

/// RocksDB-backed document store.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path.as_ref(), cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), "Opened document store");

        Ok(Self { db: Arc::new(db) })
    }

    /// Open the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::open(config.data_dir())
    }

    /// Get a column family handle.
    fn cf(&self, collection: Collection) -> Result<Arc<BoundColumnFamily<'_>>> {
        let name = collection.as_str();
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

impl DocumentStore for RocksStore {
    fn put(&self, document: &Document) -> Result<()> {
        crate::validate_path(&document.scope, document.collection)?;

        let cf = self.cf(document.collection)?;
        let key = keys::document_key(&document.scope, &document.id);
        let value = Self::serialize(document)?;

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(
            collection = %document.collection,
            document_id = %document.id,
            "Stored document"
        );

        Ok(())
    }

    fn get(
        &self,
        scope: &Scope,
        collection: Collection,
        document_id: &DocumentId,
    ) -> Result<Option<Document>> {
        let cf = self.cf(collection)?;
        let key = keys::document_key(scope, document_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn delete(
        &self,
        scope: &Scope,
        collection: Collection,
        document_id: &DocumentId,
    ) -> Result<()> {
        let cf = self.cf(collection)?;
        let key = keys::document_key(scope, document_id);

        let exists = self
            .db
            .get_pinned_cf(&cf, &key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();
        if !exists {
            return Err(StoreError::NotFound);
        }

        self.db
            .delete_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(collection = %collection, document_id = %document_id, "Deleted document");

        Ok(())
    }

    fn list(&self, scope: &Scope, collection: Collection) -> Result<Vec<Document>> {
        let cf = self.cf(collection)?;
        let prefix = keys::scope_prefix(scope);

        let mut documents = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            // Stop if we're past the prefix
            if !key.starts_with(&prefix) {
                break;
            }

            documents.push(Self::deserialize(&value)?);
        }

        Ok(documents)
    }
}
