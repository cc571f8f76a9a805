//! Storage-level types: scopes, collections, timestamps, and raw documents.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tripmate_core::{DocumentId, TripId};

use crate::schema::cf;

/// Server-assigned time of a write.
///
/// Opaque to callers apart from conversion to epoch milliseconds, which is
/// the representation the views work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerTimestamp(DateTime<Utc>);

impl ServerTimestamp {
    /// The current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build a timestamp from epoch milliseconds.
    ///
    /// Returns `None` if the value is out of range.
    #[must_use]
    pub fn from_epoch_millis(millis: i64) -> Option<Self> {
        DateTime::from_timestamp_millis(millis).map(Self)
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn to_epoch_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// The underlying date-time.
    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

/// The parent a document lives under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Top-level documents (trips, profiles).
    Global,
    /// Documents that belong to one trip.
    Trip(TripId),
}

impl Scope {
    /// The trip this scope refers to, if any.
    #[must_use]
    pub const fn trip_id(&self) -> Option<&TripId> {
        match self {
            Self::Global => None,
            Self::Trip(trip_id) => Some(trip_id),
        }
    }
}

impl From<TripId> for Scope {
    fn from(trip_id: TripId) -> Self {
        Self::Trip(trip_id)
    }
}

/// Document collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Trips.
    Trips,
    /// Per-day itineraries of a trip.
    Itinerary,
    /// Packing list items of a trip.
    Packing,
    /// Tasks of a trip.
    Tasks,
    /// User profiles.
    Profiles,
}

impl Collection {
    /// Every collection.
    pub const ALL: [Self; 5] = [
        Self::Trips,
        Self::Itinerary,
        Self::Packing,
        Self::Tasks,
        Self::Profiles,
    ];

    /// Collection name, also the column family name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trips => cf::TRIPS,
            Self::Itinerary => cf::ITINERARY,
            Self::Packing => cf::PACKING,
            Self::Tasks => cf::TASKS,
            Self::Profiles => cf::PROFILES,
        }
    }

    /// Whether documents of this collection live under a trip.
    #[must_use]
    pub const fn is_trip_scoped(&self) -> bool {
        matches!(self, Self::Itinerary | Self::Packing | Self::Tasks)
    }

    /// Parse a collection name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored document: a JSON object plus store-managed metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier, unique within its scope and collection.
    pub id: DocumentId,
    /// Parent scope.
    pub scope: Scope,
    /// Owning collection.
    pub collection: Collection,
    /// Document body (always a JSON object).
    pub data: serde_json::Value,
    /// Creation timestamp.
    pub created_at: ServerTimestamp,
    /// Last modification timestamp.
    pub updated_at: ServerTimestamp,
}
