//! Database schema definitions and column families.
//!
//! Each document collection lives in its own column family.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Trip documents, keyed by `0x00 || trip_id`.
    pub const TRIPS: &str = "trips";

    /// Itinerary days, keyed by `trip_id || 0x00 || day_id`.
    pub const ITINERARY: &str = "itinerary";

    /// Packing items, keyed by `trip_id || 0x00 || item_id`.
    pub const PACKING: &str = "packing";

    /// Tasks, keyed by `trip_id || 0x00 || task_id`.
    pub const TASKS: &str = "tasks";

    /// User profiles, keyed by `0x00 || user_id`.
    pub const PROFILES: &str = "profiles";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::TRIPS, cf::ITINERARY, cf::PACKING, cf::TASKS, cf::PROFILES]
}
