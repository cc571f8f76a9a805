//! Typed record service.
//!
//! Wraps a [`DocumentStore`] with typed operations whose outcome is always a
//! [`ServiceResponse`]: failures are logged and reported in the response
//! instead of being returned as errors, so views can show `message` directly.

use serde::{Deserialize, Serialize};
use tripmate_core::{DocumentId, TripId, UserId};

use crate::error::{Result, StoreError};
use crate::records::{
    ItineraryDay, ItineraryEvent, PackingItem, Record, Stored, Task, TaskFilter, Trip, UserProfile,
};
use crate::types::{Collection, Scope};
use crate::DocumentStore;

const EVENT_KIND: &str = "Itinerary event";

/// Outcome of a service operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Machine-readable error code on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Error details on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

impl<T> ServiceResponse<T> {
    /// A successful response.
    #[must_use]
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error_code: None,
            error_details: None,
        }
    }

    /// A failed response built from a store error.
    #[must_use]
    pub fn failure(message: impl Into<String>, error: &StoreError) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            error_code: Some(error.code().to_string()),
            error_details: Some(error.to_string()),
        }
    }

    /// Convert into a `Result`, discarding the message on success.
    ///
    /// # Errors
    ///
    /// Returns the failure message if the operation did not succeed or carried no data.
    pub fn into_result(self) -> std::result::Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.message),
        }
    }
}

/// Typed CRUD over a [`DocumentStore`].
pub struct RecordService<S> {
    store: S,
}

impl<S: DocumentStore> RecordService<S> {
    /// Create a new service over a store.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Get a reference to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Build a response from a result, logging failures.
    fn respond<T>(
        operation: &str,
        kind: &str,
        result: Result<T>,
        success_message: String,
    ) -> ServiceResponse<T> {
        match result {
            Ok(data) => ServiceResponse::ok(success_message, data),
            Err(StoreError::NotFound) => {
                ServiceResponse::failure(format!("{kind} not found"), &StoreError::NotFound)
            }
            Err(e) => {
                tracing::error!(operation, kind, error = %e, "Store operation failed");
                ServiceResponse::failure(
                    format!("Failed to {operation} {}", kind.to_lowercase()),
                    &e,
                )
            }
        }
    }

    fn to_body<R: Record>(record: &R) -> Result<serde_json::Value> {
        serde_json::to_value(record).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Create a record with a generated ID.
    pub fn create<R: Record>(&self, scope: &Scope, record: &R) -> ServiceResponse<Stored<R>> {
        let result = Self::to_body(record)
            .and_then(|body| self.store.create(scope, R::COLLECTION, body))
            .and_then(Stored::from_document);
        Self::respond("create", R::KIND, result, format!("{} created successfully", R::KIND))
    }

    /// Fetch a record by ID.
    pub fn fetch<R: Record>(&self, scope: &Scope, id: &DocumentId) -> ServiceResponse<Stored<R>> {
        let result = self
            .store
            .get(scope, R::COLLECTION, id)
            .and_then(|doc| doc.ok_or(StoreError::NotFound))
            .and_then(Stored::from_document);
        Self::respond("fetch", R::KIND, result, format!("{} fetched successfully", R::KIND))
    }

    /// Fetch every record of a type within a scope.
    pub fn list<R: Record>(&self, scope: &Scope) -> ServiceResponse<Vec<Stored<R>>> {
        let result = self.store.list(scope, R::COLLECTION).and_then(|docs| {
            docs.into_iter()
                .map(Stored::from_document)
                .collect::<Result<Vec<_>>>()
        });
        Self::respond("fetch", R::KIND, result, format!("{} list fetched successfully", R::KIND))
    }

    /// Apply a partial update to a record.
    ///
    /// `patch` is a JSON object of camelCase fields; the merged document must
    /// still decode as `R`.
    pub fn update<R: Record>(
        &self,
        scope: &Scope,
        id: &DocumentId,
        patch: serde_json::Value,
    ) -> ServiceResponse<Stored<R>> {
        let result = self
            .store
            .update(scope, R::COLLECTION, id, patch)
            .and_then(Stored::from_document);
        Self::respond("update", R::KIND, result, format!("{} updated successfully", R::KIND))
    }

    /// Delete a record.
    pub fn delete<R: Record>(&self, scope: &Scope, id: &DocumentId) -> ServiceResponse<()> {
        let result = self.store.delete(scope, R::COLLECTION, id);
        Self::respond("delete", R::KIND, result, format!("{} deleted successfully", R::KIND))
    }

    // =========================================================================
    // Trips
    // =========================================================================

    /// Create a trip. The trip's ID doubles as the scope of its documents.
    pub fn create_trip(&self, trip: &Trip) -> ServiceResponse<Stored<Trip>> {
        self.create(&Scope::Global, trip)
    }

    /// Trips the user created or is a member of.
    pub fn list_trips_for_user(&self, user_id: &UserId) -> ServiceResponse<Vec<Stored<Trip>>> {
        let mut response = self.list::<Trip>(&Scope::Global);
        if let Some(trips) = response.data.as_mut() {
            trips.retain(|t| t.record.involves(user_id));
            response.message = "Trips fetched successfully".to_string();
        }
        response
    }

    /// Delete a trip together with its itinerary, packing list, and tasks.
    pub fn delete_trip(&self, trip_id: &TripId) -> ServiceResponse<()> {
        let scope = Scope::Trip(trip_id.clone());
        let result = DocumentId::new(trip_id.as_str())
            .map_err(|e| StoreError::InvalidPath(e.to_string()))
            .and_then(|id| {
                self.store.delete(&Scope::Global, Collection::Trips, &id)?;
                for collection in Collection::ALL.into_iter().filter(Collection::is_trip_scoped) {
                    let removed = self.store.delete_all(&scope, collection)?;
                    tracing::debug!(
                        trip_id = %trip_id,
                        collection = %collection,
                        removed,
                        "Removed trip documents"
                    );
                }
                Ok(())
            });
        if result.is_ok() {
            tracing::info!(trip_id = %trip_id, "Deleted trip");
        }
        Self::respond("delete", Trip::KIND, result, "Trip deleted successfully".to_string())
    }

    // =========================================================================
    // Itinerary
    // =========================================================================

    /// Itinerary days are keyed by their date.
    fn day_id(date: &str) -> Result<DocumentId> {
        DocumentId::new(date).map_err(|e| StoreError::InvalidPath(e.to_string()))
    }

    /// Itinerary days of a trip, ordered by date.
    pub fn list_itinerary_days(
        &self,
        trip_id: &TripId,
    ) -> ServiceResponse<Vec<Stored<ItineraryDay>>> {
        let mut response = self.list::<ItineraryDay>(&Scope::Trip(trip_id.clone()));
        if let Some(days) = response.data.as_mut() {
            days.sort_by(|a, b| a.record.date.cmp(&b.record.date));
        }
        response
    }

    /// Fetch the itinerary of one day.
    pub fn fetch_itinerary_day(
        &self,
        trip_id: &TripId,
        date: &str,
    ) -> ServiceResponse<Stored<ItineraryDay>> {
        match Self::day_id(date) {
            Ok(id) => self.fetch(&Scope::Trip(trip_id.clone()), &id),
            Err(e) => Self::respond("fetch", ItineraryDay::KIND, Err(e), String::new()),
        }
    }

    /// Load a day (empty if it does not exist yet), apply `edit`, and save it.
    ///
    /// Nothing is written if `edit` fails.
    fn edit_day(
        &self,
        trip_id: &TripId,
        date: &str,
        edit: impl FnOnce(&mut ItineraryDay) -> Result<()>,
    ) -> Result<Stored<ItineraryDay>> {
        let scope = Scope::Trip(trip_id.clone());
        let id = Self::day_id(date)?;

        let (mut day, exists) = match self.store.get(&scope, Collection::Itinerary, &id)? {
            Some(document) => (Stored::<ItineraryDay>::from_document(document)?.record, true),
            None => (ItineraryDay::new(trip_id.clone(), date), false),
        };
        edit(&mut day)?;

        let body = Self::to_body(&day)?;
        let document = if exists {
            self.store.update(&scope, Collection::Itinerary, &id, body)?
        } else {
            self.store.create_with_id(&scope, Collection::Itinerary, id, body)?
        };
        Stored::from_document(document)
    }

    /// Add an event to a day, or replace the event with the same ID.
    ///
    /// The day is created if it does not exist yet.
    pub fn upsert_itinerary_event(
        &self,
        trip_id: &TripId,
        date: &str,
        event: ItineraryEvent,
    ) -> ServiceResponse<Stored<ItineraryDay>> {
        let event_id = event.id.clone();
        let result = self.edit_day(trip_id, date, |day| {
            day.upsert_event(event);
            Ok(())
        });
        if result.is_ok() {
            tracing::debug!(
                trip_id = %trip_id,
                date,
                event_id = %event_id,
                "Saved itinerary event"
            );
        }
        Self::respond(
            "save",
            EVENT_KIND,
            result,
            format!("{EVENT_KIND} saved successfully"),
        )
    }

    /// Remove an event from a day.
    pub fn delete_itinerary_event(
        &self,
        trip_id: &TripId,
        date: &str,
        event_id: &str,
    ) -> ServiceResponse<Stored<ItineraryDay>> {
        let result = self.edit_day(trip_id, date, |day| {
            if day.remove_event(event_id) {
                Ok(())
            } else {
                Err(StoreError::NotFound)
            }
        });
        Self::respond(
            "delete",
            EVENT_KIND,
            result,
            format!("{EVENT_KIND} deleted successfully"),
        )
    }

    /// Set the notes of a day, creating the day if needed.
    pub fn update_itinerary_day_notes(
        &self,
        trip_id: &TripId,
        date: &str,
        notes: &str,
    ) -> ServiceResponse<Stored<ItineraryDay>> {
        let result = self.edit_day(trip_id, date, |day| {
            day.daily_notes = Some(notes.to_string());
            Ok(())
        });
        Self::respond(
            "update",
            ItineraryDay::KIND,
            result,
            "Daily notes updated successfully".to_string(),
        )
    }

    // =========================================================================
    // Tasks
    // =========================================================================

    /// Tasks of a trip that match `filter`.
    pub fn list_tasks(
        &self,
        trip_id: &TripId,
        filter: &TaskFilter,
    ) -> ServiceResponse<Vec<Stored<Task>>> {
        let mut response = self.list::<Task>(&Scope::Trip(trip_id.clone()));
        if let Some(tasks) = response.data.as_mut() {
            tasks.retain(|t| filter.matches(&t.record));
        }
        response
    }

    // =========================================================================
    // Packing
    // =========================================================================

    /// Flip the packed flag of an item.
    pub fn toggle_packed(
        &self,
        trip_id: &TripId,
        id: &DocumentId,
    ) -> ServiceResponse<Stored<PackingItem>> {
        let scope = Scope::Trip(trip_id.clone());
        let current = self.fetch::<PackingItem>(&scope, id);
        match current.data {
            Some(item) => self.update(
                &scope,
                id,
                serde_json::json!({ "isPacked": !item.record.is_packed }),
            ),
            None => current,
        }
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Fetch a user's profile, creating a default one on first sight.
    pub fn fetch_or_create_profile(
        &self,
        default: &UserProfile,
    ) -> ServiceResponse<Stored<UserProfile>> {
        let id = match DocumentId::new(default.uid.as_str()) {
            Ok(id) => id,
            Err(e) => {
                let error = StoreError::InvalidPath(e.to_string());
                return ServiceResponse::failure("Failed to fetch profile", &error);
            }
        };

        let existing = self.fetch::<UserProfile>(&Scope::Global, &id);
        if existing.success || existing.error_code.as_deref() != Some(StoreError::NotFound.code()) {
            return existing;
        }

        let result = Self::to_body(default)
            .and_then(|body| {
                self.store
                    .create_with_id(&Scope::Global, Collection::Profiles, id, body)
            })
            .and_then(Stored::from_document);
        if result.is_ok() {
            tracing::info!(uid = %default.uid, "Created default profile");
        }
        Self::respond(
            "create",
            UserProfile::KIND,
            result,
            "Profile created successfully".to_string(),
        )
    }
}
