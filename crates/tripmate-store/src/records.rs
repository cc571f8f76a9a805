//! Typed records stored in the document collections.
//!
//! Field names are camelCase on the wire so documents stay compatible with the
//! web client.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tripmate_core::{DocumentId, TripId, UserId};

use crate::types::{Collection, Document};
use crate::error::{Result, StoreError};

/// A record type bound to one collection.
pub trait Record: Serialize + DeserializeOwned {
    /// The collection records of this type live in.
    const COLLECTION: Collection;

    /// Human-readable kind used in service messages ("Trip", "Task", ...).
    const KIND: &'static str;
}

/// A record together with its identifier and timestamps in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stored<R> {
    /// Document identifier.
    pub id: DocumentId,
    /// The record itself.
    #[serde(flatten)]
    pub record: R,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
    /// Last update time, epoch milliseconds.
    pub updated_at: i64,
}

impl<R: Record> Stored<R> {
    /// Decode a stored document into a typed record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the document body does not match `R`.
    pub fn from_document(document: Document) -> Result<Self> {
        let record = serde_json::from_value(document.data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self {
            id: document.id,
            record,
            created_at: document.created_at.to_epoch_millis(),
            updated_at: document.updated_at.to_epoch_millis(),
        })
    }
}

// =============================================================================
// Trips
// =============================================================================

/// Geographic location of a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLocation {
    /// Display name.
    pub name: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// Trip lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripStatus {
    /// Not started yet.
    #[default]
    Upcoming,
    /// Finished.
    Completed,
    /// Called off.
    Cancelled,
}

/// A trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// Trip name.
    pub name: String,
    /// Destination.
    pub location: TripLocation,
    /// First day (ISO date).
    pub start_date: String,
    /// Last day (ISO date).
    pub end_date: String,
    /// Creator.
    pub created_by: UserId,
    /// Invited members (creator not included).
    #[serde(default)]
    pub members: Vec<UserId>,
    /// Invitation code for joining.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,
    /// Cover photo.
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: TripStatus,
}

impl Trip {
    /// Whether `user_id` created or is a member of this trip.
    #[must_use]
    pub fn involves(&self, user_id: &UserId) -> bool {
        &self.created_by == user_id || self.members.contains(user_id)
    }
}

impl Record for Trip {
    const COLLECTION: Collection = Collection::Trips;
    const KIND: &'static str = "Trip";
}

// =============================================================================
// Itinerary
// =============================================================================

/// Category of an itinerary event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventCategory {
    /// Sightseeing, hiking, and so on.
    Activity,
    /// A meal.
    Meal,
    /// Getting from A to B.
    Travel,
    /// Accommodation.
    Lodging,
    /// Camp chores.
    CampChore,
    /// A meeting.
    Meeting,
    /// Downtime.
    Relaxation,
    /// Anything else.
    Other,
}

/// A single event within a day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryEvent {
    /// Event identifier, unique within the day.
    pub id: String,
    /// Event name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Start time (ISO time or date-time).
    pub start_time: String,
    /// End time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Where it happens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    /// Category.
    pub category: EventCategory,
    /// Users the event is assigned to.
    #[serde(default)]
    pub assigned_to: Vec<UserId>,
    /// Whether the event is done.
    #[serde(default)]
    pub is_completed: bool,
    /// Estimated cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    /// Notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One day of a trip's itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItineraryDay {
    /// Owning trip.
    pub trip_id: TripId,
    /// The day (ISO date).
    pub date: String,
    /// Events, in display order.
    #[serde(default)]
    pub events: Vec<ItineraryEvent>,
    /// Notes for the whole day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_notes: Option<String>,
}

impl ItineraryDay {
    /// An empty day.
    #[must_use]
    pub fn new(trip_id: TripId, date: impl Into<String>) -> Self {
        Self {
            trip_id,
            date: date.into(),
            events: Vec::new(),
            daily_notes: None,
        }
    }

    /// Insert or replace an event by ID.
    pub fn upsert_event(&mut self, event: ItineraryEvent) {
        match self.events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
    }

    /// Remove an event by ID. Returns whether it existed.
    pub fn remove_event(&mut self, event_id: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|e| e.id != event_id);
        self.events.len() != before
    }
}

impl Record for ItineraryDay {
    const COLLECTION: Collection = Collection::Itinerary;
    const KIND: &'static str = "Itinerary day";
}

// =============================================================================
// Packing
// =============================================================================

/// Packing item category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PackingCategory {
    /// Clothing.
    Clothing,
    /// Food.
    Food,
    /// Camping gear.
    CampingGear,
    /// Cooking equipment.
    Cooking,
    /// Safety equipment.
    Safety,
    /// Electronics.
    Electronics,
    /// Personal care.
    PersonalCare,
    /// Everything else.
    Misc,
}

/// Who an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PackingType {
    /// Brought by one person for themselves.
    Personal,
    /// Shared by the group.
    Shared,
}

/// An item on a trip's packing list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingItem {
    /// Owning trip.
    pub trip_id: TripId,
    /// Who brings it.
    pub owner_id: UserId,
    /// Item name.
    pub name: String,
    /// How many.
    pub quantity: u32,
    /// Category.
    pub category: PackingCategory,
    /// Personal or shared.
    #[serde(rename = "type")]
    pub packing_type: PackingType,
    /// Whether it is packed.
    #[serde(default)]
    pub is_packed: bool,
    /// Pack-by date (ISO).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Record for PackingItem {
    const COLLECTION: Collection = Collection::Packing;
    const KIND: &'static str = "Packing item";
}

// =============================================================================
// Tasks
// =============================================================================

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskPriority {
    /// Low.
    Low,
    /// Medium.
    #[default]
    Medium,
    /// High.
    High,
}

/// Task progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Pending,
    /// Being worked on.
    InProgress,
    /// Done.
    Completed,
    /// Dropped.
    Cancelled,
}

/// A task on a trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Owning trip.
    pub trip_id: TripId,
    /// Title.
    pub title: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Assignees.
    #[serde(default)]
    pub assigned_to: Vec<UserId>,
    /// Due date (ISO).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Priority.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Progress.
    #[serde(default)]
    pub status: TaskStatus,
    /// Creator.
    pub owner_id: UserId,
}

impl Record for Task {
    const COLLECTION: Collection = Collection::Tasks;
    const KIND: &'static str = "Task";
}

/// Criteria for listing tasks. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks assigned to this user.
    pub assigned_to: Option<UserId>,
    /// Only tasks in this state.
    pub status: Option<TaskStatus>,
    /// Only tasks of this priority.
    pub priority: Option<TaskPriority>,
}

impl TaskFilter {
    /// Whether `task` meets every set criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.assigned_to
            .as_ref()
            .is_none_or(|user| task.assigned_to.contains(user))
            && self.status.is_none_or(|status| task.status == status)
            && self.priority.is_none_or(|priority| task.priority == priority)
    }
}

// =============================================================================
// Profiles
// =============================================================================

/// UI preferences of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Whether notifications are enabled.
    pub notifications: bool,
    /// UI theme name.
    pub theme: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            notifications: true,
            theme: "light".to_string(),
        }
    }
}

/// A user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User identifier.
    pub uid: UserId,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar.
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Preferences.
    #[serde(default)]
    pub preferences: UserPreferences,
}

impl UserProfile {
    /// A default profile for a newly seen user.
    #[must_use]
    pub fn new_default(uid: UserId, display_name: Option<String>, email: Option<String>) -> Self {
        Self {
            uid,
            display_name,
            email,
            photo_url: None,
            preferences: UserPreferences::default(),
        }
    }
}

impl Record for UserProfile {
    const COLLECTION: Collection = Collection::Profiles;
    const KIND: &'static str = "Profile";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Scope, ServerTimestamp};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn sample_trip() -> Trip {
        Trip {
            name: "Yosemite".to_string(),
            location: TripLocation {
                name: "Yosemite Valley".to_string(),
                lat: 37.74,
                lng: -119.57,
            },
            start_date: "2025-07-01".to_string(),
            end_date: "2025-07-05".to_string(),
            created_by: user("alice"),
            members: vec![user("bob"), user("alice")],
            invite_code: None,
            photo_url: None,
            status: TripStatus::Upcoming,
        }
    }

    #[test]
    fn trip_uses_camel_case_fields() {
        let json = serde_json::to_value(sample_trip()).unwrap();
        assert_eq!(json["startDate"], "2025-07-01");
        assert_eq!(json["createdBy"], "alice");
        assert_eq!(json["status"], "upcoming");
        assert!(json.get("inviteCode").is_none());
    }

    #[test]
    fn trip_involves_creator_and_members() {
        let trip = sample_trip();
        assert!(trip.involves(&user("alice")));
        assert!(trip.involves(&user("bob")));
        assert!(!trip.involves(&user("carol")));
    }

    #[test]
    fn packing_type_serializes_as_type() {
        let item = PackingItem {
            trip_id: TripId::new("t1").unwrap(),
            owner_id: user("alice"),
            name: "Tent".to_string(),
            quantity: 1,
            category: PackingCategory::CampingGear,
            packing_type: PackingType::Shared,
            is_packed: false,
            due_date: None,
            notes: None,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "shared");
        assert_eq!(json["category"], "campingGear");
    }

    #[test]
    fn task_defaults_apply() {
        let json = serde_json::json!({
            "tripId": "t1",
            "title": "Book campsite",
            "ownerId": "alice"
        });
        let task: Task = serde_json::from_value(json).unwrap();
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.assigned_to.is_empty());
    }

    #[test]
    fn task_filter_requires_every_criterion() {
        let task = Task {
            trip_id: TripId::new("t1").unwrap(),
            title: "Buy fuel".to_string(),
            description: None,
            assigned_to: vec![user("bob")],
            due_date: None,
            priority: TaskPriority::High,
            status: TaskStatus::Pending,
            owner_id: user("alice"),
        };

        assert!(TaskFilter::default().matches(&task));
        assert!(TaskFilter {
            assigned_to: Some(user("bob")),
            priority: Some(TaskPriority::High),
            ..TaskFilter::default()
        }
        .matches(&task));
        assert!(!TaskFilter {
            assigned_to: Some(user("bob")),
            status: Some(TaskStatus::Completed),
            ..TaskFilter::default()
        }
        .matches(&task));
        assert!(!TaskFilter {
            assigned_to: Some(user("alice")),
            ..TaskFilter::default()
        }
        .matches(&task));
    }

    #[test]
    fn itinerary_event_upsert_and_remove() {
        let mut day = ItineraryDay::new(TripId::new("t1").unwrap(), "2025-07-01");
        let mut event = ItineraryEvent {
            id: "e1".to_string(),
            name: "Hike".to_string(),
            description: None,
            start_time: "08:00".to_string(),
            end_time: None,
            location_name: None,
            category: EventCategory::Activity,
            assigned_to: Vec::new(),
            is_completed: false,
            estimated_cost: None,
            notes: None,
        };
        day.upsert_event(event.clone());
        event.is_completed = true;
        day.upsert_event(event);

        assert_eq!(day.events.len(), 1);
        assert!(day.events[0].is_completed);
        assert!(day.remove_event("e1"));
        assert!(!day.remove_event("e1"));
    }

    #[test]
    fn stored_from_document_converts_timestamps() {
        let created = ServerTimestamp::from_epoch_millis(1_000).unwrap();
        let updated = ServerTimestamp::from_epoch_millis(2_000).unwrap();
        let document = Document {
            id: DocumentId::new("trip-1").unwrap(),
            scope: Scope::Global,
            collection: Collection::Trips,
            data: serde_json::to_value(sample_trip()).unwrap(),
            created_at: created,
            updated_at: updated,
        };

        let stored = Stored::<Trip>::from_document(document).unwrap();
        assert_eq!(stored.created_at, 1_000);
        assert_eq!(stored.updated_at, 2_000);
        assert_eq!(stored.record.name, "Yosemite");
    }
}
