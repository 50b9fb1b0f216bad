//! Waitlist entry record.

use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, PetId, ServiceId, WaitlistEntryId};
use serde::{Deserialize, Serialize};

use super::{TimePreference, WaitlistStatus};

/// A customer's request to be seen for a service on (or near) a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: WaitlistEntryId,
    pub customer_id: CustomerId,
    pub pet_id: PetId,
    pub service_id: ServiceId,
    pub requested_date: NaiveDate,
    pub time_preference: TimePreference,
    /// Higher values rank first.
    pub priority: i32,
    pub note: Option<String>,
    pub status: WaitlistStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WaitlistEntry {
    /// Creates an `Active` entry with default priority and no preference.
    pub fn new(
        customer_id: CustomerId,
        pet_id: PetId,
        service_id: ServiceId,
        requested_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WaitlistEntryId::new(),
            customer_id,
            pet_id,
            service_id,
            requested_date,
            time_preference: TimePreference::Any,
            priority: 0,
            note: None,
            status: WaitlistStatus::Active,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_time_preference(mut self, preference: TimePreference) -> Self {
        self.time_preference = preference;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Absolute distance in days between the requested date and `date`.
    pub fn days_from(&self, date: NaiveDate) -> i64 {
        (self.requested_date - date).num_days().abs()
    }
}
