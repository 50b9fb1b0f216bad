//! Identifier types shared by every layer of the slot-filling engine.

mod types;

pub use types::{AppointmentId, CustomerId, OfferId, PetId, ServiceId, WaitlistEntryId};
