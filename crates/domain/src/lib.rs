//! Domain layer for the waitlist slot-filling engine.
//!
//! This crate holds the pure data model:
//! - Waitlist entries and their lifecycle
//! - Slot offers, their lifecycle and acceptance outcomes
//! - Candidate ranking for an open slot
//! - Reply and sender normalization for the inbound channel
//! - An injectable clock

pub mod clock;
pub mod error;
pub mod offer;
pub mod phone;
pub mod ranking;
pub mod reply;
pub mod waitlist;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DomainError;
pub use offer::{Discount, OfferDraft, OfferStatus, Resolution, Slot, SlotOffer};
pub use phone::normalize_phone;
pub use ranking::{MatchCriteria, rank_candidates};
pub use reply::{DEFAULT_AFFIRMATIVE_REPLIES, ReplyMatcher};
pub use waitlist::{TimePreference, WaitlistEntry, WaitlistStatus};
