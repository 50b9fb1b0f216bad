//! Storage boundary for the waitlist slot-filling engine.
//!
//! Waitlist entries and slot offers live behind the [`WaitlistStore`],
//! [`OfferStore`] and [`SlotStore`] traits. Offer status changes go through
//! a single compare-and-set primitive, [`OfferStore::try_transition`], which
//! is the only synchronization the engine relies on: there is no in-process
//! locking above this layer.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;
pub mod transition;

pub use error::{Result, StoreError};
pub use memory::InMemorySlotStore;
pub use postgres::PostgresSlotStore;
pub use query::WaitlistQuery;
pub use store::{
    AcceptanceRecord, CANCELLABLE, OfferStore, RELEASABLE, SlotStore, WaitlistStore,
    WaitlistStoreExt,
};
pub use transition::{ClaimantUpdate, DeadlineGuard, OfferTransition};
