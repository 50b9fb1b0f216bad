//! Slot offers and acceptance outcomes.

mod record;
mod resolution;
mod state;
mod value_objects;

pub use record::{OfferDraft, SlotOffer};
pub use resolution::Resolution;
pub use state::OfferStatus;
pub use value_objects::{Discount, Slot};
