//! Waitlist entries and their lifecycle.

mod entry;
mod preference;
mod state;

pub use entry::WaitlistEntry;
pub use preference::TimePreference;
pub use state::WaitlistStatus;
