//! External collaborator traits and in-memory implementations.

pub mod booking;
pub mod directory;
pub mod notification;

pub use booking::{AppointmentRequest, BookingService, InMemoryBookingService};
pub use directory::{Contact, Directory, InMemoryDirectory};
pub use notification::{InMemoryNotificationGateway, Notice, NotificationGateway, OutboundMessage};
