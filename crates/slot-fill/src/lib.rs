//! Waitlist slot-filling engine.
//!
//! When a booked slot opens up, the engine finds waiting customers who could
//! take it, offers it to several of them at once and books it for at most
//! one of them:
//! 1. [`SlotMatcher`] ranks matching waitlist entries
//! 2. [`OfferOrchestrator`] opens a time-boxed offer and notifies candidates
//! 3. [`ResponseResolver`] settles racing acceptances through a single
//!    compare-and-set claim, then books the winner
//! 4. [`ExpirationSweeper`] closes lapsed offers and returns their
//!    candidates to the waitlist
//!
//! Inbound replies reach the resolver through [`InboundHandler`]; the
//! booking service, notification gateway and directory sit behind the traits
//! in [`services`].

pub mod collaborators;
pub mod config;
pub mod engine;
pub mod error;
pub mod inbound;
pub mod matcher;
pub mod orchestrator;
pub mod resolver;
pub mod services;
pub mod sweeper;

pub use collaborators::Collaborators;
pub use config::FillConfig;
pub use engine::SlotFillEngine;
pub use error::{FillError, Result};
pub use inbound::{InboundHandler, InboundMessage, InboundOutcome};
pub use matcher::SlotMatcher;
pub use orchestrator::{FillOutcome, OfferOrchestrator};
pub use resolver::ResponseResolver;
pub use services::{
    AppointmentRequest, BookingService, Contact, Directory, InMemoryBookingService,
    InMemoryDirectory, InMemoryNotificationGateway, Notice, NotificationGateway, OutboundMessage,
};
pub use sweeper::{ExpirationSweeper, SweepRunner};
