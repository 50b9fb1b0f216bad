//! Handles to the external systems the engine talks to.

use std::sync::Arc;

use domain::Clock;

use crate::services::{BookingService, Directory, NotificationGateway};

/// Shared handles to the booking service, notification gateway, directory
/// and clock.
#[derive(Clone)]
pub struct Collaborators {
    pub booking: Arc<dyn BookingService>,
    pub notifier: Arc<dyn NotificationGateway>,
    pub directory: Arc<dyn Directory>,
    pub clock: Arc<dyn Clock>,
}

impl Collaborators {
    pub fn new(
        booking: Arc<dyn BookingService>,
        notifier: Arc<dyn NotificationGateway>,
        directory: Arc<dyn Directory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            booking,
            notifier,
            directory,
            clock,
        }
    }
}

#[cfg(test)]
pub(crate) use fakes::TestCollaborators;
