//! Notification gateway trait and in-memory implementation.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AppointmentId, OfferId, WaitlistEntryId};
use domain::Discount;

use crate::error::FillError;

/// What a message tells its recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A slot is available; reply to accept before `expires_at`.
    OfferAvailable {
        service_name: String,
        start: DateTime<Utc>,
        discount: Discount,
        expires_at: DateTime<Utc>,
    },
    /// The slot was taken or the offer lapsed; the recipient stays on the
    /// waitlist.
    SlotFilled,
    /// The recipient won the slot.
    BookingConfirmed {
        service_name: String,
        start: DateTime<Utc>,
        appointment_id: AppointmentId,
    },
}

impl Notice {
    pub fn kind(&self) -> &'static str {
        match self {
            Notice::OfferAvailable { .. } => "offer_available",
            Notice::SlotFilled => "slot_filled",
            Notice::BookingConfirmed { .. } => "booking_confirmed",
        }
    }
}

/// One outbound message to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Normalized phone number.
    pub to: String,
    pub offer_id: OfferId,
    /// Candidate entry the message concerns, when known.
    pub entry_id: Option<WaitlistEntryId>,
    pub notice: Notice,
}

/// Trait for outbound message delivery.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), FillError>;
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<OutboundMessage>,
    failing_recipients: HashSet<String>,
}

/// In-memory notification gateway for testing.
///
/// Records every delivered message.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationGateway {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes delivery to `recipient` fail.
    pub fn fail_for(&self, recipient: impl Into<String>) {
        self.state
            .write()
            .unwrap()
            .failing_recipients
            .insert(recipient.into());
    }

    /// Returns every delivered message in send order.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.state.read().unwrap().sent.clone()
    }

    /// Returns delivered messages addressed to `recipient`.
    pub fn sent_to(&self, recipient: &str) -> Vec<OutboundMessage> {
        self.state
            .read()
            .unwrap()
            .sent
            .iter()
            .filter(|m| m.to == recipient)
            .cloned()
            .collect()
    }

    /// Returns the number of delivered messages of the given kind.
    pub fn count_of(&self, kind: &str) -> usize {
        self.state
            .read()
            .unwrap()
            .sent
            .iter()
            .filter(|m| m.notice.kind() == kind)
            .count()
    }
}

#[async_trait]
impl NotificationGateway for InMemoryNotificationGateway {
    async fn send(&self, message: OutboundMessage) -> Result<(), FillError> {
        let mut state = self.state.write().unwrap();
        if state.failing_recipients.contains(&message.to) {
            return Err(FillError::Notification(format!(
                "Delivery to {} rejected",
                message.to
            )));
        }
        state.sent.push(message);
        Ok(())
    }
}
