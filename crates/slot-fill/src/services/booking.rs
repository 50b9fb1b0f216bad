//! Booking service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AppointmentId, CustomerId, OfferId, PetId, ServiceId, WaitlistEntryId};
use domain::Discount;

use crate::error::FillError;

/// Everything needed to create an appointment for a claimed slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRequest {
    pub offer_id: OfferId,
    pub entry_id: WaitlistEntryId,
    pub customer_id: CustomerId,
    pub pet_id: PetId,
    pub service_id: ServiceId,
    pub start: DateTime<Utc>,
    pub discount: Discount,
}

impl AppointmentRequest {
    /// Key the booking service can de-duplicate retries on.
    pub fn idempotency_key(&self) -> (OfferId, WaitlistEntryId) {
        (self.offer_id, self.entry_id)
    }
}

/// Trait for appointment creation.
#[async_trait]
pub trait BookingService: Send + Sync {
    /// Creates the appointment.
    ///
    /// Repeating a request with the same idempotency key must return the same
    /// appointment rather than booking twice.
    async fn create_appointment(
        &self,
        request: AppointmentRequest,
    ) -> Result<AppointmentId, FillError>;
}

#[derive(Debug, Default)]
struct InMemoryBookingState {
    appointments: HashMap<(OfferId, WaitlistEntryId), (AppointmentId, AppointmentRequest)>,
    next_id: u32,
    fail_on_create: bool,
    delay: Option<Duration>,
}

/// In-memory booking service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookingService {
    state: Arc<RwLock<InMemoryBookingState>>,
}

impl InMemoryBookingService {
    /// Creates a new in-memory booking service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to refuse every booking.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Makes every booking wait `delay` before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().unwrap().delay = delay;
    }

    /// Returns the number of appointments created.
    pub fn appointment_count(&self) -> usize {
        self.state.read().unwrap().appointments.len()
    }

    /// Returns the requests that produced an appointment.
    pub fn booked_requests(&self) -> Vec<AppointmentRequest> {
        self.state
            .read()
            .unwrap()
            .appointments
            .values()
            .map(|(_, request)| request.clone())
            .collect()
    }
}

#[async_trait]
impl BookingService for InMemoryBookingService {
    async fn create_appointment(
        &self,
        request: AppointmentRequest,
    ) -> Result<AppointmentId, FillError> {
        let delay = self.state.read().unwrap().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(FillError::Booking("Calendar slot no longer free".to_string()));
        }

        let key = request.idempotency_key();
        if let Some((existing, _)) = state.appointments.get(&key) {
            return Ok(existing.clone());
        }

        state.next_id += 1;
        let appointment_id = AppointmentId::new(format!("APT-{:04}", state.next_id));
        state
            .appointments
            .insert(key, (appointment_id.clone(), request));

        Ok(appointment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn request() -> AppointmentRequest {
        AppointmentRequest {
            offer_id: OfferId::new(),
            entry_id: WaitlistEntryId::new(),
            customer_id: CustomerId::new(),
            pet_id: PetId::new(),
            service_id: ServiceId::new(),
            start: Utc.with_ymd_and_hms(2026, 3, 11, 10, 0, 0).unwrap(),
            discount: Discount::new(10).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_create_appointment() {
        let service = InMemoryBookingService::new();
        let id = service.create_appointment(request()).await.unwrap();
        assert_eq!(id.as_str(), "APT-0001");
        assert_eq!(service.appointment_count(), 1);
    }

    #[tokio::test]
    async fn test_same_key_books_once() {
        let service = InMemoryBookingService::new();
        let req = request();
        let first = service.create_appointment(req.clone()).await.unwrap();
        let second = service.create_appointment(req).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(service.appointment_count(), 1);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let service = InMemoryBookingService::new();
        service.set_fail_on_create(true);
        assert!(matches!(
            service.create_appointment(request()).await,
            Err(FillError::Booking(_))
        ));
        assert_eq!(service.appointment_count(), 0);
    }
}
