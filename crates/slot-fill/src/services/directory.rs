//! Customer and service directory trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, ServiceId};
use domain::normalize_phone;

use crate::error::FillError;

/// How to reach a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub customer_id: CustomerId,
    /// Normalized phone number (`+<digits>`).
    pub phone: String,
    pub name: Option<String>,
}

/// Read access to customer contacts and service names owned elsewhere.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn contact_for(&self, customer_id: CustomerId) -> Result<Option<Contact>, FillError>;

    /// Customers whose normalized phone equals `phone`.
    async fn customers_by_phone(&self, phone: &str) -> Result<Vec<CustomerId>, FillError>;

    async fn service_name(&self, service_id: ServiceId) -> Result<Option<String>, FillError>;
}

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    contacts: HashMap<CustomerId, Contact>,
    services: HashMap<ServiceId, String>,
}

/// In-memory directory for testing.
#[derive(Debug, Clone)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
    default_country_code: String,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new("1")
    }
}

impl InMemoryDirectory {
    /// Creates an empty directory normalizing national numbers with
    /// `default_country_code`.
    pub fn new(default_country_code: impl Into<String>) -> Self {
        Self {
            state: Arc::default(),
            default_country_code: default_country_code.into(),
        }
    }

    /// Registers a customer's phone number.
    ///
    /// Returns the stored contact, or `None` if the number is not usable.
    pub fn add_customer(
        &self,
        customer_id: CustomerId,
        phone: &str,
        name: Option<&str>,
    ) -> Option<Contact> {
        let phone = normalize_phone(phone, &self.default_country_code)?;
        let contact = Contact {
            customer_id,
            phone,
            name: name.map(str::to_string),
        };
        self.state
            .write()
            .unwrap()
            .contacts
            .insert(customer_id, contact.clone());
        Some(contact)
    }

    pub fn add_service(&self, service_id: ServiceId, name: impl Into<String>) {
        self.state
            .write()
            .unwrap()
            .services
            .insert(service_id, name.into());
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn contact_for(&self, customer_id: CustomerId) -> Result<Option<Contact>, FillError> {
        Ok(self.state.read().unwrap().contacts.get(&customer_id).cloned())
    }

    async fn customers_by_phone(&self, phone: &str) -> Result<Vec<CustomerId>, FillError> {
        let state = self.state.read().unwrap();
        let mut customers: Vec<_> = state
            .contacts
            .values()
            .filter(|c| c.phone == phone)
            .map(|c| c.customer_id)
            .collect();
        customers.sort();
        Ok(customers)
    }

    async fn service_name(&self, service_id: ServiceId) -> Result<Option<String>, FillError> {
        Ok(self.state.read().unwrap().services.get(&service_id).cloned())
    }
}
