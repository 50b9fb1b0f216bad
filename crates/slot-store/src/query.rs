use chrono::NaiveDate;
use common::{CustomerId, ServiceId};
use domain::{WaitlistEntry, WaitlistStatus};

/// Builder for constructing waitlist entry queries.
///
/// Every filter is optional; unset filters match everything. Results are
/// ordered by priority descending, then creation time ascending.
#[derive(Debug, Clone, Default)]
pub struct WaitlistQuery {
    /// Filter by service.
    pub service_id: Option<ServiceId>,

    /// Filter by status (any of these).
    pub statuses: Option<Vec<WaitlistStatus>>,

    /// Filter by owning customer (any of these).
    pub customer_ids: Option<Vec<CustomerId>>,

    /// Requested date on or after this date.
    pub requested_from: Option<NaiveDate>,

    /// Requested date on or before this date.
    pub requested_to: Option<NaiveDate>,

    /// Maximum number of entries to return.
    pub limit: Option<usize>,
}

impl WaitlistQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for `Active` entries of a service whose requested date
    /// falls within `[from, to]`.
    pub fn matchable(service_id: ServiceId, from: NaiveDate, to: NaiveDate) -> Self {
        Self::new()
            .service_id(service_id)
            .status(WaitlistStatus::Active)
            .requested_between(from, to)
    }

    pub fn service_id(mut self, service_id: ServiceId) -> Self {
        self.service_id = Some(service_id);
        self
    }

    pub fn status(mut self, status: WaitlistStatus) -> Self {
        self.statuses = Some(vec![status]);
        self
    }

    pub fn statuses(mut self, statuses: Vec<WaitlistStatus>) -> Self {
        self.statuses = Some(statuses);
        self
    }

    pub fn customer_ids(mut self, customer_ids: Vec<CustomerId>) -> Self {
        self.customer_ids = Some(customer_ids);
        self
    }

    /// Filters by requested date range (inclusive).
    pub fn requested_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.requested_from = Some(from);
        self.requested_to = Some(to);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if `entry` passes every filter.
    pub fn matches(&self, entry: &WaitlistEntry) -> bool {
        if let Some(service_id) = self.service_id
            && entry.service_id != service_id
        {
            return false;
        }
        if let Some(ref statuses) = self.statuses
            && !statuses.contains(&entry.status)
        {
            return false;
        }
        if let Some(ref customers) = self.customer_ids
            && !customers.contains(&entry.customer_id)
        {
            return false;
        }
        if let Some(from) = self.requested_from
            && entry.requested_date < from
        {
            return false;
        }
        if let Some(to) = self.requested_to
            && entry.requested_date > to
        {
            return false;
        }
        true
    }
}
