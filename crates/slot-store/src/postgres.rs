use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{AppointmentId, CustomerId, OfferId, PetId, ServiceId, WaitlistEntryId};
use domain::{
    Discount, DomainError, OfferDraft, Resolution, Slot, SlotOffer, WaitlistEntry,
    WaitlistStatus,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    ClaimantUpdate, DeadlineGuard, OfferTransition, Result, StoreError, WaitlistQuery,
    store::{AcceptanceRecord, OfferStore, SlotStore, WaitlistStore},
};

const ENTRY_COLUMNS: &str = "id, customer_id, pet_id, service_id, requested_date, time_preference, \
     priority, note, status, created_at, updated_at";

const OFFER_COLUMNS: &str = "id, service_id, slot_start, candidate_ids, discount_percent, \
     response_window_secs, created_at, expires_at, status, claimant_entry_id, claimed_at, \
     appointment_id";

/// PostgreSQL-backed slot store implementation.
///
/// Offer transitions are single conditional `UPDATE`s; the affected row count
/// decides who won.
#[derive(Clone)]
pub struct PostgresSlotStore {
    pool: PgPool,
}

impl PostgresSlotStore {
    /// Creates a new PostgreSQL slot store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool of at most `max_connections` to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_entry(row: PgRow) -> Result<WaitlistEntry> {
        let time_preference: String = row.try_get("time_preference")?;
        let status: String = row.try_get("status")?;

        Ok(WaitlistEntry {
            id: WaitlistEntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            pet_id: PetId::from_uuid(row.try_get::<Uuid, _>("pet_id")?),
            service_id: ServiceId::from_uuid(row.try_get::<Uuid, _>("service_id")?),
            requested_date: row.try_get("requested_date")?,
            time_preference: time_preference.parse()?,
            priority: row.try_get("priority")?,
            note: row.try_get("note")?,
            status: status.parse()?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_offer(row: PgRow) -> Result<SlotOffer> {
        let status: String = row.try_get("status")?;
        let candidates: Vec<Uuid> = row.try_get("candidate_ids")?;
        let discount: i16 = row.try_get("discount_percent")?;
        let window_secs: i64 = row.try_get("response_window_secs")?;
        let discount = Discount::new(discount.clamp(0, u8::MAX.into()) as u8)?;
        let response_window =
            Duration::try_seconds(window_secs).ok_or_else(|| DomainError::UnknownStatus {
                kind: "response window",
                value: window_secs.to_string(),
            })?;

        Ok(SlotOffer {
            id: OfferId::from_uuid(row.try_get::<Uuid, _>("id")?),
            slot: Slot::new(
                ServiceId::from_uuid(row.try_get::<Uuid, _>("service_id")?),
                row.try_get("slot_start")?,
            ),
            candidates: candidates
                .into_iter()
                .map(WaitlistEntryId::from_uuid)
                .collect(),
            discount,
            response_window,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
            status: status.parse()?,
            claimant: row
                .try_get::<Option<Uuid>, _>("claimant_entry_id")?
                .map(WaitlistEntryId::from_uuid),
            claimed_at: row.try_get("claimed_at")?,
            appointment_id: row
                .try_get::<Option<String>, _>("appointment_id")?
                .map(AppointmentId::new),
        })
    }

    fn row_to_acceptance(row: PgRow) -> Result<AcceptanceRecord> {
        let outcome: String = row.try_get("outcome")?;
        let appointment_id = row
            .try_get::<Option<String>, _>("appointment_id")?
            .map(AppointmentId::new);

        Ok(AcceptanceRecord {
            offer_id: OfferId::from_uuid(row.try_get::<Uuid, _>("offer_id")?),
            entry_id: WaitlistEntryId::from_uuid(row.try_get::<Uuid, _>("entry_id")?),
            sender: row.try_get("sender")?,
            resolution: Resolution::from_parts(&outcome, appointment_id)?,
            received_at: row.try_get("received_at")?,
        })
    }
}

fn uuids<T: Copy + Into<Uuid>>(ids: &[T]) -> Vec<Uuid> {
    ids.iter().map(|id| (*id).into()).collect()
}

fn status_names(statuses: &[WaitlistStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

fn map_unique_violation(e: sqlx::Error, constraint: &str, err: StoreError) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
        && db_err.constraint() == Some(constraint)
    {
        return err;
    }
    StoreError::Database(e)
}

#[async_trait]
impl WaitlistStore for PostgresSlotStore {
    #[instrument(skip(self, entry), fields(entry_id = %entry.id))]
    async fn insert_entry(&self, entry: WaitlistEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO waitlist_entries (id, customer_id, pet_id, service_id, requested_date,
                time_preference, priority, note, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.customer_id.as_uuid())
        .bind(entry.pet_id.as_uuid())
        .bind(entry.service_id.as_uuid())
        .bind(entry.requested_date)
        .bind(entry.time_preference.as_str())
        .bind(entry.priority)
        .bind(&entry.note)
        .bind(entry.status.as_str())
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, "waitlist_entries_pkey", StoreError::DuplicateEntry(entry.id))
        })?;

        Ok(())
    }

    async fn get_entry(&self, id: WaitlistEntryId) -> Result<Option<WaitlistEntry>> {
        let row = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM waitlist_entries WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_entry).transpose()
    }

    async fn query_entries(&self, query: WaitlistQuery) -> Result<Vec<WaitlistEntry>> {
        let mut sql = format!("SELECT {ENTRY_COLUMNS} FROM waitlist_entries WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.service_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND service_id = ${param_count}"));
        }
        if query.statuses.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ANY(${param_count})"));
        }
        if query.customer_ids.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND customer_id = ANY(${param_count})"));
        }
        if query.requested_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND requested_date >= ${param_count}"));
        }
        if query.requested_to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND requested_date <= ${param_count}"));
        }

        sql.push_str(" ORDER BY priority DESC, created_at ASC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(service_id) = query.service_id {
            sqlx_query = sqlx_query.bind(service_id.as_uuid());
        }
        if let Some(statuses) = query.statuses {
            sqlx_query = sqlx_query.bind(status_names(&statuses));
        }
        if let Some(customers) = query.customer_ids {
            sqlx_query = sqlx_query.bind(uuids(&customers));
        }
        if let Some(from) = query.requested_from {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.requested_to {
            sqlx_query = sqlx_query.bind(to);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn transition_entries(
        &self,
        ids: &[WaitlistEntryId],
        from: &[WaitlistStatus],
        to: WaitlistStatus,
        now: DateTime<Utc>,
    ) -> Result<Vec<WaitlistEntryId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let moved: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE waitlist_entries
            SET status = $3, updated_at = $4
            WHERE id = ANY($1) AND status = ANY($2)
            RETURNING id
            "#,
        )
        .bind(uuids(ids))
        .bind(status_names(from))
        .bind(to.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let moved: HashSet<Uuid> = moved.into_iter().collect();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| moved.contains(&id.as_uuid()))
            .collect())
    }
}

#[async_trait]
impl OfferStore for PostgresSlotStore {
    async fn get_offer(&self, id: OfferId) -> Result<Option<SlotOffer>> {
        let row = sqlx::query(&format!("SELECT {OFFER_COLUMNS} FROM slot_offers WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_offer).transpose()
    }

    #[instrument(skip(self), fields(offer_id = %id, to = %transition.to))]
    async fn try_transition(&self, id: OfferId, transition: OfferTransition) -> Result<bool> {
        let mut sql = String::from("UPDATE slot_offers SET status = $2, updated_at = NOW()");
        let mut param_count = 2;

        match transition.claimant {
            ClaimantUpdate::Keep => {}
            ClaimantUpdate::Set { .. } => {
                sql.push_str(&format!(
                    ", claimant_entry_id = ${}, claimed_at = ${}",
                    param_count + 1,
                    param_count + 2
                ));
                param_count += 2;
            }
            ClaimantUpdate::Clear => {
                sql.push_str(", claimant_entry_id = NULL, claimed_at = NULL");
            }
        }

        param_count += 1;
        sql.push_str(&format!(" WHERE id = $1 AND status = ${param_count}"));

        if transition.expected_claimant.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND claimant_entry_id = ${param_count}"));
        }
        match transition.guard {
            DeadlineGuard::Any => {}
            DeadlineGuard::LiveAt(_) => {
                param_count += 1;
                sql.push_str(&format!(" AND expires_at > ${param_count}"));
            }
            DeadlineGuard::LapsedAt(_) => {
                param_count += 1;
                sql.push_str(&format!(" AND expires_at <= ${param_count}"));
            }
        }

        let mut sqlx_query = sqlx::query(&sql)
            .bind(id.as_uuid())
            .bind(transition.to.as_str());

        if let ClaimantUpdate::Set { entry_id, at } = transition.claimant {
            sqlx_query = sqlx_query.bind(entry_id.as_uuid()).bind(at);
        }
        sqlx_query = sqlx_query.bind(transition.from.as_str());
        if let Some(expected) = transition.expected_claimant {
            sqlx_query = sqlx_query.bind(expected.as_uuid());
        }
        match transition.guard {
            DeadlineGuard::Any => {}
            DeadlineGuard::LiveAt(now) | DeadlineGuard::LapsedAt(now) => {
                sqlx_query = sqlx_query.bind(now);
            }
        }

        let applied = sqlx_query.execute(&self.pool).await?.rows_affected() == 1;
        if !applied {
            metrics::counter!("waitlist_offer_transition_conflicts_total",
                "to" => transition.to.as_str())
            .increment(1);
        }
        Ok(applied)
    }

    async fn attach_appointment(&self, id: OfferId, appointment_id: AppointmentId) -> Result<()> {
        let result = sqlx::query(
            "UPDATE slot_offers SET appointment_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(appointment_id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OfferNotFound(id));
        }
        Ok(())
    }

    async fn lapsed_offers(&self, now: DateTime<Utc>) -> Result<Vec<SlotOffer>> {
        let rows = sqlx::query(&format!(
            "SELECT {OFFER_COLUMNS} FROM slot_offers \
             WHERE status = 'pending' AND expires_at <= $1 \
             ORDER BY expires_at ASC, id ASC"
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_offer).collect()
    }

    async fn unexpired_offers_for_candidates(
        &self,
        entry_ids: &[WaitlistEntryId],
    ) -> Result<Vec<SlotOffer>> {
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!(
            "SELECT {OFFER_COLUMNS} FROM slot_offers \
             WHERE status IN ('pending', 'claimed') AND candidate_ids && $1 \
             ORDER BY (status <> 'pending') ASC, expires_at ASC, id ASC"
        ))
        .bind(uuids(entry_ids))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_offer).collect()
    }

    async fn record_acceptance(&self, record: AcceptanceRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO acceptance_log (offer_id, entry_id, sender, outcome, appointment_id, received_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.offer_id.as_uuid())
        .bind(record.entry_id.as_uuid())
        .bind(&record.sender)
        .bind(record.resolution.as_str())
        .bind(record.resolution.appointment_id().map(|a| a.as_str()))
        .bind(record.received_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn acceptances_for_offer(&self, id: OfferId) -> Result<Vec<AcceptanceRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT offer_id, entry_id, sender, outcome, appointment_id, received_at
            FROM acceptance_log
            WHERE offer_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_acceptance).collect()
    }
}

#[async_trait]
impl SlotStore for PostgresSlotStore {
    #[instrument(skip(self, draft), fields(offer_id = %draft.id, drafted = draft.candidates.len()))]
    async fn open_offer(&self, draft: OfferDraft) -> Result<Option<SlotOffer>> {
        let mut tx = self.pool.begin().await?;

        // Row locks taken here keep a concurrent opener from notifying the
        // same entries.
        let moved: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE waitlist_entries
            SET status = 'notified', updated_at = $2
            WHERE id = ANY($1) AND status = 'active'
            RETURNING id
            "#,
        )
        .bind(uuids(&draft.candidates))
        .bind(draft.created_at)
        .fetch_all(&mut *tx)
        .await?;

        let moved: HashSet<Uuid> = moved.into_iter().collect();
        let survivors: Vec<WaitlistEntryId> = draft
            .candidates
            .iter()
            .copied()
            .filter(|id| moved.contains(&id.as_uuid()))
            .collect();

        if survivors.is_empty() {
            tx.rollback().await?;
            return Ok(None);
        }

        let offer = draft.into_offer(survivors);
        sqlx::query(
            r#"
            INSERT INTO slot_offers (id, service_id, slot_start, candidate_ids, discount_percent,
                response_window_secs, created_at, expires_at, status, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $7)
            "#,
        )
        .bind(offer.id.as_uuid())
        .bind(offer.slot.service_id.as_uuid())
        .bind(offer.slot.start)
        .bind(uuids(&offer.candidates))
        .bind(i16::from(offer.discount.percent()))
        .bind(offer.response_window.num_seconds())
        .bind(offer.created_at)
        .bind(offer.expires_at)
        .bind(offer.status.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "slot_offers_pkey", StoreError::DuplicateOffer(offer.id)))?;

        tx.commit().await?;
        Ok(Some(offer))
    }
}
