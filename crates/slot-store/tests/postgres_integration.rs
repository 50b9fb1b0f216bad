//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p slot-store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use common::{AppointmentId, CustomerId, OfferId, PetId, ServiceId, WaitlistEntryId};
use domain::{
    Discount, OfferDraft, OfferStatus, Resolution, Slot, TimePreference, WaitlistEntry,
    WaitlistStatus,
};
use serial_test::serial;
use slot_store::{
    AcceptanceRecord, OfferStore, OfferTransition, PostgresSlotStore, SlotStore, StoreError,
    WaitlistQuery, WaitlistStore, WaitlistStoreExt,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresSlotStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresSlotStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE waitlist_entries, slot_offers, acceptance_log")
        .execute(&pool)
        .await
        .unwrap();

    PostgresSlotStore::new(pool)
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap()
}

fn entry(service_id: ServiceId, priority: i32, minutes: i64) -> WaitlistEntry {
    WaitlistEntry::new(
        CustomerId::new(),
        PetId::new(),
        service_id,
        NaiveDate::from_ymd_opt(2026, 3, 11).unwrap(),
        now() - Duration::days(2) + Duration::minutes(minutes),
    )
    .with_priority(priority)
}

fn draft(service_id: ServiceId, candidates: Vec<WaitlistEntryId>) -> OfferDraft {
    OfferDraft::new(
        Slot::new(service_id, now() + Duration::days(1)),
        candidates,
        Discount::new(20).unwrap(),
        Duration::hours(2),
        now(),
    )
}

async fn seed(store: &PostgresSlotStore, n: usize) -> (ServiceId, Vec<WaitlistEntryId>) {
    let service = ServiceId::new();
    let mut ids = Vec::new();
    for i in 0..n {
        let e = entry(service, 0, i as i64);
        ids.push(e.id);
        store.insert_entry(e).await.unwrap();
    }
    (service, ids)
}

#[tokio::test]
#[serial]
async fn entry_roundtrip_preserves_fields() {
    let store = get_test_store().await;
    let e = entry(ServiceId::new(), 3, 0)
        .with_time_preference(TimePreference::Morning)
        .with_note("anxious around dogs");

    store.insert_entry(e.clone()).await.unwrap();
    let loaded = store.get_entry(e.id).await.unwrap().unwrap();

    assert_eq!(loaded, e);
}

#[tokio::test]
#[serial]
async fn duplicate_entry_rejected() {
    let store = get_test_store().await;
    let e = entry(ServiceId::new(), 0, 0);
    store.insert_entry(e.clone()).await.unwrap();

    let result = store.insert_entry(e).await;
    assert!(matches!(result, Err(StoreError::DuplicateEntry(_))));
}

#[tokio::test]
#[serial]
async fn query_filters_and_orders() {
    let store = get_test_store().await;
    let service = ServiceId::new();
    let low = entry(service, 0, 0);
    let high_new = entry(service, 5, 20);
    let high_old = entry(service, 5, 10);
    let mut far = entry(service, 9, 0);
    far.requested_date = NaiveDate::from_ymd_opt(2026, 4, 30).unwrap();
    let other = entry(ServiceId::new(), 9, 0);

    for e in [&low, &high_new, &high_old, &far, &other] {
        store.insert_entry(e.clone()).await.unwrap();
    }

    let query = WaitlistQuery::matchable(
        service,
        NaiveDate::from_ymd_opt(2026, 3, 8).unwrap(),
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
    );
    let ids: Vec<_> = store
        .query_entries(query.clone())
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(ids, vec![high_old.id, high_new.id, low.id]);

    let limited = store.query_entries(query.limit(2)).await.unwrap();
    assert_eq!(limited.len(), 2);

    let by_customer = store
        .query_entries(WaitlistQuery::new().customer_ids(vec![other.customer_id]))
        .await
        .unwrap();
    assert_eq!(by_customer.len(), 1);
    assert_eq!(by_customer[0].id, other.id);
}

#[tokio::test]
#[serial]
async fn open_offer_persists_survivors_in_draft_order() {
    let store = get_test_store().await;
    let (service, ids) = seed(&store, 3).await;
    store.cancel_entry(ids[1], now()).await.unwrap();

    let reversed: Vec<_> = ids.iter().rev().copied().collect();
    let offer = store
        .open_offer(draft(service, reversed))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(offer.candidates, vec![ids[2], ids[0]]);

    let loaded = store.get_offer(offer.id).await.unwrap().unwrap();
    assert_eq!(loaded, offer);
    assert_eq!(loaded.discount, Discount::new(20).unwrap());
    assert_eq!(loaded.response_window, Duration::hours(2));

    for id in [ids[0], ids[2]] {
        let e = store.get_entry(id).await.unwrap().unwrap();
        assert_eq!(e.status, WaitlistStatus::Notified);
    }
}

#[tokio::test]
#[serial]
async fn open_offer_without_survivors_rolls_back() {
    let store = get_test_store().await;
    let (service, ids) = seed(&store, 1).await;
    store.cancel_entry(ids[0], now()).await.unwrap();

    let offer = store.open_offer(draft(service, ids)).await.unwrap();
    assert!(offer.is_none());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM slot_offers")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[serial]
async fn overlapping_offers_never_share_a_candidate() {
    let store = get_test_store().await;
    let (service, ids) = seed(&store, 2).await;

    let first = store
        .open_offer(draft(service, ids.clone()))
        .await
        .unwrap()
        .unwrap();
    let second = store.open_offer(draft(service, ids)).await.unwrap();

    assert_eq!(first.candidates.len(), 2);
    assert!(second.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_claims_have_one_winner() {
    let store = get_test_store().await;
    let (service, ids) = seed(&store, 8).await;
    let offer = store
        .open_offer(draft(service, ids.clone()))
        .await
        .unwrap()
        .unwrap();

    let offer_id = offer.id;
    let at = now() + Duration::minutes(1);
    let handles: Vec<_> = ids
        .iter()
        .map(|id| {
            let store = store.clone();
            let claim = OfferTransition::claim(*id, at);
            tokio::spawn(async move { store.try_transition(offer_id, claim).await.unwrap() })
        })
        .collect();

    let results = futures_util::future::join_all(handles).await;
    let wins = results.into_iter().filter(|r| *r.as_ref().unwrap()).count();
    assert_eq!(wins, 1);

    let stored = store.get_offer(offer.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OfferStatus::Claimed);
    assert!(stored.claimant.is_some_and(|c| ids.contains(&c)));
    assert_eq!(stored.claimed_at, Some(at));
}

#[tokio::test]
#[serial]
async fn claim_refused_at_deadline() {
    let store = get_test_store().await;
    let (service, ids) = seed(&store, 1).await;
    let offer = store.open_offer(draft(service, ids.clone())).await.unwrap().unwrap();

    let claimed = store
        .try_transition(offer.id, OfferTransition::claim(ids[0], offer.expires_at))
        .await
        .unwrap();
    assert!(!claimed);

    let stored = store.get_offer(offer.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OfferStatus::Pending);
}

#[tokio::test]
#[serial]
async fn reopen_and_void_follow_deadline() {
    let store = get_test_store().await;
    let (service, ids) = seed(&store, 2).await;
    let offer = store.open_offer(draft(service, ids.clone())).await.unwrap().unwrap();
    let at = now() + Duration::minutes(5);

    assert!(store.try_transition(offer.id, OfferTransition::claim(ids[0], at)).await.unwrap());
    // Another claimant cannot undo the claim.
    assert!(!store.try_transition(offer.id, OfferTransition::reopen(ids[1], at)).await.unwrap());
    assert!(!store.try_transition(offer.id, OfferTransition::void(ids[0], at)).await.unwrap());
    assert!(store.try_transition(offer.id, OfferTransition::reopen(ids[0], at)).await.unwrap());

    let reopened = store.get_offer(offer.id).await.unwrap().unwrap();
    assert_eq!(reopened.status, OfferStatus::Pending);
    assert_eq!(reopened.claimant, None);
    assert_eq!(reopened.claimed_at, None);

    assert!(store.try_transition(offer.id, OfferTransition::claim(ids[1], at)).await.unwrap());
    let late = offer.expires_at + Duration::seconds(1);
    assert!(store.try_transition(offer.id, OfferTransition::void(ids[1], late)).await.unwrap());
    let voided = store.get_offer(offer.id).await.unwrap().unwrap();
    assert_eq!(voided.status, OfferStatus::Expired);
}

#[tokio::test]
#[serial]
async fn lapsed_offers_and_expire() {
    let store = get_test_store().await;
    let (service, ids) = seed(&store, 2).await;
    let early = store
        .open_offer(draft(service, vec![ids[0]]))
        .await
        .unwrap()
        .unwrap();
    let mut later = draft(service, vec![ids[1]]);
    later.response_window = Duration::hours(4);
    let later = store.open_offer(later).await.unwrap().unwrap();

    assert!(store.lapsed_offers(early.expires_at - Duration::seconds(1)).await.unwrap().is_empty());

    let lapsed = store.lapsed_offers(later.expires_at).await.unwrap();
    let lapsed: Vec<_> = lapsed.into_iter().map(|o| o.id).collect();
    assert_eq!(lapsed, vec![early.id, later.id]);

    assert!(
        store
            .try_transition(early.id, OfferTransition::expire(early.expires_at))
            .await
            .unwrap()
    );
    // Second sweep of the same offer is a no-op.
    assert!(
        !store
            .try_transition(early.id, OfferTransition::expire(early.expires_at))
            .await
            .unwrap()
    );
    assert_eq!(store.lapsed_offers(later.expires_at).await.unwrap().len(), 1);
}

#[tokio::test]
#[serial]
async fn transition_entries_is_conditional() {
    let store = get_test_store().await;
    let (_, ids) = seed(&store, 3).await;

    let moved = store
        .transition_entries(&ids[..2], &[WaitlistStatus::Active], WaitlistStatus::Notified, now())
        .await
        .unwrap();
    assert_eq!(moved, vec![ids[0], ids[1]]);

    let moved = store
        .transition_entries(
            &ids,
            &[WaitlistStatus::Notified, WaitlistStatus::ExpiredOffer],
            WaitlistStatus::Active,
            now(),
        )
        .await
        .unwrap();
    assert_eq!(moved, vec![ids[0], ids[1]]);

    assert!(
        store
            .transition_entries(&[], &[WaitlistStatus::Active], WaitlistStatus::Cancelled, now())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
#[serial]
async fn unexpired_offers_pending_first_then_soonest() {
    let store = get_test_store().await;
    let (service, ids) = seed(&store, 2).await;

    let mut long = draft(service, vec![ids[0]]);
    long.response_window = Duration::hours(8);
    let long = store.open_offer(long).await.unwrap().unwrap();
    let short = store
        .open_offer(draft(service, vec![ids[1]]))
        .await
        .unwrap()
        .unwrap();

    let found = store.unexpired_offers_for_candidates(&ids).await.unwrap();
    let found: Vec<_> = found.into_iter().map(|o| o.id).collect();
    assert_eq!(found, vec![short.id, long.id]);

    // A claimed offer is still listed, behind every pending one.
    store
        .try_transition(short.id, OfferTransition::claim(ids[1], now()))
        .await
        .unwrap();
    let found = store.unexpired_offers_for_candidates(&ids).await.unwrap();
    let found: Vec<_> = found.into_iter().map(|o| (o.id, o.status)).collect();
    assert_eq!(
        found,
        vec![(long.id, OfferStatus::Pending), (short.id, OfferStatus::Claimed)]
    );

    store
        .try_transition(long.id, OfferTransition::expire(long.expires_at))
        .await
        .unwrap();
    let found = store.unexpired_offers_for_candidates(&[ids[0]]).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
#[serial]
async fn appointment_and_acceptance_log() {
    let store = get_test_store().await;
    let (service, ids) = seed(&store, 2).await;
    let offer = store.open_offer(draft(service, ids.clone())).await.unwrap().unwrap();

    store
        .attach_appointment(offer.id, AppointmentId::new("APT-42"))
        .await
        .unwrap();
    let stored = store.get_offer(offer.id).await.unwrap().unwrap();
    assert_eq!(stored.appointment_id, Some(AppointmentId::new("APT-42")));

    assert!(matches!(
        store.attach_appointment(OfferId::new(), AppointmentId::new("APT-0")).await,
        Err(StoreError::OfferNotFound(_))
    ));

    let records = [
        (
            ids[0],
            Resolution::Booked {
                appointment_id: AppointmentId::new("APT-42"),
            },
        ),
        (ids[1], Resolution::AlreadyClaimed),
    ];
    for (i, (entry_id, resolution)) in records.iter().enumerate() {
        store
            .record_acceptance(AcceptanceRecord {
                offer_id: offer.id,
                entry_id: *entry_id,
                sender: "+15551234567".to_string(),
                resolution: resolution.clone(),
                received_at: now() + Duration::seconds(i as i64),
            })
            .await
            .unwrap();
    }

    let log = store.acceptances_for_offer(offer.id).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].resolution, records[0].1);
    assert_eq!(log[1].entry_id, ids[1]);
}
