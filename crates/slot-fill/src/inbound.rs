//! Inbound channel: turns a customer's reply into an acceptance.

use chrono::{DateTime, Utc};
use common::{OfferId, WaitlistEntryId};
use domain::{OfferStatus, ReplyMatcher, Resolution, WaitlistStatus, normalize_phone};
use serde::{Deserialize, Serialize};
use slot_store::{AcceptanceRecord, SlotStore, WaitlistQuery};

use crate::collaborators::Collaborators;
use crate::error::Result;
use crate::resolver::ResponseResolver;
use crate::services::{Notice, OutboundMessage};

/// A message received from a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender identity as delivered by the channel.
    pub from: String,
    pub body: String,
    pub received_at: DateTime<Utc>,
}

/// What an inbound message led to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InboundOutcome {
    /// The reply is not an acceptance.
    NotAffirmative,
    /// No open offer correlates to the sender.
    Unmatched,
    /// The acceptance was resolved against an offer.
    Resolved {
        offer_id: OfferId,
        entry_id: WaitlistEntryId,
        resolution: Resolution,
    },
}

/// Correlates replies to open offers and hands them to the resolver.
#[derive(Clone)]
pub struct InboundHandler<S> {
    store: S,
    resolver: ResponseResolver<S>,
    collaborators: Collaborators,
    replies: ReplyMatcher,
    default_country_code: String,
}

impl<S: SlotStore + Clone + 'static> InboundHandler<S> {
    pub fn new(
        store: S,
        resolver: ResponseResolver<S>,
        collaborators: Collaborators,
        replies: ReplyMatcher,
        default_country_code: impl Into<String>,
    ) -> Self {
        Self {
            store,
            resolver,
            collaborators,
            replies,
            default_country_code: default_country_code.into(),
        }
    }

    /// Handles one inbound message.
    ///
    /// When the sender has several pending offers, the one expiring soonest
    /// is the one accepted. A reply to an offer another candidate has
    /// already claimed still reaches the resolver, so the sender is told the
    /// slot is gone. Every resolved acceptance is written to the audit log.
    #[tracing::instrument(skip(self, message), fields(from = %message.from))]
    pub async fn handle(&self, message: InboundMessage) -> Result<InboundOutcome> {
        if !self.replies.is_affirmative(&message.body) {
            tracing::debug!("reply is not an acceptance");
            return Ok(InboundOutcome::NotAffirmative);
        }

        let Some(sender) = normalize_phone(&message.from, &self.default_country_code) else {
            tracing::debug!("sender is not a usable phone number");
            return Ok(InboundOutcome::Unmatched);
        };

        let Some((offer_id, entry_id)) = self.correlate(&sender).await? else {
            tracing::debug!("no open offer for sender");
            metrics::counter!("waitlist_inbound_unmatched_total").increment(1);
            return Ok(InboundOutcome::Unmatched);
        };

        let resolution = self.resolver.resolve(offer_id, entry_id).await?;

        let record = AcceptanceRecord {
            offer_id,
            entry_id,
            sender: sender.clone(),
            resolution: resolution.clone(),
            received_at: message.received_at,
        };
        if let Err(e) = self.store.record_acceptance(record).await {
            tracing::warn!(offer_id = %offer_id, error = %e, "could not record acceptance");
        }

        if resolution.is_slot_gone() {
            self.reply_slot_gone(offer_id, entry_id, sender).await;
        }

        Ok(InboundOutcome::Resolved {
            offer_id,
            entry_id,
            resolution,
        })
    }

    /// Finds the offer the sender is answering and the entry it was offered
    /// to. Pending offers win over claimed ones.
    async fn correlate(&self, sender: &str) -> Result<Option<(OfferId, WaitlistEntryId)>> {
        let customers = self.collaborators.directory.customers_by_phone(sender).await?;
        if customers.is_empty() {
            return Ok(None);
        }

        let query = WaitlistQuery::new()
            .customer_ids(customers)
            .statuses(vec![WaitlistStatus::Notified, WaitlistStatus::ExpiredOffer]);
        let entries: Vec<WaitlistEntryId> = self
            .store
            .query_entries(query)
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();
        if entries.is_empty() {
            return Ok(None);
        }

        let offers = self.store.unexpired_offers_for_candidates(&entries).await?;
        let Some(offer) = offers
            .into_iter()
            .min_by_key(|o| (o.status != OfferStatus::Pending, o.expires_at, o.id))
        else {
            return Ok(None);
        };

        Ok(offer
            .candidates
            .iter()
            .copied()
            .find(|id| entries.contains(id))
            .map(|entry_id| (offer.id, entry_id)))
    }

    async fn reply_slot_gone(&self, offer_id: OfferId, entry_id: WaitlistEntryId, to: String) {
        let message = OutboundMessage {
            to,
            offer_id,
            entry_id: Some(entry_id),
            notice: Notice::SlotFilled,
        };
        if let Err(e) = self.collaborators.notifier.send(message).await {
            tracing::warn!(offer_id = %offer_id, error = %e, "slot gone reply failed");
            metrics::counter!("waitlist_dispatch_failures_total").increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::TestCollaborators;
    use chrono::{NaiveDate, TimeZone};
    use common::{CustomerId, PetId, ServiceId};
    use domain::{Clock, Discount, OfferDraft, Slot, WaitlistEntry};
    use slot_store::{InMemorySlotStore, OfferStore, WaitlistStore};
    use std::time::Duration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, 8, 0, 0).unwrap()
    }

    struct Fixture {
        fakes: TestCollaborators,
        store: InMemorySlotStore,
        handler: InboundHandler<InMemorySlotStore>,
        service: ServiceId,
    }

    fn fixture() -> Fixture {
        let fakes = TestCollaborators::at(t0());
        let store = InMemorySlotStore::new();
        let collaborators = fakes.collaborators();
        let resolver =
            ResponseResolver::new(store.clone(), collaborators.clone(), Duration::from_secs(5));
        let handler = InboundHandler::new(
            store.clone(),
            resolver,
            collaborators,
            ReplyMatcher::default(),
            "1",
        );
        Fixture {
            fakes,
            store,
            handler,
            service: ServiceId::new(),
        }
    }

    impl Fixture {
        async fn customer(&self, phone: &str) -> WaitlistEntry {
            let customer = CustomerId::new();
            self.fakes.directory.add_customer(customer, phone, None);
            let entry = WaitlistEntry::new(
                customer,
                PetId::new(),
                self.service,
                NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
                t0(),
            );
            self.store.insert_entry(entry.clone()).await.unwrap();
            entry
        }

        async fn offer(&self, entries: &[&WaitlistEntry], window: chrono::Duration) -> OfferId {
            let draft = OfferDraft::new(
                Slot::new(self.service, t0() + chrono::Duration::days(1)),
                entries.iter().map(|e| e.id).collect(),
                Discount::none(),
                window,
                t0(),
            );
            self.store.open_offer(draft).await.unwrap().unwrap().id
        }

        fn reply(&self, from: &str, body: &str) -> InboundMessage {
            InboundMessage {
                from: from.to_string(),
                body: body.to_string(),
                received_at: self.fakes.clock.now(),
            }
        }
    }

    #[tokio::test]
    async fn test_yes_books_the_slot() {
        let f = fixture();
        let alice = f.customer("555-000-0001").await;
        let offer_id = f.offer(&[&alice], chrono::Duration::hours(1)).await;

        let outcome = f.handler.handle(f.reply("+1 (555) 000-0001", "Yes!")).await.unwrap();
        let InboundOutcome::Resolved {
            offer_id: resolved,
            entry_id,
            resolution,
        } = outcome
        else {
            panic!("expected a resolution, got {outcome:?}");
        };
        assert_eq!(resolved, offer_id);
        assert_eq!(entry_id, alice.id);
        assert!(matches!(resolution, Resolution::Booked { .. }));

        let log = f.store.acceptances_for_offer(offer_id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].sender, "+15550000001");
    }

    #[tokio::test]
    async fn test_non_affirmative_reply_ignored() {
        let f = fixture();
        let alice = f.customer("5550000001").await;
        f.offer(&[&alice], chrono::Duration::hours(1)).await;

        let outcome = f.handler.handle(f.reply("5550000001", "no thanks")).await.unwrap();
        assert_eq!(outcome, InboundOutcome::NotAffirmative);
        assert_eq!(f.fakes.booking.appointment_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_sender_unmatched() {
        let f = fixture();
        let alice = f.customer("5550000001").await;
        f.offer(&[&alice], chrono::Duration::hours(1)).await;

        let outcome = f.handler.handle(f.reply("5559999999", "yes")).await.unwrap();
        assert_eq!(outcome, InboundOutcome::Unmatched);
        let outcome = f.handler.handle(f.reply("not a phone", "yes")).await.unwrap();
        assert_eq!(outcome, InboundOutcome::Unmatched);
    }

    #[tokio::test]
    async fn test_reply_after_release_unmatched() {
        let f = fixture();
        let alice = f.customer("5550000001").await;
        let bob = f.customer("5550000002").await;
        let offer_id = f.offer(&[&alice, &bob], chrono::Duration::hours(1)).await;

        f.handler.handle(f.reply("5550000001", "yes")).await.unwrap();
        let outcome = f.handler.handle(f.reply("5550000002", "yes")).await.unwrap();

        // Bob was released back to active by Alice's win, so nothing correlates.
        assert_eq!(outcome, InboundOutcome::Unmatched);
        assert_eq!(f.store.acceptances_for_offer(offer_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_late_reply_expired_and_told() {
        let f = fixture();
        let alice = f.customer("5550000001").await;
        let offer_id = f.offer(&[&alice], chrono::Duration::minutes(30)).await;
        f.fakes.clock.advance(chrono::Duration::minutes(45));

        let outcome = f.handler.handle(f.reply("5550000001", "ok")).await.unwrap();
        assert_eq!(
            outcome,
            InboundOutcome::Resolved {
                offer_id,
                entry_id: alice.id,
                resolution: Resolution::Expired,
            }
        );

        let replies = f.fakes.notifier.sent_to("+15550000001");
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].notice, Notice::SlotFilled);
        let stored = f.store.get_entry(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.status, WaitlistStatus::ExpiredOffer);
    }

    #[tokio::test]
    async fn test_soonest_expiring_offer_wins() {
        let f = fixture();
        let alice_first = f.customer("5550000001").await;
        let alice_second = f.customer("5550000001").await;
        let later = f.offer(&[&alice_first], chrono::Duration::hours(3)).await;
        let sooner = f.offer(&[&alice_second], chrono::Duration::hours(1)).await;

        let outcome = f.handler.handle(f.reply("5550000001", "yes")).await.unwrap();
        let InboundOutcome::Resolved { offer_id, entry_id, .. } = outcome else {
            panic!("expected a resolution, got {outcome:?}");
        };
        assert_eq!(offer_id, sooner);
        assert_eq!(entry_id, alice_second.id);

        let untouched = f.store.get_offer(later).await.unwrap().unwrap();
        assert_eq!(untouched.status, OfferStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_during_competing_booking_is_told_slot_gone() {
        let f = fixture();
        let bob = f.customer("5550000002").await;
        let carol = f.customer("5550000003").await;
        let offer_id = f.offer(&[&bob, &carol], chrono::Duration::hours(2)).await;
        f.fakes.booking.set_delay(Some(Duration::from_secs(2)));

        let handler = f.handler.clone();
        let bob_reply = f.reply("5550000002", "yes");
        let first = tokio::spawn(async move { handler.handle(bob_reply).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = f.handler.handle(f.reply("5550000003", "yes")).await.unwrap();
        assert_eq!(
            second,
            InboundOutcome::Resolved {
                offer_id,
                entry_id: carol.id,
                resolution: Resolution::AlreadyClaimed,
            }
        );
        let told = f.fakes.notifier.sent_to("+15550000003");
        assert_eq!(told.len(), 1);
        assert_eq!(told[0].notice, Notice::SlotFilled);

        let first = first.await.unwrap().unwrap();
        assert!(matches!(
            first,
            InboundOutcome::Resolved {
                resolution: Resolution::Booked { .. },
                ..
            }
        ));
        assert_eq!(f.store.acceptances_for_offer(offer_id).await.unwrap().len(), 2);
        assert_eq!(f.fakes.booking.appointment_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_competitor_can_retry_after_failed_booking() {
        let f = fixture();
        let bob = f.customer("5550000002").await;
        let carol = f.customer("5550000003").await;
        let offer_id = f.offer(&[&bob, &carol], chrono::Duration::hours(2)).await;
        f.fakes.booking.set_delay(Some(Duration::from_secs(2)));
        f.fakes.booking.set_fail_on_create(true);

        let handler = f.handler.clone();
        let bob_reply = f.reply("5550000002", "yes");
        let first = tokio::spawn(async move { handler.handle(bob_reply).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = f.handler.handle(f.reply("5550000003", "yes")).await.unwrap();
        assert!(matches!(
            second,
            InboundOutcome::Resolved {
                resolution: Resolution::AlreadyClaimed,
                ..
            }
        ));

        let first = first.await.unwrap().unwrap();
        assert!(matches!(
            first,
            InboundOutcome::Resolved {
                resolution: Resolution::SlotUnavailable,
                ..
            }
        ));
        assert_eq!(f.fakes.notifier.sent_to("+15550000002").len(), 1);
        assert_eq!(f.fakes.notifier.sent_to("+15550000003").len(), 1);
        assert_eq!(f.store.acceptances_for_offer(offer_id).await.unwrap().len(), 2);

        // The claim was rolled back, so the competitor's next reply can win.
        f.fakes.booking.set_fail_on_create(false);
        f.fakes.booking.set_delay(None);
        let retry = f.handler.handle(f.reply("5550000003", "yes")).await.unwrap();
        assert!(matches!(
            retry,
            InboundOutcome::Resolved {
                entry_id,
                resolution: Resolution::Booked { .. },
                ..
            } if entry_id == carol.id
        ));
    }
}
