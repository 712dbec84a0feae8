// Auction store - owns auctions and the append-only audit log
//
// All state changes go through `request_transition`, which validates against
// the lifecycle table and then replaces the auction and appends the record in
// one step.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::lifecycle::{
    self, Actor, Auction, AuctionId, AuctionState, LifecycleError, TransitionRecord,
};
use crate::notify::TransitionListener;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("Auction not found: {auction_id}")]
    AuctionNotFound { auction_id: AuctionId },

    #[error("Auction already exists: {auction_id}")]
    DuplicateAuction { auction_id: AuctionId },

    #[error("Auction {auction_id} must start in draft, found {state}")]
    NotDraft {
        auction_id: AuctionId,
        state: AuctionState,
    },

    #[error("Bid rejected for auction {auction_id}: {reason}")]
    BidRejected {
        auction_id: AuctionId,
        reason: String,
    },
}

/// Explicit store of auctions and their transition history
#[derive(Default)]
pub struct AuctionStore {
    auctions: HashMap<AuctionId, Auction>,
    audit_log: Vec<TransitionRecord>,
    listeners: Vec<Box<dyn TransitionListener>>,
}

impl std::fmt::Debug for AuctionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuctionStore")
            .field("auctions", &self.auctions.len())
            .field("audit_log", &self.audit_log.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl AuctionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(mut self, listener: impl TransitionListener + 'static) -> Self {
        self.add_listener(listener);
        self
    }

    pub fn add_listener(&mut self, listener: impl TransitionListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Create a draft auction with a generated id
    pub fn create_auction(&mut self, title: impl Into<String>) -> Auction {
        let auction = Auction::new(Uuid::new_v4().to_string(), title);
        debug!(auction_id = %auction.id, title = %auction.title, "Auction created");
        self.auctions.insert(auction.id.clone(), auction.clone());
        auction
    }

    /// Register an auction built elsewhere. It must still be in `draft`.
    pub fn insert(&mut self, auction: Auction) -> Result<(), StoreError> {
        if self.auctions.contains_key(&auction.id) {
            return Err(StoreError::DuplicateAuction {
                auction_id: auction.id,
            });
        }
        if auction.current_state() != AuctionState::Draft {
            return Err(StoreError::NotDraft {
                state: auction.current_state(),
                auction_id: auction.id,
            });
        }

        debug!(auction_id = %auction.id, title = %auction.title, "Auction registered");
        self.auctions.insert(auction.id.clone(), auction);
        Ok(())
    }

    pub fn get(&self, auction_id: &str) -> Option<&Auction> {
        self.auctions.get(auction_id)
    }

    /// All auctions, ordered by id
    pub fn auctions(&self) -> Vec<&Auction> {
        let mut auctions: Vec<&Auction> = self.auctions.values().collect();
        auctions.sort_by(|a, b| a.id.cmp(&b.id));
        auctions
    }

    fn lookup(&self, auction_id: &str) -> Result<&Auction, StoreError> {
        self.auctions
            .get(auction_id)
            .ok_or_else(|| StoreError::AuctionNotFound {
                auction_id: auction_id.to_string(),
            })
    }

    fn lookup_mut(&mut self, auction_id: &str) -> Result<&mut Auction, StoreError> {
        self.auctions
            .get_mut(auction_id)
            .ok_or_else(|| StoreError::AuctionNotFound {
                auction_id: auction_id.to_string(),
            })
    }

    pub fn request_transition(
        &mut self,
        auction_id: &str,
        target: AuctionState,
        actor: Actor,
    ) -> Result<(Auction, TransitionRecord), StoreError> {
        self.apply(auction_id, target, actor, Utc::now())
    }

    /// Transition using a state name received from outside the crate
    pub fn request_transition_named(
        &mut self,
        auction_id: &str,
        target: &str,
        actor: Actor,
    ) -> Result<(Auction, TransitionRecord), StoreError> {
        let target: AuctionState = target.parse()?;
        self.request_transition(auction_id, target, actor)
    }

    fn apply(
        &mut self,
        auction_id: &str,
        target: AuctionState,
        actor: Actor,
        at: DateTime<Utc>,
    ) -> Result<(Auction, TransitionRecord), StoreError> {
        let current = self.lookup(auction_id)?;

        let (updated, record) = match lifecycle::request_transition_at(current, target, actor, at)
        {
            Ok(applied) => applied,
            Err(e) => {
                warn!(
                    auction_id = %auction_id,
                    current_state = %current.current_state(),
                    requested_state = %target,
                    "Auction transition rejected"
                );
                return Err(e.into());
            }
        };

        self.auctions.insert(updated.id.clone(), updated.clone());
        self.audit_log.push(record.clone());

        info!(
            auction_id = %record.auction_id,
            from_state = %record.from,
            to_state = %record.to,
            triggered_by = %record.triggered_by,
            "Auction state transition"
        );

        for listener in &self.listeners {
            listener.on_transition(&updated, &record);
        }

        Ok((updated, record))
    }

    /// Records for one auction in the order they were applied
    pub fn history(&self, auction_id: &str) -> Result<Vec<TransitionRecord>, StoreError> {
        self.lookup(auction_id)?;
        Ok(self
            .audit_log
            .iter()
            .filter(|record| record.auction_id == auction_id)
            .cloned()
            .collect())
    }

    /// The full audit log across all auctions
    pub fn audit_log(&self) -> &[TransitionRecord] {
        &self.audit_log
    }

    /// Record a bid. Only accepted while bidding is open and when it beats
    /// the current bid.
    pub fn record_bid(
        &mut self,
        auction_id: &str,
        amount: u64,
        bidder: impl Into<String>,
    ) -> Result<&Auction, StoreError> {
        let auction = self.lookup_mut(auction_id)?;

        if !matches!(
            auction.current_state(),
            AuctionState::Active | AuctionState::Ending
        ) {
            return Err(StoreError::BidRejected {
                auction_id: auction_id.to_string(),
                reason: format!("bidding is closed in state {}", auction.current_state()),
            });
        }
        if amount <= auction.current_bid {
            return Err(StoreError::BidRejected {
                auction_id: auction_id.to_string(),
                reason: format!("bid {} does not exceed current bid {}", amount, auction.current_bid),
            });
        }

        auction.current_bid = amount;
        auction.bids_count += 1;
        auction.winner = Some(bidder.into());
        debug!(auction_id = %auction_id, amount, bids_count = auction.bids_count, "Bid recorded");
        Ok(auction)
    }

    pub fn set_ends_at(&mut self, auction_id: &str, ends_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.lookup_mut(auction_id)?.ends_at = Some(ends_at);
        Ok(())
    }

    pub fn set_payment_status(
        &mut self,
        auction_id: &str,
        status: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.lookup_mut(auction_id)?.payment_status = Some(status.into());
        Ok(())
    }

    pub fn set_shipping_status(
        &mut self,
        auction_id: &str,
        status: impl Into<String>,
    ) -> Result<(), StoreError> {
        self.lookup_mut(auction_id)?.shipping_status = Some(status.into());
        Ok(())
    }

    /// System sweep for time-driven transitions.
    ///
    /// `active` auctions enter `ending` once `now` is within `ending_window`
    /// of `ends_at`, and `ending` auctions move to `ended` once `ends_at` has
    /// passed. Auctions without `ends_at` are left alone. A window reaching
    /// past the representable time range counts as already open.
    pub fn advance_expired(
        &mut self,
        now: DateTime<Utc>,
        ending_window: Duration,
    ) -> Vec<TransitionRecord> {
        let candidates: Vec<AuctionId> = self
            .auctions()
            .into_iter()
            .filter(|a| {
                a.ends_at.is_some()
                    && matches!(a.current_state(), AuctionState::Active | AuctionState::Ending)
            })
            .map(|a| a.id.clone())
            .collect();

        let mut applied = Vec::new();
        for auction_id in candidates {
            while let Some(target) = self
                .get(&auction_id)
                .and_then(|a| Self::due_transition(a, now, ending_window))
            {
                match self.apply(&auction_id, target, Actor::System, now) {
                    Ok((_, record)) => applied.push(record),
                    Err(e) => {
                        warn!(auction_id = %auction_id, error = %e, "Sweep transition failed");
                        break;
                    }
                }
            }
        }

        if !applied.is_empty() {
            info!(transitions = applied.len(), "Expired auctions advanced");
        }
        applied
    }

    fn due_transition(
        auction: &Auction,
        now: DateTime<Utc>,
        ending_window: Duration,
    ) -> Option<AuctionState> {
        let ends_at = auction.ends_at?;
        let window_opens = ends_at.checked_sub_signed(ending_window);
        match auction.current_state() {
            AuctionState::Active if window_opens.map_or(true, |opens| now >= opens) => {
                Some(AuctionState::Ending)
            }
            AuctionState::Ending if now >= ends_at => Some(AuctionState::Ended),
            _ => None,
        }
    }
}

/// Store handle for concurrent callers. The write lock is the single
/// mutation path, so transitions are serialized and readers always see a
/// consistent prefix of the audit log.
#[derive(Debug, Clone, Default)]
pub struct SharedAuctionStore {
    inner: Arc<RwLock<AuctionStore>>,
}

impl SharedAuctionStore {
    pub fn new(store: AuctionStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub async fn create_auction(&self, title: impl Into<String>) -> Auction {
        self.inner.write().await.create_auction(title)
    }

    pub async fn get(&self, auction_id: &str) -> Option<Auction> {
        self.inner.read().await.get(auction_id).cloned()
    }

    pub async fn request_transition(
        &self,
        auction_id: &str,
        target: AuctionState,
        actor: Actor,
    ) -> Result<(Auction, TransitionRecord), StoreError> {
        self.inner
            .write()
            .await
            .request_transition(auction_id, target, actor)
    }

    pub async fn history(&self, auction_id: &str) -> Result<Vec<TransitionRecord>, StoreError> {
        self.inner.read().await.history(auction_id)
    }

    pub async fn record_bid(
        &self,
        auction_id: &str,
        amount: u64,
        bidder: impl Into<String>,
    ) -> Result<Auction, StoreError> {
        self.inner
            .write()
            .await
            .record_bid(auction_id, amount, bidder)
            .cloned()
    }

    pub async fn set_ends_at(
        &self,
        auction_id: &str,
        ends_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.write().await.set_ends_at(auction_id, ends_at)
    }

    pub async fn audit_log(&self) -> Vec<TransitionRecord> {
        self.inner.read().await.audit_log().to_vec()
    }

    pub async fn advance_expired(
        &self,
        now: DateTime<Utc>,
        ending_window: Duration,
    ) -> Vec<TransitionRecord> {
        self.inner.write().await.advance_expired(now, ending_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn admin() -> Actor {
        Actor::user("admin@example.com")
    }

    fn store_with(id: &str) -> AuctionStore {
        let mut store = AuctionStore::new();
        store.insert(Auction::new(id, "Signed guitar")).unwrap();
        store
    }

    /// Drive an auction along a path of legal transitions
    fn walk(store: &mut AuctionStore, id: &str, path: &[AuctionState]) {
        for state in path {
            store.request_transition(id, *state, admin()).unwrap();
        }
    }

    #[derive(Clone, Default)]
    struct RecordingListener {
        seen: Arc<Mutex<Vec<(AuctionState, AuctionState)>>>,
    }

    impl TransitionListener for RecordingListener {
        fn on_transition(&self, _auction: &Auction, record: &TransitionRecord) {
            self.seen.lock().unwrap().push((record.from, record.to));
        }
    }

    #[test]
    fn test_happy_path_records_history() {
        let mut store = store_with("a-1");

        let (auction, record) = store
            .request_transition("a-1", AuctionState::Scheduled, admin())
            .unwrap();

        assert_eq!(auction.current_state(), AuctionState::Scheduled);
        assert_eq!(record.from, AuctionState::Draft);
        assert_eq!(record.to, AuctionState::Scheduled);
        assert_eq!(store.get("a-1").unwrap().current_state(), AuctionState::Scheduled);

        let history = store.history("a-1").unwrap();
        assert_eq!(history, vec![record]);
    }

    #[test]
    fn test_illegal_jump_leaves_store_untouched() {
        let mut store = store_with("a-1");

        let err = store
            .request_transition("a-1", AuctionState::Active, admin())
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Lifecycle(LifecycleError::InvalidTransition {
                from: AuctionState::Draft,
                to: AuctionState::Active,
                ..
            })
        ));
        assert_eq!(store.get("a-1").unwrap().current_state(), AuctionState::Draft);
        assert!(store.history("a-1").unwrap().is_empty());
    }

    #[test]
    fn test_repeated_failures_never_mutate() {
        let mut store = store_with("a-1");
        walk(&mut store, "a-1", &[AuctionState::Scheduled]);
        let before = store.get("a-1").unwrap().clone();

        for _ in 0..10 {
            assert!(store
                .request_transition("a-1", AuctionState::Delivered, admin())
                .is_err());
        }

        assert_eq!(store.get("a-1").unwrap(), &before);
        assert_eq!(store.audit_log().len(), 1);
    }

    #[test]
    fn test_history_keeps_applied_order_across_rejections() {
        let mut store = store_with("a-1");

        let attempts = [
            AuctionState::Active,
            AuctionState::Scheduled,
            AuctionState::Ended,
            AuctionState::Active,
            AuctionState::Delivered,
            AuctionState::Ending,
        ];
        for target in attempts {
            let _ = store.request_transition("a-1", target, admin());
        }

        let steps: Vec<(AuctionState, AuctionState)> = store
            .history("a-1")
            .unwrap()
            .iter()
            .map(|r| (r.from, r.to))
            .collect();
        assert_eq!(
            steps,
            vec![
                (AuctionState::Draft, AuctionState::Scheduled),
                (AuctionState::Scheduled, AuctionState::Active),
                (AuctionState::Active, AuctionState::Ending),
            ]
        );
    }

    #[test]
    fn test_dispute_cycle_reaches_terminal() {
        let mut store = store_with("a-1");
        walk(
            &mut store,
            "a-1",
            &[
                AuctionState::Scheduled,
                AuctionState::Active,
                AuctionState::Ending,
                AuctionState::Ended,
                AuctionState::PaymentPending,
            ],
        );
        let before = store.history("a-1").unwrap().len();

        walk(
            &mut store,
            "a-1",
            &[
                AuctionState::Disputed,
                AuctionState::PaymentCompleted,
                AuctionState::Shipped,
                AuctionState::Delivered,
            ],
        );

        let history = store.history("a-1").unwrap();
        assert_eq!(history.len() - before, 4);
        let state = store.get("a-1").unwrap().current_state();
        assert_eq!(state, AuctionState::Delivered);
        assert!(state.is_terminal());
        assert!(store
            .request_transition("a-1", AuctionState::Disputed, admin())
            .is_err());
    }

    #[test]
    fn test_histories_are_per_auction() {
        let mut store = store_with("a-1");
        store.insert(Auction::new("a-2", "Oil painting")).unwrap();

        walk(&mut store, "a-1", &[AuctionState::Scheduled]);
        walk(&mut store, "a-2", &[AuctionState::Cancelled]);
        walk(&mut store, "a-1", &[AuctionState::Active]);

        assert_eq!(store.history("a-1").unwrap().len(), 2);
        assert_eq!(store.history("a-2").unwrap().len(), 1);
        assert_eq!(store.audit_log().len(), 3);
        assert_eq!(store.audit_log()[1].auction_id, "a-2");
    }

    #[test]
    fn test_named_transition_rejects_unknown_state() {
        let mut store = store_with("a-1");

        let err = store
            .request_transition_named("a-1", "published", admin())
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Lifecycle(LifecycleError::UnknownState { ref value }) if value == "published"
        ));
        assert!(store.audit_log().is_empty());

        store
            .request_transition_named("a-1", "scheduled", admin())
            .unwrap();
        assert_eq!(store.get("a-1").unwrap().current_state(), AuctionState::Scheduled);
    }

    #[test]
    fn test_unknown_auction() {
        let mut store = AuctionStore::new();

        assert!(matches!(
            store.request_transition("missing", AuctionState::Scheduled, admin()),
            Err(StoreError::AuctionNotFound { .. })
        ));
        assert!(matches!(
            store.history("missing"),
            Err(StoreError::AuctionNotFound { .. })
        ));
    }

    #[test]
    fn test_insert_requires_fresh_draft() {
        let mut store = store_with("a-1");

        assert!(matches!(
            store.insert(Auction::new("a-1", "Again")),
            Err(StoreError::DuplicateAuction { .. })
        ));
        assert!(matches!(
            store.insert(Auction::at_state("a-2", AuctionState::Shipped)),
            Err(StoreError::NotDraft {
                state: AuctionState::Shipped,
                ..
            })
        ));
    }

    #[test]
    fn test_created_auctions_start_in_draft() {
        let mut store = AuctionStore::new();
        let first = store.create_auction("Rare coin");
        let second = store.create_auction("Rare stamp");

        assert_ne!(first.id, second.id);
        assert_eq!(first.current_state(), AuctionState::Draft);
        assert_eq!(store.auctions().len(), 2);
    }

    #[test]
    fn test_listeners_only_see_applied_transitions() {
        let listener = RecordingListener::default();
        let mut store = store_with("a-1").with_listener(listener.clone());

        let _ = store.request_transition("a-1", AuctionState::Shipped, admin());
        walk(&mut store, "a-1", &[AuctionState::Scheduled, AuctionState::Cancelled]);
        let _ = store.request_transition("a-1", AuctionState::Draft, admin());

        let seen = listener.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                (AuctionState::Draft, AuctionState::Scheduled),
                (AuctionState::Scheduled, AuctionState::Cancelled),
            ]
        );
    }

    #[test]
    fn test_bids_only_while_open() {
        let mut store = store_with("a-1");

        assert!(matches!(
            store.record_bid("a-1", 100, "bidder-1"),
            Err(StoreError::BidRejected { .. })
        ));

        walk(&mut store, "a-1", &[AuctionState::Scheduled, AuctionState::Active]);
        store.record_bid("a-1", 100, "bidder-1").unwrap();
        assert!(store.record_bid("a-1", 100, "bidder-2").is_err());
        let auction = store.record_bid("a-1", 150, "bidder-2").unwrap();

        assert_eq!(auction.current_bid, 150);
        assert_eq!(auction.bids_count, 2);
        assert_eq!(auction.winner.as_deref(), Some("bidder-2"));
        assert_eq!(auction.current_state(), AuctionState::Active);
        assert_eq!(store.audit_log().len(), 2);
    }

    #[test]
    fn test_collaborator_updates_do_not_touch_state() {
        let mut store = store_with("a-1");

        store.set_payment_status("a-1", "authorized").unwrap();
        store.set_shipping_status("a-1", "label_printed").unwrap();

        let auction = store.get("a-1").unwrap();
        assert_eq!(auction.current_state(), AuctionState::Draft);
        assert_eq!(auction.payment_status.as_deref(), Some("authorized"));
        assert_eq!(auction.shipping_status.as_deref(), Some("label_printed"));
        assert!(store.audit_log().is_empty());
    }

    #[test]
    fn test_sweep_moves_active_into_ending_window() {
        let now = Utc::now();
        let mut store = store_with("a-1");
        walk(&mut store, "a-1", &[AuctionState::Scheduled, AuctionState::Active]);
        store.set_ends_at("a-1", now + Duration::minutes(3)).unwrap();

        let applied = store.advance_expired(now, Duration::minutes(5));

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].to, AuctionState::Ending);
        assert!(applied[0].triggered_by.is_system());
        assert_eq!(applied[0].timestamp, now);
        assert_eq!(store.get("a-1").unwrap().current_state(), AuctionState::Ending);

        // Not over yet
        assert!(store.advance_expired(now, Duration::minutes(5)).is_empty());

        let applied = store.advance_expired(now + Duration::minutes(4), Duration::minutes(5));
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].to, AuctionState::Ended);
    }

    #[test]
    fn test_sweep_closes_overdue_auction_in_one_pass() {
        let now = Utc::now();
        let mut store = store_with("a-1");
        store.insert(Auction::new("a-2", "No deadline")).unwrap();
        store.insert(Auction::new("a-3", "Far deadline")).unwrap();
        for id in ["a-1", "a-2", "a-3"] {
            walk(&mut store, id, &[AuctionState::Scheduled, AuctionState::Active]);
        }
        store.set_ends_at("a-1", now - Duration::minutes(1)).unwrap();
        store.set_ends_at("a-3", now + Duration::hours(2)).unwrap();

        let applied = store.advance_expired(now, Duration::minutes(5));

        let steps: Vec<(&str, AuctionState)> = applied
            .iter()
            .map(|r| (r.auction_id.as_str(), r.to))
            .collect();
        assert_eq!(
            steps,
            vec![("a-1", AuctionState::Ending), ("a-1", AuctionState::Ended)]
        );
        assert_eq!(store.get("a-2").unwrap().current_state(), AuctionState::Active);
        assert_eq!(store.get("a-3").unwrap().current_state(), AuctionState::Active);
    }

    #[test]
    fn test_sweep_with_unbounded_window() {
        let now = Utc::now();
        let mut store = store_with("a-1");
        walk(&mut store, "a-1", &[AuctionState::Scheduled, AuctionState::Active]);
        store.set_ends_at("a-1", now + Duration::hours(1)).unwrap();

        let applied = store.advance_expired(now, Duration::MAX);

        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].to, AuctionState::Ending);
        assert_eq!(store.get("a-1").unwrap().current_state(), AuctionState::Ending);

        // Closing still waits for ends_at
        assert!(store.advance_expired(now, Duration::MAX).is_empty());
        let applied = store.advance_expired(now + Duration::hours(2), Duration::MAX);
        assert_eq!(applied[0].to, AuctionState::Ended);
    }

    #[test]
    fn test_shared_store_sweep_and_log() {
        let now = Utc::now();
        let shared = SharedAuctionStore::new(store_with("a-1"));

        tokio_test::block_on(async {
            for state in [AuctionState::Scheduled, AuctionState::Active] {
                shared.request_transition("a-1", state, admin()).await.unwrap();
            }
            shared.set_ends_at("a-1", now).await.unwrap();

            let applied = shared.advance_expired(now, Duration::zero()).await;
            assert_eq!(applied.len(), 2);

            let log = shared.audit_log().await;
            assert_eq!(log.len(), 4);
            assert_eq!(log[3].to, AuctionState::Ended);
            assert_eq!(
                shared.get("a-1").await.unwrap().current_state(),
                AuctionState::Ended
            );
        });
    }

    #[tokio::test]
    async fn test_shared_store_serializes_writers() {
        let shared = SharedAuctionStore::new(store_with("a-1"));
        shared
            .request_transition("a-1", AuctionState::Scheduled, admin())
            .await
            .unwrap();

        // Many callers race for the same legal step: exactly one wins
        let mut handles = Vec::new();
        for i in 0..16 {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                shared
                    .request_transition("a-1", AuctionState::Active, Actor::user(format!("op-{i}")))
                    .await
                    .is_ok()
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(shared.history("a-1").await.unwrap().len(), 2);
        assert_eq!(
            shared.get("a-1").await.unwrap().current_state(),
            AuctionState::Active
        );
    }
}
