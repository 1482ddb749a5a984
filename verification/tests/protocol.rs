//! End-to-end protocol scenarios: issue an intent, observe a transfer on a
//! scripted chain, reconcile, and check the stores and pushed events.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use dustproof_chain::{
    ChainError, ChainPoller, ChainSource, ParsedTransaction, SignatureInfo, SystemTransfer,
};
use dustproof_nullables::{
    NullChain, NullClock, NullIntentStore, NullRandom, NullSignatureStore, NullVerifiedStore,
};
use dustproof_store::{IntentStore, SignatureStore, StoreError, VerifiedStore};
use dustproof_store_json::{JsonStores, PENDING_FILE};
use dustproof_types::{Clock, Lamports, PaymentIntent, TxSignature, VerifiedEvent, WalletAddress};
use dustproof_verification::{
    AmountAllocator, CollisionPolicy, ExpirySweeper, IntentRequest, Issuer, Reconciler,
    TickOutcome, VerifiedEventBus, VerifierMetrics, VerifyError, DEFAULT_INTENT_TTL,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const RECEIVER: &str = "Recv1111111111111111111111111111";
const WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
const OTHER_WALLET: &str = "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T";
const USER: &str = "123456789012345678";
const OTHER_USER: &str = "223456789012345678";

struct Harness {
    chain: NullChain,
    clock: Arc<NullClock>,
    intents: Arc<NullIntentStore>,
    verified: Arc<NullVerifiedStore>,
    signatures: Arc<NullSignatureStore>,
    metrics: Arc<VerifierMetrics>,
    sweeper: ExpirySweeper,
    issuer: Issuer,
    reconciler: Reconciler<NullChain>,
    events: Arc<Mutex<Vec<VerifiedEvent>>>,
}

impl Harness {
    fn new(draws: Vec<u64>, policy: CollisionPolicy) -> Self {
        Self::with_random(NullRandom::new(draws), policy)
    }

    fn with_random(random: NullRandom, policy: CollisionPolicy) -> Self {
        let chain = NullChain::new();
        let clock = Arc::new(NullClock::new(1_700_000_000_000));
        let random = Arc::new(random);
        let intents = Arc::new(NullIntentStore::new());
        let verified = Arc::new(NullVerifiedStore::new());
        let signatures = Arc::new(NullSignatureStore::new());
        let metrics = Arc::new(VerifierMetrics::new());

        let sweeper = ExpirySweeper::new(intents.clone(), clock.clone(), metrics.clone());
        let issuer = Issuer::new(
            intents.clone(),
            AmountAllocator::with_defaults(random.clone()),
            sweeper.clone(),
            clock.clone(),
            random,
            metrics.clone(),
            WalletAddress::new(RECEIVER),
            DEFAULT_INTENT_TTL,
        );

        let events = Arc::new(Mutex::new(Vec::new()));
        let mut bus = VerifiedEventBus::new();
        let sink = Arc::clone(&events);
        bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let reconciler = Reconciler::new(
            ChainPoller::new(chain.clone(), WalletAddress::new(RECEIVER), 10),
            intents.clone(),
            verified.clone(),
            signatures.clone(),
            bus,
            clock.clone(),
            policy,
            metrics.clone(),
        );

        Self {
            chain,
            clock,
            intents,
            verified,
            signatures,
            metrics,
            sweeper,
            issuer,
            reconciler,
            events,
        }
    }

    async fn tick(&self) -> Vec<String> {
        match self.reconciler.tick().await.unwrap() {
            TickOutcome::Completed(report) => report
                .verified
                .iter()
                .map(|r| r.intent.identity.external_id.clone())
                .collect(),
            TickOutcome::Skipped => panic!("tick unexpectedly skipped"),
        }
    }

    fn events(&self) -> Vec<VerifiedEvent> {
        self.events.lock().unwrap().clone()
    }
}

fn request(user: &str, wallet: &str) -> IntentRequest {
    IntentRequest {
        discord_id: Some(user.into()),
        twitter_handle: None,
        wallet_address: Some(wallet.into()),
    }
}

fn transfer_tx(signature: &str, source: &str, lamports: u64) -> ParsedTransaction {
    ParsedTransaction {
        signature: TxSignature::new(signature),
        slot: 0,
        block_time: None,
        failed: false,
        transfers: vec![SystemTransfer {
            source: WalletAddress::new(source),
            destination: WalletAddress::new(RECEIVER),
            lamports: Lamports::new(lamports),
        }],
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn issued_intent_is_verified_by_exact_transfer() {
    let h = Harness::new(vec![4210], CollisionPolicy::VerifyAll);

    let instructions = h.issuer.create_intent(&request(USER, WALLET)).unwrap();
    assert_eq!(instructions.amount.to_string(), "0.000004210");
    assert_eq!(instructions.receiving_address.as_str(), RECEIVER);
    assert_eq!(
        instructions.expires_at,
        h.clock.now().saturating_add(DEFAULT_INTENT_TTL)
    );

    h.chain.push_transfer("sig1", WALLET, RECEIVER, 4210);
    assert_eq!(h.tick().await, vec![USER]);

    assert!(h.intents.is_empty());
    assert_eq!(h.verified.len(), 1);
    assert!(h.signatures.contains(&TxSignature::new("sig1")));

    let events = h.events();
    assert_eq!(events.len(), 1);
    let json = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["status"], "confirmed");
    assert_eq!(json["discordId"], USER);
    assert_eq!(json["amount"], "0.000004210");
    assert_eq!(json["signature"], "sig1");
    assert_eq!(h.metrics.intents_verified.get(), 1);
}

#[tokio::test]
async fn swept_intent_ignores_late_transfer() {
    let h = Harness::new(vec![4210], CollisionPolicy::VerifyAll);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();

    h.clock.advance(DEFAULT_INTENT_TTL + Duration::from_secs(1));
    assert_eq!(h.sweeper.sweep().unwrap(), 1);

    h.chain.push_transfer("late", WALLET, RECEIVER, 4210);
    assert!(h.tick().await.is_empty());
    assert!(h.verified.is_empty());
    assert!(h.events().is_empty());
    // The late signature is still consumed.
    assert!(h.signatures.contains(&TxSignature::new("late")));
}

#[tokio::test]
async fn expired_but_unswept_intent_is_never_verified() {
    let h = Harness::new(vec![4210], CollisionPolicy::VerifyAll);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();

    // Exactly at the deadline counts as expired.
    h.clock.advance(DEFAULT_INTENT_TTL);
    h.chain.push_transfer("late", WALLET, RECEIVER, 4210);

    assert!(h.tick().await.is_empty());
    assert_eq!(h.intents.len(), 1);
    assert!(h.verified.is_empty());
}

#[tokio::test]
async fn repeated_signature_transitions_once() {
    let h = Harness::new(vec![4210], CollisionPolicy::VerifyAll);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();

    let sig = h.chain.push_transfer("dup", WALLET, RECEIVER, 4210);
    h.chain.duplicate_in_listing(&sig);

    assert_eq!(h.tick().await, vec![USER]);
    // Same signature comes back on the next poll.
    assert!(h.tick().await.is_empty());
    assert_eq!(h.verified.len(), 1);
    assert_eq!(h.events().len(), 1);
}

#[tokio::test]
async fn corrupt_pending_collection_does_not_block_issuance() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(PENDING_FILE), "[{\"discordId\": tru").unwrap();
    let stores = JsonStores::open(dir.path(), 100).unwrap();
    let intents: Arc<dyn IntentStore> = Arc::new(stores.intents);

    let clock = Arc::new(NullClock::new(0));
    let random = Arc::new(NullRandom::constant(4210));
    let metrics = Arc::new(VerifierMetrics::new());
    let issuer = Issuer::new(
        intents.clone(),
        AmountAllocator::with_defaults(random.clone()),
        ExpirySweeper::new(intents.clone(), clock.clone(), metrics.clone()),
        clock,
        random,
        metrics,
        WalletAddress::new(RECEIVER),
        DEFAULT_INTENT_TTL,
    );

    issuer.create_intent(&request(USER, WALLET)).unwrap();

    let raw = std::fs::read(dir.path().join(PENDING_FILE)).unwrap();
    let on_disk: Vec<PaymentIntent> = serde_json::from_slice(&raw).unwrap();
    assert_eq!(on_disk.len(), 1);
    assert_eq!(on_disk[0].identity.external_id, USER);
}

// ---------------------------------------------------------------------------
// Collisions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn verify_all_policy_verifies_every_colliding_intent() {
    let h = Harness::new(vec![777], CollisionPolicy::VerifyAll);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();
    h.issuer.create_intent(&request(OTHER_USER, WALLET)).unwrap();

    h.chain.push_transfer("one", WALLET, RECEIVER, 777);
    assert_eq!(h.tick().await, vec![USER, OTHER_USER]);
    assert!(h.intents.is_empty());
    assert_eq!(h.events().len(), 2);
}

#[tokio::test]
async fn first_match_policy_verifies_earliest_intent_only() {
    let h = Harness::new(vec![777], CollisionPolicy::FirstMatch);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();
    h.issuer.create_intent(&request(OTHER_USER, WALLET)).unwrap();

    h.chain.push_transfer("one", WALLET, RECEIVER, 777);
    assert_eq!(h.tick().await, vec![USER]);

    let left = h.intents.pending();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].identity.external_id, OTHER_USER);

    // A second transfer of the same amount verifies the remaining one.
    h.chain.push_transfer("two", WALLET, RECEIVER, 777);
    assert_eq!(h.tick().await, vec![OTHER_USER]);
}

#[tokio::test]
async fn same_amount_from_different_wallets_only_verifies_sender() {
    let h = Harness::new(vec![777], CollisionPolicy::VerifyAll);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();
    h.issuer.create_intent(&request(OTHER_USER, OTHER_WALLET)).unwrap();

    h.chain.push_transfer("one", OTHER_WALLET, RECEIVER, 777);
    assert_eq!(h.tick().await, vec![OTHER_USER]);
    assert_eq!(h.intents.len(), 1);
}

#[tokio::test]
async fn allocator_redraws_around_pending_amounts() {
    let h = Harness::new(vec![500, 500, 600], CollisionPolicy::VerifyAll);
    let first = h.issuer.create_intent(&request(USER, WALLET)).unwrap();
    let second = h.issuer.create_intent(&request(OTHER_USER, WALLET)).unwrap();
    assert_eq!(first.amount, Lamports::new(500));
    assert_eq!(second.amount, Lamports::new(600));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upstream_failure_leaves_state_untouched() {
    let h = Harness::new(vec![4210], CollisionPolicy::VerifyAll);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();
    h.chain.push_transfer("sig1", WALLET, RECEIVER, 4210);
    h.chain.set_unavailable(true);

    let err = h.reconciler.tick().await.unwrap_err();
    assert!(matches!(err, VerifyError::Upstream(ChainError::Unavailable(_))));
    assert!(h.signatures.is_empty());
    assert_eq!(h.intents.len(), 1);
    assert_eq!(h.metrics.poll_failures.get(), 1);

    h.chain.set_unavailable(false);
    assert_eq!(h.tick().await, vec![USER]);
}

#[tokio::test]
async fn undecodable_transaction_does_not_block_later_transfers() {
    let h = Harness::new(vec![4210], CollisionPolicy::VerifyAll);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();
    let bad = h.chain.push_transfer("bad", OTHER_WALLET, RECEIVER, 999);
    h.chain.reject_transaction(&bad);
    h.chain.push_transfer("good", WALLET, RECEIVER, 4210);

    assert_eq!(h.tick().await, vec![USER]);
    assert!(h.intents.is_empty());
    assert!(h.signatures.contains(&TxSignature::new("good")));
    assert!(!h.signatures.contains(&bad));

    // The unusable signature keeps being retried without failing ticks.
    assert!(h.tick().await.is_empty());
    assert_eq!(h.metrics.poll_failures.get(), 0);
}

#[tokio::test]
async fn unconfirmed_transfer_is_picked_up_once_confirmed() {
    let h = Harness::new(vec![4210], CollisionPolicy::VerifyAll);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();

    h.chain.push_unconfirmed("slow");
    assert!(h.tick().await.is_empty());
    assert!(!h.signatures.contains(&TxSignature::new("slow")));

    h.chain.confirm(transfer_tx("slow", WALLET, 4210));
    assert_eq!(h.tick().await, vec![USER]);
}

#[tokio::test]
async fn missing_identity_field_is_rejected_without_writing() {
    let h = Harness::new(vec![4210], CollisionPolicy::VerifyAll);
    let err = h
        .issuer
        .create_intent(&IntentRequest {
            wallet_address: Some(WALLET.into()),
            ..IntentRequest::default()
        })
        .unwrap_err();
    assert!(matches!(err, VerifyError::Validation(_)));
    assert!(h.intents.is_empty());
}

#[tokio::test]
async fn store_failure_surfaces_to_caller() {
    let h = Harness::new(vec![4210], CollisionPolicy::VerifyAll);
    h.intents.fail_inserts(true);
    let err = h.issuer.create_intent(&request(USER, WALLET)).unwrap_err();
    assert!(matches!(err, VerifyError::Store(StoreError::Backend(_))));
    assert_eq!(h.metrics.store_write_failures.get(), 1);
}

#[tokio::test]
async fn exhausted_ids_fail_issuance() {
    let h = Harness::with_random(NullRandom::constant(4210).repeat_bytes(), CollisionPolicy::VerifyAll);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();
    let err = h.issuer.create_intent(&request(OTHER_USER, WALLET)).unwrap_err();
    assert!(matches!(err, VerifyError::IdExhausted(_)));
    assert_eq!(h.intents.len(), 1);
}

#[tokio::test]
async fn repair_drops_pending_intents_already_verified() {
    let h = Harness::new(vec![4210], CollisionPolicy::VerifyAll);
    h.issuer.create_intent(&request(USER, WALLET)).unwrap();
    h.issuer.create_intent(&request(OTHER_USER, OTHER_WALLET)).unwrap();

    // Simulate a crash after the verified append but before the removal.
    let pending = h.intents.pending();
    let record = pending[0].to_verified(TxSignature::new("s"), h.clock.now());
    h.verified.append(&[record]).unwrap();

    assert_eq!(h.reconciler.repair().unwrap(), 1);
    assert_eq!(h.intents.len(), 1);
    assert_eq!(h.intents.pending()[0].identity.external_id, OTHER_USER);
    assert_eq!(h.reconciler.repair().unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Overlap
// ---------------------------------------------------------------------------

/// A chain whose listing blocks until the test releases it.
#[derive(Clone)]
struct GatedChain {
    inner: NullChain,
    entered: Arc<tokio::sync::Notify>,
    gate: Arc<tokio::sync::Semaphore>,
}

impl ChainSource for GatedChain {
    async fn recent_signatures(
        &self,
        address: &WalletAddress,
        limit: usize,
    ) -> Result<Vec<SignatureInfo>, ChainError> {
        self.entered.notify_one();
        let permit = self.gate.acquire().await.map_err(|e| ChainError::Unavailable(e.to_string()))?;
        permit.forget();
        self.inner.recent_signatures(address, limit).await
    }

    async fn transaction(
        &self,
        signature: &TxSignature,
    ) -> Result<Option<ParsedTransaction>, ChainError> {
        self.inner.transaction(signature).await
    }
}

#[tokio::test]
async fn overlapping_tick_is_skipped() {
    let chain = GatedChain {
        inner: NullChain::new(),
        entered: Arc::new(tokio::sync::Notify::new()),
        gate: Arc::new(tokio::sync::Semaphore::new(0)),
    };
    let clock = Arc::new(NullClock::new(0));
    let reconciler = Arc::new(Reconciler::new(
        ChainPoller::new(chain.clone(), WalletAddress::new(RECEIVER), 10),
        Arc::new(NullIntentStore::new()),
        Arc::new(NullVerifiedStore::new()),
        Arc::new(NullSignatureStore::new()),
        VerifiedEventBus::new(),
        clock,
        CollisionPolicy::VerifyAll,
        Arc::new(VerifierMetrics::new()),
    ));

    let first = tokio::spawn({
        let reconciler = Arc::clone(&reconciler);
        async move { reconciler.tick().await }
    });
    chain.entered.notified().await;

    assert_eq!(reconciler.tick().await.unwrap(), TickOutcome::Skipped);

    chain.gate.add_permits(1);
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, TickOutcome::Completed(_)));
}

#[tokio::test]
async fn verification_writes_run_on_the_blocking_pool() {
    let chain = NullChain::new();
    let clock = Arc::new(NullClock::new(1_700_000_000_000));
    let random = Arc::new(NullRandom::new(vec![4210]));
    let intents = Arc::new(NullIntentStore::new());
    let metrics = Arc::new(VerifierMetrics::new());
    let sweeper = ExpirySweeper::new(intents.clone(), clock.clone(), metrics.clone());
    let issuer = Issuer::new(
        intents.clone(),
        AmountAllocator::with_defaults(random.clone()),
        sweeper,
        clock.clone(),
        random,
        metrics.clone(),
        WalletAddress::new(RECEIVER),
        DEFAULT_INTENT_TTL,
    );

    let threads = Arc::new(Mutex::new(Vec::new()));
    let mut bus = VerifiedEventBus::new();
    let sink = Arc::clone(&threads);
    bus.subscribe(move |_| sink.lock().unwrap().push(std::thread::current().id()));
    let reconciler = Reconciler::new(
        ChainPoller::new(chain.clone(), WalletAddress::new(RECEIVER), 10),
        intents.clone(),
        Arc::new(NullVerifiedStore::new()),
        Arc::new(NullSignatureStore::new()),
        bus,
        clock,
        CollisionPolicy::VerifyAll,
        metrics,
    );

    issuer.create_intent(&request(USER, WALLET)).unwrap();
    chain.push_transfer("sig1", WALLET, RECEIVER, 4210);
    // The test runtime is single-threaded, so inline store work would run here.
    assert!(matches!(
        reconciler.tick().await.unwrap(),
        TickOutcome::Completed(_)
    ));

    let threads = threads.lock().unwrap();
    assert_eq!(threads.len(), 1);
    assert_ne!(threads[0], std::thread::current().id());
    assert!(intents.is_empty());
}
