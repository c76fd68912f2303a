//! Integration tests exercising the full vote pipeline:
//! capture → verification → authorization → reservation → submission →
//! confirmation, against scripted collaborators and both store backends.

use std::sync::Arc;

use votum_chain::{ConfirmationStatus, LedgerClient};
use votum_nullables::{MemoryVoteStore, NullAuthorizer, NullClock, NullLedger, NullVerifier, SubmitOutcome};
use votum_session::{SessionError, SessionEvent, SessionOrchestrator, SessionState};
use votum_store::VoteStore;
use votum_types::{CandidateId, IdentityKey, Timestamp, VoteParams, VoteStatus, VoterAddress};
use votum_verifier::{BiometricSample, VerifierError};
use votum_wallet::{Authorization, WalletError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Harness {
    orchestrator: SessionOrchestrator,
    verifier: Arc<NullVerifier>,
    wallet: Arc<NullAuthorizer>,
    ledger: Arc<NullLedger>,
    store: Arc<MemoryVoteStore>,
    clock: Arc<NullClock>,
}

fn harness() -> Harness {
    harness_with_params(VoteParams::fast_defaults())
}

fn harness_with_params(params: VoteParams) -> Harness {
    let verifier = Arc::new(NullVerifier::new(params.similarity_threshold));
    let wallet = Arc::new(NullAuthorizer::new("0xabc"));
    let ledger = Arc::new(NullLedger::new());
    let store = Arc::new(MemoryVoteStore::new());
    let clock = Arc::new(NullClock::new(1_000));

    ledger.add_candidate(7, "Ada");
    ledger.add_candidate(8, "Grace");

    let orchestrator = SessionOrchestrator::with_clock(
        verifier.clone(),
        wallet.clone(),
        ledger.clone(),
        store.clone(),
        params,
        clock.clone(),
    );

    Harness {
        orchestrator,
        verifier,
        wallet,
        ledger,
        store,
        clock,
    }
}

fn sample() -> BiometricSample {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend_from_slice(&[7u8; 24]);
    BiometricSample::from_bytes(bytes).unwrap()
}

fn identity_key(claimed: &str, name: &str) -> IdentityKey {
    IdentityKey::derive(claimed, name)
}

/// Drive a fresh session through verification and authorization.
async fn authorized_session(
    h: &Harness,
    claimed: &str,
    name: &str,
    score: f64,
) -> votum_session::VotingSession {
    h.verifier.push_score(name, score);
    let session = h.orchestrator.start_session(claimed).await.unwrap();
    let session = h
        .orchestrator
        .submit_sample(session.session_id, &sample())
        .await
        .unwrap();
    assert_eq!(session.state, SessionState::Verified);
    let session = h.orchestrator.authorize(session.session_id).await.unwrap();
    assert_eq!(session.state, SessionState::Authorized);
    session
}

// ---------------------------------------------------------------------------
// 1. Happy path
// ---------------------------------------------------------------------------

#[tokio::test]
async fn happy_path_confirms_exactly_one_vote() {
    let h = harness();
    let session = authorized_session(&h, "V1", "alice", 0.9).await;

    let session = h
        .orchestrator
        .cast_vote(session.session_id, CandidateId::new(7))
        .await
        .unwrap();

    assert_eq!(session.state, SessionState::Confirmed);
    let tx = session.transaction.unwrap();
    assert_eq!(tx.reference.as_str(), "tx123");
    assert_eq!(tx.candidate_id, CandidateId::new(7));
    assert!(tx.confirmed_at.is_some());

    let record = h.store.get(&identity_key("V1", "alice")).unwrap().unwrap();
    assert_eq!(record.status, VoteStatus::Confirmed);
    assert_eq!(record.candidate_id, CandidateId::new(7));
    assert_eq!(record.transaction_ref.unwrap().as_str(), "tx123");
    assert_eq!(record.attempts, 1);

    assert_eq!(h.ledger.landed_votes(), 1);

    let events = h.orchestrator.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::IdentityVerified { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::VoteConfirmed { .. })));
}

// ---------------------------------------------------------------------------
// 2. Verification outcomes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn three_low_scores_fail_terminally_with_no_record() {
    let h = harness();
    for _ in 0..3 {
        h.verifier.push_score("bob", 0.5);
    }
    let session = h.orchestrator.start_session("V2").await.unwrap();
    let id = session.session_id;

    // First two attempts leave the session recoverable.
    for _ in 0..2 {
        let snapshot = h.orchestrator.submit_sample(id, &sample()).await.unwrap();
        assert_eq!(snapshot.state, SessionState::Capturing);
        assert!(snapshot.failure_reason.unwrap().contains("below threshold"));
    }

    // The third is terminal.
    let err = h.orchestrator.submit_sample(id, &sample()).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::VerificationFailed { attempts: 3 }
    ));
    let snapshot = h.orchestrator.session(id).await.unwrap();
    assert_eq!(snapshot.state, SessionState::VerificationFailed);

    // Restarting the same session is impossible.
    h.verifier.push_score("bob", 0.99);
    let err = h.orchestrator.submit_sample(id, &sample()).await.unwrap_err();
    assert!(matches!(err, SessionError::WrongState { .. }));

    // No reservation was ever created.
    assert_eq!(h.store.record_count().unwrap(), 0);
    assert_eq!(h.verifier.call_count(), 3);
}

#[tokio::test]
async fn similarity_equal_to_threshold_verifies() {
    let h = harness();
    h.verifier.push_score("carol", 0.85);
    let session = h.orchestrator.start_session("V3").await.unwrap();
    let session = h
        .orchestrator
        .submit_sample(session.session_id, &sample())
        .await
        .unwrap();
    assert_eq!(session.state, SessionState::Verified);
    assert_eq!(session.verification.unwrap().similarity, 0.85);
}

#[tokio::test]
async fn invalid_sample_does_not_consume_an_attempt() {
    let h = harness();
    h.verifier
        .push_error(VerifierError::InvalidSample("blurry".into()));
    h.verifier.push_score("dan", 0.9);

    let session = h.orchestrator.start_session("V4").await.unwrap();
    let id = session.session_id;

    let err = h.orchestrator.submit_sample(id, &sample()).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Verifier(VerifierError::InvalidSample(_))
    ));

    let session = h.orchestrator.submit_sample(id, &sample()).await.unwrap();
    assert_eq!(session.state, SessionState::Verified);
    assert_eq!(session.verify_attempts, 1);
}

#[tokio::test]
async fn verifier_outage_consumes_attempts() {
    let h = harness();
    for _ in 0..3 {
        h.verifier
            .push_error(VerifierError::Unavailable("down".into()));
    }
    let session = h.orchestrator.start_session("V5").await.unwrap();
    let id = session.session_id;

    for _ in 0..2 {
        let err = h.orchestrator.submit_sample(id, &sample()).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Verifier(VerifierError::Unavailable(_))
        ));
    }
    let err = h.orchestrator.submit_sample(id, &sample()).await.unwrap_err();
    assert!(matches!(err, SessionError::VerificationFailed { .. }));
}

// ---------------------------------------------------------------------------
// 3. Authorization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn declined_prompt_is_recoverable_within_the_session() {
    let h = harness();
    h.verifier.push_score("erin", 0.9);
    h.wallet.push_error(WalletError::UserRejected);

    let session = h.orchestrator.start_session("V6").await.unwrap();
    let id = session.session_id;
    h.orchestrator.submit_sample(id, &sample()).await.unwrap();

    let err = h.orchestrator.authorize(id).await.unwrap_err();
    assert!(matches!(err, SessionError::AuthorizationFailed(_)));
    let snapshot = h.orchestrator.session(id).await.unwrap();
    assert_eq!(snapshot.state, SessionState::AuthorizationFailed);

    // A fresh prompt succeeds.
    let session = h.orchestrator.authorize(id).await.unwrap();
    assert_eq!(session.state, SessionState::Authorized);
}

// ---------------------------------------------------------------------------
// 4. Deduplication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_session_after_confirmed_is_duplicate() {
    let h = harness();
    let session = authorized_session(&h, "V1", "alice", 0.9).await;
    h.orchestrator
        .cast_vote(session.session_id, CandidateId::new(7))
        .await
        .unwrap();

    // Same voter, brand-new session and device.
    let session2 = authorized_session(&h, "V1", "alice", 0.92).await;
    let verifier_calls = h.verifier.call_count();
    let wallet_calls = h.wallet.call_count();

    let err = h
        .orchestrator
        .cast_vote(session2.session_id, CandidateId::new(8))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SessionError::DuplicateVote(VoteStatus::Confirmed)
    ));
    let snapshot = h.orchestrator.session(session2.session_id).await.unwrap();
    assert_eq!(snapshot.state, SessionState::DuplicateVote);

    // The dedup decision came from the reservation alone — no further
    // verifier or wallet traffic.
    assert_eq!(h.verifier.call_count(), verifier_calls);
    assert_eq!(h.wallet.call_count(), wallet_calls);

    // Only the original vote landed, for the original candidate.
    assert_eq!(h.ledger.landed_votes(), 1);
    let record = h.store.get(&identity_key("V1", "alice")).unwrap().unwrap();
    assert_eq!(record.candidate_id, CandidateId::new(7));
}

#[tokio::test]
async fn concurrent_sessions_share_one_confirmed_vote() {
    let h = harness();
    let a = authorized_session(&h, "V1", "alice", 0.9).await;
    let b = authorized_session(&h, "V1", "alice", 0.91).await;

    let (ra, rb) = tokio::join!(
        h.orchestrator.cast_vote(a.session_id, CandidateId::new(7)),
        h.orchestrator.cast_vote(b.session_id, CandidateId::new(7)),
    );

    let confirmed = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(confirmed, 1);
    let duplicate = [&ra, &rb]
        .iter()
        .filter(|r| matches!(r, Err(SessionError::DuplicateVote(_))))
        .count();
    assert_eq!(duplicate, 1);

    assert_eq!(h.ledger.landed_votes(), 1);
    let record = h.store.get(&identity_key("V1", "alice")).unwrap().unwrap();
    assert_eq!(record.status, VoteStatus::Confirmed);
}

// ---------------------------------------------------------------------------
// 5. Expiry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn expired_session_performs_no_reservation_or_submission() {
    let h = harness();
    let session = h.orchestrator.start_session("V7").await.unwrap();
    let id = session.session_id;

    h.clock.advance(301);

    let err = h.orchestrator.submit_sample(id, &sample()).await.unwrap_err();
    assert!(matches!(err, SessionError::Expired));
    let snapshot = h.orchestrator.session(id).await.unwrap();
    assert_eq!(snapshot.state, SessionState::Expired);

    assert_eq!(h.verifier.call_count(), 0);
    assert_eq!(h.store.record_count().unwrap(), 0);
    assert_eq!(h.ledger.submit_calls(), 0);
}

#[tokio::test]
async fn sweep_expires_stale_sessions_but_keeps_reservations() {
    let h = harness();
    let session = authorized_session(&h, "V8", "hank", 0.9).await;
    h.orchestrator
        .cast_vote(session.session_id, CandidateId::new(7))
        .await
        .unwrap();
    let other = h.orchestrator.start_session("V9").await.unwrap();

    h.clock.advance(301);
    let (expired, _pruned) = h.orchestrator.expire_stale_sessions().await;
    assert_eq!(expired, 1);

    let snapshot = h.orchestrator.session(other.session_id).await.unwrap();
    assert_eq!(snapshot.state, SessionState::Expired);

    // The confirmed record is untouched by session expiry.
    let record = h.store.get(&identity_key("V8", "hank")).unwrap().unwrap();
    assert_eq!(record.status, VoteStatus::Confirmed);
}

// ---------------------------------------------------------------------------
// 6. Submission failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_outcome_is_adopted_not_resubmitted() {
    let h = harness();
    // The transaction lands but the client never learns the reference.
    h.ledger.push_submit(SubmitOutcome::AcceptUnobserved);

    let session = authorized_session(&h, "V10", "iris", 0.9).await;
    let session = h
        .orchestrator
        .cast_vote(session.session_id, CandidateId::new(7))
        .await
        .unwrap();

    assert_eq!(session.state, SessionState::Confirmed);
    // Exactly one submission reached the ledger; the retry discovered it
    // via the lookup guard instead of voting twice.
    assert_eq!(h.ledger.submit_calls(), 1);
    assert_eq!(h.ledger.landed_votes(), 1);
    assert!(h.ledger.find_vote_calls() >= 2);

    let record = h.store.get(&identity_key("V10", "iris")).unwrap().unwrap();
    assert_eq!(record.status, VoteStatus::Confirmed);
}

#[tokio::test]
async fn transient_errors_retry_until_success() {
    let h = harness();
    h.ledger
        .push_submit(SubmitOutcome::Transient("nonce conflict".into()));
    h.ledger
        .push_submit(SubmitOutcome::Transient("timeout".into()));

    let session = authorized_session(&h, "V11", "judy", 0.9).await;
    let session = h
        .orchestrator
        .cast_vote(session.session_id, CandidateId::new(7))
        .await
        .unwrap();

    assert_eq!(session.state, SessionState::Confirmed);
    assert_eq!(h.ledger.landed_votes(), 1);
    let record = h.store.get(&identity_key("V11", "judy")).unwrap().unwrap();
    assert_eq!(record.attempts, 3);
}

#[tokio::test]
async fn ledger_rejection_is_terminal_and_audited() {
    let h = harness();
    h.ledger
        .push_submit(SubmitOutcome::Reject("contract revert".into()));

    let session = authorized_session(&h, "V12", "kate", 0.9).await;
    let err = h
        .orchestrator
        .cast_vote(session.session_id, CandidateId::new(7))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::SubmissionFailed(_)));

    let snapshot = h.orchestrator.session(session.session_id).await.unwrap();
    assert_eq!(snapshot.state, SessionState::SubmissionFailed);

    // The row is kept as Failed — never deleted, never replayed.
    let record = h.store.get(&identity_key("V12", "kate")).unwrap().unwrap();
    assert_eq!(record.status, VoteStatus::Failed);
    assert!(record.failure_reason.unwrap().contains("contract revert"));
}

#[tokio::test]
async fn exhausted_attempts_leave_failed_row() {
    let h = harness();
    for _ in 0..5 {
        h.ledger
            .push_submit(SubmitOutcome::Transient("partition".into()));
    }

    let session = authorized_session(&h, "V13", "liam", 0.9).await;
    let err = h
        .orchestrator
        .cast_vote(session.session_id, CandidateId::new(7))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::SubmissionFailed(_)));

    let record = h.store.get(&identity_key("V13", "liam")).unwrap().unwrap();
    assert_eq!(record.status, VoteStatus::Failed);
    assert_eq!(record.attempts, 5);
}

#[tokio::test]
async fn unknown_candidate_rejected_before_reservation() {
    let h = harness();
    let session = authorized_session(&h, "V14", "mona", 0.9).await;

    let err = h
        .orchestrator
        .cast_vote(session.session_id, CandidateId::new(999))
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::UnknownCandidate(_)));
    assert_eq!(h.store.record_count().unwrap(), 0);

    // The session is still usable for a valid candidate.
    let session = h
        .orchestrator
        .cast_vote(session.session_id, CandidateId::new(7))
        .await
        .unwrap();
    assert_eq!(session.state, SessionState::Confirmed);
}

// ---------------------------------------------------------------------------
// 7. Reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconciler_adopts_transaction_lost_before_observation() {
    let h = harness();
    let key = identity_key("V15", "nina");
    let address = VoterAddress::new("0xdead");
    let now = Timestamp::new(1_000);

    // A crashed predecessor reserved, submitted, and died before recording
    // the reference.
    h.store.reserve(&key, CandidateId::new(7), now).unwrap();
    h.store.record_address(&key, &address, now).unwrap();
    let auth = Authorization {
        address: address.clone(),
        signature_or_handle: "sig".into(),
        granted_at: now,
    };
    h.ledger.submit(CandidateId::new(7), &auth).await.unwrap();

    let reconciler = votum_session::Reconciler::with_clock(
        h.store.clone(),
        h.ledger.clone(),
        h.clock.clone(),
    );
    let report = reconciler.run().await.unwrap();

    assert_eq!(report.examined, 1);
    assert_eq!(report.adopted, 1);
    assert_eq!(report.confirmed, 1);
    assert_eq!(report.unresolved, 0);

    // No second submission happened.
    assert_eq!(h.ledger.submit_calls(), 1);
    let record = h.store.get(&key).unwrap().unwrap();
    assert_eq!(record.status, VoteStatus::Confirmed);
    assert!(record.transaction_ref.is_some());
}

#[tokio::test]
async fn reconciler_never_resubmits_unresolvable_rows() {
    let h = harness();
    let key = identity_key("V16", "omar");
    h.store
        .reserve(&key, CandidateId::new(7), Timestamp::new(1_000))
        .unwrap();
    // No address recorded, nothing on the ledger.

    let reconciler = votum_session::Reconciler::with_clock(
        h.store.clone(),
        h.ledger.clone(),
        h.clock.clone(),
    );
    let report = reconciler.run().await.unwrap();

    assert_eq!(report.unresolved, 1);
    assert_eq!(h.ledger.submit_calls(), 0);
    let record = h.store.get(&key).unwrap().unwrap();
    assert_eq!(record.status, VoteStatus::Reserved);
}

#[tokio::test]
async fn reconciler_settles_failed_submissions() {
    let h = harness();
    let key = identity_key("V17", "pete");
    let now = Timestamp::new(1_000);
    h.store.reserve(&key, CandidateId::new(7), now).unwrap();
    let reference = votum_types::TransactionRef::new("txdead");
    h.store
        .advance(&key, VoteStatus::Submitted, Some(&reference), now)
        .unwrap();
    h.ledger.push_confirmation(
        &reference,
        ConfirmationStatus::Failed {
            reason: "reverted".into(),
        },
    );

    let reconciler = votum_session::Reconciler::with_clock(
        h.store.clone(),
        h.ledger.clone(),
        h.clock.clone(),
    );
    let report = reconciler.run().await.unwrap();

    assert_eq!(report.failed, 1);
    let record = h.store.get(&key).unwrap().unwrap();
    assert_eq!(record.status, VoteStatus::Failed);
    assert!(record.failure_reason.unwrap().contains("reverted"));
}

// ---------------------------------------------------------------------------
// 8. LMDB-backed pipeline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn durable_store_backs_the_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();

    {
        let env =
            votum_store_lmdb::LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024).unwrap();
        let store = Arc::new(env.vote_store());

        let params = VoteParams::fast_defaults();
        let verifier = Arc::new(NullVerifier::new(params.similarity_threshold));
        let wallet = Arc::new(NullAuthorizer::new("0xabc"));
        let ledger = Arc::new(NullLedger::new());
        ledger.add_candidate(7, "Ada");
        let clock = Arc::new(NullClock::new(1_000));

        let orchestrator = SessionOrchestrator::with_clock(
            verifier.clone(),
            wallet,
            ledger.clone(),
            store,
            params,
            clock,
        );

        verifier.push_score("alice", 0.9);
        let session = orchestrator.start_session("V1").await.unwrap();
        let session = orchestrator
            .submit_sample(session.session_id, &sample())
            .await
            .unwrap();
        let session = orchestrator.authorize(session.session_id).await.unwrap();
        let session = orchestrator
            .cast_vote(session.session_id, CandidateId::new(7))
            .await
            .unwrap();
        assert_eq!(session.state, SessionState::Confirmed);
    }

    // The dedup decision survives a process restart.
    let reopened = votum_store_lmdb::LmdbEnvironment::open(dir.path(), 4, 16 * 1024 * 1024)
        .unwrap()
        .vote_store();
    let record = reopened
        .get(&identity_key("V1", "alice"))
        .unwrap()
        .unwrap();
    assert_eq!(record.status, VoteStatus::Confirmed);
}
