//! Session orchestrator — connects the identity verifier, wallet provider,
//! idempotency ledger, and vote ledger into a single end-to-end pipeline.
//!
//! Per-session state is owned here and touched only under the sessions lock;
//! no lock is held across an external await. The idempotency store's
//! `reserve` is the one cross-session synchronization point. On an unknown
//! submission outcome (a transient error after the transaction may have
//! reached the ledger) the pipeline always queries for an existing
//! transaction before resubmitting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::RwLock;

use votum_chain::{Candidate, ChainError, ConfirmationStatus, LedgerClient};
use votum_store::{ReserveOutcome, VoteStore};
use votum_types::{
    CandidateId, Clock, IdentityKey, SessionId, SystemClock, Timestamp, TransactionRecord,
    TransactionRef, VoteParams, VoteStatus, VoterAddress,
};
use votum_verifier::{BiometricSample, IdentityVerifier, VerifierError};
use votum_wallet::{Authorization, AuthorizationProvider};

use crate::backoff::RetrySchedule;
use crate::error::SessionError;
use crate::events::SessionEvent;
use crate::state::{SessionState, VotingSession};

/// The orchestrator ties together all vote pipeline subsystems.
pub struct SessionOrchestrator {
    verifier: Arc<dyn IdentityVerifier>,
    wallet: Arc<dyn AuthorizationProvider>,
    ledger: Arc<dyn LedgerClient>,
    store: Arc<dyn VoteStore>,
    clock: Arc<dyn Clock>,
    params: VoteParams,
    sessions: RwLock<HashMap<SessionId, VotingSession>>,
    pending_events: Mutex<Vec<SessionEvent>>,
}

impl SessionOrchestrator {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        wallet: Arc<dyn AuthorizationProvider>,
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn VoteStore>,
        params: VoteParams,
    ) -> Self {
        Self::with_clock(verifier, wallet, ledger, store, params, Arc::new(SystemClock))
    }

    pub fn with_clock(
        verifier: Arc<dyn IdentityVerifier>,
        wallet: Arc<dyn AuthorizationProvider>,
        ledger: Arc<dyn LedgerClient>,
        store: Arc<dyn VoteStore>,
        params: VoteParams,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            verifier,
            wallet,
            ledger,
            store,
            clock,
            params,
            sessions: RwLock::new(HashMap::new()),
            pending_events: Mutex::new(Vec::new()),
        }
    }

    pub fn params(&self) -> &VoteParams {
        &self.params
    }

    /// Drain events accumulated since the last call.
    pub fn drain_events(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.pending_events.lock().unwrap())
    }

    fn push_event(&self, event: SessionEvent) {
        self.pending_events.lock().unwrap().push(event);
    }

    // ── Session lifecycle ──────────────────────────────────────────────

    /// Start a new session for a claimed registration identity.
    pub async fn start_session(
        &self,
        claimed_identity: &str,
    ) -> Result<VotingSession, SessionError> {
        let claimed = claimed_identity.trim();
        if claimed.is_empty() {
            return Err(SessionError::Verifier(VerifierError::InvalidSample(
                "empty claimed identity".into(),
            )));
        }

        let now = self.clock.now();
        let mut session =
            VotingSession::new(claimed.to_string(), now, self.params.session_timeout_secs);
        session.transition(SessionState::Capturing, now)?;
        let snapshot = session.clone();

        self.sessions
            .write()
            .await
            .insert(session.session_id, session);
        self.push_event(SessionEvent::SessionStarted {
            session_id: snapshot.session_id,
        });
        tracing::info!(session = %snapshot.session_id, "session started");

        Ok(snapshot)
    }

    /// Current snapshot of a session, applying lazy expiry.
    pub async fn session(&self, id: SessionId) -> Result<VotingSession, SessionError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        if session.state.is_expirable() && session.is_expired(now) {
            session.transition(SessionState::Expired, now)?;
            self.push_event(SessionEvent::SessionExpired { session_id: id });
        }
        Ok(session.clone())
    }

    /// Mark expired sessions and prune terminal ones past their retention
    /// window. Returns `(expired, pruned)`.
    pub async fn expire_stale_sessions(&self) -> (usize, usize) {
        let now = self.clock.now();
        let retention = self.params.session_timeout_secs;
        let mut expired = 0;
        let mut sessions = self.sessions.write().await;

        for session in sessions.values_mut() {
            if session.state.is_expirable() && session.is_expired(now) {
                // Reservation rows written by this session stay as-is; only
                // the UI session dies.
                if session.transition(SessionState::Expired, now).is_ok() {
                    expired += 1;
                    self.push_event(SessionEvent::SessionExpired {
                        session_id: session.session_id,
                    });
                }
            }
        }

        let before = sessions.len();
        sessions.retain(|_, s| {
            !(s.state.is_terminal() && s.updated_at.plus(retention).is_past(now))
        });
        let pruned = before - sessions.len();

        if expired > 0 || pruned > 0 {
            tracing::debug!(expired, pruned, "session sweep");
        }
        (expired, pruned)
    }

    // ── Verification ───────────────────────────────────────────────────

    /// Feed a biometric capture to the verifier.
    ///
    /// A malformed sample costs nothing; a capture that reached the matcher
    /// (whether it scored below threshold or the verifier was unreachable)
    /// consumes one of the session's attempts. Exhausting the attempts is
    /// terminal: probing further requires a brand-new session.
    pub async fn submit_sample(
        &self,
        id: SessionId,
        sample: &BiometricSample,
    ) -> Result<VotingSession, SessionError> {
        let claimed = {
            let now = self.clock.now();
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&id)
                .ok_or(SessionError::UnknownSession(id))?;
            self.check_expiry(session, now)?;
            if session.state != SessionState::Capturing {
                return Err(SessionError::WrongState {
                    op: "submit_sample",
                    state: session.state,
                });
            }
            session.transition(SessionState::Verifying, now)?;
            session.claimed_identity.clone()
        };

        let outcome = self.verifier.verify(&claimed, sample).await;

        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        if session.state != SessionState::Verifying {
            // Swept to Expired while the verifier call was in flight.
            return Err(SessionError::Expired);
        }

        match outcome {
            Err(VerifierError::InvalidSample(reason)) => {
                session.transition(SessionState::Capturing, now)?;
                session.failure_reason = Some(format!("invalid sample: {reason}"));
                Err(SessionError::Verifier(VerifierError::InvalidSample(reason)))
            }
            Err(e) => {
                session.verify_attempts += 1;
                session.failure_reason = Some(e.to_string());
                if session.verify_attempts >= self.params.max_verify_attempts {
                    session.transition(SessionState::VerificationFailed, now)?;
                    self.push_event(SessionEvent::VerificationFailed {
                        session_id: id,
                        attempts: session.verify_attempts,
                    });
                    Err(SessionError::VerificationFailed {
                        attempts: session.verify_attempts,
                    })
                } else {
                    session.transition(SessionState::Capturing, now)?;
                    Err(SessionError::Verifier(e))
                }
            }
            Ok(result) => {
                session.verify_attempts += 1;
                let verified = result.verified;
                let similarity = result.similarity;
                let identity_key = result.identity_key;
                session.verification = Some(result);

                if verified {
                    session.failure_reason = None;
                    session.transition(SessionState::Verified, now)?;
                    self.push_event(SessionEvent::IdentityVerified {
                        session_id: id,
                        identity_key,
                        similarity,
                    });
                    Ok(session.clone())
                } else if session.verify_attempts >= self.params.max_verify_attempts {
                    session.transition(SessionState::VerificationFailed, now)?;
                    session.failure_reason =
                        Some(format!("similarity {similarity:.2} below threshold"));
                    self.push_event(SessionEvent::VerificationFailed {
                        session_id: id,
                        attempts: session.verify_attempts,
                    });
                    Err(SessionError::VerificationFailed {
                        attempts: session.verify_attempts,
                    })
                } else {
                    session.transition(SessionState::Capturing, now)?;
                    session.failure_reason =
                        Some(format!("similarity {similarity:.2} below threshold"));
                    Ok(session.clone())
                }
            }
        }
    }

    // ── Authorization ──────────────────────────────────────────────────

    /// Prompt the wallet for a vote authorization.
    ///
    /// Recoverable: a failed or declined prompt leaves the session in
    /// `AuthorizationFailed`, from which `authorize` may be called again
    /// until the session expires.
    pub async fn authorize(&self, id: SessionId) -> Result<VotingSession, SessionError> {
        {
            let now = self.clock.now();
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&id)
                .ok_or(SessionError::UnknownSession(id))?;
            self.check_expiry(session, now)?;
            match session.state {
                SessionState::Verified | SessionState::AuthorizationFailed => {}
                state => {
                    return Err(SessionError::WrongState {
                        op: "authorize",
                        state,
                    })
                }
            }
            session.transition(SessionState::Authorizing, now)?;
        }

        let outcome = self.wallet.authorize(id).await;

        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        if session.state != SessionState::Authorizing {
            return Err(SessionError::Expired);
        }

        match outcome {
            Ok(authorization) => {
                let address = authorization.address.clone();
                session.authorization = Some(authorization);
                session.failure_reason = None;
                session.transition(SessionState::Authorized, now)?;
                self.push_event(SessionEvent::AuthorizationGranted {
                    session_id: id,
                    address,
                });
                Ok(session.clone())
            }
            Err(e) => {
                session.transition(SessionState::AuthorizationFailed, now)?;
                session.failure_reason = Some(e.to_string());
                Err(SessionError::AuthorizationFailed(e.to_string()))
            }
        }
    }

    // ── Casting ────────────────────────────────────────────────────────

    /// Validate the candidate, reserve the identity's vote slot, and drive
    /// submission to confirmation.
    pub async fn cast_vote(
        &self,
        id: SessionId,
        candidate_id: CandidateId,
    ) -> Result<VotingSession, SessionError> {
        let (identity_key, authorization) = {
            let now = self.clock.now();
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&id)
                .ok_or(SessionError::UnknownSession(id))?;
            self.check_expiry(session, now)?;
            if session.state != SessionState::Authorized {
                return Err(SessionError::WrongState {
                    op: "cast_vote",
                    state: session.state,
                });
            }
            let verification = session
                .verification
                .as_ref()
                .filter(|v| v.verified)
                .ok_or(SessionError::WrongState {
                    op: "cast_vote",
                    state: session.state,
                })?;
            let authorization = session
                .authorization
                .clone()
                .ok_or(SessionError::WrongState {
                    op: "cast_vote",
                    state: session.state,
                })?;
            (verification.identity_key, authorization)
        };

        // Unknown candidates are rejected before any reservation exists;
        // the session stays in Authorized so the voter can pick a valid one.
        if let Err(e) = self.ledger.get_candidate(candidate_id).await {
            let reason = e.to_string();
            self.set_failure_reason(id, &reason).await;
            return Err(match e {
                ChainError::UnknownCandidate(c) => SessionError::UnknownCandidate(c),
                other => SessionError::Chain(other),
            });
        }

        // Reservation — the dedup chokepoint. Re-check the state under the
        // lock so a concurrent cast for the same session loses cleanly.
        let now = self.clock.now();
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&id)
                .ok_or(SessionError::UnknownSession(id))?;
            if session.state != SessionState::Authorized {
                return Err(SessionError::WrongState {
                    op: "cast_vote",
                    state: session.state,
                });
            }
            session.transition(SessionState::Reserving, now)?;
        }
        match self.store.reserve(&identity_key, candidate_id, now)? {
            ReserveOutcome::AlreadyExists(existing) => {
                let mut sessions = self.sessions.write().await;
                if let Some(session) = sessions.get_mut(&id) {
                    session.transition(SessionState::DuplicateVote, self.clock.now())?;
                    session.failure_reason =
                        Some(format!("identity already has a {existing} vote"));
                }
                drop(sessions);
                self.push_event(SessionEvent::DuplicateRejected {
                    session_id: id,
                    identity_key,
                    existing,
                });
                tracing::warn!(session = %id, %identity_key, %existing, "duplicate vote rejected");
                return Err(SessionError::DuplicateVote(existing));
            }
            ReserveOutcome::Reserved => {
                self.store
                    .record_address(&identity_key, &authorization.address, now)?;
            }
        }

        self.run_submission(id, identity_key, candidate_id, authorization)
            .await
    }

    /// Submission loop: guard against unknown outcomes, submit, poll for
    /// confirmation, back off, retry — always against the same reserved row.
    async fn run_submission(
        &self,
        id: SessionId,
        identity_key: IdentityKey,
        candidate_id: CandidateId,
        authorization: Authorization,
    ) -> Result<VotingSession, SessionError> {
        self.transition_session(id, SessionState::Submitting).await?;

        let max_tries = self.params.max_submit_attempts.max(1);
        let mut schedule = RetrySchedule::new(
            self.params.submit_backoff_initial_ms,
            self.params.submit_backoff_max_ms,
        );
        let address = authorization.address.clone();
        let mut tries = 0;

        loop {
            tries += 1;

            match self
                .submission_round(id, &identity_key, candidate_id, &address, &authorization)
                .await?
            {
                RoundOutcome::Confirmed(reference) => {
                    let now = self.clock.now();
                    let mut sessions = self.sessions.write().await;
                    let session = sessions
                        .get_mut(&id)
                        .ok_or(SessionError::UnknownSession(id))?;
                    session.transition(SessionState::Confirmed, now)?;
                    if let Some(tx) = session.transaction.as_mut() {
                        tx.confirmed_at = Some(now);
                    }
                    session.failure_reason = None;
                    let snapshot = session.clone();
                    drop(sessions);
                    self.push_event(SessionEvent::VoteConfirmed {
                        session_id: id,
                        identity_key,
                        candidate_id,
                        reference,
                    });
                    tracing::info!(session = %id, %identity_key, %candidate_id, "vote confirmed");
                    return Ok(snapshot);
                }
                RoundOutcome::FatalReject(reason) => {
                    return self.fail_submission(id, &identity_key, reason).await;
                }
                RoundOutcome::Transient(reason) => {
                    if tries >= max_tries {
                        let reason =
                            format!("submission attempts exhausted ({max_tries}): {reason}");
                        return self.fail_submission(id, &identity_key, reason).await;
                    }
                    self.set_failure_reason(id, &reason).await;
                    tracing::debug!(session = %id, tries, reason = %reason, "submission retry");
                    tokio::time::sleep(schedule.next_delay()).await;
                }
            }
        }
    }

    /// One try: adopt-or-submit, then poll for confirmation until the
    /// confirmation window closes.
    async fn submission_round(
        &self,
        id: SessionId,
        identity_key: &IdentityKey,
        candidate_id: CandidateId,
        address: &VoterAddress,
        authorization: &Authorization,
    ) -> Result<RoundOutcome, SessionError> {
        // The unknown-outcome guard: a previous attempt (or a crashed
        // predecessor session) may already have landed a transaction.
        // Resubmitting without this check is the classic double-vote bug.
        let existing = match self.ledger.find_vote(address, candidate_id).await {
            Ok(existing) => existing,
            Err(e) => {
                // Can't rule out an existing transaction — do not submit.
                return Ok(RoundOutcome::Transient(format!("vote lookup failed: {e}")));
            }
        };

        let now = self.clock.now();
        let reference = match existing {
            Some(reference) => {
                tracing::info!(session = %id, %reference, "adopted existing ledger transaction");
                reference
            }
            None => {
                self.store.record_attempt(identity_key, now)?;
                match self.ledger.submit(candidate_id, authorization).await {
                    Ok(reference) => reference,
                    Err(ChainError::Rejected(reason)) => {
                        return Ok(RoundOutcome::FatalReject(reason));
                    }
                    Err(ChainError::UnknownCandidate(c)) => {
                        return Ok(RoundOutcome::FatalReject(format!("unknown candidate {c}")));
                    }
                    Err(e) => {
                        // Unknown outcome — the next round re-runs the guard.
                        return Ok(RoundOutcome::Transient(e.to_string()));
                    }
                }
            }
        };

        self.store
            .advance(identity_key, VoteStatus::Submitted, Some(&reference), now)?;
        {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&id)
                .ok_or(SessionError::UnknownSession(id))?;
            if session.state == SessionState::Submitting {
                session.transition(SessionState::Submitted, now)?;
            }
            session.transaction = Some(TransactionRecord::submitted(
                reference.clone(),
                candidate_id,
                now,
            ));
        }

        // Bounded confirmation wait.
        let deadline = tokio::time::Instant::now()
            + Duration::from_millis(self.params.ledger_confirmation_timeout_ms);
        let poll = Duration::from_millis(self.params.confirmation_poll_interval_ms.max(1));

        loop {
            match self.ledger.await_confirmation(&reference).await {
                Ok(ConfirmationStatus::Confirmed) => {
                    self.store
                        .advance(identity_key, VoteStatus::Confirmed, None, self.clock.now())?;
                    return Ok(RoundOutcome::Confirmed(reference));
                }
                Ok(ConfirmationStatus::Failed { reason }) => {
                    return Ok(RoundOutcome::FatalReject(reason));
                }
                Ok(ConfirmationStatus::Pending) | Err(_) => {
                    if tokio::time::Instant::now() + poll > deadline {
                        break;
                    }
                    tokio::time::sleep(poll).await;
                }
            }
        }

        // Window closed without an observation; retry with the same row.
        {
            let mut sessions = self.sessions.write().await;
            if let Some(session) = sessions.get_mut(&id) {
                if session.state == SessionState::Submitted {
                    session.transition(SessionState::Submitting, self.clock.now())?;
                }
            }
        }
        Ok(RoundOutcome::Transient(format!(
            "no confirmation within {}ms",
            self.params.ledger_confirmation_timeout_ms
        )))
    }

    // ── Candidates ─────────────────────────────────────────────────────

    /// Look up a candidate on the external ledger.
    pub async fn candidate(&self, candidate_id: CandidateId) -> Result<Candidate, SessionError> {
        match self.ledger.get_candidate(candidate_id).await {
            Ok(candidate) => Ok(candidate),
            Err(ChainError::UnknownCandidate(c)) => Err(SessionError::UnknownCandidate(c)),
            Err(e) => Err(SessionError::Chain(e)),
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn check_expiry(
        &self,
        session: &mut VotingSession,
        now: Timestamp,
    ) -> Result<(), SessionError> {
        if session.state == SessionState::Expired {
            return Err(SessionError::Expired);
        }
        if session.state.is_expirable() && session.is_expired(now) {
            session.transition(SessionState::Expired, now)?;
            self.push_event(SessionEvent::SessionExpired {
                session_id: session.session_id,
            });
            return Err(SessionError::Expired);
        }
        Ok(())
    }

    async fn transition_session(
        &self,
        id: SessionId,
        to: SessionState,
    ) -> Result<(), SessionError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        session.transition(to, now)
    }

    async fn set_failure_reason(&self, id: SessionId, reason: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&id) {
            session.failure_reason = Some(reason.to_string());
        }
    }

    /// Mark the record failed and the session `SubmissionFailed`. The row
    /// stays in the store for the audit trail and later reconciliation.
    async fn fail_submission(
        &self,
        id: SessionId,
        identity_key: &IdentityKey,
        reason: String,
    ) -> Result<VotingSession, SessionError> {
        let now = self.clock.now();
        self.store.record_failure_reason(identity_key, &reason, now)?;
        self.store
            .advance(identity_key, VoteStatus::Failed, None, now)?;

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&id) {
            session.transition(SessionState::SubmissionFailed, now)?;
            session.failure_reason = Some(reason.clone());
        }
        drop(sessions);

        self.push_event(SessionEvent::VoteFailed {
            session_id: id,
            reason: reason.clone(),
        });
        tracing::warn!(session = %id, %identity_key, reason = %reason, "vote submission failed");
        Err(SessionError::SubmissionFailed(reason))
    }
}

/// Outcome of one submission round.
enum RoundOutcome {
    Confirmed(TransactionRef),
    FatalReject(String),
    Transient(String),
}
