//! Restart-safe reconciliation of non-terminal vote records.
//!
//! After a crash or a lost confirmation, the store can hold `Reserved` rows
//! whose submission fate is unknown and `Submitted` rows that never saw
//! finality. This pass settles what the ledger can answer and reports the
//! rest to the operator. It never resubmits: discovering an existing
//! transaction (by authorized address and candidate) and adopting its
//! reference is the only write path to the external ledger from here.

use std::sync::Arc;

use votum_chain::{ConfirmationStatus, LedgerClient};
use votum_store::{VoteRecord, VoteStore};
use votum_types::{Clock, SystemClock, TransactionRef, VoteStatus};

use crate::error::SessionError;

/// Tally of one reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Non-terminal records examined.
    pub examined: usize,
    /// Records advanced to `Confirmed`.
    pub confirmed: usize,
    /// Records whose transaction was discovered on the ledger and adopted.
    pub adopted: usize,
    /// Records advanced to `Failed` on a definitive ledger rejection.
    pub failed: usize,
    /// Records the ledger could not settle; left untouched for the operator.
    pub unresolved: usize,
}

pub struct Reconciler {
    store: Arc<dyn VoteStore>,
    ledger: Arc<dyn LedgerClient>,
    clock: Arc<dyn Clock>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn VoteStore>, ledger: Arc<dyn LedgerClient>) -> Self {
        Self::with_clock(store, ledger, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn VoteStore>,
        ledger: Arc<dyn LedgerClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            ledger,
            clock,
        }
    }

    /// Run one pass over all `Submitted` and `Reserved` records.
    pub async fn run(&self) -> Result<ReconcileReport, SessionError> {
        let mut report = ReconcileReport::default();

        for record in self.store.iter_by_status(VoteStatus::Submitted)? {
            report.examined += 1;
            match record.transaction_ref.clone() {
                Some(reference) => self.settle(&record, &reference, &mut report).await?,
                None => self.adopt_or_park(&record, &mut report).await?,
            }
        }

        for record in self.store.iter_by_status(VoteStatus::Reserved)? {
            report.examined += 1;
            self.adopt_or_park(&record, &mut report).await?;
        }

        tracing::info!(
            examined = report.examined,
            confirmed = report.confirmed,
            adopted = report.adopted,
            failed = report.failed,
            unresolved = report.unresolved,
            "reconciliation pass complete"
        );
        Ok(report)
    }

    /// Observe a known transaction once and settle the record if possible.
    async fn settle(
        &self,
        record: &VoteRecord,
        reference: &TransactionRef,
        report: &mut ReconcileReport,
    ) -> Result<(), SessionError> {
        match self.ledger.await_confirmation(reference).await {
            Ok(ConfirmationStatus::Confirmed) => {
                self.store.advance(
                    &record.identity_key,
                    VoteStatus::Confirmed,
                    None,
                    self.clock.now(),
                )?;
                report.confirmed += 1;
            }
            Ok(ConfirmationStatus::Failed { reason }) => {
                let now = self.clock.now();
                self.store
                    .record_failure_reason(&record.identity_key, &reason, now)?;
                self.store
                    .advance(&record.identity_key, VoteStatus::Failed, None, now)?;
                report.failed += 1;
            }
            Ok(ConfirmationStatus::Pending) | Err(_) => {
                report.unresolved += 1;
            }
        }
        Ok(())
    }

    /// Query the ledger for an existing transaction from this record's
    /// authorized address; adopt it if found, otherwise leave the record
    /// for the operator.
    async fn adopt_or_park(
        &self,
        record: &VoteRecord,
        report: &mut ReconcileReport,
    ) -> Result<(), SessionError> {
        let Some(address) = record.voter_address.clone() else {
            report.unresolved += 1;
            return Ok(());
        };

        match self.ledger.find_vote(&address, record.candidate_id).await {
            Ok(Some(reference)) => {
                self.store.advance(
                    &record.identity_key,
                    VoteStatus::Submitted,
                    Some(&reference),
                    self.clock.now(),
                )?;
                report.adopted += 1;
                tracing::info!(
                    identity = %record.identity_key,
                    %reference,
                    "adopted ledger transaction during reconciliation"
                );
                self.settle(record, &reference, report).await
            }
            Ok(None) | Err(_) => {
                report.unresolved += 1;
                Ok(())
            }
        }
    }
}
