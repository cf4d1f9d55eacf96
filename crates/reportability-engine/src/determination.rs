//! Finalizing a determination
//!
//! The pure half of committing a verdict: decide whether a report may move
//! out of `draft`, and into which status. Callers hold the stored status and
//! outcome; this module never reads a verdict supplied by a client.

use shared_types::{DeterminationOutcome, ReportStatus};
use thiserror::Error;

use crate::record::TransactionRecord;
use crate::verdict::Verdict;
use crate::waterfall::{self, StepId};

pub const INCOMPLETE_MESSAGE: &str =
    "Determination incomplete: answer all required questions before confirming";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeterminationError {
    #[error("{}", INCOMPLETE_MESSAGE)]
    Incomplete { pending_step: StepId },

    #[error("Report is already {status}; its answers changed after the determination")]
    AlreadyDetermined { status: ReportStatus },
}

/// What the caller must do with the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalization {
    /// Persist this outcome and move the report to its status
    Commit(DeterminationOutcome),
    /// Already finalized from the identical record; nothing to write
    AlreadyFinal(DeterminationOutcome),
}

impl Finalization {
    pub fn outcome(&self) -> &DeterminationOutcome {
        match self {
            Finalization::Commit(outcome) | Finalization::AlreadyFinal(outcome) => outcome,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Finalization::Commit(_))
    }
}

/// Outcome to persist for `verdict` derived from `record`
pub fn outcome_for(verdict: &Verdict, record: &TransactionRecord) -> DeterminationOutcome {
    DeterminationOutcome {
        status: ReportStatus::for_verdict(verdict.is_reportable),
        is_reportable: verdict.is_reportable,
        reason_code: verdict.reason_code(),
        reason_text: verdict.reason_text(),
        record_fingerprint: record.fingerprint(),
    }
}

/// Decide the status transition for a stored report
///
/// A final report whose record is unchanged returns its stored outcome
/// without re-evaluating, so repeating the call has no side effects.
pub fn finalize(
    record: &TransactionRecord,
    status: ReportStatus,
    stored: Option<&DeterminationOutcome>,
) -> Result<Finalization, DeterminationError> {
    if status.is_final() {
        return match stored {
            Some(outcome) if outcome.record_fingerprint == record.fingerprint() => {
                Ok(Finalization::AlreadyFinal(outcome.clone()))
            }
            _ => Err(DeterminationError::AlreadyDetermined { status }),
        };
    }

    let trace = waterfall::trace(record);
    match trace.verdict {
        Some(verdict) => Ok(Finalization::Commit(outcome_for(&verdict, record))),
        None => Err(DeterminationError::Incomplete {
            pending_step: trace.pending_step().unwrap_or(StepId::FIRST),
        }),
    }
}
