//! Interview state machine over the step navigator
//!
//! States are positions in the visible step list. Answering a question
//! mutates the record, clears answers the change invalidated, and clamps
//! the current position to the recomputed list. Moving backwards never
//! touches answers.

use serde::Serialize;
use thiserror::Error;

use crate::evaluator::evaluate;
use crate::navigator::{is_step_answered, progress_percent, visible_steps};
use crate::record::{
    BuyerType, ChecklistEdit, LenderAml, RecordField, TransactionRecord, YesNo,
};
use crate::rules::{EntityExemption, TransferExemption, TrustExemption};
use crate::verdict::Verdict;
use crate::waterfall::{gates, missing_fields, StepId};

/// One user answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    TransferExemptions(ChecklistEdit<TransferExemption>),
    IsResidential(YesNo),
    HasIntentToBuild(YesNo),
    IsNonFinanced(YesNo),
    LenderHasAml(LenderAml),
    BuyerType(BuyerType),
    IsStatutoryTrust(bool),
    EntityExemptions(ChecklistEdit<EntityExemption>),
    TrustExemptions(ChecklistEdit<TrustExemption>),
}

impl Answer {
    pub fn field(&self) -> RecordField {
        match self {
            Answer::TransferExemptions(_) => RecordField::TransferExemptions,
            Answer::IsResidential(_) => RecordField::IsResidential,
            Answer::HasIntentToBuild(_) => RecordField::HasIntentToBuild,
            Answer::IsNonFinanced(_) => RecordField::IsNonFinanced,
            Answer::LenderHasAml(_) => RecordField::LenderHasAml,
            Answer::BuyerType(_) => RecordField::BuyerType,
            Answer::IsStatutoryTrust(_) => RecordField::IsStatutoryTrust,
            Answer::EntityExemptions(_) => RecordField::EntityExemptions,
            Answer::TrustExemptions(_) => RecordField::TrustExemptions,
        }
    }

    fn apply_to(self, record: &mut TransactionRecord) {
        match self {
            Answer::TransferExemptions(edit) => record.transfer_exemptions.apply(edit),
            Answer::IsResidential(value) => record.is_residential = Some(value),
            Answer::HasIntentToBuild(value) => record.has_intent_to_build = Some(value),
            Answer::IsNonFinanced(value) => record.is_non_financed = Some(value),
            Answer::LenderHasAml(value) => record.lender_has_aml = Some(value),
            Answer::BuyerType(value) => record.buyer_type = Some(value),
            Answer::IsStatutoryTrust(value) => record.is_statutory_trust = Some(value),
            Answer::EntityExemptions(edit) => record.entity_exemptions.apply(edit),
            Answer::TrustExemptions(edit) => record.trust_exemptions.apply(edit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("Step '{step}' still needs an answer for: {}", field_names(.missing))]
    StepIncomplete {
        step: StepId,
        missing: Vec<RecordField>,
    },

    #[error("Already at the last visible step '{0}'")]
    AtLastStep(StepId),

    #[error("Already at the first step")]
    AtFirstStep,

    #[error("Step '{0}' is not part of this interview")]
    NotVisible(StepId),

    #[error("Step '{0}' has not been reached yet")]
    NotReached(StepId),

    #[error("Question '{}' does not apply to the current answers", .0.name())]
    NotApplicable(RecordField),
}

fn field_names(fields: &[RecordField]) -> String {
    fields.iter().map(|f| f.name()).collect::<Vec<_>>().join(", ")
}

/// Snapshot of the navigation state, as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationState {
    pub steps: Vec<StepId>,
    pub current_index: usize,
    pub current_step: StepId,
    pub progress_percent: u8,
    pub can_advance: bool,
    pub missing_fields: Vec<RecordField>,
    pub verdict: Option<Verdict>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wizard {
    record: TransactionRecord,
    current: usize,
}

impl Wizard {
    /// Fresh interview: first step, nothing answered
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a saved record at its furthest reachable step
    pub fn resume(mut record: TransactionRecord) -> Self {
        let cleared = record.clear_stale();
        if !cleared.is_empty() {
            tracing::debug!(?cleared, "dropped stale answers from resumed record");
        }
        let current = visible_steps(&record).len() - 1;
        Self { record, current }
    }

    pub fn record(&self) -> &TransactionRecord {
        &self.record
    }

    pub fn into_record(self) -> TransactionRecord {
        self.record
    }

    pub fn steps(&self) -> Vec<StepId> {
        visible_steps(&self.record)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> StepId {
        // The list always holds at least the first step and `current` is
        // clamped after every mutation.
        self.steps()
            .get(self.current)
            .copied()
            .unwrap_or(StepId::FIRST)
    }

    pub fn is_finished(&self) -> bool {
        self.current_step() == StepId::Result
    }

    pub fn verdict(&self) -> Option<Verdict> {
        evaluate(&self.record)
    }

    pub fn can_advance(&self) -> bool {
        let steps = self.steps();
        self.current + 1 < steps.len() && is_step_answered(steps[self.current], &self.record)
    }

    /// Steps the user may jump back to
    pub fn revisitable_steps(&self) -> Vec<StepId> {
        let mut steps = self.steps();
        steps.truncate(self.current + 1);
        steps
    }

    /// Record an answer, returning the fields it invalidated
    pub fn answer(&mut self, answer: Answer) -> Result<Vec<RecordField>, NavigationError> {
        let field = answer.field();
        if !self.record.applies(field) {
            return Err(NavigationError::NotApplicable(field));
        }

        let was_statutory_trust = gates::is_statutory_trust(&self.record);
        answer.apply_to(&mut self.record);

        let mut cleared = Vec::new();
        // Entity answers reached through statutory-trust routing belong to
        // the trust; leaving trust drops them even if the new buyer type
        // also reads the entity checklist.
        if was_statutory_trust
            && !gates::is_statutory_trust(&self.record)
            && self.record.entity_exemptions.is_answered()
        {
            self.record.clear(RecordField::EntityExemptions);
            cleared.push(RecordField::EntityExemptions);
        }
        cleared.extend(self.record.clear_stale());
        cleared.sort_by_key(|f| *f as usize);
        if !cleared.is_empty() {
            tracing::debug!(field = field.name(), ?cleared, "cleared invalidated answers");
        }

        let last = self.steps().len() - 1;
        if self.current > last {
            self.current = last;
        }
        Ok(cleared)
    }

    /// Move to the next visible step
    pub fn advance(&mut self) -> Result<StepId, NavigationError> {
        let steps = self.steps();
        let step = steps[self.current];

        if !is_step_answered(step, &self.record) {
            if step == StepId::Result {
                return Err(NavigationError::AtLastStep(step));
            }
            return Err(NavigationError::StepIncomplete {
                step,
                missing: missing_fields(step, &self.record),
            });
        }
        if self.current + 1 >= steps.len() {
            return Err(NavigationError::AtLastStep(step));
        }

        self.current += 1;
        Ok(steps[self.current])
    }

    pub fn back(&mut self) -> Result<StepId, NavigationError> {
        if self.current == 0 {
            return Err(NavigationError::AtFirstStep);
        }
        self.current -= 1;
        Ok(self.current_step())
    }

    /// Jump to a visible step at or before the current one
    pub fn go_to(&mut self, step: StepId) -> Result<(), NavigationError> {
        let index = self
            .steps()
            .iter()
            .position(|s| *s == step)
            .ok_or(NavigationError::NotVisible(step))?;
        if index > self.current {
            return Err(NavigationError::NotReached(step));
        }
        self.current = index;
        Ok(())
    }

    pub fn state(&self) -> NavigationState {
        let steps = self.steps();
        let current_step = steps[self.current];
        NavigationState {
            current_index: self.current,
            current_step,
            progress_percent: progress_percent(self.current, &steps),
            can_advance: self.can_advance(),
            missing_fields: missing_fields(current_step, &self.record),
            verdict: self.verdict(),
            steps,
        }
    }
}
