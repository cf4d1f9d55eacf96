//! Step navigator: which questions to show, derived from the same trace
//! the evaluator uses

use serde::Serialize;

use crate::record::TransactionRecord;
use crate::waterfall::{self, Branch, StepId, MAX_STEPS};

/// Role of a step for the current record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// On the waterfall path and must be answered
    Required,
    /// Bypassed by an earlier answer
    Skipped,
    /// The result step, reached with a verdict
    Terminal,
    /// Not reached yet; may or may not become relevant
    Upcoming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub step: StepId,
    pub status: StepStatus,
}

/// Steps to show, in order
///
/// Always starts with the first step, grows one step per satisfied
/// predicate, and ends with `Result` only when a verdict exists.
pub fn visible_steps(record: &TransactionRecord) -> Vec<StepId> {
    waterfall::trace(record).path
}

/// Status of every step in canonical order
pub fn step_plan(record: &TransactionRecord) -> Vec<PlannedStep> {
    let trace = waterfall::trace(record);
    let pending = trace.pending_step();

    StepId::ALL
        .into_iter()
        .map(|step| {
            let status = if trace.path.contains(&step) {
                if step == StepId::Result {
                    StepStatus::Terminal
                } else {
                    StepStatus::Required
                }
            } else {
                match pending {
                    Some(at) if step > at => StepStatus::Upcoming,
                    _ => StepStatus::Skipped,
                }
            };
            PlannedStep { step, status }
        })
        .collect()
}

/// Whether `step`'s predicate is satisfied, i.e. forward navigation is allowed
pub fn is_step_answered(step: StepId, record: &TransactionRecord) -> bool {
    match waterfall::rule_for(step) {
        Some(rule) => !matches!((rule.decide)(record), Branch::Pending),
        None => false,
    }
}

/// Completion percentage for the step at `index`
///
/// The denominator is the longest possible interview, not the current
/// path length, so progress never jumps backwards when steps drop out.
pub fn progress_percent(index: usize, steps: &[StepId]) -> u8 {
    if steps.get(index) == Some(&StepId::Result) {
        return 100;
    }
    let percent = (index * 100 + MAX_STEPS / 2) / MAX_STEPS;
    percent.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BuyerType, Checklist, YesNo};

    #[test]
    fn test_initial_state_shows_first_step_only() {
        let record = TransactionRecord::new();
        assert_eq!(visible_steps(&record), vec![StepId::TransferExemptions]);
        assert!(!is_step_answered(StepId::TransferExemptions, &record));
    }

    #[test]
    fn test_progress_uses_fixed_denominator() {
        let steps = vec![StepId::TransferExemptions, StepId::PropertyType];
        assert_eq!(progress_percent(0, &steps), 0);
        assert_eq!(progress_percent(1, &steps), 14);
        assert_eq!(progress_percent(3, &[]), 43);
        assert_eq!(
            progress_percent(1, &[StepId::TransferExemptions, StepId::Result]),
            100
        );
    }

    #[test]
    fn test_plan_marks_trust_route_skipping_entity() {
        let record = TransactionRecord {
            transfer_exemptions: Checklist::NoneApply,
            is_residential: Some(YesNo::Yes),
            is_non_financed: Some(YesNo::Yes),
            buyer_type: Some(BuyerType::Trust),
            is_statutory_trust: Some(false),
            ..Default::default()
        };
        let plan = step_plan(&record);
        let status_of = |step| plan.iter().find(|p| p.step == step).unwrap().status;

        assert_eq!(status_of(StepId::BuyerType), StepStatus::Required);
        assert_eq!(status_of(StepId::EntityExemptions), StepStatus::Skipped);
        assert_eq!(status_of(StepId::TrustExemptions), StepStatus::Required);
        assert_eq!(status_of(StepId::Result), StepStatus::Upcoming);
    }

    #[test]
    fn test_plan_after_early_exit_skips_rest() {
        let record = TransactionRecord {
            transfer_exemptions: Checklist::NoneApply,
            is_residential: Some(YesNo::No),
            has_intent_to_build: Some(YesNo::No),
            ..Default::default()
        };
        let plan = step_plan(&record);
        let statuses: Vec<_> = plan.iter().map(|p| p.status).collect();
        assert_eq!(
            statuses,
            vec![
                StepStatus::Required,
                StepStatus::Required,
                StepStatus::Skipped,
                StepStatus::Skipped,
                StepStatus::Skipped,
                StepStatus::Skipped,
                StepStatus::Terminal,
            ]
        );
    }

    #[test]
    fn test_result_step_is_never_answerable() {
        assert!(!is_step_answered(StepId::Result, &TransactionRecord::new()));
    }
}
