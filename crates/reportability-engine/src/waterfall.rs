//! The reportability waterfall as one declarative rule table
//!
//! Every question of the interview is a [`Rule`]: the record fields it
//! collects and a `decide` function that either waits for input, concludes
//! with a reason, or routes to the next step. [`trace`] is the only
//! interpreter of [`WATERFALL`]; the evaluator, the step navigator and the
//! server-side determination are all projections of its output, so the
//! questions asked and the verdict reached cannot drift apart.

use serde::{Deserialize, Serialize};

use crate::record::{BuyerType, Checklist, LenderAml, RecordField, TransactionRecord, YesNo};
use crate::verdict::{ReasonCode, Verdict};

/// Interview steps in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepId {
    TransferExemptions,
    PropertyType,
    Financing,
    BuyerType,
    EntityExemptions,
    TrustExemptions,
    Result,
}

/// Longest possible interview, used as the progress denominator
pub const MAX_STEPS: usize = 7;

impl StepId {
    pub const FIRST: StepId = StepId::TransferExemptions;

    pub const ALL: [StepId; MAX_STEPS] = [
        StepId::TransferExemptions,
        StepId::PropertyType,
        StepId::Financing,
        StepId::BuyerType,
        StepId::EntityExemptions,
        StepId::TrustExemptions,
        StepId::Result,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            StepId::TransferExemptions => "transfer-exemptions",
            StepId::PropertyType => "property-type",
            StepId::Financing => "financing",
            StepId::BuyerType => "buyer-type",
            StepId::EntityExemptions => "entity-exemptions",
            StepId::TrustExemptions => "trust-exemptions",
            StepId::Result => "result",
        }
    }

    /// Position in the canonical order
    pub fn ordinal(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Outcome of one rule against the current record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    /// A required field of this step is unanswered
    Pending,
    /// Terminal: the waterfall ends with this reason
    Conclude(ReasonCode),
    /// Satisfied without concluding; continue at the given step
    Next(StepId),
}

/// One question of the waterfall
pub struct Rule {
    pub step: StepId,
    /// Fields this step collects; a field is required only while it applies
    pub fields: &'static [RecordField],
    pub decide: fn(&TransactionRecord) -> Branch,
}

/// Gating conditions for the conditional questions
///
/// Shared by the rules below, stale-answer detection on the record, and
/// the wizard's clearing of invalidated answers.
pub mod gates {
    use super::*;

    pub fn intent_question_applies(record: &TransactionRecord) -> bool {
        record.is_residential == Some(YesNo::No)
    }

    pub fn lender_question_applies(record: &TransactionRecord) -> bool {
        record.is_non_financed == Some(YesNo::No)
    }

    pub fn statutory_question_applies(record: &TransactionRecord) -> bool {
        record.buyer_type == Some(BuyerType::Trust)
    }

    pub fn is_statutory_trust(record: &TransactionRecord) -> bool {
        statutory_question_applies(record) && record.is_statutory_trust == Some(true)
    }

    pub fn entity_checklist_applies(record: &TransactionRecord) -> bool {
        record.buyer_type == Some(BuyerType::Entity) || is_statutory_trust(record)
    }

    pub fn trust_checklist_applies(record: &TransactionRecord) -> bool {
        statutory_question_applies(record) && record.is_statutory_trust == Some(false)
    }
}

fn decide_transfer(record: &TransactionRecord) -> Branch {
    match &record.transfer_exemptions {
        Checklist::Selected(ids) => Branch::Conclude(ReasonCode::TransferExempt(ids.clone())),
        Checklist::NoneApply => Branch::Next(StepId::PropertyType),
        Checklist::Unanswered => Branch::Pending,
    }
}

fn decide_property_type(record: &TransactionRecord) -> Branch {
    if gates::intent_question_applies(record) {
        return match record.has_intent_to_build {
            Some(YesNo::No) => Branch::Conclude(ReasonCode::NonResidentialNoIntent),
            Some(YesNo::Yes) => Branch::Next(StepId::Financing),
            None => Branch::Pending,
        };
    }
    match record.is_residential {
        Some(_) => Branch::Next(StepId::Financing),
        None => Branch::Pending,
    }
}

fn decide_financing(record: &TransactionRecord) -> Branch {
    if gates::lender_question_applies(record) {
        // `unknown` continues exactly like `no`.
        return match record.lender_has_aml {
            Some(LenderAml::Yes) => Branch::Conclude(ReasonCode::LenderAmlCovers),
            Some(LenderAml::No) | Some(LenderAml::Unknown) => Branch::Next(StepId::BuyerType),
            None => Branch::Pending,
        };
    }
    match record.is_non_financed {
        Some(_) => Branch::Next(StepId::BuyerType),
        None => Branch::Pending,
    }
}

fn decide_buyer_type(record: &TransactionRecord) -> Branch {
    match record.buyer_type {
        None => Branch::Pending,
        Some(BuyerType::Individual) => Branch::Conclude(ReasonCode::IndividualBuyer),
        Some(BuyerType::Entity) => Branch::Next(StepId::EntityExemptions),
        Some(BuyerType::Trust) => match record.is_statutory_trust {
            Some(true) => Branch::Next(StepId::EntityExemptions),
            Some(false) => Branch::Next(StepId::TrustExemptions),
            None => Branch::Pending,
        },
    }
}

fn decide_entity(record: &TransactionRecord) -> Branch {
    match &record.entity_exemptions {
        Checklist::Selected(ids) => Branch::Conclude(ReasonCode::EntityExempt {
            via_statutory_trust: gates::is_statutory_trust(record),
            ids: ids.clone(),
        }),
        Checklist::NoneApply => Branch::Conclude(ReasonCode::Reportable),
        Checklist::Unanswered => Branch::Pending,
    }
}

fn decide_trust(record: &TransactionRecord) -> Branch {
    match &record.trust_exemptions {
        Checklist::Selected(ids) => Branch::Conclude(ReasonCode::TrustExempt(ids.clone())),
        Checklist::NoneApply => Branch::Conclude(ReasonCode::Reportable),
        Checklist::Unanswered => Branch::Pending,
    }
}

/// The waterfall, in evaluation order. `Result` has no rule.
pub static WATERFALL: &[Rule] = &[
    Rule {
        step: StepId::TransferExemptions,
        fields: &[RecordField::TransferExemptions],
        decide: decide_transfer,
    },
    Rule {
        step: StepId::PropertyType,
        fields: &[RecordField::IsResidential, RecordField::HasIntentToBuild],
        decide: decide_property_type,
    },
    Rule {
        step: StepId::Financing,
        fields: &[RecordField::IsNonFinanced, RecordField::LenderHasAml],
        decide: decide_financing,
    },
    Rule {
        step: StepId::BuyerType,
        fields: &[RecordField::BuyerType, RecordField::IsStatutoryTrust],
        decide: decide_buyer_type,
    },
    Rule {
        step: StepId::EntityExemptions,
        fields: &[RecordField::EntityExemptions],
        decide: decide_entity,
    },
    Rule {
        step: StepId::TrustExemptions,
        fields: &[RecordField::TrustExemptions],
        decide: decide_trust,
    },
];

pub fn rule_for(step: StepId) -> Option<&'static Rule> {
    WATERFALL.iter().find(|rule| rule.step == step)
}

/// Fields the step still needs before the user may move on
pub fn missing_fields(step: StepId, record: &TransactionRecord) -> Vec<RecordField> {
    rule_for(step)
        .map(|rule| {
            rule.fields
                .iter()
                .copied()
                .filter(|field| record.applies(*field) && !record.is_answered(*field))
                .collect()
        })
        .unwrap_or_default()
}

/// Path taken through the waterfall for one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    /// Visited steps in order; ends with `Result` iff `verdict` is set
    pub path: Vec<StepId>,
    pub verdict: Option<Verdict>,
}

impl Trace {
    pub fn is_complete(&self) -> bool {
        self.verdict.is_some()
    }

    /// Step waiting for input, if the interview is not finished
    pub fn pending_step(&self) -> Option<StepId> {
        if self.is_complete() {
            None
        } else {
            self.path.last().copied()
        }
    }
}

/// Walk the rule table for `record`
pub fn trace(record: &TransactionRecord) -> Trace {
    let mut path = Vec::with_capacity(MAX_STEPS);
    let mut step = StepId::FIRST;

    // Each `Next` moves strictly forward, so MAX_STEPS bounds the walk.
    for _ in 0..MAX_STEPS {
        path.push(step);
        let Some(rule) = rule_for(step) else {
            break;
        };

        match (rule.decide)(record) {
            Branch::Pending => break,
            Branch::Conclude(reason) => {
                path.push(StepId::Result);
                tracing::trace!(steps = path.len(), reason = %reason.code(), "waterfall concluded");
                return Trace {
                    path,
                    verdict: Some(Verdict::new(reason)),
                };
            }
            Branch::Next(next) if next > step && next != StepId::Result => step = next,
            Branch::Next(next) => {
                tracing::error!(from = ?step, to = ?next, "waterfall rule routed backwards");
                break;
            }
        }
    }

    tracing::trace!(steps = path.len(), "waterfall pending");
    Trace {
        path,
        verdict: None,
    }
}
