//! Reportability determination for real-estate transfers
//!
//! A waterfall of regulatory predicates decides whether a transfer must be
//! reported and, if not, which exemption applies. The same waterfall drives
//! which interview questions are asked:
//!
//! 1. Transfer exemptions - any selected exemption ends the interview
//! 2. Property type - non-residential with no intent to build is exempt
//! 3. Financing - a lender with an AML program covers reporting
//! 4. Buyer type - individuals are never reported; trusts may be statutory
//! 5. Entity exemptions (entities and statutory trusts)
//! 6. Trust exemptions (other trusts)
//!
//! [`evaluate`] and [`visible_steps`] both project one walk of
//! [`waterfall::WATERFALL`], so a finished step list always comes with a
//! verdict and a verdict always comes with a finished step list.

pub mod determination;
pub mod evaluator;
pub mod navigator;
pub mod record;
pub mod rules;
pub mod verdict;
pub mod waterfall;
pub mod wizard;

pub use determination::{finalize, DeterminationError, Finalization, INCOMPLETE_MESSAGE};
pub use evaluator::evaluate;
pub use navigator::{is_step_answered, progress_percent, step_plan, visible_steps, PlannedStep, StepStatus};
pub use record::{BuyerType, Checklist, ChecklistEdit, LenderAml, RecordField, TransactionRecord, YesNo};
pub use rules::{
    catalog, label_for_code, Category, EntityExemption, ExemptionCategory, ExemptionId,
    ExemptionOption, TransferExemption, TrustExemption, NONE_SENTINEL,
};
pub use verdict::{ReasonCode, Verdict};
pub use waterfall::{StepId, MAX_STEPS};
pub use wizard::{Answer, NavigationError, NavigationState, Wizard};
