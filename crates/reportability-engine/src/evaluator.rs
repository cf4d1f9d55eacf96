//! Determination evaluator

use crate::record::TransactionRecord;
use crate::verdict::Verdict;
use crate::waterfall;

/// Classify `record`, or `None` while the interview is incomplete
///
/// Never fails: a missing verdict is the normal state of an unfinished
/// interview. Answers left behind by an earlier branch are never
/// consulted, so the earlier waterfall field always wins.
pub fn evaluate(record: &TransactionRecord) -> Option<Verdict> {
    waterfall::trace(record).verdict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{BuyerType, Checklist, LenderAml, YesNo};
    use crate::rules::{EntityExemption, TransferExemption, TrustExemption};
    use crate::verdict::ReasonCode;

    fn past_transfer() -> TransactionRecord {
        TransactionRecord {
            transfer_exemptions: Checklist::NoneApply,
            ..Default::default()
        }
    }

    #[test]
    fn test_incomplete_until_first_answer() {
        assert_eq!(evaluate(&TransactionRecord::new()), None);
        assert_eq!(evaluate(&past_transfer()), None);
    }

    #[test]
    fn test_non_residential_requires_intent_answer() {
        let mut record = past_transfer();
        record.is_residential = Some(YesNo::No);
        assert_eq!(evaluate(&record), None);

        record.has_intent_to_build = Some(YesNo::Yes);
        assert_eq!(evaluate(&record), None);

        record.has_intent_to_build = Some(YesNo::No);
        assert_eq!(
            evaluate(&record).map(|v| v.reason),
            Some(ReasonCode::NonResidentialNoIntent)
        );
    }

    #[test]
    fn test_residential_skips_intent_question() {
        let mut record = past_transfer();
        record.is_residential = Some(YesNo::Yes);
        // A stale intent answer is ignored.
        record.has_intent_to_build = Some(YesNo::No);
        record.is_non_financed = Some(YesNo::Yes);
        record.buyer_type = Some(BuyerType::Entity);
        record.entity_exemptions = Checklist::NoneApply;

        let verdict = evaluate(&record).unwrap();
        assert!(verdict.is_reportable);
        assert_eq!(verdict.reason_code(), "reportable");
    }

    #[test]
    fn test_unknown_lender_aml_continues_like_no() {
        // Preserved as observed; the regulatory reading of "unknown" is unconfirmed.
        let mut record = past_transfer();
        record.is_residential = Some(YesNo::Yes);
        record.is_non_financed = Some(YesNo::No);
        record.buyer_type = Some(BuyerType::Entity);
        record.entity_exemptions = Checklist::NoneApply;

        record.lender_has_aml = Some(LenderAml::No);
        let with_no = evaluate(&record);
        record.lender_has_aml = Some(LenderAml::Unknown);
        let with_unknown = evaluate(&record);

        assert_eq!(with_no, with_unknown);
        assert!(with_unknown.unwrap().is_reportable);
    }

    #[test]
    fn test_trust_requires_statutory_answer() {
        let mut record = past_transfer();
        record.is_residential = Some(YesNo::Yes);
        record.is_non_financed = Some(YesNo::Yes);
        record.buyer_type = Some(BuyerType::Trust);
        record.trust_exemptions = Checklist::Selected(vec![TrustExemption::ExemptOwnedTrust]);
        assert_eq!(evaluate(&record), None);

        record.is_statutory_trust = Some(false);
        let verdict = evaluate(&record).unwrap();
        assert_eq!(verdict.reason_code(), "trust:exempt-owned-trust");
        assert!(!verdict.is_reportable);
    }

    #[test]
    fn test_stale_entity_answers_ignored_for_individual() {
        let mut record = past_transfer();
        record.is_residential = Some(YesNo::Yes);
        record.is_non_financed = Some(YesNo::Yes);
        record.buyer_type = Some(BuyerType::Individual);
        record.entity_exemptions = Checklist::Selected(vec![EntityExemption::Bank]);

        assert_eq!(
            evaluate(&record).map(|v| v.reason),
            Some(ReasonCode::IndividualBuyer)
        );
    }

    #[test]
    fn test_transfer_reason_keeps_selection_order() {
        let mut record = TransactionRecord::new();
        record.transfer_exemptions.select(TransferExemption::Divorce);
        record.transfer_exemptions.select(TransferExemption::Death);
        assert_eq!(evaluate(&record).unwrap().reason_code(), "divorce,death");
    }
}
