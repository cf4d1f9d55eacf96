//! Determination verdicts and their reason codes

use serde::{Serialize, Serializer};

use crate::rules::{EntityExemption, ExemptionId, TransferExemption, TrustExemption};

pub const NON_RESIDENTIAL_NO_INTENT: &str = "non-residential-no-intent";
pub const LENDER_AML_COVERS: &str = "lender-aml-covers";
pub const INDIVIDUAL_BUYER: &str = "individual-buyer";
pub const REPORTABLE: &str = "reportable";

/// Why the waterfall stopped where it did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReasonCode {
    TransferExempt(Vec<TransferExemption>),
    NonResidentialNoIntent,
    LenderAmlCovers,
    IndividualBuyer,
    /// Exempt transferee entity, or a statutory trust evaluated as one
    EntityExempt {
        via_statutory_trust: bool,
        ids: Vec<EntityExemption>,
    },
    TrustExempt(Vec<TrustExemption>),
    Reportable,
}

fn join_ids<T: ExemptionId>(ids: &[T]) -> String {
    ids.iter().map(|id| id.id()).collect::<Vec<_>>().join(",")
}

fn join_labels<T: ExemptionId>(ids: &[T]) -> String {
    ids.iter().map(|id| id.label()).collect::<Vec<_>>().join("; ")
}

impl ReasonCode {
    /// Whether a filing is required
    pub fn is_reportable(&self) -> bool {
        matches!(self, ReasonCode::Reportable)
    }

    /// Machine-readable code, stable across client and server
    pub fn code(&self) -> String {
        match self {
            ReasonCode::TransferExempt(ids) => join_ids(ids),
            ReasonCode::NonResidentialNoIntent => NON_RESIDENTIAL_NO_INTENT.to_string(),
            ReasonCode::LenderAmlCovers => LENDER_AML_COVERS.to_string(),
            ReasonCode::IndividualBuyer => INDIVIDUAL_BUYER.to_string(),
            ReasonCode::EntityExempt {
                via_statutory_trust,
                ids,
            } => {
                let prefix = if *via_statutory_trust {
                    "statutory-trust"
                } else {
                    "entity"
                };
                format!("{}:{}", prefix, join_ids(ids))
            }
            ReasonCode::TrustExempt(ids) => format!("trust:{}", join_ids(ids)),
            ReasonCode::Reportable => REPORTABLE.to_string(),
        }
    }

    /// Display text. Not authoritative; the code is.
    pub fn text(&self) -> String {
        match self {
            ReasonCode::TransferExempt(ids) => format!("Exempt transfer: {}", join_labels(ids)),
            ReasonCode::NonResidentialNoIntent => {
                "Non-residential property with no intent to build a residence".to_string()
            }
            ReasonCode::LenderAmlCovers => {
                "Financed by a lender with an AML program that covers reporting".to_string()
            }
            ReasonCode::IndividualBuyer => {
                "Buyer is an individual; no report is required".to_string()
            }
            ReasonCode::EntityExempt {
                via_statutory_trust: false,
                ids,
            } => format!("Exempt entity: {}", join_labels(ids)),
            ReasonCode::EntityExempt {
                via_statutory_trust: true,
                ids,
            } => format!("Statutory trust exempt as entity: {}", join_labels(ids)),
            ReasonCode::TrustExempt(ids) => format!("Exempt trust: {}", join_labels(ids)),
            ReasonCode::Reportable => {
                "No exemption applies; this transfer must be reported".to_string()
            }
        }
    }
}

/// Final classification of a transaction record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub is_reportable: bool,
    pub reason: ReasonCode,
}

impl Verdict {
    pub fn new(reason: ReasonCode) -> Self {
        Self {
            is_reportable: reason.is_reportable(),
            reason,
        }
    }

    pub fn reason_code(&self) -> String {
        self.reason.code()
    }

    pub fn reason_text(&self) -> String {
        self.reason.text()
    }
}

#[derive(Serialize)]
struct VerdictWire {
    is_reportable: bool,
    reason_code: String,
    reason_text: String,
}

impl Serialize for Verdict {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        VerdictWire {
            is_reportable: self.is_reportable,
            reason_code: self.reason_code(),
            reason_text: self.reason_text(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_codes_join_in_selection_order() {
        let reason = ReasonCode::TransferExempt(vec![
            TransferExemption::Exchange1031,
            TransferExemption::Divorce,
        ]);
        assert_eq!(reason.code(), "1031-exchange,divorce");
        assert!(reason.text().starts_with("Exempt transfer: Transfer to a qualified"));
    }

    #[test]
    fn test_entity_code_prefix_tracks_routing() {
        let direct = ReasonCode::EntityExempt {
            via_statutory_trust: false,
            ids: vec![EntityExemption::Bank],
        };
        let via_trust = ReasonCode::EntityExempt {
            via_statutory_trust: true,
            ids: vec![EntityExemption::Bank],
        };
        assert_eq!(direct.code(), "entity:bank");
        assert_eq!(via_trust.code(), "statutory-trust:bank");
        assert_eq!(via_trust.text(), "Statutory trust exempt as entity: Bank");
    }

    #[test]
    fn test_only_reportable_reason_is_reportable() {
        assert!(Verdict::new(ReasonCode::Reportable).is_reportable);
        assert!(!Verdict::new(ReasonCode::IndividualBuyer).is_reportable);
        assert!(!Verdict::new(ReasonCode::LenderAmlCovers).is_reportable);
        assert!(!Verdict::new(ReasonCode::TrustExempt(vec![TrustExemption::ExemptOwnedTrust]))
            .is_reportable);
    }

    #[test]
    fn test_verdict_serializes_code_and_text() {
        let json = serde_json::to_value(Verdict::new(ReasonCode::NonResidentialNoIntent)).unwrap();
        assert_eq!(json["is_reportable"], false);
        assert_eq!(json["reason_code"], NON_RESIDENTIAL_NO_INTENT);
        assert!(json["reason_text"].as_str().unwrap().contains("no intent"));
    }
}
