use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a report draft.
///
/// `Draft` is the only non-final state. A determination moves a report to
/// exactly one of the two final states and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Exempt,
    DeterminationComplete,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Exempt => "exempt",
            ReportStatus::DeterminationComplete => "determination_complete",
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, ReportStatus::Draft)
    }

    /// Status a verdict transitions a draft into
    pub fn for_verdict(is_reportable: bool) -> Self {
        if is_reportable {
            ReportStatus::DeterminationComplete
        } else {
            ReportStatus::Exempt
        }
    }
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown report status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for ReportStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ReportStatus::Draft),
            "exempt" => Ok(ReportStatus::Exempt),
            "determination_complete" => Ok(ReportStatus::DeterminationComplete),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A committed determination as stored next to the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterminationOutcome {
    pub status: ReportStatus,
    pub is_reportable: bool,
    pub reason_code: String,
    pub reason_text: String,
    /// Fingerprint of the record the determination was derived from
    pub record_fingerprint: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrips_through_str() {
        for status in [
            ReportStatus::Draft,
            ReportStatus::Exempt,
            ReportStatus::DeterminationComplete,
        ] {
            assert_eq!(status.as_str().parse::<ReportStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ReportStatus::DeterminationComplete).unwrap();
        assert_eq!(json, "\"determination_complete\"");
    }

    #[test]
    fn test_only_draft_is_not_final() {
        assert!(!ReportStatus::Draft.is_final());
        assert!(ReportStatus::Exempt.is_final());
        assert!(ReportStatus::DeterminationComplete.is_final());
    }

    #[test]
    fn test_verdict_status_mapping() {
        assert_eq!(ReportStatus::for_verdict(true), ReportStatus::DeterminationComplete);
        assert_eq!(ReportStatus::for_verdict(false), ReportStatus::Exempt);
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("filed".parse::<ReportStatus>().is_err());
    }
}
