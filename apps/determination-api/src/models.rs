//! Data models for the determination API

use chrono::{DateTime, Utc};
use reportability_engine::{
    evaluate, step_plan, visible_steps, PlannedStep, StepId, TransactionRecord, Verdict,
};
use serde::{Deserialize, Serialize};
use shared_types::audit::{AuditChain, AuditEvent};
use shared_types::{DeterminationOutcome, ReportStatus};
use sqlx::FromRow;

use crate::error::ApiError;

/// Report row as stored in the database
#[derive(Debug, Clone, FromRow)]
pub struct DbReport {
    pub id: String,
    pub record_json: String,
    pub status: String,
    pub is_reportable: Option<bool>,
    pub reason_code: Option<String>,
    pub reason_text: Option<String>,
    pub record_fingerprint: Option<String>,
    pub audit_json: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored report with its JSON columns parsed
#[derive(Debug, Clone)]
pub struct Report {
    pub id: String,
    pub record: TransactionRecord,
    pub status: ReportStatus,
    pub outcome: Option<DeterminationOutcome>,
    pub audit: AuditChain,
    /// Optimistic concurrency token, bumped by every write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbReport> for Report {
    type Error = ApiError;

    fn try_from(row: DbReport) -> Result<Self, Self::Error> {
        let record: TransactionRecord =
            serde_json::from_str(&row.record_json).map_err(|e| ApiError::corrupt(&row.id, e))?;
        let status: ReportStatus = row.status.parse().map_err(|e| ApiError::corrupt(&row.id, e))?;
        let audit = AuditChain::from_json(&row.audit_json)?;

        let outcome = if status.is_final() {
            match (row.is_reportable, row.reason_code, row.reason_text, row.record_fingerprint) {
                (Some(is_reportable), Some(reason_code), Some(reason_text), Some(fingerprint)) => {
                    Some(DeterminationOutcome {
                        status,
                        is_reportable,
                        reason_code,
                        reason_text,
                        record_fingerprint: fingerprint,
                    })
                }
                _ => return Err(ApiError::corrupt(&row.id, "final report without an outcome")),
            }
        } else {
            None
        };

        Ok(Report {
            id: row.id,
            record,
            status,
            outcome,
            audit,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Request to create a new report draft
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateReportRequest {
    #[serde(default)]
    pub record: TransactionRecord,
}

/// Report response for API
#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub id: String,
    pub status: ReportStatus,
    pub record: TransactionRecord,
    /// Visible interview steps for the current answers
    pub steps: Vec<StepId>,
    pub plan: Vec<PlannedStep>,
    /// Preview; only `determination` is authoritative
    pub verdict: Option<Verdict>,
    pub determination: Option<DeterminationOutcome>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            steps: visible_steps(&report.record),
            plan: step_plan(&report.record),
            verdict: evaluate(&report.record),
            id: report.id,
            status: report.status,
            record: report.record,
            determination: report.outcome,
            created_at: report.created_at,
            updated_at: report.updated_at,
        }
    }
}

/// Response from the determination trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetermineResponse {
    pub status: ReportStatus,
    pub is_reportable: bool,
    /// Reason code when exempt, `null` when a filing is required
    pub exemption_reason: Option<String>,
    pub reason_code: String,
    pub reason_text: String,
}

impl From<&DeterminationOutcome> for DetermineResponse {
    fn from(outcome: &DeterminationOutcome) -> Self {
        Self {
            status: outcome.status,
            is_reportable: outcome.is_reportable,
            exemption_reason: (!outcome.is_reportable).then(|| outcome.reason_code.clone()),
            reason_code: outcome.reason_code.clone(),
            reason_text: outcome.reason_text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditResponse {
    pub report_id: String,
    pub events: Vec<AuditEvent>,
    pub determinations: usize,
    pub verified: bool,
}

impl From<AuditChain> for AuditResponse {
    fn from(chain: AuditChain) -> Self {
        Self {
            determinations: chain.determination_count(),
            verified: chain.verify().is_ok(),
            report_id: chain.report_id,
            events: chain.events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str) -> DbReport {
        let now = Utc::now();
        DbReport {
            id: "r1".to_string(),
            record_json: "{}".to_string(),
            status: status.to_string(),
            is_reportable: None,
            reason_code: None,
            reason_text: None,
            record_fingerprint: None,
            audit_json: AuditChain::new("r1").to_json().unwrap(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_draft_row_parses_without_outcome() {
        let report = Report::try_from(row("draft")).unwrap();
        assert_eq!(report.status, ReportStatus::Draft);
        assert!(report.outcome.is_none());
        assert_eq!(report.record, TransactionRecord::new());
    }

    #[test]
    fn test_final_row_without_outcome_is_corrupt() {
        assert!(matches!(
            Report::try_from(row("exempt")),
            Err(ApiError::CorruptReport { .. })
        ));
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        assert!(matches!(
            Report::try_from(row("archived")),
            Err(ApiError::CorruptReport { .. })
        ));
    }

    #[test]
    fn test_exemption_reason_only_when_exempt() {
        let mut outcome = DeterminationOutcome {
            status: ReportStatus::Exempt,
            is_reportable: false,
            reason_code: "individual-buyer".to_string(),
            reason_text: "Buyer is an individual".to_string(),
            record_fingerprint: "abc".to_string(),
        };
        assert_eq!(
            DetermineResponse::from(&outcome).exemption_reason.as_deref(),
            Some("individual-buyer")
        );

        outcome.status = ReportStatus::DeterminationComplete;
        outcome.is_reportable = true;
        outcome.reason_code = "reportable".to_string();
        assert_eq!(DetermineResponse::from(&outcome).exemption_reason, None);
    }
}
