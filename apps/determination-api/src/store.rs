//! SQL access for report rows
//!
//! Every update is conditioned on the row version it was computed from and
//! reports whether it applied. A `false` return means another request won
//! the race; callers reload and decide again.

use chrono::{DateTime, Utc};
use reportability_engine::TransactionRecord;
use shared_types::audit::AuditChain;
use shared_types::{DeterminationOutcome, ReportStatus};
use sqlx::sqlite::SqlitePool;

use crate::error::ApiError;
use crate::models::{DbReport, Report};

fn record_json(id: &str, record: &TransactionRecord) -> Result<String, ApiError> {
    serde_json::to_string(record).map_err(|e| ApiError::corrupt(id, e))
}

pub async fn insert(
    db: &SqlitePool,
    id: &str,
    record: &TransactionRecord,
    audit: &AuditChain,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO reports (id, record_json, status, audit_json, version, created_at, updated_at)
        VALUES (?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(id)
    .bind(record_json(id, record)?)
    .bind(ReportStatus::Draft.as_str())
    .bind(audit.to_json()?)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(db)
    .await?;
    Ok(())
}

pub async fn fetch(db: &SqlitePool, id: &str) -> Result<Report, ApiError> {
    let row: Option<DbReport> = sqlx::query_as(
        r#"
        SELECT id, record_json, status, is_reportable, reason_code, reason_text,
               record_fingerprint, audit_json, version, created_at, updated_at
        FROM reports
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;

    row.ok_or_else(|| ApiError::ReportNotFound(id.to_string()))?
        .try_into()
}

/// Replace the record of a draft
pub async fn update_record(
    db: &SqlitePool,
    report: &Report,
    record: &TransactionRecord,
    audit: &AuditChain,
    now: DateTime<Utc>,
) -> Result<bool, ApiError> {
    let result = sqlx::query(
        r#"
        UPDATE reports
        SET record_json = ?, audit_json = ?, version = version + 1, updated_at = ?
        WHERE id = ? AND version = ? AND status = 'draft'
        "#,
    )
    .bind(record_json(&report.id, record)?)
    .bind(audit.to_json()?)
    .bind(now.to_rfc3339())
    .bind(&report.id)
    .bind(report.version)
    .execute(db)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Move a draft to its final status
pub async fn commit_determination(
    db: &SqlitePool,
    report: &Report,
    outcome: &DeterminationOutcome,
    audit: &AuditChain,
    now: DateTime<Utc>,
) -> Result<bool, ApiError> {
    let result = sqlx::query(
        r#"
        UPDATE reports
        SET status = ?, is_reportable = ?, reason_code = ?, reason_text = ?,
            record_fingerprint = ?, audit_json = ?, version = version + 1, updated_at = ?
        WHERE id = ? AND version = ? AND status = 'draft'
        "#,
    )
    .bind(outcome.status.as_str())
    .bind(outcome.is_reportable)
    .bind(&outcome.reason_code)
    .bind(&outcome.reason_text)
    .bind(&outcome.record_fingerprint)
    .bind(audit.to_json()?)
    .bind(now.to_rfc3339())
    .bind(&report.id)
    .bind(report.version)
    .execute(db)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn update_audit(
    db: &SqlitePool,
    report: &Report,
    audit: &AuditChain,
    now: DateTime<Utc>,
) -> Result<bool, ApiError> {
    let result = sqlx::query(
        r#"
        UPDATE reports
        SET audit_json = ?, version = version + 1, updated_at = ?
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(audit.to_json()?)
    .bind(now.to_rfc3339())
    .bind(&report.id)
    .bind(report.version)
    .execute(db)
    .await?;
    Ok(result.rows_affected() == 1)
}
