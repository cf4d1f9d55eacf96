//! HTTP handlers for the determination API

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use reportability_engine::{
    catalog, finalize, DeterminationError, ExemptionCategory, Finalization, TransactionRecord,
};
use shared_types::audit::{AuditAction, AuditChain};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::*;
use crate::state::AppState;
use crate::store;

/// Actor recorded for client-originated changes
const CLIENT_ACTOR: &str = "client";
/// Actor recorded for server-derived determinations
const ENGINE_ACTOR: &str = "determination-engine";

/// Attempts before a write that keeps losing version races gives up
const MAX_ATTEMPTS: usize = 3;

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Exemption rule table, in interview order
pub async fn list_exemptions() -> Json<Vec<ExemptionCategory>> {
    Json(catalog())
}

/// Create a new report draft
pub async fn create_report(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateReportRequest>,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let id = Uuid::new_v4().to_string();
    let now = state.clock.now();
    let fingerprint = req.record.fingerprint();

    let mut audit = AuditChain::new(&id);
    audit.append(AuditAction::ReportCreated, CLIENT_ACTOR, &fingerprint, None, now);
    store::insert(&state.db, &id, &req.record, &audit, now).await?;

    tracing::info!("Created report: {}", id);

    let report = store::fetch(&state.db, &id).await?;
    Ok((StatusCode::CREATED, Json(report.into())))
}

/// Get report by ID, with the interview steps and a verdict preview
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = store::fetch(&state.db, &id).await?;
    Ok(Json(report.into()))
}

/// Save the transaction record (autosave target)
///
/// Saving the identical record is a no-op in every status. A final report
/// refuses any other record.
pub async fn save_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(record): Json<TransactionRecord>,
) -> Result<Json<ReportResponse>, ApiError> {
    let fingerprint = record.fingerprint();

    for _ in 0..MAX_ATTEMPTS {
        let report = store::fetch(&state.db, &id).await?;
        if report.record.fingerprint() == fingerprint {
            return Ok(Json(report.into()));
        }
        if report.status.is_final() {
            tracing::warn!(report_id = %id, status = %report.status, "rejected edit of final report");
            return Err(DeterminationError::AlreadyDetermined {
                status: report.status,
            }
            .into());
        }

        let now = state.clock.now();
        let mut audit = report.audit.clone();
        audit.append(AuditAction::RecordSaved, CLIENT_ACTOR, &fingerprint, None, now);
        if store::update_record(&state.db, &report, &record, &audit, now).await? {
            tracing::debug!(report_id = %id, "saved record");
            let report = store::fetch(&state.db, &id).await?;
            return Ok(Json(report.into()));
        }
    }

    Err(ApiError::ConcurrentUpdate(id))
}

/// Determine reportability from the stored record and finalize the report
///
/// The verdict is always derived here from the stored record. Exactly one
/// status transition and one recorded determination happen per report;
/// repeating the call returns the stored outcome.
pub async fn determine(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DetermineResponse>, ApiError> {
    for _ in 0..MAX_ATTEMPTS {
        let report = store::fetch(&state.db, &id).await?;
        let now = state.clock.now();
        let fingerprint = report.record.fingerprint();

        match finalize(&report.record, report.status, report.outcome.as_ref()) {
            Ok(Finalization::AlreadyFinal(outcome)) => {
                tracing::debug!(report_id = %id, "determination already recorded");
                return Ok(Json(DetermineResponse::from(&outcome)));
            }
            Ok(Finalization::Commit(outcome)) => {
                let mut audit = report.audit.clone();
                audit.append(
                    AuditAction::DeterminationRecorded {
                        status: outcome.status,
                        reason_code: outcome.reason_code.clone(),
                    },
                    ENGINE_ACTOR,
                    &fingerprint,
                    Some(outcome.reason_text.clone()),
                    now,
                );
                if store::commit_determination(&state.db, &report, &outcome, &audit, now).await? {
                    tracing::info!(
                        "Report {} determined: {} ({})",
                        id,
                        outcome.status,
                        outcome.reason_code
                    );
                    return Ok(Json(DetermineResponse::from(&outcome)));
                }
            }
            Err(err @ DeterminationError::Incomplete { pending_step }) => {
                tracing::warn!(report_id = %id, %pending_step, "determination incomplete");
                let mut audit = report.audit.clone();
                audit.append(
                    AuditAction::DeterminationRejected {
                        reason: format!("incomplete at step '{}'", pending_step),
                    },
                    ENGINE_ACTOR,
                    &fingerprint,
                    None,
                    now,
                );
                // Losing this race only loses the rejection note.
                store::update_audit(&state.db, &report, &audit, now).await?;
                return Err(err.into());
            }
            Err(err) => {
                tracing::warn!(report_id = %id, "{}", err);
                return Err(err.into());
            }
        }
    }

    Err(ApiError::ConcurrentUpdate(id))
}

/// Get the audit chain of a report
pub async fn get_audit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AuditResponse>, ApiError> {
    let report = store::fetch(&state.db, &id).await?;
    Ok(Json(report.audit.into()))
}
