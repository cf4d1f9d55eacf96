//! Hash-linked audit trail of report events
//!
//! Each event is sealed with a SHA-256 over its own fields and the seal of
//! its predecessor. Editing any event, including the newest one, breaks
//! verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::ReportStatus;

/// Separates hashed fields so adjacent values cannot run together
const FIELD_SEPARATOR: &[u8] = b"\x1f";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    ReportCreated,
    RecordSaved,
    DeterminationRecorded {
        status: ReportStatus,
        reason_code: String,
    },
    DeterminationRejected {
        reason: String,
    },
}

impl AuditAction {
    /// Stable text form used for sealing
    fn canonical(&self) -> String {
        match self {
            AuditAction::ReportCreated => "report_created".to_string(),
            AuditAction::RecordSaved => "record_saved".to_string(),
            AuditAction::DeterminationRecorded {
                status,
                reason_code,
            } => format!("determination_recorded:{}:{}", status, reason_code),
            AuditAction::DeterminationRejected { reason } => {
                format!("determination_rejected:{}", reason)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub actor: String,
    /// Fingerprint of the transaction record at the time of the event
    pub record_fingerprint: String,
    pub previous_hash: Option<String>,
    pub details: Option<String>,
    pub hash: String,
}

impl AuditEvent {
    fn seal(
        action: AuditAction,
        actor: &str,
        record_fingerprint: &str,
        previous_hash: Option<String>,
        details: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        let mut event = Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: at,
            action,
            actor: actor.to_string(),
            record_fingerprint: record_fingerprint.to_string(),
            previous_hash,
            details,
            hash: String::new(),
        };
        event.hash = event.compute_hash();
        event
    }

    /// Seal over every field except `hash` itself
    pub fn compute_hash(&self) -> String {
        let timestamp = self.timestamp.to_rfc3339();
        let action = self.action.canonical();
        let fields: [&[u8]; 7] = [
            self.event_id.as_bytes(),
            timestamp.as_bytes(),
            action.as_bytes(),
            self.actor.as_bytes(),
            self.record_fingerprint.as_bytes(),
            self.previous_hash.as_deref().unwrap_or("").as_bytes(),
            self.details.as_deref().unwrap_or("").as_bytes(),
        ];

        let mut hasher = Sha256::new();
        for field in fields {
            hasher.update(field);
            hasher.update(FIELD_SEPARATOR);
        }
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Event {index} was modified after it was sealed")]
    SealMismatch { index: usize },

    #[error("Chain broken at event {index}: expected prev {expected:?}, got {actual:?}")]
    BrokenLink {
        index: usize,
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("Audit chain serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditChain {
    pub report_id: String,
    pub events: Vec<AuditEvent>,
}

impl AuditChain {
    pub fn new(report_id: &str) -> Self {
        Self {
            report_id: report_id.to_string(),
            events: Vec::new(),
        }
    }

    pub fn append(
        &mut self,
        action: AuditAction,
        actor: &str,
        record_fingerprint: &str,
        details: Option<String>,
        at: DateTime<Utc>,
    ) -> &AuditEvent {
        let previous_hash = self.events.last().map(|e| e.hash.clone());
        self.events.push(AuditEvent::seal(
            action,
            actor,
            record_fingerprint,
            previous_hash,
            details,
            at,
        ));
        &self.events[self.events.len() - 1]
    }

    pub fn determination_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.action, AuditAction::DeterminationRecorded { .. }))
            .count()
    }

    pub fn verify(&self) -> Result<(), AuditError> {
        let mut expected_prev: Option<&str> = None;

        for (index, event) in self.events.iter().enumerate() {
            if event.previous_hash.as_deref() != expected_prev {
                return Err(AuditError::BrokenLink {
                    index,
                    expected: expected_prev.map(str::to_string),
                    actual: event.previous_hash.clone(),
                });
            }
            if event.compute_hash() != event.hash {
                return Err(AuditError::SealMismatch { index });
            }
            expected_prev = Some(event.hash.as_str());
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String, AuditError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AuditError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn recorded(reason_code: &str) -> AuditAction {
        AuditAction::DeterminationRecorded {
            status: ReportStatus::Exempt,
            reason_code: reason_code.to_string(),
        }
    }

    #[test]
    fn test_report_lifecycle_chain() {
        let mut chain = AuditChain::new("report-123");
        chain.append(AuditAction::ReportCreated, "client", "fp1", None, at());
        chain.append(AuditAction::RecordSaved, "client", "fp2", None, at());
        let last = chain.append(
            recorded("1031-exchange"),
            "determination-engine",
            "fp2",
            Some("Exempt transfer".to_string()),
            at(),
        )
        .clone();
        assert_eq!(last.previous_hash, Some(chain.events[1].hash.clone()));

        assert!(chain.verify().is_ok());
        assert_eq!(chain.determination_count(), 1);
        assert_eq!(chain.events[0].previous_hash, None);
    }

    #[test]
    fn test_editing_newest_event_is_detected() {
        let mut chain = AuditChain::new("report-123");
        chain.append(AuditAction::ReportCreated, "client", "fp1", None, at());
        chain.append(recorded("individual-buyer"), "determination-engine", "fp1", None, at());

        chain.events[1].action = recorded("reportable");
        assert!(matches!(
            chain.verify(),
            Err(AuditError::SealMismatch { index: 1 })
        ));
    }

    #[test]
    fn test_removing_an_event_breaks_the_link() {
        let mut chain = AuditChain::new("report-123");
        chain.append(AuditAction::ReportCreated, "client", "fp1", None, at());
        chain.append(AuditAction::RecordSaved, "client", "fp2", None, at());
        chain.append(AuditAction::RecordSaved, "client", "fp3", None, at());

        chain.events.remove(1);
        assert!(matches!(
            chain.verify(),
            Err(AuditError::BrokenLink { index: 1, .. })
        ));
    }

    #[test]
    fn test_field_boundaries_are_sealed() {
        let mut a = AuditChain::new("r");
        a.append(AuditAction::RecordSaved, "ab", "c", None, at());
        let mut b = AuditChain::new("r");
        b.append(AuditAction::RecordSaved, "a", "bc", None, at());
        b.events[0].event_id = a.events[0].event_id.clone();

        assert_ne!(a.events[0].compute_hash(), b.events[0].compute_hash());
    }

    #[test]
    fn test_json_roundtrip_still_verifies() {
        let mut chain = AuditChain::new("report-123");
        chain.append(
            AuditAction::DeterminationRejected {
                reason: "incomplete at step 'financing'".to_string(),
            },
            "determination-engine",
            "fp1",
            None,
            at(),
        );

        let restored = AuditChain::from_json(&chain.to_json().unwrap()).unwrap();
        assert_eq!(restored, chain);
        assert!(restored.verify().is_ok());
    }
}
