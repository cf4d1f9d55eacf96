//! Types shared between the engine, the session layer and the API

pub mod audit;
pub mod types;

pub use types::{DeterminationOutcome, ReportStatus, UnknownStatus};
