//! Interactive interview session for a single report draft
//!
//! Wraps the pure [`reportability_engine::Wizard`] with the one
//! asynchronous concern of the interview: persisting answers. Every answer
//! schedules a debounced autosave; reaching the result step issues an
//! explicit save that cancels any pending autosave and always lands last.

pub mod autosave;
pub mod error;
pub mod portal;
pub mod session;

pub use autosave::{AutosaveConfig, Autosaver, ReportWriter};
pub use error::{SaveError, SessionError};
pub use portal::PartyStatusFeed;
pub use session::ReportSession;
