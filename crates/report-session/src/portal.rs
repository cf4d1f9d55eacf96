//! Party/portal submission status, read-only

use async_trait::async_trait;

/// Whether every invited party has submitted their portal information
///
/// Only gates leaving the interview for filing. It never feeds the
/// waterfall: the verdict depends on the transaction record alone.
#[async_trait]
pub trait PartyStatusFeed: Send + Sync {
    async fn all_parties_submitted(&self, report_id: &str) -> bool;
}
