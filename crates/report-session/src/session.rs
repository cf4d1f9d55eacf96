//! One user's interview over one report draft

use reportability_engine::{
    Answer, NavigationState, RecordField, StepId, TransactionRecord, Verdict, Wizard,
};

use crate::autosave::{AutosaveConfig, Autosaver, ReportWriter};
use crate::error::SessionError;
use crate::portal::PartyStatusFeed;

pub struct ReportSession<W: ReportWriter> {
    report_id: String,
    wizard: Wizard,
    autosaver: Autosaver<W>,
}

impl<W: ReportWriter> ReportSession<W> {
    /// Open a session over a saved (possibly empty) record
    pub fn open(
        report_id: impl Into<String>,
        record: TransactionRecord,
        writer: W,
        config: AutosaveConfig,
    ) -> Self {
        let report_id = report_id.into();
        tracing::debug!(report_id = %report_id, "opening report session");
        Self {
            autosaver: Autosaver::new(report_id.clone(), writer, config),
            wizard: Wizard::resume(record),
            report_id,
        }
    }

    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    pub fn record(&self) -> &TransactionRecord {
        self.wizard.record()
    }

    pub fn state(&self) -> NavigationState {
        self.wizard.state()
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.wizard.verdict()
    }

    pub fn writer(&self) -> &W {
        self.autosaver.writer()
    }

    /// Apply an answer and persist the new record
    ///
    /// An answer that leaves the interview on the result step saves
    /// immediately. Changing an earlier answer can shorten the step list
    /// under the current position and land there without `advance`. Every
    /// other answer schedules an autosave.
    pub async fn answer(&mut self, answer: Answer) -> Result<Vec<RecordField>, SessionError> {
        let cleared = self.wizard.answer(answer)?;

        if self.wizard.is_finished() {
            self.autosaver.save_now(self.wizard.record()).await?;
        } else {
            self.autosaver.schedule(self.wizard.record().clone());
        }
        Ok(cleared)
    }

    /// Advance; arriving at the result step saves immediately
    pub async fn advance(&mut self) -> Result<StepId, SessionError> {
        let step = self.wizard.advance()?;
        if step == StepId::Result {
            self.autosaver.save_now(self.wizard.record()).await?;
        }
        Ok(step)
    }

    pub fn back(&mut self) -> Result<StepId, SessionError> {
        Ok(self.wizard.back()?)
    }

    pub fn go_to(&mut self, step: StepId) -> Result<(), SessionError> {
        Ok(self.wizard.go_to(step)?)
    }

    pub async fn save_now(&mut self) -> Result<(), SessionError> {
        self.autosaver.save_now(self.wizard.record()).await?;
        Ok(())
    }

    /// Whether the user may leave the interview for filing
    pub async fn may_proceed(&self, feed: &dyn PartyStatusFeed) -> bool {
        self.wizard.is_finished() && feed.all_parties_submitted(&self.report_id).await
    }
}
