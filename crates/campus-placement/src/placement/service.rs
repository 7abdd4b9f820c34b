use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::domain::{
    DriveId, DriveStatus, EntryStatus, NewDrive, NewRound, PlacementDrive, PlacementRound,
    RoundId, StudentId, StudentRoundProgress,
};
use super::drives::{self, DriveDetail};
use super::error::PlacementError;
use super::processor::{self, Enrollment, RoundCompletion, SelectionUpdate};
use super::query::{self, StudentRoundSummary};
use super::report::{self, DriveReport};
use super::rounds;
use super::store::{CascadeRemoval, PlacementRepository};
use crate::config::PlacementConfig;

/// Facade over the registries, processor, and read models. Every mutation runs in one
/// repository transaction.
pub struct PlacementService<R> {
    repository: Arc<R>,
    config: PlacementConfig,
}

impl<R> PlacementService<R>
where
    R: PlacementRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: PlacementConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> PlacementConfig {
        self.config
    }

    pub fn create_drive(&self, request: NewDrive) -> Result<PlacementDrive, PlacementError> {
        let drive = self
            .repository
            .transaction(|tables| drives::create_drive(tables, request, Utc::now()))
            .inspect_err(|err| warn!(error = %err, "drive creation rejected"))?;
        info!(drive_id = %drive.id, total_rounds = drive.total_rounds, "drive created");
        Ok(drive)
    }

    pub fn drive_detail(&self, drive_id: &DriveId) -> Result<DriveDetail, PlacementError> {
        self.repository
            .read(|tables| drives::drive_detail(tables, drive_id))?
    }

    pub fn list_drives(&self) -> Result<Vec<PlacementDrive>, PlacementError> {
        Ok(self.repository.read(drives::list_drives)?)
    }

    pub fn delete_drive(&self, drive_id: &DriveId) -> Result<CascadeRemoval, PlacementError> {
        let removal = self
            .repository
            .transaction(|tables| drives::delete_drive(tables, drive_id))
            .inspect_err(|err| warn!(%drive_id, error = %err, "drive deletion rejected"))?;
        info!(
            %drive_id,
            rounds_removed = removal.rounds_removed,
            progress_removed = removal.progress_removed,
            "drive deleted"
        );
        Ok(removal)
    }

    pub fn update_drive_status(
        &self,
        drive_id: &DriveId,
        status: DriveStatus,
    ) -> Result<PlacementDrive, PlacementError> {
        let drive = self
            .repository
            .transaction(|tables| drives::update_status(tables, drive_id, status))
            .inspect_err(|err| warn!(%drive_id, error = %err, "drive status change rejected"))?;
        info!(%drive_id, status = drive.status.label(), "drive status updated");
        Ok(drive)
    }

    pub fn create_round(
        &self,
        drive_id: &DriveId,
        request: NewRound,
    ) -> Result<PlacementRound, PlacementError> {
        let round = self
            .repository
            .transaction(|tables| rounds::create_round(tables, drive_id, request))
            .inspect_err(|err| warn!(%drive_id, error = %err, "round creation rejected"))?;
        info!(
            %drive_id,
            round_id = %round.id,
            round_number = round.round_number,
            round_type = round.round_type.label(),
            "round created"
        );
        Ok(round)
    }

    pub fn list_rounds(&self, drive_id: &DriveId) -> Result<Vec<PlacementRound>, PlacementError> {
        self.repository
            .read(|tables| rounds::list_rounds(tables, drive_id))?
    }

    pub fn next_round_number(&self, drive_id: &DriveId) -> Result<u32, PlacementError> {
        self.repository
            .read(|tables| rounds::next_round_number(tables, drive_id))?
    }

    pub fn start_round(&self, round_id: &RoundId) -> Result<PlacementRound, PlacementError> {
        let round = self
            .repository
            .transaction(|tables| rounds::start_round(tables, round_id, Utc::now()))
            .inspect_err(|err| warn!(%round_id, error = %err, "round start rejected"))?;
        info!(%round_id, round_number = round.round_number, "round started");
        Ok(round)
    }

    pub fn cancel_round(&self, round_id: &RoundId) -> Result<PlacementRound, PlacementError> {
        let round = self
            .repository
            .transaction(|tables| rounds::cancel_round(tables, round_id, Utc::now()))
            .inspect_err(|err| warn!(%round_id, error = %err, "round cancellation rejected"))?;
        info!(%round_id, round_number = round.round_number, "round cancelled");
        Ok(round)
    }

    pub fn enroll_students(
        &self,
        drive_id: &DriveId,
        student_ids: Vec<StudentId>,
    ) -> Result<Enrollment, PlacementError> {
        let selection = self.selection(student_ids)?;
        let enrollment = self
            .repository
            .transaction(|tables| processor::enroll_students(tables, drive_id, &selection))
            .inspect_err(|err| warn!(%drive_id, error = %err, "enrollment rejected"))?;
        info!(%drive_id, enrolled = enrollment.progress_ids.len(), "students enrolled");
        Ok(enrollment)
    }

    pub fn students_in_round(
        &self,
        drive_id: &DriveId,
        round_number: u32,
        status: Option<EntryStatus>,
    ) -> Result<Vec<StudentRoundSummary>, PlacementError> {
        Ok(self.repository.read(|tables| {
            let records = match status {
                Some(status) => {
                    query::students_in_round_with_status(tables, drive_id, round_number, status)
                }
                None => query::students_in_round(tables, drive_id, round_number),
            };
            records
                .into_iter()
                .filter_map(|record| StudentRoundSummary::of(record, round_number))
                .collect()
        })?)
    }

    pub fn qualifying_students(
        &self,
        round_id: &RoundId,
    ) -> Result<Vec<StudentRoundSummary>, PlacementError> {
        self.repository.read(|tables| {
            let round_number = rounds::require_round(tables, round_id)?.round_number;
            let summaries: Vec<StudentRoundSummary> = query::qualifying_students(tables, round_id)?
                .into_iter()
                .filter_map(|record| StudentRoundSummary::of(record, round_number))
                .collect();
            Ok::<_, PlacementError>(summaries)
        })?
    }

    pub fn shortlist_selected(
        &self,
        round_id: &RoundId,
        student_ids: Vec<StudentId>,
    ) -> Result<SelectionUpdate, PlacementError> {
        let selection = self.selection(student_ids)?;
        let update = self
            .repository
            .transaction(|tables| {
                processor::shortlist_selected(tables, round_id, &selection, Utc::now())
            })
            .inspect_err(|err| warn!(%round_id, error = %err, "shortlist rejected"))?;
        info!(%round_id, updated = update.updated, "students shortlisted");
        Ok(update)
    }

    pub fn reject_selected(
        &self,
        round_id: &RoundId,
        student_ids: Vec<StudentId>,
    ) -> Result<SelectionUpdate, PlacementError> {
        let selection = self.selection(student_ids)?;
        let update = self
            .repository
            .transaction(|tables| {
                processor::reject_selected(tables, round_id, &selection, Utc::now())
            })
            .inspect_err(|err| warn!(%round_id, error = %err, "partial rejection refused"))?;
        info!(%round_id, updated = update.updated, "students rejected");
        Ok(update)
    }

    pub fn complete_round(
        &self,
        round_id: &RoundId,
        shortlisted_student_ids: Vec<StudentId>,
    ) -> Result<RoundCompletion, PlacementError> {
        let shortlisted = self.bounded(shortlisted_student_ids)?;
        let completion = self
            .repository
            .transaction(|tables| {
                processor::complete_round(tables, round_id, &shortlisted, Utc::now())
            })
            .inspect_err(|err| warn!(%round_id, error = %err, "round completion rejected"))?;
        info!(
            %round_id,
            round_number = completion.round_number,
            shortlisted = completion.shortlisted_count,
            rejected = completion.rejected_count,
            final_round = completion.final_round,
            "round completed"
        );
        Ok(completion)
    }

    pub fn record_marks(
        &self,
        round_id: &RoundId,
        student_id: &StudentId,
        marks_obtained: f64,
    ) -> Result<StudentRoundProgress, PlacementError> {
        let record = self
            .repository
            .transaction(|tables| {
                processor::record_marks(tables, round_id, student_id, marks_obtained)
            })
            .inspect_err(|err| warn!(%round_id, %student_id, error = %err, "marks rejected"))?;
        info!(
            %round_id,
            %student_id,
            marks_obtained,
            average_percentage = record.average_percentage,
            "marks recorded"
        );
        Ok(record)
    }

    pub fn student_progress(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<StudentRoundProgress>, PlacementError> {
        Ok(self.repository.read(|tables| {
            query::student_progress(tables, student_id)
                .into_iter()
                .cloned()
                .collect()
        })?)
    }

    pub fn drive_report(&self, drive_id: &DriveId) -> Result<DriveReport, PlacementError> {
        self.repository
            .read(|tables| report::drive_report(tables, drive_id))?
    }

    /// Non-empty, bounded selection.
    fn selection(&self, student_ids: Vec<StudentId>) -> Result<BTreeSet<StudentId>, PlacementError> {
        let selection = self.bounded(student_ids)?;
        if selection.is_empty() {
            return Err(PlacementError::validation("no students selected"));
        }
        Ok(selection)
    }

    fn bounded(&self, student_ids: Vec<StudentId>) -> Result<BTreeSet<StudentId>, PlacementError> {
        let selection: BTreeSet<StudentId> = student_ids.into_iter().collect();
        if selection.len() > self.config.max_selection {
            return Err(PlacementError::validation(format!(
                "selection of {} students exceeds the limit of {}",
                selection.len(),
                self.config.max_selection
            )));
        }
        Ok(selection)
    }
}
