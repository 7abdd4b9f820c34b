//! Read side of the engine. Round membership is re-derived from the progression history on
//! every read instead of trusting stored entries alone.

use serde::Serialize;

use super::domain::{
    DriveId, EntryStatus, OverallStatus, ProgressId, RoundId, StudentId, StudentRoundProgress,
};
use super::error::PlacementError;
use super::store::PlacementTables;

/// Students currently in `round_number` of a drive. Past round 1 a stored entry only counts
/// when the student was shortlisted in the previous round.
pub fn students_in_round<'a>(
    tables: &'a PlacementTables,
    drive_id: &DriveId,
    round_number: u32,
) -> Vec<&'a StudentRoundProgress> {
    tables
        .progress_for_drive(drive_id)
        .into_iter()
        .filter(|record| record.has_reached(round_number))
        .collect()
}

/// Students in the round whose entry for it currently holds `status`.
pub fn students_in_round_with_status<'a>(
    tables: &'a PlacementTables,
    drive_id: &DriveId,
    round_number: u32,
    status: EntryStatus,
) -> Vec<&'a StudentRoundProgress> {
    students_in_round(tables, drive_id, round_number)
        .into_iter()
        .filter(|record| {
            record
                .entry(round_number)
                .is_some_and(|entry| entry.status == status)
        })
        .collect()
}

/// Students in the round whose recorded marks meet the round's passing mark. Without a passing
/// mark every student with recorded marks qualifies.
pub fn qualifying_students<'a>(
    tables: &'a PlacementTables,
    round_id: &RoundId,
) -> Result<Vec<&'a StudentRoundProgress>, PlacementError> {
    let round = tables
        .round(round_id)
        .ok_or_else(|| PlacementError::not_found("round", round_id))?;
    let passing = round.passing_marks.unwrap_or(f64::NEG_INFINITY);

    Ok(students_in_round(tables, &round.drive_id, round.round_number)
        .into_iter()
        .filter(|record| {
            record
                .entry(round.round_number)
                .and_then(|entry| entry.marks_obtained)
                .is_some_and(|marks| marks >= passing)
        })
        .collect())
}

/// Every drive the student is enrolled in.
pub fn student_progress<'a>(
    tables: &'a PlacementTables,
    student_id: &StudentId,
) -> Vec<&'a StudentRoundProgress> {
    tables.progress_for_student(student_id)
}

/// Row returned when listing a round's population.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRoundSummary {
    pub progress_id: ProgressId,
    pub student_id: StudentId,
    pub round_number: u32,
    pub round_status: EntryStatus,
    pub current_round: u32,
    pub overall_status: OverallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks_obtained: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    pub average_percentage: f64,
}

impl StudentRoundSummary {
    pub fn of(record: &StudentRoundProgress, round_number: u32) -> Option<Self> {
        let entry = record.entry(round_number)?;
        Some(Self {
            progress_id: record.id.clone(),
            student_id: record.student_id.clone(),
            round_number,
            round_status: entry.status,
            current_round: record.current_round,
            overall_status: record.overall_status,
            marks_obtained: entry.marks_obtained,
            percentage: entry.percentage,
            average_percentage: record.average_percentage,
        })
    }
}
