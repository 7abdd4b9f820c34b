//! The only writer of round outcomes.
//!
//! Each function here mutates the tables it is handed and is meant to run inside one
//! repository transaction: an `Err` anywhere discards every write made so far.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    DriveId, ProgressId, RoundId, RoundStatus, StudentId, StudentRoundProgress,
};
use super::drives::require_open_drive;
use super::error::PlacementError;
use super::query::students_in_round;
use super::rounds::{require_round, transition};
use super::store::PlacementTables;

/// Result of closing a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundCompletion {
    pub round_id: RoundId,
    pub round_number: u32,
    pub final_round: bool,
    pub shortlisted_count: usize,
    pub rejected_count: usize,
}

/// Result of a partial shortlist/reject action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionUpdate {
    pub round_id: RoundId,
    /// Entries whose status actually changed.
    pub updated: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub drive_id: DriveId,
    pub progress_ids: Vec<ProgressId>,
}

/// Put students into round 1 of a drive.
pub fn enroll_students(
    tables: &mut PlacementTables,
    drive_id: &DriveId,
    student_ids: &BTreeSet<StudentId>,
) -> Result<Enrollment, PlacementError> {
    if student_ids.is_empty() {
        return Err(PlacementError::validation("no students selected for enrollment"));
    }

    require_open_drive(tables, drive_id)?;
    if let Some(first) = tables.round_by_number(drive_id, 1) {
        if first.status != RoundStatus::Scheduled && first.status != RoundStatus::InProgress {
            return Err(PlacementError::conflict(format!(
                "round 1 of drive '{}' is already {}",
                drive_id,
                first.status.label()
            )));
        }
    }

    let already: Vec<&str> = student_ids
        .iter()
        .filter(|student| tables.progress_for(drive_id, student).is_some())
        .map(StudentId::as_str)
        .collect();
    if !already.is_empty() {
        return Err(PlacementError::validation(format!(
            "already enrolled in drive '{drive_id}': {}",
            already.join(", ")
        )));
    }

    let mut progress_ids = Vec::with_capacity(student_ids.len());
    for student in student_ids {
        let id = tables.next_progress_id();
        tables.insert_progress(StudentRoundProgress::enrolled(
            id.clone(),
            student.clone(),
            drive_id.clone(),
        ))?;
        progress_ids.push(id);
    }

    Ok(Enrollment {
        drive_id: drive_id.clone(),
        progress_ids,
    })
}

/// Close an in-progress round: students named in `shortlisted` advance (or are placed in the
/// final round), everyone else in the round is rejected.
pub fn complete_round(
    tables: &mut PlacementTables,
    round_id: &RoundId,
    shortlisted: &BTreeSet<StudentId>,
    now: DateTime<Utc>,
) -> Result<RoundCompletion, PlacementError> {
    let round = require_round(tables, round_id)?;
    if round.status != RoundStatus::InProgress {
        return Err(PlacementError::conflict(format!(
            "round '{}' is {}; only an in_progress round can be completed",
            round.id,
            round.status.label()
        )));
    }
    let drive_id = round.drive_id.clone();
    let round_number = round.round_number;
    let total_rounds = require_open_drive(tables, &drive_id)?.total_rounds;

    let population: Vec<StudentId> = students_in_round(tables, &drive_id, round_number)
        .into_iter()
        .map(|record| record.student_id.clone())
        .collect();
    if population.is_empty() {
        return Err(PlacementError::validation(format!(
            "round {round_number} of drive '{drive_id}' has no students to process"
        )));
    }

    let members: BTreeSet<&StudentId> = population.iter().collect();
    let unknown: Vec<&str> = shortlisted
        .iter()
        .filter(|student| !members.contains(student))
        .map(StudentId::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(PlacementError::validation(format!(
            "students not in round {round_number}: {}",
            unknown.join(", ")
        )));
    }

    let mut completion = RoundCompletion {
        round_id: round_id.clone(),
        round_number,
        final_round: round_number >= total_rounds,
        shortlisted_count: 0,
        rejected_count: 0,
    };

    for student in &population {
        let record = progress_mut(tables, &drive_id, student)?;
        if shortlisted.contains(student) {
            record.advance(round_number, total_rounds, now)?;
            completion.shortlisted_count += 1;
        } else {
            record.reject(round_number, now)?;
            completion.rejected_count += 1;
        }
        audit(record, total_rounds)?;
    }

    transition(tables, round_id, RoundStatus::Completed, now)?;
    Ok(completion)
}

/// Mark students shortlisted in a running round without closing it.
pub fn shortlist_selected(
    tables: &mut PlacementTables,
    round_id: &RoundId,
    student_ids: &BTreeSet<StudentId>,
    now: DateTime<Utc>,
) -> Result<SelectionUpdate, PlacementError> {
    apply_selection(tables, round_id, student_ids, Selection::Shortlist, now)
}

/// Reject students in a running round without closing it. Rejection is terminal.
pub fn reject_selected(
    tables: &mut PlacementTables,
    round_id: &RoundId,
    student_ids: &BTreeSet<StudentId>,
    now: DateTime<Utc>,
) -> Result<SelectionUpdate, PlacementError> {
    apply_selection(tables, round_id, student_ids, Selection::Reject, now)
}

#[derive(Debug, Clone, Copy)]
enum Selection {
    Shortlist,
    Reject,
}

fn apply_selection(
    tables: &mut PlacementTables,
    round_id: &RoundId,
    student_ids: &BTreeSet<StudentId>,
    selection: Selection,
    now: DateTime<Utc>,
) -> Result<SelectionUpdate, PlacementError> {
    if student_ids.is_empty() {
        return Err(PlacementError::validation("no students selected"));
    }

    let round = require_round(tables, round_id)?;
    if round.status != RoundStatus::InProgress {
        return Err(PlacementError::conflict(format!(
            "round '{}' is {}; students can only be marked while it is in_progress",
            round.id,
            round.status.label()
        )));
    }
    let drive_id = round.drive_id.clone();
    let round_number = round.round_number;
    let total_rounds = require_open_drive(tables, &drive_id)?.total_rounds;

    let outsiders: Vec<&str> = student_ids
        .iter()
        .filter(|student| {
            !tables
                .progress_for(&drive_id, student)
                .is_some_and(|record| record.has_reached(round_number))
        })
        .map(StudentId::as_str)
        .collect();
    if !outsiders.is_empty() {
        return Err(PlacementError::validation(format!(
            "students not in round {round_number}: {}",
            outsiders.join(", ")
        )));
    }

    let mut updated = 0;
    for student in student_ids {
        let record = progress_mut(tables, &drive_id, student)?;
        let changed = match selection {
            Selection::Shortlist => record.mark_shortlisted(round_number, now)?,
            Selection::Reject => record.reject(round_number, now)?,
        };
        audit(record, total_rounds)?;
        if changed {
            updated += 1;
        }
    }

    Ok(SelectionUpdate {
        round_id: round_id.clone(),
        updated,
    })
}

/// Store a student's marks for a round and refresh their average.
pub fn record_marks(
    tables: &mut PlacementTables,
    round_id: &RoundId,
    student_id: &StudentId,
    marks_obtained: f64,
) -> Result<StudentRoundProgress, PlacementError> {
    let round = require_round(tables, round_id)?;
    if matches!(round.status, RoundStatus::Scheduled | RoundStatus::Cancelled) {
        return Err(PlacementError::conflict(format!(
            "round '{}' is {}; marks can only be recorded once it has started",
            round.id,
            round.status.label()
        )));
    }
    if !(marks_obtained.is_finite() && (0.0..=round.max_marks).contains(&marks_obtained)) {
        return Err(PlacementError::validation(format!(
            "marksObtained {marks_obtained} must lie within 0..={}",
            round.max_marks
        )));
    }
    let drive_id = round.drive_id.clone();
    let round_number = round.round_number;
    let max_marks = round.max_marks;
    require_open_drive(tables, &drive_id)?;

    let in_round = tables
        .progress_for(&drive_id, student_id)
        .is_some_and(|record| record.has_reached(round_number));
    if !in_round {
        return Err(PlacementError::not_found(
            "student in round",
            format!("{student_id}@{round_number}"),
        ));
    }

    let record = progress_mut(tables, &drive_id, student_id)?;
    record.record_marks(round_number, marks_obtained, max_marks)?;
    Ok(record.clone())
}

fn progress_mut<'a>(
    tables: &'a mut PlacementTables,
    drive_id: &DriveId,
    student_id: &StudentId,
) -> Result<&'a mut StudentRoundProgress, PlacementError> {
    tables
        .progress_for_mut(drive_id, student_id)
        .ok_or_else(|| PlacementError::not_found("progress record", student_id))
}

fn audit(record: &StudentRoundProgress, total_rounds: u32) -> Result<(), PlacementError> {
    match record.validate(total_rounds).into_iter().next() {
        Some(violation) => Err(PlacementError::conflict(format!(
            "student '{}': progression invariant violated: {violation}",
            record.student_id
        ))),
        None => Ok(()),
    }
}
