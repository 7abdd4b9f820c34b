use chrono::{DateTime, Utc};

use super::domain::{DriveId, NewRound, PlacementRound, RoundId, RoundStatus};
use super::drives::{require_drive, require_open_drive};
use super::error::PlacementError;
use super::store::PlacementTables;

pub fn create_round(
    tables: &mut PlacementTables,
    drive_id: &DriveId,
    request: NewRound,
) -> Result<PlacementRound, PlacementError> {
    require_drive(tables, drive_id)?;

    if request.round_number == 0 {
        return Err(PlacementError::validation("roundNumber must be positive"));
    }
    if request.round_name.trim().is_empty() {
        return Err(PlacementError::validation("missing required fields: roundName"));
    }
    if !(request.max_marks.is_finite() && request.max_marks > 0.0) {
        return Err(PlacementError::validation("maxMarks must be positive"));
    }
    if let Some(passing) = request.passing_marks {
        if !(0.0..=request.max_marks).contains(&passing) {
            return Err(PlacementError::validation(format!(
                "passingMarks {passing} must lie within 0..={}",
                request.max_marks
            )));
        }
    }
    if tables
        .round_by_number(drive_id, request.round_number)
        .is_some()
    {
        return Err(PlacementError::validation(format!(
            "drive '{drive_id}' already has a round {}",
            request.round_number
        )));
    }

    let round = PlacementRound {
        id: tables.next_round_id(),
        drive_id: drive_id.clone(),
        round_number: request.round_number,
        round_name: request.round_name.trim().to_string(),
        round_type: request.round_type,
        description: request.description,
        duration: request.duration,
        max_marks: request.max_marks,
        passing_marks: request.passing_marks,
        scheduled_date: request.scheduled_date,
        venue: request.venue,
        status: RoundStatus::Scheduled,
        started_at: None,
        completed_at: None,
    };
    tables.insert_round(round.clone())?;
    Ok(round)
}

/// The number the next round of the drive should take.
pub fn next_round_number(tables: &PlacementTables, drive_id: &DriveId) -> Result<u32, PlacementError> {
    require_drive(tables, drive_id)?;
    Ok(tables
        .rounds_for_drive(drive_id)
        .last()
        .map_or(1, |round| round.round_number + 1))
}

pub fn list_rounds(
    tables: &PlacementTables,
    drive_id: &DriveId,
) -> Result<Vec<PlacementRound>, PlacementError> {
    require_drive(tables, drive_id)?;
    Ok(tables
        .rounds_for_drive(drive_id)
        .into_iter()
        .cloned()
        .collect())
}

pub(crate) fn require_round<'a>(
    tables: &'a PlacementTables,
    round_id: &RoundId,
) -> Result<&'a PlacementRound, PlacementError> {
    tables
        .round(round_id)
        .ok_or_else(|| PlacementError::not_found("round", round_id))
}

/// Apply a lifecycle transition. Only scheduled → in_progress → completed and
/// scheduled → cancelled exist.
pub(crate) fn transition(
    tables: &mut PlacementTables,
    round_id: &RoundId,
    to: RoundStatus,
    now: DateTime<Utc>,
) -> Result<PlacementRound, PlacementError> {
    let round = tables
        .round_mut(round_id)
        .ok_or_else(|| PlacementError::not_found("round", round_id))?;

    let allowed = matches!(
        (round.status, to),
        (RoundStatus::Scheduled, RoundStatus::InProgress)
            | (RoundStatus::InProgress, RoundStatus::Completed)
            | (RoundStatus::Scheduled, RoundStatus::Cancelled)
    );
    if !allowed {
        return Err(PlacementError::conflict(format!(
            "round '{}' cannot move from {} to {}",
            round.id,
            round.status.label(),
            to.label()
        )));
    }

    round.status = to;
    match to {
        RoundStatus::InProgress => round.started_at = Some(now),
        RoundStatus::Completed => round.completed_at = Some(now),
        RoundStatus::Scheduled | RoundStatus::Cancelled => {}
    }
    Ok(round.clone())
}

pub fn start_round(
    tables: &mut PlacementTables,
    round_id: &RoundId,
    now: DateTime<Utc>,
) -> Result<PlacementRound, PlacementError> {
    let drive_id = require_round(tables, round_id)?.drive_id.clone();
    require_open_drive(tables, &drive_id)?;
    transition(tables, round_id, RoundStatus::InProgress, now)
}

/// Cancelling stays possible on a closed drive so leftover scheduled rounds can be retired.
pub fn cancel_round(
    tables: &mut PlacementTables,
    round_id: &RoundId,
    now: DateTime<Utc>,
) -> Result<PlacementRound, PlacementError> {
    transition(tables, round_id, RoundStatus::Cancelled, now)
}
