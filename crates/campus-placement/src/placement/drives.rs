use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    CompanyId, DriveId, DriveStatus, NewDrive, OverallStatus, PlacementDrive, PlacementRound,
    RoundStatus, StudentRoundProgress,
};
use super::error::PlacementError;
use super::store::{CascadeRemoval, PlacementTables};

/// Drive plus everything hanging off it, as shown on the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveDetail {
    pub drive: PlacementDrive,
    pub rounds: Vec<PlacementRound>,
    pub student_progress: Vec<StudentRoundProgress>,
}

pub fn create_drive(
    tables: &mut PlacementTables,
    request: NewDrive,
    now: DateTime<Utc>,
) -> Result<PlacementDrive, PlacementError> {
    let NewDrive {
        company,
        title,
        description,
        start_date,
        end_date,
        total_rounds,
        status,
    } = request;

    let mut missing = Vec::new();
    if company.trim().is_empty() {
        missing.push("company");
    }
    if title.trim().is_empty() {
        missing.push("title");
    }
    if description.trim().is_empty() {
        missing.push("description");
    }
    if !missing.is_empty() {
        return Err(PlacementError::validation(format!(
            "missing required fields: {}",
            missing.join(", ")
        )));
    }
    if total_rounds < 1 {
        return Err(PlacementError::validation(
            "totalRounds must be at least 1",
        ));
    }
    if end_date < start_date {
        return Err(PlacementError::validation(format!(
            "endDate {end_date} is before startDate {start_date}"
        )));
    }

    let status = match status.unwrap_or(DriveStatus::Draft) {
        initial @ (DriveStatus::Draft | DriveStatus::Active) => initial,
        other => {
            return Err(PlacementError::validation(format!(
                "a drive cannot be created as '{}'",
                other.label()
            )))
        }
    };

    let drive = PlacementDrive {
        id: tables.next_drive_id(),
        company: CompanyId(company.trim().to_string()),
        title: title.trim().to_string(),
        description: description.trim().to_string(),
        start_date,
        end_date,
        total_rounds,
        status,
        created_at: now,
    };
    tables.insert_drive(drive.clone())?;
    Ok(drive)
}

pub(crate) fn require_drive<'a>(
    tables: &'a PlacementTables,
    drive_id: &DriveId,
) -> Result<&'a PlacementDrive, PlacementError> {
    tables
        .drive(drive_id)
        .ok_or_else(|| PlacementError::not_found("drive", drive_id))
}

/// The drive, provided it still accepts round and progression actions.
pub(crate) fn require_open_drive<'a>(
    tables: &'a PlacementTables,
    drive_id: &DriveId,
) -> Result<&'a PlacementDrive, PlacementError> {
    let drive = require_drive(tables, drive_id)?;
    if drive.status.is_closed() {
        return Err(PlacementError::conflict(format!(
            "drive '{}' is {}",
            drive.id,
            drive.status.label()
        )));
    }
    Ok(drive)
}

pub fn drive_detail(tables: &PlacementTables, drive_id: &DriveId) -> Result<DriveDetail, PlacementError> {
    let drive = require_drive(tables, drive_id)?.clone();
    let rounds = tables
        .rounds_for_drive(drive_id)
        .into_iter()
        .cloned()
        .collect();
    let student_progress = tables
        .progress_for_drive(drive_id)
        .into_iter()
        .cloned()
        .collect();

    Ok(DriveDetail {
        drive,
        rounds,
        student_progress,
    })
}

pub fn list_drives(tables: &PlacementTables) -> Vec<PlacementDrive> {
    tables.drives().cloned().collect()
}

/// Irreversibly remove a drive, its rounds, and every progression record in it.
pub fn delete_drive(
    tables: &mut PlacementTables,
    drive_id: &DriveId,
) -> Result<CascadeRemoval, PlacementError> {
    tables
        .remove_drive(drive_id)
        .ok_or_else(|| PlacementError::not_found("drive", drive_id))
}

pub fn update_status(
    tables: &mut PlacementTables,
    drive_id: &DriveId,
    status: DriveStatus,
) -> Result<PlacementDrive, PlacementError> {
    if status == DriveStatus::Completed {
        ensure_settled(tables, drive_id)?;
    }

    let drive = tables
        .drive_mut(drive_id)
        .ok_or_else(|| PlacementError::not_found("drive", drive_id))?;

    let allowed = matches!(
        (drive.status, status),
        (DriveStatus::Draft, DriveStatus::Active)
            | (DriveStatus::Active, DriveStatus::Completed)
            | (DriveStatus::Draft | DriveStatus::Active, DriveStatus::Cancelled)
    );
    if !allowed {
        return Err(PlacementError::conflict(format!(
            "drive '{}' cannot move from {} to {}",
            drive.id,
            drive.status.label(),
            status.label()
        )));
    }

    drive.status = status;
    Ok(drive.clone())
}

/// A drive can only complete once no round is running and every student is placed or rejected.
fn ensure_settled(tables: &PlacementTables, drive_id: &DriveId) -> Result<(), PlacementError> {
    if let Some(round) = tables
        .rounds_for_drive(drive_id)
        .into_iter()
        .find(|round| round.status == RoundStatus::InProgress)
    {
        return Err(PlacementError::conflict(format!(
            "drive '{drive_id}' still has round {} in progress",
            round.round_number
        )));
    }

    let active = tables
        .progress_for_drive(drive_id)
        .into_iter()
        .filter(|record| record.overall_status == OverallStatus::Active)
        .count();
    if active > 0 {
        return Err(PlacementError::conflict(format!(
            "drive '{drive_id}' still has {active} active students"
        )));
    }
    Ok(())
}
