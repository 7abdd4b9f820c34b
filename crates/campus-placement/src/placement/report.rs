use serde::Serialize;

use super::domain::{
    DriveId, DriveStatus, EntryStatus, OverallStatus, RoundId, RoundProgressEntry, RoundStatus,
    StudentRoundProgress,
};
use super::error::PlacementError;
use super::progress::round_two_places;
use super::query::students_in_round;
use super::store::PlacementTables;

/// Mean `percentage` over evaluated (non-pending) entries, 0 when nothing was evaluated yet.
pub fn average_percentage(entries: &[RoundProgressEntry]) -> f64 {
    let evaluated: Vec<f64> = entries
        .iter()
        .filter(|entry| entry.status != EntryStatus::Pending)
        .filter_map(|entry| entry.percentage)
        .collect();

    if evaluated.is_empty() {
        return 0.0;
    }
    round_two_places(evaluated.iter().sum::<f64>() / evaluated.len() as f64)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveStatusCounts {
    pub total: usize,
    pub active: usize,
    pub placed: usize,
    pub rejected: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundCounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_id: Option<RoundId>,
    pub round_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RoundStatus>,
    pub enrolled: usize,
    pub shortlisted: usize,
    pub rejected: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveReport {
    pub drive_id: DriveId,
    pub title: String,
    pub status: DriveStatus,
    pub total_rounds: u32,
    pub counts: DriveStatusCounts,
    pub rounds: Vec<RoundCounts>,
    /// Mean of the students' average percentages, over students with at least one evaluation.
    pub average_percentage: f64,
}

pub fn drive_counts(tables: &PlacementTables, drive_id: &DriveId) -> DriveStatusCounts {
    tally_overall(tables.progress_for_drive(drive_id))
}

fn tally_overall<'a>(records: impl IntoIterator<Item = &'a StudentRoundProgress>) -> DriveStatusCounts {
    records
        .into_iter()
        .fold(DriveStatusCounts::default(), |mut counts, record| {
            counts.total += 1;
            match record.overall_status {
                OverallStatus::Active => counts.active += 1,
                OverallStatus::Placed => counts.placed += 1,
                OverallStatus::Rejected => counts.rejected += 1,
            }
            counts
        })
}

/// Population of a round and the outcome split inside it.
pub fn round_counts(tables: &PlacementTables, drive_id: &DriveId, round_number: u32) -> RoundCounts {
    let round = tables.round_by_number(drive_id, round_number);
    let mut counts = RoundCounts {
        round_id: round.map(|round| round.id.clone()),
        round_number,
        round_name: round.map(|round| round.round_name.clone()),
        status: round.map(|round| round.status),
        enrolled: 0,
        shortlisted: 0,
        rejected: 0,
        pending: 0,
    };

    for record in students_in_round(tables, drive_id, round_number) {
        let Some(entry) = record.entry(round_number) else {
            continue;
        };
        counts.enrolled += 1;
        match entry.status {
            EntryStatus::Pending => counts.pending += 1,
            EntryStatus::Shortlisted => counts.shortlisted += 1,
            EntryStatus::Rejected => counts.rejected += 1,
        }
    }

    counts
}

pub fn drive_report(tables: &PlacementTables, drive_id: &DriveId) -> Result<DriveReport, PlacementError> {
    let drive = tables
        .drive(drive_id)
        .ok_or_else(|| PlacementError::not_found("drive", drive_id))?;

    let records = tables.progress_for_drive(drive_id);
    let evaluated: Vec<f64> = records
        .iter()
        .filter(|record| {
            record
                .round_progress
                .iter()
                .any(|entry| entry.status != EntryStatus::Pending && entry.percentage.is_some())
        })
        .map(|record| record.average_percentage)
        .collect();
    let average = if evaluated.is_empty() {
        0.0
    } else {
        round_two_places(evaluated.iter().sum::<f64>() / evaluated.len() as f64)
    };

    let rounds = tables
        .rounds_for_drive(drive_id)
        .into_iter()
        .map(|round| round_counts(tables, drive_id, round.round_number))
        .collect();

    Ok(DriveReport {
        drive_id: drive.id.clone(),
        title: drive.title.clone(),
        status: drive.status,
        total_rounds: drive.total_rounds,
        counts: drive_counts(tables, drive_id),
        rounds,
        average_percentage: average,
    })
}
