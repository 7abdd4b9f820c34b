//! Progression record transitions and the invariant audit.
//!
//! Every write to a `StudentRoundProgress` goes through the methods here so that the
//! round-by-round history stays contiguous and rejection stays terminal.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use super::domain::{
    DriveId, EntryStatus, FinalResult, OverallStatus, ProgressId, RoundProgressEntry, StudentId,
    StudentRoundProgress,
};
use super::report::average_percentage;

/// Rejected transition on a single progression record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    #[error("student '{student}' has no entry for round {round}")]
    MissingEntry { student: StudentId, round: u32 },
    #[error("student '{student}' already has an entry for round {round}")]
    DuplicateEntry { student: StudentId, round: u32 },
    #[error("student '{student}' was rejected in round {round}; rejection is terminal")]
    AlreadyRejected { student: StudentId, round: u32 },
    #[error("student '{student}' already advanced past round {round}")]
    AlreadyAdvanced { student: StudentId, round: u32 },
    #[error("student '{student}' already reached terminal status '{status}'")]
    Terminal {
        student: StudentId,
        status: &'static str,
    },
}

/// A broken progression invariant found by [`StudentRoundProgress::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("round {round} appears more than once")]
    DuplicateEntry { round: u32 },
    #[error("no entry for round 1")]
    MissingFirstRound,
    #[error("round {round} entry exists without a shortlisted round {previous} entry")]
    UnearnedEntry { round: u32, previous: u32 },
    #[error("rejected in round {round} but overall status is '{status}'")]
    RejectionNotTerminal { round: u32, status: &'static str },
    #[error("overall status is rejected but no round entry is rejected")]
    RejectedWithoutRejection,
    #[error("placed without a shortlisted entry for final round {final_round}")]
    PlacedWithoutFinalShortlist { final_round: u32 },
    #[error("final result does not match overall status '{status}'")]
    FinalResultMismatch { status: &'static str },
    #[error("current round is {found} but latest entry is round {expected}")]
    CurrentRoundMismatch { expected: u32, found: u32 },
}

impl StudentRoundProgress {
    /// Fresh record for a student entering round 1.
    pub fn enrolled(id: ProgressId, student_id: StudentId, drive_id: DriveId) -> Self {
        Self {
            id,
            student_id,
            drive_id,
            current_round: 1,
            overall_status: OverallStatus::Active,
            round_progress: vec![RoundProgressEntry::pending(1)],
            average_percentage: 0.0,
            final_result: None,
        }
    }

    pub fn entry(&self, round_number: u32) -> Option<&RoundProgressEntry> {
        self.round_progress
            .iter()
            .find(|entry| entry.round_number == round_number)
    }

    fn entry_mut(&mut self, round_number: u32) -> Result<&mut RoundProgressEntry, ProgressError> {
        let student = self.student_id.clone();
        self.round_progress
            .iter_mut()
            .find(|entry| entry.round_number == round_number)
            .ok_or(ProgressError::MissingEntry {
                student,
                round: round_number,
            })
    }

    /// Whether the student legitimately reached `round_number`: an entry for it exists and,
    /// past round 1, the previous round was shortlisted.
    pub fn has_reached(&self, round_number: u32) -> bool {
        if self.entry(round_number).is_none() {
            return false;
        }
        if round_number <= 1 {
            return true;
        }
        self.entry(round_number - 1)
            .is_some_and(|previous| previous.status == EntryStatus::Shortlisted)
    }

    fn latest_round(&self) -> Option<u32> {
        self.round_progress
            .iter()
            .map(|entry| entry.round_number)
            .max()
    }

    fn push_entry(&mut self, entry: RoundProgressEntry) -> Result<(), ProgressError> {
        if self.entry(entry.round_number).is_some() {
            return Err(ProgressError::DuplicateEntry {
                student: self.student_id.clone(),
                round: entry.round_number,
            });
        }
        self.round_progress.push(entry);
        self.round_progress.sort_by_key(|entry| entry.round_number);
        Ok(())
    }

    fn ensure_not_past(&self, round_number: u32) -> Result<(), ProgressError> {
        if self.latest_round().is_some_and(|latest| latest > round_number) {
            return Err(ProgressError::AlreadyAdvanced {
                student: self.student_id.clone(),
                round: round_number,
            });
        }
        Ok(())
    }

    /// Shortlist the student in `round_number` and move them on: a pending entry for the next
    /// round, or placement when `round_number` is the drive's final round.
    pub fn advance(
        &mut self,
        round_number: u32,
        total_rounds: u32,
        now: DateTime<Utc>,
    ) -> Result<(), ProgressError> {
        if self.overall_status == OverallStatus::Placed {
            return Err(ProgressError::Terminal {
                student: self.student_id.clone(),
                status: self.overall_status.label(),
            });
        }
        self.ensure_not_past(round_number)?;

        let student = self.student_id.clone();
        let entry = self.entry_mut(round_number)?;
        if entry.status == EntryStatus::Rejected {
            return Err(ProgressError::AlreadyRejected {
                student,
                round: round_number,
            });
        }
        entry.status = EntryStatus::Shortlisted;
        entry.evaluated_at = Some(now);

        if round_number >= total_rounds {
            self.overall_status = OverallStatus::Placed;
            self.final_result = Some(FinalResult::Selected);
        } else {
            self.push_entry(RoundProgressEntry::pending(round_number + 1))?;
            self.current_round = round_number + 1;
        }

        self.refresh_average();
        Ok(())
    }

    /// Mark the entry shortlisted without advancing. Returns whether anything changed.
    pub fn mark_shortlisted(
        &mut self,
        round_number: u32,
        now: DateTime<Utc>,
    ) -> Result<bool, ProgressError> {
        self.ensure_not_past(round_number)?;
        let student = self.student_id.clone();
        let entry = self.entry_mut(round_number)?;
        match entry.status {
            EntryStatus::Shortlisted => Ok(false),
            EntryStatus::Rejected => Err(ProgressError::AlreadyRejected {
                student,
                round: round_number,
            }),
            EntryStatus::Pending => {
                entry.status = EntryStatus::Shortlisted;
                entry.evaluated_at = Some(now);
                self.refresh_average();
                Ok(true)
            }
        }
    }

    /// Reject the student in `round_number`, ending their drive. Returns whether anything
    /// changed; rejecting an already-rejected entry is a no-op.
    pub fn reject(&mut self, round_number: u32, now: DateTime<Utc>) -> Result<bool, ProgressError> {
        if self.overall_status == OverallStatus::Placed {
            return Err(ProgressError::Terminal {
                student: self.student_id.clone(),
                status: self.overall_status.label(),
            });
        }
        self.ensure_not_past(round_number)?;

        let entry = self.entry_mut(round_number)?;
        let changed = entry.status != EntryStatus::Rejected;
        if changed {
            entry.status = EntryStatus::Rejected;
            entry.evaluated_at = Some(now);
        }
        self.overall_status = OverallStatus::Rejected;
        self.final_result = Some(FinalResult::Rejected);
        self.current_round = round_number;
        self.refresh_average();
        Ok(changed)
    }

    /// Store marks for a round and derive the percentage against `max_marks`.
    pub fn record_marks(
        &mut self,
        round_number: u32,
        marks_obtained: f64,
        max_marks: f64,
    ) -> Result<(), ProgressError> {
        let entry = self.entry_mut(round_number)?;
        entry.marks_obtained = Some(marks_obtained);
        entry.max_marks = Some(max_marks);
        entry.percentage = Some(percentage_of(marks_obtained, max_marks));
        self.refresh_average();
        Ok(())
    }

    pub(crate) fn refresh_average(&mut self) {
        self.average_percentage = average_percentage(&self.round_progress);
    }

    /// Audit the record against the progression invariants. An empty result means the record
    /// is consistent.
    pub fn validate(&self, total_rounds: u32) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();

        let mut seen = BTreeSet::new();
        for entry in &self.round_progress {
            if !seen.insert(entry.round_number) {
                violations.push(InvariantViolation::DuplicateEntry {
                    round: entry.round_number,
                });
            }
        }

        if self.entry(1).is_none() {
            violations.push(InvariantViolation::MissingFirstRound);
        }

        for &round in seen.iter().filter(|&&round| round > 1) {
            if !self.has_reached(round) {
                violations.push(InvariantViolation::UnearnedEntry {
                    round,
                    previous: round - 1,
                });
            }
        }

        let first_rejection = self
            .round_progress
            .iter()
            .filter(|entry| entry.status == EntryStatus::Rejected)
            .map(|entry| entry.round_number)
            .min();
        match (first_rejection, self.overall_status) {
            (Some(_), OverallStatus::Rejected) | (None, OverallStatus::Active) => {}
            (Some(round), status) => violations.push(InvariantViolation::RejectionNotTerminal {
                round,
                status: status.label(),
            }),
            (None, OverallStatus::Rejected) => {
                violations.push(InvariantViolation::RejectedWithoutRejection)
            }
            (None, OverallStatus::Placed) => {
                let final_shortlisted = self
                    .entry(total_rounds)
                    .is_some_and(|entry| entry.status == EntryStatus::Shortlisted);
                if !final_shortlisted {
                    violations.push(InvariantViolation::PlacedWithoutFinalShortlist {
                        final_round: total_rounds,
                    });
                }
            }
        }

        let expected_result = match self.overall_status {
            OverallStatus::Active => None,
            OverallStatus::Placed => Some(FinalResult::Selected),
            OverallStatus::Rejected => Some(FinalResult::Rejected),
        };
        if self.final_result != expected_result {
            violations.push(InvariantViolation::FinalResultMismatch {
                status: self.overall_status.label(),
            });
        }

        if let Some(latest) = self.latest_round() {
            if latest != self.current_round {
                violations.push(InvariantViolation::CurrentRoundMismatch {
                    expected: latest,
                    found: self.current_round,
                });
            }
        }

        violations
    }
}

pub(crate) fn percentage_of(marks_obtained: f64, max_marks: f64) -> f64 {
    if max_marks <= 0.0 {
        return 0.0;
    }
    round_two_places(marks_obtained / max_marks * 100.0)
}

pub(crate) fn round_two_places(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
