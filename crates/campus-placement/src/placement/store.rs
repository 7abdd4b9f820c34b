//! Storage layer for drives, rounds, and progression records.
//!
//! `PlacementTables` is the relational shape of the store and owns the uniqueness constraints.
//! Repositories expose it through snapshot reads and all-or-nothing transactions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    DriveId, PlacementDrive, PlacementRound, ProgressId, RoundId, StudentId, StudentRoundProgress,
};

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("uniqueness constraint violated: {0}")]
    Conflict(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Default)]
struct Sequences {
    drive: u64,
    round: u64,
    progress: u64,
}

/// Tables backing the placement engine.
///
/// Progression records are shared behind `Arc` so cloning the tables copies pointers, not
/// round histories; a record is deep-copied only when a writer asks for it mutably.
#[derive(Debug, Clone, Default)]
pub struct PlacementTables {
    drives: BTreeMap<DriveId, PlacementDrive>,
    rounds: BTreeMap<RoundId, PlacementRound>,
    progress: BTreeMap<ProgressId, Arc<StudentRoundProgress>>,
    progress_index: BTreeMap<(DriveId, StudentId), ProgressId>,
    sequences: Sequences,
}

/// Row counts removed by a cascading drive delete.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeRemoval {
    pub drive: PlacementDrive,
    pub rounds_removed: usize,
    pub progress_removed: usize,
}

impl PlacementTables {
    pub fn next_drive_id(&mut self) -> DriveId {
        self.sequences.drive += 1;
        DriveId(format!("drive-{:06}", self.sequences.drive))
    }

    pub fn next_round_id(&mut self) -> RoundId {
        self.sequences.round += 1;
        RoundId(format!("round-{:06}", self.sequences.round))
    }

    pub fn next_progress_id(&mut self) -> ProgressId {
        self.sequences.progress += 1;
        ProgressId(format!("progress-{:06}", self.sequences.progress))
    }

    pub fn insert_drive(&mut self, drive: PlacementDrive) -> Result<(), RepositoryError> {
        if self.drives.contains_key(&drive.id) {
            return Err(RepositoryError::Conflict(format!(
                "drive '{}' already exists",
                drive.id
            )));
        }
        self.drives.insert(drive.id.clone(), drive);
        Ok(())
    }

    pub fn drive(&self, id: &DriveId) -> Option<&PlacementDrive> {
        self.drives.get(id)
    }

    pub fn drive_mut(&mut self, id: &DriveId) -> Option<&mut PlacementDrive> {
        self.drives.get_mut(id)
    }

    pub fn drives(&self) -> impl Iterator<Item = &PlacementDrive> {
        self.drives.values()
    }

    /// Remove a drive together with its rounds and progression records.
    pub fn remove_drive(&mut self, id: &DriveId) -> Option<CascadeRemoval> {
        let drive = self.drives.remove(id)?;

        let rounds_before = self.rounds.len();
        self.rounds.retain(|_, round| &round.drive_id != id);
        let rounds_removed = rounds_before - self.rounds.len();

        let progress_before = self.progress.len();
        self.progress.retain(|_, record| &record.drive_id != id);
        self.progress_index
            .retain(|(drive_id, _), _| drive_id != id);
        let progress_removed = progress_before - self.progress.len();

        Some(CascadeRemoval {
            drive,
            rounds_removed,
            progress_removed,
        })
    }

    pub fn insert_round(&mut self, round: PlacementRound) -> Result<(), RepositoryError> {
        if self.rounds.contains_key(&round.id) {
            return Err(RepositoryError::Conflict(format!(
                "round '{}' already exists",
                round.id
            )));
        }
        if self.round_by_number(&round.drive_id, round.round_number).is_some() {
            return Err(RepositoryError::Conflict(format!(
                "drive '{}' already has round {}",
                round.drive_id, round.round_number
            )));
        }
        self.rounds.insert(round.id.clone(), round);
        Ok(())
    }

    pub fn round(&self, id: &RoundId) -> Option<&PlacementRound> {
        self.rounds.get(id)
    }

    pub fn round_mut(&mut self, id: &RoundId) -> Option<&mut PlacementRound> {
        self.rounds.get_mut(id)
    }

    pub fn round_by_number(&self, drive_id: &DriveId, round_number: u32) -> Option<&PlacementRound> {
        self.rounds
            .values()
            .find(|round| &round.drive_id == drive_id && round.round_number == round_number)
    }

    /// Rounds of a drive ordered by round number.
    pub fn rounds_for_drive(&self, drive_id: &DriveId) -> Vec<&PlacementRound> {
        let mut rounds: Vec<_> = self
            .rounds
            .values()
            .filter(|round| &round.drive_id == drive_id)
            .collect();
        rounds.sort_by_key(|round| round.round_number);
        rounds
    }

    /// Insert a progression record. One record per (student, drive) and one entry per round
    /// number inside it.
    pub fn insert_progress(&mut self, record: StudentRoundProgress) -> Result<(), RepositoryError> {
        if self.progress.contains_key(&record.id) {
            return Err(RepositoryError::Conflict(format!(
                "progress record '{}' already exists",
                record.id
            )));
        }

        let key = (record.drive_id.clone(), record.student_id.clone());
        if self.progress_index.contains_key(&key) {
            return Err(RepositoryError::Conflict(format!(
                "student '{}' already has a progress record in drive '{}'",
                record.student_id, record.drive_id
            )));
        }

        let mut seen = BTreeSet::new();
        for entry in &record.round_progress {
            if !seen.insert(entry.round_number) {
                return Err(RepositoryError::Conflict(format!(
                    "progress record '{}' holds round {} more than once",
                    record.id, entry.round_number
                )));
            }
        }

        self.progress_index.insert(key, record.id.clone());
        self.progress.insert(record.id.clone(), Arc::new(record));
        Ok(())
    }

    pub fn progress_for(
        &self,
        drive_id: &DriveId,
        student_id: &StudentId,
    ) -> Option<&StudentRoundProgress> {
        let id = self
            .progress_index
            .get(&(drive_id.clone(), student_id.clone()))?;
        self.progress.get(id).map(Arc::as_ref)
    }

    pub fn progress_for_mut(
        &mut self,
        drive_id: &DriveId,
        student_id: &StudentId,
    ) -> Option<&mut StudentRoundProgress> {
        let id = self
            .progress_index
            .get(&(drive_id.clone(), student_id.clone()))?;
        self.progress.get_mut(id).map(Arc::make_mut)
    }

    pub fn progress_for_drive(&self, drive_id: &DriveId) -> Vec<&StudentRoundProgress> {
        self.progress
            .values()
            .filter(|record| &record.drive_id == drive_id)
            .map(Arc::as_ref)
            .collect()
    }

    pub fn progress_for_student(&self, student_id: &StudentId) -> Vec<&StudentRoundProgress> {
        self.progress
            .values()
            .filter(|record| &record.student_id == student_id)
            .map(Arc::as_ref)
            .collect()
    }
}

/// Storage abstraction so the service can be exercised against alternative backends.
pub trait PlacementRepository: Send + Sync {
    /// Run a read-only query against a consistent view of the tables.
    fn read<T, F>(&self, query: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&PlacementTables) -> T;

    /// Run `work` as one unit: its writes become visible only if it returns `Ok`.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut PlacementTables) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Process-local repository. Writers are serialized by the mutex and stage their changes on a
/// working copy that replaces the committed tables on success.
///
/// Staging costs one copy of the table maps per transaction: linear in the number of rows, but
/// each progression row is a pointer copy and only the records a transaction writes are cloned.
#[derive(Debug, Default, Clone)]
pub struct InMemoryPlacementRepository {
    tables: Arc<Mutex<PlacementTables>>,
}

impl InMemoryPlacementRepository {
    pub fn from_tables(tables: PlacementTables) -> Self {
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PlacementTables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("placement store lock poisoned".to_string()))
    }
}

impl PlacementRepository for InMemoryPlacementRepository {
    fn read<T, F>(&self, query: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&PlacementTables) -> T,
    {
        let guard = self.lock()?;
        Ok(query(&guard))
    }

    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut PlacementTables) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let outcome = work(&mut working)?;
        *guard = working;
        Ok(outcome)
    }
}
