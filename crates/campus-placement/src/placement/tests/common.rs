use std::collections::BTreeSet;
use std::io;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::PlacementConfig;
use crate::placement::domain::{
    DriveId, DriveStatus, NewDrive, NewRound, RoundId, RoundType, StudentId,
    StudentRoundProgress,
};
use crate::placement::service::PlacementService;
use crate::placement::store::{
    InMemoryPlacementRepository, PlacementRepository, PlacementTables, RepositoryError,
};

pub(super) type MemoryService = PlacementService<InMemoryPlacementRepository>;

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
}

pub(super) fn new_drive(total_rounds: u32) -> NewDrive {
    NewDrive {
        company: "northwind".to_string(),
        title: "Graduate Engineer Trainee".to_string(),
        description: "Campus hiring for the 2026 batch".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2026, 3, 31).expect("valid date"),
        total_rounds,
        status: Some(DriveStatus::Active),
    }
}

pub(super) fn round_request(round_number: u32) -> NewRound {
    let round_type = match round_number {
        1 => RoundType::Aptitude,
        2 => RoundType::Technical,
        _ => RoundType::Hr,
    };
    NewRound::named(round_number, &format!("Round {round_number}"), round_type)
}

pub(super) fn student_ids(ids: &[&str]) -> Vec<StudentId> {
    ids.iter().map(|id| StudentId::from(*id)).collect()
}

pub(super) fn selection(ids: &[&str]) -> BTreeSet<StudentId> {
    student_ids(ids).into_iter().collect()
}

pub(super) fn build_service() -> (MemoryService, Arc<InMemoryPlacementRepository>) {
    let repository = Arc::new(InMemoryPlacementRepository::default());
    let service = PlacementService::new(repository.clone(), PlacementConfig::default());
    (service, repository)
}

/// Drive with `total_rounds` scheduled rounds and `students` enrolled into round 1.
pub(super) fn seeded_drive(
    service: &MemoryService,
    total_rounds: u32,
    students: &[&str],
) -> (DriveId, Vec<RoundId>) {
    let drive = service
        .create_drive(new_drive(total_rounds))
        .expect("drive created");
    let rounds = (1..=total_rounds)
        .map(|number| {
            service
                .create_round(&drive.id, round_request(number))
                .expect("round created")
                .id
        })
        .collect();
    if !students.is_empty() {
        service
            .enroll_students(&drive.id, student_ids(students))
            .expect("students enrolled");
    }
    (drive.id, rounds)
}

pub(super) fn progress_of(
    service: &MemoryService,
    drive_id: &DriveId,
    student: &str,
) -> StudentRoundProgress {
    service
        .drive_detail(drive_id)
        .expect("drive exists")
        .student_progress
        .into_iter()
        .find(|record| record.student_id.as_str() == student)
        .expect("student enrolled")
}

pub(super) struct UnavailableRepository;

impl PlacementRepository for UnavailableRepository {
    fn read<T, F>(&self, _query: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&PlacementTables) -> T,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn transaction<T, E, F>(&self, _work: F) -> Result<T, E>
    where
        F: FnOnce(&mut PlacementTables) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

/// In-memory sink for log lines emitted while a test body runs.
#[derive(Clone, Default)]
pub(super) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(super) fn capture_logs<T>(work: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let value = tracing::subscriber::with_default(subscriber, work);
    let output = String::from_utf8_lossy(&logs.0.lock().expect("log buffer")).into_owned();
    (value, output)
}
