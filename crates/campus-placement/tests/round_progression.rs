//! End-to-end round progression through the public service facade and HTTP router.
//!
//! These scenarios only touch exported items, so they exercise the same surface the API
//! binary mounts.

mod common {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use campus_placement::config::PlacementConfig;
    use campus_placement::placement::{
        DriveId, DriveStatus, InMemoryPlacementRepository, NewDrive, NewRound, PlacementService,
        RoundId, RoundType, StudentId, StudentRoundProgress,
    };

    pub(super) type Service = PlacementService<InMemoryPlacementRepository>;

    pub(super) fn service() -> Arc<Service> {
        Arc::new(PlacementService::new(
            Arc::new(InMemoryPlacementRepository::default()),
            PlacementConfig::default(),
        ))
    }

    pub(super) fn ids(students: &[&str]) -> Vec<StudentId> {
        students.iter().map(|id| StudentId::from(*id)).collect()
    }

    /// Active drive with aptitude, technical and HR rounds.
    pub(super) fn three_round_drive(service: &Service, students: &[&str]) -> (DriveId, Vec<RoundId>) {
        let drive = service
            .create_drive(NewDrive {
                company: "contoso".to_string(),
                title: "Software Engineer".to_string(),
                description: "Full-time roles, 2026 graduates".to_string(),
                start_date: NaiveDate::from_ymd_opt(2026, 8, 1).expect("valid date"),
                end_date: NaiveDate::from_ymd_opt(2026, 8, 20).expect("valid date"),
                total_rounds: 3,
                status: Some(DriveStatus::Active),
            })
            .expect("drive created");

        let rounds = [
            (1, "Aptitude", RoundType::Aptitude),
            (2, "Technical", RoundType::Technical),
            (3, "HR", RoundType::Hr),
        ]
        .into_iter()
        .map(|(number, name, round_type)| {
            service
                .create_round(&drive.id, NewRound::named(number, name, round_type))
                .expect("round created")
                .id
        })
        .collect();

        service
            .enroll_students(&drive.id, ids(students))
            .expect("students enrolled");
        (drive.id, rounds)
    }

    pub(super) fn record(service: &Service, drive_id: &DriveId, student: &str) -> StudentRoundProgress {
        service
            .student_progress(&StudentId::from(student))
            .expect("progress")
            .into_iter()
            .find(|record| &record.drive_id == drive_id)
            .expect("student enrolled in drive")
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use campus_placement::placement::{
    placement_router, EntryStatus, FinalResult, OverallStatus, PlacementError,
};
use common::*;

#[test]
fn drive_runs_to_a_single_placement() {
    let service = service();
    let (drive_id, rounds) = three_round_drive(&service, &["S1", "S2", "S3", "S4"]);

    let shortlists: [&[&str]; 3] = [&["S1", "S2", "S3"], &["S1", "S3"], &["S3"]];
    for (round_id, shortlist) in rounds.iter().zip(shortlists) {
        service.start_round(round_id).expect("round starts");
        service
            .complete_round(round_id, ids(shortlist))
            .expect("round completes");
    }

    let placed = record(&service, &drive_id, "S3");
    assert_eq!(placed.overall_status, OverallStatus::Placed);
    assert_eq!(placed.final_result, Some(FinalResult::Selected));
    assert_eq!(placed.round_progress.len(), 3);
    assert!(placed
        .round_progress
        .iter()
        .all(|entry| entry.status == EntryStatus::Shortlisted));

    let dropped_in_two = record(&service, &drive_id, "S2");
    assert_eq!(dropped_in_two.overall_status, OverallStatus::Rejected);
    assert_eq!(dropped_in_two.final_result, Some(FinalResult::Rejected));
    assert_eq!(dropped_in_two.current_round, 2);

    let report = service.drive_report(&drive_id).expect("report");
    assert_eq!(report.counts.placed, 1);
    assert_eq!(report.counts.rejected, 3);
    assert_eq!(report.counts.active, 0);
    let enrolled: Vec<usize> = report.rounds.iter().map(|round| round.enrolled).collect();
    assert_eq!(enrolled, vec![4, 3, 2]);

    for round_number in 1..=3 {
        let population = service
            .students_in_round(&drive_id, round_number, None)
            .expect("population");
        for summary in population {
            let progress = record(&service, &drive_id, summary.student_id.as_str());
            if round_number > 1 {
                assert_eq!(
                    progress.round_progress[round_number as usize - 2].status,
                    EntryStatus::Shortlisted
                );
            }
        }
    }
}

#[test]
fn failed_completion_leaves_no_trace() {
    let service = service();
    let (drive_id, rounds) = three_round_drive(&service, &["S1", "S2"]);
    service.start_round(&rounds[0]).expect("round starts");
    let before = service.drive_detail(&drive_id).expect("detail");

    let err = service
        .complete_round(&rounds[0], ids(&["S1", "ghost"]))
        .expect_err("ghost is not in the round");
    assert!(matches!(err, PlacementError::Validation(_)));

    assert_eq!(service.drive_detail(&drive_id).expect("detail"), before);
}

async fn post_json(router: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, payload)
}

#[tokio::test]
async fn http_round_completion_reports_outcomes() {
    let service = service();
    let (drive_id, rounds) = three_round_drive(&service, &["S1", "S2", "S3"]);
    let router = placement_router(service.clone());
    let round = rounds[0].as_str();

    let (status, _) = post_json(&router, &format!("/api/v1/rounds/{round}/start"), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, payload) = post_json(
        &router,
        &format!("/api/v1/rounds/{round}/complete"),
        json!({ "shortlistedStudentIds": ["S1", "S3"] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["shortlistedCount"], 2);
    assert_eq!(payload["rejectedCount"], 1);

    let (status, payload) = post_json(
        &router,
        &format!("/api/v1/rounds/{round}/complete"),
        json!({ "shortlistedStudentIds": ["S1"] }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(payload["kind"], "state_conflict");

    let second_round = service
        .students_in_round(&drive_id, 2, Some(EntryStatus::Pending))
        .expect("round 2");
    let names: Vec<&str> = second_round
        .iter()
        .map(|summary| summary.student_id.as_str())
        .collect();
    assert_eq!(names, vec!["S1", "S3"]);
}
