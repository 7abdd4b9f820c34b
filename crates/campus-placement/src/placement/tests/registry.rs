use super::common::*;
use crate::config::PlacementConfig;
use crate::placement::domain::{DriveId, DriveStatus, NewRound, RoundStatus, RoundType, StudentId};
use crate::placement::{PlacementError, PlacementService, RepositoryError};
use chrono::NaiveDate;
use std::sync::Arc;

#[test]
fn create_drive_requires_core_fields() {
    let (service, _) = build_service();

    let mut request = new_drive(2);
    request.title = "  ".to_string();
    request.description = String::new();
    match service.create_drive(request) {
        Err(PlacementError::Validation(message)) => {
            assert!(message.contains("title"));
            assert!(message.contains("description"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    let err = service
        .create_drive(new_drive(0))
        .expect_err("zero rounds rejected");
    assert!(matches!(err, PlacementError::Validation(_)));

    let mut backwards = new_drive(2);
    backwards.end_date = NaiveDate::from_ymd_opt(2026, 2, 1).expect("valid date");
    assert!(matches!(
        service.create_drive(backwards),
        Err(PlacementError::Validation(_))
    ));

    let mut finished = new_drive(2);
    finished.status = Some(DriveStatus::Completed);
    assert!(matches!(
        service.create_drive(finished),
        Err(PlacementError::Validation(_))
    ));

    assert!(service.list_drives().expect("list").is_empty());
}

#[test]
fn drive_defaults_to_draft_and_follows_lifecycle() {
    let (service, _) = build_service();
    let mut request = new_drive(1);
    request.status = None;
    let drive = service.create_drive(request).expect("drive created");
    assert_eq!(drive.status, DriveStatus::Draft);
    assert_eq!(drive.id, DriveId::from("drive-000001"));

    let err = service
        .update_drive_status(&drive.id, DriveStatus::Completed)
        .expect_err("draft cannot complete");
    assert!(matches!(err, PlacementError::StateConflict(_)));

    service
        .update_drive_status(&drive.id, DriveStatus::Active)
        .expect("activates");
    let closed = service
        .update_drive_status(&drive.id, DriveStatus::Cancelled)
        .expect("cancels");
    assert_eq!(closed.status, DriveStatus::Cancelled);

    let err = service
        .enroll_students(&drive.id, student_ids(&["A"]))
        .expect_err("cancelled drive takes no enrollments");
    assert!(matches!(err, PlacementError::StateConflict(_)));
}

#[test]
fn drive_detail_aggregates_rounds_and_progress() {
    let (service, _) = build_service();
    let (drive_id, rounds) = seeded_drive(&service, 3, &["A", "B"]);

    let detail = service.drive_detail(&drive_id).expect("detail");
    assert_eq!(detail.drive.total_rounds, 3);
    let numbers: Vec<u32> = detail.rounds.iter().map(|round| round.round_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(detail.rounds[0].id, rounds[0]);
    assert_eq!(detail.student_progress.len(), 2);

    let err = service
        .drive_detail(&DriveId::from("drive-999999"))
        .expect_err("unknown drive");
    assert!(matches!(err, PlacementError::NotFound { entity: "drive", .. }));
}

#[test]
fn delete_drive_cascades() {
    let (service, _) = build_service();
    let (drive_id, _) = seeded_drive(&service, 2, &["A", "B"]);
    let (other_drive, _) = seeded_drive(&service, 1, &["A"]);

    let removal = service.delete_drive(&drive_id).expect("deleted");
    assert_eq!(removal.rounds_removed, 2);
    assert_eq!(removal.progress_removed, 2);

    assert!(matches!(
        service.drive_detail(&drive_id),
        Err(PlacementError::NotFound { .. })
    ));
    let remaining = service
        .student_progress(&StudentId::from("A"))
        .expect("progress");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].drive_id, other_drive);

    assert!(matches!(
        service.delete_drive(&drive_id),
        Err(PlacementError::NotFound { .. })
    ));
}

#[test]
fn round_numbers_are_unique_per_drive() {
    let (service, _) = build_service();
    let (drive_id, _) = seeded_drive(&service, 2, &[]);

    let err = service
        .create_round(&drive_id, round_request(2))
        .expect_err("duplicate number");
    assert!(matches!(err, PlacementError::Validation(_)));

    assert_eq!(service.next_round_number(&drive_id).expect("next"), 3);
    let gap = service
        .create_round(&drive_id, NewRound::named(5, "Final HR", RoundType::Hr))
        .expect("non-sequential numbers are allowed");
    assert_eq!(gap.status, RoundStatus::Scheduled);
    assert_eq!(service.next_round_number(&drive_id).expect("next"), 6);
}

#[test]
fn create_round_validates_input() {
    let (service, _) = build_service();
    let (drive_id, _) = seeded_drive(&service, 2, &[]);

    let err = service
        .create_round(&drive_id, NewRound::named(0, "Zero", RoundType::Other))
        .expect_err("round 0");
    assert!(matches!(err, PlacementError::Validation(_)));

    let err = service
        .create_round(&drive_id, NewRound::named(3, " ", RoundType::Coding))
        .expect_err("blank name");
    assert!(matches!(err, PlacementError::Validation(_)));

    let mut request = NewRound::named(3, "Coding", RoundType::Coding);
    request.passing_marks = Some(120.0);
    let err = service
        .create_round(&drive_id, request)
        .expect_err("passing above max");
    assert!(matches!(err, PlacementError::Validation(_)));

    let err = service
        .create_round(&DriveId::from("drive-404"), round_request(1))
        .expect_err("unknown drive");
    assert!(matches!(err, PlacementError::NotFound { .. }));
}

#[test]
fn round_lifecycle_only_moves_forward() {
    let (service, _) = build_service();
    let (_, rounds) = seeded_drive(&service, 2, &["A"]);

    let started = service.start_round(&rounds[0]).expect("starts");
    assert_eq!(started.status, RoundStatus::InProgress);
    assert!(started.started_at.is_some());

    let err = service.start_round(&rounds[0]).expect_err("already started");
    assert!(matches!(err, PlacementError::StateConflict(_)));

    let err = service.cancel_round(&rounds[0]).expect_err("running rounds stay");
    assert!(matches!(err, PlacementError::StateConflict(_)));

    let cancelled = service.cancel_round(&rounds[1]).expect("cancels");
    assert_eq!(cancelled.status, RoundStatus::Cancelled);
    let err = service.start_round(&rounds[1]).expect_err("cancelled");
    assert!(matches!(err, PlacementError::StateConflict(_)));
}

#[test]
fn enrollment_is_all_or_nothing() {
    let (service, _) = build_service();
    let (drive_id, _) = seeded_drive(&service, 2, &["A"]);

    let err = service
        .enroll_students(&drive_id, student_ids(&["B", "A"]))
        .expect_err("A already enrolled");
    match err {
        PlacementError::Validation(message) => assert!(message.contains('A')),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(service
        .student_progress(&StudentId::from("B"))
        .expect("progress")
        .is_empty());

    let enrollment = service
        .enroll_students(&drive_id, student_ids(&["B", "C", "B"]))
        .expect("duplicates in the request collapse");
    assert_eq!(enrollment.progress_ids.len(), 2);

    let err = service
        .enroll_students(&drive_id, Vec::new())
        .expect_err("empty selection");
    assert!(matches!(err, PlacementError::Validation(_)));
}

#[test]
fn selection_limit_is_enforced() {
    let repository = Arc::new(crate::placement::InMemoryPlacementRepository::default());
    let service = PlacementService::new(repository, PlacementConfig { max_selection: 2 });
    let drive = service.create_drive(new_drive(1)).expect("drive");

    let err = service
        .enroll_students(&drive.id, student_ids(&["A", "B", "C"]))
        .expect_err("over the limit");
    assert!(matches!(err, PlacementError::Validation(_)));
    assert_eq!(service.config().max_selection, 2);
}

#[test]
fn repository_outages_surface_as_repository_errors() {
    let service = PlacementService::new(Arc::new(UnavailableRepository), PlacementConfig::default());

    assert!(matches!(
        service.create_drive(new_drive(1)),
        Err(PlacementError::Repository(RepositoryError::Unavailable(_)))
    ));
    assert!(matches!(
        service.list_drives(),
        Err(PlacementError::Repository(RepositoryError::Unavailable(_)))
    ));
}

#[test]
fn closed_drives_refuse_round_and_progression_actions() {
    let (service, _) = build_service();
    let (drive_id, rounds) = seeded_drive(&service, 1, &["A"]);
    service
        .update_drive_status(&drive_id, DriveStatus::Cancelled)
        .expect("cancels");

    let err = service.start_round(&rounds[0]).expect_err("drive is cancelled");
    assert!(matches!(err, PlacementError::StateConflict(_)));

    let record = progress_of(&service, &drive_id, "A");
    assert_eq!(record.overall_status, crate::placement::OverallStatus::Active);
    assert!(record.final_result.is_none());

    service
        .cancel_round(&rounds[0])
        .expect("leftover rounds can still be retired");
}

#[test]
fn running_round_on_a_cancelled_drive_is_frozen() {
    let (service, _) = build_service();
    let (drive_id, rounds) = seeded_drive(&service, 1, &["A", "B"]);
    service.start_round(&rounds[0]).expect("round starts");
    service
        .update_drive_status(&drive_id, DriveStatus::Cancelled)
        .expect("cancels");

    let err = service
        .complete_round(&rounds[0], student_ids(&["A"]))
        .expect_err("no placements in a cancelled drive");
    assert!(matches!(err, PlacementError::StateConflict(_)));

    let err = service
        .shortlist_selected(&rounds[0], student_ids(&["A"]))
        .expect_err("partial actions are refused too");
    assert!(matches!(err, PlacementError::StateConflict(_)));

    let err = service
        .record_marks(&rounds[0], &StudentId::from("B"), 40.0)
        .expect_err("marks are refused too");
    assert!(matches!(err, PlacementError::StateConflict(_)));

    let report = service.drive_report(&drive_id).expect("report");
    assert_eq!(report.counts.placed, 0);
    assert_eq!(report.counts.active, 2);
}

#[test]
fn drive_completes_only_once_every_student_is_settled() {
    let (service, _) = build_service();
    let (drive_id, rounds) = seeded_drive(&service, 1, &["A", "B"]);
    service.start_round(&rounds[0]).expect("round starts");

    let err = service
        .update_drive_status(&drive_id, DriveStatus::Completed)
        .expect_err("round still running");
    assert!(matches!(err, PlacementError::StateConflict(_)));

    service
        .complete_round(&rounds[0], student_ids(&["A"]))
        .expect("round completes");
    let drive = service
        .update_drive_status(&drive_id, DriveStatus::Completed)
        .expect("everyone placed or rejected");
    assert_eq!(drive.status, DriveStatus::Completed);
}

#[test]
fn drive_with_active_students_cannot_complete() {
    let (service, _) = build_service();
    let (drive_id, rounds) = seeded_drive(&service, 2, &["A", "B"]);
    service.start_round(&rounds[0]).expect("round starts");
    service
        .complete_round(&rounds[0], student_ids(&["A"]))
        .expect("round completes");

    match service.update_drive_status(&drive_id, DriveStatus::Completed) {
        Err(PlacementError::StateConflict(message)) => assert!(message.contains("1 active")),
        other => panic!("expected state conflict, got {other:?}"),
    }
    assert_eq!(
        service.drive_detail(&drive_id).expect("detail").drive.status,
        DriveStatus::Active
    );
}

#[test]
fn marks_commits_and_refused_deletes_are_logged() {
    let (service, _) = build_service();
    let (_, rounds) = seeded_drive(&service, 1, &["A"]);
    service.start_round(&rounds[0]).expect("round starts");

    let (_, logs) = capture_logs(|| {
        service
            .record_marks(&rounds[0], &StudentId::from("A"), 72.0)
            .expect("marks stored");
        service
            .delete_drive(&DriveId::from("drive-404"))
            .expect_err("unknown drive");
    });

    let marks_line = logs
        .lines()
        .find(|line| line.contains("marks recorded"))
        .expect("marks commit logged");
    assert!(marks_line.contains("INFO"));
    assert!(marks_line.contains("student_id=A"));

    let delete_line = logs
        .lines()
        .find(|line| line.contains("drive deletion rejected"))
        .expect("refused delete logged");
    assert!(delete_line.contains("WARN"));
    assert!(delete_line.contains("drive-404"));
}
