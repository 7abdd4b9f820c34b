use crate::infra::{in_memory_service, MemoryPlacementService};
use campus_placement::config::PlacementConfig;
use campus_placement::error::AppError;
use campus_placement::placement::{
    DriveDetail, DriveId, DriveReport, DriveStatus, NewDrive, NewRound, OverallStatus,
    RoundType, StudentId,
};
use chrono::{Duration, Local};
use clap::Args;

const MAX_MARKS: f64 = 100.0;
const PASSING_MARKS: f64 = 55.0;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Number of students enrolled into round 1
    #[arg(long, default_value_t = 8)]
    pub(crate) students: usize,
    /// Number of rounds in the simulated drive
    #[arg(long, default_value_t = 3)]
    pub(crate) rounds: u32,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = in_memory_service(PlacementConfig::default());
    let drive_id = simulate_drive(&service, args.students, args.rounds)?;

    let detail = service.drive_detail(&drive_id)?;
    let report = service.drive_report(&drive_id)?;
    render_report(&detail, &report);
    Ok(())
}

fn round_plan(round_number: u32) -> (&'static str, RoundType) {
    match round_number {
        1 => ("Online Aptitude", RoundType::Aptitude),
        2 => ("Coding Challenge", RoundType::Coding),
        3 => ("Technical Interview", RoundType::Technical),
        4 => ("Group Discussion", RoundType::GroupDiscussion),
        _ => ("HR Interview", RoundType::Hr),
    }
}

/// Deterministic marks so repeated demo runs tell the same story.
fn synthetic_marks(student_index: usize, round_number: u32) -> f64 {
    let seed = (student_index as u64 * 37 + u64::from(round_number) * 23) % 61;
    (40 + seed) as f64
}

/// Create a drive, run every round to completion, and return its id. Students whose marks
/// reach the passing line are shortlisted; the rest are rejected when the round closes.
pub(crate) fn simulate_drive(
    service: &MemoryPlacementService,
    students: usize,
    rounds: u32,
) -> Result<DriveId, AppError> {
    let today = Local::now().date_naive();
    let drive = service.create_drive(NewDrive {
        company: "acme-systems".to_string(),
        title: "Graduate Software Engineer".to_string(),
        description: "Simulated campus drive".to_string(),
        start_date: today,
        end_date: today + Duration::days(i64::from(rounds.max(1)) * 2),
        total_rounds: rounds,
        status: Some(DriveStatus::Active),
    })?;

    let mut round_ids = Vec::new();
    for round_number in 1..=rounds {
        let (name, round_type) = round_plan(round_number);
        let mut request = NewRound::named(round_number, name, round_type);
        request.max_marks = MAX_MARKS;
        request.passing_marks = Some(PASSING_MARKS);
        request.scheduled_date = Some(today + Duration::days(i64::from(round_number) * 2));
        round_ids.push(service.create_round(&drive.id, request)?.id);
    }

    let roster: Vec<StudentId> = (1..=students)
        .map(|index| StudentId(format!("STU-{index:03}")))
        .collect();
    service.enroll_students(&drive.id, roster.clone())?;

    for (round_id, round_number) in round_ids.iter().zip(1..) {
        let population = service.students_in_round(&drive.id, round_number, None)?;
        if population.is_empty() {
            service.cancel_round(round_id)?;
            continue;
        }

        service.start_round(round_id)?;
        for summary in &population {
            let index = roster
                .iter()
                .position(|student| *student == summary.student_id)
                .unwrap_or_default();
            service.record_marks(
                round_id,
                &summary.student_id,
                synthetic_marks(index, round_number),
            )?;
        }

        let shortlist = service
            .qualifying_students(round_id)?
            .into_iter()
            .map(|summary| summary.student_id)
            .collect();
        service.complete_round(round_id, shortlist)?;
    }

    service.update_drive_status(&drive.id, DriveStatus::Completed)?;
    Ok(drive.id)
}

fn render_report(detail: &DriveDetail, report: &DriveReport) {
    println!("Campus placement demo");
    println!(
        "Drive {} | {} | {} rounds | {}",
        report.drive_id,
        report.title,
        report.total_rounds,
        report.status.label()
    );
    println!(
        "- {} students | {} placed | {} rejected | {} still active",
        report.counts.total, report.counts.placed, report.counts.rejected, report.counts.active
    );
    println!("- average percentage {:.2}%", report.average_percentage);

    println!("\nRounds");
    for round in &report.rounds {
        println!(
            "  {}. {} [{}]: {} in round | {} shortlisted | {} rejected | {} pending",
            round.round_number,
            round.round_name.as_deref().unwrap_or("unnamed"),
            round.status.map(|status| status.label()).unwrap_or("missing"),
            round.enrolled,
            round.shortlisted,
            round.rejected,
            round.pending
        );
    }

    let placed: Vec<&str> = detail
        .student_progress
        .iter()
        .filter(|record| record.overall_status == OverallStatus::Placed)
        .map(|record| record.student_id.as_str())
        .collect();
    if placed.is_empty() {
        println!("\nNo students were placed.");
    } else {
        println!("\nPlaced: {}", placed.join(", "));
    }
}
