use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    DriveId, DriveStatus, EntryStatus, NewDrive, NewRound, RoundId, StudentId,
};
use super::error::PlacementError;
use super::service::PlacementService;
use super::store::PlacementRepository;

/// Body for partial shortlist/reject actions and enrollments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSelection {
    pub student_ids: Vec<StudentId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRoundRequest {
    #[serde(default)]
    pub shortlisted_student_ids: Vec<StudentId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksRequest {
    pub student_id: StudentId,
    pub marks_obtained: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveStatusRequest {
    pub status: DriveStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentsQuery {
    #[serde(default)]
    pub status: Option<EntryStatus>,
}

type SharedService<R> = State<Arc<PlacementService<R>>>;

/// Router builder exposing the placement engine over HTTP.
pub fn placement_router<R>(service: Arc<PlacementService<R>>) -> Router
where
    R: PlacementRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/drives",
            post(create_drive_handler::<R>).get(list_drives_handler::<R>),
        )
        .route(
            "/api/v1/drives/:drive_id",
            get(drive_detail_handler::<R>).delete(delete_drive_handler::<R>),
        )
        .route(
            "/api/v1/drives/:drive_id/status",
            put(drive_status_handler::<R>),
        )
        .route(
            "/api/v1/drives/:drive_id/report",
            get(drive_report_handler::<R>),
        )
        .route(
            "/api/v1/drives/:drive_id/rounds",
            post(create_round_handler::<R>).get(list_rounds_handler::<R>),
        )
        .route(
            "/api/v1/drives/:drive_id/enrollments",
            post(enroll_handler::<R>),
        )
        .route(
            "/api/v1/drives/:drive_id/rounds/:round_number/students",
            get(students_in_round_handler::<R>),
        )
        .route("/api/v1/rounds/:round_id/start", post(start_round_handler::<R>))
        .route(
            "/api/v1/rounds/:round_id/cancel",
            post(cancel_round_handler::<R>),
        )
        .route(
            "/api/v1/rounds/:round_id/shortlist",
            post(shortlist_handler::<R>),
        )
        .route("/api/v1/rounds/:round_id/reject", post(reject_handler::<R>))
        .route(
            "/api/v1/rounds/:round_id/complete",
            post(complete_round_handler::<R>),
        )
        .route("/api/v1/rounds/:round_id/marks", put(marks_handler::<R>))
        .route(
            "/api/v1/rounds/:round_id/qualifying",
            get(qualifying_handler::<R>),
        )
        .route(
            "/api/v1/students/:student_id/progress",
            get(student_progress_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn create_drive_handler<R>(
    State(service): SharedService<R>,
    Json(request): Json<NewDrive>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    let drive = service.create_drive(request)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "driveId": drive.id, "drive": drive })),
    ))
}

pub(crate) async fn list_drives_handler<R>(
    State(service): SharedService<R>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.list_drives()?))
}

pub(crate) async fn drive_detail_handler<R>(
    State(service): SharedService<R>,
    Path(drive_id): Path<String>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.drive_detail(&DriveId(drive_id))?))
}

pub(crate) async fn delete_drive_handler<R>(
    State(service): SharedService<R>,
    Path(drive_id): Path<String>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    service.delete_drive(&DriveId(drive_id))?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn drive_status_handler<R>(
    State(service): SharedService<R>,
    Path(drive_id): Path<String>,
    Json(request): Json<DriveStatusRequest>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(
        service.update_drive_status(&DriveId(drive_id), request.status)?,
    ))
}

pub(crate) async fn drive_report_handler<R>(
    State(service): SharedService<R>,
    Path(drive_id): Path<String>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.drive_report(&DriveId(drive_id))?))
}

pub(crate) async fn create_round_handler<R>(
    State(service): SharedService<R>,
    Path(drive_id): Path<String>,
    Json(request): Json<NewRound>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    let round = service.create_round(&DriveId(drive_id), request)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "roundId": round.id, "round": round })),
    ))
}

pub(crate) async fn list_rounds_handler<R>(
    State(service): SharedService<R>,
    Path(drive_id): Path<String>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.list_rounds(&DriveId(drive_id))?))
}

pub(crate) async fn enroll_handler<R>(
    State(service): SharedService<R>,
    Path(drive_id): Path<String>,
    Json(selection): Json<StudentSelection>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    let enrollment = service.enroll_students(&DriveId(drive_id), selection.student_ids)?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

pub(crate) async fn students_in_round_handler<R>(
    State(service): SharedService<R>,
    Path((drive_id, round_number)): Path<(String, u32)>,
    Query(query): Query<StudentsQuery>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.students_in_round(
        &DriveId(drive_id),
        round_number,
        query.status,
    )?))
}

pub(crate) async fn start_round_handler<R>(
    State(service): SharedService<R>,
    Path(round_id): Path<String>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.start_round(&RoundId(round_id))?))
}

pub(crate) async fn cancel_round_handler<R>(
    State(service): SharedService<R>,
    Path(round_id): Path<String>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.cancel_round(&RoundId(round_id))?))
}

pub(crate) async fn shortlist_handler<R>(
    State(service): SharedService<R>,
    Path(round_id): Path<String>,
    Json(selection): Json<StudentSelection>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(
        service.shortlist_selected(&RoundId(round_id), selection.student_ids)?,
    ))
}

pub(crate) async fn reject_handler<R>(
    State(service): SharedService<R>,
    Path(round_id): Path<String>,
    Json(selection): Json<StudentSelection>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(
        service.reject_selected(&RoundId(round_id), selection.student_ids)?,
    ))
}

pub(crate) async fn complete_round_handler<R>(
    State(service): SharedService<R>,
    Path(round_id): Path<String>,
    Json(request): Json<CompleteRoundRequest>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.complete_round(
        &RoundId(round_id),
        request.shortlisted_student_ids,
    )?))
}

pub(crate) async fn marks_handler<R>(
    State(service): SharedService<R>,
    Path(round_id): Path<String>,
    Json(request): Json<MarksRequest>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.record_marks(
        &RoundId(round_id),
        &request.student_id,
        request.marks_obtained,
    )?))
}

pub(crate) async fn qualifying_handler<R>(
    State(service): SharedService<R>,
    Path(round_id): Path<String>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.qualifying_students(&RoundId(round_id))?))
}

pub(crate) async fn student_progress_handler<R>(
    State(service): SharedService<R>,
    Path(student_id): Path<String>,
) -> Result<impl IntoResponse, PlacementError>
where
    R: PlacementRepository + 'static,
{
    Ok(Json(service.student_progress(&StudentId(student_id))?))
}
