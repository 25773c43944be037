use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{
    attendance::{
        dto::{
            AttendanceView, DailyAttendanceView, IotRequest, IotResponse, MarkRequest,
            MarkResponse, RecordsResponse, SummaryResponse,
        },
        services::{self, MarkCommand},
    },
    auth::extractors::{AuthUser, DeviceAuth, Staff},
    error::{AppError, AppResult},
    extract::JsonBody,
    state::AppState,
    users::services::parse_id,
};

pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance/mark", post(mark_attendance))
        .route("/attendance/date/:date", get(attendance_by_date))
}

pub fn self_service_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance/student/:id", get(student_attendance))
        .route("/attendance/summary/:id", get(student_summary))
}

pub fn device_routes() -> Router<AppState> {
    Router::new().route("/attendance/iot/attendance", post(iot_attendance))
}

/// `me` names the caller; anything else must be a student id the caller may see.
fn student_param(auth: &AuthUser, raw: &str) -> AppResult<Uuid> {
    let id = if raw == "me" {
        auth.id
    } else {
        parse_id(raw, "student id")?
    };
    if !auth.can_view_student(id) {
        warn!(user_id = %auth.id, student_id = %id, "student tried to read another student");
        return Err(AppError::Forbidden("Forbidden: students may only view their own attendance".into()));
    }
    Ok(id)
}

#[instrument(skip(state, payload))]
pub async fn mark_attendance(
    State(state): State<AppState>,
    Staff(caller): Staff,
    JsonBody(payload): JsonBody<MarkRequest>,
) -> AppResult<Json<MarkResponse>> {
    let cmd = MarkCommand::parse(
        payload.student_id.as_deref(),
        payload.date.as_deref(),
        payload.status.as_deref(),
    )?;
    let record = services::mark(&state, cmd, caller.id).await?;
    Ok(Json(MarkResponse {
        attendance: record.into(),
    }))
}

#[instrument(skip(state))]
pub async fn student_attendance(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<RecordsResponse<AttendanceView>>> {
    let student_id = student_param(&auth, &id)?;
    let records = services::get_by_student(&state, student_id).await?;
    Ok(Json(RecordsResponse {
        records: records.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn attendance_by_date(
    State(state): State<AppState>,
    Staff(_caller): Staff,
    Path(date): Path<String>,
) -> AppResult<Json<RecordsResponse<DailyAttendanceView>>> {
    let day = services::parse_day(&date)?;
    let rows = services::get_by_date(&state, day).await?;
    Ok(Json(RecordsResponse {
        records: rows.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn student_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<SummaryResponse>> {
    let student_id = student_param(&auth, &id)?;
    let (student, summary) = services::get_summary(&state, student_id).await?;
    Ok(Json(SummaryResponse::new(student, summary)))
}

#[instrument(skip(state, payload))]
pub async fn iot_attendance(
    State(state): State<AppState>,
    device: DeviceAuth,
    JsonBody(payload): JsonBody<IotRequest>,
) -> AppResult<Json<IotResponse>> {
    let tag = payload
        .rfid
        .ok_or_else(|| AppError::invalid("RFID tag required"))?;
    let (_student, record) = services::mark_from_tag(&state, &tag).await?;
    tracing::debug!(device_id = %device.device_id, "check-in accepted");
    Ok(Json(IotResponse {
        message: "Attendance marked successfully via IoT",
        attendance: record.into(),
    }))
}
