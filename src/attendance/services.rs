use time::{Date, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    attendance::{
        date::{day_of, normalize_date},
        repo_types::{
            AttendanceMark, AttendanceRecord, AttendanceStatus, AttendanceTally, DailyAttendanceRow,
        },
    },
    error::{AppError, AppResult},
    state::AppState,
    users::{repo_types::User, services::find_student},
};

/// A validated mark request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkCommand {
    pub student_id: Uuid,
    pub date: Date,
    pub status: AttendanceStatus,
}

impl MarkCommand {
    pub fn parse(
        student_id: Option<&str>,
        date: Option<&str>,
        status: Option<&str>,
    ) -> AppResult<Self> {
        let (Some(student_id), Some(date), Some(status)) = (student_id, date, status) else {
            return Err(AppError::invalid(
                "studentId, date (YYYY-MM-DD), status are required",
            ));
        };
        let status = status
            .parse::<AttendanceStatus>()
            .map_err(|_| AppError::invalid("status must be present or absent"))?;
        let student_id =
            Uuid::parse_str(student_id.trim()).map_err(|_| AppError::invalid("Invalid studentId"))?;
        let date = parse_day(date)?;
        Ok(Self {
            student_id,
            date,
            status,
        })
    }
}

pub fn parse_day(raw: &str) -> AppResult<Date> {
    normalize_date(raw).ok_or_else(|| AppError::invalid("Invalid date"))
}

/// Present-day counts for one student.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendanceSummary {
    pub total_days: i64,
    pub present_days: i64,
    pub absent_days: i64,
    pub percentage: f64,
}

impl From<AttendanceTally> for AttendanceSummary {
    fn from(t: AttendanceTally) -> Self {
        Self {
            total_days: t.total,
            present_days: t.present,
            absent_days: t.total - t.present,
            percentage: present_percentage(t.present, t.total),
        }
    }
}

/// `present / total * 100` rounded to two decimals; 0 for an empty history.
pub fn present_percentage(present: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (present as f64 / total as f64 * 10_000.0).round() / 100.0
}

/// Create or overwrite the record for (student, day).
#[instrument(skip(state))]
pub async fn mark(
    state: &AppState,
    cmd: MarkCommand,
    marked_by: Uuid,
) -> AppResult<AttendanceRecord> {
    let student = find_student(state, cmd.student_id).await?;
    let record = state
        .attendance
        .upsert(AttendanceMark {
            student_id: student.id,
            date: cmd.date,
            status: cmd.status,
            marked_by,
            marked_at: OffsetDateTime::now_utc(),
        })
        .await?;
    info!(
        student_id = %record.student_id,
        date = %record.date,
        status = ?record.status,
        marked_by = %record.marked_by,
        "attendance marked"
    );
    Ok(record)
}

/// Check a student in as present today from an RFID tag.
#[instrument(skip(state))]
pub async fn mark_from_tag(state: &AppState, tag: &str) -> AppResult<(User, AttendanceRecord)> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(AppError::invalid("RFID tag required"));
    }

    let student = match state.users.find_by_rfid(tag).await? {
        Some(user) if user.is_student() => user,
        _ => {
            warn!(tag = %tag, "unknown rfid tag");
            return Err(AppError::not_found("Student not registered with this RFID"));
        }
    };

    let now = OffsetDateTime::now_utc();
    let record = state
        .attendance
        .upsert(AttendanceMark {
            student_id: student.id,
            date: day_of(now),
            status: AttendanceStatus::Present,
            marked_by: student.id,
            marked_at: now,
        })
        .await?;
    info!(student_id = %student.id, date = %record.date, "rfid check-in");
    Ok((student, record))
}

pub async fn get_by_student(state: &AppState, student_id: Uuid) -> AppResult<Vec<AttendanceRecord>> {
    let student = find_student(state, student_id).await?;
    Ok(state.attendance.list_by_student(student.id).await?)
}

pub async fn get_by_date(state: &AppState, date: Date) -> AppResult<Vec<DailyAttendanceRow>> {
    Ok(state.attendance.list_by_date(date).await?)
}

pub async fn get_summary(state: &AppState, student_id: Uuid) -> AppResult<(User, AttendanceSummary)> {
    let student = find_student(state, student_id).await?;
    let tally = state.attendance.tally(student.id).await?;
    Ok((student, tally.into()))
}
