use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    attendance::{
        date::format_day,
        repo_types::{AttendanceRecord, AttendanceStatus, DailyAttendanceRow},
        services::AttendanceSummary,
    },
    users::repo_types::{Role, User},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRequest {
    pub student_id: Option<String>,
    pub date: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IotRequest {
    pub rfid: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceView {
    pub id: Uuid,
    pub student_id: Uuid,
    pub date: String,
    pub status: AttendanceStatus,
    pub marked_by: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub marked_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<AttendanceRecord> for AttendanceView {
    fn from(r: AttendanceRecord) -> Self {
        Self {
            id: r.id,
            student_id: r.student_id,
            date: format_day(r.date),
            status: r.status,
            marked_by: r.marked_by,
            marked_at: r.marked_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub roll_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkerRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// A record of a given day with the student and marker filled in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAttendanceView {
    pub id: Uuid,
    pub date: String,
    pub status: AttendanceStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub marked_at: OffsetDateTime,
    pub student: StudentRef,
    pub marked_by: MarkerRef,
}

impl From<DailyAttendanceRow> for DailyAttendanceView {
    fn from(row: DailyAttendanceRow) -> Self {
        let r = row.record;
        Self {
            id: r.id,
            date: format_day(r.date),
            status: r.status,
            marked_at: r.marked_at,
            student: StudentRef {
                id: r.student_id,
                name: row.student_name,
                email: row.student_email,
                roll_number: row.student_roll_number,
            },
            marked_by: MarkerRef {
                id: r.marked_by,
                name: row.marker_name,
                email: row.marker_email,
                role: row.marker_role,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MarkResponse {
    pub attendance: AttendanceView,
}

#[derive(Debug, Serialize)]
pub struct IotResponse {
    pub message: &'static str,
    pub attendance: AttendanceView,
}

#[derive(Debug, Serialize)]
pub struct RecordsResponse<T> {
    pub records: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStudent {
    pub id: Uuid,
    pub name: String,
    pub roll_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub student: SummaryStudent,
    pub total_days: i64,
    pub present_days: i64,
    pub absent_days: i64,
    pub percentage: f64,
}

impl SummaryResponse {
    pub fn new(student: User, summary: AttendanceSummary) -> Self {
        Self {
            student: SummaryStudent {
                id: student.id,
                name: student.name,
                roll_number: student.roll_number,
            },
            total_days: summary.total_days,
            present_days: summary.present_days,
            absent_days: summary.absent_days,
            percentage: summary.percentage,
        }
    }
}
