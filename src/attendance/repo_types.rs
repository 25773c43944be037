use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::users::repo_types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "attendance_status", rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

/// One row of the `attendance` table. Unique per (student_id, date).
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub student_id: Uuid,
    pub date: Date,
    pub status: AttendanceStatus,
    pub marked_by: Uuid,
    pub marked_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Input for the upsert keyed on (student_id, date).
#[derive(Debug, Clone, Copy)]
pub struct AttendanceMark {
    pub student_id: Uuid,
    pub date: Date,
    pub status: AttendanceStatus,
    pub marked_by: Uuid,
    pub marked_at: OffsetDateTime,
}

/// Attendance row joined with the student and whoever marked it.
#[derive(Debug, Clone, FromRow)]
pub struct DailyAttendanceRow {
    #[sqlx(flatten)]
    pub record: AttendanceRecord,
    pub student_name: String,
    pub student_email: String,
    pub student_roll_number: Option<String>,
    pub marker_name: String,
    pub marker_email: String,
    pub marker_role: Role,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct AttendanceTally {
    pub total: i64,
    pub present: i64,
}
