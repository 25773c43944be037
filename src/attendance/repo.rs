use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use crate::attendance::repo_types::{
    AttendanceMark, AttendanceRecord, AttendanceTally, DailyAttendanceRow,
};

#[async_trait]
pub trait AttendanceRepo: Send + Sync {
    /// Insert or overwrite the record for (student_id, date). Last write wins.
    async fn upsert(&self, mark: AttendanceMark) -> anyhow::Result<AttendanceRecord>;
    /// Every record of a student, oldest day first.
    async fn list_by_student(&self, student_id: Uuid) -> anyhow::Result<Vec<AttendanceRecord>>;
    async fn list_by_date(&self, date: Date) -> anyhow::Result<Vec<DailyAttendanceRow>>;
    async fn tally(&self, student_id: Uuid) -> anyhow::Result<AttendanceTally>;
}

#[derive(Clone)]
pub struct PgAttendanceRepo {
    db: PgPool,
}

impl PgAttendanceRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AttendanceRepo for PgAttendanceRepo {
    async fn upsert(&self, mark: AttendanceMark) -> anyhow::Result<AttendanceRecord> {
        let record = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            INSERT INTO attendance (student_id, date, status, marked_by, marked_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (student_id, date) DO UPDATE
               SET status = EXCLUDED.status,
                   marked_by = EXCLUDED.marked_by,
                   marked_at = EXCLUDED.marked_at,
                   updated_at = now()
            RETURNING id, student_id, date, status, marked_by, marked_at, created_at, updated_at
            "#,
        )
        .bind(mark.student_id)
        .bind(mark.date)
        .bind(mark.status)
        .bind(mark.marked_by)
        .bind(mark.marked_at)
        .fetch_one(&self.db)
        .await
        .context("upsert attendance")?;
        Ok(record)
    }

    async fn list_by_student(&self, student_id: Uuid) -> anyhow::Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRecord>(
            r#"
            SELECT id, student_id, date, status, marked_by, marked_at, created_at, updated_at
              FROM attendance
             WHERE student_id = $1
             ORDER BY date ASC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.db)
        .await
        .context("list attendance by student")?;
        Ok(rows)
    }

    async fn list_by_date(&self, date: Date) -> anyhow::Result<Vec<DailyAttendanceRow>> {
        let rows = sqlx::query_as::<_, DailyAttendanceRow>(
            r#"
            SELECT a.id, a.student_id, a.date, a.status, a.marked_by, a.marked_at,
                   a.created_at, a.updated_at,
                   s.name        AS student_name,
                   s.email       AS student_email,
                   s.roll_number AS student_roll_number,
                   m.name        AS marker_name,
                   m.email       AS marker_email,
                   m.role        AS marker_role
              FROM attendance a
              JOIN users s ON s.id = a.student_id
              JOIN users m ON m.id = a.marked_by
             WHERE a.date = $1
             ORDER BY s.roll_number ASC NULLS LAST, s.name ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.db)
        .await
        .context("list attendance by date")?;
        Ok(rows)
    }

    async fn tally(&self, student_id: Uuid) -> anyhow::Result<AttendanceTally> {
        let tally = sqlx::query_as::<_, AttendanceTally>(
            r#"
            SELECT COUNT(*)                                     AS total,
                   COUNT(*) FILTER (WHERE status = 'present')   AS present
              FROM attendance
             WHERE student_id = $1
            "#,
        )
        .bind(student_id)
        .fetch_one(&self.db)
        .await
        .context("tally attendance")?;
        Ok(tally)
    }
}
