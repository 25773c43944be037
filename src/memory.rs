//! In-memory repositories backing `AppState::fake()`.
//!
//! Mirrors the Postgres constraints that the services rely on: one
//! attendance row per (student, day), unique email and RFID tag.

use std::{cmp::Ordering, collections::HashMap};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::attendance::repo::AttendanceRepo;
use crate::attendance::repo_types::{
    AttendanceMark, AttendanceRecord, AttendanceStatus, AttendanceTally, DailyAttendanceRow,
};
use crate::devices::{
    repo::{DeviceRegistry, DEVICE_TAKEN},
    repo_types::Device,
};
use crate::error::Duplicate;
use crate::users::repo::{UserDirectory, EMAIL_TAKEN, TAG_TAKEN};
use crate::users::repo_types::{NewUser, Role, User};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    attendance: HashMap<(Uuid, Date), AttendanceRecord>,
    devices: HashMap<String, Device>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// ORDER BY roll_number ASC NULLS LAST
fn by_roll_number(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn create(&self, user: NewUser) -> anyhow::Result<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(Duplicate(EMAIL_TAKEN).into());
        }
        let now = OffsetDateTime::now_utc();
        let row = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            roll_number: user.roll_number,
            rfid_tag: None,
            created_at: now,
            updated_at: now,
        };
        t.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn find_by_rfid(&self, tag: &str) -> anyhow::Result<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.rfid_tag.as_deref() == Some(tag)).cloned())
    }

    async fn list_by_role(&self, role: Role) -> anyhow::Result<Vec<User>> {
        let t = self.tables.read().await;
        let mut rows: Vec<User> = t.users.values().filter(|u| u.role == role).cloned().collect();
        rows.sort_by(|a, b| {
            by_roll_number(&a.roll_number, &b.roll_number).then_with(|| a.name.cmp(&b.name))
        });
        Ok(rows)
    }

    async fn set_rfid(&self, id: Uuid, tag: &str) -> anyhow::Result<Option<User>> {
        let mut t = self.tables.write().await;
        if t
            .users
            .values()
            .any(|u| u.id != id && u.rfid_tag.as_deref() == Some(tag))
        {
            return Err(Duplicate(TAG_TAKEN).into());
        }
        Ok(t.users.get_mut(&id).map(|u| {
            u.rfid_tag = Some(tag.to_string());
            u.updated_at = OffsetDateTime::now_utc();
            u.clone()
        }))
    }
}

#[async_trait]
impl AttendanceRepo for MemoryStore {
    async fn upsert(&self, mark: AttendanceMark) -> anyhow::Result<AttendanceRecord> {
        let mut t = self.tables.write().await;
        let record = t
            .attendance
            .entry((mark.student_id, mark.date))
            .and_modify(|r| {
                r.status = mark.status;
                r.marked_by = mark.marked_by;
                r.marked_at = mark.marked_at;
                r.updated_at = mark.marked_at;
            })
            .or_insert_with(|| AttendanceRecord {
                id: Uuid::new_v4(),
                student_id: mark.student_id,
                date: mark.date,
                status: mark.status,
                marked_by: mark.marked_by,
                marked_at: mark.marked_at,
                created_at: mark.marked_at,
                updated_at: mark.marked_at,
            });
        Ok(record.clone())
    }

    async fn list_by_student(&self, student_id: Uuid) -> anyhow::Result<Vec<AttendanceRecord>> {
        let t = self.tables.read().await;
        let mut rows: Vec<AttendanceRecord> = t
            .attendance
            .values()
            .filter(|r| r.student_id == student_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }

    async fn list_by_date(&self, date: Date) -> anyhow::Result<Vec<DailyAttendanceRow>> {
        let t = self.tables.read().await;
        let mut rows = Vec::new();
        for record in t.attendance.values().filter(|r| r.date == date) {
            let (Some(student), Some(marker)) =
                (t.users.get(&record.student_id), t.users.get(&record.marked_by))
            else {
                continue;
            };
            rows.push(DailyAttendanceRow {
                record: record.clone(),
                student_name: student.name.clone(),
                student_email: student.email.clone(),
                student_roll_number: student.roll_number.clone(),
                marker_name: marker.name.clone(),
                marker_email: marker.email.clone(),
                marker_role: marker.role,
            });
        }
        rows.sort_by(|a, b| {
            by_roll_number(&a.student_roll_number, &b.student_roll_number)
                .then_with(|| a.student_name.cmp(&b.student_name))
        });
        Ok(rows)
    }

    async fn tally(&self, student_id: Uuid) -> anyhow::Result<AttendanceTally> {
        let t = self.tables.read().await;
        let mut tally = AttendanceTally::default();
        for r in t.attendance.values().filter(|r| r.student_id == student_id) {
            tally.total += 1;
            if r.status == AttendanceStatus::Present {
                tally.present += 1;
            }
        }
        Ok(tally)
    }
}

#[async_trait]
impl DeviceRegistry for MemoryStore {
    async fn register(&self, device_id: &str, secret_hash: &str) -> anyhow::Result<Device> {
        let mut t = self.tables.write().await;
        if t.devices.contains_key(device_id) {
            return Err(Duplicate(DEVICE_TAKEN).into());
        }
        let device = Device {
            id: Uuid::new_v4(),
            device_id: device_id.to_string(),
            secret_hash: secret_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.devices.insert(device.device_id.clone(), device.clone());
        Ok(device)
    }

    async fn find_by_device_id(&self, device_id: &str) -> anyhow::Result<Option<Device>> {
        Ok(self.tables.read().await.devices.get(device_id).cloned())
    }
}
