use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    state::AppState,
    users::{
        repo::TAG_TAKEN,
        repo_types::{Role, User},
    },
};

pub fn parse_id(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::invalid(format!("Invalid {what}")))
}

/// Resolve an id to a user holding the student role.
pub async fn find_student(state: &AppState, id: Uuid) -> AppResult<User> {
    match state.users.find_by_id(id).await? {
        Some(user) if user.is_student() => Ok(user),
        _ => Err(AppError::not_found("Student not found")),
    }
}

pub async fn list_students(state: &AppState) -> AppResult<Vec<User>> {
    Ok(state.users.list_by_role(Role::Student).await?)
}

/// Attach an RFID tag to a student. Touches nothing else.
pub async fn assign_rfid(state: &AppState, student_id: Uuid, tag: &str) -> AppResult<User> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(AppError::invalid("RFID required"));
    }

    let student = find_student(state, student_id).await?;

    if let Some(owner) = state.users.find_by_rfid(tag).await? {
        if owner.id != student.id {
            warn!(student_id = %student.id, owner_id = %owner.id, "rfid tag already assigned");
            return Err(AppError::Conflict(TAG_TAKEN.into()));
        }
    }

    let updated = state
        .users
        .set_rfid(student.id, tag)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))?;
    info!(student_id = %updated.id, "rfid tag assigned");
    Ok(updated)
}
