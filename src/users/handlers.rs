use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::{AuthUser, Staff},
    error::{AppError, AppResult},
    extract::JsonBody,
    state::AppState,
    users::{
        dto::{AssignRfidRequest, AssignRfidResponse, MeResponse, StudentsResponse},
        services,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users", get(list_students))
}

pub fn rfid_routes() -> Router<AppState> {
    Router::new().route("/attendance/users/:id/assign-rfid", post(assign_rfid))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<MeResponse>> {
    let user = state
        .users
        .find_by_id(auth.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(Json(MeResponse { user: user.into() }))
}

#[instrument(skip(state))]
pub async fn list_students(
    State(state): State<AppState>,
    Staff(_caller): Staff,
) -> AppResult<Json<StudentsResponse>> {
    let students = services::list_students(&state).await?;
    Ok(Json(StudentsResponse {
        students: students.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn assign_rfid(
    State(state): State<AppState>,
    Staff(_caller): Staff,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<AssignRfidRequest>,
) -> AppResult<Json<AssignRfidResponse>> {
    let tag = payload
        .rfid
        .ok_or_else(|| AppError::invalid("RFID required"))?;
    let student_id = services::parse_id(&id, "ID")?;
    let student = services::assign_rfid(&state, student_id, &tag).await?;
    Ok(Json(AssignRfidResponse {
        message: "RFID assigned",
        student: student.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::{NewUser, Role, User};

    async fn seed(state: &AppState, email: &str, role: Role, roll: Option<&str>) -> User {
        state
            .users
            .create(NewUser {
                name: email.into(),
                email: email.into(),
                password_hash: "x".into(),
                role,
                roll_number: roll.map(Into::into),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn me_returns_caller_without_password() {
        let state = AppState::fake();
        let user = seed(&state, "me@school.test", Role::Student, Some("7")).await;
        let Json(res) = get_me(
            State(state.clone()),
            AuthUser { id: user.id, role: user.role },
        )
        .await
        .unwrap();
        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(json["user"]["email"], "me@school.test");
        assert_eq!(json["user"]["rollNumber"], "7");
        assert!(json["user"].get("passwordHash").is_none());
        assert!(json["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn list_students_excludes_staff() {
        let state = AppState::fake();
        let teacher = seed(&state, "t@school.test", Role::Teacher, None).await;
        seed(&state, "s1@school.test", Role::Student, Some("1")).await;
        seed(&state, "s2@school.test", Role::Student, Some("2")).await;
        let Json(res) = list_students(
            State(state.clone()),
            Staff(AuthUser { id: teacher.id, role: teacher.role }),
        )
        .await
        .unwrap();
        assert_eq!(res.students.len(), 2);
        assert!(res.students.iter().all(|s| s.role == Role::Student));
    }

    #[tokio::test]
    async fn assign_rfid_requires_body_field() {
        let state = AppState::fake();
        let teacher = seed(&state, "t@school.test", Role::Teacher, None).await;
        let student = seed(&state, "s@school.test", Role::Student, None).await;
        let caller = Staff(AuthUser { id: teacher.id, role: teacher.role });

        let err = assign_rfid(
            State(state.clone()),
            caller,
            Path(student.id.to_string()),
            JsonBody(AssignRfidRequest { rfid: None }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "RFID required");

        let Json(res) = assign_rfid(
            State(state.clone()),
            caller,
            Path(student.id.to_string()),
            JsonBody(AssignRfidRequest { rfid: Some("TAG7".into()) }),
        )
        .await
        .unwrap();
        assert_eq!(res.student.rfid_tag.as_deref(), Some("TAG7"));
    }
}
