use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::{claims::TokenKind, jwt::JwtKeys},
    error::AppError,
    state::AppState,
    users::repo_types::Role,
};

/// Caller resolved from a bearer access token. The role comes from the
/// directory, not from the token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn require_any(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            warn!(user_id = %self.id, role = %self.role, "role not permitted");
            Err(AppError::Forbidden("Forbidden: insufficient role".into()))
        }
    }

    /// Students may only look at their own records.
    pub fn can_view_student(&self, student_id: Uuid) -> bool {
        self.role.is_staff() || self.id == student_id
    }
}

/// A teacher or admin.
#[derive(Debug, Clone, Copy)]
pub struct Staff(pub AuthUser);

/// An admin.
#[derive(Debug, Clone, Copy)]
pub struct Admin(pub AuthUser);

/// An RFID reader holding a device token.
#[derive(Debug, Clone, Copy)]
pub struct DeviceAuth {
    pub device_id: Uuid,
}

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = JwtKeys::from_ref(state)
            .verify_kind(token, TokenKind::Access)
            .map_err(|_| {
                warn!("invalid or expired token");
                AppError::Unauthorized("Invalid or expired token".into())
            })?;

        let user = state
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

        Ok(AuthUser {
            id: user.id,
            role: user.role,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Staff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require_any(&[Role::Teacher, Role::Admin])?;
        Ok(Staff(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        user.require_any(&[Role::Admin])?;
        Ok(Admin(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for DeviceAuth {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = JwtKeys::from_ref(state)
            .verify_kind(token, TokenKind::Device)
            .map_err(|_| {
                warn!("invalid or expired device token");
                AppError::Unauthorized("Invalid or expired device token".into())
            })?;
        Ok(DeviceAuth {
            device_id: claims.sub,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::{NewUser, User};
    use axum::http::{Request, StatusCode};

    async fn seed(state: &AppState, role: Role) -> User {
        state
            .users
            .create(NewUser {
                name: "Someone".into(),
                email: format!("{}@school.test", Uuid::new_v4()),
                password_hash: "x".into(),
                role,
                roll_number: None,
            })
            .await
            .unwrap()
    }

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = auth {
            builder = builder.header("Authorization", v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn resolves_user_from_access_token() {
        let state = AppState::fake();
        let user = seed(&state, Role::Teacher).await;
        let token = JwtKeys::from_ref(&state).sign_access(user.id).unwrap();

        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let auth = AuthUser::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(auth.id, user.id);
        assert_eq!(auth.role, Role::Teacher);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let state = AppState::fake();
        let mut parts = parts_with(None);
        let err = AuthUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted_as_access() {
        let state = AppState::fake();
        let user = seed(&state, Role::Student).await;
        let token = JwtKeys::from_ref(&state).sign_refresh(user.id).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let err = AuthUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_user_is_unauthorized() {
        let state = AppState::fake();
        let token = JwtKeys::from_ref(&state).sign_access(Uuid::new_v4()).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let err = AuthUser::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn student_is_forbidden_from_staff_routes() {
        let state = AppState::fake();
        let student = seed(&state, Role::Student).await;
        let token = JwtKeys::from_ref(&state).sign_access(student.id).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let err = Staff::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn teacher_is_staff_but_not_admin() {
        let state = AppState::fake();
        let teacher = seed(&state, Role::Teacher).await;
        let token = JwtKeys::from_ref(&state).sign_access(teacher.id).unwrap();
        let header = format!("Bearer {token}");

        let mut parts = parts_with(Some(&header));
        assert!(Staff::from_request_parts(&mut parts, &state).await.is_ok());
        let mut parts = parts_with(Some(&header));
        let err = Admin::from_request_parts(&mut parts, &state).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn device_guard_rejects_user_tokens() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user = seed(&state, Role::Admin).await;

        let user_token = keys.sign_access(user.id).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {user_token}")));
        assert!(DeviceAuth::from_request_parts(&mut parts, &state).await.is_err());

        let device = Uuid::new_v4();
        let device_token = keys.sign_device(device).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {device_token}")));
        let auth = DeviceAuth::from_request_parts(&mut parts, &state).await.unwrap();
        assert_eq!(auth.device_id, device);
    }

    #[test]
    fn students_only_view_themselves() {
        let me = Uuid::new_v4();
        let student = AuthUser { id: me, role: Role::Student };
        assert!(student.can_view_student(me));
        assert!(!student.can_view_student(Uuid::new_v4()));
        let teacher = AuthUser { id: Uuid::new_v4(), role: Role::Teacher };
        assert!(teacher.can_view_student(me));
    }
}
