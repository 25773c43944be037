use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    error::{AppError, AppResult},
    extract::JsonBody,
    state::AppState,
    users::{
        repo::EMAIL_TAKEN,
        repo_types::{NewUser, Role, User},
    },
};

const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn issue_tokens(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

fn required(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let (Some(name), Some(email), Some(password)) = (
        required(payload.name),
        required(payload.email),
        payload.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::invalid("name, email, password are required"));
    };
    let email = email.to_lowercase();

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::invalid("Invalid email"));
    }

    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::invalid("Password too short"));
    }

    let role = match payload.role.as_deref() {
        None => Role::Student,
        Some(raw) => raw.parse::<Role>().map_err(|_| {
            warn!(role = %raw, "role not allowed");
            AppError::invalid("role must be student, teacher or admin")
        })?,
    };

    if state.users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict(EMAIL_TAKEN.into()));
    }

    let password_hash = hash_password(&password)?;
    let roll_number = match role {
        Role::Student => required(payload.roll_number),
        _ => None,
    };

    let user = state
        .users
        .create(NewUser {
            name,
            email,
            password_hash,
            role,
            roll_number,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, role = %user.role, "user registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, user)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let (Some(email), Some(password)) = (required(payload.email), payload.password) else {
        return Err(AppError::invalid("email and password are required"));
    };
    let email = email.to_lowercase();

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    };

    if !verify_password(&password, &user.password_hash)? {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token = required(payload.refresh_token)
        .ok_or_else(|| AppError::invalid("refreshToken is required"))?;
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    Ok(Json(issue_tokens(&state, user)?))
}
