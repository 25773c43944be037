use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        extractors::Admin,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    devices::{
        dto::{DeviceCredentials, DeviceTokenResponse, DeviceView},
        repo::DEVICE_TAKEN,
    },
    error::{AppError, AppResult},
    extract::JsonBody,
    state::AppState,
};

pub fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/device/login", post(login))
        .route("/device/register", post(register))
}

fn credentials(body: DeviceCredentials) -> AppResult<(String, String)> {
    match (
        body.device_id.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
        body.secret.filter(|s| !s.is_empty()),
    ) {
        (Some(device_id), Some(secret)) => Ok((device_id, secret)),
        _ => Err(AppError::invalid("deviceId and secret are required")),
    }
}

/// Provision a reader. Admin only.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Admin(caller): Admin,
    JsonBody(payload): JsonBody<DeviceCredentials>,
) -> AppResult<(StatusCode, Json<DeviceView>)> {
    let (device_id, secret) = credentials(payload)?;

    if state.devices.find_by_device_id(&device_id).await?.is_some() {
        return Err(AppError::Conflict(DEVICE_TAKEN.into()));
    }

    let secret_hash = hash_password(&secret)?;
    let device = state.devices.register(&device_id, &secret_hash).await?;
    info!(device_id = %device.device_id, admin_id = %caller.id, "device registered");
    Ok((StatusCode::CREATED, Json(device.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<DeviceCredentials>,
) -> AppResult<Json<DeviceTokenResponse>> {
    let (device_id, secret) = credentials(payload)?;

    let Some(device) = state.devices.find_by_device_id(&device_id).await? else {
        warn!(device_id = %device_id, "unknown device");
        return Err(AppError::not_found("Device not found"));
    };

    if !verify_password(&secret, &device.secret_hash)? {
        warn!(device_id = %device_id, "device login invalid secret");
        return Err(AppError::Unauthorized("Invalid secret".into()));
    }

    let token = JwtKeys::from_ref(&state).sign_device(device.id)?;
    info!(device_id = %device.device_id, "device logged in");
    Ok(Json(DeviceTokenResponse { token }))
}
