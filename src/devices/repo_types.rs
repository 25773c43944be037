use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// An RFID reader allowed to submit check-ins.
#[derive(Debug, Clone, FromRow)]
pub struct Device {
    pub id: Uuid,
    pub device_id: String,
    pub secret_hash: String, // Argon2 hash of the shared secret
    pub created_at: OffsetDateTime,
}
