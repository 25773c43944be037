use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{Role, User};

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfid_tag: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            role: u.role,
            roll_number: u.roll_number,
            rfid_tag: u.rfid_tag,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct StudentsResponse {
    pub students: Vec<PublicUser>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRfidRequest {
    pub rfid: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignRfidResponse {
    pub message: &'static str,
    pub student: PublicUser,
}
