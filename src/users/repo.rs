use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::unique_or,
    error::Duplicate,
    users::repo_types::{NewUser, Role, User},
};

pub const EMAIL_TAKEN: &str = "Email already in use";
pub const TAG_TAKEN: &str = "RFID tag already assigned";

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, roll_number, rfid_tag, created_at, updated_at";

/// Account lookups and the few writes the service performs on users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create(&self, user: NewUser) -> anyhow::Result<User>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_rfid(&self, tag: &str) -> anyhow::Result<Option<User>>;
    /// Users holding `role`, ordered by roll number then name.
    async fn list_by_role(&self, role: Role) -> anyhow::Result<Vec<User>>;
    async fn set_rfid(&self, id: Uuid, tag: &str) -> anyhow::Result<Option<User>>;
}

#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn create(&self, user: NewUser) -> anyhow::Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, roll_number)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(&user.roll_number)
            .fetch_one(&self.db)
            .await
            .map_err(|e| unique_or(e, Duplicate(EMAIL_TAKEN), "insert user"))?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_rfid(&self, tag: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE rfid_tag = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(tag)
            .fetch_optional(&self.db)
            .await
            .context("find user by rfid tag")?;
        Ok(user)
    }

    async fn list_by_role(&self, role: Role) -> anyhow::Result<Vec<User>> {
        let sql = format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE role = $1
             ORDER BY roll_number ASC NULLS LAST, name ASC
            "#
        );
        let rows = sqlx::query_as::<_, User>(&sql)
            .bind(role)
            .fetch_all(&self.db)
            .await
            .context("list users by role")?;
        Ok(rows)
    }

    async fn set_rfid(&self, id: Uuid, tag: &str) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET rfid_tag = $2, updated_at = now()
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(tag)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| unique_or(e, Duplicate(TAG_TAKEN), "assign rfid tag"))?;
        Ok(user)
    }
}
