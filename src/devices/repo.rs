use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::{db::unique_or, devices::repo_types::Device, error::Duplicate};

pub const DEVICE_TAKEN: &str = "Device already registered";

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn register(&self, device_id: &str, secret_hash: &str) -> anyhow::Result<Device>;
    async fn find_by_device_id(&self, device_id: &str) -> anyhow::Result<Option<Device>>;
}

#[derive(Clone)]
pub struct PgDeviceRegistry {
    db: PgPool,
}

impl PgDeviceRegistry {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeviceRegistry for PgDeviceRegistry {
    async fn register(&self, device_id: &str, secret_hash: &str) -> anyhow::Result<Device> {
        let device = sqlx::query_as::<_, Device>(
            r#"
            INSERT INTO devices (device_id, secret_hash)
            VALUES ($1, $2)
            RETURNING id, device_id, secret_hash, created_at
            "#,
        )
        .bind(device_id)
        .bind(secret_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| unique_or(e, Duplicate(DEVICE_TAKEN), "insert device"))?;
        Ok(device)
    }

    async fn find_by_device_id(&self, device_id: &str) -> anyhow::Result<Option<Device>> {
        let device = sqlx::query_as::<_, Device>(
            r#"
            SELECT id, device_id, secret_hash, created_at
            FROM devices
            WHERE device_id = $1
            "#,
        )
        .bind(device_id)
        .fetch_optional(&self.db)
        .await
        .context("find device")?;
        Ok(device)
    }
}
