use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{config::AppConfig, error::Duplicate};

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("connect to database")?;
    Ok(db)
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Turns a unique-constraint violation into `dup`; anything else keeps `what` as context.
pub fn unique_or(err: sqlx::Error, dup: Duplicate, what: &'static str) -> anyhow::Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => dup.into(),
        _ => anyhow::Error::new(err).context(what),
    }
}
