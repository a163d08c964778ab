use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

use shared::protocol::User;

/// Durable client-side session state: the bearer token pair plus the
/// serialized user that owns them. One row per database; saving replaces the
/// previous session, clearing removes it entirely.
#[derive(Clone)]
pub struct SessionStore {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

#[derive(Debug, Clone)]
pub struct StoredSession {
    pub session: PersistedSession,
    pub updated_at: DateTime<Utc>,
}

impl SessionStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn save(&self, session: &PersistedSession) -> Result<()> {
        let user_json =
            serde_json::to_string(&session.user).context("failed to serialize session user")?;
        sqlx::query(
            "INSERT INTO session (id, access_token, refresh_token, user_json, updated_at)
             VALUES (1, ?, ?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(id) DO UPDATE SET
               access_token = excluded.access_token,
               refresh_token = excluded.refresh_token,
               user_json = excluded.user_json,
               updated_at = excluded.updated_at",
        )
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(&user_json)
        .execute(&self.pool)
        .await
        .context("failed to persist session")?;
        Ok(())
    }

    /// Replaces only the token pair, keeping the stored user. No-op when no
    /// session row exists (a refresh without a login has nothing to update).
    pub async fn update_tokens(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        sqlx::query(
            "UPDATE session SET access_token = ?, refresh_token = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = 1",
        )
        .bind(access_token)
        .bind(refresh_token)
        .execute(&self.pool)
        .await
        .context("failed to update session tokens")?;
        Ok(())
    }

    pub async fn load(&self) -> Result<Option<StoredSession>> {
        let row = sqlx::query(
            "SELECT access_token, refresh_token, user_json, updated_at FROM session WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("failed to load session")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user_json: String = row.get(2);
        let user: User =
            serde_json::from_str(&user_json).context("stored session user is not valid JSON")?;
        let updated_at: String = row.get(3);
        let updated_at = updated_at
            .parse::<DateTime<Utc>>()
            .or_else(|_| {
                // SQLite's CURRENT_TIMESTAMP carries no timezone suffix.
                chrono::NaiveDateTime::parse_from_str(&updated_at, "%Y-%m-%d %H:%M:%S")
                    .map(|naive| naive.and_utc())
            })
            .context("stored session timestamp is unreadable")?;

        Ok(Some(StoredSession {
            session: PersistedSession {
                access_token: row.get(0),
                refresh_token: row.get(1),
                user,
            },
            updated_at,
        }))
    }

    /// Removes the session row. A single DELETE, so tokens and user vanish
    /// together or not at all.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM session WHERE id = 1")
            .execute(&self.pool)
            .await
            .context("failed to clear session")?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
