use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use teloxide::types::UserId;

use crate::error::PersistenceError;
use crate::quiz::Level;

/// One finished quiz as stored in SQLite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub user: UserId,
    pub level: Level,
    pub score: u32,
    pub total: u32,
    pub created_at: DateTime<Utc>,
}

/// SQLite-backed archive of finished quizzes. Cheap to clone; clones share
/// one pool.
#[derive(Debug, Clone)]
pub struct ResultStore {
    pool: SqlitePool,
}

impl ResultStore {
    /// Opens a pool against `database_url` and applies the usual pragmas on
    /// every fresh connection.
    pub async fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the results table and its index. Safe to run on every start.
    pub async fn migrate(&self) -> Result<(), PersistenceError> {
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS results (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id INTEGER NOT NULL,
                    level TEXT NOT NULL,
                    score INTEGER NOT NULL CHECK (score >= 0),
                    total INTEGER NOT NULL CHECK (total >= score),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_results_user_created
                    ON results (user_id, created_at);
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Appends one finished quiz, stamped with the current time.
    pub async fn record(
        &self,
        user: UserId,
        level: Level,
        score: u32,
        total: u32,
    ) -> Result<(), PersistenceError> {
        sqlx::query(
            r"
                INSERT INTO results (user_id, level, score, total, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(user_to_i64(user)?)
        .bind(level.key())
        .bind(i64::from(score))
        .bind(i64::from(total))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The user's latest results, newest first.
    pub async fn recent_for(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, PersistenceError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, level, score, total, created_at
                FROM results
                WHERE user_id = ?1
                ORDER BY created_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(user_to_i64(user)?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }

    /// Leaderboard rows: every (user, level) pair's single best attempt,
    /// best score first. Ties go to the earlier attempt.
    pub async fn top_scores(&self, limit: u32) -> Result<Vec<QuizResult>, PersistenceError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, level, score, total, created_at
                FROM (
                    SELECT
                        user_id, level, score, total, created_at, id,
                        ROW_NUMBER() OVER (
                            PARTITION BY user_id, level
                            ORDER BY score DESC, created_at ASC, id ASC
                        ) AS rn
                    FROM results
                )
                WHERE rn = 1
                ORDER BY score DESC, created_at ASC, id ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row).collect()
    }
}

fn ser<E: std::fmt::Display>(e: E) -> PersistenceError {
    PersistenceError::Serialization(e.to_string())
}

fn user_to_i64(user: UserId) -> Result<i64, PersistenceError> {
    i64::try_from(user.0)
        .map_err(|_| PersistenceError::Serialization(format!("user id overflow: {}", user.0)))
}

fn column_u32(row: &SqliteRow, field: &'static str) -> Result<u32, PersistenceError> {
    let value: i64 = row.try_get(field).map_err(ser)?;
    u32::try_from(value)
        .map_err(|_| PersistenceError::Serialization(format!("invalid {field}: {value}")))
}

fn map_row(row: &SqliteRow) -> Result<QuizResult, PersistenceError> {
    let user_id: i64 = row.try_get("user_id").map_err(ser)?;
    let user = UserId(
        u64::try_from(user_id)
            .map_err(|_| PersistenceError::Serialization(format!("negative user_id: {user_id}")))?,
    );

    let level_str: String = row.try_get("level").map_err(ser)?;
    let level = level_str.parse::<Level>().map_err(ser)?;

    Ok(QuizResult {
        user,
        level,
        score: column_u32(row, "score")?,
        total: column_u32(row, "total")?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResultStore>();
    }
}
