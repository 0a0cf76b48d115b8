//! Durable refresh session records.
//!
//! One row per outstanding refresh token. Access tokens are stateless and
//! never stored. Timestamps are Unix seconds.

use sqlx::sqlite::SqlitePool;

/// A stored refresh session.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshSession {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: i64,
    pub created_at: i64,
}

impl RefreshSession {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now as i64
    }
}

#[derive(Clone)]
pub struct RefreshSessionStore {
    pool: SqlitePool,
}

impl RefreshSessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a newly issued refresh token.
    pub async fn create(
        &self,
        user_id: i64,
        token: &str,
        expires_at: u64,
        created_at: u64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO refresh_sessions (user_id, token, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at as i64)
        .bind(created_at as i64)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Option<RefreshSession>, sqlx::Error> {
        sqlx::query_as::<_, RefreshSession>(
            "SELECT id, user_id, token, expires_at, created_at FROM refresh_sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Delete a session by token. Returns false if no row matched, which
    /// means another request consumed it first.
    pub async fn delete_by_token(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a session only if it belongs to the given user.
    pub async fn delete_for_user(&self, user_id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = ? AND token = ?")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session of a user (logout everywhere).
    pub async fn delete_all_by_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete all sessions whose expiry is at or before `now`.
    pub async fn delete_expired(&self, now: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at <= ?")
            .bind(now as i64)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
