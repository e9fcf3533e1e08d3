//! Revoked access-token identifiers.
//!
//! An entry outlives its usefulness once the token it neutralizes has
//! itself expired, so every entry carries the token's expiry horizon and
//! the cleanup sweep reclaims it after that point.

use sqlx::sqlite::SqlitePool;

/// Store for blacklisted access-token jtis.
pub struct BlacklistStore {
    pool: SqlitePool,
}

impl BlacklistStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Blacklist a token identifier until `expires_at_unix`.
    /// Inserting an already-blacklisted jti is a no-op.
    pub async fn insert(
        &self,
        jti: &str,
        user_id: &str,
        expires_at_unix: u64,
        reason: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO token_blacklist (jti, user_id, reason, expires_at) \
             VALUES (?, ?, ?, datetime(?, 'unixepoch')) \
             ON CONFLICT(jti) DO NOTHING",
        )
        .bind(jti)
        .bind(user_id)
        .bind(reason)
        .bind(expires_at_unix as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Check whether a token identifier has been revoked.
    pub async fn is_blacklisted(&self, jti: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM token_blacklist WHERE jti = ?")
            .bind(jti)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Delete entries whose token has itself expired.
    /// Exactly-at-expiry counts as expired.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::Database;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unix_now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[tokio::test]
    async fn test_insert_and_check() {
        let db = Database::open(":memory:").await.unwrap();

        assert!(!db.blacklist().is_blacklisted("jti-1").await.unwrap());

        db.blacklist()
            .insert("jti-1", "user-1", unix_now() + 900, Some("user logout"))
            .await
            .unwrap();

        assert!(db.blacklist().is_blacklisted("jti-1").await.unwrap());
        assert!(!db.blacklist().is_blacklisted("jti-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let db = Database::open(":memory:").await.unwrap();

        let exp = unix_now() + 900;
        db.blacklist()
            .insert("jti-1", "user-1", exp, Some("user logout"))
            .await
            .unwrap();
        // Re-revoking the same jti must not error.
        db.blacklist()
            .insert("jti-1", "user-1", exp, None)
            .await
            .unwrap();

        assert!(db.blacklist().is_blacklisted("jti-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_expired_boundary() {
        let db = Database::open(":memory:").await.unwrap();
        let now = unix_now();

        db.blacklist()
            .insert("jti-live", "user-1", now + 900, None)
            .await
            .unwrap();
        db.blacklist()
            .insert("jti-boundary", "user-1", now, None)
            .await
            .unwrap();
        db.blacklist()
            .insert("jti-old", "user-1", now - 900, None)
            .await
            .unwrap();

        assert_eq!(db.blacklist().delete_expired().await.unwrap(), 2);
        assert!(db.blacklist().is_blacklisted("jti-live").await.unwrap());
        assert!(!db.blacklist().is_blacklisted("jti-old").await.unwrap());
    }
}
