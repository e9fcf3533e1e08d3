//! Persistent session records backing refresh secrets.
//!
//! One row per device/login event. The refresh secret is itself a
//! high-entropy random string, so it is stored as-is and used as the
//! direct lookup key. A row at or past `expires_at` is dead: it is
//! invisible to lookups and reclaimed by the cleanup sweep.

use sqlx::sqlite::SqlitePool;

/// An active session row.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: i64,
    pub uuid: String,
    pub user_id: String,
    pub refresh_secret: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
    pub last_used_at: String,
    pub expires_at: String,
}

type SessionRow = (
    i64,
    String,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
);

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        let (
            id,
            uuid,
            user_id,
            refresh_secret,
            user_agent,
            ip_address,
            created_at,
            last_used_at,
            expires_at,
        ) = row;
        Session {
            id,
            uuid,
            user_id,
            refresh_secret,
            user_agent,
            ip_address,
            created_at,
            last_used_at,
            expires_at,
        }
    }
}

const SESSION_COLUMNS: &str = "id, uuid, user_id, refresh_secret, user_agent, ip_address, \
                               created_at, last_used_at, expires_at";

/// Store for managing sessions.
pub struct SessionStore {
    pool: SqlitePool,
}

impl SessionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new session expiring `refresh_ttl_secs` from now.
    /// Returns the created row.
    pub async fn create(
        &self,
        user_id: &str,
        refresh_secret: &str,
        user_agent: Option<&str>,
        ip_address: Option<&str>,
        refresh_ttl_secs: u64,
    ) -> Result<Session, sqlx::Error> {
        let uuid = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO sessions (uuid, user_id, refresh_secret, user_agent, ip_address, expires_at) \
             VALUES (?, ?, ?, ?, ?, datetime('now', '+' || ? || ' seconds'))",
        )
        .bind(&uuid)
        .bind(user_id)
        .bind(refresh_secret)
        .bind(user_agent)
        .bind(ip_address)
        .bind(refresh_ttl_secs as i64)
        .execute(&self.pool)
        .await?;

        let row: SessionRow = sqlx::query_as(&format!(
            "SELECT {} FROM sessions WHERE uuid = ?",
            SESSION_COLUMNS
        ))
        .bind(&uuid)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    /// Find an unexpired session by its refresh secret.
    ///
    /// A row at or past its expiry never resolves, even before the cleanup
    /// sweep has reclaimed it.
    pub async fn find_by_refresh_secret(
        &self,
        refresh_secret: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        let row: Option<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sessions WHERE refresh_secret = ? AND expires_at > datetime('now')",
            SESSION_COLUMNS
        ))
        .bind(refresh_secret)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Session::from))
    }

    /// Update a session's last-used timestamp.
    pub async fn touch(&self, session_uuid: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sessions SET last_used_at = datetime('now') WHERE uuid = ?")
            .bind(session_uuid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete the session holding the given refresh secret.
    /// Returns whether a row was deleted.
    pub async fn delete_by_refresh_secret(
        &self,
        refresh_secret: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE refresh_secret = ?")
            .bind(refresh_secret)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session owned by a user (logout everywhere).
    pub async fn delete_all_for_user(&self, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete all expired sessions. Exactly-at-expiry counts as expired.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= datetime('now')")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// List a user's unexpired sessions, newest first.
    pub async fn list_active_for_user(&self, user_id: &str) -> Result<Vec<Session>, sqlx::Error> {
        let rows: Vec<SessionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM sessions WHERE user_id = ? AND expires_at > datetime('now') \
             ORDER BY created_at DESC",
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Session::from).collect())
    }
}
