use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Clone)]
pub struct BumpRecord {
    pub user_id: String,
    pub scope_id: String,
    pub count: i64,
    pub first_bumped_at: DateTime<Utc>,
    pub last_bumped_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        // Ensure the database directory exists
        if let Some(parent) = database_file(database_url).and_then(|path| path.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }
        }

        // Plain `sqlite:path` URLs don't create the file on their own
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        Self::create_tables(&pool).await?;

        info!("Database connected and bumps table verified");

        Ok(Database { pool })
    }

    #[cfg(test)]
    /// Single-connection in-memory database. Every connection to `sqlite::memory:`
    /// gets its own database, so the pool must never open a second one.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::create_tables(&pool).await?;

        Ok(Database { pool })
    }

    #[cfg(test)]
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn create_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bumps (
                user_id TEXT NOT NULL,
                scope_id TEXT NOT NULL,
                count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
                first_bumped_at DATETIME NOT NULL,
                last_bumped_at DATETIME NOT NULL,
                PRIMARY KEY (user_id, scope_id)
            )
            "#
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_bumps_scope_count ON bumps(scope_id, count DESC)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Records one bump and returns the new total. The insert-or-increment is a
    /// single statement so concurrent bumps for the same key can't lose updates.
    pub async fn increment(&self, user_id: &str, scope_id: &str) -> Result<i64, sqlx::Error> {
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO bumps (user_id, scope_id, count, first_bumped_at, last_bumped_at)
            VALUES (?, ?, 1, ?, ?)
            ON CONFLICT(user_id, scope_id)
            DO UPDATE SET count = bumps.count + 1, last_bumped_at = excluded.last_bumped_at
            RETURNING count
            "#
        )
        .bind(user_id)
        .bind(scope_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("count"))
    }

    pub async fn get(&self, user_id: &str, scope_id: &str) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT count FROM bumps WHERE user_id = ? AND scope_id = ?")
            .bind(user_id)
            .bind(scope_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("count")).unwrap_or(0))
    }

    pub async fn get_record(&self, user_id: &str, scope_id: &str) -> Result<Option<BumpRecord>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT user_id, scope_id, count, first_bumped_at, last_bumped_at FROM bumps WHERE user_id = ? AND scope_id = ?"
        )
        .bind(user_id)
        .bind(scope_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| BumpRecord {
            user_id: row.get("user_id"),
            scope_id: row.get("scope_id"),
            count: row.get("count"),
            first_bumped_at: row.get("first_bumped_at"),
            last_bumped_at: row.get("last_bumped_at"),
        }))
    }

    /// Highest counts in a scope. Ties keep insertion order.
    pub async fn top(&self, scope_id: &str, limit: u32) -> Result<Vec<(String, i64)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT user_id, count
            FROM bumps
            WHERE scope_id = ?
            ORDER BY count DESC, rowid ASC
            LIMIT ?
            "#
        )
        .bind(scope_id)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut leaderboard = Vec::new();
        for row in rows {
            let user_id: String = row.get("user_id");
            let count: i64 = row.get("count");
            leaderboard.push((user_id, count));
        }

        Ok(leaderboard)
    }
}

/// Filesystem path behind a `sqlite:` URL, `None` for in-memory databases.
fn database_file(database_url: &str) -> Option<&Path> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);
    let path = path.split('?').next().unwrap_or(path);

    if path.is_empty() || path.starts_with(":memory:") || path == "memory:" {
        None
    } else {
        Some(Path::new(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_first_increment_creates_record() {
        let db = test_db().await;

        assert_eq!(db.increment("u1", "g1").await.unwrap(), 1);
        assert_eq!(db.get("u1", "g1").await.unwrap(), 1);

        let record = db.get_record("u1", "g1").await.unwrap().unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.first_bumped_at, record.last_bumped_at);
    }

    #[tokio::test]
    async fn test_increment_returns_running_total() {
        let db = test_db().await;

        assert_eq!(db.increment("u1", "g1").await.unwrap(), 1);
        assert_eq!(db.increment("u1", "g1").await.unwrap(), 2);
        assert_eq!(db.increment("u1", "g1").await.unwrap(), 3);

        let record = db.get_record("u1", "g1").await.unwrap().unwrap();
        assert!(record.last_bumped_at >= record.first_bumped_at);
    }

    #[tokio::test]
    async fn test_scopes_are_independent() {
        let db = test_db().await;

        db.increment("u1", "g1").await.unwrap();
        db.increment("u1", "g1").await.unwrap();
        db.increment("u1", "g2").await.unwrap();

        assert_eq!(db.get("u1", "g1").await.unwrap(), 2);
        assert_eq!(db.get("u1", "g2").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unknown_key_reads_zero() {
        let db = test_db().await;

        assert_eq!(db.get("nobody", "nowhere").await.unwrap(), 0);
        assert!(db.get_record("nobody", "nowhere").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_increments_lose_nothing() {
        let db = test_db().await;
        db.increment("u1", "g1").await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let db = db.clone();
            handles.push(tokio::spawn(async move { db.increment("u1", "g1").await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(db.get("u1", "g1").await.unwrap(), 51);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_on_pooled_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("bumps.db").display());
        let db = Database::new(&url).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..200 {
            let db = db.clone();
            handles.push(tokio::spawn(async move { db.increment("u1", "g1").await }));
        }

        let mut totals = Vec::new();
        for handle in handles {
            totals.push(handle.await.unwrap().unwrap());
        }
        totals.sort_unstable();

        // Every caller saw a distinct total, so no two upserts read the same count
        assert_eq!(totals, (1..=200).collect::<Vec<i64>>());
        assert_eq!(db.get("u1", "g1").await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_new_creates_missing_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bumps.db");
        let url = format!("sqlite:{}", path.display());

        let db = Database::new(&url).await.unwrap();
        assert!(path.exists());
        assert_eq!(db.increment("u1", "g1").await.unwrap(), 1);
        db.close().await;

        let reopened = Database::new(&url).await.unwrap();
        assert_eq!(reopened.get("u1", "g1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_top_is_ordered_and_limited() {
        let db = test_db().await;

        for (user, bumps) in [("a", 2), ("b", 5), ("c", 1), ("d", 5), ("e", 3)] {
            for _ in 0..bumps {
                db.increment(user, "g1").await.unwrap();
            }
        }
        db.increment("z", "other").await.unwrap();

        let top = db.top("g1", 3).await.unwrap();
        assert_eq!(
            top,
            vec![("b".to_string(), 5), ("d".to_string(), 5), ("e".to_string(), 3)]
        );

        let all = db.top("g1", 10).await.unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|pair| pair[0].1 >= pair[1].1));
    }

    #[tokio::test]
    async fn test_top_on_empty_scope() {
        let db = test_db().await;
        assert!(db.top("g1", 10).await.unwrap().is_empty());
    }

    #[test]
    fn test_database_file_paths() {
        assert_eq!(database_file("sqlite:bumps.db?mode=rwc"), Some(Path::new("bumps.db")));
        assert_eq!(database_file("sqlite://data/bumps.db"), Some(Path::new("data/bumps.db")));
        assert_eq!(database_file("sqlite::memory:"), None);
    }
}
