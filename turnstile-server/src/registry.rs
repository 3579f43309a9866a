//! SQLite-backed registry of redemption codes, usage counters, known users,
//! and the privileged-user set.
//!
//! The registry is the single durable store in the system. It uses explicit
//! relational columns and SQLite's `user_version` pragma to track schema
//! versions. Synchronous rusqlite operations run under
//! `tokio::task::spawn_blocking` so they never block the async runtime.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Current schema version. Increment when making schema changes.
///
/// When adding a new version:
/// 1. Increment this constant
/// 2. Add a migration function `migrate_v{N}_to_v{N+1}`
/// 3. Call it from `run_migrations`
const SCHEMA_VERSION: i32 = 1;

/// Opaque numeric identity of a user, as supplied by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Identifier of a content channel (`@name` or a raw chat id in text form).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ChannelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Newtype for a redemption code to prevent mixing with other strings.
/// Typically numeric text, but the registry treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Code(pub String);

impl Code {
    /// Numeric value of the code, used for display ordering of listings.
    /// Non-numeric codes sort after all numeric ones.
    pub fn numeric_value(&self) -> i64 {
        self.0.parse().unwrap_or(i64::MAX)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Code {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Code {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One redeemable content bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeEntry {
    pub code: Code,
    /// Channel holding the underlying content.
    pub channel: ChannelId,
    /// Sequence position of the first part within the source channel.
    pub pointer: i64,
    /// Number of sequential parts retrievable under this code. Always >= 1.
    pub part_count: u32,
    pub title: String,
}

/// Per-code usage counters. Both counters are monotonically non-decreasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageStats {
    /// Redemption attempts that reached the gate-check stage.
    pub searched: u64,
    /// Successful deliveries.
    pub viewed: u64,
}

/// Which usage counter to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatField {
    /// Ensure the stats row exists with zero counters. Idempotent; never
    /// resets an existing row.
    Init,
    Searched,
    Viewed,
}

/// Outcome of renaming a code entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    /// The old code does not exist.
    NotFound,
    /// The new code already identifies a different entry. The rename is not
    /// applied; merging two entries silently would corrupt both.
    Conflict,
}

impl fmt::Display for RenameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Renamed => write!(f, "renamed"),
            Self::NotFound => write!(f, "old code not found"),
            Self::Conflict => write!(f, "new code already in use"),
        }
    }
}

/// Handle to the registry database. Cloning is cheap; all clones share one
/// connection behind a mutex.
#[derive(Clone)]
pub struct Registry {
    conn: Arc<Mutex<Connection>>,
}

impl Registry {
    /// Open or create the registry database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open registry database at {:?}", path))?;
        Self::from_connection(conn)
    }

    /// In-memory registry, for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory registry database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let registry = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        registry.init_schema()?;
        Ok(registry)
    }

    /// Initialize the schema and run any pending migrations.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");

        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if current_version > SCHEMA_VERSION {
            anyhow::bail!(
                "Registry schema version {} is newer than supported version {}. \
                 Please upgrade the application.",
                current_version,
                SCHEMA_VERSION
            );
        }

        if current_version < SCHEMA_VERSION {
            Self::run_migrations(&conn, current_version)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }

        Ok(())
    }

    fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
        if from_version < 1 {
            Self::migrate_v0_to_v1(conn)?;
        }

        // Future migrations go here:
        // if from_version < 2 {
        //     Self::migrate_v1_to_v2(conn)?;
        // }

        Ok(())
    }

    /// Migration v0 -> v1: initial schema.
    fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS codes (
                code TEXT PRIMARY KEY,
                channel TEXT NOT NULL,
                pointer INTEGER NOT NULL,
                part_count INTEGER NOT NULL CHECK(part_count >= 1),
                title TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS stats (
                code TEXT PRIMARY KEY,
                searched INTEGER NOT NULL DEFAULT 0,
                viewed INTEGER NOT NULL DEFAULT 0
            );

            -- Privileged users survive restarts; the configured seed set is
            -- inserted idempotently at startup.
            CREATE TABLE IF NOT EXISTS admins (
                user_id INTEGER PRIMARY KEY,
                added_at TEXT NOT NULL
            );
            "#,
        )
        .context("Failed to create initial schema (v0 -> v1)")?;

        Ok(())
    }

    /// Run a closure against the connection on the blocking thread pool.
    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().expect("mutex poisoned");
            f(&mut conn)
        })
        .await
        .with_context(|| format!("Registry task panicked during {}", op))?
    }

    // =========================================================================
    // Code entries
    // =========================================================================

    /// Insert or fully replace the entry keyed by `entry.code`, and ensure a
    /// zero-valued stats row exists for it. Overwrite is total and silent.
    pub async fn upsert_code(&self, entry: CodeEntry) -> Result<()> {
        self.with_conn("upsert_code", move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO codes (code, channel, pointer, part_count, title)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(code) DO UPDATE SET
                     channel = excluded.channel,
                     pointer = excluded.pointer,
                     part_count = excluded.part_count,
                     title = excluded.title",
                params![
                    entry.code.0,
                    entry.channel.0,
                    entry.pointer,
                    entry.part_count,
                    entry.title
                ],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO stats (code, searched, viewed) VALUES (?1, 0, 0)",
                params![entry.code.0],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Point lookup of a code entry.
    pub async fn get_code(&self, code: &Code) -> Result<Option<CodeEntry>> {
        let code = code.clone();
        self.with_conn("get_code", move |conn| {
            let entry = conn
                .query_row(
                    "SELECT code, channel, pointer, part_count, title
                     FROM codes WHERE code = ?1",
                    params![code.0],
                    row_to_entry,
                )
                .optional()?;
            Ok(entry)
        })
        .await
    }

    /// All entries, sorted by numeric code value for display.
    pub async fn list_codes(&self) -> Result<Vec<CodeEntry>> {
        self.with_conn("list_codes", |conn| {
            let mut stmt =
                conn.prepare("SELECT code, channel, pointer, part_count, title FROM codes")?;
            let mut entries = stmt
                .query_map([], row_to_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            entries.sort_by_key(|e| e.code.numeric_value());
            Ok(entries)
        })
        .await
    }

    /// Remove the entry and its stats row in one transaction. Returns whether
    /// an entry existed; deleting a missing code is a no-op, not an error.
    pub async fn delete_code(&self, code: &Code) -> Result<bool> {
        let code = code.clone();
        self.with_conn("delete_code", move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM stats WHERE code = ?1", params![code.0])?;
            let deleted = tx.execute("DELETE FROM codes WHERE code = ?1", params![code.0])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Change an entry's primary key and title in one transaction, carrying
    /// its usage counters along. Collisions with a different existing entry
    /// are rejected explicitly rather than merged.
    pub async fn rename_code(
        &self,
        old_code: &Code,
        new_code: &Code,
        new_title: &str,
    ) -> Result<RenameOutcome> {
        let old_code = old_code.clone();
        let new_code = new_code.clone();
        let new_title = new_title.to_string();
        self.with_conn("rename_code", move |conn| {
            let tx = conn.transaction()?;

            let old_exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM codes WHERE code = ?1",
                    params![old_code.0],
                    |row| row.get(0),
                )
                .optional()?;
            if old_exists.is_none() {
                return Ok(RenameOutcome::NotFound);
            }

            if new_code != old_code {
                let collision: Option<i64> = tx
                    .query_row(
                        "SELECT 1 FROM codes WHERE code = ?1",
                        params![new_code.0],
                        |row| row.get(0),
                    )
                    .optional()?;
                if collision.is_some() {
                    return Ok(RenameOutcome::Conflict);
                }
            }

            tx.execute(
                "UPDATE codes SET code = ?1, title = ?2 WHERE code = ?3",
                params![new_code.0, new_title, old_code.0],
            )?;
            tx.execute(
                "UPDATE stats SET code = ?1 WHERE code = ?2",
                params![new_code.0, old_code.0],
            )?;
            tx.commit()?;
            Ok(RenameOutcome::Renamed)
        })
        .await
    }

    /// Case-insensitive substring search over titles.
    pub async fn search_titles(&self, query: &str) -> Result<Vec<CodeEntry>> {
        let pattern = format!("%{}%", query.to_lowercase());
        self.with_conn("search_titles", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT code, channel, pointer, part_count, title
                 FROM codes WHERE lower(title) LIKE ?1",
            )?;
            let mut entries = stmt
                .query_map(params![pattern], row_to_entry)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            entries.sort_by_key(|e| e.code.numeric_value());
            Ok(entries)
        })
        .await
    }

    // =========================================================================
    // Usage stats
    // =========================================================================

    /// Touch a usage counter. `Init` ensures the row exists with zeroes;
    /// `Searched`/`Viewed` add 1 to an existing row and are silent no-ops if
    /// the row is absent (never created implicitly).
    pub async fn increment_stat(&self, code: &Code, field: StatField) -> Result<()> {
        let code = code.clone();
        self.with_conn("increment_stat", move |conn| {
            match field {
                StatField::Init => {
                    conn.execute(
                        "INSERT OR IGNORE INTO stats (code, searched, viewed) VALUES (?1, 0, 0)",
                        params![code.0],
                    )?;
                }
                StatField::Searched => {
                    conn.execute(
                        "UPDATE stats SET searched = searched + 1 WHERE code = ?1",
                        params![code.0],
                    )?;
                }
                StatField::Viewed => {
                    conn.execute(
                        "UPDATE stats SET viewed = viewed + 1 WHERE code = ?1",
                        params![code.0],
                    )?;
                }
            }
            Ok(())
        })
        .await
    }

    pub async fn get_stat(&self, code: &Code) -> Result<Option<UsageStats>> {
        let code = code.clone();
        self.with_conn("get_stat", move |conn| {
            let stats = conn
                .query_row(
                    "SELECT searched, viewed FROM stats WHERE code = ?1",
                    params![code.0],
                    |row| {
                        Ok(UsageStats {
                            searched: row.get(0)?,
                            viewed: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(stats)
        })
        .await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Record a user on first observed interaction. Idempotent.
    pub async fn add_user(&self, user: UserId) -> Result<()> {
        self.with_conn("add_user", move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
                params![user.0],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn count_users(&self) -> Result<u64> {
        self.with_conn("count_users", |conn| {
            let count: u64 =
                conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(count)
        })
        .await
    }

    /// All known user ids, for broadcast fan-out. No ordering guarantee.
    pub async fn all_user_ids(&self) -> Result<Vec<UserId>> {
        self.with_conn("all_user_ids", |conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM users")?;
            let ids = stmt
                .query_map([], |row| row.get(0).map(UserId))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }

    // =========================================================================
    // Privileged users
    // =========================================================================

    pub async fn is_admin(&self, user: UserId) -> Result<bool> {
        self.with_conn("is_admin", move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM admins WHERE user_id = ?1",
                    params![user.0],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
    }

    /// Grant privileges to a user. Returns false if they were already
    /// privileged.
    pub async fn add_admin(&self, user: UserId) -> Result<bool> {
        self.with_conn("add_admin", move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO admins (user_id, added_at) VALUES (?1, ?2)",
                params![user.0, chrono::Utc::now().to_rfc3339()],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    /// Insert the configured seed set, idempotently. Runs at startup.
    pub async fn seed_admins(&self, users: &[UserId]) -> Result<()> {
        let users = users.to_vec();
        self.with_conn("seed_admins", move |conn| {
            let tx = conn.transaction()?;
            for user in &users {
                tx.execute(
                    "INSERT OR IGNORE INTO admins (user_id, added_at) VALUES (?1, ?2)",
                    params![user.0, chrono::Utc::now().to_rfc3339()],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// All privileged user ids (relay targets for contact-admin).
    pub async fn admin_ids(&self) -> Result<Vec<UserId>> {
        self.with_conn("admin_ids", |conn| {
            let mut stmt = conn.prepare("SELECT user_id FROM admins")?;
            let ids = stmt
                .query_map([], |row| row.get(0).map(UserId))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CodeEntry> {
    Ok(CodeEntry {
        code: Code(row.get(0)?),
        channel: ChannelId(row.get(1)?),
        pointer: row.get(2)?,
        part_count: row.get(3)?,
        title: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, channel: &str, pointer: i64, part_count: u32, title: &str) -> CodeEntry {
        CodeEntry {
            code: code.into(),
            channel: channel.into(),
            pointer,
            part_count,
            title: title.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_returns_fields_and_second_upsert_replaces() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .upsert_code(entry("91", "@chA", 10, 3, "X"))
            .await
            .unwrap();

        let fetched = registry.get_code(&"91".into()).await.unwrap().unwrap();
        assert_eq!(fetched, entry("91", "@chA", 10, 3, "X"));

        registry
            .upsert_code(entry("91", "@chB", 20, 5, "Y"))
            .await
            .unwrap();
        let replaced = registry.get_code(&"91".into()).await.unwrap().unwrap();
        assert_eq!(replaced, entry("91", "@chB", 20, 5, "Y"));
    }

    #[tokio::test]
    async fn upsert_creates_zeroed_stats_row() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .upsert_code(entry("7", "@ch", 1, 1, "t"))
            .await
            .unwrap();

        let stats = registry.get_stat(&"7".into()).await.unwrap().unwrap();
        assert_eq!(stats, UsageStats { searched: 0, viewed: 0 });
    }

    #[tokio::test]
    async fn upsert_does_not_reset_existing_stats() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .upsert_code(entry("7", "@ch", 1, 1, "t"))
            .await
            .unwrap();
        registry
            .increment_stat(&"7".into(), StatField::Searched)
            .await
            .unwrap();

        registry
            .upsert_code(entry("7", "@other", 9, 2, "t2"))
            .await
            .unwrap();
        let stats = registry.get_stat(&"7".into()).await.unwrap().unwrap();
        assert_eq!(stats.searched, 1);
    }

    #[tokio::test]
    async fn delete_removes_entry_and_stats() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .upsert_code(entry("5", "@ch", 1, 1, "t"))
            .await
            .unwrap();

        assert!(registry.delete_code(&"5".into()).await.unwrap());
        assert!(registry.get_code(&"5".into()).await.unwrap().is_none());
        assert!(registry.get_stat(&"5".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_missing_code_is_noop_false() {
        let registry = Registry::open_in_memory().unwrap();
        assert!(!registry.delete_code(&"404".into()).await.unwrap());
    }

    #[tokio::test]
    async fn increment_searched_n_times() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .upsert_code(entry("3", "@ch", 1, 1, "t"))
            .await
            .unwrap();

        for _ in 0..4 {
            registry
                .increment_stat(&"3".into(), StatField::Searched)
                .await
                .unwrap();
        }
        let stats = registry.get_stat(&"3".into()).await.unwrap().unwrap();
        assert_eq!(stats.searched, 4);
        assert_eq!(stats.viewed, 0);
    }

    #[tokio::test]
    async fn increment_on_missing_row_does_not_create_it() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .increment_stat(&"404".into(), StatField::Searched)
            .await
            .unwrap();
        assert!(registry.get_stat(&"404".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn init_is_idempotent_and_never_resets() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .increment_stat(&"8".into(), StatField::Init)
            .await
            .unwrap();
        registry
            .increment_stat(&"8".into(), StatField::Viewed)
            .await
            .unwrap();
        registry
            .increment_stat(&"8".into(), StatField::Init)
            .await
            .unwrap();

        let stats = registry.get_stat(&"8".into()).await.unwrap().unwrap();
        assert_eq!(stats, UsageStats { searched: 0, viewed: 1 });
    }

    #[tokio::test]
    async fn rename_moves_key_title_and_stats() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .upsert_code(entry("1", "@ch", 1, 2, "old"))
            .await
            .unwrap();
        registry
            .increment_stat(&"1".into(), StatField::Viewed)
            .await
            .unwrap();

        let outcome = registry
            .rename_code(&"1".into(), &"2".into(), "new")
            .await
            .unwrap();
        assert_eq!(outcome, RenameOutcome::Renamed);

        assert!(registry.get_code(&"1".into()).await.unwrap().is_none());
        let renamed = registry.get_code(&"2".into()).await.unwrap().unwrap();
        assert_eq!(renamed.title, "new");
        assert_eq!(renamed.channel, "@ch".into());

        let stats = registry.get_stat(&"2".into()).await.unwrap().unwrap();
        assert_eq!(stats.viewed, 1);
    }

    #[tokio::test]
    async fn rename_missing_old_code_reports_not_found() {
        let registry = Registry::open_in_memory().unwrap();
        let outcome = registry
            .rename_code(&"1".into(), &"2".into(), "t")
            .await
            .unwrap();
        assert_eq!(outcome, RenameOutcome::NotFound);
    }

    #[tokio::test]
    async fn rename_collision_is_rejected_without_merging() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .upsert_code(entry("1", "@a", 1, 1, "first"))
            .await
            .unwrap();
        registry
            .upsert_code(entry("2", "@b", 2, 2, "second"))
            .await
            .unwrap();

        let outcome = registry
            .rename_code(&"1".into(), &"2".into(), "clobber")
            .await
            .unwrap();
        assert_eq!(outcome, RenameOutcome::Conflict);

        // Both entries survive untouched.
        assert_eq!(
            registry.get_code(&"1".into()).await.unwrap().unwrap().title,
            "first"
        );
        assert_eq!(
            registry.get_code(&"2".into()).await.unwrap().unwrap().title,
            "second"
        );
    }

    #[tokio::test]
    async fn rename_to_same_code_updates_title() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .upsert_code(entry("1", "@a", 1, 1, "old"))
            .await
            .unwrap();

        let outcome = registry
            .rename_code(&"1".into(), &"1".into(), "new")
            .await
            .unwrap();
        assert_eq!(outcome, RenameOutcome::Renamed);
        assert_eq!(
            registry.get_code(&"1".into()).await.unwrap().unwrap().title,
            "new"
        );
    }

    #[tokio::test]
    async fn list_codes_sorts_by_numeric_value() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .upsert_code(entry("10", "@a", 1, 1, "ten"))
            .await
            .unwrap();
        registry
            .upsert_code(entry("2", "@a", 1, 1, "two"))
            .await
            .unwrap();

        let codes: Vec<String> = registry
            .list_codes()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.code.0)
            .collect();
        assert_eq!(codes, vec!["2", "10"]);
    }

    #[tokio::test]
    async fn search_titles_is_case_insensitive() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .upsert_code(entry("1", "@a", 1, 1, "Naruto Shippuden"))
            .await
            .unwrap();
        registry
            .upsert_code(entry("2", "@a", 1, 1, "Bleach"))
            .await
            .unwrap();

        let hits = registry.search_titles("naru").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].code, "1".into());

        assert!(registry.search_titles("one piece").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_user_is_idempotent() {
        let registry = Registry::open_in_memory().unwrap();
        registry.add_user(UserId(1)).await.unwrap();
        registry.add_user(UserId(1)).await.unwrap();
        registry.add_user(UserId(2)).await.unwrap();

        assert_eq!(registry.count_users().await.unwrap(), 2);
        let mut ids = registry.all_user_ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![UserId(1), UserId(2)]);
    }

    #[tokio::test]
    async fn admin_seed_and_add() {
        let registry = Registry::open_in_memory().unwrap();
        registry
            .seed_admins(&[UserId(10), UserId(20)])
            .await
            .unwrap();
        // Re-seeding is idempotent.
        registry.seed_admins(&[UserId(10)]).await.unwrap();

        assert!(registry.is_admin(UserId(10)).await.unwrap());
        assert!(!registry.is_admin(UserId(30)).await.unwrap());

        assert!(registry.add_admin(UserId(30)).await.unwrap());
        assert!(!registry.add_admin(UserId(30)).await.unwrap());
        assert!(registry.is_admin(UserId(30)).await.unwrap());

        let mut ids = registry.admin_ids().await.unwrap();
        ids.sort();
        assert_eq!(ids, vec![UserId(10), UserId(20), UserId(30)]);
    }
}
