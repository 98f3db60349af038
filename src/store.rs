use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::{debug, warn};

use crate::progress::ProgressRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed progress data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persists one [`ProgressRecord`] per user.
pub trait ProgressStore {
    /// Unknown users get [`ProgressRecord::default`].
    fn load(&self, user_id: &str) -> Result<ProgressRecord, StoreError>;
    fn save(&self, user_id: &str, record: &ProgressRecord) -> Result<(), StoreError>;
}

/// SQLite-backed primary store.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens the database at `path`, creating the parent directory and
    /// schema if needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS user_progress (
                user_id TEXT PRIMARY KEY,
                level INTEGER NOT NULL,
                total_points INTEGER NOT NULL,
                badges TEXT NOT NULL,
                completed_quizzes TEXT NOT NULL,
                completed_games TEXT NOT NULL,
                streak_days INTEGER NOT NULL,
                version INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }

    /// Number of saves recorded for the user, if any.
    pub fn version(&self, user_id: &str) -> Result<Option<i64>, StoreError> {
        let version = self
            .conn
            .query_row(
                "SELECT version FROM user_progress WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }
}

impl ProgressStore for SqliteStore {
    fn load(&self, user_id: &str) -> Result<ProgressRecord, StoreError> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT level, total_points, badges, completed_quizzes, completed_games, streak_days
                FROM user_progress
                WHERE user_id = ?1
                "#,
                [user_id],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, u32>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((level, total_points, badges, quizzes, games, streak_days)) = row else {
            debug!(user_id, "no stored progress, starting fresh");
            return Ok(ProgressRecord::default());
        };

        Ok(ProgressRecord {
            level,
            total_points,
            badges: serde_json::from_str(&badges)?,
            completed_quizzes: serde_json::from_str(&quizzes)?,
            completed_games: serde_json::from_str(&games)?,
            streak_days,
        })
    }

    fn save(&self, user_id: &str, record: &ProgressRecord) -> Result<(), StoreError> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO user_progress
            (user_id, level, total_points, badges, completed_quizzes, completed_games,
             streak_days, version, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8)
            ON CONFLICT(user_id) DO UPDATE SET
                level = excluded.level,
                total_points = excluded.total_points,
                badges = excluded.badges,
                completed_quizzes = excluded.completed_quizzes,
                completed_games = excluded.completed_games,
                streak_days = excluded.streak_days,
                version = user_progress.version + 1,
                updated_at = excluded.updated_at
            "#,
            params![
                user_id,
                record.level,
                record.total_points,
                serde_json::to_string(&record.badges)?,
                serde_json::to_string(&record.completed_quizzes)?,
                serde_json::to_string(&record.completed_games)?,
                record.streak_days,
                now,
            ],
        )?;
        Ok(())
    }
}

/// Local JSON file keyed by user id; the offline fallback.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, ProgressRecord>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl ProgressStore for JsonFileStore {
    fn load(&self, user_id: &str) -> Result<ProgressRecord, StoreError> {
        Ok(self.read_all()?.remove(user_id).unwrap_or_default())
    }

    fn save(&self, user_id: &str, record: &ProgressRecord) -> Result<(), StoreError> {
        // a corrupt file is replaced rather than blocking every later save
        let mut all = self.read_all().unwrap_or_default();
        all.insert(user_id.to_string(), record.clone());

        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let data = serde_json::to_vec_pretty(&all)?;
        fs::write(&self.path, data).map_err(io_err)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub record: ProgressRecord,
    /// True when the primary store could not be used.
    pub from_cache: bool,
}

/// A primary store mirrored to a local one. Reads fall back to the local
/// copy when the primary is missing or failing; writes always reach the
/// local copy.
#[derive(Debug)]
pub struct FallbackStore<P, L> {
    primary: Option<P>,
    local: L,
}

impl<P: ProgressStore, L: ProgressStore> FallbackStore<P, L> {
    pub fn new(primary: Option<P>, local: L) -> Self {
        if primary.is_none() {
            warn!("primary progress store unavailable, using local store only");
        }
        Self { primary, local }
    }

    pub fn primary(&self) -> Option<&P> {
        self.primary.as_ref()
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn load(&self, user_id: &str) -> Loaded {
        if let Some(primary) = &self.primary {
            match primary.load(user_id) {
                Ok(record) => {
                    return Loaded {
                        record,
                        from_cache: false,
                    }
                }
                Err(e) => warn!(error = %e, "loading progress failed, using local copy"),
            }
        }

        let record = self.local.load(user_id).unwrap_or_else(|e| {
            warn!(error = %e, "local progress unreadable, starting fresh");
            ProgressRecord::default()
        });
        Loaded {
            record,
            from_cache: true,
        }
    }

    /// Saves to both stores. Returns whether the primary accepted the write.
    pub fn save(&self, user_id: &str, record: &ProgressRecord) -> bool {
        let primary_ok = match &self.primary {
            Some(primary) => match primary.save(user_id, record) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "saving progress failed, keeping local copy");
                    false
                }
            },
            None => false,
        };
        if let Err(e) = self.local.save(user_id, record) {
            warn!(error = %e, "writing local progress copy failed");
        }
        primary_ok
    }
}

pub type DefaultStore = FallbackStore<SqliteStore, JsonFileStore>;

/// Opens the SQLite store at `db_path` mirrored to `local_path`.
pub fn open_default(db_path: &Path, local_path: &Path) -> DefaultStore {
    let primary = SqliteStore::open(db_path)
        .map_err(|e| warn!(error = %e, path = %db_path.display(), "cannot open progress db"))
        .ok();
    FallbackStore::new(primary, JsonFileStore::with_path(local_path))
}
