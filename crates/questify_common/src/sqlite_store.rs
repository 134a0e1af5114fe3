//! SQLite progress store.
//!
//! Schema:
//! - users: id, unique username
//! - user_profiles: one row per user holding total_xp
//! - tasks: per-user tasks with completed flag and optional xp_value
//! - achievements: the catalog
//! - user_achievements: unlock records, UNIQUE(user_id, achievement_id)
//!
//! Per-user units run as `BEGIN IMMEDIATE` transactions on a mutex-guarded
//! connection, so the write lock is held from the first read.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use crate::achievements::{AchievementDefinition, CriteriaType};
use crate::error::{StoreError, StoreResult};
use crate::progress::{AchievementId, UnlockEvent, UserId, UserProgress};
use crate::store::{ProgressStore, ProgressTransaction};
use crate::task::{NewTask, Task, TaskId};

/// How long a writer waits on another process holding the database lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS user_profiles (
        user_id INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
        total_xp INTEGER NOT NULL DEFAULT 0 CHECK (total_xp >= 0)
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        description TEXT,
        completed INTEGER NOT NULL DEFAULT 0,
        xp_value INTEGER
    );

    CREATE INDEX IF NOT EXISTS idx_tasks_user_completed ON tasks(user_id, completed);

    CREATE TABLE IF NOT EXISTS achievements (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        icon TEXT,
        criteria_type TEXT NOT NULL,
        criteria_value INTEGER NOT NULL,
        xp_reward INTEGER NOT NULL DEFAULT 0 CHECK (xp_reward >= 0)
    );

    CREATE TABLE IF NOT EXISTS user_achievements (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        achievement_id INTEGER NOT NULL REFERENCES achievements(id) ON DELETE CASCADE,
        unlocked_at TEXT NOT NULL,
        UNIQUE(user_id, achievement_id)
    );
"#;

/// Progress store backed by SQLite
pub struct SqliteProgressStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteProgressStore {
    /// Open or create the store at a specific path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        // WAL lets readers proceed while a unit holds the write lock
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self::from_connection(conn, Some(path.to_path_buf()))?;
        info!("Opened progress store at {}", path.display());
        Ok(store)
    }

    /// Private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, db_path: Option<PathBuf>) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl ProgressStore for SqliteProgressStore {
    fn create_user(&self, username: &str) -> StoreResult<UserId> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
            params![username, Utc::now()],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if constraint_violation(&e) => {
                return Err(StoreError::Conflict(format!("username '{}' is taken", username)))
            }
            Err(e) => return Err(e.into()),
        }
        let user_id = UserId(tx.last_insert_rowid());
        tx.execute(
            "INSERT INTO user_profiles (user_id, total_xp) VALUES (?1, 0)",
            params![user_id.0],
        )?;
        tx.commit()?;
        debug!("Registered user {} as {}", username, user_id);
        Ok(user_id)
    }

    fn find_user(&self, username: &str) -> StoreResult<Option<UserId>> {
        let conn = self.lock()?;
        let id = conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1",
                params![username],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(UserId))
    }

    fn create_task(&self, user_id: UserId, task: &NewTask) -> StoreResult<Task> {
        let conn = self.lock()?;
        ensure_user(&conn, user_id)?;
        let xp_value = task.xp_value.map(to_sql_int).transpose()?;
        conn.execute(
            "INSERT INTO tasks (user_id, title, description, completed, xp_value)
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![user_id.0, &task.title, &task.description, xp_value],
        )?;
        Ok(Task {
            id: TaskId(conn.last_insert_rowid()),
            user_id,
            title: task.title.clone(),
            description: task.description.clone(),
            completed: false,
            xp_value: task.xp_value,
        })
    }

    fn tasks(&self, user_id: UserId) -> StoreResult<Vec<Task>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, description, completed, xp_value
             FROM tasks WHERE user_id = ?1 ORDER BY id",
        )?;
        let tasks = stmt
            .query_map(params![user_id.0], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn find_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<Task> {
        let conn = self.lock()?;
        load_task(&conn, user_id, task_id)
    }

    fn delete_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<Task> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let task = load_task(&tx, user_id, task_id)?;
        tx.execute(
            "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
            params![task_id.0, user_id.0],
        )?;
        tx.commit()?;
        debug!("Deleted task {} of user {}", task_id, user_id);
        Ok(task)
    }

    fn put_achievement(&self, def: &AchievementDefinition) -> StoreResult<()> {
        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO achievements
                (id, name, description, icon, criteria_type, criteria_value, xp_reward)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                icon = excluded.icon,
                criteria_type = excluded.criteria_type,
                criteria_value = excluded.criteria_value,
                xp_reward = excluded.xp_reward",
            params![
                def.id.0,
                &def.name,
                &def.description,
                &def.icon,
                def.criteria_type.as_str(),
                def.criteria_value,
                to_sql_int(def.xp_reward)?,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) if constraint_violation(&e) => Err(StoreError::Conflict(format!(
                "achievement name '{}' is already used",
                def.name
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn achievements(&self) -> StoreResult<Vec<AchievementDefinition>> {
        let conn = self.lock()?;
        load_catalog(&conn)
    }

    fn progress(&self, user_id: UserId) -> StoreResult<UserProgress> {
        let conn = self.lock()?;
        load_progress(&conn, user_id)
    }

    fn unlocks(&self, user_id: UserId) -> StoreResult<Vec<UnlockEvent>> {
        let conn = self.lock()?;
        ensure_user(&conn, user_id)?;
        let mut stmt = conn.prepare(
            "SELECT achievement_id, user_id, unlocked_at FROM user_achievements
             WHERE user_id = ?1 ORDER BY unlocked_at, id",
        )?;
        let events = stmt
            .query_map(params![user_id.0], |row| {
                Ok(UnlockEvent {
                    achievement_id: AchievementId(row.get(0)?),
                    user_id: UserId(row.get(1)?),
                    unlocked_at: row.get::<_, DateTime<Utc>>(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    fn in_user_transaction<T, F>(&self, user_id: UserId, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn ProgressTransaction) -> StoreResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        ensure_user(&tx, user_id)?;
        let out = {
            let mut unit = SqliteTransaction { conn: &tx, user_id };
            f(&mut unit)?
        };
        tx.commit()?;
        Ok(out)
    }
}

/// One open `BEGIN IMMEDIATE` unit scoped to a user
struct SqliteTransaction<'a> {
    conn: &'a Connection,
    user_id: UserId,
}

impl ProgressTransaction for SqliteTransaction<'_> {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn progress(&mut self) -> StoreResult<UserProgress> {
        load_progress(self.conn, self.user_id)
    }

    fn completed_task_count(&mut self) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE user_id = ?1 AND completed = 1",
            params![self.user_id.0],
            |row| row.get(0),
        )?;
        Ok(from_sql_int(count))
    }

    fn catalog(&mut self) -> StoreResult<Vec<AchievementDefinition>> {
        load_catalog(self.conn)
    }

    fn task(&mut self, task_id: TaskId) -> StoreResult<Task> {
        load_task(self.conn, self.user_id, task_id)
    }

    fn save_task(&mut self, task: &Task) -> StoreResult<()> {
        let xp_value = task.xp_value.map(to_sql_int).transpose()?;
        let changed = self.conn.execute(
            "UPDATE tasks SET title = ?1, description = ?2, completed = ?3, xp_value = ?4
             WHERE id = ?5 AND user_id = ?6",
            params![
                &task.title,
                &task.description,
                task.completed,
                xp_value,
                task.id.0,
                self.user_id.0
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("task", task.id));
        }
        Ok(())
    }

    fn save_total_xp(&mut self, total_xp: u64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE user_profiles SET total_xp = ?1 WHERE user_id = ?2",
            params![to_sql_int(total_xp)?, self.user_id.0],
        )?;
        Ok(())
    }

    fn record_unlock(&mut self, event: &UnlockEvent) -> StoreResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO user_achievements (user_id, achievement_id, unlocked_at)
             VALUES (?1, ?2, ?3)",
            params![event.user_id.0, event.achievement_id.0, event.unlocked_at],
        )?;
        Ok(inserted == 1)
    }
}

fn ensure_user(conn: &Connection, user_id: UserId) -> StoreResult<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM users WHERE id = ?1",
            params![user_id.0],
            |_| Ok(()),
        )
        .optional()?;
    exists.ok_or_else(|| StoreError::not_found("user", user_id))
}

fn load_progress(conn: &Connection, user_id: UserId) -> StoreResult<UserProgress> {
    let total_xp: i64 = conn
        .query_row(
            "SELECT total_xp FROM user_profiles WHERE user_id = ?1",
            params![user_id.0],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("user", user_id))?;

    let mut stmt =
        conn.prepare("SELECT achievement_id FROM user_achievements WHERE user_id = ?1")?;
    let unlocked: BTreeSet<AchievementId> = stmt
        .query_map(params![user_id.0], |row| Ok(AchievementId(row.get(0)?)))?
        .collect::<Result<_, _>>()?;

    Ok(UserProgress {
        user_id,
        total_xp: from_sql_int(total_xp),
        unlocked,
    })
}

fn load_catalog(conn: &Connection) -> StoreResult<Vec<AchievementDefinition>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, icon, criteria_type, criteria_value, xp_reward
         FROM achievements ORDER BY id",
    )?;
    let defs = stmt
        .query_map([], |row| {
            Ok(AchievementDefinition {
                id: AchievementId(row.get(0)?),
                name: row.get(1)?,
                description: row.get(2)?,
                icon: row.get(3)?,
                criteria_type: CriteriaType::from(row.get::<_, String>(4)?),
                criteria_value: row.get(5)?,
                xp_reward: from_sql_int(row.get(6)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(defs)
}

fn load_task(conn: &Connection, user_id: UserId, task_id: TaskId) -> StoreResult<Task> {
    conn.query_row(
        "SELECT id, user_id, title, description, completed, xp_value
         FROM tasks WHERE id = ?1 AND user_id = ?2",
        params![task_id.0, user_id.0],
        task_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found("task", task_id))
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: TaskId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        title: row.get(2)?,
        description: row.get(3)?,
        completed: row.get(4)?,
        xp_value: row.get::<_, Option<i64>>(5)?.map(from_sql_int),
    })
}

fn constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _) if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// SQLite integers are signed; XP above i64::MAX cannot be stored
fn to_sql_int(value: u64) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::Conflict(format!("value {} exceeds storable range", value)))
}

fn from_sql_int(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_user_creates_profile() {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        let id = store.create_user("ada").unwrap();
        let progress = store.progress(id).unwrap();
        assert_eq!(progress.total_xp, 0);
        assert!(progress.unlocked.is_empty());
        assert_eq!(store.find_user("ada").unwrap(), Some(id));
    }

    #[test]
    fn test_duplicate_username_conflict() {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        store.create_user("ada").unwrap();
        let err = store.create_user("ada").unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn test_catalog_ordered_by_id() {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        store
            .put_achievement(&AchievementDefinition::new(5, "five", CriteriaType::XpEarned, 500))
            .unwrap();
        store
            .put_achievement(&AchievementDefinition::new(2, "two", CriteriaType::LevelReached, 2))
            .unwrap();
        let ids: Vec<i64> = store.achievements().unwrap().iter().map(|d| d.id.0).collect();
        assert_eq!(ids, vec![2, 5]);
    }

    #[test]
    fn test_put_achievement_replaces() {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        let def = AchievementDefinition::new(1, "first", CriteriaType::TasksCompleted, 1);
        store.put_achievement(&def).unwrap();
        store.put_achievement(&def.clone().with_reward(25)).unwrap();
        let catalog = store.achievements().unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].xp_reward, 25);
    }

    #[test]
    fn test_unknown_criteria_survives_storage() {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        let def = AchievementDefinition::new(1, "streak", CriteriaType::from("LOGIN_STREAK"), 7);
        store.put_achievement(&def).unwrap();
        assert_eq!(store.achievements().unwrap()[0], def);
    }

    #[test]
    fn test_duplicate_unlock_is_ignored() {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        let user = store.create_user("ada").unwrap();
        store
            .put_achievement(&AchievementDefinition::new(1, "a", CriteriaType::XpEarned, 0))
            .unwrap();
        let event = UnlockEvent {
            achievement_id: AchievementId(1),
            user_id: user,
            unlocked_at: Utc::now(),
        };

        let first = store
            .in_user_transaction(user, |tx| tx.record_unlock(&event))
            .unwrap();
        let second = store
            .in_user_transaction(user, |tx| tx.record_unlock(&event))
            .unwrap();
        assert!(first);
        assert!(!second);
        assert_eq!(store.unlocks(user).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_unit_rolls_back() {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        let user = store.create_user("ada").unwrap();

        let result: StoreResult<()> = store.in_user_transaction(user, |tx| {
            tx.save_total_xp(500)?;
            Err(StoreError::Conflict("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.progress(user).unwrap().total_xp, 0);
    }

    #[test]
    fn test_unknown_user_unit() {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        let err = store
            .in_user_transaction(UserId(99), |tx| tx.progress())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "user", .. }));
    }

    #[test]
    fn test_task_scoped_to_owner() {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        let ada = store.create_user("ada").unwrap();
        let bob = store.create_user("bob").unwrap();
        let task = store.create_task(ada, &NewTask::new("ship it")).unwrap();

        let err = store
            .in_user_transaction(bob, |tx| tx.task(task.id))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "task", .. }));
    }

    #[test]
    fn test_delete_task() {
        let store = SqliteProgressStore::open_in_memory().unwrap();
        let ada = store.create_user("ada").unwrap();
        let bob = store.create_user("bob").unwrap();
        let task = store.create_task(ada, &NewTask::new("ship it")).unwrap();

        let err = store.delete_task(bob, task.id).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "task", .. }));

        assert_eq!(store.find_task(ada, task.id).unwrap(), task);
        assert_eq!(store.delete_task(ada, task.id).unwrap(), task);
        assert!(store.tasks(ada).unwrap().is_empty());
        assert!(store.find_task(ada, task.id).is_err());
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("questify.db");
        let user = {
            let store = SqliteProgressStore::open(&path).unwrap();
            let user = store.create_user("ada").unwrap();
            store
                .in_user_transaction(user, |tx| tx.save_total_xp(140))
                .unwrap();
            user
        };

        let store = SqliteProgressStore::open(&path).unwrap();
        assert_eq!(store.progress(user).unwrap().total_xp, 140);
        assert_eq!(store.db_path(), Some(path.as_path()));
    }
}
