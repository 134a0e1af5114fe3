//! In-memory progress store.
//!
//! Same semantics as the SQLite store without durability. Each user's data
//! sits behind its own mutex, so units for different users run in parallel
//! while units for one user serialize. A unit works on a copy of the user's
//! record and swaps it in only when the closure succeeds.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

use crate::achievements::AchievementDefinition;
use crate::error::{StoreError, StoreResult};
use crate::progress::{AchievementId, UnlockEvent, UserId, UserProgress};
use crate::store::{ProgressStore, ProgressTransaction};
use crate::task::{NewTask, Task, TaskId};

#[derive(Debug, Clone, Default)]
struct UserRecord {
    total_xp: u64,
    tasks: BTreeMap<TaskId, Task>,
    /// Unlocks in insertion order; at most one per achievement
    unlocks: Vec<UnlockEvent>,
}

impl UserRecord {
    fn progress(&self, user_id: UserId) -> UserProgress {
        UserProgress {
            user_id,
            total_xp: self.total_xp,
            unlocked: self.unlocks.iter().map(|e| e.achievement_id).collect(),
        }
    }
}

#[derive(Default)]
struct Users {
    by_id: BTreeMap<UserId, Arc<Mutex<UserRecord>>>,
    by_name: HashMap<String, UserId>,
}

/// Progress store kept entirely in memory
#[derive(Default)]
pub struct MemoryProgressStore {
    users: RwLock<Users>,
    catalog: RwLock<BTreeMap<AchievementId, AchievementDefinition>>,
    next_user_id: AtomicI64,
    next_task_id: AtomicI64,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, user_id: UserId) -> StoreResult<Arc<Mutex<UserRecord>>> {
        let users = self.users.read().map_err(poisoned)?;
        users
            .by_id
            .get(&user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user", user_id))
    }

    fn catalog_snapshot(&self) -> StoreResult<Vec<AchievementDefinition>> {
        let catalog = self.catalog.read().map_err(poisoned)?;
        Ok(catalog.values().cloned().collect())
    }
}

impl ProgressStore for MemoryProgressStore {
    fn create_user(&self, username: &str) -> StoreResult<UserId> {
        let mut users = self.users.write().map_err(poisoned)?;
        if users.by_name.contains_key(username) {
            return Err(StoreError::Conflict(format!("username '{}' is taken", username)));
        }
        let user_id = UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst) + 1);
        users.by_name.insert(username.to_string(), user_id);
        users
            .by_id
            .insert(user_id, Arc::new(Mutex::new(UserRecord::default())));
        debug!("Registered user {} as {}", username, user_id);
        Ok(user_id)
    }

    fn find_user(&self, username: &str) -> StoreResult<Option<UserId>> {
        let users = self.users.read().map_err(poisoned)?;
        Ok(users.by_name.get(username).copied())
    }

    fn create_task(&self, user_id: UserId, task: &NewTask) -> StoreResult<Task> {
        let record = self.record(user_id)?;
        let mut record = record.lock().map_err(poisoned)?;
        let created = Task {
            id: TaskId(self.next_task_id.fetch_add(1, Ordering::SeqCst) + 1),
            user_id,
            title: task.title.clone(),
            description: task.description.clone(),
            completed: false,
            xp_value: task.xp_value,
        };
        record.tasks.insert(created.id, created.clone());
        Ok(created)
    }

    fn tasks(&self, user_id: UserId) -> StoreResult<Vec<Task>> {
        let record = self.record(user_id)?;
        let record = record.lock().map_err(poisoned)?;
        Ok(record.tasks.values().cloned().collect())
    }

    fn find_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<Task> {
        let record = self.record(user_id)?;
        let record = record.lock().map_err(poisoned)?;
        record
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("task", task_id))
    }

    fn delete_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<Task> {
        let record = self.record(user_id)?;
        let mut record = record.lock().map_err(poisoned)?;
        let task = record
            .tasks
            .remove(&task_id)
            .ok_or_else(|| StoreError::not_found("task", task_id))?;
        debug!("Deleted task {} of user {}", task_id, user_id);
        Ok(task)
    }

    fn put_achievement(&self, def: &AchievementDefinition) -> StoreResult<()> {
        let mut catalog = self.catalog.write().map_err(poisoned)?;
        let name_taken = catalog
            .values()
            .any(|existing| existing.name == def.name && existing.id != def.id);
        if name_taken {
            return Err(StoreError::Conflict(format!(
                "achievement name '{}' is already used",
                def.name
            )));
        }
        catalog.insert(def.id, def.clone());
        Ok(())
    }

    fn achievements(&self) -> StoreResult<Vec<AchievementDefinition>> {
        self.catalog_snapshot()
    }

    fn progress(&self, user_id: UserId) -> StoreResult<UserProgress> {
        let record = self.record(user_id)?;
        let record = record.lock().map_err(poisoned)?;
        Ok(record.progress(user_id))
    }

    fn unlocks(&self, user_id: UserId) -> StoreResult<Vec<UnlockEvent>> {
        let record = self.record(user_id)?;
        let record = record.lock().map_err(poisoned)?;
        Ok(record.unlocks.clone())
    }

    fn in_user_transaction<T, F>(&self, user_id: UserId, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn ProgressTransaction) -> StoreResult<T>,
    {
        let record = self.record(user_id)?;
        let mut committed = record.lock().map_err(poisoned)?;
        let mut unit = MemoryTransaction {
            store: self,
            user_id,
            working: committed.clone(),
        };
        let out = f(&mut unit)?;
        *committed = unit.working;
        Ok(out)
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemoryProgressStore,
    user_id: UserId,
    working: UserRecord,
}

impl ProgressTransaction for MemoryTransaction<'_> {
    fn user_id(&self) -> UserId {
        self.user_id
    }

    fn progress(&mut self) -> StoreResult<UserProgress> {
        Ok(self.working.progress(self.user_id))
    }

    fn completed_task_count(&mut self) -> StoreResult<u64> {
        Ok(self.working.tasks.values().filter(|t| t.completed).count() as u64)
    }

    fn catalog(&mut self) -> StoreResult<Vec<AchievementDefinition>> {
        self.store.catalog_snapshot()
    }

    fn task(&mut self, task_id: TaskId) -> StoreResult<Task> {
        self.working
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("task", task_id))
    }

    fn save_task(&mut self, task: &Task) -> StoreResult<()> {
        match self.working.tasks.get_mut(&task.id) {
            Some(slot) => {
                *slot = task.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("task", task.id)),
        }
    }

    fn save_total_xp(&mut self, total_xp: u64) -> StoreResult<()> {
        self.working.total_xp = total_xp;
        Ok(())
    }

    fn record_unlock(&mut self, event: &UnlockEvent) -> StoreResult<bool> {
        let exists = self
            .working
            .unlocks
            .iter()
            .any(|e| e.achievement_id == event.achievement_id);
        if exists {
            return Ok(false);
        }
        self.working.unlocks.push(event.clone());
        Ok(true)
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Poisoned(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::CriteriaType;
    use chrono::Utc;

    #[test]
    fn test_user_ids_are_sequential() {
        let store = MemoryProgressStore::new();
        assert_eq!(store.create_user("a").unwrap(), UserId(1));
        assert_eq!(store.create_user("b").unwrap(), UserId(2));
        assert!(matches!(store.create_user("a"), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn test_rollback_discards_working_copy() {
        let store = MemoryProgressStore::new();
        let user = store.create_user("ada").unwrap();
        let result: StoreResult<()> = store.in_user_transaction(user, |tx| {
            tx.save_total_xp(300)?;
            Err(StoreError::Conflict("abort".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(store.progress(user).unwrap().total_xp, 0);
    }

    #[test]
    fn test_duplicate_unlock_ignored() {
        let store = MemoryProgressStore::new();
        let user = store.create_user("ada").unwrap();
        let event = UnlockEvent {
            achievement_id: AchievementId(4),
            user_id: user,
            unlocked_at: Utc::now(),
        };
        let inserted = store
            .in_user_transaction(user, |tx| Ok((tx.record_unlock(&event)?, tx.record_unlock(&event)?)))
            .unwrap();
        assert_eq!(inserted, (true, false));
        assert_eq!(store.unlocks(user).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_task_scoped_to_owner() {
        let store = MemoryProgressStore::new();
        let ada = store.create_user("ada").unwrap();
        let bob = store.create_user("bob").unwrap();
        let task = store.create_task(ada, &NewTask::new("a")).unwrap();

        assert!(matches!(store.delete_task(bob, task.id), Err(StoreError::NotFound { .. })));
        assert_eq!(store.delete_task(ada, task.id).unwrap().id, task.id);
        assert!(store.tasks(ada).unwrap().is_empty());
    }

    #[test]
    fn test_achievement_name_unique() {
        let store = MemoryProgressStore::new();
        store
            .put_achievement(&AchievementDefinition::new(1, "same", CriteriaType::XpEarned, 1))
            .unwrap();
        let err = store
            .put_achievement(&AchievementDefinition::new(2, "same", CriteriaType::XpEarned, 2))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
