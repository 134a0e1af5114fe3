//! Progress store seam.
//!
//! The store owns durability. Everything the completion handler needs runs
//! inside `in_user_transaction`, a per-user serializable unit: either all of
//! its writes become visible or none do.

use crate::achievements::AchievementDefinition;
use crate::error::StoreResult;
use crate::progress::{UnlockEvent, UserId, UserProgress};
use crate::task::{NewTask, Task, TaskId};

/// Reads and writes available inside one per-user unit
pub trait ProgressTransaction {
    /// User this unit is scoped to
    fn user_id(&self) -> UserId;

    fn progress(&mut self) -> StoreResult<UserProgress>;

    /// Number of the user's tasks with completed = true
    fn completed_task_count(&mut self) -> StoreResult<u64>;

    /// Full catalog, ordered by id
    fn catalog(&mut self) -> StoreResult<Vec<AchievementDefinition>>;

    fn task(&mut self, task_id: TaskId) -> StoreResult<Task>;

    fn save_task(&mut self, task: &Task) -> StoreResult<()>;

    fn save_total_xp(&mut self, total_xp: u64) -> StoreResult<()>;

    /// Insert an unlock record. Returns false when (user, achievement) already
    /// exists; the duplicate is dropped and nothing else changes.
    fn record_unlock(&mut self, event: &UnlockEvent) -> StoreResult<bool>;
}

/// Durable storage for users, tasks, the achievement catalog and unlocks
pub trait ProgressStore: Send + Sync {
    /// Register a user together with an empty progress profile
    fn create_user(&self, username: &str) -> StoreResult<UserId>;

    fn find_user(&self, username: &str) -> StoreResult<Option<UserId>>;

    fn create_task(&self, user_id: UserId, task: &NewTask) -> StoreResult<Task>;

    fn tasks(&self, user_id: UserId) -> StoreResult<Vec<Task>>;

    /// One of the user's tasks; another user's task is `NotFound`
    fn find_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<Task>;

    /// Remove a task and return it. XP and unlocks already earned stay.
    fn delete_task(&self, user_id: UserId, task_id: TaskId) -> StoreResult<Task>;

    /// Insert or replace a catalog entry by id
    fn put_achievement(&self, def: &AchievementDefinition) -> StoreResult<()>;

    /// Full catalog, ordered by id
    fn achievements(&self) -> StoreResult<Vec<AchievementDefinition>>;

    fn progress(&self, user_id: UserId) -> StoreResult<UserProgress>;

    /// The user's unlock records, oldest first
    fn unlocks(&self, user_id: UserId) -> StoreResult<Vec<UnlockEvent>>;

    /// Run `f` as one serializable unit for `user_id`. Commits when `f`
    /// returns Ok, rolls back otherwise.
    fn in_user_transaction<T, F>(&self, user_id: UserId, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut dyn ProgressTransaction) -> StoreResult<T>;
}
