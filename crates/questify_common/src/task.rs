//! Task records and edits.
//!
//! Only the completed flag going false -> true matters to progression; every
//! other edit is plain data.

use serde::{Deserialize, Deserializer, Serialize};

use crate::progress::UserId;

/// XP a new task is worth when the creator does not say otherwise
pub const DEFAULT_TASK_XP: u64 = 10;

/// Identifier of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub completed: bool,
    /// XP credited on completion; absent counts as 0
    #[serde(default)]
    pub xp_value: Option<u64>,
}

impl Task {
    /// XP this task credits on completion
    pub fn completion_xp(&self) -> u64 {
        self.xp_value.unwrap_or(0)
    }
}

/// Fields supplied when creating a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_xp_value")]
    pub xp_value: Option<u64>,
}

fn default_xp_value() -> Option<u64> {
    Some(DEFAULT_TASK_XP)
}

impl NewTask {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            xp_value: default_xp_value(),
        }
    }

    pub fn with_xp(mut self, xp_value: Option<u64>) -> Self {
        self.xp_value = xp_value;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// Partial edit of a task; `None` leaves a field unchanged.
///
/// Nullable fields take `Some(None)` to clear them. In JSON an absent key
/// leaves the field alone and an explicit `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub xp_value: Option<Option<u64>>,
}

/// A key that is present, even as null, is an edit
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TaskUpdate {
    pub fn complete() -> Self {
        Self {
            completed: Some(true),
            ..Default::default()
        }
    }

    /// Apply the edit, returning true when it completed a not-completed task
    pub fn apply(&self, task: &mut Task) -> bool {
        let was_completed = task.completed;
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(xp_value) = self.xp_value {
            task.xp_value = xp_value;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        task.completed && !was_completed
    }
}
