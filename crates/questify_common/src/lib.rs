//! Questify Common - progression engine and progress stores.
//!
//! Completing tasks grants XP, XP determines a level, and thresholds on
//! tasks completed, level or XP unlock achievements that may grant more XP.
//! The award engine resolves those cascades as a pure function; the stores
//! give it a per-user transactional boundary.

pub mod achievements;
pub mod award_engine;
pub mod catalog;
pub mod completion;
pub mod config;
pub mod error;
pub mod level;
pub mod memory_store;
pub mod progress;
pub mod sqlite_store;
pub mod store;
pub mod task;

pub use achievements::{is_satisfied, AchievementDefinition, CriteriaType};
pub use award_engine::{evaluate, Evaluation};
pub use completion::{complete_task, update_task, CompletionOutcome};
pub use config::QuestifyConfig;
pub use error::{StoreError, StoreResult};
pub use level::{level, xp_at_level_start, xp_for_next_level, Level, LevelProgress, XP_PER_LEVEL};
pub use memory_store::MemoryProgressStore;
pub use progress::{AchievementId, ProgressSnapshot, UnlockEvent, UserId, UserProgress};
pub use sqlite_store::SqliteProgressStore;
pub use store::{ProgressStore, ProgressTransaction};
pub use task::{NewTask, Task, TaskId, TaskUpdate, DEFAULT_TASK_XP};
