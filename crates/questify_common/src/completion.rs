//! Task completion handler.
//!
//! The only trigger for progression: a task's completed flag going
//! false -> true. Inside one per-user store unit the handler
//!
//! 1. saves the edited task,
//! 2. credits the task's XP (0 when absent),
//! 3. runs the award engine against the updated snapshot and the completed
//!    count (which now includes this task),
//! 4. persists the new XP total and the unlock records.
//!
//! Any failure rolls the whole unit back, task edit included.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use crate::achievements::AchievementDefinition;
use crate::award_engine::{evaluate, Evaluation};
use crate::error::StoreResult;
use crate::progress::{UserId, UserProgress};
use crate::store::{ProgressStore, ProgressTransaction};
use crate::task::{Task, TaskId, TaskUpdate};

/// What a task update did to the user's progression
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    /// Correlates log lines for this update
    pub request_id: Uuid,
    pub task: Task,
    /// Whether the update completed a not-completed task
    pub triggered: bool,
    /// XP credited from the task itself
    pub xp_credited: u64,
    pub progress: UserProgress,
    /// Achievements unlocked by this update, in unlock order
    pub newly_unlocked: Vec<AchievementDefinition>,
}

/// Apply `update` to a task and run progression if it completed the task
pub fn update_task<S: ProgressStore>(
    store: &S,
    user_id: UserId,
    task_id: TaskId,
    update: &TaskUpdate,
) -> StoreResult<CompletionOutcome> {
    let request_id = Uuid::new_v4();
    let span = info_span!("task_update", %request_id, user = %user_id, task = %task_id);
    let _enter = span.enter();

    store.in_user_transaction(user_id, |tx| {
        let mut task = tx.task(task_id)?;
        let triggered = update.apply(&mut task);
        tx.save_task(&task)?;

        if !triggered {
            debug!("Task {} updated without completion transition", task_id);
            return Ok(CompletionOutcome {
                request_id,
                task,
                triggered,
                xp_credited: 0,
                progress: tx.progress()?,
                newly_unlocked: Vec::new(),
            });
        }

        let xp_credited = task.completion_xp();
        let mut progress = tx.progress()?;
        progress.credit_xp(xp_credited);
        info!("Task {} completed, crediting {} XP", task_id, xp_credited);

        let evaluation = run_award_engine(tx, progress)?;
        Ok(CompletionOutcome {
            request_id,
            task,
            triggered,
            xp_credited,
            progress: evaluation.progress,
            newly_unlocked: evaluation.newly_unlocked,
        })
    })
}

/// Mark a task completed
pub fn complete_task<S: ProgressStore>(
    store: &S,
    user_id: UserId,
    task_id: TaskId,
) -> StoreResult<CompletionOutcome> {
    update_task(store, user_id, task_id, &TaskUpdate::complete())
}

/// Evaluate `progress` against the catalog and persist the result through
/// an open unit. `progress` may already carry XP credited in this unit.
///
/// Unlocks already stored for the user are merged into `progress` first, so
/// the engine never re-awards a recorded achievement or counts its reward.
pub fn run_award_engine(
    tx: &mut dyn ProgressTransaction,
    mut progress: UserProgress,
) -> StoreResult<Evaluation> {
    let stored = tx.progress()?.unlocked;
    progress.unlocked.extend(stored);

    let catalog = tx.catalog()?;
    let completed = tx.completed_task_count()?;
    let mut evaluation = evaluate(&progress, &catalog, completed);

    // Unlock rows first: a row that already exists grants nothing
    let mut total_xp = evaluation.progress.total_xp;
    let mut kept = Vec::with_capacity(evaluation.newly_unlocked.len());
    for (def, event) in evaluation
        .newly_unlocked
        .iter()
        .zip(evaluation.unlock_events(Utc::now()))
    {
        if tx.record_unlock(&event)? {
            kept.push(def.clone());
        } else {
            warn!("Achievement {} already recorded for user {}, skipping reward", def.id, event.user_id);
            total_xp = total_xp.saturating_sub(def.xp_reward);
        }
    }

    tx.save_total_xp(total_xp)?;
    evaluation.progress.total_xp = total_xp;
    evaluation.newly_unlocked = kept;

    if !evaluation.is_empty() {
        info!(
            "Unlocked {} achievement(s) over {} pass(es), total XP now {}",
            evaluation.newly_unlocked.len(),
            evaluation.passes,
            total_xp
        );
    }
    Ok(evaluation)
}
