//! End-to-end tests for task completion against both progress stores.

use questify_common::catalog::{default_catalog, install_catalog};
use questify_common::{
    complete_task, update_task, AchievementDefinition, AchievementId, CriteriaType,
    MemoryProgressStore, NewTask, ProgressStore, SqliteProgressStore, TaskUpdate,
};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn cascade_catalog() -> Vec<AchievementDefinition> {
    vec![
        AchievementDefinition::new(1, "C", CriteriaType::TasksCompleted, 1).with_reward(60),
        AchievementDefinition::new(2, "D", CriteriaType::XpEarned, 150),
    ]
}

fn check_xp_cascade<S: ProgressStore>(store: &S) {
    install_catalog(store, &cascade_catalog()).unwrap();
    let user = store.create_user("ada").unwrap();
    let warmup = store.create_task(user, &NewTask::new("warmup").with_xp(Some(90))).unwrap();
    let task = store.create_task(user, &NewTask::new("report").with_xp(Some(0))).unwrap();

    // Warmup alone unlocks C (+60) then D on the next pass
    let first = complete_task(store, user, warmup.id).unwrap();
    let names: Vec<_> = first.newly_unlocked.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["C", "D"]);
    assert_eq!(first.progress.total_xp, 150);

    let second = complete_task(store, user, task.id).unwrap();
    assert!(second.triggered);
    assert!(second.newly_unlocked.is_empty());
    assert_eq!(second.progress.total_xp, 150);

    let progress = store.progress(user).unwrap();
    assert_eq!(progress.total_xp, 150);
    assert_eq!(progress.unlocked.len(), 2);
    let unlocks = store.unlocks(user).unwrap();
    let ids: Vec<_> = unlocks.iter().map(|e| e.achievement_id).collect();
    assert_eq!(ids, vec![AchievementId(1), AchievementId(2)]);
}

#[test]
fn test_xp_cascade_memory() {
    check_xp_cascade(&MemoryProgressStore::new());
}

#[test]
fn test_xp_cascade_sqlite() {
    check_xp_cascade(&SqliteProgressStore::open_in_memory().unwrap());
}

#[test]
fn test_level_cascade_sqlite() {
    let store = SqliteProgressStore::open_in_memory().unwrap();
    install_catalog(
        &store,
        &[
            AchievementDefinition::new(1, "A", CriteriaType::LevelReached, 2),
            AchievementDefinition::new(2, "B", CriteriaType::XpEarned, 150).with_reward(60),
        ],
    )
    .unwrap();
    let user = store.create_user("ada").unwrap();
    let setup = store.create_task(user, &NewTask::new("setup").with_xp(Some(90))).unwrap();
    let task = store.create_task(user, &NewTask::new("ten").with_xp(Some(10))).unwrap();

    let first = complete_task(&store, user, setup.id).unwrap();
    assert!(first.newly_unlocked.is_empty());
    assert_eq!(first.progress.total_xp, 90);

    let outcome = complete_task(&store, user, task.id).unwrap();
    let ids: Vec<_> = outcome.newly_unlocked.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![AchievementId(1)]);
    assert_eq!(outcome.progress.total_xp, 100);
    assert_eq!(outcome.progress.level().value(), 2);
}

#[test]
fn test_edits_do_not_trigger() {
    let store = SqliteProgressStore::open_in_memory().unwrap();
    install_catalog(&store, &default_catalog()).unwrap();
    let user = store.create_user("ada").unwrap();
    let task = store.create_task(user, &NewTask::new("draft")).unwrap();

    let edit = TaskUpdate {
        title: Some("final".to_string()),
        xp_value: Some(Some(40)),
        ..Default::default()
    };
    let outcome = update_task(&store, user, task.id, &edit).unwrap();
    assert!(!outcome.triggered);
    assert_eq!(outcome.task.title, "final");
    assert_eq!(store.progress(user).unwrap().total_xp, 0);

    // The edited xp_value is what completion credits
    let done = complete_task(&store, user, task.id).unwrap();
    assert_eq!(done.xp_credited, 40);
}

#[test]
fn test_uncomplete_keeps_progress() {
    let store = MemoryProgressStore::new();
    install_catalog(&store, &default_catalog()).unwrap();
    let user = store.create_user("ada").unwrap();
    let task = store.create_task(user, &NewTask::new("a")).unwrap();
    complete_task(&store, user, task.id).unwrap();
    let before = store.progress(user).unwrap();

    let reopen = TaskUpdate {
        completed: Some(false),
        ..Default::default()
    };
    let outcome = update_task(&store, user, task.id, &reopen).unwrap();
    assert!(!outcome.triggered);
    assert_eq!(store.progress(user).unwrap(), before);

    // Completing again is a fresh transition and credits again; already
    // unlocked achievements stay unlocked without re-award
    let again = complete_task(&store, user, task.id).unwrap();
    assert!(again.triggered);
    assert!(again.newly_unlocked.iter().all(|d| !before.unlocked.contains(&d.id)));
}

fn check_delete_keeps_progress<S: ProgressStore>(store: &S) {
    install_catalog(store, &default_catalog()).unwrap();
    let user = store.create_user("ada").unwrap();
    let task = store.create_task(user, &NewTask::new("a")).unwrap();
    complete_task(store, user, task.id).unwrap();
    let before = store.progress(user).unwrap();
    let unlocks_before = store.unlocks(user).unwrap();
    assert!(before.unlocked.contains(&AchievementId(1)));

    // The completed count drops back to 0; nothing is retracted
    let deleted = store.delete_task(user, task.id).unwrap();
    assert!(deleted.completed);
    assert!(store.tasks(user).unwrap().is_empty());
    assert_eq!(store.progress(user).unwrap(), before);
    assert_eq!(store.unlocks(user).unwrap(), unlocks_before);

    // Completing a new first task does not re-award First Steps
    let next = store.create_task(user, &NewTask::new("b")).unwrap();
    let outcome = complete_task(store, user, next.id).unwrap();
    assert!(outcome.newly_unlocked.is_empty());
    assert_eq!(outcome.progress.total_xp, before.total_xp + 10);
}

#[test]
fn test_delete_keeps_progress_memory() {
    check_delete_keeps_progress(&MemoryProgressStore::new());
}

#[test]
fn test_delete_keeps_progress_sqlite() {
    check_delete_keeps_progress(&SqliteProgressStore::open_in_memory().unwrap());
}

fn check_concurrent_completions<S: ProgressStore + 'static>(store: Arc<S>) {
    install_catalog(
        store.as_ref(),
        &[
            AchievementDefinition::new(1, "ten", CriteriaType::TasksCompleted, 10).with_reward(100),
            AchievementDefinition::new(2, "level 3", CriteriaType::LevelReached, 3).with_reward(7),
        ],
    )
    .unwrap();
    let user = store.create_user("ada").unwrap();
    let other = store.create_user("bob").unwrap();
    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let owner = if i % 2 == 0 { user } else { other };
            (owner, store.create_task(owner, &NewTask::new("t")).unwrap().id)
        })
        .collect();

    let handles: Vec<_> = tasks
        .into_iter()
        .map(|(owner, task_id)| {
            let store = Arc::clone(&store);
            thread::spawn(move || complete_task(store.as_ref(), owner, task_id).unwrap())
        })
        .collect();
    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for owner in [user, other] {
        // 10 tasks * 10 XP + 100 for "ten" + 7 for "level 3"
        let progress = store.progress(owner).unwrap();
        assert_eq!(progress.total_xp, 207);
        assert_eq!(store.unlocks(owner).unwrap().len(), 2);

        let awarded: usize = outcomes
            .iter()
            .filter(|o| o.progress.user_id == owner)
            .map(|o| o.newly_unlocked.len())
            .sum();
        assert_eq!(awarded, 2);
    }
}

#[test]
fn test_concurrent_completions_memory() {
    check_concurrent_completions(Arc::new(MemoryProgressStore::new()));
}

#[test]
fn test_concurrent_completions_sqlite() {
    let dir = tempdir().unwrap();
    let store = SqliteProgressStore::open(dir.path().join("questify.db")).unwrap();
    check_concurrent_completions(Arc::new(store));
}
