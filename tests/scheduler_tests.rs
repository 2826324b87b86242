// ABOUTME: Integration tests for recurring scheduling and run exclusivity
// ABOUTME: Uses a paused tokio clock to exercise hour-scale timers deterministically

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use renewd::scheduler::{Scheduler, SchedulerError};
use renewd::store::{ActionType, NewTask, Task, TaskStore};
use renewd::TaskPatch;

mod common;
use common::{rig, SessionScript};

/// Drive the paused clock forward and give spawned jobs a chance to run.
async fn advance(duration: Duration) {
    tokio::time::sleep(duration).await;
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

fn keepalive_script() -> SessionScript {
    SessionScript::new("https://x.test/app")
}

/// Create and persist a keepalive task firing every `interval` hours.
async fn stored_keepalive(store: &TaskStore, interval: u64) -> Task {
    store
        .add(NewTask {
            name: Some("keepalive".to_string()),
            url: "https://x.test/app".to_string(),
            username: "a".to_string(),
            password: "b".to_string(),
            action_type: Some(ActionType::Keepalive),
            interval: Some(interval),
            ..Default::default()
        })
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_no_fire_before_one_full_interval() {
    let rig = rig(keepalive_script()).await;
    let task = stored_keepalive(&rig.store, 1).await;

    let scheduler = Scheduler::new(Arc::clone(&rig.store), Arc::clone(&rig.engine), 4);
    scheduler.schedule(&task);

    advance(Duration::from_secs(3590)).await;
    assert!(rig.store.get_by_id(&task.id).await.unwrap().last_run.is_none());

    advance(Duration::from_secs(60)).await;
    // Let the fired run finish; its own settle timers auto-advance.
    for _ in 0..10 {
        advance(Duration::from_secs(10)).await;
    }
    assert!(rig.store.get_by_id(&task.id).await.unwrap().last_run.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_fire_uses_current_stored_definition() {
    let rig = rig(keepalive_script()).await;
    let task = stored_keepalive(&rig.store, 1).await;

    let scheduler = Scheduler::new(Arc::clone(&rig.store), Arc::clone(&rig.engine), 4);
    scheduler.schedule(&task);

    // Edit the target between scheduling and the first fire.
    rig.store
        .update(
            &task.id,
            TaskPatch {
                url: Some("https://x.test/changed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    advance(Duration::from_secs(3700)).await;
    for _ in 0..10 {
        advance(Duration::from_secs(10)).await;
    }

    let opened = rig.calls.lock().unwrap().opened_urls.clone();
    assert_eq!(opened, vec!["https://x.test/changed"]);
}

#[tokio::test(start_paused = true)]
async fn test_unschedule_prevents_future_fires() {
    let rig = rig(keepalive_script()).await;
    let task = stored_keepalive(&rig.store, 1).await;

    let scheduler = Scheduler::new(Arc::clone(&rig.store), Arc::clone(&rig.engine), 4);
    scheduler.schedule(&task);
    assert!(scheduler.has_job(&task.id));

    scheduler.unschedule(&task.id);
    assert!(!scheduler.has_job(&task.id));

    advance(Duration::from_secs(7300)).await;
    assert!(rig.store.get_by_id(&task.id).await.unwrap().last_run.is_none());
    assert_eq!(rig.calls.lock().unwrap().sessions_opened, 0);
}

#[tokio::test(start_paused = true)]
async fn test_schedule_replaces_existing_job() {
    let rig = rig(keepalive_script()).await;
    let task = stored_keepalive(&rig.store, 1).await;

    let scheduler = Scheduler::new(Arc::clone(&rig.store), Arc::clone(&rig.engine), 4);
    scheduler.schedule(&task);
    scheduler.schedule(&task);
    assert!(scheduler.has_job(&task.id));

    advance(Duration::from_secs(3700)).await;
    for _ in 0..10 {
        advance(Duration::from_secs(10)).await;
    }

    // Only one job fired; the replaced timer is gone.
    assert_eq!(rig.calls.lock().unwrap().sessions_opened, 1);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_task_stops_firing() {
    let rig = rig(keepalive_script()).await;
    let task = stored_keepalive(&rig.store, 1).await;

    let scheduler = Scheduler::new(Arc::clone(&rig.store), Arc::clone(&rig.engine), 4);
    scheduler.schedule(&task);

    rig.store
        .update(
            &task.id,
            TaskPatch {
                enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    advance(Duration::from_secs(7300)).await;
    assert_eq!(rig.calls.lock().unwrap().sessions_opened, 0);
}

#[tokio::test(start_paused = true)]
async fn test_deleted_task_stops_firing() {
    let rig = rig(keepalive_script()).await;
    let task = stored_keepalive(&rig.store, 1).await;

    let scheduler = Scheduler::new(Arc::clone(&rig.store), Arc::clone(&rig.engine), 4);
    scheduler.schedule(&task);

    assert!(rig.store.delete(&task.id).await.unwrap());

    advance(Duration::from_secs(7300)).await;
    assert_eq!(rig.calls.lock().unwrap().sessions_opened, 0);
}

#[tokio::test(start_paused = true)]
async fn test_manual_run_refused_while_task_is_running() {
    let gate = Arc::new(Notify::new());
    let script = keepalive_script().with_open_gate(Arc::clone(&gate));
    let rig = rig(script).await;

    let task = stored_keepalive(&rig.store, 1).await;

    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&rig.store),
        Arc::clone(&rig.engine),
        4,
    ));

    let first = {
        let scheduler = Arc::clone(&scheduler);
        let id = task.id.clone();
        tokio::spawn(async move { scheduler.run_now(&id).await })
    };

    // Wait for the first run to claim its slot (it parks on the open gate).
    while !scheduler.is_running(&task.id) {
        tokio::task::yield_now().await;
    }

    let second = scheduler.run_now(&task.id).await;
    assert!(matches!(
        second,
        Err(SchedulerError::AlreadyRunning { .. })
    ));

    gate.notify_one();
    let result = first.await.unwrap().unwrap();
    assert!(result.success);
    assert!(!scheduler.is_running(&task.id));

    // Exactly one session was ever opened: the refused run never started one.
    assert_eq!(rig.calls.lock().unwrap().sessions_opened, 1);
}

#[tokio::test(start_paused = true)]
async fn test_absurd_interval_schedules_without_overflow() {
    let rig = rig(keepalive_script()).await;
    let task = stored_keepalive(&rig.store, u64::MAX).await;

    let scheduler = Scheduler::new(Arc::clone(&rig.store), Arc::clone(&rig.engine), 4);
    scheduler.schedule(&task);
    assert!(scheduler.has_job(&task.id));
}

#[tokio::test(start_paused = true)]
async fn test_run_now_unknown_id() {
    let rig = rig(keepalive_script()).await;
    let scheduler = Scheduler::new(Arc::clone(&rig.store), Arc::clone(&rig.engine), 4);

    let result = scheduler.run_now("missing").await;
    assert!(matches!(result, Err(SchedulerError::NotFound { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_run_now_persists_result() {
    let rig = rig(keepalive_script()).await;
    let task = stored_keepalive(&rig.store, 1).await;

    let scheduler = Scheduler::new(Arc::clone(&rig.store), Arc::clone(&rig.engine), 4);
    let result = scheduler.run_now(&task.id).await.unwrap();
    assert!(result.success);

    let stored = rig.store.get_by_id(&task.id).await.unwrap();
    assert!(stored.last_run.is_some());
    assert!(stored.last_result.unwrap().success);
}
