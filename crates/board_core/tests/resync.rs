use std::sync::Once;

use board_core::{
    update, AppState, Effect, Msg, SubscriptionScope, Task, TaskPriority, TaskStatus,
};
use chrono::{TimeZone, Utc};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(board_logging::initialize_for_tests);
}

fn task(id: &str, status: TaskStatus) -> Task {
    let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    Task {
        id: id.to_string(),
        project_id: "proj-1".to_string(),
        title: format!("Task {id}"),
        description: None,
        status,
        priority: TaskPriority::Low,
        assigned_to: None,
        created_by: "user-1".to_string(),
        due_date: None,
        estimated_hours: None,
        actual_hours: None,
        created_at: stamp,
        updated_at: stamp,
    }
}

fn fetch_tasks_epoch(effects: &[Effect]) -> u64 {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::FetchTasks { epoch } => Some(*epoch),
            _ => None,
        })
        .expect("a FetchTasks effect")
}

fn count_task_fetches(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|effect| matches!(effect, Effect::FetchTasks { .. }))
        .count()
}

fn started() -> (AppState, u64) {
    let state = AppState::new();
    let (state, effects) = update(state, Msg::AppStarted { user_id: None });
    (state, fetch_tasks_epoch(&effects))
}

fn settled(tasks: Vec<Task>) -> AppState {
    let (state, epoch) = started();
    let (state, effects) = update(
        state,
        Msg::TasksFetched {
            epoch,
            result: Ok(tasks),
        },
    );
    assert!(effects.is_empty());
    state
}

#[test]
fn notification_burst_coalesces_to_a_single_follow_up() {
    init_logging();
    // Initial fetch is still in flight when the notifications arrive.
    let (mut state, epoch) = started();
    let mut total_fetches = 1;

    for _ in 0..5 {
        let (next, effects) = update(state, Msg::TasksChanged);
        total_fetches += count_task_fetches(&effects);
        state = next;
    }
    assert_eq!(total_fetches, 1);

    // Settling the in-flight fetch releases exactly one queued follow-up.
    let (state, effects) = update(
        state,
        Msg::TasksFetched {
            epoch,
            result: Ok(vec![task("t1", TaskStatus::Todo)]),
        },
    );
    total_fetches += count_task_fetches(&effects);
    assert_eq!(total_fetches, 2);

    // And the follow-up settles without scheduling anything further.
    let epoch = fetch_tasks_epoch(&effects);
    let (_state, effects) = update(
        state,
        Msg::TasksFetched {
            epoch,
            result: Ok(vec![task("t1", TaskStatus::Todo)]),
        },
    );
    assert_eq!(count_task_fetches(&effects), 0);
}

#[test]
fn repeated_notifications_are_idempotent() {
    init_logging();
    let rows = vec![task("t1", TaskStatus::Todo), task("t2", TaskStatus::Review)];
    let state = settled(rows.clone());

    let (state, effects) = update(state, Msg::TasksChanged);
    let epoch = fetch_tasks_epoch(&effects);
    let (state, _effects) = update(
        state,
        Msg::TasksFetched {
            epoch,
            result: Ok(rows.clone()),
        },
    );
    let first_pass = state.view();

    let (state, effects) = update(state, Msg::TasksChanged);
    let epoch = fetch_tasks_epoch(&effects);
    let (state, _effects) = update(
        state,
        Msg::TasksFetched {
            epoch,
            result: Ok(rows),
        },
    );

    assert_eq!(state.view(), first_pass);
}

#[test]
fn failed_refetch_keeps_the_previous_view() {
    init_logging();
    let mut state = settled(vec![task("t1", TaskStatus::Todo)]);
    assert!(state.consume_dirty());
    let before = state.view();

    let (state, effects) = update(state, Msg::TasksChanged);
    let epoch = fetch_tasks_epoch(&effects);
    let (mut state, effects) = update(
        state,
        Msg::TasksFetched {
            epoch,
            result: Err(board_core::FetchFailed),
        },
    );

    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
    assert_eq!(state.view(), before);
}

#[test]
fn closed_board_schedules_no_refetch() {
    init_logging();
    let state = settled(vec![task("t1", TaskStatus::Todo)]);

    let (state, effects) = update(state, Msg::BoardClosed);
    assert_eq!(
        effects,
        vec![Effect::Unsubscribe {
            scope: SubscriptionScope::tasks(),
        }]
    );

    let (_state, effects) = update(state, Msg::TasksChanged);
    assert!(effects.is_empty());
}

#[test]
fn refetch_resolving_after_release_is_discarded() {
    init_logging();
    let state = settled(vec![task("t1", TaskStatus::Todo)]);

    // A notification puts a refetch in flight, then the view unmounts
    // before the result lands.
    let (state, effects) = update(state, Msg::TasksChanged);
    let epoch = fetch_tasks_epoch(&effects);
    let (mut state, _effects) = update(state, Msg::BoardClosed);
    state.consume_dirty();
    let before = state.view();

    let (mut state, effects) = update(
        state,
        Msg::TasksFetched {
            epoch,
            result: Ok(vec![task("t9", TaskStatus::Completed)]),
        },
    );

    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
    assert_eq!(state.view(), before);
}

#[test]
fn queued_follow_up_is_dropped_on_release() {
    init_logging();
    let state = settled(vec![task("t1", TaskStatus::Todo)]);

    let (state, effects) = update(state, Msg::TasksChanged);
    let epoch = fetch_tasks_epoch(&effects);
    // Coalesced while in flight.
    let (state, effects) = update(state, Msg::TasksChanged);
    assert!(effects.is_empty());

    let (state, _effects) = update(state, Msg::BoardClosed);
    let (_state, effects) = update(
        state,
        Msg::TasksFetched {
            epoch,
            result: Ok(Vec::new()),
        },
    );

    // Neither the result nor the queued follow-up survives the release.
    assert!(effects.is_empty());
}
