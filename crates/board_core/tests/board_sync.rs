use std::sync::Once;

use board_core::{
    update, AppState, Effect, Msg, MutationToken, SubscriptionScope, Task, TaskDelta,
    TaskPriority, TaskStatus, WriteOutcome,
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
        priority: TaskPriority::Medium,
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

fn write_token(effects: &[Effect]) -> MutationToken {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::WriteTask { token, .. } => Some(token.clone()),
            _ => None,
        })
        .expect("a WriteTask effect")
}

/// Starts a session and settles the initial task fetch with `tasks`.
fn seeded(tasks: Vec<Task>) -> AppState {
    let state = AppState::new();
    let (state, effects) = update(
        state,
        Msg::AppStarted {
            user_id: Some("user-1".to_string()),
        },
    );
    let epoch = fetch_tasks_epoch(&effects);
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

fn drop_on(state: AppState, task_id: &str, status: TaskStatus) -> (AppState, Vec<Effect>) {
    let (state, effects) = update(
        state,
        Msg::TaskDragStarted {
            task_id: task_id.to_string(),
        },
    );
    assert!(effects.is_empty());
    update(state, Msg::TaskDropped { status })
}

fn column_ids(state: &AppState, status: TaskStatus) -> Vec<String> {
    state
        .view()
        .board
        .columns
        .iter()
        .find(|column| column.status == status)
        .expect("column")
        .tasks
        .iter()
        .map(|card| card.task_id.clone())
        .collect()
}

#[test]
fn start_fetches_collections_and_subscribes_to_tasks() {
    init_logging();
    let state = AppState::new();
    let (state, effects) = update(state, Msg::AppStarted { user_id: None });

    assert!(state.view().board.loading);
    assert!(effects.contains(&Effect::FetchProfiles));
    assert!(effects.contains(&Effect::FetchProjects));
    assert!(effects.contains(&Effect::FetchChannels));
    assert!(effects.contains(&Effect::Subscribe {
        scope: SubscriptionScope::tasks(),
    }));
    assert_eq!(fetch_tasks_epoch(&effects), 1);
}

#[test]
fn drop_applies_optimistically_and_emits_one_write() {
    init_logging();
    let state = seeded(vec![task("t1", TaskStatus::Todo), task("t2", TaskStatus::Review)]);

    let (state, effects) = drop_on(state, "t1", TaskStatus::InProgress);

    // Visible before the backend answers.
    assert_eq!(column_ids(&state, TaskStatus::InProgress), vec!["t1"]);
    assert!(column_ids(&state, TaskStatus::Todo).is_empty());
    assert_eq!(state.view().board.pending_writes, 1);
    assert_eq!(
        effects,
        vec![Effect::WriteTask {
            token: write_token(&effects),
            delta: TaskDelta::status(TaskStatus::InProgress),
        }]
    );
}

#[test]
fn optimistic_state_matches_direct_application() {
    init_logging();
    let state = seeded(vec![task("t1", TaskStatus::Todo)]);
    let (state, _effects) = drop_on(state, "t1", TaskStatus::InProgress);

    // The speculative view must equal the view produced by fetching the
    // record with the delta already applied.
    let direct = seeded(vec![task("t1", TaskStatus::InProgress)]);
    assert_eq!(state.view().board.columns, direct.view().board.columns);
}

#[test]
fn drop_on_current_column_is_a_noop() {
    init_logging();
    let mut state = seeded(vec![task("t1", TaskStatus::Todo)]);
    assert!(state.consume_dirty());

    let (mut state, effects) = drop_on(state, "t1", TaskStatus::Todo);

    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
    assert_eq!(column_ids(&state, TaskStatus::Todo), vec!["t1"]);
}

#[test]
fn rejected_write_restores_the_snapshot() {
    init_logging();
    let state = seeded(vec![task("t1", TaskStatus::Todo)]);
    let (state, effects) = drop_on(state, "t1", TaskStatus::InProgress);
    let token = write_token(&effects);

    let (state, effects) = update(
        state,
        Msg::TaskWriteResolved {
            token,
            outcome: WriteOutcome::Rejected,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(column_ids(&state, TaskStatus::Todo), vec!["t1"]);
    assert!(column_ids(&state, TaskStatus::InProgress).is_empty());
    assert_eq!(state.view().board.pending_writes, 0);
}

#[test]
fn confirmed_write_keeps_state_and_refetch_reconfirms() {
    init_logging();
    let state = seeded(vec![task("t1", TaskStatus::Todo)]);
    let (state, effects) = drop_on(state, "t1", TaskStatus::InProgress);
    let token = write_token(&effects);

    let (state, _effects) = update(
        state,
        Msg::TaskWriteResolved {
            token,
            outcome: WriteOutcome::Confirmed,
        },
    );
    assert_eq!(column_ids(&state, TaskStatus::InProgress), vec!["t1"]);

    // The backend's own change notification triggers a redundant but
    // harmless refetch; the authoritative rows match the local state.
    let before = state.view();
    let (state, effects) = update(state, Msg::TasksChanged);
    let epoch = fetch_tasks_epoch(&effects);
    let (state, effects) = update(
        state,
        Msg::TasksFetched {
            epoch,
            result: Ok(vec![task("t1", TaskStatus::InProgress)]),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.view().board.columns, before.board.columns);
}

#[test]
fn refetch_wins_over_stale_rollback() {
    init_logging();
    let state = seeded(vec![task("t1", TaskStatus::Todo)]);
    let (state, effects) = drop_on(state, "t1", TaskStatus::InProgress);
    let token = write_token(&effects);

    // A refetch lands while the write is still outstanding and carries
    // newer authoritative data for the same record.
    let (state, effects) = update(state, Msg::TasksChanged);
    let epoch = fetch_tasks_epoch(&effects);
    let (state, _effects) = update(
        state,
        Msg::TasksFetched {
            epoch,
            result: Ok(vec![task("t1", TaskStatus::Completed)]),
        },
    );
    assert_eq!(column_ids(&state, TaskStatus::Completed), vec!["t1"]);

    // The late rollback must not clobber it.
    let (state, effects) = update(
        state,
        Msg::TaskWriteResolved {
            token,
            outcome: WriteOutcome::Rejected,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(column_ids(&state, TaskStatus::Completed), vec!["t1"]);
}

#[test]
fn superseding_drop_rolls_back_to_chain_origin() {
    init_logging();
    let state = seeded(vec![task("t1", TaskStatus::Todo)]);
    let (state, _effects) = drop_on(state, "t1", TaskStatus::InProgress);
    let (state, effects) = drop_on(state, "t1", TaskStatus::Review);
    let second = write_token(&effects);

    let (state, _effects) = update(
        state,
        Msg::TaskWriteResolved {
            token: second,
            outcome: WriteOutcome::Rejected,
        },
    );

    // Never an intermediate speculative state: back to the true origin.
    assert_eq!(column_ids(&state, TaskStatus::Todo), vec!["t1"]);
    assert!(column_ids(&state, TaskStatus::InProgress).is_empty());
}

#[test]
fn rollback_of_superseded_write_is_a_noop() {
    init_logging();
    let state = seeded(vec![task("t1", TaskStatus::Todo)]);
    let (state, effects) = drop_on(state, "t1", TaskStatus::InProgress);
    let first = write_token(&effects);
    let (state, _effects) = drop_on(state, "t1", TaskStatus::Review);

    let (state, effects) = update(
        state,
        Msg::TaskWriteResolved {
            token: first,
            outcome: WriteOutcome::Rejected,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(column_ids(&state, TaskStatus::Review), vec!["t1"]);
}

#[test]
fn drop_without_drag_emits_nothing() {
    init_logging();
    let state = seeded(vec![task("t1", TaskStatus::Todo)]);
    let (_state, effects) = update(
        state,
        Msg::TaskDropped {
            status: TaskStatus::Review,
        },
    );
    assert!(effects.is_empty());
}
