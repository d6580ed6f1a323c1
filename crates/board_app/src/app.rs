//! The headless session loop: drain messages, update, run effects, log the
//! view when it changed.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use board_core::{update, AppState, AppViewModel, Msg};
use board_logging::{board_info, board_warn};
use board_remote::{sign_in_blocking, RemoteError, RemoteSettings, Session};
use chrono::Utc;

use crate::effects::EffectRunner;
use crate::session_store;

const ENV_EMAIL: &str = "STUDIOBOARD_EMAIL";
const ENV_PASSWORD: &str = "STUDIOBOARD_PASSWORD";

pub fn run_app(settings: RemoteSettings) -> Result<(), RemoteError> {
    let state_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let session = establish_session(&settings, &state_dir);
    let user_id = session.as_ref().map(|session| session.user_id.clone());

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(msg_tx.clone(), settings, session.as_ref())?;

    // Background tick to throttle rendering and keep the loop live while
    // the backend is quiet.
    {
        let msg_tx = msg_tx.clone();
        thread::spawn(move || {
            let interval = Duration::from_millis(75);
            while msg_tx.send(Msg::Tick).is_ok() {
                thread::sleep(interval);
            }
        });
    }

    let _ = msg_tx.send(Msg::AppStarted { user_id });

    let mut state = AppState::new();
    while let Ok(msg) = msg_rx.recv() {
        let (next, effects) = update(std::mem::take(&mut state), msg);
        state = next;
        runner.enqueue(effects);
        if state.consume_dirty() {
            render(&state.view());
        }
    }
    Ok(())
}

fn establish_session(settings: &RemoteSettings, state_dir: &Path) -> Option<Session> {
    if let Some(session) = session_store::load_session(state_dir) {
        if !session.is_expired(Utc::now()) {
            board_info!("Restored persisted session for user {}", session.user_id);
            return Some(session);
        }
        board_info!("Persisted session expired; signing in again");
    }

    let (Ok(email), Ok(password)) = (std::env::var(ENV_EMAIL), std::env::var(ENV_PASSWORD)) else {
        board_warn!("No credentials in the environment; continuing read-only");
        return None;
    };
    match sign_in_blocking(settings, &email, &password) {
        Ok(session) => {
            session_store::save_session(state_dir, &session);
            board_info!("Signed in as {}", session.user_id);
            Some(session)
        }
        Err(err) => {
            board_warn!("Sign-in failed: {}; continuing read-only", err);
            None
        }
    }
}

fn render(view: &AppViewModel) {
    let columns = view
        .board
        .columns
        .iter()
        .map(|column| format!("{}={}", column.title, column.tasks.len()))
        .collect::<Vec<_>>()
        .join(" ");
    board_info!(
        "board: {} | chat: channel={} messages={} sending={} | team={} projects={}",
        columns,
        view.chat.active_channel.as_deref().unwrap_or("-"),
        view.chat.messages.len(),
        view.chat.sending,
        view.dashboard.team_size,
        view.projects.len()
    );
    if view.feed_degraded {
        board_warn!("Realtime feed degraded; views refresh only on demand");
    }
}
