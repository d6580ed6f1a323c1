//! Persisted session state, so a restart does not force a fresh sign-in.

use std::fs;
use std::path::Path;

use board_logging::{board_info, board_warn};
use board_remote::{AtomicStateWriter, Session};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SESSION_FILENAME: &str = ".studioboard_session.ron";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedSession {
    access_token: String,
    user_id: String,
    expires_at: String,
}

/// Loads the persisted session, tolerating a missing or unreadable file.
pub fn load_session(state_dir: &Path) -> Option<Session> {
    let path = state_dir.join(SESSION_FILENAME);
    let content = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return None;
        }
        Err(err) => {
            board_warn!("Failed to read persisted session from {:?}: {}", path, err);
            return None;
        }
    };

    let persisted: PersistedSession = match ron::from_str(&content) {
        Ok(persisted) => persisted,
        Err(err) => {
            board_warn!("Failed to parse persisted session from {:?}: {}", path, err);
            return None;
        }
    };

    let expires_at = match DateTime::parse_from_rfc3339(&persisted.expires_at) {
        Ok(stamp) => stamp.with_timezone(&Utc),
        Err(err) => {
            board_warn!("Persisted session has a bad expiry stamp: {}", err);
            return None;
        }
    };

    Some(Session {
        access_token: persisted.access_token,
        user_id: persisted.user_id,
        expires_at,
    })
}

/// Writes the session atomically; persistence failures are logged and
/// otherwise ignored, the session keeps working in memory.
pub fn save_session(state_dir: &Path, session: &Session) {
    let persisted = PersistedSession {
        access_token: session.access_token.clone(),
        user_id: session.user_id.clone(),
        expires_at: session.expires_at.to_rfc3339(),
    };
    let content = match ron::to_string(&persisted) {
        Ok(text) => text,
        Err(err) => {
            board_warn!("Failed to serialize session: {}", err);
            return;
        }
    };

    let writer = AtomicStateWriter::new(state_dir.to_path_buf());
    match writer.write(SESSION_FILENAME, &content) {
        Ok(path) => board_info!("Persisted session to {:?}", path),
        Err(err) => board_warn!("Failed to persist session: {}", err),
    }
}
