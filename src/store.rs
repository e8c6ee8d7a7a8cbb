use std::{fs, path::Path};

use thiserror::Error;
use tracing::warn;

use crate::models::AppState;

pub const STATE_PATH: &str = "data/state.json";

/// Errors produced by the persistence gateway.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Load the persisted aggregate. Absent or unreadable state is treated as a
/// first run, never as a fatal error.
pub fn load_state() -> AppState {
    load_from(Path::new(STATE_PATH))
}

pub fn save_state(state: &AppState) -> Result<(), StoreError> {
    save_to(Path::new(STATE_PATH), state)
}

fn load_from(path: &Path) -> AppState {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(_) => return AppState::first_run(),
    };
    match serde_json::from_str(&text) {
        Ok(state) => state,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "state file unreadable, starting fresh");
            AppState::first_run()
        }
    }
}

// Whole-aggregate write: temp file then rename, so a crash mid-write
// leaves the previous state intact.
fn save_to(path: &Path, state: &AppState) -> Result<(), StoreError> {
    let text = serde_json::to_string_pretty(state)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, text)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
