//! Snapshot persistence.
//!
//! A save file is the [`GameSnapshot`] as pretty-printed JSON, nothing
//! more. Saves happen at setup and between questions, never on the hot
//! path, so plain blocking `std::fs` is fine here.

use std::fs;
use std::path::Path;

use quizwire_protocol::GameSnapshot;

use crate::GameError;

/// Writes the snapshot to `path`, replacing any existing file.
pub fn save_snapshot(path: &Path, snapshot: &GameSnapshot) -> Result<(), GameError> {
    let json = serde_json::to_vec_pretty(snapshot)?;
    fs::write(path, json)?;
    tracing::debug!(path = %path.display(), "snapshot saved");
    Ok(())
}

/// Reads a snapshot back from `path`.
///
/// Session flags are cleared on the way in: nobody from the saved
/// session is connected to this process, and the pending question has
/// not been answered in it. A host resuming from this snapshot expects
/// every saved player to rejoin under their old name.
pub fn load_snapshot(path: &Path) -> Result<GameSnapshot, GameError> {
    let bytes = fs::read(path)?;
    let mut snapshot: GameSnapshot = serde_json::from_slice(&bytes)?;
    snapshot.reset_session_flags();
    tracing::debug!(
        path = %path.display(),
        players = snapshot.players.len(),
        question = snapshot.current_question,
        "snapshot loaded"
    );
    Ok(snapshot)
}

// =========================================================================
// Tests
// =========================================================================
