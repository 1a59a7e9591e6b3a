//! Error types for game rules and persistence.

/// Errors from saving, loading, or fetching game data.
///
/// Scoring itself never fails — these errors come from the edges of the
/// crate: the filesystem and the question API.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Reading or writing a save file failed.
    #[error("save io: {0}")]
    Io(#[from] std::io::Error),

    /// A save file exists but isn't a valid snapshot.
    #[error("save format: {0}")]
    Serde(#[from] serde_json::Error),

    /// The question API request itself failed (network, TLS, HTTP status).
    #[cfg(feature = "fetch")]
    #[error("question fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The question API answered but reported a failure. Code 1 means
    /// not enough questions for the requested filters; 2 means an
    /// invalid parameter.
    #[cfg(feature = "fetch")]
    #[error("question api returned code {0}")]
    Api(u8),
}
