use quizwire_protocol::ProtocolError;

/// Errors surfaced by the host crate.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Listener or socket failure.
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    /// Encode or decode failure at the host boundary.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The host actor has stopped, so commands can no longer be served.
    #[error("host is no longer running")]
    HostGone,
}
