use quizwire_protocol::ProtocolError;

/// Errors surfaced by the client crate.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Socket failure.
    #[error("network error: {0}")]
    Io(#[from] std::io::Error),

    /// Encode or decode failure on our side of the wire.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The host refused the join. The payload is the host's exact
    /// reason, e.g. "Username is taken", suitable for showing to the
    /// user and for deciding whether to retry under another name.
    #[error("join rejected: {0}")]
    Rejected(String),

    /// The host did not answer a join in time.
    #[error("timed out waiting for the host")]
    Timeout,

    /// The session has ended; the payload says why (a `server_error`
    /// from the host, a closed socket, a lost connection).
    #[error("session over: {0}")]
    SessionOver(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_carries_host_reason() {
        let err = ClientError::Rejected("Game is full".to_string());
        assert_eq!(err.to_string(), "join rejected: Game is full");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "nope");
        let err: ClientError = io.into();
        assert!(matches!(err, ClientError::Io(_)));
    }
}
