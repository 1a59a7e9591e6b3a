//! Host configuration.

/// Network settings for one hosted game.
///
/// The player cap, question list, and scoring rules all live in the
/// [`GameSnapshot`](quizwire_protocol::GameSnapshot) the host is
/// constructed with. `HostConfig` only covers what the snapshot cannot
/// know: where to listen, and whether this session was restored from a
/// save file.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Interface to bind, e.g. `"0.0.0.0"` for all interfaces or
    /// `"127.0.0.1"` for local-only games.
    pub bind_addr: String,

    /// TCP port to listen on. Port 0 asks the OS for a free port,
    /// which is what the tests use.
    pub port: u16,

    /// True when the snapshot was loaded from disk rather than freshly
    /// created. A resumed game only re-admits the names it already
    /// knows; unknown names are turned away so a late stranger cannot
    /// claim a seat someone else earned.
    pub resumed_from_save: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 1234,
            resumed_from_save: false,
        }
    }
}

impl HostConfig {
    /// The `address:port` string handed to the TCP listener.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
