//! The wire envelope and the message vocabulary inside it.
//!
//! Every message between host and participant is one JSON object with
//! exactly four fields:
//!
//! ```json
//! {
//!   "message_type": "sync_players",
//!   "message": [ ...payload... ],
//!   "sender": "192.168.1.10",
//!   "recipient": "192.168.1.23"
//! }
//! ```
//!
//! `sender` and `recipient` are the peers' IP strings. They are carried
//! for logging and debugging only — routing and identity always come
//! from the connection the envelope arrived on, never from these fields.
//!
//! Envelopes are immutable once built. Broadcasting constructs a fresh
//! envelope per recipient rather than patching one in place.

use serde::{Deserialize, Serialize};

use crate::types::{Bot, GameSnapshot, Player};

// ---------------------------------------------------------------------------
// Rejection reasons
// ---------------------------------------------------------------------------

// The host rejects a join with `server_error` carrying one of these
// exact strings. They are part of the wire contract: participants show
// them to the user verbatim.

/// Join rejected: a fresh name arrived after the game started.
pub const REJECT_GAME_STARTED: &str = "Game has already started";
/// Join rejected: every player slot is taken.
pub const REJECT_GAME_FULL: &str = "Game is full";
/// Join rejected: a connected player already owns that name.
pub const REJECT_NAME_TAKEN: &str = "Username is taken";
/// Join rejected: the game was resumed from a save, so only the names
/// in the save may join.
pub const REJECT_MUST_REJOIN: &str = "must rejoin using same name";

// ---------------------------------------------------------------------------
// MessageBody
// ---------------------------------------------------------------------------

/// The tagged content of an envelope: `message_type` plus `message`.
///
/// `#[serde(tag = "message_type", content = "message")]` produces the
/// adjacently tagged JSON the wire format requires, and
/// `rename_all = "snake_case"` turns `SyncPlayers` into `"sync_players"`.
///
/// The [`Unknown`](MessageBody::Unknown) variant absorbs any tag this
/// build doesn't know (`#[serde(other)]`), so a newer peer doesn't kill
/// the session by sending something new: receivers log it and move on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", content = "message", rename_all = "snake_case")]
pub enum MessageBody {
    /// Participant → host: "let me in as this player."
    ClientJoin(Player),
    /// Host → participant: the join was accepted; here is your
    /// player record as the host knows it (fresh for a new join,
    /// scores intact for a rejoin).
    JoinAck(Player),
    /// Participant → host: full self state after answering.
    SyncPlayer(Player),
    /// Host → participant: the whole authoritative snapshot.
    SyncGame(GameSnapshot),
    /// Host → participant: just the player list.
    SyncPlayers(Vec<Player>),
    /// Host → participant: just the bot list.
    SyncBots(Vec<Bot>),
    /// Host → participant: the turn barrier released; advance.
    /// The string is a human-readable reason, for logs only.
    MoveOn(String),
    /// Host → participant: request failed or session is unusable.
    /// The string is the exact reason text.
    ServerError(String),
    /// Any tag this build doesn't recognize.
    #[serde(other)]
    Unknown,
}

impl MessageBody {
    /// Short tag name for logging, matching the wire tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::ClientJoin(_) => "client_join",
            Self::JoinAck(_) => "join_ack",
            Self::SyncPlayer(_) => "sync_player",
            Self::SyncGame(_) => "sync_game",
            Self::SyncPlayers(_) => "sync_players",
            Self::SyncBots(_) => "sync_bots",
            Self::MoveOn(_) => "move_on",
            Self::ServerError(_) => "server_error",
            Self::Unknown => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The top-level wire message.
///
/// `#[serde(flatten)]` splices the body's two fields (`message_type`,
/// `message`) into the same JSON object as `sender` and `recipient`,
/// producing the flat four-field shape shown in the module docs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub body: MessageBody,
    /// IP string of the sending peer. Informational only.
    pub sender: String,
    /// IP string of the intended recipient. Informational only.
    pub recipient: String,
}

impl Envelope {
    /// Builds an envelope. Addresses are taken as strings so callers
    /// can pass `IpAddr`/`SocketAddr` displays without ceremony.
    pub fn new(
        body: MessageBody,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            body,
            sender: sender.into(),
            recipient: recipient.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
