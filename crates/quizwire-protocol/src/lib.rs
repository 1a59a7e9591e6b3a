//! Wire protocol for Quizwire.
//!
//! This crate defines the "language" that the quiz host and its
//! participants speak:
//!
//! - **Model types** ([`Player`], [`Bot`], [`Question`], [`GameSnapshot`])
//!   — the game state that gets synchronized.
//! - **Messages** ([`Envelope`], [`MessageBody`]) — the flat four-field
//!   JSON objects that carry it.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how messages become
//!   bytes and back.
//! - **Framing** ([`read_frame`], [`write_frame`]) — how those bytes are
//!   delimited on a TCP stream.
//! - **Errors** ([`ProtocolError`]) — what can go wrong on the way.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about connections, registries, or
//! turns. It sits below both endpoint crates:
//!
//! ```text
//! TCP stream → framing (bytes) → codec (Envelope) → host / client logic
//! ```

mod codec;
mod error;
mod framing;
mod message;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use framing::{MAX_FRAME_SIZE, read_frame, write_frame};
pub use message::{
    Envelope, MessageBody, REJECT_GAME_FULL, REJECT_GAME_STARTED,
    REJECT_MUST_REJOIN, REJECT_NAME_TAKEN,
};
pub use types::{Bot, GameSettings, GameSnapshot, Player, Question};
