//! Game hosting for Quizwire.
//!
//! One process hosts a game; everyone else mirrors it. This crate is
//! that process's networking half: it owns the authoritative
//! [`GameSnapshot`](quizwire_protocol::GameSnapshot), admits and
//! re-admits players, fans sync messages out to every connection, and
//! holds the turn barrier that keeps a quiz moving in lockstep.
//!
//! # Architecture
//!
//! State lives in a single actor task and is reached only by message
//! passing: connection tasks send network events, the
//! embedding application sends commands through [`QuizHost`] and awaits
//! replies. No mutex guards game state, so no ordering of socket
//! arrivals can corrupt it.
//!
//! The pieces:
//!
//! - [`QuizHost`] — public handle: bind, sync, start, advance, kill
//! - [`HostState`] — pure policy: who may join, when a turn ends
//! - `registry` — live connections in one map, keyed by [`ConnId`]
//! - `server` — TCP accept loop and per-connection reader/writer tasks

mod actor;
mod config;
mod error;
mod registry;
mod server;
mod state;

pub use config::HostConfig;
pub use error::HostError;
pub use registry::ConnId;
pub use server::QuizHost;
pub use state::{HostState, JoinDecision};
