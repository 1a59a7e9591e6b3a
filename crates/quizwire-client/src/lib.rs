//! Participant-side sessions for Quizwire.
//!
//! A participant never owns the game; it owns a [`SessionView`] that
//! mirrors the host's snapshot and converges on it with every sync
//! message. [`QuizClient`] is the connection around that mirror: join
//! (and rejoin) with the host's explicit acknowledgement, report our
//! player after each answer, and wait for the host's `move_on` to take
//! the next turn.
//!
//! The split mirrors the host crate: `state` is pure and unit-testable,
//! `client` is the socket plumbing around it.

mod client;
mod error;
mod state;

pub use client::QuizClient;
pub use error::ClientError;
pub use state::SessionView;
