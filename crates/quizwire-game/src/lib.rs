//! Game rules for Quizwire.
//!
//! Everything about the quiz that is *not* networking lives here:
//!
//! - **Scoring** ([`apply_submission`], [`run_bot_turns`]) — marking
//!   answers, streaks, and the shared streak multiplier.
//! - **Bots** ([`bot_answer`]) — accuracy-weighted answer picking.
//! - **Saves** ([`save_snapshot`], [`load_snapshot`]) — snapshot
//!   persistence as JSON.
//! - **Fetching** ([`fetch_questions`], behind the `fetch` feature) —
//!   pulling question batches from the Open Trivia DB.
//!
//! The synchronization crates move [`GameSnapshot`]s around; this crate
//! is what makes the numbers inside them change. Keeping it free of
//! sockets means every rule is testable with plain values.
//!
//! [`GameSnapshot`]: quizwire_protocol::GameSnapshot

mod bots;
mod error;
#[cfg(feature = "fetch")]
mod fetch;
mod rules;
mod save;

pub use bots::bot_answer;
pub use error::GameError;
#[cfg(feature = "fetch")]
pub use fetch::{FetchOptions, fetch_questions};
pub use rules::{Submission, apply_submission, run_bot_turns};
pub use save::{load_snapshot, save_snapshot};
