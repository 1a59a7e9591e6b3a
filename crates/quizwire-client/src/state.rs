//! The participant's mirror of the game.
//!
//! The host owns the real [`GameSnapshot`]; a participant owns a
//! [`SessionView`] that converges on it. Every apply function is a
//! wholesale replacement of the piece it covers, which makes each one
//! idempotent — the same message applied twice leaves the view exactly
//! where one application left it, so redelivery and re-sync cost
//! nothing but bytes.

use quizwire_protocol::{Bot, GameSnapshot, Player};

/// One participant's view of the game, plus who they are in it.
///
/// Identity is the player *name*, resolved against the current player
/// list on every [`my_player`](SessionView::my_player) call. That way a
/// `sync_players` that reorders or rebuilds the list can never detach
/// us from our own record.
#[derive(Debug, Clone)]
pub struct SessionView {
    /// The mirrored game state.
    pub snapshot: GameSnapshot,
    my_name: String,
    joined: bool,
}

impl SessionView {
    pub fn new(my_name: impl Into<String>) -> Self {
        Self {
            snapshot: GameSnapshot::default(),
            my_name: my_name.into(),
            joined: false,
        }
    }

    pub fn my_name(&self) -> &str {
        &self.my_name
    }

    /// True once the host has acknowledged our join.
    pub fn joined(&self) -> bool {
        self.joined
    }

    /// Our own record in the mirror, if the mirror knows us yet.
    pub fn my_player(&self) -> Option<&Player> {
        self.snapshot.player(&self.my_name)
    }

    /// Records a successful join: the host's `join_ack` carries our
    /// record exactly as the host stored it (flags normalized, score
    /// restored on rejoin). It becomes our entry in the mirror.
    pub fn apply_join_ack(&mut self, player: Player) {
        self.joined = true;
        match self.snapshot.player_mut(&player.name) {
            Some(existing) => *existing = player,
            None => self.snapshot.players.push(player),
        }
    }

    /// Replaces the whole mirror. The joined flag is ours, not the
    /// host's, so it survives.
    pub fn apply_sync_game(&mut self, snapshot: GameSnapshot) {
        self.snapshot = snapshot;
    }

    /// Replaces the player list.
    pub fn apply_sync_players(&mut self, players: Vec<Player>) {
        self.snapshot.players = players;
    }

    /// Replaces the bot list.
    pub fn apply_sync_bots(&mut self, bots: Vec<Bot>) {
        self.snapshot.bots = bots;
    }
}

// =========================================================================
// Tests
// =========================================================================
