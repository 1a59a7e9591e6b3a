//! Authoritative game state and join policy.
//!
//! [`HostState`] is deliberately pure: no sockets, no channels, no
//! clocks. Every protocol decision the host makes — admit, rejoin,
//! reject, barrier release — is a plain method call on this struct,
//! which is what lets the whole policy be unit tested without standing
//! up a listener.

use quizwire_protocol::{
    Bot, GameSnapshot, Player, REJECT_GAME_FULL, REJECT_GAME_STARTED, REJECT_MUST_REJOIN,
    REJECT_NAME_TAKEN,
};

/// Outcome of one join request.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinDecision {
    /// A new player was appended to the roster. The payload is the
    /// record as stored, with host-controlled flags normalized.
    Accepted(Player),

    /// A disconnected player reclaimed their existing record, score
    /// and streak intact.
    Rejoined(Player),

    /// Turned away. The reason is the exact text sent in the
    /// `server_error` reply, so clients can match on it.
    Rejected(&'static str),
}

/// The one authoritative copy of the game.
///
/// Participants hold mirrors that converge on this via sync messages;
/// when they disagree, this copy wins.
#[derive(Debug)]
pub struct HostState {
    snapshot: GameSnapshot,
    resumed_from_save: bool,
}

impl HostState {
    /// Wraps a snapshot for hosting.
    ///
    /// Session flags (`is_connected`, `has_answered`, `started`) are
    /// reset because they describe sockets and turns from a previous
    /// process, not this one. The hosting player's own record is then
    /// marked connected, since the host is not a socket in its own
    /// registry.
    pub fn new(mut snapshot: GameSnapshot, resumed_from_save: bool) -> Self {
        snapshot.reset_session_flags();
        if let Some(host) = snapshot.players.iter_mut().find(|p| p.is_host) {
            host.is_connected = true;
        }
        Self {
            snapshot,
            resumed_from_save,
        }
    }

    pub fn snapshot(&self) -> &GameSnapshot {
        &self.snapshot
    }

    /// The started marker lives on the snapshot so participants learn
    /// it from `sync_game`.
    pub fn started(&self) -> bool {
        self.snapshot.started
    }

    // ---------------------------------------------------------------
    // Join policy
    // ---------------------------------------------------------------

    /// Decides what to do with a join request.
    ///
    /// Checked in order:
    ///
    /// 1. A known name that is currently disconnected rejoins its own
    ///    record. This works even mid-game and even when the roster is
    ///    full, because the seat already belongs to them.
    /// 2. A known name that is still connected is refused — someone is
    ///    sitting there.
    /// 3. Unknown names are refused once the game has started, when the
    ///    roster is full, or when the game was resumed from a save.
    /// 4. Otherwise the player is appended.
    ///
    /// The proposed record's cosmetic fields (colour, icon) are kept,
    /// but `is_host` is always stripped and the session flags are set
    /// by the host. Clients do not get to claim privileges by sending
    /// a flattering struct.
    pub fn handle_join(&mut self, proposed: Player) -> JoinDecision {
        if let Some(existing) = self.snapshot.player_mut(&proposed.name) {
            if existing.is_connected {
                return JoinDecision::Rejected(REJECT_NAME_TAKEN);
            }
            existing.is_connected = true;
            existing.has_answered = false;
            return JoinDecision::Rejoined(existing.clone());
        }

        if self.snapshot.started {
            return JoinDecision::Rejected(REJECT_GAME_STARTED);
        }
        if self.snapshot.players.len() >= self.snapshot.settings.max_players {
            return JoinDecision::Rejected(REJECT_GAME_FULL);
        }
        if self.resumed_from_save {
            return JoinDecision::Rejected(REJECT_MUST_REJOIN);
        }

        let mut player = proposed;
        player.is_host = false;
        player.is_connected = true;
        player.has_answered = false;
        self.snapshot.players.push(player.clone());
        JoinDecision::Accepted(player)
    }

    // ---------------------------------------------------------------
    // Session updates
    // ---------------------------------------------------------------

    /// Replaces a participant's record with their self-reported state.
    ///
    /// `bound_name` is the name the connection joined as, which is the
    /// identity we trust; the name inside `incoming` is overwritten
    /// with it, so a client cannot rename itself (or worse, someone
    /// else) by lying in a `sync_player`. Returns false when no record
    /// matches the bound name.
    pub fn apply_player_update(&mut self, bound_name: &str, mut incoming: Player) -> bool {
        match self.snapshot.player_mut(bound_name) {
            Some(existing) => {
                incoming.name = bound_name.to_string();
                incoming.is_host = existing.is_host;
                incoming.is_connected = true;
                *existing = incoming;
                true
            }
            None => false,
        }
    }

    /// Replaces the hosting application's own player record, or adds it
    /// if the snapshot somehow lacks one.
    pub fn update_host_player(&mut self, mut player: Player) {
        player.is_connected = true;
        match self.snapshot.player_mut(&player.name) {
            Some(existing) => {
                player.is_host = existing.is_host;
                *existing = player;
            }
            None => {
                player.is_host = true;
                self.snapshot.players.push(player);
            }
        }
    }

    /// Replaces the bot roster.
    pub fn update_bots(&mut self, bots: Vec<Bot>) {
        self.snapshot.bots = bots;
    }

    /// Marks a player's seat as vacated. The record stays so they can
    /// rejoin with their score.
    pub fn mark_disconnected(&mut self, name: &str) {
        if let Some(player) = self.snapshot.player_mut(name) {
            player.is_connected = false;
        }
    }

    // ---------------------------------------------------------------
    // Game flow
    // ---------------------------------------------------------------

    /// Locks the roster and starts the game.
    ///
    /// Players who connected to the lobby but dropped before this point
    /// are removed for good; from here on a disconnect only vacates the
    /// seat. Returns how many records were pruned.
    pub fn start_game(&mut self) -> usize {
        let pruned = self.snapshot.prune_disconnected();
        self.snapshot.started = true;
        pruned
    }

    /// True when every connected player has answered the current
    /// question. Disconnected players do not hold up the turn.
    pub fn all_answered(&self) -> bool {
        self.snapshot.all_connected_answered()
    }

    /// Resets per-turn answer flags.
    pub fn clear_answers(&mut self) {
        self.snapshot.clear_answers();
    }

    /// Moves on to the next question. Past the last question the index
    /// simply runs off the end and `snapshot.question()` returns `None`,
    /// which is how game loops notice they are done.
    pub fn advance_question(&mut self) {
        self.snapshot.current_question += 1;
    }
}

// =========================================================================
// Tests
// =========================================================================
