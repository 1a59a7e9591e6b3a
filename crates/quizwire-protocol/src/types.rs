//! Game model types shared by the host and every participant.
//!
//! These are the structures that travel on the wire and land in save
//! files: players, bots, questions, and the game snapshot that ties them
//! together. The host owns the authoritative snapshot; participants hold
//! a mirror of it that is only ever updated from host broadcasts.
//!
//! Field names here ARE the wire names — renaming a field is a protocol
//! change, not a refactor.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Question
// ---------------------------------------------------------------------------

/// One quiz question.
///
/// `question_type` is `"multiple"` or `"boolean"` (the Open Trivia DB
/// vocabulary); the sync layer treats it as an opaque string. The correct
/// answer travels with the question — participants mark their own answers
/// locally, so they need it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Category name, e.g. "Science: Computers".
    pub category: String,
    /// "multiple" or "boolean".
    pub question_type: String,
    /// "easy", "medium" or "hard".
    pub difficulty: String,
    /// The question text itself.
    pub question: String,
    /// The one correct answer.
    pub correct_answer: String,
    /// Every wrong answer (one for boolean, three for multiple choice).
    pub incorrect_answers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One human player, as known to the whole session.
///
/// A player is identified by `name` — join uniqueness is enforced on it,
/// and every participant re-finds "its" player by name after a sync.
///
/// Two fields are session-scoped rather than game-scoped:
/// `is_connected` and `has_answered` describe the live TCP session and
/// the current question cycle. They are meaningless in a save file and
/// get reset whenever a snapshot is loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Unique display name; the join key.
    pub name: String,
    /// ANSI colour escape (cosmetic, carried verbatim).
    pub colour: String,
    /// Icon identifier (cosmetic, carried verbatim).
    pub icon: String,
    /// Accumulated score. Float because streak awards multiply.
    pub points: f64,
    /// Questions answered correctly.
    pub correct: u32,
    /// Questions answered incorrectly.
    pub incorrect: u32,
    /// Current run of consecutive correct answers.
    pub streak: u32,
    /// Best streak seen this game.
    pub highest_streak: u32,
    /// Questions the player ran out of time on.
    pub questions_missed: u32,
    /// Per-question marking record ("Correct", "Incorrect",
    /// "Missed_Correct", "Missed_Incorrect").
    pub answers: Vec<String>,
    /// Seconds taken per question, for stats.
    pub times: Vec<f64>,
    /// True for the hosting player only.
    pub is_host: bool,
    /// Session flag: a live connection is bound to this player.
    pub is_connected: bool,
    /// Session flag: answered the current question.
    pub has_answered: bool,
}

impl Player {
    /// Creates a fresh player with zeroed stats and cleared session flags.
    pub fn new(
        name: impl Into<String>,
        colour: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            colour: colour.into(),
            icon: icon.into(),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

fn default_accuracy() -> f64 {
    0.5
}

/// A computer player: a [`Player`] record plus an accuracy.
///
/// `#[serde(flatten)]` merges the player fields into the bot's JSON
/// object, so a bot on the wire looks exactly like a player with one
/// extra `accuracy` field. Older payloads without `accuracy` fall back
/// to 0.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    #[serde(flatten)]
    pub player: Player,
    /// Probability in [0, 1] of picking the correct answer.
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,
}

impl Bot {
    /// Creates a fresh bot with the given accuracy.
    pub fn new(
        name: impl Into<String>,
        colour: impl Into<String>,
        icon: impl Into<String>,
        accuracy: f64,
    ) -> Self {
        Self {
            player: Player::new(name, colour, icon),
            accuracy,
        }
    }
}

// ---------------------------------------------------------------------------
// GameSettings
// ---------------------------------------------------------------------------

/// The static rules of one game, chosen before play starts.
///
/// Defaults are the classic ruleset: 4 player slots, 10 seconds per
/// question, +1/-1/0 points, streak awards at 1.1 x streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Total player slots, the host included.
    pub max_players: usize,
    /// Seconds allowed per question.
    pub time_limit: u64,
    /// Number of questions in the game.
    pub question_amount: usize,
    /// Points for a correct answer (without a streak).
    pub points_for_correct: f64,
    /// Points for a wrong answer (usually negative).
    pub points_for_incorrect: f64,
    /// Points for letting the clock run out.
    pub points_for_missed: f64,
    /// Streak multiplier at the start of the game and after every
    /// broken streak.
    pub streak_multiplier_base: f64,
    /// Factor the multiplier compounds by on each streaked answer.
    pub streak_compound: f64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            max_players: 4,
            time_limit: 10,
            question_amount: 10,
            points_for_correct: 1.0,
            points_for_incorrect: -1.0,
            points_for_missed: 0.0,
            streak_multiplier_base: 1.1,
            streak_compound: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// GameSnapshot
// ---------------------------------------------------------------------------

/// The complete shared state of one game.
///
/// This is the unit of synchronization: the host mutates it, `sync_game`
/// ships it whole, and `sync_players` / `sync_bots` ship its player and
/// bot lists. Everything a participant renders comes out of its local
/// copy of this structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSnapshot {
    /// The rules this game is played under.
    pub settings: GameSettings,
    /// Every known player, connected or not. Order is join order.
    pub players: Vec<Player>,
    /// Bots, all simulated host-side.
    pub bots: Vec<Bot>,
    /// The question deck.
    pub questions: Vec<Question>,
    /// Index of the question currently in play.
    pub current_question: usize,
    /// True once the host has locked the roster and begun play.
    /// Carried in `sync_game` so a joiner can tell a lobby from a game
    /// already in flight. Defaults to false for older save files.
    #[serde(default)]
    pub started: bool,
    /// Live streak multiplier. Starts at
    /// [`GameSettings::streak_multiplier_base`] and compounds during
    /// play, so it is state, not a setting.
    pub streak_multiplier: f64,
}

impl GameSnapshot {
    /// Creates an empty snapshot playing under `settings`.
    pub fn new(settings: GameSettings) -> Self {
        let streak_multiplier = settings.streak_multiplier_base;
        Self {
            settings,
            players: Vec::new(),
            bots: Vec::new(),
            questions: Vec::new(),
            current_question: 0,
            started: false,
            streak_multiplier,
        }
    }

    /// Looks a player up by name.
    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    /// Looks a player up by name, mutably.
    pub fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    /// Iterates over players with a live connection.
    pub fn connected_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_connected)
    }

    /// Number of players with a live connection.
    pub fn connected_count(&self) -> usize {
        self.connected_players().count()
    }

    /// The question currently in play, if the index is in range.
    pub fn question(&self) -> Option<&Question> {
        self.questions.get(self.current_question)
    }

    /// True when every connected player has answered the current
    /// question. Disconnected players don't count — a departed player
    /// must never hold the turn hostage. Vacuously true with nobody
    /// connected.
    pub fn all_connected_answered(&self) -> bool {
        self.connected_players().all(|p| p.has_answered)
    }

    /// Drops every player without a live connection. Returns how many
    /// were removed. Called when the game starts; mid-game drops are
    /// kept instead so the player can rejoin with their score.
    pub fn prune_disconnected(&mut self) -> usize {
        let before = self.players.len();
        self.players.retain(|p| p.is_connected);
        before - self.players.len()
    }

    /// Clears every player's `has_answered` for the next question cycle.
    pub fn clear_answers(&mut self) {
        for player in &mut self.players {
            player.has_answered = false;
        }
    }

    /// Clears both session flags on every player and the started
    /// marker. Run after loading a snapshot from disk: nobody is
    /// connected yet, nobody has answered the pending question, and
    /// the new hosting process has not started play.
    pub fn reset_session_flags(&mut self) {
        for player in &mut self.players {
            player.is_connected = false;
            player.has_answered = false;
        }
        self.started = false;
    }
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self::new(GameSettings::default())
    }
}

// =========================================================================
// Tests
// =========================================================================
