//! Trivia over the wire, end to end.
//!
//! `trivia host` stands up a game and plays the hosting seat; `trivia
//! join` connects to one and plays a participant. Both sides answer
//! automatically with a configurable accuracy, so two terminals (or a
//! terminal and a friend's machine) are enough to watch a whole game
//! run through the join, sync, and turn-barrier machinery.
//!
//! The tests at the bottom drive a real host and real clients over
//! loopback TCP.

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use quizwire_client::{ClientError, QuizClient};
use quizwire_game::{apply_submission, bot_answer, load_snapshot, save_snapshot, Submission};
use quizwire_host::{HostConfig, QuizHost};
use quizwire_protocol::{Bot, GameSettings, GameSnapshot, Player, Question};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "trivia", about = "Host or join a Quizwire trivia game")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Host a game and wait for everyone to join.
    Host {
        /// TCP port to listen on.
        #[arg(long, default_value_t = 1234)]
        port: u16,
        /// The hosting player's display name.
        #[arg(long, default_value = "Quinn")]
        name: String,
        /// Total player slots, host included.
        #[arg(long, default_value_t = 2)]
        max_players: usize,
        /// How many bots play along.
        #[arg(long, default_value_t = 1)]
        bots: usize,
        /// Chance in [0, 1] that the host answers correctly.
        #[arg(long, default_value_t = 0.9)]
        accuracy: f64,
        /// Resume a saved game instead of starting a fresh one.
        #[arg(long)]
        load: Option<PathBuf>,
        /// Write the final snapshot here when the game ends.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Join a hosted game.
    Join {
        /// Host address, e.g. 192.168.1.10:1234.
        addr: String,
        /// Display name to join under; rejoin uses the same one.
        #[arg(long, default_value = "guest")]
        name: String,
        /// Chance in [0, 1] of answering correctly.
        #[arg(long, default_value_t = 0.8)]
        accuracy: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Host {
            port,
            name,
            max_players,
            bots,
            accuracy,
            load,
            save,
        } => run_host(port, name, max_players, bots, accuracy, load, save).await,
        Command::Join {
            addr,
            name,
            accuracy,
        } => run_join(addr, name, accuracy).await,
    }
}

// ---------------------------------------------------------------------------
// Host role
// ---------------------------------------------------------------------------

async fn run_host(
    port: u16,
    name: String,
    max_players: usize,
    bots: usize,
    accuracy: f64,
    load: Option<PathBuf>,
    save: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let (snapshot, resumed) = match load {
        Some(path) => (load_snapshot(&path)?, true),
        None => (fresh_game(&name, max_players, bots), false),
    };
    let config = HostConfig {
        port,
        resumed_from_save: resumed,
        ..HostConfig::default()
    };
    let host = QuizHost::bind(config, snapshot).await?;
    println!("hosting on {}", host.local_addr());

    wait_for_lobby(&host, resumed).await?;

    let mut rng = rand::rng();
    let mut snapshot = host.start_game().await?;
    println!("game on: {} players, {} bots", snapshot.players.len(), snapshot.bots.len());

    while let Some(question) = snapshot.question().cloned() {
        println!(
            "\nQ{}/{}: {}",
            snapshot.current_question + 1,
            snapshot.questions.len(),
            question.question
        );

        // The hosting seat answers like any participant would.
        let mut me = snapshot
            .player(&name)
            .cloned()
            .ok_or("hosting player missing from the snapshot")?;
        let mut multiplier = snapshot.streak_multiplier;
        let pick = bot_answer(&Bot::new(&name, "", "", accuracy), &question, &mut rng);
        let correct = apply_submission(
            &snapshot.settings,
            &mut multiplier,
            &mut me,
            &question,
            Submission::Answered(&pick),
        );
        me.times.push(0.0);
        me.has_answered = true;
        println!("  {} answers \"{pick}\" — {}", name, verdict(correct));
        host.update_player(me).await?;

        // Bots take their turns on a working copy, then the roster is
        // synced back in one piece.
        let mut staged = host.snapshot().await?;
        quizwire_game::run_bot_turns(&mut staged, &mut rng);
        host.update_bots(staged.bots).await?;

        println!("  waiting for everyone to answer...");
        snapshot = host.advance_turn().await?;
    }

    print_standings(&snapshot);
    if let Some(path) = save {
        save_snapshot(&path, &snapshot)?;
        println!("saved to {}", path.display());
    }
    host.kill();
    Ok(())
}

/// Blocks until every seat is taken (fresh game) or every saved player
/// has come back (resumed game).
async fn wait_for_lobby(host: &QuizHost, resumed: bool) -> Result<(), Box<dyn Error>> {
    loop {
        let snap = host.snapshot().await?;
        let ready = if resumed {
            snap.players.iter().all(|p| p.is_connected)
        } else {
            snap.connected_count() >= snap.settings.max_players
        };
        if ready {
            return Ok(());
        }
        println!(
            "lobby: {}/{} connected",
            snap.connected_count(),
            if resumed { snap.players.len() } else { snap.settings.max_players }
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}

// ---------------------------------------------------------------------------
// Participant role
// ---------------------------------------------------------------------------

async fn run_join(addr: String, name: String, accuracy: f64) -> Result<(), Box<dyn Error>> {
    let client = QuizClient::connect(&addr, &name).await?;
    let mut me = client.join(Player::new(&name, "Cyan", "dice")).await?;
    if me.points != 0.0 {
        println!("rejoined as {} with {:.1} points", me.name, me.points);
    } else {
        println!("joined as {}", me.name);
    }

    println!("waiting for the host to start...");
    // Resolves at once for a mid-game rejoiner, whose catch-up
    // sync_game already said the game is under way. Either way the
    // current question is answerable immediately.
    client.wait_for_start().await?;

    // The mirror's question index is only refreshed by `sync_game`
    // (join and game start); between turns the foreground loop is the
    // one counting questions, released one step at a time by `move_on`.
    let view = client.snapshot().await;
    let settings = view.settings.clone();
    let questions = view.questions.clone();
    let mut index = view.current_question;
    let mut multiplier = view.streak_multiplier;

    let mut rng = rand::rng();
    while let Some(question) = questions.get(index) {
        println!("\nQ{}/{}: {}", index + 1, questions.len(), question.question);

        let pick = bot_answer(&Bot::new(&name, "", "", accuracy), question, &mut rng);
        let correct = apply_submission(
            &settings,
            &mut multiplier,
            &mut me,
            question,
            Submission::Answered(&pick),
        );
        me.times.push(0.0);
        me.has_answered = true;
        println!("  answered \"{pick}\" — {}", verdict(correct));
        client.send_player_state(me.clone()).await?;

        match client.wait_for_move_on().await {
            Ok(()) => {
                index += 1;
                // Adopt the host's copy of us: same math, but the host
                // is the authority and has cleared the turn flags.
                if let Some(mine) = client.my_player().await {
                    me = mine;
                }
            }
            Err(ClientError::SessionOver(reason)) => {
                println!("session over: {reason}");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    print_standings(&client.snapshot().await);
    client.close().await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared bits
// ---------------------------------------------------------------------------

fn verdict(correct: bool) -> &'static str {
    if correct { "correct!" } else { "wrong" }
}

fn print_standings(snapshot: &GameSnapshot) {
    let mut rows: Vec<(&str, f64, u32)> = snapshot
        .players
        .iter()
        .map(|p| (p.name.as_str(), p.points, p.highest_streak))
        .chain(
            snapshot
                .bots
                .iter()
                .map(|b| (b.player.name.as_str(), b.player.points, b.player.highest_streak)),
        )
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!("\nfinal standings:");
    for (rank, (name, points, streak)) in rows.iter().enumerate() {
        println!("  {}. {name:<16} {points:>6.1} pts (best streak {streak})", rank + 1);
    }
}

fn fresh_game(host_name: &str, max_players: usize, bots: usize) -> GameSnapshot {
    let deck = sample_deck();
    let settings = GameSettings {
        max_players,
        question_amount: deck.len(),
        ..GameSettings::default()
    };
    let mut snapshot = GameSnapshot::new(settings);
    snapshot.questions = deck;

    let mut host = Player::new(host_name, "Blue", "star");
    host.is_host = true;
    snapshot.players.push(host);

    for n in 1..=bots {
        snapshot
            .bots
            .push(Bot::new(format!("Bot {n}"), "Green", "robot", 0.5));
    }
    snapshot
}

/// A built-in deck so the demo works offline. `quizwire-game`'s `fetch`
/// feature can pull a real one from the Open Trivia DB instead.
fn sample_deck() -> Vec<Question> {
    let q = |question: &str, correct: &str, wrong: &[&str]| Question {
        category: "General Knowledge".to_string(),
        question_type: if wrong.len() == 1 { "boolean" } else { "multiple" }.to_string(),
        difficulty: "easy".to_string(),
        question: question.to_string(),
        correct_answer: correct.to_string(),
        incorrect_answers: wrong.iter().map(|s| s.to_string()).collect(),
    };
    vec![
        q(
            "Which planet is known as the Red Planet?",
            "Mars",
            &["Venus", "Jupiter", "Mercury"],
        ),
        q("The Great Wall of China is visible from the Moon.", "False", &["True"]),
        q(
            "What does CPU stand for?",
            "Central Processing Unit",
            &["Central Process Unit", "Computer Personal Unit", "Central Processor Unit"],
        ),
        q(
            "Which ocean is the largest?",
            "Pacific",
            &["Atlantic", "Indian", "Arctic"],
        ),
        q("Sound travels faster in water than in air.", "True", &["False"]),
        q(
            "Which element has the chemical symbol O?",
            "Oxygen",
            &["Gold", "Osmium", "Oganesson"],
        ),
    ]
}

// =========================================================================
// Tests
// =========================================================================
