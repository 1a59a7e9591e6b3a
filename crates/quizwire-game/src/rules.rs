//! Scoring rules.
//!
//! Marking is pure arithmetic over model types — no I/O, no clock, no
//! randomness. Every endpoint runs the same rules: participants score
//! their own answers locally, the host scores itself and its bots, and
//! the synced numbers agree because the math does.
//!
//! Streaks share one multiplier across the whole game (it lives on the
//! snapshot, not the player): each streaked correct answer compounds it,
//! any wrong answer resets it to the base. The award for a streaked
//! answer is `multiplier * streak`, so long runs grow fast.

use quizwire_protocol::{GameSettings, GameSnapshot, Player, Question};
use rand::Rng;

use crate::bots::bot_answer;

/// What a player did with the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission<'a> {
    /// Answered in time with this option.
    Answered(&'a str),
    /// Ran out of time; the game auto-picked this option for them.
    MissedAutoPick(&'a str),
    /// Ran out of time and nothing was picked.
    MissedBlank,
}

/// Applies one submission to one player. Returns whether it scored as
/// correct.
///
/// The answers record keeps the miss visible: an in-time answer is
/// logged as `"Correct"` / `"Incorrect"`, an auto-picked one as
/// `"Missed_Correct"` / `"Missed_Incorrect"`, and a blank miss as
/// `"Missed_Incorrect"` with [`GameSettings::points_for_missed`]
/// instead of the incorrect penalty.
pub fn apply_submission(
    settings: &GameSettings,
    streak_multiplier: &mut f64,
    player: &mut Player,
    question: &Question,
    submission: Submission<'_>,
) -> bool {
    match submission {
        Submission::Answered(answer) => {
            player.answers.push(String::new());
            mark(settings, streak_multiplier, player, question, answer)
        }
        Submission::MissedAutoPick(answer) => {
            player.answers.push("Missed_".to_string());
            let correct =
                mark(settings, streak_multiplier, player, question, answer);
            player.questions_missed += 1;
            correct
        }
        Submission::MissedBlank => {
            player.answers.push("Missed_Incorrect".to_string());
            player.points += settings.points_for_missed;
            player.questions_missed += 1;
            false
        }
    }
}

/// Scores an answer string against the question, appending the marking
/// to the entry [`apply_submission`] just pushed.
fn mark(
    settings: &GameSettings,
    streak_multiplier: &mut f64,
    player: &mut Player,
    question: &Question,
    answer: &str,
) -> bool {
    let correct = answer == question.correct_answer;
    let entry = player
        .answers
        .last_mut()
        .expect("apply_submission seeds the entry");

    if correct {
        entry.push_str("Correct");

        let mut award = settings.points_for_correct;
        if player.streak > 0 {
            // An unbroken run compounds the shared multiplier first,
            // then the award scales with the streak length.
            *streak_multiplier *= settings.streak_compound;
            award = *streak_multiplier * f64::from(player.streak);
        }
        player.points += award;

        player.streak += 1;
        player.highest_streak = player.highest_streak.max(player.streak);
        player.correct += 1;
    } else {
        entry.push_str("Incorrect");

        player.streak = 0;
        *streak_multiplier = settings.streak_multiplier_base;
        player.incorrect += 1;
        player.points += settings.points_for_incorrect;
    }

    correct
}

/// Answers the current question for every bot and scores it.
///
/// Runs host-side only; `times` gets a zero entry per bot so stats line
/// up with the humans'. A no-op when the question index is out of range.
pub fn run_bot_turns<R: Rng>(snapshot: &mut GameSnapshot, rng: &mut R) {
    let Some(question) = snapshot.question().cloned() else {
        return;
    };
    let settings = snapshot.settings.clone();

    for bot in &mut snapshot.bots {
        let answer = bot_answer(bot, &question, rng);
        apply_submission(
            &settings,
            &mut snapshot.streak_multiplier,
            &mut bot.player,
            &question,
            Submission::Answered(&answer),
        );
        bot.player.times.push(0.0);
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use quizwire_protocol::Bot;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn question() -> Question {
        Question {
            category: "General Knowledge".into(),
            question_type: "multiple".into(),
            difficulty: "easy".into(),
            question: "Which planet is known as the Red Planet?".into(),
            correct_answer: "Mars".into(),
            incorrect_answers: vec![
                "Venus".into(),
                "Jupiter".into(),
                "Mercury".into(),
            ],
        }
    }

    fn fresh() -> (GameSettings, f64, Player) {
        let settings = GameSettings::default();
        let multiplier = settings.streak_multiplier_base;
        (settings, multiplier, Player::new("Alice", "", ""))
    }

    #[test]
    fn test_first_correct_answer_scores_base_points() {
        let (settings, mut multiplier, mut player) = fresh();

        let correct = apply_submission(
            &settings,
            &mut multiplier,
            &mut player,
            &question(),
            Submission::Answered("Mars"),
        );

        assert!(correct);
        assert_eq!(player.points, 1.0);
        assert_eq!(player.streak, 1);
        assert_eq!(player.highest_streak, 1);
        assert_eq!(player.correct, 1);
        assert_eq!(player.answers, vec!["Correct"]);
        // No streak yet when this answer landed, so no compounding.
        assert_eq!(multiplier, 1.1);
    }

    #[test]
    fn test_streak_awards_multiplier_times_streak() {
        let (settings, mut multiplier, mut player) = fresh();
        let q = question();

        for _ in 0..3 {
            apply_submission(
                &settings,
                &mut multiplier,
                &mut player,
                &q,
                Submission::Answered("Mars"),
            );
        }

        // 1.0 base, then 1.1 * 1, then 1.1 * 2 (compound factor is 1.0
        // by default, so the multiplier holds at 1.1).
        assert!((player.points - 4.3).abs() < 1e-9);
        assert_eq!(player.streak, 3);
        assert_eq!(player.highest_streak, 3);
    }

    #[test]
    fn test_streak_multiplier_compounds_when_configured() {
        let (mut settings, mut multiplier, mut player) = fresh();
        settings.streak_compound = 1.5;
        let q = question();

        apply_submission(
            &settings,
            &mut multiplier,
            &mut player,
            &q,
            Submission::Answered("Mars"),
        );
        assert_eq!(multiplier, 1.1);

        apply_submission(
            &settings,
            &mut multiplier,
            &mut player,
            &q,
            Submission::Answered("Mars"),
        );
        // Second correct in a row: 1.1 * 1.5 = 1.65, award 1.65 * 1.
        assert!((multiplier - 1.65).abs() < 1e-9);
        assert!((player.points - 2.65).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_answer_breaks_streak_and_resets_multiplier() {
        let (settings, mut multiplier, mut player) = fresh();
        let q = question();

        apply_submission(
            &settings,
            &mut multiplier,
            &mut player,
            &q,
            Submission::Answered("Mars"),
        );
        apply_submission(
            &settings,
            &mut multiplier,
            &mut player,
            &q,
            Submission::Answered("Mars"),
        );
        let correct = apply_submission(
            &settings,
            &mut multiplier,
            &mut player,
            &q,
            Submission::Answered("Venus"),
        );

        assert!(!correct);
        assert_eq!(player.streak, 0);
        assert_eq!(player.highest_streak, 2);
        assert_eq!(player.incorrect, 1);
        assert_eq!(multiplier, settings.streak_multiplier_base);
        // 1.0 + 1.1 - 1.0
        assert!((player.points - 1.1).abs() < 1e-9);
        assert_eq!(
            player.answers,
            vec!["Correct", "Correct", "Incorrect"]
        );
    }

    #[test]
    fn test_blank_miss_scores_missed_points_only() {
        let (settings, mut multiplier, mut player) = fresh();

        let correct = apply_submission(
            &settings,
            &mut multiplier,
            &mut player,
            &question(),
            Submission::MissedBlank,
        );

        assert!(!correct);
        assert_eq!(player.points, 0.0);
        assert_eq!(player.questions_missed, 1);
        assert_eq!(player.incorrect, 0);
        assert_eq!(player.answers, vec!["Missed_Incorrect"]);
    }

    #[test]
    fn test_auto_pick_miss_keeps_the_missed_prefix() {
        let (settings, mut multiplier, mut player) = fresh();

        apply_submission(
            &settings,
            &mut multiplier,
            &mut player,
            &question(),
            Submission::MissedAutoPick("Mars"),
        );

        assert_eq!(player.answers, vec!["Missed_Correct"]);
        assert_eq!(player.questions_missed, 1);
        // A lucky auto-pick still scores.
        assert_eq!(player.points, 1.0);
        assert_eq!(player.streak, 1);
    }

    #[test]
    fn test_bot_turns_score_every_bot() {
        let mut snapshot = GameSnapshot::default();
        snapshot.questions.push(question());
        snapshot.bots.push(Bot::new("Sharp", "", "", 1.0));
        snapshot.bots.push(Bot::new("Blunt", "", "", 0.0));

        let mut rng = StdRng::seed_from_u64(7);
        run_bot_turns(&mut snapshot, &mut rng);

        let sharp = &snapshot.bots[0].player;
        assert_eq!(sharp.correct, 1);
        assert_eq!(sharp.points, 1.0);
        assert_eq!(sharp.times, vec![0.0]);

        let blunt = &snapshot.bots[1].player;
        assert_eq!(blunt.incorrect, 1);
        assert_eq!(blunt.points, -1.0);
    }

    #[test]
    fn test_bot_turns_without_a_question_do_nothing() {
        let mut snapshot = GameSnapshot::default();
        snapshot.bots.push(Bot::new("Idle", "", "", 0.5));
        snapshot.current_question = 5;

        let mut rng = StdRng::seed_from_u64(7);
        run_bot_turns(&mut snapshot, &mut rng);

        assert!(snapshot.bots[0].player.answers.is_empty());
    }
}
