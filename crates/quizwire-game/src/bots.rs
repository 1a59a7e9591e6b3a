//! Bot answer selection.

use quizwire_protocol::{Bot, Question};
use rand::Rng;

/// Picks a bot's answer for a question.
///
/// The bot is correct with probability [`Bot::accuracy`]; otherwise it
/// picks a uniformly random wrong option. A question with no wrong
/// options (shouldn't happen, but save files are user input) falls back
/// to the correct answer.
pub fn bot_answer<R: Rng>(bot: &Bot, question: &Question, rng: &mut R) -> String {
    let correct = rng.random::<f64>() < bot.accuracy;

    if correct || question.incorrect_answers.is_empty() {
        question.correct_answer.clone()
    } else {
        let idx = rng.random_range(0..question.incorrect_answers.len());
        question.incorrect_answers[idx].clone()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn question() -> Question {
        Question {
            category: "General Knowledge".into(),
            question_type: "boolean".into(),
            difficulty: "easy".into(),
            question: "The sky is blue.".into(),
            correct_answer: "True".into(),
            incorrect_answers: vec!["False".into()],
        }
    }

    #[test]
    fn test_perfect_bot_always_answers_correctly() {
        let bot = Bot::new("Sharp", "", "", 1.0);
        let mut rng = StdRng::seed_from_u64(0);

        for _ in 0..50 {
            assert_eq!(bot_answer(&bot, &question(), &mut rng), "True");
        }
    }

    #[test]
    fn test_hopeless_bot_never_answers_correctly() {
        let bot = Bot::new("Blunt", "", "", 0.0);
        let mut rng = StdRng::seed_from_u64(0);

        for _ in 0..50 {
            assert_eq!(bot_answer(&bot, &question(), &mut rng), "False");
        }
    }

    #[test]
    fn test_bot_falls_back_to_correct_without_wrong_options() {
        let bot = Bot::new("Blunt", "", "", 0.0);
        let mut q = question();
        q.incorrect_answers.clear();
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(bot_answer(&bot, &q, &mut rng), "True");
    }

    #[test]
    fn test_wrong_picks_cover_all_options() {
        let bot = Bot::new("Blunt", "", "", 0.0);
        let mut q = question();
        q.incorrect_answers =
            vec!["A".into(), "B".into(), "C".into()];
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            seen.insert(bot_answer(&bot, &q, &mut rng));
        }
        assert_eq!(seen.len(), 3);
    }
}
