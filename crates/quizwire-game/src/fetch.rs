//! Question fetching from the Open Trivia Database.
//!
//! `https://opentdb.com/api.php` serves JSON question batches filtered
//! by amount, category id, difficulty, and type. Texts come back
//! HTML-entity-escaped (`&quot;Schadenfreude&quot;`), so every question
//! is decoded before it enters the model.
//!
//! Behind the `fetch` feature: offline games load questions from a save
//! instead and never need an HTTP stack.

use quizwire_protocol::Question;
use serde::Deserialize;

use crate::GameError;

const API_URL: &str = "https://opentdb.com/api.php";

/// Filters for one question batch.
///
/// `None` means "any" and omits the parameter entirely. Category ids
/// are the API's own numbering (9 through 32).
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// How many questions to request.
    pub amount: usize,
    /// API category id, e.g. 18 for "Science: Computers".
    pub category: Option<u16>,
    /// "easy", "medium" or "hard".
    pub difficulty: Option<String>,
    /// "multiple" or "boolean".
    pub question_type: Option<String>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            amount: 10,
            category: None,
            difficulty: None,
            question_type: None,
        }
    }
}

/// The API's top-level response shape.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    response_code: u8,
    #[serde(default)]
    results: Vec<ApiQuestion>,
}

/// One question as the API sends it. `type` is a Rust keyword, hence
/// the rename.
#[derive(Debug, Deserialize)]
struct ApiQuestion {
    category: String,
    #[serde(rename = "type")]
    question_type: String,
    difficulty: String,
    question: String,
    correct_answer: String,
    incorrect_answers: Vec<String>,
}

/// Fetches one batch of questions.
///
/// # Errors
/// [`GameError::Http`] for transport and HTTP-status failures,
/// [`GameError::Api`] when the API answers with a non-zero
/// `response_code` (1 = not enough questions for these filters,
/// 2 = invalid parameter).
pub async fn fetch_questions(
    options: &FetchOptions,
) -> Result<Vec<Question>, GameError> {
    let mut query: Vec<(&str, String)> =
        vec![("amount", options.amount.to_string())];
    if let Some(category) = options.category {
        query.push(("category", category.to_string()));
    }
    if let Some(difficulty) = &options.difficulty {
        query.push(("difficulty", difficulty.clone()));
    }
    if let Some(question_type) = &options.question_type {
        query.push(("type", question_type.clone()));
    }

    tracing::debug!(amount = options.amount, "fetching questions");

    let response: ApiResponse = reqwest::Client::new()
        .get(API_URL)
        .query(&query)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if response.response_code != 0 {
        return Err(GameError::Api(response.response_code));
    }

    Ok(response.results.into_iter().map(into_question).collect())
}

/// Converts an API question into the model, decoding entities in the
/// player-visible texts.
fn into_question(api: ApiQuestion) -> Question {
    Question {
        category: api.category,
        question_type: api.question_type,
        difficulty: api.difficulty,
        question: decode_entities(&api.question),
        correct_answer: decode_entities(&api.correct_answer),
        incorrect_answers: api
            .incorrect_answers
            .iter()
            .map(|a| decode_entities(a))
            .collect(),
    }
}

/// Decodes the HTML entities the API actually emits. `&amp;` goes last
/// so double-escaped text (`&amp;quot;`) resolves one level, not two.
fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

// =========================================================================
// Tests
// =========================================================================
