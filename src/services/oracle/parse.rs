use serde::Deserialize;
use serde_json::Value;

use crate::models::{AlternativeGuess, MovieGuess, TriviaQuestion, TriviaSet};

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Returns the body of the first ```json fenced block, or the trimmed text
pub fn strip_json_fence(text: &str) -> &str {
    match text.split_once(JSON_FENCE) {
        Some((_, rest)) => rest.split(FENCE).next().unwrap_or(rest).trim(),
        None => text.trim(),
    }
}

/// Model output as written, before clamping
#[derive(Debug, Deserialize)]
struct RawGuess {
    movie_title: String,
    #[serde(default)]
    release_year: Value,
    #[serde(default)]
    confidence: Value,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    movie_image: Option<String>,
    #[serde(default)]
    alternative_guesses: Vec<RawAlternative>,
}

#[derive(Debug, Deserialize)]
struct RawAlternative {
    title: String,
    #[serde(default)]
    year: Value,
    #[serde(default)]
    confidence: Value,
}

#[derive(Debug, Deserialize)]
struct RawTrivia {
    #[serde(default)]
    movie_title: Option<String>,
    #[serde(default)]
    questions: Vec<Value>,
}

/// Percent from a number or numeric string, clamped to 0..=100
fn percent(value: &Value) -> u8 {
    let raw = match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().trim_end_matches('%').parse().unwrap_or_default(),
        _ => 0.0,
    };

    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}

/// Year given either as a string or a bare number; blanks are dropped
fn year(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Interprets a plot-guess answer, falling back to an "unidentified" guess
pub fn parse_guess(text: &str) -> MovieGuess {
    let raw: RawGuess = match serde_json::from_str(strip_json_fence(text)) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, "Unparseable movie guess from model");
            return MovieGuess::unidentified(&e.to_string());
        }
    };

    MovieGuess {
        movie_title: raw.movie_title,
        release_year: year(&raw.release_year),
        confidence: percent(&raw.confidence),
        explanation: raw.explanation,
        movie_image: raw.movie_image.filter(|url| !url.trim().is_empty()),
        alternative_guesses: raw
            .alternative_guesses
            .into_iter()
            .map(|alt| AlternativeGuess {
                title: alt.title,
                year: year(&alt.year),
                confidence: percent(&alt.confidence),
            })
            .collect(),
    }
}

/// Interprets a trivia answer for `movie_title`.
///
/// Questions that do not decode or whose correct index points outside the
/// answers are dropped. If nothing usable remains the apology set is returned.
pub fn parse_trivia(movie_title: &str, text: &str) -> TriviaSet {
    let raw: RawTrivia = match serde_json::from_str(strip_json_fence(text)) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(movie_title, error = %e, "Unparseable trivia from model");
            return TriviaSet::apology(movie_title, &e.to_string());
        }
    };

    let total = raw.questions.len();
    let questions: Vec<TriviaQuestion> = raw
        .questions
        .into_iter()
        .filter_map(|q| serde_json::from_value::<TriviaQuestion>(q).ok())
        .filter(TriviaQuestion::is_well_formed)
        .collect();

    if questions.len() < total {
        tracing::debug!(
            movie_title,
            dropped = total - questions.len(),
            "Dropped malformed trivia questions"
        );
    }

    if questions.is_empty() {
        return TriviaSet::apology(movie_title, "no usable questions in model response");
    }

    TriviaSet {
        movie_title: raw
            .movie_title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| movie_title.to_string()),
        questions,
    }
}
