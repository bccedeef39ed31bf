use serde::{Deserialize, Serialize};

/// Request body for the plot-guessing feature
#[derive(Debug, Deserialize)]
pub struct GuessRequest {
    pub plot_description: String,
}

/// Request body for trivia generation
#[derive(Debug, Deserialize)]
pub struct TriviaRequest {
    pub movie_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeGuess {
    pub title: String,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub confidence: u8,
}

/// The model's best guess for a described plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieGuess {
    pub movie_title: String,
    #[serde(default)]
    pub release_year: Option<String>,
    /// Percentage, 0..=100
    pub confidence: u8,
    pub explanation: String,
    #[serde(default)]
    pub movie_image: Option<String>,
    #[serde(default)]
    pub alternative_guesses: Vec<AlternativeGuess>,
}

impl MovieGuess {
    /// Returned when the model answer could not be understood
    pub fn unidentified(reason: &str) -> Self {
        Self {
            movie_title: "Unable to identify the movie".to_string(),
            release_year: None,
            confidence: 0,
            explanation: format!(
                "I couldn't determine the movie from your description. Please provide more \
                 details about the plot, characters, or setting. Error: {}",
                reason
            ),
            movie_image: None,
            alternative_guesses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriviaQuestion {
    pub question: String,
    pub answers: Vec<String>,
    pub correct_answer_index: usize,
    pub explanation: String,
}

impl TriviaQuestion {
    pub fn is_well_formed(&self) -> bool {
        !self.question.trim().is_empty() && self.correct_answer_index < self.answers.len()
    }
}

/// Generated trivia for a single movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriviaSet {
    pub movie_title: String,
    pub questions: Vec<TriviaQuestion>,
}

impl TriviaSet {
    /// Placeholder set returned when generation produced nothing usable
    pub fn apology(movie_title: &str, reason: &str) -> Self {
        Self {
            movie_title: movie_title.to_string(),
            questions: vec![TriviaQuestion {
                question: format!(
                    "Sorry, I couldn't generate trivia questions for '{}'.",
                    movie_title
                ),
                answers: vec![
                    "Try again".to_string(),
                    "Choose a different movie".to_string(),
                    "Provide the full movie title".to_string(),
                    "Ensure the movie exists".to_string(),
                ],
                correct_answer_index: 2,
                explanation: format!("Error generating trivia: {}", reason),
            }],
        }
    }
}
