/// Gemini `generateContent` client
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    models::{MovieGuess, TriviaSet},
    services::oracle::{parse_guess, parse_trivia, MovieOracle},
};

#[derive(Clone)]
pub struct GeminiOracle {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiOracle {
    pub fn new(
        api_key: String,
        api_url: String,
        model: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    /// Sends a single-turn prompt and returns the text of the first candidate
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let url = format!("{}/models/{}:generateContent", self.api_url, self.model);
        let request = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http_client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Oracle(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), model = %self.model, "Gemini request rejected");
            return Err(AppError::Oracle(format!(
                "Model endpoint returned status {}",
                status.as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AppError::Oracle(format!("Unreadable response body: {}", e)))?;

        candidate_text(&body)
            .map(str::to_string)
            .ok_or_else(|| AppError::Oracle("Response contained no candidate text".to_string()))
    }
}

/// `candidates[0].content.parts[0].text` of a generateContent response
fn candidate_text(body: &Value) -> Option<&str> {
    body["candidates"][0]["content"]["parts"][0]["text"].as_str()
}

fn guess_prompt(plot_description: &str) -> String {
    format!(
        r#"As a film expert, identify the movie described by this plot:

"{}"

Give your best guess for the title, your confidence as an integer from 0 to 100
and a short explanation of your reasoning.

Return JSON:
{{
  "movie_title": "Title of the movie",
  "release_year": "Year of release, if known",
  "confidence": 85,
  "explanation": "Why this is the movie",
  "movie_image": "Poster URL or empty string",
  "alternative_guesses": [
    {{"title": "Alternative title", "year": "Year", "confidence": 10}}
  ]
}}"#,
        plot_description
    )
}

fn trivia_prompt(movie_title: &str) -> String {
    format!(
        r#"As a film trivia expert, write 5 challenging but fair multiple-choice questions
about the movie "{0}". Each question has 4 answers with exactly one correct,
identified by its index (0-3), and a brief explanation. Cover plot, characters,
cast and production. Only use accurate facts about "{0}".

Return JSON:
{{
  "movie_title": "{0}",
  "questions": [
    {{
      "question": "Question text",
      "answers": ["A", "B", "C", "D"],
      "correct_answer_index": 0,
      "explanation": "Why the answer is correct"
    }}
  ]
}}"#,
        movie_title
    )
}

#[async_trait::async_trait]
impl MovieOracle for GeminiOracle {
    async fn guess_movie(&self, plot_description: &str) -> AppResult<MovieGuess> {
        let text = self.generate(&guess_prompt(plot_description)).await?;
        let guess = parse_guess(&text);

        tracing::info!(
            movie_title = %guess.movie_title,
            confidence = guess.confidence,
            "Movie guessed from plot"
        );

        Ok(guess)
    }

    async fn generate_trivia(&self, movie_title: &str) -> AppResult<TriviaSet> {
        let text = self.generate(&trivia_prompt(movie_title)).await?;
        let trivia = parse_trivia(movie_title, &text);

        tracing::info!(
            movie_title,
            questions = trivia.questions.len(),
            "Trivia generated"
        );

        Ok(trivia)
    }
}
