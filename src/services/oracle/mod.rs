/// Generative movie helpers backed by a large language model
///
/// The oracle never fails because the model said something odd: answers that
/// cannot be understood degrade to placeholder values. Only transport and
/// protocol failures surface as errors.
use crate::{
    error::AppResult,
    models::{MovieGuess, TriviaSet},
};

pub mod gemini;
mod parse;

pub use gemini::GeminiOracle;
pub use parse::{parse_guess, parse_trivia, strip_json_fence};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieOracle: Send + Sync {
    /// Identifies a movie from a free-text plot description
    async fn guess_movie(&self, plot_description: &str) -> AppResult<MovieGuess>;

    /// Produces multiple-choice trivia about the named movie
    async fn generate_trivia(&self, movie_title: &str) -> AppResult<TriviaSet>;
}
