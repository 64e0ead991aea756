//! Poem generation from a captured picture.
//!
//! This module provides:
//! * [`PoemGenerator`] — async trait implemented by all generator backends.
//! * [`GeminiGenerator`] — the remote `generateContent` backend.
//! * [`RetryingGenerator`] / [`RetryPolicy`] — bounded retries with backoff.
//! * [`PromptBuilder`] — the request payload around the fixed instruction.
//! * [`Poem`] / [`parse_poem`] — tolerant parsing of model output.
//! * [`GenerationError`] — error variants, split into transient and final.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use poetry_printer::camera::CapturedImage;
//! use poetry_printer::config::AppConfig;
//! use poetry_printer::poem::{GeminiGenerator, PoemGenerator, RetryPolicy, RetryingGenerator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let key = config.generator.resolve_api_key().unwrap();
//!
//!     let generator = RetryingGenerator::new(
//!         GeminiGenerator::from_config(&config.generator, key),
//!         RetryPolicy::from_config(&config.generator),
//!     );
//!
//!     let image = CapturedImage::jpeg(std::fs::read("desk.jpg").unwrap());
//!     let poem = generator.generate(&image).await.unwrap();
//!     println!("{}", poem.body);
//! }
//! ```

pub mod gemini;
pub mod generator;
pub mod parse;
pub mod prompt;
pub mod retry;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use gemini::GeminiGenerator;
pub use generator::{GenerationError, PoemGenerator};
pub use parse::{parse_poem, Poem};
pub use prompt::PromptBuilder;
pub use retry::{RetryPolicy, RetryingGenerator};
