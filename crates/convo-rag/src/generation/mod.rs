//! Query refinement and answer generation

pub mod answer;
pub mod prompt;
pub mod refiner;

pub use answer::AnswerGenerator;
pub use prompt::PromptBuilder;
pub use refiner::{ModelSelector, QueryRefiner};
