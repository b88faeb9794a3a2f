//! Answer generation: prompt construction and the RAG query engine

mod engine;
pub mod prompt;

pub use engine::{confidence_from_similarity, RagQueryEngine};
pub use prompt::PromptBuilder;
