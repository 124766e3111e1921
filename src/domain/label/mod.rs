//! Labeling phase: LLM client, prompt construction, escalation loop.

pub mod client;
pub mod context;
pub mod engine;
pub mod prompts;

pub use engine::{run_labeling, LabelEngineError, LabelSummary};
