//! Retrieval-augmented generation over the job index
//!
//! The orchestrator retrieves and packs context and composes the prompt;
//! a [`Generator`] backend is only involved when the caller asks to chat.

pub mod context;
pub mod generator;
pub mod location;
pub mod orchestrator;

pub use context::{ContextItem, RetrievalContext};
pub use generator::{Generator, OpenAiGenerator};
pub use orchestrator::{build_prompt, Answer, ChatReply, Orchestrator, Retrieved};
