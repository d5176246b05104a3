//! The askfolio question-answering pipeline.
//!
//! A question flows through retrieval (`askfolio-retrieval`), context
//! assembly, conversation composition and the retrying orchestrator
//! (`askfolio-providers`):
//!
//! 1. **Validate** the question
//! 2. **Retrieve** ranked chunks from the knowledge base
//! 3. **Assemble** them into a grounding context
//! 4. **Compose** system prompt, context, history and question
//! 5. **Send** to the LLM with bounded retries

pub mod context;
pub mod pipeline;
pub mod prompts;

#[cfg(test)]
mod test_helpers;

pub use context::{ConversationComposer, assemble};
pub use pipeline::{ChatReply, RagPipeline, Retrieval, Retriever};
