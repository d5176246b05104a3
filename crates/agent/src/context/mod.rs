//! Turning ranked chunks and caller history into the model's input.

pub mod assembler;
pub mod composer;

pub use assembler::{CHUNK_SEPARATOR, assemble};
pub use composer::ConversationComposer;
