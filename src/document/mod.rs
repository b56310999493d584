//! Document state management and text utilities.
//!
//! This module provides:
//! - `TextBuffer` for byte offset <-> LSP position conversion and edits
//! - `DocumentState` and `DocumentStore` for document lifecycle management

mod state;
mod text;

pub use state::{DocumentError, DocumentState, DocumentStore, ForestState};
pub use text::{utf16_len, BufferError, TextBuffer};
