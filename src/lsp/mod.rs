//! LSP protocol feature implementations.
//!
//! This module provides implementations for LSP features:
//! - Go to definition for `#/...` pointer values
//! - Find references to a key from pointer values

mod definition;
mod references;

pub use definition::definition_at_position;
pub use references::references_at_position;
