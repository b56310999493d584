//! Structural view of a document.
//!
//! This module provides:
//! - `parse` for turning indentation into a navigable `Forest`
//! - `pointer_of` and `resolve` for `#/a/b` style references between nodes

mod parser;
mod pointer;

pub use parser::{parse, Forest, Node, NodeId};
pub use pointer::{pointer_of, resolve};
