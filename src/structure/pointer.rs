//! JSON-Pointer-style addressing of forest nodes (`#/a/b/c`).
//!
//! Keys are used verbatim as path segments: `~` and `/` are not escaped.

use super::parser::{Forest, NodeId};

/// Canonical pointer of a node, built from the keys on its path to the root.
pub fn pointer_of(forest: &Forest, id: NodeId) -> String {
    let mut keys = Vec::new();
    let mut current = Some(id);

    while let Some(id) = current {
        let node = forest.node(id);
        keys.push(node.key.as_str());
        current = node.parent;
    }

    keys.reverse();
    format!("#/{}", keys.join("/"))
}

/// Find the node addressed by a pointer.
///
/// The first segment (normally `#`) is not inspected. Returns `None` when the
/// pointer has no path after it or any segment is missing.
pub fn resolve(forest: &Forest, pointer: &str) -> Option<NodeId> {
    let mut segments = pointer.split('/').skip(1);

    let mut current = forest.root(segments.next()?)?;
    for key in segments {
        current = forest.child(current, key)?;
    }

    Some(current)
}
