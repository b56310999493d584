//! Go to definition: follow a `$ref`-style pointer value to the key it names.

use tower_lsp::lsp_types::{Location, Position, Url};

use crate::document::{DocumentError, DocumentStore};
use crate::structure::{resolve, Forest};

/// Resolve the value on the queried line as a pointer into the same document.
///
/// Returns `Ok(None)` when the line does not exist or its value does not
/// address any node.
pub fn definition_at_position(
    documents: &DocumentStore,
    uri: &Url,
    position: Position,
) -> Result<Option<Location>, DocumentError> {
    let forest = documents.forest(uri)?;
    Ok(definition_in_forest(&forest, uri, position))
}

pub(crate) fn definition_in_forest(
    forest: &Forest,
    uri: &Url,
    position: Position,
) -> Option<Location> {
    let node = forest.line(position.line as usize)?;
    let target = resolve(forest, &node.value)?;

    Some(Location::new(uri.clone(), forest.node(target).key_range))
}
