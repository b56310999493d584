//! Find references: every line whose value is exactly the queried node's pointer.

use tower_lsp::lsp_types::{Location, Position, Url};

use crate::document::{DocumentError, DocumentStore};
use crate::structure::{pointer_of, Forest, NodeId};

/// Find the values referencing the node on the queried line.
///
/// Results are in document order. A line past the end of the document has no
/// references.
pub fn references_at_position(
    documents: &DocumentStore,
    uri: &Url,
    position: Position,
) -> Result<Vec<Location>, DocumentError> {
    let forest = documents.forest(uri)?;
    Ok(references_in_forest(&forest, uri, position))
}

pub(crate) fn references_in_forest(forest: &Forest, uri: &Url, position: Position) -> Vec<Location> {
    let line = position.line as usize;
    if line >= forest.len() {
        return Vec::new();
    }

    let pointer = pointer_of(forest, NodeId(line));

    forest
        .nodes()
        .iter()
        .filter(|node| node.value == pointer)
        .map(|node| Location::new(uri.clone(), node.value_range))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::parse;
    use tower_lsp::lsp_types::Range;

    fn uri() -> Url {
        Url::parse("file:///api.yaml").unwrap()
    }

    fn ranges(locations: &[Location]) -> Vec<Range> {
        locations.iter().map(|l| l.range).collect()
    }

    #[test]
    fn finds_quoted_and_plain_values() {
        let forest = parse("a:\n  $ref: \"#/t\"\nb:\n  $ref: #/t\nt:\n  type: string");
        let found = references_in_forest(&forest, &uri(), Position::new(4, 0));
        assert_eq!(
            ranges(&found),
            vec![
                Range::new(Position::new(1, 9), Position::new(1, 12)),
                Range::new(Position::new(3, 8), Position::new(3, 11)),
            ]
        );
    }

    #[test]
    fn exact_match_only() {
        let forest = parse("a: \"#/t/x\"\nb: \"#/tt\"\nt:\n  x: 1");
        assert!(references_in_forest(&forest, &uri(), Position::new(2, 0)).is_empty());
        assert_eq!(references_in_forest(&forest, &uri(), Position::new(3, 2)).len(), 1);
    }

    #[test]
    fn past_end_of_document() {
        let forest = parse("t: 1\n");
        assert!(references_in_forest(&forest, &uri(), Position::new(1, 0)).is_empty());
    }
}
