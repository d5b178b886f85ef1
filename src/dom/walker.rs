//! Visitor-style traversal with early termination

use super::document::Document;
use super::node::NodeId;

/// Callbacks for `Document::traverse`
///
/// Each callback returns `true` to keep going. `begin` and `end` default to
/// continuing, so a walker only has to implement `for_each`.
pub trait TreeWalker {
    /// Called once with the traversal root before any descendant
    fn begin(&mut self, _doc: &Document, _node: NodeId) -> bool {
        true
    }

    /// Called for every descendant in document order; children of the
    /// traversal root have depth 0
    fn for_each(&mut self, doc: &Document, node: NodeId, depth: usize) -> bool;

    /// Called once with the traversal root after the last descendant
    fn end(&mut self, _doc: &Document, _node: NodeId) -> bool {
        true
    }
}

impl Document {
    /// Walk the descendants of `node`
    ///
    /// Returns `false` as soon as a callback does, without calling `end`.
    pub fn traverse<W: TreeWalker + ?Sized>(&self, node: NodeId, walker: &mut W) -> bool {
        if !walker.begin(self, node) {
            return false;
        }

        let mut depth = 0usize;
        let mut current = self.first_child(node);
        while let Some(cur) = current {
            if !walker.for_each(self, cur, depth) {
                return false;
            }

            if let Some(child) = self.first_child(cur) {
                depth += 1;
                current = Some(child);
                continue;
            }

            // Climb until a sibling turns up or the walk is back at `node`
            let mut climb = Some(cur);
            current = None;
            while let Some(c) = climb {
                if c == node {
                    break;
                }
                if let Some(next) = self.next_sibling(c) {
                    current = Some(next);
                    break;
                }
                climb = self.parent(c);
                if climb == Some(node) {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
        }

        walker.end(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::ParseOptions;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<String>,
        stop_at: Option<&'static str>,
        ended: bool,
    }

    impl TreeWalker for Recorder {
        fn for_each(&mut self, doc: &Document, node: NodeId, depth: usize) -> bool {
            let name = doc.name(node);
            self.seen.push(format!("{}{}", depth, name));
            self.stop_at != Some(name)
        }

        fn end(&mut self, _doc: &Document, _node: NodeId) -> bool {
            self.ended = true;
            true
        }
    }

    #[test]
    fn test_traverse_depths() {
        let mut doc = Document::new();
        doc.load_string("<r><a><b/><c><d/></c></a><e/></r>", ParseOptions::DEFAULT);
        let mut walker = Recorder::default();
        assert!(doc.traverse(doc.root(), &mut walker));
        assert_eq!(walker.seen, ["0r", "1a", "2b", "2c", "3d", "1e"]);
        assert!(walker.ended);

        let r = doc.document_element().unwrap();
        let mut walker = Recorder::default();
        doc.traverse(r, &mut walker);
        assert_eq!(walker.seen, ["0a", "1b", "1c", "2d", "0e"]);
    }

    #[test]
    fn test_traverse_stops() {
        let mut doc = Document::new();
        doc.load_string("<r><a/><b/><c/></r>", ParseOptions::DEFAULT);
        let mut walker = Recorder {
            stop_at: Some("b"),
            ..Recorder::default()
        };
        assert!(!doc.traverse(doc.root(), &mut walker));
        assert_eq!(walker.seen, ["0r", "1a", "1b"]);
        assert!(!walker.ended);
    }
}
