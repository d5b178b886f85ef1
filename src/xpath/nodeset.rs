//! XPath nodes and node-sets
//!
//! A result node is either a tree node or an attribute paired with the
//! element that owns it. Node-sets carry a tag recording what is known
//! about their order so that sorting can be skipped when it is already
//! established.

use std::collections::HashSet;
use std::ops::Index;

use crate::dom::{AttrId, Document, NodeId};

/// A node or an attribute in an XPath result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum XPathNode {
    #[default]
    Null,
    Node(NodeId),
    Attribute { attr: AttrId, parent: NodeId },
}

impl XPathNode {
    pub fn is_null(&self) -> bool {
        matches!(self, XPathNode::Null)
    }

    /// The tree node, if this is not an attribute
    pub fn node(&self) -> Option<NodeId> {
        match self {
            XPathNode::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn attribute(&self) -> Option<AttrId> {
        match self {
            XPathNode::Attribute { attr, .. } => Some(*attr),
            _ => None,
        }
    }

    /// Parent of the node, or the owner of the attribute
    pub fn parent(&self, doc: &Document) -> Option<NodeId> {
        match self {
            XPathNode::Null => None,
            XPathNode::Node(id) => doc.parent(*id),
            XPathNode::Attribute { parent, .. } => Some(*parent),
        }
    }
}

impl From<NodeId> for XPathNode {
    fn from(id: NodeId) -> Self {
        XPathNode::Node(id)
    }
}

impl From<Option<NodeId>> for XPathNode {
    fn from(id: Option<NodeId>) -> Self {
        id.map_or(XPathNode::Null, XPathNode::Node)
    }
}

/// What is known about the order of a node-set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeSetOrder {
    #[default]
    Unsorted,
    /// Document order
    Sorted,
    /// Reverse document order
    SortedReverse,
}

/// Ordered collection of distinct result nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XPathNodeSet {
    nodes: Vec<XPathNode>,
    order: NodeSetOrder,
}

impl XPathNodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<XPathNode>, order: NodeSetOrder) -> Self {
        XPathNodeSet { nodes, order }
    }

    pub(crate) fn with_order(order: NodeSetOrder) -> Self {
        XPathNodeSet {
            nodes: Vec::new(),
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<XPathNode> {
        self.nodes.get(index).copied()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, XPathNode> {
        self.nodes.iter()
    }

    pub fn as_slice(&self) -> &[XPathNode] {
        &self.nodes
    }

    pub fn order(&self) -> NodeSetOrder {
        self.order
    }

    /// Overwrite the tag without touching the nodes
    pub fn set_order(&mut self, order: NodeSetOrder) {
        self.order = order;
    }

    /// First node in document order, whatever the tag says
    pub fn first(&self, doc: &Document) -> XPathNode {
        match self.order {
            NodeSetOrder::Sorted => self.nodes.first().copied().unwrap_or_default(),
            NodeSetOrder::SortedReverse => self.nodes.last().copied().unwrap_or_default(),
            NodeSetOrder::Unsorted => {
                let ranks = DocumentOrder::new(doc);
                self.nodes
                    .iter()
                    .copied()
                    .min_by_key(|n| ranks.key(*n))
                    .unwrap_or_default()
            }
        }
    }

    /// Sort by document order (or its reverse) and drop duplicates
    pub fn sort(&mut self, doc: &Document, reverse: bool) {
        let ranks = DocumentOrder::new(doc);
        self.nodes.sort_by_cached_key(|n| ranks.key(*n));
        self.nodes.dedup();
        if reverse {
            self.nodes.reverse();
            self.order = NodeSetOrder::SortedReverse;
        } else {
            self.order = NodeSetOrder::Sorted;
        }
    }

    pub(crate) fn push(&mut self, node: XPathNode) {
        self.nodes.push(node);
    }

    /// Drop repeated nodes, keeping first occurrences in place
    pub(crate) fn dedup_unsorted(&mut self) {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        self.nodes.retain(|n| seen.insert(*n));
    }

    pub(crate) fn append(&mut self, other: XPathNodeSet) {
        self.nodes.extend(other.nodes);
    }

    pub(crate) fn split_off(&mut self, at: usize) -> Vec<XPathNode> {
        self.nodes.split_off(at)
    }
}

impl Index<usize> for XPathNodeSet {
    type Output = XPathNode;

    fn index(&self, index: usize) -> &XPathNode {
        &self.nodes[index]
    }
}

impl<'a> IntoIterator for &'a XPathNodeSet {
    type Item = &'a XPathNode;
    type IntoIter = std::slice::Iter<'a, XPathNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl IntoIterator for XPathNodeSet {
    type Item = XPathNode;
    type IntoIter = std::vec::IntoIter<XPathNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

/// Sort keys for result nodes
///
/// Attributes sort right after their owner, in list order.
pub(crate) struct DocumentOrder<'d> {
    doc: &'d Document,
}

impl<'d> DocumentOrder<'d> {
    pub(crate) fn new(doc: &'d Document) -> Self {
        DocumentOrder { doc }
    }

    pub(crate) fn key(&self, node: XPathNode) -> (u64, u64) {
        match node {
            XPathNode::Null => (u64::MAX, u64::MAX),
            XPathNode::Node(id) => (self.doc.order_key(id), 0),
            XPathNode::Attribute { attr, parent } => {
                (self.doc.order_key(parent), self.doc.attr_position(attr))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::ParseOptions;
    use crate::dom::NodeKind;

    fn sample() -> (Document, Vec<XPathNode>) {
        let mut doc = Document::new();
        doc.load_string("<r x='1' y='2'><a/><b/></r>", ParseOptions::DEFAULT);
        let r = doc.document_element().unwrap();
        let a = doc.first_child(r).unwrap();
        let b = doc.next_sibling(a).unwrap();
        let x = doc.first_attribute(r).unwrap();
        let y = doc.next_attribute(x).unwrap();
        let nodes = vec![
            XPathNode::Node(r),
            XPathNode::Attribute { attr: x, parent: r },
            XPathNode::Attribute { attr: y, parent: r },
            XPathNode::Node(a),
            XPathNode::Node(b),
        ];
        (doc, nodes)
    }

    #[test]
    fn test_sort_and_dedup() {
        let (doc, nodes) = sample();
        let mut set = XPathNodeSet::from_nodes(
            vec![nodes[4], nodes[2], nodes[0], nodes[3], nodes[1], nodes[2]],
            NodeSetOrder::Unsorted,
        );
        set.sort(&doc, false);
        assert_eq!(set.as_slice(), nodes.as_slice());
        assert_eq!(set.order(), NodeSetOrder::Sorted);

        set.sort(&doc, true);
        assert_eq!(set[0], nodes[4]);
        assert_eq!(set.order(), NodeSetOrder::SortedReverse);
    }

    #[test]
    fn test_first_uses_tag() {
        let (doc, nodes) = sample();
        let set = XPathNodeSet::from_nodes(vec![nodes[3], nodes[1]], NodeSetOrder::Unsorted);
        assert_eq!(set.first(&doc), nodes[1]);
        let set = XPathNodeSet::from_nodes(vec![nodes[4], nodes[3]], NodeSetOrder::SortedReverse);
        assert_eq!(set.first(&doc), nodes[3]);
        assert_eq!(XPathNodeSet::new().first(&doc), XPathNode::Null);
    }

    #[test]
    fn test_sort_after_edits() {
        let (mut doc, nodes) = sample();
        let r = nodes[0].node().unwrap();
        let b = nodes[4].node().unwrap();
        let a = nodes[3].node().unwrap();
        let c = doc.prepend_child(r, NodeKind::Element).unwrap();
        doc.insert_move_before(r, b, a).unwrap();

        let mut set = XPathNodeSet::from_nodes(
            vec![nodes[3], XPathNode::Node(b), XPathNode::Node(c)],
            NodeSetOrder::Unsorted,
        );
        set.sort(&doc, false);
        assert_eq!(
            set.as_slice(),
            [XPathNode::Node(c), XPathNode::Node(b), nodes[3]]
        );
    }

    #[test]
    fn test_node_parent() {
        let (doc, nodes) = sample();
        assert_eq!(nodes[0].parent(&doc), Some(doc.root()));
        assert_eq!(nodes[1].parent(&doc), nodes[0].node());
        assert!(nodes[1].node().is_none());
        assert!(XPathNode::Null.parent(&doc).is_none());
    }
}
