//! XPath Axes Implementation
//!
//! All 13 XPath 1.0 axes, walked over the arena links:
//! - child, parent, self
//! - descendant, descendant-or-self
//! - ancestor, ancestor-or-self
//! - following, following-sibling
//! - preceding, preceding-sibling
//! - attribute, namespace
//!
//! Nodes are appended in axis order: document order for forward axes,
//! nearest first for reverse ones.

use super::nodeset::{XPathNode, XPathNodeSet};
use super::parser::{Axis, NodeTest};
use crate::dom::{AttrId, Document, NodeId, NodeKind};

/// Append the nodes on `axis` from `context` that pass `test`
pub(crate) fn step_fill(
    doc: &Document,
    out: &mut XPathNodeSet,
    context: XPathNode,
    axis: Axis,
    test: &NodeTest,
) {
    match context {
        XPathNode::Null => {}
        XPathNode::Node(node) => {
            if doc.contains(node) {
                fill_from_node(doc, out, node, axis, test);
            }
        }
        XPathNode::Attribute { attr, parent } => {
            if doc.contains_attr(attr) && doc.contains(parent) {
                fill_from_attribute(doc, out, attr, parent, axis, test);
            }
        }
    }
}

/// Whether a node passes a node test
pub(crate) fn matches_node(doc: &Document, node: NodeId, test: &NodeTest) -> bool {
    let kind = doc.kind(node);
    match test {
        NodeTest::Node => true,
        NodeTest::Any => kind == NodeKind::Element,
        NodeTest::Name(name) => kind == NodeKind::Element && doc.name(node) == name,
        NodeTest::NamespaceWildcard(prefix) => {
            kind == NodeKind::Element && doc.name(node).starts_with(prefix.as_str())
        }
        NodeTest::Text => kind.is_text(),
        NodeTest::Comment => kind == NodeKind::Comment,
        NodeTest::ProcessingInstruction(None) => kind == NodeKind::Pi,
        NodeTest::ProcessingInstruction(Some(target)) => {
            kind == NodeKind::Pi && doc.name(node) == target
        }
    }
}

/// Namespace declarations are not attributes in the XPath data model
fn is_xpath_attribute(name: &str) -> bool {
    !(name == "xmlns" || name.starts_with("xmlns:"))
}

/// Whether an attribute passes a node test on the attribute axis
pub(crate) fn matches_attribute(doc: &Document, attr: AttrId, test: &NodeTest) -> bool {
    let name = doc.attr_name(attr);
    let passes = match test {
        NodeTest::Name(wanted) => name == wanted,
        NodeTest::Node | NodeTest::Any => true,
        NodeTest::NamespaceWildcard(prefix) => name.starts_with(prefix.as_str()),
        _ => false,
    };
    passes && is_xpath_attribute(name)
}

#[inline]
fn push_node(doc: &Document, out: &mut XPathNodeSet, node: NodeId, test: &NodeTest) {
    if matches_node(doc, node, test) {
        out.push(XPathNode::Node(node));
    }
}

fn fill_from_node(doc: &Document, out: &mut XPathNodeSet, node: NodeId, axis: Axis, test: &NodeTest) {
    match axis {
        Axis::Child => {
            for child in doc.children(node) {
                push_node(doc, out, child, test);
            }
        }
        Axis::Descendant | Axis::DescendantOrSelf => {
            if axis == Axis::DescendantOrSelf {
                push_node(doc, out, node, test);
            }
            for d in doc.descendants(node) {
                push_node(doc, out, d, test);
            }
        }
        Axis::Parent => {
            if let Some(parent) = doc.parent(node) {
                push_node(doc, out, parent, test);
            }
        }
        Axis::Ancestor | Axis::AncestorOrSelf => {
            if axis == Axis::AncestorOrSelf {
                push_node(doc, out, node, test);
            }
            let mut current = doc.parent(node);
            while let Some(n) = current {
                push_node(doc, out, n, test);
                current = doc.parent(n);
            }
        }
        Axis::FollowingSibling => {
            let mut current = doc.next_sibling(node);
            while let Some(n) = current {
                push_node(doc, out, n, test);
                current = doc.next_sibling(n);
            }
        }
        Axis::PrecedingSibling => {
            let mut current = doc.previous_sibling(node);
            while let Some(n) = current {
                push_node(doc, out, n, test);
                current = doc.previous_sibling(n);
            }
        }
        Axis::Following => {
            // Step out of the subtree first so descendants are skipped
            let mut current = node;
            loop {
                if let Some(next) = doc.next_sibling(current) {
                    current = next;
                    break;
                }
                match doc.parent(current) {
                    Some(p) => current = p,
                    None => return,
                }
            }
            following_from(doc, out, current, test);
        }
        Axis::Preceding => preceding(doc, out, node, test),
        Axis::Self_ => push_node(doc, out, node, test),
        Axis::Attribute => {
            for attr in doc.attributes(node) {
                if matches_attribute(doc, attr, test) {
                    out.push(XPathNode::Attribute { attr, parent: node });
                }
            }
        }
        // Namespace nodes are not modelled
        Axis::Namespace => {}
    }
}

/// Push `start` and everything after it in document order
fn following_from(doc: &Document, out: &mut XPathNodeSet, start: NodeId, test: &NodeTest) {
    let mut current = start;
    loop {
        push_node(doc, out, current, test);
        if let Some(child) = doc.first_child(current) {
            current = child;
            continue;
        }
        loop {
            if let Some(next) = doc.next_sibling(current) {
                current = next;
                break;
            }
            match doc.parent(current) {
                Some(p) => current = p,
                None => return,
            }
        }
    }
}

/// Nodes before `node` in document order, nearest first, without ancestors
fn preceding(doc: &Document, out: &mut XPathNodeSet, node: NodeId, test: &NodeTest) {
    let mut current = node;
    loop {
        if let Some(prev) = doc.previous_sibling(current) {
            current = prev;
            break;
        }
        match doc.parent(current) {
            Some(p) => current = p,
            None => return,
        }
    }

    loop {
        if let Some(last) = doc.last_child(current) {
            current = last;
            continue;
        }
        // Leaf: cannot be an ancestor
        push_node(doc, out, current, test);
        loop {
            if let Some(prev) = doc.previous_sibling(current) {
                current = prev;
                break;
            }
            match doc.parent(current) {
                Some(p) => current = p,
                None => return,
            }
            if !doc.is_ancestor_or_self(current, node) {
                push_node(doc, out, current, test);
            }
        }
    }
}

fn fill_from_attribute(
    doc: &Document,
    out: &mut XPathNodeSet,
    attr: AttrId,
    parent: NodeId,
    axis: Axis,
    test: &NodeTest,
) {
    match axis {
        Axis::Ancestor | Axis::AncestorOrSelf => {
            // The attribute itself only counts for node()
            if axis == Axis::AncestorOrSelf && *test == NodeTest::Node {
                out.push(XPathNode::Attribute { attr, parent });
            }
            let mut current = Some(parent);
            while let Some(n) = current {
                push_node(doc, out, n, test);
                current = doc.parent(n);
            }
        }
        Axis::Self_ | Axis::DescendantOrSelf => {
            if *test == NodeTest::Node {
                out.push(XPathNode::Attribute { attr, parent });
            }
        }
        Axis::Parent => push_node(doc, out, parent, test),
        Axis::Following => {
            // Everything after the owner element's start, including its content
            let mut current = parent;
            loop {
                if let Some(child) = doc.first_child(current) {
                    current = child;
                } else {
                    loop {
                        if let Some(next) = doc.next_sibling(current) {
                            current = next;
                            break;
                        }
                        match doc.parent(current) {
                            Some(p) => current = p,
                            None => return,
                        }
                    }
                }
                push_node(doc, out, current, test);
            }
        }
        Axis::Preceding => preceding(doc, out, parent, test),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::ParseOptions;

    fn load(xml: &str) -> Document {
        let mut doc = Document::new();
        let result = doc.load_string(xml, ParseOptions::FULL);
        assert!(result.is_ok(), "{}", result);
        doc
    }

    fn names(doc: &Document, set: &XPathNodeSet) -> Vec<String> {
        set.iter()
            .map(|n| match n {
                XPathNode::Node(id) => doc.name(*id).to_string(),
                XPathNode::Attribute { attr, .. } => format!("@{}", doc.attr_name(*attr)),
                XPathNode::Null => String::new(),
            })
            .collect()
    }

    fn axis(doc: &Document, node: NodeId, axis: Axis) -> Vec<String> {
        let mut out = XPathNodeSet::new();
        step_fill(doc, &mut out, XPathNode::Node(node), axis, &NodeTest::Any);
        names(doc, &out)
    }

    fn find(doc: &Document, name: &str) -> NodeId {
        doc.find_node(doc.root(), |n| doc.name(n) == name).unwrap()
    }

    const TREE: &str = "<r><a><a1/><a2/></a><b><b1/><b2><c/></b2></b><d><d1/></d></r>";

    #[test]
    fn test_forward_axes() {
        let doc = load(TREE);
        let b = find(&doc, "b");
        assert_eq!(axis(&doc, b, Axis::Child), ["b1", "b2"]);
        assert_eq!(axis(&doc, b, Axis::Descendant), ["b1", "b2", "c"]);
        assert_eq!(axis(&doc, b, Axis::DescendantOrSelf), ["b", "b1", "b2", "c"]);
        assert_eq!(axis(&doc, b, Axis::FollowingSibling), ["d"]);
        assert_eq!(axis(&doc, b, Axis::Following), ["d", "d1"]);
        assert_eq!(axis(&doc, b, Axis::Self_), ["b"]);
        assert_eq!(axis(&doc, b, Axis::Parent), ["r"]);
    }

    #[test]
    fn test_reverse_axes() {
        let doc = load(TREE);
        let c = find(&doc, "c");
        assert_eq!(axis(&doc, c, Axis::Ancestor), ["b2", "b", "r"]);
        assert_eq!(axis(&doc, c, Axis::AncestorOrSelf), ["c", "b2", "b", "r"]);
        assert_eq!(axis(&doc, c, Axis::Preceding), ["b1", "a2", "a1", "a"]);

        let d = find(&doc, "d");
        assert_eq!(axis(&doc, d, Axis::PrecedingSibling), ["b", "a"]);
    }

    #[test]
    fn test_node_tests() {
        let doc = load("<r><?p x?><!--c-->t<![CDATA[d]]><e/><ns:f/></r>");
        let r = doc.document_element().unwrap();
        let count = |test: NodeTest| {
            let mut out = XPathNodeSet::new();
            step_fill(&doc, &mut out, XPathNode::Node(r), Axis::Child, &test);
            out.len()
        };
        assert_eq!(count(NodeTest::Node), 6);
        assert_eq!(count(NodeTest::Any), 2);
        assert_eq!(count(NodeTest::Text), 2);
        assert_eq!(count(NodeTest::Comment), 1);
        assert_eq!(count(NodeTest::ProcessingInstruction(None)), 1);
        assert_eq!(count(NodeTest::ProcessingInstruction(Some("p".into()))), 1);
        assert_eq!(count(NodeTest::ProcessingInstruction(Some("q".into()))), 0);
        assert_eq!(count(NodeTest::NamespaceWildcard("ns:".into())), 1);
        assert_eq!(count(NodeTest::Name("e".into())), 1);
    }

    #[test]
    fn test_attribute_axis() {
        let doc = load("<r xmlns='u' xmlns:p='v' a='1' p:b='2'/>");
        let r = doc.document_element().unwrap();
        let mut out = XPathNodeSet::new();
        step_fill(&doc, &mut out, XPathNode::Node(r), Axis::Attribute, &NodeTest::Node);
        assert_eq!(names(&doc, &out), ["@a", "@p:b"]);

        let mut out = XPathNodeSet::new();
        step_fill(&doc, &mut out, XPathNode::Node(r), Axis::Attribute, &NodeTest::Text);
        assert!(out.is_empty());
    }

    #[test]
    fn test_attribute_context() {
        let doc = load("<r><x/><e a='1'><k/></e><y/></r>");
        let e = find(&doc, "e");
        let attr = doc.first_attribute(e).unwrap();
        let ctx = XPathNode::Attribute { attr, parent: e };
        let run = |axis: Axis, test: NodeTest| {
            let mut out = XPathNodeSet::new();
            step_fill(&doc, &mut out, ctx, axis, &test);
            names(&doc, &out)
        };
        assert_eq!(run(Axis::Parent, NodeTest::Any), ["e"]);
        assert_eq!(run(Axis::Ancestor, NodeTest::Any), ["e", "r"]);
        assert_eq!(run(Axis::AncestorOrSelf, NodeTest::Node), ["@a", "e", "r", ""]);
        assert_eq!(run(Axis::Self_, NodeTest::Node), ["@a"]);
        assert!(run(Axis::Self_, NodeTest::Any).is_empty());
        assert_eq!(run(Axis::Following, NodeTest::Any), ["k", "y"]);
        assert_eq!(run(Axis::Preceding, NodeTest::Any), ["x"]);
        assert!(run(Axis::Child, NodeTest::Node).is_empty());
        assert!(run(Axis::Attribute, NodeTest::Node).is_empty());
    }
}
