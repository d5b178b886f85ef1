//! XML Document - Arena-based DOM representation
//!
//! Efficient DOM storage with:
//! - Slot arenas for node and attribute records
//! - NodeId/AttrId generational handles for traversal
//! - Zero-copy text borrowed from document-owned source buffers
//!
//! Every accessor takes a handle and treats a stale or foreign handle as
//! null: lookups return `None` or `""`, nothing panics.

use std::cmp::Ordering;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::sync::OnceLock;

use super::arena::SlotArena;
use super::node::{AttrId, AttrRecord, NodeId, NodeKind, NodeRecord};
use super::parser;
use super::result::{ParseResult, ParseStatus};
use super::strings::{TextSlot, TextStore};
use crate::core::encoding::{decode_lossy, Encoding};
use crate::core::options::ParseOptions;

/// An XML document: owns every node, attribute and string of its tree
#[derive(Debug)]
pub struct Document {
    pub(crate) nodes: SlotArena<NodeRecord>,
    pub(crate) attrs: SlotArena<AttrRecord>,
    pub(crate) strings: TextStore,
    root: NodeId,
    next_order: u64,
    /// Set once an edit places nodes out of construction order
    order_stale: bool,
    /// Preorder rank by slot index, built on first use after an edit
    ranks: OnceLock<Vec<u64>>,
}

/// Arena statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub nodes: usize,
    pub attributes: usize,
    /// Bytes held by node/attribute slot vectors
    pub record_bytes: usize,
    /// Bytes held by source buffers and string pages
    pub text_bytes: usize,
    /// String bytes released by edits, reclaimed on reset
    pub wasted_bytes: usize,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    /// Create an empty document holding only the document node
    pub fn new() -> Self {
        let mut doc = Document {
            nodes: SlotArena::default(),
            attrs: SlotArena::default(),
            strings: TextStore::default(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            next_order: 0,
            order_stale: false,
            ranks: OnceLock::new(),
        };
        doc.create_root();
        doc
    }

    fn create_root(&mut self) {
        // A failed allocation leaves a root handle that resolves to nothing
        if let Some(root) = self.alloc_node(NodeKind::Document) {
            self.root = root;
        }
    }

    /// Remove every node and release all storage
    pub fn reset(&mut self) {
        self.nodes.clear();
        self.attrs.clear();
        self.strings.clear();
        self.next_order = 0;
        self.order_stale = false;
        self.ranks = OnceLock::new();
        self.create_root();
    }

    // ------------------------------------------------------------------
    // Record access
    // ------------------------------------------------------------------

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id.index, id.generation)
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeRecord> {
        self.nodes.get_mut(id.index, id.generation)
    }

    #[inline]
    pub(crate) fn attr(&self, id: AttrId) -> Option<&AttrRecord> {
        self.attrs.get(id.index, id.generation)
    }

    #[inline]
    pub(crate) fn attr_mut(&mut self, id: AttrId) -> Option<&mut AttrRecord> {
        self.attrs.get_mut(id.index, id.generation)
    }

    /// Allocate a detached node; only this call fails when memory runs out
    pub(crate) fn alloc_node(&mut self, kind: NodeKind) -> Option<NodeId> {
        let order = self.next_order;
        let (index, generation) = self.nodes.insert(NodeRecord::new(kind, order))?;
        self.next_order += 1;
        Some(NodeId { index, generation })
    }

    pub(crate) fn alloc_attr(&mut self) -> Option<AttrId> {
        let (index, generation) = self.attrs.insert(AttrRecord::new())?;
        Some(AttrId { index, generation })
    }

    /// Resolve a text slot
    #[inline]
    pub(crate) fn slot_str(&self, slot: TextSlot) -> &str {
        self.strings.get(slot)
    }

    // ------------------------------------------------------------------
    // Linking
    // ------------------------------------------------------------------

    /// Link a detached node as the last child of `parent`
    pub(crate) fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let Some(last) = self.node(parent).map(|p| p.last_child) else {
            return;
        };
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
            c.prev_sibling = last;
            c.next_sibling = None;
        }
        match last {
            Some(last) => {
                if let Some(l) = self.node_mut(last) {
                    l.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(p) = self.node_mut(parent) {
                    p.first_child = Some(child);
                }
            }
        }
        if let Some(p) = self.node_mut(parent) {
            p.last_child = Some(child);
        }
    }

    /// Link a detached node as the first child of `parent`
    pub(crate) fn link_first(&mut self, parent: NodeId, child: NodeId) {
        let Some(first) = self.node(parent).map(|p| p.first_child) else {
            return;
        };
        let Some(first) = first else {
            self.link_last(parent, child);
            return;
        };
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
            c.prev_sibling = None;
            c.next_sibling = Some(first);
        }
        if let Some(f) = self.node_mut(first) {
            f.prev_sibling = Some(child);
        }
        if let Some(p) = self.node_mut(parent) {
            p.first_child = Some(child);
        }
    }

    /// Link a detached node right before `reference`
    pub(crate) fn link_before(&mut self, reference: NodeId, child: NodeId) {
        let Some((parent, prev)) = self
            .node(reference)
            .and_then(|r| Some((r.parent?, r.prev_sibling)))
        else {
            return;
        };
        let Some(prev) = prev else {
            self.link_first(parent, child);
            return;
        };
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
            c.prev_sibling = Some(prev);
            c.next_sibling = Some(reference);
        }
        if let Some(p) = self.node_mut(prev) {
            p.next_sibling = Some(child);
        }
        if let Some(r) = self.node_mut(reference) {
            r.prev_sibling = Some(child);
        }
    }

    /// Link a detached node right after `reference`
    pub(crate) fn link_after(&mut self, reference: NodeId, child: NodeId) {
        let Some((parent, next)) = self
            .node(reference)
            .and_then(|r| Some((r.parent?, r.next_sibling)))
        else {
            return;
        };
        let Some(next) = next else {
            self.link_last(parent, child);
            return;
        };
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
            c.prev_sibling = Some(reference);
            c.next_sibling = Some(next);
        }
        if let Some(n) = self.node_mut(next) {
            n.prev_sibling = Some(child);
        }
        if let Some(r) = self.node_mut(reference) {
            r.next_sibling = Some(child);
        }
    }

    /// Detach a node from its parent and siblings
    pub(crate) fn unlink(&mut self, id: NodeId) {
        let Some((parent, prev, next)) = self
            .node(id)
            .map(|n| (n.parent, n.prev_sibling, n.next_sibling))
        else {
            return;
        };

        match prev {
            Some(prev) => {
                if let Some(p) = self.node_mut(prev) {
                    p.next_sibling = next;
                }
            }
            None => {
                if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
                    p.first_child = next;
                }
            }
        }
        match next {
            Some(next) => {
                if let Some(n) = self.node_mut(next) {
                    n.prev_sibling = prev;
                }
            }
            None => {
                if let Some(p) = parent.and_then(|p| self.node_mut(p)) {
                    p.last_child = prev;
                }
            }
        }

        if let Some(n) = self.node_mut(id) {
            n.parent = None;
            n.prev_sibling = None;
            n.next_sibling = None;
        }
    }

    /// Link a detached attribute at the end of `owner`'s list
    pub(crate) fn link_attr_last(&mut self, owner: NodeId, attr: AttrId) {
        let Some(last) = self.node(owner).map(|n| n.last_attr) else {
            return;
        };
        if let Some(a) = self.attr_mut(attr) {
            a.owner = Some(owner);
            a.prev = last;
            a.next = None;
        }
        match last {
            Some(last) => {
                if let Some(l) = self.attr_mut(last) {
                    l.next = Some(attr);
                }
            }
            None => {
                if let Some(n) = self.node_mut(owner) {
                    n.first_attr = Some(attr);
                }
            }
        }
        if let Some(n) = self.node_mut(owner) {
            n.last_attr = Some(attr);
        }
    }

    /// Link a detached attribute at the start of `owner`'s list
    pub(crate) fn link_attr_first(&mut self, owner: NodeId, attr: AttrId) {
        let Some(first) = self.node(owner).map(|n| n.first_attr) else {
            return;
        };
        let Some(first) = first else {
            self.link_attr_last(owner, attr);
            return;
        };
        if let Some(a) = self.attr_mut(attr) {
            a.owner = Some(owner);
            a.prev = None;
            a.next = Some(first);
        }
        if let Some(f) = self.attr_mut(first) {
            f.prev = Some(attr);
        }
        if let Some(n) = self.node_mut(owner) {
            n.first_attr = Some(attr);
        }
    }

    /// Link a detached attribute before (`after == false`) or after `reference`
    pub(crate) fn link_attr_near(&mut self, reference: AttrId, attr: AttrId, after: bool) {
        let Some((owner, prev, next)) = self
            .attr(reference)
            .and_then(|r| Some((r.owner?, r.prev, r.next)))
        else {
            return;
        };
        let (prev, next) = if after {
            (Some(reference), next)
        } else {
            (prev, Some(reference))
        };
        if let Some(a) = self.attr_mut(attr) {
            a.owner = Some(owner);
            a.prev = prev;
            a.next = next;
        }
        match prev {
            Some(p) => {
                if let Some(p) = self.attr_mut(p) {
                    p.next = Some(attr);
                }
            }
            None => {
                if let Some(n) = self.node_mut(owner) {
                    n.first_attr = Some(attr);
                }
            }
        }
        match next {
            Some(n) => {
                if let Some(n) = self.attr_mut(n) {
                    n.prev = Some(attr);
                }
            }
            None => {
                if let Some(n) = self.node_mut(owner) {
                    n.last_attr = Some(attr);
                }
            }
        }
    }

    /// Detach an attribute from its owner's list
    pub(crate) fn unlink_attr(&mut self, id: AttrId) {
        let Some((owner, prev, next)) = self.attr(id).map(|a| (a.owner, a.prev, a.next)) else {
            return;
        };
        match prev {
            Some(p) => {
                if let Some(p) = self.attr_mut(p) {
                    p.next = next;
                }
            }
            None => {
                if let Some(n) = owner.and_then(|o| self.node_mut(o)) {
                    n.first_attr = next;
                }
            }
        }
        match next {
            Some(n) => {
                if let Some(n) = self.attr_mut(n) {
                    n.prev = prev;
                }
            }
            None => {
                if let Some(n) = owner.and_then(|o| self.node_mut(o)) {
                    n.last_attr = prev;
                }
            }
        }
        if let Some(a) = self.attr_mut(id) {
            a.owner = None;
            a.prev = None;
            a.next = None;
        }
    }

    /// Free a detached attribute and its text
    pub(crate) fn free_attr(&mut self, id: AttrId) {
        if let Some(record) = self.attrs.remove(id.index, id.generation) {
            self.strings.release(record.name);
            self.strings.release(record.value);
        }
    }

    /// Free a detached node with its whole subtree
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(record) = self.nodes.remove(current.index, current.generation) else {
                continue;
            };
            self.strings.release(record.name);
            self.strings.release(record.value);

            let mut attr = record.first_attr;
            while let Some(a) = attr {
                attr = self.attr(a).and_then(|r| r.next);
                self.free_attr(a);
            }

            let mut child = record.first_child;
            while let Some(c) = child {
                child = self.node(c).and_then(|n| n.next_sibling);
                stack.push(c);
            }
        }
    }

    // ------------------------------------------------------------------
    // Node navigation
    // ------------------------------------------------------------------

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Check that a handle refers to a live node of this document
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Check that a handle refers to a live attribute of this document
    #[inline]
    pub fn contains_attr(&self, id: AttrId) -> bool {
        self.attr(id).is_some()
    }

    /// Node kind; `Null` for a dead handle
    #[inline]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).map_or(NodeKind::Null, |n| n.kind)
    }

    /// Node name, `""` when absent
    pub fn name(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |n| self.slot_str(n.name))
    }

    /// Node value, `""` when absent
    pub fn value(&self, id: NodeId) -> &str {
        self.node(id).map_or("", |n| self.slot_str(n.value))
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    #[inline]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.first_child
    }

    #[inline]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.last_child
    }

    #[inline]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.next_sibling
    }

    #[inline]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.prev_sibling
    }

    /// First child with the given name
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.children(id).find(|&c| self.has_name(c, name))
    }

    /// Next sibling with the given name
    pub fn next_sibling_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(c) = current {
            if self.has_name(c, name) {
                return Some(c);
            }
            current = self.next_sibling(c);
        }
        None
    }

    /// Previous sibling with the given name
    pub fn previous_sibling_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        let mut current = self.previous_sibling(id);
        while let Some(c) = current {
            if self.has_name(c, name) {
                return Some(c);
            }
            current = self.previous_sibling(c);
        }
        None
    }

    #[inline]
    fn has_name(&self, id: NodeId, name: &str) -> bool {
        self.node(id)
            .is_some_and(|n| !n.name.is_null() && self.slot_str(n.name) == name)
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.first_child(id),
        }
    }

    /// Iterate over children with the given name
    pub fn children_named<'d>(
        &'d self,
        id: NodeId,
        name: &'d str,
    ) -> impl Iterator<Item = NodeId> + 'd {
        self.children(id).filter(move |&c| self.has_name(c, name))
    }

    /// Iterate over all descendants of a node in document order
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            top: id,
            next: self.first_child(id),
        }
    }

    /// The first element child of the document node
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .find(|&c| self.kind(c) == NodeKind::Element)
    }

    /// Value of the node itself (element with embedded text) or of its first text child
    pub fn child_value(&self, id: NodeId) -> &str {
        let Some(record) = self.node(id) else {
            return "";
        };
        if record.kind == NodeKind::Element && !record.value.is_null() {
            return self.slot_str(record.value);
        }
        self.children(id)
            .filter_map(|c| self.node(c))
            .find(|n| n.kind.is_text() && !n.value.is_null())
            .map_or("", |n| self.slot_str(n.value))
    }

    /// `child_value` of the first child named `name`
    pub fn child_value_of(&self, id: NodeId, name: &str) -> &str {
        self.child(id, name).map_or("", |c| self.child_value(c))
    }

    /// First child named `name` carrying attribute `attr_name="attr_value"`
    pub fn find_child_by_attribute(
        &self,
        id: NodeId,
        name: &str,
        attr_name: &str,
        attr_value: &str,
    ) -> Option<NodeId> {
        self.children_named(id, name)
            .find(|&c| self.has_attribute_value(c, attr_name, attr_value))
    }

    /// First child of any name carrying attribute `attr_name="attr_value"`
    pub fn find_child_by_attribute_any(
        &self,
        id: NodeId,
        attr_name: &str,
        attr_value: &str,
    ) -> Option<NodeId> {
        self.children(id)
            .find(|&c| self.has_attribute_value(c, attr_name, attr_value))
    }

    fn has_attribute_value(&self, id: NodeId, name: &str, value: &str) -> bool {
        self.attributes(id)
            .any(|a| self.attr_name(a) == name && self.attr_value(a) == value)
    }

    /// First direct child satisfying `pred`
    pub fn find_child<F>(&self, id: NodeId, mut pred: F) -> Option<NodeId>
    where
        F: FnMut(NodeId) -> bool,
    {
        self.children(id).find(|&c| pred(c))
    }

    /// First descendant (depth-first, document order) satisfying `pred`
    pub fn find_node<F>(&self, id: NodeId, mut pred: F) -> Option<NodeId>
    where
        F: FnMut(NodeId) -> bool,
    {
        self.descendants(id).find(|&c| pred(c))
    }

    /// First attribute satisfying `pred`
    pub fn find_attribute<F>(&self, id: NodeId, mut pred: F) -> Option<AttrId>
    where
        F: FnMut(AttrId) -> bool,
    {
        self.attributes(id).find(|&a| pred(a))
    }

    /// Names from the document node down to `id`, joined by `delimiter`
    ///
    /// The document node contributes an empty name, so paths of attached
    /// nodes start with the delimiter.
    pub fn path(&self, id: NodeId, delimiter: char) -> String {
        if !self.contains(id) {
            return String::new();
        }
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(c) = current {
            names.push(self.name(c));
            current = self.parent(c);
        }
        names.reverse();
        names.join(delimiter.to_string().as_str())
    }

    /// Follow a delimiter-separated element path from `id`
    ///
    /// A leading delimiter starts from the document node; `.` and `..`
    /// segments stay put or go to the parent. When several children share a
    /// segment name, each is tried in order until the rest of the path matches.
    pub fn first_element_by_path(&self, id: NodeId, path: &str, delimiter: char) -> Option<NodeId> {
        if !self.contains(id) {
            return None;
        }
        if path.is_empty() {
            return Some(id);
        }
        let (context, rest) = match path.strip_prefix(delimiter) {
            Some(rest) => (self.root, rest),
            None => (id, path),
        };
        let rest = rest.trim_start_matches(delimiter);
        let (segment, next) = rest.split_once(delimiter).unwrap_or((rest, ""));
        if segment.is_empty() {
            return Some(context);
        }
        let next = next.trim_start_matches(delimiter);

        match segment {
            "." => self.first_element_by_path(context, next, delimiter),
            ".." => self
                .parent(context)
                .and_then(|p| self.first_element_by_path(p, next, delimiter)),
            _ => self
                .children_named(context, segment)
                .find_map(|c| self.first_element_by_path(c, next, delimiter)),
        }
    }

    /// Byte offset of the node's text within its source buffer
    ///
    /// `Some(0)` for the document node, `None` when the node's text was
    /// copied or the node was created through the API.
    pub fn offset_debug(&self, id: NodeId) -> Option<usize> {
        let record = self.node(id)?;
        match record.kind {
            NodeKind::Document => Some(0),
            NodeKind::Element | NodeKind::Declaration | NodeKind::Pi => record.name.source_offset(),
            NodeKind::Null => None,
            _ => record.value.source_offset(),
        }
    }

    // ------------------------------------------------------------------
    // Attribute navigation
    // ------------------------------------------------------------------

    /// Iterate over attributes of a node
    pub fn attributes(&self, id: NodeId) -> Attributes<'_> {
        Attributes {
            doc: self,
            next: self.first_attribute(id),
        }
    }

    /// Attribute with the given name
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<AttrId> {
        self.attributes(id).find(|&a| self.attr_name(a) == name)
    }

    #[inline]
    pub fn first_attribute(&self, id: NodeId) -> Option<AttrId> {
        self.node(id)?.first_attr
    }

    #[inline]
    pub fn last_attribute(&self, id: NodeId) -> Option<AttrId> {
        self.node(id)?.last_attr
    }

    #[inline]
    pub fn next_attribute(&self, id: AttrId) -> Option<AttrId> {
        self.attr(id)?.next
    }

    #[inline]
    pub fn previous_attribute(&self, id: AttrId) -> Option<AttrId> {
        self.attr(id)?.prev
    }

    pub fn attr_name(&self, id: AttrId) -> &str {
        self.attr(id).map_or("", |a| self.slot_str(a.name))
    }

    pub fn attr_value(&self, id: AttrId) -> &str {
        self.attr(id).map_or("", |a| self.slot_str(a.value))
    }

    /// Element or declaration owning the attribute
    #[inline]
    pub fn attribute_parent(&self, id: AttrId) -> Option<NodeId> {
        self.attr(id)?.owner
    }

    /// Value of attribute `name`, if present
    pub fn attribute_value(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attribute(id, name).map(|a| self.attr_value(a))
    }

    // ------------------------------------------------------------------
    // Document order
    // ------------------------------------------------------------------

    /// Compare two nodes by document order
    ///
    /// O(1) per call. Parsed trees compare by construction counter; after
    /// an edit the first comparison builds a preorder rank table that
    /// serves every comparison until the next edit.
    pub fn compare_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        // Nodes outside the tree go last, in slot order
        self.order_key(a)
            .cmp(&self.order_key(b))
            .then(a.index.cmp(&b.index))
    }

    /// Record that links changed and construction order no longer holds
    pub(crate) fn invalidate_order(&mut self) {
        self.order_stale = true;
        self.ranks = OnceLock::new();
    }

    /// Document-order position of a node; `u64::MAX` for a stale handle
    #[inline]
    pub(crate) fn order_key(&self, id: NodeId) -> u64 {
        let Some(record) = self.node(id) else {
            return u64::MAX;
        };
        if !self.order_stale {
            return record.order;
        }
        self.rank_table()
            .get(id.index as usize)
            .copied()
            .unwrap_or(u64::MAX)
    }

    /// Address of the current rank table, if one is built
    #[cfg(test)]
    pub(crate) fn rank_table_addr(&self) -> Option<*const u64> {
        self.ranks.get().map(|t| t.as_ptr())
    }

    fn rank_table(&self) -> &[u64] {
        self.ranks.get_or_init(|| {
            trace!(nodes = self.nodes.len(), "rebuilding document order ranks");
            let mut table = vec![u64::MAX; self.nodes.capacity_slots()];
            let preorder = std::iter::once(self.root).chain(self.descendants(self.root));
            for (rank, id) in preorder.enumerate() {
                if let Some(slot) = table.get_mut(id.index as usize) {
                    *slot = rank as u64;
                }
            }
            table
        })
    }

    /// Position of an attribute in its owner's list, counted from 1
    pub(crate) fn attr_position(&self, id: AttrId) -> u64 {
        let Some(owner) = self.attribute_parent(id) else {
            return 0;
        };
        self.attributes(owner)
            .position(|a| a == id)
            .map_or(0, |p| p as u64 + 1)
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Parse a UTF-8 string, replacing the current tree
    pub fn load_string(&mut self, text: &str, options: ParseOptions) -> ParseResult {
        self.reset();
        let result = self.parse_into(self.root, text.to_owned(), options, Encoding::Utf8);
        self.finish_load(result)
    }

    /// Parse a copy of `bytes`, replacing the current tree
    ///
    /// The caller keeps its buffer; every borrowed text range points into
    /// the document's own copy.
    pub fn load_buffer(
        &mut self,
        bytes: &[u8],
        options: ParseOptions,
        encoding: Encoding,
    ) -> ParseResult {
        self.load_buffer_inplace(bytes.to_vec(), options, encoding)
    }

    /// Parse `bytes` in place, replacing the current tree
    ///
    /// The document takes the buffer over and keeps it for as long as the
    /// tree lives: UTF-8 input is not copied, and text needing no decoding
    /// stays a borrowed range of it.
    pub fn load_buffer_inplace(
        &mut self,
        bytes: Vec<u8>,
        options: ParseOptions,
        encoding: Encoding,
    ) -> ParseResult {
        self.reset();
        let encoding = encoding.resolve_input(&bytes);
        let text = decode_lossy(bytes, encoding);
        let result = self.parse_into(self.root, text, options, encoding);
        self.finish_load(result)
    }

    /// Read and parse a file, replacing the current tree
    pub fn load_file<P: AsRef<Path>>(
        &mut self,
        path: P,
        options: ParseOptions,
        encoding: Encoding,
    ) -> ParseResult {
        self.reset();
        match fs::read(path.as_ref()) {
            Ok(bytes) => self.load_buffer_inplace(bytes, options, encoding),
            Err(err) => {
                debug!(path = %path.as_ref().display(), error = %err, "load_file failed");
                ParseResult::new(io_status(&err), 0, encoding)
            }
        }
    }

    /// Read a stream to its end and parse it, replacing the current tree
    pub fn load_reader<R: Read>(
        &mut self,
        mut reader: R,
        options: ParseOptions,
        encoding: Encoding,
    ) -> ParseResult {
        self.reset();
        let mut bytes = Vec::new();
        match reader.read_to_end(&mut bytes) {
            Ok(_) => self.load_buffer_inplace(bytes, options, encoding),
            Err(err) => ParseResult::new(io_status(&err), 0, encoding),
        }
    }

    /// Parse `bytes` as a fragment and append the result to `parent`'s children
    ///
    /// The existing tree is kept. `parent` must be an element or the
    /// document node.
    pub fn append_buffer(
        &mut self,
        parent: NodeId,
        bytes: &[u8],
        options: ParseOptions,
        encoding: Encoding,
    ) -> ParseResult {
        if !self.kind(parent).has_children() {
            return ParseResult::new(ParseStatus::AppendInvalidRoot, 0, encoding);
        }
        let encoding = encoding.resolve_input(bytes);
        let text = decode_lossy(bytes.to_vec(), encoding);
        // New children land before any later content in document order
        self.invalidate_order();
        let result = self.parse_into(parent, text, options, encoding);
        self.finish_load(result)
    }

    fn parse_into(
        &mut self,
        parent: NodeId,
        text: String,
        options: ParseOptions,
        encoding: Encoding,
    ) -> ParseResult {
        trace!(bytes = text.len(), ?encoding, ?options, "parse start");
        let Some(buf) = self.strings.add_buffer(text) else {
            return ParseResult::new(ParseStatus::OutOfMemory, 0, encoding);
        };
        let (status, offset) = parser::parse(self, parent, buf, options);
        ParseResult::new(status, offset, encoding)
    }

    fn finish_load(&mut self, result: ParseResult) -> ParseResult {
        if result.is_ok() {
            debug!(encoding = ?result.encoding, nodes = self.nodes.len(), "document loaded");
        } else {
            debug!(status = ?result.status, offset = result.offset, "parse failed");
        }
        result
    }

    // ------------------------------------------------------------------
    // Statistics
    // ------------------------------------------------------------------

    /// Number of live nodes, the document node included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live attributes
    pub fn attribute_count(&self) -> usize {
        self.attrs.len()
    }

    /// Arena statistics
    #[cfg(feature = "memory_tracking")]
    pub fn memory_usage(&self) -> MemoryUsage {
        MemoryUsage {
            nodes: self.nodes.len(),
            attributes: self.attrs.len(),
            record_bytes: self.nodes.memory_usage() + self.attrs.memory_usage(),
            text_bytes: self.strings.memory_usage(),
            wasted_bytes: self.strings.wasted(),
        }
    }

    /// Arena statistics (tracking disabled)
    #[cfg(not(feature = "memory_tracking"))]
    pub fn memory_usage(&self) -> MemoryUsage {
        MemoryUsage::default()
    }
}

fn io_status(err: &io::Error) -> ParseStatus {
    match err.kind() {
        io::ErrorKind::NotFound => ParseStatus::FileNotFound,
        io::ErrorKind::OutOfMemory => ParseStatus::OutOfMemory,
        _ => ParseStatus::IoError,
    }
}

/// Iterator over child nodes
pub struct Children<'d> {
    doc: &'d Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling(current);
        Some(current)
    }
}

/// Iterator over attributes of one node
pub struct Attributes<'d> {
    doc: &'d Document,
    next: Option<AttrId>,
}

impl Iterator for Attributes<'_> {
    type Item = AttrId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_attribute(current);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first, document order)
///
/// Walks the sibling links instead of keeping a stack, so it allocates
/// nothing.
pub struct Descendants<'d> {
    doc: &'d Document,
    top: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        self.next = match self.doc.first_child(current) {
            Some(child) => Some(child),
            None => {
                let mut node = current;
                loop {
                    if node == self.top {
                        break None;
                    }
                    if let Some(sibling) = self.doc.next_sibling(node) {
                        break Some(sibling);
                    }
                    match self.doc.parent(node) {
                        Some(parent) if parent != self.top => node = parent,
                        _ => break None,
                    }
                }
            }
        };

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Document {
        let mut doc = Document::new();
        let result = doc.load_string(xml, ParseOptions::DEFAULT);
        assert!(result.is_ok(), "{}", result);
        doc
    }

    #[test]
    fn test_parse_simple() {
        let doc = parse("<root>hello</root>");
        let root = doc.document_element().unwrap();
        assert_eq!(doc.name(root), "root");
        assert_eq!(doc.child_value(root), "hello");
    }

    #[test]
    fn test_parse_nested() {
        let doc = parse("<a><b><c/></b></a>");
        let root = doc.document_element().unwrap();
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn test_descendants() {
        let doc = parse("<root><a/><b><c/></b></root><z/>");
        let root = doc.document_element().unwrap();
        let names: Vec<_> = doc.descendants(root).map(|n| doc.name(n)).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_siblings() {
        let doc = parse("<root><a/><b/><c/></root>");
        let root = doc.document_element().unwrap();
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 3);

        assert!(doc.previous_sibling(children[0]).is_none());
        assert_eq!(doc.next_sibling(children[0]), Some(children[1]));
        assert_eq!(doc.last_child(root), Some(children[2]));
        assert_eq!(doc.next_sibling_named(children[0], "c"), Some(children[2]));
        assert_eq!(doc.previous_sibling_named(children[2], "a"), Some(children[0]));
    }

    #[test]
    fn test_attribute_navigation() {
        let doc = parse(r#"<node a="1" b="2" c="3"/>"#);
        let node = doc.document_element().unwrap();
        let names: Vec<_> = doc.attributes(node).map(|a| doc.attr_name(a)).collect();
        assert_eq!(names, ["a", "b", "c"]);

        let b = doc.attribute(node, "b").unwrap();
        assert_eq!(doc.attr_value(b), "2");
        assert_eq!(doc.attribute_parent(b), Some(node));
        assert_eq!(doc.attr_name(doc.previous_attribute(b).unwrap()), "a");
        assert_eq!(doc.attr_name(doc.next_attribute(b).unwrap()), "c");
        assert_eq!(doc.attr_name(doc.last_attribute(node).unwrap()), "c");
        assert_eq!(doc.attribute_value(node, "missing"), None);
    }

    #[test]
    fn test_path_and_lookup() {
        let doc = parse("<a><b><c/></b><b><d/></b></a>");
        let d = doc.first_element_by_path(doc.root(), "/a/b/d", '/').unwrap();
        assert_eq!(doc.name(d), "d");
        assert_eq!(doc.path(d, '/'), "/a/b/d");
        assert_eq!(doc.path(doc.root(), '/'), "");

        let b = doc.parent(d).unwrap();
        assert_eq!(doc.first_element_by_path(b, "../b/c", '/').map(|n| doc.name(n)), Some("c"));
        assert_eq!(doc.first_element_by_path(b, ".", '/'), Some(b));
        assert_eq!(doc.first_element_by_path(b, "x", '/'), None);
    }

    #[test]
    fn test_find_by_attribute() {
        let doc = parse(r#"<r><item id="1"/><other id="2"/><item id="2"/></r>"#);
        let r = doc.document_element().unwrap();
        let item = doc.find_child_by_attribute(r, "item", "id", "2").unwrap();
        assert_eq!(doc.previous_sibling(item).map(|n| doc.name(n)), Some("other"));
        let any = doc.find_child_by_attribute_any(r, "id", "2").unwrap();
        assert_eq!(doc.name(any), "other");
        assert!(doc.find_node(doc.root(), |n| doc.name(n) == "other").is_some());
        assert!(doc.find_child(r, |n| doc.name(n) == "nope").is_none());
    }

    #[test]
    fn test_stale_handle_is_null() {
        let mut doc = parse("<root/>");
        let root = doc.document_element().unwrap();
        doc.reset();
        assert_eq!(doc.kind(root), NodeKind::Null);
        assert_eq!(doc.name(root), "");
        assert!(doc.parent(root).is_none());
        assert!(doc.document_element().is_none());
    }

    #[test]
    fn test_compare_order_parsed() {
        let doc = parse("<a><b/><c><d/></c></a>");
        let a = doc.document_element().unwrap();
        let b = doc.child(a, "b").unwrap();
        let c = doc.child(a, "c").unwrap();
        let d = doc.child(c, "d").unwrap();
        assert_eq!(doc.compare_order(a, b), Ordering::Less);
        assert_eq!(doc.compare_order(d, b), Ordering::Greater);
        assert_eq!(doc.compare_order(c, d), Ordering::Less);
        assert_eq!(doc.compare_order(b, b), Ordering::Equal);
    }

    #[test]
    fn test_compare_order_after_edits() {
        let mut doc = parse("<a><b/><c><d/></c></a>");
        let a = doc.document_element().unwrap();
        let b = doc.child(a, "b").unwrap();
        let c = doc.child(a, "c").unwrap();
        let d = doc.child(c, "d").unwrap();

        // Built after the parse, placed first
        let e = doc.prepend_element(a, "e").unwrap();
        assert!(doc.ranks.get().is_none());
        assert_eq!(doc.compare_order(e, b), Ordering::Less);
        assert!(doc.ranks.get().is_some());
        assert_eq!(doc.compare_order(a, e), Ordering::Less);
        assert_eq!(doc.compare_order(d, e), Ordering::Greater);

        // Every edit drops the table; the next comparison sees the new tree
        assert_eq!(doc.insert_move_after(c, e, d), Some(e));
        assert!(doc.ranks.get().is_none());
        assert_eq!(doc.compare_order(e, d), Ordering::Greater);
        assert_eq!(doc.compare_order(e, c), Ordering::Greater);

        // Removed nodes sort after live ones
        assert!(doc.remove_child(a, b));
        assert_eq!(doc.order_key(b), u64::MAX);
        assert_eq!(doc.compare_order(b, e), Ordering::Greater);
    }

    #[test]
    fn test_offset_debug() {
        let doc = parse("<a>text</a>");
        let a = doc.document_element().unwrap();
        assert_eq!(doc.offset_debug(doc.root()), Some(0));
        assert_eq!(doc.offset_debug(a), Some(1));
        assert_eq!(doc.offset_debug(doc.first_child(a).unwrap()), Some(3));
    }

    #[test]
    fn test_load_file_missing() {
        let mut doc = Document::new();
        let result = doc.load_file(
            "/definitely/not/here.xml",
            ParseOptions::DEFAULT,
            Encoding::Auto,
        );
        assert_eq!(result.status, ParseStatus::FileNotFound);
    }

    #[test]
    fn test_load_reader() {
        let mut doc = Document::new();
        let result = doc.load_reader(&b"<r/>"[..], ParseOptions::DEFAULT, Encoding::Auto);
        assert!(result.is_ok());
        assert_eq!(result.encoding, Encoding::Utf8);
        assert_eq!(doc.name(doc.document_element().unwrap()), "r");
    }

    #[test]
    fn test_append_buffer() {
        let mut doc = parse("<r><x/></r>");
        let r = doc.document_element().unwrap();
        let result = doc.append_buffer(r, b"<y/>text", ParseOptions::DEFAULT, Encoding::Auto);
        assert!(result.is_ok());
        let kinds: Vec<_> = doc.children(r).map(|c| doc.kind(c)).collect();
        assert_eq!(kinds, [NodeKind::Element, NodeKind::Element, NodeKind::Pcdata]);

        let text = doc.last_child(r).unwrap();
        let result = doc.append_buffer(text, b"<z/>", ParseOptions::DEFAULT, Encoding::Auto);
        assert_eq!(result.status, ParseStatus::AppendInvalidRoot);
    }
}
