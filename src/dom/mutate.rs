//! Tree mutation
//!
//! Every operation checks its handles and the insertion rules first and
//! changes nothing when they fail: the result is `None` or `false`. An
//! allocation failure is reported the same way and leaves the tree as it
//! was before the call.

use super::document::Document;
use super::node::{AttrId, NodeId, NodeKind};

/// Where a new or moved node goes relative to the target
#[derive(Debug, Clone, Copy)]
enum Place {
    Last,
    First,
    Before(NodeId),
    After(NodeId),
}

/// Where a new attribute goes in its owner's list
#[derive(Debug, Clone, Copy)]
enum AttrPlace {
    Last,
    First,
    Before(AttrId),
    After(AttrId),
}

/// Owned copy of one node of a subtree, in preorder
struct CopiedNode {
    kind: NodeKind,
    name: String,
    value: String,
    attrs: Vec<(String, String)>,
    /// Index of the parent in the copy list; `None` for the copied root
    parent: Option<usize>,
}

/// Longest prefix of `s` no longer than `max` bytes, cut at a char boundary
fn truncate_str(s: &str, max: usize) -> &str {
    if max >= s.len() {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

impl Document {
    // ------------------------------------------------------------------
    // Node insertion
    // ------------------------------------------------------------------

    /// Check that `place` is a valid spot under `parent`
    fn place_ok(&self, parent: NodeId, place: Place) -> bool {
        match place {
            Place::Last | Place::First => self.contains(parent),
            Place::Before(r) | Place::After(r) => {
                self.contains(parent) && self.parent(r) == Some(parent)
            }
        }
    }

    fn link_at(&mut self, parent: NodeId, node: NodeId, place: Place) {
        match place {
            Place::Last => self.link_last(parent, node),
            Place::First => self.link_first(parent, node),
            Place::Before(r) => self.link_before(r, node),
            Place::After(r) => self.link_after(r, node),
        }
        self.invalidate_order();
    }

    fn insert_child(&mut self, parent: NodeId, kind: NodeKind, place: Place) -> Option<NodeId> {
        if !self.kind(parent).allows_child(kind) || !self.place_ok(parent, place) {
            return None;
        }
        let node = self.alloc_node(kind)?;
        if kind == NodeKind::Declaration {
            match self.strings.owned("xml") {
                Some(slot) => {
                    if let Some(n) = self.node_mut(node) {
                        n.name = slot;
                    }
                }
                None => {
                    self.free_subtree(node);
                    return None;
                }
            }
        }
        self.link_at(parent, node, place);
        Some(node)
    }

    /// Add a new last child of the given kind
    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.insert_child(parent, kind, Place::Last)
    }

    /// Add a new first child of the given kind
    pub fn prepend_child(&mut self, parent: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.insert_child(parent, kind, Place::First)
    }

    /// Add a new child right before `reference`, which must be a child of `parent`
    pub fn insert_child_before(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        reference: NodeId,
    ) -> Option<NodeId> {
        self.insert_child(parent, kind, Place::Before(reference))
    }

    /// Add a new child right after `reference`, which must be a child of `parent`
    pub fn insert_child_after(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        reference: NodeId,
    ) -> Option<NodeId> {
        self.insert_child(parent, kind, Place::After(reference))
    }

    fn insert_element(&mut self, parent: NodeId, name: &str, place: Place) -> Option<NodeId> {
        let node = self.insert_child(parent, NodeKind::Element, place)?;
        if !self.set_name(node, name) {
            self.remove_child(parent, node);
            return None;
        }
        Some(node)
    }

    /// Add a new last child element
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.insert_element(parent, name, Place::Last)
    }

    /// Add a new first child element
    pub fn prepend_element(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.insert_element(parent, name, Place::First)
    }

    pub fn insert_element_before(
        &mut self,
        parent: NodeId,
        name: &str,
        reference: NodeId,
    ) -> Option<NodeId> {
        self.insert_element(parent, name, Place::Before(reference))
    }

    pub fn insert_element_after(
        &mut self,
        parent: NodeId,
        name: &str,
        reference: NodeId,
    ) -> Option<NodeId> {
        self.insert_element(parent, name, Place::After(reference))
    }

    // ------------------------------------------------------------------
    // Copies
    // ------------------------------------------------------------------

    /// Owned preorder copy of the subtree at `proto`
    fn snapshot(&self, proto: NodeId) -> Vec<CopiedNode> {
        let mut out = Vec::new();
        let mut stack = vec![(proto, None)];
        while let Some((node, parent)) = stack.pop() {
            let index = out.len();
            out.push(CopiedNode {
                kind: self.kind(node),
                name: self.name(node).to_owned(),
                value: self.value(node).to_owned(),
                attrs: self
                    .attributes(node)
                    .map(|a| (self.attr_name(a).to_owned(), self.attr_value(a).to_owned()))
                    .collect(),
                parent,
            });
            // Reverse so the first child is copied first
            let children: Vec<_> = self.children(node).collect();
            for child in children.into_iter().rev() {
                stack.push((child, Some(index)));
            }
        }
        out
    }

    /// Build a snapshot under `parent` at `place`
    fn materialize(&mut self, parent: NodeId, place: Place, copy: &[CopiedNode]) -> Option<NodeId> {
        let mut created: Vec<NodeId> = Vec::with_capacity(copy.len());
        let mut top = None;

        for item in copy {
            let Some(node) = self.build_copy(item) else {
                if let Some(top) = top {
                    self.unlink(top);
                    self.free_subtree(top);
                }
                return None;
            };
            match item.parent.and_then(|p| created.get(p).copied()) {
                Some(owner) => self.link_last(owner, node),
                None => top = Some(node),
            }
            created.push(node);
        }

        let top = top?;
        self.link_at(parent, top, place);
        Some(top)
    }

    fn build_copy(&mut self, item: &CopiedNode) -> Option<NodeId> {
        let node = self.alloc_node(item.kind)?;
        let filled = self.fill_copy(node, item);
        if filled.is_none() {
            self.free_subtree(node);
        }
        filled.map(|_| node)
    }

    fn fill_copy(&mut self, node: NodeId, item: &CopiedNode) -> Option<()> {
        let name = self.strings.owned(&item.name)?;
        let value = self.strings.owned(&item.value)?;
        if let Some(n) = self.node_mut(node) {
            n.name = name;
            n.value = value;
        }
        for (name, value) in &item.attrs {
            let attr = self.alloc_attr()?;
            self.link_attr_last(node, attr);
            let name = self.strings.owned(name)?;
            let value = self.strings.owned(value)?;
            if let Some(a) = self.attr_mut(attr) {
                a.name = name;
                a.value = value;
            }
        }
        Some(())
    }

    fn insert_copy(&mut self, parent: NodeId, proto: NodeId, place: Place) -> Option<NodeId> {
        if !self.kind(parent).allows_child(self.kind(proto)) || !self.place_ok(parent, place) {
            return None;
        }
        let copy = self.snapshot(proto);
        self.materialize(parent, place, &copy)
    }

    /// Append a deep copy of `proto` (from this document) to `parent`
    pub fn append_copy(&mut self, parent: NodeId, proto: NodeId) -> Option<NodeId> {
        self.insert_copy(parent, proto, Place::Last)
    }

    pub fn prepend_copy(&mut self, parent: NodeId, proto: NodeId) -> Option<NodeId> {
        self.insert_copy(parent, proto, Place::First)
    }

    pub fn insert_copy_before(
        &mut self,
        parent: NodeId,
        proto: NodeId,
        reference: NodeId,
    ) -> Option<NodeId> {
        self.insert_copy(parent, proto, Place::Before(reference))
    }

    pub fn insert_copy_after(
        &mut self,
        parent: NodeId,
        proto: NodeId,
        reference: NodeId,
    ) -> Option<NodeId> {
        self.insert_copy(parent, proto, Place::After(reference))
    }

    /// Append a deep copy of node `proto` of another document
    pub fn copy_from(&mut self, parent: NodeId, source: &Document, proto: NodeId) -> Option<NodeId> {
        if !self.kind(parent).allows_child(source.kind(proto)) || !self.contains(parent) {
            return None;
        }
        let copy = source.snapshot(proto);
        self.materialize(parent, Place::Last, &copy)
    }

    /// Prepend a deep copy of node `proto` of another document
    pub fn prepend_copy_from(
        &mut self,
        parent: NodeId,
        source: &Document,
        proto: NodeId,
    ) -> Option<NodeId> {
        if !self.kind(parent).allows_child(source.kind(proto)) || !self.contains(parent) {
            return None;
        }
        let copy = source.snapshot(proto);
        self.materialize(parent, Place::First, &copy)
    }

    /// Replace this document's content with a copy of `proto`'s
    pub fn reset_from(&mut self, proto: &Document) {
        self.reset();
        let root = self.root();
        for child in proto.children(proto.root()) {
            if self.copy_from(root, proto, child).is_none() {
                break;
            }
        }
    }

    // ------------------------------------------------------------------
    // Moves
    // ------------------------------------------------------------------

    /// Check whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    fn insert_move(&mut self, parent: NodeId, moved: NodeId, place: Place) -> Option<NodeId> {
        if !self.kind(parent).allows_child(self.kind(moved)) || !self.place_ok(parent, place) {
            return None;
        }
        // The moved node has to be attached somewhere and may not contain its new parent
        if self.parent(moved).is_none() || self.is_ancestor_or_self(moved, parent) {
            return None;
        }
        if let Place::Before(r) | Place::After(r) = place {
            if r == moved {
                return None;
            }
        }
        self.unlink(moved);
        self.link_at(parent, moved, place);
        Some(moved)
    }

    /// Move `moved` (with its subtree) to the end of `parent`'s children
    pub fn append_move(&mut self, parent: NodeId, moved: NodeId) -> Option<NodeId> {
        self.insert_move(parent, moved, Place::Last)
    }

    pub fn prepend_move(&mut self, parent: NodeId, moved: NodeId) -> Option<NodeId> {
        self.insert_move(parent, moved, Place::First)
    }

    pub fn insert_move_before(
        &mut self,
        parent: NodeId,
        moved: NodeId,
        reference: NodeId,
    ) -> Option<NodeId> {
        self.insert_move(parent, moved, Place::Before(reference))
    }

    pub fn insert_move_after(
        &mut self,
        parent: NodeId,
        moved: NodeId,
        reference: NodeId,
    ) -> Option<NodeId> {
        self.insert_move(parent, moved, Place::After(reference))
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Remove child `node` of `parent` and free its subtree
    pub fn remove_child(&mut self, parent: NodeId, node: NodeId) -> bool {
        if !self.contains(parent) || self.parent(node) != Some(parent) {
            return false;
        }
        self.unlink(node);
        self.free_subtree(node);
        true
    }

    /// Remove child `name` of `parent`
    pub fn remove_child_named(&mut self, parent: NodeId, name: &str) -> bool {
        match self.child(parent, name) {
            Some(node) => self.remove_child(parent, node),
            None => false,
        }
    }

    /// Remove all children of `parent`
    pub fn remove_children(&mut self, parent: NodeId) -> bool {
        if !self.contains(parent) {
            return false;
        }
        while let Some(child) = self.first_child(parent) {
            self.unlink(child);
            self.free_subtree(child);
        }
        true
    }

    /// Remove attribute `attr` of `node`
    pub fn remove_attribute(&mut self, node: NodeId, attr: AttrId) -> bool {
        if !self.contains(node) || self.attribute_parent(attr) != Some(node) {
            return false;
        }
        self.unlink_attr(attr);
        self.free_attr(attr);
        true
    }

    /// Remove the first attribute named `name`
    pub fn remove_attribute_named(&mut self, node: NodeId, name: &str) -> bool {
        match self.attribute(node, name) {
            Some(attr) => self.remove_attribute(node, attr),
            None => false,
        }
    }

    /// Remove all attributes of `node`
    pub fn remove_attributes(&mut self, node: NodeId) -> bool {
        if !self.contains(node) {
            return false;
        }
        while let Some(attr) = self.first_attribute(node) {
            self.unlink_attr(attr);
            self.free_attr(attr);
        }
        true
    }

    // ------------------------------------------------------------------
    // Attribute insertion
    // ------------------------------------------------------------------

    fn insert_attr(&mut self, node: NodeId, name: &str, value: &str, place: AttrPlace) -> Option<AttrId> {
        if !self.kind(node).has_attributes() {
            return None;
        }
        if let AttrPlace::Before(r) | AttrPlace::After(r) = place {
            if self.attribute_parent(r) != Some(node) {
                return None;
            }
        }
        let name = self.strings.owned(name)?;
        let Some(value) = self.strings.owned(value) else {
            self.strings.release(name);
            return None;
        };
        let Some(attr) = self.alloc_attr() else {
            self.strings.release(name);
            self.strings.release(value);
            return None;
        };
        if let Some(a) = self.attr_mut(attr) {
            a.name = name;
            a.value = value;
        }
        match place {
            AttrPlace::Last => self.link_attr_last(node, attr),
            AttrPlace::First => self.link_attr_first(node, attr),
            AttrPlace::Before(r) => self.link_attr_near(r, attr, false),
            AttrPlace::After(r) => self.link_attr_near(r, attr, true),
        }
        Some(attr)
    }

    /// Add an attribute with an empty value at the end of `node`'s list
    pub fn append_attribute(&mut self, node: NodeId, name: &str) -> Option<AttrId> {
        self.insert_attr(node, name, "", AttrPlace::Last)
    }

    pub fn prepend_attribute(&mut self, node: NodeId, name: &str) -> Option<AttrId> {
        self.insert_attr(node, name, "", AttrPlace::First)
    }

    pub fn insert_attribute_before(
        &mut self,
        node: NodeId,
        name: &str,
        reference: AttrId,
    ) -> Option<AttrId> {
        self.insert_attr(node, name, "", AttrPlace::Before(reference))
    }

    pub fn insert_attribute_after(
        &mut self,
        node: NodeId,
        name: &str,
        reference: AttrId,
    ) -> Option<AttrId> {
        self.insert_attr(node, name, "", AttrPlace::After(reference))
    }

    /// Set attribute `name`, appending it when missing
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Option<AttrId> {
        match self.attribute(node, name) {
            Some(attr) => self.set_attr_value(attr, value).then_some(attr),
            None => self.insert_attr(node, name, value, AttrPlace::Last),
        }
    }

    fn insert_attr_copy(&mut self, node: NodeId, proto: AttrId, place: AttrPlace) -> Option<AttrId> {
        if !self.contains_attr(proto) {
            return None;
        }
        let name = self.attr_name(proto).to_owned();
        let value = self.attr_value(proto).to_owned();
        self.insert_attr(node, &name, &value, place)
    }

    /// Append a copy of attribute `proto` to `node`
    pub fn append_attribute_copy(&mut self, node: NodeId, proto: AttrId) -> Option<AttrId> {
        self.insert_attr_copy(node, proto, AttrPlace::Last)
    }

    pub fn prepend_attribute_copy(&mut self, node: NodeId, proto: AttrId) -> Option<AttrId> {
        self.insert_attr_copy(node, proto, AttrPlace::First)
    }

    pub fn insert_attribute_copy_before(
        &mut self,
        node: NodeId,
        proto: AttrId,
        reference: AttrId,
    ) -> Option<AttrId> {
        self.insert_attr_copy(node, proto, AttrPlace::Before(reference))
    }

    pub fn insert_attribute_copy_after(
        &mut self,
        node: NodeId,
        proto: AttrId,
        reference: AttrId,
    ) -> Option<AttrId> {
        self.insert_attr_copy(node, proto, AttrPlace::After(reference))
    }

    // ------------------------------------------------------------------
    // Names and values
    // ------------------------------------------------------------------

    /// Rename an element, PI or declaration
    pub fn set_name(&mut self, node: NodeId, name: &str) -> bool {
        if !self.kind(node).has_name() {
            return false;
        }
        let Some(slot) = self.strings.owned(name) else {
            return false;
        };
        if let Some(n) = self.node_mut(node) {
            let old = std::mem::replace(&mut n.name, slot);
            self.strings.release(old);
        }
        true
    }

    /// Rename, keeping at most `size` bytes of `name`
    pub fn set_name_truncated(&mut self, node: NodeId, name: &str, size: usize) -> bool {
        self.set_name(node, truncate_str(name, size))
    }

    /// Set the value of a text, comment, PI or doctype node
    pub fn set_value(&mut self, node: NodeId, value: &str) -> bool {
        if !self.kind(node).has_value() {
            return false;
        }
        let Some(slot) = self.strings.owned(value) else {
            return false;
        };
        if let Some(n) = self.node_mut(node) {
            let old = std::mem::replace(&mut n.value, slot);
            self.strings.release(old);
        }
        true
    }

    /// Set the value, keeping at most `size` bytes of `value`
    pub fn set_value_truncated(&mut self, node: NodeId, value: &str, size: usize) -> bool {
        self.set_value(node, truncate_str(value, size))
    }

    pub fn set_attr_name(&mut self, attr: AttrId, name: &str) -> bool {
        if !self.contains_attr(attr) {
            return false;
        }
        let Some(slot) = self.strings.owned(name) else {
            return false;
        };
        if let Some(a) = self.attr_mut(attr) {
            let old = std::mem::replace(&mut a.name, slot);
            self.strings.release(old);
        }
        true
    }

    pub fn set_attr_name_truncated(&mut self, attr: AttrId, name: &str, size: usize) -> bool {
        self.set_attr_name(attr, truncate_str(name, size))
    }

    pub fn set_attr_value(&mut self, attr: AttrId, value: &str) -> bool {
        if !self.contains_attr(attr) {
            return false;
        }
        let Some(slot) = self.strings.owned(value) else {
            return false;
        };
        if let Some(a) = self.attr_mut(attr) {
            let old = std::mem::replace(&mut a.value, slot);
            self.strings.release(old);
        }
        true
    }

    pub fn set_attr_value_truncated(&mut self, attr: AttrId, value: &str, size: usize) -> bool {
        self.set_attr_value(attr, truncate_str(value, size))
    }
}

impl Clone for Document {
    fn clone(&self) -> Self {
        let mut doc = Document::new();
        doc.reset_from(self);
        doc
    }
}
