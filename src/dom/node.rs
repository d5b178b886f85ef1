//! XML Node representation
//!
//! Nodes and attributes are arena records addressed by generational handles.
//! A handle is (slot index, generation): cheap to copy, compare and hash, and
//! it stops resolving once its record is removed.

use super::strings::TextSlot;

/// Handle to a node record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

/// Handle to an attribute record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttrId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

macro_rules! handle_hash {
    ($name:ident) => {
        impl $name {
            /// Stable non-zero hash derived from the handle's identity
            ///
            /// A missing handle (`None`) hashes to 0 by convention.
            #[inline]
            pub fn hash_value(&self) -> u64 {
                (((self.generation as u64) << 32) | self.index as u64).wrapping_add(1).max(1)
            }

            /// Slot index (diagnostics only)
            #[inline]
            pub fn index(&self) -> u32 {
                self.index
            }
        }
    };
}

handle_hash!(NodeId);
handle_hash!(AttrId);

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeKind {
    /// Empty handle; never stored
    #[default]
    Null,
    /// Document root
    Document,
    /// Element node
    Element,
    /// Text content
    Pcdata,
    /// CDATA section
    Cdata,
    /// Comment
    Comment,
    /// Processing instruction
    Pi,
    /// XML declaration (`<?xml ...?>`)
    Declaration,
    /// Document type declaration
    Doctype,
}

impl NodeKind {
    /// Kinds that carry a name
    #[inline]
    pub fn has_name(self) -> bool {
        matches!(self, NodeKind::Element | NodeKind::Pi | NodeKind::Declaration)
    }

    /// Kinds that carry a value
    #[inline]
    pub fn has_value(self) -> bool {
        matches!(
            self,
            NodeKind::Pcdata | NodeKind::Cdata | NodeKind::Comment | NodeKind::Pi | NodeKind::Doctype
        )
    }

    /// Kinds that may hold attributes
    #[inline]
    pub fn has_attributes(self) -> bool {
        matches!(self, NodeKind::Element | NodeKind::Declaration)
    }

    /// Kinds that may hold children
    #[inline]
    pub fn has_children(self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Element)
    }

    /// Whether a `child` kind may be inserted under a `self` kind
    pub fn allows_child(self, child: NodeKind) -> bool {
        if !self.has_children() {
            return false;
        }
        match child {
            NodeKind::Null | NodeKind::Document => false,
            NodeKind::Declaration | NodeKind::Doctype => self == NodeKind::Document,
            _ => true,
        }
    }

    /// Text nodes (PCDATA or CDATA)
    #[inline]
    pub fn is_text(self) -> bool {
        matches!(self, NodeKind::Pcdata | NodeKind::Cdata)
    }
}

/// A node in the arena
#[derive(Debug, Clone)]
pub struct NodeRecord {
    /// Type of this node
    pub kind: NodeKind,
    /// Element/PI/declaration name
    pub name: TextSlot,
    /// Text content (also element text with EMBED_PCDATA)
    pub value: TextSlot,
    /// Parent node (None for document root)
    pub parent: Option<NodeId>,
    /// First child node
    pub first_child: Option<NodeId>,
    /// Last child node
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    pub first_attr: Option<AttrId>,
    pub last_attr: Option<AttrId>,
    /// Construction counter; document order while the tree is unedited
    pub order: u64,
}

impl NodeRecord {
    /// Create a detached node
    pub fn new(kind: NodeKind, order: u64) -> Self {
        NodeRecord {
            kind,
            name: TextSlot::Null,
            value: TextSlot::Null,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            first_attr: None,
            last_attr: None,
            order,
        }
    }

    /// Check if this node has children
    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }
}

/// Stored attribute
#[derive(Debug, Clone)]
pub struct AttrRecord {
    pub name: TextSlot,
    pub value: TextSlot,
    /// Owning element or declaration
    pub owner: Option<NodeId>,
    pub prev: Option<AttrId>,
    pub next: Option<AttrId>,
}

impl AttrRecord {
    pub fn new() -> Self {
        AttrRecord {
            name: TextSlot::Null,
            value: TextSlot::Null,
            owner: None,
            prev: None,
            next: None,
        }
    }
}

impl Default for AttrRecord {
    fn default() -> Self {
        AttrRecord::new()
    }
}
