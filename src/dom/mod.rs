//! DOM Module - Arena-based XML Document
//!
//! Implements a mutable DOM using:
//! - Slot arenas for node and attribute records, addressed by generational handles
//! - Borrowed-or-owned text: source ranges until an edit forces a copy
//! - Intrusive parent/child/sibling links patched in O(1)
//! - A construction counter per node for O(1) document-order comparisons

pub mod arena;
pub mod document;
pub mod mutate;
pub mod node;
pub mod parser;
pub mod result;
pub mod strings;
pub mod text;
pub mod walker;

pub use document::{Attributes, Children, Descendants, Document, MemoryUsage};
pub use node::{AttrId, NodeId, NodeKind};
pub use result::{ParseResult, ParseStatus};
pub use text::{TextMut, TextRef, TextValue};
pub use walker::TreeWalker;
