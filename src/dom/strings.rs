//! Borrowed-or-owned text slots
//!
//! Every name and value in the tree is a `TextSlot`:
//! - Source: (buffer, offset, len) referencing a document-owned source buffer (zero-copy)
//! - Arena: a string copied into the document's page arena
//!
//! Text that needed decoding while parsing, and every string written through
//! the mutation API, is stored as `Arena`.

use std::sync::Arc;

use super::arena::{PageRef, StringArena};

/// Storage location of a name or value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextSlot {
    /// No text (reads as "")
    #[default]
    Null,
    /// Range into source buffer `buf`
    Source { buf: u32, start: u32, len: u32 },
    /// Copy in the string arena
    Arena(PageRef),
}

impl TextSlot {
    /// Check for the null slot
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, TextSlot::Null)
    }

    /// Check for a borrowed source range
    #[inline]
    pub fn is_borrowed(&self) -> bool {
        matches!(self, TextSlot::Source { .. })
    }

    /// Byte offset inside the source buffer, for borrowed slots
    #[inline]
    pub fn source_offset(&self) -> Option<usize> {
        match self {
            TextSlot::Source { start, .. } => Some(*start as usize),
            _ => None,
        }
    }
}

/// Source buffers plus the page arena; resolves slots to `&str`
#[derive(Debug, Default)]
pub struct TextStore {
    buffers: Vec<Arc<String>>,
    pages: StringArena,
}

impl TextStore {
    /// Register a source buffer, returning its index
    pub fn add_buffer(&mut self, text: String) -> Option<u32> {
        let index = u32::try_from(self.buffers.len()).ok()?;
        self.buffers.try_reserve(1).ok()?;
        self.buffers.push(Arc::new(text));
        Some(index)
    }

    /// Borrow a source buffer
    #[inline]
    pub fn buffer(&self, index: u32) -> &str {
        self.buffers.get(index as usize).map_or("", |b| b.as_str())
    }

    /// Shared handle to a source buffer, so it can be read while the store is mutated
    pub fn source(&self, index: u32) -> Option<Arc<String>> {
        self.buffers.get(index as usize).cloned()
    }

    /// Borrowed slot for a range of a source buffer
    #[inline]
    pub fn borrowed(buf: u32, start: usize, end: usize) -> TextSlot {
        TextSlot::Source {
            buf,
            start: start as u32,
            len: (end - start) as u32,
        }
    }

    /// Copy a string into the arena; empty strings become Null
    pub fn owned(&mut self, s: &str) -> Option<TextSlot> {
        if s.is_empty() {
            return Some(TextSlot::Null);
        }
        self.pages.alloc(s).map(TextSlot::Arena)
    }

    /// Resolve a slot
    #[inline]
    pub fn get(&self, slot: TextSlot) -> &str {
        match slot {
            TextSlot::Null => "",
            TextSlot::Source { buf, start, len } => {
                let start = start as usize;
                self.buffer(buf)
                    .get(start..start + len as usize)
                    .unwrap_or("")
            }
            TextSlot::Arena(r) => self.pages.get(r),
        }
    }

    /// Forget a slot's storage
    #[inline]
    pub fn release(&mut self, slot: TextSlot) {
        if let TextSlot::Arena(r) = slot {
            self.pages.release(r);
        }
    }

    /// Drop all buffers and pages
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.pages.clear();
    }

    /// Bytes held by buffers and pages
    pub fn memory_usage(&self) -> usize {
        self.buffers.iter().map(|b| b.capacity()).sum::<usize>() + self.pages.memory_usage()
    }

    /// Bytes released but not reclaimed
    pub fn wasted(&self) -> usize {
        self.pages.wasted()
    }
}
