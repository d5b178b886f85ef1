//! Arena storage for records and owned strings
//!
//! Records live in a `SlotArena`: a vector of slots addressed by index, with
//! a generation counter per slot so a handle to a removed record can be
//! detected instead of silently aliasing the slot's next occupant.
//!
//! Owned text lives in `StringArena` pages. Strings are appended to the
//! current page and never moved; space is reclaimed only when the whole
//! arena is cleared.
//!
//! Every growth goes through `try_reserve`, so running out of memory fails
//! the one allocation that hit it and leaves everything else intact.

/// A slot holding either a live record or a free-list link
#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generational slot arena
#[derive(Debug)]
pub struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for SlotArena<T> {
    fn default() -> Self {
        SlotArena {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<T> SlotArena<T> {
    /// Insert a record, returning (index, generation)
    pub fn insert(&mut self, value: T) -> Option<(u32, u32)> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            self.live += 1;
            return Some((index, slot.generation));
        }

        let index = u32::try_from(self.slots.len()).ok()?;
        if index == u32::MAX {
            return None;
        }
        self.slots.try_reserve(1).ok()?;
        // Free list must be able to take the slot back without allocating
        self.free.try_reserve(self.slots.len() + 1 - self.free.len()).ok()?;
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        self.live += 1;
        Some((index, 1))
    }

    /// Get a live record
    #[inline]
    pub fn get(&self, index: u32, generation: u32) -> Option<&T> {
        let slot = self.slots.get(index as usize)?;
        if slot.generation == generation {
            slot.value.as_ref()
        } else {
            None
        }
    }

    /// Get a live record mutably
    #[inline]
    pub fn get_mut(&mut self, index: u32, generation: u32) -> Option<&mut T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation == generation {
            slot.value.as_mut()
        } else {
            None
        }
    }

    /// Generation of the record currently occupying `index`, if any
    #[inline]
    pub fn generation_at(&self, index: u32) -> Option<u32> {
        let slot = self.slots.get(index as usize)?;
        slot.value.as_ref().map(|_| slot.generation)
    }

    /// Remove a record; the slot's generation moves on so old handles go stale
    pub fn remove(&mut self, index: u32, generation: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        if slot.generation != generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1).max(1);
        self.free.push(index);
        self.live -= 1;
        Some(value)
    }

    /// Number of live records
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Number of slots ever allocated (live or free)
    #[inline]
    pub fn capacity_slots(&self) -> usize {
        self.slots.len()
    }

    /// Drop every record. Generations survive so handles from before stay stale.
    pub fn clear(&mut self) {
        self.free.clear();
        for (index, slot) in self.slots.iter_mut().enumerate().rev() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1).max(1);
            }
            self.free.push(index as u32);
        }
        self.live = 0;
    }

    /// Bytes held by the slot vectors
    pub fn memory_usage(&self) -> usize {
        self.slots.capacity() * std::mem::size_of::<Slot<T>>()
            + self.free.capacity() * std::mem::size_of::<u32>()
    }
}

/// Size of a regular string page
const PAGE_SIZE: usize = 32 * 1024;

/// Location of a string inside the page arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
    pub page: u32,
    pub start: u32,
    pub len: u32,
}

/// Append-only paged storage for owned strings
#[derive(Debug, Default)]
pub struct StringArena {
    pages: Vec<String>,
    /// Bytes handed out and later released; reclaimed on clear
    wasted: usize,
}

impl StringArena {
    /// Copy `s` into the arena
    pub fn alloc(&mut self, s: &str) -> Option<PageRef> {
        let len = u32::try_from(s.len()).ok()?;

        let fits = self
            .pages
            .last()
            .is_some_and(|page| page.capacity() - page.len() >= s.len());

        if !fits {
            let mut page = String::new();
            page.try_reserve_exact(s.len().max(PAGE_SIZE)).ok()?;
            self.pages.try_reserve(1).ok()?;
            self.pages.push(page);
        }

        let index = self.pages.len() - 1;
        let page = &mut self.pages[index];
        let start = u32::try_from(page.len()).ok()?;
        // Capacity was checked above, this never reallocates
        page.push_str(s);

        Some(PageRef {
            page: index as u32,
            start,
            len,
        })
    }

    /// Resolve a page reference
    #[inline]
    pub fn get(&self, r: PageRef) -> &str {
        let start = r.start as usize;
        self.pages
            .get(r.page as usize)
            .and_then(|page| page.get(start..start + r.len as usize))
            .unwrap_or("")
    }

    /// Note that a string is no longer referenced
    #[inline]
    pub fn release(&mut self, r: PageRef) {
        self.wasted += r.len as usize;
    }

    /// Drop every page
    pub fn clear(&mut self) {
        self.pages.clear();
        self.wasted = 0;
    }

    /// Bytes reserved by pages
    pub fn memory_usage(&self) -> usize {
        self.pages.iter().map(String::capacity).sum()
    }

    /// Bytes released but not yet reclaimed
    pub fn wasted(&self) -> usize {
        self.wasted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_remove() {
        let mut arena = SlotArena::default();
        let (a, ga) = arena.insert("a").unwrap();
        let (b, gb) = arena.insert("b").unwrap();
        assert_eq!(arena.get(a, ga), Some(&"a"));
        assert_eq!(arena.len(), 2);

        assert_eq!(arena.remove(a, ga), Some("a"));
        assert_eq!(arena.get(a, ga), None);
        assert_eq!(arena.remove(a, ga), None);
        assert_eq!(arena.get(b, gb), Some(&"b"));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let mut arena = SlotArena::default();
        let (a, ga) = arena.insert(1).unwrap();
        arena.remove(a, ga);
        let (c, gc) = arena.insert(2).unwrap();
        assert_eq!(c, a);
        assert_ne!(gc, ga);
        assert_eq!(arena.get(a, ga), None);
        assert_eq!(arena.get(c, gc), Some(&2));
    }

    #[test]
    fn test_clear_invalidates_handles() {
        let mut arena = SlotArena::default();
        let (a, ga) = arena.insert(1).unwrap();
        arena.clear();
        assert_eq!(arena.get(a, ga), None);
        assert_eq!(arena.len(), 0);
        let (b, _) = arena.insert(5).unwrap();
        assert_eq!(b, 0);
    }

    #[test]
    fn test_string_pages() {
        let mut strings = StringArena::default();
        let a = strings.alloc("hello").unwrap();
        let b = strings.alloc("world").unwrap();
        assert_eq!(strings.get(a), "hello");
        assert_eq!(strings.get(b), "world");
        assert_eq!(a.page, b.page);

        let big = "x".repeat(PAGE_SIZE + 10);
        let c = strings.alloc(&big).unwrap();
        assert_eq!(strings.get(c).len(), PAGE_SIZE + 10);
        assert_eq!(strings.get(a), "hello");
    }
}
