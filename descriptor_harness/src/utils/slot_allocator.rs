use std::collections::VecDeque;
use std::ops::Range;

use rustc_hash::FxHashSet;

/// Outcome of [`SlotAllocator::free`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOutcome {
    /// Index appended to the free list
    Released,
    /// Index was already in the free list; nothing changed
    AlreadyFree,
    /// Index was never handed out (at or above the high water mark)
    NeverAllocated,
}

/// Allocates and recycles `u32` indices inside a fixed capacity.
///
/// Backs the descriptor allocators: indices map 1:1 to descriptor slots.
/// Freed indices are recycled oldest-first (FIFO). Batch allocation
/// always takes fresh, contiguous indices and never touches the free list.
///
/// # Example
///
/// ```ignore
/// let mut alloc = SlotAllocator::with_capacity(4);
/// let a = alloc.alloc().unwrap();  // 0
/// let b = alloc.alloc().unwrap();  // 1
/// alloc.free(a);                   // 0 is now available
/// let c = alloc.alloc().unwrap();  // 0 (recycled)
/// ```
pub struct SlotAllocator {
    free_list: VecDeque<u32>,
    /// Mirror of `free_list` for O(1) membership checks
    free_set: FxHashSet<u32>,
    next_id: u32,
    capacity: u32,
}

impl SlotAllocator {
    /// Create an empty allocator able to hand out `capacity` indices
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            free_list: VecDeque::new(),
            free_set: FxHashSet::default(),
            next_id: 0,
            capacity,
        }
    }

    /// Allocate one index, recycling the oldest freed index first.
    ///
    /// Returns `None` when the free list is empty and every index has been used.
    pub fn alloc(&mut self) -> Option<u32> {
        if let Some(id) = self.free_list.pop_front() {
            self.free_set.remove(&id);
            return Some(id);
        }
        if self.next_id >= self.capacity {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        Some(id)
    }

    /// Allocate `count` fresh contiguous indices starting at the high water mark.
    ///
    /// Returns `None` (and changes nothing) if the range would pass the capacity.
    pub fn alloc_contiguous(&mut self, count: u32) -> Option<Range<u32>> {
        let end = self.next_id.checked_add(count)?;
        if end > self.capacity {
            return None;
        }
        let start = self.next_id;
        self.next_id = end;
        Some(start..end)
    }

    /// Return an index to the pool for reuse
    pub fn free(&mut self, id: u32) -> FreeOutcome {
        if id >= self.next_id {
            return FreeOutcome::NeverAllocated;
        }
        if !self.free_set.insert(id) {
            return FreeOutcome::AlreadyFree;
        }
        self.free_list.push_back(id);
        FreeOutcome::Released
    }

    /// Whether `id` currently sits in the free list
    pub fn is_free(&self, id: u32) -> bool {
        self.free_set.contains(&id)
    }

    /// Highest index ever allocated + 1.
    pub fn high_water_mark(&self) -> u32 {
        self.next_id
    }

    /// Maximum number of indices
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Number of indices waiting in the free list
    pub fn free_count(&self) -> u32 {
        self.free_list.len() as u32
    }

    /// Number of currently allocated indices
    pub fn len(&self) -> u32 {
        self.next_id - self.free_count()
    }

    /// Whether no indices are currently allocated
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "slot_allocator_tests.rs"]
mod tests;
