/// Small data structures shared by the harness modules

pub mod slot_allocator;

pub use slot_allocator::{SlotAllocator, FreeOutcome};
