//! Blob storage for cover uploads - local disk and in-memory.

mod local;
mod memory;

pub use local::LocalDiskStorage;
pub use memory::InMemoryStorage;
