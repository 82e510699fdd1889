//! I/O operations module
//!
//! Contains the file-storage service used by every tester, its local
//! file-system implementation and the pattern buffer. An in-memory storage
//! with fault injection backs the unit tests.

pub mod buffer;
pub mod disk;
#[cfg(test)]
pub mod memory;

pub use buffer::WordBlock;
pub use disk::{read_full, write_full, FileStorage, OpenMode, PlatformStorage, StorageFile};
#[cfg(test)]
pub use memory::{IoOp, MemoryStorage};
