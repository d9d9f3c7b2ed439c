//! Storage layer implementation for blockfile.
//!
//! This module maps a logical address space of fixed-size blocks onto files
//! in a storage directory. Key components:
//!
//! - **BlockId**: Value-type address `(file_name, block_num)` identifying one
//!   block of one file, usable directly as a map key
//! - **Page**: Fixed-size in-memory byte buffer with typed accessors at
//!   caller-chosen offsets, the basic unit of I/O
//! - **FileManager**: Translates block-level read/write/append requests into
//!   OS file I/O, with open-handle caching and exclusive serialization
//!
//! Higher layers (buffer pool, log manager, transactions) build on these
//! three primitives; none of their policies live here.

pub mod block;
pub mod disk;
pub mod error;
pub mod page;

pub use block::BlockId;
pub use disk::{FileManager, TEMP_FILE_PREFIX};
pub use error::{StorageError, StorageResult};
pub use page::{Page, INT_SIZE};
