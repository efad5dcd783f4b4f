//! Storage backends for the store document.

pub mod document;
mod memory;
mod traits;

#[cfg(feature = "persistent")]
pub mod persistent;

pub use document::StoreDocument;
pub use memory::InMemoryBackend;
pub use traits::{EntryBackend, StorageError};

#[cfg(feature = "persistent")]
pub use persistent::{FileLock, JsonFileBackend};
