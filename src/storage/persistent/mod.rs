//! Persistent storage backend for Zero Point.
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │               JsonFileBackend              │
//! ├────────────────────────────────────────────┤
//! │  encode → <doc>.json.tmp.<uuid>            │
//! │         → fsync → rename over <doc>.json   │
//! │                                            │
//! │  FileLock (flock / LockFileEx) on          │
//! │  <doc>.json.lock for the backend lifetime  │
//! └────────────────────────────────────────────┘
//! ```

mod file_lock;
mod json_file;

pub use file_lock::FileLock;
pub use json_file::JsonFileBackend;
