//! Exclusive file locking for the store document.
//!
//! Only one process may own a store document at a time. The lock lives in a
//! sibling file (`<document>.lock`) and is held for as long as the
//! [`FileLock`] value is alive; dropping it closes the handle, which releases
//! the OS lock.

use std::fs::{File, OpenOptions};
use std::io::Result as IoResult;
use std::path::{Path, PathBuf};

use crate::storage::traits::StorageError;

/// Exclusive lock guarding one store document.
#[derive(Debug)]
pub struct FileLock {
    _file: File,
    path: PathBuf,
}

impl FileLock {
    /// Take the lock that guards `document` without blocking.
    ///
    /// # Errors
    /// - `StorageError::Locked` if another holder owns the document
    /// - `StorageError::Io` if the lock file cannot be opened or locked
    pub fn acquire_for(document: &Path) -> Result<Self, StorageError> {
        let path = lock_path_for(document);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if !lock_exclusive(&file)? {
            return Err(StorageError::Locked {
                path: document.display().to_string(),
            });
        }

        Ok(Self { _file: file, path })
    }

    /// Returns the path to the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `Ok(false)` means someone else holds the lock.
#[cfg(unix)]
fn lock_exclusive(file: &File) -> IoResult<bool> {
    use std::os::unix::io::AsRawFd;

    if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) } == 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    match err.raw_os_error() {
        Some(code) if code == libc::EWOULDBLOCK => Ok(false),
        _ => Err(err),
    }
}

#[cfg(windows)]
fn lock_exclusive(file: &File) -> IoResult<bool> {
    use std::os::windows::io::AsRawHandle;
    use windows_sys::Win32::Foundation::{ERROR_LOCK_VIOLATION, HANDLE};
    use windows_sys::Win32::Storage::FileSystem::{
        LockFileEx, LOCKFILE_EXCLUSIVE_LOCK, LOCKFILE_FAIL_IMMEDIATELY,
    };
    use windows_sys::Win32::System::IO::OVERLAPPED;

    let handle = file.as_raw_handle() as HANDLE;
    // SAFETY: `handle` is open for the duration of the call and `OVERLAPPED`
    // is plain data for which all-zero is a valid value.
    let locked = unsafe {
        let mut overlapped = std::mem::zeroed::<OVERLAPPED>();
        LockFileEx(
            handle,
            LOCKFILE_EXCLUSIVE_LOCK | LOCKFILE_FAIL_IMMEDIATELY,
            0,
            1,
            0,
            &mut overlapped,
        )
    };
    if locked != 0 {
        return Ok(true);
    }
    let err = std::io::Error::last_os_error();
    #[allow(clippy::cast_possible_wrap)]
    match err.raw_os_error() {
        Some(code) if code == ERROR_LOCK_VIOLATION as i32 => Ok(false),
        _ => Err(err),
    }
}

#[cfg(not(any(unix, windows)))]
fn lock_exclusive(_file: &File) -> IoResult<bool> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "file locking not supported on this platform",
    ))
}

/// `memory/zero_point_store.json` → `memory/zero_point_store.json.lock`
fn lock_path_for(document: &Path) -> PathBuf {
    let mut name = document
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".lock");
    document.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_lock_acquire_release() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("store.json");

        {
            let lock = FileLock::acquire_for(&doc).unwrap();
            assert!(lock.path().exists());
            assert!(lock.path().ends_with("store.json.lock"));
        }

        // Released on drop, so a fresh acquire succeeds.
        let _again = FileLock::acquire_for(&doc).unwrap();
    }

    #[test]
    fn test_contention_names_the_document() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("store.json");

        let _held = FileLock::acquire_for(&doc).unwrap();

        match FileLock::acquire_for(&doc) {
            Err(StorageError::Locked { path }) => assert_eq!(path, doc.display().to_string()),
            other => panic!("expected Locked, got {other:?}"),
        }
    }

    #[test]
    fn test_distinct_documents_lock_independently() {
        let dir = tempdir().unwrap();
        let _a = FileLock::acquire_for(&dir.path().join("a.json")).unwrap();
        let _b = FileLock::acquire_for(&dir.path().join("b.json")).unwrap();
    }

    #[test]
    fn test_missing_parent_is_an_io_error() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("absent").join("store.json");
        assert!(matches!(FileLock::acquire_for(&doc), Err(StorageError::Io(_))));
    }
}
