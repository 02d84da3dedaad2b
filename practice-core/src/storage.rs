//! # Bookmark Storage Module
//!
//! Durable storage seam for the practice bookmark. The navigator does not
//! know where the bookmark lives; it talks to a `BookmarkStore`, which is
//! an in-memory slot in tests and a small JSON file in the CLI.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

/// Durable storage for the single bookmarked note index.
///
/// `load` returns `None` when nothing has been stored yet. `save` never
/// surfaces errors to callers; implementations log write problems and
/// move on.
pub trait BookmarkStore {
    fn load(&self) -> Option<usize>;
    fn save(&mut self, index: usize);
}

/// In-memory store with a shared slot.
///
/// Cloning returns a handle onto the same slot, so a test can keep one
/// handle and give the other to a navigator.
#[derive(Debug, Clone, Default)]
pub struct MemoryBookmarkStore {
    slot: Rc<Cell<Option<usize>>>,
}

impl MemoryBookmarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the slot directly, bypassing the trait.
    pub fn stored(&self) -> Option<usize> {
        self.slot.get()
    }
}

impl BookmarkStore for MemoryBookmarkStore {
    fn load(&self) -> Option<usize> {
        self.slot.get()
    }

    fn save(&mut self, index: usize) {
        self.slot.set(Some(index));
    }
}

/// On-disk bookmark record.
#[derive(Debug, Serialize, Deserialize)]
struct BookmarkRecord {
    bookmark: usize,
}

/// File-backed store holding one JSON record.
///
/// A missing or unreadable file reads as "nothing stored"; the next save
/// simply rewrites it. Last writer wins.
#[derive(Debug)]
pub struct FileBookmarkStore {
    path: PathBuf,
}

impl FileBookmarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BookmarkStore for FileBookmarkStore {
    fn load(&self) -> Option<usize> {
        let data = fs::read_to_string(&self.path).ok()?;
        let record: BookmarkRecord = serde_json::from_str(&data).ok()?;
        Some(record.bookmark)
    }

    fn save(&mut self, index: usize) {
        let record = BookmarkRecord { bookmark: index };
        let json = match serde_json::to_string_pretty(&record) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("[STORE] Error serializing bookmark: {}", e);
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            eprintln!(
                "[STORE] Error saving bookmark to {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryBookmarkStore::new();
        assert_eq!(store.load(), None);
        store.save(7);
        assert_eq!(store.load(), Some(7));
        assert_eq!(store.clone().stored(), Some(7));
    }

    #[test]
    fn file_store_round_trips() {
        let path =
            std::env::temp_dir().join(format!("bookmark-round-trip-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);
        let mut store = FileBookmarkStore::new(&path);
        assert_eq!(store.load(), None);
        store.save(3);
        assert_eq!(store.load(), Some(3));
        store.save(11);
        assert_eq!(store.load(), Some(11));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn file_store_ignores_garbage() {
        let path =
            std::env::temp_dir().join(format!("bookmark-garbage-{}.json", std::process::id()));
        fs::write(&path, "not json").unwrap();
        let store = FileBookmarkStore::new(&path);
        assert_eq!(store.load(), None);
        let _ = fs::remove_file(&path);
    }
}
