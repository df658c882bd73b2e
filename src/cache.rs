//! Remembers where reading stopped, per document.
//!
//! Files are stored under `.cache/` using a hash of the document path as the
//! directory name to avoid filesystem issues. The format is a tiny TOML file
//! holding the section index and the token offset within it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CACHE_DIR: &str = ".cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bookmark {
    pub section: usize,
    /// Atomic tokens into the section, counted in document order.
    #[serde(default)]
    pub token_offset: usize,
}

pub fn load_bookmark(document: &Path) -> Option<Bookmark> {
    load_bookmark_in(Path::new(CACHE_DIR), document)
}

/// Persist the bookmark. Errors are logged and otherwise ignored.
pub fn save_bookmark(document: &Path, bookmark: Bookmark) {
    save_bookmark_in(Path::new(CACHE_DIR), document, bookmark)
}

pub fn hash_dir(document: &Path) -> PathBuf {
    hash_dir_in(Path::new(CACHE_DIR), document)
}

fn hash_dir_in(root: &Path, document: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(document.as_os_str().to_string_lossy().as_bytes());
    let hash = format!("{:x}", hasher.finalize());
    root.join(hash)
}

fn load_bookmark_in(root: &Path, document: &Path) -> Option<Bookmark> {
    let path = hash_dir_in(root, document).join("bookmark.toml");
    let data = fs::read_to_string(&path).ok()?;
    match toml::from_str(&data) {
        Ok(bookmark) => Some(bookmark),
        Err(err) => {
            warn!(path = %path.display(), "Ignoring unreadable bookmark: {err}");
            None
        }
    }
}

fn save_bookmark_in(root: &Path, document: &Path, bookmark: Bookmark) {
    let dir = hash_dir_in(root, document);
    if let Err(err) = fs::create_dir_all(&dir) {
        warn!(path = %dir.display(), "Failed to create bookmark directory: {err}");
        return;
    }
    let path = dir.join("bookmark.toml");
    let contents = match toml::to_string(&bookmark) {
        Ok(contents) => contents,
        Err(err) => {
            warn!("Failed to serialize bookmark: {err}");
            return;
        }
    };
    match fs::write(&path, contents) {
        Ok(()) => debug!(
            path = %path.display(),
            section = bookmark.section,
            token_offset = bookmark.token_offset,
            "Saved bookmark"
        ),
        Err(err) => warn!(path = %path.display(), "Failed to save bookmark: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "lanternleaf-pacer-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn bookmark_survives_save_and_load() {
        let root = scratch_dir("bookmark");
        let document = Path::new("books/novel/chapter1.xhtml");
        assert_eq!(load_bookmark_in(&root, document), None);

        let bookmark = Bookmark {
            section: 2,
            token_offset: 41,
        };
        save_bookmark_in(&root, document, bookmark);
        assert_eq!(load_bookmark_in(&root, document), Some(bookmark));
        assert_eq!(
            load_bookmark_in(&root, Path::new("books/other.xhtml")),
            None
        );
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn corrupt_bookmark_is_ignored() {
        let root = scratch_dir("corrupt");
        let document = Path::new("book.xhtml");
        let dir = hash_dir_in(&root, document);
        fs::create_dir_all(&dir).expect("create dir");
        fs::write(dir.join("bookmark.toml"), "section = \"two\"").expect("write");
        assert_eq!(load_bookmark_in(&root, document), None);
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_offset_defaults_to_section_start() {
        let bookmark: Bookmark = toml::from_str("section = 3").expect("parse");
        assert_eq!(bookmark.token_offset, 0);
        assert!(hash_dir(Path::new("a.xhtml")).starts_with(CACHE_DIR));
    }
}
