// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
    Link(PathBuf),
}

/// In-memory filesystem for tests.
///
/// Clones share state, so a test can keep a handle and inspect what the code
/// under test wrote. Paths registered with [`MockFileSystem::deny`] make every
/// mutating call on them fail, which is how tests provoke recording errors.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    denied: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut entries = self.entries.lock().unwrap();
        let path = path.as_ref();
        Self::ensure_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::File(content.into()));
    }

    /// Fail every write/remove/link/mkdir targeting exactly `path`.
    pub fn deny(&self, path: impl AsRef<Path>) {
        self.denied.lock().unwrap().insert(path.as_ref().to_path_buf());
    }

    pub fn entry(&self, path: impl AsRef<Path>) -> Option<MockEntry> {
        self.entries.lock().unwrap().get(path.as_ref()).cloned()
    }

    fn ensure_parents(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let mut cur = path.parent();
        while let Some(dir) = cur {
            if dir.as_os_str().is_empty() {
                break;
            }
            entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
            cur = dir.parent();
        }
    }

    fn check_allowed(&self, path: &Path) -> Result<()> {
        if self.denied.lock().unwrap().contains(path) {
            return Err(anyhow!("permission denied: {:?}", path));
        }
        Ok(())
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::File(content)) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(_) => Err(anyhow!("Not a regular file: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.check_allowed(path)?;
        self.add_file(path, contents);
        Ok(())
    }

    fn append(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.check_allowed(path)?;
        let mut entries = self.entries.lock().unwrap();
        Self::ensure_parents(&mut entries, path);
        match entries
            .entry(path.to_path_buf())
            .or_insert_with(|| MockEntry::File(Vec::new()))
        {
            MockEntry::File(buf) => {
                buf.extend_from_slice(contents);
                Ok(())
            }
            _ => Err(anyhow!("Not a regular file: {:?}", path)),
        }
    }

    fn create_new(&self, path: &Path) -> Result<bool> {
        self.check_allowed(path)?;
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(path) {
            return Ok(false);
        }
        Self::ensure_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::File(Vec::new()));
        Ok(true)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.check_allowed(path)?;
        let mut entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            Some(_) => {
                entries.remove(path);
                Ok(())
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.check_allowed(path)?;
        let mut entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Dir) => Ok(()),
            Some(_) => Err(anyhow!("Not a directory: {:?}", path)),
            None => {
                Self::ensure_parents(&mut entries, path);
                entries.insert(path.to_path_buf(), MockEntry::Dir);
                Ok(())
            }
        }
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        self.check_allowed(link)?;
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(link) {
            return Err(anyhow!("File exists: {:?}", link));
        }
        Self::ensure_parents(&mut entries, link);
        entries.insert(link.to_path_buf(), MockEntry::Link(target.to_path_buf()));
        Ok(())
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        let entries = self.entries.lock().unwrap();
        match entries.get(path) {
            Some(MockEntry::Link(target)) => Ok(target.clone()),
            Some(_) => Err(anyhow!("Not a symbolic link: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries.lock().unwrap().contains_key(path)
    }
}
