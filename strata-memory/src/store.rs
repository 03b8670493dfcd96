//! The backing store: a lock-guarded map of normalized paths to nodes.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::SystemTime;
use strata_core::{FileType, Result, VfsError};

/// One entry in the store.
#[derive(Debug, Clone)]
pub struct MemNode {
    pub node_type: FileType,
    pub data: Bytes,
    pub modified: SystemTime,
    pub attributes: HashMap<String, String>,
}

impl MemNode {
    fn folder() -> MemNode {
        MemNode {
            node_type: FileType::Folder,
            data: Bytes::new(),
            modified: SystemTime::now(),
            attributes: HashMap::new(),
        }
    }

    fn file(data: Bytes) -> MemNode {
        MemNode {
            node_type: FileType::File,
            data,
            modified: SystemTime::now(),
            attributes: HashMap::new(),
        }
    }
}

struct StoreInner {
    nodes: HashMap<String, MemNode>,
    /// Total content bytes across all files.
    size: usize,
}

/// An in-memory tree of folders and files, shared by every file object of
/// one filesystem. The root folder always exists.
pub struct MemStore {
    inner: RwLock<StoreInner>,
    max_size: usize,
}

impl MemStore {
    pub fn new(max_size: usize) -> MemStore {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), MemNode::folder());
        MemStore {
            inner: RwLock::new(StoreInner { nodes, size: 0 }),
            max_size,
        }
    }

    /// Total content bytes currently stored.
    pub fn size(&self) -> usize {
        self.inner.read().unwrap().size
    }

    pub fn file_type(&self, path: &str) -> Option<FileType> {
        self.inner
            .read()
            .unwrap()
            .nodes
            .get(path)
            .map(|n| n.node_type)
    }

    fn child_prefix(path: &str) -> String {
        if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        }
    }

    /// Base names of the direct children of a folder, sorted.
    pub fn children(&self, path: &str) -> Vec<String> {
        let inner = self.inner.read().unwrap();
        let prefix = Self::child_prefix(path);
        let mut names: Vec<String> = inner
            .nodes
            .keys()
            .filter(|k| {
                k.starts_with(&prefix)
                    && k.len() > prefix.len()
                    && !k[prefix.len()..].contains('/')
            })
            .map(|k| k[prefix.len()..].to_string())
            .collect();
        names.sort();
        names
    }

    /// Content snapshot of a file. Cheap: `Bytes` clones share the buffer.
    pub fn read(&self, path: &str) -> std::io::Result<Bytes> {
        let inner = self.inner.read().unwrap();
        match inner.nodes.get(path) {
            Some(node) if node.node_type == FileType::File => Ok(node.data.clone()),
            Some(_) => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a file",
            )),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such file",
            )),
        }
    }

    /// Replaces (or appends to) a file's content, enforcing the size limit.
    pub fn write(&self, path: &str, data: &[u8], append: bool) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let existing = match inner.nodes.get(path) {
            Some(node) if node.node_type == FileType::File => node.data.len(),
            Some(_) => {
                return Err(VfsError::Io {
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "not a file",
                    ),
                })
            }
            None => 0,
        };
        let replaced = if append { 0 } else { existing };
        let new_size = inner.size - replaced + data.len();
        if new_size > self.max_size {
            return Err(VfsError::StoreFull {
                current_size: inner.size,
                max_size: self.max_size,
            });
        }

        let node = inner
            .nodes
            .entry(path.to_string())
            .or_insert_with(|| MemNode::file(Bytes::new()));
        let mut buffer = if append {
            node.data.to_vec()
        } else {
            Vec::with_capacity(data.len())
        };
        buffer.extend_from_slice(data);
        node.data = Bytes::from(buffer);
        node.node_type = FileType::File;
        node.modified = SystemTime::now();
        inner.size = new_size;
        Ok(())
    }

    pub fn create_folder(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner
            .nodes
            .entry(path.to_string())
            .or_insert_with(MemNode::folder);
        Ok(())
    }

    /// Removes a node. A folder must be empty.
    pub fn delete(&self, path: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let prefix = Self::child_prefix(path);
        if inner.nodes.keys().any(|k| k.starts_with(&prefix) && k.len() > prefix.len()) {
            return Err(VfsError::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "folder is not empty",
                ),
            });
        }
        if let Some(node) = inner.nodes.remove(path) {
            inner.size -= node.data.len();
        }
        Ok(())
    }

    /// Moves a node and its entire subtree to a new path.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        if !inner.nodes.contains_key(from) {
            return Err(VfsError::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such file",
                ),
            });
        }
        let from_prefix = Self::child_prefix(from);
        let moved: Vec<String> = inner
            .nodes
            .keys()
            .filter(|k| k.as_str() == from || k.starts_with(&from_prefix))
            .cloned()
            .collect();
        for key in moved {
            let node = inner.nodes.remove(&key).unwrap();
            let new_key = format!("{}{}", to, &key[from.len()..]);
            inner.nodes.insert(new_key, node);
        }
        Ok(())
    }

    pub fn last_modified(&self, path: &str) -> Option<SystemTime> {
        self.inner.read().unwrap().nodes.get(path).map(|n| n.modified)
    }

    pub fn set_last_modified(&self, path: &str, time: SystemTime) -> bool {
        let mut inner = self.inner.write().unwrap();
        match inner.nodes.get_mut(path) {
            Some(node) => {
                node.modified = time;
                true
            }
            None => false,
        }
    }

    pub fn attribute(&self, path: &str, name: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap()
            .nodes
            .get(path)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    pub fn set_attribute(&self, path: &str, name: &str, value: String) -> bool {
        let mut inner = self.inner.write().unwrap();
        match inner.nodes.get_mut(path) {
            Some(node) => {
                node.attributes.insert(name.to_string(), value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_preexists() {
        let store = MemStore::new(usize::MAX);
        assert_eq!(store.file_type("/"), Some(FileType::Folder));
        assert!(store.children("/").is_empty());
    }

    #[test]
    fn test_write_read_append() {
        let store = MemStore::new(usize::MAX);
        store.write("/f", b"abc", false).unwrap();
        assert_eq!(store.read("/f").unwrap(), Bytes::from_static(b"abc"));
        store.write("/f", b"def", true).unwrap();
        assert_eq!(store.read("/f").unwrap(), Bytes::from_static(b"abcdef"));
        store.write("/f", b"x", false).unwrap();
        assert_eq!(store.read("/f").unwrap(), Bytes::from_static(b"x"));
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_size_limit() {
        let store = MemStore::new(4);
        store.write("/a", b"ab", false).unwrap();
        store.write("/b", b"cd", false).unwrap();
        assert!(matches!(
            store.write("/c", b"e", false),
            Err(VfsError::StoreFull { .. })
        ));
        // Replacing within the limit still works.
        store.write("/a", b"xy", false).unwrap();
        store.delete("/b").unwrap();
        assert_eq!(store.size(), 2);
        store.write("/c", b"e", false).unwrap();
    }

    #[test]
    fn test_delete_requires_empty_folder() {
        let store = MemStore::new(usize::MAX);
        store.create_folder("/d").unwrap();
        store.write("/d/f", b"x", false).unwrap();
        assert!(store.delete("/d").is_err());
        store.delete("/d/f").unwrap();
        store.delete("/d").unwrap();
        assert_eq!(store.file_type("/d"), None);
    }

    #[test]
    fn test_rename_moves_subtree() {
        let store = MemStore::new(usize::MAX);
        store.create_folder("/d").unwrap();
        store.write("/d/f", b"x", false).unwrap();
        store.rename("/d", "/e").unwrap();
        assert_eq!(store.file_type("/d"), None);
        assert_eq!(store.file_type("/d/f"), None);
        assert_eq!(store.file_type("/e"), Some(FileType::Folder));
        assert_eq!(store.read("/e/f").unwrap(), Bytes::from_static(b"x"));
    }

    #[test]
    fn test_attributes_and_times() {
        let store = MemStore::new(usize::MAX);
        store.write("/f", b"x", false).unwrap();
        assert!(store.last_modified("/f").is_some());
        let epoch = SystemTime::UNIX_EPOCH;
        assert!(store.set_last_modified("/f", epoch));
        assert_eq!(store.last_modified("/f"), Some(epoch));

        assert_eq!(store.attribute("/f", "owner"), None);
        assert!(store.set_attribute("/f", "owner", "tests".to_string()));
        assert_eq!(store.attribute("/f", "owner"), Some("tests".to_string()));
        assert!(!store.set_attribute("/missing", "a", "b".to_string()));
    }
}
