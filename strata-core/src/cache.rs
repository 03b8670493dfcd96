//! Cache of live file objects, keyed by filesystem and name.
//!
//! Every filesystem resolves through a shared [`FilesCache`], so repeated
//! resolution of the same name yields the same file object for as long as it
//! stays cached. The cache holds strong handles; dropping a filesystem's
//! slice (see [`FilesCache::clear`]) is what lets its objects go.

use crate::file::FileObject;
use crate::name::FileName;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one filesystem instance for cache partitioning.
///
/// Ids are process-unique and never reused, so a closed filesystem's stale
/// keys can never collide with a newly created one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileSystemId(u64);

impl FileSystemId {
    /// Allocates the next id.
    pub fn next() -> FileSystemId {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        FileSystemId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Concurrent map from (filesystem, name) to the live file object.
///
/// Generic over the value so the policy is testable in isolation; in the
/// crate it is always instantiated with [`FileObject`].
#[derive(Debug)]
pub struct FilesCache<V = FileObject> {
    entries: DashMap<(FileSystemId, FileName), V>,
}

impl<V: Clone> FilesCache<V> {
    pub fn new() -> Self {
        FilesCache {
            entries: DashMap::new(),
        }
    }

    /// Looks up the cached object for a name.
    pub fn get(&self, fs: FileSystemId, name: &FileName) -> Option<V> {
        self.entries
            .get(&(fs, name.clone()))
            .map(|entry| entry.value().clone())
    }

    /// Inserts an object, replacing any previous entry for the name.
    pub fn put(&self, fs: FileSystemId, name: &FileName, value: V) {
        self.entries.insert((fs, name.clone()), value);
    }

    /// Inserts an object unless the name is already cached, and returns the
    /// entry that ended up in the cache.
    ///
    /// This is the resolution path: two threads racing to resolve the same
    /// name both come away with the same object.
    pub fn put_if_absent(&self, fs: FileSystemId, name: &FileName, value: V) -> V {
        self.entries
            .entry((fs, name.clone()))
            .or_insert(value)
            .value()
            .clone()
    }

    /// Drops the entry for a name, if present.
    pub fn remove(&self, fs: FileSystemId, name: &FileName) -> Option<V> {
        self.entries.remove(&(fs, name.clone())).map(|(_, v)| v)
    }

    /// Drops every entry belonging to one filesystem.
    pub fn clear(&self, fs: FileSystemId) {
        self.entries.retain(|(owner, _), _| *owner != fs);
    }

    /// Drops everything. Used when the manager shuts down.
    pub fn clear_all(&self) {
        self.entries.clear();
    }

    /// Number of entries cached for one filesystem.
    pub fn size(&self, fs: FileSystemId) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.key().0 == fs)
            .count()
    }
}

impl<V: Clone> Default for FilesCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> FileName {
        FileName::parse_uri(uri).unwrap()
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(FileSystemId::next(), FileSystemId::next());
    }

    #[test]
    fn test_put_get_remove() {
        let cache: FilesCache<u32> = FilesCache::new();
        let fs = FileSystemId::next();
        let n = name("mem:///a");

        assert_eq!(cache.get(fs, &n), None);
        cache.put(fs, &n, 7);
        assert_eq!(cache.get(fs, &n), Some(7));
        assert_eq!(cache.remove(fs, &n), Some(7));
        assert_eq!(cache.get(fs, &n), None);
    }

    #[test]
    fn test_put_if_absent_keeps_first() {
        let cache: FilesCache<u32> = FilesCache::new();
        let fs = FileSystemId::next();
        let n = name("mem:///a");

        assert_eq!(cache.put_if_absent(fs, &n, 1), 1);
        assert_eq!(cache.put_if_absent(fs, &n, 2), 1);
        assert_eq!(cache.get(fs, &n), Some(1));
    }

    #[test]
    fn test_clear_is_per_filesystem() {
        let cache: FilesCache<u32> = FilesCache::new();
        let fs1 = FileSystemId::next();
        let fs2 = FileSystemId::next();
        let n = name("mem:///a");

        cache.put(fs1, &n, 1);
        cache.put(fs2, &n, 2);
        assert_eq!(cache.size(fs1), 1);

        cache.clear(fs1);
        assert_eq!(cache.get(fs1, &n), None);
        assert_eq!(cache.get(fs2, &n), Some(2));

        cache.clear_all();
        assert_eq!(cache.size(fs2), 0);
    }

    #[test]
    fn test_same_name_different_filesystems() {
        let cache: FilesCache<&'static str> = FilesCache::new();
        let fs1 = FileSystemId::next();
        let fs2 = FileSystemId::next();
        let n = name("mem:///shared");

        cache.put(fs1, &n, "one");
        cache.put(fs2, &n, "two");
        assert_eq!(cache.get(fs1, &n), Some("one"));
        assert_eq!(cache.get(fs2, &n), Some("two"));
    }
}
