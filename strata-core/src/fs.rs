//! The filesystem object: cache-backed resolution, capabilities, listeners
//! and junctions.

use crate::cache::{FileSystemId, FilesCache};
use crate::error::{Result, VfsError};
use crate::events::FileListener;
use crate::file::{FileHooks, FileObject};
use crate::name::{FileName, NameScope};
use crate::options::FileSystemOptions;
use crate::types::{Capability, CapabilitySet};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Provider strategy backing one filesystem instance.
pub trait FileSystemBackend: Send + Sync {
    /// Declares the capabilities of this filesystem. Called once at
    /// construction.
    fn capabilities(&self, caps: &mut CapabilitySet);

    /// Builds the hooks for one file name. Called on cache miss.
    fn create_hooks(&self, name: &FileName) -> Result<Box<dyn FileHooks>>;

    /// Splices an external file's subtree at a path in this filesystem.
    fn add_junction(&self, junction: &FileName, target: &FileObject) -> Result<()> {
        let _ = (junction, target);
        Err(VfsError::NotSupported {
            operation: "add-junction",
        })
    }

    /// Removes a junction. Returns whether one was present.
    fn remove_junction(&self, junction: &FileName) -> Result<bool> {
        let _ = junction;
        Err(VfsError::NotSupported {
            operation: "remove-junction",
        })
    }

    /// Releases provider resources on filesystem close.
    fn close(&self) {}
}

struct FsInner {
    id: FileSystemId,
    root_name: FileName,
    parent_layer: Option<FileObject>,
    options: FileSystemOptions,
    capabilities: CapabilitySet,
    backend: Box<dyn FileSystemBackend>,
    cache: Arc<FilesCache>,
    listeners: Mutex<HashMap<FileName, Vec<Arc<dyn FileListener>>>>,
}

/// One filesystem: a root name, a capability set and a backend, sharing the
/// manager-owned file object cache. Cheap to clone.
#[derive(Clone)]
pub struct FileSystem {
    inner: Arc<FsInner>,
}

impl FileSystem {
    /// Creates a filesystem over a backend. The capability set is computed
    /// here, once; it never changes afterwards.
    pub fn new(
        root_name: FileName,
        parent_layer: Option<FileObject>,
        options: FileSystemOptions,
        backend: Box<dyn FileSystemBackend>,
        cache: Arc<FilesCache>,
    ) -> FileSystem {
        let mut capabilities = CapabilitySet::new();
        backend.capabilities(&mut capabilities);
        FileSystem {
            inner: Arc::new(FsInner {
                id: FileSystemId::next(),
                root_name,
                parent_layer,
                options,
                capabilities,
                backend,
                cache,
                listeners: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub(crate) fn id(&self) -> FileSystemId {
        self.inner.id
    }

    /// The name of the root of this filesystem.
    pub fn root_name(&self) -> &FileName {
        &self.inner.root_name
    }

    /// The root URI of this filesystem.
    pub fn root_uri(&self) -> &str {
        self.inner.root_name.root_uri()
    }

    /// The root file of this filesystem.
    pub fn root(&self) -> Result<FileObject> {
        self.resolve_file(&self.inner.root_name)
    }

    /// The file this filesystem is layered over, if any.
    pub fn parent_layer(&self) -> Option<&FileObject> {
        self.inner.parent_layer.as_ref()
    }

    /// The options this filesystem was created with.
    pub fn options(&self) -> &FileSystemOptions {
        &self.inner.options
    }

    /// The capability set of this filesystem.
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.inner.capabilities
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.inner.capabilities.contains(cap)
    }

    /// True if both handles refer to the same filesystem instance.
    pub fn same_instance(&self, other: &FileSystem) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resolves a name to its file object, creating and caching it on the
    /// first resolution. Concurrent callers for the same name all receive
    /// the single surviving instance.
    pub fn resolve_file(&self, name: &FileName) -> Result<FileObject> {
        if name.root_uri() != self.root_uri() {
            return Err(VfsError::MismatchedFileSystem {
                name: name.clone(),
                root_uri: self.root_uri().to_string(),
            });
        }
        if let Some(file) = self.inner.cache.get(self.inner.id, name) {
            return Ok(file);
        }
        let hooks = self.inner.backend.create_hooks(name)?;
        let file = FileObject::new(name.clone(), self.clone(), hooks);
        Ok(self.inner.cache.put_if_absent(self.inner.id, name, file))
    }

    /// Resolves a path string against the root of this filesystem.
    pub fn resolve(&self, path: &str) -> Result<FileObject> {
        let name = crate::name::resolve_name(&self.inner.root_name, path, NameScope::FileSystem)?;
        self.resolve_file(&name)
    }

    /// Cache-only lookup; never constructs an object.
    pub(crate) fn peek(&self, name: &FileName) -> Option<FileObject> {
        self.inner.cache.get(self.inner.id, name)
    }

    /// Registers a listener for events on an exact name.
    pub fn add_listener(&self, name: &FileName, listener: Arc<dyn FileListener>) {
        let mut listeners = self.inner.listeners.lock().unwrap();
        listeners.entry(name.clone()).or_default().push(listener);
    }

    /// Unregisters a previously added listener.
    pub fn remove_listener(&self, name: &FileName, listener: &Arc<dyn FileListener>) {
        let mut listeners = self.inner.listeners.lock().unwrap();
        if let Some(list) = listeners.get_mut(name) {
            list.retain(|l| !Arc::ptr_eq(l, listener));
            if list.is_empty() {
                listeners.remove(name);
            }
        }
    }

    fn snapshot_listeners(&self, name: &FileName) -> Vec<Arc<dyn FileListener>> {
        self.inner
            .listeners
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn fire_created(&self, file: &FileObject) {
        for listener in self.snapshot_listeners(file.name()) {
            listener.file_created(file);
        }
    }

    pub(crate) fn fire_deleted(&self, file: &FileObject) {
        for listener in self.snapshot_listeners(file.name()) {
            listener.file_deleted(file);
        }
    }

    pub(crate) fn fire_changed(&self, file: &FileObject) {
        for listener in self.snapshot_listeners(file.name()) {
            listener.file_changed(file);
        }
    }

    /// Splices `target`'s subtree at a path within this filesystem.
    ///
    /// The cache slice is cleared afterwards so already-resolved objects
    /// cannot serve stale pre-junction state.
    pub fn add_junction(&self, path: &str, target: &FileObject) -> Result<()> {
        let name = crate::name::resolve_name(&self.inner.root_name, path, NameScope::FileSystem)?;
        self.inner.backend.add_junction(&name, target)?;
        self.inner.cache.clear(self.inner.id);
        debug!(junction = %name, target = %target.name(), "junction added");
        Ok(())
    }

    /// Removes a junction.
    pub fn remove_junction(&self, path: &str) -> Result<bool> {
        let name = crate::name::resolve_name(&self.inner.root_name, path, NameScope::FileSystem)?;
        let removed = self.inner.backend.remove_junction(&name)?;
        if removed {
            self.inner.cache.clear(self.inner.id);
            debug!(junction = %name, "junction removed");
        }
        Ok(removed)
    }

    /// Closes this filesystem: releases backend resources and evicts every
    /// cached file object belonging to it.
    pub fn close(&self) {
        self.inner.backend.close();
        self.inner.cache.clear(self.inner.id);
        debug!(root = %self.inner.root_name, "filesystem closed");
    }
}

impl std::fmt::Debug for FileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSystem")
            .field("root", &self.inner.root_name.friendly_uri())
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A tiny map-backed filesystem used by the core's own lifecycle tests.

    use super::*;
    use crate::types::FileType;
    use std::io::{Cursor, Read, Write};

    #[derive(Debug, Clone)]
    pub enum Node {
        Folder,
        File(Vec<u8>),
    }

    pub type Store = Arc<Mutex<HashMap<String, Node>>>;

    pub struct MapBackend {
        pub store: Store,
    }

    impl MapBackend {
        pub fn with_root() -> MapBackend {
            let mut nodes = HashMap::new();
            nodes.insert("/".to_string(), Node::Folder);
            MapBackend {
                store: Arc::new(Mutex::new(nodes)),
            }
        }
    }

    impl FileSystemBackend for MapBackend {
        fn capabilities(&self, caps: &mut CapabilitySet) {
            caps.add_all(&[
                Capability::ReadContent,
                Capability::WriteContent,
                Capability::ListChildren,
                Capability::CreateFolder,
                Capability::Delete,
            ]);
        }

        fn create_hooks(&self, name: &FileName) -> Result<Box<dyn FileHooks>> {
            Ok(Box::new(MapHooks {
                store: self.store.clone(),
                path: name.path().to_string(),
            }))
        }
    }

    struct MapHooks {
        store: Store,
        path: String,
    }

    impl FileHooks for MapHooks {
        fn file_type(&self) -> Result<Option<FileType>> {
            Ok(self.store.lock().unwrap().get(&self.path).map(|n| match n {
                Node::Folder => FileType::Folder,
                Node::File(_) => FileType::File,
            }))
        }

        fn list_children(&self) -> Result<Vec<String>> {
            let store = self.store.lock().unwrap();
            let prefix = if self.path == "/" {
                "/".to_string()
            } else {
                format!("{}/", self.path)
            };
            let mut names: Vec<String> = store
                .keys()
                .filter(|k| {
                    k.starts_with(&prefix)
                        && k.len() > prefix.len()
                        && !k[prefix.len()..].contains('/')
                })
                .map(|k| k[prefix.len()..].to_string())
                .collect();
            names.sort();
            Ok(names)
        }

        fn open_input(&self) -> Result<Box<dyn Read + Send>> {
            let store = self.store.lock().unwrap();
            match store.get(&self.path) {
                Some(Node::File(data)) => Ok(Box::new(Cursor::new(data.clone()))),
                _ => Err(VfsError::Io {
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "no content"),
                }),
            }
        }

        fn open_output(&self, _append: bool) -> Result<Box<dyn Write + Send>> {
            Ok(Box::new(MapWriter {
                store: self.store.clone(),
                path: self.path.clone(),
                buffer: Vec::new(),
            }))
        }

        fn delete(&self) -> Result<()> {
            self.store.lock().unwrap().remove(&self.path);
            Ok(())
        }

        fn create_folder(&self) -> Result<()> {
            self.store
                .lock()
                .unwrap()
                .insert(self.path.clone(), Node::Folder);
            Ok(())
        }
    }

    struct MapWriter {
        store: Store,
        path: String,
        buffer: Vec<u8>,
    }

    impl Write for MapWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.buffer.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.store
                .lock()
                .unwrap()
                .insert(self.path.clone(), Node::File(self.buffer.clone()));
            Ok(())
        }
    }

    pub fn new_fs() -> FileSystem {
        let root = FileName::root_of("test");
        FileSystem::new(
            root,
            None,
            FileSystemOptions::default(),
            Box::new(MapBackend::with_root()),
            Arc::new(FilesCache::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::new_fs;
    use super::*;
    use crate::types::FileType;

    #[test]
    fn test_resolve_returns_cached_instance() {
        let fs = new_fs();
        let a = fs.resolve("/a/b").unwrap();
        let b = fs.resolve("/a/b").unwrap();
        assert!(a.same_instance(&b));
        let c = fs.resolve("/a/c").unwrap();
        assert!(!a.same_instance(&c));
    }

    #[test]
    fn test_resolve_rejects_foreign_name() {
        let fs = new_fs();
        let foreign = FileName::parse_uri("mem:///a").unwrap();
        assert!(matches!(
            fs.resolve_file(&foreign),
            Err(VfsError::MismatchedFileSystem { .. })
        ));
    }

    #[test]
    fn test_close_evicts_cached_objects() {
        let fs = new_fs();
        let a = fs.resolve("/a").unwrap();
        fs.close();
        let b = fs.resolve("/a").unwrap();
        assert!(!a.same_instance(&b));
    }

    #[test]
    fn test_lifecycle_create_write_read_delete() {
        let fs = new_fs();
        let file = fs.resolve("/dir/f.txt").unwrap();
        assert_eq!(file.file_type().unwrap(), FileType::Imaginary);
        assert!(!file.exists().unwrap());

        file.content().write_bytes(b"hello").unwrap();
        assert_eq!(file.file_type().unwrap(), FileType::File);
        assert_eq!(file.content().bytes().unwrap(), b"hello");

        // The parent folder was created on the way.
        let dir = fs.resolve("/dir").unwrap();
        assert_eq!(dir.file_type().unwrap(), FileType::Folder);
        let children = dir.children().unwrap();
        assert_eq!(children.len(), 1);
        assert!(children[0].same_instance(&file));

        assert!(file.delete().unwrap());
        assert!(!file.exists().unwrap());
        assert!(dir.children().unwrap().is_empty());
    }

    #[test]
    fn test_children_on_file_is_not_folder() {
        let fs = new_fs();
        let file = fs.resolve("/f").unwrap();
        file.create_file().unwrap();
        assert!(matches!(
            file.children(),
            Err(VfsError::NotFolder { .. })
        ));
    }

    #[test]
    fn test_single_stream_gate() {
        let fs = new_fs();
        let file = fs.resolve("/f").unwrap();
        file.create_file().unwrap();

        let first = file.content().output_stream(false).unwrap();
        assert!(file.is_content_open());
        assert!(matches!(
            file.content().output_stream(false),
            Err(VfsError::StreamInUse { .. })
        ));
        assert!(matches!(
            file.content().input_stream(),
            Err(VfsError::StreamInUse { .. })
        ));

        first.close().unwrap();
        assert!(!file.is_content_open());
        file.content().output_stream(false).unwrap().close().unwrap();
    }

    #[test]
    fn test_refresh_reattaches() {
        let fs = new_fs();
        let file = fs.resolve("/f").unwrap();
        assert!(!file.exists().unwrap());
        assert!(file.is_attached());

        // Mutate behind the object's back, then refresh.
        file.content().write_bytes(b"x").unwrap();
        file.refresh();
        assert!(!file.is_attached());
        assert_eq!(file.file_type().unwrap(), FileType::File);
    }

    #[test]
    fn test_listener_registration() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Default)]
        struct Counter {
            created: AtomicUsize,
            deleted: AtomicUsize,
        }
        impl FileListener for Counter {
            fn file_created(&self, _file: &FileObject) {
                self.created.fetch_add(1, Ordering::SeqCst);
            }
            fn file_deleted(&self, _file: &FileObject) {
                self.deleted.fetch_add(1, Ordering::SeqCst);
            }
        }

        let fs = new_fs();
        let file = fs.resolve("/watched").unwrap();
        let counter = Arc::new(Counter::default());
        let listener: Arc<dyn FileListener> = counter.clone();
        fs.add_listener(file.name(), listener.clone());

        file.create_file().unwrap();
        assert_eq!(counter.created.load(std::sync::atomic::Ordering::SeqCst), 1);
        file.delete().unwrap();
        assert_eq!(counter.deleted.load(std::sync::atomic::Ordering::SeqCst), 1);

        fs.remove_listener(file.name(), &listener);
        file.create_file().unwrap();
        assert_eq!(counter.created.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_junctions_unsupported_by_default() {
        let fs = new_fs();
        let target = fs.resolve("/t").unwrap();
        assert!(matches!(
            fs.add_junction("/mnt", &target),
            Err(VfsError::NotSupported { .. })
        ));
    }
}
