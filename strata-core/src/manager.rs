//! The filesystem manager: provider registry and resolution entry point.
//!
//! Built explicitly, passed around by handle; there is no process-wide
//! singleton. Applications that want one keep it at their entry point.

use crate::cache::FilesCache;
use crate::error::{Result, VfsError};
use crate::file::FileObject;
use crate::fs::FileSystem;
use crate::name::{self, parser, FileName, NameScope};
use crate::options::FileSystemOptions;
use crate::provider::delegate::VirtualFileSystemBackend;
use crate::provider::FileProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// How deep layered filesystems may nest before resolution refuses.
///
/// Guards against self-referential layering (an archive reachable through
/// itself); genuine nesting this deep does not occur in practice.
pub const MAX_LAYER_DEPTH: usize = 64;

struct ManagerInner {
    providers: HashMap<String, Arc<dyn FileProvider>>,
    cache: Arc<FilesCache>,
}

/// Resolves URIs to files by dispatching on their scheme.
///
/// Owns the file-object cache shared by every filesystem it creates. Cheap
/// to clone.
#[derive(Clone)]
pub struct FileSystemManager {
    inner: Arc<ManagerInner>,
}

impl FileSystemManager {
    pub fn builder() -> FileSystemManagerBuilder {
        FileSystemManagerBuilder {
            providers: HashMap::new(),
        }
    }

    /// The file-object cache shared by this manager's filesystems.
    pub fn cache(&self) -> &Arc<FilesCache> {
        &self.inner.cache
    }

    pub fn has_provider(&self, scheme: &str) -> bool {
        self.inner.providers.contains_key(scheme)
    }

    /// The registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.inner.providers.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Resolves an absolute URI with default options.
    pub fn resolve_file(&self, uri: &str) -> Result<FileObject> {
        self.resolve_file_with_options(uri, &FileSystemOptions::default())
    }

    /// Resolves an absolute URI, dispatching to the provider registered for
    /// its scheme. Layered providers recurse back through here for their
    /// outer URI, so the nesting guard lives at this entry point.
    pub fn resolve_file_with_options(
        &self,
        uri: &str,
        options: &FileSystemOptions,
    ) -> Result<FileObject> {
        if uri.matches('!').count() > MAX_LAYER_DEPTH {
            return Err(VfsError::LayerDepthExceeded {
                max_depth: MAX_LAYER_DEPTH,
            });
        }
        let scheme = parser::extract_scheme(uri).ok_or_else(|| VfsError::MalformedUri {
            uri: uri.to_string(),
            reason: "missing scheme".to_string(),
        })?;
        let provider =
            self.inner
                .providers
                .get(scheme)
                .ok_or_else(|| VfsError::UnknownScheme {
                    scheme: scheme.to_string(),
                })?;
        provider.find_file(self, uri, options)
    }

    /// Resolves a path against a base file. A path carrying a registered
    /// scheme is treated as absolute and may cross into another filesystem;
    /// anything else resolves within the base's filesystem.
    pub fn resolve_file_relative(&self, base: &FileObject, path: &str) -> Result<FileObject> {
        if let Some(scheme) = parser::extract_scheme(path) {
            if self.has_provider(scheme) {
                return self.resolve_file(path);
            }
        }
        base.resolve(path)
    }

    /// Resolves a name string against a base name, validated against a
    /// scope. Scheme-qualified strings parse as full URIs; crossing into a
    /// different root is only valid in the filesystem-wide scope.
    pub fn resolve_name(&self, base: &FileName, path: &str, scope: NameScope) -> Result<FileName> {
        if parser::extract_scheme(path).is_some() {
            let parsed = FileName::parse_uri(path)?;
            if parsed.root_uri() == base.root_uri() {
                return name::resolve_name(base, parsed.path(), scope);
            }
            if scope != NameScope::FileSystem {
                return Err(VfsError::InvalidScope {
                    base: base.path().to_string(),
                    name: path.to_string(),
                    scope,
                });
            }
            return Ok(parsed);
        }
        name::resolve_name(base, path, scope)
    }

    /// Creates (or reuses) a layered filesystem on top of an existing file,
    /// e.g. an archive, and returns its root. Equivalent to resolving
    /// `scheme:<uri-of-file>!/`.
    pub fn create_layered_file_system(&self, scheme: &str, file: &FileObject) -> Result<FileObject> {
        let uri = format!("{}:{}!/", scheme, file.name().uri());
        self.resolve_file(&uri)
    }

    /// Creates an empty virtual filesystem rooted at `root_uri`. Junctions
    /// added to it splice in subtrees of files resolved through this
    /// manager.
    pub fn create_virtual_file_system(&self, root_uri: &str) -> Result<FileSystem> {
        let root = FileName::parse_uri(root_uri)?.root();
        Ok(FileSystem::new(
            root,
            None,
            FileSystemOptions::default(),
            Box::new(VirtualFileSystemBackend::new()),
            self.inner.cache.clone(),
        ))
    }

    /// Closes every provider's filesystems and drops the whole cache.
    pub fn close_all(&self) {
        for provider in self.inner.providers.values() {
            provider.close_all();
        }
        self.inner.cache.clear_all();
        debug!("manager closed");
    }
}

/// Builder for [`FileSystemManager`].
pub struct FileSystemManagerBuilder {
    providers: HashMap<String, Arc<dyn FileProvider>>,
}

impl FileSystemManagerBuilder {
    /// Registers a provider for a scheme. The same provider may be
    /// registered under several schemes.
    pub fn provider(mut self, scheme: &str, provider: Arc<dyn FileProvider>) -> Self {
        self.providers.insert(scheme.to_string(), provider);
        self
    }

    pub fn build(self) -> FileSystemManager {
        FileSystemManager {
            inner: Arc::new(ManagerInner {
                providers: self.providers,
                cache: Arc::new(FilesCache::new()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::test_support::MapBackend;
    use crate::provider::{FileSystemKey, ProviderFileSystems};
    use crate::types::FileType;

    struct MapProvider {
        filesystems: ProviderFileSystems,
    }

    impl MapProvider {
        fn new() -> MapProvider {
            MapProvider {
                filesystems: ProviderFileSystems::new(),
            }
        }
    }

    impl FileProvider for MapProvider {
        fn find_file(
            &self,
            manager: &FileSystemManager,
            uri: &str,
            options: &FileSystemOptions,
        ) -> Result<FileObject> {
            let name = FileName::parse_uri(uri)?;
            let key = FileSystemKey::new(name.root_uri(), options);
            let fs = self.filesystems.get_or_create(key, || {
                Ok(FileSystem::new(
                    name.root(),
                    None,
                    options.clone(),
                    Box::new(MapBackend::with_root()),
                    manager.cache().clone(),
                ))
            })?;
            fs.resolve_file(&name)
        }

        fn close_all(&self) {
            self.filesystems.close_all();
        }
    }

    fn manager() -> FileSystemManager {
        FileSystemManager::builder()
            .provider("test", Arc::new(MapProvider::new()))
            .build()
    }

    #[test]
    fn test_resolve_by_scheme() {
        let manager = manager();
        let file = manager.resolve_file("test:///a/b").unwrap();
        assert_eq!(file.name().path(), "/a/b");
        assert!(matches!(
            manager.resolve_file("gopher:///x"),
            Err(VfsError::UnknownScheme { .. })
        ));
        assert!(matches!(
            manager.resolve_file("no-scheme-here"),
            Err(VfsError::MalformedUri { .. })
        ));
    }

    #[test]
    fn test_filesystem_reuse_keyed_by_options() {
        use crate::options::OptionValue;

        let manager = manager();
        let a = manager.resolve_file("test:///a").unwrap();
        let b = manager.resolve_file("test:///b").unwrap();
        assert!(a.fs().same_instance(b.fs()));

        let mut options = FileSystemOptions::new();
        options.set("test", "flavor", OptionValue::Str("other".to_string()));
        let c = manager
            .resolve_file_with_options("test:///a", &options)
            .unwrap();
        assert!(!a.fs().same_instance(c.fs()));
        assert!(!a.same_instance(&c));
    }

    #[test]
    fn test_layer_depth_guard() {
        let manager = manager();
        let deep = format!("test:{}///x", "a!".repeat(MAX_LAYER_DEPTH + 1));
        assert!(matches!(
            manager.resolve_file(&deep),
            Err(VfsError::LayerDepthExceeded { .. })
        ));
    }

    #[test]
    fn test_resolve_name_scheme_crossing() {
        let manager = manager();
        let base = FileName::parse_uri("test:///a").unwrap();

        let same = manager
            .resolve_name(&base, "test:///a/b", NameScope::Child)
            .unwrap();
        assert_eq!(same.path(), "/a/b");

        let crossed = manager
            .resolve_name(&base, "other:///x", NameScope::FileSystem)
            .unwrap();
        assert_eq!(crossed.scheme(), "other");
        assert!(matches!(
            manager.resolve_name(&base, "other:///x", NameScope::Descendant),
            Err(VfsError::InvalidScope { .. })
        ));

        let relative = manager
            .resolve_name(&base, "b/c", NameScope::Descendant)
            .unwrap();
        assert_eq!(relative.path(), "/a/b/c");
    }

    #[test]
    fn test_resolve_file_relative() {
        let manager = manager();
        let base = manager.resolve_file("test:///dir/x").unwrap();
        let sibling = manager.resolve_file_relative(&base, "../y").unwrap();
        assert_eq!(sibling.name().path(), "/y");
        assert!(sibling.fs().same_instance(base.fs()));
    }

    #[test]
    fn test_layered_resolution() {
        use crate::fs::FileSystemBackend;
        use crate::provider::layered::{LayerBackendFactory, LayeredProvider};

        struct MapLayerFactory;
        impl LayerBackendFactory for MapLayerFactory {
            fn create_backend(
                &self,
                _outer: &FileObject,
                _options: &FileSystemOptions,
            ) -> Result<Box<dyn FileSystemBackend>> {
                Ok(Box::new(MapBackend::with_root()))
            }
        }

        let manager = FileSystemManager::builder()
            .provider("test", Arc::new(MapProvider::new()))
            .provider("layer", Arc::new(LayeredProvider::new(MapLayerFactory)))
            .build();

        let archive = manager.resolve_file("test:///dir/a.zip").unwrap();
        archive.create_file().unwrap();

        let root = manager.create_layered_file_system("layer", &archive).unwrap();
        assert_eq!(root.name().path(), "/");
        assert!(root.name().layer().is_some());
        assert_eq!(root.name().scheme(), "layer");

        // The parent of a layered root is the folder holding the outer file.
        let parent = root.parent().unwrap().unwrap();
        assert_eq!(parent.name().uri(), "test:///dir");

        // Direct URI resolution lands in the same filesystem instance.
        let inner = manager
            .resolve_file("layer:test:///dir/a.zip!/doc.txt")
            .unwrap();
        assert!(inner.fs().same_instance(root.fs()));
        inner.content().write_bytes(b"inside").unwrap();
        assert_eq!(inner.content().bytes().unwrap(), b"inside");

        // Resolving again reuses the filesystem and the object.
        let again = manager
            .resolve_file("layer:test:///dir/a.zip!/doc.txt")
            .unwrap();
        assert!(inner.same_instance(&again));
    }

    #[test]
    fn test_virtual_filesystem_junction() {
        let manager = manager();

        // Populate a real folder to splice in.
        let data = manager.resolve_file("test:///data").unwrap();
        data.create_folder().unwrap();
        let real = manager.resolve_file("test:///data/f.txt").unwrap();
        real.content().write_bytes(b"spliced").unwrap();

        let vfs = manager.create_virtual_file_system("vfs://").unwrap();
        let root = vfs.root().unwrap();
        assert_eq!(root.file_type().unwrap(), FileType::Folder);
        assert!(root.children().unwrap().is_empty());

        vfs.add_junction("/mnt", &data).unwrap();

        let through = vfs.resolve("/mnt/f.txt").unwrap();
        assert_eq!(through.file_type().unwrap(), FileType::File);
        assert_eq!(through.content().bytes().unwrap(), b"spliced");

        let mount = vfs.resolve("/mnt").unwrap();
        assert_eq!(mount.file_type().unwrap(), FileType::Folder);
        let names: Vec<String> = mount
            .children()
            .unwrap()
            .iter()
            .map(|c| c.name().base_name().to_string())
            .collect();
        assert_eq!(names, vec!["f.txt".to_string()]);

        // The synthetic root now shows the mount point.
        let root = vfs.resolve("/").unwrap();
        let names: Vec<String> = root
            .children()
            .unwrap()
            .iter()
            .map(|c| c.name().base_name().to_string())
            .collect();
        assert_eq!(names, vec!["mnt".to_string()]);

        // Writing through the junction lands in the backing filesystem.
        let created = vfs.resolve("/mnt/new.txt").unwrap();
        created.content().write_bytes(b"w").unwrap();
        assert!(manager
            .resolve_file("test:///data/new.txt")
            .unwrap()
            .exists()
            .unwrap());

        assert!(vfs.remove_junction("/mnt").unwrap());
        let gone = vfs.resolve("/mnt/f.txt").unwrap();
        assert!(!gone.exists().unwrap());
    }

    #[test]
    fn test_mirrored_events_through_junction() {
        use crate::events::FileListener;
        use std::sync::Mutex;

        #[derive(Default)]
        struct Recorder {
            log: Mutex<Vec<String>>,
        }
        impl FileListener for Recorder {
            fn file_created(&self, file: &FileObject) {
                self.log
                    .lock()
                    .unwrap()
                    .push(format!("created {}", file.name().path()));
            }
            fn file_changed(&self, file: &FileObject) {
                self.log
                    .lock()
                    .unwrap()
                    .push(format!("changed {}", file.name().path()));
            }
        }

        let manager = manager();
        let data = manager.resolve_file("test:///data").unwrap();
        data.create_folder().unwrap();

        let vfs = manager.create_virtual_file_system("vfs://").unwrap();
        vfs.add_junction("/mnt", &data).unwrap();

        let through = vfs.resolve("/mnt/f.txt").unwrap();
        assert!(!through.exists().unwrap()); // attach, registering the mirror

        let recorder = Arc::new(Recorder::default());
        vfs.add_listener(through.name(), recorder.clone());

        // Mutate the backing file directly; the event surfaces virtually.
        let real = manager.resolve_file("test:///data/f.txt").unwrap();
        real.content().write_bytes(b"x").unwrap();

        let log = recorder.log.lock().unwrap().clone();
        assert_eq!(log, vec!["created /mnt/f.txt".to_string()]);
        assert!(through.exists().unwrap());
    }

    #[test]
    fn test_close_all_drops_cache() {
        let manager = manager();
        let a = manager.resolve_file("test:///a").unwrap();
        a.create_file().unwrap();
        manager.close_all();
        let b = manager.resolve_file("test:///a").unwrap();
        assert!(!a.same_instance(&b));
    }
}
