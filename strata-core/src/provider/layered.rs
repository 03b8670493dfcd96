//! Layered providers: filesystems whose root is the content of a file in
//! another filesystem (`scheme:outer-uri!/inner/path`).

use crate::error::{Result, VfsError};
use crate::file::FileObject;
use crate::fs::{FileSystem, FileSystemBackend};
use crate::manager::FileSystemManager;
use crate::name::{self, parser, FileName, NameScope};
use crate::options::FileSystemOptions;
use crate::provider::{FileProvider, FileSystemKey, ProviderFileSystems};

/// Creates the backend for one layered filesystem, given the outer file its
/// root is derived from. Archive formats implement this; the surrounding
/// dispatch (URI splitting, outer resolution, filesystem reuse) is common to
/// all of them and lives in [`LayeredProvider`].
pub trait LayerBackendFactory: Send + Sync {
    fn create_backend(
        &self,
        outer: &FileObject,
        options: &FileSystemOptions,
    ) -> Result<Box<dyn FileSystemBackend>>;
}

/// Generic layered provider.
///
/// Splits the URI at the last `!` into an outer URI and an inner path,
/// resolves the outer URI back through the manager (which may recurse into
/// another layered provider), then creates or reuses a filesystem keyed by
/// the outer file's name. Nesting depth is bounded by the manager.
pub struct LayeredProvider<F> {
    factory: F,
    filesystems: ProviderFileSystems,
}

impl<F: LayerBackendFactory> LayeredProvider<F> {
    pub fn new(factory: F) -> LayeredProvider<F> {
        LayeredProvider {
            factory,
            filesystems: ProviderFileSystems::new(),
        }
    }
}

impl<F: LayerBackendFactory> FileProvider for LayeredProvider<F> {
    fn find_file(
        &self,
        manager: &FileSystemManager,
        uri: &str,
        options: &FileSystemOptions,
    ) -> Result<FileObject> {
        let (scheme, rest) = parser::split_scheme(uri).ok_or_else(|| VfsError::MalformedUri {
            uri: uri.to_string(),
            reason: "missing scheme".to_string(),
        })?;
        let (outer_uri, inner_path) =
            rest.rsplit_once('!').ok_or_else(|| VfsError::MalformedUri {
                uri: uri.to_string(),
                reason: "missing '!' layer delimiter".to_string(),
            })?;

        let outer = manager.resolve_file_with_options(outer_uri, options)?;
        let root_name = FileName::layered(scheme, outer.name(), "/")?;
        let key = FileSystemKey::new(root_name.root_uri(), options);
        let fs = self.filesystems.get_or_create(key, || {
            let backend = self.factory.create_backend(&outer, options)?;
            Ok(FileSystem::new(
                root_name.clone(),
                Some(outer.clone()),
                options.clone(),
                backend,
                manager.cache().clone(),
            ))
        })?;

        let inner = if inner_path.is_empty() { "/" } else { inner_path };
        let name = name::resolve_name(fs.root_name(), inner, NameScope::FileSystem)?;
        fs.resolve_file(&name)
    }

    fn close_all(&self) {
        self.filesystems.close_all();
    }
}
