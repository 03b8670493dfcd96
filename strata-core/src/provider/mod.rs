//! Provider dispatch: scheme-to-backend mapping and filesystem reuse.

pub mod delegate;
pub mod layered;

use crate::error::Result;
use crate::file::FileObject;
use crate::fs::FileSystem;
use crate::manager::FileSystemManager;
use crate::options::FileSystemOptions;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// A backend handling one or more URI schemes.
///
/// Registered on the manager per scheme. Originating providers (disk,
/// network) resolve straight to a root-keyed filesystem; layered providers
/// resolve their outer URI back through the manager first.
pub trait FileProvider: Send + Sync {
    /// Resolves an absolute URI to a file object, creating or reusing the
    /// filesystem it belongs to.
    fn find_file(
        &self,
        manager: &FileSystemManager,
        uri: &str,
        options: &FileSystemOptions,
    ) -> Result<FileObject>;

    /// Closes every filesystem this provider has created.
    fn close_all(&self) {}
}

/// Cache key for filesystem reuse: the root URI plus the option bag it was
/// created with. Equal keys must yield the same filesystem instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileSystemKey {
    root_uri: String,
    options: FileSystemOptions,
}

impl FileSystemKey {
    pub fn new(root_uri: impl Into<String>, options: &FileSystemOptions) -> FileSystemKey {
        FileSystemKey {
            root_uri: root_uri.into(),
            options: options.clone(),
        }
    }
}

/// Per-provider registry of live filesystems, keyed by [`FileSystemKey`].
///
/// The check-and-create is atomic per key, so concurrent resolutions of the
/// same root share one filesystem.
#[derive(Default)]
pub struct ProviderFileSystems {
    filesystems: DashMap<FileSystemKey, FileSystem>,
}

impl ProviderFileSystems {
    pub fn new() -> ProviderFileSystems {
        ProviderFileSystems {
            filesystems: DashMap::new(),
        }
    }

    /// Returns the filesystem for `key`, invoking `create` when absent.
    pub fn get_or_create(
        &self,
        key: FileSystemKey,
        create: impl FnOnce() -> Result<FileSystem>,
    ) -> Result<FileSystem> {
        match self.filesystems.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let fs = create()?;
                debug!(root = fs.root_uri(), "filesystem created");
                entry.insert(fs.clone());
                Ok(fs)
            }
        }
    }

    /// Closes and forgets every filesystem.
    pub fn close_all(&self) {
        for entry in self.filesystems.iter() {
            entry.value().close();
        }
        self.filesystems.clear();
    }

    pub fn len(&self) -> usize {
        self.filesystems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filesystems.is_empty()
    }
}
