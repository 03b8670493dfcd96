//! The `mem` scheme provider and its option builder.

use crate::hooks::MemoryHooks;
use crate::store::MemStore;
use std::sync::Arc;
use strata_core::file::FileHooks;
use strata_core::fs::{FileSystem, FileSystemBackend};
use strata_core::manager::FileSystemManager;
use strata_core::options::{FileSystemOptionBuilder, FileSystemOptions, OptionValue};
use strata_core::provider::{FileProvider, FileSystemKey, ProviderFileSystems};
use strata_core::types::CapabilitySet;
use strata_core::{Capability, FileName, FileObject, Result};
use tracing::debug;

/// Typed options for memory filesystems.
///
/// ```rust,ignore
/// let mut options = FileSystemOptions::new();
/// MemoryFsOptionBuilder.set_max_size(&mut options, 1 << 20);
/// let file = manager.resolve_file_with_options("mem:///big", &options)?;
/// ```
pub struct MemoryFsOptionBuilder;

impl MemoryFsOptionBuilder {
    const MAX_SIZE: &'static str = "max-size";

    /// Caps the total content bytes the store will hold.
    pub fn set_max_size(&self, options: &mut FileSystemOptions, max_size: usize) {
        self.set_option(options, Self::MAX_SIZE, OptionValue::Int(max_size as i64));
    }

    pub fn max_size(&self, options: &FileSystemOptions) -> Option<usize> {
        match self.option(options, Self::MAX_SIZE) {
            Some(OptionValue::Int(n)) if *n >= 0 => Some(*n as usize),
            _ => None,
        }
    }
}

impl FileSystemOptionBuilder for MemoryFsOptionBuilder {
    fn component(&self) -> &'static str {
        "mem"
    }
}

struct MemoryBackend {
    store: Arc<MemStore>,
}

impl FileSystemBackend for MemoryBackend {
    fn capabilities(&self, caps: &mut CapabilitySet) {
        caps.add_all(&[
            Capability::ReadContent,
            Capability::WriteContent,
            Capability::AppendContent,
            Capability::Attributes,
            Capability::GetLastModified,
            Capability::SetLastModified,
            Capability::Rename,
            Capability::ListChildren,
            Capability::CreateFolder,
            Capability::Delete,
            Capability::UriString,
        ]);
    }

    fn create_hooks(&self, name: &FileName) -> Result<Box<dyn FileHooks>> {
        Ok(Box::new(MemoryHooks::new(self.store.clone(), name)))
    }
}

/// Originating provider for the `mem` scheme.
///
/// Each distinct (root URI, options) pair gets its own store; resolving the
/// same root again reuses the live filesystem and everything in it.
#[derive(Default)]
pub struct MemoryFileProvider {
    filesystems: ProviderFileSystems,
}

impl MemoryFileProvider {
    pub fn new() -> MemoryFileProvider {
        MemoryFileProvider {
            filesystems: ProviderFileSystems::new(),
        }
    }
}

impl FileProvider for MemoryFileProvider {
    fn find_file(
        &self,
        manager: &FileSystemManager,
        uri: &str,
        options: &FileSystemOptions,
    ) -> Result<FileObject> {
        let name = FileName::parse_uri(uri)?;
        let key = FileSystemKey::new(name.root_uri(), options);
        let fs = self.filesystems.get_or_create(key, || {
            let max_size = MemoryFsOptionBuilder
                .max_size(options)
                .unwrap_or(usize::MAX);
            debug!(root = name.root_uri(), max_size, "creating memory filesystem");
            Ok(FileSystem::new(
                name.root(),
                None,
                options.clone(),
                Box::new(MemoryBackend {
                    store: Arc::new(MemStore::new(max_size)),
                }),
                manager.cache().clone(),
            ))
        })?;
        fs.resolve_file(&name)
    }

    fn close_all(&self) {
        self.filesystems.close_all();
    }
}
