//! The `file` scheme provider.

use crate::hooks::LocalHooks;
use strata_core::file::FileHooks;
use strata_core::fs::{FileSystem, FileSystemBackend};
use strata_core::manager::FileSystemManager;
use strata_core::options::FileSystemOptions;
use strata_core::provider::{FileProvider, FileSystemKey, ProviderFileSystems};
use strata_core::types::CapabilitySet;
use strata_core::{Capability, FileName, FileObject, Result};
use tracing::debug;

struct LocalBackend;

impl FileSystemBackend for LocalBackend {
    fn capabilities(&self, caps: &mut CapabilitySet) {
        caps.add_all(&[
            Capability::ReadContent,
            Capability::WriteContent,
            Capability::AppendContent,
            Capability::GetLastModified,
            Capability::SetLastModified,
            Capability::RandomAccessRead,
            Capability::RandomAccessWrite,
            Capability::Rename,
            Capability::ListChildren,
            Capability::CreateFolder,
            Capability::Delete,
            Capability::UriString,
        ]);
    }

    fn create_hooks(&self, name: &FileName) -> Result<Box<dyn FileHooks>> {
        Ok(Box::new(LocalHooks::new(name)))
    }
}

/// Originating provider for the `file` scheme: `file:///absolute/path`
/// names mapped straight onto the host filesystem. Unix-oriented.
#[derive(Default)]
pub struct LocalFileProvider {
    filesystems: ProviderFileSystems,
}

impl LocalFileProvider {
    pub fn new() -> LocalFileProvider {
        LocalFileProvider {
            filesystems: ProviderFileSystems::new(),
        }
    }
}

impl FileProvider for LocalFileProvider {
    fn find_file(
        &self,
        manager: &FileSystemManager,
        uri: &str,
        options: &FileSystemOptions,
    ) -> Result<FileObject> {
        let name = FileName::parse_uri(uri)?;
        let key = FileSystemKey::new(name.root_uri(), options);
        let fs = self.filesystems.get_or_create(key, || {
            debug!(root = name.root_uri(), "creating local filesystem");
            Ok(FileSystem::new(
                name.root(),
                None,
                options.clone(),
                Box::new(LocalBackend),
                manager.cache().clone(),
            ))
        })?;
        fs.resolve_file(&name)
    }

    fn close_all(&self) {
        self.filesystems.close_all();
    }
}
