//! The virtual filesystem and its delegating file objects.
//!
//! A virtual filesystem has no storage of its own: junctions splice the
//! subtrees of files from other filesystems into its namespace, and every
//! file under a junction forwards its hooks to the corresponding target
//! file. Change events on the target are mirrored back into the virtual
//! filesystem while a delegating object is attached.

use crate::error::{Result, VfsError};
use crate::events::FileListener;
use crate::file::{FileHooks, FileObject};
use crate::fs::{FileSystem, FileSystemBackend};
use crate::name::{check_name, FileName, NameScope, SEPARATOR_CHAR};
use crate::types::{Capability, CapabilitySet, FileType};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::sync::{Arc, Mutex, RwLock};
use std::time::SystemTime;

/// Backend of a virtual filesystem: a junction table and nothing else.
#[derive(Default)]
pub struct VirtualFileSystemBackend {
    junctions: RwLock<BTreeMap<FileName, FileObject>>,
}

impl VirtualFileSystemBackend {
    pub fn new() -> VirtualFileSystemBackend {
        VirtualFileSystemBackend::default()
    }
}

impl FileSystemBackend for VirtualFileSystemBackend {
    fn capabilities(&self, caps: &mut CapabilitySet) {
        // Content operations run under the target's own capability checks;
        // these gate only the virtual side.
        caps.add_all(&[
            Capability::ReadContent,
            Capability::WriteContent,
            Capability::AppendContent,
            Capability::ListChildren,
            Capability::CreateFolder,
            Capability::Delete,
            Capability::GetLastModified,
            Capability::Junctions,
        ]);
    }

    fn create_hooks(&self, name: &FileName) -> Result<Box<dyn FileHooks>> {
        let junctions = self.junctions.read().unwrap();

        // Deepest junction point covering this name wins.
        let mut best: Option<(&FileName, &FileObject)> = None;
        for (point, target) in junctions.iter() {
            if check_name(point.path(), name.path(), NameScope::DescendantOrSelf)
                && best.map_or(true, |(b, _)| point.path().len() > b.path().len())
            {
                best = Some((point, target));
            }
        }
        if let Some((point, target)) = best {
            let relative = point.relative_name_to(name);
            let real = if relative == "." {
                target.clone()
            } else {
                target.resolve_scoped(&relative, NameScope::DescendantOrSelf)?
            };
            return Ok(Box::new(DelegateHooks::new(real)));
        }

        // Off-junction names: the root and the ancestors of junction points
        // appear as synthetic folders, everything else is missing.
        let mut children = BTreeSet::new();
        for point in junctions.keys() {
            if check_name(name.path(), point.path(), NameScope::Descendant) {
                let offset = if name.is_root() { 1 } else { name.path().len() + 1 };
                let first = point.path()[offset..]
                    .split(SEPARATOR_CHAR)
                    .next()
                    .unwrap_or_default();
                children.insert(first.to_string());
            }
        }
        if name.is_root() || !children.is_empty() {
            Ok(Box::new(SyntheticFolderHooks {
                children: children.into_iter().collect(),
            }))
        } else {
            Ok(Box::new(MissingHooks))
        }
    }

    fn add_junction(&self, junction: &FileName, target: &FileObject) -> Result<()> {
        self.junctions
            .write()
            .unwrap()
            .insert(junction.clone(), target.clone());
        Ok(())
    }

    fn remove_junction(&self, junction: &FileName) -> Result<bool> {
        Ok(self.junctions.write().unwrap().remove(junction).is_some())
    }

    fn close(&self) {
        self.junctions.write().unwrap().clear();
    }
}

/// Hooks that forward everything to a target file in another filesystem.
///
/// While attached, a listener on the target mirrors its change events back
/// into the owning filesystem against the delegating object's own name.
pub struct DelegateHooks {
    target: FileObject,
    mirror: Mutex<Option<Arc<dyn FileListener>>>,
}

impl DelegateHooks {
    pub fn new(target: FileObject) -> DelegateHooks {
        DelegateHooks {
            target,
            mirror: Mutex::new(None),
        }
    }
}

impl FileHooks for DelegateHooks {
    fn attach(&self, file: &FileObject) -> Result<()> {
        let mut mirror = self.mirror.lock().unwrap();
        if mirror.is_none() {
            let listener: Arc<dyn FileListener> = Arc::new(MirrorListener {
                owner_fs: file.fs().clone(),
                owner_name: file.name().clone(),
            });
            self.target.fs().add_listener(self.target.name(), listener.clone());
            *mirror = Some(listener);
        }
        Ok(())
    }

    fn detach(&self, _file: &FileObject) -> Result<()> {
        if let Some(listener) = self.mirror.lock().unwrap().take() {
            self.target.fs().remove_listener(self.target.name(), &listener);
        }
        Ok(())
    }

    fn file_type(&self) -> Result<Option<FileType>> {
        Ok(match self.target.file_type()? {
            FileType::Imaginary => None,
            ty => Some(ty),
        })
    }

    fn list_children(&self) -> Result<Vec<String>> {
        Ok(self
            .target
            .children()?
            .iter()
            .map(|child| child.name().base_name().to_string())
            .collect())
    }

    fn is_readable(&self) -> Result<bool> {
        self.target.is_readable()
    }

    fn is_writable(&self) -> Result<bool> {
        self.target.is_writable()
    }

    fn is_hidden(&self) -> Result<bool> {
        self.target.is_hidden()
    }

    fn open_input(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(self.target.content().input_stream()?))
    }

    fn open_output(&self, append: bool) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(self.target.content().output_stream(append)?))
    }

    fn content_size(&self) -> Result<u64> {
        self.target.content().size()
    }

    fn delete(&self) -> Result<()> {
        if self.target.delete()? {
            Ok(())
        } else {
            Err(VfsError::Io {
                source: std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "delegate target was not deleted",
                ),
            })
        }
    }

    fn create_folder(&self) -> Result<()> {
        self.target.create_folder()
    }

    fn last_modified(&self) -> Result<SystemTime> {
        self.target.content().last_modified()
    }

    fn set_last_modified(&self, time: SystemTime) -> Result<()> {
        self.target.content().set_last_modified(time)
    }

    fn attribute(&self, attr_name: &str) -> Result<Option<String>> {
        self.target.content().attribute(attr_name)
    }

    fn set_attribute(&self, attr_name: &str, value: String) -> Result<()> {
        self.target.content().set_attribute(attr_name, value)
    }
}

/// Republishes a target file's events against the delegating object's name.
struct MirrorListener {
    owner_fs: FileSystem,
    owner_name: FileName,
}

impl MirrorListener {
    fn owner(&self) -> Option<FileObject> {
        self.owner_fs.peek(&self.owner_name)
    }
}

impl FileListener for MirrorListener {
    fn file_created(&self, _target: &FileObject) {
        if let Some(owner) = self.owner() {
            owner.refresh();
            self.owner_fs.fire_created(&owner);
        }
    }

    fn file_deleted(&self, _target: &FileObject) {
        if let Some(owner) = self.owner() {
            owner.refresh();
            self.owner_fs.fire_deleted(&owner);
        }
    }

    fn file_changed(&self, _target: &FileObject) {
        if let Some(owner) = self.owner() {
            self.owner_fs.fire_changed(&owner);
        }
    }
}

/// A folder that exists only to hold junction points beneath it.
struct SyntheticFolderHooks {
    children: Vec<String>,
}

impl FileHooks for SyntheticFolderHooks {
    fn file_type(&self) -> Result<Option<FileType>> {
        Ok(Some(FileType::Folder))
    }

    fn list_children(&self) -> Result<Vec<String>> {
        Ok(self.children.clone())
    }

    fn is_writable(&self) -> Result<bool> {
        Ok(false)
    }
}

/// A name outside every junction: does not exist and cannot be created.
struct MissingHooks;

impl FileHooks for MissingHooks {
    fn file_type(&self) -> Result<Option<FileType>> {
        Ok(None)
    }

    fn list_children(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn is_writable(&self) -> Result<bool> {
        Ok(false)
    }
}
