//! The file object: lazy attach/detach lifecycle, children caching,
//! structural mutations and traversal.
//!
//! A [`FileObject`] is a cheap-clone handle onto shared state; the
//! filesystem's cache guarantees at most one live object per name, so two
//! resolutions of the same name observe the same attach state and children
//! cache. The provider supplies behavior through a [`FileHooks`] strategy
//! rather than subclassing.

use crate::content::{FileContent, RandomAccess, RandomAccessMode};
use crate::error::{Result, VfsError};
use crate::fs::FileSystem;
use crate::name::{FileName, NameScope};
use crate::selector::{FileSelectInfo, FileSelector, SelectAll, SelectSelf};
use crate::types::{Capability, FileType};
use std::io::{Read, Write};
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::{trace, warn};

/// Provider hooks backing one file object.
///
/// Only type determination and child listing are mandatory; everything else
/// defaults to unsupported or a benign constant. Hooks are called with the
/// object's attach state locked, so they must not call back into the same
/// file object.
pub trait FileHooks: Send + Sync {
    /// Determines the type of the file. `None` means the file does not
    /// exist.
    fn file_type(&self) -> Result<Option<FileType>>;

    /// Lists the base names of the children. Called only when the attached
    /// type has children.
    fn list_children(&self) -> Result<Vec<String>>;

    /// Called when the object attaches to the backing resource. Receives
    /// the owning object so forwarding hooks can reach its filesystem.
    fn attach(&self, file: &FileObject) -> Result<()> {
        let _ = file;
        Ok(())
    }

    /// Called when the object detaches. Best-effort cleanup.
    fn detach(&self, file: &FileObject) -> Result<()> {
        let _ = file;
        Ok(())
    }

    fn is_readable(&self) -> Result<bool> {
        Ok(true)
    }

    fn is_writable(&self) -> Result<bool> {
        Ok(true)
    }

    fn is_hidden(&self) -> Result<bool> {
        Ok(false)
    }

    /// Opens the raw content for reading.
    fn open_input(&self) -> Result<Box<dyn Read + Send>> {
        Err(VfsError::NotSupported {
            operation: "read-content",
        })
    }

    /// Opens the raw content for writing, truncating or appending.
    fn open_output(&self, append: bool) -> Result<Box<dyn Write + Send>> {
        let _ = append;
        Err(VfsError::NotSupported {
            operation: "write-content",
        })
    }

    /// Opens the raw content for random access.
    fn open_random_access(&self, mode: RandomAccessMode) -> Result<Box<dyn RandomAccess>> {
        let _ = mode;
        Err(VfsError::NotSupported {
            operation: "random-access",
        })
    }

    /// Size of the content in bytes.
    fn content_size(&self) -> Result<u64> {
        Err(VfsError::NotSupported {
            operation: "content-size",
        })
    }

    fn delete(&self) -> Result<()> {
        Err(VfsError::NotSupported { operation: "delete" })
    }

    fn create_folder(&self) -> Result<()> {
        Err(VfsError::NotSupported {
            operation: "create-folder",
        })
    }

    /// Renames the backing resource to `new_name` within the same
    /// filesystem.
    fn rename_to(&self, new_name: &FileName) -> Result<()> {
        let _ = new_name;
        Err(VfsError::NotSupported { operation: "rename" })
    }

    fn last_modified(&self) -> Result<SystemTime> {
        Err(VfsError::NotSupported {
            operation: "get-last-modified",
        })
    }

    fn set_last_modified(&self, time: SystemTime) -> Result<()> {
        let _ = time;
        Err(VfsError::NotSupported {
            operation: "set-last-modified",
        })
    }

    fn attribute(&self, attr_name: &str) -> Result<Option<String>> {
        let _ = attr_name;
        Ok(None)
    }

    fn set_attribute(&self, attr_name: &str, value: String) -> Result<()> {
        let _ = (attr_name, value);
        Err(VfsError::NotSupported {
            operation: "set-attribute",
        })
    }
}

#[derive(Debug)]
struct AttachState {
    attached: bool,
    file_type: FileType,
    /// Child names, listed lazily; None means not listed since the last
    /// attach or invalidation.
    children: Option<Vec<FileName>>,
}

/// Content stream gate: at most one stream, input or output, may be open on
/// a file object at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamState {
    None,
    Reading,
    Writing,
}

struct FileInner {
    name: FileName,
    fs: FileSystem,
    hooks: Box<dyn FileHooks>,
    state: Mutex<AttachState>,
    stream: Mutex<StreamState>,
}

/// A file or folder within a filesystem.
///
/// Handles are cheap to clone and all refer to the same underlying state.
/// Compound operations on one object are not atomic against each other; the
/// cache layer is the only part of the crate that synchronizes callers.
#[derive(Clone)]
pub struct FileObject {
    inner: std::sync::Arc<FileInner>,
}

impl FileObject {
    pub(crate) fn new(name: FileName, fs: FileSystem, hooks: Box<dyn FileHooks>) -> FileObject {
        FileObject {
            inner: std::sync::Arc::new(FileInner {
                name,
                fs,
                hooks,
                state: Mutex::new(AttachState {
                    attached: false,
                    file_type: FileType::Imaginary,
                    children: None,
                }),
                stream: Mutex::new(StreamState::None),
            }),
        }
    }

    /// The name of this file.
    pub fn name(&self) -> &FileName {
        &self.inner.name
    }

    /// The filesystem this file belongs to.
    pub fn fs(&self) -> &FileSystem {
        &self.inner.fs
    }

    /// True if both handles refer to the same underlying object.
    pub fn same_instance(&self, other: &FileObject) -> bool {
        std::sync::Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn hooks(&self) -> &dyn FileHooks {
        &*self.inner.hooks
    }

    fn attach_locked(&self, state: &mut AttachState) -> Result<()> {
        if state.attached {
            return Ok(());
        }
        self.inner
            .hooks
            .attach(self)
            .map_err(|e| e.wrap(&self.inner.name, "attach"))?;
        let reported = self
            .inner
            .hooks
            .file_type()
            .map_err(|e| e.wrap(&self.inner.name, "attach"))?;
        state.file_type = reported.unwrap_or(FileType::Imaginary);
        state.attached = true;
        trace!(file = %self.inner.name, file_type = %state.file_type, "attached");
        Ok(())
    }

    /// The type of this file, attaching first if necessary.
    pub fn file_type(&self) -> Result<FileType> {
        let mut state = self.inner.state.lock().unwrap();
        self.attach_locked(&mut state)?;
        Ok(state.file_type)
    }

    /// True if the file exists.
    pub fn exists(&self) -> Result<bool> {
        Ok(self.file_type()? != FileType::Imaginary)
    }

    /// True if the object is currently attached to its backing resource.
    pub fn is_attached(&self) -> bool {
        self.inner.state.lock().unwrap().attached
    }

    pub fn is_readable(&self) -> Result<bool> {
        if !self.exists()? {
            return Ok(false);
        }
        self.inner
            .hooks
            .is_readable()
            .map_err(|e| e.wrap(&self.inner.name, "is-readable"))
    }

    /// Whether the file can be written. A file that does not exist yet is
    /// writable when its parent is, mirroring the create path.
    pub fn is_writable(&self) -> Result<bool> {
        if self.exists()? {
            return self
                .inner
                .hooks
                .is_writable()
                .map_err(|e| e.wrap(&self.inner.name, "is-writable"));
        }
        match self.parent()? {
            Some(parent) => parent.is_writable(),
            None => Ok(true),
        }
    }

    pub fn is_hidden(&self) -> Result<bool> {
        if !self.exists()? {
            return Ok(false);
        }
        self.inner
            .hooks
            .is_hidden()
            .map_err(|e| e.wrap(&self.inner.name, "is-hidden"))
    }

    /// Detaches from the backing resource. The object stays usable and
    /// re-attaches on the next query.
    pub fn close(&self) {
        self.detach();
    }

    /// Discards cached state so the next query re-reads the backing
    /// resource.
    pub fn refresh(&self) {
        self.detach();
    }

    fn detach(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if !state.attached {
            return;
        }
        if let Err(error) = self.inner.hooks.detach(self) {
            warn!(file = %self.inner.name, %error, "detach hook failed; clearing state anyway");
        }
        state.attached = false;
        state.file_type = FileType::Imaginary;
        state.children = None;
    }

    /// The children of this folder, re-resolved through the filesystem cache
    /// on every call.
    pub fn children(&self) -> Result<Vec<FileObject>> {
        if !self.fs().has_capability(Capability::ListChildren) {
            return Err(VfsError::NotSupported {
                operation: "list-children",
            });
        }
        let names: Vec<FileName> = {
            let mut state = self.inner.state.lock().unwrap();
            self.attach_locked(&mut state)?;
            if !state.file_type.has_children() {
                return Err(VfsError::NotFolder {
                    name: self.inner.name.clone(),
                });
            }
            if state.children.is_none() {
                let base_names = self
                    .inner
                    .hooks
                    .list_children()
                    .map_err(|e| e.wrap(&self.inner.name, "list-children"))?;
                let mut names = Vec::with_capacity(base_names.len());
                for base in &base_names {
                    names.push(self.inner.name.child(base)?);
                }
                state.children = Some(names);
            }
            state.children.clone().unwrap_or_default()
        };

        names.iter().map(|n| self.fs().resolve_file(n)).collect()
    }

    /// Finds the direct child with the given base name, if any.
    pub fn child(&self, base_name: &str) -> Result<Option<FileObject>> {
        for child in self.children()? {
            if child.name().base_name() == base_name {
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    /// Resolves a path relative to this file, anywhere in the filesystem.
    pub fn resolve(&self, path: &str) -> Result<FileObject> {
        self.resolve_scoped(path, NameScope::FileSystem)
    }

    /// Resolves a path relative to this file, validated against a scope.
    pub fn resolve_scoped(&self, path: &str, scope: NameScope) -> Result<FileObject> {
        let name = crate::name::resolve_name(&self.inner.name, path, scope)?;
        self.fs().resolve_file(&name)
    }

    /// The parent of this file. The root of a layered filesystem answers the
    /// parent of the file it is layered over; a plain root has no parent.
    pub fn parent(&self) -> Result<Option<FileObject>> {
        match self.inner.name.parent() {
            Some(parent_name) => Ok(Some(self.fs().resolve_file(&parent_name)?)),
            None => match self.fs().parent_layer() {
                Some(outer) => outer.parent(),
                None => Ok(None),
            },
        }
    }

    /// Content accessor for this file.
    pub fn content(&self) -> FileContent {
        FileContent::new(self.clone())
    }

    /// True while an input or output stream is open on this file.
    pub fn is_content_open(&self) -> bool {
        *self.inner.stream.lock().unwrap() != StreamState::None
    }

    /// Creates this file, also creating any missing ancestor folders.
    ///
    /// Creation is opening an output stream and closing it; a no-op when the
    /// file already exists with content.
    pub fn create_file(&self) -> Result<()> {
        let ty = self.file_type()?;
        if ty != FileType::Imaginary {
            if ty.has_content() {
                return Ok(());
            }
            return Err(VfsError::TypeMismatch {
                name: self.inner.name.clone(),
            });
        }
        self.content().output_stream(false)?.close()
    }

    /// Creates this folder, recursively creating missing ancestors. A no-op
    /// when the folder already exists.
    pub fn create_folder(&self) -> Result<()> {
        let ty = self.file_type()?;
        if ty == FileType::Folder {
            return Ok(());
        }
        if ty != FileType::Imaginary {
            return Err(VfsError::TypeMismatch {
                name: self.inner.name.clone(),
            });
        }
        if !self.fs().has_capability(Capability::CreateFolder) {
            return Err(VfsError::NotSupported {
                operation: "create-folder",
            });
        }
        if let Some(parent) = self.parent()? {
            parent.create_folder()?;
        }
        if !self.is_writable()? {
            return Err(VfsError::ReadOnly {
                name: self.inner.name.clone(),
            });
        }
        self.inner
            .hooks
            .create_folder()
            .map_err(|e| e.wrap(&self.inner.name, "create-folder"))?;
        self.handle_create(FileType::Folder);
        Ok(())
    }

    /// Deletes this file. Returns false when the file does not exist, or is
    /// a folder that still has children.
    pub fn delete(&self) -> Result<bool> {
        Ok(self.delete_matching(&SelectSelf)? > 0)
    }

    /// Deletes the matching descendants, leaves before parents. Folders with
    /// remaining (selector-excluded) children are skipped, not forced.
    /// Returns the number of files actually removed.
    pub fn delete_matching(&self, selector: &dyn FileSelector) -> Result<usize> {
        let files = self.find_files_ordered(selector, true)?;
        let mut count = 0;
        for file in files {
            if !file.exists()? {
                continue;
            }
            if file.file_type()?.has_children() && !file.children()?.is_empty() {
                continue;
            }
            if file.delete_self()? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Deletes this file and everything under it.
    pub fn delete_all(&self) -> Result<usize> {
        self.delete_matching(&SelectAll)
    }

    fn delete_self(&self) -> Result<bool> {
        if !self.exists()? {
            return Ok(false);
        }
        if !self.fs().has_capability(Capability::Delete) {
            return Err(VfsError::NotSupported { operation: "delete" });
        }
        if !self.is_writable()? {
            return Err(VfsError::ReadOnly {
                name: self.inner.name.clone(),
            });
        }
        self.inner
            .hooks
            .delete()
            .map_err(|e| e.wrap(&self.inner.name, "delete"))?;
        self.handle_delete();
        Ok(true)
    }

    /// Copies the matching descendants of `src` onto this file, parents
    /// before children. A destination that exists with a different type than
    /// its source is deleted first. Not transactional: a failure partway
    /// leaves earlier copies in place.
    pub fn copy_from(&self, src: &FileObject, selector: &dyn FileSelector) -> Result<()> {
        if !src.exists()? {
            return Err(VfsError::CopyMissingSource {
                name: src.name().clone(),
            });
        }
        if !self.is_writable()? {
            return Err(VfsError::ReadOnly {
                name: self.inner.name.clone(),
            });
        }
        let files = src.find_files_ordered(selector, false)?;
        for file in files {
            let relative = src.name().relative_name_to(file.name());
            let dest = if relative == "." {
                self.clone()
            } else {
                self.resolve_scoped(&relative, NameScope::DescendantOrSelf)?
            };
            let src_type = file.file_type()?;
            if dest.exists()? && dest.file_type()? != src_type {
                dest.delete_all()?;
            }
            if src_type.has_content() {
                dest.write_content_from(&file)?;
            } else if src_type.has_children() {
                dest.create_folder()?;
            }
        }
        Ok(())
    }

    fn write_content_from(&self, src: &FileObject) -> Result<()> {
        let mut input = src.content().input_stream()?;
        let mut output = self.content().output_stream(false)?;
        std::io::copy(&mut input, &mut output)
            .map_err(|e| VfsError::from(e).wrap(&self.inner.name, "copy"))?;
        output.close()?;
        input.close()
    }

    /// Moves this file to `dest`: a native rename when both live in the same
    /// filesystem and it supports renaming, copy-and-delete otherwise. An
    /// existing destination is deleted first.
    pub fn move_to(&self, dest: &FileObject) -> Result<()> {
        if !self.exists()? {
            return Err(VfsError::NotFound {
                name: self.inner.name.clone(),
            });
        }
        if dest.exists()? {
            dest.delete_all()?;
        }
        if self.can_rename_to(dest) {
            if !self.is_writable()? {
                return Err(VfsError::ReadOnly {
                    name: self.inner.name.clone(),
                });
            }
            let ty = self.file_type()?;
            self.inner
                .hooks
                .rename_to(dest.name())
                .map_err(|e| e.wrap(&self.inner.name, "rename"))?;
            self.handle_delete();
            dest.handle_create(ty);
        } else {
            dest.copy_from(self, &SelectAll)?;
            self.delete_all()?;
        }
        Ok(())
    }

    fn can_rename_to(&self, dest: &FileObject) -> bool {
        self.fs().same_instance(dest.fs()) && self.fs().has_capability(Capability::Rename)
    }

    /// Finds the matching descendants, depthwise (descendants before their
    /// folder).
    pub fn find_files(&self, selector: &dyn FileSelector) -> Result<Vec<FileObject>> {
        self.find_files_ordered(selector, true)
    }

    /// Finds the matching descendants in a depth-first pre-order walk.
    ///
    /// Depthwise mode appends each match after its descendants (bottom-up,
    /// what delete needs); non-depthwise inserts it before them (top-down,
    /// what copy needs).
    pub fn find_files_ordered(
        &self,
        selector: &dyn FileSelector,
        depthwise: bool,
    ) -> Result<Vec<FileObject>> {
        let mut selected = Vec::new();
        if self.exists()? {
            traverse(self, self, selector, depthwise, 0, &mut selected)?;
        }
        Ok(selected)
    }

    /// Updates cached state after this object's creation: the parent's child
    /// listing is invalidated through the cache and a created event fires.
    pub(crate) fn handle_create(&self, file_type: FileType) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.attached = true;
            state.file_type = file_type;
            state.children = Some(Vec::new());
        }
        trace!(file = %self.inner.name, %file_type, "created");
        self.notify_parent();
        self.fs().fire_created(self);
    }

    /// Updates cached state after this object's deletion.
    pub(crate) fn handle_delete(&self) {
        {
            let mut state = self.inner.state.lock().unwrap();
            state.attached = true;
            state.file_type = FileType::Imaginary;
            state.children = None;
        }
        trace!(file = %self.inner.name, "deleted");
        self.notify_parent();
        self.fs().fire_deleted(self);
    }

    pub(crate) fn end_output(&self) -> Result<()> {
        if self.file_type()? == FileType::Imaginary {
            self.handle_create(FileType::File);
        } else {
            self.fs().fire_changed(self);
        }
        Ok(())
    }

    /// Drops the cached child listing; the next `children` call re-lists.
    pub(crate) fn children_changed(&self) {
        self.inner.state.lock().unwrap().children = None;
    }

    /// Invalidates the parent's child listing, through the cache only: a
    /// parent that was never resolved has nothing cached to go stale.
    fn notify_parent(&self) {
        if let Some(parent_name) = self.inner.name.parent() {
            if let Some(parent) = self.fs().peek(&parent_name) {
                parent.children_changed();
            }
        }
    }

    pub(crate) fn begin_read(&self) -> Result<()> {
        let mut stream = self.inner.stream.lock().unwrap();
        if *stream != StreamState::None {
            return Err(VfsError::StreamInUse {
                name: self.inner.name.clone(),
            });
        }
        *stream = StreamState::Reading;
        Ok(())
    }

    pub(crate) fn begin_write(&self) -> Result<()> {
        let mut stream = self.inner.stream.lock().unwrap();
        if *stream != StreamState::None {
            return Err(VfsError::StreamInUse {
                name: self.inner.name.clone(),
            });
        }
        *stream = StreamState::Writing;
        Ok(())
    }

    pub(crate) fn end_stream(&self) {
        *self.inner.stream.lock().unwrap() = StreamState::None;
    }

    /// Opens the raw random-access content. Used by [`FileContent`].
    pub(crate) fn open_random_access(
        &self,
        mode: RandomAccessMode,
    ) -> Result<Box<dyn RandomAccess>> {
        self.inner
            .hooks
            .open_random_access(mode)
            .map_err(|e| e.wrap(&self.inner.name, "random-access"))
    }
}

impl std::fmt::Debug for FileObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileObject")
            .field("name", &self.inner.name.friendly_uri())
            .finish_non_exhaustive()
    }
}

fn traverse(
    base: &FileObject,
    file: &FileObject,
    selector: &dyn FileSelector,
    depthwise: bool,
    depth: usize,
    selected: &mut Vec<FileObject>,
) -> Result<()> {
    let index = selected.len();

    let descend = {
        let info = FileSelectInfo::new(base, file, depth);
        file.file_type()?.has_children() && selector.traverse_descendants(&info)?
    };
    if descend {
        for child in file.children()? {
            traverse(base, &child, selector, depthwise, depth + 1, selected)?;
        }
    }

    let info = FileSelectInfo::new(base, file, depth);
    if selector.include_file(&info)? {
        if depthwise {
            selected.push(file.clone());
        } else {
            selected.insert(index, file.clone());
        }
    }
    Ok(())
}
