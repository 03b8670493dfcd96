//! Traversal policy callbacks and the stock selectors.

use crate::error::Result;
use crate::file::FileObject;
use crate::types::FileType;

/// Context handed to a [`FileSelector`] for each candidate file.
pub struct FileSelectInfo<'a> {
    base_folder: &'a FileObject,
    file: &'a FileObject,
    depth: usize,
}

impl<'a> FileSelectInfo<'a> {
    pub(crate) fn new(base_folder: &'a FileObject, file: &'a FileObject, depth: usize) -> Self {
        FileSelectInfo {
            base_folder,
            file,
            depth,
        }
    }

    /// The folder the traversal started from.
    pub fn base_folder(&self) -> &FileObject {
        self.base_folder
    }

    /// The file currently being considered.
    pub fn file(&self) -> &FileObject {
        self.file
    }

    /// Depth of the current file relative to the traversal root.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Decides which files a traversal includes and where it descends.
pub trait FileSelector: Send + Sync {
    /// Whether the candidate goes into the result set.
    fn include_file(&self, info: &FileSelectInfo<'_>) -> Result<bool>;

    /// Whether the traversal descends into the candidate's children.
    fn traverse_descendants(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        let _ = info;
        Ok(true)
    }
}

/// Selects every file, the base included.
pub struct SelectAll;

impl FileSelector for SelectAll {
    fn include_file(&self, _info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(true)
    }
}

/// Selects only regular files.
pub struct SelectFiles;

impl FileSelector for SelectFiles {
    fn include_file(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(info.file().file_type()? == FileType::File)
    }
}

/// Selects only folders.
pub struct SelectFolders;

impl FileSelector for SelectFolders {
    fn include_file(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(info.file().file_type()? == FileType::Folder)
    }
}

/// Selects files whose depth falls in an inclusive range; descends only
/// while doing so can still reach the range.
pub struct FileDepthSelector {
    pub min_depth: usize,
    pub max_depth: usize,
}

impl FileSelector for FileDepthSelector {
    fn include_file(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(self.min_depth <= info.depth() && info.depth() <= self.max_depth)
    }

    fn traverse_descendants(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(info.depth() < self.max_depth)
    }
}

/// Selects just the base file.
pub struct SelectSelf;

impl FileSelector for SelectSelf {
    fn include_file(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(info.depth() == 0)
    }

    fn traverse_descendants(&self, _info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(false)
    }
}

/// Selects the direct children of the base, the base excluded.
pub struct SelectChildren;

impl FileSelector for SelectChildren {
    fn include_file(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(info.depth() == 1)
    }

    fn traverse_descendants(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(info.depth() < 1)
    }
}

/// Selects the base and its direct children.
pub struct SelectSelfAndChildren;

impl FileSelector for SelectSelfAndChildren {
    fn include_file(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(info.depth() <= 1)
    }

    fn traverse_descendants(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(info.depth() < 1)
    }
}

/// Selects everything below the base, the base excluded.
pub struct ExcludeSelf;

impl FileSelector for ExcludeSelf {
    fn include_file(&self, info: &FileSelectInfo<'_>) -> Result<bool> {
        Ok(info.depth() > 0)
    }
}
