//! File hooks mapped onto `std::fs`.

use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::SystemTime;
use strata_core::content::{RandomAccess, RandomAccessMode};
use strata_core::file::FileHooks;
use strata_core::{FileName, FileType, Result, VfsError};

pub(crate) struct LocalHooks {
    path: PathBuf,
}

impl LocalHooks {
    pub(crate) fn new(name: &FileName) -> LocalHooks {
        LocalHooks {
            path: PathBuf::from(name.path()),
        }
    }

    fn metadata(&self) -> std::io::Result<fs::Metadata> {
        fs::symlink_metadata(&self.path)
    }
}

impl FileHooks for LocalHooks {
    fn file_type(&self) -> Result<Option<FileType>> {
        match self.metadata() {
            Ok(meta) if meta.is_dir() => Ok(Some(FileType::Folder)),
            Ok(_) => Ok(Some(FileType::File)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_children(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(VfsError::from)? {
            let entry = entry.map_err(VfsError::from)?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    fn is_writable(&self) -> Result<bool> {
        Ok(!self.metadata().map_err(VfsError::from)?.permissions().readonly())
    }

    fn is_hidden(&self) -> Result<bool> {
        // Unix convention: dotfiles are hidden.
        Ok(self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(false))
    }

    fn open_input(&self) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(&self.path).map_err(VfsError::from)?))
    }

    fn open_output(&self, append: bool) -> Result<Box<dyn Write + Send>> {
        let file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .append(append)
            .truncate(!append)
            .open(&self.path)
            .map_err(VfsError::from)?;
        Ok(Box::new(file))
    }

    fn open_random_access(&self, mode: RandomAccessMode) -> Result<Box<dyn RandomAccess>> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(mode == RandomAccessMode::ReadWrite)
            .open(&self.path)
            .map_err(VfsError::from)?;
        Ok(Box::new(file))
    }

    fn content_size(&self) -> Result<u64> {
        Ok(self.metadata().map_err(VfsError::from)?.len())
    }

    fn delete(&self) -> Result<()> {
        let meta = self.metadata().map_err(VfsError::from)?;
        if meta.is_dir() {
            fs::remove_dir(&self.path).map_err(VfsError::from)
        } else {
            fs::remove_file(&self.path).map_err(VfsError::from)
        }
    }

    fn create_folder(&self) -> Result<()> {
        fs::create_dir(&self.path).map_err(VfsError::from)
    }

    fn rename_to(&self, new_name: &FileName) -> Result<()> {
        fs::rename(&self.path, new_name.path()).map_err(VfsError::from)
    }

    fn last_modified(&self) -> Result<SystemTime> {
        self.metadata()
            .map_err(VfsError::from)?
            .modified()
            .map_err(VfsError::from)
    }

    fn set_last_modified(&self, time: SystemTime) -> Result<()> {
        let file = fs::File::open(&self.path).map_err(VfsError::from)?;
        file.set_modified(time).map_err(VfsError::from)
    }
}
