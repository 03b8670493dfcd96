//! File hooks over the shared [`MemStore`].

use crate::store::MemStore;
use bytes::Bytes;
use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::time::SystemTime;
use strata_core::file::FileHooks;
use strata_core::{FileName, FileType, Result, VfsError};

pub(crate) struct MemoryHooks {
    store: Arc<MemStore>,
    path: String,
}

impl MemoryHooks {
    pub(crate) fn new(store: Arc<MemStore>, name: &FileName) -> MemoryHooks {
        MemoryHooks {
            store,
            path: name.path().to_string(),
        }
    }
}

impl FileHooks for MemoryHooks {
    fn file_type(&self) -> Result<Option<FileType>> {
        Ok(self.store.file_type(&self.path))
    }

    fn list_children(&self) -> Result<Vec<String>> {
        Ok(self.store.children(&self.path))
    }

    fn open_input(&self) -> Result<Box<dyn Read + Send>> {
        let data = self.store.read(&self.path)?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn open_output(&self, append: bool) -> Result<Box<dyn Write + Send>> {
        Ok(Box::new(MemWriter {
            store: self.store.clone(),
            path: self.path.clone(),
            append,
            buffer: Vec::new(),
            committed: 0,
            truncated: false,
        }))
    }

    fn content_size(&self) -> Result<u64> {
        Ok(self.store.read(&self.path)?.len() as u64)
    }

    fn delete(&self) -> Result<()> {
        self.store.delete(&self.path)
    }

    fn create_folder(&self) -> Result<()> {
        self.store.create_folder(&self.path)
    }

    fn rename_to(&self, new_name: &FileName) -> Result<()> {
        self.store.rename(&self.path, new_name.path())
    }

    fn last_modified(&self) -> Result<SystemTime> {
        self.store
            .last_modified(&self.path)
            .ok_or_else(|| VfsError::Io {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            })
    }

    fn set_last_modified(&self, time: SystemTime) -> Result<()> {
        if self.store.set_last_modified(&self.path, time) {
            Ok(())
        } else {
            Err(VfsError::Io {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            })
        }
    }

    fn attribute(&self, attr_name: &str) -> Result<Option<String>> {
        Ok(self.store.attribute(&self.path, attr_name))
    }

    fn set_attribute(&self, attr_name: &str, value: String) -> Result<()> {
        if self.store.set_attribute(&self.path, attr_name, value) {
            Ok(())
        } else {
            Err(VfsError::Io {
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            })
        }
    }
}

/// Buffers written bytes and commits them to the store on flush.
///
/// The first flush writes the whole buffer (truncating unless appending);
/// later flushes append only what arrived since, so repeated flushing never
/// duplicates data.
struct MemWriter {
    store: Arc<MemStore>,
    path: String,
    append: bool,
    buffer: Vec<u8>,
    committed: usize,
    truncated: bool,
}

impl Write for MemWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let result = if !self.truncated {
            self.truncated = true;
            self.store.write(&self.path, &self.buffer, self.append)
        } else if self.committed < self.buffer.len() {
            self.store
                .write(&self.path, &self.buffer[self.committed..], true)
        } else {
            Ok(())
        };
        match result {
            Ok(()) => {
                self.committed = self.buffer.len();
                Ok(())
            }
            Err(error) => Err(std::io::Error::new(std::io::ErrorKind::Other, error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_flush_is_idempotent() {
        let store = Arc::new(MemStore::new(usize::MAX));
        let name = FileName::parse_uri("mem:///f").unwrap();
        let hooks = MemoryHooks::new(store.clone(), &name);

        let mut writer = hooks.open_output(false).unwrap();
        writer.write_all(b"abc").unwrap();
        writer.flush().unwrap();
        writer.flush().unwrap();
        writer.write_all(b"def").unwrap();
        writer.flush().unwrap();
        assert_eq!(store.read("/f").unwrap(), Bytes::from_static(b"abcdef"));
    }

    #[test]
    fn test_writer_append_mode() {
        let store = Arc::new(MemStore::new(usize::MAX));
        store.write("/f", b"abc", false).unwrap();
        let name = FileName::parse_uri("mem:///f").unwrap();
        let hooks = MemoryHooks::new(store.clone(), &name);

        let mut writer = hooks.open_output(true).unwrap();
        writer.write_all(b"def").unwrap();
        writer.flush().unwrap();
        writer.flush().unwrap();
        assert_eq!(store.read("/f").unwrap(), Bytes::from_static(b"abcdef"));
    }
}
