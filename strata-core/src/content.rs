//! Content access: streams, random access, size, times and attributes.
//!
//! A file object allows at most one open stream, input or output, at a time.
//! The stream guards release that gate on close or drop; closing an output
//! stream additionally runs the end-of-output protocol, which is what turns
//! "write to an imaginary file" into a created file plus event.

use crate::error::{Result, VfsError};
use crate::file::FileObject;
use crate::types::{Capability, FileType};
use std::io::{Read, Seek, Write};
use std::time::SystemTime;
use tracing::warn;

/// Mode for random-access content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomAccessMode {
    Read,
    ReadWrite,
}

/// Seekable content handle supplied by a provider.
pub trait RandomAccess: Read + Write + Seek + Send {}

impl<T: Read + Write + Seek + Send> RandomAccess for T {}

/// Access to the content of a file object.
///
/// Lightweight; created on demand by [`FileObject::content`].
pub struct FileContent {
    file: FileObject,
}

impl FileContent {
    pub(crate) fn new(file: FileObject) -> FileContent {
        FileContent { file }
    }

    /// The file this content belongs to.
    pub fn file(&self) -> &FileObject {
        &self.file
    }

    /// True while a stream is open on the file.
    pub fn is_open(&self) -> bool {
        self.file.is_content_open()
    }

    fn require_capability(&self, cap: Capability, operation: &'static str) -> Result<()> {
        if !self.file.fs().has_capability(cap) {
            return Err(VfsError::NotSupported { operation });
        }
        Ok(())
    }

    fn require_content(&self) -> Result<()> {
        let ty = self.file.file_type()?;
        if ty == FileType::Imaginary {
            return Err(VfsError::NotFound {
                name: self.file.name().clone(),
            });
        }
        if !ty.has_content() {
            return Err(VfsError::TypeMismatch {
                name: self.file.name().clone(),
            });
        }
        Ok(())
    }

    /// Opens the content for reading.
    pub fn input_stream(&self) -> Result<InputStream> {
        self.require_capability(Capability::ReadContent, "read-content")?;
        self.require_content()?;
        if !self.file.is_readable()? {
            return Err(VfsError::ReadOnly {
                name: self.file.name().clone(),
            });
        }
        self.file.begin_read()?;
        match self.file.hooks().open_input() {
            Ok(inner) => Ok(InputStream {
                file: self.file.clone(),
                inner: Some(inner),
            }),
            Err(error) => {
                self.file.end_stream();
                Err(error.wrap(self.file.name(), "read"))
            }
        }
    }

    /// Opens the content for writing, creating the file and any missing
    /// ancestor folders.
    pub fn output_stream(&self, append: bool) -> Result<OutputStream> {
        self.require_capability(Capability::WriteContent, "write-content")?;
        if append {
            self.require_capability(Capability::AppendContent, "append-content")?;
        }
        let ty = self.file.file_type()?;
        if ty != FileType::Imaginary && !ty.has_content() {
            return Err(VfsError::TypeMismatch {
                name: self.file.name().clone(),
            });
        }
        if !self.file.is_writable()? {
            return Err(VfsError::ReadOnly {
                name: self.file.name().clone(),
            });
        }
        if ty == FileType::Imaginary {
            if let Some(parent) = self.file.parent()? {
                parent.create_folder()?;
            }
        }
        self.file.begin_write()?;
        match self.file.hooks().open_output(append) {
            Ok(inner) => Ok(OutputStream {
                file: self.file.clone(),
                inner: Some(inner),
            }),
            Err(error) => {
                self.file.end_stream();
                Err(error.wrap(self.file.name(), "write"))
            }
        }
    }

    /// Opens the content for random access. The file must already exist;
    /// counts against the single-stream gate like any other stream.
    pub fn random_access(&self, mode: RandomAccessMode) -> Result<RandomAccessContent> {
        match mode {
            RandomAccessMode::Read => {
                self.require_capability(Capability::RandomAccessRead, "random-access-read")?
            }
            RandomAccessMode::ReadWrite => {
                self.require_capability(Capability::RandomAccessWrite, "random-access-write")?
            }
        }
        self.require_content()?;
        match mode {
            RandomAccessMode::Read => self.file.begin_read()?,
            RandomAccessMode::ReadWrite => self.file.begin_write()?,
        }
        match self.file.open_random_access(mode) {
            Ok(inner) => Ok(RandomAccessContent {
                file: self.file.clone(),
                mode,
                inner: Some(inner),
            }),
            Err(error) => {
                self.file.end_stream();
                Err(error)
            }
        }
    }

    /// Reads the entire content into a buffer.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        let mut input = self.input_stream()?;
        let mut buffer = Vec::new();
        input
            .read_to_end(&mut buffer)
            .map_err(|e| VfsError::from(e).wrap(self.file.name(), "read"))?;
        input.close()?;
        Ok(buffer)
    }

    /// Replaces the entire content with a buffer.
    pub fn write_bytes(&self, data: &[u8]) -> Result<()> {
        let mut output = self.output_stream(false)?;
        output
            .write_all(data)
            .map_err(|e| VfsError::from(e).wrap(self.file.name(), "write"))?;
        output.close()
    }

    /// Size of the content in bytes.
    pub fn size(&self) -> Result<u64> {
        self.require_content()?;
        self.file
            .hooks()
            .content_size()
            .map_err(|e| e.wrap(self.file.name(), "content-size"))
    }

    /// Last-modified time of the file.
    pub fn last_modified(&self) -> Result<SystemTime> {
        self.require_capability(Capability::GetLastModified, "get-last-modified")?;
        if !self.file.exists()? {
            return Err(VfsError::NotFound {
                name: self.file.name().clone(),
            });
        }
        self.file
            .hooks()
            .last_modified()
            .map_err(|e| e.wrap(self.file.name(), "get-last-modified"))
    }

    /// Sets the last-modified time of the file.
    pub fn set_last_modified(&self, time: SystemTime) -> Result<()> {
        self.require_capability(Capability::SetLastModified, "set-last-modified")?;
        if !self.file.exists()? {
            return Err(VfsError::NotFound {
                name: self.file.name().clone(),
            });
        }
        self.file
            .hooks()
            .set_last_modified(time)
            .map_err(|e| e.wrap(self.file.name(), "set-last-modified"))
    }

    /// Looks up a string attribute.
    pub fn attribute(&self, attr_name: &str) -> Result<Option<String>> {
        self.require_capability(Capability::Attributes, "attributes")?;
        self.file
            .hooks()
            .attribute(attr_name)
            .map_err(|e| e.wrap(self.file.name(), "get-attribute"))
    }

    /// Sets a string attribute.
    pub fn set_attribute(&self, attr_name: &str, value: impl Into<String>) -> Result<()> {
        self.require_capability(Capability::Attributes, "attributes")?;
        self.file
            .hooks()
            .set_attribute(attr_name, value.into())
            .map_err(|e| e.wrap(self.file.name(), "set-attribute"))
    }
}

/// Open read stream on a file's content. Releases the stream gate on close
/// or drop.
pub struct InputStream {
    file: FileObject,
    inner: Option<Box<dyn Read + Send>>,
}

impl InputStream {
    /// Closes the stream and releases the gate.
    pub fn close(mut self) -> Result<()> {
        if self.inner.take().is_some() {
            self.file.end_stream();
        }
        Ok(())
    }
}

impl Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            Some(inner) => inner.read(buf),
            None => Ok(0),
        }
    }
}

impl Drop for InputStream {
    fn drop(&mut self) {
        if self.inner.take().is_some() {
            self.file.end_stream();
        }
    }
}

/// Open write stream on a file's content.
///
/// Closing flushes, releases the gate and runs the end-of-output protocol:
/// a created event when the file did not exist before, a changed event
/// otherwise. Prefer explicit [`OutputStream::close`]; dropping finalizes
/// too but can only log failures.
pub struct OutputStream {
    file: FileObject,
    inner: Option<Box<dyn Write + Send>>,
}

impl OutputStream {
    /// Flushes and closes the stream, firing the created/changed event.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut inner) = self.inner.take() else {
            return Ok(());
        };
        let flushed = inner.flush();
        drop(inner);
        self.file.end_stream();
        flushed.map_err(|e| VfsError::from(e).wrap(self.file.name(), "write"))?;
        self.file.end_output()
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            Some(inner) => inner.write(buf),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stream closed",
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            Some(inner) => inner.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(error) = self.finish() {
                warn!(file = %self.file.name(), %error, "error closing dropped output stream");
            }
        }
    }
}

/// Open random-access handle on a file's content.
pub struct RandomAccessContent {
    file: FileObject,
    mode: RandomAccessMode,
    inner: Option<Box<dyn RandomAccess>>,
}

impl RandomAccessContent {
    /// Closes the handle; a read-write handle fires a changed event.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn finish(&mut self) -> Result<()> {
        if self.inner.take().is_none() {
            return Ok(());
        }
        self.file.end_stream();
        if self.mode == RandomAccessMode::ReadWrite {
            self.file.fs().fire_changed(&self.file);
        }
        Ok(())
    }

    fn inner(&mut self) -> std::io::Result<&mut Box<dyn RandomAccess>> {
        self.inner.as_mut().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::BrokenPipe, "random access closed")
        })
    }
}

impl Read for RandomAccessContent {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner()?.read(buf)
    }
}

impl Write for RandomAccessContent {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner()?.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner()?.flush()
    }
}

impl Seek for RandomAccessContent {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.inner()?.seek(pos)
    }
}

impl Drop for RandomAccessContent {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(error) = self.finish() {
                warn!(file = %self.file.name(), %error, "error closing dropped random access");
            }
        }
    }
}
