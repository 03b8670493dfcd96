//! File types and capability flags.

use indexmap::IndexSet;
use std::fmt;

/// The type of a file, as determined by its provider during attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// A regular file. Has content, never children.
    File,
    /// A folder. Has children, never content.
    Folder,
    /// Either, for providers that cannot tell (e.g. plain URLs). Has both
    /// content and children.
    FileOrFolder,
    /// The file does not exist.
    Imaginary,
}

impl FileType {
    /// Returns true if files of this type may have children.
    pub fn has_children(self) -> bool {
        matches!(self, FileType::Folder | FileType::FileOrFolder)
    }

    /// Returns true if files of this type may have content.
    pub fn has_content(self) -> bool {
        matches!(self, FileType::File | FileType::FileOrFolder)
    }

    /// Returns true if files of this type may carry attributes.
    pub fn has_attributes(self) -> bool {
        self != FileType::Imaginary
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::File => write!(f, "file"),
            FileType::Folder => write!(f, "folder"),
            FileType::FileOrFolder => write!(f, "file-or-folder"),
            FileType::Imaginary => write!(f, "imaginary"),
        }
    }
}

/// A capability a filesystem may advertise. Capability queries are static
/// per filesystem instance; the set is computed once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// File content can be read.
    ReadContent,
    /// File content can be written.
    WriteContent,
    /// Content can be appended to.
    AppendContent,
    /// Files carry string attributes.
    Attributes,
    /// Last-modified times can be read.
    GetLastModified,
    /// Last-modified times can be set.
    SetLastModified,
    /// Content supports random access for reading.
    RandomAccessRead,
    /// Content supports random access for writing.
    RandomAccessWrite,
    /// Files can be renamed within the filesystem.
    Rename,
    /// Folders can list their children.
    ListChildren,
    /// Folders can be created.
    CreateFolder,
    /// Files can be deleted.
    Delete,
    /// The filesystem supports junctions (mount points).
    Junctions,
    /// File names can be round-tripped through their URI string.
    UriString,
}

/// The set of capabilities of one filesystem instance.
///
/// Iteration order is insertion order, so diagnostics stay deterministic.
#[derive(Debug, Clone, Default)]
pub struct CapabilitySet {
    caps: IndexSet<Capability>,
}

impl CapabilitySet {
    /// Creates an empty capability set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a capability.
    pub fn add(&mut self, cap: Capability) {
        self.caps.insert(cap);
    }

    /// Adds several capabilities at once.
    pub fn add_all(&mut self, caps: &[Capability]) {
        for cap in caps {
            self.caps.insert(*cap);
        }
    }

    /// Simple set membership.
    pub fn contains(&self, cap: Capability) -> bool {
        self.caps.contains(&cap)
    }

    /// Returns the number of capabilities in the set.
    pub fn len(&self) -> usize {
        self.caps.len()
    }

    /// Returns true if no capabilities have been declared.
    pub fn is_empty(&self) -> bool {
        self.caps.is_empty()
    }

    /// Iterates the capabilities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.caps.iter().copied()
    }
}
