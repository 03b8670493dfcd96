//! Error types for the Strata virtual filesystem.

use crate::name::{FileName, NameScope};
use thiserror::Error;

/// Comprehensive error type for all Strata operations.
///
/// Provider hooks report their own failures through the same type; the
/// lifecycle layer wraps anything that is not already a domain error into
/// [`VfsError::Provider`], attaching the file name and the operation that
/// failed.
#[derive(Debug, Error)]
pub enum VfsError {
    /// A `%` escape was not followed by two hex digits, or decoding produced
    /// an invalid string.
    #[error("invalid escape sequence '{sequence}' in '{input}'")]
    InvalidEscapeSequence { input: String, sequence: String },

    /// A `..` element tried to ascend past the filesystem root.
    #[error("relative path '{path}' would ascend past the filesystem root")]
    InvalidRelativePath { path: String },

    /// A URI could not be parsed.
    #[error("invalid URI '{uri}': {reason}")]
    MalformedUri { uri: String, reason: String },

    /// A resolved name fell outside the requested scope.
    #[error("'{name}' does not resolve within scope {scope} of '{base}'")]
    InvalidScope {
        base: String,
        name: String,
        scope: NameScope,
    },

    /// No provider is registered for the scheme.
    #[error("no provider registered for scheme '{scheme}'")]
    UnknownScheme { scheme: String },

    /// A name was resolved against a filesystem with a different root.
    #[error("'{name}' does not belong to the filesystem rooted at '{root_uri}'")]
    MismatchedFileSystem { name: FileName, root_uri: String },

    /// An existing file has a type incompatible with the requested operation,
    /// e.g. `create_file` on an existing folder.
    #[error("'{name}' already exists with a mismatched type")]
    TypeMismatch { name: FileName },

    /// A mutation was attempted on a non-writable target.
    #[error("'{name}' is read-only")]
    ReadOnly { name: FileName },

    /// The filesystem does not have the capability for the operation.
    #[error("operation '{operation}' is not supported by this filesystem")]
    NotSupported { operation: &'static str },

    /// The operation requires the file to exist.
    #[error("file '{name}' does not exist")]
    NotFound { name: FileName },

    /// The operation requires a folder.
    #[error("'{name}' is not a folder")]
    NotFolder { name: FileName },

    /// A second stream was opened while one is already active on the same
    /// content object.
    #[error("a stream is already open on '{name}'")]
    StreamInUse { name: FileName },

    /// `copy_from` was given a source that does not exist.
    #[error("cannot copy from missing file '{name}'")]
    CopyMissingSource { name: FileName },

    /// Layered filesystems nested past the dispatch guard.
    #[error("layered filesystems nested deeper than {max_depth} levels")]
    LayerDepthExceeded { max_depth: usize },

    /// A storage backend ran out of room.
    #[error("backing store is full: current size {current_size} bytes, maximum {max_size} bytes")]
    StoreFull {
        current_size: usize,
        max_size: usize,
    },

    /// An arbitrary backend failure, wrapped with the name and operation.
    #[error("provider error during '{operation}' on '{name}'")]
    Provider {
        name: FileName,
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O error from the underlying system.
    #[error("I/O error")]
    Io {
        #[from]
        #[source]
        source: std::io::Error,
    },
}

impl VfsError {
    /// Wraps a hook failure with the name and operation it belongs to.
    ///
    /// Domain errors pass through unchanged; only raw I/O errors and
    /// already-wrapped provider errors from a lower layer get the
    /// [`VfsError::Provider`] treatment.
    pub fn wrap(self, name: &FileName, operation: &'static str) -> VfsError {
        match self {
            VfsError::Io { source } => VfsError::Provider {
                name: name.clone(),
                operation,
                source: Box::new(source),
            },
            other => other,
        }
    }

    /// Builds a provider error from an arbitrary source.
    pub fn provider(
        name: &FileName,
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> VfsError {
        VfsError::Provider {
            name: name.clone(),
            operation,
            source: Box::new(source),
        }
    }
}

/// Result type alias for Strata operations.
pub type Result<T> = std::result::Result<T, VfsError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::FileName;

    #[test]
    fn test_error_display() {
        let err = VfsError::InvalidEscapeSequence {
            input: "/a%2".to_string(),
            sequence: "%2".to_string(),
        };
        assert_eq!(err.to_string(), "invalid escape sequence '%2' in '/a%2'");

        let err = VfsError::InvalidRelativePath {
            path: "/a/../..".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "relative path '/a/../..' would ascend past the filesystem root"
        );

        let err = VfsError::UnknownScheme {
            scheme: "gopher".to_string(),
        };
        assert_eq!(err.to_string(), "no provider registered for scheme 'gopher'");

        let name = FileName::parse_uri("mem:///a/b.txt").unwrap();
        let err = VfsError::StreamInUse { name: name.clone() };
        assert_eq!(err.to_string(), "a stream is already open on 'mem:///a/b.txt'");

        let err = VfsError::NotSupported { operation: "rename" };
        assert_eq!(
            err.to_string(),
            "operation 'rename' is not supported by this filesystem"
        );
    }

    #[test]
    fn test_io_error_wrapping() {
        let name = FileName::parse_uri("mem:///x").unwrap();
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: VfsError = io_err.into();
        let wrapped = err.wrap(&name, "read");
        assert!(matches!(wrapped, VfsError::Provider { operation: "read", .. }));

        // Domain errors pass through unchanged.
        let err = VfsError::NotFolder { name: name.clone() };
        let wrapped = err.wrap(&name, "list-children");
        assert!(matches!(wrapped, VfsError::NotFolder { .. }));
    }
}
