//! # Strata Core
//!
//! The core library for Strata - a virtual filesystem abstraction layer that
//! presents files, folders and their content through a uniform object model,
//! backed by pluggable storage providers.
//!
//! ## Overview
//!
//! Strata separates *what* a file is (a scheme-qualified hierarchical name, a
//! type, content, children) from *where* it lives (local disk, an in-memory
//! store, an archive entry, a remote server). Concrete backends only have to
//! satisfy a narrow hook contract; everything else - name normalization,
//! scope-checked resolution, the file-object cache, the attach/detach
//! lifecycle, change notification - lives here and behaves identically across
//! providers.
//!
//! ## Basic Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_core::manager::FileSystemManager;
//!
//! fn example() -> strata_core::error::Result<()> {
//!     let manager = FileSystemManager::builder()
//!         .provider("mem", Arc::new(strata_memory::MemoryFileProvider::new()))
//!         .build();
//!
//!     let file = manager.resolve_file("mem:///tmp/notes.txt")?;
//!     file.create_file()?;
//!     assert!(file.exists()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`name`]: name parsing, normalization and scope-checked resolution
//! - [`error`]: error types and handling
//! - [`types`]: file types and capability flags
//! - [`cache`]: the (filesystem, name) keyed file-object cache
//! - [`file`]: the file-object lifecycle state machine
//! - [`content`]: content access with single-stream enforcement
//! - [`fs`]: the filesystem object, listeners and junctions
//! - [`provider`]: the provider contract, layering and delegation
//! - [`manager`]: provider registry and URI dispatch
//!
//! Provider crates supply the backends:
//!
//! - `strata-memory`: in-memory provider (`mem` scheme)
//! - `strata-local`: local-disk provider (`file` scheme)

pub mod cache;
pub mod content;
pub mod error;
pub mod events;
pub mod file;
pub mod fs;
pub mod manager;
pub mod name;
pub mod options;
pub mod provider;
pub mod selector;
pub mod types;

pub use error::{Result, VfsError};
pub use events::FileListener;
pub use file::{FileHooks, FileObject};
pub use fs::{FileSystem, FileSystemBackend};
pub use manager::FileSystemManager;
pub use name::{FileName, NameScope};
pub use options::FileSystemOptions;
pub use selector::FileSelector;
pub use types::{Capability, FileType};
