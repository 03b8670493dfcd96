//! # Strata Memory
//!
//! In-memory provider for the Strata virtual filesystem, serving the `mem`
//! scheme. Each filesystem owns a lock-guarded path-to-node map with the
//! root folder preexisting; content lives in shared `Bytes` buffers, so
//! reads are snapshots and never block writers.
//!
//! Useful as scratch storage and as the reference backend for exercising
//! the core lifecycle end to end.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use strata_core::manager::FileSystemManager;
//! use strata_memory::MemoryFileProvider;
//!
//! let manager = FileSystemManager::builder()
//!     .provider("mem", Arc::new(MemoryFileProvider::new()))
//!     .build();
//! let file = manager.resolve_file("mem:///notes.txt")?;
//! file.content().write_bytes(b"hello")?;
//! ```

mod hooks;
mod provider;
pub mod store;

pub use provider::{MemoryFileProvider, MemoryFsOptionBuilder};
pub use store::{MemNode, MemStore};
