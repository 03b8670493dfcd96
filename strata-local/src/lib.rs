//! # Strata Local
//!
//! Local-disk provider for the Strata virtual filesystem, serving the
//! `file` scheme over `std::fs`. Names take the form
//! `file:///absolute/path`; content streams and random access map directly
//! onto `std::fs::File`.
//!
//! Unix-oriented: hidden-file detection follows the dotfile convention and
//! no Windows path translation is attempted.

mod hooks;
mod provider;

pub use provider::LocalFileProvider;
