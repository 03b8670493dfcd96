//! Change notification for structural file events.

use crate::file::FileObject;

/// Receives change events for one file name.
///
/// Listeners are registered on a [`FileSystem`](crate::fs::FileSystem) for an
/// exact name; events for other names are never delivered. All methods have
/// empty defaults so a listener only implements what it cares about.
///
/// Callbacks run on the thread performing the mutation. A panicking listener
/// propagates to the mutator; the registry snapshots its list before
/// delivering, so one listener can never prevent the others from running.
pub trait FileListener: Send + Sync {
    /// The file was created.
    fn file_created(&self, file: &FileObject) {
        let _ = file;
    }

    /// The file was deleted.
    fn file_deleted(&self, file: &FileObject) {
        let _ = file;
    }

    /// The file's content was changed.
    fn file_changed(&self, file: &FileObject) {
        let _ = file;
    }
}
