pub mod watcher;

pub use watcher::{FileEvent, FileEventKind, FsWatcher, PathWatcher};
