use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use notify::{
    event::{ModifyKind, RenameMode},
    recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Add,
    Change,
    Unlink,
}

impl fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileEventKind::Add => "add",
            FileEventKind::Change => "change",
            FileEventKind::Unlink => "unlink",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub kind: FileEventKind,
    pub path: PathBuf,
}

/// A set of watched paths that can grow and shrink while it is live.
pub trait PathWatcher: Send {
    fn add(&mut self, path: &Path) -> notify::Result<()>;

    fn unwatch(&mut self, path: &Path) -> notify::Result<()>;

    /// Subscribes `path` again after it was deleted, so that recreating it is
    /// noticed.
    fn rearm(&mut self, path: &Path) -> notify::Result<()> {
        self.unwatch(path)?;
        self.add(path)
    }
}

/// How a subscribed path is observed: files through their parent directory,
/// directories recursively.
#[derive(Debug, Clone)]
struct Target {
    watched: PathBuf,
    recursive: bool,
}

#[derive(Debug, Default)]
struct Subscriptions {
    paths: HashMap<PathBuf, Target>,
    /// Notify watches with the number of subscriptions sharing them.
    watches: HashMap<PathBuf, (usize, bool)>,
}

impl Subscriptions {
    fn covers(&self, path: &Path) -> bool {
        self.paths.contains_key(path)
            || self
                .paths
                .iter()
                .any(|(subscribed, target)| target.recursive && path.starts_with(subscribed))
    }
}

/// File system watcher delivering [`FileEvent`]s for subscribed paths only.
///
/// Files are watched through their parent directory so a file that is
/// deleted and recreated keeps producing events.
pub struct FsWatcher {
    watcher: RecommendedWatcher,
    subscriptions: Arc<Mutex<Subscriptions>>,
}

impl FsWatcher {
    pub fn new<F>(on_event: F) -> notify::Result<Self>
    where
        F: Fn(FileEvent) + Send + 'static,
    {
        let subscriptions = Arc::new(Mutex::new(Subscriptions::default()));
        let shared = Arc::clone(&subscriptions);

        let watcher = recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let covered: Vec<PathBuf> = {
                    let subscriptions = shared.lock().unwrap_or_else(PoisonError::into_inner);
                    event
                        .paths
                        .into_iter()
                        .filter(|path| subscriptions.covers(path))
                        .collect()
                };
                for path in covered {
                    if let Some(kind) = classify(&event.kind, &path) {
                        debug!(%kind, path = %path.display(), "file event");
                        on_event(FileEvent { kind, path });
                    }
                }
            }
            Err(err) => error!(error = %err, "watch error"),
        })?;

        Ok(FsWatcher {
            watcher,
            subscriptions,
        })
    }

    /// Creates a watcher subscribed to every path in `paths`.
    pub fn watch<I, F>(paths: I, on_event: F) -> notify::Result<Self>
    where
        I: IntoIterator<Item = PathBuf>,
        F: Fn(FileEvent) + Send + 'static,
    {
        let mut watcher = FsWatcher::new(on_event)?;
        for path in paths {
            watcher.add(&path)?;
        }
        Ok(watcher)
    }

    pub fn subscribed(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.lock().paths.keys().cloned().collect();
        paths.sort();
        paths
    }

    fn lock(&self) -> MutexGuard<'_, Subscriptions> {
        self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// The subscriptions lock is never held across notify calls: the notify
// thread takes it while dispatching events.
impl PathWatcher for FsWatcher {
    fn add(&mut self, path: &Path) -> notify::Result<()> {
        if self.lock().paths.contains_key(path) {
            return Ok(());
        }

        let target = if path.is_dir() {
            Target {
                watched: path.to_path_buf(),
                recursive: true,
            }
        } else {
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            Target {
                watched: parent.to_path_buf(),
                recursive: false,
            }
        };

        let (count, recursive) = self
            .lock()
            .watches
            .get(&target.watched)
            .copied()
            .unwrap_or((0, false));
        if count == 0 || (target.recursive && !recursive) {
            let mode = if target.recursive || recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            self.watcher.watch(&target.watched, mode)?;
        }

        let mut subscriptions = self.lock();
        subscriptions.watches.insert(
            target.watched.clone(),
            (count + 1, recursive || target.recursive),
        );
        subscriptions.paths.insert(path.to_path_buf(), target);
        info!(path = %path.display(), "watching");
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> notify::Result<()> {
        let released = {
            let mut subscriptions = self.lock();
            let Some(target) = subscriptions.paths.remove(path) else {
                return Ok(());
            };
            let (count, recursive) = subscriptions
                .watches
                .get(&target.watched)
                .copied()
                .unwrap_or((1, target.recursive));
            if count <= 1 {
                subscriptions.watches.remove(&target.watched);
                Some(target.watched)
            } else {
                subscriptions
                    .watches
                    .insert(target.watched, (count - 1, recursive));
                None
            }
        };

        if let Some(watched) = released {
            match self.watcher.unwatch(&watched) {
                Ok(()) => {}
                // The directory may be gone along with its watch.
                Err(err) if !watched.exists() => {
                    debug!(error = %err, path = %watched.display(), "watch already gone");
                }
                Err(err) => return Err(err),
            }
        }

        debug!(path = %path.display(), "stopped watching");
        Ok(())
    }
}

fn classify(kind: &EventKind, path: &Path) -> Option<FileEventKind> {
    match kind {
        EventKind::Create(_) => Some(FileEventKind::Add),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(FileEventKind::Unlink),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(FileEventKind::Add),
        EventKind::Modify(ModifyKind::Name(_)) => Some(if path.exists() {
            FileEventKind::Add
        } else {
            FileEventKind::Unlink
        }),
        EventKind::Modify(_) => Some(FileEventKind::Change),
        EventKind::Remove(_) => Some(FileEventKind::Unlink),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
    }
}
