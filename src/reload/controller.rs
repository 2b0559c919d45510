use std::{
    collections::BTreeSet,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use tokio::{
    net::TcpListener,
    sync::{mpsc, watch},
};
use tracing::{debug, error, info, warn};

use super::error::ServeError;
use super::state::{base_url, ServeState, ServeStatus};
use crate::config::{self, fixture, LoadError, LoadOptions};
use crate::filewatcher::{FileEvent, FileEventKind, FsWatcher, PathWatcher};
use crate::http::{Generation, ListenerStopError, RunningServer};
use crate::schema::{FsSchemaProvider, JsonSchemaValidator, TypeValidator};

pub const DEFAULT_PORT: u16 = 4000;

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub config_path: PathBuf,
    pub address: SocketAddr,
    /// Directory of `<Type>.json` schemas, also watched for changes.
    pub schema_dir: Option<PathBuf>,
    pub watch: bool,
}

impl ServeOptions {
    pub fn new(config_path: impl Into<PathBuf>, port: u16) -> Self {
        ServeOptions {
            config_path: config_path.into(),
            address: SocketAddr::from(([0, 0, 0, 0], port)),
            schema_dir: None,
            watch: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    File(FileEvent),
    /// Type sources compiled; schemas may have changed.
    TypesCompiled,
    /// Type sources failed to compile; serving stops until they compile.
    TypesFailedToCompile,
    Shutdown,
}

/// Sends events to a running [`ReloadController`] and observes its state.
#[derive(Clone)]
pub struct ControllerHandle {
    events: mpsc::UnboundedSender<ControlEvent>,
    status: watch::Receiver<ServeStatus>,
}

impl ControllerHandle {
    /// Returns false once the controller has shut down.
    pub fn send(&self, event: ControlEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn file_event(&self, kind: FileEventKind, path: impl Into<PathBuf>) -> bool {
        self.send(ControlEvent::File(FileEvent {
            kind,
            path: path.into(),
        }))
    }

    pub fn types_compiled(&self) -> bool {
        self.send(ControlEvent::TypesCompiled)
    }

    pub fn types_failed_to_compile(&self) -> bool {
        self.send(ControlEvent::TypesFailedToCompile)
    }

    pub fn shutdown(&self) -> bool {
        self.send(ControlEvent::Shutdown)
    }

    pub fn status(&self) -> ServeStatus {
        self.status.borrow().clone()
    }

    /// Waits for a status satisfying `f`. `None` when the controller is gone.
    pub async fn wait_until<F>(&mut self, f: F) -> Option<ServeStatus>
    where
        F: FnMut(&ServeStatus) -> bool,
    {
        self.status.wait_for(f).await.ok().map(|status| status.clone())
    }
}

/// Owns the live listener and the watch subscriptions. Every event goes
/// through one queue, so reloads never overlap.
pub struct ReloadController<W = FsWatcher> {
    config_path: PathBuf,
    schema_dir: Option<PathBuf>,
    address: SocketAddr,
    server: Option<RunningServer>,
    watcher: Option<W>,
    watched: BTreeSet<PathBuf>,
    events: mpsc::UnboundedReceiver<ControlEvent>,
    status: watch::Sender<ServeStatus>,
}

impl ReloadController<FsWatcher> {
    /// Loads the configuration and starts serving it. A failure here is
    /// returned as is and no watcher is installed.
    pub async fn start(options: ServeOptions) -> Result<(Self, ControllerHandle), ServeError> {
        Self::start_with(options, |events| {
            FsWatcher::new(move |event| {
                let _ = events.send(ControlEvent::File(event));
            })
        })
        .await
    }
}

impl<W: PathWatcher> ReloadController<W> {
    /// Like [`ReloadController::start`] with a caller-supplied watcher,
    /// created only when `options.watch` is set and the first load succeeded.
    pub async fn start_with<F>(
        options: ServeOptions,
        make_watcher: F,
    ) -> Result<(Self, ControllerHandle), ServeError>
    where
        F: FnOnce(mpsc::UnboundedSender<ControlEvent>) -> notify::Result<W>,
    {
        let config_path = absolute(&options.config_path)?;
        let schema_dir = options
            .schema_dir
            .as_deref()
            .map(absolute)
            .transpose()?;

        let (events_tx, events) = mpsc::unbounded_channel();
        let (status, status_rx) = watch::channel(ServeStatus::starting());
        let mut controller = ReloadController {
            config_path,
            schema_dir,
            address: options.address,
            server: None,
            watcher: None,
            watched: BTreeSet::new(),
            events,
            status,
        };

        let fixture_paths = controller.launch().await?;
        if options.watch {
            match make_watcher(events_tx.clone()) {
                Ok(watcher) => controller.watcher = Some(watcher),
                Err(err) => {
                    controller.stop_listener().await?;
                    return Err(err.into());
                }
            }
            controller.sync_watches(fixture_paths);
        }

        let handle = ControllerHandle {
            events: events_tx,
            status: status_rx,
        };
        Ok((controller, handle))
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(RunningServer::local_addr)
    }

    pub fn watched(&self) -> &BTreeSet<PathBuf> {
        &self.watched
    }

    /// Processes events until shutdown, then stops the listener.
    pub async fn run(mut self) -> Result<(), ServeError> {
        while let Some(event) = self.events.recv().await {
            match event {
                ControlEvent::File(event) => self.on_file_event(event).await,
                ControlEvent::TypesCompiled => {
                    debug!("types compiled");
                    self.reload().await;
                }
                ControlEvent::TypesFailedToCompile => self.on_compile_failure().await,
                ControlEvent::Shutdown => break,
            }
        }

        info!("shutting down");
        self.stop_listener().await?;
        Ok(())
    }

    async fn on_file_event(&mut self, event: FileEvent) {
        info!("{} event detected for {}", event.kind, event.path.display());

        if event.kind == FileEventKind::Unlink && self.watched.contains(&event.path) {
            if let Some(watcher) = self.watcher.as_mut() {
                if let Err(err) = watcher.rearm(&event.path) {
                    warn!(path = %event.path.display(), error = %err, "could not re-watch path");
                }
            }
        }

        self.reload().await;
    }

    async fn on_compile_failure(&mut self) {
        warn!("source has compilation errors; fix them to resume serving");
        if let Err(err) = self.stop_listener().await {
            error!(error = %err, "could not stop listener");
        }
        self.publish(ServeState::Failed, None);
    }

    async fn reload(&mut self) {
        info!("Attempting to restart ncdc server");
        self.publish(ServeState::Reloading, self.local_addr());

        if let Err(err) = self.stop_listener().await {
            return self.fail(err.into());
        }
        match self.launch().await {
            Ok(fixture_paths) => self.sync_watches(fixture_paths),
            Err(err) => self.fail(err),
        }
    }

    /// Loads the configuration and serves it on a fresh listener. Returns
    /// the files the configuration was built from.
    async fn launch(&mut self) -> Result<BTreeSet<PathBuf>, ServeError> {
        let validator: Arc<dyn TypeValidator> = Arc::new(JsonSchemaValidator::new(
            FsSchemaProvider::new(self.schema_dir.clone()),
        ));
        let options = LoadOptions {
            validator: Some(Arc::clone(&validator)),
            force_request_validation: false,
        };
        let loaded = config::load(&self.config_path, &options)?;

        let bind_error = |address, source| ServeError::Bind { address, source };
        let listener = TcpListener::bind(self.address)
            .await
            .map_err(|e| bind_error(self.address, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| bind_error(self.address, e))?;

        let url = base_url(local_addr);
        let generation = Generation::new(loaded.resources, Some(validator), url.clone());
        let server =
            RunningServer::start(listener, generation).map_err(|e| bind_error(local_addr, e))?;

        // Restarts reuse the port picked by the first bind.
        self.address = local_addr;
        self.server = Some(server);
        self.status.send_modify(|status| {
            status.state = ServeState::Serving;
            status.generation += 1;
            status.address = Some(local_addr);
        });
        info!("Endpoints are being served on {url}");

        Ok(loaded.fixture_paths)
    }

    async fn stop_listener(&mut self) -> Result<(), ListenerStopError> {
        match self.server.take() {
            Some(server) => server.stop().await,
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: ServeError) {
        error!("Could not restart ncdc server\n{err}");
        self.publish(ServeState::Failed, None);
    }

    fn publish(&self, state: ServeState, address: Option<SocketAddr>) {
        debug!(%state, "serve state changed");
        self.status.send_modify(|status| {
            status.state = state;
            status.address = address;
        });
    }

    /// Watches the files of the latest successful load: newly referenced
    /// paths are added, paths no longer referenced are dropped.
    fn sync_watches(&mut self, fixture_paths: BTreeSet<PathBuf>) {
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };

        let mut desired = fixture_paths;
        desired.insert(self.config_path.clone());
        if let Some(dir) = &self.schema_dir {
            desired.insert(dir.clone());
        }

        for path in self.watched.difference(&desired) {
            if let Err(err) = watcher.unwatch(path) {
                warn!(path = %path.display(), error = %err, "could not stop watching");
            }
        }

        let mut watched = BTreeSet::new();
        for path in desired {
            if self.watched.contains(&path) {
                watched.insert(path);
                continue;
            }
            match watcher.add(&path) {
                Ok(()) => {
                    watched.insert(path);
                }
                Err(err) => warn!(path = %path.display(), error = %err, "could not watch"),
            }
        }
        self.watched = watched;
    }
}

fn absolute(path: &Path) -> Result<PathBuf, ServeError> {
    fixture::absolute_path(path).map_err(|e| {
        ServeError::Load(LoadError::ConfigRead {
            path: path.to_path_buf(),
            source: e.into(),
        })
    })
}
