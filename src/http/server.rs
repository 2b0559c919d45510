use std::{io, net::SocketAddr, sync::Arc};

use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tracing::{debug, info};

use super::handler::{router, Generation};

#[derive(Debug, thiserror::Error)]
pub enum ListenerStopError {
    #[error("listener task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("listener stopped with an error: {0}")]
    Serve(#[from] io::Error),
}

/// One listener serving one generation of resources.
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<io::Result<()>>,
}

impl RunningServer {
    /// Serves `generation` on an already bound listener.
    pub fn start(listener: TcpListener, generation: Generation) -> io::Result<Self> {
        let local_addr = listener.local_addr()?;
        let routes = generation.routes.len();
        let app = router(Arc::new(generation));

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        debug!(address = %local_addr, routes, "listener started");
        Ok(RunningServer {
            local_addr,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting connections and waits for in-flight ones to finish.
    /// A listener that already stopped on its own counts as stopped.
    pub async fn stop(mut self) -> Result<(), ListenerStopError> {
        let already_stopped = self.task.is_finished();
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        match self.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) if already_stopped => {
                debug!(error = %e, "listener was not running");
            }
            Err(e) if already_stopped => {
                debug!(error = %e, "listener was not running");
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(e) => return Err(e.into()),
        }

        info!(address = %self.local_addr, "listener stopped");
        Ok(())
    }
}
