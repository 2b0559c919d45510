use std::{io, net::SocketAddr};

use crate::config::LoadError;
use crate::http::ListenerStopError;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("could not listen on {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    ListenerStop(#[from] ListenerStopError),

    #[error("could not watch for file changes: {0}")]
    Watch(#[from] notify::Error),
}
