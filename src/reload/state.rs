use std::{fmt, net::SocketAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeState {
    Starting,
    Serving,
    Reloading,
    Failed,
}

impl fmt::Display for ServeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServeState::Starting => "starting",
            ServeState::Serving => "serving",
            ServeState::Reloading => "reloading",
            ServeState::Failed => "failed",
        })
    }
}

/// What the controller publishes after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeStatus {
    pub state: ServeState,
    /// Number of listeners started so far; bumps on every successful
    /// (re)start.
    pub generation: u64,
    /// Address of the live listener, if any.
    pub address: Option<SocketAddr>,
}

impl ServeStatus {
    pub(crate) fn starting() -> Self {
        ServeStatus {
            state: ServeState::Starting,
            generation: 0,
            address: None,
        }
    }

    pub fn is_serving(&self) -> bool {
        self.state == ServeState::Serving
    }
}

/// Listener address to a user-facing base URL.
pub fn base_url(address: SocketAddr) -> String {
    let ip = address.ip();
    if ip.is_unspecified() || ip.is_loopback() {
        format!("http://localhost:{}", address.port())
    } else {
        format!("http://{address}")
    }
}
