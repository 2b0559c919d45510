//! Serving lifecycle: load, listen, watch, and restart on change.
//!
//! ```text
//! Starting ──load ok──▶ Serving ──event──▶ Reloading ──ok──▶ Serving
//!     │                                        │
//!     └─load error: returned to caller         └─error──▶ Failed (listener stopped)
//! ```

pub mod controller;
pub mod error;
pub mod state;

pub use controller::{ControlEvent, ControllerHandle, ReloadController, ServeOptions, DEFAULT_PORT};
pub use error::ServeError;
pub use state::{base_url, ServeState, ServeStatus};
