//! Mock HTTP serving.
//!
//! `router` compiles resource paths, `handler` runs the per-request
//! matching algorithm behind a single axum fallback, `server` owns one
//! listener per generation.

pub mod handler;
pub mod request;
pub mod router;
pub mod server;

pub use handler::{not_found_message, Generation};
pub use server::{ListenerStopError, RunningServer};
