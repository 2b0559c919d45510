//! Configuration loading.
//!
//! ```text
//! config.yml
//!     → raw.rs         (loosely typed serde shapes)
//!     → validation.rs  (collects every field error)
//!     → validated.rs   (well-formed intermediate)
//!     → loader.rs      (fixtures read, resources built, bodies type-checked)
//!     → Vec<Resource> + fixture path set
//! ```

pub mod error;
pub mod fixture;
pub mod loader;
pub mod raw;
pub mod validated;
pub mod validation;

pub use error::LoadError;
pub use loader::{load, LoadOptions, LoadedConfig};
