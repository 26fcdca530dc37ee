//! Parley core crate - shared types, errors, and configuration.
//!
//! Every other crate in the workspace depends on this one. It defines the
//! message/session data model, the top-level error enum, and the TOML
//! configuration loaded by the application shell.

pub mod config;
pub mod error;
pub mod types;

pub use config::ParleyConfig;
pub use error::{ParleyError, Result};
pub use types::{Message, OrderRecord, Role, Session};
