//! Warden Core Library
//!
//! Core types, configuration and errors shared by the Warden realm crates.

pub mod config;
pub mod error;
pub mod properties;

pub use config::WardenConfig;
pub use error::{Error, LoginFailure, Result};
pub use properties::RealmProperties;

/// Warden version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Realm property naming the JAAS login context
pub const JAAS_CONTEXT_PARAM: &str = "jaas-ctx";

/// Realm property listing groups assigned to every authenticated user
pub const PARAM_ASSIGN_GROUPS: &str = "assign-groups";

/// Realm property holding group-name mappings
pub const PARAM_GROUP_MAPPING: &str = "group-mapping";
