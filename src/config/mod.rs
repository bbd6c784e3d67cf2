//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) and/or CLI flags
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → schema.rs clamping (fps ranges)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc with the listener and every connection
//! ```
//!
//! # Design Decisions
//! - Config is immutable once a gateway is built; a restart applies changes
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{finalize_config, load_config, parse_config, read_config, ConfigError};
pub use schema::{GatewayConfig, LimitsConfig, ListenerConfig, ServerConfig, ViewerConfig};
pub use validation::{validate_config, ValidationError};
