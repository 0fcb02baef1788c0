//! Typed configuration for the Waypoint request router.
//!
//! Configuration is layered (defaults, then a TOML or JSON file, then
//! environment variables) and strict: unknown fields are rejected.
//!
//! ```toml
//! [routing]
//! base_prefix = "/app"
//! default_strategy = "json"   # or "app"
//! options_routes = true
//!
//! [routing.patterns]
//! year = "[0-9]{4}"
//!
//! [logging]
//! enabled = true
//! level = "info,waypoint_router=debug"
//! format = "json"             # or "pretty"
//! ```

#![doc(html_root_url = "https://docs.rs/waypoint-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::RouterConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{DefaultStrategy, LogFormat, LoggingConfig, RoutingConfig};
