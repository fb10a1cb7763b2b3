//! Configuration for the terrain field.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line via clap. Unknown or missing fields fall back to defaults so
//! older files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{ComputeConfig, DebugConfig, FieldConfig, NoiseConfig, TerraConfig};
pub use error::ConfigError;
