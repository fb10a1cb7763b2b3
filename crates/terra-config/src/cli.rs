//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::TerraConfig;

/// Terrain generator command-line arguments.
///
/// CLI values override settings loaded from `terra.ron`.
#[derive(Parser, Debug)]
#[command(name = "terra", about = "GPU-deformed terrain field generator")]
pub struct CliArgs {
    /// Grid radius; the field holds (2k+1)^2 tiles.
    #[arg(long)]
    pub radius: Option<u32>,

    /// Noise seed.
    #[arg(long)]
    pub seed: Option<u32>,

    /// Workgroup width of the displacement kernel.
    #[arg(long)]
    pub thread_width: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl TerraConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(radius) = args.radius {
            self.field.radius = radius;
        }
        if let Some(seed) = args.seed {
            self.noise.seed = seed;
        }
        if let Some(width) = args.thread_width {
            self.compute.thread_width = width;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
