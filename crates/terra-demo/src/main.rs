//! Headless terrain generator.
//!
//! Loads `terra.ron` (created with defaults on first run), applies CLI
//! overrides, builds the deformed tile field on the GPU and inserts it into
//! an in-memory scene.
//! Run with `cargo run -p terra-demo -- --radius 2 --seed 42`.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use glam::Vec3;
use terra_config::{CliArgs, TerraConfig};
use terra_field::{SceneNodes, TerrainField};
use terra_gpu::{DeformSettings, DeformationEngine, init_gpu_context_blocking};
use tracing::{error, info};

fn config_dir(args: &CliArgs) -> PathBuf {
    args.config.clone().unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("terra")
    })
}

fn run(config: &TerraConfig) -> Result<(), Box<dyn Error>> {
    config.validate()?;

    let ctx = init_gpu_context_blocking()?;
    let engine = DeformationEngine::new(&ctx, DeformSettings::from_config(config))?;
    let field = TerrainField::build(&ctx, &engine, &config.field)?;

    info!(
        "Field: {} tiles ({}x{}), {} vertices, {} bytes of GPU buffers",
        field.tile_count(),
        2 * config.field.radius + 1,
        2 * config.field.radius + 1,
        field.total_vertex_count(),
        field.total_gpu_bytes()
    );

    let mut scene = SceneNodes::new();
    let inserted = field.insert_into(&mut scene);

    // Report what a camera hovering over the centre tile would draw.
    let camera = Vec3::new(0.0, config.noise.amplitude, 0.0);
    let mut per_level = [0usize; 3];
    for node in scene.nodes() {
        let distance = camera.distance(node.world_position);
        if let Some(count) = per_level.get_mut(node.lods.select_level(distance)) {
            *count += 1;
        }
    }
    info!(
        "Inserted {} scene nodes; from {:?}: {} fine, {} medium, {} coarse",
        inserted, camera, per_level[0], per_level[1], per_level[2]
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config_dir = config_dir(&args);

    let mut config = TerraConfig::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        TerraConfig::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    terra_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));
    info!("Config directory: {}", config_dir.display());

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Terrain generation failed: {e}");
            ExitCode::FAILURE
        }
    }
}
