#![deny(unsafe_code)]
//! CLI binary for the cloudfield particle background.
//!
//! Subcommands:
//! - `render` : generate a field, run N frames, write a PNG
//! - `noise` : rasterize the noise field to a grayscale PNG
//! - `info` : generate a field and print its diagnostics

mod error;

use clap::{Parser, Subcommand};
use cloudfield_core::{CanvasSize, Srgb};
use cloudfield_raster::RasterCanvas;
use cloudfield_sim::{FieldConfig, FieldController, FieldInfo, NoiseField};
use error::CliError;
use glam::DVec2;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloudfield", about = "Layered cloud particle background")]
struct Cli {
    /// Output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a field, animate it for N frames and write a PNG snapshot.
    Render {
        /// Canvas width in pixels.
        #[arg(short = 'W', long, default_value_t = 800)]
        width: usize,

        /// Canvas height in pixels.
        #[arg(short = 'H', long, default_value_t = 600)]
        height: usize,

        /// Number of frames to simulate before the snapshot.
        #[arg(short, long, default_value_t = 120)]
        frames: usize,

        /// Frame duration in milliseconds.
        #[arg(short, long, default_value_t = 16.67)]
        delta: f64,

        /// Seed for the noise field and cloud layout.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Coherence level in [-1, 1]; enables biofeedback modulation.
        #[arg(long, allow_hyphen_values = true)]
        coherence: Option<f64>,

        /// Camera offset X, for parallax.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        camera_x: f64,

        /// Camera offset Y, for parallax.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        camera_y: f64,

        /// Background color as hex.
        #[arg(long, default_value = "#0e1624")]
        background: String,

        /// Output file path.
        #[arg(short, long, default_value = "clouds.png")]
        output: PathBuf,

        /// Field configuration as a JSON string.
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Rasterize the noise field at a point in time to a grayscale PNG.
    Noise {
        #[arg(short = 'W', long, default_value_t = 512)]
        width: usize,

        #[arg(short = 'H', long, default_value_t = 512)]
        height: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Noise time in milliseconds.
        #[arg(short, long, default_value_t = 0.0)]
        time: f64,

        /// Block size in pixels; one sample per block.
        #[arg(short, long, default_value_t = 4)]
        resolution: usize,

        #[arg(short, long, default_value = "noise.png")]
        output: PathBuf,

        /// Field configuration as a JSON string (octaves are used).
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Generate a field and print layer and particle diagnostics.
    Info {
        #[arg(short = 'W', long, default_value_t = 800)]
        width: usize,

        #[arg(short = 'H', long, default_value_t = 600)]
        height: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value = "{}")]
        params: String,
    },
}

/// Parses `--params` and applies the seed flag on top.
fn load_config(params: &str, seed: u64) -> Result<FieldConfig, CliError> {
    let params: serde_json::Value = serde_json::from_str(params)
        .map_err(|e| CliError::Input(format!("invalid --params JSON: {e}")))?;
    let mut config = FieldConfig::from_json(&params).map_err(|e| CliError::Input(e.to_string()))?;
    config.seed = seed;
    Ok(config)
}

fn canvas_size(width: usize, height: usize) -> Result<CanvasSize, CliError> {
    Ok(CanvasSize::new(width as f64, height as f64)?)
}

fn print_info(info: &FieldInfo, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(info)?);
        return Ok(());
    }
    println!(
        "seed {} ({} layers, {} particles, {} frames, t = {:.1} ms)",
        info.config.seed, info.layer_count, info.particle_count, info.frame_count, info.time
    );
    for layer in &info.layers {
        println!(
            "  depth {:.2}: {:>4} particles in {} shapes (target {}, scale x{:.2}, alpha x{:.2}, parallax {:.2})",
            layer.depth,
            layer.particle_count,
            layer.shape_count,
            layer.particle_target,
            layer.depth_scale,
            layer.depth_alpha,
            layer.parallax_factor
        );
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Render {
            width,
            height,
            frames,
            delta,
            seed,
            coherence,
            camera_x,
            camera_y,
            background,
            output,
            params,
        } => {
            let mut config = load_config(&params, seed)?;
            config.biofeedback_mode |= coherence.is_some();
            let background =
                Srgb::from_hex(&background).map_err(|e| CliError::Input(e.to_string()))?;
            let size = canvas_size(width, height)?;

            let mut field = FieldController::new(config)?;
            if let Some(level) = coherence {
                field.set_coherence(level);
            }
            let particles = field.generate(size, None)?;
            tracing::info!(seed, particles, frames, "field generated");

            (0..frames).try_for_each(|_| field.update(delta))?;

            let mut canvas = RasterCanvas::new(size, background)?;
            field.display(&mut canvas, DVec2::new(camera_x, camera_y))?;
            cloudfield_raster::snapshot::write_png(&canvas, &output)?;

            if cli.json {
                let info = serde_json::json!({
                    "width": width,
                    "height": height,
                    "frames": frames,
                    "seed": seed,
                    "particles": field.particle_count(),
                    "coherence": field.coherence(),
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "rendered {particles} particles ({width}x{height}, {frames} frames, seed {seed}) -> {}",
                    output.display()
                );
            }
        }
        Command::Noise {
            width,
            height,
            seed,
            time,
            resolution,
            output,
            params,
        } => {
            let config = load_config(&params, seed)?;
            let noise = NoiseField::new(config.noise_seed(), config.octaves)?;
            let field = noise.visualize(width, height, resolution, time)?;
            cloudfield_raster::snapshot::write_field_png(&field, &output)?;

            if cli.json {
                let info = serde_json::json!({
                    "width": width,
                    "height": height,
                    "seed": seed,
                    "time": time,
                    "resolution": resolution,
                    "mean": field.mean(),
                    "output": output.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                eprintln!(
                    "noise {width}x{height} at t = {time} ms (mean {:.3}) -> {}",
                    field.mean(),
                    output.display()
                );
            }
        }
        Command::Info {
            width,
            height,
            seed,
            params,
        } => {
            let config = load_config(&params, seed)?;
            let mut field = FieldController::new(config)?;
            field.generate(canvas_size(width, height)?, None)?;
            print_info(&field.info(), cli.json)?;
        }
    }

    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cloudfield=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = cli.json;
    if let Err(e) = run(cli) {
        if json_mode {
            let j = serde_json::json!({"error": e.to_string(), "exit_code": e.exit_code()});
            eprintln!("{}", serde_json::to_string_pretty(&j).unwrap_or_default());
        } else {
            eprintln!("error: {e}");
        }
        process::exit(e.exit_code());
    }
}
