//! L-System Explorer
//!
//! CLI commands:
//! - gui: Interactive explorer
//! - list: List available presets
//! - stats: Iterate a preset and print sentence metrics
//! - render: Render a preset to PNG + settings text

mod animation;
mod color;
mod config;
mod export;
mod gui;
mod logging;
mod lsystem;
mod render;
mod state;
mod viewport;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use color::{ColorMode, PositionAxis};
use state::Explorer;

#[derive(Parser)]
#[command(name = "lsystem_explorer")]
#[command(about = "Interactive L-system fractal explorer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to lsystems.yaml config
    #[arg(short, long, default_value = "lsystems.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch native GUI explorer
    Gui,

    /// List available presets
    List,

    /// Iterate a preset and print sentence metrics
    Stats {
        /// Preset key
        #[arg(short, long)]
        preset: String,

        /// Number of grammar steps
        #[arg(short, long, default_value = "3")]
        iterations: u32,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Render a preset to <name>.png and <name>_settings.txt
    Render {
        /// Preset key
        #[arg(short, long)]
        preset: String,

        /// Number of grammar steps
        #[arg(short, long, default_value = "3")]
        iterations: u32,

        /// Color mode (flat, palette-gradient, depth, position, per-symbol)
        #[arg(short, long)]
        mode: Option<ColorMode>,

        /// Position sub-mode (horizontal, vertical, radial)
        #[arg(short, long)]
        axis: Option<PositionAxis>,

        /// Square canvas size in pixels
        #[arg(short, long, default_value = "800")]
        size: u32,

        /// Output file name without extension
        #[arg(short, long)]
        name: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let env = config::Env::load();

    // Initialize logging first
    logging::init_logging(&env.log_dir)?;
    tracing::info!("L-System Explorer starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let config = if cli.config.exists() {
        tracing::info!("Loading config from {:?}", cli.config);
        config::Config::load(&cli.config)?
    } else {
        tracing::warn!("Config file not found: {:?}, using defaults", cli.config);
        config::Config::default()
    };
    tracing::info!("Config loaded: {} extra presets", config.presets.len());

    match cli.command {
        Commands::Gui => {
            tracing::info!("Launching native GUI explorer");
            gui::run_viewer(config, PathBuf::from(&env.output_dir))?;
        }

        Commands::List => {
            list_presets(&config);
        }

        Commands::Stats { preset, iterations, json } => {
            let explorer = iterate_preset(&config, &preset, iterations, 1.0)?;
            print_stats(&explorer, json)?;
        }

        Commands::Render {
            preset,
            iterations,
            mode,
            axis,
            size,
            name,
        } => {
            let mut explorer = iterate_preset(&config, &preset, iterations, size as f64)?;
            if let Some(mode) = mode {
                explorer.color_mode = mode;
            }
            if let Some(axis) = axis {
                explorer.position_axis = axis;
            }
            let name = name.unwrap_or_else(|| {
                format!("{}_{}", preset, chrono::Local::now().format("%Y%m%d_%H%M%S"))
            });
            let (png, txt) = export::write_export(&PathBuf::from(&env.output_dir), &name, &explorer)?;
            println!("  {} -> {:?}", preset, png);
            println!("  settings -> {:?}", txt);
        }
    }

    Ok(())
}

/// Load a preset and run up to `iterations` guarded steps
fn iterate_preset(config: &config::Config, key: &str, iterations: u32, canvas: f64) -> anyhow::Result<Explorer> {
    let mut explorer = Explorer::new(config, canvas, canvas);
    explorer.load_preset(key)?;
    for _ in 0..iterations {
        if let Err(e) = explorer.next_iteration() {
            println!("Stopped early: {}", e);
            break;
        }
    }
    Ok(explorer)
}

/// List available presets
fn list_presets(config: &config::Config) {
    let table = config.preset_table();
    println!("Available presets ({}):", table.len());
    println!();
    for preset in table.iter() {
        println!("  - {} [{}] axiom={} angle={}", preset.name, preset.key, preset.spec.axiom, preset.spec.angle);
    }
}

fn print_stats(explorer: &Explorer, json: bool) -> anyhow::Result<()> {
    let system = explorer.system().ok_or(state::ExplorerError::NoSystem)?;
    let stats = export::SystemStats::new(explorer.preset_key(), system);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("Preset:          {}", stats.preset.as_deref().unwrap_or("custom"));
    println!("Iteration:       {}", stats.iteration);
    println!("Sentence length: {} chars", export::group_thousands(stats.sentence_length));
    println!("Segments:        {}", export::group_thousands(stats.segments));
    println!(
        "Bounds:          x {:.2}..{:.2}, y {:.2}..{:.2} ({:.2} x {:.2})",
        stats.bounds.min_x,
        stats.bounds.max_x,
        stats.bounds.min_y,
        stats.bounds.max_y,
        stats.bounds.width(),
        stats.bounds.height()
    );
    println!("Alphabet:        {}", stats.alphabet);
    Ok(())
}
