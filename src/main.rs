mod app;
mod braille;
mod camera;
mod coastline;
mod colors;
mod error;
mod fetch;
mod geo;
mod help;
mod order;
mod panel;
mod scene;
mod settings;
mod terminal;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fetch::{Fetcher, OrderSource};
use geo::{classify, distance_km, Coordinate, DisplayMode, PARIS};
use settings::Settings;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orderglobe")]
#[command(version)]
#[command(about = "Live order tracker: Île-de-France orders on a map, the rest on a 3D globe", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/orderglobe/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write logs to this file instead of the default destination
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the endpoint and show the latest order live
    Watch {
        /// Order endpoint URL
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Delay between the end of one fetch and the start of the next
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// HTTP request timeout
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },

    /// Fetch the latest order once and print it
    Once {
        /// Order endpoint URL
        #[arg(short, long)]
        endpoint: Option<String>,

        /// Also print the scene to stdout (no interactive display)
        #[arg(short, long)]
        print: bool,

        /// Columns of the printed scene
        #[arg(long, default_value = "100")]
        width: u16,

        /// Rows of the printed scene
        #[arg(long, default_value = "32")]
        height: u16,
    },

    /// Show how a coordinate would be displayed
    #[command(allow_negative_numbers = true)]
    Locate {
        /// Latitude in decimal degrees
        lat: f64,

        /// Longitude in decimal degrees
        lng: f64,
    },
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating log directory {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("cannot install logger: {e}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The alternate screen owns the terminal in watch mode, so logs go to a file
    let log_file = match (&cli.command, cli.log_file.clone()) {
        (_, Some(path)) => Some(path),
        (Commands::Watch { .. }, None) => Some(Settings::log_path()),
        _ => None,
    };
    init_logging(cli.verbose, log_file.as_deref())?;

    let mut settings = match cli.config.as_deref() {
        Some(path) => Settings::read(path)?,
        None => Settings::load(),
    };

    match cli.command {
        Commands::Watch {
            endpoint,
            interval_ms,
            timeout_ms,
        } => {
            if let Some(endpoint) = endpoint {
                settings.source.endpoint = endpoint;
            }
            if let Some(ms) = interval_ms {
                settings.source.poll_interval_ms = ms;
            }
            if let Some(ms) = timeout_ms {
                settings.source.timeout_ms = ms;
            }
            app::run(&settings)?;
        }
        Commands::Once {
            endpoint,
            print,
            width,
            height,
        } => {
            if let Some(endpoint) = endpoint {
                settings.source.endpoint = endpoint;
            }
            let fetcher = Fetcher::new(&settings.source, settings.record.clone());
            let order = fetcher
                .fetch()
                .with_context(|| format!("fetching {}", fetcher.endpoint()))?;

            if print {
                let (term, _) = app::render_order(&order, width.max(20), height.max(8), &settings.display)?;
                print!("{}", term.to_ansi());
            }
            println!("mode: {}", classify(order.location).label());
            println!("coordinates: {}", order.location);
            for line in panel::summary_lines(&order) {
                println!("{line}");
            }
        }
        Commands::Locate { lat, lng } => {
            let coord = Coordinate::new(lat, lng);
            if !lat.is_finite() || !lng.is_finite() || lat.abs() > 90.0 || lng.abs() > 180.0 {
                anyhow::bail!("{lat},{lng} is not a valid coordinate");
            }
            let mode = classify(coord);
            println!("mode: {}", mode.label());
            println!("distance from Paris: {:.1} km", distance_km(PARIS, coord));
            if mode == DisplayMode::Globe {
                let pose = camera::frame_camera(PARIS, coord);
                println!("zoom factor: {:.3}", pose.zoom_factor);
                println!(
                    "camera: ({:.2}, {:.2}, {:.2}) looking at ({:.2}, {:.2}, {:.2})",
                    pose.position.x, pose.position.y, pose.position.z,
                    pose.target.x, pose.target.y, pose.target.z,
                );
            }
        }
    }

    Ok(())
}
