use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use roadnet3d::config::RoadsConfig;
use roadnet3d::elevation::{ElevationProbe, FlatTerrain, GridTerrain};
use roadnet3d::pipeline::{TileOutput, load_tile, process_tile};
use roadnet3d::scenery::StgWriter;
use roadnet3d::textures::TextureCatalog;

/// Generate road and railway scenery objects from OpenStreetMap extracts
///
/// Examples:
///   # One Overpass extract over flat ground at 400 m
///   roadnet3d -i basel.json -o scenery --ground 400
///
///   # Several extracts over a terrain grid, in parallel
///   roadnet3d -i a.json -i b.json -o scenery --elevation terrain.json
///
///   # Only bridges and their raised approaches
///   roadnet3d -i basel.json -o scenery --ground 400 --only-bridges
#[derive(Parser, Debug)]
#[command(name = "roadnet3d")]
#[command(version, about, long_about = None)]
struct Args {
    /// Overpass JSON extract; repeat for several tiles
    #[arg(short = 'i', long = "input", required = true)]
    inputs: Vec<PathBuf>,

    /// Scenery root the objects and .stg files are written under
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Path to config file (optional, auto-searches roadnet3d.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Terrain grid JSON to probe ground elevation from
    #[arg(long, conflicts_with = "ground")]
    elevation: Option<PathBuf>,

    /// Constant ground elevation in meters when no terrain grid is given
    #[arg(long, allow_hyphen_values = true)]
    ground: Option<f64>,

    /// Keep only bridges and ways lifted off the ground
    #[arg(long)]
    only_bridges: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "roadnet3d=debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_probe(args: &Args) -> Result<Box<dyn ElevationProbe + Sync>> {
    match (&args.elevation, args.ground) {
        (Some(path), _) => {
            let grid = GridTerrain::from_file(path)
                .with_context(|| format!("Failed to load terrain grid: {}", path.display()))?;
            Ok(Box::new(grid))
        }
        (None, Some(elevation)) => Ok(Box::new(FlatTerrain { elevation })),
        (None, None) => bail!("Must provide either --elevation or --ground"),
    }
}

fn tile_name(path: &Path, index: usize) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.replace(|c: char| !c.is_ascii_alphanumeric() && c != '-', "_"))
        .unwrap_or_else(|| format!("tile{index}"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let total_start = Instant::now();

    let mut cfg = match &args.config {
        Some(path) => RoadsConfig::from_path(path)?,
        None => RoadsConfig::load().unwrap_or_default(),
    };
    cfg.only_bridges_and_embankments |= args.only_bridges;

    let probe = load_probe(&args)?;
    let textures = TextureCatalog::default();
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory: {}", args.output.display()))?;

    let writer = StgWriter::spawn(&args.output, cfg.file_prefix.clone());
    let progress = MultiProgress::new();

    let results: Vec<(PathBuf, Result<TileOutput>)> = std::thread::scope(|s| {
        let handles: Vec<_> = args
            .inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let spinner = progress.add(create_spinner(&format!("Processing {}...", input.display())));
                let sender = writer.sender();
                let (cfg, textures, probe, output) = (&cfg, &textures, &*probe, &args.output);
                let handle = s.spawn(move || {
                    let start = Instant::now();
                    let result = load_tile(input).and_then(|data| {
                        process_tile(&tile_name(input, index), data, probe, textures, cfg, output)
                    });
                    match &result {
                        Ok(out) => {
                            for record in &out.records {
                                if sender.send(record.clone()).is_err() {
                                    error!("stg writer stopped early");
                                    break;
                                }
                            }
                            spinner.finish_with_message(format!(
                                "{}: {} ribbons, {} files [{:.1}s]",
                                input.display(),
                                out.ribbons,
                                out.files,
                                start.elapsed().as_secs_f32()
                            ));
                        }
                        Err(e) => spinner.abandon_with_message(format!("{}: failed: {e:#}", input.display())),
                    }
                    result
                });
                (input.clone(), handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(input, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("tile worker panicked")));
                (input, result)
            })
            .collect()
    });

    let stg_files = writer.finish().context("Failed to write .stg files")?;

    let mut failed = 0;
    let (mut files, mut faces) = (0, 0);
    for (input, result) in &results {
        match result {
            Ok(out) => {
                files += out.files;
                faces += out.faces;
            }
            Err(e) => {
                error!("{}: {e:#}", input.display());
                failed += 1;
            }
        }
    }

    info!(
        "Done: {files} objects, {faces} faces, {stg_files} stg files in {:.1}s",
        total_start.elapsed().as_secs_f32()
    );
    println!("Output: {}", args.output.display());

    if failed > 0 {
        bail!("{failed} of {} tiles failed", results.len());
    }
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}
