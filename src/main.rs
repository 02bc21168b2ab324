// this_file: src/main.rs
//! drawcache CLI - render JSON scenes through the texture cache

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use drawcache::scene::{self, Scene};
use drawcache::software::SoftwareBackend;
use drawcache::{logging, CacheConfig, Capacity, Renderer};
use log::{error, info};
use serde::Serialize;
use std::io::{self, Read};

/// drawcache - cached shape and glyph rendering
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: String,

    /// Enable quiet mode (only errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "log_level")]
    quiet: bool,

    /// Prefix log lines with timestamps
    #[arg(long, global = true)]
    timestamps: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw a scene and write the last frame as PNG
    Render {
        /// Scene file
        scene: Utf8PathBuf,

        /// Output PNG path
        #[arg(short, long, default_value = "frame.png")]
        output: Utf8PathBuf,

        /// Override the scene's frame count
        #[arg(short, long)]
        frames: Option<u32>,

        /// Bound the cache by entry count
        #[arg(long, conflicts_with = "max_bytes")]
        max_entries: Option<usize>,

        /// Bound the cache by texture bytes
        #[arg(long)]
        max_bytes: Option<usize>,
    },

    /// Validate a scene file
    Validate {
        /// Input file (uses stdin if not specified)
        #[arg(short, long)]
        input: Option<Utf8PathBuf>,
    },

    /// Show version information
    Version,
}

/// Statistics printed after a render.
#[derive(Serialize)]
struct RenderReport {
    frames: u32,
    output: Utf8PathBuf,
    cache: drawcache::CacheStats,
    backend: drawcache::software::BackendStats,
    atlases: usize,
    live_textures: usize,
    elapsed_ms: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(&cli.log_level, cli.quiet, cli.timestamps);

    match cli.command {
        Commands::Render {
            scene,
            output,
            frames,
            max_entries,
            max_bytes,
        } => {
            let capacity = match (max_entries, max_bytes) {
                (Some(entries), _) => Some(Capacity::Entries(entries)),
                (None, Some(bytes)) => Some(Capacity::Bytes(bytes)),
                (None, None) => None,
            };
            render_scene(&scene, &output, frames, capacity)?;
        }
        Commands::Validate { input } => {
            validate_scene(input)?;
        }
        Commands::Version => {
            println!("drawcache {}", drawcache::VERSION);
        }
    }

    Ok(())
}

/// Draw every frame of a scene with the software backend.
fn render_scene(
    path: &Utf8Path,
    output: &Utf8Path,
    frames: Option<u32>,
    capacity: Option<Capacity>,
) -> Result<()> {
    let timer = logging::Timer::new(format!("render {}", path));

    let scene = scene::load_scene(path).with_context(|| format!("Failed to load scene {}", path))?;
    let config = match capacity {
        Some(capacity) => CacheConfig { capacity },
        None => scene.cache_config(),
    };
    let prepared = scene
        .prepare(path.parent())
        .with_context(|| format!("Failed to prepare scene {}", path))?;
    let frames = frames.unwrap_or(prepared.frames).max(1);

    info!(
        "Rendering {} item(s) on {}x{} for {} frame(s), cache {:?}",
        prepared.items.len(),
        prepared.width,
        prepared.height,
        frames,
        config.capacity
    );

    let backend = SoftwareBackend::new(prepared.width, prepared.height, prepared.background);
    let mut renderer = Renderer::new(backend, config).with_opacity(prepared.opacity);
    for _ in 0..frames {
        prepared.draw_frame(&mut renderer);
    }

    let cache = renderer.cache().stats();
    let atlases = renderer.atlases().len();
    let backend = renderer.shutdown();
    backend
        .save_png(output)
        .with_context(|| format!("Failed to write {}", output))?;

    let report = RenderReport {
        frames,
        output: output.to_path_buf(),
        cache,
        backend: backend.stats(),
        atlases,
        live_textures: backend.live_textures(),
        elapsed_ms: timer.elapsed_ms(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Validate a scene file
fn validate_scene(input: Option<Utf8PathBuf>) -> Result<()> {
    let json = if let Some(path) = input {
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    match scene::parse_scene(&json) {
        Ok(scene) => {
            print_summary(&scene);
            Ok(())
        }
        Err(e) => {
            error!("Invalid scene: {}", e);
            println!("✗ Invalid scene: {}", e);
            Err(e.into())
        }
    }
}

fn print_summary(scene: &Scene) {
    let (rects, labels) = scene
        .items
        .iter()
        .fold((0, 0), |(rects, labels), item| match item {
            scene::Item::Rect { .. } => (rects + 1, labels),
            scene::Item::Label { .. } => (rects, labels + 1),
        });
    println!("✓ Valid scene");
    println!("  Canvas: {}x{}", scene.width, scene.height);
    println!("  Frames: {}", scene.frames);
    println!("  Items: {} rect(s), {} label(s)", rects, labels);
    if let Some(font) = &scene.font {
        println!("  Font: {} at {}px", font.path, font.size);
    }
}
