use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emojimosaic::codec;
use emojimosaic::config::{
    BuildConfig, OutputMode, RenderConfig, DEFAULT_CELL_SIZE, DEFAULT_FFMPEG, DEFAULT_FRAME_RATE,
};
use emojimosaic::cube::{CubeGeometry, DEFAULT_RASTER_SIDE, DEFAULT_STEP};
use emojimosaic::frames::Renderer;
use emojimosaic::generator::LookupGenerator;
use emojimosaic::palette::TileMap;

#[derive(Parser)]
#[command(name = "emojimosaic")]
#[command(about = "Render images and videos as emoji mosaics")]
struct Cli {
    /// Worker threads (defaults to one per core)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the colour lookup table from a palette
    Build {
        /// Palette JSON with `code` and `img` per tile
        #[arg(short, long)]
        input: PathBuf,

        /// Output lookup PNG
        #[arg(short, long, default_value = "lookup.png")]
        output: PathBuf,

        /// Quantization step of each colour axis
        #[arg(long, default_value_t = DEFAULT_STEP)]
        step: u8,

        /// Width and height of the lookup PNG
        #[arg(long, default_value_t = DEFAULT_RASTER_SIDE)]
        lookup_size: u32,
    },
    /// Render an image or video with a prebuilt lookup table
    Render {
        /// Input image, or video (gif, mp4, webm, mov, mkv)
        #[arg(short, long)]
        input: PathBuf,

        /// Tile map JSON
        #[arg(short, long)]
        map: PathBuf,

        /// Lookup PNG produced by `build`
        #[arg(short, long, default_value = "lookup.png")]
        lookup: PathBuf,

        /// Mosaic width in cells (native resolution if omitted)
        #[arg(short = 'w', long)]
        target_width: Option<u32>,

        /// Emit HTML code-point escapes instead of an image
        #[arg(short, long)]
        text: bool,

        /// Output file, or directory for video image output
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Quantization step the lookup table was built with
        #[arg(long, default_value_t = DEFAULT_STEP)]
        step: u8,

        /// Side of the lookup PNG
        #[arg(long, default_value_t = DEFAULT_RASTER_SIDE)]
        lookup_size: u32,

        /// Pixel size of one cell in image output
        #[arg(long, default_value_t = DEFAULT_CELL_SIZE)]
        cell_size: u32,

        /// Frames per second sampled from videos
        #[arg(long, default_value_t = DEFAULT_FRAME_RATE)]
        fps: f32,

        /// Video decoder executable
        #[arg(long, default_value = DEFAULT_FFMPEG)]
        ffmpeg: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emojimosaic=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(io::stderr),
        )
        .init();

    let cli = Cli::parse();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to set up worker threads")?;
    }

    match cli.command {
        Commands::Build {
            input,
            output,
            step,
            lookup_size,
        } => {
            let geometry = CubeGeometry::new(step, lookup_size)?;
            let generator = LookupGenerator::new(BuildConfig {
                input_file: input,
                output_png: output,
                geometry,
            });
            generator.generate()?;
        }
        Commands::Render {
            input,
            map,
            lookup,
            target_width,
            text,
            output,
            step,
            lookup_size,
            cell_size,
            fps,
            ffmpeg,
        } => {
            let config = RenderConfig {
                input_file: input,
                map_file: map,
                lookup_file: lookup,
                output,
                target_width,
                mode: if text {
                    OutputMode::Text
                } else {
                    OutputMode::Image
                },
                cell_size,
                geometry: CubeGeometry::new(step, lookup_size)?,
                frame_rate: fps,
                ffmpeg,
            };
            render(&config)?;
        }
    }

    Ok(())
}

fn render(config: &RenderConfig) -> anyhow::Result<()> {
    config.validate()?;

    info!(path = %config.lookup_file.display(), "Loading lookup table");
    let table = codec::load(&config.lookup_file, config.geometry)
        .with_context(|| format!("Failed to load {}", config.lookup_file.display()))?;

    info!(path = %config.map_file.display(), "Loading image map");
    let tiles = TileMap::load(&config.map_file)
        .with_context(|| format!("Failed to load {}", config.map_file.display()))?;

    let renderer = Renderer::new(config, &table, &tiles);
    let summary = match (config.mode, &config.output) {
        (OutputMode::Text, Some(path)) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            let summary = renderer.run(&mut writer)?;
            writer.flush()?;
            summary
        }
        _ => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            let summary = renderer.run(&mut writer)?;
            writer.flush()?;
            summary
        }
    };

    if !summary.failures.is_empty() {
        warn!(failed = summary.failures.len(), "Some frames were skipped");
    }
    info!(frames = summary.outputs.len(), "Done");
    Ok(())
}
