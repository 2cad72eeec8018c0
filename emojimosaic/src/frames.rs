//! Running the composer over a still image or the sampled frames of a video.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::config::{OutputMode, RenderConfig};
use crate::error::{FrameError, MosaicError};
use crate::lookup::LookupTable;
use crate::mosaic::MosaicGrid;
use crate::palette::TileMap;

/// Extensions treated as animations or videos
pub const VIDEO_EXTENSIONS: [&str; 5] = ["gif", "mp4", "webm", "mov", "mkv"];
/// File name pattern handed to the video decoder
const FRAME_PATTERN: &str = "frame%05d.jpg";

/// One still frame and its position in the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence: usize,
    pub path: PathBuf,
}

/// Whether an input should be split into frames
pub fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|video| video.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Frames in a directory, numbered by sorted file name
pub fn list_frames(dir: &Path) -> Result<Vec<Frame>, FrameError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .enumerate()
        .map(|(sequence, path)| Frame { sequence, path })
        .collect())
}

/// Sample frames from a video into `scratch` with the external decoder
pub fn extract_frames(
    video: &Path,
    scratch: &Path,
    config: &RenderConfig,
) -> Result<Vec<Frame>, FrameError> {
    info!(input = %video.display(), fps = config.frame_rate, "Decoding frames");

    let status = Command::new(&config.ffmpeg)
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(video)
        .arg("-vf")
        .arg(format!("fps={}", config.frame_rate))
        .arg(scratch.join(FRAME_PATTERN))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .status()
        .map_err(|source| FrameError::DecoderSpawn {
            program: config.ffmpeg.clone(),
            source,
        })?;

    if !status.success() {
        return Err(FrameError::VideoDecode {
            path: video.to_path_buf(),
            status: status.to_string(),
        });
    }

    let frames = list_frames(scratch)?;
    if frames.is_empty() {
        return Err(FrameError::NoFrames(video.to_path_buf()));
    }
    Ok(frames)
}

/// What one frame produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutput {
    pub sequence: usize,
    pub width: u32,
    pub height: u32,
    /// Text line (text mode)
    pub text: Option<String>,
    /// Written image (image mode)
    pub image: Option<PathBuf>,
}

/// Result of a render job
#[derive(Debug, Default)]
pub struct RenderSummary {
    /// Successful frames in sequence order
    pub outputs: Vec<FrameOutput>,
    /// Frames that failed, with the reason
    pub failures: Vec<FrameError>,
}

/// Shared, read-only inputs of a render job
pub struct Renderer<'a> {
    pub config: &'a RenderConfig,
    pub table: &'a LookupTable,
    pub tiles: &'a TileMap,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &'a RenderConfig, table: &'a LookupTable, tiles: &'a TileMap) -> Self {
        Renderer {
            config,
            table,
            tiles,
        }
    }

    /// Render the configured input; text output goes to `text_out`
    pub fn run(&self, text_out: &mut dyn Write) -> Result<RenderSummary, FrameError> {
        self.config.validate()?;
        let input = &self.config.input_file;

        if is_video(input) {
            let scratch = tempfile::Builder::new()
                .prefix("emojimosaic-frames")
                .tempdir()?;
            let frames = extract_frames(input, scratch.path(), self.config)?;
            self.render_frames(&frames, true, text_out)
        } else {
            let frame = Frame {
                sequence: 0,
                path: input.clone(),
            };
            self.render_frames(&[frame], false, text_out)
        }
    }

    /// Render frames in parallel and emit their output in sequence order.
    ///
    /// With `multi` set, images go to `<output dir>/<sequence:05>.png` and a
    /// failed frame is skipped; otherwise the single frame must succeed.
    pub fn render_frames(
        &self,
        frames: &[Frame],
        multi: bool,
        text_out: &mut dyn Write,
    ) -> Result<RenderSummary, FrameError> {
        let out_dir = match (self.config.mode, multi) {
            (OutputMode::Image, true) => {
                let dir = self
                    .config
                    .output
                    .as_ref()
                    .ok_or(FrameError::MissingOutputDir)?;
                fs::create_dir_all(dir)?;
                Some(dir.clone())
            }
            _ => None,
        };

        info!(frames = frames.len(), "Rendering frames");

        let mut results: Vec<(usize, Result<FrameOutput, FrameError>)> = frames
            .par_iter()
            .map(|frame| {
                let result = self
                    .render_frame(frame, out_dir.as_deref())
                    .map_err(|source| FrameError::Frame {
                        sequence: frame.sequence,
                        path: frame.path.clone(),
                        source,
                    });
                (frame.sequence, result)
            })
            .collect();
        results.sort_by_key(|(sequence, _)| *sequence);

        let mut summary = RenderSummary::default();
        for (_, result) in results {
            match result {
                Ok(output) => summary.outputs.push(output),
                Err(e) if !multi => return Err(e),
                Err(e) => {
                    error!(%e, "Skipping frame");
                    summary.failures.push(e);
                }
            }
        }

        if summary.outputs.is_empty() {
            return Err(FrameError::AllFramesFailed(summary.failures.len()));
        }

        if self.config.mode == OutputMode::Text {
            let first = &summary.outputs[0];
            writeln!(text_out, "{} {}", first.width, first.height)?;
            for output in &summary.outputs {
                writeln!(text_out, "{}", output.text.as_deref().unwrap_or_default())?;
            }
            text_out.flush()?;
        }

        Ok(summary)
    }

    fn render_frame(&self, frame: &Frame, out_dir: Option<&Path>) -> Result<FrameOutput, MosaicError> {
        let img = image::open(&frame.path)?;
        let grid = MosaicGrid::from_image(&img, self.config.target_width, self.table)?;
        debug!(
            sequence = frame.sequence,
            width = grid.width,
            height = grid.height,
            missing = grid.missing(self.tiles),
            "Frame composed"
        );

        let mut output = FrameOutput {
            sequence: frame.sequence,
            width: grid.width,
            height: grid.height,
            text: None,
            image: None,
        };

        match self.config.mode {
            OutputMode::Text => output.text = Some(grid.to_text(self.tiles)),
            OutputMode::Image => {
                let path = match out_dir {
                    Some(dir) => dir.join(format!("{:05}.png", frame.sequence)),
                    None => self.config.still_output(),
                };
                grid.to_image(self.tiles, self.config.cell_size)
                    .save_with_format(&path, image::ImageFormat::Png)?;
                output.image = Some(path);
            }
        }

        Ok(output)
    }
}
