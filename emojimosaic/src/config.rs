//! Configuration for the build and render jobs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cube::CubeGeometry;
use crate::error::ConfigError;

/// Width and height of one tile in image output
pub const DEFAULT_CELL_SIZE: u32 = 72;
/// Video sampling rate in frames per second (one frame every 25 seconds)
pub const DEFAULT_FRAME_RATE: f32 = 0.04;
/// Program used to split videos into frames
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Configuration for building a lookup table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Palette JSON file
    pub input_file: PathBuf,
    /// Output lookup PNG file
    pub output_png: PathBuf,
    pub geometry: CubeGeometry,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            input_file: PathBuf::from("emojis.json"),
            output_png: PathBuf::from("lookup.png"),
            geometry: CubeGeometry::default(),
        }
    }
}

/// What a render job produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One line of HTML code-point escapes per frame
    Text,
    /// A composited PNG per frame
    Image,
}

/// Configuration for rendering an image or video
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Input image or video
    pub input_file: PathBuf,
    /// Tile map JSON file (codes and images)
    pub map_file: PathBuf,
    /// Lookup table PNG
    pub lookup_file: PathBuf,
    /// Output file (still input) or directory (video input)
    pub output: Option<PathBuf>,
    /// Target grid width; native resolution when unset
    pub target_width: Option<u32>,
    pub mode: OutputMode,
    /// Pixel size of one grid cell in image output
    pub cell_size: u32,
    pub geometry: CubeGeometry,
    /// Frames per second sampled from videos
    pub frame_rate: f32,
    /// Video decoder executable
    pub ffmpeg: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            input_file: PathBuf::from("input.png"),
            map_file: PathBuf::from("emojis.json"),
            lookup_file: PathBuf::from("lookup.png"),
            output: None,
            target_width: None,
            mode: OutputMode::Image,
            cell_size: DEFAULT_CELL_SIZE,
            geometry: CubeGeometry::default(),
            frame_rate: DEFAULT_FRAME_RATE,
            ffmpeg: DEFAULT_FFMPEG.to_string(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry.validate()?;
        if self.target_width == Some(0) {
            return Err(ConfigError::ZeroTargetWidth);
        }
        if self.cell_size == 0 {
            return Err(ConfigError::ZeroCellSize);
        }
        Ok(())
    }

    /// Output path for a still input in image mode
    pub fn still_output(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from("mosaic.png"))
    }
}
