//! Error types for the build and render stages.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid cube geometry or render settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Quantization step must be at least 1")]
    ZeroStep,

    #[error("Lookup raster {side}x{side} cannot hold {needed} cube cells")]
    RasterTooSmall { side: u32, needed: u64 },

    #[error("Target width must be at least 1")]
    ZeroTargetWidth,

    #[error("Cell size must be at least 1")]
    ZeroCellSize,
}

/// Errors while reading a palette or tile map file
#[derive(Error, Debug)]
pub enum PaletteError {
    #[error("Palette entry {index} has no image")]
    MissingImage { index: usize },

    #[error("Palette entry {index} has invalid base64 image data: {source}")]
    Base64 {
        index: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors that abort the lookup table build
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Failed to decode image of tile {index}: {source}")]
    TileDecode {
        index: usize,
        #[source]
        source: image::ImageError,
    },

    #[error("Palette has {0} tiles, at most 65536 fit in a lookup entry")]
    PaletteTooLarge(usize),

    #[error(transparent)]
    Palette(#[from] PaletteError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors while persisting or loading a lookup table
#[derive(Error, Debug)]
pub enum LookupError {
    #[error(
        "Lookup image is {width}x{height} {color:?}/{depth:?}, expected {side}x{side} RGBA8; regenerate the table"
    )]
    DimensionMismatch {
        width: u32,
        height: u32,
        color: png::ColorType,
        depth: png::BitDepth,
        side: u32,
    },

    #[error("Lookup table was built as '{found}', expected '{expected}'; regenerate the table")]
    TagMismatch { found: String, expected: String },

    #[error("Lookup buffer has {found} bytes, expected {expected}")]
    BufferSize { found: usize, expected: usize },

    #[error("PNG decode error: {0}")]
    PngDecode(#[from] png::DecodingError),

    #[error("PNG encode error: {0}")]
    PngEncode(#[from] png::EncodingError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Errors while composing one frame
#[derive(Error, Debug)]
pub enum MosaicError {
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Frame is empty ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Errors while driving a whole render job
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Failed to run video decoder '{program}': {source}")]
    DecoderSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Video decoder failed on {path} ({status})")]
    VideoDecode { path: PathBuf, status: String },

    #[error("Video decoder produced no frames for {0}")]
    NoFrames(PathBuf),

    #[error("An output directory is required for multi-frame image output")]
    MissingOutputDir,

    #[error("All {0} frames failed to render")]
    AllFramesFailed(usize),

    #[error("Frame {sequence} ({path}): {source}")]
    Frame {
        sequence: usize,
        path: PathBuf,
        #[source]
        source: MosaicError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}
