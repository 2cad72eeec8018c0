//! Emoji mosaics: map every pixel of an image or video frame to the palette
//! tile whose average colour is closest, through a precomputed colour cube.

pub mod average;
pub mod codec;
pub mod color;
pub mod config;
pub mod cube;
pub mod error;
pub mod frames;
pub mod generator;
pub mod lookup;
pub mod mosaic;
pub mod palette;
