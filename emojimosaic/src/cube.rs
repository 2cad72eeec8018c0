//! Quantized RGB cube and its packing into the lookup raster.
//!
//! The builder and the reader must agree on every step here, so the
//! addressing lives in exactly one place: [`CubeGeometry::offset`].

use serde::{Deserialize, Serialize};

use crate::color::COLOR_SPACE;
use crate::error::ConfigError;

/// Default RGB sampling granularity
pub const DEFAULT_STEP: u8 = 2;
/// Default side length of the square lookup raster
pub const DEFAULT_RASTER_SIDE: u32 = 2048;
/// Bytes per lookup entry (RGBA)
pub const BYTES_PER_ENTRY: usize = 4;
/// Version of the persisted table layout
pub const LAYOUT_VERSION: u32 = 1;

/// Step size and raster size shared by build and read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeGeometry {
    /// Quantization step applied to each channel
    pub step: u8,
    /// Width and height of the lookup raster
    pub raster_side: u32,
}

impl Default for CubeGeometry {
    fn default() -> Self {
        CubeGeometry {
            step: DEFAULT_STEP,
            raster_side: DEFAULT_RASTER_SIDE,
        }
    }
}

impl CubeGeometry {
    /// Create a geometry, rejecting ones whose raster cannot hold the cube
    pub fn new(step: u8, raster_side: u32) -> Result<Self, ConfigError> {
        let geometry = CubeGeometry { step, raster_side };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.step == 0 {
            return Err(ConfigError::ZeroStep);
        }

        let needed = self.max_linear_index() + 1;
        let side = self.raster_side as u64;
        if side * side < needed {
            return Err(ConfigError::RasterTooSmall {
                side: self.raster_side,
                needed,
            });
        }

        Ok(())
    }

    /// Cube side N = floor(255 / step)
    pub fn side_len(&self) -> u32 {
        255 / self.step as u32
    }

    /// Cube coordinate of one channel value
    #[inline]
    pub fn quantize(&self, value: u8) -> u32 {
        value as u32 / self.step as u32
    }

    /// Channel values visited by the builder: 0, step, 2*step, ... below 255
    pub fn samples(&self) -> impl Iterator<Item = u8> + Clone {
        (0..255u8).step_by(self.step as usize)
    }

    /// Number of samples per axis
    pub fn samples_per_axis(&self) -> usize {
        self.samples().count()
    }

    /// Linear cube index: qb + qg*N + qr*N^2
    #[inline]
    pub fn linear_index(&self, r: u8, g: u8, b: u8) -> u64 {
        let n = self.side_len() as u64;
        self.quantize(b) as u64 + self.quantize(g) as u64 * n + self.quantize(r) as u64 * n * n
    }

    /// Largest linear index any 8-bit colour can produce.
    ///
    /// A channel of 255 (and the top build sample) quantizes to N, one past
    /// the nominal cube side, so this is N + N^2 + N^3.
    pub fn max_linear_index(&self) -> u64 {
        let n = self.side_len() as u64;
        n + n * n + n * n * n
    }

    /// Byte offset of the lookup entry for a colour.
    ///
    /// x is the linear index modulo the raster side and y the quotient, and
    /// the offset is (x * side + y) * 4. The x/y order is transposed relative
    /// to row-major addressing; existing tables depend on it.
    #[inline]
    pub fn offset(&self, r: u8, g: u8, b: u8) -> usize {
        let side = self.raster_side as u64;
        let linear = self.linear_index(r, g, b);
        let x = linear % side;
        let y = linear / side;
        ((x * side + y) as usize) * BYTES_PER_ENTRY
    }

    /// Size of the raw RGBA lookup buffer
    pub fn buffer_len(&self) -> usize {
        self.raster_side as usize * self.raster_side as usize * BYTES_PER_ENTRY
    }

    /// Text stored alongside a persisted table
    pub fn tag(&self) -> String {
        format!(
            "v{} space={} step={} side={}",
            LAYOUT_VERSION, COLOR_SPACE, self.step, self.raster_side
        )
    }
}
