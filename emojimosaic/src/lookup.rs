//! The colour to tile lookup table.
//!
//! Each entry is four bytes: tile index low byte, high byte, an unused zero
//! and 255 once the entry has been written. Entries never written stay all
//! zero and read back as "no tile".

use itertools::iproduct;
use rayon::prelude::*;
use tracing::info;

use crate::color::{nearest, Oklab};
use crate::cube::CubeGeometry;
use crate::error::{BuildError, LookupError};

/// Value of the fourth byte of a written entry
pub const WRITTEN: u8 = 255;
/// Tile indices are stored in 16 bits
pub const MAX_TILES: usize = 1 << 16;

/// Raw RGBA lookup raster plus the geometry it was built with
#[derive(Clone, PartialEq, Eq)]
pub struct LookupTable {
    geometry: CubeGeometry,
    data: Vec<u8>,
}

impl std::fmt::Debug for LookupTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupTable")
            .field("geometry", &self.geometry)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl LookupTable {
    /// A table with no entries written
    pub fn empty(geometry: CubeGeometry) -> Self {
        LookupTable {
            geometry,
            data: vec![0; geometry.buffer_len()],
        }
    }

    /// Wrap a decoded raster
    pub fn from_raw(geometry: CubeGeometry, data: Vec<u8>) -> Result<Self, LookupError> {
        if data.len() != geometry.buffer_len() {
            return Err(LookupError::BufferSize {
                found: data.len(),
                expected: geometry.buffer_len(),
            });
        }
        Ok(LookupTable { geometry, data })
    }

    /// Build the table by exhaustive nearest-neighbour search.
    ///
    /// `colors[i]` is the average colour of tile `i`. Every sampled cube
    /// colour is compared against every tile; on equal distance the earlier
    /// tile wins. Red slices are searched in parallel, then written in
    /// (r, g, b) order so aliased entries resolve the same way every run.
    pub fn build(colors: &[Oklab], geometry: CubeGeometry) -> Result<Self, BuildError> {
        geometry.validate()?;
        if colors.len() > MAX_TILES {
            return Err(BuildError::PaletteTooLarge(colors.len()));
        }

        info!(
            tiles = colors.len(),
            step = geometry.step,
            cells = geometry.samples_per_axis().pow(3),
            "Generating lookup table"
        );

        let reds: Vec<u8> = geometry.samples().collect();
        let slices: Vec<Vec<Option<u16>>> = reds
            .par_iter()
            .map(|&r| {
                iproduct!(geometry.samples(), geometry.samples())
                    .map(|(g, b)| nearest(Oklab::from_rgb(r, g, b), colors).map(|i| i as u16))
                    .collect()
            })
            .collect();

        let mut table = LookupTable::empty(geometry);
        for (&r, slice) in reds.iter().zip(&slices) {
            for ((g, b), winner) in iproduct!(geometry.samples(), geometry.samples()).zip(slice) {
                if let Some(index) = winner {
                    table.write(r, g, b, *index);
                }
            }
        }

        Ok(table)
    }

    fn write(&mut self, r: u8, g: u8, b: u8, index: u16) {
        let pos = self.geometry.offset(r, g, b);
        self.data[pos] = (index % 256) as u8;
        self.data[pos + 1] = (index / 256) as u8;
        self.data[pos + 2] = 0;
        self.data[pos + 3] = WRITTEN;
    }

    /// Tile index for a source pixel, `None` if the entry was never written.
    ///
    /// The index is not checked against any tile map.
    #[inline]
    pub fn tile_index(&self, r: u8, g: u8, b: u8) -> Option<u16> {
        let pos = self.geometry.offset(r, g, b);
        let entry = &self.data[pos..pos + 4];
        if entry[3] != WRITTEN {
            return None;
        }
        Some(entry[1] as u16 * 256 + entry[0] as u16)
    }

    pub fn geometry(&self) -> CubeGeometry {
        self.geometry
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
