//! Turning one frame into a grid of tiles, and the grid into output.

use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};

use crate::error::MosaicError;
use crate::lookup::LookupTable;
use crate::palette::{TileMap, TileRef};

/// Separator between cells in text output
pub const CELL_DELIMITER: &str = ",";

/// Integer downsample factor, at least 1
pub fn downsample_factor(native_width: u32, target_width: Option<u32>) -> u32 {
    match target_width {
        Some(target) if target > 0 => (native_width / target).max(1),
        _ => 1,
    }
}

/// Grid dimensions for a frame of the given native size
pub fn grid_size(native: (u32, u32), target_width: Option<u32>) -> (u32, u32) {
    let factor = downsample_factor(native.0, target_width);
    (native.0 / factor, native.1 / factor)
}

/// Tile indices of one frame, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MosaicGrid {
    pub width: u32,
    pub height: u32,
    /// `None` where the lookup table has no tile
    pub cells: Vec<Option<u16>>,
}

impl MosaicGrid {
    /// Reduce a frame to the grid size and look up every cell
    pub fn from_image(
        img: &DynamicImage,
        target_width: Option<u32>,
        table: &LookupTable,
    ) -> Result<Self, MosaicError> {
        let (width, height) = grid_size((img.width(), img.height()), target_width);
        if width == 0 || height == 0 {
            return Err(MosaicError::EmptyFrame {
                width: img.width(),
                height: img.height(),
            });
        }

        let resized = if (width, height) == (img.width(), img.height()) {
            img.to_rgba8()
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
                .to_rgba8()
        };

        let cells = resized
            .pixels()
            .map(|p| table.tile_index(p[0], p[1], p[2]))
            .collect();

        Ok(MosaicGrid {
            width,
            height,
            cells,
        })
    }

    /// Tile reference of every cell; `None` for "no tile" or an index past the map
    pub fn resolve<'a>(&self, tiles: &'a TileMap) -> Vec<Option<&'a TileRef>> {
        self.cells
            .iter()
            .map(|cell| cell.and_then(|index| tiles.get(index)))
            .collect()
    }

    /// Number of cells without a tile
    pub fn missing(&self, tiles: &TileMap) -> usize {
        self.resolve(tiles).iter().filter(|t| t.is_none()).count()
    }

    /// One text line: escaped display codes joined by commas.
    ///
    /// Missing cells are left empty.
    pub fn to_text(&self, tiles: &TileMap) -> String {
        self.resolve(tiles)
            .iter()
            .map(|tile| tile.map(TileRef::escaped_code).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(CELL_DELIMITER)
    }

    /// Composite the tile images, `cell_size` pixels per cell.
    ///
    /// Tile pixels overwrite the transparent canvas as-is, alpha included.
    /// Cells whose tile is missing or undecodable stay transparent.
    pub fn to_image(&self, tiles: &TileMap, cell_size: u32) -> RgbaImage {
        let mut out = RgbaImage::new(self.width * cell_size, self.height * cell_size);

        for (i, tile) in self.resolve(tiles).into_iter().enumerate() {
            let Some(tile_img) = tile.and_then(TileRef::image) else {
                continue;
            };

            let x = (i as u32 % self.width) * cell_size;
            let y = (i as u32 / self.width) * cell_size;
            for ty in 0..tile_img.height().min(cell_size) {
                for tx in 0..tile_img.width().min(cell_size) {
                    out.put_pixel(x + tx, y + ty, *tile_img.get_pixel(tx, ty));
                }
            }
        }

        out
    }
}
