//! Offline lookup table generation.

use tracing::{info, warn};

use crate::average::palette_colors;
use crate::codec;
use crate::config::BuildConfig;
use crate::cube::CubeGeometry;
use crate::error::BuildError;
use crate::lookup::{LookupTable, MAX_TILES};
use crate::palette::{load_palette, Tile};

/// Builds and saves a lookup table for one palette
pub struct LookupGenerator {
    config: BuildConfig,
}

impl LookupGenerator {
    pub fn new(config: BuildConfig) -> Self {
        LookupGenerator { config }
    }

    /// Load the palette, build the table and write it out
    pub fn generate(&self) -> Result<LookupTable, BuildError> {
        self.config.geometry.validate()?;

        info!(input = %self.config.input_file.display(), "Loading image map");
        let tiles = load_palette(&self.config.input_file)?;

        let table = build_from_tiles(&tiles, self.config.geometry)?;

        info!(output = %self.config.output_png.display(), "Saving lookup table");
        codec::save(&table, &self.config.output_png)?;

        Ok(table)
    }
}

/// Average every tile, then search the cube
pub fn build_from_tiles(tiles: &[Tile], geometry: CubeGeometry) -> Result<LookupTable, BuildError> {
    geometry.validate()?;
    if tiles.len() > MAX_TILES {
        return Err(BuildError::PaletteTooLarge(tiles.len()));
    }
    if tiles.is_empty() {
        warn!("Palette is empty, no lookup entry will be written");
    }

    info!(tiles = tiles.len(), "Calculating average colours");
    let colors = palette_colors(tiles)?;

    LookupTable::build(&colors, geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::DATA_URL_PREFIX;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn data_url(pixel: [u8; 4]) -> String {
        let mut bytes = std::io::Cursor::new(Vec::new());
        RgbaImage::from_pixel(4, 4, Rgba(pixel))
            .write_to(&mut bytes, image::ImageFormat::Png)
            .unwrap();
        format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(bytes.into_inner()))
    }

    #[test]
    fn generate_writes_a_loadable_table() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("palette.json");
        let output = dir.path().join("lookup.png");
        let palette = serde_json::json!([
            { "code": "U+1F7E5", "img": data_url([230, 20, 20, 255]) },
            { "code": "U+1F7E6", "img": data_url([20, 20, 230, 255]) },
        ]);
        std::fs::write(&input, palette.to_string()).unwrap();

        let geometry = CubeGeometry::new(32, 32).unwrap();
        let generator = LookupGenerator::new(BuildConfig {
            input_file: input,
            output_png: output.clone(),
            geometry,
        });
        let table = generator.generate().unwrap();

        let loaded = codec::load(&output, geometry).unwrap();
        assert!(loaded == table);
        assert_eq!(loaded.tile_index(200, 10, 10), Some(0));
        assert_eq!(loaded.tile_index(10, 10, 200), Some(1));
    }

    #[test]
    fn empty_palette_builds_an_empty_table() {
        let geometry = CubeGeometry::new(32, 32).unwrap();
        let table = build_from_tiles(&[], geometry).unwrap();
        assert_eq!(table.tile_index(0, 0, 0), None);
        assert_eq!(table.tile_index(255, 255, 255), None);
    }

    #[test]
    fn invalid_geometry_is_rejected_before_loading() {
        let generator = LookupGenerator::new(BuildConfig {
            geometry: CubeGeometry {
                step: 1,
                raster_side: 16,
            },
            ..BuildConfig::default()
        });
        match generator.generate() {
            Err(BuildError::Config(_)) => {}
            other => panic!("Expected Config error, got {other:?}"),
        }
    }
}
