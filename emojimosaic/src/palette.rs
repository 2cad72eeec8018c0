//! Palette and tile map files.
//!
//! Both are JSON arrays of `{ "code": "U+1F600", "img": "data:image/png;base64,..." }`.
//! The build stage needs every `img`; the render stage needs `code` for text
//! output and `img` for image output, indexed the same way as the palette the
//! lookup table was built from.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PaletteError;

/// Prefix stripped from embedded images
pub const DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// One entry of a palette or tile map file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaletteEntry {
    /// Space separated `U+XXXX` tokens
    #[serde(default)]
    pub code: Option<String>,
    /// PNG as a data URL
    #[serde(default)]
    pub img: Option<String>,
}

/// Read the raw entries of a palette or tile map file
pub fn read_entries(path: &Path) -> Result<Vec<PaletteEntry>, PaletteError> {
    let file = File::open(path)?;
    let entries = serde_json::from_reader(BufReader::new(file))?;
    Ok(entries)
}

/// Decode an image data URL (the prefix is optional)
pub fn decode_data_url(index: usize, data: &str) -> Result<Vec<u8>, PaletteError> {
    let payload = data.strip_prefix(DATA_URL_PREFIX).unwrap_or(data);
    STANDARD
        .decode(payload.trim())
        .map_err(|source| PaletteError::Base64 { index, source })
}

/// Convert a display code to inline HTML escapes, `U+1F600 U+FE0F` -> `&#x1F600;&#xFE0F;`
pub fn escape_code(code: &str) -> String {
    code.split_whitespace()
        .map(|token| {
            let hex = token.strip_prefix("U+").unwrap_or(token);
            format!("&#x{};", hex)
        })
        .collect()
}

/// A candidate tile for the build stage
#[derive(Debug, Clone)]
pub struct Tile {
    /// Position in the palette
    pub index: usize,
    /// Encoded image bytes
    pub image: Vec<u8>,
}

/// Load the build-stage palette, every entry must carry an image
pub fn load_palette(path: &Path) -> Result<Vec<Tile>, PaletteError> {
    tiles_from_entries(&read_entries(path)?)
}

pub fn tiles_from_entries(entries: &[PaletteEntry]) -> Result<Vec<Tile>, PaletteError> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| -> Result<Tile, PaletteError> {
            let data = entry
                .img
                .as_deref()
                .ok_or(PaletteError::MissingImage { index })?;
            Ok(Tile {
                index,
                image: decode_data_url(index, data)?,
            })
        })
        .collect()
}

/// A render-time tile reference
#[derive(Debug, Default)]
pub struct TileRef {
    pub code: String,
    image: Option<Vec<u8>>,
    decoded: OnceLock<Option<RgbaImage>>,
}

impl TileRef {
    pub fn new(code: impl Into<String>, image: Option<Vec<u8>>) -> Self {
        TileRef {
            code: code.into(),
            image,
            decoded: OnceLock::new(),
        }
    }

    /// Display code as HTML escapes
    pub fn escaped_code(&self) -> String {
        escape_code(&self.code)
    }

    /// Decoded tile image, decoded on first use and shared afterwards.
    ///
    /// `None` when the entry has no image or it does not decode.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.decoded
            .get_or_init(|| {
                let bytes = self.image.as_ref()?;
                match image::load_from_memory(bytes) {
                    Ok(img) => Some(img.to_rgba8()),
                    Err(e) => {
                        warn!(code = %self.code, %e, "Failed to decode tile image");
                        None
                    }
                }
            })
            .as_ref()
    }
}

/// Index-aligned tile references used at render time
#[derive(Debug, Default)]
pub struct TileMap {
    tiles: Vec<TileRef>,
}

impl TileMap {
    pub fn load(path: &Path) -> Result<Self, PaletteError> {
        Ok(Self::from_entries(read_entries(path)?))
    }

    /// Build a tile map; entries with broken images keep their code only
    pub fn from_entries(entries: Vec<PaletteEntry>) -> Self {
        let tiles = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let image = entry
                    .img
                    .and_then(|data| match decode_data_url(index, &data) {
                        Ok(bytes) => Some(bytes),
                        Err(e) => {
                            warn!(%e, "Ignoring tile image");
                            None
                        }
                    });
                TileRef::new(entry.code.unwrap_or_default(), image)
            })
            .collect();

        TileMap { tiles }
    }

    pub fn from_tiles(tiles: Vec<TileRef>) -> Self {
        TileMap { tiles }
    }

    pub fn get(&self, index: u16) -> Option<&TileRef> {
        self.tiles.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn png_data_url(pixel: [u8; 4]) -> String {
        let img = RgbaImage::from_pixel(2, 2, image::Rgba(pixel));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(bytes.into_inner()))
    }

    #[test]
    fn escapes_single_code_point() {
        assert_eq!(escape_code("U+1F600"), "&#x1F600;");
    }

    #[test]
    fn escapes_sequences_without_separator() {
        assert_eq!(
            escape_code("U+1F468 U+200D U+1F4BB"),
            "&#x1F468;&#x200D;&#x1F4BB;"
        );
        assert_eq!(escape_code(""), "");
    }

    #[test]
    fn strips_data_url_prefix() {
        let bytes = decode_data_url(0, "data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        let bytes = decode_data_url(0, "aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn rejects_bad_base64() {
        match decode_data_url(3, "data:image/png;base64,!!!") {
            Err(PaletteError::Base64 { index: 3, .. }) => {}
            other => panic!("Expected Base64 error, got {other:?}"),
        }
    }

    #[test]
    fn palette_requires_images() {
        let entries: Vec<PaletteEntry> =
            serde_json::from_str(r#"[{"code": "U+1F600", "img": "aGVsbG8="}, {"code": "U+1F601"}]"#)
                .unwrap();
        match tiles_from_entries(&entries) {
            Err(PaletteError::MissingImage { index: 1 }) => {}
            other => panic!("Expected MissingImage, got {other:?}"),
        }
    }

    #[test]
    fn tile_map_decodes_images_lazily() {
        let entries = vec![
            PaletteEntry {
                code: Some("U+1F600".to_string()),
                img: Some(png_data_url([10, 20, 30, 128])),
            },
            PaletteEntry {
                code: Some("U+1F601".to_string()),
                img: Some("data:image/png;base64,bm90IGEgcG5n".to_string()),
            },
            PaletteEntry {
                code: None,
                img: None,
            },
        ];
        let map = TileMap::from_entries(entries);

        assert_eq!(map.len(), 3);
        let first = map.get(0).unwrap();
        assert_eq!(first.escaped_code(), "&#x1F600;");
        assert_eq!(first.image().unwrap().get_pixel(1, 1).0, [10, 20, 30, 128]);
        assert!(map.get(1).unwrap().image().is_none());
        assert_eq!(map.get(2).unwrap().code, "");
        assert!(map.get(3).is_none());
    }
}
