//! Persisting the lookup table as a PNG.
//!
//! The raster is stored losslessly as 8-bit RGBA. A `tEXt` chunk records the
//! layout version, colour space, step and side so that a table built with a
//! different configuration is rejected instead of misread.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::cube::CubeGeometry;
use crate::error::LookupError;
use crate::lookup::LookupTable;

/// Keyword of the text chunk carrying the geometry tag
pub const TAG_KEYWORD: &str = "emojimosaic-lookup";

/// Encode a lookup table as PNG
pub fn encode<W: Write>(table: &LookupTable, writer: W) -> Result<(), LookupError> {
    let geometry = table.geometry();
    let side = geometry.raster_side;

    let mut encoder = png::Encoder::new(writer, side, side);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.add_text_chunk(TAG_KEYWORD.to_string(), geometry.tag())?;

    let mut writer = encoder.write_header()?;
    writer.write_image_data(table.as_bytes())?;
    writer.finish()?;
    Ok(())
}

/// Decode a lookup table, checking it matches `geometry`
pub fn decode<R: Read>(reader: R, geometry: CubeGeometry) -> Result<LookupTable, LookupError> {
    let side = geometry.raster_side;

    let mut decoder = png::Decoder::new(reader);
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;

    let info = reader.info();
    let (width, height) = (info.width, info.height);
    let (color, depth) = (info.color_type, info.bit_depth);
    if width != side
        || height != side
        || color != png::ColorType::Rgba
        || depth != png::BitDepth::Eight
    {
        return Err(LookupError::DimensionMismatch {
            width,
            height,
            color,
            depth,
            side,
        });
    }

    let tag = info
        .uncompressed_latin1_text
        .iter()
        .find(|chunk| chunk.keyword == TAG_KEYWORD)
        .map(|chunk| chunk.text.clone());
    let expected = geometry.tag();
    match tag {
        Some(found) if found != expected => {
            return Err(LookupError::TagMismatch { found, expected });
        }
        Some(found) => debug!(tag = %found, "Lookup table tag matches"),
        None => warn!("Lookup table carries no geometry tag, assuming {}", expected),
    }

    let mut data = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut data)?;
    data.truncate(frame.buffer_size());

    LookupTable::from_raw(geometry, data)
}

/// Write a lookup table to a PNG file
pub fn save(table: &LookupTable, path: &Path) -> Result<(), LookupError> {
    let file = File::create(path)?;
    encode(table, BufWriter::new(file))
}

/// Read a lookup table from a PNG file
pub fn load(path: &Path, geometry: CubeGeometry) -> Result<LookupTable, LookupError> {
    let file = File::open(path)?;
    decode(BufReader::new(file), geometry)
}
