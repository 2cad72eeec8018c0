use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use emojimosaic::codec;
use emojimosaic::config::{BuildConfig, OutputMode, RenderConfig};
use emojimosaic::cube::CubeGeometry;
use emojimosaic::frames::Renderer;
use emojimosaic::generator::LookupGenerator;
use emojimosaic::palette::{TileMap, DATA_URL_PREFIX};

const RED: [u8; 4] = [230, 20, 20, 255];
const BLUE: [u8; 4] = [20, 20, 230, 255];

fn geometry() -> CubeGeometry {
    CubeGeometry::new(32, 32).unwrap()
}

fn data_url(pixel: [u8; 4]) -> String {
    let mut bytes = std::io::Cursor::new(Vec::new());
    RgbaImage::from_pixel(8, 8, Rgba(pixel))
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    format!("{}{}", DATA_URL_PREFIX, STANDARD.encode(bytes.into_inner()))
}

/// Palette, lookup table and a red/blue input image
fn setup(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let map = dir.join("emojis.json");
    let palette = serde_json::json!([
        { "code": "U+1F600", "img": data_url(RED) },
        { "code": "U+1F601", "img": data_url(BLUE) },
    ]);
    std::fs::write(&map, palette.to_string()).unwrap();

    let lookup = dir.join("lookup.png");
    LookupGenerator::new(BuildConfig {
        input_file: map.clone(),
        output_png: lookup.clone(),
        geometry: geometry(),
    })
    .generate()
    .unwrap();

    let input = dir.join("input.png");
    let mut img = RgbImage::new(2, 1);
    img.put_pixel(0, 0, Rgb([200, 10, 10]));
    img.put_pixel(1, 0, Rgb([10, 10, 200]));
    img.save(&input).unwrap();

    (map, lookup, input)
}

fn render_config(dir: &Path, mode: OutputMode) -> RenderConfig {
    let (map, lookup, input) = setup(dir);
    RenderConfig {
        input_file: input,
        map_file: map,
        lookup_file: lookup,
        output: Some(dir.join("mosaic.png")),
        mode,
        cell_size: 8,
        geometry: geometry(),
        ..RenderConfig::default()
    }
}

#[test]
fn text_mosaic_of_a_still_image() {
    let dir = TempDir::new().unwrap();
    let config = render_config(dir.path(), OutputMode::Text);

    let table = codec::load(&config.lookup_file, config.geometry).unwrap();
    let tiles = TileMap::load(&config.map_file).unwrap();
    let mut out: Vec<u8> = Vec::new();
    let summary = Renderer::new(&config, &table, &tiles).run(&mut out).unwrap();

    assert_eq!(summary.outputs.len(), 1);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "2 1\n&#x1F600;,&#x1F601;\n"
    );
}

#[test]
fn image_mosaic_of_a_still_image() {
    let dir = TempDir::new().unwrap();
    let config = render_config(dir.path(), OutputMode::Image);

    let table = codec::load(&config.lookup_file, config.geometry).unwrap();
    let tiles = TileMap::load(&config.map_file).unwrap();
    let mut out: Vec<u8> = Vec::new();
    Renderer::new(&config, &table, &tiles).run(&mut out).unwrap();
    assert!(out.is_empty());

    let mosaic = image::open(dir.path().join("mosaic.png")).unwrap().to_rgba8();
    assert_eq!(mosaic.dimensions(), (16, 8));
    assert_eq!(mosaic.get_pixel(3, 4).0, RED);
    assert_eq!(mosaic.get_pixel(12, 4).0, BLUE);
}

#[test]
fn table_built_with_another_step_is_rejected() {
    let dir = TempDir::new().unwrap();
    let config = render_config(dir.path(), OutputMode::Text);

    let other = CubeGeometry::new(33, 32).unwrap();
    assert!(codec::load(&config.lookup_file, other).is_err());
}
