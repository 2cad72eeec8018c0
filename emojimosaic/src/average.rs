//! Representative colour of a tile.
//!
//! The tile is flattened onto white, cropped to a square keeping the
//! busiest region (highest luma entropy), shrunk to a single pixel and
//! converted to Oklab.

use image::imageops::{self, FilterType};
use image::{Pixel, Rgb, RgbImage, RgbaImage};
use rayon::prelude::*;

use crate::color::Oklab;
use crate::error::BuildError;
use crate::palette::Tile;

/// Widest slice removed per entropy comparison
const ENTROPY_SLICE: u32 = 8;

/// Composite an RGBA image over a white background
pub fn flatten_on_white(img: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b, a] = img.get_pixel(x, y).0;
        let a = a as u32;
        let blend = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Shannon entropy of the luma histogram of a region
fn entropy(img: &RgbImage, x: u32, y: u32, width: u32, height: u32) -> f64 {
    let mut histogram = [0u32; 256];
    for py in y..y + height {
        for px in x..x + width {
            histogram[img.get_pixel(px, py).to_luma()[0] as usize] += 1;
        }
    }

    let total = (width * height) as f64;
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Square window `(x, y, side)` left after trimming low-entropy edges.
///
/// Slices of up to 8 px are cut from whichever end of the long axis carries
/// less information; on a tie the far end is cut.
pub fn entropy_square(img: &RgbImage) -> (u32, u32, u32) {
    let (mut left, mut top) = (0, 0);
    let (mut width, mut height) = img.dimensions();

    while width > height {
        let slice = ENTROPY_SLICE.min(width - height);
        let near = entropy(img, left, top, slice, height);
        let far = entropy(img, left + width - slice, top, slice, height);
        if near < far {
            left += slice;
        }
        width -= slice;
    }

    while height > width {
        let slice = ENTROPY_SLICE.min(height - width);
        let near = entropy(img, left, top, width, slice);
        let far = entropy(img, left, top + height - slice, width, slice);
        if near < far {
            top += slice;
        }
        height -= slice;
    }

    (left, top, width)
}

/// Single representative sRGB pixel of a decoded tile
pub fn representative_rgb(img: &RgbaImage) -> Rgb<u8> {
    let flat = flatten_on_white(img);
    let (x, y, side) = entropy_square(&flat);
    let square = imageops::crop_imm(&flat, x, y, side, side).to_image();
    let pixel = imageops::resize(&square, 1, 1, FilterType::Lanczos3);
    *pixel.get_pixel(0, 0)
}

/// Average perceptual colour of one tile
pub fn tile_color(tile: &Tile) -> Result<Oklab, BuildError> {
    let img = image::load_from_memory(&tile.image)
        .map_err(|source| BuildError::TileDecode {
            index: tile.index,
            source,
        })?
        .to_rgba8();
    let [r, g, b] = representative_rgb(&img).0;
    Ok(Oklab::from_rgb(r, g, b))
}

/// Average colours of a whole palette, in palette order.
///
/// Tiles are processed in parallel; any undecodable tile aborts the build.
pub fn palette_colors(tiles: &[Tile]) -> Result<Vec<Oklab>, BuildError> {
    tiles.par_iter().map(tile_color).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn encode(img: &RgbaImage) -> Vec<u8> {
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    /// Left half noisy, right half flat (or the reverse)
    fn half_noisy(width: u32, height: u32, noisy_left: bool) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let in_left = x < width / 2;
            if in_left == noisy_left {
                let v = ((x * 37 + y * 91) % 256) as u8;
                Rgb([v, v.wrapping_mul(3), v.wrapping_add(50)])
            } else {
                Rgb([128, 128, 128])
            }
        })
    }

    #[test]
    fn flatten_keeps_opaque_and_whitens_transparent() {
        let mut img = RgbaImage::new(3, 1);
        img.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
        img.put_pixel(1, 0, Rgba([10, 20, 30, 0]));
        img.put_pixel(2, 0, Rgba([0, 0, 0, 128]));
        let flat = flatten_on_white(&img);
        assert_eq!(flat.get_pixel(0, 0).0, [10, 20, 30]);
        assert_eq!(flat.get_pixel(1, 0).0, [255, 255, 255]);
        assert_eq!(flat.get_pixel(2, 0).0, [127, 127, 127]);
    }

    #[test]
    fn square_image_is_not_cropped() {
        let img = half_noisy(12, 12, true);
        assert_eq!(entropy_square(&img), (0, 0, 12));
    }

    #[test]
    fn wide_image_keeps_busy_side() {
        assert_eq!(entropy_square(&half_noisy(16, 8, true)), (0, 0, 8));
        assert_eq!(entropy_square(&half_noisy(16, 8, false)), (8, 0, 8));
    }

    #[test]
    fn tall_image_is_cropped_to_square() {
        let img = RgbImage::from_pixel(5, 23, Rgb([1, 2, 3]));
        let (x, y, side) = entropy_square(&img);
        assert_eq!((x, side), (0, 5));
        assert!(y + side <= 23);
    }

    #[test]
    fn uniform_tile_keeps_its_colour() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([200, 40, 10, 255]));
        let rgb = representative_rgb(&img);
        for (got, want) in rgb.0.iter().zip([200u8, 40, 10]) {
            assert!(got.abs_diff(want) <= 1, "{:?}", rgb);
        }
    }

    #[test]
    fn transparent_tile_is_white() {
        let tile = Tile {
            index: 0,
            image: encode(&RgbaImage::new(4, 4)),
        };
        let color = tile_color(&tile).unwrap();
        assert!((color.l - 1.0).abs() < 1e-2);
    }

    #[test]
    fn undecodable_tile_fails_with_its_index() {
        let tiles = vec![
            Tile {
                index: 0,
                image: encode(&RgbaImage::new(2, 2)),
            },
            Tile {
                index: 1,
                image: b"garbage".to_vec(),
            },
        ];
        match palette_colors(&tiles) {
            Err(BuildError::TileDecode { index: 1, .. }) => {}
            other => panic!("Expected TileDecode, got {other:?}"),
        }
    }

    #[test]
    fn palette_colors_keep_order() {
        let tiles: Vec<Tile> = [[255u8, 0, 0, 255], [0, 0, 255, 255], [0, 255, 0, 255]]
            .iter()
            .enumerate()
            .map(|(index, &px)| Tile {
                index,
                image: encode(&RgbaImage::from_pixel(4, 4, Rgba(px))),
            })
            .collect();
        let colors = palette_colors(&tiles).unwrap();
        assert_eq!(colors.len(), 3);
        assert!((colors[0].distance_squared(&Oklab::from_rgb(255, 0, 0))) < 1e-4);
        assert!((colors[1].distance_squared(&Oklab::from_rgb(0, 0, 255))) < 1e-4);
        assert!((colors[2].distance_squared(&Oklab::from_rgb(0, 255, 0))) < 1e-4);
    }
}
