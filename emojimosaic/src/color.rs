//! Colour types used for tile matching.
//!
//! This module contains:
//! - `Oklab` wrapper for the oklab crate's color type
//! - Squared colour distance used by the nearest-tile search

use oklab::{self, srgb_to_oklab, Rgb};
use serde::{Deserialize, Serialize};

/// Name of the perceptual space, recorded in the lookup table tag.
pub const COLOR_SPACE: &str = "oklab";

/// Wrapper around oklab::Oklab with additional functionality
#[derive(Copy, Clone, Debug, PartialOrd, PartialEq)]
#[repr(transparent)]
pub struct Oklab(oklab::Oklab);

impl Serialize for Oklab {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.0.l, self.0.a, self.0.b).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Oklab {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (l, a, b) = Deserialize::deserialize(deserializer)?;
        Ok(Oklab(oklab::Oklab { l, a, b }))
    }
}

impl std::ops::Deref for Oklab {
    type Target = oklab::Oklab;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<oklab::Oklab> for Oklab {
    fn from(oklab: oklab::Oklab) -> Self {
        Oklab(oklab)
    }
}

impl Oklab {
    /// Create a new Oklab color from L, a, b components
    pub fn new(l: f32, a: f32, b: f32) -> Self {
        Oklab(oklab::Oklab { l, a, b })
    }

    /// Convert from 8-bit sRGB to Oklab
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        srgb_to_oklab(Rgb { r, g, b }).into()
    }

    /// Squared Euclidean distance over all three axes, no weighting
    #[inline]
    pub fn distance_squared(&self, other: &Self) -> f32 {
        let dl = self.l - other.l;
        let da = self.a - other.a;
        let db = self.b - other.b;
        dl * dl + da * da + db * db
    }
}

/// Index of the colour closest to `color`, first one wins on ties.
///
/// Returns `None` for an empty candidate list.
pub fn nearest(color: Oklab, candidates: &[Oklab]) -> Option<usize> {
    let mut best_dist = f32::MAX;
    let mut best = None;

    for (i, candidate) in candidates.iter().enumerate() {
        let dist = color.distance_squared(candidate);
        if dist < best_dist {
            best_dist = dist;
            best = Some(i);
        }
    }

    best
}
