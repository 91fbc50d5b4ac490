//! The drill map: one record per output pixel plus the complex-plane
//! metadata needed to translate between pixel and plane coordinates.

mod analyzer;
mod codec;
mod colormap;

pub use analyzer::MapAnalyzer;
pub use codec::{ChannelFormat, ChannelId};
pub use colormap::ColorMap;

use crate::options::{Options, MAX_MAP_HEIGHT, MAX_MAP_WIDTH};
use deepdrill_core::{
    BigFloat, Coord, ExtendedComplex, ExtendedDouble, PrecisionComplex, StandardComplex,
    PRECISION_FLOOR,
};
use serde::{Deserialize, Serialize};

/// Outcome of drilling one pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DrillResult {
    #[default]
    Unprocessed,
    Escaped,
    MaxDepthReached,
    InBulb,
    InCardioid,
    Periodic,
    Attracted,
    Glitch,
}

/// Per-pixel record.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MapEntry {
    pub result: DrillResult,
    /// First executed iteration (after series skipping).
    pub first: i32,
    /// Last executed iteration.
    pub last: i32,
    /// ln ‖zₙ‖² at escape time.
    pub lognorm: f32,
    /// Iterate value when the escape check hit.
    pub zn: StandardComplex,
    /// dz/dc at the last iteration.
    pub derivative: StandardComplex,
    /// Unit normal vector for relief shading.
    pub normal: StandardComplex,
}

pub struct DrillMap {
    pub width: usize,
    pub height: usize,

    /// Plane location of the image center.
    pub center: PrecisionComplex,
    /// Plane location of pixel (0, 0).
    pub ul: PrecisionComplex,
    /// Plane location of pixel (width-1, height-1).
    pub lr: PrecisionComplex,

    /// Distance between adjacent pixels, in both representations: the
    /// high-precision one translates reference coordinates, the extended
    /// one feeds delta arithmetic.
    pixel_delta_hp: BigFloat,
    pub pixel_delta: ExtendedDouble,

    data: Vec<MapEntry>,
}

impl DrillMap {
    /// Create an unprocessed map with the geometry the options describe.
    pub fn new(opt: &Options) -> Self {
        let mut map = Self {
            width: 0,
            height: 0,
            center: opt.center.clone(),
            ul: PrecisionComplex::zero(opt.precision_bits),
            lr: PrecisionComplex::zero(opt.precision_bits),
            pixel_delta_hp: opt.pixel_delta_hp.clone(),
            pixel_delta: opt.pixel_delta,
            data: Vec::new(),
        };
        map.resize(opt.image.width, opt.image.height);
        map
    }

    /// Construct a bare map without plane metadata (used by the loader).
    pub(crate) fn bare(width: usize, height: usize) -> Self {
        let mut map = Self {
            width: 0,
            height: 0,
            center: PrecisionComplex::zero(PRECISION_FLOOR),
            ul: PrecisionComplex::zero(PRECISION_FLOOR),
            lr: PrecisionComplex::zero(PRECISION_FLOOR),
            pixel_delta_hp: BigFloat::zero(PRECISION_FLOOR),
            pixel_delta: ExtendedDouble::ZERO,
            data: Vec::new(),
        };
        map.resize(width, height);
        map
    }

    /// Reallocate the entry buffer. All entries revert to `Unprocessed`.
    pub fn resize(&mut self, width: usize, height: usize) {
        assert!(width >= 1 && width <= MAX_MAP_WIDTH);
        assert!(height >= 1 && height <= MAX_MAP_HEIGHT);

        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width * height, MapEntry::default());

        self.ul = self.translate(Coord::new(0, 0));
        self.lr = self.translate(Coord::new(width as i32 - 1, height as i32 - 1));
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> &MapEntry {
        assert!(x < self.width && y < self.height);
        &self.data[y * self.width + x]
    }

    #[inline]
    pub fn entry(&self, c: Coord) -> &MapEntry {
        self.get(c.x as usize, c.y as usize)
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, entry: MapEntry) {
        assert!(x < self.width && y < self.height);
        self.data[y * self.width + x] = entry;
    }

    #[inline]
    pub fn set_entry(&mut self, c: Coord, entry: MapEntry) {
        self.set(c.x as usize, c.y as usize, entry);
    }

    /// Center pixel of the map.
    pub fn center_coord(&self) -> Coord {
        Coord::new(self.width as i32 / 2, self.height as i32 / 2)
    }

    /// Translate a pixel coordinate to its location on the complex plane:
    /// `center + (coord − image_center) · pixel_delta`.
    pub fn translate(&self, coord: Coord) -> PrecisionComplex {
        let c = self.center_coord();
        let dx = self.pixel_delta_hp.mul_f64((coord.x - c.x) as f64);
        let dy = self.pixel_delta_hp.mul_f64((coord.y - c.y) as f64);
        self.center.add(&PrecisionComplex::new(dx, dy))
    }

    /// Inverse of `translate`, to the nearest pixel.
    pub fn translate_back(&self, location: &PrecisionComplex) -> Coord {
        let c = self.center_coord();
        let dx = location.re.sub(&self.center.re).div(&self.pixel_delta_hp);
        let dy = location.im.sub(&self.center.im).div(&self.pixel_delta_hp);
        Coord::from_f64(c.x as f64 + dx.to_f64(), c.y as f64 + dy.to_f64())
    }

    /// Relative plane location of `coord` with respect to `other`, reduced.
    pub fn distance(&self, coord: Coord, other: Coord) -> ExtendedComplex {
        let delta = coord - other;
        ExtendedComplex::from_extended_doubles(
            self.pixel_delta * delta.x as f64,
            self.pixel_delta * delta.y as f64,
        )
        .reduced()
    }

    /// `nx · ny` equidistant coordinates covering the closed rectangle
    /// `[0, w-1] × [0, h-1]`, corners included. Both counts must be ≥ 2.
    pub fn mesh(&self, nx: usize, ny: usize) -> Vec<Coord> {
        assert!(nx >= 2 && ny >= 2);

        let mut points = Vec::with_capacity(nx * ny);
        for i in 0..nx {
            for j in 0..ny {
                let x = (self.width - 1) as f64 * (i as f64 / (nx - 1) as f64);
                let y = (self.height - 1) as f64 * (j as f64 / (ny - 1) as f64);
                points.push(Coord::from_f64(x, y));
            }
        }
        points
    }

    pub fn has_iterations(&self) -> bool {
        self.data.iter().any(|e| e.last != 0)
    }

    pub fn has_lognorms(&self) -> bool {
        self.data.iter().any(|e| e.lognorm != 0.0)
    }

    pub fn has_derivatives(&self) -> bool {
        self.data.iter().any(|e| !e.derivative.is_zero())
    }

    pub fn has_normals(&self) -> bool {
        self.data.iter().any(|e| !e.normal.is_zero())
    }

    /// Derive the shading inputs for the (external) colorizer.
    pub fn colorize(&self, overlays: bool) -> ColorMap {
        ColorMap::compute(self, overlays)
    }
}
