//! Direct drilling without perturbation.
//!
//! Iterates every pixel on its own in extended precision. No reference
//! orbit, no glitches, no series skipping; orders of magnitude slower than
//! the perturbation path and limited to zooms where 53 mantissa bits still
//! separate adjacent pixels. Used when `perturbation.enable` is off and as
//! a ground truth in tests.

use crate::error::{Error, Result};
use crate::map::{DrillMap, DrillResult, MapEntry};
use crate::options::Options;
use crate::progress;
use deepdrill_core::{CancelFlag, Coord, ExtendedComplex};
use rayon::prelude::*;
use tracing::info;

pub struct SlowDriller<'a> {
    opt: &'a Options,
    map: &'a mut DrillMap,
    cancel: CancelFlag,
}

impl<'a> SlowDriller<'a> {
    pub fn new(opt: &'a Options, map: &'a mut DrillMap) -> Self {
        Self::with_cancel(opt, map, CancelFlag::new())
    }

    pub fn with_cancel(opt: &'a Options, map: &'a mut DrillMap, cancel: CancelFlag) -> Self {
        Self { opt, map, cancel }
    }

    /// Drill every pixel of the map, one full orbit each.
    pub fn drill(&mut self) -> Result<()> {
        let (width, height) = (self.map.width, self.map.height);

        info!(width, height, depth = self.opt.location.depth, "direct drill");

        let mut remaining = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                remaining.push(Coord::new(x as i32, y as i32));
            }
        }

        let bar = progress::phase("Computing orbits", remaining.len() as u64);

        let opt = self.opt;
        let map = &*self.map;
        let cancel = &self.cancel;

        let results: Result<Vec<(Coord, MapEntry)>> = remaining
            .par_iter()
            .map(|&coord| {
                if cancel.is_cancelled() {
                    return Err(Error::UserInterrupt);
                }
                let entry = drill_point(opt, map, coord);
                bar.inc(1);
                Ok((coord, entry))
            })
            .collect();
        let results = results?;
        bar.finish_and_clear();

        for (coord, entry) in results {
            self.map.set_entry(coord, entry);
        }
        Ok(())
    }
}

/// One full escape-time orbit: zₙ₊₁ = zₙ² + c with z₀ = c, plus dz/dc for
/// the normal vector.
fn drill_point(opt: &Options, map: &DrillMap, point: Coord) -> MapEntry {
    let limit = opt.location.depth;
    let escape = opt.location.escape;

    let x0 = ExtendedComplex::from(&map.translate(point)).reduced();
    let mut xn = x0;

    let d0 = ExtendedComplex::ONE;
    let mut dn = d0;

    let mut iteration = 0i64;
    loop {
        iteration += 1;
        if iteration >= limit {
            break;
        }

        dn *= xn * 2.0;
        dn += d0;
        dn.reduce();

        xn *= xn;
        xn += x0;
        xn.reduce();

        let norm = xn.norm().as_f64();

        if norm >= escape {
            let mut nv = xn / dn;
            nv.normalize();

            return MapEntry {
                result: DrillResult::Escaped,
                first: 0,
                last: iteration as i32,
                lognorm: norm.ln() as f32,
                zn: xn.as_standard(),
                derivative: dn.as_standard(),
                normal: nv.as_standard(),
            };
        }
    }

    MapEntry {
        result: DrillResult::MaxDepthReached,
        first: 0,
        last: iteration as i32,
        ..MapEntry::default()
    }
}
