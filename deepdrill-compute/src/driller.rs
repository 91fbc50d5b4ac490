//! The drill loop.
//!
//! One round: pick a reference pixel, iterate its orbit at full precision,
//! derive series coefficients, let probe points decide how many iterations
//! the series may skip, then run every remaining pixel through the delta
//! recurrence. Pixels whose iterate falls inside the per-iteration glitch
//! tolerance cannot be resolved against this reference; they are collected
//! and retried in the next round against a reference picked from their own
//! ranks. The `badpixels` fraction bounds what may stay unresolved when the
//! round budget runs out.

use crate::coefficients::Approximator;
use crate::error::{Error, Result};
use crate::map::{DrillMap, DrillResult, MapEntry};
use crate::options::Options;
use crate::progress;
use crate::reference::{ReferenceIteration, ReferencePoint};
use deepdrill_core::{CancelFlag, Coord, ExtendedComplex, PrecisionComplex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info};

/// Margin subtracted from the first failing probe iteration.
const PROBE_SAFETY_MARGIN: i64 = 4;

/// First periodicity sample happens this many iterations in.
const PERIOD_SAMPLE_OFFSET: i64 = 16;

pub struct Driller<'a> {
    opt: &'a Options,
    map: &'a mut DrillMap,
    cancel: CancelFlag,
    rng: StdRng,
    reference: ReferencePoint,
    approximator: Approximator,
    glitch_history: Vec<usize>,
}

impl<'a> Driller<'a> {
    pub fn new(opt: &'a Options, map: &'a mut DrillMap) -> Self {
        Self::with_cancel(opt, map, CancelFlag::new())
    }

    pub fn with_cancel(opt: &'a Options, map: &'a mut DrillMap, cancel: CancelFlag) -> Self {
        let center = map.center_coord();
        let location = map.translate(center);
        Self {
            opt,
            map,
            cancel,
            rng: StdRng::from_os_rng(),
            reference: ReferencePoint::new(center, location),
            approximator: Approximator::new(),
            glitch_history: Vec::new(),
        }
    }

    /// Fix the reference-selection RNG for reproducible runs.
    pub fn with_seed(opt: &'a Options, map: &'a mut DrillMap, seed: u64) -> Self {
        let mut driller = Self::new(opt, map);
        driller.set_seed(seed);
        driller
    }

    /// Re-seed the reference-selection RNG.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Glitch count left after each completed round.
    pub fn glitch_history(&self) -> &[usize] {
        &self.glitch_history
    }

    /// Drill every pixel of the map.
    pub fn drill(&mut self) -> Result<()> {
        self.glitch_history.clear();

        let mut remaining = self.collect_coordinates()?;
        let threshold = self.opt.badpixel_threshold();

        debug!(
            center = %self.map.center,
            depth = self.opt.location.depth,
            escape = self.opt.location.escape,
            width = self.map.width,
            height = self.map.height,
            precision = self.opt.precision_bits,
            "drill started"
        );

        for round in 1..=self.opt.perturbation.rounds {
            if remaining.len() <= threshold {
                break;
            }
            if self.cancel.is_cancelled() {
                return Err(Error::UserInterrupt);
            }

            info!(
                round,
                total_rounds = self.opt.perturbation.rounds,
                remaining = remaining.len(),
                "drill round"
            );

            // Round 1 drills against the image center; retries pick a
            // random member of the previous round's glitch set.
            self.reference = self.pick_reference(round == 1, &remaining);
            self.drill_reference()?;

            debug!(
                reference = %self.reference.coord,
                depth = self.reference.len(),
                escaped = self.reference.escaped,
                "reference orbit done"
            );

            // The dz/dz product feeding the attractor check cannot be
            // reconstructed across a skipped prefix, so that check forces
            // the full loop.
            if self.opt.approximation.enable && !self.opt.attractorcheck.enable {
                self.approximator.compute(
                    &self.reference,
                    self.opt.approximation.coefficients,
                    self.opt.location.depth,
                    &self.cancel,
                )?;

                self.reference.skipped = self.probe_skip_count()?;
                debug!(skipped = self.reference.skipped, "series skip validated");
            } else {
                self.reference.skipped = 0;
            }

            let glitches = self.drill_pixels(&remaining)?;
            debug!(glitches = glitches.len(), "round finished");
            self.glitch_history.push(glitches.len());
            remaining = glitches;
        }

        info!(unresolved = remaining.len(), "all rounds completed");
        Ok(())
    }

    /// All drill coordinates, minus the pixels the closed-form interior
    /// tests can classify outright.
    ///
    /// An 8×8 mesh decides whether the map intersects the bulb or cardioid
    /// at all; only then is the per-pixel test worth running.
    fn collect_coordinates(&mut self) -> Result<Vec<Coord>> {
        let (width, height) = (self.map.width, self.map.height);
        let mut remaining = Vec::with_capacity(width * height);

        if !self.opt.areacheck.enable {
            for y in 0..height {
                for x in 0..width {
                    remaining.push(Coord::new(x as i32, y as i32));
                }
            }
            return Ok(remaining);
        }

        let bar = progress::phase("Running the area check", (width * height) as u64);

        let hit = self
            .map
            .mesh(8, 8)
            .into_iter()
            .map(|c| self.map.translate(c))
            .any(|c| c.in_cardioid() || c.in_main_bulb());

        for y in 0..height {
            if self.cancel.is_cancelled() {
                return Err(Error::UserInterrupt);
            }
            for x in 0..width {
                let coord = Coord::new(x as i32, y as i32);
                if hit {
                    let location = self.map.translate(coord);
                    if location.in_cardioid() {
                        self.map.set_entry(
                            coord,
                            MapEntry {
                                result: DrillResult::InCardioid,
                                ..MapEntry::default()
                            },
                        );
                        continue;
                    }
                    if location.in_main_bulb() {
                        self.map.set_entry(
                            coord,
                            MapEntry {
                                result: DrillResult::InBulb,
                                ..MapEntry::default()
                            },
                        );
                        continue;
                    }
                }
                remaining.push(coord);
            }
            bar.inc(width as u64);
        }

        bar.finish_and_clear();
        Ok(remaining)
    }

    fn pick_reference(&mut self, first_round: bool, glitches: &[Coord]) -> ReferencePoint {
        let coord = if first_round || glitches.is_empty() {
            self.map.center_coord()
        } else {
            glitches[self.rng.random_range(0..glitches.len())]
        };
        ReferencePoint::new(coord, self.map.translate(coord))
    }

    /// Iterate the reference orbit at full precision, caching one
    /// `ReferenceIteration` per step and writing the reference pixel's own
    /// map entry.
    fn drill_reference(&mut self) -> Result<()> {
        let depth = self.opt.location.depth;
        let escape = self.opt.location.escape;
        let tolerance = self.opt.perturbation.tolerance;

        let bar = progress::phase("Computing reference orbit", depth as u64);

        let reference = &mut self.reference;
        reference.xn.clear();
        reference.escaped = false;
        reference.skipped = 0;

        let location = reference.location.clone();
        let mut z = location.clone();

        // dz/dc, for the normal vector of the reference pixel itself.
        let d0 = PrecisionComplex::from_f64(1.0, 0.0, self.opt.precision_bits);
        let mut dn = d0.clone();

        reference.xn.push(ReferenceIteration::new(&z, tolerance));

        for i in 1..depth {
            dn = dn.mul(&z).mul_f64(2.0).add(&d0);
            z = z.square().add(&location);

            reference.xn.push(ReferenceIteration::new(&z, tolerance));

            let norm = z.to_standard().norm();
            reference.norm = norm;

            if norm >= escape {
                let mut nv = ExtendedComplex::from(&z) / ExtendedComplex::from(&dn);
                nv.normalize();

                reference.escaped = true;
                let entry = MapEntry {
                    result: DrillResult::Escaped,
                    first: 0,
                    last: i as i32,
                    lognorm: norm.ln() as f32,
                    zn: z.to_standard(),
                    derivative: dn.to_standard(),
                    normal: nv.as_standard(),
                };
                let coord = reference.coord;
                bar.finish_and_clear();
                self.map.set_entry(coord, entry);
                return Ok(());
            }

            if i % 1024 == 0 {
                if self.cancel.is_cancelled() {
                    return Err(Error::UserInterrupt);
                }
                bar.inc(1024);
            }
        }

        let entry = MapEntry {
            result: DrillResult::MaxDepthReached,
            first: 0,
            last: depth as i32,
            ..MapEntry::default()
        };
        let coord = reference.coord;
        bar.finish_and_clear();
        self.map.set_entry(coord, entry);
        Ok(())
    }

    /// Validate the series against probe points and return the number of
    /// iterations safe to skip, clamped so the main loop always runs.
    fn probe_skip_count(&mut self) -> Result<i64> {
        let probes = self.map.mesh(2, 2);
        let bar = progress::phase("Checking probe points", probes.len() as u64);

        let mut skip = self.opt.location.depth - 1;
        for probe in probes {
            skip = skip.min(self.drill_probe(probe));
            if self.cancel.is_cancelled() {
                return Err(Error::UserInterrupt);
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        Ok(skip.clamp(0, (self.reference.len() as i64 - 2).max(0)))
    }

    /// Iterate one probe and compare against the series prediction; the
    /// first iteration whose relative error exceeds the tolerance bounds
    /// the skip, minus a safety margin.
    fn drill_probe(&self, probe: Coord) -> i64 {
        let limit = self.reference.len() as i64;
        let tolerance = self.opt.approximation.tolerance;

        let d0 = self.map.distance(probe, self.reference.coord);
        if d0.is_zero() {
            // The probe sits on the reference; the series is exact there.
            return limit;
        }
        let mut dn = d0;

        let mut iteration = 0;
        loop {
            iteration += 1;
            if iteration >= limit {
                return limit;
            }

            dn *= self.reference.xn[(iteration - 1) as usize].extended2 + dn;
            dn += d0;
            dn.reduce();

            let approx = self.approximator.evaluate(&d0, iteration as usize);
            let error = ((approx - dn).norm() / dn.norm()).reduced().as_f64();

            if error > tolerance {
                return (iteration - PROBE_SAFETY_MARGIN).max(0);
            }
        }
    }

    /// Run every remaining pixel through the delta recurrence and collect
    /// the glitched ones, in pixel order.
    fn drill_pixels(&mut self, remaining: &[Coord]) -> Result<Vec<Coord>> {
        let bar = progress::phase("Computing delta orbits", remaining.len() as u64);

        let opt = self.opt;
        let map = &*self.map;
        let reference = &self.reference;
        let approximator = &self.approximator;
        let cancel = &self.cancel;

        let results: Result<Vec<(Coord, Option<MapEntry>)>> = remaining
            .par_iter()
            .map(|&coord| {
                if cancel.is_cancelled() {
                    return Err(Error::UserInterrupt);
                }
                let entry = drill_delta(opt, map, reference, approximator, coord);
                bar.inc(1);
                Ok((coord, entry))
            })
            .collect();
        let results = results?;
        bar.finish_and_clear();

        let mut glitches = Vec::new();
        for (coord, entry) in results {
            if let Some(entry) = entry {
                if entry.result == DrillResult::Glitch {
                    glitches.push(coord);
                }
                self.map.set_entry(coord, entry);
            }
        }
        Ok(glitches)
    }
}

/// Perturbation iteration for one pixel. Returns `None` for the reference
/// pixel itself (its entry was written with the orbit).
fn drill_delta(
    opt: &Options,
    map: &DrillMap,
    reference: &ReferencePoint,
    approximator: &Approximator,
    point: Coord,
) -> Option<MapEntry> {
    if point == reference.coord {
        return None;
    }

    let limit = reference.len() as i64;
    let escape = opt.location.escape;
    let skipped = reference.skipped;

    let d0 = map.distance(point, reference.coord);
    let mut dn = d0;

    // dz/dc drives the normal vector; dz/dz drives the attractor check.
    let dd0 = ExtendedComplex::ONE;
    let mut ddn = dd0;
    let mut derz = ExtendedComplex::ONE;

    let mut iteration = skipped;

    if skipped > 0 {
        dn = approximator.evaluate(&d0, skipped as usize).reduced();
        ddn = approximator
            .evaluate_derivative(&d0, skipped as usize)
            .reduced();
    }

    // Periodicity sampling: keep a snapshot of dn (after any series
    // re-seed) and compare against it over exponentially growing windows.
    let mut sample = dn;
    let mut next_sample = iteration + PERIOD_SAMPLE_OFFSET;

    loop {
        iteration += 1;
        if iteration >= limit {
            break;
        }

        let it = iteration as usize;
        let zref2 = reference.xn[it - 1].extended2;

        ddn *= zref2 + dn * 2.0;
        ddn += dd0;
        ddn.reduce();

        derz *= zref2 + dn * 2.0;
        derz.reduce();

        dn *= zref2 + dn;
        dn += d0;
        dn.reduce();

        let zn = reference.xn[it].extended + dn;
        let norm = zn.norm().as_f64();

        // A vanishing iterate means the linearization lost the pixel; it
        // needs a closer reference.
        if norm < reference.xn[it].tolerance {
            return Some(MapEntry {
                result: DrillResult::Glitch,
                first: skipped as i32,
                last: iteration as i32,
                ..MapEntry::default()
            });
        }

        if opt.periodcheck.enable {
            if (dn - sample).norm().as_f64() < opt.periodcheck.tolerance {
                return Some(MapEntry {
                    result: DrillResult::Periodic,
                    first: skipped as i32,
                    last: iteration as i32,
                    ..MapEntry::default()
                });
            }
            if iteration == next_sample {
                sample = dn;
                next_sample = (next_sample as f64 * 1.5) as i64;
            }
        }

        if opt.attractorcheck.enable && derz.norm().as_f64() < opt.attractorcheck.tolerance {
            return Some(MapEntry {
                result: DrillResult::Attracted,
                first: skipped as i32,
                last: iteration as i32,
                ..MapEntry::default()
            });
        }

        if norm >= escape {
            let mut nv = zn / ddn;
            nv.normalize();

            return Some(MapEntry {
                result: DrillResult::Escaped,
                first: skipped as i32,
                last: iteration as i32,
                lognorm: norm.ln() as f32,
                zn: zn.as_standard(),
                derivative: ddn.as_standard(),
                normal: nv.as_standard(),
            });
        }
    }

    // Ran out of reference orbit. A full-depth orbit means the pixel is
    // (likely) inside the set; a shorter one means the reference escaped
    // first and the pixel must retry against a deeper reference.
    if limit == opt.location.depth {
        Some(MapEntry {
            result: DrillResult::MaxDepthReached,
            first: skipped as i32,
            last: iteration as i32,
            ..MapEntry::default()
        })
    } else {
        Some(MapEntry {
            result: DrillResult::Glitch,
            first: skipped as i32,
            last: iteration as i32,
            ..MapEntry::default()
        })
    }
}
