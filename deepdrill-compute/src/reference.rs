//! Reference orbits.
//!
//! One pixel per round is iterated at full precision; every other pixel in
//! the round is expressed as a low-precision delta against this orbit. Each
//! iteration caches the values the delta loop touches: the extended form of
//! zₙ, the precomputed 2·zₙ, and the glitch tolerance `T² · ‖zₙ‖²`.

use deepdrill_core::{Coord, ExtendedComplex, PrecisionComplex, StandardComplex};

pub struct ReferenceIteration {
    /// zₙ in f64 precision.
    pub standard: StandardComplex,
    /// zₙ in extended precision, reduced.
    pub extended: ExtendedComplex,
    /// 2·zₙ in extended precision, reduced.
    pub extended2: ExtendedComplex,
    /// Glitch tolerance for this iteration: T² · ‖zₙ‖².
    pub tolerance: f64,
}

impl ReferenceIteration {
    pub fn new(z: &PrecisionComplex, perturbation_tolerance: f64) -> Self {
        let standard = z.to_standard();

        let extended = ExtendedComplex::from(z).reduced();
        let extended2 = (extended * 2.0).reduced();

        let tt = perturbation_tolerance * perturbation_tolerance;
        Self {
            standard,
            extended,
            extended2,
            tolerance: tt * standard.norm(),
        }
    }
}

pub struct ReferencePoint {
    /// Pixel coordinate of the reference.
    pub coord: Coord,
    /// Plane location of the reference.
    pub location: PrecisionComplex,
    /// The computed orbit; grows until escape or the depth limit.
    pub xn: Vec<ReferenceIteration>,
    /// Iterations the series approximation may skip for this reference.
    pub skipped: i64,
    /// Whether the orbit left the escape radius.
    pub escaped: bool,
    /// ‖zₙ‖² at the end of the orbit.
    pub norm: f64,
}

impl ReferencePoint {
    pub fn new(coord: Coord, location: PrecisionComplex) -> Self {
        Self {
            coord,
            location,
            xn: Vec::new(),
            skipped: 0,
            escaped: false,
            norm: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.xn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xn.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_caches_doubled_value() {
        let z = PrecisionComplex::from_f64(-0.5, 0.25, 128);
        let it = ReferenceIteration::new(&z, 1e-6);

        let s = it.extended.as_standard();
        let s2 = it.extended2.as_standard();
        assert!((s.re * 2.0 - s2.re).abs() < 1e-15);
        assert!((s.im * 2.0 - s2.im).abs() < 1e-15);
        assert!(it.extended.is_reduced());
        assert!(it.extended2.is_reduced());
    }

    #[test]
    fn tolerance_is_squared_times_norm() {
        let z = PrecisionComplex::from_f64(3.0, 4.0, 128);
        let it = ReferenceIteration::new(&z, 1e-3);
        // (1e-3)² · 25
        assert!((it.tolerance - 25e-6).abs() < 1e-18);
    }

    #[test]
    fn fresh_reference_point_is_empty() {
        let rp = ReferencePoint::new(Coord::new(5, 5), PrecisionComplex::zero(128));
        assert!(rp.is_empty());
        assert!(!rp.escaped);
        assert_eq!(rp.skipped, 0);
    }
}
