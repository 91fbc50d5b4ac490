//! Series approximation.
//!
//! For pixels near the reference, the first iterations of the delta
//! recurrence are a polynomial in the initial offset d₀:
//!
//!   dₙ ≈ Σⱼ a[n][j] · d₀^(j+1)
//!
//! with the coefficient recurrence
//!
//!   a[n][0] = 2·a[n-1][0]·zₙ₋₁ + 1
//!   a[n][j] = 2·a[n-1][j]·zₙ₋₁ + Σₗ a[n-1][l]·a[n-1][j-1-l]
//!
//! Evaluating the polynomial replaces iterating, letting the driller skip
//! a prefix of the loop that probe points have validated.

use crate::error::{Error, Result};
use crate::progress;
use crate::reference::ReferencePoint;
use deepdrill_core::{CancelFlag, ExtendedComplex};

/// Rectangular coefficient table, one row per iteration.
pub struct CoeffTable {
    rows: usize,
    cols: usize,
    coeff: Vec<ExtendedComplex>,
}

impl CoeffTable {
    fn new() -> Self {
        Self {
            rows: 0,
            cols: 0,
            coeff: Vec::new(),
        }
    }

    fn resize(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.coeff.clear();
        self.coeff.resize(rows * cols, ExtendedComplex::ZERO);
    }

    #[inline]
    fn at(&self, row: usize, col: usize) -> ExtendedComplex {
        debug_assert!(row < self.rows && col < self.cols);
        self.coeff[row * self.cols + col]
    }

    #[inline]
    fn set(&mut self, row: usize, col: usize, value: ExtendedComplex) {
        debug_assert!(row < self.rows && col < self.cols);
        self.coeff[row * self.cols + col] = value;
    }

    /// Horner evaluation of `Σⱼ c[iteration][j] · delta^(j+1)`.
    /// `delta` must be reduced on entry.
    fn evaluate(&self, delta: &ExtendedComplex, iteration: usize) -> ExtendedComplex {
        debug_assert!(delta.is_reduced());
        debug_assert!(iteration < self.rows);

        let mut approx = self.at(iteration, self.cols - 1);
        for j in (0..self.cols - 1).rev() {
            approx *= *delta;
            approx += self.at(iteration, j);
            approx.reduce();
        }
        approx *= *delta;
        approx.reduce();
        approx
    }

    /// Horner evaluation of `Σⱼ c[iteration][j] · delta^j` (no trailing
    /// multiply); used with the derivative coefficient table.
    fn evaluate_flat(&self, delta: &ExtendedComplex, iteration: usize) -> ExtendedComplex {
        debug_assert!(delta.is_reduced());
        debug_assert!(iteration < self.rows);

        let mut approx = self.at(iteration, self.cols - 1);
        for j in (0..self.cols - 1).rev() {
            approx *= *delta;
            approx += self.at(iteration, j);
            approx.reduce();
        }
        approx
    }
}

/// Computes and evaluates the coefficient tables for one reference orbit.
pub struct Approximator {
    num: usize,
    /// Series coefficients.
    a: CoeffTable,
    /// Derivative coefficients: b[i][j] = (j+1)·a[i][j].
    b: CoeffTable,
}

impl Default for Approximator {
    fn default() -> Self {
        Self::new()
    }
}

impl Approximator {
    pub fn new() -> Self {
        Self {
            num: 0,
            a: CoeffTable::new(),
            b: CoeffTable::new(),
        }
    }

    pub fn coefficients(&self) -> usize {
        self.num
    }

    /// Fill both tables for the given reference orbit. Rows are computed up
    /// to `min(depth, orbit length)`.
    pub fn compute(
        &mut self,
        reference: &ReferencePoint,
        num_coeff: i64,
        depth: i64,
        cancel: &CancelFlag,
    ) -> Result<()> {
        assert!((2..=64).contains(&num_coeff));

        let num = num_coeff as usize;
        let limit = (depth as usize).min(reference.len());

        let bar = progress::phase("Computing coefficients", limit as u64);

        self.num = num;
        self.a.resize(limit.max(1), num);
        self.a.set(0, 0, ExtendedComplex::ONE);

        for i in 1..limit {
            let zn = reference.xn[i - 1].extended;

            let mut head = self.a.at(i - 1, 0) * zn * 2.0;
            head += ExtendedComplex::ONE;
            head.reduce();
            self.a.set(i, 0, head);

            for j in 1..num {
                let mut c = self.a.at(i - 1, j) * zn * 2.0;
                c.reduce();

                for l in 0..j {
                    c += self.a.at(i - 1, l) * self.a.at(i - 1, j - 1 - l);
                    c.reduce();
                }
                self.a.set(i, j, c);
            }

            if i % 1024 == 0 {
                if cancel.is_cancelled() {
                    return Err(Error::UserInterrupt);
                }
                bar.inc(1024);
            }
        }

        // Derivative of Σ a_j·δ^(j+1) with respect to δ.
        self.b.resize(limit.max(1), num);
        for i in 0..limit {
            for j in 0..num {
                self.b.set(i, j, (self.a.at(i, j) * (j as f64 + 1.0)).reduced());
            }
        }

        bar.finish_and_clear();
        Ok(())
    }

    /// δ ≈ Σⱼ a[iteration][j] · delta^(j+1)
    pub fn evaluate(&self, delta: &ExtendedComplex, iteration: usize) -> ExtendedComplex {
        self.a.evaluate(delta, iteration)
    }

    /// dδ/d(d₀) ≈ Σⱼ (j+1)·a[iteration][j] · delta^j
    pub fn evaluate_derivative(&self, delta: &ExtendedComplex, iteration: usize) -> ExtendedComplex {
        self.b.evaluate_flat(delta, iteration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::ReferenceIteration;
    use deepdrill_core::{Coord, PrecisionComplex, StandardComplex};

    /// Build a reference orbit for c by plain iteration at 128 bits.
    fn orbit(re: f64, im: f64, depth: usize) -> ReferencePoint {
        let location = PrecisionComplex::from_f64(re, im, 128);
        let mut rp = ReferencePoint::new(Coord::new(0, 0), location.clone());

        let mut z = location.clone();
        rp.xn.push(ReferenceIteration::new(&z, 1e-6));
        for _ in 1..depth {
            z = z.square().add(&location);
            rp.xn.push(ReferenceIteration::new(&z, 1e-6));
            if z.to_standard().norm() >= 256.0 {
                rp.escaped = true;
                break;
            }
        }
        rp
    }

    fn compute(rp: &ReferencePoint, num: i64) -> Approximator {
        let mut approx = Approximator::new();
        approx
            .compute(rp, num, rp.len() as i64, &CancelFlag::new())
            .unwrap();
        approx
    }

    #[test]
    fn first_row_is_the_identity() {
        let rp = orbit(-0.5, 0.1, 50);
        let approx = compute(&rp, 5);

        assert_eq!(approx.a.at(0, 0), ExtendedComplex::ONE);
        for j in 1..5 {
            assert!(approx.a.at(0, j).is_zero());
        }
    }

    #[test]
    fn head_coefficient_follows_the_recurrence() {
        let rp = orbit(-0.5, 0.1, 50);
        let approx = compute(&rp, 5);

        for i in 1..rp.len() {
            let expected =
                ((approx.a.at(i - 1, 0) * rp.xn[i - 1].extended * 2.0) + ExtendedComplex::ONE)
                    .reduced();
            assert_eq!(approx.a.at(i, 0), expected, "row {}", i);
        }
    }

    #[test]
    fn evaluation_at_zero_delta_is_zero() {
        let rp = orbit(-0.5, 0.1, 50);
        let approx = compute(&rp, 5);

        let zero = ExtendedComplex::ZERO;
        let out = approx.evaluate(&zero, 20);
        assert!(out.is_zero() || out.norm().as_f64() == 0.0);
    }

    #[test]
    fn series_matches_naive_delta_iteration() {
        // Near the reference, evaluating the polynomial must agree with
        // iterating dₙ₊₁ = dₙ·(2·zₙ + dₙ) + d₀.
        let rp = orbit(-0.5, 0.1, 60);
        let approx = compute(&rp, 10);

        let d0 = ExtendedComplex::new(1e-8, -2e-8).reduced();
        let mut dn = d0;

        for i in 1..30.min(rp.len()) {
            dn *= rp.xn[i - 1].extended2 + dn;
            dn += d0;
            dn.reduce();

            let predicted = approx.evaluate(&d0, i);
            let err = (predicted - dn).norm().as_f64() / dn.norm().as_f64();
            assert!(err < 1e-9, "iteration {}: relative error {}", i, err);
        }
    }

    #[test]
    fn derivative_series_matches_finite_difference() {
        let rp = orbit(-0.5, 0.1, 60);
        let approx = compute(&rp, 10);

        let h = 1e-12;
        let d0 = ExtendedComplex::new(1e-8, 0.0).reduced();
        let d0h = ExtendedComplex::new(1e-8 + h, 0.0).reduced();
        let iteration = 20;

        let f0 = approx.evaluate(&d0, iteration).as_standard();
        let f1 = approx.evaluate(&d0h, iteration).as_standard();
        let deriv = approx.evaluate_derivative(&d0, iteration).as_standard();

        let fd = StandardComplex::new((f1.re - f0.re) / h, (f1.im - f0.im) / h);
        let rel = (StandardComplex::new(deriv.re - fd.re, deriv.im - fd.im)).abs() / deriv.abs();
        assert!(rel < 1e-3, "derivative mismatch: {} vs {}", deriv, fd);
    }

    #[test]
    fn cancellation_aborts_computation() {
        let rp = orbit(-0.5, 0.1, 3000);
        let cancel = CancelFlag::new();
        cancel.cancel();

        let mut approx = Approximator::new();
        let result = approx.compute(&rp, 5, rp.len() as i64, &cancel);
        assert!(matches!(result, Err(Error::UserInterrupt)));
    }
}
