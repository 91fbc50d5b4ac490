//! Complex numbers over arbitrary-precision reals.
//!
//! Reference-orbit iteration happens in this type. Also hosts the
//! closed-form interior tests for the two large components of the set,
//! which only need the high-precision coordinates.

use crate::{BigFloat, StandardComplex};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrecisionComplex {
    pub re: BigFloat,
    pub im: BigFloat,
}

impl PrecisionComplex {
    pub fn new(re: BigFloat, im: BigFloat) -> Self {
        Self { re, im }
    }

    pub fn zero(precision_bits: usize) -> Self {
        Self {
            re: BigFloat::zero(precision_bits),
            im: BigFloat::zero(precision_bits),
        }
    }

    pub fn from_f64(re: f64, im: f64, precision_bits: usize) -> Self {
        Self {
            re: BigFloat::with_precision(re, precision_bits),
            im: BigFloat::with_precision(im, precision_bits),
        }
    }

    pub fn precision_bits(&self) -> usize {
        self.re.precision_bits().max(self.im.precision_bits())
    }

    /// Squared magnitude.
    pub fn norm(&self) -> BigFloat {
        self.re.mul(&self.re).add(&self.im.mul(&self.im))
    }

    pub fn abs(&self) -> BigFloat {
        self.norm().sqrt()
    }

    pub fn add(&self, other: &Self) -> Self {
        Self {
            re: self.re.add(&other.re),
            im: self.im.add(&other.im),
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self {
            re: self.re.sub(&other.re),
            im: self.im.sub(&other.im),
        }
    }

    pub fn mul(&self, other: &Self) -> Self {
        Self {
            re: self.re.mul(&other.re).sub(&self.im.mul(&other.im)),
            im: self.re.mul(&other.im).add(&self.im.mul(&other.re)),
        }
    }

    /// (a + bi)² = (a² − b²) + 2abi
    pub fn square(&self) -> Self {
        Self {
            re: self.re.mul(&self.re).sub(&self.im.mul(&self.im)),
            im: self.re.mul(&self.im).mul_f64(2.0),
        }
    }

    pub fn mul_scalar(&self, scale: &BigFloat) -> Self {
        Self {
            re: self.re.mul(scale),
            im: self.im.mul(scale),
        }
    }

    pub fn mul_f64(&self, scale: f64) -> Self {
        Self {
            re: self.re.mul_f64(scale),
            im: self.im.mul_f64(scale),
        }
    }

    pub fn to_standard(&self) -> StandardComplex {
        StandardComplex::new(self.re.to_f64(), self.im.to_f64())
    }

    /// Membership test for the period-2 bulb: (x+1)² + y² ≤ 1/16.
    pub fn in_main_bulb(&self) -> bool {
        let prec = self.precision_bits();
        let x1 = self.re.add(&BigFloat::one(prec));
        let lhs = x1.mul(&x1).add(&self.im.mul(&self.im));
        lhs <= BigFloat::with_precision(0.0625, prec.min(64))
    }

    /// Membership test for the cardioid:
    /// q = (x − 1/4)² + y², point is inside iff q·(q + (x − 1/4)) ≤ y²/4.
    pub fn in_cardioid(&self) -> bool {
        let prec = self.precision_bits();
        let xq = self.re.sub(&BigFloat::with_precision(0.25, prec.min(64)));
        let y_sq = self.im.mul(&self.im);
        let q = xq.mul(&xq).add(&y_sq);
        q.mul(&q.add(&xq)) <= y_sq.mul_f64(0.25)
    }
}

impl fmt::Display for PrecisionComplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}i)", self.re, self.im)
    }
}
