//! Plain double-precision complex numbers.
//!
//! Used wherever magnitudes are known to be bounded: map entries, escape
//! thresholds, normal vectors. Deep-zoom deltas live in `ExtendedComplex`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Complex number with f64 components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardComplex {
    pub re: f64,
    pub im: f64,
}

impl StandardComplex {
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };
    pub const ONE: Self = Self { re: 1.0, im: 0.0 };

    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Squared magnitude: |z|² = re² + im²
    #[inline]
    pub fn norm(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    /// Magnitude, computed without intermediate overflow.
    #[inline]
    pub fn abs(&self) -> f64 {
        let absr = self.re.abs();
        let absi = self.im.abs();
        if absr == 0.0 && absi == 0.0 {
            return 0.0;
        }
        if absr > absi {
            absr * (1.0 + (absi / absr) * (absi / absr)).sqrt()
        } else {
            absi * (1.0 + (absr / absi) * (absr / absi)).sqrt()
        }
    }

    /// Argument in radians.
    #[inline]
    pub fn arg(&self) -> f64 {
        self.im.atan2(self.re)
    }

    #[inline]
    pub fn conjugate(&self) -> Self {
        Self {
            re: self.re,
            im: -self.im,
        }
    }

    #[inline]
    pub fn square(&self) -> Self {
        *self * *self
    }

    #[inline]
    pub fn reciprocal(&self) -> Self {
        let inv = 1.0 / self.norm();
        Self {
            re: self.re * inv,
            im: -self.im * inv,
        }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }
}

impl Add for StandardComplex {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            re: self.re + other.re,
            im: self.im + other.im,
        }
    }
}

impl AddAssign for StandardComplex {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.re += other.re;
        self.im += other.im;
    }
}

impl Sub for StandardComplex {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            re: self.re - other.re,
            im: self.im - other.im,
        }
    }
}

impl SubAssign for StandardComplex {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.re -= other.re;
        self.im -= other.im;
    }
}

impl Mul for StandardComplex {
    type Output = Self;

    #[inline]
    fn mul(self, other: Self) -> Self {
        Self {
            re: self.re * other.re - self.im * other.im,
            im: self.re * other.im + self.im * other.re,
        }
    }
}

impl MulAssign for StandardComplex {
    #[inline]
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}

impl Mul<f64> for StandardComplex {
    type Output = Self;

    #[inline]
    fn mul(self, scale: f64) -> Self {
        Self {
            re: self.re * scale,
            im: self.im * scale,
        }
    }
}

impl MulAssign<f64> for StandardComplex {
    #[inline]
    fn mul_assign(&mut self, scale: f64) {
        self.re *= scale;
        self.im *= scale;
    }
}

impl Div for StandardComplex {
    type Output = Self;

    #[inline]
    fn div(self, other: Self) -> Self {
        self * other.reciprocal()
    }
}

impl DivAssign for StandardComplex {
    #[inline]
    fn div_assign(&mut self, other: Self) {
        *self = *self / other;
    }
}

impl Neg for StandardComplex {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            re: -self.re,
            im: -self.im,
        }
    }
}

impl fmt::Display for StandardComplex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{}i)", self.re, self.im)
    }
}
