//! Extended-range complex numbers with a shared binary exponent.
//!
//! Both mantissa components scale by the same `2^exponent`, so complex
//! multiplication stays a plain f64 complex multiply plus one exponent add.
//! This is the workhorse type of the delta iteration.

use crate::extended::ldexp_i64;
use crate::{BigFloat, ExtendedDouble, PrecisionComplex, StandardComplex};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Sub, SubAssign};

/// Value = mantissa × 2^exponent, componentwise.
///
/// Reduced when at least one of |re|, |im| lies in `[0.5, 1.0)`, or both are
/// zero with exponent zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedComplex {
    pub mantissa: StandardComplex,
    pub exponent: i64,
}

impl ExtendedComplex {
    pub const ZERO: Self = Self {
        mantissa: StandardComplex::ZERO,
        exponent: 0,
    };

    pub const ONE: Self = Self {
        mantissa: StandardComplex::ONE,
        exponent: 0,
    };

    #[inline]
    pub fn new(re: f64, im: f64) -> Self {
        Self {
            mantissa: StandardComplex::new(re, im),
            exponent: 0,
        }
    }

    #[inline]
    pub fn from_mantissa(mantissa: StandardComplex, exponent: i64) -> Self {
        Self { mantissa, exponent }
    }

    /// Combine two independently-scaled components into one shared exponent.
    /// The smaller component's mantissa is shifted down; a shift past the
    /// f64 range flushes it to zero, same as the value it represents.
    pub fn from_extended_doubles(re: ExtendedDouble, im: ExtendedDouble) -> Self {
        if re.mantissa == 0.0 {
            Self {
                mantissa: StandardComplex::new(re.mantissa, im.mantissa),
                exponent: im.exponent,
            }
        } else if im.mantissa == 0.0 {
            Self {
                mantissa: StandardComplex::new(re.mantissa, im.mantissa),
                exponent: re.exponent,
            }
        } else if re.exponent < im.exponent {
            Self {
                mantissa: StandardComplex::new(
                    ldexp_i64(re.mantissa, re.exponent - im.exponent),
                    im.mantissa,
                ),
                exponent: im.exponent,
            }
        } else {
            Self {
                mantissa: StandardComplex::new(
                    re.mantissa,
                    ldexp_i64(im.mantissa, im.exponent - re.exponent),
                ),
                exponent: re.exponent,
            }
        }
    }

    /// Squared magnitude as an extended double.
    #[inline]
    pub fn norm(&self) -> ExtendedDouble {
        ExtendedDouble::new(self.mantissa.norm(), 2 * self.exponent)
    }

    /// Magnitude as an extended double.
    #[inline]
    pub fn abs(&self) -> ExtendedDouble {
        ExtendedDouble::new(self.mantissa.abs(), self.exponent)
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Normalize the larger mantissa component into `[0.5, 1.0)`, scaling
    /// the other by the same power of two.
    pub fn reduce(&mut self) {
        let posre = self.mantissa.re.abs();
        let posim = self.mantissa.im.abs();

        if posre == 0.0 && posim == 0.0 {
            self.exponent = 0;
        } else if posre > posim {
            let (m, e) = libm::frexp(self.mantissa.re);
            self.mantissa.re = m;
            self.mantissa.im = libm::ldexp(self.mantissa.im, -e);
            self.exponent += e as i64;
        } else {
            let (m, e) = libm::frexp(self.mantissa.im);
            self.mantissa.im = m;
            self.mantissa.re = libm::ldexp(self.mantissa.re, -e);
            self.exponent += e as i64;
        }
    }

    /// Reduced copy.
    #[inline]
    pub fn reduced(mut self) -> Self {
        self.reduce();
        self
    }

    pub fn is_reduced(&self) -> bool {
        let posre = self.mantissa.re.abs();
        let posim = self.mantissa.im.abs();

        if self.mantissa.is_zero() {
            self.exponent == 0
        } else {
            (0.5..1.0).contains(&posre) || (0.5..1.0).contains(&posim)
        }
    }

    /// Scale to unit length, reduced. Used for normal-map vectors.
    pub fn normalize(&mut self) {
        let scale = self.abs().reciprocal();
        *self *= scale;
        self.reduce();
    }

    #[inline]
    pub fn square(&self) -> Self {
        *self * *self
    }

    #[inline]
    pub fn conjugate(&self) -> Self {
        Self {
            mantissa: self.mantissa.conjugate(),
            exponent: self.exponent,
        }
    }

    #[inline]
    pub fn reciprocal(&self) -> Self {
        let mut result = self.conjugate();
        result *= self.norm().reciprocal();
        result
    }

    /// Convert to f64 components. Saturates outside the f64 range.
    #[inline]
    pub fn as_standard(&self) -> StandardComplex {
        StandardComplex::new(
            ldexp_i64(self.mantissa.re, self.exponent),
            ldexp_i64(self.mantissa.im, self.exponent),
        )
    }
}

impl From<StandardComplex> for ExtendedComplex {
    fn from(mantissa: StandardComplex) -> Self {
        Self {
            mantissa,
            exponent: 0,
        }
    }
}

impl From<&PrecisionComplex> for ExtendedComplex {
    fn from(value: &PrecisionComplex) -> Self {
        Self::from_extended_doubles(
            ExtendedDouble::from(&value.re),
            ExtendedDouble::from(&value.im),
        )
    }
}

impl From<(&BigFloat, &BigFloat)> for ExtendedComplex {
    fn from((re, im): (&BigFloat, &BigFloat)) -> Self {
        Self::from_extended_doubles(ExtendedDouble::from(re), ExtendedDouble::from(im))
    }
}

impl Add for ExtendedComplex {
    type Output = Self;

    #[inline]
    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

impl AddAssign for ExtendedComplex {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        if self.exponent > other.exponent {
            self.mantissa += other.mantissa * ldexp_i64(1.0, other.exponent - self.exponent);
        } else {
            self.mantissa *= ldexp_i64(1.0, self.exponent - other.exponent);
            self.mantissa += other.mantissa;
            self.exponent = other.exponent;
        }
    }
}

impl Sub for ExtendedComplex {
    type Output = Self;

    #[inline]
    fn sub(mut self, other: Self) -> Self {
        self -= other;
        self
    }
}

impl SubAssign for ExtendedComplex {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        if self.exponent > other.exponent {
            self.mantissa -= other.mantissa * ldexp_i64(1.0, other.exponent - self.exponent);
        } else {
            self.mantissa *= ldexp_i64(1.0, self.exponent - other.exponent);
            self.mantissa -= other.mantissa;
            self.exponent = other.exponent;
        }
    }
}

impl Mul for ExtendedComplex {
    type Output = Self;

    #[inline]
    fn mul(self, other: Self) -> Self {
        Self {
            mantissa: self.mantissa * other.mantissa,
            exponent: self.exponent + other.exponent,
        }
    }
}

impl MulAssign for ExtendedComplex {
    #[inline]
    fn mul_assign(&mut self, other: Self) {
        self.mantissa *= other.mantissa;
        self.exponent += other.exponent;
    }
}

impl Mul<ExtendedDouble> for ExtendedComplex {
    type Output = Self;

    #[inline]
    fn mul(self, other: ExtendedDouble) -> Self {
        Self {
            mantissa: self.mantissa * other.mantissa,
            exponent: self.exponent + other.exponent,
        }
    }
}

impl MulAssign<ExtendedDouble> for ExtendedComplex {
    #[inline]
    fn mul_assign(&mut self, other: ExtendedDouble) {
        self.mantissa *= other.mantissa;
        self.exponent += other.exponent;
    }
}

impl Mul<f64> for ExtendedComplex {
    type Output = Self;

    #[inline]
    fn mul(self, scale: f64) -> Self {
        Self {
            mantissa: self.mantissa * scale,
            exponent: self.exponent,
        }
    }
}

impl Div for ExtendedComplex {
    type Output = Self;

    #[inline]
    fn div(self, other: Self) -> Self {
        self * other.reciprocal()
    }
}

impl Div<f64> for ExtendedComplex {
    type Output = Self;

    #[inline]
    fn div(self, scale: f64) -> Self {
        Self {
            mantissa: StandardComplex::new(self.mantissa.re / scale, self.mantissa.im / scale),
            exponent: self.exponent,
        }
    }
}

impl DivAssign for ExtendedComplex {
    #[inline]
    fn div_assign(&mut self, other: Self) {
        *self = *self / other;
    }
}
