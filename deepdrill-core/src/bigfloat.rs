//! Arbitrary-precision floating point with explicit precision enforcement.
//!
//! Values at 64 bits or less live in a plain f64; anything wider promotes
//! to `FBig`. The split is invisible to callers: every operation dispatches
//! through the same two-path helpers. The reference orbit, pixel locations
//! and pixel deltas live in this type; everything inside the delta loop
//! uses `ExtendedDouble`/`ExtendedComplex` instead.

use dashu_base::{Abs, Approximation};
use dashu_float::ops::SquareRoot;
use dashu_float::{DBig, FBig};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Clone, Debug)]
pub struct BigFloat {
    repr: Repr,
    bits: usize,
}

#[derive(Clone, Debug)]
enum Repr {
    Double(f64),
    Big(FBig),
}

impl Repr {
    fn from_f64(val: f64, bits: usize) -> Self {
        if bits <= 64 {
            return Repr::Double(val);
        }
        let fbig = if val == 0.0 {
            FBig::ZERO.with_precision(bits).unwrap()
        } else {
            FBig::try_from(val).unwrap().with_precision(bits).unwrap()
        };
        Repr::Big(fbig)
    }

    /// Widen to `FBig` at the given precision.
    fn promote(&self, bits: usize) -> FBig {
        match self {
            Repr::Double(v) if *v == 0.0 => FBig::ZERO.with_precision(bits).unwrap(),
            Repr::Double(v) => FBig::try_from(*v).unwrap().with_precision(bits).unwrap(),
            Repr::Big(v) => v.clone(),
        }
    }
}

impl BigFloat {
    /// Create from f64 with explicit precision.
    pub fn with_precision(val: f64, bits: usize) -> Self {
        Self {
            repr: Repr::from_f64(val, bits),
            bits,
        }
    }

    /// Create from f64 at the process-wide default precision.
    pub fn with_default_precision(val: f64) -> Self {
        Self::with_precision(val, crate::default_precision())
    }

    pub fn zero(bits: usize) -> Self {
        Self::with_precision(0.0, bits)
    }

    pub fn one(bits: usize) -> Self {
        Self::with_precision(1.0, bits)
    }

    pub fn precision_bits(&self) -> usize {
        self.bits
    }

    /// Convert to f64. Loses precision past 53 bits; over/underflows outside
    /// the f64 range.
    pub fn to_f64(&self) -> f64 {
        match &self.repr {
            Repr::Double(v) => *v,
            Repr::Big(v) => v.to_f64().value(),
        }
    }

    /// Parse a decimal string with explicit precision.
    ///
    /// Allows values beyond f64 range (e.g. "1e1000"). The base conversion
    /// happens at the target precision so no digits are lost.
    pub fn from_string(val: &str, bits: usize) -> Result<Self, String> {
        let repr = if bits <= 64 {
            Repr::Double(
                val.parse::<f64>()
                    .map_err(|e| format!("failed to parse f64: {}", e))?,
            )
        } else {
            let decimal = val
                .parse::<DBig>()
                .map_err(|e| format!("failed to parse decimal: {}", e))?;
            let binary = match decimal.with_base_and_precision::<2>(bits) {
                Approximation::Exact(v) => v,
                Approximation::Inexact(v, _) => v,
            };
            Repr::Big(binary.with_rounding::<dashu_float::round::mode::Zero>())
        };
        Ok(Self { repr, bits })
    }

    /// Parse a decimal string at the process-wide default precision.
    pub fn from_string_default(val: &str) -> Result<Self, String> {
        Self::from_string(val, crate::default_precision())
    }

    /// Two-path dispatch for binary operations: plain f64 while both sides
    /// fit, `FBig` otherwise. The result takes the wider precision.
    fn binary(
        &self,
        other: &Self,
        dbl: impl Fn(f64, f64) -> f64,
        big: impl Fn(&FBig, &FBig) -> FBig,
    ) -> Self {
        let bits = self.bits.max(other.bits);
        let repr = match (&self.repr, &other.repr) {
            (Repr::Double(a), Repr::Double(b)) if bits <= 64 => Repr::Double(dbl(*a, *b)),
            _ => Repr::Big(big(&self.repr.promote(bits), &other.repr.promote(bits))),
        };
        Self { repr, bits }
    }

    fn unary(&self, dbl: impl Fn(f64) -> f64, big: impl Fn(FBig) -> FBig) -> Self {
        let repr = match &self.repr {
            Repr::Double(v) if self.bits <= 64 => Repr::Double(dbl(*v)),
            _ => Repr::Big(big(self.repr.promote(self.bits))),
        };
        Self {
            repr,
            bits: self.bits,
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        self.binary(other, |a, b| a + b, |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.binary(other, |a, b| a - b, |a, b| a - b)
    }

    pub fn mul(&self, other: &Self) -> Self {
        self.binary(other, |a, b| a * b, |a, b| a * b)
    }

    pub fn div(&self, other: &Self) -> Self {
        self.binary(other, |a, b| a / b, |a, b| a / b)
    }

    pub fn mul_f64(&self, scale: f64) -> Self {
        self.mul(&Self::with_precision(scale, self.bits.min(64)))
    }

    pub fn neg(&self) -> Self {
        self.unary(|v| -v, |v| -v)
    }

    pub fn sqrt(&self) -> Self {
        self.unary(|v| v.sqrt(), |v| v.sqrt())
    }

    pub fn abs(&self) -> Self {
        self.unary(|v| v.abs(), |v| v.abs())
    }

    pub fn is_zero(&self) -> bool {
        match &self.repr {
            Repr::Double(v) => *v == 0.0,
            Repr::Big(v) => v.repr().is_zero(),
        }
    }

    pub fn is_negative(&self) -> bool {
        match &self.repr {
            Repr::Double(v) => *v < 0.0,
            Repr::Big(v) => v.sign() == dashu_base::Sign::Negative,
        }
    }

    /// log2 of |self| (to f64 accuracy); `-inf` for zero. Values outside
    /// the f64 range are located by an exponent search over exact powers of
    /// two, so the result is reliable at any magnitude.
    pub fn log2_approx(&self) -> f64 {
        if self.is_zero() {
            return f64::NEG_INFINITY;
        }

        let abs = self.abs();
        let direct = abs.to_f64();
        if direct.is_finite() && direct >= f64::MIN_POSITIVE {
            return direct.log2();
        }

        let e = Self::floor_log2(&abs);
        let scaled = abs.mul(&Self::pow2(-e, self.bits));
        e as f64 + scaled.to_f64().log2()
    }

    /// Largest `e` with `2^e <= |self|`. Caller guarantees a nonzero value.
    fn floor_log2(abs: &Self) -> i64 {
        let bits = abs.bits;
        let one = Self::one(bits);

        // Exponential bracket, then bisect. Invariant: 2^lo <= |v| < 2^hi.
        let (mut lo, mut hi);
        if *abs >= one {
            let mut e = 1i64;
            while *abs >= Self::pow2(e, bits) {
                e *= 2;
            }
            lo = e / 2;
            hi = e;
        } else {
            let mut e = -1i64;
            while *abs < Self::pow2(e, bits) {
                e *= 2;
            }
            lo = e;
            hi = e / 2;
        }

        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if *abs >= Self::pow2(mid, bits) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// Split into `(mantissa, exponent)` with `|mantissa| ∈ [0.5, 1.0)` and
    /// `self = mantissa × 2^exponent`; `(0, 0)` for zero. The mantissa keeps
    /// full f64 precision at any magnitude: the value is rescaled by an
    /// exact power of two into f64 range first.
    pub fn frexp(&self) -> (f64, i64) {
        if self.is_zero() {
            return (0.0, 0);
        }

        // Fast path: the value fits the normal f64 range.
        let direct = self.to_f64();
        if direct.is_finite() && direct.abs() >= f64::MIN_POSITIVE {
            let (m, e) = libm::frexp(direct);
            return (m, e as i64);
        }

        // Rescale by an exact power of two into f64 range first.
        let shift = self.log2_approx().round() as i64;
        let scaled = self.mul(&Self::pow2(-shift, self.bits));
        let (m, e) = libm::frexp(scaled.to_f64());
        (m, e as i64 + shift)
    }

    /// Exact power of two at the given precision, by repeated squaring.
    pub fn pow2(exp: i64, bits: usize) -> Self {
        let mut result = Self::one(bits);
        let mut base = Self::with_precision(if exp < 0 { 0.5 } else { 2.0 }, bits);
        let mut n = exp.unsigned_abs();
        while n > 0 {
            if n & 1 == 1 {
                result = result.mul(&base);
            }
            base = base.mul(&base);
            n >>= 1;
        }
        result
    }
}

impl PartialEq for BigFloat {
    fn eq(&self, other: &Self) -> bool {
        matches!(self.partial_cmp(other), Some(Ordering::Equal))
    }
}

impl PartialOrd for BigFloat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.repr, &other.repr) {
            (Repr::Double(a), Repr::Double(b)) => a.partial_cmp(b),
            _ => {
                let bits = self.bits.max(other.bits);
                self.repr.promote(bits).partial_cmp(&other.repr.promote(bits))
            }
        }
    }
}

impl std::fmt::Display for BigFloat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            Repr::Double(v) => write!(f, "{}", v),
            Repr::Big(v) => write!(f, "{}", v),
        }
    }
}

// On the wire a value is a `(text, bits)` pair; the text is whatever the
// active representation prints, which its parser reads back losslessly.
impl Serialize for BigFloat {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let text = match &self.repr {
            Repr::Double(v) => v.to_string(),
            Repr::Big(v) => v.to_string(),
        };
        (text, self.bits).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BigFloat {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (text, bits) = <(String, usize)>::deserialize(deserializer)?;

        let repr = if bits <= 64 {
            Repr::Double(
                text.parse::<f64>()
                    .map_err(|e| serde::de::Error::custom(format!("failed to parse f64: {}", e)))?,
            )
        } else {
            Repr::Big(text.parse::<FBig>().map_err(|e| {
                serde::de::Error::custom(format!("failed to parse float: {}", e))
            })?)
        };

        Ok(BigFloat { repr, bits })
    }
}
