//! Process-wide default precision and its derivation from the zoom factor.
//!
//! The default is installed once at startup, before any location value that
//! must retain the current zoom's precision is parsed. Drilling several
//! locations with different zooms in one process requires re-deriving and
//! re-parsing per location.

use crate::BigFloat;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lower bound on the arbitrary-precision mantissa width.
pub const PRECISION_FLOOR: usize = 128;

/// Guard bits on top of the zoom exponent.
const SAFETY_BITS: usize = 64;

static DEFAULT_PRECISION: AtomicUsize = AtomicUsize::new(PRECISION_FLOOR);

/// Install the process-wide default precision. Read-only after setup.
pub fn set_default_precision(bits: usize) {
    DEFAULT_PRECISION.store(bits.max(PRECISION_FLOOR), Ordering::Relaxed);
}

/// The precision used by `BigFloat::with_default_precision` and friends.
pub fn default_precision() -> usize {
    DEFAULT_PRECISION.load(Ordering::Relaxed)
}

/// Mantissa bits required to resolve pixels at the given magnification:
/// `max(128, ceil(log2(zoom)) + 64)`.
pub fn required_precision(zoom: &BigFloat) -> usize {
    let log2 = zoom.log2_approx();
    if !log2.is_finite() || log2 <= 0.0 {
        return PRECISION_FLOOR;
    }
    (log2.ceil() as usize + SAFETY_BITS).max(PRECISION_FLOOR)
}
