//! Engine configuration.
//!
//! Options arrive as flat `section.key = value` pairs, are validated on
//! assignment, and are finalized by `derive()`, which installs the global
//! arbitrary-precision width and re-parses the location at full precision.

use crate::error::{Error, Result};
use deepdrill_core::{
    required_precision, set_default_precision, BigFloat, ExtendedDouble, PrecisionComplex,
    PRECISION_FLOOR,
};
use tracing::{debug, info};

pub const MAX_MAP_WIDTH: usize = 3840;
pub const MAX_MAP_HEIGHT: usize = 2160;

/// Fallback for the tolerances that ship without a documented default.
const UNDOCUMENTED_TOLERANCE: f64 = 1e-16;

#[derive(Clone, Debug)]
pub struct LocationOptions {
    /// Center coordinates as decimal strings; parsed at full precision by
    /// `derive()` so no digits are lost to an early conversion.
    pub real: String,
    pub imag: String,
    pub zoom: String,
    /// Maximum iteration count.
    pub depth: i64,
    /// Escape threshold, compared against ‖z‖².
    pub escape: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct ImageOptions {
    pub width: usize,
    pub height: usize,
    /// Fraction of pixels allowed to stay unresolved when the rounds run out.
    pub badpixels: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct PerturbationOptions {
    pub enable: bool,
    pub tolerance: f64,
    pub rounds: i64,
}

#[derive(Clone, Copy, Debug)]
pub struct ApproximationOptions {
    pub enable: bool,
    pub coefficients: i64,
    pub tolerance: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct AreaCheckOptions {
    pub enable: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct PeriodCheckOptions {
    pub enable: bool,
    pub tolerance: f64,
}

#[derive(Clone, Copy, Debug)]
pub struct AttractorCheckOptions {
    pub enable: bool,
    pub tolerance: f64,
}

#[derive(Clone, Debug)]
pub struct Options {
    pub location: LocationOptions,
    pub image: ImageOptions,
    pub perturbation: PerturbationOptions,
    pub approximation: ApproximationOptions,
    pub areacheck: AreaCheckOptions,
    pub periodcheck: PeriodCheckOptions,
    pub attractorcheck: AttractorCheckOptions,

    // Derived by `derive()`
    pub precision_bits: usize,
    pub center: PrecisionComplex,
    pub pixel_delta_hp: BigFloat,
    pub pixel_delta: ExtendedDouble,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            location: LocationOptions {
                real: "0.0".into(),
                imag: "0.0".into(),
                zoom: "1.0".into(),
                depth: 500,
                escape: 256.0,
            },
            image: ImageOptions {
                width: 960,
                height: 540,
                badpixels: 0.001,
            },
            perturbation: PerturbationOptions {
                enable: true,
                tolerance: 1e-6,
                rounds: 50,
            },
            approximation: ApproximationOptions {
                enable: true,
                coefficients: 5,
                tolerance: 1e-12,
            },
            areacheck: AreaCheckOptions { enable: true },
            periodcheck: PeriodCheckOptions {
                enable: false,
                tolerance: UNDOCUMENTED_TOLERANCE,
            },
            attractorcheck: AttractorCheckOptions {
                enable: false,
                tolerance: UNDOCUMENTED_TOLERANCE,
            },
            precision_bits: PRECISION_FLOOR,
            center: PrecisionComplex::zero(PRECISION_FLOOR),
            pixel_delta_hp: BigFloat::zero(PRECISION_FLOOR),
            pixel_delta: ExtendedDouble::ZERO,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign one configuration key. Unknown names and unparseable values
    /// are reported against the key.
    pub fn parse_key(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "location.real" => {
                parse_decimal(key, value)?;
                self.location.real = value.into();
            }
            "location.imag" => {
                parse_decimal(key, value)?;
                self.location.imag = value.into();
            }
            "location.zoom" => {
                parse_decimal(key, value)?;
                self.location.zoom = value.into();
            }
            "location.depth" => {
                self.location.depth = parse_int(key, value)?;
                if self.location.depth < 1 {
                    return Err(Error::key_value(key, "depth must be at least 1"));
                }
            }
            "location.escape" => {
                self.location.escape = parse_float(key, value)?;
                if self.location.escape <= 0.0 {
                    return Err(Error::key_value(key, "escape radius must be positive"));
                }
            }
            "image.width" => {
                self.image.width = parse_int(key, value)? as usize;
                if self.image.width == 0 {
                    return Err(Error::key_value(key, "width must be greater than 0"));
                }
                if self.image.width > MAX_MAP_WIDTH {
                    return Err(Error::key_value(
                        key,
                        format!("width must be smaller or equal to {}", MAX_MAP_WIDTH),
                    ));
                }
            }
            "image.height" => {
                self.image.height = parse_int(key, value)? as usize;
                if self.image.height == 0 {
                    return Err(Error::key_value(key, "height must be greater than 0"));
                }
                if self.image.height > MAX_MAP_HEIGHT {
                    return Err(Error::key_value(
                        key,
                        format!("height must be smaller or equal to {}", MAX_MAP_HEIGHT),
                    ));
                }
            }
            "image.badpixels" => {
                self.image.badpixels = parse_float(key, value)?;
                if !(0.0..=1.0).contains(&self.image.badpixels) {
                    return Err(Error::key_value(key, "fraction must lie in [0, 1]"));
                }
            }
            "perturbation.enable" => self.perturbation.enable = parse_bool(key, value)?,
            "perturbation.tolerance" => {
                self.perturbation.tolerance = parse_float(key, value)?;
                if self.perturbation.tolerance <= 0.0 {
                    return Err(Error::key_value(key, "tolerance must be positive"));
                }
            }
            "perturbation.rounds" => {
                self.perturbation.rounds = parse_int(key, value)?;
                if self.perturbation.rounds < 1 {
                    return Err(Error::key_value(key, "at least one round is required"));
                }
            }
            "approximation.enable" => self.approximation.enable = parse_bool(key, value)?,
            "approximation.coefficients" => {
                self.approximation.coefficients = parse_int(key, value)?;
                if !(2..=64).contains(&self.approximation.coefficients) {
                    return Err(Error::key_value(key, "coefficient count must lie in 2..64"));
                }
            }
            "approximation.tolerance" => {
                self.approximation.tolerance = parse_float(key, value)?;
                if self.approximation.tolerance <= 0.0 {
                    return Err(Error::key_value(key, "tolerance must be positive"));
                }
            }
            "areacheck.enable" => self.areacheck.enable = parse_bool(key, value)?,
            "periodcheck.enable" => self.periodcheck.enable = parse_bool(key, value)?,
            "periodcheck.tolerance" => {
                self.periodcheck.tolerance = parse_float(key, value)?;
                if self.periodcheck.tolerance <= 0.0 {
                    return Err(Error::key_value(key, "tolerance must be positive"));
                }
            }
            "attractorcheck.enable" => self.attractorcheck.enable = parse_bool(key, value)?,
            "attractorcheck.tolerance" => {
                self.attractorcheck.tolerance = parse_float(key, value)?;
                if self.attractorcheck.tolerance <= 0.0 {
                    return Err(Error::key_value(key, "tolerance must be positive"));
                }
            }
            _ => return Err(Error::key_value(key, "unexpected key")),
        }
        Ok(())
    }

    /// Finalize: install the precision the zoom calls for, then parse the
    /// location at that precision and compute the plane geometry.
    pub fn derive(&mut self) -> Result<()> {
        let zoom = BigFloat::from_string(&self.location.zoom, PRECISION_FLOOR)
            .map_err(|e| Error::key_value("location.zoom", e))?;
        if zoom.is_zero() || zoom.is_negative() {
            return Err(Error::key_value(
                "location.zoom",
                "magnification must be positive",
            ));
        }

        self.precision_bits = required_precision(&zoom);
        set_default_precision(self.precision_bits);
        debug!(bits = self.precision_bits, "derived arbitrary precision");

        let real = BigFloat::from_string(&self.location.real, self.precision_bits)
            .map_err(|e| Error::key_value("location.real", e))?;
        let imag = BigFloat::from_string(&self.location.imag, self.precision_bits)
            .map_err(|e| Error::key_value("location.imag", e))?;
        let zoom = BigFloat::from_string(&self.location.zoom, self.precision_bits)
            .map_err(|e| Error::key_value("location.zoom", e))?;

        self.center = PrecisionComplex::new(real, imag);
        self.pixel_delta_hp = BigFloat::with_precision(4.0, self.precision_bits)
            .div(&zoom)
            .div(&BigFloat::with_precision(
                self.image.height as f64,
                self.precision_bits,
            ));
        self.pixel_delta = ExtendedDouble::from(&self.pixel_delta_hp);

        if self.periodcheck.enable {
            info!(tolerance = self.periodcheck.tolerance, "period checking on");
        }
        if self.attractorcheck.enable {
            info!(
                tolerance = self.attractorcheck.tolerance,
                "attractor checking on"
            );
        }

        Ok(())
    }

    /// Number of glitched pixels tolerated when the round budget runs out.
    pub fn badpixel_threshold(&self) -> usize {
        ((self.image.width * self.image.height) as f64 * self.image.badpixels).floor() as usize
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|e| Error::key_value(key, e.to_string()))
}

fn parse_float(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| Error::key_value(key, e.to_string()))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "on" | "1" => Ok(true),
        "no" | "false" | "off" | "0" => Ok(false),
        other => Err(Error::key_value(key, format!("invalid boolean '{}'", other))),
    }
}

/// Check that a decimal string is well-formed without committing to a
/// precision yet.
fn parse_decimal(key: &str, value: &str) -> Result<()> {
    BigFloat::from_string(value.trim(), PRECISION_FLOOR)
        .map(|_| ())
        .map_err(|e| Error::key_value(key, e))
}
