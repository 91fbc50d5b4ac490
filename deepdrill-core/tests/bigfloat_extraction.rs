//! Conversions between the precision tiers.

use deepdrill_core::{BigFloat, ExtendedComplex, ExtendedDouble, PrecisionComplex};

#[test]
fn extended_double_from_bigfloat_roundtrips_in_f64_range() {
    for v in [1.0, -1.0, 0.5, 2.0, 0.1, -1234.5678, 1e-300, 1e300] {
        let bf = BigFloat::with_precision(v, 256);
        let ed = ExtendedDouble::from(&bf);
        assert!(ed.is_reduced());
        let back = ed.as_f64();
        assert!(
            (back - v).abs() <= v.abs() * 2f64.powi(-52),
            "{} -> {}",
            v,
            back
        );
    }
}

#[test]
fn extended_double_from_bigfloat_handles_zero() {
    let ed = ExtendedDouble::from(&BigFloat::zero(512));
    assert!(ed.is_zero());
    assert_eq!(ed.exponent, 0);
}

#[test]
fn extended_double_survives_values_below_f64_range() {
    let bf = BigFloat::from_string("1e-400", 2048).unwrap();
    let ed = ExtendedDouble::from(&bf);
    assert!(!ed.is_zero(), "value must not flush to zero");
    assert!(ed.is_reduced());
    // 10^-400 ≈ 2^-1328.8
    assert!(ed.exponent <= -1328 && ed.exponent >= -1330, "exp = {}", ed.exponent);
}

#[test]
fn extended_complex_from_precision_complex_aligns_components() {
    let pc = PrecisionComplex::from_f64(6.0, 0.375, 256);
    let ec = ExtendedComplex::from(&pc).reduced();
    let s = ec.as_standard();
    assert_eq!(s.re, 6.0);
    assert_eq!(s.im, 0.375);
}

#[test]
fn extended_complex_keeps_tiny_component_relative_to_large() {
    // Components 2^60 apart: the smaller one survives alignment.
    let re = BigFloat::with_precision(1.0, 256);
    let im = BigFloat::with_precision(2f64.powi(-60), 256);
    let ec = ExtendedComplex::from((&re, &im));
    let s = ec.as_standard();
    assert_eq!(s.re, 1.0);
    assert_eq!(s.im, 2f64.powi(-60));
}

#[test]
fn mantissa_precision_is_full_f64_at_depth() {
    // The mantissa of an extreme value carries 53 significant bits, not an
    // estimate: scale the value back up and compare against the original
    // digits.
    let bf = BigFloat::from_string("3.14159265358979323846e-500", 4096).unwrap();
    let ed = ExtendedDouble::from(&bf);
    let scaled = BigFloat::with_precision(ed.mantissa, 4096)
        .mul(&BigFloat::pow2(ed.exponent, 4096));
    let rel = scaled.sub(&bf).div(&bf).to_f64().abs();
    assert!(rel < 1e-15, "relative error {}", rel);
}
