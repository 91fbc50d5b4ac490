pub mod bigfloat;
pub mod cancellation;
pub mod coord;
pub mod extended;
pub mod extended_complex;
pub mod precision;
pub mod precision_complex;
pub mod standard;

pub use bigfloat::BigFloat;
pub use cancellation::CancelFlag;
pub use coord::Coord;
pub use extended::ExtendedDouble;
pub use extended_complex::ExtendedComplex;
pub use precision::{
    default_precision, required_precision, set_default_precision, PRECISION_FLOOR,
};
pub use precision_complex::PrecisionComplex;
pub use standard::StandardComplex;
