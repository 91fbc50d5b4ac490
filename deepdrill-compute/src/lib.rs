pub mod coefficients;
pub mod driller;
pub mod error;
pub mod map;
pub mod options;
pub mod progress;
pub mod reference;
pub mod slow;

pub use coefficients::Approximator;
pub use driller::Driller;
pub use error::{Error, Result};
pub use map::{ChannelFormat, ChannelId, ColorMap, DrillMap, DrillResult, MapAnalyzer, MapEntry};
pub use options::Options;
pub use reference::{ReferenceIteration, ReferencePoint};
pub use slow::SlowDriller;
