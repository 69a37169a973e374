//! Pattern detectors.
//!
//! Each detector is a plain value holding only construction-time
//! configuration, so instances can be shared across threads and reused
//! across calls. Every public entry point starts with the shared minimum
//! bar-count check; structural validation has already happened when the
//! [`Series`](crate::series::Series) was built.

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod candle;
pub mod chart;
pub mod levels;

pub use candle::CandlestickPatternDetector;
pub use chart::ChartPatternDetector;
pub use levels::SupportResistanceDetector;

use crate::PatternError;

/// Shared precondition every detector entry point runs first: enough
/// history for the pattern's rolling windows.
pub(crate) fn ensure_min_bars(
    pattern: &'static str,
    required: usize,
    actual: usize,
) -> Result<(), PatternError> {
    if actual < required {
        return Err(PatternError::InsufficientData {
            pattern,
            required,
            actual,
        });
    }
    Ok(())
}
