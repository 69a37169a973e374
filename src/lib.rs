//! # patternscan
//!
//! Rule-based technical pattern detection over OHLC price series.
//!
//! Three detectors cover the classic formations: multi-bar chart patterns
//! (head & shoulders, triangles, double tops/bottoms, flags, wedges),
//! single/few-bar candlestick patterns (doji, hammer, shooting star,
//! engulfing, three-bar strike), and support/resistance levels found at
//! local extrema. A [`registry::Registry`] dispatches pattern requests
//! across named provider implementations with priority ordering and
//! fallback chaining.
//!
//! Every detect call is a pure function of its input series: no I/O, no
//! retained state, deterministic output ordering.
//!
//! ## Quick Start
//!
//! ```rust
//! use patternscan::prelude::*;
//!
//! # fn main() -> Result<()> {
//! // Build a series from typed bars (or deserialize a RawSeries table)
//! let bars: Vec<Bar> = (0..40)
//!     .map(|i| {
//!         let base = 100.0 + i as f64 * 0.5;
//!         Bar::new(i as i64, base, base + 1.0, base - 1.0, base + 0.4)
//!     })
//!     .collect();
//! let series = Series::from_bars(bars)?;
//!
//! // Scan chart + candlestick patterns in one pass
//! let scanner = PatternScanner::default();
//! let patterns = scanner.scan(&series)?;
//!
//! // Or query support/resistance levels
//! let levels = SupportResistanceDetector::default().find_levels(&series)?;
//! # let _ = (patterns, levels);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod detectors;
pub mod registry;
pub mod series;

pub mod prelude {
    pub use crate::{
        // Adapters
        adapters::{BuiltinProvider, PluginProvider},
        // Detectors
        detectors::{CandlestickPatternDetector, ChartPatternDetector, SupportResistanceDetector},
        // Registry
        registry::{DetectOptions, Detection, PatternProvider, PricePoint, Registry, RegistryError},
        // Series
        series::{Bar, RawSeries, Series},
        scan_parallel,
        Anchor,
        Confidence,
        LevelRecord,
        LevelScan,
        LevelSide,
        LevelStrength,
        MalformedInput,
        PatternDetails,
        // Errors
        PatternError,
        PatternKind,
        PatternRecord,
        PatternScanner,
        Result,
        ScanFailure,
        ScanResult,
        Sentiment,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors a detector can raise.
///
/// Structural problems with the input series are never swallowed; numeric
/// edge cases inside an algorithm (zero slope, zero spread, zero range) are
/// "no pattern present" and are skipped silently instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("malformed input: {0}")]
    MalformedInput(#[from] MalformedInput),

    #[error("{pattern} requires at least {required} bars, got {actual}")]
    InsufficientData {
        pattern: &'static str,
        required: usize,
        actual: usize,
    },
}

/// Structural defects in an input series, caught before any pattern math runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedInput {
    #[error("series is empty")]
    EmptySeries,

    #[error("missing field {missing}; available: {available}")]
    MissingColumn {
        missing: &'static str,
        available: String,
    },

    #[error("field {column} has no values in any bar")]
    EmptyColumn { column: &'static str },

    #[error("column {column} has {actual} rows, expected {expected}")]
    ColumnLengthMismatch {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("bar {index} has no open/high/low/close values")]
    EmptyBar { index: usize },
}

// ============================================================
// PATTERN RECORD
// ============================================================

/// Directional bias of a detected pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

/// Qualitative strength label. Ordinal, not a probability:
/// `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Every pattern shape the crate can classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    // Chart formations
    HeadAndShoulders,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
    DoubleTop,
    DoubleBottom,
    Flag,
    RisingWedge,
    FallingWedge,
    // Candlestick formations
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
    ThreeBarStrike,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::HeadAndShoulders => "head_and_shoulders",
            PatternKind::AscendingTriangle => "ascending_triangle",
            PatternKind::DescendingTriangle => "descending_triangle",
            PatternKind::SymmetricalTriangle => "symmetrical_triangle",
            PatternKind::DoubleTop => "double_top",
            PatternKind::DoubleBottom => "double_bottom",
            PatternKind::Flag => "flag",
            PatternKind::RisingWedge => "rising_wedge",
            PatternKind::FallingWedge => "falling_wedge",
            PatternKind::Doji => "doji",
            PatternKind::Hammer => "hammer",
            PatternKind::ShootingStar => "shooting_star",
            PatternKind::BullishEngulfing => "bullish_engulfing",
            PatternKind::BearishEngulfing => "bearish_engulfing",
            PatternKind::ThreeBarStrike => "three_bar_strike",
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where on the series a pattern sits: one bar, or a start..end span.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(tag = "span", rename_all = "snake_case")]
pub enum Anchor {
    Single {
        index: usize,
        timestamp: i64,
    },
    Range {
        start_index: usize,
        start_timestamp: i64,
        end_index: usize,
        end_timestamp: i64,
    },
}

impl Anchor {
    pub fn single(index: usize, timestamp: i64) -> Self {
        Anchor::Single { index, timestamp }
    }

    pub fn range(start: (usize, i64), end: (usize, i64)) -> Self {
        Anchor::Range {
            start_index: start.0,
            start_timestamp: start.1,
            end_index: end.0,
            end_timestamp: end.1,
        }
    }

    /// Index of the last bar the pattern touches.
    pub fn end_index(&self) -> usize {
        match *self {
            Anchor::Single { index, .. } => index,
            Anchor::Range { end_index, .. } => end_index,
        }
    }

    /// Index of the first bar the pattern touches.
    pub fn start_index(&self) -> usize {
        match *self {
            Anchor::Single { index, .. } => index,
            Anchor::Range { start_index, .. } => start_index,
        }
    }
}

/// Pattern-specific numeric fields, tagged by shape.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PatternDetails {
    HeadAndShoulders {
        left_shoulder: f64,
        head: f64,
        right_shoulder: f64,
        neckline: f64,
    },
    Triangle {
        high_slope: f64,
        low_slope: f64,
        window_high: f64,
        window_low: f64,
    },
    DoubleExtreme {
        first: f64,
        second: f64,
        retrace: f64,
    },
    Flag {
        trend_slope: f64,
        trend_deviation: f64,
        consolidation_deviation: f64,
    },
    Wedge {
        resistance_slope: f64,
        support_slope: f64,
        start_spread: f64,
        end_spread: f64,
        convergence_ratio: f64,
    },
    Candle {
        body: f64,
        range: f64,
    },
}

/// One classified pattern. Built fresh inside a detect call, immutable,
/// never retained by the engine.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PatternRecord {
    #[serde(rename = "pattern")]
    pub kind: PatternKind,
    #[serde(rename = "type")]
    pub sentiment: Sentiment,
    pub confidence: Confidence,
    #[serde(flatten)]
    pub anchor: Anchor,
    pub details: PatternDetails,
}

// ============================================================
// LEVEL RECORDS
// ============================================================

/// Which side of price action a level has defended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSide {
    Support,
    Resistance,
}

/// Touch-count strength bucket for a level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LevelStrength {
    Weak,
    Medium,
    Strong,
}

/// A price level that has acted as a floor or ceiling.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LevelRecord {
    pub price: f64,
    pub side: LevelSide,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<LevelStrength>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub touches: Option<usize>,
}

/// Result of a plain level query.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct LevelScan {
    /// Ascending: strongest (lowest) support first.
    pub support: Vec<f64>,
    /// Descending: strongest (highest) resistance first.
    pub resistance: Vec<f64>,
    pub current_price: f64,
}

// ============================================================
// SCANNER
// ============================================================

use detectors::{CandlestickPatternDetector, ChartPatternDetector};
use series::Series;

/// Convenience aggregate running the chart and candlestick detectors over
/// one series and concatenating their records.
#[derive(Debug, Clone, Default)]
pub struct PatternScanner {
    pub chart: ChartPatternDetector,
    pub candles: CandlestickPatternDetector,
}

impl PatternScanner {
    pub fn new(chart: ChartPatternDetector, candles: CandlestickPatternDetector) -> Self {
        Self { chart, candles }
    }

    /// Chart records first (sub-algorithm order), candlestick records after.
    pub fn scan(&self, series: &Series) -> Result<Vec<PatternRecord>> {
        let mut records = self.chart.scan(series)?;
        records.extend(self.candles.scan(series)?);
        Ok(records)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument.
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub patterns: Vec<PatternRecord>,
}

/// Failure from scanning a single instrument.
#[derive(Debug)]
pub struct ScanFailure {
    pub symbol: String,
    pub error: PatternError,
}

/// Scan many instruments in parallel. Batching is the caller's concern;
/// each per-series scan stays single-threaded and stateless.
pub fn scan_parallel<'a, I>(
    scanner: &PatternScanner,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanFailure>)
where
    I: IntoParallelIterator<Item = (&'a str, &'a Series)>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, series)| {
            scanner
                .scan(series)
                .map(|patterns| ScanResult {
                    symbol: symbol.to_string(),
                    patterns,
                })
                .map_err(|error| ScanFailure {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut failures = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => failures.push(e),
        }
    }

    (successes, failures)
}

// ============================================================
// TESTS
// ============================================================
