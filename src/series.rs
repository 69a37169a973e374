//! OHLC series construction and validation.
//!
//! Detection runs over a [`Series`], which can only be built through
//! validation: either from typed [`Bar`]s or from a [`RawSeries`] — the
//! loose tabular shape a protocol adapter deserializes (columns named
//! exactly `Open`, `High`, `Low`, `Close`, optional `Volume`). Structural
//! defects are rejected here with a [`MalformedInput`] so detectors never
//! compute pattern math over a broken table.
//!
//! Missing cells inside a surviving column are carried as `f64::NAN`;
//! threshold comparisons against NaN are false, so windows touching a
//! missing cell simply match nothing.

use tracing::warn;

use crate::MalformedInput;

// ============================================================
// BAR
// ============================================================

/// One time period's open/high/low/close summary.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    #[inline]
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    #[inline]
    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    #[inline]
    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    fn is_blank(&self) -> bool {
        self.open.is_nan() && self.high.is_nan() && self.low.is_nan() && self.close.is_nan()
    }
}

// ============================================================
// RAW SERIES (boundary shape)
// ============================================================

/// Loosely-typed tabular input, one `Vec` per column. Columns are optional
/// so the validator can name exactly what is missing; cells are optional so
/// a sparse table survives deserialization and fails (or degrades) here
/// rather than upstream.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct RawSeries {
    /// Time-like index. Synthesized as 0..n when absent.
    #[serde(default)]
    pub index: Option<Vec<i64>>,
    #[serde(rename = "Open", default)]
    pub open: Option<Vec<Option<f64>>>,
    #[serde(rename = "High", default)]
    pub high: Option<Vec<Option<f64>>>,
    #[serde(rename = "Low", default)]
    pub low: Option<Vec<Option<f64>>>,
    #[serde(rename = "Close", default)]
    pub close: Option<Vec<Option<f64>>>,
    #[serde(rename = "Volume", default)]
    pub volume: Option<Vec<Option<f64>>>,
}

impl RawSeries {
    /// Validate the table and produce a typed [`Series`].
    pub fn validate(self) -> Result<Series, MalformedInput> {
        let available = self.available_columns();

        let open = self.open.ok_or_else(|| MalformedInput::MissingColumn {
            missing: "Open",
            available: available.clone(),
        })?;
        let high = self.high.ok_or_else(|| MalformedInput::MissingColumn {
            missing: "High",
            available: available.clone(),
        })?;
        let low = self.low.ok_or_else(|| MalformedInput::MissingColumn {
            missing: "Low",
            available: available.clone(),
        })?;
        let close = self.close.ok_or_else(|| MalformedInput::MissingColumn {
            missing: "Close",
            available: available.clone(),
        })?;

        let rows = open.len();
        if rows == 0 {
            return Err(MalformedInput::EmptySeries);
        }
        check_len("High", rows, high.len())?;
        check_len("Low", rows, low.len())?;
        check_len("Close", rows, close.len())?;
        if let Some(volume) = &self.volume {
            check_len("Volume", rows, volume.len())?;
        }
        if let Some(index) = &self.index {
            check_len("index", rows, index.len())?;
        }

        let timestamps = self
            .index
            .unwrap_or_else(|| (0..rows as i64).collect::<Vec<_>>());
        let volumes = self
            .volume
            .map(|col| col.into_iter().map(cell_value).collect());

        Series::build(
            timestamps,
            open.into_iter().map(cell_value).collect(),
            high.into_iter().map(cell_value).collect(),
            low.into_iter().map(cell_value).collect(),
            close.into_iter().map(cell_value).collect(),
            volumes,
        )
    }

    fn available_columns(&self) -> String {
        let mut names = Vec::new();
        if self.open.is_some() {
            names.push("Open");
        }
        if self.high.is_some() {
            names.push("High");
        }
        if self.low.is_some() {
            names.push("Low");
        }
        if self.close.is_some() {
            names.push("Close");
        }
        if self.volume.is_some() {
            names.push("Volume");
        }
        if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        }
    }
}

#[inline]
fn cell_value(cell: Option<f64>) -> f64 {
    cell.unwrap_or(f64::NAN)
}

fn check_len(column: &'static str, expected: usize, actual: usize) -> Result<(), MalformedInput> {
    if actual != expected {
        return Err(MalformedInput::ColumnLengthMismatch {
            column,
            expected,
            actual,
        });
    }
    Ok(())
}

// ============================================================
// SERIES
// ============================================================

/// A validated, column-oriented OHLC series. Owned by the caller; the
/// engine never mutates it or retains it past a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    timestamps: Vec<i64>,
    opens: Vec<f64>,
    highs: Vec<f64>,
    lows: Vec<f64>,
    closes: Vec<f64>,
    volumes: Option<Vec<f64>>,
}

impl Series {
    /// Build a series from typed bars, running the same structural checks
    /// as [`RawSeries::validate`].
    pub fn from_bars(bars: Vec<Bar>) -> Result<Self, MalformedInput> {
        if bars.is_empty() {
            return Err(MalformedInput::EmptySeries);
        }

        let has_volume = bars.iter().any(|b| b.volume.is_some());
        Series::build(
            bars.iter().map(|b| b.timestamp).collect(),
            bars.iter().map(|b| b.open).collect(),
            bars.iter().map(|b| b.high).collect(),
            bars.iter().map(|b| b.low).collect(),
            bars.iter().map(|b| b.close).collect(),
            has_volume.then(|| {
                bars.iter()
                    .map(|b| b.volume.unwrap_or(f64::NAN))
                    .collect::<Vec<_>>()
            }),
        )
    }

    fn build(
        timestamps: Vec<i64>,
        opens: Vec<f64>,
        highs: Vec<f64>,
        lows: Vec<f64>,
        closes: Vec<f64>,
        volumes: Option<Vec<f64>>,
    ) -> Result<Self, MalformedInput> {
        if opens.is_empty() {
            return Err(MalformedInput::EmptySeries);
        }

        check_column_alive("Open", &opens)?;
        check_column_alive("High", &highs)?;
        check_column_alive("Low", &lows)?;
        check_column_alive("Close", &closes)?;

        let series = Self {
            timestamps,
            opens,
            highs,
            lows,
            closes,
            volumes,
        };

        for i in 0..series.len() {
            if series.bar(i).is_blank() {
                return Err(MalformedInput::EmptyBar { index: i });
            }
        }

        if !series.timestamps.windows(2).all(|w| w[0] < w[1]) {
            // Ordering is a warning, not a failure; detection runs on
            // positional indices either way.
            warn!("series timestamps are not strictly increasing");
        }

        Ok(series)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.opens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.opens.is_empty()
    }

    #[inline]
    pub fn timestamp(&self, index: usize) -> i64 {
        self.timestamps[index]
    }

    #[inline]
    pub fn opens(&self) -> &[f64] {
        &self.opens
    }

    #[inline]
    pub fn highs(&self) -> &[f64] {
        &self.highs
    }

    #[inline]
    pub fn lows(&self) -> &[f64] {
        &self.lows
    }

    #[inline]
    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    #[inline]
    pub fn volumes(&self) -> Option<&[f64]> {
        self.volumes.as_deref()
    }

    /// Copy out one bar.
    #[inline]
    pub fn bar(&self, index: usize) -> Bar {
        Bar {
            timestamp: self.timestamps[index],
            open: self.opens[index],
            high: self.highs[index],
            low: self.lows[index],
            close: self.closes[index],
            volume: self.volumes.as_ref().map(|v| v[index]),
        }
    }

    /// Close of the most recent bar.
    #[inline]
    pub fn last_close(&self) -> f64 {
        // Validation rejects empty series, so the column is never empty.
        self.closes.last().copied().unwrap_or(f64::NAN)
    }
}

fn check_column_alive(column: &'static str, values: &[f64]) -> Result<(), MalformedInput> {
    if values.iter().all(|v| v.is_nan()) {
        return Err(MalformedInput::EmptyColumn { column });
    }
    Ok(())
}

// ============================================================
// TESTS
// ============================================================
