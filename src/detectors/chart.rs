//! Multi-bar chart formation detector.
//!
//! Five independent sub-algorithms: head & shoulders, triangles, double
//! tops/bottoms, flags/pennants, and wedges. Each is callable on its own,
//! enforces its own minimum bar count, and caps output at its first
//! [`ChartPatternDetector::max_matches`] hits in scan order; [`scan`]
//! concatenates all of them.
//!
//! Slope and spread cutoffs are calibrated in raw price units, so
//! detection sensitivity scales with the instrument's price level. A
//! low-priced and a high-priced instrument behave differently under the
//! same configuration.
//!
//! [`scan`]: ChartPatternDetector::scan

use super::{
    ensure_min_bars,
    helpers::{linreg_slope, min_max, std_dev, within_pct},
};
use crate::{
    series::Series, Anchor, Confidence, PatternDetails, PatternKind, PatternRecord, Result,
    Sentiment,
};

/// Slopes with magnitude below this count as flat.
const SLOPE_FLAT: f64 = 0.01;
/// Head must exceed both shoulders by this fraction.
const HEAD_MARGIN: f64 = 0.05;
/// Shoulders must agree within this fraction of the larger one.
const SHOULDER_TOLERANCE: f64 = 0.10;
/// Double-extreme peaks/troughs must agree within this fraction.
const DOUBLE_MATCH: f64 = 0.02;
/// The intervening extremum must retrace at least this fraction.
const DOUBLE_RETRACE: f64 = 0.05;
/// Consolidation deviation must stay below this fraction of the trend's.
const FLAG_QUIET_RATIO: f64 = 0.5;
/// Wedge spread at window end must shrink below this fraction of the start.
const WEDGE_CONVERGENCE: f64 = 0.8;
/// Open interval for the steeper wedge boundary line.
const WEDGE_STEEP: (f64, f64) = (0.10, 0.50);
/// Open interval for the shallower wedge boundary line.
const WEDGE_SHALLOW: (f64, f64) = (0.01, 0.10);

const MIN_BARS_HEAD_SHOULDERS: usize = 20;

impl_with_defaults!(ChartPatternDetector);

/// Detector for multi-bar geometric formations.
#[derive(Debug, Clone)]
pub struct ChartPatternDetector {
    /// Cap applied independently to each sub-algorithm's output.
    pub max_matches: usize,
    /// Bar spacing between the extremes of head & shoulders and double
    /// top/bottom formations.
    pub peak_spacing: usize,
    /// Sliding window for triangle slope fitting.
    pub triangle_window: usize,
    /// Trend segment length for flag detection.
    pub flag_trend_window: usize,
    /// Consolidation segment length for flag detection.
    pub flag_quiet_window: usize,
    /// Sliding window for wedge slope fitting.
    pub wedge_window: usize,
}

impl Default for ChartPatternDetector {
    fn default() -> Self {
        Self {
            max_matches: 5,
            peak_spacing: 5,
            triangle_window: 20,
            flag_trend_window: 10,
            flag_quiet_window: 5,
            wedge_window: 30,
        }
    }
}

impl ChartPatternDetector {
    /// Run every sub-algorithm and concatenate their capped outputs.
    pub fn scan(&self, series: &Series) -> Result<Vec<PatternRecord>> {
        ensure_min_bars("chart_patterns", self.required_bars(), series.len())?;

        let mut records = self.head_and_shoulders(series)?;
        records.extend(self.triangles(series)?);
        records.extend(self.double_tops(series)?);
        records.extend(self.double_bottoms(series)?);
        records.extend(self.flags(series)?);
        records.extend(self.wedges(series)?);
        Ok(records)
    }

    /// Bars needed before every sub-algorithm can run.
    pub fn required_bars(&self) -> usize {
        MIN_BARS_HEAD_SHOULDERS
            .max(2 * self.peak_spacing + 1)
            .max(self.triangle_window)
            .max(self.flag_trend_window + self.flag_quiet_window)
            .max(self.wedge_window)
    }

    /// Three peaks spaced `peak_spacing` bars apart: the middle one must
    /// clear both shoulders by more than 5%, the shoulders must agree
    /// within 10% of the larger. Bearish; anchored at the right shoulder;
    /// the neckline is the shoulder average.
    pub fn head_and_shoulders(&self, series: &Series) -> Result<Vec<PatternRecord>> {
        let span = 2 * self.peak_spacing;
        ensure_min_bars(
            "head_and_shoulders",
            MIN_BARS_HEAD_SHOULDERS.max(span + 1),
            series.len(),
        )?;

        let highs = series.highs();
        let mut records = Vec::new();

        for i in 0..=highs.len() - span - 1 {
            let left = highs[i];
            let head = highs[i + self.peak_spacing];
            let right = highs[i + span];

            if !(head > left * (1.0 + HEAD_MARGIN) && head > right * (1.0 + HEAD_MARGIN)) {
                continue;
            }
            if !within_pct(left, right, SHOULDER_TOLERANCE) {
                continue;
            }

            records.push(PatternRecord {
                kind: PatternKind::HeadAndShoulders,
                sentiment: Sentiment::Bearish,
                confidence: Confidence::Medium,
                anchor: Anchor::single(i + span, series.timestamp(i + span)),
                details: PatternDetails::HeadAndShoulders {
                    left_shoulder: left,
                    head,
                    right_shoulder: right,
                    neckline: (left + right) / 2.0,
                },
            });
            if records.len() >= self.max_matches {
                break;
            }
        }

        Ok(records)
    }

    /// Least-squares lines through each window's highs and lows classify
    /// ascending, descending, and symmetrical triangles. Windows where
    /// either side has zero price range are skipped.
    pub fn triangles(&self, series: &Series) -> Result<Vec<PatternRecord>> {
        let window = self.triangle_window;
        ensure_min_bars("triangles", window, series.len())?;

        let highs = series.highs();
        let lows = series.lows();
        let mut records = Vec::new();

        for start in 0..=highs.len() - window {
            let high_window = &highs[start..start + window];
            let low_window = &lows[start..start + window];

            let (high_min, high_max) = min_max(high_window);
            let (low_min, low_max) = min_max(low_window);
            if !(high_max - high_min > 0.0) || !(low_max - low_min > 0.0) {
                continue;
            }

            let high_slope = linreg_slope(high_window);
            let low_slope = linreg_slope(low_window);

            let kind = if high_slope.abs() < SLOPE_FLAT && low_slope > SLOPE_FLAT {
                PatternKind::AscendingTriangle
            } else if high_slope < -SLOPE_FLAT && low_slope.abs() < SLOPE_FLAT {
                PatternKind::DescendingTriangle
            } else if high_slope.abs() < SLOPE_FLAT && low_slope.abs() < SLOPE_FLAT {
                PatternKind::SymmetricalTriangle
            } else {
                continue;
            };

            let sentiment = match kind {
                PatternKind::AscendingTriangle => Sentiment::Bullish,
                PatternKind::DescendingTriangle => Sentiment::Bearish,
                _ => Sentiment::Neutral,
            };

            let end = start + window - 1;
            records.push(PatternRecord {
                kind,
                sentiment,
                confidence: Confidence::Medium,
                anchor: Anchor::range(
                    (start, series.timestamp(start)),
                    (end, series.timestamp(end)),
                ),
                details: PatternDetails::Triangle {
                    high_slope,
                    low_slope,
                    window_high: high_max,
                    window_low: low_min,
                },
            });
            if records.len() >= self.max_matches {
                break;
            }
        }

        Ok(records)
    }

    /// Two highs `peak_spacing` bars apart within 2% of each other, with
    /// an intervening valley at least 5% below them. Bearish.
    pub fn double_tops(&self, series: &Series) -> Result<Vec<PatternRecord>> {
        let spacing = self.peak_spacing;
        ensure_min_bars("double_top", spacing + 1, series.len())?;

        let highs = series.highs();
        let lows = series.lows();
        let mut records = Vec::new();

        for i in 0..highs.len() - spacing {
            let first = highs[i];
            let second = highs[i + spacing];
            if !within_pct(first, second, DOUBLE_MATCH) {
                continue;
            }

            let (valley, _) = min_max(&lows[i + 1..i + spacing]);
            if !(valley <= first.min(second) * (1.0 - DOUBLE_RETRACE)) {
                continue;
            }

            records.push(PatternRecord {
                kind: PatternKind::DoubleTop,
                sentiment: Sentiment::Bearish,
                confidence: Confidence::Medium,
                anchor: Anchor::range(
                    (i, series.timestamp(i)),
                    (i + spacing, series.timestamp(i + spacing)),
                ),
                details: PatternDetails::DoubleExtreme {
                    first,
                    second,
                    retrace: valley,
                },
            });
            if records.len() >= self.max_matches {
                break;
            }
        }

        Ok(records)
    }

    /// Mirror of [`double_tops`](Self::double_tops): two matching lows
    /// with an intervening peak at least 5% above them. Bullish.
    pub fn double_bottoms(&self, series: &Series) -> Result<Vec<PatternRecord>> {
        let spacing = self.peak_spacing;
        ensure_min_bars("double_bottom", spacing + 1, series.len())?;

        let highs = series.highs();
        let lows = series.lows();
        let mut records = Vec::new();

        for i in 0..lows.len() - spacing {
            let first = lows[i];
            let second = lows[i + spacing];
            if !within_pct(first, second, DOUBLE_MATCH) {
                continue;
            }

            let (_, peak) = min_max(&highs[i + 1..i + spacing]);
            if !(peak >= first.max(second) * (1.0 + DOUBLE_RETRACE)) {
                continue;
            }

            records.push(PatternRecord {
                kind: PatternKind::DoubleBottom,
                sentiment: Sentiment::Bullish,
                confidence: Confidence::Medium,
                anchor: Anchor::range(
                    (i, series.timestamp(i)),
                    (i + spacing, series.timestamp(i + spacing)),
                ),
                details: PatternDetails::DoubleExtreme {
                    first,
                    second,
                    retrace: peak,
                },
            });
            if records.len() >= self.max_matches {
                break;
            }
        }

        Ok(records)
    }

    /// A trending close segment followed by a quiet consolidation: fires
    /// when the trend slope clears the flat cutoff and the consolidation's
    /// deviation is under half the trend segment's. The weakest geometric
    /// signal, so confidence is always Low.
    pub fn flags(&self, series: &Series) -> Result<Vec<PatternRecord>> {
        let trend_len = self.flag_trend_window;
        let quiet_len = self.flag_quiet_window;
        let span = trend_len + quiet_len;
        ensure_min_bars("flag", span, series.len())?;

        let closes = series.closes();
        let mut records = Vec::new();

        for i in 0..=closes.len() - span {
            let trend = &closes[i..i + trend_len];
            let quiet = &closes[i + trend_len..i + span];

            let trend_deviation = std_dev(trend);
            if !(trend_deviation > 0.0) {
                continue;
            }
            let trend_slope = linreg_slope(trend);
            if !(trend_slope.abs() > SLOPE_FLAT) {
                continue;
            }
            let quiet_deviation = std_dev(quiet);
            if !(quiet_deviation < trend_deviation * FLAG_QUIET_RATIO) {
                continue;
            }

            let end = i + span - 1;
            records.push(PatternRecord {
                kind: PatternKind::Flag,
                sentiment: if trend_slope > 0.0 {
                    Sentiment::Bullish
                } else {
                    Sentiment::Bearish
                },
                confidence: Confidence::Low,
                anchor: Anchor::range((i, series.timestamp(i)), (end, series.timestamp(end))),
                details: PatternDetails::Flag {
                    trend_slope,
                    trend_deviation,
                    consolidation_deviation: quiet_deviation,
                },
            });
            if records.len() >= self.max_matches {
                break;
            }
        }

        Ok(records)
    }

    /// Converging boundary lines over a 30-bar window. Rising wedge: both
    /// slopes positive with the support line the steeper one, bearish.
    /// Falling wedge: the mirror, bullish. Both demand the end-of-window
    /// spread to shrink below 0.8x the starting spread. Zero slopes and a
    /// zero starting spread are skipped.
    pub fn wedges(&self, series: &Series) -> Result<Vec<PatternRecord>> {
        let window = self.wedge_window;
        ensure_min_bars("wedges", window, series.len())?;

        let highs = series.highs();
        let lows = series.lows();
        let mut records = Vec::new();

        for start in 0..=highs.len() - window {
            let end = start + window - 1;
            let resistance_slope = linreg_slope(&highs[start..start + window]);
            let support_slope = linreg_slope(&lows[start..start + window]);
            if resistance_slope == 0.0 || support_slope == 0.0 {
                continue;
            }

            let start_spread = highs[start] - lows[start];
            if !(start_spread > 0.0) {
                continue;
            }
            let end_spread = highs[end] - lows[end];
            let convergence_ratio = end_spread / start_spread;
            if !(convergence_ratio < WEDGE_CONVERGENCE) {
                continue;
            }

            let rising = support_slope > WEDGE_STEEP.0
                && support_slope < WEDGE_STEEP.1
                && resistance_slope > WEDGE_SHALLOW.0
                && resistance_slope < WEDGE_SHALLOW.1
                && support_slope > resistance_slope;
            let falling = resistance_slope > -WEDGE_STEEP.1
                && resistance_slope < -WEDGE_STEEP.0
                && support_slope > -WEDGE_SHALLOW.1
                && support_slope < -WEDGE_SHALLOW.0
                && resistance_slope < support_slope;

            let (kind, sentiment) = if rising {
                (PatternKind::RisingWedge, Sentiment::Bearish)
            } else if falling {
                (PatternKind::FallingWedge, Sentiment::Bullish)
            } else {
                continue;
            };

            records.push(PatternRecord {
                kind,
                sentiment,
                confidence: Confidence::Medium,
                anchor: Anchor::range(
                    (start, series.timestamp(start)),
                    (end, series.timestamp(end)),
                ),
                details: PatternDetails::Wedge {
                    resistance_slope,
                    support_slope,
                    start_spread,
                    end_spread,
                    convergence_ratio,
                },
            });
            if records.len() >= self.max_matches {
                break;
            }
        }

        Ok(records)
    }
}
