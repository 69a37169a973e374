//! Single and few-bar candlestick formation detector.
//!
//! Scans from the second bar onward, deriving body/shadow geometry per
//! bar. A bar with zero total range carries no intrabar movement to
//! classify and is skipped entirely. Output across all sub-patterns is
//! capped to the first [`CandlestickPatternDetector::max_matches`] hits
//! in bar-scan order.

use super::ensure_min_bars;
use crate::{
    series::{Bar, Series},
    Anchor, Confidence, PatternDetails, PatternKind, PatternRecord, Result, Sentiment,
};

const MIN_BARS: usize = 2;

impl_with_defaults!(CandlestickPatternDetector);

/// Detector for candlestick micro-patterns.
#[derive(Debug, Clone)]
pub struct CandlestickPatternDetector {
    /// Cap across every sub-pattern combined.
    pub max_matches: usize,
    /// Body/range ceiling for a doji.
    pub doji_body_ratio: f64,
    /// Body/range ceiling for hammer and shooting star.
    pub small_body_ratio: f64,
    /// Dominant shadow must exceed this multiple of the body.
    pub shadow_dominance: f64,
    /// Opposite shadow must stay under this multiple of the body.
    pub shadow_limit: f64,
}

impl Default for CandlestickPatternDetector {
    fn default() -> Self {
        Self {
            max_matches: 10,
            doji_body_ratio: 0.10,
            small_body_ratio: 0.30,
            shadow_dominance: 2.0,
            shadow_limit: 0.5,
        }
    }
}

impl CandlestickPatternDetector {
    pub fn scan(&self, series: &Series) -> Result<Vec<PatternRecord>> {
        ensure_min_bars("candlestick", MIN_BARS, series.len())?;

        let mut records = Vec::new();

        for i in 1..series.len() {
            let bar = series.bar(i);
            let range = bar.range();
            if !(range > 0.0) {
                continue;
            }

            let body = bar.body();
            let upper = bar.upper_shadow();
            let lower = bar.lower_shadow();
            let prev = series.bar(i - 1);

            if body / range < self.doji_body_ratio {
                records.push(self.single(series, i, &bar, PatternKind::Doji));
            }

            if body / range < self.small_body_ratio
                && lower > self.shadow_dominance * body
                && upper < self.shadow_limit * body
            {
                records.push(self.single(series, i, &bar, PatternKind::Hammer));
            }

            if body / range < self.small_body_ratio
                && upper > self.shadow_dominance * body
                && lower < self.shadow_limit * body
            {
                records.push(self.single(series, i, &bar, PatternKind::ShootingStar));
            }

            // Engulfing compares against the prior bar's body; the bullish
            // and bearish variants are checked independently.
            if bar.is_bullish()
                && prev.is_bearish()
                && bar.open < prev.close
                && bar.close > prev.open
            {
                records.push(self.spanning(series, i - 1, i, &bar, PatternKind::BullishEngulfing));
            }

            if bar.is_bearish()
                && prev.is_bullish()
                && bar.open > prev.close
                && bar.close < prev.open
            {
                records.push(self.spanning(series, i - 1, i, &bar, PatternKind::BearishEngulfing));
            }

            if i >= 2 {
                let window = [series.bar(i - 2), prev, bar];
                let strike = if window.iter().all(Bar::is_bullish) {
                    Some(Sentiment::Bullish)
                } else if window.iter().all(Bar::is_bearish) {
                    Some(Sentiment::Bearish)
                } else {
                    None
                };
                if let Some(sentiment) = strike {
                    let mut record =
                        self.spanning(series, i - 2, i, &bar, PatternKind::ThreeBarStrike);
                    record.sentiment = sentiment;
                    records.push(record);
                }
            }

            if records.len() >= self.max_matches {
                records.truncate(self.max_matches);
                break;
            }
        }

        Ok(records)
    }

    fn single(&self, series: &Series, index: usize, bar: &Bar, kind: PatternKind) -> PatternRecord {
        PatternRecord {
            kind,
            sentiment: kind_sentiment(kind),
            confidence: kind_confidence(kind),
            anchor: Anchor::single(index, series.timestamp(index)),
            details: PatternDetails::Candle {
                body: bar.body(),
                range: bar.range(),
            },
        }
    }

    fn spanning(
        &self,
        series: &Series,
        start: usize,
        end: usize,
        bar: &Bar,
        kind: PatternKind,
    ) -> PatternRecord {
        PatternRecord {
            kind,
            sentiment: kind_sentiment(kind),
            confidence: kind_confidence(kind),
            anchor: Anchor::range(
                (start, series.timestamp(start)),
                (end, series.timestamp(end)),
            ),
            details: PatternDetails::Candle {
                body: bar.body(),
                range: bar.range(),
            },
        }
    }
}

fn kind_sentiment(kind: PatternKind) -> Sentiment {
    match kind {
        PatternKind::Doji => Sentiment::Neutral,
        PatternKind::Hammer | PatternKind::BullishEngulfing => Sentiment::Bullish,
        PatternKind::ShootingStar | PatternKind::BearishEngulfing => Sentiment::Bearish,
        // Three-bar strike direction is set from the window by the caller.
        _ => Sentiment::Neutral,
    }
}

fn kind_confidence(kind: PatternKind) -> Confidence {
    match kind {
        PatternKind::BullishEngulfing | PatternKind::BearishEngulfing => Confidence::High,
        _ => Confidence::Medium,
    }
}
