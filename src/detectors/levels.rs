//! Support/resistance level detection from local extrema.
//!
//! A bar whose high equals the maximum high across the symmetric
//! `window`-bar neighborhood on both sides is a resistance candidate;
//! lows mirror for support. Candidates are deduplicated by exact value,
//! sorted (resistance descending, support ascending — strongest first)
//! and truncated to `max_levels`. The strength mode additionally counts
//! touches within 1% of each level across the whole series.

use super::{ensure_min_bars, helpers::min_max};
use crate::{series::Series, LevelRecord, LevelScan, LevelSide, LevelStrength, Result};

const MIN_BARS: usize = 20;
/// Tolerance band for counting a bar as touching a level.
const TOUCH_TOLERANCE: f64 = 0.01;
const STRONG_TOUCHES: usize = 5;
const MEDIUM_TOUCHES: usize = 3;

impl_with_defaults!(SupportResistanceDetector);

/// Detector for price levels that have repeatedly acted as turning points.
#[derive(Debug, Clone)]
pub struct SupportResistanceDetector {
    /// Symmetric neighborhood size on each side of a candidate bar.
    pub window: usize,
    /// Maximum levels returned per side.
    pub max_levels: usize,
}

impl Default for SupportResistanceDetector {
    fn default() -> Self {
        Self {
            window: 10,
            max_levels: 5,
        }
    }
}

impl SupportResistanceDetector {
    /// Strongest levels per side plus the latest close.
    pub fn find_levels(&self, series: &Series) -> Result<LevelScan> {
        ensure_min_bars("support_resistance", MIN_BARS, series.len())?;

        let (mut support, mut resistance) = self.candidates(series);

        resistance.sort_by(|a, b| b.total_cmp(a));
        resistance.dedup();
        resistance.truncate(self.max_levels);

        support.sort_by(f64::total_cmp);
        support.dedup();
        support.truncate(self.max_levels);

        Ok(LevelScan {
            support,
            resistance,
            current_price: series.last_close(),
        })
    }

    /// [`find_levels`](Self::find_levels) plus touch-count strength
    /// scoring, strongest levels first.
    pub fn find_levels_with_strength(&self, series: &Series) -> Result<Vec<LevelRecord>> {
        let scan = self.find_levels(series)?;

        let mut records: Vec<LevelRecord> = scan
            .support
            .iter()
            .map(|&price| self.score(series, price, LevelSide::Support))
            .chain(
                scan.resistance
                    .iter()
                    .map(|&price| self.score(series, price, LevelSide::Resistance)),
            )
            .collect();

        records.sort_by(|a, b| {
            b.strength
                .cmp(&a.strength)
                .then_with(|| b.touches.cmp(&a.touches))
                .then_with(|| a.price.total_cmp(&b.price))
        });

        Ok(records)
    }

    fn candidates(&self, series: &Series) -> (Vec<f64>, Vec<f64>) {
        let w = self.window;
        let highs = series.highs();
        let lows = series.lows();

        let mut support = Vec::new();
        let mut resistance = Vec::new();

        for i in w..series.len().saturating_sub(w) {
            let (_, neighborhood_high) = min_max(&highs[i - w..=i + w]);
            if highs[i] == neighborhood_high {
                resistance.push(highs[i]);
            }
            let (neighborhood_low, _) = min_max(&lows[i - w..=i + w]);
            if lows[i] == neighborhood_low {
                support.push(lows[i]);
            }
        }

        (support, resistance)
    }

    fn score(&self, series: &Series, price: f64, side: LevelSide) -> LevelRecord {
        let values = match side {
            LevelSide::Support => series.lows(),
            LevelSide::Resistance => series.highs(),
        };

        let touches = values
            .iter()
            .filter(|&&v| (v - price).abs() <= price.abs() * TOUCH_TOLERANCE)
            .count();

        let strength = if touches >= STRONG_TOUCHES {
            LevelStrength::Strong
        } else if touches >= MEDIUM_TOUCHES {
            LevelStrength::Medium
        } else {
            LevelStrength::Weak
        };

        LevelRecord {
            price,
            side,
            strength: Some(strength),
            touches: Some(touches),
        }
    }
}
