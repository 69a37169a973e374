//! Registry adapter over the built-in [`ChartPatternDetector`].
//!
//! Each pattern kind maps to its sub-algorithm through an explicit match,
//! resolved at compile time. The detector's richer record shape is
//! flattened into the registry's minimal [`Detection`]: kind, sentiment,
//! confidence, and coordinate points for rendering.

use crate::{
    detectors::ChartPatternDetector,
    registry::{DetectOptions, Detection, PatternProvider, PricePoint, ProviderError},
    series::Series,
    PatternDetails, PatternKind, PatternRecord,
};

const CHART_KINDS: [PatternKind; 9] = [
    PatternKind::HeadAndShoulders,
    PatternKind::AscendingTriangle,
    PatternKind::DescendingTriangle,
    PatternKind::SymmetricalTriangle,
    PatternKind::DoubleTop,
    PatternKind::DoubleBottom,
    PatternKind::Flag,
    PatternKind::RisingWedge,
    PatternKind::FallingWedge,
];

/// Always-available provider backed by the hand-written chart detector.
#[derive(Debug, Clone, Default)]
pub struct BuiltinProvider {
    detector: ChartPatternDetector,
}

impl BuiltinProvider {
    pub fn new(detector: ChartPatternDetector) -> Self {
        Self { detector }
    }
}

impl PatternProvider for BuiltinProvider {
    fn name(&self) -> &str {
        "builtin"
    }

    fn supported_kinds(&self) -> &[PatternKind] {
        &CHART_KINDS
    }

    fn detect(
        &self,
        kind: PatternKind,
        series: &Series,
        options: &DetectOptions,
    ) -> Result<Option<Detection>, ProviderError> {
        let mut detector = self.detector.clone();
        if let Some(cap) = options.max_matches {
            detector.max_matches = cap;
        }

        let records = match kind {
            PatternKind::HeadAndShoulders => detector.head_and_shoulders(series)?,
            PatternKind::AscendingTriangle
            | PatternKind::DescendingTriangle
            | PatternKind::SymmetricalTriangle => detector.triangles(series)?,
            PatternKind::DoubleTop => detector.double_tops(series)?,
            PatternKind::DoubleBottom => detector.double_bottoms(series)?,
            PatternKind::Flag => detector.flags(series)?,
            PatternKind::RisingWedge | PatternKind::FallingWedge => detector.wedges(series)?,
            _ => return Ok(None),
        };

        Ok(records
            .into_iter()
            .find(|r| r.kind == kind)
            .map(|r| self.normalize(&r, series)))
    }
}

impl BuiltinProvider {
    fn normalize(&self, record: &PatternRecord, series: &Series) -> Detection {
        Detection {
            kind: record.kind,
            sentiment: record.sentiment,
            confidence: record.confidence,
            points: self.points(record, series),
            provider: self.name().to_string(),
        }
    }

    /// Render coordinates for each shape's defining prices.
    fn points(&self, record: &PatternRecord, series: &Series) -> Vec<PricePoint> {
        let point = |index: usize, price: f64| PricePoint {
            index,
            timestamp: series.timestamp(index),
            price,
        };
        let start = record.anchor.start_index();
        let end = record.anchor.end_index();

        match record.details {
            PatternDetails::HeadAndShoulders {
                left_shoulder,
                head,
                right_shoulder,
                ..
            } => {
                let spacing = self.detector.peak_spacing;
                vec![
                    point(end - 2 * spacing, left_shoulder),
                    point(end - spacing, head),
                    point(end, right_shoulder),
                ]
            }
            PatternDetails::Triangle {
                window_high,
                window_low,
                ..
            } => vec![point(start, window_high), point(end, window_low)],
            PatternDetails::DoubleExtreme { first, second, .. } => {
                vec![point(start, first), point(end, second)]
            }
            PatternDetails::Flag { .. } => vec![
                point(start, series.closes()[start]),
                point(end, series.closes()[end]),
            ],
            PatternDetails::Wedge { .. } => vec![
                point(start, series.highs()[start]),
                point(start, series.lows()[start]),
                point(end, series.highs()[end]),
                point(end, series.lows()[end]),
            ],
            PatternDetails::Candle { .. } => vec![
                point(start, series.closes()[start]),
                point(end, series.closes()[end]),
            ],
        }
    }
}
