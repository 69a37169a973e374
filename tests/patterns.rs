//! Integration tests for the chart, candlestick, and support/resistance
//! detectors.

use patternscan::prelude::*;

fn bar(ts: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
    Bar::new(ts, o, h, l, c)
}

/// Bars with the given highs; the rest of the bar hangs a fixed distance
/// below the high.
fn series_from_highs(highs: &[f64]) -> Series {
    let bars: Vec<Bar> = highs
        .iter()
        .enumerate()
        .map(|(i, &h)| bar(i as i64, h - 3.0, h, h - 5.0, h - 2.0))
        .collect();
    Series::from_bars(bars).unwrap()
}

fn flat_series(n: usize) -> Series {
    let bars: Vec<Bar> = (0..n)
        .map(|i| bar(i as i64, 100.0, 102.0, 98.0, 101.0))
        .collect();
    Series::from_bars(bars).unwrap()
}

// ============================================================
// VALIDATION
// ============================================================

#[test]
fn test_missing_high_column_is_named() {
    let json = r#"{
        "Open":  [1.0, 2.0],
        "Low":   [0.5, 1.5],
        "Close": [0.8, 1.8]
    }"#;

    let raw: RawSeries = serde_json::from_str(json).unwrap();
    let err = raw.validate().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("High"), "got: {message}");
    assert!(message.contains("Open, Low, Close"), "got: {message}");
}

#[test]
fn test_empty_series_is_rejected() {
    assert!(matches!(
        Series::from_bars(vec![]),
        Err(MalformedInput::EmptySeries)
    ));
}

#[test]
fn test_insufficient_data_names_exact_counts() {
    let series = flat_series(5);
    let err = ChartPatternDetector::default()
        .head_and_shoulders(&series)
        .unwrap_err();

    assert_eq!(
        err,
        PatternError::InsufficientData {
            pattern: "head_and_shoulders",
            required: 20,
            actual: 5
        }
    );
    let message = err.to_string();
    assert!(message.contains("20"), "got: {message}");
    assert!(message.contains('5'), "got: {message}");
}

// ============================================================
// CHART PATTERNS
// ============================================================

#[test]
fn test_head_and_shoulders_detection() {
    let mut highs = vec![90.0; 25];
    highs[2] = 100.0; // left shoulder
    highs[7] = 110.0; // head
    highs[12] = 101.0; // right shoulder
    let series = series_from_highs(&highs);

    let records = ChartPatternDetector::with_defaults()
        .head_and_shoulders(&series)
        .unwrap();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.kind, PatternKind::HeadAndShoulders);
    assert_eq!(record.sentiment, Sentiment::Bearish);
    assert_eq!(record.confidence, Confidence::Medium);
    assert_eq!(record.anchor.end_index(), 12);
    match record.details {
        PatternDetails::HeadAndShoulders { neckline, head, .. } => {
            assert!((neckline - 100.5).abs() < 1e-9);
            assert_eq!(head, 110.0);
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[test]
fn test_head_and_shoulders_cap() {
    // One valid formation every 15 bars; 100 bars yield six candidates.
    let highs: Vec<f64> = (0..100)
        .map(|i| match i % 15 {
            0 => 100.0,
            5 => 110.0,
            10 => 100.0,
            _ => 90.0,
        })
        .collect();
    let series = series_from_highs(&highs);

    let records = ChartPatternDetector::default()
        .head_and_shoulders(&series)
        .unwrap();
    assert_eq!(records.len(), 5);
}

#[test]
fn test_ascending_triangle_detection() {
    let bars: Vec<Bar> = (0..20)
        .map(|i| {
            let high = 100.0 + 0.05 * if i % 2 == 0 { 1.0 } else { -1.0 };
            let low = 50.0 + 0.02 * i as f64;
            bar(i as i64, 75.0, high, low, 76.0)
        })
        .collect();
    let series = Series::from_bars(bars).unwrap();

    let records = ChartPatternDetector::default().triangles(&series).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, PatternKind::AscendingTriangle);
    assert_eq!(records[0].sentiment, Sentiment::Bullish);
}

#[test]
fn test_symmetrical_triangle_detection() {
    let bars: Vec<Bar> = (0..20)
        .map(|i| {
            let wobble = 0.05 * if i % 2 == 0 { 1.0 } else { -1.0 };
            bar(i as i64, 75.0, 100.0 + wobble, 50.0 - wobble, 76.0)
        })
        .collect();
    let series = Series::from_bars(bars).unwrap();

    let records = ChartPatternDetector::default().triangles(&series).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, PatternKind::SymmetricalTriangle);
    assert_eq!(records[0].sentiment, Sentiment::Neutral);
}

#[test]
fn test_double_top_detection() {
    // Matching peaks at bars 0 and 5; the filler bars sit well below the
    // peaks but retrace barely at all relative to their own highs.
    let bars: Vec<Bar> = (0..12)
        .map(|i| match i {
            0 => bar(0, 97.0, 100.0, 95.0, 98.0),
            5 => bar(5, 97.0, 101.0, 96.0, 98.0),
            _ => bar(i as i64, 84.2, 85.0, 84.0, 84.8),
        })
        .collect();
    let series = Series::from_bars(bars).unwrap();

    let records = ChartPatternDetector::default()
        .double_tops(&series)
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, PatternKind::DoubleTop);
    assert_eq!(records[0].sentiment, Sentiment::Bearish);
    assert_eq!(records[0].anchor.start_index(), 0);
    assert_eq!(records[0].anchor.end_index(), 5);
}

#[test]
fn test_double_bottom_detection() {
    let bars: Vec<Bar> = (0..12)
        .map(|i| {
            let (h, l) = match i {
                0 => (75.0, 70.0),
                5 => (75.0, 70.5),
                2 => (80.0, 76.0), // intervening peak
                _ => {
                    let low = 72.0 + 0.8 * i as f64;
                    (low + 2.0, low)
                }
            };
            bar(i as i64, l + 0.5, h, l, l + 1.0)
        })
        .collect();
    let series = Series::from_bars(bars).unwrap();

    let records = ChartPatternDetector::default()
        .double_bottoms(&series)
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, PatternKind::DoubleBottom);
    assert_eq!(records[0].sentiment, Sentiment::Bullish);
}

#[test]
fn test_flag_detection() {
    let bars: Vec<Bar> = (0..15)
        .map(|i| {
            let close = if i < 10 { 100.0 + i as f64 } else { 109.5 };
            bar(i as i64, close - 0.5, close + 1.0, close - 1.5, close)
        })
        .collect();
    let series = Series::from_bars(bars).unwrap();

    let records = ChartPatternDetector::default().flags(&series).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, PatternKind::Flag);
    assert_eq!(records[0].sentiment, Sentiment::Bullish);
    assert_eq!(records[0].confidence, Confidence::Low);
}

#[test]
fn test_rising_wedge_detection() {
    let bars: Vec<Bar> = (0..30)
        .map(|i| {
            let high = 20.0 + 0.05 * i as f64;
            let low = 10.0 + 0.2 * i as f64;
            bar(i as i64, low + 0.1, high, low, high - 0.1)
        })
        .collect();
    let series = Series::from_bars(bars).unwrap();

    let records = ChartPatternDetector::default().wedges(&series).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.kind, PatternKind::RisingWedge);
    assert_eq!(record.sentiment, Sentiment::Bearish);
    match record.details {
        PatternDetails::Wedge {
            convergence_ratio,
            start_spread,
            end_spread,
            ..
        } => {
            assert!(convergence_ratio < 0.8);
            assert!(end_spread < start_spread);
        }
        other => panic!("unexpected details: {other:?}"),
    }
}

#[test]
fn test_wedge_cap_and_invariant() {
    // Converging lines over 60 bars: every window qualifies, so the cap
    // binds and every emitted record must satisfy the convergence bound.
    let bars: Vec<Bar> = (0..60)
        .map(|i| {
            let high = 20.0 + 0.05 * i as f64;
            let low = 10.0 + 0.2 * i as f64;
            bar(i as i64, low + 0.05, high, low, high - 0.05)
        })
        .collect();
    let series = Series::from_bars(bars).unwrap();

    let records = ChartPatternDetector::default().wedges(&series).unwrap();
    assert_eq!(records.len(), 5);
    for record in &records {
        match record.details {
            PatternDetails::Wedge {
                convergence_ratio,
                start_spread,
                end_spread,
                ..
            } => {
                assert!(convergence_ratio < 0.8);
                assert!(end_spread < start_spread);
            }
            other => panic!("unexpected details: {other:?}"),
        }
    }
}

// ============================================================
// CANDLESTICK PATTERNS
// ============================================================

#[test]
fn test_doji_classification() {
    let series = Series::from_bars(vec![
        bar(0, 100.0, 101.0, 99.0, 100.5),
        bar(1, 100.0, 105.0, 95.0, 100.2),
    ])
    .unwrap();

    let records = CandlestickPatternDetector::with_defaults()
        .scan(&series)
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, PatternKind::Doji);
    assert_eq!(records[0].sentiment, Sentiment::Neutral);
    assert_eq!(records[0].confidence, Confidence::Medium);
}

#[test]
fn test_bullish_engulfing_classification() {
    // A down bar followed by an up bar opening below and closing above
    // the prior body.
    let series = Series::from_bars(vec![
        bar(0, 10.0, 10.5, 8.5, 9.0),
        bar(1, 8.0, 12.5, 7.5, 12.0),
    ])
    .unwrap();

    let records = CandlestickPatternDetector::default().scan(&series).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, PatternKind::BullishEngulfing);
    assert_eq!(records[0].sentiment, Sentiment::Bullish);
    assert_eq!(records[0].confidence, Confidence::High);
}

#[test]
fn test_bearish_engulfing_classification() {
    let series = Series::from_bars(vec![
        bar(0, 9.0, 10.5, 8.5, 10.0),
        bar(1, 12.0, 12.5, 7.5, 8.0),
    ])
    .unwrap();

    let records = CandlestickPatternDetector::default().scan(&series).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, PatternKind::BearishEngulfing);
    assert_eq!(records[0].confidence, Confidence::High);
}

#[test]
fn test_three_bar_strike() {
    let bars: Vec<Bar> = (0..4)
        .map(|i| {
            let base = 100.0 + 3.0 * i as f64;
            bar(i as i64, base, base + 3.5, base - 0.5, base + 3.0)
        })
        .collect();
    let series = Series::from_bars(bars).unwrap();

    let records = CandlestickPatternDetector::default().scan(&series).unwrap();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert_eq!(record.kind, PatternKind::ThreeBarStrike);
        assert_eq!(record.sentiment, Sentiment::Bullish);
    }
}

#[test]
fn test_candlestick_output_cap() {
    let bars: Vec<Bar> = (0..25)
        .map(|i| bar(i as i64, 100.0, 105.0, 95.0, 100.2))
        .collect();
    let series = Series::from_bars(bars).unwrap();

    let records = CandlestickPatternDetector::default().scan(&series).unwrap();
    assert_eq!(records.len(), 10);
    assert_eq!(records[0].anchor.end_index(), 1);
}

#[test]
fn test_zero_range_bar_is_skipped() {
    let series = Series::from_bars(vec![
        bar(0, 100.0, 101.0, 99.0, 100.5),
        bar(1, 100.0, 100.0, 100.0, 100.0),
        bar(2, 100.0, 105.0, 95.0, 100.2),
    ])
    .unwrap();

    let records = CandlestickPatternDetector::default().scan(&series).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].anchor.end_index(), 2);
}

// ============================================================
// SUPPORT / RESISTANCE
// ============================================================

fn level_series() -> Series {
    let bars: Vec<Bar> = (0..40)
        .map(|i| {
            let (h, l) = match i {
                20 => (110.0, 95.0),
                15 => (105.0, 90.0),
                _ => (105.0, 95.0),
            };
            bar(i as i64, 100.0, h, l, 101.0)
        })
        .collect();
    Series::from_bars(bars).unwrap()
}

#[test]
fn test_level_ordering() {
    let levels = SupportResistanceDetector::with_defaults()
        .find_levels(&level_series())
        .unwrap();

    assert_eq!(levels.resistance, vec![110.0]);
    assert_eq!(levels.support, vec![90.0, 95.0]);
    assert_eq!(levels.current_price, 101.0);

    assert!(levels.resistance.windows(2).all(|w| w[0] >= w[1]));
    assert!(levels.support.windows(2).all(|w| w[0] <= w[1]));
    assert!(levels.resistance.len() <= 5);
    assert!(levels.support.len() <= 5);
}

#[test]
fn test_level_strength_ordering() {
    let records = SupportResistanceDetector::default()
        .find_levels_with_strength(&level_series())
        .unwrap();

    assert_eq!(records.len(), 3);
    // The 95 support is touched by nearly every bar; the other levels
    // only by their own extremum.
    assert_eq!(records[0].price, 95.0);
    assert_eq!(records[0].strength, Some(LevelStrength::Strong));
    assert_eq!(records[1].strength, Some(LevelStrength::Weak));
    assert_eq!(records[2].strength, Some(LevelStrength::Weak));
}

#[test]
fn test_levels_insufficient_data() {
    let series = flat_series(10);
    let err = SupportResistanceDetector::default()
        .find_levels(&series)
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("20"), "got: {message}");
    assert!(message.contains("10"), "got: {message}");
}

// ============================================================
// DETERMINISM
// ============================================================

#[test]
fn test_detection_is_deterministic() {
    let mut highs = vec![90.0; 60];
    for (i, h) in highs.iter_mut().enumerate() {
        *h += (i % 7) as f64 * 2.0;
    }
    let series = series_from_highs(&highs);
    let scanner = PatternScanner::default();

    let first = scanner.scan(&series).unwrap();
    let second = scanner.scan(&series).unwrap();
    assert_eq!(first, second);
}
