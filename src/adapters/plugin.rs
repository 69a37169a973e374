//! Registry adapter over an optional external pattern library.
//!
//! The library is a dynamic plugin (`.so`/`.dll`/`.dylib`) exporting a
//! C-ABI `scan_patterns` symbol. Load failure is not an error: the
//! provider simply reports itself unavailable and the registry's fallback
//! walk moves on to the next candidate.

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use tracing::{info, warn};

use crate::{
    registry::{DetectOptions, Detection, PatternProvider, PricePoint, ProviderError},
    series::Series,
    Confidence, PatternKind, Sentiment,
};

/// Bar layout shared with the plugin.
#[repr(C)]
pub struct RawBar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Match layout returned by the plugin.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawMatch {
    pub start: u32,
    pub end: u32,
    /// 1 bullish, -1 bearish, anything else neutral.
    pub sentiment: i32,
    /// 2 high, 1 medium, anything else low.
    pub confidence: u32,
    pub level: f64,
}

/// `scan_patterns(bars, len, kind_tag, out, capacity)` returning the match
/// count, or a negative code on failure.
type ScanPatternsFn =
    unsafe extern "C" fn(*const RawBar, usize, u32, *mut RawMatch, usize) -> i64;

const SCAN_SYMBOL: &[u8] = b"scan_patterns";
const MATCH_CAPACITY: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("pattern library {0} is not loaded")]
    NotLoaded(PathBuf),

    #[error("pattern library is missing the scan_patterns symbol: {0}")]
    SymbolNotFound(String),

    #[error("pattern library scan failed with code {0}")]
    ScanFailed(i64),
}

/// Provider backed by an external pattern-matching library.
pub struct PluginProvider {
    path: PathBuf,
    library: Option<Library>,
}

impl PluginProvider {
    /// Attempt to load the plugin at `path`. A failed load is recorded and
    /// surfaced through [`is_available`](PatternProvider::is_available)
    /// rather than returned as an error.
    ///
    /// # Safety
    ///
    /// The caller must guarantee the library at `path` exports a
    /// `scan_patterns` symbol matching [`ScanPatternsFn`]'s ABI, and that
    /// loading it runs no unsound initialization code.
    pub unsafe fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        let library = match Library::new(&path) {
            Ok(library) => {
                info!(path = %path.display(), "loaded external pattern library");
                Some(library)
            }
            Err(error) => {
                warn!(
                    path = %path.display(),
                    %error,
                    "external pattern library unavailable"
                );
                None
            }
        };

        Self { path, library }
    }

    fn scan(
        &self,
        kind: PatternKind,
        series: &Series,
    ) -> Result<Option<RawMatch>, PluginError> {
        let library = self
            .library
            .as_ref()
            .ok_or_else(|| PluginError::NotLoaded(self.path.clone()))?;

        // SAFETY: symbol signature is part of the plugin contract the
        // caller vouched for in `load`.
        let scan: Symbol<'_, ScanPatternsFn> = unsafe {
            library
                .get(SCAN_SYMBOL)
                .map_err(|e| PluginError::SymbolNotFound(e.to_string()))?
        };

        let bars: Vec<RawBar> = (0..series.len())
            .map(|i| {
                let bar = series.bar(i);
                RawBar {
                    timestamp: bar.timestamp,
                    open: bar.open,
                    high: bar.high,
                    low: bar.low,
                    close: bar.close,
                    volume: bar.volume.unwrap_or(f64::NAN),
                }
            })
            .collect();

        let mut matches = [RawMatch {
            start: 0,
            end: 0,
            sentiment: 0,
            confidence: 0,
            level: 0.0,
        }; MATCH_CAPACITY];

        // SAFETY: bars and matches outlive the call; capacity bounds the
        // plugin's writes into the out buffer.
        let count = unsafe {
            scan(
                bars.as_ptr(),
                bars.len(),
                wire_tag(kind),
                matches.as_mut_ptr(),
                MATCH_CAPACITY,
            )
        };

        if count < 0 {
            return Err(PluginError::ScanFailed(count));
        }
        Ok((count > 0).then(|| matches[0]))
    }
}

impl PatternProvider for PluginProvider {
    fn name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("plugin")
    }

    fn supported_kinds(&self) -> &[PatternKind] {
        &[
            PatternKind::HeadAndShoulders,
            PatternKind::AscendingTriangle,
            PatternKind::DescendingTriangle,
            PatternKind::SymmetricalTriangle,
            PatternKind::DoubleTop,
            PatternKind::DoubleBottom,
            PatternKind::Flag,
            PatternKind::RisingWedge,
            PatternKind::FallingWedge,
        ]
    }

    fn is_available(&self) -> bool {
        self.library.is_some()
    }

    fn detect(
        &self,
        kind: PatternKind,
        series: &Series,
        _options: &DetectOptions,
    ) -> Result<Option<Detection>, ProviderError> {
        let Some(raw) = self.scan(kind, series)? else {
            return Ok(None);
        };

        let clamp = |index: u32| (index as usize).min(series.len() - 1);
        let start = clamp(raw.start);
        let end = clamp(raw.end);

        Ok(Some(Detection {
            kind,
            sentiment: match raw.sentiment {
                1 => Sentiment::Bullish,
                -1 => Sentiment::Bearish,
                _ => Sentiment::Neutral,
            },
            confidence: match raw.confidence {
                2 => Confidence::High,
                1 => Confidence::Medium,
                _ => Confidence::Low,
            },
            points: vec![
                PricePoint {
                    index: start,
                    timestamp: series.timestamp(start),
                    price: raw.level,
                },
                PricePoint {
                    index: end,
                    timestamp: series.timestamp(end),
                    price: raw.level,
                },
            ],
            provider: self.name().to_string(),
        }))
    }
}

/// Wire tag for each pattern kind in the plugin contract.
fn wire_tag(kind: PatternKind) -> u32 {
    match kind {
        PatternKind::HeadAndShoulders => 1,
        PatternKind::AscendingTriangle => 2,
        PatternKind::DescendingTriangle => 3,
        PatternKind::SymmetricalTriangle => 4,
        PatternKind::DoubleTop => 5,
        PatternKind::DoubleBottom => 6,
        PatternKind::Flag => 7,
        PatternKind::RisingWedge => 8,
        PatternKind::FallingWedge => 9,
        PatternKind::Doji => 10,
        PatternKind::Hammer => 11,
        PatternKind::ShootingStar => 12,
        PatternKind::BullishEngulfing => 13,
        PatternKind::BearishEngulfing => 14,
        PatternKind::ThreeBarStrike => 15,
    }
}
