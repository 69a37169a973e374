//! Provider registry: polymorphic dispatch across competing pattern
//! implementations.
//!
//! Providers register per pattern kind with a priority. Lookup resolves an
//! explicitly requested provider name first, then a configured per-kind
//! default, then the highest-priority provider currently reporting itself
//! available. [`Registry::detect_with_fallback`] is the engine's only
//! retry mechanism: it walks every available provider in priority order,
//! logs per-provider failures instead of surfacing them, and reports
//! absence only once every candidate is exhausted.
//!
//! Tables are expected to be populated once at startup and then only
//! read; the registry is an explicit value owned by application setup, not
//! a process-wide singleton.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::{series::Series, Confidence, PatternKind, Sentiment};

/// Per-provider failures are opaque to the registry; it only logs them.
pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

/// Registration-time misuse. Detection errors never pass through here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("provider {provider} does not support pattern kind {kind}")]
    UnsupportedKind {
        provider: String,
        kind: PatternKind,
    },
}

/// Caller-tunable knobs threaded through to a provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectOptions {
    /// Override the provider's own output cap.
    pub max_matches: Option<usize>,
}

/// A coordinate a renderer can draw the pattern with.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PricePoint {
    pub index: usize,
    pub timestamp: i64,
    pub price: f64,
}

/// The unified result shape every provider's native output is normalized
/// into.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Detection {
    pub kind: PatternKind,
    pub sentiment: Sentiment,
    pub confidence: Confidence,
    pub points: Vec<PricePoint>,
    /// Which implementation produced this record.
    pub provider: String,
}

/// A concrete pattern implementation.
pub trait PatternProvider: Send + Sync {
    fn name(&self) -> &str;

    /// The pattern kinds this implementation claims to handle.
    fn supported_kinds(&self) -> &[PatternKind];

    /// Whether the implementation can currently serve requests. A wrapped
    /// external library that failed to load reports `false` here.
    fn is_available(&self) -> bool {
        true
    }

    /// Detect `kind` over `series`, or report absence.
    fn detect(
        &self,
        kind: PatternKind,
        series: &Series,
        options: &DetectOptions,
    ) -> Result<Option<Detection>, ProviderError>;

    fn supports(&self, kind: PatternKind) -> bool {
        self.supported_kinds().contains(&kind)
    }
}

struct Registration {
    priority: i32,
    provider: Arc<dyn PatternProvider>,
}

/// Maps each pattern kind to an ordered list of providers.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<PatternKind, Vec<Registration>>,
    defaults: HashMap<PatternKind, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` for `kind` at `priority` (higher wins).
    ///
    /// Rejects a provider that does not declare support for `kind`.
    /// Re-registering the same (kind, provider-name) pair overwrites the
    /// previous priority and logs a warning rather than failing.
    pub fn register(
        &mut self,
        kind: PatternKind,
        provider: Arc<dyn PatternProvider>,
        priority: i32,
    ) -> Result<(), RegistryError> {
        if !provider.supports(kind) {
            return Err(RegistryError::UnsupportedKind {
                provider: provider.name().to_string(),
                kind,
            });
        }

        let entries = self.entries.entry(kind).or_default();
        if let Some(existing) = entries
            .iter_mut()
            .find(|r| r.provider.name() == provider.name())
        {
            warn!(
                provider = provider.name(),
                %kind,
                old_priority = existing.priority,
                new_priority = priority,
                "re-registering provider; overwriting priority"
            );
            existing.priority = priority;
            existing.provider = provider;
        } else {
            entries.push(Registration { priority, provider });
        }

        // Priority descending; name ascending breaks ties deterministically.
        entries.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.provider.name().cmp(b.provider.name()))
        });
        Ok(())
    }

    /// Register `provider` at `priority` for every kind it supports.
    pub fn register_all(
        &mut self,
        provider: Arc<dyn PatternProvider>,
        priority: i32,
    ) -> Result<(), RegistryError> {
        for kind in provider.supported_kinds().to_vec() {
            self.register(kind, Arc::clone(&provider), priority)?;
        }
        Ok(())
    }

    /// Configure the provider name resolved for `kind` when no explicit
    /// name is requested.
    pub fn set_default(&mut self, kind: PatternKind, provider_name: impl Into<String>) {
        self.defaults.insert(kind, provider_name.into());
    }

    /// Resolution order: explicit name, else the configured per-kind
    /// default, else the highest-priority provider reporting itself
    /// available.
    pub fn resolve(
        &self,
        kind: PatternKind,
        explicit: Option<&str>,
    ) -> Option<Arc<dyn PatternProvider>> {
        let entries = self.entries.get(&kind)?;

        if let Some(name) = explicit {
            return entries
                .iter()
                .find(|r| r.provider.name() == name)
                .map(|r| Arc::clone(&r.provider));
        }

        if let Some(name) = self.defaults.get(&kind) {
            if let Some(registration) = entries.iter().find(|r| r.provider.name() == name) {
                return Some(Arc::clone(&registration.provider));
            }
        }

        entries
            .iter()
            .find(|r| r.provider.is_available())
            .map(|r| Arc::clone(&r.provider))
    }

    /// Detect through the single provider [`resolve`](Self::resolve) picks.
    pub fn detect(
        &self,
        kind: PatternKind,
        series: &Series,
        options: &DetectOptions,
        provider_name: Option<&str>,
    ) -> Result<Option<Detection>, ProviderError> {
        match self.resolve(kind, provider_name) {
            Some(provider) => provider.detect(kind, series, options),
            None => Ok(None),
        }
    }

    /// Try every available provider for `kind` in priority order and
    /// return the first that neither fails nor reports absence, tagged
    /// with the provider that produced it. Per-provider failures are
    /// logged and swallowed here — and only here.
    pub fn detect_with_fallback(
        &self,
        kind: PatternKind,
        series: &Series,
        options: &DetectOptions,
    ) -> Option<Detection> {
        let entries = self.entries.get(&kind)?;

        for registration in entries {
            let provider = &registration.provider;
            if !provider.is_available() {
                debug!(provider = provider.name(), %kind, "skipping unavailable provider");
                continue;
            }

            match provider.detect(kind, series, options) {
                Ok(Some(mut detection)) => {
                    detection.provider = provider.name().to_string();
                    return Some(detection);
                }
                Ok(None) => {
                    debug!(provider = provider.name(), %kind, "provider found no pattern");
                }
                Err(error) => {
                    warn!(
                        provider = provider.name(),
                        %kind,
                        %error,
                        "provider failed; trying next candidate"
                    );
                }
            }
        }

        None
    }

    /// Names registered for `kind`, in resolution order.
    pub fn providers_for(&self, kind: PatternKind) -> Vec<&str> {
        self.entries
            .get(&kind)
            .map(|entries| entries.iter().map(|r| r.provider.name()).collect())
            .unwrap_or_default()
    }
}

// ============================================================
// TESTS
// ============================================================
