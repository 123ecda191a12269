//! Performance mode: turns a classification into host ritual changes.

use serde::Serialize;

use crate::classifier::CapabilityClassifier;
use crate::preference::{PreferenceStore, MODE_STORAGE_KEY, PERFORMANCE_MODE};
use crate::probe::{collect_signals, SignalProbe};
use crate::types::{ClassificationResult, PlugResult};

/// Body class the host stylesheet keys performance mode on.
pub const PERFORMANCE_BODY_CLASS: &str = "ritual-performance";

/// The host's ritual selector and body class list.
pub trait ModeSelector {
    /// Whether the selector exists and offers `value`.
    fn has_option(&self, value: &str) -> bool;

    /// Select `value` and notify the host so it clears other rituals.
    fn select(&mut self, value: &str) -> PlugResult<()>;

    fn add_body_class(&mut self, class: &str);

    fn remove_body_class(&mut self, class: &str);
}

/// What [`PerformanceMode::apply`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeOutcome {
    /// Ritual selected and body class applied.
    Activated,
    /// No selector option to pick; only the body class was applied.
    SelectorMissingOption,
    /// Device is capable; nothing touched.
    Unchanged,
}

/// Result of a full startup pass.
#[derive(Debug, Clone, Serialize)]
pub struct StartupReport {
    pub classification: ClassificationResult,
    pub outcome: ModeOutcome,
    pub persisted: bool,
}

/// Applies and persists the performance ritual.
#[derive(Debug, Clone, Default)]
pub struct PerformanceMode {
    classifier: CapabilityClassifier,
    persist_verdict: bool,
}

impl PerformanceMode {
    pub fn new(classifier: CapabilityClassifier) -> Self {
        Self {
            classifier,
            persist_verdict: false,
        }
    }

    /// Also store the ritual so later sessions skip detection.
    pub fn persisting(mut self, persist: bool) -> Self {
        self.persist_verdict = persist;
        self
    }

    pub fn classifier(&self) -> &CapabilityClassifier {
        &self.classifier
    }

    pub fn apply<M: ModeSelector + ?Sized>(
        &self,
        selector: &mut M,
        result: &ClassificationResult,
    ) -> PlugResult<ModeOutcome> {
        if !result.is_constrained {
            return Ok(ModeOutcome::Unchanged);
        }

        let outcome = if selector.has_option(PERFORMANCE_MODE) {
            selector.select(PERFORMANCE_MODE)?;
            ModeOutcome::Activated
        } else {
            tracing::warn!("Ritual selector has no performance option");
            ModeOutcome::SelectorMissingOption
        };
        selector.add_body_class(PERFORMANCE_BODY_CLASS);
        tracing::info!("Performance mode enabled");
        Ok(outcome)
    }

    /// Keep the body class in step with the user's ritual choice.
    /// Returns whether performance mode is now active.
    pub fn on_selection_changed<M: ModeSelector + ?Sized>(&self, selector: &mut M, value: &str) -> bool {
        if value == PERFORMANCE_MODE {
            selector.add_body_class(PERFORMANCE_BODY_CLASS);
            true
        } else {
            selector.remove_body_class(PERFORMANCE_BODY_CLASS);
            false
        }
    }

    /// Store the classifier's sentinel for a heuristic verdict so the next
    /// session takes the override path. An override is already stored.
    pub fn persist<S: PreferenceStore + ?Sized>(
        &self,
        store: &mut S,
        result: &ClassificationResult,
    ) -> PlugResult<bool> {
        if !result.is_constrained || result.is_override() {
            return Ok(false);
        }
        let sentinel = self.classifier.performance_sentinel();
        store.set(MODE_STORAGE_KEY, sentinel)?;
        tracing::debug!("Persisted {MODE_STORAGE_KEY}={sentinel}");
        Ok(true)
    }

    /// Detect, apply, and optionally persist in one pass. The probe's own
    /// preference store is both read and written.
    pub fn run_startup<P, M>(&self, probe: &mut P, selector: &mut M) -> PlugResult<StartupReport>
    where
        P: SignalProbe,
        M: ModeSelector + ?Sized,
    {
        let signals = collect_signals(probe);
        let classification = self.classifier.classify(&signals);
        let outcome = self.apply(selector, &classification)?;
        let persisted = if self.persist_verdict {
            self.persist(probe.preferences_mut(), &classification)?
        } else {
            false
        };
        Ok(StartupReport {
            classification,
            outcome,
            persisted,
        })
    }
}
