//! Constrained-device classification from environment signals.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::preference::PERFORMANCE_MODE;
use crate::types::{
    ClassificationResult, EnvironmentSignals, GraphicsProbe, PlugError, PlugResult, Reason,
};

/// Memory hints strictly below this many GiB count as low memory.
pub const DEFAULT_LOW_MEMORY_GIB: f64 = 4.0;

/// User-agent fragments that identify television platforms.
pub const DEFAULT_TV_KEYWORDS: &[&str] = &[
    "smart-tv", "smarttv", "googletv", "appletv", "roku", "webos", "tizen",
];

/// Integrated and mobile GPU families.
pub const DEFAULT_WEAK_GPU_FAMILIES: &[&str] = &["mali", "adreno", "videocore", "intel hd", "intel uhd"];

/// Tunable heuristics for the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub low_memory_threshold_gib: f64,
    pub tv_keywords: Vec<String>,
    pub weak_gpu_families: Vec<String>,
    pub performance_sentinel: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            low_memory_threshold_gib: DEFAULT_LOW_MEMORY_GIB,
            tv_keywords: DEFAULT_TV_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            weak_gpu_families: DEFAULT_WEAK_GPU_FAMILIES.iter().map(|s| s.to_string()).collect(),
            performance_sentinel: PERFORMANCE_MODE.to_string(),
        }
    }
}

impl ClassifierConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> PlugResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        tracing::debug!("Loaded classifier config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> PlugResult<()> {
        if !self.low_memory_threshold_gib.is_finite() || self.low_memory_threshold_gib < 0.0 {
            return Err(PlugError::Config(format!(
                "low_memory_threshold_gib must be a non-negative number, got {}",
                self.low_memory_threshold_gib
            )));
        }
        if self.performance_sentinel.is_empty() {
            return Err(PlugError::Config("performance_sentinel must not be empty".into()));
        }
        if self.tv_keywords.iter().chain(&self.weak_gpu_families).any(|k| k.trim().is_empty()) {
            return Err(PlugError::Config("keywords must not be blank".into()));
        }
        Ok(())
    }
}

/// Decides whether a device should run in performance mode.
///
/// Keyword lists are lower-cased once at construction; every check after
/// that is a case-insensitive substring test.
#[derive(Debug, Clone)]
pub struct CapabilityClassifier {
    low_memory_threshold_gib: f64,
    tv_keywords: Vec<String>,
    weak_gpu_families: Vec<String>,
    performance_sentinel: String,
}

impl Default for CapabilityClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

impl CapabilityClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let lower = |v: Vec<String>| v.into_iter().map(|k| k.to_lowercase()).collect();
        Self {
            low_memory_threshold_gib: config.low_memory_threshold_gib,
            tv_keywords: lower(config.tv_keywords),
            weak_gpu_families: lower(config.weak_gpu_families),
            performance_sentinel: config.performance_sentinel,
        }
    }

    /// Classify a signal snapshot. Never fails.
    ///
    /// A stored performance preference wins outright; otherwise the verdict
    /// is the OR of the television, memory, and graphics checks.
    pub fn classify(&self, signals: &EnvironmentSignals) -> ClassificationResult {
        if self.prefers_performance(signals.stored_preference.as_deref()) {
            tracing::debug!("Stored preference selects performance mode");
            return ClassificationResult::preference_override();
        }

        let mut reasons = BTreeSet::new();
        if self.is_television(&signals.user_agent) {
            reasons.insert(Reason::TelevisionPlatform);
        }
        if self.is_low_memory(signals.device_memory_gib) {
            reasons.insert(Reason::LowMemory);
        }
        if self.is_weak_graphics(&signals.graphics) {
            reasons.insert(Reason::WeakGraphics);
        }

        let result = ClassificationResult::from_reasons(reasons);
        if result.is_constrained {
            tracing::info!("Low-end device detected: {}", result.summary());
        } else {
            tracing::debug!("Device classified as capable");
        }
        result
    }

    /// Stored value that forces performance mode.
    pub fn performance_sentinel(&self) -> &str {
        &self.performance_sentinel
    }

    pub fn prefers_performance(&self, stored: Option<&str>) -> bool {
        stored == Some(self.performance_sentinel.as_str())
    }

    pub fn is_television(&self, user_agent: &str) -> bool {
        let ua = user_agent.to_lowercase();
        self.tv_keywords.iter().any(|k| ua.contains(k.as_str()))
    }

    /// An absent hint is not evidence of weakness.
    pub fn is_low_memory(&self, gib: Option<f64>) -> bool {
        gib.is_some_and(|g| g < self.low_memory_threshold_gib)
    }

    /// No context at all means no acceleration; a hidden renderer proves nothing.
    pub fn is_weak_graphics(&self, graphics: &GraphicsProbe) -> bool {
        match graphics {
            GraphicsProbe::Unavailable => true,
            GraphicsProbe::RendererHidden => false,
            GraphicsProbe::Renderer(name) => {
                let name = name.to_lowercase();
                self.weak_gpu_families.iter().any(|f| name.contains(f.as_str()))
            }
        }
    }
}

/// Classify with the default heuristics.
pub fn classify(signals: &EnvironmentSignals) -> ClassificationResult {
    CapabilityClassifier::default().classify(signals)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESKTOP_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

    fn reasons(list: &[Reason]) -> BTreeSet<Reason> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_preference_override_short_circuits() {
        let signals = EnvironmentSignals::new("Roku/DVP-9.10")
            .with_memory(1.0)
            .with_graphics(GraphicsProbe::Unavailable)
            .with_preference("performance");
        let result = classify(&signals);
        assert!(result.is_constrained);
        assert_eq!(result.reasons, reasons(&[Reason::PreferenceOverride]));
    }

    #[test]
    fn test_preference_override_on_capable_device() {
        let signals = EnvironmentSignals::new(DESKTOP_UA)
            .with_memory(32.0)
            .with_renderer("NVIDIA GeForce RTX 4090")
            .with_preference("performance");
        let result = classify(&signals);
        assert!(result.is_constrained);
        assert!(result.is_override());
        assert_eq!(result.reasons.len(), 1);
    }

    #[test]
    fn test_other_preference_values_do_not_override() {
        for pref in ["Performance", "matrix", "", " performance"] {
            let signals = EnvironmentSignals::new(DESKTOP_UA)
                .with_memory(8.0)
                .with_preference(pref);
            let result = classify(&signals);
            assert!(!result.is_constrained, "preference {pref:?} should not override");
        }
    }

    #[test]
    fn test_roku_any_case() {
        for ua in ["Roku/DVP-9.10 (519.10E04111A)", "ROKU", "something roku something"] {
            let result = classify(&EnvironmentSignals::new(ua));
            assert!(result.is_constrained);
            assert!(result.reasons.contains(&Reason::TelevisionPlatform));
        }
    }

    #[test]
    fn test_tv_keywords() {
        let uas = [
            "Mozilla/5.0 (SMART-TV; Linux; Tizen 6.0)",
            "Mozilla/5.0 (Web0S; Linux/SmartTV) webOS.TV",
            "Mozilla/5.0 (Linux; Android 12; GoogleTV)",
            "AppleTV11,1/11.1",
        ];
        for ua in uas {
            assert!(CapabilityClassifier::default().is_television(ua), "{ua}");
        }
        assert!(!CapabilityClassifier::default().is_television(DESKTOP_UA));
    }

    #[test]
    fn test_low_memory_only() {
        let result = classify(&EnvironmentSignals::new(DESKTOP_UA).with_memory(2.0));
        assert!(result.is_constrained);
        assert_eq!(result.reasons, reasons(&[Reason::LowMemory]));
    }

    #[test]
    fn test_memory_threshold_is_strict() {
        let classifier = CapabilityClassifier::default();
        assert!(classifier.is_low_memory(Some(3.99)));
        assert!(!classifier.is_low_memory(Some(4.0)));
        assert!(!classifier.is_low_memory(None));
    }

    #[test]
    fn test_missing_graphics_context_is_weak() {
        let signals = EnvironmentSignals::new(DESKTOP_UA)
            .with_memory(8.0)
            .with_graphics(GraphicsProbe::Unavailable);
        let result = classify(&signals);
        assert!(result.is_constrained);
        assert_eq!(result.reasons, reasons(&[Reason::WeakGraphics]));
    }

    #[test]
    fn test_hidden_renderer_is_not_weak() {
        let signals = EnvironmentSignals::new(DESKTOP_UA)
            .with_memory(8.0)
            .with_graphics(GraphicsProbe::RendererHidden);
        assert!(!classify(&signals).is_constrained);
    }

    #[test]
    fn test_weak_gpu_families() {
        let classifier = CapabilityClassifier::default();
        for name in [
            "Mali-G52 MC2",
            "Adreno (TM) 610",
            "VideoCore IV HW",
            "Intel HD Graphics 4000",
            "Mesa Intel UHD Graphics 620 (KBL GT2)",
        ] {
            assert!(classifier.is_weak_graphics(&GraphicsProbe::Renderer(name.into())), "{name}");
        }
        for name in [
            "NVIDIA GeForce GTX 1080/PCIe/SSE2",
            "AMD Radeon RX 6800 XT",
            "Apple M2",
            // The trademark sign breaks the "intel hd" fragment.
            "ANGLE (Intel, Intel(R) HD Graphics 620 Direct3D11)",
        ] {
            assert!(!classifier.is_weak_graphics(&GraphicsProbe::Renderer(name.into())), "{name}");
        }
    }

    #[test]
    fn test_capable_desktop() {
        let signals = EnvironmentSignals::new(DESKTOP_UA)
            .with_memory(8.0)
            .with_renderer("NVIDIA GeForce RTX");
        let result = classify(&signals);
        assert!(!result.is_constrained);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_all_heuristics_reported() {
        let signals = EnvironmentSignals::new("Mozilla/5.0 (SMART-TV; Tizen)")
            .with_memory(1.0)
            .with_renderer("Mali-400");
        let result = classify(&signals);
        assert_eq!(
            result.reasons,
            reasons(&[Reason::TelevisionPlatform, Reason::LowMemory, Reason::WeakGraphics])
        );
    }

    #[test]
    fn test_idempotent() {
        let classifier = CapabilityClassifier::default();
        let signals = EnvironmentSignals::new("Roku").with_memory(2.0);
        assert_eq!(classifier.classify(&signals), classifier.classify(&signals));
    }

    #[test]
    fn test_custom_config() {
        let classifier = CapabilityClassifier::new(ClassifierConfig {
            low_memory_threshold_gib: 8.0,
            tv_keywords: vec!["Kiosk".into()],
            weak_gpu_families: vec!["SwiftShader".into()],
            performance_sentinel: "lite".into(),
        });

        let signals = EnvironmentSignals::new("Mozilla/5.0 kiosk-build")
            .with_memory(6.0)
            .with_renderer("Google SwiftShader");
        let result = classifier.classify(&signals);
        assert_eq!(
            result.reasons,
            reasons(&[Reason::TelevisionPlatform, Reason::LowMemory, Reason::WeakGraphics])
        );

        let roku = classifier.classify(&EnvironmentSignals::new("Roku").with_memory(16.0));
        assert!(!roku.is_constrained);

        let lite = classifier.classify(&EnvironmentSignals::new("x").with_preference("lite"));
        assert!(lite.is_override());
        let perf = classifier.classify(&EnvironmentSignals::new("x").with_preference("performance"));
        assert!(!perf.is_constrained);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ClassifierConfig::default();
        assert!(config.validate().is_ok());

        config.low_memory_threshold_gib = f64::NAN;
        assert!(matches!(config.validate(), Err(PlugError::Config(_))));

        let blank = ClassifierConfig {
            tv_keywords: vec!["  ".into()],
            ..ClassifierConfig::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_config_from_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classifier.json");
        std::fs::write(&path, r#"{"low_memory_threshold_gib": 2.5}"#).unwrap();

        let config = ClassifierConfig::from_file(&path).unwrap();
        assert_eq!(config.low_memory_threshold_gib, 2.5);
        assert_eq!(config.tv_keywords.len(), DEFAULT_TV_KEYWORDS.len());
        assert_eq!(config.performance_sentinel, "performance");
    }
}
