//! The `classify` command: gather signals from flags or a snapshot file,
//! classify, and optionally store the ritual.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use tgplug::{
    collect_signals, CapabilityClassifier, ClassificationResult, ClassifierConfig,
    EnvironmentSignals, FilePreferenceStore, GraphicsProbe, MemoryPreferenceStore,
    PerformanceMode, PlugError, PlugResult, PreferenceStore, StaticProbe, MODE_STORAGE_KEY,
    read_stored_preference,
};

/// Signal sources for a single classification.
#[derive(Args, Debug, Clone, Default)]
pub struct ClassifyArgs {
    /// JSON file holding a full signal snapshot.
    #[arg(long, conflicts_with_all = ["user_agent", "memory", "renderer", "no_graphics"])]
    pub signals: Option<PathBuf>,

    /// User-agent string.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Reported device memory in GiB.
    #[arg(long)]
    pub memory: Option<f64>,

    /// Unmasked graphics renderer name.
    #[arg(long, conflicts_with = "no_graphics")]
    pub renderer: Option<String>,

    /// No graphics context could be created.
    #[arg(long)]
    pub no_graphics: bool,

    /// Stored ritual to assume instead of reading the preference file.
    #[arg(long, conflicts_with = "ignore_stored")]
    pub preference: Option<String>,

    /// Ignore the preference file.
    #[arg(long)]
    pub ignore_stored: bool,

    /// Store the performance ritual when the device is constrained.
    #[arg(long)]
    pub persist: bool,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

impl ClassifyArgs {
    fn graphics(&self) -> GraphicsProbe {
        match (&self.renderer, self.no_graphics) {
            (_, true) => GraphicsProbe::Unavailable,
            (Some(name), false) => GraphicsProbe::Renderer(name.clone()),
            (None, false) => GraphicsProbe::RendererHidden,
        }
    }

    fn probe<S: PreferenceStore>(&self, store: S) -> EnvironmentSignals {
        let probe = StaticProbe::new(self.user_agent.clone().unwrap_or_default(), store)
            .with_memory(self.memory)
            .with_graphics(self.graphics());
        collect_signals(&probe)
    }

    /// Build the signal snapshot these arguments describe.
    pub fn build_signals(&self, prefs: &FilePreferenceStore) -> PlugResult<EnvironmentSignals> {
        if let Some(gib) = self.memory {
            if !gib.is_finite() || gib < 0.0 {
                return Err(PlugError::InvalidInput(format!(
                    "memory must be a non-negative number of GiB, got {gib}"
                )));
            }
        }

        if let Some(path) = &self.signals {
            let raw = std::fs::read_to_string(path)?;
            let mut signals: EnvironmentSignals = serde_json::from_str(&raw)?;
            if let Some(pref) = &self.preference {
                signals.stored_preference = Some(pref.clone());
            } else if self.ignore_stored {
                signals.stored_preference = None;
            } else if signals.stored_preference.is_none() {
                signals.stored_preference = read_stored_preference(prefs);
            }
            return Ok(signals);
        }

        let signals = match &self.preference {
            Some(pref) => {
                let mut store = MemoryPreferenceStore::default();
                store.set(MODE_STORAGE_KEY, pref)?;
                self.probe(store)
            }
            None if self.ignore_stored => self.probe(MemoryPreferenceStore::default()),
            None => self.probe(prefs.clone()),
        };
        Ok(signals)
    }
}

/// What a classify run produced.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifyOutcome {
    pub signals: EnvironmentSignals,
    pub classification: ClassificationResult,
    pub persisted: bool,
}

pub fn run_classify(
    args: &ClassifyArgs,
    config: ClassifierConfig,
    prefs_path: &str,
) -> PlugResult<ClassifyOutcome> {
    let mut prefs = FilePreferenceStore::new(prefs_path);
    let signals = args.build_signals(&prefs)?;

    let mode = PerformanceMode::new(CapabilityClassifier::new(config));
    let classification = mode.classifier().classify(&signals);
    let persisted = if args.persist {
        mode.persist(&mut prefs, &classification)?
    } else {
        false
    };

    tracing::debug!(
        constrained = classification.is_constrained,
        persisted,
        "Classification finished"
    );

    Ok(ClassifyOutcome {
        signals,
        classification,
        persisted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphics_flags() {
        let mut args = ClassifyArgs::default();
        assert_eq!(args.graphics(), GraphicsProbe::RendererHidden);
        args.renderer = Some("Mali-G57".into());
        assert_eq!(args.graphics(), GraphicsProbe::Renderer("Mali-G57".into()));
        args.no_graphics = true;
        assert_eq!(args.graphics(), GraphicsProbe::Unavailable);
    }

    #[test]
    fn test_negative_memory_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let prefs = FilePreferenceStore::new(dir.path().join("prefs.json"));
        let args = ClassifyArgs {
            memory: Some(-1.0),
            ..ClassifyArgs::default()
        };
        assert!(matches!(args.build_signals(&prefs), Err(PlugError::InvalidInput(_))));
    }

    #[test]
    fn test_explicit_preference_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = FilePreferenceStore::new(dir.path().join("prefs.json"));
        prefs.set(MODE_STORAGE_KEY, "performance").unwrap();

        let args = ClassifyArgs {
            preference: Some("matrix".into()),
            ..ClassifyArgs::default()
        };
        let signals = args.build_signals(&prefs).unwrap();
        assert_eq!(signals.stored_preference.as_deref(), Some("matrix"));

        let ignoring = ClassifyArgs {
            ignore_stored: true,
            ..ClassifyArgs::default()
        };
        assert_eq!(ignoring.build_signals(&prefs).unwrap().stored_preference, None);
    }

    #[test]
    fn test_snapshot_file_picks_up_stored_ritual() {
        let dir = tempfile::tempdir().unwrap();
        let mut prefs = FilePreferenceStore::new(dir.path().join("prefs.json"));
        prefs.set(MODE_STORAGE_KEY, "performance").unwrap();

        let bare = dir.path().join("bare.json");
        std::fs::write(&bare, r#"{"user_agent": "Mozilla/5.0"}"#).unwrap();
        let args = ClassifyArgs {
            signals: Some(bare),
            ..ClassifyArgs::default()
        };
        let signals = args.build_signals(&prefs).unwrap();
        assert_eq!(signals.stored_preference.as_deref(), Some("performance"));

        let pinned = dir.path().join("pinned.json");
        std::fs::write(&pinned, r#"{"user_agent": "x", "stored_preference": "matrix"}"#).unwrap();
        let args = ClassifyArgs {
            signals: Some(pinned),
            ..ClassifyArgs::default()
        };
        let signals = args.build_signals(&prefs).unwrap();
        assert_eq!(signals.stored_preference.as_deref(), Some("matrix"));
    }
}
