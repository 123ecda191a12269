//! Configuration loading and resolution.

use std::path::PathBuf;

use tgplug::{ClassifierConfig, PlugResult};

/// Resolve the preference file path.
pub fn resolve_prefs_path(explicit: Option<&str>) -> String {
    if let Some(path) = explicit {
        return path.to_string();
    }

    if let Ok(env_path) = std::env::var("TGPLUG_PREFS") {
        return env_path;
    }

    let cwd_prefs = PathBuf::from(".tgplug/prefs.json");
    if cwd_prefs.exists() {
        return cwd_prefs.display().to_string();
    }

    format!("{}/.tgplug/prefs.json", home_dir())
}

/// Load classifier heuristics. Falls back to the built-in defaults when no
/// config file is named or found.
pub fn load_classifier_config(explicit: Option<&str>) -> PlugResult<ClassifierConfig> {
    let path = match explicit {
        Some(path) => Some(PathBuf::from(path)),
        None => std::env::var("TGPLUG_CONFIG")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                let cwd_config = PathBuf::from(".tgplug/classifier.json");
                cwd_config.exists().then_some(cwd_config)
            }),
    };

    match path {
        Some(path) => {
            tracing::info!("Classifier config: {}", path.display());
            ClassifierConfig::from_file(&path)
        }
        None => Ok(ClassifierConfig::default()),
    }
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string())
}
