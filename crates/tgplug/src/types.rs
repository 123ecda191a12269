//! Core data types for environment signals and classification results.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Immutable snapshot of the environment signals the classifier reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSignals {
    pub user_agent: String,
    #[serde(default)]
    pub device_memory_gib: Option<f64>,
    #[serde(default)]
    pub graphics: GraphicsProbe,
    #[serde(default)]
    pub stored_preference: Option<String>,
}

impl EnvironmentSignals {
    /// Signals for a user agent with every optional probe absent.
    ///
    /// Graphics defaults to [`GraphicsProbe::RendererHidden`], the neutral state.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            device_memory_gib: None,
            graphics: GraphicsProbe::RendererHidden,
            stored_preference: None,
        }
    }

    pub fn with_memory(mut self, gib: f64) -> Self {
        self.device_memory_gib = Some(gib);
        self
    }

    pub fn with_graphics(mut self, graphics: GraphicsProbe) -> Self {
        self.graphics = graphics;
        self
    }

    pub fn with_renderer(self, name: impl Into<String>) -> Self {
        self.with_graphics(GraphicsProbe::Renderer(name.into()))
    }

    pub fn with_preference(mut self, value: impl Into<String>) -> Self {
        self.stored_preference = Some(value.into());
        self
    }
}

/// What a graphics probe was able to learn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "name", rename_all = "snake_case")]
pub enum GraphicsProbe {
    /// No rendering context could be created.
    Unavailable,
    /// A context exists but the renderer-identification extension does not.
    #[default]
    RendererHidden,
    /// The unmasked renderer string.
    Renderer(String),
}

/// A signal that independently justified a constrained verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    PreferenceOverride,
    TelevisionPlatform,
    LowMemory,
    WeakGraphics,
}

impl Reason {
    pub fn label(&self) -> &'static str {
        match self {
            Reason::PreferenceOverride => "stored preference",
            Reason::TelevisionPlatform => "television platform",
            Reason::LowMemory => "low memory",
            Reason::WeakGraphics => "weak graphics",
        }
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict plus the reasons behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_constrained: bool,
    pub reasons: BTreeSet<Reason>,
}

impl ClassificationResult {
    pub(crate) fn preference_override() -> Self {
        Self {
            is_constrained: true,
            reasons: BTreeSet::from([Reason::PreferenceOverride]),
        }
    }

    pub(crate) fn from_reasons(reasons: BTreeSet<Reason>) -> Self {
        Self {
            is_constrained: !reasons.is_empty(),
            reasons,
        }
    }

    /// True when the verdict came from the stored preference rather than detection.
    pub fn is_override(&self) -> bool {
        self.reasons.contains(&Reason::PreferenceOverride)
    }

    /// Human-readable summary.
    pub fn summary(&self) -> String {
        if !self.is_constrained {
            return "capable device".to_string();
        }
        let reasons: Vec<&str> = self.reasons.iter().map(Reason::label).collect();
        format!("constrained device ({})", reasons.join(", "))
    }
}

/// Errors that can occur in the plug library.
#[derive(thiserror::Error, Debug)]
pub enum PlugError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Host not ready after {attempts} attempts")]
    HostUnavailable { attempts: u32 },

    #[error("Registration rejected for {0}")]
    RegistrationRejected(String),

    #[error("Selector error: {0}")]
    Selector(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type.
pub type PlugResult<T> = Result<T, PlugError>;
