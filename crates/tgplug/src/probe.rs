//! Platform probes that feed the classifier.
//!
//! Each probe is read-only. A probe that cannot produce its value degrades
//! to the documented default instead of failing the snapshot.

use crate::preference::{PreferenceStore, MODE_STORAGE_KEY};
use crate::types::{EnvironmentSignals, GraphicsProbe};

/// Failure to obtain a platform signal.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Graphics context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("Renderer query failed: {0}")]
    Query(String),
}

/// A short-lived rendering context.
pub trait GraphicsContext {
    /// The unmasked renderer string, or `None` when the identification
    /// extension is missing.
    fn renderer_name(&self) -> Result<Option<String>, ProbeError>;
}

/// Something that can create throwaway rendering contexts.
pub trait GraphicsBackend {
    type Context: GraphicsContext;

    fn create_context(&self) -> Result<Self::Context, ProbeError>;
}

/// Acquire a context, read the renderer, release the context.
pub fn probe_graphics<B: GraphicsBackend>(backend: &B) -> GraphicsProbe {
    let context = match backend.create_context() {
        Ok(context) => context,
        Err(e) => {
            tracing::debug!("No graphics context: {e}");
            return GraphicsProbe::Unavailable;
        }
    };

    let probe = match context.renderer_name() {
        Ok(Some(name)) => GraphicsProbe::Renderer(name),
        Ok(None) => GraphicsProbe::RendererHidden,
        Err(e) => {
            tracing::debug!("Renderer query failed: {e}");
            GraphicsProbe::Unavailable
        }
    };
    drop(context);
    probe
}

/// Access to the platform signals and the preference store behind them.
pub trait SignalProbe {
    type Graphics: GraphicsBackend;

    fn user_agent(&self) -> String;

    fn device_memory_gib(&self) -> Option<f64>;

    fn graphics_backend(&self) -> &Self::Graphics;

    fn preferences(&self) -> &dyn PreferenceStore;

    fn preferences_mut(&mut self) -> &mut dyn PreferenceStore;
}

/// Stored ritual, or `None` when the store cannot be read.
pub fn read_stored_preference<S: PreferenceStore + ?Sized>(store: &S) -> Option<String> {
    match store.get(MODE_STORAGE_KEY) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Ignoring unreadable stored preference: {e}");
            None
        }
    }
}

/// Take one snapshot of every signal.
pub fn collect_signals<P: SignalProbe>(probe: &P) -> EnvironmentSignals {
    let stored_preference = read_stored_preference(probe.preferences());

    EnvironmentSignals {
        user_agent: probe.user_agent(),
        device_memory_gib: probe.device_memory_gib().filter(|gib| gib.is_finite()),
        graphics: probe_graphics(probe.graphics_backend()),
        stored_preference,
    }
}

/// Graphics backend that replays a fixed probe result.
#[derive(Debug, Clone, Default)]
pub struct FixedGraphics(pub GraphicsProbe);

/// Context handed out by [`FixedGraphics`].
#[derive(Debug)]
pub struct FixedContext(Option<String>);

impl GraphicsContext for FixedContext {
    fn renderer_name(&self) -> Result<Option<String>, ProbeError> {
        Ok(self.0.clone())
    }
}

impl GraphicsBackend for FixedGraphics {
    type Context = FixedContext;

    fn create_context(&self) -> Result<FixedContext, ProbeError> {
        match &self.0 {
            GraphicsProbe::Unavailable => Err(ProbeError::ContextUnavailable(
                "no accelerated context".into(),
            )),
            GraphicsProbe::RendererHidden => Ok(FixedContext(None)),
            GraphicsProbe::Renderer(name) => Ok(FixedContext(Some(name.clone()))),
        }
    }
}

/// Probe with values supplied up front, e.g. from command-line flags.
pub struct StaticProbe<S> {
    pub user_agent: String,
    pub device_memory_gib: Option<f64>,
    pub graphics: FixedGraphics,
    pub store: S,
}

impl<S: PreferenceStore> StaticProbe<S> {
    pub fn new(user_agent: impl Into<String>, store: S) -> Self {
        Self {
            user_agent: user_agent.into(),
            device_memory_gib: None,
            graphics: FixedGraphics::default(),
            store,
        }
    }

    pub fn with_memory(mut self, gib: Option<f64>) -> Self {
        self.device_memory_gib = gib;
        self
    }

    pub fn with_graphics(mut self, graphics: GraphicsProbe) -> Self {
        self.graphics = FixedGraphics(graphics);
        self
    }
}

impl<S: PreferenceStore> SignalProbe for StaticProbe<S> {
    type Graphics = FixedGraphics;

    fn user_agent(&self) -> String {
        self.user_agent.clone()
    }

    fn device_memory_gib(&self) -> Option<f64> {
        self.device_memory_gib
    }

    fn graphics_backend(&self) -> &FixedGraphics {
        &self.graphics
    }

    fn preferences(&self) -> &dyn PreferenceStore {
        &self.store
    }

    fn preferences_mut(&mut self) -> &mut dyn PreferenceStore {
        &mut self.store
    }
}
