//! tgplug — core library for TGBrowser plugs: device capability detection,
//! host state snapshots, and performance mode.

pub mod bootstrap;
pub mod classifier;
pub mod devkit;
pub mod host;
pub mod mode;
pub mod preference;
pub mod probe;
pub mod types;

pub use bootstrap::{await_host_ready, register_plug, ModBus, PlugManifest, RetryPolicy};
pub use classifier::{classify, CapabilityClassifier, ClassifierConfig};
pub use devkit::{DevKitState, PanelRow, PanelSection, PillStatus};
pub use host::{detect_host_version, FrameInfo, HostSnapshot, HostStateReader};
pub use mode::{ModeOutcome, ModeSelector, PerformanceMode, StartupReport};
pub use preference::{
    FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, MODE_STORAGE_KEY,
    PERFORMANCE_MODE,
};
pub use probe::{
    collect_signals, probe_graphics, read_stored_preference, FixedGraphics, GraphicsBackend,
    GraphicsContext, ProbeError, SignalProbe, StaticProbe,
};
pub use types::*;
