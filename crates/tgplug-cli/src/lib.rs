//! tgplug command line front end: device classification, stored ritual
//! management, and an interactive REPL.

pub mod classify;
pub mod config;
pub mod render;
pub mod repl;

pub use classify::{run_classify, ClassifyArgs, ClassifyOutcome};
pub use config::{load_classifier_config, resolve_prefs_path};
