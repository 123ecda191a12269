//! Host state scraping behind a narrow reader trait.
//!
//! The host's markup is undocumented and changes between builds, so every
//! lookup goes through [`HostStateReader`]. Snapshot derivation (defaults,
//! label normalisation) lives here and is tested against fake readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback when neither the menu header nor the title names the build.
pub const UNKNOWN_HOST_VERSION: &str = "Unknown TGBrowser Build";

/// Ritual shown when the body carries no `ritual-*` class.
pub const DEFAULT_RITUAL: &str = "Default (MD2)";

/// Shown when no page is loaded in the browser frame.
pub const IDLE_URL: &str = "TGHome (Idle)";

const RITUAL_PREFIX: &str = "ritual-";
const NIGHT_MODE_CLASS: &str = "dark-mode";
const CHROMA_VARIABLE: &str = "--primary";

/// The host's content frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInfo {
    pub src: String,
    pub sandbox: Option<String>,
}

/// Read-only view of host state.
pub trait HostStateReader {
    /// Text of the labels in the host menu header.
    fn header_labels(&self) -> Vec<String>;

    fn document_title(&self) -> Option<String>;

    fn body_classes(&self) -> Vec<String>;

    /// Checked state of the data-barrier toggle, `None` if the toggle is absent.
    fn data_barrier_checked(&self) -> Option<bool>;

    /// Computed value of a CSS custom property on the root element.
    fn css_variable(&self, name: &str) -> Option<String>;

    fn browser_frame(&self) -> Option<FrameInfo>;

    /// Mod ids registered on the host bus.
    fn registered_plugs(&self) -> Vec<String>;
}

/// Identify the host build. The last header label mentioning both `v` and
/// `Beta` wins, then the document title.
pub fn detect_host_version<R: HostStateReader + ?Sized>(reader: &R) -> String {
    let from_header = reader
        .header_labels()
        .into_iter()
        .rev()
        .find(|label| label.contains('v') && label.contains("Beta"))
        .map(|label| label.trim().to_string());

    let version = from_header
        .or_else(|| reader.document_title().filter(|t| !t.trim().is_empty()))
        .unwrap_or_else(|| UNKNOWN_HOST_VERSION.to_string());

    tracing::debug!("Identified host: {version}");
    version
}

/// One reading of the host's feature state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSnapshot {
    pub host_version: String,
    pub ritual: String,
    pub data_barrier: bool,
    pub sandbox_level: String,
    pub night_mode: bool,
    pub chroma: String,
    pub url: String,
    pub sandbox: String,
    pub mods: Vec<String>,
    pub captured_at: DateTime<Utc>,
}

impl HostSnapshot {
    pub fn capture<R: HostStateReader + ?Sized>(reader: &R, host_version: &str, now: DateTime<Utc>) -> Self {
        let classes = reader.body_classes();
        let ritual = classes
            .iter()
            .find(|c| c.starts_with(RITUAL_PREFIX))
            .map(String::as_str)
            .unwrap_or(DEFAULT_RITUAL)
            .replacen(RITUAL_PREFIX, "", 1)
            .to_uppercase();
        let night_mode = classes.iter().any(|c| c == NIGHT_MODE_CLASS);

        let data_barrier = reader.data_barrier_checked().unwrap_or(false);
        let chroma = reader
            .css_variable(CHROMA_VARIABLE)
            .map(|v| v.trim().to_string())
            .unwrap_or_default();

        let frame = reader.browser_frame();
        let url = frame
            .as_ref()
            .map(|f| f.src.clone())
            .unwrap_or_else(|| IDLE_URL.to_string());
        let sandbox = match &frame {
            Some(f) => f.sandbox.clone().unwrap_or_default(),
            None => "N/A".to_string(),
        };

        Self {
            host_version: host_version.to_string(),
            ritual,
            data_barrier,
            sandbox_level: if data_barrier { "STRICT" } else { "STANDARD" }.to_string(),
            night_mode,
            chroma,
            url,
            sandbox,
            mods: reader.registered_plugs(),
            captured_at: now,
        }
    }

    /// URL without the https scheme, for compact display.
    pub fn display_url(&self) -> &str {
        self.url.strip_prefix("https://").unwrap_or(&self.url)
    }
}
