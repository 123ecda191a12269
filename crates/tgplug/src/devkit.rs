//! DevKit diagnostic panel state.
//!
//! The panel owns its visibility and the last host snapshot. Rendering is
//! left to the caller, which turns [`DevKitState::rows`] into markup.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::host::{detect_host_version, HostSnapshot, HostStateReader};

/// Host version label before the first detection.
pub const DETECTING: &str = "Detecting...";

/// Shown in the mod list when nothing else is registered.
pub const NO_MODS: &str = "No external mods loaded.";

/// Panel section a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelSection {
    CoreFeatures,
    VisualEngine,
    ModBus,
}

/// Styling hint for a row value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PillStatus {
    On,
    Off,
    Warn,
    Neutral,
}

impl PillStatus {
    fn from_flag(flag: bool) -> Self {
        if flag {
            PillStatus::On
        } else {
            PillStatus::Off
        }
    }
}

/// One labelled value in the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelRow {
    pub section: PanelSection,
    pub label: String,
    pub value: String,
    pub status: PillStatus,
}

impl PanelRow {
    fn new(section: PanelSection, label: &str, value: impl Into<String>, status: PillStatus) -> Self {
        Self {
            section,
            label: label.to_string(),
            value: value.into(),
            status,
        }
    }
}

/// Owned state of the DevKit overlay.
#[derive(Debug, Clone)]
pub struct DevKitState {
    visible: bool,
    host_version: String,
    snapshot: Option<HostSnapshot>,
}

impl Default for DevKitState {
    fn default() -> Self {
        Self {
            visible: false,
            host_version: DETECTING.to_string(),
            snapshot: None,
        }
    }
}

impl DevKitState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn host_version(&self) -> &str {
        &self.host_version
    }

    pub fn snapshot(&self) -> Option<&HostSnapshot> {
        self.snapshot.as_ref()
    }

    /// Subtitle line under the panel title.
    pub fn subtitle(&self) -> String {
        format!("HOST: {}", self.host_version)
    }

    pub fn detect_version<R: HostStateReader + ?Sized>(&mut self, reader: &R) {
        self.host_version = detect_host_version(reader);
    }

    /// Show or hide the panel. Opening re-detects the host and refreshes.
    pub fn toggle<R: HostStateReader + ?Sized>(&mut self, reader: &R, now: DateTime<Utc>) -> bool {
        if self.visible {
            self.visible = false;
        } else {
            self.detect_version(reader);
            self.visible = true;
            self.refresh(reader, now);
        }
        self.visible
    }

    pub fn refresh<R: HostStateReader + ?Sized>(&mut self, reader: &R, now: DateTime<Utc>) -> &HostSnapshot {
        let snapshot = HostSnapshot::capture(reader, &self.host_version, now);
        tracing::trace!(ritual = %snapshot.ritual, mods = snapshot.mods.len(), "DevKit refreshed");
        self.snapshot.insert(snapshot)
    }

    /// Hook for host change notifications and periodic polling. Hidden
    /// panels are not refreshed.
    pub fn refresh_if_visible<R: HostStateReader + ?Sized>(&mut self, reader: &R, now: DateTime<Utc>) -> bool {
        if !self.visible {
            return false;
        }
        self.refresh(reader, now);
        true
    }

    /// Panel rows for the last snapshot. Empty before the first refresh.
    pub fn rows(&self) -> Vec<PanelRow> {
        let Some(snap) = &self.snapshot else {
            return Vec::new();
        };

        let barrier = if snap.data_barrier { "ACTIVE" } else { "DISABLED" };
        let night = if snap.night_mode { "ON" } else { "OFF" };

        let mut rows = vec![
            PanelRow::new(
                PanelSection::CoreFeatures,
                "Anti-Cookie Barrier",
                barrier,
                PillStatus::from_flag(snap.data_barrier),
            ),
            PanelRow::new(
                PanelSection::CoreFeatures,
                "Sandbox Level",
                snap.sandbox_level.as_str(),
                PillStatus::Neutral,
            ),
            PanelRow::new(
                PanelSection::CoreFeatures,
                "Active Thread",
                snap.display_url(),
                PillStatus::Neutral,
            ),
            PanelRow::new(
                PanelSection::VisualEngine,
                "TGRitual Engine",
                snap.ritual.as_str(),
                PillStatus::Warn,
            ),
            PanelRow::new(
                PanelSection::VisualEngine,
                "Dark AMOLED",
                night,
                PillStatus::from_flag(snap.night_mode),
            ),
            PanelRow::new(
                PanelSection::VisualEngine,
                "TGChroma Hex",
                snap.chroma.as_str(),
                PillStatus::Neutral,
            ),
        ];

        if snap.mods.is_empty() {
            rows.push(PanelRow::new(PanelSection::ModBus, "Mods", NO_MODS, PillStatus::Neutral));
        } else {
            rows.extend(
                snap.mods
                    .iter()
                    .map(|m| PanelRow::new(PanelSection::ModBus, "Mod", m.as_str(), PillStatus::Neutral)),
            );
        }
        rows
    }

    /// Number of registered mods in the last snapshot.
    pub fn mod_count(&self) -> usize {
        self.snapshot.as_ref().map_or(0, |s| s.mods.len())
    }
}
