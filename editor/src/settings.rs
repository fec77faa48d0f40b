//! Editor settings management
//!
//! This module provides persistent settings storage for the editor:
//! default selection mode, gizmo configuration and geometry editing.

use crate::error::EditorResult;
use crate::geometry_edit::{EditColors, FeatureKind};
use crate::selection::SelectionMode;
use crate::transform::{CoordinateSpace, GizmoMode, GizmoOptions, TransformControlsPosition};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Main editor settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    #[serde(default)]
    pub selection: SelectionSettings,

    #[serde(default)]
    pub transform: TransformSettings,

    #[serde(default)]
    pub geometry: GeometrySettings,

    /// Settings version for future migration support
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// Mode applied to clicks until the toolbar changes it
    #[serde(default)]
    pub default_mode: SelectionMode,
}

/// Gizmo configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransformSettings {
    #[serde(default)]
    pub position: TransformControlsPosition,
    #[serde(default)]
    pub space: CoordinateSpace,
    #[serde(default)]
    pub mode: GizmoMode,
}

impl TransformSettings {
    pub fn gizmo_options(&self) -> GizmoOptions {
        GizmoOptions {
            position: self.position,
            space: self.space,
            mode: self.mode,
        }
    }
}

/// Geometry editing configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometrySettings {
    /// Mount proxies on selected meshes
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub feature: FeatureKind,
    #[serde(default)]
    pub colors: EditColors,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            selection: SelectionSettings::default(),
            transform: TransformSettings::default(),
            geometry: GeometrySettings::default(),
            version: 1,
        }
    }
}

impl EditorSettings {
    /// Get the default path for the settings file
    pub fn default_path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("editor_settings.json")
    }

    /// Save settings to the default location
    pub fn save(&self) -> EditorResult<()> {
        self.save_to(Self::default_path())
    }

    /// Load settings from the default location
    ///
    /// A missing or unreadable file yields the defaults.
    pub fn load() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings file: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Save settings to a specific path
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> EditorResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!("Saved editor settings to {:?}", path.as_ref());
        Ok(())
    }

    /// Load settings from a specific path
    pub fn load_from<P: AsRef<Path>>(path: P) -> EditorResult<Self> {
        let content = std::fs::read_to_string(&path)?;
        let settings = serde_json::from_str(&content)?;
        info!("Loaded editor settings from {:?}", path.as_ref());
        Ok(settings)
    }
}
