//! User settings persisted between sessions: label composition for shapes
//! and the last-used marker radius. Stored as pretty JSON in the OS config
//! directory; load/save failures are never fatal.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::io::Unit;

/// Unit fields that can appear in a shape label, in display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelField {
    Block,
    Typology,
    Code,
}

impl LabelField {
    pub fn label(&self) -> &'static str {
        match self {
            LabelField::Block => "Block",
            LabelField::Typology => "Typology",
            LabelField::Code => "Number",
        }
    }

    pub fn all() -> &'static [LabelField] {
        &[LabelField::Block, LabelField::Typology, LabelField::Code]
    }

    fn value(&self, unit: &Unit) -> String {
        match self {
            LabelField::Block => unit.block.clone(),
            LabelField::Typology => unit.typology.clone(),
            LabelField::Code => unit.code.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub label_fields: Vec<LabelField>,
    pub show_labels: bool,
    pub last_marker_radius: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            label_fields: vec![LabelField::Block, LabelField::Code],
            show_labels: true,
            last_marker_radius: crate::item::DEFAULT_MARKER_RADIUS,
        }
    }
}

impl AppSettings {
    /// Compose the label for a linked unit from the configured field list.
    pub fn unit_label(&self, unit: &Unit) -> String {
        let parts: Vec<String> = self
            .label_fields
            .iter()
            .map(|field| field.value(unit))
            .filter(|part| !part.is_empty())
            .collect();
        parts.join(" ")
    }

    fn file_path() -> Option<PathBuf> {
        let base = config_dir()?;
        let dir = base.join("PlanFE");
        std::fs::create_dir_all(&dir).ok()?;
        Some(dir.join("settings.json"))
    }

    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), String> {
        let path = Self::file_path().ok_or("cannot resolve settings path")?;
        let raw = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        std::fs::write(path, raw).map_err(|e| e.to_string())
    }
}

/// Platform config directory (without the app sub-folder).
fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Some(PathBuf::from(appdata));
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support"),
            );
        }
    }
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::test_support::unit;

    #[test]
    fn label_follows_configured_field_order() {
        let mut u = unit("u1", "101", "T1", Some(1));
        u.typology = "3BR".to_string();

        let mut settings = AppSettings::default();
        settings.label_fields = vec![LabelField::Code, LabelField::Typology, LabelField::Block];
        assert_eq!(settings.unit_label(&u), "101 3BR T1");

        settings.label_fields = vec![LabelField::Block];
        assert_eq!(settings.unit_label(&u), "T1");
    }

    #[test]
    fn empty_fields_are_skipped() {
        let mut u = unit("u1", "101", "", Some(1));
        u.typology = String::new();
        let settings = AppSettings {
            label_fields: vec![LabelField::Block, LabelField::Typology, LabelField::Code],
            ..Default::default()
        };
        assert_eq!(settings.unit_label(&u), "101");
    }
}
