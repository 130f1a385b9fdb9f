//! Run configuration, stored as pretty JSON next to the executable's
//! working directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::params::{RuleParams, RulePreset};
use crate::seed::SeedPattern;

pub const SETTINGS_FILE_NAME: &str = "smoothlife_settings.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub preset: RulePreset,
    /// Overrides `preset` when set.
    pub custom_rule: Option<RuleParams>,
    pub seed: SeedPattern,
    pub ticks_per_frame: u32,
    pub window_width: u32,
    pub window_height: u32,
    pub vsync: bool,
    pub screenshot_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preset: RulePreset::Compact,
            custom_rule: None,
            seed: SeedPattern::TwoDisks,
            ticks_per_frame: 1,
            window_width: 800,
            window_height: 600,
            vsync: true,
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }
}

impl Settings {
    pub fn default_path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(SETTINGS_FILE_NAME)
    }

    pub fn load_from_disk(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut settings: Settings = serde_json::from_str(&data)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn save_to_disk(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads `path`, or writes the defaults there when it does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from_disk(path);
        }
        let settings = Self::default();
        settings.save_to_disk(path)?;
        log::info!("Wrote default settings to {}", path.display());
        Ok(settings)
    }

    pub fn sanitize(&mut self) {
        self.ticks_per_frame = self.ticks_per_frame.clamp(1, 64);
        self.window_width = self.window_width.clamp(16, 8192);
        self.window_height = self.window_height.clamp(16, 8192);
        if let SeedPattern::Noise { density, .. } = &mut self.seed {
            *density = if density.is_finite() {
                density.clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        if let Some(rule) = &self.custom_rule {
            if let Err(err) = rule.validate() {
                log::warn!("Ignoring custom rule: {}", err);
                self.custom_rule = None;
            }
        }
    }

    /// Rule constants in effect for this run.
    pub fn rule(&self) -> RuleParams {
        self.custom_rule.unwrap_or_else(|| self.preset.params())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("smoothlife-settings-{}-{}", std::process::id(), name))
            .join(SETTINGS_FILE_NAME)
    }

    #[test]
    fn save_then_load_preserves_fields() {
        let path = scratch_path("roundtrip");
        let settings = Settings {
            preset: RulePreset::Wide,
            seed: SeedPattern::Noise {
                density: 0.25,
                seed: 99,
            },
            ticks_per_frame: 3,
            ..Settings::default()
        };
        settings.save_to_disk(&path).unwrap();
        let loaded = Settings::load_from_disk(&path).unwrap();
        assert_eq!(loaded, settings);
        assert_eq!(loaded.rule(), RulePreset::Wide.params());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "preset": "Wide" }"#).unwrap();
        assert_eq!(settings.preset, RulePreset::Wide);
        assert_eq!(settings.ticks_per_frame, 1);
        assert_eq!(settings.seed, SeedPattern::TwoDisks);
    }

    #[test]
    fn load_or_create_writes_defaults() {
        let path = scratch_path("create");
        let _ = fs::remove_file(&path);
        let settings = Settings::load_or_create(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn sanitize_clamps_and_drops_bad_rules() {
        let mut settings = Settings {
            ticks_per_frame: 0,
            window_width: 1,
            seed: SeedPattern::Noise {
                density: 3.0,
                seed: 1,
            },
            custom_rule: Some(RuleParams {
                inner_radius: 9.0,
                ..RuleParams::default()
            }),
            ..Settings::default()
        };
        settings.sanitize();
        assert_eq!(settings.ticks_per_frame, 1);
        assert_eq!(settings.window_width, 16);
        assert_eq!(
            settings.seed,
            SeedPattern::Noise {
                density: 1.0,
                seed: 1
            }
        );
        assert!(settings.custom_rule.is_none());
        assert_eq!(settings.rule(), RulePreset::Compact.params());
    }

    #[test]
    fn sanitize_drops_rule_with_oversized_outer_radius() {
        let mut settings: Settings = serde_json::from_str(
            r#"{
                "preset": "Wide",
                "custom_rule": {
                    "inner_radius": 1.0,
                    "outer_radius": 40000.0,
                    "birth_lo": 0.23,
                    "birth_hi": 0.336,
                    "death_lo": 0.477,
                    "death_hi": 0.5
                }
            }"#,
        )
        .unwrap();
        assert!(settings.custom_rule.is_some());
        settings.sanitize();
        assert!(settings.custom_rule.is_none());
        assert_eq!(settings.rule(), RulePreset::Wide.params());
    }

    #[test]
    fn custom_rule_overrides_preset() {
        let custom = RuleParams {
            birth_lo: 0.2,
            ..RulePreset::Wide.params()
        };
        let settings = Settings {
            custom_rule: Some(custom),
            ..Settings::default()
        };
        assert_eq!(settings.rule(), custom);
    }
}
