use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use strum::EnumIter;

use crate::model::metrics::DeviceMetrics;

/// Upper bound for `resize.max_span`; larger folders stop being useful as folders.
const MAX_CONFIGURABLE_SPAN: u32 = 8;

pub fn data_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir).join(".foldergrid")
}
pub fn state_file() -> PathBuf { data_dir().join("layout.ron") }
pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| data_dir().join("config"))
        .join("foldergrid")
        .join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub device: DeviceMetrics,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub resize: ResizeSettings,
    #[serde(default)]
    pub animation: AnimationSettings,
    #[serde(default)]
    pub expanded: ExpandedSettings,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct ResizeSettings {
    /// Fraction of a cell the averaged drag must exceed before the span steps.
    #[serde(default = "default_resize_threshold")]
    pub threshold: f64,
    #[serde(default = "default_max_span")]
    pub max_span: u32,
    /// Padding between the folder bounds and the resize frame. Corner touch
    /// targets are twice this wide.
    #[serde(default = "default_background_padding")]
    pub background_padding: f64,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "snap_duration_ms", default = "default_snap_duration")]
    pub snap_duration: Duration,
    #[serde(default)]
    pub dimmed_handle_alpha: f64,
}

impl Default for ResizeSettings {
    fn default() -> Self {
        Self {
            threshold: default_resize_threshold(),
            max_span: default_max_span(),
            background_padding: default_background_padding(),
            snap_duration: default_snap_duration(),
            dimmed_handle_alpha: 0.0,
        }
    }
}

impl ResizeSettings {
    pub fn touch_target_width(&self) -> f64 { 2.0 * self.background_padding }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            issues.push(format!(
                "resize.threshold must be between 0 and 1 (exclusive), got {}",
                self.threshold
            ));
        }
        if self.max_span == 0 || self.max_span > MAX_CONFIGURABLE_SPAN {
            issues.push(format!(
                "resize.max_span must be between 1 and {}, got {}",
                MAX_CONFIGURABLE_SPAN, self.max_span
            ));
        }
        if self.background_padding < 0.0 {
            issues.push(format!(
                "resize.background_padding must be non-negative, got {}",
                self.background_padding
            ));
        }
        if !(0.0..=1.0).contains(&self.dimmed_handle_alpha) {
            issues.push(format!(
                "resize.dimmed_handle_alpha must be within 0..=1, got {}",
                self.dimmed_handle_alpha
            ));
        }

        issues
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct AnimationSettings {
    #[serde(default = "yes")]
    pub animate: bool,
    #[serde(default = "default_animation_fps")]
    pub fps: f64,
    #[serde(default)]
    pub easing: AnimationEasing,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            animate: true,
            fps: default_animation_fps(),
            easing: AnimationEasing::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct ExpandedSettings {
    /// Size of the open-folder indicator relative to its cell.
    #[serde(default = "default_open_indicator_ratio")]
    pub open_indicator_ratio: f64,
}

impl Default for ExpandedSettings {
    fn default() -> Self {
        Self {
            open_indicator_ratio: default_open_indicator_ratio(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default, Copy, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum AnimationEasing {
    #[default]
    EaseInOut,
    Linear,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.resize.validate());

        if self.animation.fps <= 0.0 {
            issues.push(format!(
                "animation.fps must be positive, got {}",
                self.animation.fps
            ));
        }

        let ratio = self.expanded.open_indicator_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            issues.push(format!(
                "expanded.open_indicator_ratio must be within (0, 1], got {ratio}"
            ));
        }

        issues
    }
}

fn yes() -> bool { true }

fn default_resize_threshold() -> f64 { 0.66 }

fn default_max_span() -> u32 { 3 }

fn default_background_padding() -> f64 { 12.0 }

fn default_snap_duration() -> Duration { Duration::from_millis(150) }

fn default_animation_fps() -> f64 { 100.0 }

fn default_open_indicator_ratio() -> f64 { 0.3 }

const DEFAULT_CONFIG: &str = include_str!("../../foldergrid.default.toml");

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&buf)
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = toml::from_str(buf)?;
        let issues = config.validate();
        if !issues.is_empty() {
            bail!("invalid config:\n  {}", issues.join("\n  "));
        }
        Ok(config)
    }

    /// Reads `path` when it exists, otherwise falls back to the built-in defaults.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() {
            Self::read(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.settings.validate());

        for issue in self.device.validate() {
            issues.push(format!("device: {issue}"));
        }

        issues
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse(DEFAULT_CONFIG).expect("built-in default config must parse")
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn default_config_matches_builtin_values() {
        let config = Config::default();
        assert!(config.validate().is_empty());
        assert_eq!(config.settings.resize.threshold, 0.66);
        assert_eq!(config.settings.resize.max_span, 3);
        assert_eq!(config.settings.resize.snap_duration, Duration::from_millis(150));
        assert_eq!(config.settings.resize.touch_target_width(), 24.0);
        assert_eq!(config.settings.expanded.open_indicator_ratio, 0.3);
        assert_eq!(config.device, DeviceMetrics::default());
    }

    #[test]
    fn empty_document_uses_field_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.settings, Settings::default());
    }

    #[test]
    fn parses_overrides() {
        let config = Config::parse(
            r#"
            [settings.resize]
            threshold = 0.5
            max_span = 4
            snap_duration_ms = 90

            [settings.animation]
            easing = "ease_out_cubic"

            [device]
            cell_width = 80
            cell_height = 90
            icon_size = 48
            grid_cols = 5
            grid_rows = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.settings.resize.threshold, 0.5);
        assert_eq!(config.settings.resize.max_span, 4);
        assert_eq!(config.settings.resize.snap_duration, Duration::from_millis(90));
        assert_eq!(config.settings.animation.easing, AnimationEasing::EaseOutCubic);
        assert_eq!(config.device.border_space, 0);
        assert_eq!(config.device.grid_cols, 5);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(Config::parse("[settings.resize]\nthresh = 0.5\n").is_err());
    }

    #[test]
    fn reports_invalid_values() {
        let mut config = Config::default();
        config.settings.resize.threshold = 1.5;
        config.settings.resize.max_span = 0;
        config.settings.animation.fps = 0.0;
        config.device.icon_size = 0;
        let issues = config.validate();
        assert_eq!(issues.len(), 4, "{issues:?}");
        assert!(issues.iter().any(|i| i.starts_with("device: ")));
        assert!(Config::parse("[settings.resize]\nmax_span = 99\n").is_err());
    }

    #[test]
    fn save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.settings.resize.background_padding = 20.0;
        config.save(&path).unwrap();

        let loaded = Config::read(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::read_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
