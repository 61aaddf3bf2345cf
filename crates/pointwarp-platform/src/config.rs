//! Configuration loaded from TOML.

use std::path::{Path, PathBuf};

use pointwarp_types::Color;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::BackendKind;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub wayland: WaylandConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// Backend selection and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            log_level: default_log_level(),
        }
    }
}

/// XKB rule names used to build the Wayland keycode table. Empty strings
/// select the system defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaylandConfig {
    #[serde(default)]
    pub layout: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub variant: String,
    #[serde(default)]
    pub options: Option<String>,
}

/// Drawing colors as hex strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    #[serde(default = "default_box_color")]
    pub box_color: String,
    #[serde(default = "default_hint_bgcolor")]
    pub hint_bgcolor: String,
    #[serde(default = "default_hint_fgcolor")]
    pub hint_fgcolor: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            box_color: default_box_color(),
            hint_bgcolor: default_hint_bgcolor(),
            hint_fgcolor: default_hint_fgcolor(),
        }
    }
}

impl StyleConfig {
    pub fn box_color(&self) -> Result<Color, ConfigError> {
        parse_color("box_color", &self.box_color)
    }

    pub fn hint_bgcolor(&self) -> Result<Color, ConfigError> {
        parse_color("hint_bgcolor", &self.hint_bgcolor)
    }

    pub fn hint_fgcolor(&self) -> Result<Color, ConfigError> {
        parse_color("hint_fgcolor", &self.hint_fgcolor)
    }
}

/// File monitor cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Config {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "no config file found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(path, &content)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        // Colors are validated at load time.
        config.style.box_color()?;
        config.style.hint_bgcolor()?;
        config.style.hint_fgcolor()?;
        Ok(config)
    }
}

/// Default config directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("pointwarp")
}

/// Default config file path.
pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

fn parse_color(field: &'static str, value: &str) -> Result<Color, ConfigError> {
    Color::parse(value).map_err(|source| ConfigError::Color { field, source })
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_box_color() -> String {
    "#ff4500".to_string()
}

fn default_hint_bgcolor() -> String {
    "#00ff00".to_string()
}

fn default_hint_fgcolor() -> String {
    "#000000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("backend = \"auto\""));
        assert!(toml_str.contains("poll_interval_ms = 1000"));
    }

    #[test]
    fn parse_example_config() {
        let toml_str = r##"
[platform]
backend = "wayland"
log_level = "debug"

[wayland]
layout = "de"
variant = "nodeadkeys"

[style]
box_color = "#112233"
hint_bgcolor = "#ffff00cc"

[monitor]
poll_interval_ms = 250
"##;
        let config = Config::parse(Path::new("test.toml"), toml_str).unwrap();
        assert_eq!(config.platform.backend, BackendKind::Wayland);
        assert_eq!(config.platform.log_level, "debug");
        assert_eq!(config.wayland.layout, "de");
        assert_eq!(config.wayland.options, None);
        assert_eq!(config.monitor.poll_interval_ms, 250);
        let bg = config.style.hint_bgcolor().unwrap();
        assert_eq!((bg.r, bg.g, bg.b, bg.a), (0xff, 0xff, 0x00, 0xcc));
        assert_eq!(config.style.hint_fgcolor().unwrap().rgb24(), 0);
    }

    #[test]
    fn bad_color_is_reported_with_field() {
        let err =
            Config::parse(Path::new("test.toml"), "[style]\nbox_color = \"red\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Color { field: "box_color", .. }));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.platform.backend, BackendKind::Auto);
        assert_eq!(config.platform.log_level, "info");
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[platform\n").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
