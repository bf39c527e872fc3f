use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub showcase: ShowcaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Sequencer-level defaults shared by every step of a showcase run.
///
/// Per-controller overrides (see [`crate::ControllerConfig`]) take precedence
/// where a controller sets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowcaseConfig {
    /// Master switch; when false, starting a run does nothing
    #[serde(default = "default_true")]
    pub enable_showcase: bool,
    /// Advance automatically after `auto_play_delay_ms`
    #[serde(default)]
    pub auto_play: bool,
    /// Auto-play delay in milliseconds
    #[serde(default = "default_auto_play_delay")]
    pub auto_play_delay_ms: u64,
    /// Ignore unforced `next()` calls while auto-play drives the run
    #[serde(default)]
    pub enable_auto_play_lock: bool,
    /// Scroll a lone controller's target into view before presenting it
    #[serde(default)]
    pub enable_auto_scroll: bool,
    /// Skip reverse animations when a step ends
    #[serde(default)]
    pub disable_scale_animation: bool,
    /// Scroll duration in milliseconds, forwarded to controllers
    #[serde(default = "default_scroll_duration")]
    pub scroll_duration_ms: u64,
}

impl Default for ShowcaseConfig {
    fn default() -> Self {
        Self {
            enable_showcase: default_true(),
            auto_play: false,
            auto_play_delay_ms: default_auto_play_delay(),
            enable_auto_play_lock: false,
            enable_auto_scroll: false,
            disable_scale_animation: false,
            scroll_duration_ms: default_scroll_duration(),
        }
    }
}

impl ShowcaseConfig {
    #[inline]
    pub fn auto_play_delay(&self) -> Duration {
        Duration::from_millis(self.auto_play_delay_ms)
    }

    #[inline]
    pub fn scroll_duration(&self) -> Duration {
        Duration::from_millis(self.scroll_duration_ms)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_auto_play_delay() -> u64 {
    2000
}

fn default_scroll_duration() -> u64 {
    300
}

impl AppConfig {
    /// Load configuration from the default path or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, falling back to defaults
    /// when the file does not exist
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/showcase/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("showcase")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShowcaseConfig::default();
        assert!(config.enable_showcase);
        assert!(!config.auto_play);
        assert_eq!(config.auto_play_delay(), Duration::from_millis(2000));
        assert_eq!(config.scroll_duration(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [showcase]
            auto_play = true
            auto_play_delay_ms = 500
            "#,
        )
        .unwrap();

        assert!(config.showcase.auto_play);
        assert_eq!(config.showcase.auto_play_delay_ms, 500);
        assert!(config.showcase.enable_showcase);
        assert!(!config.showcase.enable_auto_play_lock);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml_str("[showcase]\nauto_play = \"yes\"").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/showcase/config.toml")).unwrap();
        assert_eq!(config.showcase, ShowcaseConfig::default());
    }
}
