use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::input::{KeyBindings, KeyCode};
use crate::light::UniformLayout;
use crate::timing::DEFAULT_HISTORY_CAPACITY;

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Runtime settings, loaded from TOML. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Frames to run before the headless window closes.
    pub frames: u64,
    /// Seconds the headless clock advances per frame.
    pub fixed_step: f32,
    /// Samples kept for the frame-time variance.
    pub history_capacity: usize,
    pub uniform_layout: UniformLayout,
    /// Frames between profiler log lines. Zero disables the periodic report.
    pub report_interval: u64,
    /// Free-fly camera speed in units per second.
    pub camera_speed: f32,
    pub keys: KeyConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            frames: 300,
            fixed_step: 1.0 / 60.0,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            uniform_layout: UniformLayout::SingleSlot,
            report_interval: 60,
            camera_speed: 3.0,
            keys: KeyConfig::default(),
        }
    }
}

/// Camera controller key names, e.g. `"W"`, `"Space"` or `"LShift"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyConfig {
    pub forward: String,
    pub back: String,
    pub left: String,
    pub right: String,
    pub up: String,
    pub down: String,
    pub boost: String,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            forward: "W".into(),
            back: "S".into(),
            left: "A".into(),
            right: "D".into(),
            up: "E".into(),
            down: "Q".into(),
            boost: "LeftShift".into(),
        }
    }
}

impl KeyConfig {
    pub fn bindings(&self) -> Result<KeyBindings, ConfigError> {
        let key = |field: &'static str, name: &str| {
            KeyCode::from_name(name).ok_or_else(|| ConfigError::Invalid {
                field,
                reason: format!("unknown key '{name}'"),
            })
        };
        Ok(KeyBindings {
            forward: key("keys.forward", &self.forward)?,
            back: key("keys.back", &self.back)?,
            left: key("keys.left", &self.left)?,
            right: key("keys.right", &self.right)?,
            up: key("keys.up", &self.up)?,
            down: key("keys.down", &self.down)?,
            boost: key("keys.boost", &self.boost)?,
        })
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fixed_step.is_finite() || self.fixed_step < 0.0 {
            return Err(ConfigError::Invalid {
                field: "fixed_step",
                reason: format!("{} is not a non-negative number of seconds", self.fixed_step),
            });
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "history_capacity",
                reason: "must keep at least one sample".into(),
            });
        }
        if !self.camera_speed.is_finite() {
            return Err(ConfigError::Invalid {
                field: "camera_speed",
                reason: format!("{} is not finite", self.camera_speed),
            });
        }
        self.keys.bindings()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_uses_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn parses_overrides() {
        let config = RuntimeConfig::from_toml_str(
            "frames = 10\nfixed_step = 0.02\nuniform_layout = \"indexed\"\n",
        )
        .unwrap();
        assert_eq!(config.frames, 10);
        assert_eq!(config.fixed_step, 0.02);
        assert_eq!(config.uniform_layout, UniformLayout::Indexed);
        assert_eq!(config.report_interval, 60);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = RuntimeConfig::from_toml_str("fixed_step = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "fixed_step", .. }));
        let err = RuntimeConfig::from_toml_str("history_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "history_capacity", .. }));
    }

    #[test]
    fn key_table_overrides_bindings() {
        let config =
            RuntimeConfig::from_toml_str("[keys]\nup = \"Space\"\nboost = \"RShift\"\n").unwrap();
        let bindings = config.keys.bindings().unwrap();
        assert_eq!(bindings.up, KeyCode::Named(crate::input::NamedKey::Space));
        assert_eq!(bindings.boost, KeyCode::Named(crate::input::NamedKey::RightShift));
        assert_eq!(bindings.forward, KeyCode::Character('W'));

        let err = RuntimeConfig::from_toml_str("[keys]\ndown = \"Hyper\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "keys.down", .. }));
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = RuntimeConfig::from_toml_str("fps_window = 30").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut tmp = NamedTempFile::new().expect("tmp file");
        tmp.write_all(b"report_interval = 0\n").expect("write config");
        let config = RuntimeConfig::load(tmp.path()).unwrap();
        assert_eq!(config.report_interval, 0);
    }
}
