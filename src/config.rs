//! Tool configuration, loaded from an `spl.toml` file.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::diagnostics::CompileError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub format: FormatConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Indentation width used by tree dumps.
    pub indent: u32,
}

impl Default for FormatConfig {
    fn default() -> Self {
        FormatConfig { indent: 4 }
    }
}

impl Config {
    /// Loads configuration from an explicit file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, CompileError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Loads `spl.toml` from the working directory when present, falling
    /// back to the defaults otherwise.
    pub fn discover() -> Config {
        let path = Path::new("spl.toml");
        if path.is_file() {
            Config::load(path).unwrap_or_default()
        } else {
            Config::default()
        }
    }
}
