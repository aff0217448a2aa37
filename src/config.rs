// File: ./src/config.rs
// Optional tuning for a run, read from TOML. Every field has a default, so an
// absent file and an empty file behave the same.
use crate::paths::AppPaths;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

fn default_smtp_timeout_secs() -> u64 {
    10
}

fn default_extension() -> String {
    "ics".to_string()
}

/// How the SMTP connection upgrades to TLS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartTls {
    /// Upgrade when the server offers it, otherwise stay in plain text.
    #[default]
    Opportunistic,
    Required,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default = "default_smtp_timeout_secs")]
    pub smtp_timeout_secs: u64,
    #[serde(default)]
    pub starttls: StartTls,
    /// Calendar file extension, without the dot. Matched case-sensitively.
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smtp_timeout_secs: default_smtp_timeout_secs(),
            starttls: StartTls::default(),
            extension: default_extension(),
        }
    }
}

impl Config {
    /// Loads `explicit` if given, which must then exist and parse. Otherwise
    /// the per-user config file is used when present, and defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match AppPaths::get_config_file_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        if config.smtp_timeout_secs == 0 {
            anyhow::bail!("smtp_timeout_secs must be positive");
        }
        if config.extension.is_empty() {
            anyhow::bail!("extension must not be empty");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_toml_gives_defaults() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_toml() {
        let c = Config::from_toml("starttls = \"required\"\nsmtp_timeout_secs = 3\n").unwrap();
        assert_eq!(c.starttls, StartTls::Required);
        assert_eq!(c.smtp_timeout_secs, 3);
        assert_eq!(c.extension, "ics");
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_toml("starttls = \"always\"").is_err());
        assert!(Config::from_toml("smtp_timeout_secs = 0").is_err());
        assert!(Config::from_toml("extension = \"\"").is_err());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());

        let path = dir.path().join("config.toml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "extension = \"ical\"").unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap().extension, "ical");
    }
}
