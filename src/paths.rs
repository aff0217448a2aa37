// File: ./src/paths.rs
// Locates the optional configuration file.
use directories::ProjectDirs;
use std::env;
use std::path::PathBuf;

/// Overrides the config directory; used by tests and packaged installs.
pub const CONFIG_DIR_ENV: &str = "ICAL_REMINDER_CONFIG_DIR";

pub struct AppPaths;

impl AppPaths {
    fn get_proj_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("org", "ical-reminder", "ical-reminder")
    }

    /// The directory holding `config.toml`. Nothing is created here: a
    /// missing directory just means there is no config.
    pub fn get_config_dir() -> Option<PathBuf> {
        if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
            return Some(PathBuf::from(dir));
        }
        Self::get_proj_dirs().map(|p| p.config_dir().to_path_buf())
    }

    pub fn get_config_file_path() -> Option<PathBuf> {
        Self::get_config_dir().map(|d| d.join("config.toml"))
    }
}
