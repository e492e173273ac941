//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Directory `curve export` writes into.
    pub export_dir: PathBuf,
    /// Delay before `curve show --json` resends its message.
    pub resend_delay_ms: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("export_dir", &self.export_dir)
            .field("resend_delay_ms", &self.resend_delay_ms)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("curve.db"),
            export_dir: data_dir,
            resend_delay_ms: 3_000,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (CURVE_*)
        figment = figment.merge(Env::prefixed("CURVE_"));

        figment.extract()
    }

    pub const fn resend_delay(&self) -> Duration {
        Duration::from_millis(self.resend_delay_ms)
    }

    /// Lock file guarding the database against concurrent trackers.
    pub fn lock_path(&self) -> PathBuf {
        self.database_path.with_extension("lock")
    }
}

/// Returns the platform-specific config directory for curve.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("curve"))
}

/// Returns the platform-specific data directory for curve.
///
/// On Linux: `~/.local/share/curve`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("curve"))
}
