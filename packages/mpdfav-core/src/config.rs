//! Daemon configuration types.
//!
//! The binary loads these from YAML; the core only validates and reads them.
//! A configuration is consumed once per daemon-loop iteration and never
//! hot-reloaded.

use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, DaemonResult};
use crate::protocol_constants::MPD_DEFAULT_PORT;

/// Connection settings for the MPD server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MpdSettings {
    pub host: String,
    pub port: u16,
    /// Empty means "connect without authenticating".
    pub password: String,
}

impl Default for MpdSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: MPD_DEFAULT_PORT,
            password: String::new(),
        }
    }
}

impl MpdSettings {
    /// `host:port` to dial.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Password to authenticate with, if any.
    pub fn credentials(&self) -> Option<&str> {
        (!self.password.is_empty()).then_some(self.password.as_str())
    }
}

/// Settings of one sticker-tracking service and the playlist it maintains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistServiceConfig {
    /// Whether the service is started at all.
    pub enabled: bool,
    /// Name of the stored playlist regenerated on every sticker change.
    pub playlist: String,
    /// Maximum number of songs kept in the playlist.
    pub limit: usize,
}

impl PlaylistServiceConfig {
    fn enabled(playlist: &str) -> Self {
        Self {
            enabled: true,
            playlist: playlist.to_string(),
            limit: 50,
        }
    }

    fn validate(&self, service: &str) -> DaemonResult<()> {
        if !self.enabled {
            return Ok(());
        }
        if self.playlist.trim().is_empty() {
            return Err(DaemonError::Configuration(format!(
                "{} playlist name must not be empty",
                service
            )));
        }
        if self.limit == 0 {
            return Err(DaemonError::Configuration(format!(
                "{} playlist limit must be greater than zero",
                service
            )));
        }
        Ok(())
    }
}

/// Complete daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub mpd: MpdSettings,
    /// Play-count tracking, feeding the "most played" playlist.
    pub playcounts: PlaylistServiceConfig,
    /// Ratings tracking, feeding the "best rated" playlist.
    pub ratings: PlaylistServiceConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            mpd: MpdSettings::default(),
            playcounts: PlaylistServiceConfig::enabled("Most Played"),
            ratings: PlaylistServiceConfig::enabled("Best Rated"),
        }
    }
}

impl DaemonConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no service is enabled, if the MPD host is empty,
    /// or if an enabled service has no playlist name or a zero limit.
    pub fn validate(&self) -> DaemonResult<()> {
        if self.mpd.host.trim().is_empty() {
            return Err(DaemonError::Configuration(
                "MPD host must not be empty".to_string(),
            ));
        }
        if !self.playcounts.enabled && !self.ratings.enabled {
            return Err(DaemonError::NoServicesEnabled);
        }
        self.playcounts.validate("playcounts")?;
        self.ratings.validate("ratings")
    }
}
