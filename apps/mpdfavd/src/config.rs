//! Daemon configuration file.
//!
//! Supports loading from YAML files with environment variable overrides.
//! Without an explicit path the file lives at `~/.mpdfav.yaml` and is
//! created with default settings on first start.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mpdfav_core::DaemonConfig;

/// File name of the default configuration in the home directory.
const CONFIG_FILE_NAME: &str = ".mpdfav.yaml";

/// Outcome of loading the configuration.
#[derive(Debug)]
pub enum LoadedConfig {
    /// Configuration read from an existing file, with overrides applied.
    Loaded(DaemonConfig),
    /// No configuration existed, so a default file was written here.
    GeneratedDefault(PathBuf),
}

/// Returns `~/.mpdfav.yaml`, if the home directory is known.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Loads the configuration, then applies environment overrides.
///
/// An explicit `path` must exist. Without one, the default file is used and
/// generated if missing.
pub fn load(path: Option<&Path>) -> Result<LoadedConfig> {
    let loaded = match path {
        Some(path) => LoadedConfig::Loaded(read(path)?),
        None => {
            let path = default_path().context("Cannot determine home directory")?;
            load_or_generate(&path)?
        }
    };

    Ok(match loaded {
        LoadedConfig::Loaded(mut config) => {
            apply_overrides(&mut config, |key| std::env::var(key).ok());
            LoadedConfig::Loaded(config)
        }
        generated => generated,
    })
}

fn load_or_generate(path: &Path) -> Result<LoadedConfig> {
    if path.exists() {
        return Ok(LoadedConfig::Loaded(read(path)?));
    }
    write_default(path)?;
    Ok(LoadedConfig::GeneratedDefault(path.to_path_buf()))
}

fn read(path: &Path) -> Result<DaemonConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Writes the default configuration, readable only by the owner.
///
/// The file may hold the MPD password.
fn write_default(path: &Path) -> Result<()> {
    let content =
        serde_yaml::to_string(&DaemonConfig::default()).context("Failed to encode default config")?;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to create config file: {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

/// Applies `MPDFAV_MPD_*` overrides looked up through `var`.
fn apply_overrides(config: &mut DaemonConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("MPDFAV_MPD_HOST") {
        config.mpd.host = host;
    }

    if let Some(val) = var("MPDFAV_MPD_PORT") {
        match val.parse() {
            Ok(port) => config.mpd.port = port,
            Err(_) => log::warn!("Ignoring invalid MPDFAV_MPD_PORT {:?}", val),
        }
    }

    if let Some(password) = var("MPDFAV_MPD_PASSWORD") {
        config.mpd.password = password;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mpdfav.yaml");
        std::fs::write(
            &path,
            "mpd:\n  host: music.local\nratings:\n  enabled: false\n  playlist: Top\n  limit: 10\n",
        )
        .unwrap();

        let config = read(&path).unwrap();

        assert_eq!(config.mpd.host, "music.local");
        assert_eq!(config.mpd.port, 6600);
        assert!(!config.ratings.enabled);
        assert_eq!(config.ratings.limit, 10);
        assert_eq!(config.playcounts.playlist, "Most Played");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.yaml");
        let err = load(Some(missing.as_path())).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn missing_default_file_is_generated_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        match load_or_generate(&path).unwrap() {
            LoadedConfig::GeneratedDefault(written) => assert_eq!(written, path),
            other => panic!("unexpected {:?}", other),
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        match load_or_generate(&path).unwrap() {
            LoadedConfig::Loaded(config) => assert_eq!(config, DaemonConfig::default()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let vars: HashMap<&str, &str> = [
            ("MPDFAV_MPD_HOST", "10.0.0.5"),
            ("MPDFAV_MPD_PORT", "6601"),
            ("MPDFAV_MPD_PASSWORD", "hunter2"),
        ]
        .into_iter()
        .collect();
        let mut config = DaemonConfig::default();

        apply_overrides(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.mpd.address(), "10.0.0.5:6601");
        assert_eq!(config.mpd.credentials(), Some("hunter2"));
    }

    #[test]
    fn invalid_port_override_is_ignored() {
        let mut config = DaemonConfig::default();
        apply_overrides(&mut config, |key| {
            (key == "MPDFAV_MPD_PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.mpd.port, 6600);
    }
}
