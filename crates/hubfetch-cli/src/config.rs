//! User configuration.
//!
//! Optional defaults for the command line, stored at
//! `~/.config/hubfetch/config.json`. Flags and environment variables win
//! over anything in this file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "hubfetch";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default hub address, used when none is given on the command line
    pub hub: Option<String>,
    /// Default CA certificate for hub TLS
    pub cacert: Option<PathBuf>,
    /// Default hub user name
    pub hubuser: Option<String>,
    /// Keep prompted passwords in the OS keychain once the hub accepts them
    #[serde(default)]
    pub remember_password: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let config: Config = serde_json::from_str(r#"{"hubuser": "alice"}"#).unwrap();
        assert_eq!(config.hubuser.as_deref(), Some("alice"));
        assert!(config.cacert.is_none());
        assert!(config.hub.is_none());
        assert!(!config.remember_password);
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{"hub": "https://hub.example.com:7340", "cacert": "/etc/hub/ca.pem", "hubuser": "bob", "remember_password": true}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.hub.as_deref(), Some("https://hub.example.com:7340"));
        assert_eq!(config.cacert, Some(PathBuf::from("/etc/hub/ca.pem")));
        assert!(config.remember_password);
    }
}
