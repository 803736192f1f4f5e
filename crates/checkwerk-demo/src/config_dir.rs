// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Config file location and loading.

use std::path::{Path, PathBuf};

use checkwerk_core::config::ClientConfig;
use checkwerk_core::error::{CheckwerkError, Result};
use tracing::debug;

const CONFIG_FILE: &str = "config.json";

/// Default config file: `$XDG_CONFIG_HOME/checkwerk/config.json`.
fn default_config_path(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    config_base(lookup).join("checkwerk").join(CONFIG_FILE)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn config_base(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    // Try XDG config dir, then fallback to home
    if let Some(xdg) = lookup("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = lookup("HOME") {
        return PathBuf::from(home).join(".config");
    }
    // Last resort
    PathBuf::from(".")
}

/// Load the client config.
///
/// An explicit path must exist.  A missing default file means defaults.
/// `CHECKWERK_*` environment variables override the file either way.
pub fn load_config(explicit: Option<&Path>) -> Result<ClientConfig> {
    load_config_with(explicit, env_lookup)
}

/// [`load_config`] with variables read through `lookup`.
pub fn load_config_with(
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ClientConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_config_path(&lookup),
    };
    let mut config = if explicit.is_some() || path.exists() {
        ClientConfig::from_json_file(&path).map_err(|e| {
            CheckwerkError::Configuration(format!("cannot load {}: {e}", path.display()))
        })?
    } else {
        debug!(path = %path.display(), "no config file, using defaults");
        ClientConfig::default()
    };
    config.apply_overrides(&lookup);
    config.validate()?;
    Ok(config)
}
