// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{CheckwerkError, Result};
use crate::types::ReportType;

/// Development-only client signature.  Real integrations receive their
/// own signature with their platform license.
pub const DEVELOPMENT_SIGNATURE: &str = "SW50ZWdyYXRpb25EZXZlbG9wbWVudERlbW9Pbmx5";

pub const ENV_URL: &str = "CHECKWERK_URL";
pub const ENV_SIGNATURE: &str = "CHECKWERK_SIGNATURE";
pub const ENV_ACCESS_TOKEN: &str = "CHECKWERK_ACCESS_TOKEN";

/// Upper bound for the check and sign-in waits (one day).
pub const MAX_WAIT_SECS: u64 = 24 * 3600;

/// Upper bound for a single HTTP exchange.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 3600;

/// Progress polling settings for a running check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay before the second poll.
    pub initial_interval_ms: u64,
    /// Upper bound for any single delay, including server hints.
    pub max_interval_ms: u64,
    /// Growth factor between consecutive delays.
    pub multiplier: u32,
    /// Give up when no terminal state is reached within this time.
    pub check_timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            max_interval_ms: 10_000,
            multiplier: 2,
            check_timeout_secs: 600,
        }
    }
}

impl PollConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout_secs)
    }
}

/// Persistent client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the checking platform.
    pub platform_url: String,
    /// Integration signature as configured in the platform license.
    pub client_signature: String,
    /// Version of this integration, reported to the platform.
    pub client_version: String,
    /// Locale for platform messages (e.g. progress texts).
    pub client_locale: String,
    /// Timeout for a single HTTP exchange.
    pub request_timeout_secs: u64,
    /// Upper bound on waiting for an interactive sign-in.
    pub sign_in_timeout_secs: u64,
    /// Reports requested with every check.
    pub report_types: Vec<ReportType>,
    pub poll: PollConfig,
    /// API token used instead of interactive sign-in.  Never written back.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            platform_url: "http://localhost:8031/".into(),
            client_signature: DEVELOPMENT_SIGNATURE.into(),
            client_version: env!("CARGO_PKG_VERSION").into(),
            client_locale: "en".into(),
            request_timeout_secs: 30,
            sign_in_timeout_secs: 900,
            report_types: vec![ReportType::Scorecard],
            poll: PollConfig::default(),
            access_token: None,
        }
    }
}

impl ClientConfig {
    /// Load a JSON config file.  Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&data)?;
        debug!(path = %path.as_ref().display(), "loaded client config");
        Ok(config)
    }

    /// Apply `CHECKWERK_*` overrides from `lookup` (the process
    /// environment in production, a map in tests).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_URL) {
            self.platform_url = url;
        }
        if let Some(signature) = lookup(ENV_SIGNATURE) {
            self.client_signature = signature;
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN).filter(|t| !t.is_empty()) {
            self.access_token = Some(token);
        }
    }

    /// Parsed platform URL, normalised to end with `/` so relative API
    /// paths join beneath it.
    pub fn platform_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.platform_url)
            .map_err(|e| CheckwerkError::InvalidUrl(format!("'{}': {e}", self.platform_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CheckwerkError::InvalidUrl(format!(
                "'{}': only http and https are supported",
                self.platform_url
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn sign_in_timeout(&self) -> Duration {
        Duration::from_secs(self.sign_in_timeout_secs)
    }

    /// Value of the client identification header: `<signature>; <version>`.
    pub fn client_header(&self) -> String {
        format!("{}; {}", self.client_signature, self.client_version)
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<()> {
        self.platform_url()?;
        if self.client_signature.trim().is_empty() {
            return Err(CheckwerkError::Configuration(
                "client signature must not be empty".into(),
            ));
        }
        if self.poll.multiplier == 0 {
            return Err(CheckwerkError::Configuration(
                "poll multiplier must be at least 1".into(),
            ));
        }
        if self.poll.initial_interval_ms > self.poll.max_interval_ms {
            return Err(CheckwerkError::Configuration(
                "poll initial interval exceeds the maximum interval".into(),
            ));
        }
        if self.poll.check_timeout_secs > MAX_WAIT_SECS {
            return Err(CheckwerkError::Configuration(format!(
                "check timeout must be at most {MAX_WAIT_SECS}s"
            )));
        }
        if self.sign_in_timeout_secs > MAX_WAIT_SECS {
            return Err(CheckwerkError::Configuration(format!(
                "sign-in timeout must be at most {MAX_WAIT_SECS}s"
            )));
        }
        if self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS {
            return Err(CheckwerkError::Configuration(format!(
                "request timeout must be at most {MAX_REQUEST_TIMEOUT_SECS}s"
            )));
        }
        Ok(())
    }
}
