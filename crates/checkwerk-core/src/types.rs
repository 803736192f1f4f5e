// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Checkwerk platform client.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CheckwerkError, Result};

/// Bearer credential for authenticated platform calls.
///
/// The secret is never printed by `Debug` or `Display`.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Wrap an API token generated in the platform dashboard.
    ///
    /// API tokens are sent exactly like interactive access tokens.
    pub fn api_token(token: impl Into<String>) -> Self {
        Self::new(token)
    }

    /// The raw token, for the `X-Acrolinx-Auth` header.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl std::fmt::Display for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
}

/// Outcome of a completed sign-in.
#[derive(Debug, Clone)]
pub struct SignInSuccess {
    pub access_token: AccessToken,
    pub user: UserInfo,
}

/// Links handed out when the user has to sign in through a browser.
#[derive(Debug, Clone)]
pub struct SignInLinks {
    /// Page the user opens to authenticate.
    pub interactive: Url,
    /// Endpoint the client polls until the sign-in completes.
    pub poll: Url,
    /// How long the interactive link stays valid.
    pub interactive_link_timeout: Duration,
}

/// First answer to a sign-in request.
#[derive(Debug, Clone)]
pub enum SignInResponse {
    /// Already authenticated (e.g. a still-valid session).
    Success(SignInSuccess),
    /// The user must complete the flow in a browser.
    Links(SignInLinks),
}

/// Answer to one poll of the sign-in poll link.
#[derive(Debug, Clone)]
pub enum SignInPoll {
    Success(SignInSuccess),
    Pending { retry_after: Option<Duration> },
}

/// Language of a guidance profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    /// Language code, e.g. `en` or `de-CH`.
    pub id: String,
    pub display_name: String,
}

/// A language/ruleset configuration documents are checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidanceProfile {
    pub id: String,
    pub display_name: String,
    pub language: Language,
}

/// A content format the platform knows how to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFormat {
    pub id: String,
    pub display_name: String,
}

/// How the `content` field of a check request is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    #[default]
    None,
    Base64,
}

/// Checking capabilities discovered for a signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    pub guidance_profiles: Vec<GuidanceProfile>,
    #[serde(default)]
    pub content_formats: Vec<ContentFormat>,
    #[serde(default)]
    pub content_encodings: Vec<ContentEncoding>,
    /// Regex of content references the platform can infer a format from.
    #[serde(default)]
    pub reference_pattern: Option<String>,
}

impl Capabilities {
    /// The first guidance profile matching `prefix`.
    ///
    /// An empty match is a configuration error, never an empty success.
    pub fn select_guidance_profile(&self, prefix: &str) -> Result<&GuidanceProfile> {
        self.guidance_profiles
            .iter()
            .find(|profile| profile.language.id.starts_with(prefix))
            .ok_or_else(|| {
                CheckwerkError::Configuration(format!(
                    "no matching guidance profile for language prefix '{prefix}'"
                ))
            })
    }
}

/// Kinds of report the platform can generate for a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportType {
    Scorecard,
    TermHarvesting,
    ExtractedText,
    RequestText,
}

impl ReportType {
    /// Key used for this report in platform payloads.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Scorecard => "scorecard",
            Self::TermHarvesting => "termHarvesting",
            Self::ExtractedText => "extractedText",
            Self::RequestText => "requestText",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "scorecard" => Some(Self::Scorecard),
            "termHarvesting" => Some(Self::TermHarvesting),
            "extractedText" => Some(Self::ExtractedText),
            "requestText" => Some(Self::RequestText),
            _ => None,
        }
    }
}

/// A generated report and where to fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub display_name: String,
    pub link: Url,
    /// Link that carries its own authentication, for sharing with browsers.
    pub link_authenticated: Option<Url>,
}

/// Traffic-light status of a check's quality score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityStatus {
    Red,
    Yellow,
    Green,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Red => "red",
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quality {
    pub score: f64,
    pub status: QualityStatus,
}

/// Progress notification for an in-flight check. Not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckProgress {
    /// Percent complete, 0 to 100.
    pub percent: f64,
    pub message: String,
}

impl std::fmt::Display for CheckProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}% ({})", self.percent, self.message)
    }
}

/// Reference to a submitted check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckHandle {
    pub id: String,
    pub result_link: Url,
    pub cancel_link: Url,
}

/// Answer to one poll of a check's result link.
#[derive(Debug, Clone)]
pub enum CheckPoll {
    Running {
        progress: CheckProgress,
        retry_after: Option<Duration>,
    },
    Done(CheckResult),
}

/// Terminal outcome of a check. Produced once per submitted request.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub id: String,
    pub quality: Quality,
    pub reports: HashMap<ReportType, Report>,
    pub completed_at: DateTime<Utc>,
}

impl CheckResult {
    pub fn report(&self, report_type: ReportType) -> Option<&Report> {
        self.reports.get(&report_type)
    }

    pub fn scorecard(&self) -> Option<&Report> {
        self.report(ReportType::Scorecard)
    }
}

/// Server identification returned by the platform root endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformInformation {
    pub server_name: String,
    pub version: String,
    pub locales: Vec<String>,
}

/// Classification of errors for resubmission decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Network blip, timeout, overloaded platform; resubmitting may help.
    Transient,
    /// User must take action (sign in again, fix configuration).
    UserAction,
    /// Permanent failure: the same request will fail again.
    Permanent,
}
