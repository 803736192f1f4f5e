// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON payloads of the platform API and their conversion into domain types.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use checkwerk_core::error::{CheckwerkError, Phase, Result};
use checkwerk_core::request::{CheckOptions, CheckRequest};
use checkwerk_core::types::{
    AccessToken, Capabilities, CheckHandle, CheckPoll, CheckProgress, CheckResult,
    ContentEncoding, PlatformInformation, Quality, Report, ReportType, SignInLinks, SignInPoll,
    SignInResponse, SignInSuccess, UserInfo,
};

/// Longest server `retryAfter` hint we take at face value.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

/// Fallback when the platform omits `interactiveLinkTimeout`.
const DEFAULT_INTERACTIVE_LINK_TIMEOUT: Duration = Duration::from_secs(900);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ErrorBody {
    /// One-line description: `title: detail (type)`.
    pub fn describe(&self) -> String {
        let mut text = match (&self.title, &self.detail) {
            (Some(title), Some(detail)) => format!("{title}: {detail}"),
            (Some(only), None) | (None, Some(only)) => only.clone(),
            (None, None) => "unspecified platform error".into(),
        };
        if let Some(kind) = &self.kind {
            text.push_str(&format!(" ({kind})"));
        }
        text
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ProgressWire {
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    /// Seconds until the next poll is worthwhile.
    #[serde(default)]
    pub retry_after: Option<f64>,
}

impl ProgressWire {
    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
            .filter(|secs| secs.is_finite())
            .map(|secs| Duration::from_secs_f64(secs.clamp(0.0, MAX_RETRY_AFTER.as_secs_f64())))
    }

    fn into_progress(self) -> (CheckProgress, Option<Duration>) {
        let retry_after = self.retry_after();
        let progress = CheckProgress {
            percent: self.percent.unwrap_or(0.0).clamp(0.0, 100.0),
            message: self.message.unwrap_or_default(),
        };
        (progress, retry_after)
    }
}

// ---------------------------------------------------------------------------
// Sign-in
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInEnvelope {
    #[serde(default)]
    pub data: Option<SignInData>,
    #[serde(default)]
    pub links: Option<SignInLinksWire>,
    #[serde(default)]
    pub progress: Option<ProgressWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignInData {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserInfo>,
    /// Seconds the interactive link stays valid.
    #[serde(default)]
    pub interactive_link_timeout: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignInLinksWire {
    pub interactive: Url,
    pub poll: Url,
}

impl SignInEnvelope {
    fn success(&mut self) -> Option<SignInSuccess> {
        let data = self.data.as_mut()?;
        let token = data.access_token.take()?;
        let user = data.user.take().unwrap_or_else(|| UserInfo {
            id: String::new(),
            username: String::new(),
        });
        Some(SignInSuccess {
            access_token: AccessToken::new(token),
            user,
        })
    }

    pub fn into_response(mut self) -> Result<SignInResponse> {
        if let Some(success) = self.success() {
            return Ok(SignInResponse::Success(success));
        }
        let links = self.links.ok_or_else(|| CheckwerkError::Authentication {
            phase: Phase::SignIn,
            detail: "sign-in response carried neither a token nor sign-in links".into(),
        })?;
        let timeout = self
            .data
            .and_then(|d| d.interactive_link_timeout)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_INTERACTIVE_LINK_TIMEOUT);
        Ok(SignInResponse::Links(SignInLinks {
            interactive: links.interactive,
            poll: links.poll,
            interactive_link_timeout: timeout,
        }))
    }

    pub fn into_poll(mut self) -> SignInPoll {
        match self.success() {
            Some(success) => SignInPoll::Success(success),
            None => SignInPoll::Pending {
                retry_after: self.progress.as_ref().and_then(ProgressWire::retry_after),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Capabilities and platform information
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct CapabilitiesEnvelope {
    pub data: CapabilitiesData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CapabilitiesData {
    pub checking: Capabilities,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlatformInfoEnvelope {
    pub data: PlatformInfoData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlatformInfoData {
    pub server: ServerWire,
    #[serde(default)]
    pub locales: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ServerWire {
    pub name: String,
    pub version: String,
}

impl From<PlatformInfoEnvelope> for PlatformInformation {
    fn from(envelope: PlatformInfoEnvelope) -> Self {
        Self {
            server_name: envelope.data.server.name,
            version: envelope.data.server.version,
            locales: envelope.data.locales,
        }
    }
}

// ---------------------------------------------------------------------------
// Checks
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/checking/checks`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubmitBody<'a> {
    pub content: &'a str,
    pub content_encoding: ContentEncoding,
    pub check_options: &'a CheckOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentWire<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DocumentWire<'a> {
    pub reference: &'a str,
}

impl<'a> From<&'a CheckRequest> for SubmitBody<'a> {
    fn from(request: &'a CheckRequest) -> Self {
        Self {
            content: request.content(),
            content_encoding: request.content_encoding(),
            check_options: request.check_options(),
            document: request
                .content_reference()
                .map(|reference| DocumentWire { reference }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitEnvelope {
    pub data: SubmitData,
    pub links: SubmitLinks,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitData {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitLinks {
    pub result: Url,
    pub cancel: Url,
}

impl From<SubmitEnvelope> for CheckHandle {
    fn from(envelope: SubmitEnvelope) -> Self {
        Self {
            id: envelope.data.id,
            result_link: envelope.links.result,
            cancel_link: envelope.links.cancel,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckResultEnvelope {
    #[serde(default)]
    pub data: Option<CheckResultData>,
    #[serde(default)]
    pub progress: Option<ProgressWire>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CheckResultData {
    pub id: String,
    pub quality: Quality,
    #[serde(default)]
    pub reports: HashMap<String, ReportWire>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReportWire {
    #[serde(default)]
    pub display_name: Option<String>,
    pub link: Url,
    #[serde(default)]
    pub link_authenticated: Option<Url>,
}

impl CheckResultEnvelope {
    pub fn into_poll(self) -> Result<CheckPoll> {
        if let Some(data) = self.data {
            return Ok(CheckPoll::Done(data.into_result()));
        }
        match self.progress {
            Some(progress) => {
                let (progress, retry_after) = progress.into_progress();
                Ok(CheckPoll::Running {
                    progress,
                    retry_after,
                })
            }
            None => Err(CheckwerkError::RemoteCheck {
                phase: Phase::Poll,
                status: None,
                detail: "check response carried neither a result nor progress".into(),
            }),
        }
    }
}

impl CheckResultData {
    fn into_result(self) -> CheckResult {
        let mut reports = HashMap::new();
        for (key, wire) in self.reports {
            match ReportType::from_key(&key) {
                Some(report_type) => {
                    reports.insert(
                        report_type,
                        Report {
                            display_name: wire.display_name.unwrap_or_else(|| key.clone()),
                            link: wire.link,
                            link_authenticated: wire.link_authenticated,
                        },
                    );
                }
                None => debug!(report = %key, "ignoring unknown report type"),
            }
        }
        CheckResult {
            id: self.id,
            quality: self.quality,
            reports,
            completed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkwerk_core::request::{CONTENT_FORMAT_TEXT, ContentSource, build_request};
    use checkwerk_core::types::QualityStatus;
    use serde_json::json;

    #[test]
    fn sign_in_links_are_parsed() {
        let envelope: SignInEnvelope = serde_json::from_value(json!({
            "links": {
                "interactive": "https://checker.example.com/signin/abc",
                "poll": "https://checker.example.com/api/v1/auth/sign-ins/abc"
            },
            "data": { "interactiveLinkTimeout": 120 }
        }))
        .unwrap();

        match envelope.into_response().unwrap() {
            SignInResponse::Links(links) => {
                assert_eq!(links.interactive.path(), "/signin/abc");
                assert_eq!(links.interactive_link_timeout, Duration::from_secs(120));
            }
            other => panic!("expected links, got {other:?}"),
        }
    }

    #[test]
    fn sign_in_success_is_parsed() {
        let envelope: SignInEnvelope = serde_json::from_value(json!({
            "data": {
                "accessToken": "token-1",
                "user": { "id": "u1", "username": "ada" }
            }
        }))
        .unwrap();

        match envelope.into_response().unwrap() {
            SignInResponse::Success(success) => {
                assert_eq!(success.access_token.secret(), "token-1");
                assert_eq!(success.user.username, "ada");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn empty_sign_in_answer_is_authentication_error() {
        let envelope: SignInEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            envelope.into_response(),
            Err(CheckwerkError::Authentication { .. })
        ));
    }

    #[test]
    fn pending_sign_in_keeps_retry_hint() {
        let envelope: SignInEnvelope =
            serde_json::from_value(json!({ "progress": { "retryAfter": 2 } })).unwrap();
        match envelope.into_poll() {
            SignInPoll::Pending { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(2)));
            }
            other => panic!("expected pending, got {other:?}"),
        }
    }

    #[test]
    fn running_check_clamps_percent() {
        let envelope: CheckResultEnvelope = serde_json::from_value(json!({
            "progress": { "percent": 140, "message": "Almost", "retryAfter": -1 }
        }))
        .unwrap();
        match envelope.into_poll().unwrap() {
            CheckPoll::Running {
                progress,
                retry_after,
            } => {
                assert_eq!(progress.percent, 100.0);
                assert_eq!(progress.message, "Almost");
                assert_eq!(retry_after, Some(Duration::ZERO));
            }
            other => panic!("expected running, got {other:?}"),
        }
    }

    #[test]
    fn oversized_retry_hint_is_capped() {
        let envelope: CheckResultEnvelope = serde_json::from_value(json!({
            "progress": { "percent": 10, "retryAfter": 1e20 }
        }))
        .unwrap();
        match envelope.into_poll().unwrap() {
            CheckPoll::Running { retry_after, .. } => {
                assert_eq!(retry_after, Some(MAX_RETRY_AFTER));
            }
            other => panic!("expected running, got {other:?}"),
        }

        let envelope: SignInEnvelope =
            serde_json::from_value(json!({ "progress": { "retryAfter": 1e300 } })).unwrap();
        match envelope.into_poll() {
            SignInPoll::Pending { retry_after } => assert_eq!(retry_after, Some(MAX_RETRY_AFTER)),
            other => panic!("expected pending, got {other:?}"),
        }
    }

    #[test]
    fn finished_check_keeps_known_reports() {
        let envelope: CheckResultEnvelope = serde_json::from_value(json!({
            "data": {
                "id": "check-1",
                "quality": { "score": 72, "status": "yellow" },
                "reports": {
                    "scorecard": {
                        "displayName": "Scorecard",
                        "link": "https://checker.example.com/output/check-1.html",
                        "linkAuthenticated": "https://checker.example.com/output/check-1.html?t=x"
                    },
                    "somethingNew": { "link": "https://checker.example.com/x" }
                }
            }
        }))
        .unwrap();

        let CheckPoll::Done(result) = envelope.into_poll().unwrap() else {
            panic!("expected a result");
        };
        assert_eq!(result.id, "check-1");
        assert_eq!(result.quality.score, 72.0);
        assert_eq!(result.quality.status, QualityStatus::Yellow);
        assert_eq!(result.reports.len(), 1);
        assert!(result.scorecard().unwrap().link.as_str().ends_with("check-1.html"));
    }

    #[test]
    fn response_without_data_or_progress_is_remote_error() {
        let envelope: CheckResultEnvelope = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            envelope.into_poll(),
            Err(CheckwerkError::RemoteCheck { phase: Phase::Poll, .. })
        ));
    }

    #[test]
    fn submit_body_has_platform_shape() {
        let options = CheckOptions::builder()
            .with_guidance_profile_id("en-us")
            .with_report_types([ReportType::Scorecard])
            .build();
        let text = build_request(
            ContentSource::text("This textt has an errorr.", CONTENT_FORMAT_TEXT),
            options.clone(),
        )
        .unwrap();
        let json = serde_json::to_value(SubmitBody::from(&text)).unwrap();
        assert_eq!(json["content"], "This textt has an errorr.");
        assert_eq!(json["contentEncoding"], "none");
        assert_eq!(json["checkOptions"]["contentFormat"], "TEXT");
        assert!(json.get("document").is_none());

        let docx = build_request(ContentSource::bytes(vec![1, 2, 3], "document.docx"), options)
            .unwrap();
        let json = serde_json::to_value(SubmitBody::from(&docx)).unwrap();
        assert_eq!(json["contentEncoding"], "base64");
        assert_eq!(json["document"]["reference"], "document.docx");
    }

    #[test]
    fn error_body_description() {
        let envelope: ErrorEnvelope = serde_json::from_value(json!({
            "error": { "type": "client", "title": "Bad request", "detail": "unknown profile", "status": 400 }
        }))
        .unwrap();
        assert_eq!(envelope.error.describe(), "Bad request: unknown profile (client)");
    }
}
