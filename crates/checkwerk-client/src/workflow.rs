// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Check workflow: sign in, pick a guidance profile, build a request,
// submit it and wait for the result.
//
// The pipeline is sequential per check.  Only `sign_in` and
// `submit_and_wait` suspend, and both take a `CancelToken`.

use tracing::{debug, info, instrument};
use url::Url;
use uuid::Uuid;

use checkwerk_core::config::ClientConfig;
use checkwerk_core::error::{CheckwerkError, Phase, Result};
use checkwerk_core::request::{
    CONTENT_FORMAT_AUTO, CheckOptions, CheckRequest, ContentSource, build_request,
};
use checkwerk_core::state::CheckState;
use checkwerk_core::types::{
    AccessToken, Capabilities, CheckProgress, CheckResult, GuidanceProfile, PlatformInformation,
    SignInResponse,
};

use crate::cancel::CancelToken;
use crate::platform::Platform;
use crate::poller;

/// Drives documents through the check lifecycle against one platform.
#[derive(Debug)]
pub struct CheckWorkflowClient<P> {
    platform: P,
    config: ClientConfig,
}

impl<P: Platform> CheckWorkflowClient<P> {
    pub fn new(platform: P, config: ClientConfig) -> Self {
        Self { platform, config }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sign in interactively.
    ///
    /// When the platform needs a browser step, `on_url` receives the page
    /// to open and the call waits until the user finishes, the link
    /// expires, or `cancel` fires.
    #[instrument(skip_all)]
    pub async fn sign_in(
        &self,
        on_url: impl FnOnce(&Url),
        cancel: &CancelToken,
    ) -> Result<AccessToken> {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(CheckwerkError::Interrupted { phase: Phase::SignIn });
            }
            response = self.platform.start_sign_in() => response?,
        };

        let success = match response {
            SignInResponse::Success(success) => success,
            SignInResponse::Links(links) => {
                info!(
                    url = %links.interactive,
                    expires_secs = links.interactive_link_timeout.as_secs(),
                    "interactive sign-in required"
                );
                on_url(&links.interactive);
                poller::wait_for_sign_in(
                    &self.platform,
                    &links,
                    &self.config.poll,
                    self.config.sign_in_timeout(),
                    cancel,
                )
                .await?
            }
        };

        info!(user = %success.user.username, "signed in");
        Ok(success.access_token)
    }

    /// Sign in on behalf of `username` with the platform's generic SSO
    /// password.
    #[instrument(skip(self, generic_password))]
    pub async fn sign_in_with_sso(
        &self,
        username: &str,
        generic_password: &str,
    ) -> Result<AccessToken> {
        let success = self
            .platform
            .sign_in_with_sso(username, generic_password)
            .await?;
        info!(user = %success.user.username, "signed in with single sign-on");
        Ok(success.access_token)
    }

    pub async fn capabilities(&self, token: &AccessToken) -> Result<Capabilities> {
        self.platform.get_capabilities(token).await
    }

    pub async fn platform_information(&self) -> Result<PlatformInformation> {
        self.platform.get_platform_information().await
    }

    /// First guidance profile, in listing order, whose language id starts
    /// with `language_prefix`.
    #[instrument(skip(self, token))]
    pub async fn select_guidance_profile(
        &self,
        token: &AccessToken,
        language_prefix: &str,
    ) -> Result<GuidanceProfile> {
        let capabilities = self.capabilities(token).await?;
        let profile = capabilities.select_guidance_profile(language_prefix)?.clone();
        info!(profile = %profile.id, language = %profile.language.id, "selected guidance profile");
        Ok(profile)
    }

    /// Build a check request.  Performs no I/O.
    pub fn build_request(&self, source: ContentSource, options: CheckOptions) -> Result<CheckRequest> {
        build_request(source, options)
    }

    /// Submit `request` and wait for its result.
    ///
    /// `on_progress` runs on the waiting task for every progress tick.
    /// Keep it short; the next poll waits for it.
    #[instrument(skip_all, fields(reference = ?request.content_reference()))]
    pub async fn submit_and_wait(
        &self,
        token: &AccessToken,
        request: &CheckRequest,
        mut on_progress: impl FnMut(&CheckProgress),
        cancel: &CancelToken,
    ) -> Result<CheckResult> {
        let state = CheckState::Created;
        let handle = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(CheckwerkError::Interrupted { phase: Phase::Submit });
            }
            handle = self.platform.submit_check(token, request) => handle?,
        };
        let state = state.advance(CheckState::Submitted)?;
        debug!(check_id = %handle.id, %state, "check submitted");

        poller::wait_for_check(
            &self.platform,
            token,
            &handle,
            &self.config.poll,
            cancel,
            &mut on_progress,
        )
        .await
    }

    /// Select a guidance profile once and reuse it for every check of the
    /// returned session.
    pub async fn open_session(
        &self,
        token: AccessToken,
        language_prefix: &str,
    ) -> Result<CheckSession<'_, P>> {
        let profile = self.select_guidance_profile(&token, language_prefix).await?;
        let session = CheckSession {
            client: self,
            id: Uuid::new_v4(),
            token,
            profile,
        };
        info!(session = %session.id, profile = %session.profile.id, "session opened");
        Ok(session)
    }
}

/// A credential plus the guidance profile chosen for it.
///
/// Clones share the profile and credential and can run checks
/// concurrently.
pub struct CheckSession<'a, P> {
    client: &'a CheckWorkflowClient<P>,
    id: Uuid,
    token: AccessToken,
    profile: GuidanceProfile,
}

impl<P> std::fmt::Debug for CheckSession<'_, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckSession")
            .field("id", &self.id)
            .field("token", &self.token)
            .field("profile", &self.profile.id)
            .finish_non_exhaustive()
    }
}

impl<P> Clone for CheckSession<'_, P> {
    fn clone(&self) -> Self {
        Self {
            client: self.client,
            id: self.id,
            token: self.token.clone(),
            profile: self.profile.clone(),
        }
    }
}

impl<P: Platform> CheckSession<'_, P> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    pub fn guidance_profile(&self) -> &GuidanceProfile {
        &self.profile
    }

    /// Options carrying the session's profile and the configured reports.
    pub fn check_options(&self, content_format: Option<&str>) -> CheckOptions {
        let builder = CheckOptions::builder()
            .with_guidance_profile_id(self.profile.id.as_str())
            .with_report_types(self.client.config.report_types.iter().copied());
        match content_format {
            Some(format) => builder.with_content_format(format),
            None => builder,
        }
        .build()
    }

    /// Build a request from `source` and check it with the session's
    /// profile.  File content is submitted with format `AUTO`.
    #[instrument(skip_all, fields(session = %self.id))]
    pub async fn check(
        &self,
        source: ContentSource,
        on_progress: impl FnMut(&CheckProgress),
        cancel: &CancelToken,
    ) -> Result<CheckResult> {
        let format = match &source {
            ContentSource::Bytes { .. } => Some(CONTENT_FORMAT_AUTO),
            ContentSource::Text { .. } => None,
        };
        let request = self
            .client
            .build_request(source, self.check_options(format))?;
        self.client
            .submit_and_wait(&self.token, &request, on_progress, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use checkwerk_core::config::PollConfig;
    use checkwerk_core::request::CONTENT_FORMAT_TEXT;
    use checkwerk_core::types::{CheckPoll, ContentEncoding, ReportType, SignInPoll};

    use crate::test_utils::{self, FakePlatform, done, running};

    fn config() -> ClientConfig {
        ClientConfig {
            poll: PollConfig {
                initial_interval_ms: 100,
                max_interval_ms: 2_000,
                multiplier: 2,
                check_timeout_secs: 60,
            },
            sign_in_timeout_secs: 300,
            ..Default::default()
        }
    }

    fn client(platform: FakePlatform) -> CheckWorkflowClient<FakePlatform> {
        CheckWorkflowClient::new(platform, config())
    }

    fn interactive(platform: FakePlatform, link_timeout: Duration) -> FakePlatform {
        *platform.sign_in.lock().unwrap() =
            Some(SignInResponse::Links(test_utils::links(link_timeout)));
        platform
    }

    fn token() -> AccessToken {
        AccessToken::new("token-1")
    }

    fn text_request() -> CheckRequest {
        let options = CheckOptions::builder()
            .with_guidance_profile_id("en-us")
            .with_report_types([ReportType::Scorecard])
            .build();
        build_request(
            ContentSource::text("This textt has an errorr.", CONTENT_FORMAT_TEXT),
            options,
        )
        .unwrap()
    }

    // -- Sign-in ------------------------------------------------------------

    #[tokio::test]
    async fn sign_in_returns_token_without_browser_step() {
        let client = client(FakePlatform::new());
        let mut opened = None;
        let token = client
            .sign_in(|url| opened = Some(url.clone()), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(token.secret(), "token-1");
        assert!(opened.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn interactive_sign_in_surfaces_url_and_waits() {
        let platform = FakePlatform::new();
        *platform.sign_in.lock().unwrap() = Some(SignInResponse::Links(test_utils::links(
            Duration::from_secs(120),
        )));
        platform.sign_in_polls.lock().unwrap().extend([
            SignInPoll::Pending { retry_after: None },
            SignInPoll::Pending {
                retry_after: Some(Duration::from_secs(1)),
            },
            SignInPoll::Success(test_utils::success("interactive-token")),
        ]);
        let client = client(platform);

        let mut opened = None;
        let token = client
            .sign_in(|url| opened = Some(url.clone()), &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(token.secret(), "interactive-token");
        assert_eq!(opened.unwrap().path(), "/signin/abc");
        assert_eq!(client.platform().count("poll_sign_in"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_sign_in_is_authentication_error() {
        let platform = FakePlatform::new();
        *platform.sign_in.lock().unwrap() = Some(SignInResponse::Links(test_utils::links(
            Duration::from_secs(30),
        )));
        let client = client(platform);

        let err = client.sign_in(|_| {}, &CancelToken::new()).await.unwrap_err();
        assert!(matches!(
            err,
            CheckwerkError::Authentication { phase: Phase::SignIn, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn sign_in_ceiling_cuts_a_longer_link() {
        let platform = interactive(FakePlatform::new(), Duration::from_secs(600));
        let config = ClientConfig {
            sign_in_timeout_secs: 60,
            ..config()
        };
        let client = CheckWorkflowClient::new(platform, config);

        let started = tokio::time::Instant::now();
        let err = client.sign_in(|_| {}, &CancelToken::new()).await.unwrap_err();
        let waited = started.elapsed();

        assert!(matches!(
            err,
            CheckwerkError::Authentication { phase: Phase::SignIn, .. }
        ));
        assert!(waited >= Duration::from_secs(60));
        assert!(waited < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn huge_sign_in_hint_waits_at_most_the_max_interval() {
        let platform = interactive(FakePlatform::new(), Duration::from_secs(600));
        platform.sign_in_polls.lock().unwrap().extend([
            SignInPoll::Pending {
                retry_after: Some(Duration::MAX),
            },
            SignInPoll::Success(test_utils::success("late-token")),
        ]);
        let client = client(platform);

        let started = tokio::time::Instant::now();
        let token = client.sign_in(|_| {}, &CancelToken::new()).await.unwrap();

        assert_eq!(token.secret(), "late-token");
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_sign_in_limits_do_not_overflow() {
        let platform = interactive(FakePlatform::new(), Duration::from_secs(u64::MAX));
        platform
            .sign_in_polls
            .lock()
            .unwrap()
            .push_back(SignInPoll::Success(test_utils::success("token-2")));
        let config = ClientConfig {
            sign_in_timeout_secs: u64::MAX,
            ..config()
        };
        let client = CheckWorkflowClient::new(platform, config);

        let token = client.sign_in(|_| {}, &CancelToken::new()).await.unwrap();
        assert_eq!(token.secret(), "token-2");
    }

    #[tokio::test]
    async fn rejected_sign_in_is_authentication_error() {
        let platform = FakePlatform::new();
        *platform.sign_in.lock().unwrap() = None;
        let err = client(platform)
            .sign_in(|_| {}, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckwerkError::Authentication { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_sign_in_is_interrupted() {
        let platform = FakePlatform::new();
        *platform.sign_in.lock().unwrap() = Some(SignInResponse::Links(test_utils::links(
            Duration::from_secs(600),
        )));
        let client = client(platform);
        let cancel = CancelToken::new();

        let err = client
            .sign_in(|_| cancel.cancel(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckwerkError::Interrupted { phase: Phase::SignIn }
        ));
    }

    #[tokio::test]
    async fn sso_sign_in_returns_token() {
        let token = client(FakePlatform::new())
            .sign_in_with_sso("ada", "generic")
            .await
            .unwrap();
        assert_eq!(token.secret(), "sso-ada");
    }

    // -- Guidance profile selection -----------------------------------------

    #[tokio::test]
    async fn first_matching_profile_in_listing_order() {
        let client = client(FakePlatform::new());
        let profile = client.select_guidance_profile(&token(), "en").await.unwrap();
        assert_eq!(profile.id, "en-us");

        let profile = client.select_guidance_profile(&token(), "de").await.unwrap();
        assert_eq!(profile.id, "de-1");
    }

    #[tokio::test]
    async fn unknown_language_is_configuration_error_before_submission() {
        let client = client(FakePlatform::new());
        let err = client.open_session(token(), "xx").await.unwrap_err();

        assert!(matches!(err, CheckwerkError::Configuration(_)));
        assert_eq!(err.phase(), Some(Phase::Capabilities));
        assert_eq!(client.platform().count("submit_check"), 0);
    }

    // -- Submit and wait ----------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn text_check_reports_score_status_and_scorecard() {
        let platform =
            FakePlatform::new().with_check_polls([running(10.0), running(55.0), done(73.0)]);
        let client = client(platform);

        let mut seen = Vec::new();
        let result = client
            .submit_and_wait(
                &token(),
                &text_request(),
                |progress| seen.push(progress.percent),
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.quality.score, 73.0);
        assert!(result.scorecard().is_some());
        assert_eq!(seen, vec![10.0, 55.0]);

        let submitted = client.platform().submitted.lock().unwrap();
        assert_eq!(submitted[0].content(), "This textt has an errorr.");
        assert_eq!(
            submitted[0].check_options().content_format.as_deref(),
            Some("TEXT")
        );
    }

    #[tokio::test]
    async fn immediate_completion_skips_progress() {
        let client = client(FakePlatform::new().with_check_polls([done(90.0)]));
        let mut ticks = 0;
        client
            .submit_and_wait(&token(), &text_request(), |_| ticks += 1, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_never_goes_backwards() {
        let client = client(FakePlatform::new().with_check_polls([
            running(30.0),
            running(20.0),
            running(60.0),
            running(40.0),
            done(50.0),
        ]));

        let mut seen = Vec::new();
        client
            .submit_and_wait(
                &token(),
                &text_request(),
                |progress| seen.push(progress.percent),
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(seen, vec![30.0, 30.0, 60.0, 60.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_progress_is_interrupted() {
        let cancel = CancelToken::new();
        let mut platform = FakePlatform::new().with_check_polls([
            running(10.0),
            running(20.0),
            running(30.0),
            done(80.0),
        ]);
        platform.cancel_on_poll = Some((2, cancel.clone()));
        let client = client(platform);

        let mut seen = Vec::new();
        let err = client
            .submit_and_wait(
                &token(),
                &text_request(),
                |progress| seen.push(progress.percent),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckwerkError::Interrupted { phase: Phase::Poll }
        ));
        assert_eq!(seen, vec![10.0]);
        assert_eq!(client.platform().count("poll_check"), 2);
        assert_eq!(client.platform().count("cancel_check"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_from_progress_callback_stops_polling() {
        let cancel = CancelToken::new();
        let client = client(FakePlatform::new());

        let mut ticks = 0;
        let err = client
            .submit_and_wait(
                &token(),
                &text_request(),
                |_| {
                    ticks += 1;
                    cancel.cancel();
                },
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckwerkError::Interrupted { .. }));
        assert_eq!(ticks, 1);
        assert_eq!(client.platform().count("poll_check"), 1);
    }

    #[tokio::test]
    async fn cancelled_before_submit_sends_nothing() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let client = client(FakePlatform::new());

        let err = client
            .submit_and_wait(&token(), &text_request(), |_| {}, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckwerkError::Interrupted { phase: Phase::Submit }
        ));
        assert!(client.platform().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn endless_check_times_out() {
        let client = client(FakePlatform::new());
        let err = client
            .submit_and_wait(&token(), &text_request(), |_| {}, &CancelToken::new())
            .await
            .unwrap_err();

        match err {
            CheckwerkError::Timeout { phase, waited } => {
                assert_eq!(phase, Phase::Poll);
                assert_eq!(waited, Duration::from_secs(60));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(client.platform().count("cancel_check"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unbounded_check_timeout_does_not_overflow() {
        let platform = FakePlatform::new().with_check_polls([running(40.0), done(88.0)]);
        let mut config = config();
        config.poll.check_timeout_secs = u64::MAX;
        let client = CheckWorkflowClient::new(platform, config);

        let result = client
            .submit_and_wait(&token(), &text_request(), |_| {}, &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(result.quality.score, 88.0);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_check_hint_waits_at_most_the_max_interval() {
        let platform = FakePlatform::new().with_check_polls([
            Ok(CheckPoll::Running {
                progress: CheckProgress {
                    percent: 20.0,
                    message: "Queued".into(),
                },
                retry_after: Some(Duration::MAX),
            }),
            done(61.0),
        ]);
        let client = client(platform);

        let started = tokio::time::Instant::now();
        client
            .submit_and_wait(&token(), &text_request(), |_| {}, &CancelToken::new())
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn remote_failure_is_propagated() {
        let client = client(FakePlatform::new().with_check_polls([Err(
            CheckwerkError::RemoteCheck {
                phase: Phase::Poll,
                status: Some(500),
                detail: "checker crashed".into(),
            },
        )]));

        let err = client
            .submit_and_wait(&token(), &text_request(), |_| {}, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckwerkError::RemoteCheck { status: Some(500), .. }
        ));
    }

    #[tokio::test]
    async fn rejected_submission_is_not_polled() {
        let platform = FakePlatform::new();
        *platform.submit_error.lock().unwrap() = Some(CheckwerkError::RemoteCheck {
            phase: Phase::Submit,
            status: Some(400),
            detail: "bad profile".into(),
        });
        let client = client(platform);

        let err = client
            .submit_and_wait(&token(), &text_request(), |_| {}, &CancelToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.phase(), Some(Phase::Submit));
        assert_eq!(client.platform().count("poll_check"), 0);
    }

    // -- Sessions -----------------------------------------------------------

    #[tokio::test]
    async fn session_reuses_profile_for_every_check() {
        let client = client(FakePlatform::new().with_check_polls([done(70.0), done(75.0)]));
        let session = client.open_session(token(), "en").await.unwrap();
        let other = session.clone();

        session
            .check(
                ContentSource::text("first", CONTENT_FORMAT_TEXT),
                |_| {},
                &CancelToken::new(),
            )
            .await
            .unwrap();
        other
            .check(
                ContentSource::bytes(b"second".to_vec(), "second.docx"),
                |_| {},
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(other.id(), session.id());
        assert_eq!(client.platform().count("get_capabilities"), 1);

        let submitted = client.platform().submitted.lock().unwrap();
        assert!(submitted
            .iter()
            .all(|r| r.check_options().guidance_profile_id.as_deref() == Some("en-us")));
        assert_eq!(submitted[1].content_encoding(), ContentEncoding::Base64);
        assert_eq!(submitted[1].content_reference(), Some("second.docx"));
        assert_eq!(
            submitted[1].check_options().content_format.as_deref(),
            Some("AUTO")
        );
        assert_eq!(
            submitted[1].check_options().report_types,
            vec![ReportType::Scorecard]
        );
    }

    #[tokio::test]
    async fn session_debug_hides_token() {
        let client = client(FakePlatform::new());
        let session = client.open_session(token(), "en").await.unwrap();
        let debug = format!("{session:?}");
        assert!(debug.contains("en-us"));
        assert!(!debug.contains("token-1"));
    }

    #[tokio::test]
    async fn platform_information_passes_through() {
        let info = client(FakePlatform::new())
            .platform_information()
            .await
            .unwrap();
        assert_eq!(info.server_name, "Fake Platform");
    }
}
