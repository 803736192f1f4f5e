// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async HTTP client for the checking platform API (v1).
//
// Uses `reqwest` to send the platform operations:
//   - POST   api/v1/auth/sign-ins        sign-in (interactive or SSO)
//   - GET    <poll link>                 sign-in completion
//   - GET    api/v1/capabilities         guidance profiles, formats
//   - POST   api/v1/checking/checks      submit a check
//   - GET    <result link>               check progress / result
//   - DELETE <cancel link>               cancel a check
//   - GET    api/v1/                     platform information

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument};
use url::Url;

use checkwerk_core::config::ClientConfig;
use checkwerk_core::error::{CheckwerkError, Phase, Result};
use checkwerk_core::request::CheckRequest;
use checkwerk_core::types::{
    AccessToken, Capabilities, CheckHandle, CheckPoll, PlatformInformation, SignInPoll,
    SignInResponse, SignInSuccess,
};

use crate::platform::Platform;
use crate::wire::{
    CapabilitiesEnvelope, CheckResultEnvelope, ErrorEnvelope, PlatformInfoEnvelope,
    SignInEnvelope, SubmitBody, SubmitEnvelope,
};

const SIGN_IN_PATH: &str = "api/v1/auth/sign-ins";
const CAPABILITIES_PATH: &str = "api/v1/capabilities";
const CHECKS_PATH: &str = "api/v1/checking/checks";
const PLATFORM_INFO_PATH: &str = "api/v1/";

/// Identifies the integration: `<signature>; <version>`.
pub const HEADER_CLIENT: &str = "X-Acrolinx-Client";
pub const HEADER_CLIENT_LOCALE: &str = "X-Acrolinx-Client-Locale";
pub const HEADER_AUTH: &str = "X-Acrolinx-Auth";
const HEADER_SSO_USERNAME: &str = "username";
const HEADER_SSO_PASSWORD: &str = "password";

/// HTTP implementation of [`Platform`].
///
/// Each instance is bound to one platform base URL.  All methods are async
/// and require a Tokio runtime.
#[derive(Debug, Clone)]
pub struct PlatformEndpoint {
    /// Platform base URL, always ending in `/`.
    base: Url,
    http: reqwest::Client,
    client_header: String,
    locale: String,
}

impl PlatformEndpoint {
    /// Create a client for the platform described by `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base = config.platform_url()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("checkwerk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CheckwerkError::Client(e.to_string()))?;
        Ok(Self {
            base,
            http,
            client_header: config.client_header(),
            locale: config.client_locale.clone(),
        })
    }

    /// Return the platform base URL this client is targeting.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| CheckwerkError::InvalidUrl(format!("{}{path}: {e}", self.base)))
    }

    fn request(&self, method: Method, url: Url, token: Option<&AccessToken>) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(HEADER_CLIENT, &self.client_header)
            .header(HEADER_CLIENT_LOCALE, &self.locale);
        match token {
            Some(token) => builder.header(HEADER_AUTH, token.secret()),
            None => builder,
        }
    }

    /// Send a request and return the status and body of a successful
    /// response.  Non-success statuses become errors.
    async fn send_raw(&self, builder: RequestBuilder, phase: Phase) -> Result<(StatusCode, Vec<u8>)> {
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(phase, &e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(phase, &e))?;

        if !status.is_success() {
            let err = status_error(phase, status, &body);
            error!(%phase, status = status.as_u16(), error = %err, "platform request failed");
            return Err(err);
        }
        Ok((status, body.to_vec()))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, phase: Phase) -> Result<T> {
        let (status, body) = self.send_raw(builder, phase).await?;
        debug!(%phase, status = status.as_u16(), bytes = body.len(), "platform response");
        Ok(serde_json::from_slice(&body)?)
    }
}

impl Platform for PlatformEndpoint {
    #[instrument(skip(self), fields(base = %self.base))]
    async fn start_sign_in(&self) -> Result<SignInResponse> {
        let url = self.url(SIGN_IN_PATH)?;
        debug!("starting sign-in");
        let envelope: SignInEnvelope = self
            .send_json(self.request(Method::POST, url, None), Phase::SignIn)
            .await?;
        envelope.into_response()
    }

    #[instrument(skip(self), fields(base = %self.base))]
    async fn poll_sign_in(&self, poll_link: &Url) -> Result<SignInPoll> {
        let envelope: SignInEnvelope = self
            .send_json(
                self.request(Method::GET, poll_link.clone(), None),
                Phase::SignIn,
            )
            .await?;
        Ok(envelope.into_poll())
    }

    #[instrument(skip(self, generic_password), fields(base = %self.base))]
    async fn sign_in_with_sso(&self, username: &str, generic_password: &str) -> Result<SignInSuccess> {
        let url = self.url(SIGN_IN_PATH)?;
        let builder = self
            .request(Method::POST, url, None)
            .header(HEADER_SSO_USERNAME, username)
            .header(HEADER_SSO_PASSWORD, generic_password);

        info!("signing in with single sign-on");
        let envelope: SignInEnvelope = self.send_json(builder, Phase::SignIn).await?;
        match envelope.into_response()? {
            SignInResponse::Success(success) => Ok(success),
            SignInResponse::Links(_) => Err(CheckwerkError::Authentication {
                phase: Phase::SignIn,
                detail: "single sign-on was not accepted; the platform asked for an interactive sign-in".into(),
            }),
        }
    }

    #[instrument(skip(self, token), fields(base = %self.base))]
    async fn get_capabilities(&self, token: &AccessToken) -> Result<Capabilities> {
        let url = self.url(CAPABILITIES_PATH)?;
        let envelope: CapabilitiesEnvelope = self
            .send_json(self.request(Method::GET, url, Some(token)), Phase::Capabilities)
            .await?;
        let capabilities = envelope.data.checking;
        debug!(
            profiles = capabilities.guidance_profiles.len(),
            formats = capabilities.content_formats.len(),
            "received capabilities"
        );
        Ok(capabilities)
    }

    #[instrument(skip(self, token, request), fields(base = %self.base, reference = ?request.content_reference()))]
    async fn submit_check(&self, token: &AccessToken, request: &CheckRequest) -> Result<CheckHandle> {
        let url = self.url(CHECKS_PATH)?;
        let builder = self
            .request(Method::POST, url, Some(token))
            .json(&SubmitBody::from(request));

        info!(bytes = request.content().len(), "submitting check");
        let envelope: SubmitEnvelope = self.send_json(builder, Phase::Submit).await?;
        let handle = CheckHandle::from(envelope);
        info!(check_id = %handle.id, "check accepted by platform");
        Ok(handle)
    }

    #[instrument(skip(self, token, handle), fields(check_id = %handle.id))]
    async fn poll_check(&self, token: &AccessToken, handle: &CheckHandle) -> Result<CheckPoll> {
        let envelope: CheckResultEnvelope = self
            .send_json(
                self.request(Method::GET, handle.result_link.clone(), Some(token)),
                Phase::Poll,
            )
            .await?;
        envelope.into_poll()
    }

    #[instrument(skip(self, token, handle), fields(check_id = %handle.id))]
    async fn cancel_check(&self, token: &AccessToken, handle: &CheckHandle) -> Result<()> {
        info!("sending cancel");
        self.send_raw(
            self.request(Method::DELETE, handle.cancel_link.clone(), Some(token)),
            Phase::Cancel,
        )
        .await?;
        info!("check cancelled");
        Ok(())
    }

    #[instrument(skip(self), fields(base = %self.base))]
    async fn get_platform_information(&self) -> Result<PlatformInformation> {
        let url = self.url(PLATFORM_INFO_PATH)?;
        let envelope: PlatformInfoEnvelope = self
            .send_json(self.request(Method::GET, url, None), Phase::PlatformInfo)
            .await?;
        Ok(envelope.into())
    }
}

// ---------------------------------------------------------------------------
// Helper functions for mapping transport and status failures
// ---------------------------------------------------------------------------

fn transport_error(phase: Phase, err: &reqwest::Error) -> CheckwerkError {
    let detail = if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };
    CheckwerkError::Transport { phase, detail }
}

/// Map a non-success response to the error taxonomy.
///
/// 401/403 always mean the credential was rejected; any other client error
/// during sign-in is also an authentication failure.
fn status_error(phase: Phase, status: StatusCode, body: &[u8]) -> CheckwerkError {
    let detail = serde_json::from_slice::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.describe())
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

    let rejected = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || (phase == Phase::SignIn && status.is_client_error());
    if rejected {
        CheckwerkError::Authentication { phase, detail }
    } else {
        CheckwerkError::RemoteCheck {
            phase,
            status: Some(status.as_u16()),
            detail,
        }
    }
}
