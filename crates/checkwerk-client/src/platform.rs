// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The remote checking platform as seen by the workflow.
//
// `PlatformEndpoint` implements this over HTTP; tests substitute an
// in-memory platform.

use std::future::Future;

use checkwerk_core::error::Result;
use checkwerk_core::request::CheckRequest;
use checkwerk_core::types::{
    AccessToken, Capabilities, CheckHandle, CheckPoll, PlatformInformation, SignInPoll,
    SignInResponse, SignInSuccess,
};
use url::Url;

/// Single-exchange operations of the checking platform.
///
/// Each method performs one request/response round trip.  Waiting and
/// polling live in [`crate::poller`].
pub trait Platform {
    /// Begin a sign-in.  Answers with a credential or with links for an
    /// interactive browser sign-in.
    fn start_sign_in(&self) -> impl Future<Output = Result<SignInResponse>> + Send;

    /// Ask whether an interactive sign-in has completed.
    fn poll_sign_in(&self, poll_link: &Url) -> impl Future<Output = Result<SignInPoll>> + Send;

    /// Sign in on behalf of `username` using the platform's generic SSO
    /// password.
    fn sign_in_with_sso(
        &self,
        username: &str,
        generic_password: &str,
    ) -> impl Future<Output = Result<SignInSuccess>> + Send;

    fn get_capabilities(
        &self,
        token: &AccessToken,
    ) -> impl Future<Output = Result<Capabilities>> + Send;

    fn submit_check(
        &self,
        token: &AccessToken,
        request: &CheckRequest,
    ) -> impl Future<Output = Result<CheckHandle>> + Send;

    fn poll_check(
        &self,
        token: &AccessToken,
        handle: &CheckHandle,
    ) -> impl Future<Output = Result<CheckPoll>> + Send;

    fn cancel_check(
        &self,
        token: &AccessToken,
        handle: &CheckHandle,
    ) -> impl Future<Output = Result<()>> + Send;

    fn get_platform_information(
        &self,
    ) -> impl Future<Output = Result<PlatformInformation>> + Send;
}
