// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Waiting loops for the two suspending steps: interactive sign-in and a
// submitted check.
//
// Both loops poll with bounded exponential backoff, stop at a deadline and
// give up as soon as the cancel token fires.  Neither retries a failed
// request; errors from the platform end the wait.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, instrument, warn};
use url::Url;

use checkwerk_core::config::PollConfig;
use checkwerk_core::error::{CheckwerkError, Phase, Result};
use checkwerk_core::state::CheckState;
use checkwerk_core::types::{
    AccessToken, CheckHandle, CheckPoll, CheckProgress, CheckResult, SignInLinks, SignInPoll,
    SignInSuccess,
};

use crate::backoff::Backoff;
use crate::cancel::CancelToken;
use crate::platform::Platform;

/// Stand-in deadline for limits too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// `now + limit`, saturating at a deadline far enough out never to fire.
fn deadline_after(limit: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(limit)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Poll the sign-in link until the user completes the browser step.
///
/// The wait is bounded by the link's own timeout and by `ceiling`,
/// whichever is shorter.  Expiry means the flow was abandoned.
#[instrument(skip_all, fields(poll = %links.poll))]
pub async fn wait_for_sign_in<P: Platform>(
    platform: &P,
    links: &SignInLinks,
    config: &PollConfig,
    ceiling: Duration,
    cancel: &CancelToken,
) -> Result<SignInSuccess> {
    let limit = links.interactive_link_timeout.min(ceiling);
    let deadline = deadline_after(limit);
    let mut backoff = Backoff::new(config);

    let poll_loop = poll_sign_in_until_done(platform, &links.poll, &mut backoff);

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            info!("sign-in cancelled");
            Err(CheckwerkError::Interrupted { phase: Phase::SignIn })
        }
        outcome = timeout_at(deadline, poll_loop) => outcome.unwrap_or_else(|_| {
            warn!(waited_secs = limit.as_secs(), "interactive sign-in expired");
            Err(CheckwerkError::Authentication {
                phase: Phase::SignIn,
                detail: format!("interactive sign-in not completed within {}s", limit.as_secs()),
            })
        }),
    }
}

/// Poll a submitted check until it reaches a terminal state.
///
/// `on_progress` sees each progress tick in order with a percent that never
/// drops below an earlier one.  On cancellation no further ticks are
/// delivered and the platform is asked to cancel the check.
#[instrument(skip_all, fields(check_id = %handle.id))]
pub async fn wait_for_check<P, F>(
    platform: &P,
    token: &AccessToken,
    handle: &CheckHandle,
    config: &PollConfig,
    cancel: &CancelToken,
    on_progress: &mut F,
) -> Result<CheckResult>
where
    P: Platform,
    F: FnMut(&CheckProgress),
{
    let waited = config.check_timeout();
    let deadline = deadline_after(waited);
    let mut backoff = Backoff::new(config);
    let mut state = CheckState::Submitted;

    let poll_loop = poll_check_until_done(
        platform,
        token,
        handle,
        &mut backoff,
        &mut state,
        cancel,
        on_progress,
    );

    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CheckwerkError::Interrupted { phase: Phase::Poll }),
        outcome = timeout_at(deadline, poll_loop) => outcome
            .unwrap_or(Err(CheckwerkError::Timeout { phase: Phase::Poll, waited })),
    };

    match &outcome {
        Ok(result) => {
            info!(score = result.quality.score, status = %result.quality.status, "check done");
        }
        Err(CheckwerkError::Interrupted { .. }) => {
            if state.can_advance(CheckState::Cancelled) {
                state = CheckState::Cancelled;
            }
            info!(%state, "check interrupted, cancelling on the platform");
            if let Err(err) = platform.cancel_check(token, handle).await {
                warn!(error = %err, "remote cancel failed");
            }
        }
        Err(CheckwerkError::Timeout { .. }) => {
            warn!(%state, waited_secs = waited.as_secs(), "check did not finish in time");
        }
        Err(err) => {
            warn!(%state, error = %err, "check failed");
        }
    }
    outcome
}

async fn poll_sign_in_until_done<P: Platform>(
    platform: &P,
    poll_link: &Url,
    backoff: &mut Backoff,
) -> Result<SignInSuccess> {
    loop {
        match platform.poll_sign_in(poll_link).await? {
            SignInPoll::Success(success) => return Ok(success),
            SignInPoll::Pending { retry_after } => {
                let delay = backoff.next_delay(retry_after);
                debug!(attempt = backoff.attempt(), delay_ms = delay.as_millis(), "sign-in pending");
                sleep(delay).await;
            }
        }
    }
}

/// Poll until the check is done, reporting each tick.  `state` follows the
/// lifecycle so the caller can see where the loop stopped.
async fn poll_check_until_done<P, F>(
    platform: &P,
    token: &AccessToken,
    handle: &CheckHandle,
    backoff: &mut Backoff,
    state: &mut CheckState,
    cancel: &CancelToken,
    on_progress: &mut F,
) -> Result<CheckResult>
where
    P: Platform,
    F: FnMut(&CheckProgress),
{
    let mut high_water = 0.0_f64;
    loop {
        let poll = match platform.poll_check(token, handle).await {
            Ok(poll) => poll,
            Err(err) => {
                *state = state.advance(CheckState::Failed)?;
                return Err(err);
            }
        };
        match poll {
            CheckPoll::Done(result) => {
                *state = state.advance(CheckState::Done)?;
                return Ok(result);
            }
            CheckPoll::Running {
                mut progress,
                retry_after,
            } => {
                *state = state.advance(CheckState::InProgress)?;
                if cancel.is_cancelled() {
                    return Err(CheckwerkError::Interrupted { phase: Phase::Poll });
                }
                progress.percent = progress.percent.max(high_water);
                high_water = progress.percent;
                debug!(percent = progress.percent, message = %progress.message, "check progress");
                on_progress(&progress);

                sleep(backoff.next_delay(retry_after)).await;
            }
        }
    }
}
