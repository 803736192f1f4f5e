// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Checkwerk client: talks to the checking platform and drives documents
// through sign-in, guidance profile selection, submission and polling.

pub mod backoff;
pub mod cancel;
pub mod endpoint;
pub mod platform;
pub mod poller;
pub mod workflow;

mod wire;

pub use cancel::CancelToken;
pub use endpoint::PlatformEndpoint;
pub use platform::Platform;
pub use workflow::{CheckSession, CheckWorkflowClient};
