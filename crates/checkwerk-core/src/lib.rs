// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Checkwerk — Core types, request construction and error definitions shared
// across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod request;
pub mod state;
pub mod types;

pub use config::{ClientConfig, PollConfig};
pub use error::{CheckwerkError, Phase};
pub use request::{CheckOptions, CheckRequest, ContentSource, build_request};
pub use state::CheckState;
pub use types::*;
