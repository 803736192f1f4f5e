// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Checkwerk.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::CheckState;
use crate::types::ErrorClass;

/// Step of the check workflow in which a failure surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    SignIn,
    Capabilities,
    Submit,
    Poll,
    Cancel,
    PlatformInfo,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SignIn => "sign-in",
            Self::Capabilities => "capabilities",
            Self::Submit => "submit",
            Self::Poll => "poll",
            Self::Cancel => "cancel",
            Self::PlatformInfo => "platform-info",
        };
        f.write_str(name)
    }
}

/// Top-level error type for all Checkwerk operations.
#[derive(Debug, Error)]
pub enum CheckwerkError {
    // -- Workflow errors --
    #[error("authentication failed during {phase}: {detail}")]
    Authentication { phase: Phase, detail: String },

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("remote check failed during {phase}: {detail}")]
    RemoteCheck {
        phase: Phase,
        status: Option<u16>,
        detail: String,
    },

    #[error("no terminal state during {phase} after {waited:?}")]
    Timeout { phase: Phase, waited: Duration },

    #[error("interrupted during {phase}")]
    Interrupted { phase: Phase },

    // -- Transport --
    #[error("HTTP transport failed during {phase}: {detail}")]
    Transport { phase: Phase, detail: String },

    #[error("HTTP client setup failed: {0}")]
    Client(String),

    // -- Request construction --
    #[error("invalid check request: {0}")]
    InvalidRequest(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("illegal check state transition {from} -> {to}")]
    IllegalTransition { from: CheckState, to: CheckState },

    // -- Local I/O --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CheckwerkError {
    /// Workflow phase the error belongs to, when it came from talking to
    /// the platform.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Authentication { phase, .. }
            | Self::RemoteCheck { phase, .. }
            | Self::Timeout { phase, .. }
            | Self::Interrupted { phase }
            | Self::Transport { phase, .. } => Some(*phase),
            Self::Configuration(_) => Some(Phase::Capabilities),
            _ => None,
        }
    }

    /// Classify the error for resubmission decisions.
    ///
    /// The workflow itself never retries; callers use this to decide
    /// whether resubmitting a fresh request is worthwhile.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Authentication { .. } | Self::Configuration(_) | Self::InvalidUrl(_) => {
                ErrorClass::UserAction
            }
            Self::RemoteCheck { status, .. } => match status {
                Some(code) if *code >= 500 => ErrorClass::Transient,
                Some(429) => ErrorClass::Transient,
                _ => ErrorClass::Permanent,
            },
            Self::Timeout { .. } | Self::Transport { .. } => ErrorClass::Transient,
            Self::Interrupted { .. } => ErrorClass::Permanent,
            Self::Client(_)
            | Self::InvalidRequest(_)
            | Self::IllegalTransition { .. }
            | Self::Serialization(_) => ErrorClass::Permanent,
            Self::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    ErrorClass::UserAction
                }
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut => {
                    ErrorClass::Transient
                }
                _ => ErrorClass::Permanent,
            },
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CheckwerkError>;
