// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the people running a check.
//
// Every technical error is mapped to plain English with a clear suggestion
// about what to do next.

use crate::error::{CheckwerkError, Phase};

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip, busy platform, submitting again may work.
    Transient,
    /// User must do something (sign in again, pick another language).
    ActionRequired,
    /// Submitting the same request again will fail the same way.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether resubmitting is worthwhile.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `CheckwerkError` into a `HumanError`.
pub fn humanize_error(err: &CheckwerkError) -> HumanError {
    match err {
        CheckwerkError::Authentication { phase, .. } => {
            if *phase == Phase::SignIn {
                HumanError {
                    message: "Signing in didn't work.".into(),
                    suggestion: "Open the sign-in link again and finish signing in before it expires.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "Your sign-in is no longer accepted.".into(),
                    suggestion: "Sign in again, or check that your API token is still valid.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            }
        }

        CheckwerkError::Configuration(detail) => HumanError {
            message: "The checking setup isn't usable.".into(),
            suggestion: format!("Pick a language your account has a guidance profile for, or fix the configuration. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        CheckwerkError::RemoteCheck { status, detail, .. } => match status {
            Some(code) if *code >= 500 || *code == 429 => HumanError {
                message: "The checking service is having trouble.".into(),
                suggestion: "Wait a moment and submit the document again.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
            _ => HumanError {
                message: "The checking service couldn't check this document.".into(),
                suggestion: format!("Check the document and its format, then submit a new check. (Detail: {detail})"),
                retriable: false,
                severity: Severity::Permanent,
            },
        },

        CheckwerkError::Timeout { .. } => HumanError {
            message: "The check took too long.".into(),
            suggestion: "Submit the document again, or allow more time for the check in the configuration.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        CheckwerkError::Interrupted { .. } => HumanError {
            message: "The check was cancelled.".into(),
            suggestion: "Run it again when you're ready.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        CheckwerkError::Transport { .. } => HumanError {
            message: "We couldn't reach the checking service.".into(),
            suggestion: "Check your network connection and the platform URL, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        CheckwerkError::Client(_) | CheckwerkError::IllegalTransition { .. } => HumanError {
            message: "The client had an internal problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        CheckwerkError::InvalidRequest(detail) => HumanError {
            message: "The check request is incomplete.".into(),
            suggestion: format!("Give the document a content format or a file name. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        CheckwerkError::InvalidUrl(_) => HumanError {
            message: "The platform address doesn't look right.".into(),
            suggestion: "Check the platform URL. It should look like https://checker.example.com.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        CheckwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Check the path and try again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "We don't have permission to read that file.".into(),
                    suggestion: "Check the file permissions, or copy the file somewhere readable first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading a file.".into(),
                    suggestion: "Try again.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        CheckwerkError::Serialization(_) => HumanError {
            message: "The checking service sent something we didn't understand.".into(),
            suggestion: "The platform version may not be supported. Try again, and report it if it keeps happening.".into(),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}
