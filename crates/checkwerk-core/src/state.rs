// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client-observed lifecycle of a single check.
//
//   Created -> Submitted -> InProgress* -> Done | Failed | Cancelled

use serde::{Deserialize, Serialize};

use crate::error::{CheckwerkError, Result};

/// Lifecycle states of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckState {
    /// Request built, not yet sent.
    Created,
    /// Accepted by the platform.
    Submitted,
    /// Platform reported progress; may repeat.
    InProgress,
    /// Result available.
    Done,
    /// Platform-side failure.
    Failed,
    /// Caller cancelled while the check was running.
    Cancelled,
}

impl CheckState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance(&self, next: CheckState) -> bool {
        use CheckState::*;
        match (self, next) {
            (Created, Submitted) | (Created, Failed) => true,
            (Submitted | InProgress, InProgress | Done | Failed | Cancelled) => true,
            _ => false,
        }
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn advance(self, next: CheckState) -> Result<CheckState> {
        if self.can_advance(next) {
            Ok(next)
        } else {
            Err(CheckwerkError::IllegalTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::InProgress => "in-progress",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
