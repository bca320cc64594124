// This file is part of the tf-provider project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{borrow::Cow, error::Error};

use crate::{attribute_path::AttributePath, error::PollError};

/// List of Errors and Warnings to send back to Terraform
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Diagnostics {
    /// List of errors
    pub errors: Vec<Diagnostic>,
    /// List of warnings
    pub warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Add an error diagnostic
    pub fn add_error(&mut self, diag: Diagnostic) {
        self.errors.push(diag)
    }
    /// Add a warning diagnostic
    pub fn add_warning(&mut self, diag: Diagnostic) {
        self.warnings.push(diag)
    }
    /// Report the outcome of a poll session
    ///
    /// Returns the value on success, `None` after recording the error.
    pub fn poll_result<T>(&mut self, result: Result<T, PollError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.add_error(Diagnostic::from(&err));
                None
            }
        }
    }
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Diagnostic {
    pub summary: Cow<'static, str>,
    pub detail: Cow<'static, str>,
    pub attribute: AttributePath,
}

/// Diagnostic
impl Diagnostic {
    /// Create a diagnostic
    pub fn new<S: Into<Cow<'static, str>>, D: Into<Cow<'static, str>>>(
        summary: S,
        detail: D,
        attribute: AttributePath,
    ) -> Self {
        Self {
            summary: summary.into(),
            detail: detail.into(),
            attribute,
        }
    }
    /// Create a diagnostic without AttributePath
    pub fn root<S: Into<Cow<'static, str>>, D: Into<Cow<'static, str>>>(
        summary: S,
        detail: D,
    ) -> Self {
        Self::new(summary, detail, Default::default())
    }
}

impl From<&PollError> for Diagnostic {
    fn from(err: &PollError) -> Self {
        let summary = match err {
            PollError::Transport { .. } | PollError::UnexpectedStatusCode { .. } => {
                "Could not get the status of the operation"
            }
            PollError::TerminalState { .. } | PollError::WorkflowFailed { .. } => {
                "Operation failed"
            }
            PollError::Timeout { .. } | PollError::WorkflowTimeout { .. } => "Operation timed out",
            PollError::Cancelled { .. } => "Operation interrupted",
            PollError::InvalidRequest { .. } => "Invalid polling parameters",
        };

        // Error message followed by its causes
        let mut detail = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            detail = format!("{}\n  caused by: {}", detail, cause);
            source = cause.source();
        }

        if err.is_timeout() || matches!(err, PollError::InvalidRequest { .. }) {
            Self::new(summary, detail, AttributePath::new("timeout"))
        } else {
            Self::root(summary, detail)
        }
    }
}
