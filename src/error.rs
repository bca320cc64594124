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

use thiserror::Error;

/// Failure to obtain the current status of a resource or workflow
#[derive(Debug, Error)]
pub enum FetchError {
    /// The backend answered with a non-success HTTP status
    #[error("request failed with status {code}: {body}")]
    Status { code: u16, body: String },
    /// The request could not be sent or its response could not be read
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The response body is not the expected JSON document
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),
    /// The response has no status field
    #[error("response has no status field")]
    MissingStatus,
}

impl FetchError {
    /// HTTP status code carried by the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(value: reqwest::Error) -> Self {
        match value.status() {
            Some(status) => FetchError::Status {
                code: status.as_u16(),
                body: value.to_string(),
            },
            None => FetchError::Transport(Box::new(value)),
        }
    }
}

/// Error returned by a poll session
#[derive(Debug, Error)]
pub enum PollError {
    /// The status could not be fetched; the session was aborted
    #[error("error while polling `{id}`: {source}")]
    Transport {
        id: String,
        #[source]
        source: FetchError,
    },
    /// The fetch failed with a status code other than the awaited one
    #[error("error while polling `{id}`: expected status code {expected}, got {actual}: {source}")]
    UnexpectedStatusCode {
        id: String,
        expected: u16,
        actual: u16,
        #[source]
        source: FetchError,
    },
    /// The backend reported a status the operation cannot recover from
    #[error("received status {status} while polling `{id}`")]
    TerminalState { id: String, status: String },
    /// The loop budget was exhausted
    #[error("timed out polling `{id}` with last seen status '{}'", .last_status.as_deref().unwrap_or("unknown"))]
    Timeout {
        id: String,
        last_status: Option<String>,
    },
    /// The workflow did not leave its in-progress states within the budget
    #[error("operation timed out waiting for {task} to complete; Last known Workflow Status: {status}; Workflow ID: {id}")]
    WorkflowTimeout {
        id: String,
        task: String,
        status: String,
    },
    /// The workflow ended in a state other than completed
    #[error("{task} did not complete successfully; Workflow Status: {status}; Workflow ID: {id}")]
    WorkflowFailed {
        id: String,
        task: String,
        status: String,
    },
    /// The session was cancelled before reaching a terminal outcome
    #[error("polling `{id}` was cancelled with last seen status '{}'", .last_status.as_deref().unwrap_or("unknown"))]
    Cancelled {
        id: String,
        last_status: Option<String>,
    },
    /// The request cannot produce a bounded session
    #[error("invalid poll request for `{id}`: {reason}")]
    InvalidRequest { id: String, reason: &'static str },
}

impl PollError {
    /// Last status observed before the session ended, if any
    pub fn last_status(&self) -> Option<&str> {
        match self {
            PollError::Timeout { last_status, .. } | PollError::Cancelled { last_status, .. } => {
                last_status.as_deref()
            }
            PollError::TerminalState { status, .. }
            | PollError::WorkflowTimeout { status, .. }
            | PollError::WorkflowFailed { status, .. } => Some(status),
            _ => None,
        }
    }

    /// The budget ran out while the operation was still running
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            PollError::Timeout { .. } | PollError::WorkflowTimeout { .. }
        )
    }
}
