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

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollerConfig;
use crate::error::PollError;
use crate::poller::Session;
use crate::schedule::LoopBudget;
use crate::source::StatusSource;

/// Statuses of a workflow that has not finished yet
pub const IN_PROGRESS_STATUSES: [&str; 3] = ["PAUSED", "RUNNING", "SCHEDULED"];

/// The only final status counted as a success
pub const WORKFLOW_COMPLETED: &str = "COMPLETED";

/// Configuration of a wait on a backend workflow
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkflowWaitRequest {
    pub workflow_id: String,
    /// Total budget of the wait
    pub timeout: Duration,
    /// Human readable name of the operation, used in error messages
    pub task: String,
    pub in_progress: Vec<String>,
    /// Extra iterations added to `timeout / interval`, the waiter's configured padding if unset
    pub padding: Option<u32>,
}

impl WorkflowWaitRequest {
    pub fn new<I: Into<String>, T: Into<String>>(workflow_id: I, timeout: Duration, task: T) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            timeout,
            task: task.into(),
            in_progress: IN_PROGRESS_STATUSES.iter().map(|s| s.to_string()).collect(),
            padding: None,
        }
    }

    fn is_in_progress(&self, status: &str) -> bool {
        self.in_progress.iter().any(|s| s == status)
    }
}

/// Waits for backend workflows to leave their in-progress states
#[derive(Debug, Clone)]
pub struct WorkflowWaiter<S> {
    source: S,
    config: PollerConfig,
    cancellation_token: CancellationToken,
}

impl<S: StatusSource> WorkflowWaiter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            config: Default::default(),
            cancellation_token: Default::default(),
        }
    }

    pub fn with_config(mut self, config: PollerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cancellation(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Wait for the workflow `workflow_id` to complete successfully
    ///
    /// # Arguments
    ///
    /// * `workflow_id` - Identifier of the workflow returned by the mutating call
    /// * `timeout` - Total budget, in seconds
    /// * `task` - Name of the operation, eg: `"Database Deletion"`
    pub async fn wait_till_completed(
        &self,
        workflow_id: &str,
        timeout: u64,
        task: &str,
    ) -> Result<(), PollError> {
        let request = WorkflowWaitRequest::new(workflow_id, Duration::from_secs(timeout), task);
        let status = self.wait(&request).await?;
        if status == WORKFLOW_COMPLETED {
            Ok(())
        } else {
            Err(PollError::WorkflowFailed {
                id: request.workflow_id,
                task: request.task,
                status,
            })
        }
    }

    /// Wait for the workflow to leave its in-progress states
    ///
    /// Returns the first status outside of the in-progress set, whatever it is.
    pub async fn wait(&self, request: &WorkflowWaitRequest) -> Result<String, PollError> {
        let id = request.workflow_id.as_str();
        let interval = self.config.workflow_interval();
        let padding = request.padding.unwrap_or(self.config.workflow_padding);
        let budget = LoopBudget::new(request.timeout, interval, padding).ok_or_else(|| {
            PollError::InvalidRequest {
                id: id.to_owned(),
                reason: "workflow interval must not be zero",
            }
        })?;
        let mut session = Session::new(
            id,
            budget,
            self.config.cadence(interval),
            &self.cancellation_token,
        );
        let mut last_status = None;

        debug!(id, task = %request.task, loops = budget.loops, "waiting for workflow");

        loop {
            session.ensure_active(&last_status)?;

            let status = self
                .source
                .fetch_status(id)
                .await
                .map_err(|source| PollError::Transport {
                    id: id.to_owned(),
                    source,
                })?;

            if !request.is_in_progress(&status) {
                info!(id, task = %request.task, status = %status, "workflow finished");
                return Ok(status);
            }

            last_status = Some(status);
            if !session.advance(&last_status).await? {
                warn!(
                    id,
                    task = %request.task,
                    iterations = session.iteration(),
                    "workflow wait timed out"
                );
                return Err(PollError::WorkflowTimeout {
                    id: id.to_owned(),
                    task: request.task.clone(),
                    status: last_status.unwrap_or_default(),
                });
            }
        }
    }
}
