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

//! Long-running operation poller
//!
//! Backends that run create/delete/backup operations asynchronously hand back either a resource
//! whose `status` field eventually settles, or a workflow id to track.
//! This crate turns those into the synchronous contract a Terraform provider needs.
//!
//! Implementing a resource handler consists in picking a [`StatusSource`] (an [`ApiClient`]
//! endpoint, or any closure wrapped in [`StatusFn`]) and driving it with a [`Poller`]
//! or a [`WorkflowWaiter`].

mod attribute_path;
mod client;
mod config;
mod diagnostics;
mod error;
mod logging;
mod poller;
mod schedule;
mod source;
mod workflow;

pub use attribute_path::AttributePath;
pub use client::{ApiClient, Endpoint, ResourceSource, Workflow, WorkflowSource};
pub use config::{ApiConfig, PollerConfig, DEFAULT_API_ADDRESS};
pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{FetchError, PollError};
pub use logging::{init_logging, LOG_FILE_VAR};
pub use poller::{CompletionRule, PollOutcome, PollRequest, Poller, FAILED_STATUS};
pub use schedule::{Cadence, LoopBudget};
pub use source::{StatusFn, StatusSource};
pub use workflow::{WorkflowWaitRequest, WorkflowWaiter, IN_PROGRESS_STATUSES, WORKFLOW_COMPLETED};
