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

use serde::{Deserialize, Serialize};

use crate::schedule::Cadence;

pub const DEFAULT_API_ADDRESS: &str = "https://api.dev.tessell-stage.cloud";

/// Connection settings for the backend API
///
/// Built once when the provider is configured, then shared read-only by every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base address of the API, without trailing slash
    pub api_address: String,
    /// Timeout of a single HTTP request, in seconds
    pub request_timeout: u64,
    /// Access token, sent as `Authorization`
    pub authorization_token: String,
    /// Identity token, sent as `Authentication`
    pub authentication_token: String,
    /// Tenant the requests are issued for, sent as `tenant-id`
    pub tenant_id: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_address: DEFAULT_API_ADDRESS.to_owned(),
            request_timeout: 10,
            authorization_token: Default::default(),
            authentication_token: Default::default(),
            tenant_id: Default::default(),
        }
    }
}

impl ApiConfig {
    /// Build a config for `api_address` with default settings
    pub fn new<S: Into<String>>(api_address: S) -> Self {
        Self {
            api_address: api_address.into().trim_end_matches('/').to_owned(),
            ..Default::default()
        }
    }

    /// Absolute URL of `path` on the API
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_address.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Headers to attach to every request; empty values are skipped
    pub fn headers(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("Authorization", self.authorization_token.as_str()),
            ("Authentication", self.authentication_token.as_str()),
            ("tenant-id", self.tenant_id.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// Tuning of the poll loops
///
/// Defaults reproduce the cadence the provider resources have always used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    /// Delay between fetches outside of the steady phase, in seconds
    pub short_interval: u64,
    /// Number of iterations polled with the short interval at the start of a session
    pub early_iterations: u32,
    /// Number of iterations polled with the short interval at the end of the budget
    pub final_iterations: u32,
    /// Extra iterations granted to status polling
    pub status_padding: u32,
    /// Extra iterations granted to status code polling
    pub status_code_padding: u32,
    /// Steady delay between workflow fetches, in seconds
    pub workflow_interval: u64,
    /// Extra iterations granted to workflow waits
    pub workflow_padding: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            short_interval: 10,
            early_iterations: 6,
            final_iterations: 2,
            status_padding: 5,
            status_code_padding: 0,
            workflow_interval: 60,
            workflow_padding: 5,
        }
    }
}

impl PollerConfig {
    /// Parse a config from JSON, missing fields take their default value
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Cadence of a session whose steady interval is `interval`
    pub fn cadence(&self, interval: Duration) -> Cadence {
        Cadence {
            short: Duration::from_secs(self.short_interval),
            steady: interval,
            early_iterations: self.early_iterations,
            final_iterations: self.final_iterations,
        }
    }

    pub fn workflow_interval(&self) -> Duration {
        Duration::from_secs(self.workflow_interval)
    }
}
