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

//! HTTP status sources for the backend API

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::source::StatusSource;

/// Status-bearing resources of the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Service,
    AvailabilityMachine,
    Dataflix,
    DataflixCatalog,
    Database,
}

impl Endpoint {
    /// Path of the resource `id`, relative to the API address
    pub fn path(&self, id: &str) -> String {
        match self {
            Endpoint::Service => format!("services/{id}"),
            Endpoint::AvailabilityMachine => format!("availability-machines/{id}"),
            Endpoint::Dataflix => format!("dataflix/{id}"),
            Endpoint::DataflixCatalog => format!("dataflix/{id}/catalog"),
            Endpoint::Database => format!("databases/{id}"),
        }
    }
}

/// Backend workflow, as returned by `GET /workflows/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Workflow {
    pub id: String,
    pub status: String,
    pub workflow_name: String,
    pub created_by: String,
    pub execution_start_time: String,
    pub execution_end_time: String,
    pub update_time: String,
    pub data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StatusView {
    status: Option<String>,
}

/// Client of the backend API
///
/// Cheap to clone: clones share the connection pool and the configuration.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ApiConfig>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn get(&self, path: &str) -> Result<String, FetchError> {
        let url = self.config.url(path);
        let mut request = self.http.get(url.as_str());
        for (name, value) in self.config.headers() {
            request = request.header(name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        trace!(url = %url, status = status.as_u16(), "GET");

        if status != StatusCode::OK {
            return Err(FetchError::Status {
                code: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Fetch the `status` field of a resource
    pub async fn get_status(&self, endpoint: Endpoint, id: &str) -> Result<String, FetchError> {
        let body = self.get(&endpoint.path(id)).await?;
        let view: StatusView = serde_json::from_str(&body)?;
        view.status.ok_or(FetchError::MissingStatus)
    }

    /// Fetch a resource that may have been deleted
    ///
    /// Any `200 OK` counts as found, with the `status` field if the body carries one.
    pub async fn find_status(
        &self,
        endpoint: Endpoint,
        id: &str,
    ) -> Result<Option<String>, FetchError> {
        let body = self.get(&endpoint.path(id)).await?;
        Ok(serde_json::from_str::<StatusView>(&body)
            .ok()
            .and_then(|view| view.status))
    }

    pub async fn get_workflow(&self, id: &str) -> Result<Workflow, FetchError> {
        let body = self.get(&format!("workflows/{id}")).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Status source polling resources of `endpoint`
    pub fn resource(&self, endpoint: Endpoint) -> ResourceSource {
        ResourceSource {
            client: self.clone(),
            endpoint,
        }
    }

    /// Status source polling workflows
    pub fn workflows(&self) -> WorkflowSource {
        WorkflowSource {
            client: self.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResourceSource {
    client: ApiClient,
    endpoint: Endpoint,
}

#[async_trait]
impl StatusSource for ResourceSource {
    async fn fetch_status(&self, id: &str) -> Result<String, FetchError> {
        self.client.get_status(self.endpoint, id).await
    }
    async fn fetch_existing(&self, id: &str) -> Result<Option<String>, FetchError> {
        self.client.find_status(self.endpoint, id).await
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowSource {
    client: ApiClient,
}

#[async_trait]
impl StatusSource for WorkflowSource {
    async fn fetch_status(&self, id: &str) -> Result<String, FetchError> {
        Ok(self.client.get_workflow(id).await?.status)
    }
}
