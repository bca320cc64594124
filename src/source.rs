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

use std::{future::Future, sync::Arc};

use async_trait::async_trait;

use crate::error::FetchError;

/// Something that reports the current status of a resource or workflow
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch the current status of `id`
    ///
    /// A missing resource must be reported as an error carrying its HTTP status code,
    /// so that deletion can be detected.
    async fn fetch_status(&self, id: &str) -> Result<String, FetchError>;

    /// Check that `id` still exists, returning its status if it reports one
    ///
    /// Used while waiting for a deletion: any successful fetch means the resource is still there.
    async fn fetch_existing(&self, id: &str) -> Result<Option<String>, FetchError> {
        self.fetch_status(id).await.map(Some)
    }
}

#[async_trait]
impl<T: StatusSource + ?Sized> StatusSource for Arc<T> {
    async fn fetch_status(&self, id: &str) -> Result<String, FetchError> {
        self.as_ref().fetch_status(id).await
    }
    async fn fetch_existing(&self, id: &str) -> Result<Option<String>, FetchError> {
        self.as_ref().fetch_existing(id).await
    }
}

#[async_trait]
impl<'a, T: StatusSource + ?Sized> StatusSource for &'a T {
    async fn fetch_status(&self, id: &str) -> Result<String, FetchError> {
        (**self).fetch_status(id).await
    }
    async fn fetch_existing(&self, id: &str) -> Result<Option<String>, FetchError> {
        (**self).fetch_existing(id).await
    }
}

/// Adapter turning an async closure into a [`StatusSource`]
///
/// # Examples
///
/// ```
/// # use tf_op_poller::{FetchError, StatusFn, StatusSource};
/// # tokio_test_block(async {
/// let source = StatusFn(|_id: String| async { Ok::<_, FetchError>("READY".to_owned()) });
/// assert_eq!(source.fetch_status("db-1").await.unwrap(), "READY");
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StatusFn<F>(pub F);

#[async_trait]
impl<F, Fut> StatusSource for StatusFn<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, FetchError>> + Send,
{
    async fn fetch_status(&self, id: &str) -> Result<String, FetchError> {
        (self.0)(id.to_owned()).await
    }
}
