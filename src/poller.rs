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

//! [`Poller`] module

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollerConfig;
use crate::error::PollError;
use crate::schedule::{Cadence, LoopBudget};
use crate::source::StatusSource;

/// Status reported by the backend when an operation failed
pub const FAILED_STATUS: &str = "FAILED";

/// When a poll session is considered complete
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompletionRule {
    /// The status field equals `target`; any status in `failures` ends the session in error
    Status {
        target: String,
        failures: Vec<String>,
    },
    /// Fetching the resource fails with this HTTP status code (eg: 404 once deleted)
    StatusCode(u16),
}

impl CompletionRule {
    /// Wait for `target`, `FAILED` being terminal
    pub fn status<S: Into<String>>(target: S) -> Self {
        Self::Status {
            target: target.into(),
            failures: vec![FAILED_STATUS.to_owned()],
        }
    }
    /// Wait for the fetch to fail with `code`
    pub fn status_code(code: u16) -> Self {
        Self::StatusCode(code)
    }
    /// Replace the terminal statuses of a [`CompletionRule::Status`] rule
    pub fn with_failures<I, S>(self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self {
            Self::Status { target, .. } => Self::Status {
                target,
                failures: statuses.into_iter().map(Into::into).collect(),
            },
            rule => rule,
        }
    }
}

/// Configuration of one poll session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PollRequest {
    /// Identifier passed to the status source
    pub id: String,
    /// Total budget of the session
    pub timeout: Duration,
    /// Delay between fetches in the steady phase
    pub interval: Duration,
    /// Delay between fetches at the start and the end of the session
    pub early_interval: Duration,
    /// Extra iterations added to `timeout / interval`
    pub padding: u32,
    pub rule: CompletionRule,
}

impl PollRequest {
    /// Build a request with the default cadence and padding for `rule`
    pub fn new<S: Into<String>>(
        id: S,
        rule: CompletionRule,
        timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self::with_config(id, rule, timeout, interval, &PollerConfig::default())
    }

    /// Build a request whose cadence and padding come from `config`
    pub fn with_config<S: Into<String>>(
        id: S,
        rule: CompletionRule,
        timeout: Duration,
        interval: Duration,
        config: &PollerConfig,
    ) -> Self {
        let padding = match rule {
            CompletionRule::Status { .. } => config.status_padding,
            CompletionRule::StatusCode(_) => config.status_code_padding,
        };
        Self {
            id: id.into(),
            timeout,
            interval,
            early_interval: Duration::from_secs(config.short_interval),
            padding,
            rule,
        }
    }

    pub fn padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    pub fn early_interval(mut self, early_interval: Duration) -> Self {
        self.early_interval = early_interval;
        self
    }
}

/// How a poll session ended
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PollOutcome {
    Completed,
    /// The backend reported one of the terminal statuses
    FailedTerminal(String),
    /// The budget ran out; holds the last status seen
    TimedOut(Option<String>),
}

impl PollOutcome {
    /// Convert the outcome into the error the resource handlers report
    pub fn into_result(self, id: &str) -> Result<(), PollError> {
        match self {
            PollOutcome::Completed => Ok(()),
            PollOutcome::FailedTerminal(status) => Err(PollError::TerminalState {
                id: id.to_owned(),
                status,
            }),
            PollOutcome::TimedOut(last_status) => Err(PollError::Timeout {
                id: id.to_owned(),
                last_status,
            }),
        }
    }
}

/// Iteration counter and sleeps of a running session
pub(crate) struct Session<'a> {
    id: &'a str,
    budget: LoopBudget,
    cadence: Cadence,
    cancellation_token: &'a CancellationToken,
    iteration: u32,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        id: &'a str,
        budget: LoopBudget,
        cadence: Cadence,
        cancellation_token: &'a CancellationToken,
    ) -> Self {
        Self {
            id,
            budget,
            cadence,
            cancellation_token,
            iteration: 0,
        }
    }

    pub(crate) fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Fail if the session has been cancelled
    pub(crate) fn ensure_active(&self, last_status: &Option<String>) -> Result<(), PollError> {
        if self.cancellation_token.is_cancelled() {
            Err(self.cancelled(last_status))
        } else {
            Ok(())
        }
    }

    /// Count an iteration that did not end the session, then sleep
    ///
    /// Returns `false` without sleeping once the budget is exceeded.
    pub(crate) async fn advance(&mut self, last_status: &Option<String>) -> Result<bool, PollError> {
        self.iteration += 1;
        if self.budget.exceeded(self.iteration) {
            return Ok(false);
        }
        let delay = self.cadence.delay(self.iteration, self.budget);
        debug!(
            id = self.id,
            iteration = self.iteration,
            loops = self.budget.loops,
            status = last_status.as_deref(),
            delay_secs = delay.as_secs_f64(),
            "not ready yet"
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(true),
            _ = self.cancellation_token.cancelled() => Err(self.cancelled(last_status)),
        }
    }

    fn cancelled(&self, last_status: &Option<String>) -> PollError {
        warn!(id = self.id, iteration = self.iteration, "polling cancelled");
        PollError::Cancelled {
            id: self.id.to_owned(),
            last_status: last_status.clone(),
        }
    }
}

/// Drives a [`StatusSource`] until an operation completes
///
/// Every call is an independent session: a single `Poller` can serve concurrent sessions.
#[derive(Debug, Clone)]
pub struct Poller<S> {
    source: S,
    config: PollerConfig,
    cancellation_token: CancellationToken,
}

impl<S: StatusSource> Poller<S> {
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

    /// Sessions stop with [`PollError::Cancelled`] once `cancellation_token` is cancelled
    pub fn with_cancellation(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Wait until `id` reports `status`
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier of the resource
    /// * `status` - Status to wait for
    /// * `timeout` - Total budget, in seconds
    /// * `interval` - Delay between fetches in the steady phase, in seconds
    pub async fn poll_for_status(
        &self,
        id: &str,
        status: &str,
        timeout: u64,
        interval: u64,
    ) -> Result<(), PollError> {
        let request = PollRequest::with_config(
            id,
            CompletionRule::status(status),
            Duration::from_secs(timeout),
            Duration::from_secs(interval),
            &self.config,
        );
        self.poll(&request).await?.into_result(id)
    }

    /// Wait until fetching `id` fails with `status_code`
    ///
    /// Typically used with 404 to confirm a deletion.
    pub async fn poll_for_status_code(
        &self,
        id: &str,
        status_code: u16,
        timeout: u64,
        interval: u64,
    ) -> Result<(), PollError> {
        let request = PollRequest::with_config(
            id,
            CompletionRule::status_code(status_code),
            Duration::from_secs(timeout),
            Duration::from_secs(interval),
            &self.config,
        );
        self.poll(&request).await?.into_result(id)
    }

    /// Run a poll session
    ///
    /// Terminal statuses and timeouts are reported as a [`PollOutcome`];
    /// fetch failures and cancellation abort the session with an error.
    pub async fn poll(&self, request: &PollRequest) -> Result<PollOutcome, PollError> {
        let id = request.id.as_str();
        let budget = LoopBudget::new(request.timeout, request.interval, request.padding)
            .ok_or_else(|| PollError::InvalidRequest {
                id: id.to_owned(),
                reason: "interval must not be zero",
            })?;
        let cadence = Cadence {
            short: request.early_interval,
            ..self.config.cadence(request.interval)
        };
        let mut session = Session::new(id, budget, cadence, &self.cancellation_token);
        let mut last_status = None;

        debug!(id, loops = budget.loops, rule = ?request.rule, "start polling");

        loop {
            session.ensure_active(&last_status)?;

            let fetched = match &request.rule {
                CompletionRule::Status { .. } => self.source.fetch_status(id).await.map(Some),
                CompletionRule::StatusCode(_) => self.source.fetch_existing(id).await,
            };
            let status = match (&request.rule, fetched) {
                (CompletionRule::Status { .. }, Err(source)) => {
                    warn!(id, error = %source, "status fetch failed");
                    return Err(PollError::Transport {
                        id: id.to_owned(),
                        source,
                    });
                }
                (CompletionRule::StatusCode(expected), Err(source)) => {
                    return match source.status_code() {
                        Some(actual) if actual == *expected => {
                            info!(id, status_code = actual, "polling completed");
                            Ok(PollOutcome::Completed)
                        }
                        Some(actual) => Err(PollError::UnexpectedStatusCode {
                            id: id.to_owned(),
                            expected: *expected,
                            actual,
                            source,
                        }),
                        None => Err(PollError::Transport {
                            id: id.to_owned(),
                            source,
                        }),
                    };
                }
                (_, Ok(status)) => status,
            };

            if let (CompletionRule::Status { target, failures }, Some(status)) =
                (&request.rule, &status)
            {
                if status == target {
                    info!(id, status = %status, "polling completed");
                    return Ok(PollOutcome::Completed);
                }
                if failures.contains(status) {
                    warn!(id, status = %status, "terminal status");
                    return Ok(PollOutcome::FailedTerminal(status.clone()));
                }
            }

            if status.is_some() {
                last_status = status;
            }
            if !session.advance(&last_status).await? {
                warn!(
                    id,
                    iterations = session.iteration(),
                    status = last_status.as_deref(),
                    "polling timed out"
                );
                return Ok(PollOutcome::TimedOut(last_status));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use super::{CompletionRule, PollOutcome, PollRequest, Poller};
    use crate::error::{FetchError, PollError};
    use crate::source::{StatusFn, StatusSource};

    type Fallback = Box<dyn Fn() -> Result<String, FetchError> + Send + Sync>;

    /// Source replaying a script, then answering with the fallback
    pub(crate) struct ScriptedSource {
        script: Mutex<VecDeque<Result<String, FetchError>>>,
        fallback: Fallback,
        fetches: AtomicU32,
    }

    impl ScriptedSource {
        pub(crate) fn new<I>(script: I) -> Self
        where
            I: IntoIterator<Item = Result<&'static str, u16>>,
        {
            Self {
                script: Mutex::new(
                    script
                        .into_iter()
                        .map(|step| match step {
                            Ok(status) => Ok(status.to_owned()),
                            Err(code) => Err(not_found(code)),
                        })
                        .collect(),
                ),
                fallback: Box::new(|| Err(FetchError::MissingStatus)),
                fetches: AtomicU32::new(0),
            }
        }

        pub(crate) fn statuses(statuses: &[&'static str]) -> Self {
            Self::new(statuses.iter().copied().map(Ok))
        }

        pub(crate) fn always(status: &'static str) -> Self {
            Self::new([]).then(move || Ok(status.to_owned()))
        }

        pub(crate) fn then<F>(mut self, fallback: F) -> Self
        where
            F: Fn() -> Result<String, FetchError> + Send + Sync + 'static,
        {
            self.fallback = Box::new(fallback);
            self
        }

        pub(crate) fn fetches(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatusSource for ScriptedSource {
        async fn fetch_status(&self, _id: &str) -> Result<String, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| (self.fallback)())
        }
    }

    pub(crate) fn not_found(code: u16) -> FetchError {
        FetchError::Status {
            code,
            body: "resource not found".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn status_reached_on_third_fetch() {
        let poller = Poller::new(ScriptedSource::statuses(&["RUNNING", "RUNNING", "READY"]));
        let start = Instant::now();

        poller
            .poll_for_status("db-1", "READY", 120, 30)
            .await
            .unwrap();

        assert_eq!(poller.source().fetches(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn status_cadence_covers_every_window() {
        let mut script = vec!["CREATING"; 9];
        script.push("READY");
        let poller = Poller::new(ScriptedSource::statuses(&script));
        let start = Instant::now();

        poller
            .poll_for_status("db-1", "READY", 300, 60)
            .await
            .unwrap();

        assert_eq!(poller.source().fetches(), 10);
        // 300 / 60 + 5 = 10 iterations: short after 1..=6, steady after 7, short after 8..=9
        assert_eq!(start.elapsed(), Duration::from_secs(6 * 10 + 60 + 2 * 10));
    }

    #[tokio::test(start_paused = true)]
    async fn status_times_out_with_last_status() {
        let poller = Poller::new(ScriptedSource::always("RUNNING"));

        let err = poller
            .poll_for_status("db-1", "READY", 120, 30)
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            PollError::Timeout { last_status: Some(status), .. } if status == "RUNNING"
        ));
        assert_eq!(poller.source().fetches(), 120 / 30 + 5 + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn last_status_of_sequence_is_reported() {
        let source = ScriptedSource::statuses(&["QUEUED", "CREATING"]).then(|| Ok("SCALING".into()));
        let poller = Poller::new(source);
        let request = PollRequest::new(
            "db-1",
            CompletionRule::status("READY"),
            Duration::from_secs(60),
            Duration::from_secs(30),
        )
        .padding(1);

        let outcome = poller.poll(&request).await.unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut(Some("SCALING".into())));
        assert_eq!(poller.source().fetches(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_is_terminal() {
        let poller = Poller::new(ScriptedSource::statuses(&["CREATING", "FAILED"]));

        let err = poller
            .poll_for_status("snap-1", "READY", 3600, 60)
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            PollError::TerminalState { status, .. } if status == "FAILED"
        ));
        assert_eq!(poller.source().fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_failure_statuses() {
        let poller = Poller::new(ScriptedSource::statuses(&["CREATING", "VALIDATION_FAILED"]));
        let request = PollRequest::new(
            "vpc-1",
            CompletionRule::status("ACTIVE").with_failures(["CREATION_FAILED", "VALIDATION_FAILED"]),
            Duration::from_secs(600),
            Duration::from_secs(10),
        );

        let outcome = poller.poll(&request).await.unwrap();

        assert_eq!(
            outcome,
            PollOutcome::FailedTerminal("VALIDATION_FAILED".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_aborts_status_polling() {
        let source = ScriptedSource::new([Ok("CREATING"), Err(500)]);
        let poller = Poller::new(source);

        let err = poller
            .poll_for_status("db-1", "READY", 600, 30)
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::Transport { .. }));
        assert_eq!(poller.source().fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn status_code_times_out_while_found() {
        let poller = Poller::new(ScriptedSource::always("DELETING"));
        let start = Instant::now();

        let err = poller
            .poll_for_status_code("db-1", 404, 300, 30)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.last_status(), Some("DELETING"));
        // budget of 10 iterations, exceeded on the 11th fetch
        assert_eq!(poller.source().fetches(), 11);
        // 6 early + 3 final short sleeps, 1 steady
        assert_eq!(start.elapsed(), Duration::from_secs(9 * 10 + 30));
    }

    #[tokio::test(start_paused = true)]
    async fn status_code_reached() {
        let poller = Poller::new(ScriptedSource::new([Ok("DELETING"), Err(404)]));

        poller
            .poll_for_status_code("db-1", 404, 300, 30)
            .await
            .unwrap();

        assert_eq!(poller.source().fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn other_status_code_fails_immediately() {
        let poller = Poller::new(ScriptedSource::new([Err(403)]));

        let err = poller
            .poll_for_status_code("db-1", 404, 300, 30)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PollError::UnexpectedStatusCode {
                expected: 404,
                actual: 403,
                ..
            }
        ));
        assert_eq!(poller.source().fetches(), 1);

        let poller = Poller::new(ScriptedSource::new([]));
        let err = poller
            .poll_for_status_code("db-1", 404, 300, 30)
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Transport { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_is_rejected() {
        let poller = Poller::new(ScriptedSource::always("RUNNING"));

        let err = poller
            .poll_for_status("db-1", "READY", 120, 0)
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::InvalidRequest { .. }));
        assert_eq!(poller.source().fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_sleep() {
        let token = CancellationToken::new();
        let poller = Poller::new(ScriptedSource::always("CREATING")).with_cancellation(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(15)).await;
            token.cancel();
        });
        let start = Instant::now();

        let err = poller
            .poll_for_status("db-1", "READY", 3600, 60)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(
            &err,
            PollError::Cancelled { last_status: Some(status), .. } if status == "CREATING"
        ));
        assert_eq!(poller.source().fetches(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_fetch() {
        let token = CancellationToken::new();
        token.cancel();
        let poller = Poller::new(ScriptedSource::always("CREATING")).with_cancellation(token);

        let err = poller
            .poll_for_status("db-1", "READY", 3600, 60)
            .await
            .unwrap_err();

        assert!(matches!(err, PollError::Cancelled { last_status: None, .. }));
        assert_eq!(poller.source().fetches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sessions_are_independent() {
        let ready = Arc::new(ScriptedSource::statuses(&["CREATING", "READY"]));
        let gone = Arc::new(ScriptedSource::new([Ok("DELETING"), Ok("DELETING"), Err(404)]));
        let create = Poller::new(ready.clone());
        let delete = Poller::new(gone.clone());

        let (created, deleted) = futures::join!(
            create.poll_for_status("db-1", "READY", 600, 30),
            delete.poll_for_status_code("db-2", 404, 600, 30),
        );

        created.unwrap();
        deleted.unwrap();
        assert_eq!(ready.fetches(), 2);
        assert_eq!(gone.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn closure_source() {
        let poller = Poller::new(StatusFn(|id: String| async move {
            if id == "db-1" {
                Ok("READY".to_owned())
            } else {
                Err(FetchError::MissingStatus)
            }
        }));

        poller.poll_for_status("db-1", "READY", 60, 10).await.unwrap();
        let err = poller
            .poll_for_status("db-2", "READY", 60, 10)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PollError::Transport {
                source: FetchError::MissingStatus,
                ..
            }
        ));
    }
}
