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

//! Loop budget and sleep cadence shared by every poll session

use std::time::Duration;

/// Maximum number of iterations of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopBudget {
    pub loops: u32,
}

impl LoopBudget {
    /// `timeout / interval + padding`
    ///
    /// Returns `None` when `interval` is zero, as the session would never be bounded.
    pub fn new(timeout: Duration, interval: Duration, padding: u32) -> Option<Self> {
        let interval = interval.as_millis();
        if interval == 0 {
            return None;
        }
        let loops = u32::try_from(timeout.as_millis() / interval).unwrap_or(u32::MAX);
        Some(Self {
            loops: loops.saturating_add(padding),
        })
    }

    /// The counter went past the budget
    pub fn exceeded(&self, iteration: u32) -> bool {
        iteration > self.loops
    }
}

/// Two-speed sleep policy
///
/// The short interval is used for the first `early_iterations` iterations and for the last
/// `final_iterations` iterations of the budget, the steady interval in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cadence {
    pub short: Duration,
    pub steady: Duration,
    pub early_iterations: u32,
    pub final_iterations: u32,
}

impl Cadence {
    /// Delay to wait after iteration `iteration` (1-based)
    pub fn delay(&self, iteration: u32, budget: LoopBudget) -> Duration {
        let early = iteration <= self.early_iterations;
        let ending = iteration >= budget.loops.saturating_sub(self.final_iterations);
        if early || ending {
            self.short
        } else {
            self.steady
        }
    }
}
