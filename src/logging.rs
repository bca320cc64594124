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

use std::env;
use std::fs::File;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

/// Environment variable naming the file the plugin logs are written to
pub const LOG_FILE_VAR: &str = "PLUGIN_LOG_FILE";

/// Install a global `tracing` subscriber writing to `$PLUGIN_LOG_FILE`
///
/// Terraform owns stdout and stderr of the plugin, so nothing is installed when the variable is unset.
/// Returns `true` if a subscriber has been installed.
pub fn init_logging() -> Result<bool> {
    let Ok(path) = env::var(LOG_FILE_VAR) else {
        return Ok(false);
    };
    let log_file = File::create(&path).map_err(|err| anyhow!("cannot create {path}: {err}"))?;
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .try_init()
        .map_err(|err| anyhow!(err))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::{init_logging, LOG_FILE_VAR};

    #[test]
    fn nothing_installed_without_log_file() {
        if std::env::var_os(LOG_FILE_VAR).is_none() {
            assert!(!init_logging().unwrap());
        }
    }
}
