// Copyright 2026
// SPDX-License-Identifier: Apache-2.0

//! Resolution of the dockerconfigjson credential and change detection for a
//! file-mounted credential.

use crate::config::Config;
use crate::constants::file_watch;
use crate::error::{PatcherError, Result};
use std::fs;
use std::time::{Duration, SystemTime};
use tracing::warn;

/// Resolve the raw dockerconfigjson payload from the configured source.
///
/// A file-backed credential is read fresh on every call so that updates to a
/// mounted secret are picked up without a restart.
pub fn docker_config_json(config: &Config) -> Result<String> {
    if config.docker_config_json.is_empty() && config.docker_config_json_path.is_empty() {
        return Err(PatcherError::ConfigError(
            "neither CONFIG_DOCKERCONFIGJSON nor CONFIG_DOCKERCONFIGJSONPATH defined".to_string(),
        ));
    }
    if !config.docker_config_json.is_empty() && !config.docker_config_json_path.is_empty() {
        return Err(PatcherError::ConfigError(
            "cannot specify both CONFIG_DOCKERCONFIGJSON and CONFIG_DOCKERCONFIGJSONPATH"
                .to_string(),
        ));
    }
    if !config.docker_config_json.is_empty() {
        return Ok(config.docker_config_json.clone());
    }
    fs::read_to_string(&config.docker_config_json_path).map_err(|source| {
        PatcherError::CredentialFileError {
            path: config.docker_config_json_path.clone(),
            source,
        }
    })
}

/// Block until the file's modification timestamp changes from the value
/// observed at call time.
///
/// Polling (rather than inotify) tolerates the symlink-swap strategy used by
/// kubelet when refreshing mounted secrets. Stat errors are logged and the
/// poll continues.
pub async fn wait_until_file_changes(path: &str) {
    let initial = modified_time(path).await;

    loop {
        tokio::time::sleep(Duration::from_secs(file_watch::POLL_INTERVAL_SECS)).await;

        match tokio::fs::metadata(path).await {
            Ok(metadata) => {
                if metadata.modified().ok() != initial {
                    return;
                }
            }
            Err(e) => warn!("failed to stat credential file {}: {}", path, e),
        }
    }
}

async fn modified_time(path: &str) -> Option<SystemTime> {
    tokio::fs::metadata(path).await.ok().and_then(|m| m.modified().ok())
}
