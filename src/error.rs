// Copyright 2026
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatcherError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("invalid configuration: {0}")]
    ConfigError(String),

    #[error("failed to read dockerconfigjson from '{path}': {source}")]
    CredentialFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("secret reconciliation failed: {0}")]
    SecretError(String),
}

pub type Result<T> = std::result::Result<T, PatcherError>;
