// Copyright 2026
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use std::env;
use std::fs;

const NAMESPACE_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
const NAMESPACE_ENV_VAR: &str = "POD_NAMESPACE";

/// Operator configuration, loaded once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inline dockerconfigjson credential (mutually exclusive with the path)
    pub docker_config_json: String,
    /// Path to a mounted dockerconfigjson file (mutually exclusive with inline)
    pub docker_config_json_path: String,
    /// Name of the managed Secret created in every namespace
    pub secret_name: String,
    /// Namespace holding the source-of-truth Secret
    pub secret_namespace: String,
    /// Comma-separated glob patterns of namespaces to skip
    pub excluded_namespaces: String,
    /// Annotation key that opts a namespace or ServiceAccount out when set to "true"
    pub exclude_annotation: String,
    /// Comma-separated glob patterns of ServiceAccount names to patch
    pub service_accounts: String,
    /// Delete Pods stuck in an image-pull failure after attaching the secret
    pub feature_delete_pods: bool,
    /// Worker count for the ServiceAccount controller
    pub max_concurrent_reconciles: u16,
}

/// Optional per-field overrides applied on top of the environment-derived
/// base configuration. A field is only overridden when it is `Some`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub docker_config_json: Option<String>,
    pub docker_config_json_path: Option<String>,
    pub secret_name: Option<String>,
    pub secret_namespace: Option<String>,
    pub excluded_namespaces: Option<String>,
    pub exclude_annotation: Option<String>,
    pub service_accounts: Option<String>,
    pub feature_delete_pods: Option<bool>,
    pub max_concurrent_reconciles: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_overrides(ConfigOverrides::default())
    }

    /// Load configuration from environment variables, apply overrides, then
    /// validate the credential-source invariant.
    pub fn from_env_with_overrides(overrides: ConfigOverrides) -> Result<Self> {
        let mut config = Config {
            docker_config_json: env_or("CONFIG_DOCKERCONFIGJSON", ""),
            docker_config_json_path: env_or("CONFIG_DOCKERCONFIGJSONPATH", ""),
            secret_name: env_or("CONFIG_SECRETNAME", "global-imagepullsecret"),
            secret_namespace: env_or("CONFIG_SECRET_NAMESPACE", ""),
            excluded_namespaces: env_or("CONFIG_EXCLUDED_NAMESPACES", "kube-*"),
            exclude_annotation: env_or(
                "CONFIG_EXCLUDE_ANNOTATION",
                "pborn.eu/imagepullsecret-patcher-exclude",
            ),
            service_accounts: env_or("CONFIG_SERVICEACCOUNTS", "default"),
            feature_delete_pods: env_bool_or("CONFIG_DELETE_PODS", false)?,
            max_concurrent_reconciles: env_or("CONFIG_MAX_CONCURRENT_RECONCILES", "1")
                .parse()
                .context("CONFIG_MAX_CONCURRENT_RECONCILES must be an integer")?,
        };
        config.apply(overrides);

        if config.secret_namespace.is_empty() {
            config.secret_namespace =
                operator_namespace().context("failed to detect operator namespace")?;
        }

        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(v) = overrides.docker_config_json {
            self.docker_config_json = v;
        }
        if let Some(v) = overrides.docker_config_json_path {
            self.docker_config_json_path = v;
        }
        if let Some(v) = overrides.secret_name {
            self.secret_name = v;
        }
        if let Some(v) = overrides.secret_namespace {
            self.secret_namespace = v;
        }
        if let Some(v) = overrides.excluded_namespaces {
            self.excluded_namespaces = v;
        }
        if let Some(v) = overrides.exclude_annotation {
            self.exclude_annotation = v;
        }
        if let Some(v) = overrides.service_accounts {
            self.service_accounts = v;
        }
        if let Some(v) = overrides.feature_delete_pods {
            self.feature_delete_pods = v;
        }
        if let Some(v) = overrides.max_concurrent_reconciles {
            self.max_concurrent_reconciles = v;
        }
    }

    /// Exactly one of the inline credential and the credential file path must be set.
    pub fn validate(&self) -> Result<()> {
        if self.docker_config_json.is_empty() && self.docker_config_json_path.is_empty() {
            bail!("neither CONFIG_DOCKERCONFIGJSON nor CONFIG_DOCKERCONFIGJSONPATH defined");
        }
        if !self.docker_config_json.is_empty() && !self.docker_config_json_path.is_empty() {
            bail!("cannot specify both CONFIG_DOCKERCONFIGJSON and CONFIG_DOCKERCONFIGJSONPATH");
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool_or(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(value) => parse_bool(&value)
            .with_context(|| format!("{key} must be a boolean, got '{value}'")),
        Err(_) => Ok(default),
    }
}

/// Parse the boolean spellings accepted by the flag conventions this operator
/// is deployed with: `1/t/T/true/True/TRUE` and the `0`/`f`/`false`
/// counterparts. Anything else is a startup error rather than a silent
/// default.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "True" | "TRUE" => Some(true),
        "0" | "f" | "F" | "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Detect the namespace the operator runs in, from POD_NAMESPACE or the
/// mounted serviceaccount namespace file.
fn operator_namespace() -> Option<String> {
    if let Ok(ns) = env::var(NAMESPACE_ENV_VAR) {
        if !ns.is_empty() {
            return Some(ns);
        }
    }
    fs::read_to_string(NAMESPACE_PATH)
        .ok()
        .map(|ns| ns.trim().to_string())
        .filter(|ns| !ns.is_empty())
}
