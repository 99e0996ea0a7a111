// Copyright 2026
// SPDX-License-Identifier: Apache-2.0

//! Predicates deciding which namespaces, ServiceAccounts, and Secrets this
//! operator manages. All functions are pure and degrade to `false` when
//! metadata is missing.

use crate::config::Config;
use crate::constants::{ANNOTATION_APP_NAME, ANNOTATION_MANAGED_BY};
use glob::Pattern;
use k8s_openapi::api::core::v1::{Namespace, Secret, ServiceAccount};
use kube::api::ObjectMeta;
use kube::ResourceExt;

/// Check whether `value` equals or glob-matches any entry of a
/// comma-separated pattern list. Empty segments never match.
pub fn is_list_match(value: &str, patterns: &str) -> bool {
    patterns
        .split(',')
        .filter(|p| !p.is_empty())
        .any(|p| {
            p == value
                || Pattern::new(p)
                    .map(|g| g.matches(value))
                    .unwrap_or(false)
        })
}

/// Exact string match on a single annotation key.
pub fn has_annotation(metadata: &ObjectMeta, key: &str, value: &str) -> bool {
    metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(key))
        .is_some_and(|v| v == value)
}

/// A namespace is excluded if its name matches the excluded pattern list or
/// it carries the exclude annotation set to "true".
pub fn is_namespace_excluded(config: &Config, namespace: &Namespace) -> bool {
    if is_list_match(&namespace.name_any(), &config.excluded_namespaces) {
        return true;
    }
    has_annotation(&namespace.metadata, &config.exclude_annotation, "true")
}

pub fn is_service_account_excluded(config: &Config, service_account: &ServiceAccount) -> bool {
    has_annotation(&service_account.metadata, &config.exclude_annotation, "true")
}

/// A ServiceAccount is managed iff its namespace is not excluded, it is not
/// itself excluded, and its name is in the configured list.
pub fn is_service_account_managed(
    config: &Config,
    namespace: &Namespace,
    service_account: &ServiceAccount,
) -> bool {
    if is_namespace_excluded(config, namespace)
        || is_service_account_excluded(config, service_account)
    {
        return false;
    }
    is_list_match(&service_account.name_any(), &config.service_accounts)
}

/// A Secret is managed iff its namespace is not excluded and it either
/// carries the managed-by annotation or matches the configured secret name
/// outside the source-of-truth namespace. The latter clause adopts replicas
/// that predate the annotation.
pub fn is_managed_secret(config: &Config, namespace: &Namespace, secret: &Secret) -> bool {
    if is_namespace_excluded(config, namespace) {
        return false;
    }
    if has_annotation(&secret.metadata, ANNOTATION_MANAGED_BY, ANNOTATION_APP_NAME) {
        return true;
    }
    secret.name_any() == config.secret_name
        && secret.namespace().unwrap_or_default() != config.secret_namespace
}
