// Copyright 2026
// SPDX-License-Identifier: Apache-2.0

//! Construction and convergence of the managed imagePullSecret.

use crate::config::Config;
use crate::constants::{
    ANNOTATION_APP_NAME, ANNOTATION_MANAGED_BY, DOCKER_CONFIG_JSON_KEY,
    SECRET_TYPE_DOCKER_CONFIG_JSON,
};
use crate::credentials::docker_config_json;
use crate::error::{PatcherError, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{
    api::{ObjectMeta, Patch, PatchParams, PostParams},
    Api, Client, ResourceExt,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Build the desired managed Secret for a namespace. The credential is
/// resolved on every call so file-backed updates propagate.
pub fn construct_image_pull_secret(config: &Config, namespace: &str) -> Result<Secret> {
    let credential = docker_config_json(config)?;

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(config.secret_name.clone()),
            namespace: Some(namespace.to_string()),
            annotations: Some(BTreeMap::from([(
                ANNOTATION_MANAGED_BY.to_string(),
                ANNOTATION_APP_NAME.to_string(),
            )])),
            ..Default::default()
        },
        data: Some(BTreeMap::from([(
            DOCKER_CONFIG_JSON_KEY.to_string(),
            ByteString(credential.into_bytes()),
        )])),
        type_: Some(SECRET_TYPE_DOCKER_CONFIG_JSON.to_string()),
        ..Default::default()
    })
}

/// Converge the Secret `name` in `namespace` to the desired state.
///
/// Creates the Secret when absent, patches annotations and data when they
/// drift. Returns whether a write was issued, so callers can decide whether
/// to trigger Pod remediation.
pub async fn reconcile_image_pull_secret(
    client: &Client,
    config: &Config,
    name: &str,
    namespace: &str,
) -> Result<bool> {
    let desired = construct_image_pull_secret(config, namespace)?;
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);

    let Some(live) = secrets.get_opt(name).await? else {
        secrets.create(&PostParams::default(), &desired).await?;
        info!("Created imagePullSecret {}/{}", namespace, desired.name_any());
        return Ok(true);
    };

    if live.metadata.annotations == desired.metadata.annotations && live.data == desired.data {
        debug!("imagePullSecret {}/{} is up to date", namespace, name);
        return Ok(false);
    }

    let patch = secret_merge_patch(&live, &desired)?;
    secrets
        .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    info!("Patched imagePullSecret {}/{}", namespace, name);
    Ok(true)
}

/// Merge patch replacing the live annotations and data wholesale. Live keys
/// absent from the desired maps are tombstoned with `null`, since the managed
/// Secret is fully owned by the operator.
fn secret_merge_patch(live: &Secret, desired: &Secret) -> Result<Value> {
    let annotations = map_patch(
        live.metadata.annotations.as_ref(),
        desired.metadata.annotations.as_ref(),
    )?;
    let data = map_patch(live.data.as_ref(), desired.data.as_ref())?;

    Ok(serde_json::json!({
        "metadata": { "annotations": annotations },
        "data": data,
    }))
}

fn map_patch<T: Serialize>(
    live: Option<&BTreeMap<String, T>>,
    desired: Option<&BTreeMap<String, T>>,
) -> Result<Value> {
    let mut patch = serde_json::Map::new();
    if let Some(desired) = desired {
        for (key, value) in desired {
            let value = serde_json::to_value(value)
                .map_err(|e| PatcherError::SecretError(format!("failed to serialize patch: {e}")))?;
            patch.insert(key.clone(), value);
        }
    }
    if let Some(live) = live {
        for key in live.keys() {
            if !desired.is_some_and(|d| d.contains_key(key)) {
                patch.insert(key.clone(), Value::Null);
            }
        }
    }
    Ok(Value::Object(patch))
}
