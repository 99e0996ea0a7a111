// Copyright 2026
// SPDX-License-Identifier: Apache-2.0

//! Secret reconciler - converges managed imagePullSecrets and resyncs them
//! when the mounted credential file changes.

use crate::classify::is_managed_secret;
use crate::config::Config;
use crate::constants::ERROR_REQUEUE_SECS;
use crate::credentials::wait_until_file_changes;
use crate::error::{PatcherError, Result};
use crate::kubernetes::fetch_namespace;
use crate::sync::{cleanup_pods_for_namespace, reconcile_image_pull_secret};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    api::ListParams,
    runtime::{controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct SecretReconciler {
    client: Client,
    config: Config,
}

impl SecretReconciler {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let secrets: Api<Secret> = Api::all(self.client.clone());
        let context = Arc::new(self);

        Controller::new(secrets, WatcherConfig::default())
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled secret: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(secret: Arc<Secret>, ctx: Arc<SecretReconciler>) -> Result<Action> {
    let name = secret.name_any();
    let namespace = secret.namespace().unwrap_or_default();

    // Namespace gone means the secret is being torn down with it
    let Some(ns) = fetch_namespace(&ctx.client, &namespace).await? else {
        return Ok(Action::await_change());
    };

    if !is_managed_secret(&ctx.config, &ns, &secret) {
        debug!("Secret {}/{} is not managed, skipping", namespace, name);
        return Ok(Action::await_change());
    }

    info!("Reconciling imagePullSecret in {}", namespace);
    let changed = reconcile_image_pull_secret(&ctx.client, &ctx.config, &name, &namespace).await?;

    if changed {
        cleanup_pods_for_namespace(&ctx.client, &ctx.config, &namespace).await?;
    }

    Ok(Action::await_change())
}

fn error_policy(_secret: Arc<Secret>, error: &PatcherError, _ctx: Arc<SecretReconciler>) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
}

/// Long-lived task that waits for the mounted credential file to change and
/// then resyncs every managed Secret in the cluster. Returns immediately when
/// no credential file is configured.
pub async fn watch_credential_file(client: Client, config: Config) -> anyhow::Result<()> {
    if config.docker_config_json_path.is_empty() {
        return Ok(());
    }

    info!(
        "Watching credential file {} for changes",
        config.docker_config_json_path
    );

    loop {
        wait_until_file_changes(&config.docker_config_json_path).await;
        info!("Credential file changed, resyncing managed secrets");

        if let Err(e) = resync_managed_secrets(&client, &config).await {
            error!("Failed to resync managed secrets: {}", e);
        }
    }
}

/// Full list scan applying the managed-secret classification, reconciling
/// each hit in place.
async fn resync_managed_secrets(client: &Client, config: &Config) -> Result<()> {
    let secrets: Api<Secret> = Api::all(client.clone());

    for secret in secrets.list(&ListParams::default()).await?.items {
        let name = secret.name_any();
        let namespace = secret.namespace().unwrap_or_default();

        let Some(ns) = fetch_namespace(client, &namespace).await? else {
            continue;
        };
        if !is_managed_secret(config, &ns, &secret) {
            continue;
        }

        let changed = reconcile_image_pull_secret(client, config, &name, &namespace).await?;
        if changed {
            cleanup_pods_for_namespace(client, config, &namespace).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::construct_image_pull_secret;
    use crate::test_utils::{
        namespace_json, pod_list_json, secret_json, secret_list_json, MockService,
    };
    use std::collections::BTreeMap;

    fn make_config() -> Config {
        Config {
            docker_config_json: r#"{"auths":{"example.com":{"auth":"Cg=="}}}"#.to_string(),
            docker_config_json_path: String::new(),
            secret_name: "global-imagepullsecret".to_string(),
            secret_namespace: "kube-system".to_string(),
            excluded_namespaces: "kube-*".to_string(),
            exclude_annotation: "pborn.eu/imagepullsecret-patcher-exclude".to_string(),
            service_accounts: "default".to_string(),
            feature_delete_pods: false,
            max_concurrent_reconciles: 1,
        }
    }

    #[tokio::test]
    async fn test_reconcile_recreates_deleted_managed_secret() {
        let config = make_config();
        let desired = construct_image_pull_secret(&config, "ns1").unwrap();
        let mock = MockService::new()
            .on_get("/api/v1/namespaces/ns1", 200, &namespace_json("ns1", None))
            .on_post("/api/v1/namespaces/ns1/secrets", 201, &secret_json(&desired))
            // no pods to clean up afterwards
            .on_get("/api/v1/namespaces/ns1/pods", 200, &pod_list_json(&[]));
        let client = mock.clone().into_client();

        let ctx = Arc::new(SecretReconciler::new(client, config));
        reconcile(Arc::new(desired), ctx).await.unwrap();

        assert!(mock
            .requests()
            .contains(&("POST".to_string(), "/api/v1/namespaces/ns1/secrets".to_string())));
    }

    #[tokio::test]
    async fn test_resync_converges_managed_secrets_only() {
        let config = make_config();
        let desired = construct_image_pull_secret(&config, "ns1").unwrap();

        // Adopted replica: configured name outside the source namespace,
        // data drifted, no managed-by annotation.
        let mut drifted = desired.clone();
        drifted.metadata.annotations = None;
        drifted.data = None;
        // Unrelated secret that must be left alone.
        let mut unrelated = construct_image_pull_secret(&config, "ns2").unwrap();
        unrelated.metadata.name = Some("other".to_string());
        unrelated.metadata.annotations = None;

        let mock = MockService::new()
            .on_get(
                "/api/v1/secrets",
                200,
                &secret_list_json(&[drifted.clone(), unrelated]),
            )
            .on_get("/api/v1/namespaces/ns1", 200, &namespace_json("ns1", None))
            .on_get("/api/v1/namespaces/ns2", 200, &namespace_json("ns2", None))
            .on_get(
                "/api/v1/namespaces/ns1/secrets/global-imagepullsecret",
                200,
                &secret_json(&drifted),
            )
            .on_patch(
                "/api/v1/namespaces/ns1/secrets/global-imagepullsecret",
                200,
                &secret_json(&desired),
            )
            .on_get("/api/v1/namespaces/ns1/pods", 200, &pod_list_json(&[]));
        let client = mock.clone().into_client();

        resync_managed_secrets(&client, &config).await.unwrap();

        let writes: Vec<_> = mock
            .requests()
            .into_iter()
            .filter(|(m, _)| m != "GET")
            .collect();
        assert_eq!(
            writes,
            vec![(
                "PATCH".to_string(),
                "/api/v1/namespaces/ns1/secrets/global-imagepullsecret".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_reconcile_skips_secret_in_excluded_namespace() {
        let config = make_config();
        let desired = construct_image_pull_secret(&config, "ns1").unwrap();
        let annotations = BTreeMap::from([(
            "pborn.eu/imagepullsecret-patcher-exclude".to_string(),
            "true".to_string(),
        )]);
        let mock = MockService::new().on_get(
            "/api/v1/namespaces/ns1",
            200,
            &namespace_json("ns1", Some(annotations)),
        );
        let client = mock.clone().into_client();

        let ctx = Arc::new(SecretReconciler::new(client, config));
        reconcile(Arc::new(desired), ctx).await.unwrap();

        assert!(!mock.requests().iter().any(|(m, _)| m != "GET"));
    }
}
