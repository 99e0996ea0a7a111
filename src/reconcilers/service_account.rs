// Copyright 2026
// SPDX-License-Identifier: Apache-2.0

//! ServiceAccount reconciler - attaches the managed imagePullSecret to
//! configured ServiceAccounts, creating the Secret first.

use crate::classify::is_service_account_managed;
use crate::config::Config;
use crate::constants::ERROR_REQUEUE_SECS;
use crate::error::{PatcherError, Result};
use crate::kubernetes::fetch_namespace;
use crate::sync::{cleanup_pods_for_service_account, reconcile_image_pull_secret};
use futures::StreamExt;
use k8s_openapi::api::core::v1::{LocalObjectReference, ServiceAccount};
use kube::{
    api::{Patch, PatchParams},
    runtime::{
        controller::{Action, Config as ControllerConfig},
        Controller,
    },
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct ServiceAccountReconciler {
    client: Client,
    config: Config,
}

impl ServiceAccountReconciler {
    pub fn new(client: Client, config: Config) -> Self {
        Self { client, config }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let service_accounts: Api<ServiceAccount> = Api::all(self.client.clone());
        let concurrency = self.config.max_concurrent_reconciles;
        let context = Arc::new(self);

        Controller::new(service_accounts, WatcherConfig::default())
            .with_config(ControllerConfig::default().concurrency(concurrency))
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled ServiceAccount: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(
    service_account: Arc<ServiceAccount>,
    ctx: Arc<ServiceAccountReconciler>,
) -> Result<Action> {
    let name = service_account.name_any();
    let namespace = service_account.namespace().unwrap_or_default();
    let service_accounts: Api<ServiceAccount> =
        Api::namespaced(ctx.client.clone(), &namespace);

    // Re-fetch so a patch is never computed against a stale watch object.
    // A deleted ServiceAccount needs no compensating action.
    let Some(service_account) = service_accounts.get_opt(&name).await? else {
        return Ok(Action::await_change());
    };
    let Some(ns) = fetch_namespace(&ctx.client, &namespace).await? else {
        return Ok(Action::await_change());
    };

    if !is_service_account_managed(&ctx.config, &ns, &service_account) {
        debug!("ServiceAccount {}/{} is not managed, skipping", namespace, name);
        return Ok(Action::await_change());
    }

    // Ensure the imagePullSecret exists before attaching it
    reconcile_image_pull_secret(&ctx.client, &ctx.config, &ctx.config.secret_name, &namespace)
        .await?;

    if includes_image_pull_secret(&service_account, &ctx.config.secret_name) {
        return Ok(Action::await_change());
    }

    let mut references = service_account.image_pull_secrets.clone().unwrap_or_default();
    references.push(LocalObjectReference {
        name: ctx.config.secret_name.clone(),
    });
    let patch = serde_json::json!({ "imagePullSecrets": references });
    service_accounts
        .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;
    info!(
        "Attached imagePullSecret to ServiceAccount '{}' in namespace '{}'",
        name, namespace
    );

    if ctx.config.feature_delete_pods {
        cleanup_pods_for_service_account(&ctx.client, &namespace, &name).await?;
        info!("Cleaned up Pods belonging to ServiceAccount {}", name);
    }

    Ok(Action::await_change())
}

fn error_policy(
    _service_account: Arc<ServiceAccount>,
    error: &PatcherError,
    _ctx: Arc<ServiceAccountReconciler>,
) -> Action {
    error!("Reconciliation error: {}", error);
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
}

/// Check whether the ServiceAccount already references the secret by name.
fn includes_image_pull_secret(service_account: &ServiceAccount, secret_name: &str) -> bool {
    service_account
        .image_pull_secrets
        .as_ref()
        .is_some_and(|refs| {
            refs.iter()
                .any(|r| r.name == secret_name)
        })
}
