// Copyright 2026
// SPDX-License-Identifier: Apache-2.0

//! Deletion of Pods stuck in an image-pull failure so their owning
//! controller reschedules them with the corrected credential.

use crate::classify::is_service_account_managed;
use crate::config::Config;
use crate::constants::waiting_reasons::{ERR_IMAGE_PULL, IMAGE_PULL_BACK_OFF};
use crate::error::Result;
use crate::kubernetes::{fetch_namespace, fetch_service_account};
use k8s_openapi::api::core::v1::Pod;
use kube::{
    api::{DeleteParams, ListParams},
    Api, Client, ResourceExt,
};
use tracing::{debug, info};

/// True when any container of the Pod is waiting with an image-pull failure
/// reason.
pub fn is_stuck_image_pull(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .is_some_and(|statuses| {
            statuses.iter().any(|cs| {
                cs.state
                    .as_ref()
                    .and_then(|s| s.waiting.as_ref())
                    .and_then(|w| w.reason.as_deref())
                    .is_some_and(|reason| {
                        reason == ERR_IMAGE_PULL || reason == IMAGE_PULL_BACK_OFF
                    })
            })
        })
}

fn pod_service_account(pod: &Pod) -> &str {
    pod.spec
        .as_ref()
        .and_then(|s| s.service_account_name.as_deref())
        .unwrap_or_default()
}

/// Delete Pods of one ServiceAccount that are stuck in an image-pull failure.
/// Ran after freshly attaching the imagePullSecret to that ServiceAccount.
pub async fn cleanup_pods_for_service_account(
    client: &Client,
    namespace: &str,
    service_account: &str,
) -> Result<()> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);

    for pod in pods.list(&ListParams::default()).await?.items {
        if pod_service_account(&pod) != service_account || !is_stuck_image_pull(&pod) {
            continue;
        }
        delete_pod(&pods, &pod).await?;
    }

    Ok(())
}

/// Namespace-wide variant used when the Secret itself changed: re-derives
/// managedness per Pod, so only Pods of managed ServiceAccounts are deleted.
pub async fn cleanup_pods_for_namespace(
    client: &Client,
    config: &Config,
    namespace: &str,
) -> Result<()> {
    let pods: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let Some(ns) = fetch_namespace(client, namespace).await? else {
        return Ok(());
    };

    for pod in pods.list(&ListParams::default()).await?.items {
        if !is_stuck_image_pull(&pod) {
            continue;
        }
        let Some(sa) = fetch_service_account(client, namespace, pod_service_account(&pod)).await?
        else {
            continue;
        };
        if !is_service_account_managed(config, &ns, &sa) {
            debug!(
                "Skipping stuck Pod {}/{}: ServiceAccount not managed",
                namespace,
                pod.name_any()
            );
            continue;
        }
        delete_pod(&pods, &pod).await?;
    }

    Ok(())
}

async fn delete_pod(pods: &Api<Pod>, pod: &Pod) -> Result<()> {
    let name = pod.name_any();
    info!(
        "Deleting Pod {}/{} stuck in image-pull failure",
        pod.namespace().unwrap_or_default(),
        name
    );
    match pods.delete(&name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        // Already gone, nothing to remediate
        Err(kube::Error::Api(err)) if err.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}
