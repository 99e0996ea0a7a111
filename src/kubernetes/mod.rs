// Copyright 2026
// SPDX-License-Identifier: Apache-2.0

//! Lookup helpers over the Kubernetes API. Not-found is surfaced as `None`
//! so callers can treat a vanished object as a benign no-op.

use crate::error::Result;
use k8s_openapi::api::core::v1::{Namespace, ServiceAccount};
use kube::{Api, Client};

pub async fn fetch_namespace(client: &Client, name: &str) -> Result<Option<Namespace>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    Ok(namespaces.get_opt(name).await?)
}

pub async fn fetch_service_account(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<Option<ServiceAccount>> {
    let service_accounts: Api<ServiceAccount> = Api::namespaced(client.clone(), namespace);
    Ok(service_accounts.get_opt(name).await?)
}
