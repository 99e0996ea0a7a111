// Copyright 2026
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::{info, warn};

use imagepullsecret_patcher::config::Config;
use imagepullsecret_patcher::reconcilers::{
    watch_credential_file, SecretReconciler, ServiceAccountReconciler,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting imagepullsecret-patcher operator");

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: secret_name={}, secret_namespace={}, excluded_namespaces={}",
        config.secret_name, config.secret_namespace, config.excluded_namespaces
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let secret_reconciler = SecretReconciler::new(client.clone(), config.clone());
    let service_account_reconciler = ServiceAccountReconciler::new(client.clone(), config.clone());

    info!("Starting reconcilers...");

    // Run both reconcilers and the credential file watcher concurrently
    tokio::try_join!(
        secret_reconciler.run(),
        service_account_reconciler.run(),
        watch_credential_file(client, config),
    )?;

    // This should never be reached as reconcilers run forever
    warn!("All reconcilers stopped unexpectedly");
    Ok(())
}
