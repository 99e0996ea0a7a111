// Copyright 2026
// SPDX-License-Identifier: Apache-2.0

//! Convergence logic for managed imagePullSecrets and remediation of Pods
//! stuck on image-pull failures.

pub mod pods;
pub mod secrets;

pub use pods::{cleanup_pods_for_namespace, cleanup_pods_for_service_account};
pub use secrets::{construct_image_pull_secret, reconcile_image_pull_secret};
