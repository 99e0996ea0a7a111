// Copyright 2026
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes reconcilers that react to watch events.

pub mod secret;
pub mod service_account;

pub use secret::{watch_credential_file, SecretReconciler};
pub use service_account::ServiceAccountReconciler;
