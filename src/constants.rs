// Copyright 2026
// SPDX-License-Identifier: Apache-2.0

/// Annotation stamped onto every managed Secret
pub const ANNOTATION_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
/// Value of the managed-by annotation identifying this operator
pub const ANNOTATION_APP_NAME: &str = "imagepullsecret-patcher";

/// Data key of a dockerconfigjson Secret
pub const DOCKER_CONFIG_JSON_KEY: &str = ".dockerconfigjson";
/// Secret type for registry credentials
pub const SECRET_TYPE_DOCKER_CONFIG_JSON: &str = "kubernetes.io/dockerconfigjson";

/// Container waiting reasons treated as an image-pull failure
pub mod waiting_reasons {
    pub const ERR_IMAGE_PULL: &str = "ErrImagePull";
    pub const IMAGE_PULL_BACK_OFF: &str = "ImagePullBackOff";
}

/// Credential file polling configuration
pub mod file_watch {
    /// Interval between mtime checks in seconds
    pub const POLL_INTERVAL_SECS: u64 = 1;
}

/// Requeue delay after a failed reconcile, in seconds
pub const ERROR_REQUEUE_SECS: u64 = 60;
