// Copyright 2026
// SPDX-License-Identifier: Apache-2.0
pub mod classify;
pub mod config;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod kubernetes;
pub mod reconcilers;
pub mod sync;

#[cfg(test)]
pub mod test_utils;
