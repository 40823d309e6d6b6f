/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Parallel transfer engine for S3-compatible object stores.
//!
//! An object is partitioned into per-job slices and each slice into parts;
//! one worker per job uploads or downloads its parts sequentially against a
//! randomly selected endpoint from the configured pool. All workers share a
//! single retry budget. Setting `sync` runs the same code path on the
//! calling task, one worker after another, with identical ordering and retry
//! semantics.

#![warn(rustdoc::missing_crate_level_docs, unreachable_pub, rust_2018_idioms)]

pub(crate) const MEBI_BYTE: u64 = 1024 * 1024;

/// Minimum size of a non-final part on most servers (AWS: 5 MiB). The engine
/// does not enforce it; configure `jobs × parts_per_job` so that parts stay
/// above the target server's limit.
pub const MIN_PART_SIZE: u64 = 5 * MEBI_BYTE;

mod config;
mod download;
mod plan;
mod upload;

pub use config::{TransferConfig, TransferSource};
pub use download::{download_to_buffer, download_to_file};
pub use plan::{PartSlice, TransferPlan};
pub use upload::upload;
