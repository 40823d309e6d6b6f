/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Client for S3-compatible object storage services (AWS S3, Ceph RGW,
//! MinIO). Provides one method per REST operation, a multipart upload
//! coordinator, credentials and endpoint handling, and an injectable HTTP
//! transport for testing without a live server.
//!
//! # Crate Features
//!
//! - `test-util`: Enables an in-memory object store double. DO NOT ENABLE IN
//!   PRODUCTION.

#![warn(rustdoc::missing_crate_level_docs, unreachable_pub, rust_2018_idioms)]

pub mod api;
pub mod bucket;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod profile;
pub mod retry;
pub mod types;
pub mod xml;

pub(crate) mod request;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use crate::api::{Client, SendParams};
pub use crate::config::{Credentials, Endpoint, Scheme};
pub use crate::error::Error;
pub use shoal_sigv4::http_request::DEFAULT_REGION;

use std::collections::BTreeMap;

/// HTTP headers: case-insensitive names stored lowercase, ascending order.
pub type Headers = BTreeMap<String, String>;

/// Query parameters, ordered by key.
pub type Params = BTreeMap<String, String>;

/// Server-issued entity tag with surrounding quotes stripped.
pub type ETag = String;

/// Opaque server-issued multipart upload token.
pub type UploadId = String;

/// User metadata, translated to `x-amz-meta-*` headers on upload.
pub type MetadataMap = BTreeMap<String, String>;

/// Object tags, as used by the `?tagging` subresource.
pub type TagMap = BTreeMap<String, String>;
