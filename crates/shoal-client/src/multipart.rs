/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Multipart upload coordinator.
//!
//! ```text
//! Start ──create──> Active ──upload_part*──> Active ──complete──> Done
//!                      │                        │
//!                      └──────── abort ─────────┴──> Aborted
//! ```
//!
//! The Active state holds the upload id and an append-only list of
//! `(part number, ETag)` entries; entries are appended as responses arrive
//! and sorted only when the completion manifest is built. On a terminal
//! part failure the error propagates without an automatic abort: the caller
//! may resume with the same upload id, and must call [`MultipartUpload::abort`]
//! when it cannot. An upload that is neither completed nor aborted leaks
//! server-side resources.

use crate::api::Client;
use crate::error::Error;
use crate::http::FileIoMode;
use crate::retry::RetryBudget;
use crate::{ETag, MetadataMap, UploadId};
use bytes::Bytes;
use std::path::Path;

/// An in-flight multipart upload.
#[derive(Debug)]
pub struct MultipartUpload {
    client: Client,
    bucket: String,
    key: String,
    upload_id: UploadId,
    parts: Vec<(u32, ETag)>,
    budget: RetryBudget,
}

impl MultipartUpload {
    /// Issues `CreateMultipartUpload` and enters the Active state.
    ///
    /// `max_retries` bounds the total number of part retries for this
    /// upload.
    pub async fn start(
        client: &Client,
        bucket: &str,
        key: &str,
        metadata: &MetadataMap,
        max_retries: u32,
    ) -> Result<Self, Error> {
        Self::start_with_budget(client, bucket, key, metadata, RetryBudget::new(max_retries)).await
    }

    /// Like [`MultipartUpload::start`], with an externally shared retry
    /// budget (used by parallel transfers, where one budget spans all
    /// workers).
    pub async fn start_with_budget(
        client: &Client,
        bucket: &str,
        key: &str,
        metadata: &MetadataMap,
        budget: RetryBudget,
    ) -> Result<Self, Error> {
        let upload_id = client
            .create_multipart_upload(bucket, key, metadata, Default::default())
            .await?;
        tracing::debug!(bucket, key, upload_id, "multipart upload started");
        Ok(Self {
            client: client.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
            parts: Vec::new(),
            budget,
        })
    }

    /// Adopts an existing upload id, e.g. to resume after a failure.
    pub fn resume(
        client: &Client,
        bucket: &str,
        key: &str,
        upload_id: UploadId,
        budget: RetryBudget,
    ) -> Self {
        Self {
            client: client.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            upload_id,
            parts: Vec::new(),
            budget,
        }
    }

    /// The server-issued upload id
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Parts uploaded so far, in arrival order
    pub fn parts(&self) -> &[(u32, ETag)] {
        &self.parts
    }

    /// Retries consumed so far
    pub fn retries_used(&self) -> u32 {
        self.budget.used()
    }

    /// Uploads one part from a buffer; returns the part's ETag.
    /// `part_number` is 1-based.
    pub async fn upload_part(
        &mut self,
        part_number: u32,
        data: Bytes,
        payload_hash: Option<&str>,
    ) -> Result<ETag, Error> {
        loop {
            let attempt = self
                .client
                .upload_part(
                    &self.bucket,
                    &self.key,
                    &self.upload_id,
                    part_number,
                    data.clone(),
                    payload_hash,
                )
                .await;
            if let Some(result) = self.settle(part_number, attempt) {
                return result;
            }
        }
    }

    /// Uploads one part from a file range; returns the part's ETag.
    pub async fn upload_file_part(
        &mut self,
        part_number: u32,
        path: impl AsRef<Path>,
        offset: u64,
        length: u64,
        mode: FileIoMode,
    ) -> Result<ETag, Error> {
        let path = path.as_ref();
        loop {
            let attempt = self
                .client
                .upload_file_part(
                    path,
                    offset,
                    length,
                    &self.bucket,
                    &self.key,
                    &self.upload_id,
                    part_number,
                    mode,
                )
                .await;
            if let Some(result) = self.settle(part_number, attempt) {
                return result;
            }
        }
    }

    /// Applies the retry policy to one attempt: `Some` settles the part,
    /// `None` means retry. Transport failures, 5xx and responses missing the
    /// ETag all consume the shared budget; retries are immediate.
    fn settle(
        &mut self,
        part_number: u32,
        attempt: Result<ETag, Error>,
    ) -> Option<Result<ETag, Error>> {
        match attempt {
            Ok(etag) => {
                self.parts.push((part_number, etag.clone()));
                Some(Ok(etag))
            }
            Err(err) if err.is_retryable() || matches!(err, Error::Integrity(_)) => {
                if self.budget.try_consume() {
                    tracing::debug!(part_number, error = %err, "retrying part upload");
                    None
                } else {
                    Some(Err(err))
                }
            }
            Err(err) => Some(Err(err)),
        }
    }

    /// Sorts the collected parts ascending and issues
    /// `CompleteMultipartUpload`; returns the object's ETag.
    pub async fn complete(self) -> Result<ETag, Error> {
        self.client
            .complete_multipart_upload(&self.bucket, &self.key, &self.upload_id, &self.parts)
            .await
    }

    /// Issues `AbortMultipartUpload`, releasing the upload id and every
    /// uploaded part.
    pub async fn abort(self) -> Result<(), Error> {
        self.client
            .abort_multipart_upload(&self.bucket, &self.key, &self.upload_id)
            .await
    }
}
