/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use bytes::Bytes;
use shoal_client::config::random_endpoint;
use shoal_client::http::{FileIoMode, HttpTransport};
use shoal_client::{Client, Credentials, Endpoint, Error, MetadataMap};
use std::path::PathBuf;
use std::sync::Arc;

/// What an upload reads from: a local file or an in-memory buffer.
#[derive(Debug, Clone)]
pub enum TransferSource {
    /// Read from a file on disk.
    File(PathBuf),
    /// Read from memory.
    Bytes(Bytes),
}

/// Configuration shared by parallel uploads and downloads.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Credentials; `None` sends anonymous requests.
    pub credentials: Option<Credentials>,
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Pool of equivalent endpoints; each worker picks one at random.
    pub endpoints: Vec<Endpoint>,
    /// Number of parallel worker tasks.
    pub jobs: u32,
    /// Parts uploaded or downloaded sequentially inside each job.
    pub parts_per_job: u32,
    /// Total retries allowed across all workers of this transfer.
    pub max_retries: u32,
    /// Precomputed lowercase hex SHA-256 of the payload; `UNSIGNED-PAYLOAD`
    /// is signed when absent.
    pub payload_hash: Option<String>,
    /// User metadata attached on upload.
    pub metadata: MetadataMap,
    /// Signing region.
    pub region: String,
    /// Read strategy for file-backed parts.
    pub file_io_mode: FileIoMode,
    /// Run workers sequentially on the calling task.
    pub sync: bool,
    /// Injected transport; defaults to the process-wide one.
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl TransferConfig {
    /// Creates a configuration with one job, one part per job, one retry,
    /// and the default region.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, endpoints: Vec<Endpoint>) -> Self {
        Self {
            credentials: None,
            bucket: bucket.into(),
            key: key.into(),
            endpoints,
            jobs: 1,
            parts_per_job: 1,
            max_retries: 1,
            payload_hash: None,
            metadata: MetadataMap::new(),
            region: shoal_client::DEFAULT_REGION.to_string(),
            file_io_mode: FileIoMode::default(),
            sync: false,
            transport: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.endpoints.is_empty() {
            return Err(Error::Config("no endpoints specified".to_string()));
        }
        if self.jobs < 1 {
            return Err(Error::Config(format!(
                "number of jobs must be at least one, {} provided",
                self.jobs
            )));
        }
        if self.parts_per_job < 1 {
            return Err(Error::Config(format!(
                "parts per job must be at least one, {} provided",
                self.parts_per_job
            )));
        }
        Ok(())
    }

    /// A client bound to a random endpoint from the pool.
    pub(crate) fn client(&self) -> Result<Client, Error> {
        let endpoint = random_endpoint(&self.endpoints).clone();
        let mut builder = Client::builder()
            .maybe_credentials(self.credentials.clone())
            .endpoint(endpoint)
            .region(self.region.clone());
        if let Some(transport) = &self.transport {
            builder = builder.transport(transport.clone());
        }
        builder.build()
    }
}
