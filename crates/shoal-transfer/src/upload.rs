/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Parallel multipart upload.

use crate::config::{TransferConfig, TransferSource};
use crate::plan::TransferPlan;
use shoal_client::config::metadata_headers;
use shoal_client::multipart::MultipartUpload;
use shoal_client::retry::RetryBudget;
use shoal_client::{ETag, Error};
use std::path::Path;
use tracing::Instrument;

/// Uploads `source` to `cfg.bucket`/`cfg.key`.
///
/// `CreateMultipartUpload` runs once before the fan-out; each job's worker
/// then uploads its parts sequentially and the collected ETags are completed
/// in ascending part-number order. With one job and one part per job the
/// multipart protocol is bypassed in favor of a single `PUT`.
///
/// On a terminal worker failure the remaining workers are left to finish,
/// the first error is returned, and the upload is not aborted: the caller
/// decides between resuming and `AbortMultipartUpload`.
pub async fn upload(cfg: &TransferConfig, source: TransferSource) -> Result<ETag, Error> {
    cfg.validate()?;
    let total_size = source_size(&source)?;

    if cfg.jobs == 1 && cfg.parts_per_job == 1 {
        return simple_put(cfg, source).await;
    }

    let plan = TransferPlan::new(total_size, cfg.jobs, cfg.parts_per_job)?;
    tracing::debug!(
        total_size,
        jobs = plan.jobs,
        parts_per_job = plan.parts_per_job,
        chunk_size = plan.chunk_size,
        "starting parallel upload"
    );

    let client = cfg.client()?;
    let budget = RetryBudget::new(cfg.max_retries);
    let upload_id = client
        .create_multipart_upload(&cfg.bucket, &cfg.key, &cfg.metadata, Default::default())
        .await?;

    let mut results: Vec<Result<Vec<(u32, ETag)>, Error>> = Vec::with_capacity(cfg.jobs as usize);
    if cfg.sync {
        for job in 0..cfg.jobs {
            results.push(run_job(cfg, &plan, &upload_id, budget.clone(), &source, job).await);
        }
    } else {
        let mut handles = Vec::with_capacity(cfg.jobs as usize);
        for job in 0..cfg.jobs {
            let cfg = cfg.clone();
            let plan = plan.clone();
            let upload_id = upload_id.clone();
            let budget = budget.clone();
            let source = source.clone();
            handles.push(tokio::spawn(
                async move { run_job(&cfg, &plan, &upload_id, budget, &source, job).await }
                    .instrument(tracing::debug_span!("upload-job", job)),
            ));
        }
        // join every worker before reporting the first failure
        for handle in handles {
            results.push(handle.await.map_err(|e| {
                Error::Transport(format!("upload worker panicked: {e}"))
            })?);
        }
    }

    let mut parts = Vec::new();
    let mut first_error = None;
    for result in results {
        match result {
            Ok(mut job_parts) => parts.append(&mut job_parts),
            Err(err) if first_error.is_none() => first_error = Some(err),
            Err(_) => {}
        }
    }
    if let Some(err) = first_error {
        return Err(err);
    }

    client
        .complete_multipart_upload(&cfg.bucket, &cfg.key, &upload_id, &parts)
        .await
}

/// One worker: its own client on a random endpoint, its parts in sequence.
async fn run_job(
    cfg: &TransferConfig,
    plan: &TransferPlan,
    upload_id: &str,
    budget: RetryBudget,
    source: &TransferSource,
    job: u32,
) -> Result<Vec<(u32, ETag)>, Error> {
    let parts = plan.parts_for_job(job);
    if parts.is_empty() {
        return Ok(Vec::new());
    }
    let client = cfg.client()?;
    let mut upload = MultipartUpload::resume(&client, &cfg.bucket, &cfg.key, upload_id.to_string(), budget);
    for part in parts {
        tracing::trace!(part.part_number, part.offset, part.size, "uploading part");
        match source {
            TransferSource::File(path) => {
                upload
                    .upload_file_part(
                        part.part_number,
                        path,
                        part.offset,
                        part.size,
                        cfg.file_io_mode,
                    )
                    .await?;
            }
            TransferSource::Bytes(data) => {
                let slice =
                    data.slice(part.offset as usize..(part.offset + part.size) as usize);
                // a whole-object payload hash cannot describe individual
                // parts; multipart bodies are signed as UNSIGNED-PAYLOAD
                upload.upload_part(part.part_number, slice, None).await?;
            }
        }
    }
    Ok(upload.parts().to_vec())
}

async fn simple_put(cfg: &TransferConfig, source: TransferSource) -> Result<ETag, Error> {
    let client = cfg.client()?;
    let headers = metadata_headers(&cfg.metadata);
    match source {
        TransferSource::Bytes(data) => {
            client
                .put_object(
                    &cfg.bucket,
                    &cfg.key,
                    data,
                    headers,
                    cfg.payload_hash.as_deref(),
                )
                .await
        }
        TransferSource::File(path) => {
            client
                .put_file_object(
                    &path,
                    0,
                    None,
                    &cfg.bucket,
                    &cfg.key,
                    headers,
                    cfg.file_io_mode,
                )
                .await
        }
    }
}

fn source_size(source: &TransferSource) -> Result<u64, Error> {
    match source {
        TransferSource::Bytes(data) if data.is_empty() => {
            Err(Error::Config("zero size upload buffer".to_string()))
        }
        TransferSource::Bytes(data) => Ok(data.len() as u64),
        TransferSource::File(path) => file_size(path),
    }
}

fn file_size(path: &Path) -> Result<u64, Error> {
    let meta = std::fs::metadata(path)
        .map_err(|e| Error::Config(format!("cannot open file {}: {e}", path.display())))?;
    if meta.len() == 0 {
        return Err(Error::Config(format!("file {} is empty", path.display())));
    }
    Ok(meta.len())
}
