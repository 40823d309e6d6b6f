/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Parallel ranged download.

use crate::config::TransferConfig;
use crate::plan::{PartSlice, TransferPlan};
use bytes::Bytes;
use shoal_client::retry::RetryBudget;
use shoal_client::{Client, Error};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::Instrument;

/// Downloads `cfg.bucket`/`cfg.key` into `path`.
///
/// The object size comes from a HEAD probe; the destination file is
/// pre-sized before any worker starts, so workers write their parts to
/// disjoint regions with positional I/O. The file is fully assembled only
/// after every worker has joined.
pub async fn download_to_file(cfg: &TransferConfig, path: impl AsRef<Path>) -> Result<(), Error> {
    cfg.validate()?;
    let path = path.as_ref().to_path_buf();
    let client = cfg.client()?;
    let total_size = client.object_size(&cfg.bucket, &cfg.key).await?;
    let plan = TransferPlan::new(total_size, cfg.jobs, cfg.parts_per_job)?;
    tracing::debug!(
        total_size,
        jobs = plan.jobs,
        chunk_size = plan.chunk_size,
        "starting parallel download"
    );

    pre_size_file(path.clone(), total_size).await?;
    run_workers(cfg, &plan, Destination::File(path)).await?;
    Ok(())
}

/// Downloads `cfg.bucket`/`cfg.key` into `buffer[offset..]`; returns the
/// number of bytes written.
pub async fn download_to_buffer(
    cfg: &TransferConfig,
    buffer: &mut [u8],
    offset: usize,
) -> Result<usize, Error> {
    cfg.validate()?;
    let client = cfg.client()?;
    let total_size = client.object_size(&cfg.bucket, &cfg.key).await?;
    if offset + total_size as usize > buffer.len() {
        return Err(Error::Config(format!(
            "destination buffer too small: need {} bytes, have {}",
            offset + total_size as usize,
            buffer.len()
        )));
    }
    let plan = TransferPlan::new(total_size, cfg.jobs, cfg.parts_per_job)?;

    let parts = run_workers(cfg, &plan, Destination::Memory).await?;
    for (part_offset, data) in parts {
        let begin = offset + part_offset as usize;
        buffer[begin..begin + data.len()].copy_from_slice(&data);
    }
    Ok(total_size as usize)
}

enum Destination {
    File(PathBuf),
    Memory,
}

/// Fans the plan's jobs out over workers and joins them all; the first
/// failure is reported only after every sibling has finished.
async fn run_workers(
    cfg: &TransferConfig,
    plan: &TransferPlan,
    destination: Destination,
) -> Result<Vec<(u64, Bytes)>, Error> {
    let budget = RetryBudget::new(cfg.max_retries);
    let file = match &destination {
        Destination::File(path) => Some(path.clone()),
        Destination::Memory => None,
    };

    let mut results: Vec<Result<Vec<(u64, Bytes)>, Error>> = Vec::with_capacity(cfg.jobs as usize);
    if cfg.sync {
        for job in 0..cfg.jobs {
            results.push(run_job(cfg, plan, budget.clone(), file.clone(), job).await);
        }
    } else {
        let mut handles = Vec::with_capacity(cfg.jobs as usize);
        for job in 0..cfg.jobs {
            let cfg = cfg.clone();
            let plan = plan.clone();
            let budget = budget.clone();
            let file = file.clone();
            handles.push(tokio::spawn(
                async move { run_job(&cfg, &plan, budget, file, job).await }
                    .instrument(tracing::debug_span!("download-job", job)),
            ));
        }
        for handle in handles {
            results.push(handle.await.map_err(|e| {
                Error::Transport(format!("download worker panicked: {e}"))
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
    match first_error {
        Some(err) => Err(err),
        None => Ok(parts),
    }
}

/// One worker: fetches its parts sequentially. File destinations are
/// written in place at each part's offset; memory destinations collect the
/// bytes for the caller to assemble.
async fn run_job(
    cfg: &TransferConfig,
    plan: &TransferPlan,
    budget: RetryBudget,
    file: Option<PathBuf>,
    job: u32,
) -> Result<Vec<(u64, Bytes)>, Error> {
    let parts = plan.parts_for_job(job);
    if parts.is_empty() {
        return Ok(Vec::new());
    }
    let client = cfg.client()?;
    let mut collected = Vec::new();
    for part in parts {
        let data = fetch_part(&client, cfg, &budget, &part).await?;
        match &file {
            Some(path) => {
                shoal_client::http::write_file_slice(path.clone(), part.offset, data).await?;
            }
            None => collected.push((part.offset, data)),
        }
    }
    Ok(collected)
}

async fn fetch_part(
    client: &Client,
    cfg: &TransferConfig,
    budget: &RetryBudget,
    part: &PartSlice,
) -> Result<Bytes, Error> {
    let range = Some((part.offset, part.offset + part.size - 1));
    loop {
        match client.get_object(&cfg.bucket, &cfg.key, range).await {
            Ok(data) if data.len() as u64 == part.size => return Ok(data),
            Ok(data) => {
                let err = Error::Integrity(format!(
                    "ranged read returned {} bytes, expected {}",
                    data.len(),
                    part.size
                ));
                if !budget.try_consume() {
                    return Err(err);
                }
                tracing::debug!(part.part_number, error = %err, "retrying part download");
            }
            Err(err) if err.is_retryable() && budget.try_consume() => {
                tracing::debug!(part.part_number, error = %err, "retrying part download");
            }
            Err(err) => return Err(err),
        }
    }
}

/// `seek(total_size - 1)` and write one byte, so every worker can write to
/// its own region concurrently.
async fn pre_size_file(path: PathBuf, total_size: u64) -> Result<(), Error> {
    tokio::task::spawn_blocking(move || -> Result<(), std::io::Error> {
        let mut file = std::fs::File::create(&path)?;
        if total_size > 0 {
            file.seek(SeekFrom::Start(total_size - 1))?;
            file.write_all(&[0u8])?;
        }
        Ok(())
    })
    .await
    .map_err(|e| Error::Transport(format!("file create task failed: {e}")))??;
    Ok(())
}
