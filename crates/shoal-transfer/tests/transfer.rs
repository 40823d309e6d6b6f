/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! End-to-end engine tests against the in-memory object store double.

use bytes::Bytes;
use shoal_client::http::Method;
use shoal_client::test_util::{FaultKind, InMemoryStore};
use shoal_client::{Client, Credentials, Endpoint, Error, Headers};
use shoal_transfer::{download_to_buffer, download_to_file, upload, TransferConfig, TransferSource};
use std::io::Write;
use std::sync::Arc;

fn endpoints() -> Vec<Endpoint> {
    vec![
        "http://10.0.0.1:9000".parse().unwrap(),
        "http://10.0.0.2:9000".parse().unwrap(),
    ]
}

fn config(store: &Arc<InMemoryStore>, jobs: u32, parts_per_job: u32) -> TransferConfig {
    let mut cfg = TransferConfig::new("bucket1", "large.bin", endpoints());
    cfg.credentials = Some(Credentials::new("access", "secret").unwrap());
    cfg.jobs = jobs;
    cfg.parts_per_job = parts_per_job;
    cfg.max_retries = 2;
    cfg.transport = Some(store.clone());
    cfg
}

async fn store_with_bucket() -> (Arc<InMemoryStore>, Client) {
    let store = Arc::new(InMemoryStore::new());
    let client = Client::builder()
        .credentials(Credentials::new("access", "secret").unwrap())
        .endpoint("http://10.0.0.1:9000".parse().unwrap())
        .transport(store.clone())
        .build()
        .unwrap();
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();
    (store, client)
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

#[tokio::test]
async fn file_round_trip_with_odd_size() {
    let (store, _) = store_with_bucket().await;
    let data = patterned(380_007);

    let mut source = tempfile::NamedTempFile::new().unwrap();
    source.write_all(&data).unwrap();

    let cfg = config(&store, 3, 2);
    let etag = upload(&cfg, TransferSource::File(source.path().to_path_buf()))
        .await
        .unwrap();
    assert!(etag.ends_with("-6"), "six parts expected, got etag {etag}");
    assert_eq!(data, store.object("bucket1", "large.bin").unwrap());

    let dest = tempfile::NamedTempFile::new().unwrap();
    download_to_file(&cfg, dest.path()).await.unwrap();
    assert_eq!(data, std::fs::read(dest.path()).unwrap());
}

#[tokio::test]
async fn buffer_round_trip_across_partitionings() {
    let (store, _) = store_with_bucket().await;
    let data = patterned(123_457);

    for (jobs, parts_per_job) in [(1u32, 4u32), (4, 3), (7, 1)] {
        let cfg = config(&store, jobs, parts_per_job);
        upload(&cfg, TransferSource::Bytes(Bytes::from(data.clone())))
            .await
            .unwrap();

        let mut buffer = vec![0u8; data.len()];
        let written = download_to_buffer(&cfg, &mut buffer, 0).await.unwrap();
        assert_eq!(data.len(), written);
        assert_eq!(data, buffer, "jobs={jobs} parts_per_job={parts_per_job}");
    }
}

#[tokio::test]
async fn sync_mode_produces_identical_results() {
    let (store, _) = store_with_bucket().await;
    let data = patterned(50_021);

    let mut cfg = config(&store, 3, 2);
    cfg.sync = true;
    upload(&cfg, TransferSource::Bytes(Bytes::from(data.clone())))
        .await
        .unwrap();
    assert_eq!(data, store.object("bucket1", "large.bin").unwrap());

    let mut buffer = vec![0u8; data.len()];
    download_to_buffer(&cfg, &mut buffer, 0).await.unwrap();
    assert_eq!(data, buffer);
}

#[tokio::test]
async fn single_job_single_part_bypasses_multipart() {
    let (store, _) = store_with_bucket().await;
    let data = patterned(4096);

    let cfg = config(&store, 1, 1);
    let etag = upload(&cfg, TransferSource::Bytes(Bytes::from(data.clone())))
        .await
        .unwrap();
    // a simple PUT carries a plain content hash, not the multipart `-N` form
    assert!(!etag.contains('-'));
    assert_eq!(0, store.open_upload_count());
    assert_eq!(data, store.object("bucket1", "large.bin").unwrap());
}

#[tokio::test]
async fn download_overwrites_stale_destination_content() {
    let (store, _) = store_with_bucket().await;
    let data = patterned(10_000);
    let cfg = config(&store, 2, 2);
    upload(&cfg, TransferSource::Bytes(Bytes::from(data.clone())))
        .await
        .unwrap();

    let dest = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(dest.path(), vec![0xffu8; 50_000]).unwrap();
    download_to_file(&cfg, dest.path()).await.unwrap();
    assert_eq!(data, std::fs::read(dest.path()).unwrap());
}

#[tokio::test]
async fn transfers_survive_faults_within_the_retry_budget() {
    let (store, _) = store_with_bucket().await;
    let data = patterned(65_536);

    let mut cfg = config(&store, 2, 2);
    cfg.max_retries = 3;

    store.fail_matching(Some(Method::Put), "partNumber", 2, FaultKind::Transport);
    upload(&cfg, TransferSource::Bytes(Bytes::from(data.clone())))
        .await
        .unwrap();
    assert_eq!(data, store.object("bucket1", "large.bin").unwrap());

    store.fail_matching(Some(Method::Get), "large.bin", 2, FaultKind::Status(503));
    let mut buffer = vec![0u8; data.len()];
    download_to_buffer(&cfg, &mut buffer, 0).await.unwrap();
    assert_eq!(data, buffer);
}

#[tokio::test]
async fn exhausted_budget_fails_the_whole_transfer() {
    let (store, _) = store_with_bucket().await;
    let data = patterned(65_536);

    let mut cfg = config(&store, 2, 2);
    cfg.max_retries = 1;

    // more consecutive faults than the whole transfer may retry
    store.fail_matching(Some(Method::Put), "partNumber", 8, FaultKind::Transport);
    let err = upload(&cfg, TransferSource::Bytes(Bytes::from(data)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));

    // no auto-abort: the upload id stays live for the caller to clean up
    assert_eq!(1, store.open_upload_count());
}

#[tokio::test]
async fn non_retryable_status_fails_immediately() {
    let (store, _) = store_with_bucket().await;
    let data = patterned(8_192);

    let mut cfg = config(&store, 1, 2);
    cfg.max_retries = 5;

    store.fail_matching(Some(Method::Put), "partNumber", 1, FaultKind::Status(403));
    let err = upload(&cfg, TransferSource::Bytes(Bytes::from(data)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol { status: 403, .. }));
}

#[tokio::test]
async fn zero_size_sources_are_a_config_error() {
    let (store, _) = store_with_bucket().await;
    let cfg = config(&store, 2, 2);
    let err = upload(&cfg, TransferSource::Bytes(Bytes::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(0, store.open_upload_count());
}

#[tokio::test]
async fn empty_endpoint_pool_is_rejected_before_io() {
    let store = Arc::new(InMemoryStore::new());
    let mut cfg = config(&store, 2, 2);
    cfg.endpoints.clear();
    let err = upload(&cfg, TransferSource::Bytes(Bytes::from_static(b"data")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(0, store.request_count());
}

#[tokio::test]
async fn download_to_short_buffer_is_rejected() {
    let (store, _) = store_with_bucket().await;
    let data = patterned(10_000);
    let cfg = config(&store, 1, 1);
    upload(&cfg, TransferSource::Bytes(Bytes::from(data)))
        .await
        .unwrap();

    let mut buffer = vec![0u8; 100];
    let err = download_to_buffer(&cfg, &mut buffer, 0).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
