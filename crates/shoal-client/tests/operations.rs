/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Operation tests against the in-memory object store double.

use bytes::Bytes;
use shoal_client::multipart::MultipartUpload;
use shoal_client::retry::RetryBudget;
use shoal_client::test_util::{FaultKind, InMemoryStore};
use shoal_client::types::ListObjectsV2Config;
use shoal_client::{Client, Credentials, Error, Headers, MetadataMap, TagMap};
use std::sync::Arc;

fn test_client(store: Arc<InMemoryStore>) -> Client {
    Client::builder()
        .credentials(Credentials::new("access", "secret").unwrap())
        .endpoint("http://localhost:9000".parse().unwrap())
        .transport(store)
        .build()
        .unwrap()
}

#[tokio::test]
async fn bucket_lifecycle() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store.clone());

    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();
    assert!(client.bucket_exists("bucket1").await.unwrap());

    let buckets = client.list_buckets().await.unwrap();
    assert_eq!(1, buckets.len());
    assert_eq!("bucket1", buckets[0].name);

    client.delete_bucket("bucket1").await.unwrap();
    assert!(!client.bucket_exists("bucket1").await.unwrap());
    assert!(client.list_buckets().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_bucket_validates_the_name_locally() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store.clone());
    let err = client
        .create_bucket("Invalid", Headers::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(0, store.request_count());
}

#[tokio::test]
async fn object_round_trip() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store.clone());
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();

    let data: Vec<u8> = (0..1024u32).map(|i| (i % 256) as u8).collect();
    let etag = client
        .put_object("bucket1", "key1", Bytes::from(data.clone()), Headers::new(), None)
        .await
        .unwrap();
    assert!(!etag.is_empty() && !etag.starts_with('"'));

    let body = client.get_object("bucket1", "key1", None).await.unwrap();
    assert_eq!(data, body.to_vec());

    assert_eq!(1024, client.object_size("bucket1", "key1").await.unwrap());
    assert!(client.object_exists("bucket1", "key1").await.unwrap());

    client.delete_object("bucket1", "key1").await.unwrap();
    assert!(!client.object_exists("bucket1", "key1").await.unwrap());
}

#[tokio::test]
async fn ranged_get_is_inclusive() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store);
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();
    client
        .put_object(
            "bucket1",
            "key1",
            Bytes::from_static(b"0123456789"),
            Headers::new(),
            None,
        )
        .await
        .unwrap();

    let body = client
        .get_object("bucket1", "key1", Some((2, 5)))
        .await
        .unwrap();
    assert_eq!(b"2345", &body[..]);

    let mut buffer = vec![0u8; 10];
    let written = client
        .get_object_into("bucket1", "key1", &mut buffer, 3, Some((2, 5)))
        .await
        .unwrap();
    assert_eq!(4, written);
    assert_eq!(b"2345", &buffer[3..7]);
}

#[tokio::test]
async fn get_object_into_rejects_short_buffers() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store);
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();
    client
        .put_object(
            "bucket1",
            "key1",
            Bytes::from_static(b"0123456789"),
            Headers::new(),
            None,
        )
        .await
        .unwrap();

    let mut buffer = vec![0u8; 4];
    let err = client
        .get_object_into("bucket1", "key1", &mut buffer, 0, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Programming(_)));
}

#[tokio::test]
async fn missing_object_is_a_protocol_error_with_code() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store);
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();

    let err = client.get_object("bucket1", "nope", None).await.unwrap_err();
    match err {
        Error::Protocol { status, code } => {
            assert_eq!(404, status);
            assert_eq!(Some("NoSuchKey".to_string()), code);
        }
        other => panic!("unexpected error {other:?}"),
    }

    // HEAD probes stay quiet: typed NotFound, no code to parse
    assert!(matches!(
        client.head_object("bucket1", "nope").await.unwrap_err(),
        Error::NotFound
    ));
}

#[tokio::test]
async fn list_objects_v2_filters_by_prefix() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store);
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();
    for key in ["logs/a", "logs/b", "data/c"] {
        client
            .put_object("bucket1", key, Bytes::from_static(b"x"), Headers::new(), None)
            .await
            .unwrap();
    }

    let all = client
        .list_objects_v2("bucket1", &ListObjectsV2Config::default())
        .await
        .unwrap();
    assert_eq!(3, all.keys.len());
    assert!(!all.truncated);

    let config = ListObjectsV2Config {
        prefix: Some("logs/".to_string()),
        ..Default::default()
    };
    let logs = client.list_objects_v2("bucket1", &config).await.unwrap();
    assert_eq!(2, logs.keys.len());
    assert!(logs.keys.iter().all(|k| k.key.starts_with("logs/")));
    assert_eq!(1, logs.keys[0].size);
}

#[tokio::test]
async fn tagging_round_trips_through_the_server() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store);
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();
    client
        .put_object("bucket1", "key1", Bytes::from_static(b"x"), Headers::new(), None)
        .await
        .unwrap();

    let tags = TagMap::from([
        ("env".to_string(), "prod".to_string()),
        ("team".to_string(), "storage".to_string()),
    ]);
    client.put_bucket_tagging("bucket1", &tags).await.unwrap();
    assert_eq!(tags, client.get_bucket_tagging("bucket1").await.unwrap());

    client
        .put_object_tagging("bucket1", "key1", &tags)
        .await
        .unwrap();
    assert_eq!(
        tags,
        client.get_object_tagging("bucket1", "key1").await.unwrap()
    );
}

#[tokio::test]
async fn acl_round_trip() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store);
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();

    let acl = client.get_bucket_acl("bucket1").await.unwrap();
    assert_eq!("tester", acl.owner_display_name);

    let mut updated = acl.clone();
    updated.grants.push(shoal_client::types::Grant {
        grantee: shoal_client::types::Grantee {
            id: "someone".to_string(),
            ..Default::default()
        },
        permission: "READ".to_string(),
    });
    client.put_bucket_acl("bucket1", &updated).await.unwrap();
    let acl = client.get_bucket_acl("bucket1").await.unwrap();
    assert_eq!(1, acl.grants.len());
    assert_eq!("READ", acl.grants[0].permission);
}

#[tokio::test]
async fn multipart_upload_completes_in_part_order() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store.clone());
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();

    let mut upload =
        MultipartUpload::start(&client, "bucket1", "big", &MetadataMap::new(), 0)
            .await
            .unwrap();
    assert!(!upload.upload_id().is_empty());

    // arrival order need not match part order
    upload
        .upload_part(2, Bytes::from_static(b"bbbb"), None)
        .await
        .unwrap();
    upload
        .upload_part(1, Bytes::from_static(b"aaaa"), None)
        .await
        .unwrap();
    upload
        .upload_part(3, Bytes::from_static(b"cc"), None)
        .await
        .unwrap();

    let etag = upload.complete().await.unwrap();
    assert!(etag.ends_with("-3"));
    assert_eq!(
        b"aaaabbbbcc".to_vec(),
        store.object("bucket1", "big").unwrap()
    );
    assert_eq!(0, store.open_upload_count());
}

#[tokio::test]
async fn multipart_abort_leaves_no_server_state() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store.clone());
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();

    // three parts of a 19 MB-style upload, then abort instead of complete
    let part = vec![0xa5u8; 1024];
    let mut upload =
        MultipartUpload::start(&client, "bucket1", "aborted", &MetadataMap::new(), 0)
            .await
            .unwrap();
    for number in 1..=3 {
        upload
            .upload_part(number, Bytes::from(part.clone()), None)
            .await
            .unwrap();
    }
    upload.abort().await.unwrap();

    assert_eq!(0, store.open_upload_count());
    assert_eq!(0, store.object_count("bucket1"));
    assert!(store.object("bucket1", "aborted").is_none());
}

#[tokio::test]
async fn upload_part_retries_on_missing_etag() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store.clone());
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();

    store.fail_matching(None, "partNumber", 1, FaultKind::MissingETag);

    let mut upload =
        MultipartUpload::start(&client, "bucket1", "key1", &MetadataMap::new(), 2)
            .await
            .unwrap();
    upload
        .upload_part(1, Bytes::from_static(b"data"), None)
        .await
        .unwrap();
    assert_eq!(1, upload.retries_used());

    let etag = upload.complete().await.unwrap();
    assert!(!etag.is_empty());
}

#[tokio::test]
async fn upload_part_surfaces_the_error_once_the_budget_is_spent() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store.clone());
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();

    store.fail_matching(None, "partNumber", 10, FaultKind::Status(500));

    let mut upload =
        MultipartUpload::start(&client, "bucket1", "key1", &MetadataMap::new(), 2)
            .await
            .unwrap();
    let err = upload
        .upload_part(1, Bytes::from_static(b"data"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol { status: 500, .. }));
    assert_eq!(2, upload.retries_used());

    // no auto-abort: the upload id is still live server-side until the
    // caller cleans up
    assert_eq!(1, store.open_upload_count());
    upload.abort().await.unwrap();
    assert_eq!(0, store.open_upload_count());
}

#[tokio::test]
async fn four_xx_is_not_retried() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store.clone());
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();

    store.fail_matching(None, "partNumber", 1, FaultKind::Status(403));

    let mut upload =
        MultipartUpload::start(&client, "bucket1", "key1", &MetadataMap::new(), 5)
            .await
            .unwrap();
    let err = upload
        .upload_part(1, Bytes::from_static(b"data"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol { status: 403, .. }));
    assert_eq!(0, upload.retries_used());
}

#[tokio::test]
async fn shared_budget_spans_uploads() {
    let store = Arc::new(InMemoryStore::new());
    let client = test_client(store.clone());
    client
        .create_bucket("bucket1", Headers::new())
        .await
        .unwrap();

    let budget = RetryBudget::new(1);
    store.fail_matching(None, "partNumber", 4, FaultKind::Transport);

    let mut first = MultipartUpload::start_with_budget(
        &client,
        "bucket1",
        "one",
        &MetadataMap::new(),
        budget.clone(),
    )
    .await
    .unwrap();
    let mut second = MultipartUpload::start_with_budget(
        &client,
        "bucket1",
        "two",
        &MetadataMap::new(),
        budget.clone(),
    )
    .await
    .unwrap();

    // the single shared retry is consumed by the first upload; the second
    // fails without retrying
    let first_result = first.upload_part(1, Bytes::from_static(b"x"), None).await;
    let second_result = second.upload_part(1, Bytes::from_static(b"y"), None).await;
    assert!(first_result.is_err());
    assert!(second_result.is_err());
    assert_eq!(1, budget.used());
}

#[tokio::test]
async fn anonymous_requests_are_sent_unsigned() {
    let store = Arc::new(InMemoryStore::new());
    let client = Client::builder()
        .endpoint("http://localhost:9000".parse().unwrap())
        .transport(store)
        .build()
        .unwrap();
    client
        .create_bucket("public-bucket", Headers::new())
        .await
        .unwrap();
    assert!(client.bucket_exists("public-bucket").await.unwrap());
}
