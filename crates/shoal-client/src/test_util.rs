/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! An in-memory object store double.
//!
//! Implements [`HttpTransport`] with enough of the S3 REST protocol for
//! end-to-end tests: bucket lifecycle, object CRUD with `Range` reads,
//! tagging, ACL passthrough, ListObjectsV2, and the multipart quartet.
//! Scripted faults simulate transport failures, server errors and responses
//! missing the ETag header, so retry behavior can be tested without a live
//! server.

use crate::error::Error;
use crate::http::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::xml::{Document, XmlWriter};
use crate::Headers;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// What an injected fault does to the matched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The request never reaches the store; a transport error is returned.
    Transport,
    /// The store answers with this HTTP status and an `InternalError` body.
    Status(u16),
    /// The store answers 200 but without an `etag` header, and does not
    /// perform the operation.
    MissingETag,
}

#[derive(Debug, Clone)]
struct Fault {
    method: Option<Method>,
    path_contains: String,
    remaining: u32,
    kind: FaultKind,
}

#[derive(Debug, Default, Clone)]
struct Object {
    data: Vec<u8>,
    etag: String,
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct Bucket {
    objects: BTreeMap<String, Object>,
    tags: BTreeMap<String, String>,
    acl: Option<String>,
}

#[derive(Debug)]
struct Upload {
    bucket: String,
    key: String,
    parts: BTreeMap<u32, (String, Vec<u8>)>,
}

#[derive(Debug, Default)]
struct State {
    buckets: BTreeMap<String, Bucket>,
    uploads: BTreeMap<String, Upload>,
    next_upload_id: u64,
    faults: Vec<Fault>,
    requests: u64,
}

/// The in-memory store. Wrap it in an `Arc` and inject it as the client's
/// transport.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a fault for the next `count` requests whose method and URL
    /// match. Pass `method = None` or an empty `path_contains` to match any.
    pub fn fail_matching(
        &self,
        method: Option<Method>,
        path_contains: &str,
        count: u32,
        kind: FaultKind,
    ) {
        self.state.lock().unwrap().faults.push(Fault {
            method,
            path_contains: path_contains.to_string(),
            remaining: count,
            kind,
        });
    }

    /// Scripts a fault for the next `count` requests of any shape.
    pub fn fail_next(&self, count: u32, kind: FaultKind) {
        self.fail_matching(None, "", count, kind);
    }

    /// A stored object's bytes, for assertions.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .map(|o| o.data.clone())
    }

    /// Number of objects in a bucket.
    pub fn object_count(&self, bucket: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .map(|b| b.objects.len())
            .unwrap_or(0)
    }

    /// Number of multipart uploads that are neither completed nor aborted.
    pub fn open_upload_count(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }

    /// Total requests that reached the store (faulted ones included).
    pub fn request_count(&self) -> u64 {
        self.state.lock().unwrap().requests
    }
}

#[async_trait::async_trait]
impl HttpTransport for InMemoryStore {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let body = request.body.clone().into_bytes().await?;
        let mut state = self.state.lock().unwrap();
        state.requests += 1;

        let (path, query) = split_url(&request.url);
        if let Some(kind) = state.take_fault(request.method, &request.url) {
            match kind {
                FaultKind::Transport => return Err(Error::transport("injected transport fault")),
                FaultKind::Status(status) => {
                    return Ok(error_response(status, "InternalError"));
                }
                FaultKind::MissingETag => {
                    return Ok(plain_response(200));
                }
            }
        }

        let mut segments = path.splitn(2, '/').filter(|s| !s.is_empty());
        let bucket = segments.next().map(str::to_string);
        let key = segments.next().map(str::to_string);
        Ok(state.handle(request.method, bucket, key, &query, &request.headers, &body))
    }
}

impl State {
    fn take_fault(&mut self, method: Method, url: &str) -> Option<FaultKind> {
        for fault in self.faults.iter_mut() {
            if fault.remaining == 0 {
                continue;
            }
            if let Some(want) = fault.method {
                if want != method {
                    continue;
                }
            }
            if !fault.path_contains.is_empty() && !url.contains(&fault.path_contains) {
                continue;
            }
            fault.remaining -= 1;
            return Some(fault.kind);
        }
        None
    }

    fn handle(
        &mut self,
        method: Method,
        bucket: Option<String>,
        key: Option<String>,
        query: &BTreeMap<String, String>,
        headers: &Headers,
        body: &Bytes,
    ) -> HttpResponse {
        match (bucket, key) {
            (None, _) => match method {
                Method::Get => self.list_buckets(),
                _ => error_response(400, "InvalidRequest"),
            },
            (Some(bucket), None) => self.handle_bucket(method, &bucket, query, body),
            (Some(bucket), Some(key)) => {
                self.handle_object(method, &bucket, &key, query, headers, body)
            }
        }
    }

    fn list_buckets(&self) -> HttpResponse {
        let mut xml = XmlWriter::with_declaration();
        xml.open("ListAllMyBucketsResult").open("Buckets");
        for name in self.buckets.keys() {
            xml.open("Bucket")
                .element("Name", name)
                .element("CreationDate", "2023-04-18T15:30:22.000Z")
                .close();
        }
        xml_response(200, xml.finish())
    }

    fn handle_bucket(
        &mut self,
        method: Method,
        bucket: &str,
        query: &BTreeMap<String, String>,
        body: &Bytes,
    ) -> HttpResponse {
        if query.contains_key("tagging") {
            return self.bucket_tagging(method, bucket, body);
        }
        if query.contains_key("acl") {
            return self.bucket_acl(method, bucket, body);
        }
        if query.contains_key("versions") {
            return match self.buckets.get(bucket) {
                Some(_) => xml_response(
                    200,
                    "<?xml version=\"1.0\"?><ListVersionsResult></ListVersionsResult>".to_string(),
                ),
                None => error_response(404, "NoSuchBucket"),
            };
        }
        match method {
            Method::Put => {
                self.buckets.entry(bucket.to_string()).or_default();
                plain_response(200)
            }
            Method::Head => match self.buckets.contains_key(bucket) {
                true => plain_response(200),
                false => plain_response(404),
            },
            Method::Delete => match self.buckets.remove(bucket) {
                Some(_) => plain_response(204),
                None => error_response(404, "NoSuchBucket"),
            },
            Method::Get => self.list_objects(bucket, query),
            _ => error_response(400, "InvalidRequest"),
        }
    }

    fn bucket_tagging(&mut self, method: Method, bucket: &str, body: &Bytes) -> HttpResponse {
        let Some(entry) = self.buckets.get_mut(bucket) else {
            return error_response(404, "NoSuchBucket");
        };
        match method {
            Method::Put => {
                entry.tags = parse_tag_body(body);
                plain_response(200)
            }
            Method::Get => xml_response(200, tagging_body(&entry.tags)),
            _ => error_response(400, "InvalidRequest"),
        }
    }

    fn bucket_acl(&mut self, method: Method, bucket: &str, body: &Bytes) -> HttpResponse {
        let Some(entry) = self.buckets.get_mut(bucket) else {
            return error_response(404, "NoSuchBucket");
        };
        match method {
            Method::Put => {
                entry.acl = Some(String::from_utf8_lossy(body).into_owned());
                plain_response(200)
            }
            Method::Get => {
                let default_acl = "<AccessControlPolicy>\
                     <Owner><DisplayName>tester</DisplayName><ID>tester-id</ID></Owner>\
                     <AccessControlList></AccessControlList>\
                     </AccessControlPolicy>";
                xml_response(200, entry.acl.clone().unwrap_or_else(|| default_acl.to_string()))
            }
            _ => error_response(400, "InvalidRequest"),
        }
    }

    fn list_objects(&self, bucket: &str, query: &BTreeMap<String, String>) -> HttpResponse {
        let Some(entry) = self.buckets.get(bucket) else {
            return error_response(404, "NoSuchBucket");
        };
        let prefix = query.get("prefix").cloned().unwrap_or_default();
        let mut xml = XmlWriter::with_declaration();
        xml.open("ListBucketResult");
        xml.element("IsTruncated", "false");
        for (key, object) in &entry.objects {
            if !key.starts_with(&prefix) {
                continue;
            }
            xml.open("Contents")
                .element("Key", key)
                .element("LastModified", "2023-04-18T15:30:22.000Z")
                .element("ETag", &format!("\"{}\"", object.etag))
                .element("Size", &object.data.len().to_string())
                .element("StorageClass", "STANDARD")
                .close();
        }
        xml_response(200, xml.finish())
    }

    fn handle_object(
        &mut self,
        method: Method,
        bucket: &str,
        key: &str,
        query: &BTreeMap<String, String>,
        headers: &Headers,
        body: &Bytes,
    ) -> HttpResponse {
        if query.contains_key("uploads") && method == Method::Post {
            return self.create_upload(bucket, key);
        }
        if let Some(upload_id) = query.get("uploadId") {
            return match method {
                Method::Put => {
                    let part_number = query
                        .get("partNumber")
                        .and_then(|n| n.parse::<u32>().ok());
                    match part_number {
                        Some(n) if (1..=10_000).contains(&n) => {
                            self.upload_part(upload_id, n, body)
                        }
                        _ => error_response(400, "InvalidArgument"),
                    }
                }
                Method::Post => self.complete_upload(upload_id, body),
                Method::Delete => match self.uploads.remove(upload_id) {
                    Some(_) => plain_response(204),
                    None => error_response(404, "NoSuchUpload"),
                },
                _ => error_response(400, "InvalidRequest"),
            };
        }
        if query.contains_key("tagging") {
            return self.object_tagging(method, bucket, key, body);
        }

        match method {
            Method::Put => {
                let Some(entry) = self.buckets.get_mut(bucket) else {
                    return error_response(404, "NoSuchBucket");
                };
                let etag = content_etag(body);
                entry.objects.insert(
                    key.to_string(),
                    Object {
                        data: body.to_vec(),
                        etag: etag.clone(),
                        tags: BTreeMap::new(),
                    },
                );
                let mut response = plain_response(200);
                response
                    .headers
                    .insert("etag".to_string(), format!("\"{etag}\""));
                response
            }
            Method::Get => {
                let Some(object) = self.buckets.get(bucket).and_then(|b| b.objects.get(key))
                else {
                    return error_response(404, "NoSuchKey");
                };
                let (status, data) = match headers.get("range") {
                    Some(range) => match byte_range(range, object.data.len()) {
                        Some((begin, end)) => (206, object.data[begin..=end].to_vec()),
                        None => return error_response(416, "InvalidRange"),
                    },
                    None => (200, object.data.clone()),
                };
                let mut response = HttpResponse {
                    status,
                    headers: Headers::new(),
                    body: Bytes::from(data),
                };
                response
                    .headers
                    .insert("etag".to_string(), format!("\"{}\"", object.etag));
                response
            }
            Method::Head => {
                let Some(object) = self.buckets.get(bucket).and_then(|b| b.objects.get(key))
                else {
                    return plain_response(404);
                };
                let mut response = plain_response(200);
                response
                    .headers
                    .insert("content-length".to_string(), object.data.len().to_string());
                response
                    .headers
                    .insert("etag".to_string(), format!("\"{}\"", object.etag));
                response
            }
            Method::Delete => {
                match self
                    .buckets
                    .get_mut(bucket)
                    .and_then(|b| b.objects.remove(key))
                {
                    Some(_) => plain_response(204),
                    None => error_response(404, "NoSuchKey"),
                }
            }
            _ => error_response(400, "InvalidRequest"),
        }
    }

    fn object_tagging(
        &mut self,
        method: Method,
        bucket: &str,
        key: &str,
        body: &Bytes,
    ) -> HttpResponse {
        let Some(object) = self
            .buckets
            .get_mut(bucket)
            .and_then(|b| b.objects.get_mut(key))
        else {
            return error_response(404, "NoSuchKey");
        };
        match method {
            Method::Put => {
                object.tags = parse_tag_body(body);
                plain_response(200)
            }
            Method::Get => xml_response(200, tagging_body(&object.tags)),
            _ => error_response(400, "InvalidRequest"),
        }
    }

    fn create_upload(&mut self, bucket: &str, key: &str) -> HttpResponse {
        if !self.buckets.contains_key(bucket) {
            return error_response(404, "NoSuchBucket");
        }
        self.next_upload_id += 1;
        let upload_id = format!("upload-{:04}", self.next_upload_id);
        self.uploads.insert(
            upload_id.clone(),
            Upload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        let mut xml = XmlWriter::with_declaration();
        xml.open("InitiateMultipartUploadResult")
            .element("Bucket", bucket)
            .element("Key", key)
            .element("UploadId", &upload_id);
        xml_response(200, xml.finish())
    }

    fn upload_part(&mut self, upload_id: &str, part_number: u32, body: &Bytes) -> HttpResponse {
        let Some(upload) = self.uploads.get_mut(upload_id) else {
            return error_response(404, "NoSuchUpload");
        };
        let etag = content_etag(body);
        upload.parts.insert(part_number, (etag.clone(), body.to_vec()));
        let mut response = plain_response(200);
        response
            .headers
            .insert("etag".to_string(), format!("\"{etag}\""));
        response
    }

    fn complete_upload(&mut self, upload_id: &str, body: &Bytes) -> HttpResponse {
        let Some(upload) = self.uploads.get(upload_id) else {
            return error_response(404, "NoSuchUpload");
        };
        let manifest = String::from_utf8_lossy(body).into_owned();
        let Ok(doc) = Document::parse(&manifest) else {
            return error_response(400, "MalformedXML");
        };
        let mut listed: Vec<(u32, String)> = Vec::new();
        for record in doc.records("completemultipartupload/part") {
            let number = record.get("/partnumber").and_then(|n| n.parse::<u32>().ok());
            let etag = record.get("/etag").cloned();
            match (number, etag) {
                (Some(number), Some(etag)) => listed.push((number, etag)),
                _ => return error_response(400, "MalformedXML"),
            }
        }
        if listed.is_empty() || listed.windows(2).any(|w| w[0].0 >= w[1].0) {
            // the manifest must list part numbers in ascending order
            return error_response(400, "InvalidPartOrder");
        }

        let mut data = Vec::new();
        for (number, etag) in &listed {
            match upload.parts.get(number) {
                Some((stored_etag, part)) if stored_etag == etag => data.extend_from_slice(part),
                _ => return error_response(400, "InvalidPart"),
            }
        }

        let etag = format!("{}-{}", content_etag(&Bytes::from(data.clone())), listed.len());
        let (bucket, key) = (upload.bucket.clone(), upload.key.clone());
        self.uploads.remove(upload_id);
        let Some(entry) = self.buckets.get_mut(&bucket) else {
            return error_response(404, "NoSuchBucket");
        };
        entry.objects.insert(
            key.clone(),
            Object {
                data,
                etag: etag.clone(),
                tags: BTreeMap::new(),
            },
        );

        let mut xml = XmlWriter::with_declaration();
        xml.open("CompleteMultipartUploadResult")
            .element("Bucket", &bucket)
            .element("Key", &key)
            .element("ETag", &format!("\"{etag}\""));
        xml_response(200, xml.finish())
    }
}

fn split_url(url: &str) -> (String, BTreeMap<String, String>) {
    let rest = url
        .splitn(2, "://")
        .nth(1)
        .unwrap_or(url);
    let (path, query) = match rest.split_once('/') {
        Some((_authority, path_and_query)) => match path_and_query.split_once('?') {
            Some((path, query)) => (path.to_string(), query),
            None => (path_and_query.to_string(), ""),
        },
        None => match rest.split_once('?') {
            Some((_, query)) => (String::new(), query),
            None => (String::new(), ""),
        },
    };
    let mut params = BTreeMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(url_decode(key), url_decode(value));
    }
    (path, params)
}

fn url_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let (Some(hi), Some(lo)) = (
                bytes.get(i + 1).and_then(|b| (*b as char).to_digit(16)),
                bytes.get(i + 2).and_then(|b| (*b as char).to_digit(16)),
            ) {
                out.push((hi * 16 + lo) as u8);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn byte_range(header: &str, len: usize) -> Option<(usize, usize)> {
    let spec = header.strip_prefix("bytes=")?;
    let (begin, end) = spec.split_once('-')?;
    let begin: usize = begin.parse().ok()?;
    let end: usize = end.parse().ok()?;
    if begin > end || begin >= len {
        return None;
    }
    Some((begin, end.min(len - 1)))
}

fn content_etag(data: &Bytes) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())[..32].to_string()
}

fn parse_tag_body(body: &Bytes) -> BTreeMap<String, String> {
    let Ok(doc) = Document::parse(&String::from_utf8_lossy(body)) else {
        return BTreeMap::new();
    };
    let mut tags = BTreeMap::new();
    for record in doc.records("tagging/tagset/tag") {
        if let (Some(key), Some(value)) = (record.get("/key"), record.get("/value")) {
            tags.insert(key.clone(), value.clone());
        }
    }
    tags
}

fn tagging_body(tags: &BTreeMap<String, String>) -> String {
    let mut xml = XmlWriter::with_declaration();
    xml.open("Tagging").open("TagSet");
    for (key, value) in tags {
        xml.open("Tag")
            .element("Key", key)
            .element("Value", value)
            .close();
    }
    xml.finish()
}

fn plain_response(status: u16) -> HttpResponse {
    HttpResponse {
        status,
        headers: Headers::new(),
        body: Bytes::new(),
    }
}

fn xml_response(status: u16, body: String) -> HttpResponse {
    HttpResponse {
        status,
        headers: Headers::new(),
        body: Bytes::from(body),
    }
}

fn error_response(status: u16, code: &str) -> HttpResponse {
    let mut xml = XmlWriter::with_declaration();
    xml.open("Error").element("Code", code);
    xml_response(status, xml.finish())
}
