/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Object operations.

use super::bucket::{parse_tagging, tagging_xml};
use super::{etag_from_headers, Client, SendParams};
use crate::error::Error;
use crate::http::{write_file_slice, BodySource, FileIoMode, Method};
use crate::types::{ListObjectsV2Config, ListObjectsV2Result, ObjectInfo, ObjectVersions};
use crate::xml::{trim_etag, Document};
use crate::{ETag, Headers, Params, TagMap};
use bytes::Bytes;
use std::path::Path;

impl Client {
    /// `PUT /<bucket>/<key>` from an in-memory buffer; returns the
    /// normalized ETag.
    pub async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        headers: Headers,
        payload_hash: Option<&str>,
    ) -> Result<ETag, Error> {
        let mut params = SendParams::new(Method::Put);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        params.headers = headers;
        params.payload_hash = payload_hash.map(str::to_string);
        params.body = BodySource::Bytes(data);
        let response = self.send(params).await?;
        etag_from_headers(&response, "PutObject")
    }

    /// `PUT /<bucket>/<key>` streaming a byte range of a file.
    /// `length = None` sends from `offset` to the end of the file.
    #[allow(clippy::too_many_arguments)]
    pub async fn put_file_object(
        &self,
        path: impl AsRef<Path>,
        offset: u64,
        length: Option<u64>,
        bucket: &str,
        key: &str,
        headers: Headers,
        mode: FileIoMode,
    ) -> Result<ETag, Error> {
        let path = path.as_ref();
        let length = match length {
            Some(length) => length,
            None => file_size(path)?.saturating_sub(offset),
        };
        let mut params = SendParams::new(Method::Put);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        params.headers = headers;
        params.body = BodySource::File {
            path: path.to_path_buf(),
            offset,
            length,
            mode,
        };
        let response = self.send(params).await?;
        etag_from_headers(&response, "PutObject")
    }

    /// `GET /<bucket>/<key>`, optionally with an inclusive byte range,
    /// returning the body.
    pub async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<(u64, u64)>,
    ) -> Result<Bytes, Error> {
        let response = self.get_object_response(bucket, key, range).await?;
        Ok(response.body)
    }

    /// Ranged GET into a caller-owned buffer at `offset`; returns the number
    /// of bytes written.
    pub async fn get_object_into(
        &self,
        bucket: &str,
        key: &str,
        buffer: &mut [u8],
        offset: usize,
        range: Option<(u64, u64)>,
    ) -> Result<usize, Error> {
        let body = self.get_object(bucket, key, range).await?;
        let end = offset + body.len();
        if end > buffer.len() {
            return Err(Error::programming(format!(
                "destination buffer too small: need {end} bytes, have {}",
                buffer.len()
            )));
        }
        buffer[offset..end].copy_from_slice(&body);
        Ok(body.len())
    }

    /// Ranged GET written into a file at `file_offset`. The file is created
    /// when missing and existing content outside the range is preserved.
    pub async fn get_file_object(
        &self,
        path: impl AsRef<Path>,
        bucket: &str,
        key: &str,
        file_offset: u64,
        range: Option<(u64, u64)>,
    ) -> Result<(), Error> {
        let body = self.get_object(bucket, key, range).await?;
        write_file_slice(path.as_ref().to_path_buf(), file_offset, body).await
    }

    async fn get_object_response(
        &self,
        bucket: &str,
        key: &str,
        range: Option<(u64, u64)>,
    ) -> Result<crate::http::HttpResponse, Error> {
        let mut params = SendParams::new(Method::Get);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        if let Some((begin, end)) = range {
            if end > 0 {
                params
                    .headers
                    .insert("range".to_string(), format!("bytes={begin}-{end}"));
            }
        }
        self.send(params).await
    }

    /// `HEAD /<bucket>/<key>`; returns the response header map. A missing
    /// object surfaces as [`Error::NotFound`].
    pub async fn head_object(&self, bucket: &str, key: &str) -> Result<Headers, Error> {
        let mut params = SendParams::new(Method::Head);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        let response = self.send(params).await?;
        Ok(response.headers)
    }

    /// Existence probe built on [`Client::head_object`].
    pub async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool, Error> {
        match self.head_object(bucket, key).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Object size from the `content-length` of a HEAD response.
    pub async fn object_size(&self, bucket: &str, key: &str) -> Result<u64, Error> {
        let headers = self.head_object(bucket, key).await?;
        headers
            .get("content-length")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::integrity("HEAD response carries no content-length"))
    }

    /// `DELETE /<bucket>/<key>`
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), Error> {
        let mut params = SendParams::new(Method::Delete);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        self.send(params).await?;
        Ok(())
    }

    /// `GET /<bucket>` with the ListObjectsV2 parameter set; only non-empty
    /// parameters are sent.
    pub async fn list_objects_v2(
        &self,
        bucket: &str,
        config: &ListObjectsV2Config,
    ) -> Result<ListObjectsV2Result, Error> {
        let mut query = Params::new();
        let mut push = |name: &str, value: &Option<String>| {
            if let Some(value) = value {
                if !value.is_empty() {
                    query.insert(name.to_string(), value.clone());
                }
            }
        };
        push("continuation-token", &config.continuation_token);
        push("delimiter", &config.delimiter);
        push("encoding-type", &config.encoding_type);
        push("fetch-owner", &config.fetch_owner);
        push("prefix", &config.prefix);
        push("start-after", &config.start_after);

        let mut params = SendParams::new(Method::Get);
        params.bucket = Some(bucket.to_string());
        params.params = query;
        let response = self.send(params).await?;
        parse_list_objects(&response.text())
    }

    /// `GET /<bucket>/<key>?tagging`
    pub async fn get_object_tagging(&self, bucket: &str, key: &str) -> Result<TagMap, Error> {
        let mut params = SendParams::new(Method::Get);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        params.params = Params::from([("tagging".to_string(), String::new())]);
        let response = self.send(params).await?;
        parse_tagging(&response.text())
    }

    /// `PUT /<bucket>/<key>?tagging`
    pub async fn put_object_tagging(
        &self,
        bucket: &str,
        key: &str,
        tags: &TagMap,
    ) -> Result<(), Error> {
        let mut params = SendParams::new(Method::Put);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        params.params = Params::from([("tagging".to_string(), String::new())]);
        params.body = BodySource::Bytes(Bytes::from(tagging_xml(tags)));
        self.send(params).await?;
        Ok(())
    }

    /// `GET /<bucket>?versions`; returns version ids and delete markers.
    pub async fn list_object_versions(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> Result<ObjectVersions, Error> {
        let mut query = Params::from([("versions".to_string(), String::new())]);
        if let Some(prefix) = prefix {
            if !prefix.is_empty() {
                query.insert("prefix".to_string(), prefix.to_string());
            }
        }
        let mut params = SendParams::new(Method::Get);
        params.bucket = Some(bucket.to_string());
        params.params = query;
        let response = self.send(params).await?;

        let doc = Document::parse(&response.text())?;
        let collect = |records: Vec<crate::xml::Record>| {
            records
                .into_iter()
                .filter_map(|r| r.get("/versionid").cloned())
                .filter(|v| !v.is_empty())
                .collect()
        };
        Ok(ObjectVersions {
            versions: collect(doc.records("listversionsresult/version")),
            delete_markers: collect(doc.records("listversionsresult/deletemarker")),
        })
    }
}

fn parse_list_objects(body: &str) -> Result<ListObjectsV2Result, Error> {
    if body.is_empty() {
        return Ok(ListObjectsV2Result::default());
    }
    let doc = Document::parse(body)?;
    let truncated = doc
        .text("listbucketresult/istruncated")
        .map(|t| t.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let mut keys = Vec::new();
    for record in doc.records("listbucketresult/contents") {
        let get = |key: &str| record.get(key).cloned().unwrap_or_default();
        keys.push(ObjectInfo {
            checksum_algorithm: get("/checksumalgorithm"),
            key: get("/key"),
            last_modified: get("/lastmodified"),
            etag: trim_etag(&get("/etag")),
            size: get("/size").parse().unwrap_or(0),
            storage_class: get("/storageclass"),
            owner_display_name: get("/owner/displayname"),
            owner_id: get("/owner/id"),
        });
    }
    Ok(ListObjectsV2Result { truncated, keys })
}

fn file_size(path: &Path) -> Result<u64, Error> {
    Ok(std::fs::metadata(path)
        .map_err(|e| Error::config(format!("cannot open file {}: {e}", path.display())))?
        .len())
}

#[cfg(test)]
mod tests {
    use super::parse_list_objects;
    use pretty_assertions::assert_eq;

    #[test]
    fn list_objects_parse() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult>
  <IsTruncated>true</IsTruncated>
  <Contents>
    <Key>a.bin</Key>
    <LastModified>2023-04-18T15:30:22.000Z</LastModified>
    <ETag>&quot;e1&quot;</ETag>
    <Size>1024</Size>
    <StorageClass>STANDARD</StorageClass>
  </Contents>
  <Contents>
    <Key>b.bin</Key>
    <ETag>"e2"</ETag>
    <Size>2048</Size>
  </Contents>
</ListBucketResult>"#;
        let result = parse_list_objects(xml).unwrap();
        assert!(result.truncated);
        assert_eq!(2, result.keys.len());
        assert_eq!("a.bin", result.keys[0].key);
        assert_eq!("e1", result.keys[0].etag);
        assert_eq!(1024, result.keys[0].size);
        assert_eq!("e2", result.keys[1].etag);
    }

    #[test]
    fn empty_body_is_an_empty_listing() {
        let result = parse_list_objects("").unwrap();
        assert!(!result.truncated);
        assert!(result.keys.is_empty());
    }
}
