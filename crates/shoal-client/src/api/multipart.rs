/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The multipart upload REST quartet. The stateful coordinator lives in
//! [`crate::multipart`].

use super::{etag_from_headers, Client, SendParams};
use crate::config::metadata_headers;
use crate::error::Error;
use crate::http::{BodySource, FileIoMode, Method};
use crate::xml::{trim_etag, Document, XmlWriter};
use crate::{ETag, Headers, MetadataMap, Params, UploadId};
use bytes::Bytes;
use std::path::Path;

const UPLOADS: &str = "uploads";
const UPLOAD_ID: &str = "uploadId";
const PART_NUMBER: &str = "partNumber";

impl Client {
    /// `POST /<bucket>/<key>?uploads`; returns the server-issued upload id.
    pub async fn create_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        metadata: &MetadataMap,
        mut headers: Headers,
    ) -> Result<UploadId, Error> {
        headers.append(&mut metadata_headers(metadata));
        let mut params = SendParams::new(Method::Post);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        params.params = Params::from([(UPLOADS.to_string(), String::new())]);
        params.headers = headers;
        let response = self.send(params).await?;

        let doc = Document::parse(&response.text())?;
        match doc.text("uploadid") {
            Some(upload_id) if !upload_id.is_empty() => Ok(upload_id),
            _ => Err(Error::integrity(
                "CreateMultipartUpload response carries no UploadId",
            )),
        }
    }

    /// `PUT /<bucket>/<key>?partNumber=<n>&uploadId=<id>` from a buffer;
    /// returns the part's ETag. `part_number` is 1-based.
    pub async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        data: Bytes,
        payload_hash: Option<&str>,
    ) -> Result<ETag, Error> {
        let mut params = SendParams::new(Method::Put);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        params.params = part_params(upload_id, part_number);
        params.payload_hash = payload_hash.map(str::to_string);
        params.body = BodySource::Bytes(data);
        let response = self.send(params).await?;
        etag_from_headers(&response, "UploadPart")
    }

    /// `PUT /<bucket>/<key>?partNumber=<n>&uploadId=<id>` from a file range.
    #[allow(clippy::too_many_arguments)]
    pub async fn upload_file_part(
        &self,
        path: impl AsRef<Path>,
        offset: u64,
        length: u64,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        mode: FileIoMode,
    ) -> Result<ETag, Error> {
        let mut params = SendParams::new(Method::Put);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        params.params = part_params(upload_id, part_number);
        params.body = BodySource::File {
            path: path.as_ref().to_path_buf(),
            offset,
            length,
            mode,
        };
        let response = self.send(params).await?;
        etag_from_headers(&response, "UploadPart")
    }

    /// `POST /<bucket>/<key>?uploadId=<id>` with the completion manifest;
    /// returns the object's ETag.
    ///
    /// Parts are listed in strictly ascending part-number order; a duplicate
    /// part number or an empty part list is a programming error.
    pub async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[(u32, ETag)],
    ) -> Result<ETag, Error> {
        let body = completion_manifest(parts)?;
        let mut params = SendParams::new(Method::Post);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        params.params = Params::from([(UPLOAD_ID.to_string(), upload_id.to_string())]);
        params.body = BodySource::Bytes(Bytes::from(body));
        let response = self.send(params).await?;

        let doc = Document::parse(&response.text())?;
        match doc.text("etag") {
            Some(etag) if !etag.is_empty() => Ok(trim_etag(&etag)),
            _ => Err(Error::integrity(
                "CompleteMultipartUpload response carries no ETag",
            )),
        }
    }

    /// `DELETE /<bucket>/<key>?uploadId=<id>`; releases the server-side
    /// upload and its parts.
    pub async fn abort_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
    ) -> Result<(), Error> {
        let mut params = SendParams::new(Method::Delete);
        params.bucket = Some(bucket.to_string());
        params.key = Some(key.to_string());
        params.params = Params::from([(UPLOAD_ID.to_string(), upload_id.to_string())]);
        self.send(params).await?;
        Ok(())
    }
}

fn part_params(upload_id: &str, part_number: u32) -> Params {
    Params::from([
        (PART_NUMBER.to_string(), part_number.to_string()),
        (UPLOAD_ID.to_string(), upload_id.to_string()),
    ])
}

/// Builds the completion manifest, sorted ascending by part number.
fn completion_manifest(parts: &[(u32, ETag)]) -> Result<String, Error> {
    if parts.is_empty() {
        return Err(Error::programming(
            "completing a multipart upload requires at least one part",
        ));
    }
    let mut parts: Vec<&(u32, ETag)> = parts.iter().collect();
    parts.sort_by_key(|(number, _)| *number);
    for pair in parts.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(Error::programming(format!(
                "duplicate part number {} in completion list",
                pair[0].0
            )));
        }
    }

    let mut xml = XmlWriter::with_declaration();
    xml.open_ns(
        "CompleteMultipartUpload",
        "http://s3.amazonaws.com/doc/2006-03-01/",
    );
    for (number, etag) in parts {
        xml.open("Part")
            .element("ETag", etag)
            .element("PartNumber", &number.to_string())
            .close();
    }
    Ok(xml.finish())
}

#[cfg(test)]
mod tests {
    use super::completion_manifest;
    use crate::error::Error;

    #[test]
    fn manifest_lists_parts_in_ascending_order() {
        let parts = vec![
            (3, "e3".to_string()),
            (1, "e1".to_string()),
            (2, "e2".to_string()),
        ];
        let xml = completion_manifest(&parts).unwrap();
        let first = xml.find("<PartNumber>1</PartNumber>").unwrap();
        let second = xml.find("<PartNumber>2</PartNumber>").unwrap();
        let third = xml.find("<PartNumber>3</PartNumber>").unwrap();
        assert!(first < second && second < third);
        assert!(xml.contains("xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\""));
        assert!(xml.contains("<Part><ETag>e1</ETag><PartNumber>1</PartNumber></Part>"));
    }

    #[test]
    fn duplicate_part_numbers_are_a_programming_error() {
        let parts = vec![(1, "e1".to_string()), (1, "e1-again".to_string())];
        assert!(matches!(
            completion_manifest(&parts),
            Err(Error::Programming(_))
        ));
    }

    #[test]
    fn empty_part_list_is_a_programming_error() {
        assert!(matches!(completion_manifest(&[]), Err(Error::Programming(_))));
    }
}
