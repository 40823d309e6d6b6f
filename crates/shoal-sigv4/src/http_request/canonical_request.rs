/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::settings::{SignatureLocation, SigningParams, SERVICE};
use super::sign::{SignableBody, SignableRequest};
use super::url_escape::percent_encode;
use super::SigningError;
use crate::date_time::{format_date, format_date_time};
use crate::sign::sha256_hex_string;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

pub(crate) const HMAC_256: &str = "AWS4-HMAC-SHA256";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

pub(crate) mod header {
    pub(crate) const HOST: &str = "host";
    pub(crate) const CONTENT_LENGTH: &str = "content-length";
    pub(crate) const X_AMZ_CONTENT_SHA_256: &str = "x-amz-content-sha256";
    pub(crate) const X_AMZ_DATE: &str = "x-amz-date";
    pub(crate) const X_AMZ_PREFIX: &str = "x-amz-";
}

pub(crate) mod param {
    pub(crate) const X_AMZ_ALGORITHM: &str = "X-Amz-Algorithm";
    pub(crate) const X_AMZ_CREDENTIAL: &str = "X-Amz-Credential";
    pub(crate) const X_AMZ_DATE: &str = "X-Amz-Date";
    pub(crate) const X_AMZ_EXPIRES: &str = "X-Amz-Expires";
    pub(crate) const X_AMZ_SIGNED_HEADERS: &str = "X-Amz-SignedHeaders";
    pub(crate) const X_AMZ_SIGNATURE: &str = "X-Amz-Signature";
}

/// The deterministic textual form of a request whose SHA-256 feeds the
/// string-to-sign.
#[derive(Debug, PartialEq)]
pub(crate) struct CanonicalRequest<'a> {
    pub(crate) method: &'a str,
    pub(crate) path: String,
    /// Query parameters sorted ascending by key then value, values unencoded.
    pub(crate) params: Vec<(String, String)>,
    /// Canonical header set, lowercase names. `BTreeMap` keeps the required
    /// ascending order.
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) date_time: String,
    pub(crate) content_sha256: Cow<'a, str>,
}

impl<'a> CanonicalRequest<'a> {
    /// Construct a canonical request from a [`SignableRequest`].
    ///
    /// For header signing the canonical header set is `host`,
    /// `x-amz-content-sha256` and `x-amz-date` plus every caller header whose
    /// name starts with `x-amz-` or equals `content-length`. For query
    /// signing (presigned URLs) it is `host` plus caller `x-amz-*` headers,
    /// the payload hash is pinned to `UNSIGNED-PAYLOAD`, and the presign
    /// parameters are merged into the query string before canonicalization.
    pub(crate) fn from(
        req: &'a SignableRequest<'a>,
        params: &'a SigningParams<'a>,
    ) -> Result<CanonicalRequest<'a>, SigningError> {
        for name in req.headers().keys() {
            if name.bytes().any(|b| b.is_ascii_uppercase()) {
                return Err(SigningError::non_lowercase_header_name(name.clone()));
            }
        }

        let path = resource_path(req.bucket(), req.key())?;
        let host = authority(req.endpoint())?;
        let date_time = format_date_time(params.time());

        let (content_sha256, headers) = match params.settings().signature_location {
            SignatureLocation::Headers => {
                let payload_hash = Self::payload_hash(req.body());
                let mut headers = BTreeMap::new();
                headers.insert(header::HOST.to_string(), host.to_string());
                headers.insert(
                    header::X_AMZ_CONTENT_SHA_256.to_string(),
                    payload_hash.to_string(),
                );
                headers.insert(header::X_AMZ_DATE.to_string(), date_time.clone());
                for (name, value) in req.headers() {
                    if name.starts_with(header::X_AMZ_PREFIX) || name == header::CONTENT_LENGTH {
                        headers.insert(name.clone(), value.clone());
                    }
                }
                (payload_hash, headers)
            }
            SignatureLocation::QueryParams => {
                let mut headers = BTreeMap::new();
                headers.insert(header::HOST.to_string(), host.to_string());
                for (name, value) in req.headers() {
                    if name.starts_with(header::X_AMZ_PREFIX) {
                        headers.insert(name.clone(), value.clone());
                    }
                }
                (Cow::Borrowed(UNSIGNED_PAYLOAD), headers)
            }
        };

        let mut query: Vec<(String, String)> = req
            .params()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if params.settings().signature_location == SignatureLocation::QueryParams {
            let expires = params
                .settings()
                .expires_in
                .ok_or_else(SigningError::missing_expiry)?;
            let scope = Scope::new(params.time(), params.region());
            let signed_headers = SignedHeaders::from_names(headers.keys());
            query.push((param::X_AMZ_ALGORITHM.to_string(), HMAC_256.to_string()));
            query.push((
                param::X_AMZ_CREDENTIAL.to_string(),
                format!("{}/{}", params.access(), scope),
            ));
            query.push((param::X_AMZ_DATE.to_string(), date_time.clone()));
            query.push((
                param::X_AMZ_EXPIRES.to_string(),
                expires.as_secs().to_string(),
            ));
            query.push((
                param::X_AMZ_SIGNED_HEADERS.to_string(),
                signed_headers.to_string(),
            ));
        }
        query.sort();

        Ok(CanonicalRequest {
            method: req.method(),
            path,
            params: query,
            headers,
            date_time,
            content_sha256,
        })
    }

    pub(crate) fn signed_headers(&self) -> SignedHeaders {
        SignedHeaders::from_names(self.headers.keys())
    }

    /// The percent-encoded canonical query string, also used verbatim in
    /// presigned URLs.
    pub(crate) fn query_string(&self) -> String {
        let mut out = String::new();
        for (i, (key, value)) in self.params.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            out.push_str(&percent_encode(key));
            out.push('=');
            out.push_str(&percent_encode(value));
        }
        out
    }

    fn payload_hash<'b>(body: &'b SignableBody<'b>) -> Cow<'b, str> {
        match body {
            SignableBody::Bytes(data) => Cow::Owned(sha256_hex_string(data)),
            SignableBody::Precomputed(digest) => Cow::Borrowed(digest.as_str()),
            SignableBody::UnsignedPayload => Cow::Borrowed(UNSIGNED_PAYLOAD),
        }
    }
}

impl<'a> fmt::Display for CanonicalRequest<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", self.query_string())?;
        for (name, value) in &self.headers {
            writeln!(f, "{name}:{value}")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers())?;
        write!(f, "{}", self.content_sha256)?;
        Ok(())
    }
}

/// The `;`-joined, lowercase, ascending list of signed header names.
#[derive(Debug, PartialEq, Default)]
pub(crate) struct SignedHeaders {
    inner: Vec<String>,
}

impl SignedHeaders {
    fn from_names<'b>(names: impl Iterator<Item = &'b String>) -> Self {
        let mut inner: Vec<String> = names.cloned().collect();
        inner.sort();
        SignedHeaders { inner }
    }
}

impl fmt::Display for SignedHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut iter = self.inner.iter().peekable();
        while let Some(next) = iter.next() {
            match iter.peek().is_some() {
                true => write!(f, "{next};")?,
                false => write!(f, "{next}")?,
            };
        }
        Ok(())
    }
}

/// Credential scope: `<date>/<region>/s3/aws4_request`
#[derive(Debug, PartialEq, Clone)]
pub(crate) struct Scope<'a> {
    date: String,
    region: &'a str,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(time: std::time::SystemTime, region: &'a str) -> Self {
        Self {
            date: format_date(time),
            region,
        }
    }
}

impl<'a> fmt::Display for Scope<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/aws4_request", self.date, self.region, SERVICE)
    }
}

#[derive(Debug, PartialEq)]
pub(crate) struct StringToSign<'a> {
    pub(crate) scope: Scope<'a>,
    pub(crate) date_time: String,
    pub(crate) hashed_creq: &'a str,
}

impl<'a> StringToSign<'a> {
    pub(crate) fn new(
        time: std::time::SystemTime,
        region: &'a str,
        hashed_creq: &'a str,
    ) -> Self {
        Self {
            scope: Scope::new(time, region),
            date_time: format_date_time(time),
            hashed_creq,
        }
    }
}

impl<'a> fmt::Display for StringToSign<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}",
            HMAC_256, self.date_time, self.scope, self.hashed_creq
        )
    }
}

/// `/bucket[/key]`, or `/` when no bucket is given. The key is not re-encoded;
/// callers pass keys that already conform to S3 naming.
pub(crate) fn resource_path(bucket: Option<&str>, key: Option<&str>) -> Result<String, SigningError> {
    match (bucket, key) {
        (None, Some(_)) => Err(SigningError::key_without_bucket()),
        (None, None) => Ok("/".to_string()),
        (Some(bucket), None) => Ok(format!("/{bucket}")),
        (Some(bucket), Some(key)) => Ok(format!("/{bucket}/{key}")),
    }
}

/// `host[:port]` from `scheme://host[:port][/...]`.
fn authority(endpoint: &str) -> Result<&str, SigningError> {
    let rest = endpoint
        .strip_prefix("http://")
        .or_else(|| endpoint.strip_prefix("https://"))
        .ok_or_else(|| SigningError::malformed_endpoint(endpoint))?;
    let authority = rest.split('/').next().unwrap_or("");
    if authority.is_empty() {
        return Err(SigningError::malformed_endpoint(endpoint));
    }
    Ok(authority)
}
