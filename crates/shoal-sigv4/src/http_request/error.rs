/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::error::Error;
use std::fmt;

#[derive(Debug)]
enum SigningErrorKind {
    NonLowercaseHeaderName { name: String },
    KeyWithoutBucket,
    MalformedEndpoint { endpoint: String },
    MissingExpiry,
    NotQuerySigning,
}

/// Error signing a request
#[derive(Debug)]
pub struct SigningError {
    kind: SigningErrorKind,
}

impl SigningError {
    pub(crate) fn non_lowercase_header_name(name: impl Into<String>) -> Self {
        Self {
            kind: SigningErrorKind::NonLowercaseHeaderName { name: name.into() },
        }
    }

    pub(crate) fn key_without_bucket() -> Self {
        Self {
            kind: SigningErrorKind::KeyWithoutBucket,
        }
    }

    pub(crate) fn malformed_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            kind: SigningErrorKind::MalformedEndpoint {
                endpoint: endpoint.into(),
            },
        }
    }

    pub(crate) fn missing_expiry() -> Self {
        Self {
            kind: SigningErrorKind::MissingExpiry,
        }
    }

    pub(crate) fn not_query_signing() -> Self {
        Self {
            kind: SigningErrorKind::NotQuerySigning,
        }
    }
}

impl fmt::Display for SigningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SigningErrorKind::*;
        match &self.kind {
            NonLowercaseHeaderName { name } => {
                write!(f, "header names passed to the signer must be lowercase: `{name}`")
            }
            KeyWithoutBucket => write!(f, "an object key requires a bucket"),
            MalformedEndpoint { endpoint } => {
                write!(f, "endpoint `{endpoint}` is not of the form scheme://host[:port]")
            }
            MissingExpiry => {
                write!(f, "query-parameter signing requires an expiration")
            }
            NotQuerySigning => {
                write!(
                    f,
                    "presigned URLs require settings with `SignatureLocation::QueryParams`"
                )
            }
        }
    }
}

impl Error for SigningError {}
