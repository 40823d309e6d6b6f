/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Error taxonomy shared by all operations.
//!
//! - configuration errors surface before any network I/O;
//! - transport errors and 5xx protocol errors are eligible for retry within
//!   a transfer's budget;
//! - other 4xx, integrity and programming errors are terminal.

use std::io;

/// Failed client operation
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Missing or inconsistent configuration: credentials, profiles,
    /// endpoints, bucket names. Raised without network I/O.
    #[error("configuration error: {0}")]
    Config(String),

    /// DNS, TCP, TLS or socket-level failure while talking to the server.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with an error status. `code` carries the `<Code>`
    /// element of the response body when one was present.
    #[error("server returned status {status}{}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
    Protocol {
        /// HTTP status code
        status: u16,
        /// S3 error code extracted from the response body
        code: Option<String>,
    },

    /// Typed `404` from an existence probe. Never retried.
    #[error("not found")]
    NotFound,

    /// A response violated the protocol contract: missing ETag, required XML
    /// field absent, part below the server minimum.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// Caller misuse: duplicate part number, completing an empty upload,
    /// non-lowercase header passed to the signer.
    #[error("programming error: {0}")]
    Programming(String),

    /// Local file I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub(crate) fn transport(message: impl ToString) -> Self {
        Error::Transport(message.to_string())
    }

    pub(crate) fn integrity(message: impl Into<String>) -> Self {
        Error::Integrity(message.into())
    }

    pub(crate) fn programming(message: impl Into<String>) -> Self {
        Error::Programming(message.into())
    }

    /// Whether a retry within the transfer budget may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Protocol { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<shoal_sigv4::http_request::SigningError> for Error {
    fn from(err: shoal_sigv4::http_request::SigningError) -> Self {
        Error::Programming(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn retry_classification() {
        assert!(Error::transport("connection reset").is_retryable());
        assert!(Error::Protocol {
            status: 503,
            code: None
        }
        .is_retryable());
        assert!(!Error::Protocol {
            status: 403,
            code: Some("AccessDenied".to_string())
        }
        .is_retryable());
        assert!(!Error::NotFound.is_retryable());
        assert!(!Error::config("missing secret").is_retryable());
        assert!(!Error::integrity("no etag").is_retryable());
    }
}
