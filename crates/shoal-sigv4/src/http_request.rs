/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Utilities to sign S3 HTTP requests.
//!
//! # Example: signing a request with the `Authorization` header
//!
//! ```rust
//! use shoal_sigv4::http_request::{
//!     sign, SignableBody, SignableRequest, SigningParams, SigningSettings,
//! };
//! use std::collections::BTreeMap;
//! use std::time::SystemTime;
//!
//! # fn main() -> Result<(), shoal_sigv4::http_request::SigningError> {
//! let params = SigningParams::builder()
//!     .access("AKIDEXAMPLE")
//!     .secret("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
//!     .time(SystemTime::now())
//!     .settings(SigningSettings::default())
//!     .build()
//!     .expect("signing params are valid");
//!
//! let headers = BTreeMap::new();
//! let query = BTreeMap::new();
//! let request = SignableRequest::new(
//!     "GET",
//!     "https://storage.example.com:9000",
//!     Some("bucket1"),
//!     Some("key1"),
//!     &query,
//!     &headers,
//!     SignableBody::UnsignedPayload,
//! );
//!
//! let (instructions, signature) = sign(request, &params)?.into_parts();
//! for (name, value) in instructions.headers() {
//!     // apply to the outgoing request
//!     let _ = (name, value);
//! }
//! # let _ = signature;
//! # Ok(())
//! # }
//! ```

mod canonical_request;
mod error;
mod settings;
mod sign;
mod url_escape;

pub use error::SigningError;
pub use settings::{
    signing_params, SignatureLocation, SigningParams, SigningSettings, DEFAULT_REGION, SERVICE,
};
pub use sign::{presigned_url, sign, SignableBody, SignableRequest, SigningInstructions};
