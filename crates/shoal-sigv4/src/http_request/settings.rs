/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::time::{Duration, SystemTime};

/// Region used when the caller does not specify one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Service name in the credential scope. This signer only signs for S3.
pub const SERVICE: &str = "s3";

/// Where to place the signature in the signed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureLocation {
    /// Place the signature in the `Authorization` header.
    #[default]
    Headers,

    /// Place the signature in the query string (presigned URLs).
    QueryParams,
}

/// Settings that alter signing behavior.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct SigningSettings {
    /// Where to put the signature.
    pub signature_location: SignatureLocation,

    /// How long a presigned URL is valid for. Required when signing with
    /// [`SignatureLocation::QueryParams`], ignored otherwise.
    pub expires_in: Option<Duration>,
}

/// Parameters to use when signing.
#[derive(Debug)]
#[non_exhaustive]
pub struct SigningParams<'a> {
    pub(crate) access: &'a str,
    pub(crate) secret: &'a str,
    pub(crate) region: &'a str,
    /// Timestamp to use in the signature (should be `SystemTime::now()` unless testing).
    pub(crate) time: SystemTime,
    pub(crate) settings: SigningSettings,
}

impl<'a> SigningParams<'a> {
    /// Returns the access key id that will be referenced in the credential scope
    pub fn access(&self) -> &str {
        self.access
    }

    /// Returns the region that will be used to sign
    pub fn region(&self) -> &str {
        self.region
    }

    /// Returns the timestamp the signature is computed for
    pub fn time(&self) -> SystemTime {
        self.time
    }

    /// Returns the signing settings
    pub fn settings(&self) -> &SigningSettings {
        &self.settings
    }

    /// Returns a builder that can create new `SigningParams`.
    pub fn builder() -> signing_params::Builder<'a> {
        Default::default()
    }
}

/// Builder and error for creating [`SigningParams`]
pub mod signing_params {
    use super::{SigningParams, SigningSettings, DEFAULT_REGION};
    use std::error::Error;
    use std::fmt;
    use std::time::SystemTime;

    /// [`SigningParams`] builder error
    #[derive(Debug)]
    pub struct BuildError {
        reason: &'static str,
    }
    impl BuildError {
        fn new(reason: &'static str) -> Self {
            Self { reason }
        }
    }

    impl fmt::Display for BuildError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.reason)
        }
    }

    impl Error for BuildError {}

    /// Builder that can create new [`SigningParams`]
    #[derive(Debug, Default)]
    pub struct Builder<'a> {
        access: Option<&'a str>,
        secret: Option<&'a str>,
        region: Option<&'a str>,
        time: Option<SystemTime>,
        settings: Option<SigningSettings>,
    }

    impl<'a> Builder<'a> {
        /// Sets the access key id (required)
        pub fn access(mut self, access: &'a str) -> Self {
            self.access = Some(access);
            self
        }

        /// Sets the secret access key (required)
        pub fn secret(mut self, secret: &'a str) -> Self {
            self.secret = Some(secret);
            self
        }

        /// Sets the region (defaults to `us-east-1`)
        pub fn region(mut self, region: &'a str) -> Self {
            self.region = Some(region);
            self
        }

        /// Sets the time to be used in the signature (required)
        pub fn time(mut self, time: SystemTime) -> Self {
            self.time = Some(time);
            self
        }

        /// Sets additional signing settings (required)
        pub fn settings(mut self, settings: SigningSettings) -> Self {
            self.settings = Some(settings);
            self
        }

        /// Builds an instance of [`SigningParams`]. Will yield a [`BuildError`] if
        /// a required argument was not given.
        pub fn build(self) -> Result<SigningParams<'a>, BuildError> {
            Ok(SigningParams {
                access: self
                    .access
                    .ok_or_else(|| BuildError::new("an access key is required"))?,
                secret: self
                    .secret
                    .ok_or_else(|| BuildError::new("a secret key is required"))?,
                region: self.region.unwrap_or(DEFAULT_REGION),
                time: self
                    .time
                    .ok_or_else(|| BuildError::new("time is required"))?,
                settings: self
                    .settings
                    .ok_or_else(|| BuildError::new("settings are required"))?,
            })
        }
    }
}
