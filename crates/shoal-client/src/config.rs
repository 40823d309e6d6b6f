/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Credentials, endpoints and endpoint-list files.

use crate::error::Error;
use crate::{Headers, MetadataMap};
use rand::Rng;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Access key id and secret access key.
///
/// Both parts are always present; a client without credentials sends
/// anonymous (unsigned) requests instead of carrying an empty pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access: String,
    secret: String,
}

impl Credentials {
    /// Creates credentials from an access key id and a secret access key.
    /// Both must be non-empty.
    pub fn new(access: impl Into<String>, secret: impl Into<String>) -> Result<Self, Error> {
        let (access, secret) = (access.into(), secret.into());
        if access.is_empty() || secret.is_empty() {
            return Err(Error::config(
                "both access and secret keys have to be specified",
            ));
        }
        Ok(Self { access, secret })
    }

    /// Returns the access key id
    pub fn access(&self) -> &str {
        &self.access
    }

    /// Returns the secret access key
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access", &self.access)
            .field("secret", &"** redacted **")
            .finish()
    }
}

/// URL scheme of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// `http://`
    Http,
    /// `https://`
    Https,
}

impl Scheme {
    fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// An S3 front-end address: `scheme://host[:port]`.
///
/// A client may hold a set of equivalent endpoints for load distribution;
/// the set is read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: Scheme,
    host: String,
    port: Option<u16>,
}

impl Endpoint {
    /// Returns the scheme
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Returns the host name
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port, when one was given explicitly
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// `host[:port]`, as used in the `host` header and the canonical request
    pub fn authority(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }
}

impl FromStr for Endpoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_end_matches('/');
        let (scheme, rest) = if let Some(rest) = s.strip_prefix("http://") {
            (Scheme::Http, rest)
        } else if let Some(rest) = s.strip_prefix("https://") {
            (Scheme::Https, rest)
        } else {
            return Err(Error::config(format!(
                "endpoint `{s}` must start with http:// or https://"
            )));
        };
        if rest.is_empty() || rest.contains('/') {
            return Err(Error::config(format!(
                "endpoint `{s}` should be http[s]://hostname[:port]"
            )));
        }
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    Error::config(format!("invalid port in endpoint `{s}`"))
                })?;
                (host, Some(port))
            }
            None => (rest, None),
        };
        if host.is_empty() {
            return Err(Error::config(format!("missing host in endpoint `{s}`")));
        }
        Ok(Endpoint {
            scheme,
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme.as_str(), self.authority())
    }
}

/// Reads an endpoint-list file: one URL per line, blank lines and
/// `#`-prefixed lines ignored.
pub fn endpoints_from_file(path: impl AsRef<Path>) -> Result<Vec<Endpoint>, Error> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("cannot open endpoint file {}: {e}", path.display()))
    })?;
    let mut endpoints = Vec::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        endpoints.push(line.parse()?);
    }
    if endpoints.is_empty() {
        return Err(Error::config(format!(
            "no endpoints in {}",
            path.display()
        )));
    }
    Ok(endpoints)
}

/// Picks an endpoint uniformly at random from a non-empty pool. With a
/// singleton pool this is a no-op.
pub fn random_endpoint(endpoints: &[Endpoint]) -> &Endpoint {
    &endpoints[rand::thread_rng().gen_range(0..endpoints.len())]
}

/// Translates user metadata `(key, value)` pairs to `x-amz-meta-*` headers.
pub fn metadata_headers(metadata: &MetadataMap) -> Headers {
    metadata
        .iter()
        .map(|(k, v)| (format!("x-amz-meta-{}", k.to_lowercase()), v.clone()))
        .collect()
}
