/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Shared plumbing for the command-line tools: credential resolution,
//! endpoint handling, and logging setup.

use shoal_client::config::endpoints_from_file;
use shoal_client::profile::load_credentials;
use shoal_client::{Credentials, Endpoint, Error};
use std::path::{Path, PathBuf};

/// Installs a `tracing` subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

/// Credential flags shared by every command.
#[derive(Debug, Clone, clap::Args)]
pub struct CredentialArgs {
    /// Access key id
    #[arg(short = 'a', long)]
    pub access_key: Option<String>,

    /// Secret access key
    #[arg(short = 's', long)]
    pub secret_key: Option<String>,

    /// Credentials file, AWS CLI format (default: $HOME/.aws/credentials)
    #[arg(short = 'c', long)]
    pub credentials: Option<PathBuf>,

    /// Profile in the credentials file
    #[arg(short = 'p', long)]
    pub profile: Option<String>,
}

impl CredentialArgs {
    /// Resolves credentials from flags, then from the credentials file.
    ///
    /// Giving only one of access and secret is an error. With neither given
    /// and no usable credentials file, requests go out anonymous.
    pub fn resolve(&self) -> Result<Option<Credentials>, Error> {
        match (&self.access_key, &self.secret_key) {
            (Some(access), Some(secret)) => Ok(Some(Credentials::new(access, secret)?)),
            (Some(_), None) | (None, Some(_)) => Err(Error::Config(
                "both access and secret keys have to be specified".to_string(),
            )),
            (None, None) => {
                let explicit = self.credentials.is_some() || self.profile.is_some();
                match load_credentials(self.credentials.as_deref(), self.profile.as_deref()) {
                    Ok(credentials) => Ok(Some(credentials)),
                    Err(_) if !explicit => Ok(None),
                    Err(err) => Err(err),
                }
            }
        }
    }
}

/// Interprets `endpoint` as a URL, or as the path of an endpoint-list file
/// when it does not start with a scheme.
pub fn resolve_endpoints(endpoint: &str) -> Result<Vec<Endpoint>, Error> {
    if endpoint.starts_with("http:") || endpoint.starts_with("https:") {
        Ok(vec![endpoint.parse()?])
    } else {
        endpoints_from_file(Path::new(endpoint))
    }
}

/// Splits repeated `key=value` flags into pairs.
pub fn parse_pairs(raw: &[String]) -> Result<Vec<(String, String)>, Error> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .ok_or_else(|| Error::Config(format!("`{pair}` is not of the form key=value")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pairs_parse_and_reject() {
        let pairs = parse_pairs(&["a=1".to_string(), "b = two".to_string()]).unwrap();
        assert_eq!(("a".to_string(), "1".to_string()), pairs[0]);
        assert_eq!(("b".to_string(), "two".to_string()), pairs[1]);
        assert!(parse_pairs(&["nopair".to_string()]).is_err());
    }

    #[test]
    fn endpoint_arg_is_url_or_file() {
        assert_eq!(1, resolve_endpoints("http://localhost:9000").unwrap().len());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "http://10.0.0.1:9000").unwrap();
        writeln!(file, "http://10.0.0.2:9000").unwrap();
        let endpoints = resolve_endpoints(file.path().to_str().unwrap()).unwrap();
        assert_eq!(2, endpoints.len());

        assert!(resolve_endpoints("/no/such/endpoints-file").is_err());
    }

    #[test]
    fn lone_access_key_is_rejected() {
        let args = CredentialArgs {
            access_key: Some("AKID".to_string()),
            secret_key: None,
            credentials: None,
            profile: None,
        };
        assert!(args.resolve().is_err());
    }
}
