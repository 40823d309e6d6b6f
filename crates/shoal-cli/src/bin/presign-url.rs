/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Generates a presigned URL for an S3 request.

use clap::Parser;
use shoal_cli::{init_tracing, parse_pairs, CredentialArgs};
use shoal_client::{Error, Params};
use shoal_sigv4::http_request::{
    presigned_url, SignableBody, SignableRequest, SignatureLocation, SigningParams,
    SigningSettings,
};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

#[derive(Debug, Parser)]
#[command(name = "presign-url")]
#[command(about = "Generate a presigned URL valid for a bounded lifetime.")]
struct Args {
    #[command(flatten)]
    credentials: CredentialArgs,

    /// Endpoint URL, http[s]://host[:port]
    #[arg(short = 'e', long)]
    endpoint: String,

    /// HTTP method the URL grants
    #[arg(short = 'm', long, default_value = "GET")]
    method: String,

    /// Bucket name
    #[arg(short = 'b', long)]
    bucket: Option<String>,

    /// Key name
    #[arg(short = 'k', long)]
    key: Option<String>,

    /// Expiration in seconds
    #[arg(short = 't', long, default_value_t = 3600)]
    expiration: u64,

    /// Signing region
    #[arg(long, default_value = shoal_client::DEFAULT_REGION)]
    region: String,

    /// Additional query parameters, key=value
    #[arg(short = 'P', long = "param")]
    params: Vec<String>,
}

fn run(args: &Args) -> Result<String, Error> {
    let credentials = args
        .credentials
        .resolve()?
        .ok_or_else(|| Error::Config("presigning requires credentials".to_string()))?;

    let params: Params = parse_pairs(&args.params)?.into_iter().collect();
    let headers = BTreeMap::new();
    let method = args.method.to_uppercase();

    let mut settings = SigningSettings::default();
    settings.signature_location = SignatureLocation::QueryParams;
    settings.expires_in = Some(Duration::from_secs(args.expiration));
    let signing_params = SigningParams::builder()
        .access(credentials.access())
        .secret(credentials.secret())
        .region(&args.region)
        .time(SystemTime::now())
        .settings(settings)
        .build()
        .map_err(|e| Error::Config(e.to_string()))?;

    let request = SignableRequest::new(
        &method,
        &args.endpoint,
        args.bucket.as_deref(),
        args.key.as_deref(),
        &params,
        &headers,
        SignableBody::UnsignedPayload,
    );
    Ok(presigned_url(request, &signing_params)?)
}

fn main() {
    init_tracing();
    let args = Args::parse();
    match run(&args) {
        Ok(url) => println!("{url}"),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
