/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Sends a single signed S3 REST request and prints the response.

use bytes::Bytes;
use clap::Parser;
use shoal_cli::{init_tracing, parse_pairs, resolve_endpoints, CredentialArgs};
use shoal_client::config::random_endpoint;
use shoal_client::http::{BodySource, Method};
use shoal_client::{Client, Error, SendParams};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "s3-client")]
#[command(about = "Send a signed REST request to an S3-compatible service.")]
struct Args {
    #[command(flatten)]
    credentials: CredentialArgs,

    /// Endpoint URL, or a file with one endpoint URL per line
    #[arg(short = 'e', long)]
    endpoint: String,

    /// Endpoint to sign for, when requests travel through a tunnel
    #[arg(long)]
    sign_endpoint: Option<String>,

    /// HTTP method
    #[arg(short = 'm', long, default_value = "GET")]
    method: String,

    /// Bucket name
    #[arg(short = 'b', long)]
    bucket: Option<String>,

    /// Key name
    #[arg(short = 'k', long)]
    key: Option<String>,

    /// Query parameters, key=value (repeatable)
    #[arg(short = 'P', long = "param")]
    params: Vec<String>,

    /// Additional headers, name=value, lowercase names (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long)]
    data: Option<String>,

    /// Read the request body from a file
    #[arg(short = 'f', long, conflicts_with = "data")]
    data_file: Option<PathBuf>,

    /// Write the response body to a file instead of standard output
    #[arg(short = 'o', long)]
    outfile: Option<PathBuf>,

    /// Signing region
    #[arg(long, default_value = shoal_client::DEFAULT_REGION)]
    region: String,
}

async fn run(args: &Args) -> Result<(), Error> {
    let endpoints = resolve_endpoints(&args.endpoint)?;
    let mut builder = Client::builder()
        .maybe_credentials(args.credentials.resolve()?)
        .endpoint(random_endpoint(&endpoints).clone())
        .region(args.region.clone());
    if let Some(sign_endpoint) = &args.sign_endpoint {
        builder = builder.signing_endpoint(sign_endpoint.parse()?);
    }
    let client = builder.build()?;

    let mut params = SendParams::new(args.method.parse::<Method>()?);
    params.bucket = args.bucket.clone();
    params.key = args.key.clone();
    params.params = parse_pairs(&args.params)?.into_iter().collect();
    params.headers = parse_pairs(&args.headers)?
        .into_iter()
        .map(|(k, v)| (k.to_lowercase(), v))
        .collect();
    params.body = match (&args.data, &args.data_file) {
        (Some(data), _) => BodySource::Bytes(Bytes::from(data.clone().into_bytes())),
        (None, Some(path)) => {
            let length = std::fs::metadata(path)
                .map_err(|e| Error::Config(format!("cannot open file {}: {e}", path.display())))?
                .len();
            BodySource::File {
                path: path.clone(),
                offset: 0,
                length,
                mode: Default::default(),
            }
        }
        (None, None) => BodySource::Empty,
    };

    let response = client.send(params).await?;
    match &args.outfile {
        Some(path) => std::fs::write(path, &response.body)?,
        None => {
            if !response.body.is_empty() {
                println!("{}", response.text());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();
    if let Err(err) = run(&args).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
