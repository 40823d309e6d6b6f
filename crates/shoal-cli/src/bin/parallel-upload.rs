/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Uploads a file to a bucket with parallel multipart workers.

use clap::Parser;
use shoal_cli::{init_tracing, parse_pairs, resolve_endpoints, CredentialArgs};
use shoal_client::{Error, MetadataMap};
use shoal_transfer::{upload, TransferConfig, TransferSource};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "parallel-upload")]
#[command(about = "Upload a file to an S3 bucket.")]
struct Args {
    #[command(flatten)]
    credentials: CredentialArgs,

    /// Endpoint URL, or a file with one endpoint URL per line
    #[arg(short = 'e', long)]
    endpoint: String,

    /// Bucket name
    #[arg(short = 'b', long)]
    bucket: String,

    /// Key name
    #[arg(short = 'k', long)]
    key: String,

    /// File to upload
    #[arg(short = 'f', long)]
    file: PathBuf,

    /// Number of parallel upload jobs
    #[arg(short = 'j', long, default_value_t = 1)]
    jobs: u32,

    /// Number of parts per job
    #[arg(short = 'n', long, default_value_t = 1)]
    parts_per_job: u32,

    /// Maximum total retries across all jobs
    #[arg(short = 'r', long, default_value_t = 2)]
    retries: u32,

    /// Object metadata, key=value (repeatable)
    #[arg(long = "meta")]
    metadata: Vec<String>,

    /// Signing region
    #[arg(long, default_value = shoal_client::DEFAULT_REGION)]
    region: String,

    /// Run jobs one after another on the calling thread
    #[arg(long)]
    sync: bool,
}

async fn run(args: &Args) -> Result<String, Error> {
    let mut cfg = TransferConfig::new(&args.bucket, &args.key, resolve_endpoints(&args.endpoint)?);
    cfg.credentials = args.credentials.resolve()?;
    cfg.jobs = args.jobs;
    cfg.parts_per_job = args.parts_per_job;
    cfg.max_retries = args.retries;
    cfg.metadata = parse_pairs(&args.metadata)?
        .into_iter()
        .collect::<MetadataMap>();
    cfg.region = args.region.clone();
    cfg.sync = args.sync;
    upload(&cfg, TransferSource::File(args.file.clone())).await
}

#[tokio::main]
async fn main() {
    init_tracing();
    let args = Args::parse();
    match run(&args).await {
        Ok(etag) => println!("{etag}"),
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
