/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Generates random S3 access and secret keys.

use clap::Parser;
use rand::Rng;

const CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz\
                       ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                       0123456789+/=";
const ACCESS_LENGTH: usize = 18;
const SECRET_LENGTH: usize = 36;
// access keys skip the lowercase range of the alphabet
const ACCESS_FIRST: usize = 26;

#[derive(Debug, Parser)]
#[command(name = "generate-s3-credentials")]
#[command(about = "Generate S3 access and secret keys.")]
struct Args {
    /// Generate only one of the two keys
    #[arg(value_parser = ["access", "secret"])]
    only: Option<String>,
}

fn generate(length: usize, first: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARS[rng.gen_range(first..CHARS.len())] as char)
        .collect()
}

fn main() {
    let args = Args::parse();
    let (gen_access, gen_secret) = match args.only.as_deref() {
        Some("access") => (true, false),
        Some("secret") => (false, true),
        _ => (true, true),
    };
    if gen_access {
        println!("{}", generate(ACCESS_LENGTH, ACCESS_FIRST));
    }
    if gen_secret {
        println!("{}", generate(SECRET_LENGTH, 0));
    }
}
