/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Bucket name validation, applied before any request that creates a bucket.
//!
//! Rules follow the common S3 naming restrictions: at most 63 characters,
//! starting with a lowercase letter or digit, lowercase letters, digits,
//! `.` and `-` only, no `--` or `..` runs, no `xn--` prefix, no `-s3alias`
//! suffix, and not shaped like an IPv4 address.

use crate::error::Error;

/// Validates a bucket name; the error message names the violated rule.
pub fn validate_bucket_name(name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::config("bucket name is empty"));
    }
    if name.len() > 63 {
        return Err(Error::config("bucket name is longer than 63 characters"));
    }
    let first = name.as_bytes()[0];
    if !(first.is_ascii_lowercase() || first.is_ascii_digit()) {
        return Err(Error::config(
            "bucket name must start with a lowercase letter or a digit",
        ));
    }
    if name.starts_with("xn--") {
        return Err(Error::config("bucket name cannot start with `xn--`"));
    }
    if name.ends_with("-s3alias") {
        return Err(Error::config("bucket name cannot end with `-s3alias`"));
    }
    for (i, b) in name.bytes().enumerate() {
        if !(b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'-') {
            return Err(Error::config(
                "bucket name may only contain lowercase letters, digits, `.` and `-`",
            ));
        }
        if i > 0 {
            let prev = name.as_bytes()[i - 1];
            if b == b'-' && prev == b'-' {
                return Err(Error::config(
                    "bucket name cannot contain two consecutive `-` characters",
                ));
            }
            if b == b'.' && prev == b'.' {
                return Err(Error::config(
                    "bucket name cannot contain two adjacent periods",
                ));
            }
        }
    }
    if is_dotted_quad(name) {
        return Err(Error::config(
            "bucket name cannot be formatted as an IP address",
        ));
    }
    Ok(())
}

fn is_dotted_quad(name: &str) -> bool {
    let octets: Vec<&str> = name.split('.').collect();
    octets.len() == 4
        && octets
            .iter()
            .all(|o| !o.is_empty() && o.len() <= 3 && o.bytes().all(|b| b.is_ascii_digit()))
}
