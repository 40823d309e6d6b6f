/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Transport URL assembly.
//!
//! The query string sent on the wire uses the same percent-encoding as the
//! canonical query string in the signature, so the server decodes exactly
//! the parameters that were signed.

use crate::config::Endpoint;
use crate::Params;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub(crate) fn encode_query(params: &Params) -> String {
    let mut out = String::new();
    for (i, (key, value)) in params.iter().enumerate() {
        if i > 0 {
            out.push('&');
        }
        out.push_str(&utf8_percent_encode(key, QUERY_SET).to_string());
        out.push('=');
        out.push_str(&utf8_percent_encode(value, QUERY_SET).to_string());
    }
    out
}

pub(crate) fn build_url(
    endpoint: &Endpoint,
    bucket: Option<&str>,
    key: Option<&str>,
    params: &Params,
) -> String {
    let mut url = endpoint.to_string();
    if let Some(bucket) = bucket {
        url.push('/');
        url.push_str(bucket);
        if let Some(key) = key {
            url.push('/');
            url.push_str(key);
        }
    }
    if !params.is_empty() {
        url.push('?');
        url.push_str(&encode_query(params));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn urls_compose_endpoint_path_and_query() {
        let endpoint: Endpoint = "http://localhost:9000".parse().unwrap();
        assert_eq!(
            "http://localhost:9000",
            build_url(&endpoint, None, None, &Params::new())
        );
        assert_eq!(
            "http://localhost:9000/bucket1",
            build_url(&endpoint, Some("bucket1"), None, &Params::new())
        );
        let params = Params::from([
            ("uploadId".to_string(), "id+1".to_string()),
            ("partNumber".to_string(), "3".to_string()),
        ]);
        assert_eq!(
            "http://localhost:9000/bucket1/key1?partNumber=3&uploadId=id%2B1",
            build_url(&endpoint, Some("bucket1"), Some("key1"), &params)
        );
    }
}
