/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;

/// Bytes to percent-encode in canonical query strings: everything outside the
/// RFC 3986 unreserved set `[A-Za-z0-9-_.~]`. Spaces become `%20`, hex digits
/// are uppercase.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub(super) fn percent_encode(value: &str) -> Cow<'_, str> {
    utf8_percent_encode(value, QUERY_SET).into()
}

#[cfg(test)]
mod tests {
    use super::percent_encode;

    #[test]
    fn unreserved_characters_pass_through() {
        assert_eq!("abcXYZ019-_.~", percent_encode("abcXYZ019-_.~"));
    }

    #[test]
    fn reserved_characters_are_encoded_uppercase() {
        assert_eq!("a%20b", percent_encode("a b"));
        assert_eq!("%2B%2F%3D", percent_encode("+/="));
        assert_eq!("key%2Fwith%2Fslashes", percent_encode("key/with/slashes"));
    }
}
