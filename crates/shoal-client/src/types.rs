/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Plain data types returned by the operation facade.

use crate::ETag;

/// A bucket row from `ListBuckets`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketInfo {
    /// Bucket name
    pub name: String,
    /// Creation timestamp, as reported by the server
    pub creation_date: String,
}

/// An object row from `ListObjectsV2`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Checksum algorithm, when reported
    pub checksum_algorithm: String,
    /// Object key
    pub key: String,
    /// Last-modified timestamp, as reported by the server
    pub last_modified: String,
    /// Entity tag, quotes stripped
    pub etag: ETag,
    /// Object size in bytes
    pub size: u64,
    /// Storage class
    pub storage_class: String,
    /// Owner display name (only with `fetch_owner`)
    pub owner_display_name: String,
    /// Owner id (only with `fetch_owner`)
    pub owner_id: String,
}

/// Parameters for `ListObjectsV2`. Only non-empty fields are sent.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsV2Config {
    /// Continuation token from a previous truncated listing
    pub continuation_token: Option<String>,
    /// Key grouping delimiter
    pub delimiter: Option<String>,
    /// Requested encoding of keys in the response
    pub encoding_type: Option<String>,
    /// Ask the server to include owner information
    pub fetch_owner: Option<String>,
    /// Limit keys to this prefix
    pub prefix: Option<String>,
    /// Start listing after this key
    pub start_after: Option<String>,
}

/// Result of `ListObjectsV2`.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsV2Result {
    /// Whether the listing was truncated
    pub truncated: bool,
    /// The returned keys
    pub keys: Vec<ObjectInfo>,
}

/// The grantee of an ACL grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grantee {
    /// Display name
    pub display_name: String,
    /// E-mail address
    pub email_address: String,
    /// Canonical user id
    pub id: String,
    /// `xsi:type` of the grantee
    pub kind: String,
    /// Group URI
    pub uri: String,
}

impl Grantee {
    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.display_name.is_empty()
            && self.email_address.is_empty()
            && self.id.is_empty()
            && self.kind.is_empty()
            && self.uri.is_empty()
    }
}

/// A single ACL grant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grant {
    /// Who the permission is granted to
    pub grantee: Grantee,
    /// The granted permission, e.g. `FULL_CONTROL`
    pub permission: String,
}

/// Bucket access control policy, as used by the `?acl` subresource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessControlPolicy {
    /// Owner display name
    pub owner_display_name: String,
    /// Owner canonical id
    pub owner_id: String,
    /// The grant list
    pub grants: Vec<Grant>,
}

/// Result of `ListObjectVersions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectVersions {
    /// Version ids, newest first as reported by the server
    pub versions: Vec<String>,
    /// Delete-marker version ids
    pub delete_markers: Vec<String>,
}
