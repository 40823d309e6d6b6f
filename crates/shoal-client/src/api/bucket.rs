/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Bucket operations: lifecycle, ACLs and tagging.

use super::{Client, SendParams};
use crate::bucket::validate_bucket_name;
use crate::error::Error;
use crate::http::Method;
use crate::types::{AccessControlPolicy, BucketInfo, Grant, Grantee};
use crate::xml::{Document, XmlWriter};
use crate::{Headers, Params, TagMap};
use bytes::Bytes;

const TAGGING: &str = "tagging";
const ACL: &str = "acl";

impl Client {
    /// `PUT /<bucket>`. The name is validated locally before any request
    /// goes out.
    pub async fn create_bucket(&self, bucket: &str, headers: Headers) -> Result<(), Error> {
        validate_bucket_name(bucket)?;
        let mut params = SendParams::new(Method::Put);
        params.bucket = Some(bucket.to_string());
        params.headers = headers;
        self.send(params).await?;
        Ok(())
    }

    /// `DELETE /<bucket>`
    pub async fn delete_bucket(&self, bucket: &str) -> Result<(), Error> {
        let mut params = SendParams::new(Method::Delete);
        params.bucket = Some(bucket.to_string());
        self.send(params).await?;
        Ok(())
    }

    /// `HEAD /<bucket>`; returns the response header map. A missing bucket
    /// surfaces as [`Error::NotFound`].
    pub async fn head_bucket(&self, bucket: &str) -> Result<Headers, Error> {
        let mut params = SendParams::new(Method::Head);
        params.bucket = Some(bucket.to_string());
        let response = self.send(params).await?;
        Ok(response.headers)
    }

    /// Existence probe built on [`Client::head_bucket`].
    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool, Error> {
        match self.head_bucket(bucket).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// `GET /`; lists all buckets owned by the caller.
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>, Error> {
        let response = self.send(SendParams::new(Method::Get)).await?;
        let doc = Document::parse(&response.text())?;
        let mut buckets = Vec::new();
        for record in doc.records("listallmybucketsresult/buckets/bucket") {
            buckets.push(BucketInfo {
                name: record.get("/name").cloned().unwrap_or_default(),
                creation_date: record.get("/creationdate").cloned().unwrap_or_default(),
            });
        }
        Ok(buckets)
    }

    /// `GET /<bucket>?acl`
    pub async fn get_bucket_acl(&self, bucket: &str) -> Result<AccessControlPolicy, Error> {
        let mut params = SendParams::new(Method::Get);
        params.bucket = Some(bucket.to_string());
        params.params = Params::from([(ACL.to_string(), String::new())]);
        let response = self.send(params).await?;
        let doc = Document::parse(&response.text())?;

        let mut acl = AccessControlPolicy {
            owner_display_name: doc
                .text("accesscontrolpolicy/owner/displayname")
                .unwrap_or_default(),
            owner_id: doc.text("accesscontrolpolicy/owner/id").unwrap_or_default(),
            grants: Vec::new(),
        };
        for record in doc.records("accesscontrolpolicy/accesscontrollist/grant") {
            let get = |key: &str| record.get(key).cloned().unwrap_or_default();
            acl.grants.push(Grant {
                grantee: Grantee {
                    display_name: get("/grantee/displayname"),
                    email_address: get("/grantee/emailaddress"),
                    id: get("/grantee/id"),
                    kind: get("/grantee/type"),
                    uri: get("/grantee/uri"),
                },
                permission: get("/permission"),
            });
        }
        Ok(acl)
    }

    /// `PUT /<bucket>?acl` with a generated `AccessControlPolicy` body.
    /// Every grant must carry a permission.
    pub async fn put_bucket_acl(
        &self,
        bucket: &str,
        acl: &AccessControlPolicy,
    ) -> Result<(), Error> {
        let body = acl_xml(acl)?;
        let mut params = SendParams::new(Method::Put);
        params.bucket = Some(bucket.to_string());
        params.params = Params::from([(ACL.to_string(), String::new())]);
        params.body = crate::http::BodySource::Bytes(Bytes::from(body));
        self.send(params).await?;
        Ok(())
    }

    /// `GET /<bucket>?tagging`
    pub async fn get_bucket_tagging(&self, bucket: &str) -> Result<TagMap, Error> {
        let mut params = SendParams::new(Method::Get);
        params.bucket = Some(bucket.to_string());
        params.params = Params::from([(TAGGING.to_string(), String::new())]);
        let response = self.send(params).await?;
        parse_tagging(&response.text())
    }

    /// `PUT /<bucket>?tagging`
    pub async fn put_bucket_tagging(&self, bucket: &str, tags: &TagMap) -> Result<(), Error> {
        let mut params = SendParams::new(Method::Put);
        params.bucket = Some(bucket.to_string());
        params.params = Params::from([(TAGGING.to_string(), String::new())]);
        params.body = crate::http::BodySource::Bytes(Bytes::from(tagging_xml(tags)));
        self.send(params).await?;
        Ok(())
    }
}

/// Tag XML uses CamelCase element names: some server implementations reject
/// lowercase here even when they accept it elsewhere.
pub(super) fn tagging_xml(tags: &TagMap) -> String {
    let mut xml = XmlWriter::new();
    xml.open("Tagging").open("TagSet");
    for (key, value) in tags {
        xml.open("Tag")
            .element("Key", key)
            .element("Value", value)
            .close();
    }
    xml.finish()
}

pub(super) fn parse_tagging(body: &str) -> Result<TagMap, Error> {
    if body.is_empty() {
        return Ok(TagMap::new());
    }
    let doc = Document::parse(body)?;
    let mut tags = TagMap::new();
    for record in doc.records("tagging/tagset/tag") {
        let (Some(key), Some(value)) = (record.get("/key"), record.get("/value")) else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        tags.insert(key.clone(), value.clone());
    }
    Ok(tags)
}

fn acl_xml(acl: &AccessControlPolicy) -> Result<String, Error> {
    let mut xml = XmlWriter::new();
    xml.open("AccessControlPolicy");
    if !acl.owner_display_name.is_empty() || !acl.owner_id.is_empty() {
        xml.open("Owner");
        if !acl.owner_display_name.is_empty() {
            xml.element("DisplayName", &acl.owner_display_name);
        }
        if !acl.owner_id.is_empty() {
            xml.element("ID", &acl.owner_id);
        }
        xml.close();
    }
    xml.open("AccessControlList");
    for grant in &acl.grants {
        if grant.permission.is_empty() {
            return Err(Error::programming("ACL grant is missing a permission"));
        }
        xml.open("Grant");
        let grantee = &grant.grantee;
        if !grantee.is_empty() {
            xml.open("Grantee");
            if !grantee.display_name.is_empty() {
                xml.element("DisplayName", &grantee.display_name);
            }
            if !grantee.email_address.is_empty() {
                xml.element("EmailAddress", &grantee.email_address);
            }
            if !grantee.id.is_empty() {
                xml.element("ID", &grantee.id);
            }
            if !grantee.kind.is_empty() {
                xml.element("Type", &grantee.kind);
            }
            if !grantee.uri.is_empty() {
                xml.element("URI", &grantee.uri);
            }
            xml.close();
        }
        xml.element("Permission", &grant.permission);
        xml.close();
    }
    Ok(xml.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn tagging_xml_is_camel_case() {
        let tags = TagMap::from([("env".to_string(), "prod".to_string())]);
        assert_eq!(
            "<Tagging><TagSet><Tag><Key>env</Key><Value>prod</Value></Tag></TagSet></Tagging>",
            tagging_xml(&tags)
        );
    }

    #[test]
    fn tagging_round_trip() {
        let tags = TagMap::from([
            ("env".to_string(), "prod".to_string()),
            ("team".to_string(), "storage".to_string()),
        ]);
        assert_eq!(tags, parse_tagging(&tagging_xml(&tags)).unwrap());
    }

    #[test]
    fn acl_xml_requires_permission() {
        let acl = AccessControlPolicy {
            grants: vec![Grant::default()],
            ..Default::default()
        };
        assert!(matches!(acl_xml(&acl), Err(Error::Programming(_))));
    }

    #[test]
    fn acl_xml_shape() {
        let acl = AccessControlPolicy {
            owner_display_name: "owner".to_string(),
            owner_id: "oid".to_string(),
            grants: vec![Grant {
                grantee: Grantee {
                    id: "gid".to_string(),
                    ..Default::default()
                },
                permission: "FULL_CONTROL".to_string(),
            }],
        };
        assert_eq!(
            "<AccessControlPolicy>\
             <Owner><DisplayName>owner</DisplayName><ID>oid</ID></Owner>\
             <AccessControlList>\
             <Grant><Grantee><ID>gid</ID></Grantee><Permission>FULL_CONTROL</Permission></Grant>\
             </AccessControlList>\
             </AccessControlPolicy>",
            acl_xml(&acl).unwrap()
        );
    }
}
