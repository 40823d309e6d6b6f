/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Minimal XML support for the S3 REST protocol.
//!
//! Reading: a small DOM with slash-path lookup, case-insensitive on tag
//! names. A lookup resolves to one of the four [`XmlValue`] shapes: a single
//! text value, a list of text values, a list of records (for repeated
//! container elements such as `<Contents>`), or not-found.
//!
//! Writing: an element writer used for the multipart completion manifest and
//! the ACL/tagging request bodies.

use crate::error::Error;
use std::borrow::Cow;
use std::collections::BTreeMap;
use xmlparser::{ElementEnd, Token, Tokenizer};

/// A record extracted from a repeated container element: relative lowercase
/// path (with a leading `/`) → text.
pub type Record = BTreeMap<String, String>;

/// Result of an XML path lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlValue {
    /// Exactly one matching element with text content.
    Text(String),
    /// Several matching text elements.
    List(Vec<String>),
    /// Matching container elements, one record each.
    Records(Vec<Record>),
    /// No element matched the path.
    NotFound,
}

#[derive(Debug, Clone, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parses an XML document. Malformed XML is an integrity error.
    pub fn parse(xml: &str) -> Result<Self, Error> {
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        for token in Tokenizer::from(xml) {
            let token = token.map_err(|e| Error::integrity(format!("malformed XML: {e}")))?;
            match token {
                Token::ElementStart { local, .. } => {
                    stack.push(Element {
                        name: local.as_str().to_string(),
                        ..Default::default()
                    });
                }
                Token::ElementEnd {
                    end: ElementEnd::Close(..) | ElementEnd::Empty,
                    ..
                } => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::integrity("malformed XML: unbalanced close tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
                Token::Text { text } => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(unescape(text.as_str().trim()).as_ref());
                    }
                }
                _ => {}
            }
        }
        let root = root.ok_or_else(|| Error::integrity("malformed XML: no root element"))?;
        Ok(Self { root })
    }

    /// Looks a path up and classifies the result.
    pub fn value(&self, path: &str) -> XmlValue {
        let matches = self.find_all(path);
        if matches.is_empty() {
            return XmlValue::NotFound;
        }
        if matches.iter().all(|e| e.is_leaf()) {
            let mut texts: Vec<String> = matches.iter().map(|e| e.text.clone()).collect();
            if texts.len() == 1 {
                XmlValue::Text(texts.remove(0))
            } else {
                XmlValue::List(texts)
            }
        } else {
            XmlValue::Records(matches.iter().map(|e| record_of(e)).collect())
        }
    }

    /// Text of the first element matching `path`.
    pub fn text(&self, path: &str) -> Option<String> {
        self.find_all(path).first().map(|e| e.text.clone())
    }

    /// Texts of every element matching `path`, in document order.
    pub fn texts(&self, path: &str) -> Vec<String> {
        self.find_all(path).iter().map(|e| e.text.clone()).collect()
    }

    /// One record per element matching `path`.
    pub fn records(&self, path: &str) -> Vec<Record> {
        self.find_all(path).iter().map(|e| record_of(e)).collect()
    }

    /// Elements whose path from the root ends with the given segments,
    /// matched case-insensitively. `path` may or may not carry a leading `/`.
    fn find_all(&self, path: &str) -> Vec<&Element> {
        let want: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
            .collect();
        let mut matches = Vec::new();
        if want.is_empty() {
            return matches;
        }
        let mut trail: Vec<String> = Vec::new();
        collect_matches(&self.root, &want, &mut trail, &mut matches);
        matches
    }
}

fn collect_matches<'a>(
    element: &'a Element,
    want: &[String],
    trail: &mut Vec<String>,
    matches: &mut Vec<&'a Element>,
) {
    trail.push(element.name.to_lowercase());
    if trail.len() >= want.len() && trail[trail.len() - want.len()..] == *want {
        matches.push(element);
    }
    for child in &element.children {
        collect_matches(child, want, trail, matches);
    }
    trail.pop();
}

fn record_of(element: &Element) -> Record {
    let mut record = Record::new();
    let mut trail = Vec::new();
    collect_leaves(element, &mut trail, &mut record);
    record
}

fn collect_leaves(element: &Element, trail: &mut Vec<String>, record: &mut Record) {
    for child in &element.children {
        trail.push(child.name.to_lowercase());
        if child.is_leaf() {
            record.insert(format!("/{}", trail.join("/")), child.text.clone());
        } else {
            collect_leaves(child, trail, record);
        }
        trail.pop();
    }
}

fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&"),
    )
}

/// Strips a single pair of surrounding ASCII quotes or `&#34;` entities from
/// a server-issued ETag.
pub fn trim_etag(etag: &str) -> String {
    const ENTITY: &str = "&#34;";
    if etag.len() >= 2 && etag.starts_with('"') && etag.ends_with('"') {
        etag[1..etag.len() - 1].to_string()
    } else if etag.len() >= 2 * ENTITY.len()
        && etag.starts_with(ENTITY)
        && etag.ends_with(ENTITY)
    {
        etag[ENTITY.len()..etag.len() - ENTITY.len()].to_string()
    } else {
        etag.to_string()
    }
}

/// Escapes text content for embedding in an XML element.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\'', "&apos;"),
    )
}

/// Element writer for request bodies.
#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
    stack: Vec<String>,
}

impl XmlWriter {
    /// Creates a writer without an XML declaration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer starting with `<?xml version="1.0" encoding="UTF-8"?>`.
    pub fn with_declaration() -> Self {
        Self {
            out: "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n".to_string(),
            stack: Vec::new(),
        }
    }

    /// Opens `<name>`.
    pub fn open(&mut self, name: &str) -> &mut Self {
        self.out.push('<');
        self.out.push_str(name);
        self.out.push('>');
        self.stack.push(name.to_string());
        self
    }

    /// Opens `<name xmlns="...">`.
    pub fn open_ns(&mut self, name: &str, xmlns: &str) -> &mut Self {
        self.out.push('<');
        self.out.push_str(name);
        self.out.push_str(" xmlns=\"");
        self.out.push_str(xmlns);
        self.out.push_str("\">");
        self.stack.push(name.to_string());
        self
    }

    /// Writes `<name>text</name>`.
    pub fn element(&mut self, name: &str, text: &str) -> &mut Self {
        self.out.push('<');
        self.out.push_str(name);
        self.out.push('>');
        self.out.push_str(&escape(text));
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
        self
    }

    /// Closes the innermost open element.
    pub fn close(&mut self) -> &mut Self {
        let name = self.stack.pop().expect("close() without matching open()");
        self.out.push_str("</");
        self.out.push_str(&name);
        self.out.push('>');
        self
    }

    /// Closes any remaining open elements and returns the document text.
    pub fn finish(mut self) -> String {
        while !self.stack.is_empty() {
            self.close();
        }
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LIST_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <IsTruncated>false</IsTruncated>
  <Contents>
    <Key>alpha.bin</Key>
    <Size>10</Size>
    <ETag>&quot;aaa&quot;</ETag>
    <Owner><ID>u1</ID></Owner>
  </Contents>
  <Contents>
    <Key>beta.bin</Key>
    <Size>20</Size>
    <ETag>&quot;bbb&quot;</ETag>
    <Owner><ID>u2</ID></Owner>
  </Contents>
</ListBucketResult>"#;

    #[test]
    fn path_lookup_is_case_insensitive() {
        let doc = Document::parse(LIST_XML).unwrap();
        assert_eq!(Some("false".to_string()), doc.text("/istruncated"));
        assert_eq!(
            Some("false".to_string()),
            doc.text("ListBucketResult/IsTruncated")
        );
    }

    #[test]
    fn repeated_elements_as_texts() {
        let doc = Document::parse(LIST_XML).unwrap();
        assert_eq!(vec!["alpha.bin", "beta.bin"], doc.texts("/contents/key"));
    }

    #[test]
    fn repeated_containers_as_records() {
        let doc = Document::parse(LIST_XML).unwrap();
        let records = doc.records("listbucketresult/contents");
        assert_eq!(2, records.len());
        assert_eq!("alpha.bin", records[0]["/key"]);
        assert_eq!("u2", records[1]["/owner/id"]);
        assert_eq!("\"bbb\"", records[1]["/etag"]);
    }

    #[test]
    fn value_variants() {
        let doc = Document::parse(LIST_XML).unwrap();
        assert_eq!(XmlValue::Text("false".to_string()), doc.value("/istruncated"));
        assert_eq!(
            XmlValue::List(vec!["alpha.bin".to_string(), "beta.bin".to_string()]),
            doc.value("/contents/key")
        );
        assert!(matches!(doc.value("/contents"), XmlValue::Records(r) if r.len() == 2));
        assert_eq!(XmlValue::NotFound, doc.value("/nosuchtag"));
    }

    #[test]
    fn malformed_xml_is_integrity_error() {
        assert!(matches!(
            Document::parse("<open><unclosed></open>"),
            Err(Error::Integrity(_))
        ));
        assert!(Document::parse("").is_err());
    }

    #[test]
    fn etag_trimming() {
        assert_eq!("abc123", trim_etag("\"abc123\""));
        assert_eq!("abc123", trim_etag("&#34;abc123&#34;"));
        assert_eq!("abc123", trim_etag("abc123"));
        assert_eq!("", trim_etag(""));
    }

    #[test]
    fn writer_produces_manifest_shape() {
        let mut xml = XmlWriter::with_declaration();
        xml.open_ns(
            "CompleteMultipartUpload",
            "http://s3.amazonaws.com/doc/2006-03-01/",
        );
        for (number, etag) in [(1, "e1"), (2, "e2")] {
            xml.open("Part")
                .element("ETag", etag)
                .element("PartNumber", &number.to_string())
                .close();
        }
        let text = xml.finish();
        assert_eq!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <CompleteMultipartUpload xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
             <Part><ETag>e1</ETag><PartNumber>1</PartNumber></Part>\
             <Part><ETag>e2</ETag><PartNumber>2</PartNumber></Part>\
             </CompleteMultipartUpload>",
            text
        );
    }

    #[test]
    fn writer_escapes_text() {
        let mut xml = XmlWriter::new();
        xml.open("Tagging").element("Value", "a<b&c");
        assert_eq!("<Tagging><Value>a&lt;b&amp;c</Value></Tagging>", xml.finish());
    }
}
