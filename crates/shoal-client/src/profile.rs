/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! AWS-CLI compatible credentials file parsing.
//!
//! The format is INI-style: `[profile]` section headers, `key = value`
//! properties, `#` comments. A non-empty line that is not a section header
//! and not a `key = value` pair continues the previous property; its trimmed
//! text is appended to that property's value. The default profile is
//! `default` and the default location is `$HOME/.aws/credentials`.

use crate::config::Credentials;
use crate::error::Error;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const DEFAULT_PROFILE: &str = "default";

const ACCESS_KEY_ID: &str = "aws_access_key_id";
const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";

/// A parsed credentials file: profile name → property map.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProfileSet {
    profiles: BTreeMap<String, BTreeMap<String, String>>,
}

impl ProfileSet {
    /// Parses the contents of a credentials file.
    pub fn parse(contents: &str) -> Result<Self, Error> {
        let mut profiles: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut current: Option<String> = None;
        let mut last_key: Option<String> = None;

        for (number, raw) in contents.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current = Some(section.trim().to_string());
                last_key = None;
                profiles.entry(section.trim().to_string()).or_default();
                continue;
            }
            let section = current.as_ref().ok_or_else(|| {
                Error::config(format!(
                    "credentials file line {}: property before any [profile] section",
                    number + 1
                ))
            })?;
            let properties = profiles.get_mut(section).expect("section was inserted");
            match split_property(line) {
                Some((key, value)) => {
                    properties.insert(key.to_string(), value.to_string());
                    last_key = Some(key.to_string());
                }
                None => {
                    // continuation of the previous property
                    let key = last_key.as_ref().ok_or_else(|| {
                        Error::config(format!(
                            "credentials file line {}: continuation without a preceding property",
                            number + 1
                        ))
                    })?;
                    let value = properties.get_mut(key).expect("last key was inserted");
                    value.push_str(strip_comment(line).trim());
                }
            }
        }
        Ok(Self { profiles })
    }

    /// Returns a property of the named profile.
    pub fn get(&self, profile: &str, key: &str) -> Option<&str> {
        self.profiles
            .get(profile)
            .and_then(|properties| properties.get(key))
            .map(String::as_str)
    }

    /// Extracts the credentials of the named profile.
    pub fn credentials(&self, profile: &str) -> Result<Credentials, Error> {
        if !self.profiles.contains_key(profile) {
            return Err(Error::config(format!("profile {profile} not found")));
        }
        let access = self
            .get(profile, ACCESS_KEY_ID)
            .ok_or_else(|| Error::config(format!("profile {profile} has no {ACCESS_KEY_ID}")))?;
        let secret = self
            .get(profile, SECRET_ACCESS_KEY)
            .ok_or_else(|| Error::config(format!("profile {profile} has no {SECRET_ACCESS_KEY}")))?;
        Credentials::new(access, secret)
    }
}

/// `key = value` split; `None` marks a continuation line.
fn split_property(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((key, strip_comment(value).trim()))
}

fn strip_comment(value: &str) -> &str {
    match value.find('#') {
        Some(i) => &value[..i],
        None => value,
    }
}

/// Default credentials file location: `$HOME/.aws/credentials`.
pub fn default_credentials_path() -> Result<PathBuf, Error> {
    let home = dirs::home_dir().ok_or_else(|| Error::config("cannot determine home directory"))?;
    Ok(home.join(".aws").join("credentials"))
}

/// Reads credentials from a file in AWS-CLI format.
///
/// `path` defaults to `$HOME/.aws/credentials` and `profile` to `default`.
pub fn load_credentials(
    path: Option<&Path>,
    profile: Option<&str>,
) -> Result<Credentials, Error> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_credentials_path()?,
    };
    let contents = std::fs::read_to_string(&path)
        .map_err(|e| Error::config(format!("cannot open file {}: {e}", path.display())))?;
    let profiles = ProfileSet::parse(&contents)?;
    profiles.credentials(profile.unwrap_or(DEFAULT_PROFILE))
}
