/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The HTTP transport boundary.
//!
//! Operations talk to a [`HttpTransport`] trait object narrow enough to mock:
//! send one request, get back status, headers and body. The default
//! implementation is backed by `reqwest`; tests inject an in-memory object
//! store double instead of standing up a live server.

use crate::error::Error;
use crate::Headers;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// HTTP methods used by the S3 REST protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// DELETE
    Delete,
    /// HEAD
    Head,
}

impl Method {
    /// Uppercase name, as used in the canonical request
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            other => Err(Error::config(format!(
                "only GET, PUT, POST, DELETE and HEAD are supported, got `{other}`"
            ))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How to read a file-backed request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileIoMode {
    /// Seek and read through a buffered handle.
    #[default]
    Buffered,

    /// Positional read (`pread`-style), no shared cursor.
    Positional,

    /// Memory-map the file and copy the region.
    MemoryMapped,
}

/// The body of an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum BodySource {
    /// No body.
    #[default]
    Empty,

    /// In-memory bytes.
    Bytes(Bytes),

    /// A byte range of a file.
    File {
        /// File to read from
        path: PathBuf,
        /// Start offset in bytes
        offset: u64,
        /// Number of bytes to send
        length: u64,
        /// Read strategy
        mode: FileIoMode,
    },
}

impl BodySource {
    /// The exact byte count of the body, used for `Content-Length`.
    pub fn len(&self) -> u64 {
        match self {
            BodySource::Empty => 0,
            BodySource::Bytes(bytes) => bytes.len() as u64,
            BodySource::File { length, .. } => *length,
        }
    }

    /// Whether the body is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves the body to in-memory bytes, reading file ranges as needed.
    pub async fn into_bytes(self) -> Result<Bytes, Error> {
        match self {
            BodySource::Empty => Ok(Bytes::new()),
            BodySource::Bytes(bytes) => Ok(bytes),
            BodySource::File {
                path,
                offset,
                length,
                mode,
            } => read_file_slice(path, offset, length, mode).await,
        }
    }
}

/// Reads `length` bytes of `path` starting at `offset` using the requested
/// strategy. Runs on the blocking pool.
pub async fn read_file_slice(
    path: PathBuf,
    offset: u64,
    length: u64,
    mode: FileIoMode,
) -> Result<Bytes, Error> {
    let bytes = tokio::task::spawn_blocking(move || -> Result<Bytes, std::io::Error> {
        let mut buf = vec![0u8; length as usize];
        match mode {
            FileIoMode::Buffered => {
                let mut file = std::fs::File::open(&path)?;
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(&mut buf)?;
            }
            FileIoMode::Positional => {
                let file = std::fs::File::open(&path)?;
                read_exact_at(&file, &mut buf, offset)?;
            }
            FileIoMode::MemoryMapped => {
                let file = std::fs::File::open(&path)?;
                // read-only map; the region is copied out before the map drops
                let map = unsafe { memmap2::Mmap::map(&file)? };
                let start = offset as usize;
                let end = start + length as usize;
                if end > map.len() {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "mapped region extends past end of file",
                    ));
                }
                buf.copy_from_slice(&map[start..end]);
            }
        }
        Ok(buf.into())
    })
    .await
    .map_err(|e| Error::transport(format!("file read task failed: {e}")))??;
    Ok(bytes)
}

/// Writes `data` into `path` at `offset` with positional I/O, creating the
/// file if needed. Concurrent writers to disjoint ranges commute.
pub async fn write_file_slice(path: PathBuf, offset: u64, data: Bytes) -> Result<(), Error> {
    tokio::task::spawn_blocking(move || -> Result<(), std::io::Error> {
        let file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .open(&path)?;
        write_all_at(&file, &data, offset)
    })
    .await
    .map_err(|e| Error::transport(format!("file write task failed: {e}")))??;
    Ok(())
}

#[cfg(unix)]
fn write_all_at(file: &std::fs::File, buf: &[u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(windows)]
fn write_all_at(file: &std::fs::File, buf: &[u8], offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut written = 0;
    while written < buf.len() {
        written += file.seek_write(&buf[written..], offset + written as u64)?;
    }
    Ok(())
}

#[cfg(unix)]
fn read_exact_at(file: &std::fs::File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &std::fs::File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    let mut read = 0;
    while read < buf.len() {
        let n = file.seek_read(&mut buf[read..], offset + read as u64)?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        read += n;
    }
    Ok(())
}

/// A single outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,
    /// Fully composed URL including the query string
    pub url: String,
    /// Headers to send, lowercase names
    pub headers: Headers,
    /// Request body
    pub body: BodySource,
}

/// A completed response: status, headers and the collected body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: Headers,
    /// Response body
    pub body: Bytes,
}

impl HttpResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The body as UTF-8 text (lossy)
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Narrow transport interface: send a request, read back status, headers and
/// body. Implementations must follow redirects.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Sends `request` and collects the response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error>;
}

/// [`HttpTransport`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    pub fn new() -> Result<Self, Error> {
        Self::with_timeout(None)
    }

    /// Creates a transport with an overall per-request timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Error::transport)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .expect("method names are valid");
        let mut req = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            req = req.header(name, value);
        }
        if !matches!(request.body, BodySource::Empty) {
            req = req.body(request.body.into_bytes().await?);
        }

        let resp = req.send().await.map_err(Error::transport)?;
        let status = resp.status().as_u16();
        let mut headers = Headers::new();
        for (name, value) in resp.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }
        let body = resp.bytes().await.map_err(Error::transport)?;
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// The process-wide default transport, built exactly once.
pub fn default_transport() -> Result<Arc<dyn HttpTransport>, Error> {
    static TRANSPORT: OnceLock<ReqwestTransport> = OnceLock::new();
    if let Some(transport) = TRANSPORT.get() {
        return Ok(Arc::new(transport.clone()));
    }
    let transport = ReqwestTransport::new()?;
    let transport = TRANSPORT.get_or_init(|| transport);
    Ok(Arc::new(transport.clone()))
}
