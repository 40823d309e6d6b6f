/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The S3 operation facade: one method per REST operation, each composing
//! the signer, the request builder and the response decoder.

mod bucket;
mod multipart;
mod object;

use crate::config::{Credentials, Endpoint};
use crate::error::Error;
use crate::http::{default_transport, BodySource, HttpRequest, HttpResponse, HttpTransport, Method};
use crate::request::build_url;
use crate::xml::{trim_etag, Document};
use crate::{ETag, Headers, Params};
use shoal_sigv4::http_request::{
    sign, SignableBody, SignableRequest, SigningParams, SigningSettings, DEFAULT_REGION,
};
use std::sync::Arc;
use std::time::SystemTime;

/// Parameters for a single [`Client::send`] call.
#[derive(Debug, Default)]
pub struct SendParams {
    /// HTTP method
    pub method: Option<Method>,
    /// Target bucket
    pub bucket: Option<String>,
    /// Target key; requires `bucket`
    pub key: Option<String>,
    /// Query parameters, ordered by key
    pub params: Params,
    /// Extra headers, lowercase names
    pub headers: Headers,
    /// Precomputed lowercase hex SHA-256 of the body; `UNSIGNED-PAYLOAD`
    /// is signed when absent
    pub payload_hash: Option<String>,
    /// Request body
    pub body: BodySource,
}

impl SendParams {
    /// Creates parameters for `method` with everything else empty.
    pub fn new(method: Method) -> Self {
        Self {
            method: Some(method),
            ..Default::default()
        }
    }
}

/// S3 client: owns its credentials, endpoint, and transport handle.
///
/// Cloning is cheap; clones share the transport.
#[derive(Debug, Clone)]
pub struct Client {
    credentials: Option<Credentials>,
    endpoint: Endpoint,
    signing_endpoint: Endpoint,
    region: String,
    transport: Arc<dyn HttpTransport>,
}

impl Client {
    /// Returns a builder for a new client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// The transport endpoint requests are sent to
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// The endpoint used for signing. Differs from [`Client::endpoint`] only
    /// when requests travel through a tunnel.
    pub fn signing_endpoint(&self) -> &Endpoint {
        &self.signing_endpoint
    }

    /// The signing region
    pub fn region(&self) -> &str {
        &self.region
    }

    /// The credentials, `None` for anonymous clients
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Sends a signed (or anonymous, without credentials) S3 request and
    /// classifies the response status.
    ///
    /// `Content-Length` is set to the exact body size for PUT and POST.
    /// `404` on HEAD becomes a typed [`Error::NotFound`]; other statuses at
    /// or above 300 become [`Error::Protocol`] with the `<Code>` element of
    /// the body when one is present.
    pub async fn send(&self, params: SendParams) -> Result<HttpResponse, Error> {
        let SendParams {
            method,
            bucket,
            key,
            params: query,
            mut headers,
            payload_hash,
            body,
        } = params;
        let method = method.ok_or_else(|| Error::programming("send() requires a method"))?;
        if key.is_some() && bucket.is_none() {
            return Err(Error::programming("an object key requires a bucket"));
        }

        if matches!(method, Method::Put | Method::Post) && !matches!(body, BodySource::Empty) {
            headers.insert("content-length".to_string(), body.len().to_string());
        }

        if let Some(credentials) = &self.credentials {
            let signing_endpoint = self.signing_endpoint.to_string();
            let signing_params = SigningParams::builder()
                .access(credentials.access())
                .secret(credentials.secret())
                .region(&self.region)
                .time(SystemTime::now())
                .settings(SigningSettings::default())
                .build()
                .map_err(|e| Error::programming(e.to_string()))?;
            let signable_body = match &payload_hash {
                Some(hash) => SignableBody::Precomputed(hash.clone()),
                None => SignableBody::UnsignedPayload,
            };
            let signable = SignableRequest::new(
                method.as_str(),
                &signing_endpoint,
                bucket.as_deref(),
                key.as_deref(),
                &query,
                &headers,
                signable_body,
            );
            let (instructions, _signature) = sign(signable, &signing_params)?.into_parts();
            for (name, value) in instructions.into_parts().0 {
                headers.insert(name.to_string(), value);
            }
        }

        let url = build_url(&self.endpoint, bucket.as_deref(), key.as_deref(), &query);
        tracing::trace!(%method, %url, "sending request");
        let response = self
            .transport
            .send(HttpRequest {
                method,
                url,
                headers,
                body,
            })
            .await?;
        classify(method, response)
    }
}

fn classify(method: Method, response: HttpResponse) -> Result<HttpResponse, Error> {
    if response.status < 300 {
        return Ok(response);
    }
    // the transport follows redirects, so any 3xx that reaches us is terminal
    if method == Method::Head && response.status == 404 {
        return Err(Error::NotFound);
    }
    Err(Error::Protocol {
        status: response.status,
        code: error_code(&response),
    })
}

/// `<Code>` from an error response body, when present.
fn error_code(response: &HttpResponse) -> Option<String> {
    if response.body.is_empty() {
        return None;
    }
    Document::parse(&response.text()).ok()?.text("code")
}

pub(crate) fn etag_from_headers(response: &HttpResponse, context: &str) -> Result<ETag, Error> {
    match response.header("etag") {
        Some(etag) => Ok(trim_etag(etag)),
        None => Err(Error::integrity(format!(
            "no ETag found in {context} response header"
        ))),
    }
}

/// Builder for [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    credentials: Option<Credentials>,
    endpoint: Option<Endpoint>,
    signing_endpoint: Option<Endpoint>,
    region: Option<String>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl ClientBuilder {
    /// Sets the credentials. Without credentials requests go out unsigned.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the credentials from an optional pair.
    pub fn maybe_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Sets the transport endpoint (required).
    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets a signing endpoint different from the transport endpoint, to
    /// support requests across tunnels.
    pub fn signing_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.signing_endpoint = Some(endpoint);
        self
    }

    /// Sets the signing region (defaults to `us-east-1`).
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Injects the HTTP transport; defaults to the process-wide `reqwest`
    /// transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<Client, Error> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| Error::config("an endpoint is required"))?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        Ok(Client {
            credentials: self.credentials,
            signing_endpoint: self.signing_endpoint.unwrap_or_else(|| endpoint.clone()),
            endpoint,
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            transport,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[derive(Debug, Default)]
    struct RecordingTransport {
        requests: std::sync::Mutex<Vec<HttpRequest>>,
        status: u16,
        body: &'static str,
    }

    #[async_trait::async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, Error> {
            self.requests.lock().unwrap().push(request);
            Ok(HttpResponse {
                status: self.status,
                headers: Headers::new(),
                body: Bytes::from_static(self.body.as_bytes()),
            })
        }
    }

    fn client_with(transport: Arc<RecordingTransport>) -> Client {
        Client::builder()
            .credentials(Credentials::new("access", "secret").unwrap())
            .endpoint("http://localhost:9000".parse().unwrap())
            .transport(transport)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn send_signs_and_sets_content_length() {
        let transport = Arc::new(RecordingTransport {
            status: 200,
            ..Default::default()
        });
        let client = client_with(transport.clone());

        let mut params = SendParams::new(Method::Put);
        params.bucket = Some("bucket1".to_string());
        params.key = Some("key1".to_string());
        params.body = BodySource::Bytes(Bytes::from_static(b"hello"));
        client.send(params).await.unwrap();

        let requests = transport.requests.lock().unwrap();
        let request = &requests[0];
        assert_eq!("http://localhost:9000/bucket1/key1", request.url);
        assert_eq!("5", request.headers["content-length"]);
        assert!(request.headers["authorization"].starts_with("AWS4-HMAC-SHA256 Credential=access/"));
        assert!(request.headers.contains_key("x-amz-date"));
        assert_eq!("UNSIGNED-PAYLOAD", request.headers["x-amz-content-sha256"]);
    }

    #[tokio::test]
    async fn anonymous_clients_do_not_sign() {
        let transport = Arc::new(RecordingTransport {
            status: 200,
            ..Default::default()
        });
        let client = Client::builder()
            .endpoint("http://localhost:9000".parse().unwrap())
            .transport(transport.clone())
            .build()
            .unwrap();

        client.send(SendParams::new(Method::Get)).await.unwrap();
        let requests = transport.requests.lock().unwrap();
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn protocol_errors_carry_the_code() {
        let transport = Arc::new(RecordingTransport {
            status: 403,
            body: "<Error><Code>AccessDenied</Code></Error>",
            ..Default::default()
        });
        let client = client_with(transport);
        let err = client.send(SendParams::new(Method::Get)).await.unwrap_err();
        match err {
            Error::Protocol { status, code } => {
                assert_eq!(403, status);
                assert_eq!(Some("AccessDenied".to_string()), code);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn head_404_is_typed_not_found() {
        let transport = Arc::new(RecordingTransport {
            status: 404,
            ..Default::default()
        });
        let client = client_with(transport);
        let mut params = SendParams::new(Method::Head);
        params.bucket = Some("missing".to_string());
        assert!(matches!(
            client.send(params).await.unwrap_err(),
            Error::NotFound
        ));
    }

    #[tokio::test]
    async fn key_without_bucket_is_rejected_before_io() {
        let transport = Arc::new(RecordingTransport {
            status: 200,
            ..Default::default()
        });
        let client = client_with(transport.clone());
        let mut params = SendParams::new(Method::Get);
        params.key = Some("key1".to_string());
        assert!(matches!(
            client.send(params).await.unwrap_err(),
            Error::Programming(_)
        ));
        assert!(transport.requests.lock().unwrap().is_empty());
    }
}
