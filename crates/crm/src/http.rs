//! HTTP client wrappers
//!
//! Thin layer over reqwest shared by the token manager and the request
//! envelope, plus a hyper-based [`VerbatimClient`] for GET requests whose
//! request target must reach the wire byte-for-byte (reqwest routes URLs
//! through the WHATWG normalizer, which re-encodes characters the query
//! endpoint needs literal). One attempt per call: the adapter is best-effort
//! by design and performs no retries.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::header::{AUTHORIZATION, CONTENT_TYPE};
use hyper::{Request, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tracing::debug;

use crate::errors::{CrmError, CrmErrorCategory};

/// HTTP client with a fixed per-request timeout.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the provided request builder.
    ///
    /// Transport failures are classified into [`CrmError`]; status handling
    /// is left to the caller.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, CrmError> {
        let request = builder.build().map_err(CrmError::from)?;
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %url, status = response.status().as_u16(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %url, error = %err, "HTTP request failed");
                Err(CrmError::from(err))
            }
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    ssl_verify: bool,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), ssl_verify: true }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disable TLS certificate verification (sandbox orgs with self-signed
    /// certs).
    pub fn ssl_verify(mut self, enabled: bool) -> Self {
        self.ssl_verify = enabled;
        self
    }

    pub fn build(self) -> Result<HttpClient, CrmError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if !self.ssl_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(CrmError::from)?;
        Ok(HttpClient { client })
    }
}

/// GET client that transmits the request target exactly as given.
///
/// Built on hyper: `http::Uri` carries path and query bytes through
/// untouched, where reqwest's URL type re-encodes `'` in http(s) query
/// strings. The query endpoint requires literal `'` and `,` on the wire, so
/// query reads go through here instead of [`HttpClient`].
#[derive(Clone)]
pub struct VerbatimClient {
    client: HyperClient<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    timeout: Duration,
}

impl VerbatimClient {
    pub fn new(timeout: Duration, ssl_verify: bool) -> Result<Self, CrmError> {
        let connector = HttpsConnectorBuilder::new()
            .with_tls_config(tls_config(ssl_verify)?)
            .https_or_http()
            .enable_http1()
            .build();

        let client = HyperClient::builder(TokioExecutor::new()).build(connector);
        Ok(Self { client, timeout })
    }

    /// Issue a bearer-authenticated GET. `url` must already be absolute; its
    /// path and query are sent without re-encoding.
    pub async fn get(&self, url: &str, access_token: &str) -> Result<(StatusCode, String), CrmError> {
        let uri: Uri = url.parse().map_err(|_| {
            CrmError::new(CrmErrorCategory::TransportFailure, format!("invalid request URI: {url}"))
        })?;
        debug!(%uri, "sending verbatim GET");

        let request = Request::builder()
            .method(hyper::Method::GET)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .header(CONTENT_TYPE, "application/json")
            .body(Empty::new())
            .map_err(|err| CrmError::new(CrmErrorCategory::TransportFailure, err.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.request(request))
            .await
            .map_err(|_| CrmError::new(CrmErrorCategory::TransportFailure, "request timed out"))?
            .map_err(|err| CrmError::new(CrmErrorCategory::TransportFailure, err.to_string()))?;

        let status = response.status();
        let body = tokio::time::timeout(self.timeout, response.into_body().collect())
            .await
            .map_err(|_| CrmError::new(CrmErrorCategory::TransportFailure, "response read timed out"))?
            .map_err(|err| CrmError::new(CrmErrorCategory::TransportFailure, err.to_string()))?
            .to_bytes();

        Ok((status, String::from_utf8_lossy(&body).into_owned()))
    }
}

fn tls_config(ssl_verify: bool) -> Result<rustls::ClientConfig, CrmError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let builder = rustls::ClientConfig::builder_with_provider(Arc::clone(&provider))
        .with_safe_default_protocol_versions()
        .map_err(|err| CrmError::new(CrmErrorCategory::TransportFailure, err.to_string()))?;

    let config = if ssl_verify {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        builder.with_root_certificates(roots).with_no_client_auth()
    } else {
        // Mirrors reqwest's danger_accept_invalid_certs for the ssl_verify
        // toggle (sandbox orgs with self-signed certs).
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerification(provider)))
            .with_no_client_auth()
    };

    Ok(config)
}

#[derive(Debug)]
struct NoVerification(Arc<CryptoProvider>);

impl ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
