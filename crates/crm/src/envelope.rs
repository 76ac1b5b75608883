//! Request/response envelope
//!
//! Every data operation goes through [`Envelope::request`], which owns the
//! policy all callers need to agree on: bearer auth, status classification,
//! and the empty-result sentinel. Failures never surface as errors here;
//! callers check for emptiness and the logs carry the detail.
//!
//! Classification:
//! - no session: empty, no network call
//! - 404: empty, no log (missing records are an expected case)
//! - 204: synthesized no-content success, distinct from a parsed body
//! - any other status >= 300: empty, error log with endpoint and code
//! - transport failure or undecodable body: empty, error log

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, error};
use url::Url;

use crate::auth::SessionProvider;
use crate::errors::CrmError;
use crate::http::{HttpClient, VerbatimClient};

/// Internal tagged outcome of a CRM round-trip.
///
/// The public client surface flattens this to `Option`/empty collections so
/// callers observe the uniform empty sentinel.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    /// Parsed JSON body.
    Success(Value),
    /// HTTP 204; the operation succeeded but the CRM sent no body.
    NoContent,
    /// Anything that did not produce a usable body.
    Empty,
}

impl ApiOutcome {
    pub fn succeeded(&self) -> bool {
        !matches!(self, Self::Empty)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }
}

/// Authenticated request envelope shared by every adapter operation.
#[derive(Clone)]
pub struct Envelope {
    http: HttpClient,
    verbatim: VerbatimClient,
    sessions: Arc<dyn SessionProvider>,
    verbose_debug: bool,
}

impl Envelope {
    pub fn new(
        http: HttpClient,
        verbatim: VerbatimClient,
        sessions: Arc<dyn SessionProvider>,
        verbose_debug: bool,
    ) -> Self {
        Self { http, verbatim, sessions, verbose_debug }
    }

    /// Issue an authenticated request against the CRM.
    ///
    /// `path` is resolved against the session's instance URL unless it is
    /// already absolute (pagination cursors arrive as opaque URLs; relative
    /// ones resolve against the CURRENT base, not the configured one).
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> ApiOutcome {
        let Some(session) = self.sessions.session().await else {
            debug!(path, "no CRM session; skipping request");
            return ApiOutcome::Empty;
        };

        let Some(endpoint) = resolve_endpoint(&session.base_url, path) else {
            error!(endpoint = path, "could not resolve request URL");
            return ApiOutcome::Empty;
        };

        let mut builder = self
            .http
            .request(method, &endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", session.access_token))
            .header(CONTENT_TYPE, "application/json");

        if let Some(body) = body {
            if self.verbose_debug {
                debug!(endpoint = %endpoint, body = %body, "CRM request body");
            }
            builder = builder.json(body);
        }

        let response = match self.http.send(builder).await {
            Ok(response) => response,
            Err(err) => {
                error!(endpoint = %endpoint, error = %err, "CRM request failed");
                return ApiOutcome::Empty;
            }
        };

        let status = response.status();
        if status.as_u16() == 204 {
            return ApiOutcome::NoContent;
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => {
                error!(endpoint = %endpoint, error = %CrmError::from(err), "failed to read CRM response");
                return ApiOutcome::Empty;
            }
        };

        self.classify(&endpoint, status, text)
    }

    /// Issue an authenticated GET whose request target reaches the wire
    /// byte-for-byte (SOQL requires literal `'` and `,` in the query
    /// string, which URL normalization would re-encode).
    ///
    /// Same resolution and classification policy as [`Envelope::request`];
    /// relative paths are joined to the session base URL textually so the
    /// query bytes stay untouched.
    pub async fn get_verbatim(&self, path: &str) -> ApiOutcome {
        let Some(session) = self.sessions.session().await else {
            debug!(path, "no CRM session; skipping request");
            return ApiOutcome::Empty;
        };

        let endpoint = join_verbatim(&session.base_url, path);

        match self.verbatim.get(&endpoint, &session.access_token).await {
            Ok((status, text)) => {
                if status.as_u16() == 204 {
                    return ApiOutcome::NoContent;
                }
                self.classify(&endpoint, status, text)
            }
            Err(err) => {
                error!(endpoint = %endpoint, error = %err, "CRM request failed");
                ApiOutcome::Empty
            }
        }
    }

    fn classify(&self, endpoint: &str, status: StatusCode, text: String) -> ApiOutcome {
        if status.as_u16() >= 300 {
            let err = CrmError::from_status(status).with_endpoint(endpoint);
            if err.category().is_logged() {
                error!(endpoint = %endpoint, status = status.as_u16(), "CRM rejected request");
            }
            return ApiOutcome::Empty;
        }

        if self.verbose_debug {
            debug!(endpoint = %endpoint, body = %text, "CRM response body");
        }

        match serde_json::from_str(&text) {
            Ok(value) => ApiOutcome::Success(value),
            Err(err) => {
                error!(endpoint = %endpoint, error = %CrmError::decode(&err), "undecodable CRM response");
                ApiOutcome::Empty
            }
        }
    }
}

fn resolve_endpoint(base_url: &str, path: &str) -> Option<String> {
    if path.starts_with("http://") || path.starts_with("https://") {
        return Some(path.to_string());
    }
    let base = Url::parse(base_url).ok()?;
    base.join(path).ok().map(String::from)
}

/// Textual base-URL join. No `Url` round-trip: parsing would percent-encode
/// query characters that must stay literal.
fn join_verbatim(base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use serde_json::json;
    use tracing_subscriber::fmt::MakeWriter;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::Session;

    struct StaticSessions(Option<Session>);

    #[async_trait]
    impl SessionProvider for StaticSessions {
        async fn session(&self) -> Option<Session> {
            self.0.clone()
        }
    }

    fn session_for(base_url: &str) -> Session {
        Session {
            base_url: base_url.to_string(),
            access_token: "tok".to_string(),
            acquired_at: Instant::now(),
            ttl: Duration::from_secs(3600),
        }
    }

    fn envelope_with(sessions: StaticSessions) -> Envelope {
        Envelope::new(
            HttpClient::builder().build().expect("http client"),
            VerbatimClient::new(Duration::from_secs(5), true).expect("verbatim client"),
            Arc::new(sessions),
            false,
        )
    }

    fn envelope_for(base_url: &str) -> Envelope {
        envelope_with(StaticSessions(Some(session_for(base_url))))
    }

    /// Shared in-memory sink for asserting on emitted log lines.
    #[derive(Clone, Default)]
    struct LogSink(Arc<Mutex<Vec<u8>>>);

    impl LogSink {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogSink {
        type Writer = LogSink;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Install an error-level capture subscriber for the current thread.
    fn capture_errors(sink: &LogSink) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::ERROR)
            .with_writer(sink.clone())
            .without_time()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    #[tokio::test]
    async fn absent_session_short_circuits_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let envelope = envelope_with(StaticSessions(None));

        let outcome = envelope.request(Method::GET, "/sobjects/Account/001", None).await;
        assert!(outcome.is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn attaches_bearer_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("Authorization", "Bearer tok"))
            .and(header("Content-Type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = envelope_for(&server.uri()).request(Method::GET, "/ping", None).await;
        assert_eq!(outcome.into_value(), Some(json!({"ok": true})));
    }

    #[tokio::test]
    async fn status_404_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let outcome = envelope_for(&server.uri()).request(Method::GET, "/missing", None).await;
        assert_eq!(outcome, ApiOutcome::Empty);
    }

    #[tokio::test]
    async fn status_500_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let outcome = envelope_for(&server.uri()).request(Method::GET, "/broken", None).await;
        assert_eq!(outcome, ApiOutcome::Empty);
    }

    #[tokio::test]
    async fn status_204_synthesizes_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let outcome = envelope_for(&server.uri())
            .request(Method::PATCH, "/sobjects/Account/001", Some(&json!({"Name": "Acme"})))
            .await;

        assert_eq!(outcome, ApiOutcome::NoContent);
        assert!(outcome.succeeded());
        assert_eq!(outcome.value(), None);
    }

    #[tokio::test]
    async fn transport_failure_yields_empty() {
        let envelope = envelope_for("http://127.0.0.1:1");
        let outcome = envelope.request(Method::GET, "/unreachable", None).await;
        assert_eq!(outcome, ApiOutcome::Empty);
    }

    #[tokio::test]
    async fn undecodable_body_yields_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&server)
            .await;

        let outcome = envelope_for(&server.uri()).request(Method::GET, "/odd", None).await;
        assert_eq!(outcome, ApiOutcome::Empty);
    }

    #[tokio::test]
    async fn absolute_cursor_bypasses_base_resolution() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query/next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
            .expect(1)
            .mount(&server)
            .await;

        // Session base points elsewhere; the absolute cursor wins.
        let envelope = envelope_for("http://127.0.0.1:1");
        let cursor = format!("{}/services/data/v58.0/query/next", server.uri());
        let outcome = envelope.request(Method::GET, &cursor, None).await;
        assert!(outcome.succeeded());
    }

    #[test]
    fn relative_paths_resolve_against_current_base() {
        let resolved =
            resolve_endpoint("https://pod42.example.com", "/services/data/v58.0/query/abc-2000")
                .expect("resolved");
        assert_eq!(resolved, "https://pod42.example.com/services/data/v58.0/query/abc-2000");
    }

    #[test]
    fn verbatim_join_leaves_query_bytes_alone() {
        let joined = join_verbatim(
            "https://pod42.example.com/",
            "/services/data/v58.0/query/?q=SELECT%20Id%20WHERE%20Name%20=%20'Acme,%20Inc.'",
        );
        assert_eq!(
            joined,
            "https://pod42.example.com/services/data/v58.0/query/?q=SELECT%20Id%20WHERE%20Name%20=%20'Acme,%20Inc.'"
        );

        let absolute = join_verbatim("http://127.0.0.1:1", "https://pod.example.com/next");
        assert_eq!(absolute, "https://pod.example.com/next");
    }

    #[tokio::test]
    async fn verbatim_get_applies_same_classification() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v58.0/query/"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"done": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let envelope = envelope_for(&server.uri());
        let ok = envelope.get_verbatim("/services/data/v58.0/query/?q=SELECT%20Id").await;
        assert_eq!(ok.into_value(), Some(json!({"done": true})));

        let missing = envelope.get_verbatim("/gone").await;
        assert_eq!(missing, ApiOutcome::Empty);
    }

    #[tokio::test]
    async fn missing_records_produce_no_error_log() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let sink = LogSink::default();
        let _guard = capture_errors(&sink);

        let outcome = envelope_for(&server.uri()).request(Method::GET, "/missing", None).await;
        assert_eq!(outcome, ApiOutcome::Empty);
        assert!(sink.contents().is_empty(), "404 must stay silent, got: {}", sink.contents());
    }

    #[tokio::test]
    async fn rejected_statuses_log_endpoint_and_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let sink = LogSink::default();
        let _guard = capture_errors(&sink);

        let outcome = envelope_for(&server.uri()).request(Method::GET, "/broken-path", None).await;
        assert_eq!(outcome, ApiOutcome::Empty);

        let logs = sink.contents();
        assert!(logs.contains("CRM rejected request"), "missing rejection event: {logs}");
        assert!(logs.contains("/broken-path"), "missing endpoint field: {logs}");
        assert!(logs.contains("500"), "missing status field: {logs}");
    }
}
