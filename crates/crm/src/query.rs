//! SOQL query execution
//!
//! Builds query-endpoint requests and decodes one result page per call.
//! Pagination looping is deliberately NOT here: callers follow
//! `next_records_url` themselves and concatenate records, mirroring how the
//! mapping methods consume multi-page result sets.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::envelope::Envelope;

/// One page of query results.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryPage {
    #[serde(default)]
    pub total_size: Option<u64>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub records: Vec<Value>,
    /// Opaque cursor to the next page, if any. May be absolute or relative;
    /// the envelope resolves relative cursors against the current instance
    /// URL.
    #[serde(default)]
    pub next_records_url: Option<String>,
}

/// Percent-encode SOQL for the query endpoint.
///
/// Commas and single quotes are restored to their literal forms after
/// encoding: the query endpoint tolerates them, and some deployments reject
/// the encoded forms. Everything else stays percent-encoded.
pub fn encode_soql(soql: &str) -> String {
    urlencoding::encode(soql).replace("%2C", ",").replace("%27", "'")
}

/// Executes SOQL requests one page at a time.
#[derive(Clone)]
pub struct QueryRunner {
    envelope: Envelope,
    data_path: String,
}

impl QueryRunner {
    pub fn new(envelope: Envelope, data_path: impl Into<String>) -> Self {
        Self { envelope, data_path: data_path.into() }
    }

    /// Run a query and return the first page.
    ///
    /// Goes over the verbatim GET path: the restored `'` and `,` must reach
    /// the wire literally, and URL normalization would re-encode them.
    pub async fn run(&self, soql: &str) -> Option<QueryPage> {
        let path = format!("{}/query/?q={}", self.data_path, encode_soql(soql));
        let value = self.envelope.get_verbatim(&path).await.into_value()?;
        Self::decode_page(value)
    }

    /// Fetch a single follow-up page from an opaque cursor.
    pub async fn follow(&self, cursor: &str) -> Option<QueryPage> {
        let value = self.envelope.get_verbatim(cursor).await.into_value()?;
        Self::decode_page(value)
    }

    fn decode_page(value: Value) -> Option<QueryPage> {
        match serde_json::from_value(value) {
            Ok(page) => Some(page),
            Err(err) => {
                warn!(error = %err, "query result did not match page shape");
                None
            }
        }
    }
}
