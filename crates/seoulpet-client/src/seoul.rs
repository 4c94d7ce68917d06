//! Seoul Open API access on top of [`ApiClient`].
//!
//! Requests follow the `/{key}/json/{service}/{start}/{end}/` path layout,
//! where `start` and `end` are 1-based inclusive row indices. A single request
//! may ask for at most [`MAX_ROWS_PER_REQUEST`] rows, so wider ranges are split
//! into consecutive chunks that all run inside one [`crate::ApiSession`].
//!
//! ## Envelope
//!
//! ```text
//! { "<service>": { "list_total_count": 25,
//!                  "RESULT": { "CODE": "INFO-000", "MESSAGE": "..." },
//!                  "row": [ { ... }, ... ] } }
//! ```
//!
//! When nothing matches, upstream drops the service object and answers with a
//! bare `{ "RESULT": { "CODE": "INFO-200", ... } }`.

use reqwest::header::HeaderMap;
use serde_json::Value;

use seoulpet_core::Record;

use crate::client::{ApiClient, ClientConfig};
use crate::error::ClientError;

/// Upstream refuses requests spanning more rows than this.
pub const MAX_ROWS_PER_REQUEST: u32 = 1000;

/// Key accepted by upstream for unauthenticated, heavily rate-limited access.
const SAMPLE_API_KEY: &str = "sample";

const CODE_OK: &str = "INFO-000";
const CODE_NO_DATA: &str = "INFO-200";

pub struct SeoulOpenApi {
    client: ApiClient,
    api_key: String,
}

impl SeoulOpenApi {
    #[must_use]
    pub fn new(mut client: ApiClient, api_key: &str) -> Self {
        client.redact(api_key);
        Self {
            client,
            api_key: api_key.to_owned(),
        }
    }

    /// Builds the client from application settings. Without a configured key
    /// the public `sample` key is used, which upstream caps at a few rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying [`ApiClient`] cannot be built.
    pub fn from_app_config(config: &seoulpet_core::AppConfig) -> Result<Self, ClientError> {
        let client = ApiClient::new(&ClientConfig::from_app_config(config))?;
        let api_key = config.seoul_api_key.as_deref().unwrap_or_else(|| {
            tracing::warn!("SEOUL_API_KEY not set; falling back to the rate-limited sample key");
            SAMPLE_API_KEY
        });
        Ok(Self::new(client, api_key))
    }

    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Fetches rows `start..=end` of `service`.
    ///
    /// Stops early once upstream reports fewer rows than requested or the
    /// advertised `list_total_count` is reached.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidRange`] if `start == 0` or `end < start`.
    /// - [`ClientError::Upstream`] if the envelope carries an error code.
    /// - Any [`ApiClient`] error from the underlying requests.
    pub async fn fetch_rows(
        &self,
        service: &str,
        start: u32,
        end: u32,
    ) -> Result<Vec<Record>, ClientError> {
        let chunks = chunk_range(start, end, MAX_ROWS_PER_REQUEST)?;
        let session = self.client.session().await?;
        let headers = HeaderMap::new();
        let mut rows: Vec<Record> = Vec::new();

        for (chunk_start, chunk_end) in chunks {
            let path = format!(
                "{key}/json/{service}/{chunk_start}/{chunk_end}/",
                key = self.api_key
            );
            let body = session.get(&path, &[], &headers).await?;
            let page = parse_envelope(service, body)?;

            let requested = usize::try_from(chunk_end - chunk_start + 1).unwrap_or(usize::MAX);
            let short_page = page.rows.len() < requested;
            let reached_total = page
                .total_count
                .is_some_and(|total| total <= u64::from(chunk_end));

            tracing::debug!(
                service,
                chunk_start,
                chunk_end,
                rows = page.rows.len(),
                total = ?page.total_count,
                "fetched Seoul Open API chunk"
            );

            rows.extend(page.rows);
            if short_page || reached_total {
                break;
            }
        }

        Ok(rows)
    }
}

/// Splits `start..=end` into consecutive chunks of at most `size` rows.
pub(crate) fn chunk_range(start: u32, end: u32, size: u32) -> Result<Vec<(u32, u32)>, ClientError> {
    if start == 0 || end < start || size == 0 {
        return Err(ClientError::InvalidRange { start, end });
    }

    let mut chunks = Vec::new();
    let mut from = start;
    loop {
        let to = from.saturating_add(size - 1).min(end);
        chunks.push((from, to));
        if to == end {
            break;
        }
        from = to + 1;
    }
    Ok(chunks)
}

#[derive(Debug)]
pub(crate) struct Page {
    pub total_count: Option<u64>,
    pub rows: Vec<Record>,
}

/// Unwraps one Seoul Open API response body.
pub(crate) fn parse_envelope(service: &str, body: Value) -> Result<Page, ClientError> {
    let Value::Object(mut top) = body else {
        return Err(ClientError::Upstream {
            code: "INVALID".to_string(),
            message: format!("expected a JSON object from {service}"),
        });
    };

    let Some(Value::Object(mut payload)) = top.remove(service) else {
        // No service object: upstream reports the outcome in a bare RESULT.
        return match result_code(top.get("RESULT")) {
            Some((code, _)) if code == CODE_NO_DATA => Ok(Page {
                total_count: Some(0),
                rows: Vec::new(),
            }),
            Some((code, message)) => Err(ClientError::Upstream { code, message }),
            None => Err(ClientError::Upstream {
                code: "INVALID".to_string(),
                message: format!("response has no '{service}' object"),
            }),
        };
    };

    match result_code(payload.get("RESULT")) {
        Some((code, _)) if code == CODE_OK => {}
        Some((code, _)) if code == CODE_NO_DATA => {
            return Ok(Page {
                total_count: Some(0),
                rows: Vec::new(),
            });
        }
        Some((code, message)) => return Err(ClientError::Upstream { code, message }),
        None => {}
    }

    let total_count = payload.get("list_total_count").and_then(Value::as_u64);
    let rows = match payload.remove("row") {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                other => {
                    tracing::warn!(service, row = %other, "dropping non-object row");
                    None
                }
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(Page { total_count, rows })
}

fn result_code(result: Option<&Value>) -> Option<(String, String)> {
    let result = result?;
    let code = result.get("CODE")?.as_str()?.to_string();
    let message = result
        .get("MESSAGE")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some((code, message))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn chunk_range_single_chunk() {
        assert_eq!(chunk_range(1, 5, 1000).unwrap(), vec![(1, 5)]);
    }

    #[test]
    fn chunk_range_splits_on_limit() {
        assert_eq!(
            chunk_range(1, 2500, 1000).unwrap(),
            vec![(1, 1000), (1001, 2000), (2001, 2500)]
        );
    }

    #[test]
    fn chunk_range_exact_multiple() {
        assert_eq!(
            chunk_range(1001, 3000, 1000).unwrap(),
            vec![(1001, 2000), (2001, 3000)]
        );
    }

    #[test]
    fn chunk_range_rejects_zero_start_and_inverted_range() {
        assert!(matches!(
            chunk_range(0, 5, 1000),
            Err(ClientError::InvalidRange { start: 0, end: 5 })
        ));
        assert!(matches!(
            chunk_range(10, 5, 1000),
            Err(ClientError::InvalidRange { .. })
        ));
    }

    #[test]
    fn parse_envelope_returns_rows_and_total() {
        let body = json!({
            "PetRegistration": {
                "list_total_count": 2,
                "RESULT": { "CODE": "INFO-000", "MESSAGE": "정상 처리되었습니다" },
                "row": [ { "a": 1 }, { "a": 2 } ]
            }
        });
        let page = parse_envelope("PetRegistration", body).expect("page");
        assert_eq!(page.total_count, Some(2));
        assert_eq!(page.rows.len(), 2);
    }

    #[test]
    fn parse_envelope_no_data_is_empty_page() {
        let body = json!({ "RESULT": { "CODE": "INFO-200", "MESSAGE": "해당하는 데이터가 없습니다." } });
        let page = parse_envelope("PetRegistration", body).expect("page");
        assert!(page.rows.is_empty());
    }

    #[test]
    fn parse_envelope_error_code_is_upstream_error() {
        let body = json!({ "RESULT": { "CODE": "INFO-100", "MESSAGE": "인증키가 유효하지 않습니다." } });
        let err = parse_envelope("PetRegistration", body).unwrap_err();
        assert!(
            matches!(err, ClientError::Upstream { ref code, .. } if code == "INFO-100"),
            "got: {err}"
        );
    }

    #[test]
    fn parse_envelope_error_inside_service_object() {
        let body = json!({
            "PetRegistration": { "RESULT": { "CODE": "ERROR-500", "MESSAGE": "서버 오류" } }
        });
        let err = parse_envelope("PetRegistration", body).unwrap_err();
        assert!(matches!(err, ClientError::Upstream { ref code, .. } if code == "ERROR-500"));
    }

    #[test]
    fn parse_envelope_drops_non_object_rows() {
        let body = json!({
            "Svc": { "RESULT": { "CODE": "INFO-000" }, "row": [ { "a": 1 }, 7, "x" ] }
        });
        let page = parse_envelope("Svc", body).expect("page");
        assert_eq!(page.rows.len(), 1);
        assert!(page.total_count.is_none());
    }

    #[test]
    fn parse_envelope_rejects_unknown_shape() {
        let err = parse_envelope("Svc", json!({ "other": {} })).unwrap_err();
        assert!(matches!(err, ClientError::Upstream { ref code, .. } if code == "INVALID"));
        let err = parse_envelope("Svc", json!([1, 2])).unwrap_err();
        assert!(matches!(err, ClientError::Upstream { .. }));
    }
}
