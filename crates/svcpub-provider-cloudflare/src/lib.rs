// # Cloudflare CNAME Publisher
//
// Implements the core `RecordPublisher` trait against the Cloudflare API
// v4: one authenticated `POST /zones/:zone_id/dns_records` per run.
//
// Scope, by design:
// - One HTTP request per publish; no retries, no backoff (a failure ends
//   the run and is reported once)
// - Full response classification into `DnsError`; nothing is swallowed
// - HTTP timeout of 30 seconds
// - The API token NEVER appears in logs or Debug output
//
// API reference:
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Create DNS Record: POST `/zones/:zone_id/dns_records`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use svcpub_core::{DnsError, DnsRecord, RecordId, RecordPublisher};

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare interprets a TTL of 1 as "automatic"
const TTL_AUTOMATIC: u32 = 1;

/// Cloudflare error codes meaning "an identical record already exists"
const RECORD_EXISTS_CODES: &[u64] = &[81053, 81057];

/// Cloudflare DNS record publisher
///
/// Stateless and single-shot: each `publish` call issues exactly one
/// creation request and classifies the response. The caller owns the
/// decision of what to do with any failure.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// Never log this value
    api_token: String,

    /// Zone the record is created in
    zone_id: String,

    /// API base URL, overridable for tests
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// The API token is redacted from Debug output
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare publisher
    ///
    /// `api_token` needs Zone:DNS:Edit permission for the zone. The token
    /// is assumed non-empty; the settings loader enforces that.
    pub fn new(api_token: impl Into<String>, zone_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_token: api_token.into(),
            zone_id: zone_id.into(),
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
        }
    }

    /// Override the API base URL (for tests against a local server)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn records_endpoint(&self) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, self.zone_id)
    }
}

/// Creation request payload
#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

/// Cloudflare's response envelope
#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
    result: Option<ApiResult>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: u64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    id: String,
}

#[async_trait]
impl RecordPublisher for CloudflareProvider {
    /// Create the CNAME record in the configured zone
    ///
    /// Classification:
    /// - 2xx with `success: true` → the provider-assigned record id
    /// - 401/403 → `Unauthorized`
    /// - 409, or error code 81053/81057 → `AlreadyExists`
    /// - transport or timeout failure → `Unreachable`
    /// - anything else → `ProviderRejected` with the raw message
    async fn publish(&self, record: &DnsRecord) -> Result<RecordId, DnsError> {
        tracing::info!(
            "creating Cloudflare {} record {} -> {} (proxied: {})",
            DnsRecord::TYPE,
            record.name,
            record.target,
            record.proxied
        );

        let payload = CreateRecordRequest {
            record_type: DnsRecord::TYPE,
            name: &record.name,
            content: &record.target,
            ttl: TTL_AUTOMATIC,
            proxied: record.proxied,
        };

        let response = self
            .client
            .post(self.records_endpoint())
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_error)?;

        classify_response(status, &body, &record.name)
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Network-level failures: the provider was never (fully) reached
fn transport_error(err: reqwest::Error) -> DnsError {
    DnsError::Unreachable(err.to_string())
}

/// Map one HTTP response to success or a classified error
fn classify_response(status: u16, body: &str, record_name: &str) -> Result<RecordId, DnsError> {
    match status {
        401 | 403 => return Err(DnsError::Unauthorized),
        409 => return Err(DnsError::AlreadyExists(record_name.to_string())),
        _ => {}
    }

    let parsed: Result<ApiResponse, _> = serde_json::from_str(body);
    match parsed {
        Ok(api) if api.success && (200..300).contains(&status) => match api.result {
            Some(result) => Ok(RecordId(result.id)),
            None => Err(DnsError::ProviderRejected {
                status,
                message: "success response without a record id".to_string(),
            }),
        },
        Ok(api) => {
            if api
                .errors
                .iter()
                .any(|e| RECORD_EXISTS_CODES.contains(&e.code))
            {
                return Err(DnsError::AlreadyExists(record_name.to_string()));
            }
            let message = api
                .errors
                .first()
                .map(|e| format!("{} (code {})", e.message, e.code))
                .unwrap_or_else(|| truncated(body));
            Err(DnsError::ProviderRejected { status, message })
        }
        Err(_) => Err(DnsError::ProviderRejected {
            status,
            message: truncated(body),
        }),
    }
}

/// Keep raw provider messages readable in a one-line status report
fn truncated(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_has_cname_shape() {
        let payload = CreateRecordRequest {
            record_type: DnsRecord::TYPE,
            name: "plex.example.com",
            content: "example.com",
            ttl: TTL_AUTOMATIC,
            proxied: true,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "CNAME");
        assert_eq!(json["name"], "plex.example.com");
        assert_eq!(json["content"], "example.com");
        assert_eq!(json["ttl"], 1);
        assert_eq!(json["proxied"], true);
    }

    #[test]
    fn success_response_yields_record_id() {
        let body = r#"{"success": true, "errors": [], "result": {"id": "rec-123"}}"#;
        let id = classify_response(200, body, "plex.example.com").unwrap();
        assert_eq!(id, RecordId("rec-123".to_string()));
    }

    #[test]
    fn unauthorized_statuses_map_to_unauthorized() {
        for status in [401, 403] {
            let err = classify_response(status, "", "plex.example.com").unwrap_err();
            assert_eq!(err, DnsError::Unauthorized, "status {}", status);
        }
    }

    #[test]
    fn conflict_status_maps_to_already_exists() {
        let err = classify_response(409, "", "plex.example.com").unwrap_err();
        assert_eq!(
            err,
            DnsError::AlreadyExists("plex.example.com".to_string())
        );
    }

    #[test]
    fn record_exists_error_code_maps_to_already_exists() {
        let body = r#"{"success": false, "errors": [{"code": 81057, "message": "Record already exists."}], "result": null}"#;
        let err = classify_response(400, body, "plex.example.com").unwrap_err();
        assert_eq!(
            err,
            DnsError::AlreadyExists("plex.example.com".to_string())
        );
    }

    #[test]
    fn other_provider_errors_carry_raw_message() {
        let body = r#"{"success": false, "errors": [{"code": 9109, "message": "Invalid zone identifier"}], "result": null}"#;
        let err = classify_response(400, body, "plex.example.com").unwrap_err();
        match err {
            DnsError::ProviderRejected { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("Invalid zone identifier"));
                assert!(message.contains("9109"));
            }
            other => panic!("expected ProviderRejected, got {:?}", other),
        }
    }

    #[test]
    fn unparseable_body_is_provider_rejected() {
        let err = classify_response(502, "<html>Bad Gateway</html>", "plex.example.com")
            .unwrap_err();
        assert!(matches!(
            err,
            DnsError::ProviderRejected { status: 502, .. }
        ));
    }

    #[test]
    fn success_flag_without_result_is_rejected() {
        let body = r#"{"success": true, "errors": [], "result": null}"#;
        let err = classify_response(200, body, "plex.example.com").unwrap_err();
        assert!(matches!(err, DnsError::ProviderRejected { .. }));
    }

    #[test]
    fn api_token_not_exposed_in_debug() {
        let provider = CloudflareProvider::new("secret_token_12345", "zone-1");
        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(debug_str.contains("CloudflareProvider"));
    }

    #[test]
    fn api_base_override_changes_endpoint() {
        let provider =
            CloudflareProvider::new("token", "zone-1").with_api_base("http://127.0.0.1:9999");
        assert_eq!(
            provider.records_endpoint(),
            "http://127.0.0.1:9999/zones/zone-1/dns_records"
        );
    }

    #[test]
    fn long_bodies_are_truncated_in_messages() {
        let body = "x".repeat(1000);
        let err = classify_response(500, &body, "plex.example.com").unwrap_err();
        match err {
            DnsError::ProviderRejected { message, .. } => {
                assert!(message.len() < 300);
                assert!(message.ends_with("..."));
            }
            other => panic!("expected ProviderRejected, got {:?}", other),
        }
    }
}
