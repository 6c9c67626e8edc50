//! DNS record publisher trait
//!
//! Providers are isolated and single-shot: one authenticated creation
//! request per run, full error classification, no retries (a failure ends
//! the run and is reported to the operator).

use async_trait::async_trait;
use std::fmt;

use crate::error::DnsError;
use crate::service::ServiceDefinition;

/// Provider-assigned identifier for a created record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A CNAME alias record to create at the provider
///
/// The record lives entirely at the provider; this system only issues the
/// creation request and does not track it afterward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Fully qualified record name (`<service>.<domain>`)
    pub name: String,
    /// Alias target (the base domain)
    pub target: String,
    /// Whether the record goes through the provider's proxy
    pub proxied: bool,
}

impl DnsRecord {
    /// Record type; this tool only ever creates aliases
    pub const TYPE: &'static str = "CNAME";

    /// Build the alias record for a service under the base domain
    pub fn cname(svc: &ServiceDefinition, domain: &str, proxied: bool) -> Self {
        Self {
            name: svc.host(domain),
            target: domain.to_string(),
            proxied,
        }
    }
}

/// Trait for DNS provider implementations
///
/// Implementations must be stateless, make exactly one creation request
/// per call, and classify the provider's response into [`DnsError`]. An
/// "already exists" response is an error, not a success; the caller
/// decides whether that is acceptable.
#[async_trait]
pub trait RecordPublisher: Send + Sync {
    /// Create the record, returning the provider-assigned identifier
    async fn publish(&self, record: &DnsRecord) -> Result<RecordId, DnsError>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
