//! Test doubles shared by the end-to-end flow tests

use std::sync::Mutex;

use async_trait::async_trait;
use svcpub_core::{DnsError, DnsRecord, RecordId, RecordPublisher};

/// What the mock should answer every publish call with
pub enum MockResponse {
    /// Succeed with this record id
    Succeed(&'static str),
    /// Fail with this classified error
    Fail(DnsError),
}

/// A recording publisher: remembers every record it was asked to create
pub struct MockPublisher {
    calls: Mutex<Vec<DnsRecord>>,
    response: MockResponse,
}

impl MockPublisher {
    pub fn succeeding(record_id: &'static str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            response: MockResponse::Succeed(record_id),
        }
    }

    pub fn failing(err: DnsError) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            response: MockResponse::Fail(err),
        }
    }

    /// Number of publish calls received
    pub fn publish_call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Every record passed to publish, in order
    pub fn published(&self) -> Vec<DnsRecord> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordPublisher for MockPublisher {
    async fn publish(&self, record: &DnsRecord) -> Result<RecordId, DnsError> {
        self.calls.lock().unwrap().push(record.clone());
        match &self.response {
            MockResponse::Succeed(id) => Ok(RecordId(id.to_string())),
            MockResponse::Fail(err) => Err(err.clone()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
