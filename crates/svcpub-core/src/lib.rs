// # svcpub-core
//
// Core library for publishing a self-hosted service: one router/service
// pair appended to the reverse proxy's dynamic config file, one CNAME
// alias record created at the DNS provider.
//
// ## Architecture Overview
//
// - **Settings**: deployment parameters, loaded once at startup
// - **DynamicConfigDocument / ConfigEditor**: typed document model and the
//   backup-then-atomic-write edit of the proxy's dynamic config
// - **RecordPublisher**: trait for creating the alias record via a
//   provider API (Cloudflare implementation lives in its own crate)
// - **AccessRuleEditor**: optional post-publish update of the auth
//   portal's access-control rules
// - **Orchestrator**: strict edit-publish-access sequencing with staged
//   error reporting
//
// ## Design Principles
//
// 1. Settings are an explicit struct passed by reference; no component
//    reads the environment after startup
// 2. Every fallible step returns a typed error; nothing is caught or
//    recovered below the orchestrator boundary
// 3. The dynamic config round-trips: only `routers` and `services` are
//    ever modified, everything else is preserved
// 4. No retries anywhere; each run performs each side effect at most once

pub mod access;
pub mod document;
pub mod editor;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod publisher;
pub mod service;
pub mod settings;

// Re-export core types for convenience
pub use access::{AccessChange, AccessRuleEditor};
pub use document::DynamicConfigDocument;
pub use editor::{AppliedChange, ConfigEditor};
pub use error::{ConfigError, DnsError, Error, InputError, Result};
pub use orchestrator::{Orchestrator, Outcome, Stage};
pub use prompt::collect_service_definition;
pub use publisher::{DnsRecord, RecordId, RecordPublisher};
pub use service::{Scheme, ServiceDefinition};
pub use settings::Settings;
