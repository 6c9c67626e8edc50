//! Dynamic config document model
//!
//! The reverse proxy's dynamic config is a TOML mapping-of-mappings. Only
//! the top-level `routers` and `services` tables are ever touched; every
//! other key is carried in an opaque bucket and written back structurally
//! unchanged, so the document round-trips.

use std::path::Path;

use toml::value::{Table, Value};

use crate::error::ConfigError;
use crate::service::ServiceDefinition;

/// Parsed dynamic config: the two editable tables plus the rest verbatim
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DynamicConfigDocument {
    /// Router name → router rule definition
    pub routers: Table,
    /// Service name → load-balancer target definition
    pub services: Table,
    /// Every other top-level key, preserved untouched
    pub rest: Table,
}

impl DynamicConfigDocument {
    /// Parse a document from TOML text
    ///
    /// A missing `routers` or `services` table is treated as empty; a
    /// present key of the wrong type is a parse failure.
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut doc: Table = toml::from_str(text).map_err(|e| ConfigError::ParseFailure {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let routers = take_table(&mut doc, "routers", path)?;
        let services = take_table(&mut doc, "services", path)?;

        Ok(Self {
            routers,
            services,
            rest: doc,
        })
    }

    /// Serialize back to TOML text
    ///
    /// Tables are keyed maps, so output ordering is stable and sorted by
    /// key; untouched keys keep their exact structure.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        let mut doc = self.rest.clone();
        doc.insert("routers".to_string(), Value::Table(self.routers.clone()));
        doc.insert("services".to_string(), Value::Table(self.services.clone()));
        toml::to_string_pretty(&doc)
    }

    /// Insert the router/service pair for a service definition
    ///
    /// The router rule matches exactly `name.<domain>` and references the
    /// service by the same name. Existing entries are never overwritten.
    pub fn insert(&mut self, svc: &ServiceDefinition, domain: &str) -> Result<(), ConfigError> {
        if self.routers.contains_key(&svc.name) || self.services.contains_key(&svc.name) {
            return Err(ConfigError::DuplicateService(svc.name.clone()));
        }

        self.routers
            .insert(svc.name.clone(), router_entry(svc, domain));
        self.services.insert(svc.name.clone(), service_entry(svc));

        Ok(())
    }
}

/// Router entry: HTTPS entrypoint, exact host rule, TLS enabled
fn router_entry(svc: &ServiceDefinition, domain: &str) -> Value {
    let mut router = Table::new();
    router.insert(
        "entryPoints".to_string(),
        Value::Array(vec![Value::String("https".to_string())]),
    );
    router.insert(
        "rule".to_string(),
        Value::String(format!("Host(`{}`)", svc.host(domain))),
    );
    router.insert("service".to_string(), Value::String(svc.name.clone()));
    router.insert("tls".to_string(), Value::Table(Table::new()));
    Value::Table(router)
}

/// Service entry: single load-balancer target, host header passed through
fn service_entry(svc: &ServiceDefinition) -> Value {
    let mut server = Table::new();
    server.insert("url".to_string(), Value::String(svc.target_url()));

    let mut load_balancer = Table::new();
    load_balancer.insert("servers".to_string(), Value::Array(vec![Value::Table(server)]));
    load_balancer.insert("passHostHeader".to_string(), Value::Boolean(true));

    let mut service = Table::new();
    service.insert("loadBalancer".to_string(), Value::Table(load_balancer));
    Value::Table(service)
}

/// Remove a top-level table by key, defaulting to empty if absent
fn take_table(doc: &mut Table, key: &str, path: &Path) -> Result<Table, ConfigError> {
    match doc.remove(key) {
        Some(Value::Table(table)) => Ok(table),
        Some(other) => Err(ConfigError::ParseFailure {
            path: path.to_path_buf(),
            message: format!("top-level '{}' is {}, expected a table", key, other.type_str()),
        }),
        None => Ok(Table::new()),
    }
}
