//! Operator-supplied service definition
//!
//! A [`ServiceDefinition`] carries the three values collected from the
//! operator. Its `name` is used three ways: as the subdomain, as the router
//! key, and as the service key in the dynamic config.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Backend scheme for the proxied service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP backend
    Http,
    /// HTTPS backend
    Https,
}

impl Scheme {
    /// The scheme as it appears in a URL
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(InputError::InvalidScheme(other.to_string())),
        }
    }
}

/// A service to publish: name, backend address, and scheme
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDefinition {
    /// Identifier used as subdomain and as router/service key
    pub name: String,
    /// Backend address in `host:port` form
    pub address: String,
    /// Backend scheme
    pub scheme: Scheme,
}

impl ServiceDefinition {
    /// Validate raw operator input into a service definition
    ///
    /// Rejects empty name/address, addresses that are not `host:port` with
    /// a numeric port, and schemes other than `http`/`https`. Values are
    /// trimmed before validation.
    pub fn new(name: &str, address: &str, scheme: &str) -> Result<Self, InputError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InputError::Empty("service name"));
        }

        let address = address.trim();
        if address.is_empty() {
            return Err(InputError::Empty("address"));
        }
        validate_address(address)?;

        let scheme = Scheme::from_str(scheme.trim())?;

        Ok(Self {
            name: name.to_string(),
            address: address.to_string(),
            scheme,
        })
    }

    /// Fully qualified host for this service under the base domain
    pub fn host(&self, domain: &str) -> String {
        format!("{}.{}", self.name, domain)
    }

    /// Backend target URL for the load balancer entry
    pub fn target_url(&self) -> String {
        format!("{}://{}", self.scheme, self.address)
    }
}

/// Check that an address is `host:port` with a non-zero numeric port
fn validate_address(address: &str) -> Result<(), InputError> {
    let malformed = || InputError::MalformedAddress(address.to_string());

    let (host, port) = address.rsplit_once(':').ok_or_else(malformed)?;
    if host.is_empty() {
        return Err(malformed());
    }

    let port: u16 = port.parse().map_err(|_| malformed())?;
    if port == 0 {
        return Err(malformed());
    }

    Ok(())
}
