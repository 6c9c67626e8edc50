//! Publishing orchestrator
//!
//! Runs the side-effecting steps in strict sequence: edit the dynamic
//! config, create the DNS record, then (when an auth portal config is
//! configured) add the host to its access rules. A failed edit skips the
//! DNS step entirely. A failure after a successful step does NOT roll that
//! step back: config edits are locally recoverable via their backups,
//! while DNS state is external and must be fixed manually or by rerunning.
//! That asymmetry is deliberate.

use std::fmt;

use crate::access::{AccessChange, AccessRuleEditor};
use crate::editor::{AppliedChange, ConfigEditor};
use crate::error::{Error, Result};
use crate::publisher::{DnsRecord, RecordId, RecordPublisher};
use crate::service::ServiceDefinition;
use crate::settings::Settings;

/// The stage a run failed in, for reporting and exit-status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Loading settings at startup
    ConfigLoad,
    /// Collecting and validating operator input
    Input,
    /// Editing the dynamic config file
    Edit,
    /// Creating the DNS record
    Publish,
    /// Adding the host to the auth portal's access rules
    AccessUpdate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ConfigLoad => "config-load",
            Stage::Input => "input",
            Stage::Edit => "edit",
            Stage::Publish => "publish",
            Stage::AccessUpdate => "access-update",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Which stage this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            Error::MissingConfig(_) | Error::InvalidConfig { .. } => Stage::ConfigLoad,
            Error::Input(_) | Error::Io(_) => Stage::Input,
            Error::Config(_) => Stage::Edit,
            Error::Dns(_) => Stage::Publish,
            Error::Access(_) => Stage::AccessUpdate,
        }
    }
}

/// What a fully successful run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// The config edit, including the backup location
    pub change: AppliedChange,
    /// Name of the record that was created
    pub record_name: String,
    /// Provider-assigned identifier for the record
    pub record_id: RecordId,
    /// Access-control update, when an auth portal config is configured
    pub access: Option<AccessChange>,
}

/// Drives edit-then-publish for one service definition
pub struct Orchestrator<'a> {
    settings: &'a Settings,
    publisher: &'a dyn RecordPublisher,
}

impl<'a> Orchestrator<'a> {
    /// Build an orchestrator over loaded settings and a provider
    pub fn new(settings: &'a Settings, publisher: &'a dyn RecordPublisher) -> Self {
        Self {
            settings,
            publisher,
        }
    }

    /// Edit the config, then publish the record
    ///
    /// Returns at the first failure; the error's [`Stage`] tells the
    /// caller how far the run got.
    pub async fn run(&self, svc: &ServiceDefinition) -> Result<Outcome> {
        let editor = ConfigEditor::new(&self.settings.domain_name);
        let change = editor.apply(&self.settings.config_file_path, svc).await?;

        let record = DnsRecord::cname(svc, &self.settings.domain_name, self.settings.proxied);
        tracing::info!(
            "publishing {} record {} -> {} via {}",
            DnsRecord::TYPE,
            record.name,
            record.target,
            self.publisher.provider_name()
        );
        let record_id = self.publisher.publish(&record).await?;

        let access = match &self.settings.authelia_config_path {
            Some(path) => {
                let access_change = AccessRuleEditor::new()
                    .apply(path, &record.name)
                    .await
                    .map_err(Error::Access)?;
                Some(access_change)
            }
            None => None,
        };

        Ok(Outcome {
            change,
            record_name: record.name,
            record_id,
            access,
        })
    }
}
