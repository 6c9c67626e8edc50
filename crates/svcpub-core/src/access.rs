//! Authelia access-control editor
//!
//! After the DNS record is created, the published host is added to the
//! auth portal's access-control rules so the new subdomain is actually
//! reachable behind the portal. The host lands in the first rule with the
//! `one_factor` policy; when no such rule exists, one is created. The same
//! backup-then-atomic-write discipline as the dynamic config editor
//! applies, and a host that is already covered is left alone.

use std::path::Path;

use chrono::Local;
use tokio::fs;
use toml::value::{Table, Value};

use crate::editor::{AppliedChange, BACKUP_TIMESTAMP_FORMAT, backup_path, write_atomic};
use crate::error::ConfigError;

/// Policy whose rule collects published hosts
const ONE_FACTOR_POLICY: &str = "one_factor";

/// Result of an access-control update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessChange {
    /// The host was added; the file was backed up and rewritten
    Updated(AppliedChange),
    /// The host was already covered by a rule; nothing was touched
    AlreadyListed,
}

/// Editor for the auth portal's access-control configuration
#[derive(Debug, Clone, Default)]
pub struct AccessRuleEditor;

impl AccessRuleEditor {
    /// Create an access-rule editor
    pub fn new() -> Self {
        Self
    }

    /// Ensure `host` is covered by a `one_factor` access rule at `path`
    ///
    /// The document is validated and the change computed before the
    /// backup is written, so a structurally broken file never produces a
    /// backup or a write. An already-listed host is a no-op.
    pub async fn apply(&self, path: &Path, host: &str) -> Result<AccessChange, ConfigError> {
        let original = fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::ReadFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let parse_failure = |message: String| ConfigError::ParseFailure {
            path: path.to_path_buf(),
            message,
        };

        let text =
            String::from_utf8(original.clone()).map_err(|e| parse_failure(e.to_string()))?;
        let mut doc: Table = toml::from_str(&text).map_err(|e| parse_failure(e.to_string()))?;

        if !add_host(&mut doc, host).map_err(parse_failure)? {
            tracing::info!("host {} already covered by an access rule", host);
            return Ok(AccessChange::AlreadyListed);
        }

        // Backup the pre-mutation bytes before the rewrite
        let backup_path = backup_path(
            path,
            &Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string(),
        );
        fs::write(&backup_path, &original)
            .await
            .map_err(|e| ConfigError::BackupFailed {
                path: backup_path.clone(),
                source: e,
            })?;
        tracing::info!("backed up access config to {}", backup_path.display());

        let serialized = toml::to_string_pretty(&doc).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?;
        write_atomic(path, serialized.as_bytes()).await?;

        tracing::info!("added {} to the access rules in {}", host, path.display());

        Ok(AccessChange::Updated(AppliedChange {
            config_path: path.to_path_buf(),
            backup_path,
        }))
    }
}

/// Add `host` to the access rules; `Ok(false)` means it was already there
fn add_host(doc: &mut Table, host: &str) -> Result<bool, String> {
    let access_control = doc
        .entry("access_control".to_string())
        .or_insert_with(|| Value::Table(Table::new()));
    let access_control = access_control
        .as_table_mut()
        .ok_or_else(|| "top-level 'access_control' is not a table".to_string())?;

    let rules = access_control
        .entry("rules".to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let rules = rules
        .as_array_mut()
        .ok_or_else(|| "'access_control.rules' is not an array".to_string())?;

    let mut one_factor_at = None;
    for (idx, rule) in rules.iter().enumerate() {
        let rule = rule
            .as_table()
            .ok_or_else(|| format!("access rule {} is not a table", idx))?;

        if let Some(domains) = rule.get("domain") {
            let domains = domains
                .as_array()
                .ok_or_else(|| format!("'domain' of access rule {} is not an array", idx))?;
            if domains.iter().any(|d| d.as_str() == Some(host)) {
                return Ok(false);
            }
        }

        if one_factor_at.is_none()
            && rule.get("policy").and_then(Value::as_str) == Some(ONE_FACTOR_POLICY)
        {
            one_factor_at = Some(idx);
        }
    }

    match one_factor_at {
        Some(idx) => {
            // Checked above: every rule is a table
            let rule = rules[idx].as_table_mut().expect("rule is a table");
            let domains = rule
                .entry("domain".to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            let domains = domains
                .as_array_mut()
                .ok_or_else(|| format!("'domain' of access rule {} is not an array", idx))?;
            domains.push(Value::String(host.to_string()));
        }
        None => {
            let mut rule = Table::new();
            rule.insert(
                "domain".to_string(),
                Value::Array(vec![Value::String(host.to_string())]),
            );
            rule.insert(
                "policy".to_string(),
                Value::String(ONE_FACTOR_POLICY.to_string()),
            );
            rules.push(Value::Table(rule));
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const PORTAL_CONFIG: &str = "\
theme = \"dark\"

[[access_control.rules]]
domain = [\"admin.example.com\"]
policy = \"two_factor\"

[[access_control.rules]]
domain = [\"whoami.example.com\"]
policy = \"one_factor\"
";

    async fn write_portal_config(dir: &TempDir, text: &str) -> PathBuf {
        let path = dir.path().join("configuration.toml");
        fs::write(&path, text).await.unwrap();
        path
    }

    fn backups_in(dir: &TempDir) -> Vec<PathBuf> {
        std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "bak"))
            .collect()
    }

    fn rules_of(path: &PathBuf) -> Vec<Table> {
        let text = std::fs::read_to_string(path).unwrap();
        let doc: Table = toml::from_str(&text).unwrap();
        doc["access_control"].as_table().unwrap()["rules"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_table().unwrap().clone())
            .collect()
    }

    fn domains_of(rule: &Table) -> Vec<String> {
        rule["domain"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d.as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn appends_host_to_existing_one_factor_rule() {
        let dir = TempDir::new().unwrap();
        let path = write_portal_config(&dir, PORTAL_CONFIG).await;

        let change = AccessRuleEditor::new()
            .apply(&path, "plex.example.com")
            .await
            .unwrap();
        assert!(matches!(change, AccessChange::Updated(_)));

        let rules = rules_of(&path);
        assert_eq!(rules.len(), 2);
        // The two_factor rule is untouched; the one_factor rule grew
        assert_eq!(domains_of(&rules[0]), vec!["admin.example.com"]);
        assert_eq!(
            domains_of(&rules[1]),
            vec!["whoami.example.com", "plex.example.com"]
        );
    }

    #[tokio::test]
    async fn creates_rule_when_no_one_factor_rule_exists() {
        let dir = TempDir::new().unwrap();
        let path = write_portal_config(
            &dir,
            "[[access_control.rules]]\ndomain = [\"admin.example.com\"]\npolicy = \"two_factor\"\n",
        )
        .await;

        AccessRuleEditor::new()
            .apply(&path, "plex.example.com")
            .await
            .unwrap();

        let rules = rules_of(&path);
        assert_eq!(rules.len(), 2);
        assert_eq!(domains_of(&rules[1]), vec!["plex.example.com"]);
        assert_eq!(rules[1]["policy"].as_str().unwrap(), "one_factor");
    }

    #[tokio::test]
    async fn creates_section_when_absent() {
        let dir = TempDir::new().unwrap();
        let path = write_portal_config(&dir, "theme = \"dark\"\n").await;

        AccessRuleEditor::new()
            .apply(&path, "plex.example.com")
            .await
            .unwrap();

        let rules = rules_of(&path);
        assert_eq!(rules.len(), 1);
        assert_eq!(domains_of(&rules[0]), vec!["plex.example.com"]);
    }

    #[tokio::test]
    async fn already_listed_host_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let path = write_portal_config(&dir, PORTAL_CONFIG).await;
        let before = std::fs::read(&path).unwrap();

        let change = AccessRuleEditor::new()
            .apply(&path, "whoami.example.com")
            .await
            .unwrap();

        assert_eq!(change, AccessChange::AlreadyListed);
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(backups_in(&dir).is_empty());
    }

    #[tokio::test]
    async fn update_preserves_unrelated_keys_and_writes_backup() {
        let dir = TempDir::new().unwrap();
        let path = write_portal_config(&dir, PORTAL_CONFIG).await;

        AccessRuleEditor::new()
            .apply(&path, "plex.example.com")
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let doc: Table = toml::from_str(&text).unwrap();
        assert_eq!(doc["theme"].as_str().unwrap(), "dark");

        let backups = backups_in(&dir);
        assert_eq!(backups.len(), 1);
        assert_eq!(
            std::fs::read(&backups[0]).unwrap(),
            PORTAL_CONFIG.as_bytes()
        );
    }

    #[tokio::test]
    async fn missing_file_fails_with_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("configuration.toml");

        let err = AccessRuleEditor::new()
            .apply(&path, "plex.example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[tokio::test]
    async fn malformed_rules_fail_without_backup() {
        let dir = TempDir::new().unwrap();
        let path = write_portal_config(&dir, "[access_control]\nrules = 3\n").await;
        let before = std::fs::read(&path).unwrap();

        let err = AccessRuleEditor::new()
            .apply(&path, "plex.example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, ConfigError::ParseFailure { .. }));
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert!(backups_in(&dir).is_empty());
    }
}
