//! Policy catalog: leave-type rules and the approval hierarchy, loaded once at startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::policy::{ApproverAuthority, PolicyRule};

const BUILTIN_CATALOG: &str = include_str!("../config/policy_catalog.toml");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read policy catalog `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse policy catalog: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("could not parse policy catalog: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("policy catalog validation failed: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyCatalog {
    pub leave_policies: BTreeMap<String, PolicyRule>,
    #[serde(default)]
    pub approval_hierarchy: BTreeMap<String, ApproverAuthority>,
}

impl PolicyCatalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Loads a catalog file; `.json` files are read as JSON, everything else as TOML.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;

        let is_json =
            path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext == "json");
        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_toml_str(&raw)
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        toml::from_str::<Self>(raw)?.normalized()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        serde_json::from_str::<Self>(raw)?.normalized()
    }

    /// Resolves a caller-supplied leave type (case-insensitive, spaces as underscores).
    pub fn lookup(&self, leave_type: &str) -> Option<(&str, &PolicyRule)> {
        self.leave_policies
            .get_key_value(&normalize_key(leave_type))
            .map(|(key, policy)| (key.as_str(), policy))
    }

    pub fn authority(&self, role: &str) -> Option<&ApproverAuthority> {
        self.approval_hierarchy.get(&normalize_key(role))
    }

    fn normalized(self) -> Result<Self, CatalogError> {
        let leave_policies: BTreeMap<String, PolicyRule> = self
            .leave_policies
            .into_iter()
            .map(|(key, policy)| (normalize_key(&key), policy))
            .collect();
        let approval_hierarchy = self
            .approval_hierarchy
            .into_iter()
            .map(|(role, authority)| (normalize_key(&role), authority))
            .collect();

        let catalog = Self { leave_policies, approval_hierarchy };
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.leave_policies.is_empty() {
            return Err(CatalogError::Validation(
                "catalog must define at least one entry under `leave_policies`".to_string(),
            ));
        }

        for (key, policy) in &self.leave_policies {
            if key.is_empty() {
                return Err(CatalogError::Validation("leave policy keys must not be empty".into()));
            }
            if policy.max_consecutive_days == 0 {
                return Err(CatalogError::Validation(format!(
                    "leave_policies.{key}.max_consecutive_days must be greater than zero"
                )));
            }
        }

        Ok(())
    }
}

pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Compares approver roles under the same folding as catalog keys.
pub fn same_role(left: &str, right: &str) -> bool {
    normalize_key(left) == normalize_key(right)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{normalize_key, same_role, CatalogError, PolicyCatalog};
    use crate::domain::policy::ApprovalChain;

    #[test]
    fn builtin_catalog_carries_the_standard_policies() {
        let catalog = PolicyCatalog::builtin().expect("builtin catalog parses");

        for key in
            ["casual_leave", "sick_leave", "annual_leave", "maternity_leave", "compensatory_leave"]
        {
            assert!(catalog.leave_policies.contains_key(key), "missing policy {key}");
        }
        let (_, sick) = catalog.lookup("sick_leave").expect("sick leave");
        assert_eq!(sick.max_consecutive_days, 5);
        let (_, annual) = catalog.lookup("annual_leave").expect("annual leave");
        assert_eq!(annual.approval_required, ApprovalChain::ManagerAndHr);
        assert!(catalog.authority("hr").is_some());
    }

    #[test]
    fn lookup_normalizes_case_and_spaces() {
        let catalog = PolicyCatalog::builtin().expect("builtin catalog parses");

        let (key, policy) = catalog.lookup("Casual Leave").expect("normalized lookup");
        assert_eq!(key, "casual_leave");
        assert_eq!(policy.annual_quota, 12);
        assert!(catalog.lookup("sabbatical").is_none());
    }

    #[test]
    fn file_keys_are_normalized_on_load() {
        let catalog = PolicyCatalog::from_toml_str(
            r#"
[leave_policies."Study Leave"]
name = "Study Leave"
annual_quota = 5
max_consecutive_days = 5
advance_notice_days = 14
approval_required = "manager_and_hr"

[approval_hierarchy.HR]
level = 2
max_days_approval = 30
"#,
        )
        .expect("catalog parses");

        assert!(catalog.lookup("study leave").is_some());
        assert!(catalog.authority("hr").is_some());
        assert_eq!(normalize_key("  Study Leave "), "study_leave");
    }

    #[test]
    fn json_catalog_files_are_supported() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("hr_knowledge_base.json");
        fs::write(
            &path,
            r#"{
  "leave_policies": {
    "casual_leave": {
      "name": "Casual Leave",
      "annual_quota": 12,
      "max_consecutive_days": 3,
      "advance_notice_days": 1,
      "approval_required": "manager"
    }
  },
  "approval_hierarchy": {
    "manager": { "level": 1, "max_days_approval": 10, "can_approve": ["employee"] }
  }
}"#,
        )
        .expect("write catalog");

        let catalog = PolicyCatalog::load(&path).expect("json catalog loads");
        assert_eq!(catalog.leave_policies.len(), 1);
        assert_eq!(catalog.authority("manager").map(|a| a.max_days_approval), Some(10));
    }

    #[test]
    fn empty_catalog_fails_validation() {
        let error = PolicyCatalog::from_json_str(r#"{"leave_policies": {}}"#)
            .expect_err("empty catalog must fail");
        assert!(matches!(
            error,
            CatalogError::Validation(ref message) if message.contains("leave_policies")
        ));
    }

    #[test]
    fn unknown_approval_chain_is_a_parse_error() {
        let error = PolicyCatalog::from_toml_str(
            r#"
[leave_policies.casual_leave]
name = "Casual Leave"
annual_quota = 12
max_consecutive_days = 3
advance_notice_days = 1
approval_required = "ceo"
"#,
        )
        .expect_err("unknown chain");
        assert!(matches!(error, CatalogError::ParseToml(_)));
    }

    #[test]
    fn missing_catalog_file_reports_path() {
        let error = PolicyCatalog::load(std::path::Path::new("does/not/exist.toml"))
            .expect_err("missing file");
        assert!(error.to_string().contains("does/not/exist.toml"));
    }

    #[test]
    fn roles_fold_like_catalog_keys() {
        assert!(same_role(" Manager ", "manager"));
        assert!(same_role("SENIOR MANAGER", "senior_manager"));
        assert!(same_role("Ärztin", "ärztin"));
        assert!(!same_role("hr", "manager"));
    }
}
