use serde::{Deserialize, Serialize};

/// Which repository implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Memory,
    Database,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapAdmin {
    pub email: String,
    #[serde(default = "default_admin_name")]
    pub display_name: String,
}

/// Configuration for the academy module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcademyConfig {
    /// Unset: database when the runtime provides one, memory otherwise.
    #[serde(default)]
    pub storage: Option<StorageKind>,
    /// Trusted header with the authenticated user's id.
    #[serde(default = "default_principal_header")]
    pub principal_header: String,
    /// Created on startup when there are no users yet.
    #[serde(default)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
}

impl Default for AcademyConfig {
    fn default() -> Self {
        Self {
            storage: None,
            principal_header: default_principal_header(),
            bootstrap_admin: None,
            max_name_length: default_max_name_length(),
        }
    }
}

fn default_principal_header() -> String {
    "x-user-id".to_string()
}

fn default_admin_name() -> String {
    "Administrator".to_string()
}

fn default_max_name_length() -> usize {
    200
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_empty_section() {
        let cfg: AcademyConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(cfg.storage, None);
        assert_eq!(cfg.principal_header, "x-user-id");
        assert!(cfg.bootstrap_admin.is_none());
        assert_eq!(cfg.max_name_length, 200);
    }

    #[test]
    fn parses_storage_and_bootstrap_admin() {
        let cfg: AcademyConfig = serde_json::from_value(serde_json::json!({
            "storage": "memory",
            "bootstrap_admin": { "email": "owner@academy.test" }
        }))
        .unwrap();
        assert_eq!(cfg.storage, Some(StorageKind::Memory));
        let admin = cfg.bootstrap_admin.unwrap();
        assert_eq!(admin.email, "owner@academy.test");
        assert_eq!(admin.display_name, "Administrator");
    }

    #[test]
    fn rejects_unknown_keys() {
        let res: Result<AcademyConfig, _> =
            serde_json::from_value(serde_json::json!({ "storge": "memory" }));
        assert!(res.is_err());
    }
}
