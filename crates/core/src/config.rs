//! TOML-based configuration system for mobsync.

use crate::error::{MobSyncError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobSyncConfig {
    pub remote: RemoteConfig,
    #[serde(default)]
    pub ldap: LdapConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
}

/// Connection and protocol settings for the remote school platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// School to manage when the account administers more than one.
    #[serde(default)]
    pub managed_school: Option<i64>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Whether list endpoints are paged (`page=N`) or return everything at once.
    #[serde(default = "default_true")]
    pub paginated: bool,
    /// Whether `PUT /adm/users/activate` exists on this deployment.
    #[serde(default = "default_true")]
    pub activation_endpoint: bool,
    #[serde(default = "default_teacher_roles")]
    pub teacher_roles: Vec<String>,
    #[serde(default = "default_student_roles")]
    pub student_roles: Vec<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mobedu.example.org".into(),
            username: "admin".into(),
            password: String::new(),
            managed_school: None,
            page_size: default_page_size(),
            paginated: true,
            activation_endpoint: true,
            teacher_roles: default_teacher_roles(),
            student_roles: default_student_roles(),
        }
    }
}

fn default_page_size() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_teacher_roles() -> Vec<String> {
    vec!["ROLE_TEACHER".into()]
}

fn default_student_roles() -> Vec<String> {
    vec!["ROLE_STUDENT".into()]
}

/// LDAP directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub bind_dn: String,
    #[serde(default)]
    pub bind_password: String,
    /// Search bases; every base is searched with subtree scope.
    #[serde(default)]
    pub bases: Vec<String>,
    #[serde(default = "default_user_filter")]
    pub user_filter: String,
    #[serde(default = "default_class_filter")]
    pub class_filter: String,
    /// Attribute whose truthy value marks a user as a teacher.
    #[serde(default)]
    pub teacher_attribute: Option<String>,
    #[serde(default = "default_true")]
    pub tls_verify: bool,
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server: String::new(),
            bind_dn: String::new(),
            bind_password: String::new(),
            bases: Vec::new(),
            user_filter: default_user_filter(),
            class_filter: default_class_filter(),
            teacher_attribute: None,
            tls_verify: true,
        }
    }
}

fn default_user_filter() -> String {
    "(objectClass=inetOrgPerson)".into()
}

fn default_class_filter() -> String {
    "(objectClass=groupOfNames)".into()
}

/// Extra copy mappings appended after the built-in user table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MappingConfig {
    /// Leave remote passwords untouched when updating existing users.
    #[serde(default)]
    pub preserve_password: bool,
    #[serde(default)]
    pub user: Vec<FieldOverride>,
}

/// A `source -> target` copy mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldOverride {
    pub target: String,
    pub source: String,
}

impl MobSyncConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| MobSyncError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Validate the configuration, returning an error for invalid combinations.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.remote.base_url.trim();
        if base_url.is_empty() {
            return Err(MobSyncError::Config(
                "remote.base_url must not be empty".into(),
            ));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(MobSyncError::Config(format!(
                "remote.base_url must be an http(s) URL: {base_url}"
            )));
        }
        if self.remote.username.is_empty() {
            return Err(MobSyncError::Config(
                "remote.username must not be empty".into(),
            ));
        }
        if self.remote.page_size == 0 {
            return Err(MobSyncError::Config(
                "remote.page_size must be greater than zero".into(),
            ));
        }
        if self.remote.teacher_roles.is_empty() || self.remote.student_roles.is_empty() {
            return Err(MobSyncError::Config(
                "remote.teacher_roles and remote.student_roles must not be empty".into(),
            ));
        }

        if self.ldap.enabled {
            if self.ldap.server.is_empty() {
                return Err(MobSyncError::Config(
                    "ldap.server is required when LDAP is enabled".into(),
                ));
            }
            if self.ldap.bases.is_empty() {
                return Err(MobSyncError::Config(
                    "ldap.bases must list at least one search base when LDAP is enabled".into(),
                ));
            }
        }

        for entry in &self.mapping.user {
            if entry.target.is_empty() || entry.source.is_empty() {
                return Err(MobSyncError::Config(
                    "mapping.user entries need both target and source".into(),
                ));
            }
        }

        Ok(())
    }

    /// Generate a sensible default configuration.
    pub fn generate_default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            ldap: LdapConfig::default(),
            mapping: MappingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_TOML: &str = r#"
[remote]
base_url = "https://mobedu.springfield.example"
username = "sync-admin"
password = "hunter2"
managed_school = 42
page_size = 50
activation_endpoint = false

[ldap]
enabled = true
server = "ldaps://ldap.springfield.example:636"
bind_dn = "cn=sync,dc=springfield,dc=example"
bind_password = "secret"
bases = ["ou=people,dc=springfield,dc=example", "ou=classes,dc=springfield,dc=example"]
teacher_attribute = "employeeType"

[mapping]
preserve_password = true

[[mapping.user]]
target = "email"
source = "mail"
"#;

    fn parse_sample() -> MobSyncConfig {
        toml::from_str(SAMPLE_TOML).expect("sample TOML should parse")
    }

    #[test]
    fn parse_full_config() {
        let cfg = parse_sample();
        assert_eq!(cfg.remote.base_url, "https://mobedu.springfield.example");
        assert_eq!(cfg.remote.username, "sync-admin");
        assert_eq!(cfg.remote.managed_school, Some(42));
        assert_eq!(cfg.remote.page_size, 50);
        assert!(cfg.remote.paginated);
        assert!(!cfg.remote.activation_endpoint);
        assert_eq!(cfg.remote.teacher_roles, vec!["ROLE_TEACHER".to_string()]);
        assert!(cfg.ldap.enabled);
        assert_eq!(cfg.ldap.bases.len(), 2);
        assert_eq!(cfg.ldap.user_filter, "(objectClass=inetOrgPerson)");
        assert_eq!(cfg.ldap.teacher_attribute.as_deref(), Some("employeeType"));
        assert!(cfg.ldap.tls_verify);
        assert_eq!(
            cfg.mapping.user,
            vec![FieldOverride {
                target: "email".into(),
                source: "mail".into()
            }]
        );
        assert!(cfg.mapping.preserve_password);
        cfg.validate().expect("sample config should be valid");
    }

    #[test]
    fn roundtrip_serialization() {
        let cfg = parse_sample();
        let serialized = toml::to_string(&cfg).expect("should serialize");
        let deserialized: MobSyncConfig =
            toml::from_str(&serialized).expect("should deserialize roundtrip");
        assert_eq!(deserialized.remote.base_url, cfg.remote.base_url);
        assert_eq!(deserialized.ldap.bases, cfg.ldap.bases);
        assert_eq!(deserialized.mapping.user, cfg.mapping.user);
        assert!(deserialized.mapping.preserve_password);
    }

    #[test]
    fn generate_default_is_valid() {
        let cfg = MobSyncConfig::generate_default();
        cfg.validate().expect("default config should be valid");
    }

    #[test]
    fn minimal_config_parses() {
        let minimal = r#"
[remote]
base_url = "http://localhost:8080"
username = "admin"
"#;
        let cfg: MobSyncConfig = toml::from_str(minimal).expect("minimal config should parse");
        assert_eq!(cfg.remote.page_size, 100);
        assert!(cfg.remote.activation_endpoint);
        assert!(cfg.remote.password.is_empty());
        assert!(!cfg.ldap.enabled);
        assert!(cfg.mapping.user.is_empty());
        assert!(!cfg.mapping.preserve_password);
    }

    #[test]
    fn validate_requires_base_url() {
        let mut cfg = MobSyncConfig::generate_default();
        cfg.remote.base_url = String::new();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn validate_rejects_non_http_url() {
        let mut cfg = MobSyncConfig::generate_default();
        cfg.remote.base_url = "ftp://mobedu.example.org".into();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn validate_requires_username() {
        let mut cfg = MobSyncConfig::generate_default();
        cfg.remote.username = String::new();
        assert!(cfg.validate().unwrap_err().to_string().contains("username"));
    }

    #[test]
    fn validate_rejects_zero_page_size() {
        let mut cfg = MobSyncConfig::generate_default();
        cfg.remote.page_size = 0;
        assert!(cfg.validate().unwrap_err().to_string().contains("page_size"));
    }

    #[test]
    fn validate_ldap_requires_server_and_bases() {
        let mut cfg = MobSyncConfig::generate_default();
        cfg.ldap.enabled = true;
        assert!(cfg.validate().unwrap_err().to_string().contains("ldap.server"));
        cfg.ldap.server = "ldap://localhost".into();
        assert!(cfg.validate().unwrap_err().to_string().contains("ldap.bases"));
        cfg.ldap.bases = vec!["dc=example".into()];
        cfg.validate().expect("ldap config should now be valid");
    }

    #[test]
    fn validate_ldap_disabled_no_validation() {
        let mut cfg = MobSyncConfig::generate_default();
        cfg.ldap.enabled = false;
        cfg.ldap.server = String::new();
        cfg.validate().expect("disabled ldap needs no server");
    }

    #[test]
    fn validate_rejects_empty_mapping_override() {
        let mut cfg = MobSyncConfig::generate_default();
        cfg.mapping.user.push(FieldOverride {
            target: "email".into(),
            source: String::new(),
        });
        assert!(cfg.validate().unwrap_err().to_string().contains("mapping.user"));
    }

    #[test]
    fn load_from_file() {
        let dir = std::env::temp_dir().join("mobsync_test_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("mobsync.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SAMPLE_TOML.as_bytes()).unwrap();

        let cfg = MobSyncConfig::load(&path).expect("should load from file");
        assert_eq!(cfg.remote.username, "sync-admin");

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }

    #[test]
    fn load_nonexistent_file_returns_io_error() {
        let result = MobSyncConfig::load(Path::new("/nonexistent/mobsync.toml"));
        assert!(matches!(result, Err(MobSyncError::Io(_))));
    }

    #[test]
    fn load_invalid_toml_returns_config_error() {
        let dir = std::env::temp_dir().join("mobsync_test_bad_toml");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "this is [[[not valid toml").unwrap();

        let result = MobSyncConfig::load(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("config"));

        std::fs::remove_file(&path).ok();
        std::fs::remove_dir(&dir).ok();
    }
}
