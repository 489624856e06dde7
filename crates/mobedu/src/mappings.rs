//! Default mapping tables from directory records to MobEdu entities.

use mobsync_core::config::FieldOverride;
use mobsync_core::mapping::FieldMapping;
use mobsync_core::record::{str_field, Record};
use serde_json::Value;

/// Directory attribute holding a class label such as `"10 B (2024)"`.
pub const DIVISION_NAME_ATTR: &str = "eline-division-name";

/// The three tables the reconcilers project through.
#[derive(Debug, Clone)]
pub struct MappingTables {
    pub user: FieldMapping,
    pub class: FieldMapping,
    pub group: FieldMapping,
    /// Keep the remote password on user updates instead of sending the
    /// directory's placeholder.
    pub preserve_password: bool,
}

impl Default for MappingTables {
    fn default() -> Self {
        Self {
            user: default_user_mapping(),
            class: default_class_mapping(),
            group: default_group_mapping(),
            preserve_password: false,
        }
    }
}

impl MappingTables {
    /// Append configured copy mappings to the user table. They come last, so
    /// they win over the built-in pairs for the same target.
    pub fn with_user_overrides(mut self, overrides: &[FieldOverride]) -> Self {
        for entry in overrides {
            self.user = self.user.copy(entry.target.as_str(), entry.source.as_str());
        }
        self
    }
}

/// Directory user attributes onto a remote account.
///
/// `password` is copied as is. Directory records carry a fresh placeholder on
/// every read, so an update overwrites whatever password the user set unless
/// [`MappingTables::preserve_password`] is on.
pub fn default_user_mapping() -> FieldMapping {
    FieldMapping::new()
        .copy("firstName", "givenName")
        .copy("lastName", "sn")
        .copy("middleName", "secondName")
        .copy("email", "cms-email")
        .copy("login", "cn")
        .copy("password", "password")
        .copy("roles", "roles")
        .copy("schoolId", "schoolId")
        .copy("active", "active")
        .copy("id", "id")
}

pub fn default_class_mapping() -> FieldMapping {
    FieldMapping::new()
        .derive("name", class_name)
        .derive("parallel", class_parallel)
        .derive("letter", class_letter)
        .copy("id", "id")
}

/// Group payloads carry the class name only; ids are wired in by the reconciler.
pub fn default_group_mapping() -> FieldMapping {
    FieldMapping::new().derive("name", class_name)
}

fn division_tokens(record: &Record) -> Option<Vec<&str>> {
    str_field(record, DIVISION_NAME_ATTR).map(|name| name.split(' ').collect())
}

/// `"10 B (2024)"` -> `"10 B"`.
pub fn class_name(record: &Record) -> Value {
    match division_tokens(record) {
        Some(tokens) => Value::String(tokens.iter().take(2).copied().collect::<Vec<_>>().join(" ")),
        None => Value::Null,
    }
}

/// `"10 B (2024)"` -> `10`.
pub fn class_parallel(record: &Record) -> Value {
    division_tokens(record)
        .and_then(|tokens| tokens.first().and_then(|t| t.parse::<i64>().ok()))
        .map_or(Value::Null, Value::from)
}

/// `"10 B (2024)"` -> `"B"`.
pub fn class_letter(record: &Record) -> Value {
    division_tokens(record)
        .and_then(|tokens| tokens.get(1).map(|t| Value::String((*t).to_string())))
        .unwrap_or(Value::Null)
}
