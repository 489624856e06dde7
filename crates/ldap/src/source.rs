//! [`DirectorySource`] over an LDAP tree.

use async_trait::async_trait;
use mobsync_core::config::LdapConfig;
use mobsync_core::directory::DirectorySource;
use mobsync_core::error::Result;
use mobsync_core::password::{generate_placeholder_password, PLACEHOLDER_PASSWORD_LENGTH};
use mobsync_core::record::{str_field, Record, IS_TEACHER_FIELD};
use serde_json::{json, Value};
use tracing::info;

use crate::client::{DirectoryEntry, LdapClient};

pub const DN_FIELD: &str = "dn";
pub const ORIGINAL_FIELD: &str = "original";
const MEMBER_ATTR: &str = "member";

/// People are `inetOrgPerson` entries, classes are `groupOfNames` entries
/// whose `member` values are people DNs (with the default filters).
pub struct LdapDirectory {
    client: LdapClient,
    bases: Vec<String>,
    user_filter: String,
    class_filter: String,
    teacher_attribute: Option<String>,
}

impl LdapDirectory {
    pub fn new(config: &LdapConfig) -> Self {
        Self {
            client: LdapClient::new(config),
            bases: config.bases.clone(),
            user_filter: config.user_filter.clone(),
            class_filter: config.class_filter.clone(),
            teacher_attribute: config.teacher_attribute.clone(),
        }
    }

    pub fn client(&self) -> &LdapClient {
        &self.client
    }
}

#[async_trait]
impl DirectorySource for LdapDirectory {
    async fn users(&self) -> Result<Vec<Record>> {
        let entries = self.client.search(&self.bases, &self.user_filter).await?;
        info!(count = entries.len(), "directory users loaded");
        Ok(entries
            .iter()
            .map(|entry| user_record(entry, self.teacher_attribute.as_deref()))
            .collect())
    }

    async fn classes(&self) -> Result<Vec<Record>> {
        let entries = self.client.search(&self.bases, &self.class_filter).await?;
        info!(count = entries.len(), "directory classes loaded");
        Ok(entries.iter().map(entry_record).collect())
    }

    fn user_key(&self, user: &Record) -> Option<String> {
        str_field(user, DN_FIELD).map(str::to_string)
    }

    fn class_key(&self, class: &Record) -> Option<String> {
        str_field(class, DN_FIELD).map(str::to_string)
    }

    fn class_member_keys(&self, class: &Record) -> Vec<String> {
        class
            .get(ORIGINAL_FIELD)
            .and_then(|original| original.get("attributes"))
            .and_then(|attrs| attrs.get(MEMBER_ATTR))
            .and_then(Value::as_array)
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| m.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn source_name(&self) -> &str {
        self.client.server()
    }
}

/// Flatten an entry: every attribute becomes its values joined with `", "`,
/// the raw entry goes under `original` and the DN under `dn`.
pub fn entry_record(entry: &DirectoryEntry) -> Record {
    let mut record = Record::new();
    record.insert(
        ORIGINAL_FIELD.into(),
        json!({ "dn": entry.dn, "attributes": entry.attrs }),
    );
    for (name, values) in &entry.attrs {
        record.insert(name.clone(), Value::String(values.join(", ")));
    }
    record.insert(DN_FIELD.into(), Value::String(entry.dn.clone()));
    record
}

/// [`entry_record`] plus a placeholder password and the teacher flag.
pub fn user_record(entry: &DirectoryEntry, teacher_attribute: Option<&str>) -> Record {
    let mut record = entry_record(entry);
    record.insert(
        "password".into(),
        Value::String(generate_placeholder_password(PLACEHOLDER_PASSWORD_LENGTH)),
    );
    let teacher = teacher_attribute.is_some_and(|attr| is_truthy(str_field(&record, attr)));
    record.insert(IS_TEACHER_FIELD.into(), Value::Bool(teacher));
    record
}

/// A flattened attribute marks a teacher when it is non-empty and not an
/// explicit false value.
fn is_truthy(value: Option<&str>) -> bool {
    match value.map(str::trim) {
        None | Some("") => false,
        Some(v) => !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "no"),
    }
}
