//! MobEdu API request/response structs.
//!
//! Only the fields this crate reads are typed. Everything else the server
//! sends is kept in `extra` so a read-modify-write cycle does not drop it.

use mobsync_core::record::{id_of, Record};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user account as listed by `/adm/users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    pub id: i64,
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// A learning class as listed by `/adm/classes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteClass {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_name: Option<String>,
    /// Link to the class's group: a bare id or an object with `id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_group: Option<Value>,
}

impl RemoteClass {
    /// School name from either the flat `schoolName` or the nested `school.name`.
    pub fn school_name(&self) -> Option<&str> {
        self.school_name.as_deref().or_else(|| {
            self.school
                .as_ref()
                .and_then(|s| s.get("name"))
                .and_then(Value::as_str)
        })
    }

    pub fn group_id(&self) -> Option<i64> {
        self.user_group.as_ref().and_then(id_of)
    }

    /// Natural-key match on `(parallel, letter)` and, when given, school name.
    pub fn matches(&self, parallel: i64, letter: &str, school_name: Option<&str>) -> bool {
        if self.parallel != Some(parallel) {
            return false;
        }
        if !self
            .letter
            .as_deref()
            .is_some_and(|l| l.eq_ignore_ascii_case(letter))
        {
            return false;
        }
        match school_name {
            Some(wanted) => self.school_name() == Some(wanted),
            None => true,
        }
    }
}

/// A school from `/adm/schools`. Read-only reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSchool {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Record,
}

/// A user group. `userIds` is the authoritative membership list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tutor_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_class_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<i64>>,
    /// Some deployments return nested user objects instead of `userIds`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Record,
}

impl RemoteGroup {
    /// Collapse nested `users` into the flat `userIds` list.
    pub fn normalize_members(&mut self) {
        if let Some(users) = self.users.take() {
            if self.user_ids.as_ref().map_or(true, Vec::is_empty) {
                self.user_ids = Some(users.iter().filter_map(id_of).collect());
            }
        }
        if self.user_ids.is_none() {
            self.user_ids = Some(Vec::new());
        }
    }

    pub fn member_ids(&self) -> &[i64] {
        self.user_ids.as_deref().unwrap_or(&[])
    }

    pub fn set_member_ids(&mut self, ids: Vec<i64>) {
        self.users = None;
        self.user_ids = Some(ids);
    }
}

/// Payload of `GET /api/account`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(
        rename = "additionalUserInfoDTO",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_user_info: Option<AdditionalUserInfo>,
    #[serde(flatten)]
    pub extra: Record,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalUserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_schools: Option<Vec<Value>>,
}

impl Account {
    /// Ids of the schools this account administers.
    pub fn admin_school_ids(&self) -> Vec<i64> {
        self.additional_user_info
            .as_ref()
            .and_then(|info| info.admin_schools.as_ref())
            .map(|schools| schools.iter().filter_map(id_of).collect())
            .unwrap_or_default()
    }
}
