//! Create/update/delete protocol for remote user accounts.

use mobsync_core::error::{MobSyncError, Result};
use mobsync_core::record::{bool_field, i64_field, id_of, str_field, Record, ID_FIELD};
use mobsync_core::saga::{SagaLog, SagaStep};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::MobEduClient;
use crate::session::{user_detail_path, USERS_PATH, USER_ACTIVATE_PATH};

const LOGIN_FIELD: &str = "login";
const ROLES_FIELD: &str = "roles";
const SCHOOL_ID_FIELD: &str = "schoolId";
const ACTIVE_FIELD: &str = "active";
const PASSWORD_FIELD: &str = "password";

/// Borrowed view of a [`MobEduClient`] that writes user accounts.
pub struct UserReconciler<'a> {
    client: &'a mut MobEduClient,
}

impl<'a> UserReconciler<'a> {
    pub(crate) fn new(client: &'a mut MobEduClient) -> Self {
        Self { client }
    }

    fn map(&self, record: &Record, fallback: Option<&Record>) -> Record {
        self.client.mappings.user.project(record, fallback)
    }

    /// Create the account for a directory record.
    ///
    /// Errors with [`MobSyncError::UserExists`] when the login is already
    /// cataloged or the server answers 409. Records marked inactive are not
    /// created but still report success.
    pub async fn create(&mut self, record: &Record, as_teacher: bool, skip_refresh: bool) -> Result<bool> {
        let mut user = self.map(record, None);
        let login = require_login(&user)?;

        if self.client.catalog.contains_login(&login) {
            return Err(MobSyncError::UserExists(login));
        }

        if !has_roles(&user) {
            let roles = self.client.profile.default_roles(as_teacher);
            user.insert(ROLES_FIELD.into(), json!(roles));
        }

        if is_inactive(&user) {
            info!(login = %login, "skipping inactive user");
            if !skip_refresh {
                self.client.refresh_users().await?;
            }
            return Ok(true);
        }

        let school_id = self.client.require_managed_school()?;
        user.insert(SCHOOL_ID_FIELD.into(), json!(school_id));

        match self.client.session.post_json(USERS_PATH, &Value::Object(user)).await {
            Ok(_) => info!(login = %login, as_teacher, "user created"),
            Err(MobSyncError::RequestFailed(failure)) if failure.status == StatusCode::CONFLICT => {
                return Err(MobSyncError::UserExists(login));
            }
            Err(MobSyncError::RequestFailed(failure)) => {
                warn!(login = %login, error = %failure, "user create failed");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        if !skip_refresh {
            self.client.refresh_users().await?;
        }
        Ok(true)
    }

    /// Push local changes onto an existing account.
    ///
    /// The remote detail is the fallback, so unmapped remote fields survive.
    /// A failed activation call after a successful PUT is operational.
    /// With `skip_refresh` the catalog is left for the caller to reload.
    pub async fn update(&mut self, record: &Record, skip_refresh: bool) -> Result<bool> {
        let local = self.map(record, None);
        let login = require_login(&local)?;
        let user_id = self.cataloged_id(&login)?;
        let school_id = self.client.require_managed_school()?;

        let detail: Option<Record> = self
            .client
            .session
            .get_json_or(&user_detail_path(user_id), None)
            .await?;
        let mut payload = self.map(record, detail.as_ref());
        if self.client.mappings.preserve_password {
            match detail.as_ref().and_then(|d| d.get(PASSWORD_FIELD)) {
                Some(remote) => {
                    payload.insert(PASSWORD_FIELD.into(), remote.clone());
                }
                None => {
                    payload.remove(PASSWORD_FIELD);
                }
            }
        }
        payload.insert(ID_FIELD.into(), json!(user_id));
        payload.insert(SCHOOL_ID_FIELD.into(), json!(school_id));

        match self.client.session.put_json(USERS_PATH, &Value::Object(payload)).await {
            Ok(_) => debug!(login = %login, user_id, "user detail updated"),
            Err(MobSyncError::RequestFailed(failure)) => {
                warn!(login = %login, error = %failure, "user update failed");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        let mut completed = SagaLog::default();
        completed.record(SagaStep::UserUpdated { user_id });

        if let Some(active) = bool_field(&local, ACTIVE_FIELD) {
            if self.client.profile.activation_endpoint {
                let body = json!({ "id": user_id, "activate": active });
                if let Err(e) = self.client.session.put_json(USER_ACTIVATE_PATH, &body).await {
                    return Err(MobSyncError::Operational {
                        operation: "user activation",
                        completed,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(login = %login, user_id, "user updated");
        if !skip_refresh {
            self.client.refresh_users().await?;
        }
        Ok(true)
    }

    /// Replace an account's password and nothing else.
    pub async fn set_password(&mut self, login: &str, password: &str) -> Result<bool> {
        let user_id = self.cataloged_id(login)?;
        let school_id = self.client.require_managed_school()?;

        let detail: Option<Record> = self
            .client
            .session
            .get_json_or(&user_detail_path(user_id), None)
            .await?;
        let mut payload = match detail {
            Some(detail) => detail,
            None => self
                .client
                .catalog
                .user_for_login(login)
                .and_then(|user| serde_json::to_value(user).ok())
                .and_then(|value| match value {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .unwrap_or_default(),
        };
        payload.insert(ID_FIELD.into(), json!(user_id));
        payload.insert(PASSWORD_FIELD.into(), json!(password));
        payload.insert(SCHOOL_ID_FIELD.into(), json!(school_id));

        match self.client.session.put_json(USERS_PATH, &Value::Object(payload)).await {
            Ok(_) => {
                info!(login, user_id, "password changed");
                Ok(true)
            }
            Err(MobSyncError::RequestFailed(failure)) => {
                warn!(login, error = %failure, "password change failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn delete(&mut self, record: &Record) -> Result<bool> {
        let login = require_login(&self.map(record, None))?;
        self.delete_login(&login).await
    }

    pub async fn delete_login(&mut self, login: &str) -> Result<bool> {
        let user_id = self.cataloged_id(login)?;

        match self.client.session.delete(&user_detail_path(user_id)).await {
            Ok(_) => info!(login, user_id, "user deleted"),
            Err(MobSyncError::RequestFailed(failure)) => {
                warn!(login, error = %failure, "user delete failed");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        self.client.refresh_users().await?;
        Ok(true)
    }

    /// Whether `create` would skip this record instead of posting it.
    pub fn is_inactive(&self, record: &Record) -> bool {
        is_inactive(&self.map(record, None))
    }

    /// Remote id of a directory record, from the catalog only.
    pub fn cached_id(&self, record: &Record) -> Option<i64> {
        let user = self.map(record, None);
        let login = str_field(&user, LOGIN_FIELD)?;
        self.client.catalog.user_for_login(login).map(|u| u.id)
    }

    /// Remote id of a directory record, asking the server when the catalog
    /// does not know it: first by mapped `id`, then by re-reading the user
    /// list and matching the login.
    pub async fn lookup(&mut self, record: &Record) -> Result<i64> {
        let user = self.map(record, None);

        if let Some(id) = i64_field(&user, ID_FIELD) {
            let detail: Value = self
                .client
                .session
                .get_json_or(&user_detail_path(id), Value::Null)
                .await?;
            if let Some(found) = id_of(&detail) {
                return Ok(found);
            }
        }

        let login = require_login(&user)?;
        self.client.refresh_users().await?;
        self.cataloged_id(&login)
    }

    fn cataloged_id(&self, login: &str) -> Result<i64> {
        self.client
            .catalog
            .user_for_login(login)
            .map(|u| u.id)
            .ok_or_else(|| MobSyncError::UserNotFound(login.to_string()))
    }
}

fn require_login(user: &Record) -> Result<String> {
    str_field(user, LOGIN_FIELD)
        .filter(|login| !login.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MobSyncError::InvalidArgument("user record maps to no login".into()))
}

fn is_inactive(user: &Record) -> bool {
    bool_field(user, ACTIVE_FIELD) == Some(false)
}

fn has_roles(user: &Record) -> bool {
    match user.get(ROLES_FIELD) {
        Some(Value::Array(roles)) => !roles.is_empty(),
        Some(Value::String(role)) => !role.is_empty(),
        _ => false,
    }
}
