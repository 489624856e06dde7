//! Protocols for the linked class + group pair and group membership.
//!
//! A class and its group are separate remote entities written with separate
//! calls. Once the first write of a pair has landed, every later failure is
//! reported as [`MobSyncError::Operational`] with the steps already done.

use std::fmt;

use mobsync_core::error::{MobSyncError, Result};
use mobsync_core::record::{i64_field, id_of, str_field, Record, ID_FIELD};
use mobsync_core::saga::{SagaLog, SagaStep};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::client::MobEduClient;
use crate::models::{RemoteClass, RemoteGroup};
use crate::session::{class_detail_path, group_detail_path, CLASSES_PATH, GROUPS_PATH};

/// `Error_code` value the server sends when a class already exists.
pub const DUPLICATE_CLASS_CODE: &str = "2500";

const SCHOOL_FIELD: &str = "school";
const SCHOOL_NAME_FIELD: &str = "schoolName";
const USER_GROUP_FIELD: &str = "userGroup";
const LEARNING_CLASS_FIELD: &str = "learningClassId";

fn operational(operation: &'static str, completed: &SagaLog, reason: impl fmt::Display) -> MobSyncError {
    MobSyncError::Operational {
        operation,
        completed: completed.clone(),
        reason: reason.to_string(),
    }
}

/// Borrowed view of a [`MobEduClient`] that writes classes and groups.
pub struct ClassGroupReconciler<'a> {
    client: &'a mut MobEduClient,
}

impl<'a> ClassGroupReconciler<'a> {
    pub(crate) fn new(client: &'a mut MobEduClient) -> Self {
        Self { client }
    }

    /// Remote id of a class record: its mapped `id`, else the single cached
    /// class matching `(parallel, letter)` and `schoolName` when mapped.
    pub fn resolve_id(&self, record: &Record) -> Result<i64> {
        let class = self.client.mappings.class.project(record, None);
        if let Some(id) = i64_field(&class, ID_FIELD) {
            return Ok(id);
        }
        let parallel = i64_field(&class, "parallel").ok_or_else(|| {
            MobSyncError::InvalidArgument("class record maps to no parallel".into())
        })?;
        let letter = str_field(&class, "letter").ok_or_else(|| {
            MobSyncError::InvalidArgument("class record maps to no letter".into())
        })?;
        self.client
            .catalog
            .resolve_class(parallel, letter, str_field(&class, SCHOOL_NAME_FIELD))
    }

    async fn class_detail(&self, class_id: i64) -> Result<Option<Record>> {
        self.client
            .session
            .get_json_or(&class_detail_path(class_id), None)
            .await
    }

    /// Group id linked from the class detail, else from the cached class.
    fn linked_group_id(&self, class_id: i64, detail: Option<&Record>) -> Option<i64> {
        detail
            .and_then(|d| d.get(USER_GROUP_FIELD))
            .and_then(id_of)
            .or_else(|| {
                self.client
                    .catalog
                    .class(class_id)
                    .and_then(RemoteClass::group_id)
            })
    }

    async fn refresh_after_write(&mut self) {
        if let Err(e) = self.client.refresh_classes().await {
            warn!(error = %e, "class catalog refresh failed after write");
        }
    }

    /// Create a class and then its group.
    ///
    /// A duplicate class (vendor code 2500) is [`MobSyncError::ClassExists`];
    /// any other class failure is `Ok(false)`. Once the class exists, failing
    /// to learn its id or to create the group is operational.
    pub async fn create(&mut self, record: &Record) -> Result<bool> {
        self.client.require_managed_school()?;
        let mut class = self.client.mappings.class.project(record, None);
        let name = str_field(&class, "name").unwrap_or_default().to_string();
        class.insert(SCHOOL_FIELD.into(), self.client.managed_school_detail());

        let response = match self.client.session.post_json(CLASSES_PATH, &Value::Object(class)).await {
            Ok(response) => response,
            Err(MobSyncError::RequestFailed(failure))
                if failure.vendor_error_code() == Some(DUPLICATE_CLASS_CODE) =>
            {
                return Err(MobSyncError::ClassExists(name));
            }
            Err(MobSyncError::RequestFailed(failure)) => {
                warn!(class = %name, error = %failure, "class create failed");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let mut completed = SagaLog::default();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                completed.record(SagaStep::ClassCreated { class_id: None });
                return Err(operational("class create", &completed, e));
            }
        };
        let class_id = serde_json::from_str::<Value>(&body).ok().as_ref().and_then(id_of);
        completed.record(SagaStep::ClassCreated { class_id });
        let Some(class_id) = class_id else {
            return Err(operational(
                "class create",
                &completed,
                "create response carried no class id",
            ));
        };

        let mut group = self.client.mappings.group.project(record, None);
        group.insert(LEARNING_CLASS_FIELD.into(), json!(class_id));
        if let Err(e) = self.client.session.post_json(GROUPS_PATH, &Value::Object(group)).await {
            return Err(operational("class create", &completed, e));
        }
        completed.record(SagaStep::GroupCreated { class_id });

        info!(class = %name, class_id, "class and group created");
        self.refresh_after_write().await;
        Ok(true)
    }

    /// Update a class and rebuild its group from the same record.
    pub async fn update(&mut self, record: &Record) -> Result<bool> {
        let class_id = self.resolve_id(record)?;
        self.client.require_managed_school()?;
        let detail = self.class_detail(class_id).await?;

        let mut class = self.client.mappings.class.project(record, detail.as_ref());
        class.insert(ID_FIELD.into(), json!(class_id));
        class.insert(SCHOOL_FIELD.into(), self.client.managed_school_detail());

        match self.client.session.put_json(CLASSES_PATH, &Value::Object(class)).await {
            Ok(_) => debug!(class_id, "class updated"),
            Err(MobSyncError::RequestFailed(failure)) => {
                warn!(class_id, error = %failure, "class update failed");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
        let mut completed = SagaLog::default();
        completed.record(SagaStep::ClassUpdated { class_id });

        let Some(group_id) = self.linked_group_id(class_id, detail.as_ref()) else {
            return Err(operational("class update", &completed, "class has no linked group"));
        };

        let old_group = self
            .client
            .session
            .get_json_or::<Option<Record>>(&group_detail_path(group_id), None)
            .await
            .map_err(|e| operational("class update", &completed, e))?;
        let mut group = self.client.mappings.group.project(record, old_group.as_ref());
        group.insert(ID_FIELD.into(), json!(group_id));
        group.insert(LEARNING_CLASS_FIELD.into(), json!(class_id));
        if let Err(e) = self.client.session.put_json(GROUPS_PATH, &Value::Object(group)).await {
            return Err(operational("class update", &completed, e));
        }
        completed.record(SagaStep::GroupUpdated { group_id });

        info!(class_id, group_id, "class and group updated");
        self.refresh_after_write().await;
        Ok(true)
    }

    /// Delete a class and then its group. A class without a linked group
    /// is deleted alone with a warning.
    pub async fn delete(&mut self, record: &Record) -> Result<bool> {
        let class_id = self.resolve_id(record)?;
        let detail = self.class_detail(class_id).await?;
        let group_id = self.linked_group_id(class_id, detail.as_ref());

        match self.client.session.delete(&class_detail_path(class_id)).await {
            Ok(_) => debug!(class_id, "class deleted"),
            Err(MobSyncError::RequestFailed(failure)) => {
                warn!(class_id, error = %failure, "class delete failed");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
        let mut completed = SagaLog::default();
        completed.record(SagaStep::ClassDeleted { class_id });

        match group_id {
            Some(group_id) => {
                if let Err(e) = self.client.session.delete(&group_detail_path(group_id)).await {
                    return Err(operational("class delete", &completed, e));
                }
                completed.record(SagaStep::GroupDeleted { group_id });
                info!(class_id, group_id, "class and group deleted");
            }
            None => warn!(class_id, "deleted class had no linked group"),
        }

        self.refresh_after_write().await;
        Ok(true)
    }

    /// The group linked to a class, with membership as a flat `userIds` list.
    pub async fn get_group(&self, record: &Record) -> Result<RemoteGroup> {
        let class_id = self.resolve_id(record)?;
        let detail = self
            .class_detail(class_id)
            .await?
            .ok_or_else(|| MobSyncError::ClassNotFound(class_id.to_string()))?;
        let group_id = self
            .linked_group_id(class_id, Some(&detail))
            .ok_or_else(|| MobSyncError::GroupNotFound(format!("class {class_id}")))?;

        let mut group: RemoteGroup = self
            .client
            .session
            .get_json_or::<Option<RemoteGroup>>(&group_detail_path(group_id), None)
            .await?
            .ok_or_else(|| MobSyncError::GroupNotFound(format!("group {group_id} of class {class_id}")))?;

        group.normalize_members();
        group.id.get_or_insert(group_id);
        group.learning_class_id.get_or_insert(class_id);
        Ok(group)
    }

    /// Replace the membership of a class's group. Duplicate ids are dropped.
    pub async fn set_members(&mut self, record: &Record, user_ids: Vec<i64>) -> Result<()> {
        let mut group = self.get_group(record).await?;
        let mut unique = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        group.set_member_ids(unique);
        self.put_group(&group).await
    }

    /// Add one member. Returns `false` without writing when already present.
    pub async fn add_member(&mut self, record: &Record, user_id: i64) -> Result<bool> {
        let mut group = self.get_group(record).await?;
        let mut ids = group.member_ids().to_vec();
        if ids.contains(&user_id) {
            debug!(user_id, "already a member");
            return Ok(false);
        }
        ids.push(user_id);
        group.set_member_ids(ids);
        self.put_group(&group).await?;
        Ok(true)
    }

    /// Remove one member. Returns `false` without writing when absent.
    pub async fn remove_member(&mut self, record: &Record, user_id: i64) -> Result<bool> {
        let mut group = self.get_group(record).await?;
        let ids = group.member_ids().to_vec();
        if !ids.contains(&user_id) {
            debug!(user_id, "not a member");
            return Ok(false);
        }
        group.set_member_ids(ids.into_iter().filter(|id| *id != user_id).collect());
        self.put_group(&group).await?;
        Ok(true)
    }

    /// Membership writes are never dropped: any failure is operational.
    async fn put_group(&self, group: &RemoteGroup) -> Result<()> {
        let completed = SagaLog::default();
        let body = serde_json::to_value(group)
            .map_err(|e| MobSyncError::Serialization(e.to_string()))?;
        self.client
            .session
            .put_json(GROUPS_PATH, &body)
            .await
            .map_err(|e| operational("group membership update", &completed, e))?;
        info!(
            group_id = group.id,
            members = group.member_ids().len(),
            "group membership written"
        );
        Ok(())
    }
}
