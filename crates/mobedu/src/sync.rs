//! Bulk one-way import from a directory source into MobEdu.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mobsync_core::directory::DirectorySource;
use mobsync_core::error::{MobSyncError, Result};
use mobsync_core::record::{is_teacher, Record};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::client::MobEduClient;

/// Summary of an import run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub users_created: usize,
    pub users_updated: usize,
    /// Inactive records that were deliberately not created.
    #[serde(default)]
    pub users_skipped: usize,
    pub users_failed: usize,
    pub classes_created: usize,
    pub classes_updated: usize,
    pub classes_failed: usize,
    pub members_assigned: usize,
    pub members_unresolved: usize,
    /// Partially applied multi-step writes that need manual repair.
    pub operational_failures: Vec<String>,
}

impl ImportReport {
    fn start(source: &str) -> Self {
        Self {
            source: source.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            users_created: 0,
            users_updated: 0,
            users_skipped: 0,
            users_failed: 0,
            classes_created: 0,
            classes_updated: 0,
            classes_failed: 0,
            members_assigned: 0,
            members_unresolved: 0,
            operational_failures: Vec::new(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.users_failed > 0 || self.classes_failed > 0 || !self.operational_failures.is_empty()
    }
}

/// Member key to remote id, `None` once a member failed to resolve.
type MemberIds = HashMap<String, Option<i64>>;

enum Entity {
    User,
    Class,
}

/// Drives one pass over a [`DirectorySource`]: users first, then classes and
/// their membership. A failing entity is reported and skipped; the pass
/// only aborts when the directory itself or a catalog refresh fails.
pub struct Importer<D: DirectorySource> {
    source: D,
}

impl<D: DirectorySource> Importer<D> {
    pub fn new(source: D) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    pub async fn run(&self, client: &mut MobEduClient) -> Result<ImportReport> {
        let mut report = ImportReport::start(self.source.source_name());

        let users = self.source.users().await?;
        let classes = self.source.classes().await?;
        info!(
            source = %report.source,
            users = users.len(),
            classes = classes.len(),
            "starting import"
        );

        for user in &users {
            self.import_user(client, user, &mut report).await;
        }
        client.refresh_users().await?;

        let by_key: HashMap<String, &Record> = users
            .iter()
            .filter_map(|user| self.source.user_key(user).map(|key| (key, user)))
            .collect();
        let mut resolved = MemberIds::new();

        for class in &classes {
            self.import_class(client, class, &by_key, &mut resolved, &mut report)
                .await;
        }

        report.finished_at = Some(Utc::now());
        info!(
            users_created = report.users_created,
            users_updated = report.users_updated,
            users_skipped = report.users_skipped,
            users_failed = report.users_failed,
            classes_created = report.classes_created,
            classes_updated = report.classes_updated,
            classes_failed = report.classes_failed,
            members_assigned = report.members_assigned,
            members_unresolved = report.members_unresolved,
            operational_failures = report.operational_failures.len(),
            "import completed"
        );
        Ok(report)
    }

    async fn import_user(&self, client: &mut MobEduClient, user: &Record, report: &mut ImportReport) {
        let key = self.source.user_key(user).unwrap_or_default();
        let inactive = client.users().is_inactive(user);
        let created = client.users().create(user, is_teacher(user), true).await;
        let outcome = match created {
            Ok(true) if inactive => {
                report.users_skipped += 1;
                return;
            }
            Ok(true) => {
                report.users_created += 1;
                return;
            }
            Err(MobSyncError::UserExists(_)) => client.users().update(user, true).await,
            other => other,
        };
        match outcome {
            Ok(true) => report.users_updated += 1,
            Ok(false) => {
                warn!(user = %key, "user was not written");
                report.users_failed += 1;
            }
            Err(e) => record_failure(report, Entity::User, &key, e),
        }
    }

    async fn import_class(
        &self,
        client: &mut MobEduClient,
        class: &Record,
        by_key: &HashMap<String, &Record>,
        resolved: &mut MemberIds,
        report: &mut ImportReport,
    ) {
        let key = self.source.class_key(class).unwrap_or_default();
        let created = client.classes().create(class).await;
        let outcome = match created {
            Err(MobSyncError::ClassExists(_)) => {
                let updated = client.classes().update(class).await;
                updated.map(|written| (written, false))
            }
            other => other.map(|written| (written, true)),
        };
        match outcome {
            Ok((true, true)) => report.classes_created += 1,
            Ok((true, false)) => report.classes_updated += 1,
            Ok((false, _)) => {
                warn!(class = %key, "class was not written");
                report.classes_failed += 1;
                return;
            }
            Err(e) => {
                record_failure(report, Entity::Class, &key, e);
                return;
            }
        }

        let member_ids = self
            .resolve_members(client, class, by_key, resolved, report)
            .await;
        let count = member_ids.len();
        let written = client.classes().set_members(class, member_ids).await;
        match written {
            Ok(()) => {
                debug!(class = %key, members = count, "membership set");
                report.members_assigned += count;
            }
            Err(e) => record_failure(report, Entity::Class, &key, e),
        }
    }

    /// Remote ids of a class's members: from the catalog, else by asking the
    /// server. Members that resolve neither way are dropped with a warning.
    /// Outcomes are kept in `resolved` so a member shared by several classes
    /// is looked up once per run.
    async fn resolve_members(
        &self,
        client: &mut MobEduClient,
        class: &Record,
        by_key: &HashMap<String, &Record>,
        resolved: &mut MemberIds,
        report: &mut ImportReport,
    ) -> Vec<i64> {
        let mut ids = Vec::new();
        for member in self.source.class_member_keys(class) {
            let id = match resolved.get(&member) {
                Some(known) => *known,
                None => {
                    let id = self.resolve_member(client, &member, by_key).await;
                    resolved.insert(member, id);
                    id
                }
            };
            match id {
                Some(id) => ids.push(id),
                None => report.members_unresolved += 1,
            }
        }
        ids
    }

    async fn resolve_member(
        &self,
        client: &mut MobEduClient,
        member: &str,
        by_key: &HashMap<String, &Record>,
    ) -> Option<i64> {
        let Some(user) = by_key.get(member) else {
            warn!(member, "class member is not a known directory user");
            return None;
        };
        if let Some(id) = client.users().cached_id(user) {
            return Some(id);
        }
        let looked_up = client.users().lookup(user).await;
        match looked_up {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(member, error = %e, "class member has no remote account");
                None
            }
        }
    }
}

fn record_failure(report: &mut ImportReport, entity: Entity, key: &str, e: MobSyncError) {
    if e.is_operational() {
        error!(entity = key, error = %e, "remote state left inconsistent");
        report.operational_failures.push(format!("{key}: {e}"));
    } else {
        warn!(entity = key, error = %e, "import failed");
    }
    match entity {
        Entity::User => report.users_failed += 1,
        Entity::Class => report.classes_failed += 1,
    }
}
