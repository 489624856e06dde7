//! The directory collaborator that produces source records.

use async_trait::async_trait;

use crate::error::Result;
use crate::record::Record;

/// A producer of user and class records, e.g. an LDAP tree.
///
/// User records must carry the attributes the user mapping table reads plus
/// the boolean [`crate::record::IS_TEACHER_FIELD`].
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn users(&self) -> Result<Vec<Record>>;

    async fn classes(&self) -> Result<Vec<Record>>;

    /// Stable key of a user record, used to resolve class membership.
    fn user_key(&self, user: &Record) -> Option<String>;

    fn class_key(&self, class: &Record) -> Option<String>;

    /// Keys of the users that belong to a class.
    fn class_member_keys(&self, class: &Record) -> Vec<String>;

    fn source_name(&self) -> &str;
}
