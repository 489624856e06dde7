//! Local mirror of the remote user, class and school collections.
//!
//! The catalog goes stale after every mutating call. Reconcilers call the
//! matching `refresh_*` method once their writes have landed.

use mobsync_core::error::{MobSyncError, Result};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::models::{RemoteClass, RemoteSchool, RemoteUser};
use crate::profile::ApiProfile;
use crate::session::{Session, CLASS_LIST_PATH, SCHOOLS_PATH, USERS_PATH};

/// The user list hides disabled and not-yet-activated accounts unless asked.
const USER_LIST_FILTERS: &[(&str, &str)] = &[("disabled", "True"), ("activated", "True")];

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    users: Vec<RemoteUser>,
    classes: Vec<RemoteClass>,
    schools: Vec<RemoteSchool>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already decoded collections.
    pub fn with_entries(
        users: Vec<RemoteUser>,
        classes: Vec<RemoteClass>,
        schools: Vec<RemoteSchool>,
    ) -> Self {
        Self {
            users,
            classes,
            schools,
        }
    }

    pub async fn refresh_users(&mut self, session: &Session, profile: &ApiProfile) -> Result<()> {
        let raw = session
            .fetch_list(USERS_PATH, USER_LIST_FILTERS, profile)
            .await?;
        self.users = decode_entries(raw, "user");
        info!(count = self.users.len(), "user catalog refreshed");
        Ok(())
    }

    pub async fn refresh_classes(&mut self, session: &Session, profile: &ApiProfile) -> Result<()> {
        let raw = session.fetch_list(CLASS_LIST_PATH, &[], profile).await?;
        self.classes = decode_entries(raw, "class");
        info!(count = self.classes.len(), "class catalog refreshed");
        Ok(())
    }

    /// Schools are never paged.
    pub async fn refresh_schools(&mut self, session: &Session) -> Result<()> {
        let raw: Vec<Value> = session.get_json_or(SCHOOLS_PATH, Vec::new()).await?;
        self.schools = decode_entries(raw, "school");
        info!(count = self.schools.len(), "school catalog refreshed");
        Ok(())
    }

    pub async fn refresh_all(&mut self, session: &Session, profile: &ApiProfile) -> Result<()> {
        self.refresh_users(session, profile).await?;
        self.refresh_classes(session, profile).await?;
        self.refresh_schools(session).await
    }

    pub fn users(&self) -> &[RemoteUser] {
        &self.users
    }

    pub fn classes(&self) -> &[RemoteClass] {
        &self.classes
    }

    pub fn schools(&self) -> &[RemoteSchool] {
        &self.schools
    }

    pub fn contains_login(&self, login: &str) -> bool {
        self.user_for_login(login).is_some()
    }

    pub fn user_for_login(&self, login: &str) -> Option<&RemoteUser> {
        self.users.iter().find(|u| u.login == login)
    }

    pub fn class(&self, id: i64) -> Option<&RemoteClass> {
        self.classes.iter().find(|c| c.id == id)
    }

    pub fn school(&self, id: i64) -> Option<&RemoteSchool> {
        self.schools.iter().find(|s| s.id == id)
    }

    pub fn find_classes(
        &self,
        parallel: i64,
        letter: &str,
        school_name: Option<&str>,
    ) -> Vec<&RemoteClass> {
        self.classes
            .iter()
            .filter(|c| c.matches(parallel, letter, school_name))
            .collect()
    }

    /// Resolve a class id from its natural key. Exactly one cached class
    /// must match.
    pub fn resolve_class(
        &self,
        parallel: i64,
        letter: &str,
        school_name: Option<&str>,
    ) -> Result<i64> {
        let label = match school_name {
            Some(school) => format!("{parallel} {letter} ({school})"),
            None => format!("{parallel} {letter}"),
        };
        match self.find_classes(parallel, letter, school_name).as_slice() {
            [class] => Ok(class.id),
            [] => Err(MobSyncError::ClassNotFound(label)),
            many => Err(MobSyncError::InvalidArgument(format!(
                "class {label} is ambiguous: {} cached classes match",
                many.len()
            ))),
        }
    }

    /// Full school object for class payloads, `{}` when the id is unknown.
    pub fn school_detail(&self, id: Option<i64>) -> Value {
        id.and_then(|id| self.school(id))
            .and_then(|school| serde_json::to_value(school).ok())
            .unwrap_or_else(|| json!({}))
    }
}

/// Decode list entries one at a time so a single odd entry does not hide
/// the rest of the collection.
fn decode_entries<T: DeserializeOwned>(raw: Vec<Value>, kind: &str) -> Vec<T> {
    raw.into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!(kind, error = %e, "skipping undecodable catalog entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mount_list;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn class(id: i64, parallel: i64, letter: &str, school: &str) -> RemoteClass {
        serde_json::from_value(json!({
            "id": id, "parallel": parallel, "letter": letter, "schoolName": school
        }))
        .unwrap()
    }

    fn school(id: i64, name: &str) -> RemoteSchool {
        serde_json::from_value(json!({"id": id, "name": name})).unwrap()
    }

    #[test]
    fn resolve_class_with_single_match() {
        let catalog = Catalog::with_entries(
            vec![],
            vec![class(1, 10, "A", "Lyceum 1"), class(2, 10, "B", "Lyceum 1")],
            vec![],
        );
        assert_eq!(catalog.resolve_class(10, "B", None).unwrap(), 2);
    }

    #[test]
    fn resolve_class_without_match() {
        let catalog = Catalog::with_entries(vec![], vec![class(1, 10, "A", "Lyceum 1")], vec![]);
        let err = catalog.resolve_class(11, "A", None).unwrap_err();
        assert!(matches!(err, MobSyncError::ClassNotFound(_)));
    }

    #[test]
    fn resolve_class_ambiguous_without_school() {
        let catalog = Catalog::with_entries(
            vec![],
            vec![class(1, 10, "B", "Lyceum 1"), class(2, 10, "B", "Lyceum 2")],
            vec![],
        );
        let err = catalog.resolve_class(10, "B", None).unwrap_err();
        assert!(matches!(err, MobSyncError::InvalidArgument(_)));
        assert_eq!(catalog.resolve_class(10, "B", Some("Lyceum 2")).unwrap(), 2);
    }

    #[test]
    fn school_detail_known_and_unknown() {
        let catalog = Catalog::with_entries(vec![], vec![], vec![school(3, "Lyceum 3")]);
        assert_eq!(catalog.school_detail(Some(3)), json!({"id": 3, "name": "Lyceum 3"}));
        assert_eq!(catalog.school_detail(Some(4)), json!({}));
        assert_eq!(catalog.school_detail(None), json!({}));
    }

    #[test]
    fn decode_skips_bad_entries() {
        let users: Vec<RemoteUser> = decode_entries(
            vec![json!({"id": 1, "login": "a"}), json!({"id": "x"}), json!({"id": 2, "login": "b"})],
            "user",
        );
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].login, "b");
    }

    #[tokio::test]
    async fn refresh_all_loads_every_collection() {
        let server = MockServer::start().await;
        let session = Session::new(&server.uri()).unwrap();
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .and(query_param("page", "1"))
            .and(query_param("disabled", "True"))
            .and(query_param("activated", "True"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "login": "alice"}, {"id": 2, "login": "bob"}
            ])))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_list(&server, USERS_PATH, json!([])).await;
        mount_list(
            &server,
            CLASS_LIST_PATH,
            json!([{"id": 5, "parallel": 10, "letter": "B", "userGroup": 50}]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(SCHOOLS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "Lyceum 1"}])))
            .mount(&server)
            .await;

        let mut catalog = Catalog::new();
        catalog
            .refresh_all(&session, &ApiProfile::default())
            .await
            .unwrap();

        assert!(catalog.contains_login("alice"));
        assert_eq!(catalog.user_for_login("bob").map(|u| u.id), Some(2));
        assert!(!catalog.contains_login("carol"));
        assert_eq!(catalog.class(5).and_then(RemoteClass::group_id), Some(50));
        assert_eq!(catalog.schools().len(), 1);
    }

    #[tokio::test]
    async fn refresh_schools_tolerates_non_json() {
        let server = MockServer::start().await;
        let session = Session::new(&server.uri()).unwrap();
        Mock::given(method("GET"))
            .and(path(SCHOOLS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(""))
            .mount(&server)
            .await;

        let mut catalog = Catalog::with_entries(vec![], vec![], vec![school(1, "old")]);
        catalog.refresh_schools(&session).await.unwrap();
        assert!(catalog.schools().is_empty());
    }
}
