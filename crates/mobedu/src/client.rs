//! Entry point tying the session, catalog, profile and mapping tables together.

use mobsync_core::config::{MappingConfig, RemoteConfig};
use mobsync_core::error::{MobSyncError, Result};
use serde_json::Value;
use tracing::info;

use crate::catalog::Catalog;
use crate::classes::ClassGroupReconciler;
use crate::mappings::MappingTables;
use crate::profile::ApiProfile;
use crate::session::Session;
use crate::users::UserReconciler;

/// One authenticated account against one MobEdu deployment.
pub struct MobEduClient {
    pub(crate) session: Session,
    pub(crate) catalog: Catalog,
    pub(crate) profile: ApiProfile,
    pub(crate) mappings: MappingTables,
}

impl MobEduClient {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_profile(base_url, ApiProfile::default(), MappingTables::default())
    }

    pub fn with_profile(base_url: &str, profile: ApiProfile, mappings: MappingTables) -> Result<Self> {
        Ok(Self {
            session: Session::new(base_url)?,
            catalog: Catalog::new(),
            profile,
            mappings,
        })
    }

    pub fn from_config(remote: &RemoteConfig, mapping: &MappingConfig) -> Result<Self> {
        Self::with_profile(
            &remote.base_url,
            ApiProfile::from(remote),
            MappingTables {
                preserve_password: mapping.preserve_password,
                ..MappingTables::default()
            }
            .with_user_overrides(&mapping.user),
        )
    }

    /// Log in, load the catalog and pick the managed school if only one is
    /// possible. Returns `Ok(false)` when the server rejects the login.
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<bool> {
        if !self.session.authenticate(username, password).await? {
            return Ok(false);
        }
        self.catalog.refresh_all(&self.session, &self.profile).await?;
        if let Some(school_id) = self.session.auto_select_managed_school() {
            info!(school_id, "managed school selected");
        }
        Ok(true)
    }

    pub fn admin_school_ids(&self) -> Vec<i64> {
        self.session.admin_school_ids()
    }

    pub fn managed_school(&self) -> Option<i64> {
        self.session.managed_school()
    }

    pub fn set_managed_school(&mut self, school_id: i64) -> Result<()> {
        self.session.set_managed_school(school_id)?;
        info!(school_id, "managed school selected");
        Ok(())
    }

    pub(crate) fn require_managed_school(&self) -> Result<i64> {
        self.session.managed_school().ok_or_else(|| {
            MobSyncError::InvalidArgument(format!(
                "no managed school selected (account administers {:?})",
                self.session.admin_school_ids()
            ))
        })
    }

    /// School object attached to class payloads, `{}` when unknown.
    pub fn managed_school_detail(&self) -> Value {
        self.catalog.school_detail(self.session.managed_school())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn profile(&self) -> &ApiProfile {
        &self.profile
    }

    pub fn mappings(&self) -> &MappingTables {
        &self.mappings
    }

    pub async fn refresh_users(&mut self) -> Result<()> {
        self.catalog.refresh_users(&self.session, &self.profile).await
    }

    pub async fn refresh_classes(&mut self) -> Result<()> {
        self.catalog.refresh_classes(&self.session, &self.profile).await
    }

    pub fn users(&mut self) -> UserReconciler<'_> {
        UserReconciler::new(self)
    }

    pub fn classes(&mut self) -> ClassGroupReconciler<'_> {
        ClassGroupReconciler::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{authenticated_client, mount_list, mount_login, school, SCHOOL_ID};
    use crate::session::{AUTH_PATH, CLASS_LIST_PATH, SCHOOLS_PATH, USERS_PATH};
    use mobsync_core::config::FieldOverride;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn authenticate_loads_catalog_and_selects_single_school() {
        let server = MockServer::start().await;
        let client = authenticated_client(
            &server,
            json!([{"id": 10, "login": "alice"}]),
            json!([{"id": 20, "parallel": 10, "letter": "B"}]),
        )
        .await;

        assert_eq!(client.managed_school(), Some(SCHOOL_ID));
        assert!(client.catalog().contains_login("alice"));
        assert_eq!(client.catalog().resolve_class(10, "B", None).unwrap(), 20);
        assert_eq!(client.managed_school_detail(), school());
    }

    #[tokio::test]
    async fn several_schools_require_explicit_choice() {
        let server = MockServer::start().await;
        mount_login(&server, json!([{"id": 1}, {"id": 2}])).await;
        mount_list(&server, USERS_PATH, json!([])).await;
        mount_list(&server, CLASS_LIST_PATH, json!([])).await;
        Mock::given(method("GET"))
            .and(path(SCHOOLS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
            .mount(&server)
            .await;

        let mut client = MobEduClient::new(&server.uri()).unwrap();
        assert!(client.authenticate("admin", "pw").await.unwrap());
        assert_eq!(client.managed_school(), None);
        assert!(matches!(
            client.require_managed_school(),
            Err(MobSyncError::InvalidArgument(_))
        ));

        let err = client.set_managed_school(3).unwrap_err();
        assert!(matches!(err, MobSyncError::InvalidArgument(_)));
        assert_eq!(client.managed_school(), None);

        client.set_managed_school(2).unwrap();
        assert_eq!(client.managed_school(), Some(2));
        assert_eq!(client.managed_school_detail(), json!({"id": 2}));
    }

    #[tokio::test]
    async fn rejected_login_leaves_catalog_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(AUTH_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(USERS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let mut client = MobEduClient::new(&server.uri()).unwrap();
        assert!(!client.authenticate("admin", "bad").await.unwrap());
        assert!(client.catalog().users().is_empty());
        assert_eq!(client.managed_school(), None);
    }

    #[test]
    fn from_config_applies_profile_and_overrides() {
        let remote = RemoteConfig {
            base_url: "https://mobedu.example.org".into(),
            paginated: false,
            activation_endpoint: false,
            ..RemoteConfig::default()
        };
        let mapping = MappingConfig {
            preserve_password: true,
            user: vec![FieldOverride {
                target: "email".into(),
                source: "mail".into(),
            }],
        };
        let client = MobEduClient::from_config(&remote, &mapping).unwrap();
        assert!(!client.profile().paginated);
        assert!(!client.profile().activation_endpoint);
        assert_eq!(client.mappings().user.len(), 11);
        assert!(client.mappings().preserve_password);
        assert_eq!(client.session().base_url(), "https://mobedu.example.org");
    }
}
