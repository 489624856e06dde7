//! Capabilities of a MobEdu deployment.
//!
//! Deployments differ in small ways (paged lists, the activation endpoint,
//! role names). One reconciler handles all of them, switched by this profile.

use mobsync_core::config::RemoteConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiProfile {
    /// List endpoints take `page`/`per_page` and end with an empty page.
    pub paginated: bool,
    pub page_size: u32,
    /// `PUT /adm/users/activate` is available.
    pub activation_endpoint: bool,
    pub teacher_roles: Vec<String>,
    pub student_roles: Vec<String>,
}

impl Default for ApiProfile {
    fn default() -> Self {
        Self {
            paginated: true,
            page_size: 100,
            activation_endpoint: true,
            teacher_roles: vec!["ROLE_TEACHER".into()],
            student_roles: vec!["ROLE_STUDENT".into()],
        }
    }
}

impl ApiProfile {
    /// Older deployments: lists come back whole and there is no activation call.
    pub fn legacy() -> Self {
        Self {
            paginated: false,
            activation_endpoint: false,
            ..Self::default()
        }
    }

    /// Role set for a new account with no roles of its own.
    pub fn default_roles(&self, as_teacher: bool) -> &[String] {
        if as_teacher {
            &self.teacher_roles
        } else {
            &self.student_roles
        }
    }
}

impl From<&RemoteConfig> for ApiProfile {
    fn from(config: &RemoteConfig) -> Self {
        Self {
            paginated: config.paginated,
            page_size: config.page_size,
            activation_endpoint: config.activation_endpoint,
            teacher_roles: config.teacher_roles.clone(),
            student_roles: config.student_roles.clone(),
        }
    }
}
