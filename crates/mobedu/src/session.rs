//! Cookie-authenticated reqwest wrapper for the MobEdu REST API.

use std::sync::Arc;

use mobsync_core::error::{MobSyncError, RequestFailure, Result};
use reqwest::cookie::Jar;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::Account;
use crate::profile::ApiProfile;

pub const AUTH_PATH: &str = "/api/authenticate";
pub const ACCOUNT_PATH: &str = "/api/account";
pub const USERS_PATH: &str = "/adm/users";
pub const USER_ACTIVATE_PATH: &str = "/adm/users/activate";
pub const CLASS_LIST_PATH: &str = "/adm/classes";
pub const CLASSES_PATH: &str = "/api/learningClasses";
pub const SCHOOLS_PATH: &str = "/adm/schools";
pub const GROUPS_PATH: &str = "/api/userGroups";

/// The server hands out its session token in a response header named
/// `Cookie`, not `Set-Cookie`, so the jar never sees it on its own.
const SESSION_COOKIE_HEADER: &str = "Cookie";

pub fn user_detail_path(id: i64) -> String {
    format!("{USERS_PATH}/{id}")
}

pub fn class_detail_path(id: i64) -> String {
    format!("{CLASSES_PATH}/{id}")
}

pub fn group_detail_path(id: i64) -> String {
    format!("{GROUPS_PATH}/{id}")
}

/// Authenticated transport state plus the account it belongs to.
///
/// Mutating methods take `&mut self`; one session drives one protocol at a time.
pub struct Session {
    http: Client,
    base_url: Url,
    jar: Arc<Jar>,
    account: Option<Account>,
    managed_school: Option<i64>,
}

impl Session {
    pub fn new(base_url: &str) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|e| MobSyncError::Config(format!("invalid base URL {trimmed}: {e}")))?;
        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .build()?;
        Ok(Self {
            http,
            base_url: parsed,
            jar,
            account: None,
            managed_school: None,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }

    /// Log in and load the account payload.
    ///
    /// Returns `Ok(false)` when the server withholds the session cookie or the
    /// account endpoint does not answer with JSON. Only transport errors are `Err`.
    pub async fn authenticate(&mut self, username: &str, password: &str) -> Result<bool> {
        debug!(url = %self.url(AUTH_PATH), username, "authenticating");

        let response = self
            .http
            .post(self.url(AUTH_PATH))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        let cookie = response
            .headers()
            .get(SESSION_COOKIE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_session_cookie);

        let Some((name, value)) = cookie else {
            warn!(status = %status, "authentication response carried no usable session cookie");
            return Ok(false);
        };

        self.jar
            .add_cookie_str(&format!("{name}={value}; Path=/"), &self.base_url);

        let response = self.http.get(self.url(ACCOUNT_PATH)).send().await?;
        let body = response.text().await?;
        match serde_json::from_str::<Account>(&body) {
            Ok(account) => {
                info!(
                    username,
                    admin_schools = account.admin_school_ids().len(),
                    "authenticated"
                );
                self.account = Some(account);
                self.managed_school = None;
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "account endpoint did not return JSON");
                Ok(false)
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.account.is_some()
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    /// Schools the authenticated account may administer.
    pub fn admin_school_ids(&self) -> Vec<i64> {
        self.account
            .as_ref()
            .map(Account::admin_school_ids)
            .unwrap_or_default()
    }

    pub fn managed_school(&self) -> Option<i64> {
        self.managed_school
    }

    /// Choose the school all mutating calls are scoped to.
    pub fn set_managed_school(&mut self, school_id: i64) -> Result<()> {
        if !self.admin_school_ids().contains(&school_id) {
            return Err(MobSyncError::InvalidArgument(format!(
                "school {school_id} is not administered by this account"
            )));
        }
        self.managed_school = Some(school_id);
        Ok(())
    }

    /// Select the managed school when exactly one candidate exists.
    pub fn auto_select_managed_school(&mut self) -> Option<i64> {
        if let [only] = self.admin_school_ids().as_slice() {
            self.managed_school = Some(*only);
        }
        self.managed_school
    }

    /// GET `path` and parse the body as JSON, returning `alt` when the body is
    /// empty or not valid JSON for `T`.
    pub async fn get_json_or<T: DeserializeOwned>(&self, path: &str, alt: T) -> Result<T> {
        self.get_json_query_or(path, &[], alt).await
    }

    async fn get_json_query_or<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        alt: T,
    ) -> Result<T> {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                debug!(path, status = %status, error = %e, "non-JSON response, using fallback");
                Ok(alt)
            }
        }
    }

    /// Send a request with an optional JSON body. Anything but 200 becomes
    /// [`MobSyncError::RequestFailed`] with the status, headers and body.
    pub async fn request_json(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        if response.status() == StatusCode::OK {
            return Ok(response);
        }

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        debug!(%method, path, status = %status, "request failed");
        Err(MobSyncError::RequestFailed(RequestFailure {
            status,
            headers,
            body,
        }))
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Response> {
        self.request_json(Method::POST, path, Some(body)).await
    }

    pub async fn put_json(&self, path: &str, body: &Value) -> Result<Response> {
        self.request_json(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.request_json(Method::DELETE, path, None).await
    }

    /// Fetch a whole list endpoint.
    ///
    /// Paged endpoints are walked from page 1 until a page comes back empty;
    /// the server never reports a total, so the empty page is the only stop.
    pub async fn fetch_list(
        &self,
        path: &str,
        filters: &[(&str, &str)],
        profile: &ApiProfile,
    ) -> Result<Vec<Value>> {
        let mut query: Vec<(&str, String)> = filters
            .iter()
            .map(|(key, value)| (*key, (*value).to_string()))
            .collect();

        if !profile.paginated {
            return self.get_json_query_or(path, &query, Vec::new()).await;
        }

        query.push(("per_page", profile.page_size.to_string()));
        let mut items = Vec::new();
        let mut page: u32 = 1;
        loop {
            let mut page_query = query.clone();
            page_query.push(("page", page.to_string()));
            let batch: Vec<Value> = self
                .get_json_query_or(path, &page_query, Vec::new())
                .await?;
            if batch.is_empty() {
                debug!(path, pages = page - 1, total = items.len(), "pagination complete");
                break;
            }
            debug!(path, page, count = batch.len(), "fetched page");
            items.extend(batch);
            page += 1;
        }
        Ok(items)
    }
}

/// Parse the `name=value` pair from the server's `Cookie` response header.
/// Anything after a `;` is ignored.
pub fn parse_session_cookie(raw: &str) -> Option<(String, String)> {
    let pair = raw.split(';').next()?.trim();
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), value.trim().to_string()))
}
