//! Shared wiremock fixtures for the reconciler tests.

use mobsync_core::record::Record;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::MobEduClient;
use crate::session::{ACCOUNT_PATH, AUTH_PATH, CLASS_LIST_PATH, SCHOOLS_PATH, USERS_PATH};

pub const SCHOOL_ID: i64 = 1;

pub fn school() -> Value {
    json!({"id": SCHOOL_ID, "name": "Lyceum 1"})
}

pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

/// Serve `items` as page 1 of a paged list and an empty array for any
/// other page.
pub async fn mount_list(server: &MockServer, list_path: &str, items: Value) {
    Mock::given(method("GET"))
        .and(path(list_path))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items))
        .with_priority(2)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(list_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(10)
        .mount(server)
        .await;
}

pub async fn mount_login(server: &MockServer, admin_schools: Value) {
    Mock::given(method("POST"))
        .and(path(AUTH_PATH))
        .respond_with(ResponseTemplate::new(200).insert_header("Cookie", "SESSION=test"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(ACCOUNT_PATH))
        .and(header("cookie", "SESSION=test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "login": "admin",
            "additionalUserInfoDTO": {"adminSchools": admin_schools}
        })))
        .mount(server)
        .await;
}

/// A client logged in as an administrator of [`SCHOOL_ID`] with the given
/// remote users and classes in its catalog.
pub async fn authenticated_client(server: &MockServer, users: Value, classes: Value) -> MobEduClient {
    mount_login(server, json!([school()])).await;
    mount_list(server, USERS_PATH, users).await;
    mount_list(server, CLASS_LIST_PATH, classes).await;
    Mock::given(method("GET"))
        .and(path(SCHOOLS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([school()])))
        .mount(server)
        .await;

    let mut client = MobEduClient::new(&server.uri()).unwrap();
    assert!(client.authenticate("admin", "pw").await.unwrap());
    assert_eq!(client.managed_school(), Some(SCHOOL_ID));
    client
}
