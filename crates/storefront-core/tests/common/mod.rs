//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{json, Value};
use storefront_core::auth::{Role, Session, SESSION_KEY};
use storefront_core::storage::{CachedData, MemoryStore, Storage};
use storefront_core::{ApiClient, SessionStore, StoreOptions};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Client timeout used by test stores; mocks that delay longer simulate a timeout.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

pub fn store_with(server: &MockServer, storage: impl Storage + 'static, sync_interval: Duration) -> SessionStore {
    let api = ApiClient::with_timeout(&server.uri(), TEST_TIMEOUT).expect("Failed to build client");
    let options = StoreOptions {
        sync_interval,
        ..Default::default()
    };
    SessionStore::new(api, storage, options)
}

/// A store whose background sync never fires during a test.
pub fn store(server: &MockServer, storage: &MemoryStore) -> SessionStore {
    store_with(server, storage.clone(), Duration::from_secs(3600))
}

pub fn identity(user_id: &str, balance: f64, token: &str) -> Value {
    json!({
        "userId": user_id,
        "name": "Jane Doe",
        "email": "jane@shop.test",
        "role": "user",
        "balance": balance,
        "token": token,
    })
}

pub async fn mount_login(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_me(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Log in as `u1` with the given balance and token `t1`.
pub async fn signed_in(server: &MockServer, storage: &MemoryStore, balance: f64) -> SessionStore {
    mount_login(server, identity("u1", balance, "t1")).await;
    let store = store(server, storage);
    store
        .login("jane@shop.test", "secret")
        .await
        .expect("Login should succeed");
    store
}

pub fn session(user_id: &str, name: &str, token: &str) -> Session {
    Session {
        user_id: user_id.to_string(),
        name: name.to_string(),
        email: "jane@shop.test".to_string(),
        phone: None,
        profile_picture: None,
        address: None,
        city: None,
        country: None,
        role: Role::Customer,
        balance: 100.0,
        token: token.to_string(),
    }
}

pub fn seed(storage: &impl Storage, session: &Session) {
    let json = serde_json::to_string(&CachedData::new(session)).expect("Failed to serialize session");
    storage.set(SESSION_KEY, &json).expect("Failed to seed storage");
}

pub fn persisted(storage: &impl Storage) -> Option<Session> {
    storage
        .get(SESSION_KEY)
        .expect("Failed to read storage")
        .map(|raw| {
            serde_json::from_str::<CachedData<Session>>(&raw)
                .expect("Persisted session should parse")
                .data
        })
}

pub async fn requests_to(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}
