//! Shared helpers for tests against a mocked automation service.

#![allow(dead_code)]

use automation_cloud::{AssetManager, AutomationApiClient, AutomationConfig};
use automation_crypto::{KeyHandle, MemoryKeyStore};
use automation_storage::LocalAssetsStore;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCOUNT: &str = concat!(
    "/subscriptions/sub-1/resourceGroups/rg-1",
    "/providers/Microsoft.Automation/automationAccounts/acct-1"
);

pub const TOKEN: &str = "test-token";

/// Password of `tests/fixtures/signing.pfx`.
pub const FIXTURE_PASSWORD: &str = "fixture-pass";

/// A self-signed signing certificate in `tests/fixtures`, as `.pfx`, `.pem`
/// or `.cer` (DER).
pub fn fixture(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(file)
}

/// Path of a collection, or of one item in it.
pub fn resource_path(collection: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{ACCOUNT}/{collection}/{name}"),
        None => format!("{ACCOUNT}/{collection}"),
    }
}

pub fn config(server: &MockServer) -> AutomationConfig {
    AutomationConfig {
        api_base_url: server.uri(),
        subscription_id: "sub-1".into(),
        resource_group: "rg-1".into(),
        automation_account: "acct-1".into(),
        certificate_thumbprint: key().thumbprint().to_string(),
        ..AutomationConfig::default()
    }
}

pub async fn client(server: &MockServer) -> AutomationApiClient {
    let client = AutomationApiClient::new(config(server)).unwrap();
    client.set_token(TOKEN).await;
    client
}

/// Small key so generation stays quick; shared across a test binary.
pub fn key() -> &'static KeyHandle {
    static KEY: OnceLock<KeyHandle> = OnceLock::new();
    KEY.get_or_init(|| KeyHandle::generate(1024).unwrap())
}

pub fn store() -> LocalAssetsStore {
    let keys = MemoryKeyStore::new();
    keys.insert(key().clone()).unwrap();
    LocalAssetsStore::new(Arc::new(keys))
}

pub async fn manager(server: &MockServer, workspace: &Path) -> AssetManager {
    AssetManager::new(
        Arc::new(client(server).await),
        store(),
        workspace,
        key().thumbprint(),
    )
}

/// Serves `items` as a single-page list.
pub async fn mount_list(server: &MockServer, collection: &str, items: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(resource_path(collection, None)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": items })))
        .mount(server)
        .await;
}

/// Empty lists for every collection, at low priority so tests can mount
/// specific responses over them.
pub async fn mount_empty_account(server: &MockServer) {
    let collections = [
        "variables",
        "credentials",
        "certificates",
        "connections",
        "connectionTypes",
    ];
    for collection in collections {
        Mock::given(method("GET"))
            .and(path(resource_path(collection, None)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
            .with_priority(10)
            .mount(server)
            .await;
    }
}

pub fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "code": "NotFound",
        "message": "The resource was not found."
    }))
}

pub fn variable_json(name: &str, value: Option<&str>, encrypted: bool, modified: &str) -> Value {
    json!({
        "name": name,
        "properties": {
            "value": value,
            "isEncrypted": encrypted,
            "creationTime": "2024-01-01T00:00:00+00:00",
            "lastModifiedTime": modified,
        }
    })
}

pub fn credential_json(name: &str, username: &str, modified: &str) -> Value {
    json!({
        "name": name,
        "properties": {
            "userName": username,
            "lastModifiedTime": modified,
        }
    })
}

pub fn certificate_json(name: &str, thumbprint: &str, modified: &str) -> Value {
    json!({
        "name": name,
        "properties": {
            "thumbprint": thumbprint,
            "isExportable": true,
            "lastModifiedTime": modified,
        }
    })
}

pub fn connection_json(name: &str, connection_type: &str, fields: Value, modified: &str) -> Value {
    json!({
        "name": name,
        "properties": {
            "connectionType": { "name": connection_type },
            "fieldDefinitionValues": fields,
            "lastModifiedTime": modified,
        }
    })
}

pub fn connection_type_json(name: &str, fields: Value) -> Value {
    json!({
        "name": name,
        "properties": {
            "isGlobal": false,
            "fieldDefinitions": fields,
        }
    })
}
