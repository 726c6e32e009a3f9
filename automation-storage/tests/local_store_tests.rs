use automation_crypto::{KeyHandle, MemoryKeyStore};
use automation_storage::{LocalAssetsStore, StorageError, PLAIN_DOCUMENT, SECURE_DOCUMENT};
use automation_types::*;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

fn key() -> &'static KeyHandle {
    static KEY: OnceLock<KeyHandle> = OnceLock::new();
    KEY.get_or_init(|| KeyHandle::generate(1024).unwrap())
}

fn second_key() -> &'static KeyHandle {
    static KEY: OnceLock<KeyHandle> = OnceLock::new();
    KEY.get_or_init(|| KeyHandle::generate(1024).unwrap())
}

fn store() -> LocalAssetsStore {
    let keys = MemoryKeyStore::new();
    keys.insert(key().clone()).unwrap();
    keys.insert(second_key().clone()).unwrap();
    LocalAssetsStore::new(Arc::new(keys))
}

fn tp() -> &'static str {
    key().thumbprint()
}

fn schemas() -> ConnectionTypeSchemas {
    [ConnectionTypeSchema::new("Api")
        .with_field("Url", FieldDefinition { is_encrypted: false, ..Default::default() })
        .with_field("Key", FieldDefinition { is_encrypted: true, ..Default::default() })]
    .into_iter()
    .collect()
}

fn read_json(dir: &Path, file: &str) -> Value {
    serde_json::from_slice(&std::fs::read(dir.join(file)).unwrap()).unwrap()
}

fn api_connection(key_value: Value) -> Connection {
    let mut fields = BTreeMap::new();
    fields.insert("Url".to_string(), json!("https://example.test"));
    fields.insert("Key".to_string(), key_value);
    Connection::new("conn", "Api", fields)
}

// ── Reading ──────────────────────────────────────────────────────

#[test]
fn missing_workspace_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let assets = store().get(&dir.path().join("nope"), tp(), &schemas()).unwrap();
    assert!(assets.is_empty());
}

#[test]
fn corrupt_documents_read_empty() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(PLAIN_DOCUMENT), b"{ not json").unwrap();
    std::fs::write(dir.path().join(SECURE_DOCUMENT), b"[]").unwrap();
    let assets = store().get(dir.path(), tp(), &schemas()).unwrap();
    assert!(assets.is_empty());
}

#[test]
fn non_string_ciphertext_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let doc = json!({
        "Variable": [{"Name": "X", "LastModified": "2024-01-01 00:00:00Z", "Value": 42}]
    });
    std::fs::write(dir.path().join(SECURE_DOCUMENT), doc.to_string()).unwrap();
    let err = store().get(dir.path(), tp(), &schemas()).unwrap_err();
    assert!(matches!(err, StorageError::Crypto(_)));
}

#[test]
fn plain_assets_need_no_key() {
    let dir = tempfile::tempdir().unwrap();
    let keyless = LocalAssetsStore::new(Arc::new(MemoryKeyStore::new()));
    let variable: Asset = Variable::new("X", json!(5), false).into();
    keyless.add(dir.path(), &[variable], "ABSENT", &schemas()).unwrap();

    let assets = keyless.get(dir.path(), "ABSENT", &schemas()).unwrap();
    assert_eq!(assets.variable("X").unwrap().value, json!(5));
}

#[test]
fn secrets_without_key_fail() {
    let dir = tempfile::tempdir().unwrap();
    let keyless = LocalAssetsStore::new(Arc::new(MemoryKeyStore::new()));
    let credential: Asset = Credential::new("svc", "user", "pw").into();
    let err = keyless.add(dir.path(), &[credential], "ABSENT", &schemas()).unwrap_err();
    assert!(matches!(err, StorageError::Crypto(_)));
}

#[test]
fn reads_hand_written_plain_document() {
    let dir = tempfile::tempdir().unwrap();
    let doc = json!({
        "Variable": [{"Name": "X", "LastModified": "2024-01-01 10:00:00Z", "Value": 5}],
        "Certificate": [{"Name": "C", "LastModified": "2024-01-01 10:00:00Z",
                         "Thumbprint": "AB", "CertPath": "/c.cer", "Exportable": true}]
    });
    std::fs::write(dir.path().join(PLAIN_DOCUMENT), doc.to_string()).unwrap();

    let assets = store().get(dir.path(), tp(), &schemas()).unwrap();
    let x = assets.variable("X").unwrap();
    assert_eq!(x.last_modified, Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap());
    assert!(!x.encrypted);
    let c = assets.certificate("C").unwrap();
    assert!(c.exportable);
    assert_eq!(c.thumbprint.as_deref(), Some("AB"));
}

// ── Round trips ──────────────────────────────────────────────────

#[test]
fn every_kind_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let s = store();
    let assets: Vec<Asset> = vec![
        Variable::new("plain", json!({"a": [1, 2]}), false).into(),
        Variable::new("secret", json!("hidden"), true).into(),
        Credential::new("svc", "user", "p1").into(),
        Certificate::new("cert", "/certs/c.pfx", Some("pfx".into()), true, true).into(),
        Certificate::new("pub", "/certs/p.cer", None, false, false).into(),
        api_connection(json!("k-123")).into(),
    ];
    s.add(dir.path(), &assets, tp(), &schemas()).unwrap();

    let local = s.get(dir.path(), tp(), &schemas()).unwrap();
    assert_eq!(local.len(), 6);
    assert_eq!(local.variable("plain").unwrap().value, json!({"a": [1, 2]}));
    let secret = local.variable("secret").unwrap();
    assert_eq!(secret.value, json!("hidden"));
    assert!(secret.encrypted);
    assert_eq!(local.credential("svc").unwrap().password.as_deref(), Some("p1"));
    assert_eq!(local.credential("svc").unwrap().username.as_deref(), Some("user"));
    assert_eq!(local.certificate("cert").unwrap().password.as_deref(), Some("pfx"));
    assert!(local.certificate("cert").unwrap().encrypted);
    assert!(!local.certificate("pub").unwrap().encrypted);
    let conn = local.connection("conn").unwrap();
    assert_eq!(conn.value_fields["Key"], json!("k-123"));
    assert_eq!(conn.value_fields["Url"], json!("https://example.test"));
}

#[test]
fn add_replaces_existing_record() {
    let dir = tempfile::tempdir().unwrap();
    let s = store();
    s.add(dir.path(), &[Variable::new("X", json!(1), false).into()], tp(), &schemas())
        .unwrap();
    s.add(dir.path(), &[Variable::new("X", json!(2), false).into()], tp(), &schemas())
        .unwrap();
    let local = s.get(dir.path(), tp(), &schemas()).unwrap();
    assert_eq!(local.variables.len(), 1);
    assert_eq!(local.variable("X").unwrap().value, json!(2));
}

#[test]
fn variable_moves_between_documents_when_encryption_changes() {
    let dir = tempfile::tempdir().unwrap();
    let s = store();
    s.add(dir.path(), &[Variable::new("X", json!("v"), false).into()], tp(), &schemas())
        .unwrap();
    s.add(dir.path(), &[Variable::new("X", json!("v"), true).into()], tp(), &schemas())
        .unwrap();

    let plain = read_json(dir.path(), PLAIN_DOCUMENT);
    assert_eq!(plain["Variable"], json!([]));
    let secure = read_json(dir.path(), SECURE_DOCUMENT);
    assert_eq!(secure["Variable"].as_array().unwrap().len(), 1);
}

// ── Partition invariant ──────────────────────────────────────────

#[test]
fn plaintext_document_holds_no_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let assets: Vec<Asset> = vec![
        Variable::new("plain", json!("visible"), false).into(),
        Variable::new("secret", json!("hidden-value"), true).into(),
        Credential::new("svc", "user", "hunter2").into(),
        api_connection(json!("api-key-value")).into(),
        Certificate::new("pub", "/p.cer", None, false, false).into(),
    ];
    store().add(dir.path(), &assets, tp(), &schemas()).unwrap();

    let plain = read_json(dir.path(), PLAIN_DOCUMENT);
    let plain_keys = plain.as_object().unwrap();
    assert_eq!(plain_keys.len(), 2);
    assert!(!plain_keys.contains_key("PSCredential"));
    assert!(!plain_keys.contains_key("Connection"));
    assert_eq!(plain["Variable"].as_array().unwrap().len(), 1);
    assert_eq!(plain["Variable"][0]["Name"], json!("plain"));

    let raw_plain = std::fs::read_to_string(dir.path().join(PLAIN_DOCUMENT)).unwrap();
    let raw_secure = std::fs::read_to_string(dir.path().join(SECURE_DOCUMENT)).unwrap();
    for secret in ["hidden-value", "hunter2", "api-key-value"] {
        assert!(!raw_plain.contains(secret));
        assert!(!raw_secure.contains(secret));
    }

    let secure = read_json(dir.path(), SECURE_DOCUMENT);
    assert_eq!(secure["PSCredential"][0]["Username"], json!("user"));
    assert!(secure["PSCredential"][0]["Password"].is_string());
    assert_eq!(secure["Connection"][0]["ValueFields"]["Url"], json!("https://example.test"));
    assert_eq!(secure["Connection"][0]["EncryptedFields"], json!(["Key"]));
}

#[test]
fn last_modified_uses_universal_sortable_format() {
    let dir = tempfile::tempdir().unwrap();
    let mut asset: Asset = Variable::new("X", json!(1), false).into();
    asset
        .meta_mut()
        .set_last_modified_local(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap());
    store().add(dir.path(), &[asset], tp(), &schemas()).unwrap();

    let plain = read_json(dir.path(), PLAIN_DOCUMENT);
    assert_eq!(plain["Variable"][0]["LastModified"], json!("2024-02-03 04:05:06Z"));
}

// ── Redaction-preserving writes ──────────────────────────────────

#[test]
fn cloud_credential_keeps_local_password() {
    let dir = tempfile::tempdir().unwrap();
    let s = store();
    s.add(dir.path(), &[Credential::new("svc", "user", "p1").into()], tp(), &schemas())
        .unwrap();

    let from_cloud = Credential::from_cloud(&CloudCredential {
        name: "svc".into(),
        username: Some("renamed".into()),
        last_modified: Utc::now(),
    });
    s.add(dir.path(), &[from_cloud.into()], tp(), &schemas()).unwrap();

    let local = s.get(dir.path(), tp(), &schemas()).unwrap();
    let credential = local.credential("svc").unwrap();
    assert_eq!(credential.password.as_deref(), Some("p1"));
    assert_eq!(credential.username.as_deref(), Some("renamed"));
}

#[test]
fn cloud_connection_keeps_local_secret_fields() {
    let dir = tempfile::tempdir().unwrap();
    let s = store();
    s.add(dir.path(), &[api_connection(json!("k-123")).into()], tp(), &schemas())
        .unwrap();

    let mut cloud_fields = BTreeMap::new();
    cloud_fields.insert("Url".to_string(), Some("https://new.test".to_string()));
    cloud_fields.insert("Key".to_string(), None);
    let from_cloud = Connection::from_cloud(&CloudConnection {
        name: "conn".into(),
        connection_type: "Api".into(),
        field_values: cloud_fields,
        last_modified: Utc::now(),
    });
    s.add(dir.path(), &[from_cloud.into()], tp(), &schemas()).unwrap();

    let local = s.get(dir.path(), tp(), &schemas()).unwrap();
    let conn = local.connection("conn").unwrap();
    assert_eq!(conn.value_fields["Key"], json!("k-123"));
    assert_eq!(conn.value_fields["Url"], json!("https://new.test"));
}

#[test]
fn cloud_certificate_keeps_path_and_password() {
    let dir = tempfile::tempdir().unwrap();
    let s = store();
    s.add(
        dir.path(),
        &[Certificate::new("cert", "/c.pfx", Some("pw".into()), false, true).into()],
        tp(),
        &schemas(),
    )
    .unwrap();

    let from_cloud = Certificate::from_cloud(&CloudCertificate {
        name: "cert".into(),
        thumbprint: Some("FF00".into()),
        is_exportable: true,
        last_modified: Utc::now(),
    });
    s.add(dir.path(), &[from_cloud.into()], tp(), &schemas()).unwrap();

    let local = s.get(dir.path(), tp(), &schemas()).unwrap();
    let cert = local.certificate("cert").unwrap();
    assert_eq!(cert.password.as_deref(), Some("pw"));
    assert_eq!(cert.certificate_path.as_deref(), Some(Path::new("/c.pfx")));
    assert_eq!(cert.thumbprint.as_deref(), Some("FF00"));
    assert!(cert.encrypted);
}

#[test]
fn redacted_encrypted_variable_keeps_local_value() {
    let dir = tempfile::tempdir().unwrap();
    let s = store();
    s.add(dir.path(), &[Variable::new("X", json!("secret"), true).into()], tp(), &schemas())
        .unwrap();

    let from_cloud = Variable::from_cloud(&CloudVariable {
        name: "X".into(),
        value: None,
        is_encrypted: true,
        last_modified: Utc::now(),
    });
    s.add(dir.path(), &[from_cloud.into()], tp(), &schemas()).unwrap();

    let local = s.get(dir.path(), tp(), &schemas()).unwrap();
    assert_eq!(local.variable("X").unwrap().value, json!("secret"));
}

// ── Delete ───────────────────────────────────────────────────────

#[test]
fn delete_removes_only_named_assets() {
    let dir = tempfile::tempdir().unwrap();
    let s = store();
    let keep: Asset = Variable::new("keep", json!(1), false).into();
    let drop: Asset = Credential::new("drop", "u", "p").into();
    s.add(dir.path(), &[keep, drop.clone()], tp(), &schemas()).unwrap();

    s.delete(dir.path(), &[drop], tp(), &schemas()).unwrap();
    let local = s.get(dir.path(), tp(), &schemas()).unwrap();
    assert!(local.variable("keep").is_some());
    assert!(local.credential("drop").is_none());
}

#[test]
fn delete_of_unknown_asset_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let s = store();
    s.add(dir.path(), &[Variable::new("X", json!(1), false).into()], tp(), &schemas())
        .unwrap();
    s.delete(dir.path(), &[Variable::new("Y", json!(1), false).into()], tp(), &schemas())
        .unwrap();
    assert_eq!(s.get(dir.path(), tp(), &schemas()).unwrap().len(), 1);
}

// ── Schema independence ──────────────────────────────────────────

#[test]
fn connections_read_back_without_schema() {
    let dir = tempfile::tempdir().unwrap();
    let s = store();
    s.add(dir.path(), &[api_connection(json!("k-123")).into()], tp(), &schemas())
        .unwrap();

    let local = s.get(dir.path(), tp(), &ConnectionTypeSchemas::new()).unwrap();
    let conn = local.connection("conn").unwrap();
    assert_eq!(conn.value_fields["Key"], json!("k-123"));
    assert_eq!(conn.value_fields["Url"], json!("https://example.test"));
}

// ── Key rotation ─────────────────────────────────────────────────

#[test]
fn reencrypt_workspaces_moves_every_document() {
    let base = tempfile::tempdir().unwrap();
    let ws_a = base.path().join("sub/rg/a");
    let ws_b = base.path().join("sub/rg/b");
    let s = store();
    s.add(&ws_a, &[Credential::new("svc", "u", "p1").into()], tp(), &schemas())
        .unwrap();
    s.add(
        &ws_b,
        &[Variable::new("X", json!("s"), true).into(), api_connection(json!("k")).into()],
        tp(),
        &schemas(),
    )
    .unwrap();

    let new_tp = second_key().thumbprint();
    let count = s.reencrypt_workspaces(base.path(), tp(), new_tp, &schemas()).unwrap();
    assert_eq!(count, 2);

    let a = s.get(&ws_a, new_tp, &schemas()).unwrap();
    assert_eq!(a.credential("svc").unwrap().password.as_deref(), Some("p1"));
    let b = s.get(&ws_b, new_tp, &schemas()).unwrap();
    assert_eq!(b.variable("X").unwrap().value, json!("s"));
    assert_eq!(b.connection("conn").unwrap().value_fields["Key"], json!("k"));

    assert!(s.get(&ws_a, tp(), &schemas()).is_err());
}

#[test]
fn reencrypt_workspaces_leaves_corrupt_documents_untouched() {
    let base = tempfile::tempdir().unwrap();
    let good = base.path().join("sub/rg/good");
    let bad = base.path().join("sub/rg/bad");
    let s = store();
    s.add(&good, &[Credential::new("svc", "u", "p1").into()], tp(), &schemas())
        .unwrap();
    std::fs::create_dir_all(&bad).unwrap();
    let corrupt = br#"{"Variable": [], "PSCredential": []} trailing garbage"#;
    std::fs::write(bad.join(SECURE_DOCUMENT), corrupt).unwrap();

    let new_tp = second_key().thumbprint();
    let count = s.reencrypt_workspaces(base.path(), tp(), new_tp, &schemas()).unwrap();

    assert_eq!(count, 1);
    assert_eq!(std::fs::read(bad.join(SECURE_DOCUMENT)).unwrap(), corrupt.to_vec());
    let rotated = s.get(&good, new_tp, &schemas()).unwrap();
    assert_eq!(rotated.credential("svc").unwrap().password.as_deref(), Some("p1"));
}
