use automation_cloud::{AutomationConfig, CloudError};
use std::path::PathBuf;
use std::time::Duration;

fn account() -> AutomationConfig {
    AutomationConfig {
        subscription_id: "sub-1".into(),
        resource_group: "rg-1".into(),
        automation_account: "acct-1".into(),
        workspace_base: PathBuf::from("/ws"),
        ..AutomationConfig::default()
    }
}

#[test]
fn default_api_base_url() {
    let config = AutomationConfig::default();
    assert_eq!(config.api_base_url, "https://management.azure.com");
}

#[test]
fn default_api_version() {
    let config = AutomationConfig::default();
    assert_eq!(config.api_version, "2015-10-31");
}

#[test]
fn default_timeouts() {
    let config = AutomationConfig::default();
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.refresh_interval(), Duration::from_secs(30));
}

#[test]
fn default_is_not_addressable() {
    let err = AutomationConfig::default().validate().unwrap_err();
    assert!(matches!(err, CloudError::Config(_)));
}

#[test]
fn complete_config_validates() {
    account().validate().unwrap();
}

#[test]
fn zero_timeout_is_rejected() {
    let mut config = account();
    config.request_timeout_secs = 0;
    let err = config.validate().unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid configuration: request_timeout_secs must be positive"
    );
}

#[test]
fn workspace_path_nests_account() {
    let path = account().workspace_path().unwrap();
    assert_eq!(path, PathBuf::from("/ws/sub-1/rg-1/acct-1"));
}

#[test]
fn workspace_path_rejects_empty_account() {
    let mut config = account();
    config.automation_account = "  ".into();
    assert!(matches!(
        config.workspace_path().unwrap_err(),
        CloudError::Storage(_)
    ));
}

#[test]
fn serialization_roundtrip() {
    let config = account();
    let json = serde_json::to_string(&config).unwrap();
    let back: AutomationConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.subscription_id, config.subscription_id);
    assert_eq!(back.workspace_base, config.workspace_base);
    assert_eq!(back.request_timeout_secs, config.request_timeout_secs);
}

#[test]
fn missing_fields_take_defaults() {
    let config: AutomationConfig =
        serde_json::from_str(r#"{ "subscription_id": "s", "refresh_interval_secs": 5 }"#).unwrap();
    assert_eq!(config.subscription_id, "s");
    assert_eq!(config.refresh_interval(), Duration::from_secs(5));
    assert_eq!(config.api_version, "2015-10-31");
}
