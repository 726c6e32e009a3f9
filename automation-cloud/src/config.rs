//! Automation account configuration.

use crate::error::{CloudError, CloudResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Everything the manager needs to address one automation account and its
/// local workspace. Passed explicitly; nothing is read from global state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Resource manager endpoint (e.g., "https://management.azure.com").
    pub api_base_url: String,

    /// `api-version` query parameter sent with every request.
    pub api_version: String,

    pub subscription_id: String,
    pub resource_group: String,
    pub automation_account: String,

    /// Base directory under which per-account workspaces live.
    pub workspace_base: PathBuf,

    /// Thumbprint of the key handle protecting local secrets.
    pub certificate_thumbprint: String,

    /// Timeout applied to each remote call, in seconds.
    pub request_timeout_secs: u64,

    /// Interval between background reconciles, in seconds.
    pub refresh_interval_secs: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://management.azure.com".to_string(),
            api_version: "2015-10-31".to_string(),
            subscription_id: String::new(),
            resource_group: String::new(),
            automation_account: String::new(),
            workspace_base: PathBuf::from("AutomationWorkspace"),
            certificate_thumbprint: String::new(),
            request_timeout_secs: 30,
            refresh_interval_secs: 30,
        }
    }
}

impl AutomationConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Local workspace directory for the configured account.
    pub fn workspace_path(&self) -> CloudResult<PathBuf> {
        Ok(automation_storage::workspace_path(
            &self.workspace_base,
            &self.subscription_id,
            &self.resource_group,
            &self.automation_account,
        )?)
    }

    /// Rejects configurations that cannot address an account.
    pub fn validate(&self) -> CloudResult<()> {
        for (field, value) in [
            ("api_base_url", &self.api_base_url),
            ("api_version", &self.api_version),
            ("subscription_id", &self.subscription_id),
            ("resource_group", &self.resource_group),
            ("automation_account", &self.automation_account),
        ] {
            if value.trim().is_empty() {
                return Err(CloudError::Config(format!("missing {field}")));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(CloudError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(CloudError::Config(
                "refresh_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
