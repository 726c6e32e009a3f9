//! Runbook snippets that read or write an asset from inside a runbook.

use crate::asset::AssetKind;
use serde::{Deserialize, Serialize};

/// Authoring language of the runbook a snippet is inserted into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunbookLanguage {
    PowerShell,
    PowerShellWorkflow,
    Python2,
}

pub fn getter(kind: AssetKind, name: &str, language: RunbookLanguage) -> String {
    match language {
        RunbookLanguage::PowerShell | RunbookLanguage::PowerShellWorkflow => {
            let cmdlet = match kind {
                AssetKind::Variable => "Get-AutomationVariable",
                AssetKind::Credential => "Get-AutomationPSCredential",
                AssetKind::Certificate => "Get-AutomationCertificate",
                AssetKind::Connection => "Get-AutomationConnection",
            };
            format!("{cmdlet} -Name {}", ps_quote(name))
        }
        RunbookLanguage::Python2 => {
            let function = match kind {
                AssetKind::Variable => "get_automation_variable",
                AssetKind::Credential => "get_automation_credential",
                AssetKind::Certificate => "get_automation_certificate",
                AssetKind::Connection => "get_automation_connection",
            };
            format!("automationassets.{function}({})", py_quote(name))
        }
    }
}

/// Only variables can be written from a runbook.
pub fn setter(kind: AssetKind, name: &str, language: RunbookLanguage) -> Option<String> {
    if kind != AssetKind::Variable {
        return None;
    }
    Some(match language {
        RunbookLanguage::PowerShell | RunbookLanguage::PowerShellWorkflow => {
            format!("Set-AutomationVariable -Name {} -Value $value", ps_quote(name))
        }
        RunbookLanguage::Python2 => {
            format!("automationassets.set_automation_variable({}, value)", py_quote(name))
        }
    })
}

fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn py_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
