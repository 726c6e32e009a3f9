//! Cloud side of Azure Automation asset sync.
//!
//! Provides:
//! - [`AutomationApiClient`], a REST client for an automation account's assets
//! - [`AssetManager`], which reconciles cloud and local inventories and moves
//!   assets between them
//! - [`ReconcileGate`] and [`spawn_refresher`] for single-flight periodic refresh

pub mod api_client;
pub mod asset_manager;
pub mod certificate;
pub mod config;
pub mod error;
pub mod refresh;
mod wire;

pub use api_client::{AutomationApiClient, CertificateUpload};
pub use asset_manager::{merge_inventories, AssetManager, CloudInventory};
pub use certificate::export_pkcs12;
pub use config::AutomationConfig;
pub use error::{CloudError, CloudResult};
pub use refresh::{spawn_refresher, ReconcileGate, RefreshHandle, Snapshot};
