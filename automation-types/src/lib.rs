//! Asset model for Azure Automation asset sync.
//!
//! Every locally or cloud-tracked artifact carries an [`ItemMeta`] with a
//! name and up to two timestamps, from which its [`SyncStatus`] is derived.
//! Assets come in four variants, modelled as the closed [`Asset`] sum type:
//!
//! - [`Variable`]: a JSON value, optionally encrypted
//! - [`Credential`]: username plus a password the cloud never returns
//! - [`Certificate`]: a certificate file reference with thumbprint and password
//! - [`Connection`]: a field set defined by an external connection-type schema
//!
//! Instances are transient views built each reconcile cycle from local
//! records ([`LocalVariable`] and friends), cloud records ([`CloudVariable`]
//! and friends), or both.

mod asset;
mod cloud;
mod item;
mod record;
mod schema;
mod set;
pub mod snippet;
pub mod timestamp;

pub use asset::{Asset, AssetKey, AssetKind, Certificate, Connection, Credential, Variable};
pub use cloud::{CloudCertificate, CloudConnection, CloudCredential, CloudVariable};
pub use item::{ItemMeta, SyncStatus};
pub use record::{LocalAssets, LocalCertificate, LocalConnection, LocalCredential, LocalVariable};
pub use schema::{ConnectionTypeSchema, ConnectionTypeSchemas, FieldDefinition};
pub use set::AssetSet;
pub use snippet::RunbookLanguage;
