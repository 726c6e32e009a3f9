//! On-disk asset storage for Azure Automation workspaces.
//!
//! Each workspace directory holds two JSON documents:
//!
//! - `LocalAssets.json`: unencrypted variables and certificates
//! - `SecureLocalAssets.json`: encrypted variables, every credential, every
//!   connection and encrypted certificates, with secret fields stored as
//!   ciphertext
//!
//! Both documents are rewritten whole on every change. Nothing here
//! coordinates concurrent writers; callers serialise writes per workspace.

mod document;
mod error;
mod local_store;
mod workspace;

pub use document::{ConnectionEntry, PlainDocument, SecureDocument, PLAIN_DOCUMENT, SECURE_DOCUMENT};
pub use error::{StorageError, StorageResult};
pub use local_store::LocalAssetsStore;
pub use workspace::{ensure_workspace, workspace_path};
