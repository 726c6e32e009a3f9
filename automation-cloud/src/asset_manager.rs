//! Reconciles cloud and local asset inventories.
//!
//! Each call is self-contained: the cloud inventory is fetched fresh, the
//! local one is read from disk, and nothing is cached between calls.

use crate::api_client::{AutomationApiClient, CertificateUpload};
use crate::certificate::export_pkcs12;
use crate::config::AutomationConfig;
use crate::error::{CloudError, CloudResult};
use automation_storage::LocalAssetsStore;
use automation_types::{
    Asset, AssetKey, AssetKind, AssetSet, Certificate, CloudCertificate, CloudConnection,
    CloudCredential, CloudVariable, Connection, ConnectionTypeSchemas, Credential, LocalAssets,
    Variable,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything the service holds for one account, one list per kind.
#[derive(Clone, Debug, Default)]
pub struct CloudInventory {
    pub variables: Vec<CloudVariable>,
    pub credentials: Vec<CloudCredential>,
    pub certificates: Vec<CloudCertificate>,
    pub connections: Vec<CloudConnection>,
}

impl CloudInventory {
    pub fn len(&self) -> usize {
        self.variables.len()
            + self.credentials.len()
            + self.certificates.len()
            + self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cloud-only assets for every record whose key is in `selected`.
    fn select(&self, selected: &BTreeSet<AssetKey>) -> Vec<Asset> {
        let wanted = |kind, name: &str| selected.contains(&AssetKey::new(kind, name));
        let mut assets = Vec::new();
        assets.extend(
            self.variables
                .iter()
                .filter(|r| wanted(AssetKind::Variable, &r.name))
                .map(|r| Asset::from(Variable::from_cloud(r))),
        );
        assets.extend(
            self.credentials
                .iter()
                .filter(|r| wanted(AssetKind::Credential, &r.name))
                .map(|r| Asset::from(Credential::from_cloud(r))),
        );
        assets.extend(
            self.certificates
                .iter()
                .filter(|r| wanted(AssetKind::Certificate, &r.name))
                .map(|r| Asset::from(Certificate::from_cloud(r))),
        );
        assets.extend(
            self.connections
                .iter()
                .filter(|r| wanted(AssetKind::Connection, &r.name))
                .map(|r| Asset::from(Connection::from_cloud(r))),
        );
        assets
    }
}

/// Joins a cloud and a local inventory by identity.
///
/// A cloud record with a local counterpart becomes a merged asset; one
/// without becomes cloud-only. Local records left unmatched become
/// local-only.
pub fn merge_inventories(local: &LocalAssets, cloud: &CloudInventory) -> AssetSet {
    let mut set = AssetSet::new();

    for record in &cloud.variables {
        let asset = match local.variable(&record.name) {
            Some(local) => Variable::merged(local, record),
            None => Variable::from_cloud(record),
        };
        set.insert(asset.into());
    }
    for record in &cloud.credentials {
        let asset = match local.credential(&record.name) {
            Some(local) => Credential::merged(local, record),
            None => Credential::from_cloud(record),
        };
        set.insert(asset.into());
    }
    for record in &cloud.certificates {
        let asset = match local.certificate(&record.name) {
            Some(local) => Certificate::merged(local, record),
            None => Certificate::from_cloud(record),
        };
        set.insert(asset.into());
    }
    for record in &cloud.connections {
        let asset = match local.connection(&record.name) {
            Some(local) => Connection::merged(local, record),
            None => Connection::from_cloud(record),
        };
        set.insert(asset.into());
    }

    let unmatched = |set: &AssetSet, kind, name: &str| !set.contains(&AssetKey::new(kind, name));
    for record in &local.variables {
        if unmatched(&set, AssetKind::Variable, &record.name) {
            set.insert(Variable::from_local(record).into());
        }
    }
    for record in &local.credentials {
        if unmatched(&set, AssetKind::Credential, &record.name) {
            set.insert(Credential::from_local(record).into());
        }
    }
    for record in &local.certificates {
        if unmatched(&set, AssetKind::Certificate, &record.name) {
            set.insert(Certificate::from_local(record).into());
        }
    }
    for record in &local.connections {
        if unmatched(&set, AssetKind::Connection, &record.name) {
            set.insert(Connection::from_local(record).into());
        }
    }

    set
}

/// Moves assets between one automation account and its local workspace.
pub struct AssetManager {
    api: Arc<AutomationApiClient>,
    store: LocalAssetsStore,
    workspace: PathBuf,
    thumbprint: String,
}

impl AssetManager {
    pub fn new(
        api: Arc<AutomationApiClient>,
        store: LocalAssetsStore,
        workspace: impl Into<PathBuf>,
        thumbprint: impl Into<String>,
    ) -> Self {
        Self {
            api,
            store,
            workspace: workspace.into(),
            thumbprint: thumbprint.into(),
        }
    }

    /// Builds a manager for the account and key named in `config`.
    pub fn from_config(
        config: &AutomationConfig,
        api: Arc<AutomationApiClient>,
        store: LocalAssetsStore,
    ) -> CloudResult<Self> {
        config.validate()?;
        let workspace = config.workspace_path()?;
        Ok(Self::new(api, store, workspace, config.certificate_thumbprint.clone()))
    }

    pub fn api(&self) -> &AutomationApiClient {
        &self.api
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub async fn connection_type_schemas(&self) -> CloudResult<ConnectionTypeSchemas> {
        let schemas: ConnectionTypeSchemas =
            self.api.list_connection_types().await?.into_iter().collect();
        debug!("loaded {} connection type schemas", schemas.len());
        Ok(schemas)
    }

    /// Fetches the full cloud inventory, one kind at a time.
    ///
    /// Connection field values need a read per connection; a connection
    /// that vanishes between the list and the read is dropped.
    pub async fn fetch_cloud(&self) -> CloudResult<CloudInventory> {
        let variables = self.api.list_variables().await?;
        let credentials = self.api.list_credentials().await?;

        let mut connections = Vec::new();
        for summary in self.api.list_connections().await? {
            match self.api.get_connection(&summary.name).await? {
                Some(detail) => connections.push(detail),
                None => debug!("connection {} disappeared during fetch", summary.name),
            }
        }

        let certificates = self.api.list_certificates().await?;

        let inventory = CloudInventory {
            variables,
            credentials,
            certificates,
            connections,
        };
        debug!("fetched {} cloud assets", inventory.len());
        Ok(inventory)
    }

    /// Current view of every asset on either side, with its sync status.
    pub async fn reconcile(&self) -> CloudResult<AssetSet> {
        let cloud = self.fetch_cloud().await?;
        let schemas = self.connection_type_schemas().await?;
        let local = self.local_assets(&schemas)?;
        let merged = merge_inventories(&local, &cloud);
        info!(
            "reconciled {} assets ({} cloud, {} local) in {}",
            merged.len(),
            cloud.len(),
            local.len(),
            self.workspace.display()
        );
        Ok(merged)
    }

    /// Writes the cloud copies of `selected` into the local workspace.
    ///
    /// Keys with no cloud record are ignored. Secrets the cloud redacts keep
    /// their local values. Returns the number of assets written.
    pub async fn download_from_cloud(&self, selected: &[AssetKey]) -> CloudResult<usize> {
        let selected: BTreeSet<AssetKey> = selected.iter().cloned().collect();
        let cloud = self.fetch_cloud().await?;
        let schemas = self.connection_type_schemas().await?;

        let mut assets = cloud.select(&selected);
        for asset in &mut assets {
            asset.meta_mut().adopt_cloud_timestamp();
        }
        if assets.len() < selected.len() {
            debug!(
                "{} selected assets have no cloud copy",
                selected.len() - assets.len()
            );
        }

        self.store
            .add(&self.workspace, &assets, &self.thumbprint, &schemas)?;
        info!("downloaded {} assets", assets.len());
        Ok(assets.len())
    }

    /// Creates or updates each asset in the cloud. Stops at the first failure.
    /// The local store is left as is.
    pub async fn upload_to_cloud(&self, assets: &[Asset]) -> CloudResult<()> {
        for asset in assets {
            match asset {
                Asset::Variable(v) => {
                    self.api.create_or_update_variable(v).await?;
                }
                Asset::Credential(c) => {
                    if c.password().is_none() {
                        warn!("credential {} has no local password", asset.name());
                    }
                    self.api.create_or_update_credential(c).await?;
                }
                Asset::Connection(c) => {
                    self.api.create_or_update_connection(c).await?;
                }
                Asset::Certificate(c) => {
                    let upload = certificate_upload(c).await?;
                    self.api
                        .create_or_update_certificate(asset.name(), &upload)
                        .await?;
                }
            }
            debug!("uploaded {}", asset.key());
        }
        info!("uploaded {} assets", assets.len());
        Ok(())
    }

    /// Deletes assets locally, in the cloud, or both.
    ///
    /// Assets the cloud has never seen are never sent a remote delete.
    pub async fn delete(
        &self,
        assets: &[Asset],
        delete_locally: bool,
        delete_from_cloud: bool,
    ) -> CloudResult<()> {
        if delete_from_cloud {
            for asset in assets {
                if asset.meta().last_modified_cloud().is_none() {
                    debug!("{} is local only, skipping cloud delete", asset.key());
                    continue;
                }
                let name = asset.name();
                match asset.kind() {
                    AssetKind::Variable => self.api.delete_variable(name).await?,
                    AssetKind::Credential => self.api.delete_credential(name).await?,
                    AssetKind::Certificate => self.api.delete_certificate(name).await?,
                    AssetKind::Connection => self.api.delete_connection(name).await?,
                }
            }
        }

        if delete_locally {
            let schemas = self.connection_type_schemas().await?;
            self.store
                .delete(&self.workspace, assets, &self.thumbprint, &schemas)?;
        }

        info!(
            "deleted {} assets (local: {delete_locally}, cloud: {delete_from_cloud})",
            assets.len()
        );
        Ok(())
    }

    /// Looks an asset up locally first, then in the cloud. Absent on both
    /// sides is `Ok(None)`.
    ///
    /// The local read does not depend on the service: if connection-type
    /// schemas cannot be fetched, stored connections decrypt from the field
    /// list they were written with.
    pub async fn get_asset(&self, name: &str, kind: AssetKind) -> CloudResult<Option<Asset>> {
        let schemas = match self.connection_type_schemas().await {
            Ok(schemas) => schemas,
            Err(e) => {
                warn!("connection type schemas unavailable, reading {name} without them: {e}");
                ConnectionTypeSchemas::new()
            }
        };
        let local = self.local_assets(&schemas)?;
        let found: Option<Asset> = match kind {
            AssetKind::Variable => local.variable(name).map(|r| Variable::from_local(r).into()),
            AssetKind::Credential => local
                .credential(name)
                .map(|r| Credential::from_local(r).into()),
            AssetKind::Certificate => local
                .certificate(name)
                .map(|r| Certificate::from_local(r).into()),
            AssetKind::Connection => local
                .connection(name)
                .map(|r| Connection::from_local(r).into()),
        };
        if found.is_some() {
            return Ok(found);
        }

        let asset: Option<Asset> = match kind {
            AssetKind::Variable => self
                .api
                .get_variable(name)
                .await?
                .map(|r| Variable::from_cloud(&r).into()),
            AssetKind::Credential => self
                .api
                .get_credential(name)
                .await?
                .map(|r| Credential::from_cloud(&r).into()),
            AssetKind::Certificate => self
                .api
                .get_certificate(name)
                .await?
                .map(|r| Certificate::from_cloud(&r).into()),
            AssetKind::Connection => self
                .api
                .get_connection(name)
                .await?
                .map(|r| Connection::from_cloud(&r).into()),
        };
        if asset.is_none() {
            debug!("{kind} {name} not found locally or in the cloud");
        }
        Ok(asset)
    }

    fn local_assets(&self, schemas: &ConnectionTypeSchemas) -> CloudResult<LocalAssets> {
        Ok(self.store.get(&self.workspace, &self.thumbprint, schemas)?)
    }
}

async fn certificate_upload(certificate: &Certificate) -> CloudResult<CertificateUpload> {
    let name = certificate.meta().name();
    let path = certificate
        .certificate_path()
        .ok_or_else(|| CloudError::Certificate(format!("{name} has no certificate file")))?;
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        CloudError::Certificate(format!("{name}: cannot read {}: {e}", path.display()))
    })?;
    if bytes.is_empty() {
        return Err(CloudError::Certificate(format!(
            "{name}: {} is empty",
            path.display()
        )));
    }
    let password = certificate.password();
    Ok(CertificateUpload {
        bytes: export_pkcs12(name, &bytes, password)?,
        password: password.map(str::to_string),
        exportable: certificate.is_exportable(),
    })
}
