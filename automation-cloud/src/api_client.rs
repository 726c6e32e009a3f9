//! HTTP client for an automation account's asset endpoints.
//!
//! Every call carries the bearer token installed with [`AutomationApiClient::set_token`]
//! and is bounded by the configured request timeout. There is no retry at this
//! layer: timeouts and error responses surface to the caller.

use crate::config::AutomationConfig;
use crate::error::{CloudError, CloudResult};
use crate::wire::*;
use automation_types::{
    CloudCertificate, CloudConnection, CloudCredential, CloudVariable, Connection,
    ConnectionTypeSchema, Credential, Variable,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const VARIABLES: &str = "variables";
const CREDENTIALS: &str = "credentials";
const CERTIFICATES: &str = "certificates";
const CONNECTIONS: &str = "connections";
const CONNECTION_TYPES: &str = "connectionTypes";

/// Certificate contents to upload.
#[derive(Clone)]
pub struct CertificateUpload {
    /// PKCS#12 blob; sent base64-encoded.
    pub bytes: Vec<u8>,
    pub password: Option<String>,
    pub exportable: bool,
}

impl std::fmt::Debug for CertificateUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateUpload")
            .field("len", &self.bytes.len())
            .field("exportable", &self.exportable)
            .finish_non_exhaustive()
    }
}

/// REST client scoped to one automation account.
pub struct AutomationApiClient {
    client: Client,
    config: AutomationConfig,
    token: Arc<RwLock<Option<String>>>,
}

impl AutomationApiClient {
    pub fn new(config: AutomationConfig) -> CloudResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            config,
            token: Arc::new(RwLock::new(None)),
        })
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    /// Installs the bearer token sent with every request.
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn clear_token(&self) {
        *self.token.write().await = None;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    // ── Variables ──

    pub async fn list_variables(&self) -> CloudResult<Vec<CloudVariable>> {
        let items = self.list::<VariableProperties>(VARIABLES).await?;
        Ok(items.into_iter().map(CloudVariable::from).collect())
    }

    pub async fn get_variable(&self, name: &str) -> CloudResult<Option<CloudVariable>> {
        let item = self.get::<VariableProperties>(VARIABLES, name).await?;
        Ok(item.map(CloudVariable::from))
    }

    pub async fn create_or_update_variable(
        &self,
        variable: &Variable,
    ) -> CloudResult<CloudVariable> {
        let body = VariableCreate {
            value: serde_json::to_string(variable.value())?,
            is_encrypted: variable.is_encrypted(),
        };
        let name = variable.meta().name();
        let item = self.put::<_, VariableProperties>(VARIABLES, name, body).await?;
        Ok(item.into())
    }

    pub async fn delete_variable(&self, name: &str) -> CloudResult<()> {
        self.delete(VARIABLES, name).await
    }

    // ── Credentials ──

    pub async fn list_credentials(&self) -> CloudResult<Vec<CloudCredential>> {
        let items = self.list::<CredentialProperties>(CREDENTIALS).await?;
        Ok(items.into_iter().map(CloudCredential::from).collect())
    }

    pub async fn get_credential(&self, name: &str) -> CloudResult<Option<CloudCredential>> {
        let item = self.get::<CredentialProperties>(CREDENTIALS, name).await?;
        Ok(item.map(CloudCredential::from))
    }

    /// A credential without a local password is sent without one, leaving
    /// the service's copy untouched.
    pub async fn create_or_update_credential(
        &self,
        credential: &Credential,
    ) -> CloudResult<CloudCredential> {
        let body = CredentialCreate {
            user_name: credential.username().map(str::to_string),
            password: credential.password().map(str::to_string),
        };
        let name = credential.meta().name();
        let item = self.put::<_, CredentialProperties>(CREDENTIALS, name, body).await?;
        Ok(item.into())
    }

    pub async fn delete_credential(&self, name: &str) -> CloudResult<()> {
        self.delete(CREDENTIALS, name).await
    }

    // ── Certificates ──

    pub async fn list_certificates(&self) -> CloudResult<Vec<CloudCertificate>> {
        let items = self.list::<CertificateProperties>(CERTIFICATES).await?;
        Ok(items.into_iter().map(CloudCertificate::from).collect())
    }

    pub async fn get_certificate(&self, name: &str) -> CloudResult<Option<CloudCertificate>> {
        let item = self.get::<CertificateProperties>(CERTIFICATES, name).await?;
        Ok(item.map(CloudCertificate::from))
    }

    pub async fn create_or_update_certificate(
        &self,
        name: &str,
        upload: &CertificateUpload,
    ) -> CloudResult<CloudCertificate> {
        let body = CertificateCreate {
            base64_value: BASE64.encode(&upload.bytes),
            password: upload.password.clone(),
            is_exportable: upload.exportable,
        };
        let item = self.put::<_, CertificateProperties>(CERTIFICATES, name, body).await?;
        Ok(item.into())
    }

    pub async fn delete_certificate(&self, name: &str) -> CloudResult<()> {
        self.delete(CERTIFICATES, name).await
    }

    // ── Connections ──

    /// Lists connections. The list endpoint omits field values; use
    /// [`get_connection`](Self::get_connection) for those.
    pub async fn list_connections(&self) -> CloudResult<Vec<CloudConnection>> {
        let items = self.list::<ConnectionProperties>(CONNECTIONS).await?;
        Ok(items.into_iter().map(CloudConnection::from).collect())
    }

    pub async fn get_connection(&self, name: &str) -> CloudResult<Option<CloudConnection>> {
        let item = self.get::<ConnectionProperties>(CONNECTIONS, name).await?;
        Ok(item.map(CloudConnection::from))
    }

    /// Null fields are left out of the request.
    pub async fn create_or_update_connection(
        &self,
        connection: &Connection,
    ) -> CloudResult<CloudConnection> {
        let field_definition_values: BTreeMap<String, String> = connection
            .value_fields()
            .iter()
            .filter_map(|(field, value)| match value {
                Value::Null => None,
                Value::String(s) => Some((field.clone(), s.clone())),
                other => Some((field.clone(), other.to_string())),
            })
            .collect();
        let body = ConnectionCreate {
            connection_type: NameRef {
                name: connection.connection_type().to_string(),
            },
            field_definition_values,
        };
        let name = connection.meta().name();
        let item = self.put::<_, ConnectionProperties>(CONNECTIONS, name, body).await?;
        Ok(item.into())
    }

    pub async fn delete_connection(&self, name: &str) -> CloudResult<()> {
        self.delete(CONNECTIONS, name).await
    }

    // ── Connection types ──

    pub async fn list_connection_types(&self) -> CloudResult<Vec<ConnectionTypeSchema>> {
        let items = self.list::<ConnectionTypeProperties>(CONNECTION_TYPES).await?;
        Ok(items.into_iter().map(ConnectionTypeSchema::from).collect())
    }

    pub async fn get_connection_type(
        &self,
        name: &str,
    ) -> CloudResult<Option<ConnectionTypeSchema>> {
        let item = self.get::<ConnectionTypeProperties>(CONNECTION_TYPES, name).await?;
        Ok(item.map(ConnectionTypeSchema::from))
    }

    // ── Transport ──

    /// Follows `nextLink` until the collection is exhausted. Links must stay
    /// on the origin of the first request, which carries the bearer token.
    async fn list<P: DeserializeOwned>(&self, collection: &str) -> CloudResult<Vec<Resource<P>>> {
        let what = format!("GET {collection}");
        let mut url = self.collection_url(collection, None)?;
        let origin = url.origin();
        let mut items = Vec::new();
        loop {
            let resp = self.execute(self.client.get(url), &what).await?;
            let page: ListPage<Resource<P>> = read_json(resp, &what).await?;
            items.extend(page.value);
            match page.next_link.filter(|link| !link.is_empty()) {
                Some(next) => {
                    let next_url = Url::parse(&next).map_err(|e| {
                        CloudError::Config(format!("invalid nextLink {next:?}: {e}"))
                    })?;
                    if next_url.origin() != origin {
                        warn!("{what}: refusing nextLink to another origin: {next}");
                        return Err(CloudError::Config(format!(
                            "nextLink {next:?} leaves {}",
                            origin.ascii_serialization()
                        )));
                    }
                    url = next_url;
                }
                None => break,
            }
        }
        debug!("listed {} {collection}", items.len());
        Ok(items)
    }

    /// Not-found reads as `None`.
    async fn get<P: DeserializeOwned>(
        &self,
        collection: &str,
        name: &str,
    ) -> CloudResult<Option<Resource<P>>> {
        let what = format!("GET {collection}/{name}");
        let url = self.collection_url(collection, Some(name))?;
        match self.execute(self.client.get(url), &what).await {
            Ok(resp) => Ok(Some(read_json(resp, &what).await?)),
            Err(e) if e.is_not_found() => {
                debug!("{what}: not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn put<B: Serialize, P: DeserializeOwned>(
        &self,
        collection: &str,
        name: &str,
        properties: B,
    ) -> CloudResult<Resource<P>> {
        let what = format!("PUT {collection}/{name}");
        let url = self.collection_url(collection, Some(name))?;
        let body = ResourceBody {
            name: name.to_string(),
            properties,
        };
        let resp = self.execute(self.client.put(url).json(&body), &what).await?;
        let item = read_json(resp, &what).await?;
        debug!("{what}: stored");
        Ok(item)
    }

    /// Deleting something already gone succeeds.
    async fn delete(&self, collection: &str, name: &str) -> CloudResult<()> {
        let what = format!("DELETE {collection}/{name}");
        let url = self.collection_url(collection, Some(name))?;
        match self.execute(self.client.delete(url), &what).await {
            Ok(_) => {
                debug!("{what}: deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("{what}: already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn execute(&self, request: RequestBuilder, what: &str) -> CloudResult<Response> {
        let token = self
            .token
            .read()
            .await
            .clone()
            .ok_or(CloudError::AuthRequired)?;
        let resp = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(e, what))?;
        check_status(resp, what).await
    }

    fn collection_url(&self, collection: &str, name: Option<&str>) -> CloudResult<Url> {
        let mut url = Url::parse(&self.config.api_base_url)
            .map_err(|e| CloudError::Config(format!("invalid api_base_url: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| CloudError::Config("api_base_url cannot be a base URL".to_string()))?;
            segments.pop_if_empty().extend([
                "subscriptions",
                self.config.subscription_id.as_str(),
                "resourceGroups",
                self.config.resource_group.as_str(),
                "providers",
                "Microsoft.Automation",
                "automationAccounts",
                self.config.automation_account.as_str(),
                collection,
            ]);
            if let Some(name) = name {
                segments.push(name);
            }
        }
        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);
        Ok(url)
    }
}

fn transport_error(e: reqwest::Error, what: &str) -> CloudError {
    if e.is_timeout() {
        CloudError::Timeout(what.to_string())
    } else {
        CloudError::Http(e)
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response, what: &str) -> CloudResult<T> {
    let bytes = resp.bytes().await.map_err(|e| transport_error(e, what))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Maps non-success responses to errors. A 404, or an error code of
/// `NotFound` or `ResourceNotFound`, becomes [`CloudError::NotFound`].
async fn check_status(resp: Response, what: &str) -> CloudResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let (code, message) = serde_json::from_str::<ErrorBody>(&body)
        .map(ErrorBody::into_parts)
        .unwrap_or((None, None));
    let message = message.unwrap_or(body);

    let not_found_code = matches!(code.as_deref(), Some("NotFound" | "ResourceNotFound"));
    if status == StatusCode::NOT_FOUND || not_found_code {
        return Err(CloudError::NotFound(format!("{what}: {message}")));
    }

    let code = code.unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string()
    });
    debug!("{what}: {status} {code}");
    Err(CloudError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}
