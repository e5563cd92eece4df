// ========================================================================================
//
//                                PORTAL HTTP SESSION
//
// ========================================================================================

use crate::portal::entity::{
    CreateFileEntity, EntityMetadata, FileHandle, ProvenanceRecord, ResultAnnotations,
    SubmissionReceipt, SubmissionRequest,
};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const HTTP_USER_AGENT: &str = "prognos-http-client/1.0";

/// Environment variable holding the portal access token.
pub const TOKEN_ENV_VAR: &str = "PROGNOS_PORTAL_TOKEN";

/// A specialized error type for the portal session.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("portal access token not found; set the {TOKEN_ENV_VAR} environment variable")]
    MissingToken,
    #[error("invalid portal URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP transport failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("portal returned {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// An authenticated session with the remote data portal.
///
/// Constructed once and passed explicitly to every call that needs remote
/// access. All methods are synchronous; the pipeline is a sequential batch
/// and transfers are small single files.
#[derive(Debug)]
pub struct PortalClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl PortalClient {
    /// Authenticate against the portal, validating the token with a profile
    /// lookup before any transfer starts.
    pub fn login(base_url: &str) -> Result<Self, PortalError> {
        let token = env::var(TOKEN_ENV_VAR).map_err(|_| PortalError::MissingToken)?;
        let base_url =
            Url::parse(base_url).map_err(|err| PortalError::InvalidUrl(err.to_string()))?;
        let http = Client::builder().user_agent(HTTP_USER_AGENT).build()?;

        let client = Self {
            http,
            base_url,
            token,
        };
        let url = client.endpoint("userProfile")?;
        let response = client.http.get(url.clone()).bearer_auth(&client.token).send()?;
        ensure_success(&url, response.status())?;

        log::info!("Authenticated against portal at {}.", client.base_url);
        Ok(client)
    }

    /// Fetch the file behind an accession id into the cache directory,
    /// skipping the transfer when a cached copy already exists.
    pub fn get_file(&self, accession: &str, cache_dir: &Path) -> Result<PathBuf, PortalError> {
        fs::create_dir_all(cache_dir)?;

        let metadata: EntityMetadata =
            self.get_json(self.endpoint(&format!("entity/{accession}"))?)?;
        let target = cache_dir.join(&metadata.name);
        if target.exists() {
            eprintln!("> Found cached copy of {accession} ('{}'). Skipping download.", metadata.name);
            return Ok(target);
        }

        eprintln!("> Downloading {accession} ('{}')...", metadata.name);
        let url = self.endpoint(&format!("entity/{accession}/file"))?;
        let response = self.http.get(url.clone()).bearer_auth(&self.token).send()?;
        ensure_success(&url, response.status())?;
        let bytes = response.bytes()?;
        fs::write(&target, &bytes)?;

        log::debug!("Cached {} bytes for {} at '{}'.", bytes.len(), accession, target.display());
        Ok(target)
    }

    /// Upload a local file as a new entity under `parent_id`, optionally
    /// attaching annotations and a provenance record. Returns the stored
    /// entity's metadata.
    pub fn store_file(
        &self,
        path: &Path,
        name: &str,
        parent_id: &str,
        annotations: Option<&ResultAnnotations>,
        provenance: Option<&ProvenanceRecord>,
    ) -> Result<EntityMetadata, PortalError> {
        let bytes = fs::read(path)?;
        let url = self.endpoint("fileHandle")?;
        let response = self
            .http
            .post(url.clone())
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()?;
        ensure_success(&url, response.status())?;
        let handle: FileHandle = response.json()?;

        let entity: EntityMetadata = self.post_json(
            self.endpoint("entity")?,
            &CreateFileEntity {
                name: name.to_string(),
                parent_id: parent_id.to_string(),
                file_handle_id: handle.id,
            },
        )?;

        if let Some(annotations) = annotations {
            self.put_json(
                self.endpoint(&format!("entity/{}/annotations", entity.id))?,
                annotations,
            )?;
        }
        if let Some(provenance) = provenance {
            self.put_json(
                self.endpoint(&format!("entity/{}/provenance", entity.id))?,
                provenance,
            )?;
        }

        eprintln!("> Stored '{name}' as {}.", entity.id);
        Ok(entity)
    }

    /// Submit a stored entity to an evaluation queue for scoring.
    pub fn submit(
        &self,
        evaluation_id: u64,
        entity_id: &str,
    ) -> Result<SubmissionReceipt, PortalError> {
        let receipt: SubmissionReceipt = self.post_json(
            self.endpoint("evaluation/submission")?,
            &SubmissionRequest {
                evaluation_id,
                entity_id: entity_id.to_string(),
            },
        )?;
        eprintln!("> Submitted {entity_id} to evaluation queue {evaluation_id}.");
        Ok(receipt)
    }

    fn endpoint(&self, path: &str) -> Result<Url, PortalError> {
        self.base_url
            .join(path)
            .map_err(|err| PortalError::InvalidUrl(err.to_string()))
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, PortalError> {
        let response = self.http.get(url.clone()).bearer_auth(&self.token).send()?;
        ensure_success(&url, response.status())?;
        Ok(response.json()?)
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, PortalError> {
        let response = self
            .http
            .post(url.clone())
            .bearer_auth(&self.token)
            .json(body)
            .send()?;
        ensure_success(&url, response.status())?;
        Ok(response.json()?)
    }

    fn put_json<B: Serialize>(&self, url: Url, body: &B) -> Result<(), PortalError> {
        let response = self
            .http
            .put(url.clone())
            .bearer_auth(&self.token)
            .json(body)
            .send()?;
        ensure_success(&url, response.status())
    }
}

fn ensure_success(url: &Url, status: StatusCode) -> Result<(), PortalError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(PortalError::Status {
            status,
            url: url.to_string(),
        })
    }
}
