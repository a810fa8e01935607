//! DigitalOcean API v2 client: implements the `RemoteProvider` port.
//!
//! Only the account key and droplet endpoints are used. Responses are
//! decoded into private DTOs and mapped onto the provider-neutral domain
//! records, so nothing outside this file knows the wire format.

use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::ports::RemoteProvider;
use crate::domain::{
    CredentialRequest, InstanceRequest, InstanceStatus, ProviderError, RemoteCredential,
    RemoteInstance,
};

/// Page size requested from list endpoints.
const PER_PAGE: u32 = 200;
/// Upper bound on pages followed for a single listing.
const MAX_PAGES: usize = 50;
/// Tag attached to every droplet this tool creates.
pub const DROPLET_TAG: &str = "dosockstunnel";

// ── Wire format ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CreateKeyBody<'a> {
    name: &'a str,
    public_key: &'a str,
}

/// Droplets accept key ids or fingerprints in `ssh_keys`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
enum KeyRef<'a> {
    Id(u64),
    Fingerprint(&'a str),
}

impl<'a> KeyRef<'a> {
    fn parse(raw: &'a str) -> Self {
        raw.parse().map_or(Self::Fingerprint(raw), Self::Id)
    }
}

#[derive(Debug, Serialize)]
struct CreateDropletBody<'a> {
    name: &'a str,
    region: &'a str,
    size: &'a str,
    image: &'a str,
    ssh_keys: Vec<KeyRef<'a>>,
    backups: bool,
    ipv6: bool,
    monitoring: bool,
    tags: [&'a str; 1],
}

impl<'a> From<&'a InstanceRequest> for CreateDropletBody<'a> {
    fn from(req: &'a InstanceRequest) -> Self {
        Self {
            name: &req.name,
            region: &req.region,
            size: &req.size,
            image: &req.image,
            ssh_keys: vec![KeyRef::parse(&req.credential_id)],
            backups: req.backups_enabled,
            ipv6: false,
            monitoring: false,
            tags: [DROPLET_TAG],
        }
    }
}

#[derive(Debug, Deserialize)]
struct KeyDto {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct KeyEnvelope {
    ssh_key: KeyDto,
}

#[derive(Debug, Deserialize)]
struct KeysPage {
    #[serde(default)]
    ssh_keys: Vec<KeyDto>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Deserialize)]
struct NetworkV4 {
    ip_address: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Default, Deserialize)]
struct Networks {
    #[serde(default)]
    v4: Vec<NetworkV4>,
}

#[derive(Debug, Deserialize)]
struct DropletDto {
    id: u64,
    name: String,
    status: String,
    #[serde(default)]
    networks: Networks,
}

#[derive(Debug, Deserialize)]
struct DropletEnvelope {
    droplet: DropletDto,
}

#[derive(Debug, Deserialize)]
struct DropletsPage {
    #[serde(default)]
    droplets: Vec<DropletDto>,
    #[serde(default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    #[serde(default)]
    pages: Option<Pages>,
}

#[derive(Debug, Default, Deserialize)]
struct Pages {
    #[serde(default)]
    next: Option<String>,
}

impl Links {
    fn next(&self) -> Option<&str> {
        self.pages.as_ref().and_then(|p| p.next.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl From<KeyDto> for RemoteCredential {
    fn from(dto: KeyDto) -> Self {
        Self {
            id: dto.id.to_string(),
            name: dto.name,
        }
    }
}

impl From<DropletDto> for RemoteInstance {
    fn from(dto: DropletDto) -> Self {
        Self {
            id: dto.id.to_string(),
            name: dto.name,
            status: InstanceStatus::parse(&dto.status),
            ipv4: dto
                .networks
                .v4
                .into_iter()
                .filter(|n| n.kind == "public")
                .map(|n| n.ip_address)
                .collect(),
        }
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Bearer-token client for `https://api.digitalocean.com/v2`.
pub struct DigitalOceanClient {
    http: Client,
    base_url: String,
    token: String,
}

impl DigitalOceanClient {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dosockstunnel/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{path}", self.base_url)
    }

    async fn send(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<Response, ProviderError> {
        tracing::debug!(operation, "provider request");
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ProviderError::Request {
                operation: operation.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if is_rate_limited(status) {
            tracing::warn!(operation, "rate limited by provider");
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Status {
            operation: operation.to_string(),
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = self.send(operation, request).await?;
        let body = response.bytes().await.map_err(|e| ProviderError::Request {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;
        decode(operation, &body)
    }

    /// Issue a DELETE; a 404 means the resource is already gone.
    async fn delete(&self, operation: &str, path: &str) -> Result<()> {
        match self.send(operation, self.http.delete(self.url(path))).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::warn!(operation, "already deleted");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl RemoteProvider for DigitalOceanClient {
    async fn create_credential(&self, request: &CredentialRequest) -> Result<String> {
        let body = CreateKeyBody {
            name: &request.name,
            public_key: &request.public_key,
        };
        let created: KeyEnvelope = self
            .fetch(
                "create ssh key",
                self.http.post(self.url("account/keys")).json(&body),
            )
            .await?;
        Ok(created.ssh_key.id.to_string())
    }

    async fn list_credentials(&self) -> Result<Vec<RemoteCredential>> {
        let mut url = format!("{}?per_page={PER_PAGE}", self.url("account/keys"));
        let mut keys = Vec::new();
        for _ in 0..MAX_PAGES {
            let page: KeysPage = self.fetch("list ssh keys", self.http.get(&url)).await?;
            keys.extend(page.ssh_keys.into_iter().map(RemoteCredential::from));
            match page.links.next() {
                Some(next) => url = next.to_string(),
                None => return Ok(keys),
            }
        }
        tracing::warn!(pages = MAX_PAGES, "ssh key listing truncated");
        Ok(keys)
    }

    async fn destroy_credential(&self, id: &str) -> Result<()> {
        self.delete("delete ssh key", &format!("account/keys/{id}"))
            .await
    }

    async fn create_instance(&self, request: &InstanceRequest) -> Result<String> {
        let created: DropletEnvelope = self
            .fetch(
                "create droplet",
                self.http
                    .post(self.url("droplets"))
                    .json(&CreateDropletBody::from(request)),
            )
            .await?;
        Ok(created.droplet.id.to_string())
    }

    async fn list_instances(&self) -> Result<Vec<RemoteInstance>> {
        let mut url = format!("{}?per_page={PER_PAGE}", self.url("droplets"));
        let mut droplets = Vec::new();
        for _ in 0..MAX_PAGES {
            let page: DropletsPage = self.fetch("list droplets", self.http.get(&url)).await?;
            droplets.extend(page.droplets.into_iter().map(RemoteInstance::from));
            match page.links.next() {
                Some(next) => url = next.to_string(),
                None => return Ok(droplets),
            }
        }
        tracing::warn!(pages = MAX_PAGES, "droplet listing truncated");
        Ok(droplets)
    }

    async fn destroy_instance(&self, id: &str) -> Result<()> {
        self.delete("destroy droplet", &format!("droplets/{id}"))
            .await
    }
}

fn decode<T: DeserializeOwned>(operation: &str, body: &[u8]) -> Result<T, ProviderError> {
    serde_json::from_slice(body).map_err(|e| ProviderError::UnexpectedResponse {
        operation: operation.to_string(),
        message: e.to_string(),
    })
}

/// The API's `message` field, or the raw body when it is not JSON.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}

fn is_rate_limited(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
}
