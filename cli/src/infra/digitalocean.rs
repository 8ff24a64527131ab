//! DigitalOcean implementation of the `CloudProvider` port.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::ports::{CloudProvider, InstanceRequest, ProviderKey};
use crate::domain::config::ProviderConfig;
use crate::domain::{InstanceHandle, InstanceStatus};

/// Page size for list endpoints; one page comfortably holds an account's keys.
const PAGE_SIZE: u32 = 200;

/// REST client for the DigitalOcean v2 API.
pub struct DigitalOceanClient {
    client: Client,
    base_url: String,
    token: String,
}

impl DigitalOceanClient {
    #[must_use]
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
    }

    async fn send(&self, what: &str, request: RequestBuilder) -> Result<Response> {
        tracing::debug!(what, "calling provider API");
        let response = request
            .send()
            .await
            .with_context(|| format!("{what}: request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{what}: provider returned {status}: {}", body.trim());
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, what: &str, request: RequestBuilder) -> Result<T> {
        self.send(what, request)
            .await?
            .json()
            .await
            .with_context(|| format!("{what}: unexpected response body"))
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CreateKeyBody<'a> {
    name: &'a str,
    public_key: &'a str,
}

#[derive(Deserialize)]
struct KeyEnvelope {
    ssh_key: WireKey,
}

#[derive(Deserialize)]
struct KeysEnvelope {
    ssh_keys: Vec<WireKey>,
}

#[derive(Deserialize)]
struct WireKey {
    id: u64,
    name: String,
    #[serde(default)]
    fingerprint: String,
}

impl From<WireKey> for ProviderKey {
    fn from(k: WireKey) -> Self {
        Self {
            id: k.id,
            name: k.name,
            fingerprint: k.fingerprint,
        }
    }
}

#[derive(Serialize)]
struct CreateDropletBody<'a> {
    name: &'a str,
    region: &'a str,
    size: &'a str,
    image: &'a str,
    ssh_keys: &'a [u64],
    tags: &'a [String],
    monitoring: bool,
    ipv6: bool,
}

#[derive(Deserialize)]
struct DropletEnvelope {
    droplet: WireDroplet,
}

#[derive(Deserialize)]
struct WireDroplet {
    id: u64,
    name: String,
    status: InstanceStatus,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    networks: WireNetworks,
}

#[derive(Deserialize, Default)]
struct WireNetworks {
    #[serde(default)]
    v4: Vec<WireAddress>,
}

#[derive(Deserialize)]
struct WireAddress {
    ip_address: String,
    #[serde(rename = "type")]
    kind: String,
}

impl From<WireDroplet> for InstanceHandle {
    fn from(d: WireDroplet) -> Self {
        let address = d
            .networks
            .v4
            .into_iter()
            .find(|a| a.kind == "public")
            .map(|a| a.ip_address);
        Self {
            id: d.id,
            name: d.name,
            address,
            status: d.status,
            created_at: d.created_at,
        }
    }
}

// ── Port implementation ──────────────────────────────────────────────────────

impl CloudProvider for DigitalOceanClient {
    async fn register_key(&self, name: &str, public_key: &str) -> Result<ProviderKey> {
        let body = CreateKeyBody { name, public_key };
        let envelope: KeyEnvelope = self
            .send_json(
                "registering ssh key",
                self.request(Method::POST, "/account/keys").json(&body),
            )
            .await?;
        Ok(envelope.ssh_key.into())
    }

    async fn find_keys(&self, name: &str) -> Result<Vec<ProviderKey>> {
        let envelope: KeysEnvelope = self
            .send_json(
                "listing ssh keys",
                self.request(Method::GET, "/account/keys")
                    .query(&[("per_page", PAGE_SIZE)]),
            )
            .await?;
        Ok(envelope
            .ssh_keys
            .into_iter()
            .filter(|k| k.name == name)
            .map(ProviderKey::from)
            .collect())
    }

    async fn create_instance(&self, request: &InstanceRequest<'_>) -> Result<InstanceHandle> {
        let shape = request.shape;
        let body = CreateDropletBody {
            name: &shape.name,
            region: &shape.region,
            size: &shape.size,
            image: &shape.image,
            ssh_keys: &request.key_ids,
            tags: &shape.tags,
            monitoring: shape.monitoring,
            ipv6: shape.ipv6,
        };
        let envelope: DropletEnvelope = self
            .send_json(
                "creating droplet",
                self.request(Method::POST, "/droplets").json(&body),
            )
            .await?;
        Ok(envelope.droplet.into())
    }

    async fn instance(&self, id: u64) -> Result<InstanceHandle> {
        let envelope: DropletEnvelope = self
            .send_json(
                "fetching droplet",
                self.request(Method::GET, &format!("/droplets/{id}")),
            )
            .await?;
        Ok(envelope.droplet.into())
    }

    async fn destroy_instance(&self, id: u64) -> Result<()> {
        self.send(
            "destroying droplet",
            self.request(Method::DELETE, &format!("/droplets/{id}")),
        )
        .await?;
        Ok(())
    }
}
