//! HubSpot CRM v3 client.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Serialize;

use crate::algo::payload::{PropertyDefinition, PropertyOption, PropertyUpdate};
use crate::crm::{CrmWriter, ObjectKind};
use crate::error::{Error, Result};

const HUBSPOT_BASE_URL: &str = "https://api.hubapi.com";
const USER_AGENT: &str = concat!("nu_plugin_sectors/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding the private-app access token.
pub const TOKEN_ENV: &str = "HUBSPOT_TOKEN";

pub struct HubSpotClient {
    http_client: Client,
    base_url: String,
    token: String,
}

#[derive(Serialize)]
struct BatchInput<'a> {
    inputs: &'a [PropertyUpdate],
}

#[derive(Serialize)]
struct OptionsPatch<'a> {
    options: &'a [PropertyOption],
}

impl HubSpotClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, HUBSPOT_BASE_URL)
    }

    /// Point the client at another host (sandbox portals, local mocks).
    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Build from `$HUBSPOT_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| Error::InvalidInput(format!("{TOKEN_ENV} is not set")))?;
        Self::new(token)
    }

    fn check(kind: ObjectKind, response: reqwest::Result<Response>) -> Result<Response> {
        let response = response.map_err(|e| Error::ExternalWrite {
            kind: kind.api_path().into(),
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            message: e.to_string(),
        })?;
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response.text().unwrap_or_default();
        Err(Error::ExternalWrite {
            kind: kind.api_path().into(),
            status,
            message,
        })
    }
}

impl CrmWriter for HubSpotClient {
    fn write_property_batch(&mut self, kind: ObjectKind, updates: &[PropertyUpdate]) -> Result<()> {
        let url = format!("{}/crm/v3/objects/{}/batch/update", self.base_url, kind.api_path());
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&BatchInput { inputs: updates })
            .send();
        Self::check(kind, response)?;
        Ok(())
    }

    /// Create the property; if it already exists, replace its options.
    fn register_property_options(&mut self, kind: ObjectKind, definition: &PropertyDefinition) -> Result<()> {
        let url = format!("{}/crm/v3/properties/{}", self.base_url, kind.api_path());
        let created = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(definition)
            .send();

        if let Ok(resp) = &created {
            if resp.status() == StatusCode::CONFLICT {
                tracing::info!(property = %definition.name, "property exists, updating options");
                let patch_url = format!("{url}/{}", definition.name);
                let patched = self
                    .http_client
                    .patch(&patch_url)
                    .bearer_auth(&self.token)
                    .json(&OptionsPatch {
                        options: &definition.options,
                    })
                    .send();
                Self::check(kind, patched)?;
                return Ok(());
            }
        }
        Self::check(kind, created)?;
        tracing::info!(property = %definition.name, options = definition.options.len(), "registered property");
        Ok(())
    }
}
