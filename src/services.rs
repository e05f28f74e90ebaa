use crate::circuit_breaker::{create_lookup_circuit_breaker, LookupCircuitBreaker};
use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

// ============ ViaCEP API Integration ============

/// Raw ViaCEP response body.
///
/// Unknown codes come back as `{"erro": true}` (older deployments send the
/// string `"true"`), so every address field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaCepAddress {
    #[serde(default)]
    pub cep: Option<String>,
    #[serde(default)]
    pub logradouro: Option<String>,
    #[serde(default)]
    pub complemento: Option<String>,
    #[serde(default)]
    pub bairro: Option<String>,
    #[serde(default)]
    pub localidade: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub erro: bool,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::String(text)) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Transport-level outcome of a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("postal code not found upstream")]
    NotFound,
    #[error("lookup timed out")]
    Timeout,
    #[error("{message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },
    #[error("failed to parse lookup response: {0}")]
    Decode(String),
}

/// External postal-code directory.
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Looks up an already-normalized 8-digit postal code.
    async fn lookup(&self, postal_code: &str) -> Result<ViaCepAddress, LookupError>;
}

/// HTTP client for the ViaCEP directory.
pub struct ViaCepClient {
    client: Client,
    base_url: String,
    breaker: LookupCircuitBreaker,
}

impl ViaCepClient {
    /// Creates a new `ViaCepClient`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the directory, e.g. `https://viacep.com.br/ws`.
    /// * `timeout` - Total request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LookupError::Transport {
                message: format!("Failed to create ViaCEP client: {}", e),
                status: None,
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            breaker: create_lookup_circuit_breaker(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, LookupError> {
        Self::new(
            config.viacep_base_url.clone(),
            Duration::from_secs(config.viacep_timeout_secs),
        )
    }

    async fn fetch(&self, postal_code: &str) -> Result<ViaCepAddress, LookupError> {
        let url = format!("{}/{}/json", self.base_url, postal_code);
        tracing::debug!("ViaCEP URL: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::Transport {
                    message: format!("ViaCEP request failed: {}", e),
                    status: e.status().map(|s| s.as_u16()),
                }
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LookupError::NotFound);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("ViaCEP returned error {}: {}", status, error_text);
            return Err(LookupError::Transport {
                message: format!("ViaCEP returned status {}", status),
                status: Some(status.as_u16()),
            });
        }

        response.json::<ViaCepAddress>().await.map_err(|e| {
            if e.is_timeout() {
                LookupError::Timeout
            } else {
                LookupError::Decode(e.to_string())
            }
        })
    }
}

#[async_trait]
impl AddressLookup for ViaCepClient {
    async fn lookup(&self, postal_code: &str) -> Result<ViaCepAddress, LookupError> {
        if !self.breaker.is_call_permitted() {
            tracing::warn!(
                "ViaCEP circuit open, rejecting lookup for postal code: {}",
                postal_code
            );
            return Err(LookupError::Transport {
                message: "ViaCEP circuit breaker is open".to_string(),
                status: None,
            });
        }

        let result = self.fetch(postal_code).await;
        match &result {
            Ok(_) | Err(LookupError::NotFound) => self.breaker.on_success(),
            Err(_) => self.breaker.on_error(),
        }
        result
    }
}
