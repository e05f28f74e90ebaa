/// Address enrichment shared by the contact workflows and the bulk importer.
///
/// 1. Validate and normalize the postal code locally
/// 2. Query the external directory once (no retries, no caching)
/// 3. Classify the outcome into [`AddressError`]
/// 4. Copy the resolved bundle into the contact
use crate::errors::AddressError;
use crate::models::{AddressInfo, Contact};
use crate::services::{AddressLookup, LookupError, ViaCepAddress};
use crate::validation::normalize_postal_code;
use std::sync::Arc;

/// Resolves postal codes into [`AddressInfo`] values.
#[derive(Clone)]
pub struct AddressResolver {
    lookup: Arc<dyn AddressLookup>,
}

impl AddressResolver {
    pub fn new(lookup: Arc<dyn AddressLookup>) -> Self {
        Self { lookup }
    }

    /// Resolves a postal code, formatted or not.
    pub async fn resolve(&self, postal_code: &str) -> Result<AddressInfo, AddressError> {
        tracing::info!("Fetching address for postal code: {}", postal_code);

        if postal_code.trim().is_empty() {
            return Err(AddressError::InvalidInput(
                "Postal code cannot be null or empty".to_string(),
            ));
        }

        let clean = normalize_postal_code(postal_code).ok_or_else(|| {
            AddressError::InvalidInput("Postal code must contain exactly 8 digits".to_string())
        })?;

        match self.lookup.lookup(&clean).await {
            Ok(response) => match into_address(response) {
                Some(address) => {
                    tracing::info!("Address found successfully for postal code: {}", clean);
                    Ok(address)
                }
                None => {
                    tracing::warn!("Postal code not found or empty response: {}", clean);
                    Err(AddressError::NotFound { postal_code: clean })
                }
            },
            Err(LookupError::NotFound) => {
                tracing::warn!("Postal code not found upstream: {}", clean);
                Err(AddressError::NotFound { postal_code: clean })
            }
            Err(LookupError::Timeout) => {
                tracing::error!("Postal code lookup timed out for: {}", clean);
                Err(AddressError::ServiceUnavailable {
                    message: "Postal code lookup timed out".to_string(),
                    status: None,
                })
            }
            Err(LookupError::Transport { message, status }) => {
                tracing::error!(
                    "External service error for postal code: {}, status: {:?}",
                    clean,
                    status
                );
                Err(AddressError::ServiceUnavailable { message, status })
            }
            Err(LookupError::Decode(message)) => {
                tracing::error!(
                    "Unexpected lookup response for postal code {}: {}",
                    clean,
                    message
                );
                Err(AddressError::ServiceUnavailable {
                    message: format!("Unexpected response from postal code service: {}", message),
                    status: None,
                })
            }
        }
    }

    /// Resolves the contact's postal code, if it has one, and stores the address.
    ///
    /// A contact without a postal code is left untouched and no lookup is made.
    pub async fn enrich(&self, contact: &mut Contact) -> Result<(), AddressError> {
        let Some(code) = contact.postal_code().map(str::to_owned) else {
            return Ok(());
        };

        match self.resolve(&code).await {
            Ok(address) => {
                contact.set_address(address);
                Ok(())
            }
            Err(err) => {
                tracing::warn!("Could not populate address for postal code {}: {}", code, err);
                Err(err)
            }
        }
    }
}

/// `None` when the body is flagged as not found or carries no street.
fn into_address(response: ViaCepAddress) -> Option<AddressInfo> {
    if response.erro {
        return None;
    }

    let street = response
        .logradouro
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    Some(AddressInfo {
        street,
        neighborhood: response.bairro.unwrap_or_default(),
        city: response.localidade.unwrap_or_default(),
        state: response.uf.unwrap_or_default(),
    })
}
