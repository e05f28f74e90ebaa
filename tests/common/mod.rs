//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use contact_book_api::enrichment::AddressResolver;
use contact_book_api::export::ExportRegistry;
use contact_book_api::orchestrator::ContactOrchestrator;
use contact_book_api::repository::InMemoryContactRepository;
use contact_book_api::services::{AddressLookup, LookupError, ViaCepAddress};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Lookup double answering from a fixed table and counting calls.
///
/// Unknown codes are reported as not found.
#[derive(Default)]
pub struct StubLookup {
    answers: Mutex<HashMap<String, Result<ViaCepAddress, LookupError>>>,
    calls: AtomicUsize,
}

impl StubLookup {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stub knowing Praça da Sé (01001000) and Avenida Paulista (01310100).
    pub fn with_known_addresses() -> Arc<Self> {
        let stub = Self::new();
        stub.answer("01001000", Ok(address("Praça da Sé", "Sé", "São Paulo", "SP")));
        stub.answer(
            "01310100",
            Ok(address("Avenida Paulista", "Bela Vista", "São Paulo", "SP")),
        );
        stub
    }

    pub fn answer(&self, postal_code: &str, answer: Result<ViaCepAddress, LookupError>) {
        self.answers
            .lock()
            .unwrap()
            .insert(postal_code.to_string(), answer);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AddressLookup for StubLookup {
    async fn lookup(&self, postal_code: &str) -> Result<ViaCepAddress, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .get(postal_code)
            .cloned()
            .unwrap_or(Err(LookupError::NotFound))
    }
}

pub fn address(street: &str, neighborhood: &str, city: &str, state: &str) -> ViaCepAddress {
    ViaCepAddress {
        logradouro: Some(street.to_string()),
        bairro: Some(neighborhood.to_string()),
        localidade: Some(city.to_string()),
        uf: Some(state.to_string()),
        ..Default::default()
    }
}

/// Orchestrator over an empty in-memory repository and the default exporters.
pub fn orchestrator(lookup: Arc<StubLookup>) -> ContactOrchestrator {
    ContactOrchestrator::new(
        Arc::new(InMemoryContactRepository::new()),
        AddressResolver::new(lookup),
        Arc::new(ExportRegistry::with_defaults()),
    )
}
