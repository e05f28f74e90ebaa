//! Contact Book API Library
//!
//! Contact management with address enrichment by Brazilian postal code (CEP),
//! tolerant CSV bulk import and multi-format export.
//!
//! # Modules
//!
//! - `circuit_breaker`: Circuit breaker guarding the postal-code lookups.
//! - `config`: Configuration management.
//! - `db`: Database connection and schema.
//! - `db_storage`: PostgreSQL contact repository.
//! - `enrichment`: Postal code to address resolution.
//! - `errors`: Error taxonomy and HTTP error bodies.
//! - `export`: Export format handlers and their registry.
//! - `handlers`: HTTP request handlers and router.
//! - `import`: CSV bulk import pipeline.
//! - `models`: Core data models.
//! - `openapi`: OpenAPI document.
//! - `orchestrator`: Contact workflows.
//! - `repository`: Repository trait and in-memory implementation.
//! - `services`: ViaCEP client.
//! - `validation`: Field normalization and validation.

pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod enrichment;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod import;
pub mod models;
pub mod openapi;
pub mod orchestrator;
pub mod repository;
pub mod services;
pub mod validation;
