use crate::enrichment::AddressResolver;
use crate::errors::{ContactError, ContactResult};
use crate::export::{render_with, ExportRegistry};
use crate::import::BulkImportPipeline;
use crate::models::{Contact, ContactRequest, ContactUpdateRequest, ExportedFile, Page, PageRequest};
use crate::repository::ContactRepository;
use crate::validation::{ContactValidator, PostalCodeChange};
use std::io::Read;
use std::sync::Arc;

/// Contact workflows: validation, address enrichment, persistence, import and export.
pub struct ContactOrchestrator {
    repository: Arc<dyn ContactRepository>,
    resolver: AddressResolver,
    exporters: Arc<ExportRegistry>,
    importer: BulkImportPipeline,
    validator: ContactValidator,
}

impl ContactOrchestrator {
    pub fn new(
        repository: Arc<dyn ContactRepository>,
        resolver: AddressResolver,
        exporters: Arc<ExportRegistry>,
    ) -> Self {
        Self {
            repository,
            importer: BulkImportPipeline::new(resolver.clone()),
            resolver,
            exporters,
            validator: ContactValidator::new(),
        }
    }

    pub fn exporters(&self) -> &ExportRegistry {
        &self.exporters
    }

    /// Validates, enriches and stores a new contact.
    ///
    /// Nothing is persisted when validation or address resolution fails.
    pub async fn create(&self, request: &ContactRequest) -> ContactResult<Contact> {
        tracing::info!(
            "Saving contact with name: {}",
            request.name.as_deref().unwrap_or_default()
        );

        let mut contact = self.validator.validate_create(request)?;
        self.resolver.enrich(&mut contact).await?;

        let saved = self.repository.save(contact).await?;
        tracing::info!("Contact saved successfully with ID: {:?}", saved.id);
        Ok(saved)
    }

    /// Applies the present fields of `request` to contact `id`.
    ///
    /// The address is resolved again only when the postal code actually changes.
    pub async fn update(&self, id: i64, request: &ContactUpdateRequest) -> ContactResult<Contact> {
        tracing::info!("Updating contact with ID: {}", id);

        let patch = self.validator.validate_update(request)?;
        let mut contact = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ContactError::not_found_by_id(id))?;

        let previous_postal_code = contact.postal_code.clone();
        patch.apply_fields(&mut contact);

        match patch.postal_code {
            PostalCodeChange::Set(code) if previous_postal_code.as_deref() != Some(code.as_str()) => {
                tracing::info!(
                    "Postal code changed from {:?} to {}, updating address",
                    previous_postal_code,
                    code
                );
                contact.postal_code = Some(code);
                self.resolver.enrich(&mut contact).await?;
            }
            PostalCodeChange::Clear => {
                tracing::info!("Postal code cleared for contact ID: {}", id);
                contact.postal_code = None;
                contact.clear_address();
            }
            PostalCodeChange::Set(_) | PostalCodeChange::Unchanged => {}
        }

        let saved = self.repository.save(contact).await?;
        tracing::info!("Contact updated successfully with ID: {}", id);
        Ok(saved)
    }

    pub async fn delete(&self, id: i64) -> ContactResult<()> {
        tracing::info!("Deleting contact with ID: {}", id);

        if !self.repository.exists_by_id(id).await? {
            return Err(ContactError::not_found_by_id(id));
        }

        self.repository.delete_by_id(id).await?;
        tracing::info!("Contact deleted successfully with ID: {}", id);
        Ok(())
    }

    pub async fn find_by_id(&self, id: i64) -> ContactResult<Contact> {
        tracing::debug!("Finding contact by ID: {}", id);
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ContactError::not_found_by_id(id))
    }

    /// Contacts whose name contains `name`; no match is an error.
    pub async fn find_by_name(&self, name: &str) -> ContactResult<Vec<Contact>> {
        tracing::debug!("Finding contacts by name: {}", name);
        let contacts = self.repository.find_by_name(name).await?;
        if contacts.is_empty() {
            return Err(ContactError::not_found_by_name(name));
        }
        Ok(contacts)
    }

    pub async fn find_all(&self, request: &PageRequest) -> ContactResult<Page<Contact>> {
        tracing::debug!("Finding all contacts, page {} size {}", request.page, request.size);
        self.repository.find_page(request).await
    }

    /// Contacts whose name, city or neighborhood contains `term`; no match is an empty page.
    pub async fn find_by_search_term(
        &self,
        term: &str,
        request: &PageRequest,
    ) -> ContactResult<Page<Contact>> {
        tracing::debug!("Searching contacts by term: {}", term);
        self.repository.search(term, request).await
    }

    /// Imports a CSV stream and stores the accepted contacts in one batch.
    pub async fn import_contacts<R: Read>(&self, reader: R) -> ContactResult<Vec<Contact>> {
        tracing::info!("Starting bulk contact import");

        let contacts = self.importer.import(reader).await?;
        let saved = self.repository.save_all(contacts).await?;

        tracing::info!("Imported {} contacts", saved.len());
        Ok(saved)
    }

    /// Renders every contact, in id order, in the requested format.
    pub async fn export(&self, format: &str) -> ContactResult<ExportedFile> {
        tracing::info!("Exporting contacts as {}", format);

        let handler = self.exporters.select(format)?;
        let contacts = self.repository.find_all().await?;
        render_with(handler.as_ref(), &contacts)
    }
}
