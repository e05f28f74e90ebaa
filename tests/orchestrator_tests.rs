/// Contact workflow tests against the in-memory repository and a stub lookup.
mod common;

use common::{orchestrator, StubLookup};
use contact_book_api::errors::{ContactError, ErrorKind, FieldRule};
use contact_book_api::models::{ContactRequest, ContactUpdateRequest, PageRequest, SortDirection, SortField};
use contact_book_api::services::LookupError;

fn request(name: &str, phone: &str, cep: &str, number: i32) -> ContactRequest {
    ContactRequest {
        name: Some(name.to_string()),
        phone: Some(phone.to_string()),
        postal_code: Some(cep.to_string()),
        street_number: Some(number),
    }
}

#[tokio::test]
async fn test_create_populates_full_address() {
    let lookup = StubLookup::with_known_addresses();
    let contacts = orchestrator(lookup.clone());

    let created = contacts
        .create(&request("João da Silva", "(11) 99999-8888", "01001-000", 123))
        .await
        .unwrap();

    assert!(created.id.is_some());
    assert_eq!(created.phone, "11999998888");
    assert_eq!(created.postal_code.as_deref(), Some("01001000"));
    assert_eq!(created.street(), Some("Praça da Sé"));
    assert_eq!(created.neighborhood(), Some("Sé"));
    assert_eq!(created.city(), Some("São Paulo"));
    assert_eq!(created.state(), Some("SP"));
    assert_eq!(lookup.calls(), 1);
}

#[tokio::test]
async fn test_create_validation_errors_skip_lookup() {
    let lookup = StubLookup::with_known_addresses();
    let contacts = orchestrator(lookup.clone());

    let err = contacts
        .create(&request("", "", "01001000", 10))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
    let fields: Vec<_> = err.field_errors().iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["name", "phone"]);
    assert!(err.field_errors().iter().all(|e| e.rule == FieldRule::Required));
    assert_eq!(lookup.calls(), 0);
}

#[tokio::test]
async fn test_create_with_unknown_postal_code_persists_nothing() {
    let lookup = StubLookup::with_known_addresses();
    let contacts = orchestrator(lookup.clone());

    let err = contacts
        .create(&request("Maria", "11988887777", "00000000", 1))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ContactError::AddressNotFound {
            postal_code: "00000000".to_string()
        }
    );
    let page = contacts.find_all(&PageRequest::default()).await.unwrap();
    assert_eq!(page.total_elements, 0);
}

#[tokio::test]
async fn test_create_with_upstream_timeout_is_service_unavailable() {
    let lookup = StubLookup::new();
    lookup.answer("01001000", Err(LookupError::Timeout));
    let contacts = orchestrator(lookup);

    let err = contacts
        .create(&request("Maria", "11988887777", "01001000", 1))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AddressServiceUnavailable);
}

#[tokio::test]
async fn test_update_with_same_postal_code_keeps_address_without_lookup() {
    let lookup = StubLookup::with_known_addresses();
    let contacts = orchestrator(lookup.clone());
    let created = contacts
        .create(&request("Maria", "11988887777", "01001000", 1))
        .await
        .unwrap();

    let updated = contacts
        .update(
            created.id.unwrap(),
            &ContactUpdateRequest {
                name: Some("Maria Souza".to_string()),
                postal_code: Some("01001-000".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Maria Souza");
    assert_eq!(updated.address, created.address);
    assert_eq!(lookup.calls(), 1);
}

#[tokio::test]
async fn test_update_with_new_postal_code_resolves_again() {
    let lookup = StubLookup::with_known_addresses();
    let contacts = orchestrator(lookup.clone());
    let created = contacts
        .create(&request("Maria", "11988887777", "01001000", 1))
        .await
        .unwrap();

    let updated = contacts
        .update(
            created.id.unwrap(),
            &ContactUpdateRequest {
                postal_code: Some("01310-100".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.street(), Some("Avenida Paulista"));
    assert_eq!(updated.neighborhood(), Some("Bela Vista"));
    assert_eq!(lookup.calls(), 2);
}

#[tokio::test]
async fn test_update_clearing_postal_code_clears_address() {
    let lookup = StubLookup::with_known_addresses();
    let contacts = orchestrator(lookup.clone());
    let created = contacts
        .create(&request("Maria", "11988887777", "01001000", 1))
        .await
        .unwrap();

    let updated = contacts
        .update(
            created.id.unwrap(),
            &ContactUpdateRequest {
                postal_code: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.postal_code, None);
    assert_eq!(updated.street(), None);
    assert_eq!(updated.neighborhood(), None);
    assert_eq!(updated.city(), None);
    assert_eq!(updated.state(), None);
    assert_eq!(lookup.calls(), 1);
}

#[tokio::test]
async fn test_update_validates_before_lookup_by_id() {
    let contacts = orchestrator(StubLookup::with_known_addresses());

    let err = contacts
        .update(
            999,
            &ContactUpdateRequest {
                phone: Some("123".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);

    let err = contacts
        .update(999, &ContactUpdateRequest::default())
        .await
        .unwrap_err();
    assert_eq!(err, ContactError::not_found_by_id(999));
}

#[tokio::test]
async fn test_failed_resolution_on_update_keeps_stored_contact() {
    let lookup = StubLookup::with_known_addresses();
    let contacts = orchestrator(lookup);
    let created = contacts
        .create(&request("Maria", "11988887777", "01001000", 1))
        .await
        .unwrap();
    let id = created.id.unwrap();

    let err = contacts
        .update(
            id,
            &ContactUpdateRequest {
                name: Some("Renamed".to_string()),
                postal_code: Some("99999999".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AddressNotFound);

    let stored = contacts.find_by_id(id).await.unwrap();
    assert_eq!(stored, created);
}

#[tokio::test]
async fn test_delete_missing_contact_is_not_found() {
    let contacts = orchestrator(StubLookup::with_known_addresses());
    let created = contacts
        .create(&request("Maria", "11988887777", "01001000", 1))
        .await
        .unwrap();
    let id = created.id.unwrap();

    contacts.delete(id).await.unwrap();
    assert_eq!(
        contacts.delete(id).await.unwrap_err(),
        ContactError::not_found_by_id(id)
    );
    assert_eq!(
        contacts.find_by_id(id).await.unwrap_err().kind(),
        ErrorKind::ContactNotFound
    );
}

#[tokio::test]
async fn test_find_by_name_fails_but_search_returns_empty_page() {
    let contacts = orchestrator(StubLookup::with_known_addresses());
    contacts
        .create(&request("Maria", "11988887777", "01001000", 1))
        .await
        .unwrap();

    let err = contacts.find_by_name("Ghost").await.unwrap_err();
    assert_eq!(err, ContactError::not_found_by_name("Ghost"));

    let page = contacts
        .find_by_search_term("Ghost", &PageRequest::default())
        .await
        .unwrap();
    assert!(page.is_empty());
    assert_eq!(page.total_elements, 0);

    let by_city = contacts
        .find_by_search_term("são paulo", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(by_city.total_elements, 1);
}

#[tokio::test]
async fn test_find_all_pages_and_sorts() {
    let contacts = orchestrator(StubLookup::with_known_addresses());
    for (name, cep) in [("Carla", "01001000"), ("Ana", "01310100"), ("Bruno", "01001000")] {
        contacts
            .create(&request(name, "11988887777", cep, 1))
            .await
            .unwrap();
    }

    let request = PageRequest::new(0, 2)
        .unwrap()
        .sorted_by(SortField::Name, SortDirection::Desc);
    let page = contacts.find_all(&request).await.unwrap();

    let names: Vec<_> = page.content.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Carla", "Bruno"]);
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.total_pages, 2);
}

#[tokio::test]
async fn test_import_keeps_order_and_drops_malformed_lines() {
    let lookup = StubLookup::with_known_addresses();
    let contacts = orchestrator(lookup.clone());
    let csv = "Name,Phone,PostalCode,Number\n\
               John,11999998888,01001000,123\n\
               Bad,not-a-number\n\
               Jane,11988887777,01001000,45";

    let imported = contacts.import_contacts(csv.as_bytes()).await.unwrap();

    let names: Vec<_> = imported.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["John", "Jane"]);
    assert!(imported.iter().all(|c| c.id.is_some()));
    assert!(imported.iter().all(|c| c.street() == Some("Praça da Sé")));
    assert_eq!(lookup.calls(), 2);
}

#[tokio::test]
async fn test_import_swallows_enrichment_failures() {
    let contacts = orchestrator(StubLookup::new());
    let csv = "name,phone,cep,number\nJohn,11999998888,12345-678,1\n";

    let imported = contacts.import_contacts(csv.as_bytes()).await.unwrap();

    assert_eq!(imported.len(), 1);
    assert_eq!(imported[0].postal_code.as_deref(), Some("12345678"));
    assert!(imported[0].address.is_none());
}

#[tokio::test]
async fn test_import_stores_digits_only_phone_and_postal_code() {
    let lookup = StubLookup::with_known_addresses();
    let contacts = orchestrator(lookup.clone());
    let csv = "name,phone,cep,number\n\
               John,(11) 99999-8888,01001 000,123\n\
               \"Broken,1\n\
               Zero,11988887777,01001000,0\n\
               Jane,11988887777,01310-100,45\n";

    let imported = contacts.import_contacts(csv.as_bytes()).await.unwrap();

    let names: Vec<_> = imported.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["John", "Jane"]);
    assert_eq!(imported[0].phone, "11999998888");
    assert_eq!(imported[0].postal_code.as_deref(), Some("01001000"));
    assert_eq!(imported[0].street(), Some("Praça da Sé"));
    assert_eq!(imported[1].postal_code.as_deref(), Some("01310100"));
    assert_eq!(lookup.calls(), 2);

    let stored = contacts.find_by_id(imported[0].id.unwrap()).await.unwrap();
    assert_eq!(stored.phone, "11999998888");
}

#[tokio::test]
async fn test_export_selects_format_before_loading() {
    let contacts = orchestrator(StubLookup::with_known_addresses());
    contacts
        .create(&request("Maria", "11988887777", "01001000", 1))
        .await
        .unwrap();

    let xlsx = contacts.export("XLSX").await.unwrap();
    assert_eq!(xlsx.filename, "contacts.xlsx");
    assert_eq!(&xlsx.data[..2], b"PK");

    let pdf = contacts.export("pdf").await.unwrap();
    assert_eq!(pdf.content_type, "application/pdf");
    assert_eq!(&pdf.data[..4], b"%PDF");

    let err = contacts.export("unknown").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedExportFormat);
}
