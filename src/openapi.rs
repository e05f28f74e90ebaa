use crate::errors::{ErrorBody, FieldError, FieldRule};
use crate::handlers;
use crate::models::{AddressInfo, ContactPage, ContactRequest, ContactResponse, ContactUpdateRequest};
use utoipa::OpenApi;

/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Contact Book API",
        description = "Contact management with address lookup by Brazilian postal code (CEP), bulk CSV import and XLSX/PDF/CSV export."
    ),
    paths(
        handlers::create_contact,
        handlers::update_contact,
        handlers::delete_contact,
        handlers::get_contact,
        handlers::find_contacts_by_name,
        handlers::list_contacts,
        handlers::import_contacts,
        handlers::export_contacts,
    ),
    components(schemas(
        ContactRequest,
        ContactUpdateRequest,
        ContactResponse,
        ContactPage,
        AddressInfo,
        ErrorBody,
        FieldError,
        FieldRule,
    )),
    tags((name = "contacts", description = "Contact management"))
)]
pub struct ApiDoc;
