use crate::config::Config;
use crate::errors::{AppError, ErrorBody};
use crate::models::*;
use crate::openapi::ApiDoc;
use crate::orchestrator::ContactOrchestrator;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use utoipa::{IntoParams, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Contact workflows.
    pub contacts: Arc<ContactOrchestrator>,
    /// Application configuration.
    pub config: Config,
}

/// JSON body extractor whose rejection is rendered as an [`AppError`].
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query parameters of the contact listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    /// Zero-based page index.
    pub page: Option<u32>,
    /// Page size, 1 to 2000.
    pub size: Option<u32>,
    /// Sort field (`name`, `city`, `postalCode`...).
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_dir: Option<String>,
    /// Matches name, city or neighborhood.
    pub search: Option<String>,
}

impl ListParams {
    fn page_request(&self) -> Result<PageRequest, AppError> {
        let sort = SortField::parse(self.sort_by.as_deref().unwrap_or("name"))?;
        let direction = SortDirection::parse(self.sort_dir.as_deref().unwrap_or("asc"));
        let request = PageRequest::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(PageRequest::DEFAULT_SIZE),
        )?;
        Ok(request.sorted_by(sort, direction))
    }
}

/// Contact API routes, without state.
///
/// Rate limiting is layered on by the binary.
pub fn contact_routes(config: &Config) -> Router<Arc<AppState>> {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route(
            "/api/contacts/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
        .route("/api/contacts/name/:name", get(find_contacts_by_name))
        .route("/api/contacts/import", post(import_contacts))
        .route("/api/contacts/export/:format", get(export_contacts))
        .layer(
            ServiceBuilder::new()
                // Request size limit (prevents memory exhaustion on uploads)
                .layer(DefaultBodyLimit::max(config.max_upload_bytes))
                .layer(RequestBodyLimitLayer::new(config.max_upload_bytes)),
        )
}

/// Complete application router with health check, tracing and CORS.
pub fn router(state: Arc<AppState>) -> Router {
    router_with(state, |routes| routes)
}

/// Like [`router`], with `protect` applied to the contact routes only.
///
/// The health check stays outside `protect`, so rate limiting never hides it.
pub fn router_with<F>(state: Arc<AppState>, protect: F) -> Router
where
    F: FnOnce(Router<Arc<AppState>>) -> Router<Arc<AppState>>,
{
    let routes = protect(contact_routes(&state.config));
    Router::new()
        .route("/health", get(health))
        .merge(routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "contact-book-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/contacts
///
/// Creates a contact and fills its address from the postal code.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - Contact fields.
///
/// # Returns
///
/// * `Result<(StatusCode, Json<ContactResponse>), AppError>` - 201 with the stored contact.
#[utoipa::path(
    post,
    path = "/api/contacts",
    tag = "contacts",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Contact created", body = ContactResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "Postal code not found", body = ErrorBody),
        (status = 502, description = "Postal code service unavailable", body = ErrorBody)
    )
)]
pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    AppJson(request): AppJson<ContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    tracing::info!("POST /api/contacts");
    let contact = state.contacts.create(&request).await?;
    Ok((StatusCode::CREATED, Json(contact.into())))
}

/// PUT /api/contacts/:id
///
/// Partial update; absent fields are left unchanged.
#[utoipa::path(
    put,
    path = "/api/contacts/{id}",
    tag = "contacts",
    params(("id" = i64, Path, description = "Contact id")),
    request_body = ContactUpdateRequest,
    responses(
        (status = 200, description = "Contact updated", body = ContactResponse),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "Contact or postal code not found", body = ErrorBody),
        (status = 502, description = "Postal code service unavailable", body = ErrorBody)
    )
)]
pub async fn update_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    AppJson(request): AppJson<ContactUpdateRequest>,
) -> Result<Json<ContactResponse>, AppError> {
    tracing::info!("PUT /api/contacts/{}", id);
    let contact = state.contacts.update(id, &request).await?;
    Ok(Json(contact.into()))
}

/// DELETE /api/contacts/:id
#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    tag = "contacts",
    params(("id" = i64, Path, description = "Contact id")),
    responses(
        (status = 204, description = "Contact deleted"),
        (status = 404, description = "Contact not found", body = ErrorBody)
    )
)]
pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    tracing::info!("DELETE /api/contacts/{}", id);
    state.contacts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/contacts/:id
#[utoipa::path(
    get,
    path = "/api/contacts/{id}",
    tag = "contacts",
    params(("id" = i64, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Contact found", body = ContactResponse),
        (status = 404, description = "Contact not found", body = ErrorBody)
    )
)]
pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ContactResponse>, AppError> {
    tracing::info!("GET /api/contacts/{}", id);
    let contact = state.contacts.find_by_id(id).await?;
    Ok(Json(contact.into()))
}

/// GET /api/contacts/name/:name
///
/// Contacts whose name contains `name`, ignoring case. No match is a 404.
#[utoipa::path(
    get,
    path = "/api/contacts/name/{name}",
    tag = "contacts",
    params(("name" = String, Path, description = "Name fragment")),
    responses(
        (status = 200, description = "Matching contacts", body = [ContactResponse]),
        (status = 404, description = "No contact matches", body = ErrorBody)
    )
)]
pub async fn find_contacts_by_name(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<ContactResponse>>, AppError> {
    tracing::info!("GET /api/contacts/name/{}", name);
    let contacts = state.contacts.find_by_name(&name).await?;
    Ok(Json(contacts.iter().map(ContactResponse::from).collect()))
}

/// GET /api/contacts
///
/// Paged listing; a non-blank `search` filters by name, city or neighborhood.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `params` - Paging, sorting and search parameters.
///
/// # Returns
///
/// * `Result<Json<Page<ContactResponse>>, AppError>` - The requested page, possibly empty.
#[utoipa::path(
    get,
    path = "/api/contacts",
    tag = "contacts",
    params(ListParams),
    responses(
        (status = 200, description = "Page of contacts", body = ContactPage),
        (status = 400, description = "Invalid paging or sort parameters", body = ErrorBody)
    )
)]
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<ContactResponse>>, AppError> {
    tracing::info!("GET /api/contacts - params: {:?}", params);
    let request = params.page_request()?;

    let page = match params.search.as_deref().map(str::trim) {
        Some(term) if !term.is_empty() => {
            state.contacts.find_by_search_term(term, &request).await?
        }
        _ => state.contacts.find_all(&request).await?,
    };

    Ok(Json(page.map(ContactResponse::from)))
}

/// POST /api/contacts/import
///
/// Accepts a multipart upload with a `file` field, or a raw CSV body.
///
/// # Returns
///
/// * `Result<Json<Vec<ContactResponse>>, AppError>` - The imported contacts, in file order.
#[utoipa::path(
    post,
    path = "/api/contacts/import",
    tag = "contacts",
    request_body(content = String, content_type = "text/csv", description = "name,phone,postalCode,streetNumber with a header row"),
    responses(
        (status = 200, description = "Imported contacts", body = [ContactResponse]),
        (status = 400, description = "Empty or unreadable upload", body = ErrorBody)
    )
)]
pub async fn import_contacts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
) -> Result<Json<Vec<ContactResponse>>, AppError> {
    tracing::info!("POST /api/contacts/import");

    let is_multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let upload = if is_multipart {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::bad_request(format!("Invalid multipart upload: {}", e)))?;
        read_file_field(multipart).await?
    } else {
        Bytes::from_request(request, &state)
            .await
            .map_err(|e| AppError::bad_request(format!("Could not read upload: {}", e)))?
    };

    if upload.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::bad_request("Please select a non-empty CSV file to upload"));
    }

    let contacts = state.contacts.import_contacts(&upload[..]).await?;
    Ok(Json(contacts.iter().map(ContactResponse::from).collect()))
}

async fn read_file_field(mut multipart: Multipart) -> Result<Bytes, AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            return Ok(field.bytes().await?);
        }
    }
    Err(AppError::bad_request("Multipart upload must contain a 'file' field"))
}

/// GET /api/contacts/export/:format
///
/// Downloads every contact as `xlsx` (alias `excel`), `pdf` or `csv`.
#[utoipa::path(
    get,
    path = "/api/contacts/export/{format}",
    tag = "contacts",
    params(("format" = String, Path, description = "xlsx, excel, pdf or csv")),
    responses(
        (status = 200, description = "Exported file as an attachment"),
        (status = 400, description = "Unsupported export format", body = ErrorBody)
    )
)]
pub async fn export_contacts(
    State(state): State<Arc<AppState>>,
    Path(format): Path<String>,
) -> Result<Response, AppError> {
    tracing::info!("GET /api/contacts/export/{}", format);
    let file = state.contacts.export(&format).await?;

    let disposition = format!("attachment; filename=\"{}\"", file.filename);
    Ok((
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.data,
    )
        .into_response())
}
