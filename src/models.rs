use crate::errors::{ContactError, ContactResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use utoipa::ToSchema;

// ============ Domain Models ============

/// Address resolved from a postal code.
///
/// Only produced by the address resolver; copied into a [`Contact`] as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AddressInfo {
    pub street: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

/// A directory entry.
///
/// The address-derived fields live in a single `Option<AddressInfo>` so they are
/// always either all present or all absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    /// Assigned by the repository on first save.
    pub id: Option<i64>,
    pub name: String,
    /// Digits only, 10 or 11 of them.
    pub phone: String,
    /// Digits only, exactly 8 of them. `None` once cleared.
    pub postal_code: Option<String>,
    pub street_number: i32,
    pub address: Option<AddressInfo>,
}

impl Contact {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        postal_code: Option<String>,
        street_number: i32,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            phone: phone.into(),
            postal_code,
            street_number,
            address: None,
        }
    }

    pub fn set_address(&mut self, address: AddressInfo) {
        self.address = Some(address);
    }

    pub fn clear_address(&mut self) {
        self.address = None;
    }

    /// Postal code, if one is set and non-empty.
    pub fn postal_code(&self) -> Option<&str> {
        self.postal_code.as_deref().filter(|code| !code.is_empty())
    }

    pub fn street(&self) -> Option<&str> {
        self.address.as_ref().map(|a| a.street.as_str())
    }

    pub fn neighborhood(&self) -> Option<&str> {
        self.address.as_ref().map(|a| a.neighborhood.as_str())
    }

    pub fn city(&self) -> Option<&str> {
        self.address.as_ref().map(|a| a.city.as_str())
    }

    pub fn state(&self) -> Option<&str> {
        self.address.as_ref().map(|a| a.state.as_str())
    }
}

// ============ Request / Response Models ============

/// Payload for creating a contact.
///
/// Every field is optional on the wire so that missing values are reported as
/// `required` validation errors instead of deserialization failures.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[schema(example = "João da Silva")]
    pub name: Option<String>,
    #[schema(example = "11999998888")]
    pub phone: Option<String>,
    #[schema(example = "01001000")]
    pub postal_code: Option<String>,
    #[schema(example = 123)]
    pub street_number: Option<i32>,
}

/// Payload for a partial update. Absent or `null` fields are left unchanged;
/// an empty `postalCode` clears the postal code and the resolved address.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdateRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub postal_code: Option<String>,
    pub street_number: Option<i32>,
}

/// A contact as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub id: Option<i64>,
    pub name: String,
    pub phone: String,
    pub postal_code: Option<String>,
    pub street: Option<String>,
    pub street_number: i32,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl From<&Contact> for ContactResponse {
    fn from(contact: &Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            postal_code: contact.postal_code.clone(),
            street: contact.street().map(String::from),
            street_number: contact.street_number,
            neighborhood: contact.neighborhood().map(String::from),
            city: contact.city().map(String::from),
            state: contact.state().map(String::from),
        }
    }
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self::from(&contact)
    }
}

/// Rendered export payload.
#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

// ============ Paging ============

/// Column a page of contacts is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Id,
    #[default]
    Name,
    Phone,
    PostalCode,
    Street,
    StreetNumber,
    Neighborhood,
    City,
    State,
}

impl SortField {
    /// Parses the `sortBy` query value.
    pub fn parse(token: &str) -> ContactResult<Self> {
        let field = match token.trim().to_ascii_lowercase().as_str() {
            "id" => SortField::Id,
            "name" => SortField::Name,
            "phone" => SortField::Phone,
            "postalcode" | "postal_code" | "cep" => SortField::PostalCode,
            "street" => SortField::Street,
            "streetnumber" | "street_number" | "number" => SortField::StreetNumber,
            "neighborhood" => SortField::Neighborhood,
            "city" => SortField::City,
            "state" => SortField::State,
            other => {
                return Err(ContactError::InvalidInput(format!(
                    "Unknown sort field: {}",
                    other
                )))
            }
        };
        Ok(field)
    }

    /// Database column backing this field.
    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Phone => "phone",
            SortField::PostalCode => "postal_code",
            SortField::Street => "street",
            SortField::StreetNumber => "street_number",
            SortField::Neighborhood => "neighborhood",
            SortField::City => "city",
            SortField::State => "state",
        }
    }

    pub fn compare(self, a: &Contact, b: &Contact) -> Ordering {
        fn text(value: Option<&str>) -> Option<String> {
            value.map(str::to_lowercase)
        }

        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Phone => a.phone.cmp(&b.phone),
            SortField::PostalCode => a.postal_code.cmp(&b.postal_code),
            SortField::Street => text(a.street()).cmp(&text(b.street())),
            SortField::StreetNumber => a.street_number.cmp(&b.street_number),
            SortField::Neighborhood => text(a.neighborhood()).cmp(&text(b.neighborhood())),
            SortField::City => text(a.city()).cmp(&text(b.city())),
            SortField::State => text(a.state()).cmp(&text(b.state())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` (any case) sorts descending; anything else ascending.
    pub fn parse(token: &str) -> Self {
        if token.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Requested slice of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page: u32,
    pub size: u32,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl PageRequest {
    pub const DEFAULT_SIZE: u32 = 10;
    pub const MAX_SIZE: u32 = 2000;

    pub fn new(page: u32, size: u32) -> ContactResult<Self> {
        if size == 0 {
            return Err(ContactError::InvalidInput(
                "Page size must not be less than one".to_string(),
            ));
        }
        Ok(Self {
            page,
            size: size.min(Self::MAX_SIZE),
            sort: SortField::default(),
            direction: SortDirection::default(),
        })
    }

    pub fn sorted_by(mut self, sort: SortField, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: Self::DEFAULT_SIZE,
            sort: SortField::default(),
            direction: SortDirection::default(),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[aliases(ContactPage = Page<ContactResponse>)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
    pub first: bool,
    pub last: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size.max(1));
        let total_pages = total_elements.div_ceil(size) as u32;
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
            first: request.page == 0,
            last: request.page.saturating_add(1) >= total_pages,
        }
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
