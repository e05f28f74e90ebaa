//! Normalization and validation of inbound contact fields.
//!
//! Every rule is applied independently and all violations are collected, in field
//! order, into a single [`ContactError::ValidationFailed`].

use crate::errors::{ContactError, ContactResult, FieldError, FieldRule};
use crate::models::{Contact, ContactRequest, ContactUpdateRequest};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const POSTAL_CODE_DIGITS: usize = 8;
pub const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 10..=11;

/// Strips every non-digit character.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalized postal code, or `None` when it does not have exactly 8 digits.
pub fn normalize_postal_code(raw: &str) -> Option<String> {
    let digits = digits_only(raw);
    (digits.len() == POSTAL_CODE_DIGITS).then_some(digits)
}

/// What an update does to the stored postal code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PostalCodeChange {
    /// Field omitted or `null`.
    #[default]
    Unchanged,
    /// Explicit empty string.
    Clear,
    /// New normalized 8-digit code.
    Set(String),
}

/// Normalized partial update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub postal_code: PostalCodeChange,
    pub street_number: Option<i32>,
}

impl ContactPatch {
    /// Applies the non-address fields of the patch to `contact`.
    ///
    /// The postal code and address bundle are handled by the orchestrator, which
    /// needs the previous value to decide whether to resolve again.
    pub fn apply_fields(&self, contact: &mut Contact) {
        if let Some(name) = &self.name {
            contact.name = name.clone();
        }
        if let Some(phone) = &self.phone {
            contact.phone = phone.clone();
        }
        if let Some(number) = self.street_number {
            contact.street_number = number;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContactValidator;

impl ContactValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validates a create request and returns an un-persisted, un-enriched contact.
    pub fn validate_create(&self, request: &ContactRequest) -> ContactResult<Contact> {
        let mut errors = Vec::new();

        let name = check_name(request.name.as_deref(), &mut errors);
        let phone = check_phone(request.phone.as_deref(), &mut errors);

        let postal_code = match request.postal_code.as_deref() {
            Some(raw) if !raw.trim().is_empty() => check_postal_code(raw, &mut errors),
            _ => {
                errors.push(FieldError::new(
                    "postalCode",
                    FieldRule::Required,
                    "Postal code cannot be blank",
                ));
                None
            }
        };

        let street_number = match request.street_number {
            Some(number) => check_street_number(number, &mut errors),
            None => {
                errors.push(FieldError::new(
                    "streetNumber",
                    FieldRule::Required,
                    "Street number cannot be null",
                ));
                None
            }
        };

        match (name, phone, postal_code, street_number) {
            (Some(name), Some(phone), Some(postal_code), Some(number)) if errors.is_empty() => {
                Ok(Contact::new(name, phone, Some(postal_code), number))
            }
            _ => Err(ContactError::ValidationFailed(errors)),
        }
    }

    /// Validates the fields present in an update request.
    pub fn validate_update(&self, request: &ContactUpdateRequest) -> ContactResult<ContactPatch> {
        let mut errors = Vec::new();

        let name = request
            .name
            .as_deref()
            .and_then(|raw| check_name(Some(raw), &mut errors));
        let phone = request
            .phone
            .as_deref()
            .and_then(|raw| check_phone(Some(raw), &mut errors));

        let postal_code = match request.postal_code.as_deref() {
            None => PostalCodeChange::Unchanged,
            Some(raw) if raw.trim().is_empty() => PostalCodeChange::Clear,
            Some(raw) => check_postal_code(raw, &mut errors)
                .map(PostalCodeChange::Set)
                .unwrap_or_default(),
        };

        let street_number = request
            .street_number
            .and_then(|number| check_street_number(number, &mut errors));

        if !errors.is_empty() {
            return Err(ContactError::ValidationFailed(errors));
        }

        Ok(ContactPatch {
            name,
            phone,
            postal_code,
            street_number,
        })
    }
}

fn check_name(raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<String> {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.push(FieldError::new(
            "name",
            FieldRule::Required,
            "Name cannot be blank",
        ));
        return None;
    }

    let length = trimmed.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&length) {
        errors.push(FieldError::new(
            "name",
            FieldRule::Length,
            format!(
                "Name must be between {} and {} characters",
                NAME_MIN_CHARS, NAME_MAX_CHARS
            ),
        ));
        return None;
    }

    Some(trimmed.to_string())
}

fn check_phone(raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<String> {
    let raw = raw.unwrap_or_default();
    if raw.trim().is_empty() {
        errors.push(FieldError::new(
            "phone",
            FieldRule::Required,
            "Phone cannot be blank",
        ));
        return None;
    }

    let digits = digits_only(raw);
    if !PHONE_DIGITS.contains(&digits.len()) {
        errors.push(FieldError::new(
            "phone",
            FieldRule::Format,
            "Phone must contain 10 or 11 digits",
        ));
        return None;
    }

    Some(digits)
}

fn check_postal_code(raw: &str, errors: &mut Vec<FieldError>) -> Option<String> {
    let normalized = normalize_postal_code(raw);
    if normalized.is_none() {
        errors.push(FieldError::new(
            "postalCode",
            FieldRule::Format,
            "Postal code must contain 8 digits",
        ));
    }
    normalized
}

fn check_street_number(number: i32, errors: &mut Vec<FieldError>) -> Option<i32> {
    if number <= 0 {
        errors.push(FieldError::new(
            "streetNumber",
            FieldRule::Range,
            "Street number must be greater than 0",
        ));
        return None;
    }
    Some(number)
}
