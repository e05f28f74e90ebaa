use crate::enrichment::AddressResolver;
use crate::errors::{ContactError, ContactResult};
use crate::models::Contact;
use crate::validation::{
    digits_only, normalize_postal_code, NAME_MAX_CHARS, NAME_MIN_CHARS, PHONE_DIGITS,
};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;

/// Columns a line needs: name, phone, postal code, street number.
const MIN_FIELDS: usize = 4;

/// Tolerant CSV bulk import.
///
/// Malformed lines and failed enrichments never abort the batch; only an
/// unreadable stream does.
#[derive(Clone)]
pub struct BulkImportPipeline {
    resolver: AddressResolver,
}

impl BulkImportPipeline {
    pub fn new(resolver: AddressResolver) -> Self {
        Self { resolver }
    }

    /// Parses and enriches contacts from a CSV stream with a header row.
    ///
    /// # Arguments
    ///
    /// * `reader` - UTF-8 comma-delimited content: `name, phone, postalCode, streetNumber`.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Contact>)` - Accepted lines, in input order, not yet persisted.
    /// * `Err(ContactError::ImportStreamUnreadable)` - I/O failure or invalid UTF-8.
    pub async fn import<R: Read>(&self, reader: R) -> ContactResult<Vec<Contact>> {
        let parsed = parse_contacts(reader)?;
        tracing::info!("Parsed {} contacts from import stream", parsed.len());

        let mut contacts = Vec::with_capacity(parsed.len());
        for mut contact in parsed {
            if contact.postal_code().is_some() {
                if let Err(err) = self.resolver.enrich(&mut contact).await {
                    tracing::warn!(
                        "Importing contact {} without address: {}",
                        contact.name,
                        err
                    );
                }
            }
            contacts.push(contact);
        }

        Ok(contacts)
    }
}

/// Parse phase: every accepted line becomes an un-enriched contact.
pub fn parse_contacts<R: Read>(reader: R) -> ContactResult<Vec<Contact>> {
    // Quotes are plain characters: an unbalanced one must not swallow the following lines.
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut contacts = Vec::new();
    let mut header_seen = false;

    for result in csv_reader.records() {
        let record = result.map_err(|e| {
            tracing::error!("Error reading import stream: {}", e);
            ContactError::ImportStreamUnreadable(e.to_string())
        })?;

        if is_blank(&record) {
            continue;
        }
        if !header_seen {
            header_seen = true;
            continue;
        }

        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or_default();
        match parse_line(&record) {
            Ok(contact) => contacts.push(contact),
            Err(reason) => {
                tracing::warn!("Skipping import line {} ({}): {:?}", line, reason, record)
            }
        }
    }

    Ok(contacts)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

/// Maps one record onto a contact that fits the stored column formats.
///
/// Phone and postal code are reduced to digits. A postal code that is not 8 digits
/// is dropped from the record instead of rejecting the whole line.
fn parse_line(record: &StringRecord) -> Result<Contact, &'static str> {
    if record.len() < MIN_FIELDS {
        return Err("fewer than 4 fields");
    }

    let street_number = record[3]
        .parse::<i32>()
        .map_err(|_| "street number is not an integer")?;
    if street_number < 1 {
        return Err("street number must be positive");
    }

    let name = &record[0];
    let name_chars = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_chars) {
        return Err("name must have 2 to 100 characters");
    }

    let phone = digits_only(&record[1]);
    if !PHONE_DIGITS.contains(&phone.len()) {
        return Err("phone must have 10 or 11 digits");
    }

    let raw_postal_code = &record[2];
    let postal_code = normalize_postal_code(raw_postal_code);
    if postal_code.is_none() && !raw_postal_code.is_empty() {
        tracing::warn!(
            "Importing contact {} without postal code: {:?} is not 8 digits",
            name,
            raw_postal_code
        );
    }

    Ok(Contact::new(name, phone, postal_code, street_number))
}
