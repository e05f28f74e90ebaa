use crate::errors::ContactResult;
use crate::models::{AddressInfo, Contact, Page, PageRequest};
use crate::repository::ContactRepository;
use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool};

const CONTACT_COLUMNS: &str =
    "id, name, phone, postal_code, street_number, street, neighborhood, city, state";

/// PostgreSQL-backed contact storage (table `contacts`).
pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i64,
    name: String,
    phone: String,
    postal_code: Option<String>,
    street_number: i32,
    street: Option<String>,
    neighborhood: Option<String>,
    city: Option<String>,
    state: Option<String>,
}

impl From<ContactRow> for Contact {
    /// A row with any address column missing is read back without an address.
    fn from(row: ContactRow) -> Self {
        let address = match (row.street, row.neighborhood, row.city, row.state) {
            (Some(street), Some(neighborhood), Some(city), Some(state)) => Some(AddressInfo {
                street,
                neighborhood,
                city,
                state,
            }),
            _ => None,
        };

        Contact {
            id: Some(row.id),
            name: row.name,
            phone: row.phone,
            postal_code: row.postal_code,
            street_number: row.street_number,
            address,
        }
    }
}

/// Escapes `%`, `_` and `\` and wraps the term for a substring `ILIKE`.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// The sort column comes from the `SortField` whitelist, never from user input.
fn order_clause(request: &PageRequest) -> String {
    format!(
        "ORDER BY {} {}, id ASC",
        request.sort.column(),
        request.direction.keyword()
    )
}

const INSERT_CONTACT: &str = "INSERT INTO contacts (name, phone, postal_code, street_number, street, neighborhood, city, state)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
     RETURNING id";

const UPSERT_CONTACT: &str = "INSERT INTO contacts (id, name, phone, postal_code, street_number, street, neighborhood, city, state)
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
     ON CONFLICT (id) DO UPDATE SET
        name = EXCLUDED.name,
        phone = EXCLUDED.phone,
        postal_code = EXCLUDED.postal_code,
        street_number = EXCLUDED.street_number,
        street = EXCLUDED.street,
        neighborhood = EXCLUDED.neighborhood,
        city = EXCLUDED.city,
        state = EXCLUDED.state
     RETURNING id";

async fn upsert<'e, E>(executor: E, contact: &Contact) -> Result<i64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let address = contact.address.as_ref();
    let query = match contact.id {
        Some(id) => sqlx::query_as::<sqlx::Postgres, (i64,)>(UPSERT_CONTACT).bind(id),
        None => sqlx::query_as::<sqlx::Postgres, (i64,)>(INSERT_CONTACT),
    };

    let (id,) = query
        .bind(&contact.name)
        .bind(&contact.phone)
        .bind(contact.postal_code.as_deref())
        .bind(contact.street_number)
        .bind(address.map(|a| a.street.as_str()))
        .bind(address.map(|a| a.neighborhood.as_str()))
        .bind(address.map(|a| a.city.as_str()))
        .bind(address.map(|a| a.state.as_str()))
        .fetch_one(executor)
        .await?;

    Ok(id)
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn save(&self, mut contact: Contact) -> ContactResult<Contact> {
        let id = upsert(&self.pool, &contact).await?;
        contact.id = Some(id);
        Ok(contact)
    }

    async fn save_all(&self, contacts: Vec<Contact>) -> ContactResult<Vec<Contact>> {
        let mut tx = self.pool.begin().await?;
        let mut saved = Vec::with_capacity(contacts.len());

        for mut contact in contacts {
            let id = upsert(&mut *tx, &contact).await?;
            contact.id = Some(id);
            saved.push(contact);
        }

        tx.commit().await?;
        tracing::debug!("Stored {} contacts in one transaction", saved.len());
        Ok(saved)
    }

    async fn delete_by_id(&self, id: i64) -> ContactResult<()> {
        sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn exists_by_id(&self, id: i64) -> ContactResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM contacts WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn find_by_id(&self, id: i64) -> ContactResult<Option<Contact>> {
        let row: Option<ContactRow> = sqlx::query_as(&format!(
            "SELECT {} FROM contacts WHERE id = $1",
            CONTACT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Contact::from))
    }

    async fn find_all(&self) -> ContactResult<Vec<Contact>> {
        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            "SELECT {} FROM contacts ORDER BY id",
            CONTACT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    async fn find_page(&self, request: &PageRequest) -> ContactResult<Page<Contact>> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM contacts")
            .fetch_one(&self.pool)
            .await?;

        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            "SELECT {} FROM contacts {} LIMIT $1 OFFSET $2",
            CONTACT_COLUMNS,
            order_clause(request)
        ))
        .bind(i64::from(request.size))
        .bind(request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let content = rows.into_iter().map(Contact::from).collect();
        Ok(Page::new(content, request, total.max(0) as u64))
    }

    async fn find_by_name(&self, name: &str) -> ContactResult<Vec<Contact>> {
        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            "SELECT {} FROM contacts WHERE name ILIKE $1 ESCAPE '\\' ORDER BY id",
            CONTACT_COLUMNS
        ))
        .bind(like_pattern(name))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Contact::from).collect())
    }

    async fn search(&self, term: &str, request: &PageRequest) -> ContactResult<Page<Contact>> {
        let pattern = like_pattern(term.trim());
        let filter = "name ILIKE $1 ESCAPE '\\' OR city ILIKE $1 ESCAPE '\\' OR neighborhood ILIKE $1 ESCAPE '\\'";

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM contacts WHERE {}", filter))
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            "SELECT {} FROM contacts WHERE {} {} LIMIT $2 OFFSET $3",
            CONTACT_COLUMNS,
            filter,
            order_clause(request)
        ))
        .bind(&pattern)
        .bind(i64::from(request.size))
        .bind(request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let content = rows.into_iter().map(Contact::from).collect();
        Ok(Page::new(content, request, total.max(0) as u64))
    }
}
