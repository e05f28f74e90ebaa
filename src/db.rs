use sqlx::{postgres::PgPoolOptions, PgPool};

const CREATE_CONTACTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS contacts (
    id            BIGSERIAL PRIMARY KEY,
    name          VARCHAR(100) NOT NULL,
    phone         VARCHAR(11)  NOT NULL,
    postal_code   VARCHAR(8),
    street_number INTEGER      NOT NULL,
    street        TEXT,
    neighborhood  TEXT,
    city          TEXT,
    state         TEXT
)
"#;

const CREATE_NAME_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_contacts_name_lower ON contacts (LOWER(name))";

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Creates the `contacts` table and its indexes when missing.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(CREATE_CONTACTS_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_NAME_INDEX).execute(&self.pool).await?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }
}
