use std::env;

use contact_book_api::db::Database;
use contact_book_api::db_storage::PgContactRepository;
use contact_book_api::models::{AddressInfo, Contact, PageRequest};
use contact_book_api::repository::ContactRepository;

/// Integration smoke test for the PostgreSQL contact repository.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn contact_repository_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    db.migrate().await?;
    let repository = PgContactRepository::new(db.pool.clone());

    // Unique name so repeated runs do not collide.
    let marker = format!("Smoke {}", uuid::Uuid::new_v4().simple());

    let mut contact = Contact::new(marker.clone(), "11999998888", Some("01001000".into()), 42);
    contact.set_address(AddressInfo {
        street: "Praça da Sé".into(),
        neighborhood: "Sé".into(),
        city: "São Paulo".into(),
        state: "SP".into(),
    });

    let saved = repository.save(contact).await?;
    let id = saved.id.ok_or_else(|| anyhow::anyhow!("id not assigned"))?;

    let loaded = repository
        .find_by_id(id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("contact {} not found", id))?;
    assert_eq!(loaded, saved);

    let matches = repository
        .search(&marker.to_uppercase(), &PageRequest::default())
        .await?;
    assert_eq!(matches.total_elements, 1);

    // Wildcards in the term are matched literally.
    let literal = repository.find_by_name("%_%").await?;
    assert!(literal.iter().all(|c| c.name.contains('%')));

    let mut batch = vec![
        Contact::new(format!("{} A", marker), "11911112222", None, 1),
        Contact::new(format!("{} B", marker), "11933334444", None, 2),
    ];
    batch = repository.save_all(batch).await?;
    assert!(batch.iter().all(|c| c.id.is_some()));

    for contact in batch.iter().chain(std::iter::once(&saved)) {
        if let Some(id) = contact.id {
            repository.delete_by_id(id).await?;
        }
    }
    assert!(!repository.exists_by_id(id).await?);

    Ok(())
}
