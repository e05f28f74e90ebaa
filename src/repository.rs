use crate::errors::ContactResult;
use crate::models::{Contact, Page, PageRequest, SortDirection};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// Storage of contacts.
///
/// Implemented by [`InMemoryContactRepository`] and by
/// [`PgContactRepository`](crate::db_storage::PgContactRepository).
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Inserts the contact when it has no id, replaces it otherwise.
    async fn save(&self, contact: Contact) -> ContactResult<Contact>;

    /// Saves a batch atomically, returning it in input order.
    async fn save_all(&self, contacts: Vec<Contact>) -> ContactResult<Vec<Contact>>;

    async fn delete_by_id(&self, id: i64) -> ContactResult<()>;

    async fn exists_by_id(&self, id: i64) -> ContactResult<bool>;

    async fn find_by_id(&self, id: i64) -> ContactResult<Option<Contact>>;

    /// Every contact, in id order.
    async fn find_all(&self) -> ContactResult<Vec<Contact>>;

    async fn find_page(&self, request: &PageRequest) -> ContactResult<Page<Contact>>;

    /// Case-insensitive substring match on the name.
    async fn find_by_name(&self, name: &str) -> ContactResult<Vec<Contact>>;

    /// Case-insensitive substring match on name, city or neighborhood.
    async fn search(&self, term: &str, request: &PageRequest) -> ContactResult<Page<Contact>>;
}

/// Process-local repository used when no database is configured, and in tests.
pub struct InMemoryContactRepository {
    contacts: RwLock<BTreeMap<i64, Contact>>,
    next_id: AtomicI64,
}

impl InMemoryContactRepository {
    pub fn new() -> Self {
        Self {
            contacts: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn assign_id(&self, contact: &mut Contact) {
        match contact.id {
            Some(id) => {
                self.next_id.fetch_max(id + 1, Ordering::SeqCst);
            }
            None => contact.id = Some(self.next_id.fetch_add(1, Ordering::SeqCst)),
        }
    }
}

impl Default for InMemoryContactRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

fn paginate(mut matches: Vec<Contact>, request: &PageRequest) -> Page<Contact> {
    matches.sort_by(|a, b| {
        let ordering = request.sort.compare(a, b);
        let ordering = match request.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        ordering.then_with(|| a.id.cmp(&b.id))
    });

    let total = matches.len() as u64;
    let content = matches
        .into_iter()
        .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
        .take(request.size as usize)
        .collect();
    Page::new(content, request, total)
}

#[async_trait]
impl ContactRepository for InMemoryContactRepository {
    async fn save(&self, mut contact: Contact) -> ContactResult<Contact> {
        self.assign_id(&mut contact);
        let mut contacts = self.contacts.write().await;
        if let Some(id) = contact.id {
            contacts.insert(id, contact.clone());
        }
        Ok(contact)
    }

    async fn save_all(&self, contacts: Vec<Contact>) -> ContactResult<Vec<Contact>> {
        let mut store = self.contacts.write().await;
        let mut saved = Vec::with_capacity(contacts.len());
        for mut contact in contacts {
            self.assign_id(&mut contact);
            if let Some(id) = contact.id {
                store.insert(id, contact.clone());
            }
            saved.push(contact);
        }
        Ok(saved)
    }

    async fn delete_by_id(&self, id: i64) -> ContactResult<()> {
        self.contacts.write().await.remove(&id);
        Ok(())
    }

    async fn exists_by_id(&self, id: i64) -> ContactResult<bool> {
        Ok(self.contacts.read().await.contains_key(&id))
    }

    async fn find_by_id(&self, id: i64) -> ContactResult<Option<Contact>> {
        Ok(self.contacts.read().await.get(&id).cloned())
    }

    async fn find_all(&self) -> ContactResult<Vec<Contact>> {
        Ok(self.contacts.read().await.values().cloned().collect())
    }

    async fn find_page(&self, request: &PageRequest) -> ContactResult<Page<Contact>> {
        let all = self.find_all().await?;
        Ok(paginate(all, request))
    }

    async fn find_by_name(&self, name: &str) -> ContactResult<Vec<Contact>> {
        let needle = name.to_lowercase();
        Ok(self
            .contacts
            .read()
            .await
            .values()
            .filter(|c| contains_ignore_case(Some(&c.name), &needle))
            .cloned()
            .collect())
    }

    async fn search(&self, term: &str, request: &PageRequest) -> ContactResult<Page<Contact>> {
        let needle = term.trim().to_lowercase();
        let matches = self
            .contacts
            .read()
            .await
            .values()
            .filter(|c| {
                contains_ignore_case(Some(&c.name), &needle)
                    || contains_ignore_case(c.city(), &needle)
                    || contains_ignore_case(c.neighborhood(), &needle)
            })
            .cloned()
            .collect();
        Ok(paginate(matches, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddressInfo, SortField};

    fn contact(name: &str, city: Option<&str>) -> Contact {
        let mut contact = Contact::new(name, "11999998888", Some("01001000".into()), 1);
        if let Some(city) = city {
            contact.set_address(AddressInfo {
                street: "Rua A".into(),
                neighborhood: "Centro".into(),
                city: city.into(),
                state: "SP".into(),
            });
        }
        contact
    }

    #[tokio::test]
    async fn test_save_assigns_sequential_ids() {
        let repo = InMemoryContactRepository::new();
        let first = repo.save(contact("Ana", None)).await.unwrap();
        let second = repo.save(contact("Bruno", None)).await.unwrap();

        assert_eq!(first.id, Some(1));
        assert_eq!(second.id, Some(2));
        assert!(repo.exists_by_id(2).await.unwrap());
    }

    #[tokio::test]
    async fn test_save_existing_replaces() {
        let repo = InMemoryContactRepository::new();
        let mut saved = repo.save(contact("Ana", None)).await.unwrap();
        saved.name = "Ana Maria".into();
        repo.save(saved).await.unwrap();

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Ana Maria");
    }

    #[tokio::test]
    async fn test_delete_removes_contact() {
        let repo = InMemoryContactRepository::new();
        let saved = repo.save(contact("Ana", None)).await.unwrap();
        repo.delete_by_id(saved.id.unwrap()).await.unwrap();
        assert!(repo.find_by_id(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_matches_name_city_or_neighborhood() {
        let repo = InMemoryContactRepository::new();
        repo.save_all(vec![
            contact("Ana", Some("Campinas")),
            contact("Bruno", Some("São Paulo")),
            contact("Carla", None),
        ])
        .await
        .unwrap();

        let by_city = repo.search("campi", &PageRequest::default()).await.unwrap();
        assert_eq!(by_city.total_elements, 1);
        assert_eq!(by_city.content[0].name, "Ana");

        let by_neighborhood = repo.search("CENTRO", &PageRequest::default()).await.unwrap();
        assert_eq!(by_neighborhood.total_elements, 2);

        let none = repo.search("Ghost", &PageRequest::default()).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_page_sorting_and_slicing() {
        let repo = InMemoryContactRepository::new();
        for name in ["Carla", "ana", "Bruno"] {
            repo.save(contact(name, None)).await.unwrap();
        }

        let request = PageRequest::new(0, 2)
            .unwrap()
            .sorted_by(SortField::Name, SortDirection::Asc);
        let page = repo.find_page(&request).await.unwrap();
        let names: Vec<_> = page.content.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["ana", "Bruno"]);
        assert_eq!(page.total_pages, 2);

        let desc = PageRequest::new(1, 2)
            .unwrap()
            .sorted_by(SortField::Name, SortDirection::Desc);
        let page = repo.find_page(&desc).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].name, "ana");
        assert!(page.last);
    }

    #[tokio::test]
    async fn test_find_by_name_is_substring_case_insensitive() {
        let repo = InMemoryContactRepository::new();
        repo.save(contact("João da Silva", None)).await.unwrap();

        assert_eq!(repo.find_by_name("SILVA").await.unwrap().len(), 1);
        assert!(repo.find_by_name("Ghost").await.unwrap().is_empty());
    }
}
