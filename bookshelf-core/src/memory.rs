//! In-process book store
//!
//! Records live in a `BTreeMap` keyed by id, so listings come out in id
//! order without sorting. Ids come from a counter that only moves forward:
//! a deleted id is never handed out again.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::book::{seed_books, Book, BookFields, NewBook};
use crate::error::{Result, StoreError};
use crate::store::{BackendKind, BookStore};

struct MemoryState {
    books: BTreeMap<i64, Book>,
    next_id: i64,
}

impl MemoryState {
    fn insert(&mut self, new: NewBook) -> Book {
        let id = self.next_id;
        self.next_id += 1;
        let book = Book::from_new(id, new);
        self.books.insert(id, book.clone());
        book
    }
}

/// Book store held entirely in memory, guarded by a single lock
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Empty store; the first id handed out is 1
    pub fn new() -> Self {
        Self::with_books(Vec::new())
    }

    /// Store pre-filled with [`seed_books`]
    pub fn seeded() -> Self {
        Self::with_books(seed_books())
    }

    /// Store pre-filled with `books`, assigned ids 1..=n in order
    pub fn with_books(books: Vec<NewBook>) -> Self {
        let mut state = MemoryState {
            books: BTreeMap::new(),
            next_id: 1,
        };
        for new in books {
            state.insert(new);
        }
        Self {
            state: RwLock::new(state),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        Ok(state.books.values().cloned().collect())
    }

    async fn create(&self, fields: BookFields) -> Result<Book> {
        let new = fields.into_new_book()?;
        let book = self.state.write().await.insert(new);
        tracing::debug!(id = book.id, "created book");
        Ok(book)
    }

    async fn update(&self, id: i64, fields: BookFields) -> Result<Book> {
        let mut state = self.state.write().await;
        let book = state.books.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        book.apply(fields);
        Ok(book.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn fields(novel: &str) -> BookFields {
        NewBook::new("The Expanse", novel, "James S. A. Corey", "Orbit Book").into()
    }

    fn ids(books: &[Book]) -> Vec<i64> {
        books.iter().map(|b| b.id).collect()
    }

    #[tokio::test]
    async fn seeded_store_lists_six_books_in_order() {
        let store = MemoryStore::seeded();
        let books = store.list_all().await.unwrap();
        assert_eq!(ids(&books), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(books[2].novel_title, "Abaddon's Gate");
    }

    #[tokio::test]
    async fn crud_scenario() {
        let store = MemoryStore::seeded();

        let created = store.create(fields("Tiamat's Wrath")).await.unwrap();
        assert_eq!(created.id, 7);
        assert_eq!(store.list_all().await.unwrap().len(), 7);

        store.delete(3).await.unwrap();
        let books = store.list_all().await.unwrap();
        assert_eq!(ids(&books), vec![1, 2, 4, 5, 6, 7]);

        let updated = store
            .update(
                1,
                BookFields {
                    author: Some("X".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.author, "X");
        assert_eq!(updated.novel_title, "Leviathan Wakes");
        assert_eq!(updated.publisher, "Orbit Book");

        let listed = store.list_all().await.unwrap();
        assert_eq!(listed[0], updated);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = MemoryStore::seeded();
        store.delete(6).await.unwrap();
        store.delete(5).await.unwrap();

        let created = store.create(fields("Leviathan Falls")).await.unwrap();
        assert_eq!(created.id, 7);
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let store = MemoryStore::seeded();
        store.delete(2).await.unwrap();
        let err = store.delete(2).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(2)));
        assert!(!ids(&store.list_all().await.unwrap()).contains(&2));
    }

    #[tokio::test]
    async fn unknown_id_leaves_store_unchanged() {
        let store = MemoryStore::seeded();
        let before = store.list_all().await.unwrap();

        let err = store.update(999, fields("Nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(999)));
        let err = store.delete(999).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(999)));

        assert_eq!(store.list_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn missing_field_does_not_mutate() {
        let store = MemoryStore::seeded();
        let mut partial = fields("Half");
        partial.publisher = None;

        let err = store.create(partial).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingField("publisher")));
        assert_eq!(store.list_all().await.unwrap().len(), 6);

        // the failed create must not consume an id
        let created = store.create(fields("Whole")).await.unwrap();
        assert_eq!(created.id, 7);
    }

    #[tokio::test]
    async fn empty_update_changes_nothing() {
        let store = MemoryStore::seeded();
        let before = store.list_all().await.unwrap();
        let after = store.update(4, BookFields::default()).await.unwrap();
        assert_eq!(after, before[3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_get_unique_ids() {
        let store = Arc::new(MemoryStore::new());
        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.create(fields(&format!("Book {i}"))).await })
            })
            .collect();

        let mut assigned: Vec<i64> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap().id)
            .collect();
        assigned.sort_unstable();
        assigned.dedup();
        assert_eq!(assigned.len(), 50);
        assert_eq!(store.list_all().await.unwrap().len(), 50);
    }
}
