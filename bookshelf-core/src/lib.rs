//! bookshelf-core: book records and the storage contract
//!
//! Every backend (in-memory, PostgreSQL) implements [`BookStore`], so the
//! HTTP layer never knows which substrate holds the records.

pub mod book;
pub mod error;
pub mod memory;
pub mod store;

pub use book::{seed_books, Book, BookFields, NewBook};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use store::{BackendKind, BookStore, Operation};
