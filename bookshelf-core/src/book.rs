//! Book record and the form fields used to create or patch one

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// A stored book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    /// Series name (e.g. "The Expanse")
    pub title: String,
    pub novel_title: String,
    pub author: String,
    pub publisher: String,
    /// Set by backends that track modification time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Book {
    /// Build a record from validated fields and an assigned id
    pub fn from_new(id: i64, new: NewBook) -> Self {
        Self {
            id,
            title: new.title,
            novel_title: new.novel_title,
            author: new.author,
            publisher: new.publisher,
            updated_at: None,
        }
    }

    /// Overwrite the fields present in `fields`, keeping the rest.
    pub fn apply(&mut self, fields: BookFields) {
        if let Some(title) = fields.title {
            self.title = title;
        }
        if let Some(novel_title) = fields.novel_title {
            self.novel_title = novel_title;
        }
        if let Some(author) = fields.author {
            self.author = author;
        }
        if let Some(publisher) = fields.publisher {
            self.publisher = publisher;
        }
    }
}

/// Form fields of a book, any of which may be absent.
///
/// Create requires all four; update applies whichever are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BookFields {
    pub title: Option<String>,
    pub novel_title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
}

impl BookFields {
    /// Require every field, naming the first one missing.
    pub fn into_new_book(self) -> Result<NewBook> {
        Ok(NewBook {
            title: self.title.ok_or(StoreError::MissingField("title"))?,
            novel_title: self
                .novel_title
                .ok_or(StoreError::MissingField("novel_title"))?,
            author: self.author.ok_or(StoreError::MissingField("author"))?,
            publisher: self.publisher.ok_or(StoreError::MissingField("publisher"))?,
        })
    }
}

/// Fully populated fields for a book about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub novel_title: String,
    pub author: String,
    pub publisher: String,
}

impl NewBook {
    pub fn new(
        title: impl Into<String>,
        novel_title: impl Into<String>,
        author: impl Into<String>,
        publisher: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            novel_title: novel_title.into(),
            author: author.into(),
            publisher: publisher.into(),
        }
    }
}

impl From<NewBook> for BookFields {
    fn from(new: NewBook) -> Self {
        Self {
            title: Some(new.title),
            novel_title: Some(new.novel_title),
            author: Some(new.author),
            publisher: Some(new.publisher),
        }
    }
}

/// The six novels every fresh store starts with, in id order.
pub fn seed_books() -> Vec<NewBook> {
    [
        "Leviathan Wakes",
        "Caliban's War",
        "Abaddon's Gate",
        "Cibola Burn",
        "Nemesis Games",
        "Babylon's Ashes",
    ]
    .into_iter()
    .map(|novel| NewBook::new("The Expanse", novel, "James S. A. Corey", "Orbit Book"))
    .collect()
}
