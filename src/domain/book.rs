// src/domain/book.rs
//
// Book - owned by the host application, read-only here

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::BookQuery;

/// A tracked book as seen by the series engine.
/// The engine never writes Book rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
}

impl Book {
    pub fn new(id: Uuid, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            isbn: None,
        }
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = Some(isbn.into());
        self
    }

    /// The lookup key handed to the resolver cascade
    pub fn to_query(&self) -> BookQuery {
        BookQuery::new(&self.title, &self.author, self.isbn.as_deref())
    }
}
