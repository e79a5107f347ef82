// src/repositories/book_repository.rs
//
// Read-only view over the host application's books table

use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::Book;
use crate::error::AppResult;

pub trait BookRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;

    /// Books with no series membership, in insertion order
    fn list_unlinked(&self) -> AppResult<Vec<Book>>;

    /// Unlinked books by one author (case-insensitive)
    fn list_unlinked_by_author(&self, author: &str) -> AppResult<Vec<Book>>;
}

pub struct SqliteBookRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteBookRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_book(row: &Row) -> Result<Book, rusqlite::Error> {
        let id_str: String = row.get("id")?;
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;

        Ok(Book {
            id,
            title: row.get("title")?,
            author: row.get("author")?,
            isbn: row.get("isbn")?,
        })
    }
}

impl BookRepository for SqliteBookRepository {
    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let conn = self.pool.get()?;

        let book = conn
            .query_row(
                "SELECT id, title, author, isbn FROM books WHERE id = ?1",
                params![id.to_string()],
                Self::row_to_book,
            )
            .optional()?;

        Ok(book)
    }

    fn list_unlinked(&self) -> AppResult<Vec<Book>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT b.id, b.title, b.author, b.isbn
             FROM books b
             WHERE NOT EXISTS (SELECT 1 FROM series_memberships m WHERE m.book_id = b.id)
             ORDER BY b.rowid",
        )?;

        let books = stmt
            .query_map([], Self::row_to_book)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(books)
    }

    fn list_unlinked_by_author(&self, author: &str) -> AppResult<Vec<Book>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT b.id, b.title, b.author, b.isbn
             FROM books b
             WHERE b.author = ?1 COLLATE NOCASE
               AND NOT EXISTS (SELECT 1 FROM series_memberships m WHERE m.book_id = b.id)
             ORDER BY b.title COLLATE NOCASE",
        )?;

        let books = stmt
            .query_map(params![author.trim()], Self::row_to_book)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(books)
    }
}

/// Inserts a book row the way the host application would (tests only)
#[cfg(test)]
pub(crate) fn seed_book(pool: &ConnectionPool, book: &Book) {
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO books (id, title, author, isbn) VALUES (?1, ?2, ?3, ?4)",
        params![book.id.to_string(), book.title, book.author, book.isbn],
    )
    .unwrap();
}
