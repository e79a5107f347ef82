// src/repositories/series_repository.rs
//
// Series and SeriesMembership persistence

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::ConnectionPool;
use crate::domain::{
    Book, Confidence, DetectionMethod, Series, SeriesBook, SeriesMembership, SeriesSummary,
};
use crate::error::AppResult;

pub trait SeriesRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Series>>;
    fn find_by_name_key(&self, name_key: &str) -> AppResult<Option<Series>>;
    fn list_all(&self) -> AppResult<Vec<Series>>;
    fn list_summaries(&self) -> AppResult<Vec<SeriesSummary>>;

    /// Insert unless a row with the same name key exists; returns the stored
    /// row and whether this call created it
    fn insert_or_get(&self, series: &Series) -> AppResult<(Series, bool)>;
    fn update(&self, series: &Series) -> AppResult<()>;

    /// Deletes the series only while no membership references it, as one
    /// statement. Returns whether a row was removed.
    fn delete_if_empty(&self, id: Uuid) -> AppResult<bool>;

    fn count_members(&self, series_id: Uuid) -> AppResult<u32>;
    fn upsert_membership(&self, membership: &SeriesMembership) -> AppResult<()>;
    fn memberships_for_book(&self, book_id: Uuid) -> AppResult<Vec<SeriesMembership>>;
    fn list_series_books(&self, series_id: Uuid) -> AppResult<Vec<SeriesBook>>;

    /// Removes every membership of a book; returns the affected series ids
    fn delete_memberships_for_book(&self, book_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Moves memberships from one series to another in a single transaction.
    /// Books already in the target keep their target row.
    fn reassign_memberships(&self, source_id: Uuid, target_id: Uuid) -> AppResult<usize>;
}

pub struct SqliteSeriesRepository {
    pool: Arc<ConnectionPool>,
}

fn conversion_error<E>(e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::ToSqlConversionFailure(Box::new(e))
}

fn parse_uuid(value: String) -> Result<Uuid, rusqlite::Error> {
    Uuid::parse_str(&value).map_err(conversion_error)
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(conversion_error)
}

fn parse_method(value: String) -> Result<DetectionMethod, rusqlite::Error> {
    value
        .parse::<DetectionMethod>()
        .map_err(|_| rusqlite::Error::InvalidColumnType(0, value, rusqlite::types::Type::Text))
}

impl SqliteSeriesRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_series(row: &Row) -> Result<Series, rusqlite::Error> {
        let total_books: Option<i64> = row.get("total_books")?;

        Ok(Series {
            id: parse_uuid(row.get("id")?)?,
            name: row.get("name")?,
            description: row.get("description")?,
            total_books: total_books.map(|v| v as u32),
            created_at: parse_timestamp(row.get("created_at")?)?,
            updated_at: parse_timestamp(row.get("updated_at")?)?,
        })
    }

    fn row_to_membership(row: &Row) -> Result<SeriesMembership, rusqlite::Error> {
        Ok(SeriesMembership {
            book_id: parse_uuid(row.get("book_id")?)?,
            series_id: parse_uuid(row.get("series_id")?)?,
            position_in_series: row.get("position_in_series")?,
            detection_method: parse_method(row.get("detection_method")?)?,
            confidence_score: Confidence::new(row.get("confidence_score")?),
            created_at: parse_timestamp(row.get("created_at")?)?,
            updated_at: parse_timestamp(row.get("updated_at")?)?,
        })
    }
}

const SERIES_COLUMNS: &str = "id, name, description, total_books, created_at, updated_at";
const MEMBERSHIP_COLUMNS: &str = "book_id, series_id, position_in_series, detection_method, \
                                  confidence_score, created_at, updated_at";

impl SeriesRepository for SqliteSeriesRepository {
    fn get_by_id(&self, id: Uuid) -> AppResult<Option<Series>> {
        let conn = self.pool.get()?;

        let series = conn
            .query_row(
                &format!("SELECT {} FROM series WHERE id = ?1", SERIES_COLUMNS),
                params![id.to_string()],
                Self::row_to_series,
            )
            .optional()?;

        Ok(series)
    }

    fn find_by_name_key(&self, name_key: &str) -> AppResult<Option<Series>> {
        let conn = self.pool.get()?;

        let series = conn
            .query_row(
                &format!("SELECT {} FROM series WHERE name_key = ?1", SERIES_COLUMNS),
                params![name_key],
                Self::row_to_series,
            )
            .optional()?;

        Ok(series)
    }

    fn list_all(&self) -> AppResult<Vec<Series>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM series ORDER BY name COLLATE NOCASE",
            SERIES_COLUMNS
        ))?;

        let series = stmt
            .query_map([], Self::row_to_series)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(series)
    }

    fn list_summaries(&self) -> AppResult<Vec<SeriesSummary>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT s.id, s.name, s.description, s.total_books, s.created_at, s.updated_at,
                    (SELECT COUNT(*) FROM series_memberships m WHERE m.series_id = s.id) AS member_count
             FROM series s
             ORDER BY s.name COLLATE NOCASE",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                let member_count: i64 = row.get("member_count")?;
                Ok(SeriesSummary {
                    series: Self::row_to_series(row)?,
                    member_count: member_count as u32,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    fn insert_or_get(&self, series: &Series) -> AppResult<(Series, bool)> {
        let conn = self.pool.get()?;
        let name_key = series.name_key();

        let inserted = conn.execute(
            "INSERT INTO series (id, name, name_key, description, total_books, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(name_key) DO NOTHING",
            params![
                series.id.to_string(),
                series.name,
                name_key,
                series.description,
                series.total_books.map(|v| v as i64),
                series.created_at.to_rfc3339(),
                series.updated_at.to_rfc3339(),
            ],
        )?;

        let stored = conn.query_row(
            &format!("SELECT {} FROM series WHERE name_key = ?1", SERIES_COLUMNS),
            params![name_key],
            Self::row_to_series,
        )?;

        Ok((stored, inserted == 1))
    }

    fn update(&self, series: &Series) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "UPDATE series
             SET name = ?2, name_key = ?3, description = ?4, total_books = ?5, updated_at = ?6
             WHERE id = ?1",
            params![
                series.id.to_string(),
                series.name,
                series.name_key(),
                series.description,
                series.total_books.map(|v| v as i64),
                series.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn delete_if_empty(&self, id: Uuid) -> AppResult<bool> {
        let conn = self.pool.get()?;

        let removed = conn.execute(
            "DELETE FROM series WHERE id = ?1
             AND NOT EXISTS (SELECT 1 FROM series_memberships WHERE series_id = ?1)",
            params![id.to_string()],
        )?;

        Ok(removed > 0)
    }

    fn count_members(&self, series_id: Uuid) -> AppResult<u32> {
        let conn = self.pool.get()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM series_memberships WHERE series_id = ?1",
            params![series_id.to_string()],
            |row| row.get(0),
        )?;

        Ok(count as u32)
    }

    fn upsert_membership(&self, membership: &SeriesMembership) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO series_memberships (
                book_id, series_id, position_in_series, detection_method,
                confidence_score, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(book_id, series_id) DO UPDATE SET
                position_in_series = excluded.position_in_series,
                detection_method = excluded.detection_method,
                confidence_score = excluded.confidence_score,
                updated_at = excluded.updated_at",
            params![
                membership.book_id.to_string(),
                membership.series_id.to_string(),
                membership.position_in_series,
                membership.detection_method.as_str(),
                membership.confidence_score.score(),
                membership.created_at.to_rfc3339(),
                membership.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn memberships_for_book(&self, book_id: Uuid) -> AppResult<Vec<SeriesMembership>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM series_memberships WHERE book_id = ?1",
            MEMBERSHIP_COLUMNS
        ))?;

        let memberships = stmt
            .query_map(params![book_id.to_string()], Self::row_to_membership)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(memberships)
    }

    fn list_series_books(&self, series_id: Uuid) -> AppResult<Vec<SeriesBook>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT b.id, b.title, b.author, b.isbn,
                    m.position_in_series, m.detection_method, m.confidence_score
             FROM series_memberships m
             JOIN books b ON b.id = m.book_id
             WHERE m.series_id = ?1
             ORDER BY m.position_in_series IS NULL, m.position_in_series, b.title COLLATE NOCASE",
        )?;

        let books = stmt
            .query_map(params![series_id.to_string()], |row| {
                Ok(SeriesBook {
                    book: Book {
                        id: parse_uuid(row.get("id")?)?,
                        title: row.get("title")?,
                        author: row.get("author")?,
                        isbn: row.get("isbn")?,
                    },
                    position_in_series: row.get("position_in_series")?,
                    detection_method: parse_method(row.get("detection_method")?)?,
                    confidence_score: Confidence::new(row.get("confidence_score")?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(books)
    }

    fn delete_memberships_for_book(&self, book_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let series_ids = {
            let mut stmt =
                tx.prepare("SELECT series_id FROM series_memberships WHERE book_id = ?1")?;
            let ids = stmt
                .query_map(params![book_id.to_string()], |row| parse_uuid(row.get(0)?))?
                .collect::<Result<Vec<_>, _>>()?;
            ids
        };

        tx.execute(
            "DELETE FROM series_memberships WHERE book_id = ?1",
            params![book_id.to_string()],
        )?;
        tx.commit()?;

        Ok(series_ids)
    }

    fn reassign_memberships(&self, source_id: Uuid, target_id: Uuid) -> AppResult<usize> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let moved = tx.execute(
            "INSERT INTO series_memberships (
                book_id, series_id, position_in_series, detection_method,
                confidence_score, created_at, updated_at
            )
            SELECT book_id, ?2, position_in_series, detection_method, confidence_score, created_at, ?3
            FROM series_memberships
            WHERE series_id = ?1
            ON CONFLICT(book_id, series_id) DO NOTHING",
            params![source_id.to_string(), target_id.to_string(), now],
        )?;

        tx.execute(
            "DELETE FROM series_memberships WHERE series_id = ?1",
            params![source_id.to_string()],
        )?;
        tx.commit()?;

        Ok(moved)
    }
}
