// src/services/series_scanner_tests.rs
//
// Batch scanner tests
//
// INVARIANTS TESTED:
// - Every unlinked book is scanned exactly once, in order
// - A failing book is counted as failed and the scan continues
// - A catalog that degrades to no detection fails only that book
// - Classification: linked / skipped (detected, not linked) / failed
// - The pause runs between books, not after the last one

#[cfg(test)]
mod scanner_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use uuid::Uuid;

    use crate::config::{ResolverThresholds, ScanSettings};
    use crate::db::{create_in_memory_pool, initialize_database, ConnectionPool};
    use crate::domain::{
        Book, DetectionMethod, DetectionResult, Series, SeriesBook, SeriesMembership, SeriesSummary,
    };
    use crate::error::{AppError, AppResult};
    use crate::events::EventBus;
    use crate::repositories::book_repository::seed_book;
    use crate::repositories::{SeriesRepository, SqliteBookRepository, SqliteSeriesRepository};
    use crate::services::lookup::{MockSeriesLookup, SeriesLookup};
    use crate::services::series_registry::SeriesRegistry;
    use crate::services::series_resolver::SeriesResolver;
    use crate::services::series_scanner::{ScanItemStatus, SeriesScanner};

    /// Real repository that refuses to create one particular series
    struct FailingSeriesRepository {
        inner: SqliteSeriesRepository,
        poisoned_name: &'static str,
    }

    impl SeriesRepository for FailingSeriesRepository {
        fn get_by_id(&self, id: Uuid) -> AppResult<Option<Series>> {
            self.inner.get_by_id(id)
        }
        fn find_by_name_key(&self, name_key: &str) -> AppResult<Option<Series>> {
            self.inner.find_by_name_key(name_key)
        }
        fn list_all(&self) -> AppResult<Vec<Series>> {
            self.inner.list_all()
        }
        fn list_summaries(&self) -> AppResult<Vec<SeriesSummary>> {
            self.inner.list_summaries()
        }
        fn insert_or_get(&self, series: &Series) -> AppResult<(Series, bool)> {
            if series.name == self.poisoned_name {
                return Err(AppError::Other("disk full".to_string()));
            }
            self.inner.insert_or_get(series)
        }
        fn update(&self, series: &Series) -> AppResult<()> {
            self.inner.update(series)
        }
        fn delete_if_empty(&self, id: Uuid) -> AppResult<bool> {
            self.inner.delete_if_empty(id)
        }
        fn count_members(&self, series_id: Uuid) -> AppResult<u32> {
            self.inner.count_members(series_id)
        }
        fn upsert_membership(&self, membership: &SeriesMembership) -> AppResult<()> {
            self.inner.upsert_membership(membership)
        }
        fn memberships_for_book(&self, book_id: Uuid) -> AppResult<Vec<SeriesMembership>> {
            self.inner.memberships_for_book(book_id)
        }
        fn list_series_books(&self, series_id: Uuid) -> AppResult<Vec<SeriesBook>> {
            self.inner.list_series_books(series_id)
        }
        fn delete_memberships_for_book(&self, book_id: Uuid) -> AppResult<Vec<Uuid>> {
            self.inner.delete_memberships_for_book(book_id)
        }
        fn reassign_memberships(&self, source_id: Uuid, target_id: Uuid) -> AppResult<usize> {
            self.inner.reassign_memberships(source_id, target_id)
        }
    }

    struct Fixture {
        pool: Arc<ConnectionPool>,
        bus: Arc<EventBus>,
        scanner: SeriesScanner,
    }

    fn fixture(delay_ms: u64) -> Fixture {
        fixture_with(SeriesResolver::pattern_only(ResolverThresholds::default()), delay_ms)
    }

    fn fixture_with(resolver: SeriesResolver, delay_ms: u64) -> Fixture {
        let pool = Arc::new(create_in_memory_pool().unwrap());
        initialize_database(&pool.get().unwrap()).unwrap();

        let series_repo = Arc::new(FailingSeriesRepository {
            inner: SqliteSeriesRepository::new(pool.clone()),
            poisoned_name: "Broken Saga",
        });
        let book_repo = Arc::new(SqliteBookRepository::new(pool.clone()));
        let bus = Arc::new(EventBus::new());

        let registry = Arc::new(SeriesRegistry::new(
            series_repo,
            Arc::new(resolver),
            bus.clone(),
            ResolverThresholds::default(),
        ));

        let scanner = SeriesScanner::new(book_repo, registry, bus.clone(), &ScanSettings { delay_ms });

        Fixture { pool, bus, scanner }
    }

    fn seed(f: &Fixture, titles: &[&str]) -> Vec<Book> {
        titles
            .iter()
            .map(|title| {
                let book = Book::new(Uuid::new_v4(), *title, "Various");
                seed_book(&f.pool, &book);
                book
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_failing_book_does_not_abort_the_scan() {
        let f = fixture(0);
        let books = seed(
            &f,
            &[
                "Mort (Discworld, #4)",
                "Untitled Story (Book 3)",
                "Ruin (Broken Saga, #1)",
                "Pride and Prejudice",
                "Catching Fire (The Hunger Games #2)",
            ],
        );

        let summary = f.scanner.scan_all_books_for_series(false, 0.6).await.unwrap();

        assert_eq!(summary.scanned, 5);
        assert_eq!(summary.linked, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 2);

        let statuses: Vec<ScanItemStatus> = summary.items.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![
                ScanItemStatus::Linked,
                ScanItemStatus::Skipped,
                ScanItemStatus::Failed,
                ScanItemStatus::Failed,
                ScanItemStatus::Linked,
            ]
        );

        assert_eq!(summary.items[2].book_id, books[2].id);
        assert!(summary.items[2].error.is_some());
        assert!(summary.items[3].error.is_none());
        assert_eq!(f.bus.emitted_count("SeriesScanCompleted"), 1);
    }

    #[tokio::test]
    async fn test_degraded_catalog_fails_only_its_book() {
        let mut catalog = MockSeriesLookup::new();
        catalog.expect_method().return_const(DetectionMethod::CatalogA);
        catalog.expect_resolve().times(5).returning(|query| {
            match query.title.as_str() {
                "Leviathan Wakes" => {
                    DetectionResult::named("The Expanse", Some(1.0), DetectionMethod::CatalogA, 0.95)
                }
                "Caliban's War" => {
                    DetectionResult::named("The Expanse", Some(2.0), DetectionMethod::CatalogA, 0.95)
                }
                "Deadhouse Gates" => DetectionResult::named(
                    "Malazan Book of the Fallen",
                    Some(2.0),
                    DetectionMethod::CatalogA,
                    0.95,
                ),
                "The Hobbit" => {
                    DetectionResult::named("Middle-earth", None, DetectionMethod::CatalogA, 0.5)
                }
                // catalog unreachable for this book
                _ => DetectionResult::none(),
            }
        });
        let catalogs: Vec<Arc<dyn SeriesLookup>> = vec![Arc::new(catalog)];
        let f = fixture_with(
            SeriesResolver::new(catalogs, None, ResolverThresholds::default()),
            0,
        );
        let books = seed(
            &f,
            &[
                "Leviathan Wakes",
                "Caliban's War",
                "Gardens of the Moon",
                "Deadhouse Gates",
                "The Hobbit",
            ],
        );

        let summary = f.scanner.scan_all_books_for_series(false, 0.6).await.unwrap();

        assert_eq!(summary.scanned, 5);
        assert_eq!(summary.linked, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);

        let failed = &summary.items[2];
        assert_eq!(failed.book_id, books[2].id);
        assert_eq!(failed.status, ScanItemStatus::Failed);
        assert!(failed.error.is_none());
        assert_eq!(summary.items[4].status, ScanItemStatus::Skipped);
    }

    #[tokio::test]
    async fn test_linked_books_are_not_rescanned() {
        let f = fixture(0);
        seed(&f, &["Mort (Discworld, #4)", "Pride and Prejudice"]);

        let first = f.scanner.scan_all_books_for_series(false, 0.6).await.unwrap();
        assert_eq!(first.scanned, 2);

        let second = f.scanner.scan_all_books_for_series(false, 0.6).await.unwrap();
        assert_eq!(second.scanned, 1);
        assert_eq!(second.items[0].title, "Pride and Prejudice");
    }

    #[tokio::test]
    async fn test_gate_turns_detections_into_skips() {
        let f = fixture(0);
        seed(&f, &["Ender's Game (Ender's Saga)"]);

        let summary = f.scanner.scan_all_books_for_series(false, 0.8).await.unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.items[0].series_name.as_deref(), Some("Ender's Saga"));
        assert_eq!(summary.items[0].confidence, 0.65);
    }

    #[tokio::test]
    async fn test_delay_runs_between_books_only() {
        let f = fixture(40);
        seed(&f, &["Book One Title", "Book Two Title", "Book Three Title"]);

        let start = Instant::now();
        let summary = f.scanner.scan_all_books_for_series(false, 0.6).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(summary.scanned, 3);
        assert!(elapsed >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_empty_library_scans_nothing() {
        let f = fixture(1000);
        let start = Instant::now();
        let summary = f.scanner.scan_all_books_for_series(false, 0.6).await.unwrap();

        assert_eq!(summary.scanned, 0);
        assert!(summary.items.is_empty());
        assert!(start.elapsed() < Duration::from_millis(1000));
    }

    #[test]
    fn test_implicit_series_by_author() {
        let f = fixture(0);
        for title in [
            "Wings of Fire: The Dragonet Prophecy",
            "Wings of Fire: The Lost Heir",
            "Unrelated Standalone",
        ] {
            seed_book(&f.pool, &Book::new(Uuid::new_v4(), title, "Tui T. Sutherland"));
        }
        seed_book(&f.pool, &Book::new(Uuid::new_v4(), "Wings of Fire: Other", "Someone Else"));

        let suggestions = f
            .scanner
            .detect_implicit_series_by_author("tui t. sutherland", 2)
            .unwrap();

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].series_name, "Wings of Fire");
        assert_eq!(suggestions[0].book_count, 2);
    }
}
