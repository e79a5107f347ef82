// src/engine.rs
//
// Composition root
//
// Wires infrastructure -> repositories -> services once, the way a host
// application would, and hands out shared handles.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::db::{create_connection_pool, default_database_path, initialize_database, ConnectionPool};
use crate::error::AppResult;
use crate::events::EventBus;
use crate::repositories::{BookRepository, SeriesRepository, SqliteBookRepository, SqliteSeriesRepository};
use crate::services::{SeriesRegistry, SeriesResolver, SeriesScanner};

/// All fields are Arc-wrapped for sharing across tasks
pub struct SeriesEngine {
    pub config: EngineConfig,
    pub pool: Arc<ConnectionPool>,
    pub event_bus: Arc<EventBus>,
    pub resolver: Arc<SeriesResolver>,
    pub registry: Arc<SeriesRegistry>,
    pub scanner: Arc<SeriesScanner>,
}

impl SeriesEngine {
    /// Opens the configured database (or the per-user default) and builds the
    /// full cascade, AI included when an API key is configured
    pub fn open(config: EngineConfig) -> AppResult<Self> {
        let db_path = match &config.database_path {
            Some(path) => path.clone(),
            None => default_database_path()?,
        };
        log::info!("Opening series database at {}", db_path.display());

        let pool = Arc::new(create_connection_pool(&db_path)?);
        let resolver = SeriesResolver::from_config(&config)?;

        Self::with_pool(pool, config, resolver)
    }

    /// Builds the engine over an existing pool and resolver
    pub fn with_pool(
        pool: Arc<ConnectionPool>,
        config: EngineConfig,
        resolver: SeriesResolver,
    ) -> AppResult<Self> {
        // 1. INFRASTRUCTURE
        {
            let conn = pool.get()?;
            initialize_database(&conn)?;
        }
        let event_bus = Arc::new(EventBus::new());

        // 2. REPOSITORIES
        let series_repo: Arc<dyn SeriesRepository> = Arc::new(SqliteSeriesRepository::new(pool.clone()));
        let book_repo: Arc<dyn BookRepository> = Arc::new(SqliteBookRepository::new(pool.clone()));

        // 3. SERVICES
        let resolver = Arc::new(resolver);
        let registry = Arc::new(SeriesRegistry::new(
            series_repo,
            resolver.clone(),
            event_bus.clone(),
            config.thresholds,
        ));
        let scanner = Arc::new(SeriesScanner::new(
            book_repo,
            registry.clone(),
            event_bus.clone(),
            &config.scan,
        ));

        Ok(Self {
            config,
            pool,
            event_bus,
            resolver,
            registry,
            scanner,
        })
    }

    /// Batch scan with the configured link gate
    pub async fn scan(&self, use_ai: bool) -> AppResult<crate::services::ScanSummary> {
        self.scanner
            .scan_all_books_for_series(use_ai, self.config.thresholds.link_min_confidence)
            .await
    }
}
