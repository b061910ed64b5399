use crate::config::AppConfig;
use crate::errors::ServiceError;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection failed: {}", e);
        ServiceError::from(e)
    })?;

    info!("Database connection pool established successfully");
    Ok(db_pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs the embedded migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::from);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => info!(
            "Database migrations completed successfully in {:?}",
            elapsed
        ),
        Err(e) => error!("Database migrations failed after {:?}: {}", elapsed, e),
    }

    result
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    debug!("Checking database connection");
    pool.ping().await.map_err(|e| {
        error!("Database connection check failed: {}", e);
        ServiceError::from(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_sqlite_migrates_and_pings() {
        let config = DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = establish_connection_with_config(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        // second run is a no-op
        run_migrations(&pool).await.unwrap();
        check_connection(&pool).await.unwrap();
    }

    #[test]
    fn db_config_follows_app_config_tuning() {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );
        cfg.db_max_connections = 3;
        let db: DbConfig = (&cfg).into();
        assert_eq!(db.max_connections, 3);
        assert_eq!(db.url, "sqlite::memory:");
    }
}
