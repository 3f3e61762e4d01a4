//! Configuration for the batch jobs
//!
//! Sources, lowest precedence first: the configuration file, `STRATA_`
//! environment variables, command-line flags.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use config::{Config, ConfigError, Environment};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde::de::DeserializeOwned;
use strata_common::{NumberFormat, StrataError};
use strata_docstore::DocumentStoreConfig;
use strata_migration::{DEFAULT_CHUNK_SIZE, DEFAULT_DUMP_DIR, MigrationOptions};

use crate::logging::{LogRotation, LoggingConfig};

pub const DEFAULT_CONFIG_FILE: &str = "conf/application.yml";

/// Move catalog attribute values into the document store
#[derive(Debug, Parser)]
#[command(name = "strata-migrate", version)]
pub struct Cli {
    /// Export the attribute and gallery tables to a JSON file first
    #[arg(long = "dump-tables")]
    pub dump_tables: bool,
    /// Migrate attribute values and galleries
    #[arg(long = "process")]
    pub process: bool,
    /// Delete migrated rows from the relational tables
    #[arg(long = "clean-tables")]
    pub clean_tables: bool,
    /// Ask the post-migration hooks to reindex
    #[arg(long = "reindex-after")]
    pub reindex_after: bool,
    /// Resume after this entity id
    #[arg(long = "start-after")]
    pub start_after: Option<i64>,
    #[arg(long = "chunk-size")]
    pub chunk_size: Option<u64>,
    #[arg(long = "db-url", env = "DATABASE_URL")]
    pub database_url: Option<String>,
    #[arg(short = 'c', long = "config", default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,
}

#[derive(Clone, Debug, Default)]
pub struct Configuration {
    pub config: Config,
}

impl Configuration {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .add_source(config::File::with_name(&cli.config).required(false))
            .add_source(
                Environment::with_prefix("strata")
                    .separator(".")
                    .try_parsing(true),
            );

        if let Some(v) = &cli.database_url {
            builder = builder.set_override("db.url", v.as_str())?;
        }
        if let Some(v) = cli.chunk_size {
            builder = builder.set_override("migration.chunk_size", v)?;
        }

        Ok(Configuration {
            config: builder.build()?,
        })
    }

    fn section<T: DeserializeOwned + Default>(&self, key: &str) -> anyhow::Result<T> {
        match self.config.get::<T>(key) {
            Ok(value) => Ok(value),
            Err(ConfigError::NotFound(_)) => Ok(T::default()),
            Err(e) => Err(StrataError::Configuration(format!("{}: {}", key, e)).into()),
        }
    }

    pub fn database_url(&self) -> Result<String, StrataError> {
        self.config
            .get_string("db.url")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| StrataError::Configuration("db.url is required".to_string()))
    }

    pub async fn database_connection(&self) -> anyhow::Result<DatabaseConnection> {
        let url = self.database_url()?;
        let max_connections = self.config.get_int("db.pool.max_connections").unwrap_or(10) as u32;
        let min_connections = self.config.get_int("db.pool.min_connections").unwrap_or(1) as u32;
        let connect_timeout = self.config.get_int("db.pool.connect_timeout").unwrap_or(30) as u64;
        let idle_timeout = self.config.get_int("db.pool.idle_timeout").unwrap_or(600) as u64;
        let sqlx_logging = self.config.get_bool("db.pool.sqlx_logging").unwrap_or(false);

        let mut opt = ConnectOptions::new(url);
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .idle_timeout(Duration::from_secs(idle_timeout))
            .sqlx_logging(sqlx_logging);

        tracing::info!(
            max_connections,
            min_connections,
            connect_timeout,
            "Connecting to relational store"
        );

        Ok(Database::connect(opt).await?)
    }

    pub fn docstore(&self) -> anyhow::Result<DocumentStoreConfig> {
        self.section("docstore")
    }

    pub fn number_format(&self) -> anyhow::Result<NumberFormat> {
        self.section("catalog.locale")
    }

    pub fn migration_options(&self, cli: &Cli) -> anyhow::Result<MigrationOptions> {
        let chunk_size = match self.config.get_int("migration.chunk_size") {
            Ok(v) if v > 0 => v as u64,
            Ok(v) => {
                return Err(StrataError::Configuration(format!(
                    "migration.chunk_size must be greater than 0, got {}",
                    v
                ))
                .into());
            }
            Err(_) => DEFAULT_CHUNK_SIZE,
        };
        let dump_dir = self
            .config
            .get_string("migration.dump_dir")
            .unwrap_or_else(|_| DEFAULT_DUMP_DIR.to_string());

        Ok(MigrationOptions {
            dump: cli.dump_tables,
            process: cli.process,
            clean: cli.clean_tables,
            reindex_after: cli.reindex_after,
            chunk_size,
            start_after: cli.start_after.unwrap_or(0),
            dump_dir: PathBuf::from(dump_dir),
            locale: self.number_format()?,
        })
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig::from_config(
            self.config.get_string("logging.dir").ok(),
            self.config.get_bool("logging.console").unwrap_or(true),
            self.config.get_bool("logging.file").unwrap_or(true),
            self.config
                .get_string("logging.level")
                .unwrap_or_else(|_| "info".to_string()),
            LogRotation::parse(
                &self
                    .config
                    .get_string("logging.rotation")
                    .unwrap_or_default(),
            ),
        )
    }
}
