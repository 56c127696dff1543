use std::str::FromStr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use sqlx::postgres::PgConnectOptions;
use vecseed_core::{DistanceMetric, VecseedError};
use vecseed_pgvector::{IndexKind, PgConfig};

use crate::pipeline::{InsertFailurePolicy, SeedConfig};

/// Seed a pgvector table with synthetic documents and run a nearest-neighbor query.
#[derive(Parser, Debug, Clone)]
#[command(name = "vecseed", version, about)]
pub struct Cli {
    /// Full connection string. Overrides the individual connection flags.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "PGHOST", default_value = "localhost")]
    pub host: String,

    #[arg(long, env = "PGPORT", default_value_t = 5432)]
    pub port: u16,

    #[arg(long, env = "PGDATABASE", default_value = "vector_database")]
    pub database: String,

    #[arg(long, env = "PGUSER", default_value = "admin")]
    pub user: String,

    #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Table to drop, recreate and fill.
    #[arg(long, env = "VECSEED_TABLE", default_value = "documents")]
    pub table: String,

    /// Embedding dimensionality of the `vector` column.
    #[arg(
        long,
        env = "VECSEED_DIMENSIONS",
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(1..=16000)
    )]
    pub dimensions: u32,

    /// Number of synthetic documents to insert.
    #[arg(long, env = "VECSEED_COUNT", default_value_t = 20)]
    pub count: usize,

    /// Number of nearest neighbors to report.
    #[arg(long, env = "VECSEED_TOP_K", default_value_t = 3)]
    pub top_k: usize,

    #[arg(long, env = "VECSEED_METRIC", value_enum, default_value_t = MetricArg::L2)]
    pub metric: MetricArg,

    /// Approximate index to build on the embedding column.
    #[arg(long, env = "VECSEED_INDEX", value_enum, default_value_t = IndexArg::None)]
    pub index: IndexArg,

    /// Number of lists for an ivfflat index.
    #[arg(long, env = "VECSEED_IVFFLAT_LISTS", default_value_t = 100)]
    pub ivfflat_lists: u32,

    /// Seed for the random generator. Omit for non-reproducible data.
    #[arg(long, env = "VECSEED_SEED")]
    pub seed: Option<u64>,

    /// Seconds to wait for the connection. 0 waits forever.
    #[arg(long, env = "VECSEED_CONNECT_TIMEOUT", default_value_t = 10)]
    pub connect_timeout: u64,

    /// Report a failed insert and still run the search.
    #[arg(long)]
    pub continue_on_insert_error: bool,

    /// Run against an in-memory store instead of PostgreSQL.
    #[arg(long)]
    pub dry_run: bool,
}

/// `--metric` values, mapped onto [`DistanceMetric`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum MetricArg {
    /// Euclidean distance
    L2,
    /// Cosine distance
    Cosine,
    /// Negative inner product
    InnerProduct,
}

impl From<MetricArg> for DistanceMetric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::L2 => DistanceMetric::L2,
            MetricArg::Cosine => DistanceMetric::Cosine,
            MetricArg::InnerProduct => DistanceMetric::InnerProduct,
        }
    }
}

/// `--index` values, mapped onto [`IndexKind`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum IndexArg {
    /// Exact sequential scan
    None,
    /// HNSW graph index
    Hnsw,
    /// IVFFlat index with `--ivfflat-lists` lists
    Ivfflat,
}

impl Cli {
    /// Connection options from `--database-url` if given, otherwise from the
    /// individual connection flags.
    pub fn connect_options(&self) -> Result<PgConnectOptions, VecseedError> {
        if let Some(url) = &self.database_url {
            return PgConnectOptions::from_str(url)
                .map_err(|e| VecseedError::Config(format!("invalid database url: {e}")));
        }

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user);
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }

    /// Table, dimensions, metric, index and timeout for the PostgreSQL store.
    pub fn pg_config(&self) -> Result<PgConfig, VecseedError> {
        if self.table.is_empty() {
            return Err(VecseedError::Config("table name must not be empty".to_string()));
        }

        let index = match self.index {
            IndexArg::None => IndexKind::None,
            IndexArg::Hnsw => IndexKind::Hnsw,
            IndexArg::Ivfflat => IndexKind::IvfFlat {
                lists: self.ivfflat_lists,
            },
        };

        let mut config = PgConfig::new(&self.table, self.dimensions)
            .with_metric(self.metric.into())
            .with_index(index);
        if self.connect_timeout > 0 {
            config = config.with_connect_timeout(Duration::from_secs(self.connect_timeout));
        }
        Ok(config)
    }

    /// Generation and search parameters for the [`Pipeline`](crate::Pipeline).
    pub fn seed_config(&self) -> SeedConfig {
        SeedConfig {
            count: self.count,
            top_k: self.top_k,
            seed: self.seed,
            on_insert_error: if self.continue_on_insert_error {
                InsertFailurePolicy::Continue
            } else {
                InsertFailurePolicy::Abort
            },
        }
    }
}
