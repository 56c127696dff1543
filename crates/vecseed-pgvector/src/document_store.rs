use std::time::Duration;

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection, Postgres, QueryBuilder};
use vecseed_core::{DistanceMetric, DocumentStore, NewDocument, ScoredDocument, VecseedError};

/// PostgreSQL accepts at most 65535 bind parameters per statement and every
/// row binds three.
const MAX_ROWS_PER_STATEMENT: usize = 65535 / 3;

const HNSW_DEFAULT_EF_SEARCH: usize = 40;
const HNSW_MAX_EF_SEARCH: usize = 1000;

/// Approximate index to build on the embedding column after the table is
/// recreated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexKind {
    /// Exact search, no index.
    #[default]
    None,
    /// Hierarchical navigable small world graph.
    Hnsw,
    /// Inverted file index with `lists` clusters.
    IvfFlat {
        lists: u32,
    },
}

/// Configuration for a [`PgDocumentStore`] table.
#[derive(Debug, Clone)]
pub struct PgConfig {
    /// Name of the PostgreSQL table holding the documents.
    pub table_name: String,
    /// Dimensionality of the `embedding` column.
    pub vector_dimensions: u32,
    /// Distance operator used for search and for the index operator class.
    pub metric: DistanceMetric,
    /// Index built by `reset_schema`.
    pub index: IndexKind,
    /// Give up connecting after this long. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
}

impl PgConfig {
    /// Create a new configuration.
    ///
    /// # Panics
    ///
    /// Panics if `table_name` is empty or `vector_dimensions` is zero.
    pub fn new(table_name: impl Into<String>, vector_dimensions: u32) -> Self {
        let table_name = table_name.into();
        assert!(!table_name.is_empty(), "table_name must not be empty");
        assert!(vector_dimensions > 0, "vector_dimensions must be > 0");
        Self {
            table_name,
            vector_dimensions,
            metric: DistanceMetric::default(),
            index: IndexKind::default(),
            connect_timeout: None,
        }
    }

    /// Use `metric` for search and for the index operator class.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Build `index` on the embedding column when the table is recreated.
    pub fn with_index(mut self, index: IndexKind) -> Self {
        self.index = index;
        self
    }

    /// Fail the connect after `timeout` instead of waiting indefinitely.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

/// A [`DocumentStore`] backed by one PostgreSQL connection with pgvector.
///
/// The table has columns:
/// - `id bigserial PRIMARY KEY`
/// - `title text`
/// - `content text`
/// - `embedding vector(<dimensions>)`
///
/// [`reset_schema`](DocumentStore::reset_schema) drops and recreates it.
/// The connection is released by [`close`](DocumentStore::close), or when the
/// store is dropped.
pub struct PgDocumentStore {
    conn: Option<PgConnection>,
    config: PgConfig,
}

impl PgDocumentStore {
    /// Wrap an already open connection.
    pub fn new(conn: PgConnection, config: PgConfig) -> Self {
        Self {
            conn: Some(conn),
            config,
        }
    }

    /// Open a new connection with `options`.
    pub async fn connect(
        options: &PgConnectOptions,
        config: PgConfig,
    ) -> Result<Self, VecseedError> {
        tracing::info!(
            host = options.get_host(),
            port = options.get_port(),
            database = options.get_database().unwrap_or_default(),
            user = options.get_username(),
            "connecting to postgres"
        );

        let connecting = PgConnection::connect_with(options);
        let conn = match config.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, connecting)
                .await
                .map_err(|_| {
                    VecseedError::Connection(format!(
                        "timed out after {}s connecting to {}:{}",
                        timeout.as_secs(),
                        options.get_host(),
                        options.get_port()
                    ))
                })?,
            None => connecting.await,
        }
        .map_err(|e| VecseedError::Connection(e.to_string()))?;

        Ok(Self::new(conn, config))
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &PgConfig {
        &self.config
    }
}

fn open(conn: &mut Option<PgConnection>) -> Result<&mut PgConnection, VecseedError> {
    conn.as_mut()
        .ok_or_else(|| VecseedError::Connection("connection already closed".to_string()))
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn dimensions(&self) -> u32 {
        self.config.vector_dimensions
    }

    fn metric(&self) -> DistanceMetric {
        self.config.metric
    }

    async fn reset_schema(&mut self) -> Result<(), VecseedError> {
        validate_table_name(&self.config.table_name)?;
        let table = self.config.table_name.as_str();
        let conn = open(&mut self.conn)?;

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&mut *conn)
            .await
            .map_err(|e| VecseedError::Schema(format!("failed to create pgvector extension: {e}")))?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(&mut *conn)
            .await
            .map_err(|e| VecseedError::Schema(format!("failed to drop table: {e}")))?;

        sqlx::query(&create_table_sql(table, self.config.vector_dimensions))
            .execute(&mut *conn)
            .await
            .map_err(|e| VecseedError::Schema(format!("failed to create table: {e}")))?;

        if let Some(sql) = create_index_sql(table, self.config.metric, self.config.index) {
            sqlx::query(&sql)
                .execute(&mut *conn)
                .await
                .map_err(|e| VecseedError::Schema(format!("failed to create index: {e}")))?;
        }

        tracing::info!(
            table,
            dimensions = self.config.vector_dimensions,
            index = ?self.config.index,
            "table recreated"
        );
        Ok(())
    }

    async fn insert_documents(&mut self, docs: &[NewDocument]) -> Result<u64, VecseedError> {
        if docs.is_empty() {
            return Ok(0);
        }

        validate_table_name(&self.config.table_name)?;
        let prefix = format!(
            "INSERT INTO {table} (title, content, embedding) ",
            table = self.config.table_name,
        );
        let conn = open(&mut self.conn)?;

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| VecseedError::Insert(format!("failed to begin transaction: {e}")))?;

        let mut inserted = 0;
        for chunk in docs.chunks(MAX_ROWS_PER_STATEMENT) {
            let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(&prefix);
            builder.push_values(chunk, |mut row, doc| {
                row.push_bind(doc.title.as_str())
                    .push_bind(doc.content.as_str())
                    .push_bind(Vector::from(doc.embedding.clone()));
            });

            let result = builder.build().execute(&mut *tx).await;
            match result {
                Ok(done) => inserted += done.rows_affected(),
                Err(e) => {
                    tracing::warn!(error = %e, "bulk insert failed, rolling back");
                    tx.rollback().await.map_err(|re| {
                        VecseedError::Insert(format!("rollback failed: {re} (after: {e})"))
                    })?;
                    return Err(VecseedError::Insert(format!("batch rolled back: {e}")));
                }
            }
        }

        tx.commit()
            .await
            .map_err(|e| VecseedError::Insert(format!("commit failed: {e}")))?;

        tracing::info!(rows = inserted, "bulk insert committed");
        Ok(inserted)
    }

    async fn similarity_search(
        &mut self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>, VecseedError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        validate_table_name(&self.config.table_name)?;
        let sql = search_sql(&self.config.table_name, self.config.metric);
        let tuning = index_search_setting(self.config.index, k);
        let conn = open(&mut self.conn)?;

        if let Some(setting) = tuning {
            sqlx::query(&setting)
                .execute(&mut *conn)
                .await
                .map_err(|e| VecseedError::Search(format!("failed to tune index scan: {e}")))?;
        }

        let query_embedding = Vector::from(embedding.to_vec());

        let rows: Vec<(i64, Option<String>, Option<String>, f64)> = sqlx::query_as(&sql)
            .bind(&query_embedding)
            .bind(limit_param(k))
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| VecseedError::Search(format!("similarity search failed: {e}")))?;

        tracing::debug!(rows = rows.len(), metric = %self.config.metric, "similarity search done");

        Ok(rows
            .into_iter()
            .map(|(id, title, content, distance)| ScoredDocument {
                id,
                title: title.unwrap_or_default(),
                content: content.unwrap_or_default(),
                distance,
            })
            .collect())
    }

    async fn count(&mut self) -> Result<i64, VecseedError> {
        validate_table_name(&self.config.table_name)?;
        let sql = format!("SELECT count(*) FROM {}", self.config.table_name);
        let conn = open(&mut self.conn)?;

        sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| VecseedError::Query(format!("count failed: {e}")))
    }

    async fn close(&mut self) -> Result<(), VecseedError> {
        if let Some(conn) = self.conn.take() {
            conn.close()
                .await
                .map_err(|e| VecseedError::Connection(format!("failed to close connection: {e}")))?;
            tracing::debug!("connection closed");
        }
        Ok(())
    }
}

fn create_table_sql(table: &str, dimensions: u32) -> String {
    format!(
        r#"CREATE TABLE {table} (
            id bigserial PRIMARY KEY,
            title text,
            content text,
            embedding vector({dimensions})
        )"#
    )
}

fn create_index_sql(table: &str, metric: DistanceMetric, index: IndexKind) -> Option<String> {
    let ops = metric.operator_class();
    match index {
        IndexKind::None => None,
        IndexKind::Hnsw => Some(format!(
            "CREATE INDEX ON {table} USING hnsw (embedding {ops})"
        )),
        IndexKind::IvfFlat { lists } => Some(format!(
            "CREATE INDEX ON {table} USING ivfflat (embedding {ops}) WITH (lists = {lists})"
        )),
    }
}

/// Session setting that makes an approximate index scan return at least `k`
/// candidates. With the default `ivfflat.probes = 1` a single list is
/// scanned, which can hold fewer than `k` rows; probing every list keeps the
/// result exact.
fn index_search_setting(index: IndexKind, k: usize) -> Option<String> {
    match index {
        IndexKind::None => None,
        IndexKind::Hnsw => {
            let ef_search = k.clamp(HNSW_DEFAULT_EF_SEARCH, HNSW_MAX_EF_SEARCH);
            Some(format!("SET hnsw.ef_search = {ef_search}"))
        }
        IndexKind::IvfFlat { lists } => Some(format!("SET ivfflat.probes = {}", lists.max(1))),
    }
}

fn limit_param(k: usize) -> i64 {
    i64::try_from(k).unwrap_or(i64::MAX)
}

fn search_sql(table: &str, metric: DistanceMetric) -> String {
    format!(
        r#"SELECT id, title, content, (embedding {op} $1)::float8 AS distance
           FROM {table}
           ORDER BY distance ASC
           LIMIT $2"#,
        op = metric.operator(),
    )
}

/// Validate that a table name is safe to interpolate into SQL.
///
/// Allows alphanumeric ASCII characters, underscores, and dots (for
/// schema-qualified names like `public.documents`).
fn validate_table_name(name: &str) -> Result<(), VecseedError> {
    if name.is_empty() {
        return Err(VecseedError::Validation(
            "table name must not be empty".to_string(),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(VecseedError::Validation(format!(
            "invalid table name '{name}': only alphanumeric, underscore, and dot characters are allowed",
        )));
    }
    Ok(())
}
