//! PostgreSQL + pgvector backend for vecseed.
//!
//! This crate provides [`PgDocumentStore`], an implementation of the
//! [`DocumentStore`](vecseed_core::DocumentStore) trait backed by a single
//! PostgreSQL connection with the
//! [pgvector](https://github.com/pgvector/pgvector) extension. Documents live in
//! one table with a `vector(<dimensions>)` column, and nearest-neighbor queries
//! use pgvector's distance operators (`<->`, `<=>`, `<#>`).
//!
//! # Quick start
//!
//! ```rust,no_run
//! use sqlx::postgres::PgConnectOptions;
//! use vecseed_pgvector::{DocumentStore, PgConfig, PgDocumentStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = PgConnectOptions::new()
//!     .host("localhost")
//!     .database("vector_database")
//!     .username("admin");
//!
//! let mut store = PgDocumentStore::connect(&options, PgConfig::new("documents", 3)).await?;
//! store.reset_schema().await?;
//! store.close().await?;
//! # Ok(())
//! # }
//! ```

mod document_store;

pub use document_store::{IndexKind, PgConfig, PgDocumentStore};

// Re-export core traits/types for convenience.
pub use vecseed_core::{DistanceMetric, DocumentStore, NewDocument, ScoredDocument, VecseedError};
