//! vecseed: seed a pgvector table with synthetic documents, then run one
//! nearest-neighbor query against it.
//!
//! The binary is a thin shell over [`Pipeline`]: it reads [`Cli`] from flags
//! and environment, opens a [`PgDocumentStore`](vecseed_pgvector::PgDocumentStore)
//! (or an in-memory store with `--dry-run`), and prints the run report.

pub mod config;
pub mod pipeline;

pub use config::Cli;
pub use pipeline::{format_vector, InsertFailurePolicy, Pipeline, RunSummary, SeedConfig};
