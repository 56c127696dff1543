//! Core types shared by the vecseed crates.
//!
//! This crate defines the [`Document`] model, the [`DocumentStore`] trait that
//! the PostgreSQL backend and the in-memory backend both implement, the
//! [`VecseedError`] type returned by every pipeline stage, and the synthetic
//! data generator in [`generator`].

mod in_memory;

pub mod generator;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use in_memory::InMemoryDocumentStore;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A document that has not been persisted yet and therefore has no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

impl NewDocument {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            embedding,
        }
    }
}

/// A persisted document row. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A document returned by a nearest-neighbor query together with its distance
/// to the query vector (lower = closer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub distance: f64,
}

// ---------------------------------------------------------------------------
// Distance metrics
// ---------------------------------------------------------------------------

/// Distance operator used to rank stored embeddings against a query vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceMetric {
    /// Euclidean distance, pgvector `<->`.
    #[default]
    L2,
    /// Cosine distance, pgvector `<=>`.
    Cosine,
    /// Negative inner product, pgvector `<#>`.
    InnerProduct,
}

impl DistanceMetric {
    /// The pgvector SQL operator for this metric.
    pub fn operator(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "<->",
            DistanceMetric::Cosine => "<=>",
            DistanceMetric::InnerProduct => "<#>",
        }
    }

    /// The pgvector operator class used when indexing with this metric.
    pub fn operator_class(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "vector_l2_ops",
            DistanceMetric::Cosine => "vector_cosine_ops",
            DistanceMetric::InnerProduct => "vector_ip_ops",
        }
    }

    /// Name accepted on the command line and shown in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::InnerProduct => "inner-product",
        }
    }

    /// Compute the distance between two vectors of equal length the same way
    /// pgvector does. Cosine distance against a zero vector is `NaN`.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            DistanceMetric::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| {
                    let d = f64::from(*x) - f64::from(*y);
                    d * d
                })
                .sum::<f64>()
                .sqrt(),
            DistanceMetric::Cosine => {
                let dot = dot(a, b);
                let norm_a = dot_self(a).sqrt();
                let norm_b = dot_self(b).sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return f64::NAN;
                }
                1.0 - dot / (norm_a * norm_b)
            }
            DistanceMetric::InnerProduct => -dot(a, b),
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum()
}

fn dot_self(a: &[f32]) -> f64 {
    dot(a, a)
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = VecseedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "cosine" => Ok(DistanceMetric::Cosine),
            "inner-product" | "ip" => Ok(DistanceMetric::InnerProduct),
            other => Err(VecseedError::Config(format!(
                "unknown distance metric '{other}' (expected l2, cosine or inner-product)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type with one variant per pipeline stage, so the caller can decide
/// per stage whether to continue or abort.
#[derive(Debug, Error)]
pub enum VecseedError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("insert error: {0}")]
    Insert(String),
    #[error("search error: {0}")]
    Search(String),
    #[error("query error: {0}")]
    Query(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// DocumentStore trait
// ---------------------------------------------------------------------------

/// A table of documents with fixed-dimension embeddings that supports a
/// destructive reset, an all-or-nothing bulk insert and a nearest-neighbor
/// query.
#[async_trait]
pub trait DocumentStore: Send {
    /// Number of components every stored embedding must have.
    fn dimensions(&self) -> u32;

    /// Distance metric used by [`similarity_search`](DocumentStore::similarity_search).
    fn metric(&self) -> DistanceMetric;

    /// Drop and recreate the backing table. Any existing rows are discarded.
    async fn reset_schema(&mut self) -> Result<(), VecseedError>;

    /// Insert all documents in a single transaction and return the number of
    /// rows inserted. On failure nothing is retained.
    async fn insert_documents(&mut self, docs: &[NewDocument]) -> Result<u64, VecseedError>;

    /// Return at most `k` documents ordered by ascending distance to `embedding`.
    async fn similarity_search(
        &mut self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>, VecseedError>;

    /// Number of rows currently stored.
    async fn count(&mut self) -> Result<i64, VecseedError>;

    /// Release the underlying connection. Calling it twice is a no-op.
    async fn close(&mut self) -> Result<(), VecseedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_distance() {
        let d = DistanceMetric::L2.distance(&[0.0, 0.0, 0.0], &[3.0, 4.0, 0.0]);
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn cosine_distance_of_parallel_vectors_is_zero() {
        let d = DistanceMetric::Cosine.distance(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!(d.abs() < 1e-6, "got {d}");
    }

    #[test]
    fn cosine_distance_with_zero_vector_is_nan() {
        assert!(DistanceMetric::Cosine
            .distance(&[0.0, 0.0], &[1.0, 1.0])
            .is_nan());
    }

    #[test]
    fn inner_product_is_negated() {
        let d = DistanceMetric::InnerProduct.distance(&[1.0, 2.0], &[3.0, 4.0]);
        assert!((d + 11.0).abs() < 1e-9);
    }

    #[test]
    fn metric_operators() {
        assert_eq!(DistanceMetric::L2.operator(), "<->");
        assert_eq!(DistanceMetric::Cosine.operator(), "<=>");
        assert_eq!(DistanceMetric::InnerProduct.operator(), "<#>");
        assert_eq!(DistanceMetric::default(), DistanceMetric::L2);
    }

    #[test]
    fn metric_from_str() {
        assert_eq!("L2".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert_eq!(
            "cosine".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Cosine
        );
        assert_eq!(
            "ip".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::InnerProduct
        );
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn error_display() {
        let err = VecseedError::Insert("expected 3 dimensions, not 4".into());
        assert_eq!(err.to_string(), "insert error: expected 3 dimensions, not 4");

        let err = VecseedError::Query("relation \"documents\" does not exist".into());
        assert_eq!(
            err.to_string(),
            "query error: relation \"documents\" does not exist"
        );
    }
}
