use async_trait::async_trait;

use crate::{Document, DistanceMetric, DocumentStore, NewDocument, ScoredDocument, VecseedError};

/// In-memory [`DocumentStore`] that mirrors the PostgreSQL table semantics:
/// sequential ids, a fixed embedding dimensionality, all-or-nothing inserts
/// and brute-force nearest-neighbor search.
pub struct InMemoryDocumentStore {
    dimensions: u32,
    metric: DistanceMetric,
    rows: Vec<Document>,
    next_id: i64,
    closed: bool,
}

impl InMemoryDocumentStore {
    pub fn new(dimensions: u32) -> Self {
        Self {
            dimensions,
            metric: DistanceMetric::default(),
            rows: Vec::new(),
            next_id: 1,
            closed: false,
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Stored rows in insertion order.
    pub fn documents(&self) -> &[Document] {
        &self.rows
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> Result<(), VecseedError> {
        if self.closed {
            return Err(VecseedError::Connection(
                "connection already closed".to_string(),
            ));
        }
        Ok(())
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<(), String> {
        if embedding.len() != self.dimensions as usize {
            return Err(format!(
                "expected {} dimensions, not {}",
                self.dimensions,
                embedding.len()
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn dimensions(&self) -> u32 {
        self.dimensions
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn reset_schema(&mut self) -> Result<(), VecseedError> {
        self.ensure_open()?;
        self.rows.clear();
        self.next_id = 1;
        Ok(())
    }

    async fn insert_documents(&mut self, docs: &[NewDocument]) -> Result<u64, VecseedError> {
        self.ensure_open()?;

        // Validate the whole batch before touching any row.
        for doc in docs {
            self.check_dimensions(&doc.embedding)
                .map_err(|e| VecseedError::Insert(format!("batch rolled back: {e}")))?;
        }

        for doc in docs {
            self.rows.push(Document {
                id: self.next_id,
                title: doc.title.clone(),
                content: doc.content.clone(),
                embedding: doc.embedding.clone(),
            });
            self.next_id += 1;
        }

        Ok(docs.len() as u64)
    }

    async fn similarity_search(
        &mut self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredDocument>, VecseedError> {
        self.ensure_open()?;
        self.check_dimensions(embedding)
            .map_err(VecseedError::Search)?;

        let mut scored: Vec<ScoredDocument> = self
            .rows
            .iter()
            .map(|row| ScoredDocument {
                id: row.id,
                title: row.title.clone(),
                content: row.content.clone(),
                distance: self.metric.distance(embedding, &row.embedding),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&mut self) -> Result<i64, VecseedError> {
        self.ensure_open()?;
        Ok(self.rows.len() as i64)
    }

    async fn close(&mut self) -> Result<(), VecseedError> {
        self.closed = true;
        Ok(())
    }
}
