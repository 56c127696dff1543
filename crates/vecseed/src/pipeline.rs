use std::io::Write;

use vecseed_core::generator::{generate_documents, random_vector, rng_from_seed};
use vecseed_core::{DocumentStore, ScoredDocument, VecseedError};

/// What to do when the bulk insert fails and has been rolled back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertFailurePolicy {
    /// Stop the run and return the insert error.
    #[default]
    Abort,
    /// Report the error and run the search anyway, against whatever the
    /// table holds.
    Continue,
}

/// Parameters of one seeding run.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Number of synthetic documents to generate and insert.
    pub count: usize,
    /// Number of nearest neighbors to report.
    pub top_k: usize,
    /// Seed for document and query vectors. `None` uses OS entropy.
    pub seed: Option<u64>,
    /// Whether a rolled-back insert stops the run.
    pub on_insert_error: InsertFailurePolicy,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            count: 20,
            top_k: 3,
            seed: None,
            on_insert_error: InsertFailurePolicy::default(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub inserted: u64,
    pub query: Vec<f32>,
    pub results: Vec<ScoredDocument>,
}

/// Reset schema → generate → insert → search, reported to a writer with
/// `[stage]` prefixes.
pub struct Pipeline {
    config: SeedConfig,
}

impl Pipeline {
    pub fn new(config: SeedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SeedConfig {
        &self.config
    }

    /// Run every stage against `store`, then close it. The store is closed on
    /// every exit path; a stage error takes precedence over a close error.
    pub async fn run<S, W>(&self, store: &mut S, out: &mut W) -> Result<RunSummary, VecseedError>
    where
        S: DocumentStore + ?Sized,
        W: Write,
    {
        let result = self.run_stages(store, out).await;
        let closed = store.close().await;

        if let Err(e) = &result {
            tracing::error!(error = %e, "seeding run failed");
        }
        let summary = result?;
        closed?;

        writeln!(out, "\n[done] finished successfully")?;
        Ok(summary)
    }

    async fn run_stages<S, W>(&self, store: &mut S, out: &mut W) -> Result<RunSummary, VecseedError>
    where
        S: DocumentStore + ?Sized,
        W: Write,
    {
        let dimensions = store.dimensions() as usize;

        writeln!(out, "[setup] configuring database...")?;
        store.reset_schema().await?;
        writeln!(out, "[setup] table created (dimensions = {dimensions})")?;

        let mut rng = rng_from_seed(self.config.seed);
        writeln!(out, "[generate] generating {} test records...", self.config.count)?;
        let docs = generate_documents(self.config.count, dimensions, &mut rng);

        writeln!(out, "[insert] inserting records...")?;
        let inserted = match store.insert_documents(&docs).await {
            Ok(n) => {
                writeln!(out, "[insert] inserted {n} records")?;
                n
            }
            Err(e) => match self.config.on_insert_error {
                InsertFailurePolicy::Abort => return Err(e),
                InsertFailurePolicy::Continue => {
                    tracing::warn!(error = %e, "insert failed, continuing to search");
                    writeln!(out, "[insert] {e}; continuing")?;
                    0
                }
            },
        };

        writeln!(out, "\n[search] running similarity search...")?;
        let query = random_vector(dimensions, &mut rng);
        writeln!(out, "[search] query vector: {}", format_vector(&query))?;

        let results = store.similarity_search(&query, self.config.top_k).await?;
        writeln!(
            out,
            "\n[search] top {} closest results ({}):",
            results.len(),
            store.metric()
        )?;
        for hit in &results {
            writeln!(out, "   - [distance: {:.4}] {}", hit.distance, hit.title)?;
        }

        Ok(RunSummary {
            inserted,
            query,
            results,
        })
    }
}

/// Render a vector as `[0.1234, 0.5678]`.
pub fn format_vector(v: &[f32]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.4}")).collect();
    format!("[{}]", parts.join(", "))
}
