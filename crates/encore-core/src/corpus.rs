use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::embedding::EmbeddingService;
use crate::error::Result;
use crate::model::ExampleRecord;

/// The durable set of past synthesis outcomes, split by reward.
///
/// Backed by an append-only JSONL log: loaded once at startup, appended to on
/// every new outcome, never rewritten in place. Corrections are new appended
/// records, not edits. The corpus is owned by the thread driving user-facing
/// state; it is not shared across threads.
pub struct ExampleCorpus {
    path: PathBuf,
    successes: Vec<ExampleRecord>,
    failures: Vec<ExampleRecord>,
}

impl ExampleCorpus {
    /// Load the corpus from `path`. A missing file yields an empty corpus;
    /// malformed lines are skipped with a debug log.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut successes = Vec::new();
        let mut failures = Vec::new();

        if path.exists() {
            let file = std::fs::File::open(&path)?;
            let reader = std::io::BufReader::new(file);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<ExampleRecord>(&line) {
                    Ok(record) => {
                        if record.is_success() {
                            successes.push(record);
                        } else {
                            failures.push(record);
                        }
                    }
                    Err(e) => tracing::debug!("skipping malformed corpus line: {e}"),
                }
            }
        }

        tracing::debug!(
            successes = successes.len(),
            failures = failures.len(),
            "loaded example corpus"
        );

        Ok(Self {
            path,
            successes,
            failures,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn successes(&self) -> &[ExampleRecord] {
        &self.successes
    }

    pub fn failures(&self) -> &[ExampleRecord] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }

    /// Append one outcome: durable JSONL write first, then the in-memory
    /// split. The embedding travels with the record when already computed.
    pub fn append(&mut self, record: ExampleRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(&record)?;
        writeln!(file, "{line}")?;
        file.flush()?;

        if record.is_success() {
            self.successes.push(record);
        } else {
            self.failures.push(record);
        }
        Ok(())
    }

    /// Backfill missing embeddings in memory. The durable log is left
    /// untouched (append-only invariant); recomputation after a restart is
    /// accepted and idempotent for a fixed provider. Returns the number of
    /// records backfilled.
    pub async fn ensure_embeddings(&mut self, service: &EmbeddingService) -> Result<usize> {
        let mut filled = 0;
        for record in self
            .successes
            .iter_mut()
            .chain(self.failures.iter_mut())
            .filter(|r| r.embedding.is_none())
        {
            let embedding = service.embed(&record.prompt).await?;
            record.embedding = Some(embedding);
            filled += 1;
        }
        if filled > 0 {
            tracing::info!(count = filled, "backfilled corpus embeddings");
        }
        Ok(filled)
    }
}
