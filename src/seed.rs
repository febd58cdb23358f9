//! Embeds identity texts that have no vector yet and writes the vectors
//! back to the store, one batch at a time.

use tracing::{info, warn};

use crate::config::SeedConfig;
use crate::embed::Embedder;
use crate::error::MatchError;
use crate::store::PatientStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub pending: usize,
    pub embedded: usize,
}

/// Embed every pending identity in batches of `config.batch_size`.
///
/// A batch is validated in full before any of it is written, so a dimension
/// mismatch leaves that batch untouched. Batches already written stay written.
pub async fn embed_pending<S, E>(
    store: &mut S,
    embedder: &E,
    config: &SeedConfig,
) -> Result<SeedReport, MatchError>
where
    S: PatientStore + Send + ?Sized,
    E: Embedder + Sync + ?Sized,
{
    config.validate()?;

    let pending = store.pending_identities().await?;
    info!(count = pending.len(), "Found documents to embed");

    let batches = pending.len().div_ceil(config.batch_size);
    let mut report = SeedReport { pending: pending.len(), embedded: 0 };

    for (n, batch) in pending.chunks(config.batch_size).enumerate() {
        let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;

        if vectors.len() != batch.len() {
            return Err(MatchError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != config.dimensions) {
            return Err(MatchError::DimensionMismatch { expected: config.dimensions, actual: bad.len() });
        }

        for (identity, vector) in batch.iter().zip(vectors.iter()) {
            store.store_embedding(&identity.id, vector).await?;
            report.embedded += 1;
        }
        info!(batch = n + 1, batches, embedded = report.embedded, "Embedded batch");
    }

    if report.pending == 0 {
        warn!("Nothing to embed");
    } else {
        info!(embedded = report.embedded, "Embeddings written");
    }
    Ok(report)
}
