//! Sample a seed record, then find its nearest neighbors.

use tracing::{debug, info};

use crate::config::SearchConfig;
use crate::error::MatchError;
use crate::patient::{display_id, Neighbor, PatientRecord, EMBEDDING_PATH};
use crate::store::{NeighborQuery, PatientStore};

#[derive(Debug, Clone)]
pub struct NearestMatches {
    pub seed: PatientRecord,
    pub neighbors: Vec<Neighbor>,
}

/// Runs the two-step lookup against `store`.
///
/// Fails with [`MatchError::NoEmbeddedRecords`] when nothing can be sampled
/// and with [`MatchError::MalformedRecord`] when the sampled record has no
/// usable embedding; in neither case is a search issued.
pub async fn find_nearest<S>(store: &S, config: &SearchConfig) -> Result<NearestMatches, MatchError>
where
    S: PatientStore + Sync + ?Sized,
{
    config.validate()?;

    let seed = store
        .sample_embedded()
        .await?
        .ok_or(MatchError::NoEmbeddedRecords { path: EMBEDDING_PATH })?;
    let vector = seed.embedding()?.to_vec();
    info!(seed = %display_id(&seed.id), dimension = vector.len(), "Sampled seed record");

    let query = NeighborQuery {
        vector,
        exclude: seed.id.clone(),
        index: config.index.clone(),
        num_candidates: config.num_candidates,
        limit: config.limit,
    };
    let neighbors = store.nearest(&query).await?;
    debug!(count = neighbors.len(), "Vector search returned");

    Ok(NearestMatches { seed, neighbors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patient::MemberMatchValue;
    use crate::store::MemoryStore;
    use mongodb::bson::Bson;
    use std::collections::HashSet;

    fn patient(id: i64, embedding: Option<Vec<f32>>) -> PatientRecord {
        PatientRecord {
            id: Bson::Int64(id),
            member: MemberMatchValue {
                first_name: Some(Bson::String(format!("F{id}"))),
                last_name: Some(Bson::String(format!("L{id}"))),
                identity_embedding: embedding,
                ..MemberMatchValue::default()
            },
        }
    }

    fn grid_store(n: i64) -> MemoryStore {
        MemoryStore::from_records(
            (0..n)
                .map(|i| {
                    let angle = i as f32 * 0.3;
                    patient(i, Some(vec![angle.cos(), angle.sin(), 0.1]))
                })
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_never_returns_seed_and_respects_limit() {
        let store = grid_store(12);
        for _ in 0..30 {
            let matches = find_nearest(&store, &SearchConfig::default()).await.unwrap();

            assert!(matches.neighbors.len() <= 3);
            assert!(matches.neighbors.iter().all(|n| n.id != matches.seed.id));
            assert!(matches.neighbors.windows(2).all(|w| w[0].score >= w[1].score));
        }
    }

    #[tokio::test]
    async fn test_small_collection_returns_fewer() {
        let store = grid_store(2);
        let matches = find_nearest(&store, &SearchConfig::default()).await.unwrap();

        assert_eq!(matches.neighbors.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_collection_fails_fast() {
        let store = MemoryStore::from_records(vec![patient(1, None), patient(2, None)]);
        let result = find_nearest(&store, &SearchConfig::default()).await;

        assert!(matches!(result, Err(MatchError::NoEmbeddedRecords { .. })));
    }

    #[tokio::test]
    async fn test_empty_seed_embedding_is_malformed() {
        let store = MemoryStore::from_records(vec![patient(7, Some(Vec::new()))]);
        let result = find_nearest(&store, &SearchConfig::default()).await;

        match result {
            Err(MatchError::MalformedRecord { id, .. }) => assert_eq!(id, "7"),
            other => panic!("Expected malformed record, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_zero_vector_record_does_not_block_lookups() {
        let store = MemoryStore::from_records(vec![
            patient(1, Some(vec![1.0, 0.0])),
            patient(2, Some(vec![0.9, 0.1])),
            patient(3, Some(vec![0.5, 0.5])),
            patient(4, Some(vec![0.0, 1.0])),
            patient(5, Some(vec![0.0, 0.0])),
        ]);

        for _ in 0..40 {
            match find_nearest(&store, &SearchConfig::default()).await {
                Ok(matches) => {
                    assert_eq!(matches.neighbors.len(), 3);
                    assert!(matches.neighbors.iter().all(|n| n.id != Bson::Int64(5)));
                }
                // Only the zero record itself may fail, and only as a bad seed
                Err(MatchError::MalformedRecord { id, reason }) => {
                    assert_eq!(id, "5");
                    assert!(reason.contains("zero vector"));
                }
                Err(other) => panic!("Unexpected error: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_sampling() {
        let store = grid_store(5);
        let config = SearchConfig { limit: 0, ..SearchConfig::default() };

        assert!(matches!(find_nearest(&store, &config).await, Err(MatchError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_seed_varies_across_runs() {
        let store = grid_store(20);
        let mut seeds = HashSet::new();
        for _ in 0..50 {
            let matches = find_nearest(&store, &SearchConfig::default()).await.unwrap();
            seeds.insert(display_id(&matches.seed.id));
        }
        assert!(seeds.len() > 1);
    }
}
