//! Snapshot-backed store
//! Keeps every patient record in memory and answers searches with an exact
//! scan, scored the same way the Atlas index scores them

use async_trait::async_trait;
use mongodb::bson::Bson;
use rand::seq::SliceRandom;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use tracing::debug;

use crate::error::MatchError;
use crate::patient::{display_id, Neighbor, PatientRecord, PendingIdentity};
use crate::store::{NeighborQuery, PatientStore};
use crate::vector::{l2_norm, Similarity, VectorError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<PatientRecord>,
    similarity: Similarity,
}

impl MemoryStore {
    /// Creates an empty store scoring with cosine similarity.
    ///
    /// # Examples
    ///
    /// ```
    /// use membermatch::store::MemoryStore;
    ///
    /// let store = MemoryStore::new();
    /// assert_eq!(store.count(), 0);
    /// ```
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn from_records(records: Vec<PatientRecord>) -> MemoryStore {
        MemoryStore { records, similarity: Similarity::default() }
    }

    /// Scores with `similarity` instead, mirroring the similarity an Atlas
    /// index was defined with.
    pub fn with_similarity(mut self, similarity: Similarity) -> MemoryStore {
        self.similarity = similarity;
        self
    }

    /// Inserts a record, replacing any record with the same `_id`.
    pub fn insert(&mut self, record: PatientRecord) {
        match self.records.iter().position(|r| r.id == record.id) {
            Some(index) => self.records[index] = record,
            None => self.records.push(record),
        }
    }

    pub fn get(&self, id: &Bson) -> Option<&PatientRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn records(&self) -> &[PatientRecord] {
        &self.records
    }

    /// Returns the number of records in the store.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Writes the records to `path` as a pretty-printed JSON array.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use membermatch::store::MemoryStore;
    ///
    /// let store = MemoryStore::load("patients.json").unwrap();
    /// store.save("patients.backup.json").unwrap();
    /// ```
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MatchError> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|source| MatchError::Snapshot { path: path.to_path_buf(), source })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.records)?;
        writer
            .flush()
            .map_err(|source| MatchError::Snapshot { path: path.to_path_buf(), source })?;
        debug!(path = %path.display(), records = self.records.len(), "Saved snapshot");
        Ok(())
    }

    /// Loads a snapshot previously written by [`save`](MemoryStore::save) or
    /// exported from the collection as a JSON array.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MatchError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|source| MatchError::Snapshot { path: path.to_path_buf(), source })?;

        let records: Vec<PatientRecord> = serde_json::from_reader(BufReader::new(file))?;
        debug!(path = %path.display(), records = records.len(), "Loaded snapshot");
        Ok(MemoryStore::from_records(records))
    }

    /// Scores every embedded record against the query. Records whose
    /// dimension differs from the query are skipped, as an index over a
    /// fixed dimension would never have indexed them. Zero vectors are
    /// skipped under cosine for the same reason.
    fn score_all(&self, query: &[f32]) -> Result<Vec<(usize, f64)>, MatchError> {
        if self.similarity == Similarity::Cosine {
            l2_norm(query)?;
        }

        let mut scored = Vec::with_capacity(self.records.len());
        for (i, record) in self.records.iter().enumerate() {
            let Some(vector) = record.member.identity_embedding.as_deref() else {
                continue;
            };
            if vector.len() != query.len() {
                debug!(id = %display_id(&record.id), dimension = vector.len(), "Skipping record with foreign dimension");
                continue;
            }
            match self.similarity.score(query, vector) {
                Ok(score) => scored.push((i, score)),
                Err(VectorError::Zero) => {
                    debug!(id = %display_id(&record.id), "Skipping zero vector");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(scored)
    }
}

#[async_trait]
impl PatientStore for MemoryStore {
    async fn sample_embedded(&self) -> Result<Option<PatientRecord>, MatchError> {
        let embedded: Vec<&PatientRecord> =
            self.records.iter().filter(|r| r.has_embedding()).collect();
        Ok(embedded.choose(&mut rand::thread_rng()).map(|r| (*r).clone()))
    }

    async fn nearest(&self, query: &NeighborQuery) -> Result<Vec<Neighbor>, MatchError> {
        let mut scored = self.score_all(&query.vector)?;
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        // Same shape as the aggregation: window of limit + 1, drop the seed, limit
        scored.truncate(query.candidate_window());
        let neighbors = scored
            .into_iter()
            .filter(|(i, _)| self.records[*i].id != query.exclude)
            .take(query.limit)
            .map(|(i, score)| self.records[i].to_neighbor(score))
            .collect();

        Ok(neighbors)
    }

    async fn pending_identities(&self) -> Result<Vec<PendingIdentity>, MatchError> {
        Ok(self
            .records
            .iter()
            .filter(|r| !r.has_embedding())
            .filter_map(|r| {
                r.member.identity_text.as_ref().map(|text| PendingIdentity {
                    id: r.id.clone(),
                    text: text.clone(),
                })
            })
            .collect())
    }

    async fn store_embedding(&mut self, id: &Bson, embedding: &[f32]) -> Result<(), MatchError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| MatchError::RecordNotFound(display_id(id)))?;

        record.member.identity_embedding = Some(embedding.to_vec());
        Ok(())
    }
}
