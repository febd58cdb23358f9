//! Storage backends for patient records.
//!
//! A [`PatientStore`] answers the two queries the nearest-neighbor pipeline
//! needs (sample and search) plus the two the seeder needs (list pending
//! identities and write an embedding back). [`MongoStore`] talks to an
//! Atlas cluster; [`MemoryStore`] works over a JSON snapshot on disk.

use async_trait::async_trait;
use mongodb::bson::Bson;

use crate::error::MatchError;
use crate::patient::{Neighbor, PatientRecord, PendingIdentity};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A similarity search seeded by one record's embedding
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborQuery {
    pub vector: Vec<f32>,
    /// Record the search must never return, normally the seed itself
    pub exclude: Bson,
    pub index: String,
    pub num_candidates: usize,
    pub limit: usize,
}

impl NeighborQuery {
    /// Hits requested from the index before `exclude` is filtered out
    pub fn candidate_window(&self) -> usize {
        self.limit + 1
    }
}

#[async_trait]
pub trait PatientStore {
    /// One record with a populated embedding, chosen uniformly at random,
    /// or `None` when no record has one.
    async fn sample_embedded(&self) -> Result<Option<PatientRecord>, MatchError>;

    /// Up to `query.limit` records other than `query.exclude`, ordered by
    /// descending score.
    async fn nearest(&self, query: &NeighborQuery) -> Result<Vec<Neighbor>, MatchError>;

    /// Records with identity text but no embedding yet
    async fn pending_identities(&self) -> Result<Vec<PendingIdentity>, MatchError>;

    async fn store_embedding(&mut self, id: &Bson, embedding: &[f32]) -> Result<(), MatchError>;
}
