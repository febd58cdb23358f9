//! MongoDB Atlas store.
//!
//! Sampling and similarity search run as aggregation pipelines on the
//! server; the vector search itself is the managed `$vectorSearch` stage,
//! so scores come straight from the index as `vectorSearchScore`.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, Bson, Document},
    Client, Collection,
};
use tracing::{debug, info, warn};

use crate::config::MongoConfig;
use crate::error::MatchError;
use crate::patient::{
    display_id, Neighbor, PatientRecord, PendingIdentity, EMBEDDING_PATH, IDENTITY_TEXT_PATH,
    MEMBER_FIELD,
};
use crate::store::{NeighborQuery, PatientStore};

/// Fields copied out of the member block into each search hit
const PROJECTED_FIELDS: [&str; 4] = ["firstName", "lastName", "birthDate", "memberGroupID"];

pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Connects and pings the deployment so a bad URI fails here rather
    /// than on the first query.
    pub async fn connect(config: &MongoConfig) -> Result<Self, MatchError> {
        let client = Client::with_uri_str(&config.uri).await?;
        let database = client.database(&config.database);
        database.run_command(doc! { "ping": 1 }).await?;

        info!(database = %config.database, collection = %config.collection, "Connected to MongoDB");
        Ok(MongoStore { collection: database.collection(&config.collection) })
    }
}

/// `$match` on a populated embedding, then `$sample` one document
pub fn sample_pipeline() -> Vec<Document> {
    vec![
        doc! { "$match": { EMBEDDING_PATH: { "$exists": true, "$ne": Bson::Null } } },
        doc! { "$sample": { "size": 1 } },
    ]
}

/// `$vectorSearch` over a window one larger than the limit, then drop the
/// seed, cap at the limit and project the demographic fields with the score.
pub fn search_pipeline(query: &NeighborQuery) -> Vec<Document> {
    let query_vector: Vec<Bson> = query.vector.iter().map(|v| Bson::Double(f64::from(*v))).collect();

    let mut projection = doc! { "score": { "$meta": "vectorSearchScore" } };
    for field in PROJECTED_FIELDS {
        projection.insert(field, format!("${MEMBER_FIELD}.{field}"));
    }

    vec![
        doc! {
            "$vectorSearch": {
                "index": query.index.as_str(),
                "path": EMBEDDING_PATH,
                "queryVector": query_vector,
                "numCandidates": count(query.num_candidates),
                "limit": count(query.candidate_window()),
            }
        },
        doc! { "$match": { "_id": { "$ne": query.exclude.clone() } } },
        doc! { "$limit": count(query.limit) },
        doc! { "$project": projection },
    ]
}

/// Identity text present, embedding missing or null. An equality match on
/// null covers both, the same way a snapshot reads either as `None`.
pub fn pending_filter() -> Document {
    doc! {
        IDENTITY_TEXT_PATH: { "$exists": true },
        EMBEDDING_PATH: Bson::Null,
    }
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn record_id(doc: &Document) -> String {
    doc.get("_id").map(display_id).unwrap_or_else(|| "<no _id>".to_string())
}

#[async_trait]
impl PatientStore for MongoStore {
    async fn sample_embedded(&self) -> Result<Option<PatientRecord>, MatchError> {
        let mut cursor = self.collection.aggregate(sample_pipeline()).await?;
        let Some(doc) = cursor.try_next().await? else {
            return Ok(None);
        };

        let id = record_id(&doc);
        let record: PatientRecord = from_document(doc)
            .map_err(|e| MatchError::MalformedRecord { id: id.clone(), reason: e.to_string() })?;
        debug!(id = %id, "Sampled seed record");
        Ok(Some(record))
    }

    async fn nearest(&self, query: &NeighborQuery) -> Result<Vec<Neighbor>, MatchError> {
        let docs: Vec<Document> = self
            .collection
            .aggregate(search_pipeline(query))
            .await?
            .try_collect()
            .await?;

        docs.into_iter()
            .map(|doc| {
                let id = record_id(&doc);
                from_document::<Neighbor>(doc)
                    .map_err(|e| MatchError::MalformedRecord { id, reason: e.to_string() })
            })
            .collect()
    }

    async fn pending_identities(&self) -> Result<Vec<PendingIdentity>, MatchError> {
        let docs: Vec<Document> = self
            .collection
            .find(pending_filter())
            .projection(doc! { "_id": 1, IDENTITY_TEXT_PATH: 1 })
            .await?
            .try_collect()
            .await?;

        let mut pending = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = record_id(&doc);
            let record: PatientRecord = from_document(doc)
                .map_err(|e| MatchError::MalformedRecord { id: id.clone(), reason: e.to_string() })?;
            match record.member.identity_text {
                Some(text) => pending.push(PendingIdentity { id: record.id, text }),
                None => warn!(id = %id, "identityText is null, skipping"),
            }
        }
        Ok(pending)
    }

    async fn store_embedding(&mut self, id: &Bson, embedding: &[f32]) -> Result<(), MatchError> {
        let vector: Vec<Bson> = embedding.iter().map(|v| Bson::Double(f64::from(*v))).collect();
        let result = self
            .collection
            .update_one(doc! { "_id": id.clone() }, doc! { "$set": { EMBEDDING_PATH: vector } })
            .await?;

        if result.matched_count == 0 {
            return Err(MatchError::RecordNotFound(display_id(id)));
        }
        Ok(())
    }
}
