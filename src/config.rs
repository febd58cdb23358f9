//! Typed settings for the database connection, the similarity search and
//! the embedding seeder. The CLI fills these from flags and environment
//! variables; library callers can use the defaults directly.

use crate::error::MatchError;

pub const DEFAULT_DATABASE: &str = "membermatch";
pub const DEFAULT_COLLECTION: &str = "patients";
pub const DEFAULT_INDEX: &str = "default";
pub const DEFAULT_NUM_CANDIDATES: usize = 10;
pub const DEFAULT_LIMIT: usize = 3;

pub const DEFAULT_VOYAGE_URL: &str = "https://api.voyageai.com/v1/embeddings";
pub const DEFAULT_VOYAGE_MODEL: &str = "voyage-4-large";
pub const DEFAULT_DIMENSIONS: usize = 1024;
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Atlas rejects `numCandidates` above this
pub const MAX_NUM_CANDIDATES: usize = 10_000;

#[derive(Debug, Clone)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl MongoConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        MongoConfig {
            uri: uri.into(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Name of the Atlas vector search index
    pub index: String,
    pub num_candidates: usize,
    pub limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            index: DEFAULT_INDEX.to_string(),
            num_candidates: DEFAULT_NUM_CANDIDATES,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl SearchConfig {
    /// Results fetched from the index before the seed is filtered out.
    /// One extra slot covers the seed matching itself.
    pub fn candidate_window(&self) -> usize {
        self.limit + 1
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.index.trim().is_empty() {
            return Err(MatchError::InvalidQuery("index name cannot be empty".to_string()));
        }
        if self.limit == 0 {
            return Err(MatchError::InvalidQuery("limit must be at least 1".to_string()));
        }
        if self.num_candidates < self.candidate_window() {
            return Err(MatchError::InvalidQuery(format!(
                "numCandidates ({}) must be at least limit + 1 ({})",
                self.num_candidates,
                self.candidate_window()
            )));
        }
        if self.num_candidates > MAX_NUM_CANDIDATES {
            return Err(MatchError::InvalidQuery(format!(
                "numCandidates ({}) cannot exceed {}",
                self.num_candidates, MAX_NUM_CANDIDATES
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub dimensions: usize,
    pub batch_size: usize,
}

impl SeedConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        SeedConfig {
            api_url: DEFAULT_VOYAGE_URL.to_string(),
            api_key: api_key.into(),
            model: DEFAULT_VOYAGE_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.api_key.is_empty() {
            return Err(MatchError::MissingSetting("VOYAGE_API_KEY"));
        }
        if self.batch_size == 0 {
            return Err(MatchError::InvalidQuery("batch size must be at least 1".to_string()));
        }
        if self.dimensions == 0 {
            return Err(MatchError::InvalidQuery("dimensions must be at least 1".to_string()));
        }
        Ok(())
    }
}
