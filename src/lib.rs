//! # membermatch - nearest patient lookup over Atlas vector search
//!
//! Samples one patient record that carries an identity embedding, then asks
//! the vector index for the records closest to it, excluding the sample
//! itself. The same lookup runs against a MongoDB collection
//! ([`store::MongoStore`]) or a JSON snapshot of one ([`store::MemoryStore`]).
//! The [`seed`] module fills in missing embeddings through the Voyage AI API.
//!
//! ## Example
//!
//! ```
//! use membermatch::{find_nearest, SearchConfig};
//! use membermatch::patient::{MemberMatchValue, PatientRecord};
//! use membermatch::store::MemoryStore;
//! use mongodb::bson::Bson;
//!
//! # tokio_test_block_on(async {
//! let records = (0..5)
//!     .map(|i| PatientRecord {
//!         id: Bson::Int32(i),
//!         member: MemberMatchValue {
//!             identity_embedding: Some(vec![1.0, i as f32]),
//!             ..MemberMatchValue::default()
//!         },
//!     })
//!     .collect();
//! let store = MemoryStore::from_records(records);
//!
//! let matches = find_nearest(&store, &SearchConfig::default()).await.unwrap();
//! assert_eq!(matches.neighbors.len(), 3);
//! assert!(matches.neighbors.iter().all(|n| n.id != matches.seed.id));
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

pub mod config;
pub mod embed;
pub mod error;
pub mod patient;
pub mod pipeline;
pub mod seed;
pub mod store;
pub mod vector;

pub use config::{MongoConfig, SearchConfig, SeedConfig};
pub use error::MatchError;
pub use pipeline::{find_nearest, NearestMatches};
