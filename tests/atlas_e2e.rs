//! Runs against a live Atlas cluster with a `default` vector index over
//! `incomingMemberMatchValue.identityEmbedding`.
//!
//! MONGODB_URI=... cargo test --test atlas_e2e -- --ignored

use membermatch::store::MongoStore;
use membermatch::{find_nearest, MongoConfig, SearchConfig};

#[tokio::test]
#[ignore = "needs MONGODB_URI pointing at an Atlas cluster"]
async fn test_live_nearest() {
    let uri = std::env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    let store = MongoStore::connect(&MongoConfig::new(uri)).await.unwrap();

    let matches = find_nearest(&store, &SearchConfig::default()).await.unwrap();

    assert!(matches.seed.has_embedding());
    assert!(matches.neighbors.len() <= 3);
    assert!(matches.neighbors.iter().all(|n| n.id != matches.seed.id));
    assert!(matches.neighbors.windows(2).all(|w| w[0].score >= w[1].score));
}
