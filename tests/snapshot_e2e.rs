use membermatch::patient::{MemberMatchValue, PatientRecord};
use membermatch::store::MemoryStore;
use membermatch::{find_nearest, MatchError, SearchConfig};
use mongodb::bson::Bson;
use std::collections::HashSet;
use std::time::Instant;
use tempfile::NamedTempFile;

fn random_vector(dim: usize, seed: u64) -> Vec<f32> {
    // Simple LCG, enough spread for ranking checks
    let mut state = seed;
    (0..dim)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            // Map to [-1.0, 1.0]
            ((state >> 33) as f32) / (u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

fn patient(i: u64, embedding: Option<Vec<f32>>) -> PatientRecord {
    PatientRecord {
        id: Bson::String(format!("patient_{}", i)),
        member: MemberMatchValue {
            first_name: Some(Bson::String(format!("First{}", i))),
            last_name: Some(Bson::String(format!("Last{}", i))),
            birth_date: Some(Bson::String(format!("19{:02}-01-01", i % 100))),
            member_group_id: Some(Bson::String(format!("G{}", i % 7))),
            identity_text: Some(format!("First{} Last{}", i, i)),
            identity_embedding: embedding,
        },
    }
}

#[tokio::test]
async fn test_save_load_and_lookup_nearest() {
    let dim = 1024;
    let num_records = 2_000;
    let num_lookups = 50;

    // Phase 1: build a snapshot where every tenth record has no embedding
    let start = Instant::now();
    let mut store = MemoryStore::new();
    for i in 0..num_records {
        let embedding = (i % 10 != 0).then(|| random_vector(dim, i));
        store.insert(patient(i, embedding));
    }
    println!("Phase 1 - Build {} records: {:.3}s", num_records, start.elapsed().as_secs_f64());

    // Phase 2: save and reload
    let temp = NamedTempFile::new().unwrap();
    store.save(temp.path()).unwrap();
    drop(store);
    let loaded = MemoryStore::load(temp.path()).unwrap();
    assert_eq!(loaded.count(), num_records as usize);

    // Phase 3: repeated lookups
    let start = Instant::now();
    let mut seeds = HashSet::new();
    for _ in 0..num_lookups {
        let matches = find_nearest(&loaded, &SearchConfig::default()).await.unwrap();

        assert!(matches.seed.has_embedding());
        assert_eq!(matches.neighbors.len(), 3);
        assert!(matches.neighbors.iter().all(|n| n.id != matches.seed.id));
        for w in matches.neighbors.windows(2) {
            assert!(w[0].score >= w[1].score, "Neighbors not sorted by score");
        }
        for n in &matches.neighbors {
            assert!(n.first_name.is_some() && n.last_name.is_some());
            assert!(n.birth_date.is_some() && n.member_group_id.is_some());
        }
        seeds.insert(matches.seed.id.to_string());
    }
    println!("Phase 3 - {} lookups: {:.3}s", num_lookups, start.elapsed().as_secs_f64());

    assert!(seeds.len() > 1, "Sampling should not always pick the same seed");
}

#[tokio::test]
async fn test_unembedded_snapshot_is_terminal() {
    let mut store = MemoryStore::new();
    for i in 0..10 {
        store.insert(patient(i, None));
    }

    let result = find_nearest(&store, &SearchConfig::default()).await;
    match result {
        Err(e @ MatchError::NoEmbeddedRecords { .. }) => {
            assert!(e.to_string().contains("incomingMemberMatchValue.identityEmbedding"))
        }
        other => panic!("Expected NoEmbeddedRecords, got {:?}", other.map(|m| m.seed.id)),
    }
}

#[tokio::test]
async fn test_nearest_finds_planted_twins() {
    // Three near-copies of the only other cluster member must be the answer
    let base = random_vector(64, 99);
    let mut store = MemoryStore::new();
    for (i, offset) in [0.0_f32, 0.01, 0.02, 0.03].iter().enumerate() {
        let v: Vec<f32> = base.iter().map(|x| x + offset).collect();
        store.insert(patient(i as u64, Some(v)));
    }
    for i in 10..40 {
        store.insert(patient(i, Some(random_vector(64, i * 31 + 7))));
    }

    for _ in 0..20 {
        let matches = find_nearest(&store, &SearchConfig::default()).await.unwrap();
        let seed = matches.seed.id.clone();
        let cluster: Vec<Bson> = (0..4).map(|i| Bson::String(format!("patient_{}", i))).collect();
        if cluster.contains(&seed) {
            assert!(matches.neighbors.iter().all(|n| cluster.contains(&n.id)));
        }
    }
}
