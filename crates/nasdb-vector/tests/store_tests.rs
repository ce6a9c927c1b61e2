use nasdb_core::error::Error;
use nasdb_core::traits::VectorStore;
use nasdb_core::types::{ChunkRecord, MetadataFilter};
use nasdb_vector::LanceStore;
use tempfile::TempDir;

const TABLE: &str = "file_contents";

fn unit(v: [f32; 4]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    v.iter().map(|x| x / norm).collect()
}

async fn open(tmp: &TempDir) -> LanceStore {
    LanceStore::open(&tmp.path().to_string_lossy(), TABLE, 4).await.expect("open store")
}

#[tokio::test]
async fn upsert_overwrites_same_id() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;

    store.upsert(&[ChunkRecord::new("/docs/a.txt", 0, "old".into(), unit([1.0, 0.0, 0.0, 0.0]))]).await.unwrap();
    store.upsert(&[ChunkRecord::new("/docs/a.txt", 0, "new".into(), unit([0.0, 1.0, 0.0, 0.0]))]).await.unwrap();

    assert_eq!(store.count().await.unwrap(), 1);
    let hits = store.query(&unit([0.0, 1.0, 0.0, 0.0]), 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document, "new");
    assert_eq!(hits[0].id, "/docs/a.txt-chunk-0");
    assert!(hits[0].distance.abs() < 1e-4);
}

#[tokio::test]
async fn query_is_ascending_by_distance() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    store
        .upsert(&[
            ChunkRecord::new("/a.txt", 0, "far".into(), unit([0.0, 0.0, 0.0, 1.0])),
            ChunkRecord::new("/b.txt", 0, "near".into(), unit([1.0, 0.1, 0.0, 0.0])),
            ChunkRecord::new("/c.txt", 0, "mid".into(), unit([1.0, 1.0, 0.0, 0.0])),
        ])
        .await
        .unwrap();

    let hits = store.query(&unit([1.0, 0.0, 0.0, 0.0]), 3).await.unwrap();
    let docs: Vec<&str> = hits.iter().map(|h| h.document.as_str()).collect();
    assert_eq!(docs, vec!["near", "mid", "far"]);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert_eq!(store.query(&unit([1.0, 0.0, 0.0, 0.0]), 2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn prefix_delete_removes_nested_paths_only() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let v = unit([1.0, 1.0, 1.0, 1.0]);
    store
        .upsert(&[
            ChunkRecord::new("/docs/a.txt", 0, "a0".into(), v.clone()),
            ChunkRecord::new("/docs/a.txt", 1, "a1".into(), v.clone()),
            ChunkRecord::new("/docs/sub/b.txt", 0, "b0".into(), v.clone()),
            ChunkRecord::new("/other/c_1%.txt", 0, "c0".into(), v.clone()),
        ])
        .await
        .unwrap();

    let removed = store.delete_where(&MetadataFilter::PathPrefix("/docs".into())).await.unwrap();
    assert_eq!(removed, 3);
    let paths: Vec<String> = store.file_paths().await.unwrap().into_iter().collect();
    assert_eq!(paths, vec!["/other/c_1%.txt".to_string()]);

    assert_eq!(store.delete_where(&MetadataFilter::PathPrefix("/docs".into())).await.unwrap(), 0);
    assert_eq!(store.delete_where(&MetadataFilter::PathEquals("/other/c_1%.txt".into())).await.unwrap(), 1);
    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn reset_empties_and_store_stays_usable() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    store.upsert(&[ChunkRecord::new("/x.txt", 0, "x".into(), unit([1.0, 0.0, 0.0, 0.0]))]).await.unwrap();
    store.reset().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);
    assert!(store.query(&unit([1.0, 0.0, 0.0, 0.0]), 5).await.unwrap().is_empty());
    assert!(store.file_paths().await.unwrap().is_empty());

    store.upsert(&[ChunkRecord::new("/y.txt", 0, "y".into(), unit([1.0, 0.0, 0.0, 0.0]))]).await.unwrap();
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn data_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    {
        let store = open(&tmp).await;
        store.upsert(&[ChunkRecord::new("/keep.txt", 3, "kept".into(), unit([0.0, 0.0, 1.0, 0.0]))]).await.unwrap();
    }
    let store = open(&tmp).await;
    let hits = store.query(&unit([0.0, 0.0, 1.0, 0.0]), 1).await.unwrap();
    assert_eq!(hits[0].metadata.file_path, "/keep.txt");
    assert_eq!(hits[0].metadata.chunk_number, 3);
}

#[tokio::test]
async fn dimension_mismatch_is_a_config_error() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let bad = store.upsert(&[ChunkRecord::new("/a.txt", 0, "a".into(), vec![1.0, 0.0])]).await;
    assert!(matches!(bad, Err(Error::InvalidConfig(_))));
    assert!(matches!(store.query(&[1.0; 8], 1).await, Err(Error::InvalidConfig(_))));
    drop(store);

    let reopened = LanceStore::open(&tmp.path().to_string_lossy(), TABLE, 8).await;
    assert!(matches!(reopened, Err(Error::InvalidConfig(_))));
}

#[tokio::test]
async fn empty_store_queries_return_nothing() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    assert!(store.query(&unit([1.0, 0.0, 0.0, 0.0]), 5).await.unwrap().is_empty());
    assert_eq!(store.delete_where(&MetadataFilter::All).await.unwrap(), 0);
}
