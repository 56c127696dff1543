use vecseed_core::generator::{generate_documents, rng_from_seed};
use vecseed_core::{DistanceMetric, DocumentStore, InMemoryDocumentStore, NewDocument};

#[tokio::test]
async fn insert_then_count() {
    let mut store = InMemoryDocumentStore::new(3);
    let docs = generate_documents(20, 3, &mut rng_from_seed(Some(9)));

    let inserted = store.insert_documents(&docs).await.unwrap();
    assert_eq!(inserted, 20);
    assert_eq!(store.count().await.unwrap(), 20);

    let ids: Vec<i64> = store.documents().iter().map(|d| d.id).collect();
    assert_eq!(ids, (1..=20).collect::<Vec<_>>());
}

#[tokio::test]
async fn mismatched_dimension_rejects_whole_batch() {
    let mut store = InMemoryDocumentStore::new(3);
    store
        .insert_documents(&[NewDocument::new("keep", "kept row", vec![0.1, 0.2, 0.3])])
        .await
        .unwrap();

    let batch = vec![
        NewDocument::new("a", "ok", vec![0.1, 0.1, 0.1]),
        NewDocument::new("b", "too long", vec![0.1, 0.1, 0.1, 0.1]),
    ];
    let err = store.insert_documents(&batch).await.unwrap_err();
    assert!(err.to_string().contains("expected 3 dimensions, not 4"), "{err}");

    // Only the earlier row survives.
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(store.documents()[0].title, "keep");
}

#[tokio::test]
async fn reset_schema_is_idempotent() {
    let mut store = InMemoryDocumentStore::new(3);
    let docs = generate_documents(5, 3, &mut rng_from_seed(Some(2)));
    store.insert_documents(&docs).await.unwrap();

    store.reset_schema().await.unwrap();
    store.reset_schema().await.unwrap();
    assert_eq!(store.count().await.unwrap(), 0);

    // Ids restart after a reset.
    store.insert_documents(&docs[..1]).await.unwrap();
    assert_eq!(store.documents()[0].id, 1);
}

#[tokio::test]
async fn search_returns_k_results_in_ascending_order() {
    let mut store = InMemoryDocumentStore::new(3);
    let docs = generate_documents(20, 3, &mut rng_from_seed(Some(11)));
    store.insert_documents(&docs).await.unwrap();

    let results = store.similarity_search(&[0.5, 0.5, 0.5], 3).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    assert!(results.iter().all(|r| r.distance >= 0.0));
}

#[tokio::test]
async fn search_with_fewer_rows_than_k() {
    let mut store = InMemoryDocumentStore::new(2);
    store
        .insert_documents(&[
            NewDocument::new("a", "first", vec![0.0, 0.0]),
            NewDocument::new("b", "second", vec![1.0, 1.0]),
        ])
        .await
        .unwrap();

    let results = store.similarity_search(&[0.0, 0.0], 3).await.unwrap();
    assert_eq!(results.len(), 2);

    let empty = InMemoryDocumentStore::new(2)
        .similarity_search(&[0.0, 0.0], 3)
        .await
        .unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn exact_vector_ranks_first_with_zero_distance() {
    let mut store = InMemoryDocumentStore::new(3);
    let docs = generate_documents(20, 3, &mut rng_from_seed(Some(5)));
    store.insert_documents(&docs).await.unwrap();

    let target = &docs[12];
    let results = store.similarity_search(&target.embedding, 3).await.unwrap();
    assert_eq!(results[0].title, target.title);
    assert!(results[0].distance.abs() < 1e-6);
}

#[tokio::test]
async fn cosine_metric_ranks_by_angle() {
    let mut store = InMemoryDocumentStore::new(2).with_metric(DistanceMetric::Cosine);
    store
        .insert_documents(&[
            NewDocument::new("far but aligned", "", vec![10.0, 10.0]),
            NewDocument::new("near but orthogonal", "", vec![0.0, 0.9]),
        ])
        .await
        .unwrap();

    let results = store.similarity_search(&[1.0, 1.0], 1).await.unwrap();
    assert_eq!(results[0].title, "far but aligned");
}

#[tokio::test]
async fn closed_store_rejects_operations() {
    let mut store = InMemoryDocumentStore::new(3);
    store.close().await.unwrap();
    store.close().await.unwrap();
    assert!(store.is_closed());
    assert!(store.count().await.is_err());
}
