use cmdbot_core::storage::{
    Document, EntityStore, MemoryBackend, Namespace, Outcome, Removal, SqliteBackend,
};
use proptest::prelude::*;
use serde_json::Value;
use std::sync::Arc;

fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<f64>().prop_filter("JSON numbers are finite", |f| f.is_finite()).prop_map(Value::from),
        "[a-zA-Z0-9 _-]{0,12}".prop_map(Value::from),
    ]
}

fn json_value() -> impl Strategy<Value = Value> {
    json_leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn document() -> impl Strategy<Value = Document> {
    prop::collection::btree_map("[a-zA-Z_]{1,8}", json_value(), 0..6)
        .prop_map(|m| m.into_iter().collect())
}

fn runtime() -> Result<tokio::runtime::Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))
}

fn fail(e: impl std::fmt::Display) -> TestCaseError {
    TestCaseError::fail(e.to_string())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn upsert_then_retrieve_is_identity(id in any::<i64>(), doc in document()) {
        let rt = runtime()?;
        let retrieved = rt.block_on(async {
            let backend = SqliteBackend::open_in_memory().await?;
            let store = EntityStore::new(Namespace::Users, Arc::new(backend), true);
            store.upsert(id, &doc).await?;
            store.retrieve(id).await
        }).map_err(fail)?;
        prop_assert_eq!(retrieved, Some(doc));
    }

    #[test]
    fn floats_survive_storage_bit_for_bit(
        id in any::<i64>(),
        value in any::<f64>().prop_filter("finite", |f| f.is_finite()),
    ) {
        let rt = runtime()?;
        let doc: Document = [("v".to_string(), Value::from(value))].into_iter().collect();
        let retrieved = rt.block_on(async {
            let backend = SqliteBackend::open_in_memory().await?;
            let store = EntityStore::new(Namespace::Threads, Arc::new(backend), false);
            store.upsert(id, &doc).await?;
            store.retrieve(id).await
        }).map_err(fail)?;
        let stored = retrieved.as_ref().and_then(|d| d.get("v")).and_then(Value::as_f64);
        prop_assert_eq!(stored.map(f64::to_bits), Some(value.to_bits()));
    }

    #[test]
    fn update_merges_partial_over_existing(
        id in 0_i64..1_000,
        base in document(),
        partial in document(),
    ) {
        let rt = runtime()?;
        let (outcome, merged) = rt.block_on(async {
            let store = EntityStore::new(Namespace::Threads, Arc::new(MemoryBackend::new()), true);
            store.upsert(id, &base).await?;
            let outcome = store.update(id, partial.clone()).await?;
            Ok::<_, cmdbot_core::storage::StoreError>((outcome, store.retrieve(id).await?))
        }).map_err(fail)?;

        let mut expected = base.clone();
        expected.extend(partial.clone());
        prop_assert_eq!(outcome, Outcome::Applied);
        prop_assert_eq!(merged, Some(expected));
    }

    #[test]
    fn delete_reports_presence(id in any::<i64>(), doc in document()) {
        let rt = runtime()?;
        let (missing, present, after) = rt.block_on(async {
            let store = EntityStore::new(Namespace::Users, Arc::new(MemoryBackend::new()), false);
            let missing = store.delete(id).await?;
            store.upsert(id, &doc).await?;
            let present = store.delete(id).await?;
            Ok::<_, cmdbot_core::storage::StoreError>((missing, present, store.retrieve(id).await?))
        }).map_err(fail)?;

        prop_assert_eq!(missing, Removal::NotFound);
        prop_assert_eq!(present, Removal::Found);
        prop_assert_eq!(after, None);
    }
}
