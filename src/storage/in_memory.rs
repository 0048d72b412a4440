//! In-memory implementation of Store for testing and development

use crate::core::record::{Record, sort_records};
use crate::core::schema::SchemaRegistry;
use crate::core::store::{Criteria, FindOptions, Store, StoreError, StoreResult};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

type Collections = HashMap<String, IndexMap<String, Record>>;

/// In-memory store implementation
///
/// Records are kept per model in insertion order. Uses RwLock for
/// thread-safe access; clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    collections: Arc<RwLock<Collections>>,
    /// (model, property) pairs that must hold distinct values
    unique: Arc<HashSet<(String, String)>>,
}

impl InMemoryStore {
    /// Create a new in-memory store without constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store enforcing every property declared `unique` in the registry
    pub fn for_registry(registry: &SchemaRegistry) -> Self {
        let unique = registry
            .models()
            .flat_map(|schema| {
                schema
                    .properties()
                    .filter(|p| p.unique)
                    .map(|p| (schema.name().to_string(), p.name.clone()))
            })
            .collect();

        Self {
            collections: Arc::default(),
            unique: Arc::new(unique),
        }
    }

    /// Add a unique constraint
    pub fn with_unique(mut self, model: &str, property: &str) -> Self {
        Arc::make_mut(&mut self.unique).insert((model.to_string(), property.to_string()));
        self
    }

    fn check_unique(&self, collections: &Collections, record: &Record) -> StoreResult<()> {
        let Some(existing) = collections.get(&record.model) else {
            return Ok(());
        };

        for (model, property) in self.unique.iter() {
            if model != &record.model {
                continue;
            }
            for value in record.value_of(property) {
                let taken = existing.values().any(|other| {
                    other.id != record.id
                        && other.value_of(property).iter().any(|v| v.matches(&value))
                });
                if taken {
                    return Err(StoreError::UniqueViolation {
                        model: model.clone(),
                        property: property.clone(),
                        value: value.label(),
                    });
                }
            }
        }
        Ok(())
    }

    fn insert(&self, collections: &mut Collections, record: Record) -> StoreResult<Record> {
        self.check_unique(collections, &record)?;
        collections
            .entry(record.model.clone())
            .or_default()
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }
}

fn lock_error(kind: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend {
        message: format!("Failed to acquire {} lock: {}", kind, e),
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find(
        &self,
        model: &str,
        criteria: &Criteria,
        options: &FindOptions,
    ) -> StoreResult<Vec<Record>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| lock_error("read", e))?;

        let mut records: Vec<Record> = collections
            .get(model)
            .map(|records| {
                records
                    .values()
                    .filter(|record| criteria.matches(record))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        sort_records(&mut records, &options.sort);
        if let Some(limit) = options.limit {
            records.truncate(limit);
        }

        Ok(records)
    }

    async fn first(&self, model: &str, criteria: &Criteria) -> StoreResult<Option<Record>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| lock_error("read", e))?;

        Ok(collections
            .get(model)
            .and_then(|records| records.values().find(|record| criteria.matches(record)))
            .cloned())
    }

    async fn count(&self, model: Option<&str>, criteria: &Criteria) -> StoreResult<usize> {
        let collections = self
            .collections
            .read()
            .map_err(|e| lock_error("read", e))?;

        Ok(collections
            .iter()
            .filter(|(name, _)| model.is_none_or(|m| m == name.as_str()))
            .flat_map(|(_, records)| records.values())
            .filter(|record| criteria.matches(record))
            .count())
    }

    async fn save(&self, record: Record) -> StoreResult<Record> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| lock_error("write", e))?;

        self.insert(&mut collections, record)
    }

    async fn batch_sync(&self, records: Vec<Record>) -> StoreResult<Vec<Record>> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| lock_error("write", e))?;

        let saved = records
            .into_iter()
            .map(|record| self.insert(&mut collections, record))
            .collect::<StoreResult<Vec<_>>>()?;

        tracing::debug!(count = saved.len(), "batch synced records");
        Ok(saved)
    }

    async fn clear(&self) -> StoreResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| lock_error("write", e))?;

        collections.clear();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldValue;
    use crate::core::query::SortKey;
    use crate::core::store::Predicate;

    fn generic(i: i64) -> Record {
        Record::new("Generic", format!("generic{}", i))
            .with("integer", FieldValue::Integer(i))
            .with("boolean", FieldValue::Boolean(i % 2 == 1))
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .batch_sync((1..=10).map(generic).collect())
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_find_keeps_insertion_order() {
        let store = seeded().await;
        let records = store
            .find("Generic", &Criteria::new(), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].id, "generic1");
        assert_eq!(records[9].id, "generic10");
    }

    #[tokio::test]
    async fn test_find_with_criteria_sort_and_limit() {
        let store = seeded().await;
        let criteria = Criteria::new().and("integer", Predicate::Gt(FieldValue::Integer(3)));
        let options = FindOptions {
            sort: vec![SortKey::descending("integer")],
            limit: Some(2),
        };
        let records = store.find("Generic", &criteria, &options).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["generic10", "generic9"]);
    }

    #[tokio::test]
    async fn test_missing_sort_key_comes_first_when_descending() {
        let store = InMemoryStore::new();
        store
            .batch_sync(vec![
                Record::new("Generic", "generic1"),
                generic(2),
                generic(3),
                generic(4),
            ])
            .await
            .unwrap();
        let options = FindOptions {
            sort: vec![SortKey::descending("integer")],
            limit: None,
        };
        let records = store.find("Generic", &Criteria::new(), &options).await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["generic1", "generic4", "generic3", "generic2"]);
    }

    #[tokio::test]
    async fn test_unknown_model_is_empty() {
        let store = seeded().await;
        let records = store
            .find("Nope", &Criteria::new(), &FindOptions::default())
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_get_and_save_replaces() {
        let store = seeded().await;
        let mut record = store.get("Generic", "generic3").await.unwrap().unwrap();
        record.set("integer", FieldValue::Integer(42));
        store.save(record).await.unwrap();

        let record = store.get("Generic", "generic3").await.unwrap().unwrap();
        assert_eq!(record.value_of("integer"), vec![FieldValue::Integer(42)]);
        assert_eq!(store.count(Some("Generic"), &Criteria::new()).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_count_across_models() {
        let store = seeded().await;
        store.save(Record::new("Other", "o1")).await.unwrap();

        assert_eq!(store.count(None, &Criteria::new()).await.unwrap(), 11);
        let odd = Criteria::new().and("boolean", Predicate::Eq(FieldValue::Boolean(true)));
        assert_eq!(store.count(Some("Generic"), &odd).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_unique_violation() {
        let store = InMemoryStore::new().with_unique("User", "email");
        let user = |id: &str| Record::new("User", id).with("email", FieldValue::from("bob@example.com"));

        store.save(user("u1")).await.unwrap();
        // saving the same record again is not a violation
        store.save(user("u1")).await.unwrap();

        let err = store.save(user("u2")).await.unwrap_err();
        assert_eq!(err.to_string(), "email is taken");
    }

    #[tokio::test]
    async fn test_clear() {
        let store = seeded().await;
        store.clear().await.unwrap();
        assert_eq!(store.count(None, &Criteria::new()).await.unwrap(), 0);
    }
}
