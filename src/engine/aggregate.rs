//! Group-by counts over a filtered record set

use crate::core::error::{AggregatorError, EurekaResult, ValidationError};
use crate::core::query::Condition;
use crate::core::record::Record;
use crate::core::schema::SchemaRegistry;
use crate::core::store::{Criteria, FindOptions, Store};
use crate::core::validation::QueryValidator;
use crate::engine::executor::Executor;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Label given to records with no value for the grouped property
pub const NULL_LABEL: &str = "null";

/// One group: `{ "label": "true", "value": 5 }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub label: String,
    pub value: usize,
}

pub struct Aggregator<'a> {
    registry: &'a SchemaRegistry,
    store: &'a dyn Store,
}

impl<'a> Aggregator<'a> {
    pub fn new(registry: &'a SchemaRegistry, store: &'a dyn Store) -> Self {
        Self { registry, store }
    }

    /// Count records of `model` per value of `path`
    ///
    /// Groups come back sorted by label; their counts add up to the number
    /// of records matching `filters`.
    pub async fn group_by(
        &self,
        model: &str,
        path: &str,
        filters: &[Condition],
    ) -> EurekaResult<Vec<GroupCount>> {
        let resolved = self
            .registry
            .resolve(model, path)
            .map_err(|_| AggregatorError::UnknownProperty {
                model: model.to_string(),
                path: path.to_string(),
            })?;

        if resolved.is_multi_valued(self.registry) {
            return Err(AggregatorError::MultiValued {
                model: model.to_string(),
                path: path.to_string(),
            }
            .into());
        }

        let conditions = QueryValidator::new(self.registry)
            .validate_filters(model, filters)
            .map_err(|e| match e {
                ValidationError::MalformedQuery { infos } => AggregatorError::MalformedQuery { infos },
                other => AggregatorError::MalformedQuery {
                    infos: other.to_string(),
                },
            })?;

        let executor = Executor::new(self.store);
        let records = match executor.filter(&conditions).await? {
            Some(criteria) => {
                self.store
                    .find(model, &criteria, &FindOptions::default())
                    .await?
            }
            None => Vec::new(),
        };

        // walk relation hops one level at a time, fetching each level once
        let mut current: Vec<Option<Record>> = records.into_iter().map(Some).collect();
        for hop in &resolved.hops {
            let mut ids: Vec<String> = current
                .iter()
                .flatten()
                .filter_map(|r| r.references(&hop.relation).first().map(|rf| rf.id.clone()))
                .collect();
            ids.sort();
            ids.dedup();

            let fetched: HashMap<String, Record> = if ids.is_empty() {
                HashMap::new()
            } else {
                self.store
                    .find(&hop.target, &Criteria::by_ids(ids), &FindOptions::default())
                    .await?
                    .into_iter()
                    .map(|r| (r.id.clone(), r))
                    .collect()
            };

            current = current
                .into_iter()
                .map(|record| {
                    let record = record?;
                    let reference = record.references(&hop.relation).first().map(|rf| rf.id.clone())?;
                    fetched.get(&reference).cloned()
                })
                .collect();
        }

        let mut groups: BTreeMap<String, usize> = BTreeMap::new();
        for record in &current {
            let label = record
                .as_ref()
                .and_then(|r| r.value_of(&resolved.property.name).into_iter().next())
                .map(|v| v.label())
                .unwrap_or_else(|| NULL_LABEL.to_string());
            *groups.entry(label).or_default() += 1;
        }

        tracing::debug!(model, path, groups = groups.len(), "group-by computed");
        Ok(groups
            .into_iter()
            .map(|(label, value)| GroupCount { label, value })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::EurekaError;
    use crate::core::field::FieldValue;
    use crate::core::record::Reference;
    use crate::core::schema::{PropertyDef, PropertyType, Schema};
    use crate::storage::InMemoryStore;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builder()
            .register(
                Schema::new("Generic")
                    .property("integer", PropertyType::Integer)
                    .property("boolean", PropertyType::Boolean)
                    .property("text", PropertyType::String)
                    .with_property(PropertyDef::new("array", PropertyType::String).multi())
                    .relation("relation", "GenericRelation"),
            )
            .register(Schema::new("GenericRelation").property("text", PropertyType::String))
            .build()
            .unwrap()
    }

    async fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        let mut records = vec![
            Record::new("GenericRelation", "relation0").with("text", FieldValue::from("relation 0")),
            Record::new("GenericRelation", "relation1").with("text", FieldValue::from("relation 1")),
        ];
        for i in 1..=10 {
            records.push(
                Record::new("Generic", format!("generic{}", i))
                    .with("integer", FieldValue::Integer(i))
                    .with("boolean", FieldValue::Boolean(i % 2 == 1))
                    .with(
                        "relation",
                        Reference::new("GenericRelation", format!("relation{}", i % 2)),
                    ),
            );
        }
        store.batch_sync(records).await.unwrap();
        store
    }

    fn groups(pairs: &[(&str, usize)]) -> Vec<GroupCount> {
        pairs
            .iter()
            .map(|(label, value)| GroupCount {
                label: label.to_string(),
                value: *value,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_group_by_boolean() {
        let (registry, store) = (registry(), store().await);
        let result = Aggregator::new(&registry, &store)
            .group_by("Generic", "boolean", &[])
            .await
            .unwrap();
        assert_eq!(result, groups(&[("false", 5), ("true", 5)]));
    }

    #[tokio::test]
    async fn test_group_by_relation_path() {
        let (registry, store) = (registry(), store().await);
        let result = Aggregator::new(&registry, &store)
            .group_by("Generic", "relation.text", &[])
            .await
            .unwrap();
        assert_eq!(result, groups(&[("relation 0", 5), ("relation 1", 5)]));
    }

    #[tokio::test]
    async fn test_group_by_with_filter() {
        let (registry, store) = (registry(), store().await);
        let filter = [Condition::with_operator(
            "integer",
            "$gt",
            crate::core::query::RawValue::Scalar("3".to_string()),
        )];
        let result = Aggregator::new(&registry, &store)
            .group_by("Generic", "boolean", &filter)
            .await
            .unwrap();
        assert_eq!(result, groups(&[("false", 4), ("true", 3)]));
    }

    #[tokio::test]
    async fn test_missing_values_group_under_null() {
        let (registry, store) = (registry(), store().await);
        let result = Aggregator::new(&registry, &store)
            .group_by("Generic", "text", &[])
            .await
            .unwrap();
        assert_eq!(result, groups(&[("null", 10)]));
    }

    #[tokio::test]
    async fn test_unknown_property() {
        let (registry, store) = (registry(), store().await);
        let err = Aggregator::new(&registry, &store)
            .group_by("Generic", "unknownField", &[])
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "malformed aggregator");
        assert_eq!(
            err.infos().unwrap(),
            "unknown property aggregator \"unknownField\" on model \"Generic\""
        );
    }

    #[tokio::test]
    async fn test_multi_valued_rejected() {
        let (registry, store) = (registry(), store().await);
        let err = Aggregator::new(&registry, &store)
            .group_by("Generic", "array", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EurekaError::Aggregator(AggregatorError::MultiValued { .. })
        ));
    }

    #[tokio::test]
    async fn test_bad_filter() {
        let (registry, store) = (registry(), store().await);
        let err = Aggregator::new(&registry, &store)
            .group_by("Generic", "boolean", &[Condition::eq("unknownField", "3")])
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "groupBy: malformed query");
        assert_eq!(
            err.infos().unwrap(),
            "unknown property \"unknownField\" on model \"Generic\""
        );
    }
}
