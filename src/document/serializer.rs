//! Records to JSON-API documents
//!
//! Primary resources carry attributes, relationships with links, and a self
//! link. Included resources carry attributes only. Related records are
//! fetched in one batch per relation path and level, and a `(type, id)` pair
//! appears at most once across `data` and `included`.

use crate::core::error::{EurekaError, EurekaResult};
use crate::core::query::Selection;
use crate::core::record::{PropertyValue, Record, Reference};
use crate::core::schema::{Hop, Schema, SchemaRegistry};
use crate::core::store::{Criteria, FindOptions, Store, StoreResult};
use crate::core::validation::IncludeTargets;
use crate::document::{
    Document, Linkage, PrimaryData, Relationship, RelationshipLinks, Resource, ResourceLinks,
};
use futures::future::try_join_all;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use std::collections::HashSet;

pub struct DocumentSerializer<'a> {
    registry: &'a SchemaRegistry,
    store: &'a dyn Store,
    api_root_prefix: &'a str,
}

impl<'a> DocumentSerializer<'a> {
    pub fn new(registry: &'a SchemaRegistry, store: &'a dyn Store, api_root_prefix: &'a str) -> Self {
        Self {
            registry,
            store,
            api_root_prefix: api_root_prefix.trim_end_matches('/'),
        }
    }

    /// `<prefix>/<plural>`
    pub fn collection_link(&self, model: &str) -> EurekaResult<String> {
        Ok(format!("{}/{}", self.api_root_prefix, self.schema(model)?.plural()))
    }

    /// Collection document
    pub async fn serialize(
        &self,
        records: &[Record],
        fields: &Selection,
        include: &IncludeTargets,
    ) -> EurekaResult<Document> {
        let data = records
            .iter()
            .map(|record| self.resource(record, fields))
            .collect::<EurekaResult<Vec<_>>>()?;
        let included = self.included(records, include).await?;

        Ok(Document::data(PrimaryData::Many(data)).with_included(included))
    }

    /// Single-resource document
    pub async fn serialize_one(
        &self,
        record: &Record,
        fields: &Selection,
        include: &IncludeTargets,
    ) -> EurekaResult<Document> {
        let data = self.resource(record, fields)?;
        let included = self.included(std::slice::from_ref(record), include).await?;

        Ok(Document::data(PrimaryData::One(Box::new(data))).with_included(included))
    }

    /// Primary resource
    ///
    /// With an explicit field selection, attributes are exactly the selected
    /// fields (null when absent) and relationships are left out.
    pub fn resource(&self, record: &Record, fields: &Selection) -> EurekaResult<Resource> {
        let schema = self.schema(&record.model)?;
        let collection = self.collection_link(&record.model)?;
        let self_link = format!("{}/{}", collection, record.id);

        let (attributes, relationships) = match fields {
            Selection::Only(names) => {
                let attributes: IndexMap<String, Value> = names
                    .iter()
                    .map(|name| {
                        let value = record.get(name).map(property_json).unwrap_or(Value::Null);
                        (name.clone(), value)
                    })
                    .collect();
                (attributes, None)
            }
            Selection::All => {
                let relationships: IndexMap<String, Relationship> = schema
                    .relations_iter()
                    .map(|relation| {
                        let name = relation.name.clone();
                        let relationship = Relationship {
                            data: linkage(record, &name, relation.is_multi()),
                            links: RelationshipLinks {
                                self_link: format!("{}/relationships/{}", self_link, name),
                                related: format!("{}/{}", self_link, name),
                            },
                        };
                        (name, relationship)
                    })
                    .collect();
                (attributes(schema, record), Some(relationships))
            }
        };

        Ok(Resource {
            id: record.id.clone(),
            model: record.model.clone(),
            attributes,
            relationships,
            links: Some(ResourceLinks { self_link }),
        })
    }

    /// Resource linkage of one relation
    pub fn linkage(&self, record: &Record, relation: &str) -> EurekaResult<Linkage> {
        let schema = self.schema(&record.model)?;
        let property = schema.get(relation).filter(|p| p.is_relation()).ok_or_else(|| {
            EurekaError::UnknownRelation {
                model: record.model.clone(),
                relation: relation.to_string(),
            }
        })?;
        Ok(linkage(record, relation, property.is_multi()))
    }

    /// Side-loaded resources for `records`
    async fn included(
        &self,
        records: &[Record],
        include: &IncludeTargets,
    ) -> EurekaResult<Vec<Resource>> {
        let paths: Vec<Vec<Hop>> = match include {
            IncludeTargets::None => return Ok(Vec::new()),
            IncludeTargets::All => {
                let mut paths = Vec::new();
                let models: IndexSet<&str> = records.iter().map(|r| r.model.as_str()).collect();
                for model in models {
                    for relation in self.schema(model)?.relations_iter() {
                        paths.push(vec![Hop {
                            model: model.to_string(),
                            relation: relation.name.clone(),
                            target: relation.property_type.target().unwrap_or_default().to_string(),
                        }]);
                    }
                }
                paths
            }
            IncludeTargets::Paths(paths) => paths.iter().map(|p| p.hops.clone()).collect(),
        };

        let mut seen: HashSet<Reference> = records.iter().map(Record::reference).collect();
        let mut included = Vec::new();

        let mut frontier: Vec<(&[Hop], Vec<Record>)> = paths
            .iter()
            .filter(|hops| !hops.is_empty())
            .map(|hops| (hops.as_slice(), records.to_vec()))
            .collect();

        // one concurrent batch of fetches per level
        while !frontier.is_empty() {
            let fetches = frontier.iter().map(|(hops, level)| {
                let hop = &hops[0];
                let mut ids: Vec<String> = level
                    .iter()
                    .filter(|record| record.model == hop.model)
                    .flat_map(|record| record.references(&hop.relation))
                    .map(|reference| reference.id.clone())
                    .collect();
                ids.sort();
                ids.dedup();
                self.fetch(&hop.target, ids)
            });
            let results = try_join_all(fetches).await?;

            let mut next = Vec::new();
            for ((hops, _), fetched) in frontier.into_iter().zip(results) {
                for record in &fetched {
                    if seen.insert(record.reference()) {
                        included.push(Resource {
                            id: record.id.clone(),
                            model: record.model.clone(),
                            attributes: attributes(self.schema(&record.model)?, record),
                            relationships: None,
                            links: None,
                        });
                    }
                }
                if hops.len() > 1 {
                    next.push((&hops[1..], fetched));
                }
            }
            frontier = next;
        }

        Ok(included)
    }

    async fn fetch(&self, model: &str, ids: Vec<String>) -> StoreResult<Vec<Record>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let wanted = ids.len();
        let records = self
            .store
            .find(model, &Criteria::by_ids(ids), &FindOptions::default())
            .await?;
        if records.len() < wanted {
            tracing::debug!(
                model,
                missing = wanted - records.len(),
                "skipping dangling references"
            );
        }
        Ok(records)
    }

    fn schema(&self, model: &str) -> EurekaResult<&'a Schema> {
        self.registry
            .schema(model)
            .map_err(|e| EurekaError::Internal(e.to_string()))
    }
}

/// Present non-relation properties, in schema order
fn attributes(schema: &Schema, record: &Record) -> IndexMap<String, Value> {
    schema
        .attributes()
        .filter_map(|property| {
            record
                .get(&property.name)
                .map(|value| (property.name.clone(), property_json(value)))
        })
        .collect()
}

fn property_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Scalar(v) => v.to_json(),
        PropertyValue::List(values) => Value::Array(values.iter().map(|v| v.to_json()).collect()),
        PropertyValue::One(reference) => reference
            .as_ref()
            .map(|r| Value::String(r.id.clone()))
            .unwrap_or(Value::Null),
        PropertyValue::Many(references) => references
            .iter()
            .map(|r| Value::String(r.id.clone()))
            .collect(),
    }
}

fn linkage(record: &Record, relation: &str, multi: bool) -> Linkage {
    let references = record.references(relation).into_iter().cloned();
    if multi {
        Linkage::Many(references.collect())
    } else {
        Linkage::One(references.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldValue;
    use crate::core::schema::PropertyType;
    use crate::core::validation::IncludePath;
    use crate::storage::InMemoryStore;
    use serde_json::json;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builder()
            .register(
                Schema::new("Generic")
                    .property("text", PropertyType::String)
                    .property("integer", PropertyType::Integer)
                    .relation("relation", "GenericRelation")
                    .relations("relations", "GenericRelation"),
            )
            .register(
                Schema::new("GenericRelation")
                    .property("text", PropertyType::String)
                    .relation("parent", "Generic"),
            )
            .build()
            .unwrap()
    }

    fn generic(i: i64, relation: &str) -> Record {
        Record::new("Generic", format!("generic{}", i))
            .with("text", FieldValue::from(format!("hello world {}", i)))
            .with("integer", FieldValue::Integer(i))
            .with("relation", Reference::new("GenericRelation", relation))
    }

    async fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .batch_sync(vec![
                Record::new("GenericRelation", "relation0")
                    .with("text", FieldValue::from("relation 0"))
                    .with("parent", Reference::new("Generic", "generic1")),
                Record::new("GenericRelation", "relation1").with("text", FieldValue::from("relation 1")),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_resource_links_and_relationships() {
        let (registry, store) = (registry(), store().await);
        let serializer = DocumentSerializer::new(&registry, &store, "/api/1");
        let resource = serializer
            .resource(&generic(3, "relation1"), &Selection::All)
            .unwrap();
        let value = serde_json::to_value(&resource).unwrap();

        assert_eq!(value["attributes"], json!({"text": "hello world 3", "integer": 3}));
        assert_eq!(value["links"]["self"], "/api/1/generics/generic3");
        assert_eq!(
            value["relationships"]["relation"],
            json!({
                "data": {"type": "GenericRelation", "id": "relation1"},
                "links": {
                    "self": "/api/1/generics/generic3/relationships/relation",
                    "related": "/api/1/generics/generic3/relation"
                }
            })
        );
        assert_eq!(value["relationships"]["relations"]["data"], json!([]));
    }

    #[tokio::test]
    async fn test_fields_selection_is_exact() {
        let (registry, store) = (registry(), store().await);
        let serializer = DocumentSerializer::new(&registry, &store, "/api/1");
        let record = Record::new("Generic", "generic1").with("integer", FieldValue::Integer(1));
        let resource = serializer
            .resource(
                &record,
                &Selection::Only(vec!["integer".to_string(), "text".to_string()]),
            )
            .unwrap();

        assert_eq!(
            serde_json::to_value(&resource.attributes).unwrap(),
            json!({"integer": 1, "text": null})
        );
        assert!(resource.relationships.is_none());
    }

    #[tokio::test]
    async fn test_include_all_deduplicates() {
        let (registry, store) = (registry(), store().await);
        let serializer = DocumentSerializer::new(&registry, &store, "/api/1");
        // every record reaches both relations, through `relation` and `relations`
        let records: Vec<_> = (1..=4)
            .map(|i| {
                generic(i, if i % 2 == 0 { "relation0" } else { "relation1" }).with(
                    "relations",
                    vec![
                        Reference::new("GenericRelation", "relation1"),
                        Reference::new("GenericRelation", "relation0"),
                    ],
                )
            })
            .collect();

        let doc = serializer
            .serialize(&records, &Selection::All, &IncludeTargets::All)
            .await
            .unwrap();
        let included = doc.included.unwrap();
        let mut ids: Vec<_> = included.iter().map(|r| r.id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["relation0", "relation1"]);
        let pairs: HashSet<_> = included.iter().map(|r| (r.model.as_str(), r.id.as_str())).collect();
        assert_eq!(pairs.len(), included.len());
        assert!(included.iter().all(|r| r.relationships.is_none() && r.links.is_none()));
    }

    #[tokio::test]
    async fn test_dangling_references_are_skipped() {
        let (registry, store) = (registry(), store().await);
        let serializer = DocumentSerializer::new(&registry, &store, "/api/1");
        let doc = serializer
            .serialize(&[generic(1, "relation9")], &Selection::All, &IncludeTargets::All)
            .await
            .unwrap();
        assert!(doc.included.is_none());
    }

    #[tokio::test]
    async fn test_nested_include_never_repeats_primary() {
        let (registry, store) = (registry(), store().await);
        let serializer = DocumentSerializer::new(&registry, &store, "/api/1");
        let path = registry.resolve("Generic", "relation.parent").unwrap();
        let mut hops = path.hops.clone();
        hops.push(Hop {
            model: path.model.clone(),
            relation: "parent".to_string(),
            target: "Generic".to_string(),
        });
        let include = IncludeTargets::Paths(vec![IncludePath {
            path: "relation.parent".to_string(),
            hops,
        }]);

        // generic1 -> relation0 -> parent generic1 (already primary)
        store.save(generic(1, "relation0")).await.unwrap();
        let doc = serializer
            .serialize_one(&generic(1, "relation0"), &Selection::All, &include)
            .await
            .unwrap();
        let included = doc.included.unwrap();
        assert_eq!(included.len(), 1);
        assert_eq!(included[0].id, "relation0");
    }

    #[tokio::test]
    async fn test_linkage() {
        let (registry, store) = (registry(), store().await);
        let serializer = DocumentSerializer::new(&registry, &store, "/api/1");
        let record = generic(1, "relation0");
        assert_eq!(
            serializer.linkage(&record, "relation").unwrap(),
            Linkage::One(Some(Reference::new("GenericRelation", "relation0")))
        );
        assert_eq!(
            serializer.linkage(&record, "relations").unwrap(),
            Linkage::Many(vec![])
        );
        assert!(serializer.linkage(&record, "nope").is_err());
    }
}
