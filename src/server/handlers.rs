//! HTTP handlers for resource collections
//!
//! Every handler is model-agnostic: the `{plural}` path segment selects the
//! schema, and everything below it (parsing, validation, execution and
//! serialization) is driven by that schema.

use super::host::ServerHost;
use super::jsonapi::{Created, JsonApi};
use crate::core::error::{EurekaError, EurekaResult, ParseError, ValidationError};
use crate::core::query::{QueryParser, Selection};
use crate::core::record::Record;
use crate::core::schema::Schema;
use crate::core::store::{Criteria, FindOptions};
use crate::core::validation::{IncludeTargets, PayloadValidator, QueryValidator};
use crate::document::serializer::DocumentSerializer;
use crate::document::{Document, Linkage, PrimaryData};
use crate::engine::{Aggregator, Executor};
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

/// GET /{plural}
pub async fn find(
    State(host): State<Arc<ServerHost>>,
    Path(plural): Path<String>,
    query: QueryPairs,
) -> EurekaResult<JsonApi<Document>> {
    let schema = host.schema_for(&plural)?;
    let plan = QueryParser::parse(query_pairs(query)?)?;
    let validated = QueryValidator::new(&host.registry).validate(schema.name(), &plan)?;

    let records = Executor::new(host.store.as_ref())
        .execute(&validated)
        .await?;
    tracing::debug!(model = schema.name(), count = records.len(), "records found");

    let document = serializer(&host)
        .serialize(&records, &validated.fields, &validated.include)
        .await?;
    Ok(JsonApi(document))
}

/// GET /{plural}/{id}
pub async fn find_one(
    State(host): State<Arc<ServerHost>>,
    Path((plural, id)): Path<(String, String)>,
    query: QueryPairs,
) -> EurekaResult<JsonApi<Document>> {
    let schema = host.schema_for(&plural)?;
    let plan = QueryParser::parse(query_pairs(query)?)?;
    let validated = QueryValidator::new(&host.registry).validate(schema.name(), &plan)?;

    let record = fetch(&host, schema, &id).await?;
    let document = serializer(&host)
        .serialize_one(&record, &validated.fields, &validated.include)
        .await?;
    Ok(JsonApi(document))
}

/// GET /{plural}/i/group-by/{property}
pub async fn group_by(
    State(host): State<Arc<ServerHost>>,
    Path((plural, property)): Path<(String, String)>,
    query: QueryPairs,
) -> EurekaResult<JsonApi<Document>> {
    let schema = host.schema_for(&plural)?;
    let plan = QueryParser::parse(query_pairs(query)?)?;

    let groups = Aggregator::new(&host.registry, host.store.as_ref())
        .group_by(schema.name(), &property, &plan.filters)
        .await?;
    Ok(JsonApi(Document::data(PrimaryData::Groups(groups))))
}

/// POST /{plural}
///
/// The id is taken from the body when given, otherwise generated.
pub async fn create(
    State(host): State<Arc<ServerHost>>,
    Path(plural): Path<String>,
    body: Bytes,
) -> EurekaResult<Created<Document>> {
    let schema = host.schema_for(&plural)?;
    let changes = PayloadValidator::resource(schema, &parse_body(&body)?, None)?;

    let id = changes
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if host.store.get(schema.name(), &id).await?.is_some() {
        return Err(EurekaError::Conflict {
            message: "id is taken".to_string(),
        });
    }

    let mut record = Record::new(schema.name(), id);
    changes.apply(&mut record);
    let record = host.store.save(record).await?;
    tracing::info!(model = schema.name(), id = %record.id, "record created");

    let document = serializer(&host)
        .serialize_one(&record, &Selection::All, &IncludeTargets::None)
        .await?;
    Ok(Created(document))
}

/// PATCH /{plural}/{id}
///
/// Only the attributes and relationships present in the body change.
pub async fn update(
    State(host): State<Arc<ServerHost>>,
    Path((plural, id)): Path<(String, String)>,
    body: Bytes,
) -> EurekaResult<JsonApi<Document>> {
    let schema = host.schema_for(&plural)?;
    let changes = PayloadValidator::resource(schema, &parse_body(&body)?, Some(&id))?;

    let mut record = fetch(&host, schema, &id).await?;
    changes.apply(&mut record);
    let record = host.store.save(record).await?;
    tracing::info!(model = schema.name(), id = %record.id, "record updated");

    let document = serializer(&host)
        .serialize_one(&record, &Selection::All, &IncludeTargets::None)
        .await?;
    Ok(JsonApi(document))
}

/// GET /{plural}/{id}/relationships/{relation}
pub async fn relationship(
    State(host): State<Arc<ServerHost>>,
    Path((plural, id, relation)): Path<(String, String, String)>,
) -> EurekaResult<JsonApi<Document>> {
    let schema = host.schema_for(&plural)?;
    let record = fetch(&host, schema, &id).await?;

    let linkage = serializer(&host).linkage(&record, &relation)?;
    Ok(JsonApi(Document::data(PrimaryData::Linkage(linkage))))
}

/// PATCH /{plural}/{id}/relationships/{relation}
///
/// Replaces the whole relation; answers `204 No Content`.
pub async fn update_relationship(
    State(host): State<Arc<ServerHost>>,
    Path((plural, id, relation)): Path<(String, String, String)>,
    body: Bytes,
) -> EurekaResult<StatusCode> {
    let schema = host.schema_for(&plural)?;
    let value = PayloadValidator::relationship(schema, &relation, &parse_body(&body)?)?;

    let mut record = fetch(&host, schema, &id).await?;
    record.set(&relation, value);
    host.store.save(record).await?;
    tracing::info!(model = schema.name(), id = %id, relation = %relation, "relationship updated");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /{plural}/{id}/{relation}
///
/// The related resource (to-one, `null` when unset) or resources (to-many).
/// References to missing records are skipped.
pub async fn related(
    State(host): State<Arc<ServerHost>>,
    Path((plural, id, relation)): Path<(String, String, String)>,
    query: QueryPairs,
) -> EurekaResult<JsonApi<Document>> {
    let schema = host.schema_for(&plural)?;
    let (property, target) = schema
        .get(&relation)
        .and_then(|property| property.property_type.target().map(|target| (property, target)))
        .ok_or_else(|| EurekaError::UnknownRelation {
            model: schema.name().to_string(),
            relation: relation.clone(),
        })?;
    let target = host
        .registry
        .schema(target)
        .map_err(|e| EurekaError::Internal(e.to_string()))?;

    let plan = QueryParser::parse(query_pairs(query)?)?;
    let validated = QueryValidator::new(&host.registry).validate(target.name(), &plan)?;

    let record = fetch(&host, schema, &id).await?;
    let ids: Vec<String> = record
        .references(&relation)
        .into_iter()
        .map(|reference| reference.id.clone())
        .collect();
    let mut records = if ids.is_empty() {
        Vec::new()
    } else {
        host.store
            .find(target.name(), &Criteria::by_ids(ids.clone()), &FindOptions::default())
            .await?
    };
    // keep the order of the references
    records.sort_by_key(|record| ids.iter().position(|id| *id == record.id));

    let documents = serializer(&host);
    if property.is_multi() {
        return Ok(JsonApi(
            documents
                .serialize(&records, &validated.fields, &validated.include)
                .await?,
        ));
    }

    match records.first() {
        Some(record) => Ok(JsonApi(
            documents
                .serialize_one(record, &validated.fields, &validated.include)
                .await?,
        )),
        None => Ok(JsonApi(Document::data(PrimaryData::Linkage(Linkage::One(None))))),
    }
}

fn serializer(host: &ServerHost) -> DocumentSerializer<'_> {
    DocumentSerializer::new(&host.registry, host.store.as_ref(), &host.api_root_prefix)
}

async fn fetch(host: &ServerHost, schema: &Schema, id: &str) -> EurekaResult<Record> {
    host.store
        .get(schema.name(), id)
        .await?
        .ok_or_else(|| EurekaError::NotFound {
            model: schema.name().to_string(),
            id: id.to_string(),
        })
}

fn query_pairs(query: QueryPairs) -> EurekaResult<Vec<(String, String)>> {
    query.map(|Query(pairs)| pairs).map_err(|rejection| {
        ParseError::QueryString {
            message: rejection.body_text(),
        }
        .into()
    })
}

fn parse_body(body: &Bytes) -> EurekaResult<Value> {
    serde_json::from_slice(body).map_err(|e| {
        ValidationError::MalformedPayload {
            infos: Some(e.to_string()),
        }
        .into()
    })
}
