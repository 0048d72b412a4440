//! JSON-API document model
//!
//! Plain serde types for the top-level document, resources, relationships
//! and error objects. [`serializer`] turns records into these.

pub mod serializer;

pub use serializer::DocumentSerializer;

use crate::core::record::Reference;
use crate::engine::aggregate::GroupCount;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Media type of every response body
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub related: String,
}

/// Resource linkage: one pointer (possibly null) or an ordered list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Linkage {
    One(Option<Reference>),
    Many(Vec<Reference>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    pub data: Linkage,
    pub links: RelationshipLinks,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceLinks {
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub id: String,
    #[serde(rename = "type")]
    pub model: String,
    pub attributes: IndexMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationships: Option<IndexMap<String, Relationship>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<ResourceLinks>,
}

/// Primary data of a document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PrimaryData {
    One(Box<Resource>),
    Many(Vec<Resource>),
    Linkage(Linkage),
    Groups(Vec<GroupCount>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMeta {
    pub infos: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorObject {
    pub status: u16,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ErrorMeta>,
}

/// Top-level document: `data` (+ `included`) or `errors`, never both
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<Resource>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ErrorObject>>,
}

impl Document {
    pub fn data(data: PrimaryData) -> Self {
        Self {
            data: Some(data),
            included: None,
            errors: None,
        }
    }

    /// Attach side-loaded resources; an empty set is left out
    pub fn with_included(mut self, included: Vec<Resource>) -> Self {
        self.included = (!included.is_empty()).then_some(included);
        self
    }

    pub fn errors(errors: Vec<ErrorObject>) -> Self {
        Self {
            data: None,
            included: None,
            errors: Some(errors),
        }
    }
}
