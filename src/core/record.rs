//! Stored records and their property values

use crate::core::field::FieldValue;
use crate::core::query::{SortDirection, SortKey};
use crate::core::schema::ID_PROPERTY;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Pointer to another record: `{ "type": ..., "id": ... }`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "type")]
    pub model: String,
    pub id: String,
}

impl Reference {
    pub fn new(model: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            id: id.into(),
        }
    }
}

/// Value held by one property of a record
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Single scalar
    Scalar(FieldValue),
    /// Multi scalar, in stored order
    List(Vec<FieldValue>),
    /// Single relation; `None` when unset
    One(Option<Reference>),
    /// Multi relation, in stored order
    Many(Vec<Reference>),
}

impl PropertyValue {
    /// Flatten to the comparable values used by filters and sorting
    ///
    /// Relations contribute their target ids.
    pub fn values(&self) -> Vec<FieldValue> {
        match self {
            PropertyValue::Scalar(FieldValue::Null) => Vec::new(),
            PropertyValue::Scalar(v) => vec![v.clone()],
            PropertyValue::List(values) => values.clone(),
            PropertyValue::One(reference) => reference
                .iter()
                .map(|r| FieldValue::String(r.id.clone()))
                .collect(),
            PropertyValue::Many(references) => references
                .iter()
                .map(|r| FieldValue::String(r.id.clone()))
                .collect(),
        }
    }

    /// References held by a relation property (empty for scalars)
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            PropertyValue::One(reference) => reference.iter().collect(),
            PropertyValue::Many(references) => references.iter().collect(),
            _ => Vec::new(),
        }
    }
}

impl From<FieldValue> for PropertyValue {
    fn from(value: FieldValue) -> Self {
        PropertyValue::Scalar(value)
    }
}

impl From<Reference> for PropertyValue {
    fn from(reference: Reference) -> Self {
        PropertyValue::One(Some(reference))
    }
}

impl From<Vec<Reference>> for PropertyValue {
    fn from(references: Vec<Reference>) -> Self {
        PropertyValue::Many(references)
    }
}

/// A stored entity
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub model: String,
    pub properties: IndexMap<String, PropertyValue>,
}

impl Record {
    pub fn new(model: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            properties: IndexMap::new(),
        }
    }

    /// Builder-style setter
    pub fn with(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<PropertyValue>) {
        self.properties.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn reference(&self) -> Reference {
        Reference::new(self.model.clone(), self.id.clone())
    }

    /// Comparable values of a property; `id` yields the record id
    pub fn value_of(&self, name: &str) -> Vec<FieldValue> {
        if name == ID_PROPERTY {
            return vec![FieldValue::String(self.id.clone())];
        }
        self.get(name).map(PropertyValue::values).unwrap_or_default()
    }

    /// References held by a relation property
    pub fn references(&self, relation: &str) -> Vec<&Reference> {
        self.get(relation)
            .map(PropertyValue::references)
            .unwrap_or_default()
    }
}

/// Stable multi-key sort
///
/// Only the first value of a multi-valued property takes part. Records
/// missing a key come first whatever the direction. Values that cannot be
/// ordered against each other keep their relative position.
pub fn sort_records(records: &mut [Record], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }

    records.sort_by(|a, b| {
        for key in keys {
            let left = a.value_of(&key.property).into_iter().next();
            let right = b.value_of(&key.property).into_iter().next();

            let ordering = match (left, right) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(l), Some(r)) => {
                    let ordering = l.compare(&r).unwrap_or(Ordering::Equal);
                    match key.direction {
                        SortDirection::Ascending => ordering,
                        SortDirection::Descending => ordering.reverse(),
                    }
                }
            };

            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
