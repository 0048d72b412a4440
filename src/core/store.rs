//! Store contract and the criteria language it accepts

use crate::core::field::FieldValue;
use crate::core::query::SortKey;
use crate::core::record::Record;
use crate::core::schema::ID_PROPERTY;
use async_trait::async_trait;
use thiserror::Error;

/// Comparison applied to the values of one property
///
/// Multi-valued properties match when any element matches; `Ne` and `NotIn`
/// match only when no element does. A record without the property matches
/// `Ne` and `NotIn` and nothing else.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(FieldValue),
    Ne(FieldValue),
    In(Vec<FieldValue>),
    NotIn(Vec<FieldValue>),
    Gt(FieldValue),
    Gte(FieldValue),
    Lt(FieldValue),
    Lte(FieldValue),
}

impl Predicate {
    /// Test the predicate against the (possibly empty) values of a property
    pub fn matches(&self, values: &[FieldValue]) -> bool {
        use std::cmp::Ordering::*;

        let mut values = values.iter();
        match self {
            Predicate::Eq(expected) => values.any(|v| v.matches(expected)),
            Predicate::Ne(expected) => !values.any(|v| v.matches(expected)),
            Predicate::In(set) => values.any(|v| set.iter().any(|s| v.matches(s))),
            Predicate::NotIn(set) => !values.any(|v| set.iter().any(|s| v.matches(s))),
            Predicate::Gt(bound) => values.any(|v| v.compare(bound) == Some(Greater)),
            Predicate::Gte(bound) => values.any(|v| matches!(v.compare(bound), Some(Greater | Equal))),
            Predicate::Lt(bound) => values.any(|v| v.compare(bound) == Some(Less)),
            Predicate::Lte(bound) => values.any(|v| matches!(v.compare(bound), Some(Less | Equal))),
        }
    }
}

/// One property constraint
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub property: String,
    pub predicate: Predicate,
}

/// Conjunction of constraints; empty criteria match every record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria(pub Vec<Criterion>);

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint
    pub fn and(mut self, property: impl Into<String>, predicate: Predicate) -> Self {
        self.0.push(Criterion {
            property: property.into(),
            predicate,
        });
        self
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().and(ID_PROPERTY, Predicate::Eq(FieldValue::String(id.into())))
    }

    pub fn by_ids(ids: impl IntoIterator<Item = String>) -> Self {
        Self::new().and(
            ID_PROPERTY,
            Predicate::In(ids.into_iter().map(FieldValue::String).collect()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Evaluate against a record
    pub fn matches(&self, record: &Record) -> bool {
        self.0
            .iter()
            .all(|c| c.predicate.matches(&record.value_of(&c.property)))
    }
}

/// Options for [`Store::find`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub sort: Vec<SortKey>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A unique property already holds this value on another record
    #[error("{property} is taken")]
    UniqueViolation {
        model: String,
        property: String,
        value: String,
    },

    #[error("{model} \"{id}\" not found")]
    NotFound { model: String, id: String },

    #[error("store failure: {message}")]
    Backend { message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Abstract document store
///
/// The engine only talks to storage through this trait. Implementations
/// must evaluate [`Criteria`] with the semantics of [`Predicate::matches`]
/// and return records of one model at a time.
#[async_trait]
pub trait Store: Send + Sync {
    /// Records of `model` matching `criteria`
    async fn find(
        &self,
        model: &str,
        criteria: &Criteria,
        options: &FindOptions,
    ) -> StoreResult<Vec<Record>>;

    /// First matching record in store order
    async fn first(&self, model: &str, criteria: &Criteria) -> StoreResult<Option<Record>>;

    /// Number of matching records, across every model when `model` is `None`
    async fn count(&self, model: Option<&str>, criteria: &Criteria) -> StoreResult<usize>;

    /// Insert or replace a record
    async fn save(&self, record: Record) -> StoreResult<Record>;

    /// Save many records in one go
    async fn batch_sync(&self, records: Vec<Record>) -> StoreResult<Vec<Record>>;

    /// Remove every record
    async fn clear(&self) -> StoreResult<()>;

    /// Fetch one record by id
    async fn get(&self, model: &str, id: &str) -> StoreResult<Option<Record>> {
        self.first(model, &Criteria::by_id(id)).await
    }
}
