//! Core module containing the schema, query and store abstractions

pub mod error;
pub mod field;
pub mod pluralize;
pub mod query;
pub mod record;
pub mod schema;
pub mod store;
pub mod validation;

pub use error::{AggregatorError, EurekaError, EurekaResult, ParseError, ValidationError};
pub use field::{CoercionError, FieldValue};
pub use pluralize::Pluralizer;
pub use query::{Condition, Include, QueryParser, QueryPlan, RawValue, Selection, SortDirection, SortKey};
pub use record::{PropertyValue, Record, Reference};
pub use schema::{PropertyDef, PropertyType, Schema, SchemaError, SchemaRegistry};
pub use store::{Criteria, Criterion, FindOptions, Predicate, Store, StoreError, StoreResult};
