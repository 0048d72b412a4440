//! Schema validation of queries and request bodies
//!
//! Both validators only read the [`SchemaRegistry`](crate::core::schema::SchemaRegistry)
//! and never touch the store.

pub mod payload;
pub mod query;

pub use payload::{PayloadValidator, ResourceChanges};
pub use query::{
    ConditionValue, IncludePath, IncludeTargets, Operator, QueryValidator, ValidatedCondition,
    ValidatedQuery,
};
