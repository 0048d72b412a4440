//! Query execution and aggregation over a [`Store`](crate::core::store::Store)

pub mod aggregate;
pub mod executor;

pub use aggregate::{Aggregator, GroupCount};
pub use executor::Executor;
