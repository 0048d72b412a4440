//! Runs validated queries against a [`Store`]
//!
//! Local conditions go straight into [`Criteria`]. A condition on a relation
//! path (`relation.text`) becomes a semi-join: the innermost model is queried
//! first, and the matching ids constrain the relation one level up, until the
//! root model is reached.

use crate::core::field::FieldValue;
use crate::core::record::Record;
use crate::core::store::{Criteria, FindOptions, Predicate, Store, StoreResult};
use crate::core::validation::{ValidatedCondition, ValidatedQuery};

pub struct Executor<'a> {
    store: &'a dyn Store,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Matching records, sorted and limited
    pub async fn execute(&self, query: &ValidatedQuery) -> StoreResult<Vec<Record>> {
        let Some(criteria) = self.filter(&query.conditions).await? else {
            return Ok(Vec::new());
        };

        let options = FindOptions {
            sort: query.sort.clone(),
            limit: query.limit,
        };
        self.store.find(&query.model, &criteria, &options).await
    }

    /// Translate conditions into criteria on the root model
    ///
    /// Returns `None` when a semi-join found no related record, in which
    /// case nothing can match.
    pub async fn filter(&self, conditions: &[ValidatedCondition]) -> StoreResult<Option<Criteria>> {
        let mut criteria = Criteria::new();

        for condition in conditions {
            let path = &condition.path;
            let Some((root, inner)) = path.hops.split_first() else {
                criteria = criteria.and(path.property.name.clone(), condition.predicate());
                continue;
            };

            // innermost model first
            let mut step = Criteria::new().and(path.property.name.clone(), condition.predicate());
            let mut model = path.model.as_str();
            for hop in inner.iter().rev() {
                let ids = self.matching_ids(model, &step).await?;
                if ids.is_empty() {
                    tracing::debug!(path = %path.path, model, "semi-join matched nothing");
                    return Ok(None);
                }
                step = Criteria::new().and(hop.relation.clone(), Predicate::In(ids));
                model = hop.model.as_str();
            }

            let ids = self.matching_ids(model, &step).await?;
            if ids.is_empty() {
                tracing::debug!(path = %path.path, model, "semi-join matched nothing");
                return Ok(None);
            }
            criteria = criteria.and(root.relation.clone(), Predicate::In(ids));
        }

        tracing::debug!(?criteria, "built store criteria");
        Ok(Some(criteria))
    }

    async fn matching_ids(&self, model: &str, criteria: &Criteria) -> StoreResult<Vec<FieldValue>> {
        Ok(self
            .store
            .find(model, criteria, &FindOptions::default())
            .await?
            .into_iter()
            .map(|record| FieldValue::String(record.id))
            .collect())
    }
}
