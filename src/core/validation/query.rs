//! Checks a [`QueryPlan`] against the schema registry
//!
//! Conditions are checked in query order, then `fields`, `sort` and
//! `include`. The first failure is returned; nothing reaches the store
//! before the whole plan is valid.

use crate::core::error::ValidationError;
use crate::core::field::FieldValue;
use crate::core::query::{Condition, Include, QueryPlan, RawValue, Selection, SortKey};
use crate::core::schema::{Hop, ID_PROPERTY, ResolvedPath, Schema, SchemaRegistry};
use crate::core::store::Predicate;
use serde_json::Value;

/// Filter operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    In,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// Read a raw token; `None` is plain equality
    pub fn parse(token: Option<&str>) -> Option<Self> {
        match token {
            None => Some(Operator::Eq),
            Some("$ne") => Some(Operator::Ne),
            Some("$in") => Some(Operator::In),
            Some("$gt") => Some(Operator::Gt),
            Some("$gte") => Some(Operator::Gte),
            Some("$lt") => Some(Operator::Lt),
            Some("$lte") => Some(Operator::Lte),
            Some(_) => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::In => "$in",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
        }
    }

    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte
        )
    }
}

/// Coerced condition value
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionValue {
    Single(FieldValue),
    Set(Vec<FieldValue>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCondition {
    pub path: ResolvedPath,
    pub operator: Operator,
    pub value: ConditionValue,
}

impl ValidatedCondition {
    /// Store predicate for the terminal property of the path
    pub fn predicate(&self) -> Predicate {
        use ConditionValue::{Set, Single};

        match (self.operator, self.value.clone()) {
            (Operator::Eq, Single(v)) => Predicate::Eq(v),
            (Operator::Eq | Operator::In, Set(vs)) => Predicate::In(vs),
            (Operator::In, Single(v)) => Predicate::In(vec![v]),
            (Operator::Ne, Single(v)) => Predicate::Ne(v),
            (Operator::Ne, Set(vs)) => Predicate::NotIn(vs),
            (Operator::Gt, Single(v)) => Predicate::Gt(v),
            (Operator::Gte, Single(v)) => Predicate::Gte(v),
            (Operator::Lt, Single(v)) => Predicate::Lt(v),
            (Operator::Lte, Single(v)) => Predicate::Lte(v),
            // ordering operators only ever carry a single value
            (_, Set(vs)) => Predicate::In(vs),
        }
    }
}

/// A relation path to side-load; every hop is a relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludePath {
    pub path: String,
    pub hops: Vec<Hop>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IncludeTargets {
    #[default]
    None,
    /// Every relation, one hop
    All,
    Paths(Vec<IncludePath>),
}

/// Query plan proven consistent with the schema
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub model: String,
    pub conditions: Vec<ValidatedCondition>,
    pub sort: Vec<SortKey>,
    pub fields: Selection,
    pub include: IncludeTargets,
    pub limit: Option<usize>,
}

pub struct QueryValidator<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> QueryValidator<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    pub fn validate(&self, model: &str, plan: &QueryPlan) -> Result<ValidatedQuery, ValidationError> {
        let conditions = self.validate_filters(model, &plan.filters)?;
        let fields = self.validate_fields(model, &plan.fields)?;
        let sort = self.validate_sort(model, &plan.sort)?;
        let include = self.validate_include(model, &plan.include)?;

        Ok(ValidatedQuery {
            model: model.to_string(),
            conditions,
            sort,
            fields,
            include,
            limit: plan.limit,
        })
    }

    /// Validate conditions only (used by group-by)
    pub fn validate_filters(
        &self,
        model: &str,
        filters: &[Condition],
    ) -> Result<Vec<ValidatedCondition>, ValidationError> {
        filters
            .iter()
            .map(|condition| {
                self.validate_condition(model, condition)
                    .map_err(|infos| ValidationError::MalformedQuery { infos })
            })
            .collect()
    }

    fn validate_condition(
        &self,
        model: &str,
        condition: &Condition,
    ) -> Result<ValidatedCondition, String> {
        let path = self
            .registry
            .resolve(model, &condition.path)
            .map_err(|e| e.to_string())?;

        let operator = Operator::parse(condition.operator.as_deref()).ok_or_else(|| {
            format!(
                "unknown operator \"{}\"",
                condition.operator.as_deref().unwrap_or_default()
            )
        })?;

        let segment = path.property.name.as_str();
        let property_type = &path.property.property_type;

        if operator.is_ordering() && !property_type.is_orderable() {
            return Err(format!(
                "operator \"{}\" is not applicable to \"{}\"",
                operator.token(),
                segment
            ));
        }

        let coerce = |raw: &Value| {
            FieldValue::coerce(raw, property_type).map_err(|e| format!("\"{}\" {}", segment, e))
        };

        let value = match &condition.value {
            RawValue::Scalar(raw) => ConditionValue::Single(coerce(&Value::String(raw.clone()))?),
            RawValue::List(_) if operator.is_ordering() => {
                return Err(format!("\"{}\" must be a single value", segment));
            }
            RawValue::List(items) => {
                ConditionValue::Set(items.iter().map(coerce).collect::<Result<_, _>>()?)
            }
        };

        Ok(ValidatedCondition {
            path,
            operator,
            value,
        })
    }

    fn validate_fields(&self, model: &str, fields: &Selection) -> Result<Selection, ValidationError> {
        let Selection::Only(names) = fields else {
            return Ok(Selection::All);
        };
        let schema = self.schema(model)?;

        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            match schema.get(name) {
                // id is always rendered
                Some(_) if name == ID_PROPERTY => {}
                Some(property) if property.is_relation() => {
                    return Err(ValidationError::MalformedOptions {
                        infos: format!("\"{}\" is a relation and cannot be selected in fields", name),
                    });
                }
                Some(_) => selected.push(name.clone()),
                None => return Err(Self::unknown_option(model, name)),
            }
        }

        Ok(Selection::Only(selected))
    }

    fn validate_sort(&self, model: &str, sort: &[SortKey]) -> Result<Vec<SortKey>, ValidationError> {
        let schema = self.schema(model)?;
        for key in sort {
            if schema.get(&key.property).is_none() {
                return Err(Self::unknown_option(model, &key.property));
            }
        }
        Ok(sort.to_vec())
    }

    fn validate_include(
        &self,
        model: &str,
        include: &Include,
    ) -> Result<IncludeTargets, ValidationError> {
        let paths = match include {
            Include::None => return Ok(IncludeTargets::None),
            Include::All => return Ok(IncludeTargets::All),
            Include::Paths(paths) => paths,
        };

        let mut targets = Vec::with_capacity(paths.len());
        for path in paths {
            let resolved = self
                .registry
                .resolve(model, path)
                .map_err(|e| ValidationError::MalformedOptions {
                    infos: e.to_string(),
                })?;

            let Some(target) = resolved.property.property_type.target() else {
                return Err(ValidationError::MalformedOptions {
                    infos: format!("\"{}\" is not a relation on model \"{}\"", path, model),
                });
            };

            let mut hops = resolved.hops.clone();
            hops.push(Hop {
                model: resolved.model.clone(),
                relation: resolved.property.name.clone(),
                target: target.to_string(),
            });
            targets.push(IncludePath {
                path: path.clone(),
                hops,
            });
        }

        Ok(IncludeTargets::Paths(targets))
    }

    fn schema(&self, model: &str) -> Result<&'a Schema, ValidationError> {
        self.registry
            .schema(model)
            .map_err(|e| ValidationError::MalformedOptions {
                infos: e.to_string(),
            })
    }

    fn unknown_option(model: &str, property: &str) -> ValidationError {
        ValidationError::MalformedOptions {
            infos: format!("unknown property \"{}\" on model \"{}\"", property, model),
        }
    }
}
