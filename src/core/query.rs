//! Query-string parsing into an unvalidated query plan
//!
//! # Format
//! ```text
//! filter[text]=hello                  equality
//! filter[integer][$gt]=3              operator (kept raw, checked later)
//! filter[integer][$in]=[2,4,6]        JSON array literal
//! filter[integer][$in]=2,4,6          comma list, `$in` only
//! filter[relation.text]=relation 1    dotted relation path
//! sort=-integer,text                  leading `-` sorts descending
//! fields=text,integer                 or ["text","integer"]
//! include=1                           every relation, one hop
//! include=relation,relations          explicit relation paths
//! limit=5
//! ```
//!
//! Nothing here knows about schemas; the plan is checked by
//! [`QueryValidator`](crate::core::validation::QueryValidator).

use crate::core::error::ParseError;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

const IN_OPERATOR: &str = "$in";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub property: String,
    pub direction: SortDirection,
}

impl SortKey {
    /// `"-integer"` sorts descending on `integer`
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(property) => Self::descending(property),
            None => Self::ascending(raw),
        }
    }

    pub fn ascending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Sparse fieldset
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Only(Vec<String>),
}

/// Related resources to side-load
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Include {
    #[default]
    None,
    All,
    Paths(Vec<String>),
}

/// Untyped filter value as found in the query string
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Scalar(String),
    List(Vec<Value>),
}

/// One `filter[...]` entry
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Dot-separated property path
    pub path: String,
    /// Raw operator token (`$gt`, ...); `None` means equality
    pub operator: Option<String>,
    pub value: RawValue,
}

impl Condition {
    pub fn eq(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            operator: None,
            value: RawValue::Scalar(value.into()),
        }
    }

    pub fn with_operator(
        path: impl Into<String>,
        operator: impl Into<String>,
        value: RawValue,
    ) -> Self {
        Self {
            path: path.into(),
            operator: Some(operator.into()),
            value,
        }
    }
}

/// Unvalidated query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPlan {
    /// Conditions in query-string order
    pub filters: Vec<Condition>,
    pub sort: Vec<SortKey>,
    pub fields: Selection,
    pub include: Include,
    pub limit: Option<usize>,
}

fn filter_key_regex() -> &'static Regex {
    static FILTER_KEY: OnceLock<Regex> = OnceLock::new();
    FILTER_KEY.get_or_init(|| {
        Regex::new(r"^filter\[([^\[\]]+)\](?:\[([^\[\]]+)\])?$")
            .expect("filter key pattern is valid")
    })
}

/// Turns decoded query pairs into a [`QueryPlan`]
pub struct QueryParser;

impl QueryParser {
    /// Parse decoded `(key, value)` pairs
    ///
    /// Filters keep their order. For `sort`, `fields`, `include` and `limit`
    /// the last occurrence wins. Unknown parameters are ignored.
    pub fn parse<I, K, V>(params: I) -> Result<QueryPlan, ParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut plan = QueryPlan::default();

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());

            match key {
                "sort" => {
                    plan.sort = Self::parse_list(key, value)?
                        .iter()
                        .map(|s| SortKey::parse(s))
                        .collect();
                }
                "fields" => {
                    let fields = Self::parse_list(key, value)?;
                    plan.fields = if fields.is_empty() {
                        Selection::All
                    } else {
                        Selection::Only(fields)
                    };
                }
                "include" => {
                    plan.include = match value.trim() {
                        "1" | "true" => Include::All,
                        "" | "0" | "false" => Include::None,
                        _ => Include::Paths(Self::parse_list(key, value)?),
                    };
                }
                "limit" => plan.limit = Some(Self::parse_limit(value)?),
                _ if key.starts_with("filter[") => {
                    plan.filters.push(Self::parse_filter(key, value)?);
                }
                _ => tracing::debug!(parameter = key, "ignoring unknown query parameter"),
            }
        }

        tracing::debug!(?plan, "parsed query plan");
        Ok(plan)
    }

    fn parse_filter(key: &str, value: &str) -> Result<Condition, ParseError> {
        let captures = filter_key_regex()
            .captures(key)
            .ok_or_else(|| ParseError::InvalidFilterKey {
                key: key.to_string(),
            })?;

        let path = captures[1].to_string();
        let operator = captures.get(2).map(|m| m.as_str().to_string());

        let value = if value.trim_start().starts_with('[') {
            RawValue::List(Self::parse_array(key, value)?)
        } else if operator.as_deref() == Some(IN_OPERATOR) {
            RawValue::List(
                value
                    .split(',')
                    .map(|v| Value::String(v.trim().to_string()))
                    .collect(),
            )
        } else {
            RawValue::Scalar(value.to_string())
        };

        Ok(Condition {
            path,
            operator,
            value,
        })
    }

    fn parse_array(parameter: &str, value: &str) -> Result<Vec<Value>, ParseError> {
        serde_json::from_str::<Vec<Value>>(value).map_err(|e| ParseError::InvalidArray {
            parameter: parameter.to_string(),
            message: e.to_string(),
        })
    }

    /// Comma list or array literal of strings; blank entries are dropped
    fn parse_list(parameter: &str, value: &str) -> Result<Vec<String>, ParseError> {
        if value.trim_start().starts_with('[') {
            return Self::parse_array(parameter, value)?
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    other => Err(ParseError::InvalidArray {
                        parameter: parameter.to_string(),
                        message: format!("expected strings, found {other}"),
                    }),
                })
                .collect();
        }

        Ok(value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }

    fn parse_limit(value: &str) -> Result<usize, ParseError> {
        value
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|limit| *limit > 0)
            .ok_or_else(|| ParseError::InvalidLimit {
                value: value.to_string(),
            })
    }
}
