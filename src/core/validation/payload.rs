//! Request body validation for create and update
//!
//! Bodies are JSON-API resource documents:
//!
//! ```json
//! { "data": { "id": "generic3", "type": "Generic",
//!             "attributes": { "text": "yes baby" },
//!             "relationships": { "relation": { "data": { "id": "relation2", "type": "GenericRelation" } } } } }
//! ```
//!
//! Attribute values go through the same coercion as filter values.
//! Referenced records are not required to exist.

use crate::core::error::ValidationError;
use crate::core::field::FieldValue;
use crate::core::record::{PropertyValue, Record, Reference};
use crate::core::schema::{ID_PROPERTY, PropertyDef, Schema};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Typed changes extracted from a resource document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceChanges {
    /// Client-supplied id, if any
    pub id: Option<String>,
    pub attributes: IndexMap<String, PropertyValue>,
    pub relationships: IndexMap<String, PropertyValue>,
}

impl ResourceChanges {
    /// Overwrite the touched properties of `record`
    pub fn apply(self, record: &mut Record) {
        for (name, value) in self.attributes.into_iter().chain(self.relationships) {
            record.set(&name, value);
        }
    }
}

pub struct PayloadValidator;

impl PayloadValidator {
    /// Validate a create or update body for `schema`
    ///
    /// When `expected_id` is given (updates) a body id, if present, must
    /// equal it.
    pub fn resource(
        schema: &Schema,
        body: &Value,
        expected_id: Option<&str>,
    ) -> Result<ResourceChanges, ValidationError> {
        let data = body
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| malformed("\"data\" must be an object"))?;

        let id = match data.get("id") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id.clone()),
            Some(_) => return Err(malformed("\"id\" must be a string")),
        };
        match (id.as_deref(), expected_id) {
            (Some(id), Some(expected)) if id != expected => {
                return Err(malformed(format!(
                    "\"id\" \"{}\" does not match \"{}\"",
                    id, expected
                )));
            }
            _ => {}
        }

        match data.get("type").and_then(Value::as_str) {
            Some(model) if model == schema.name() => {}
            Some(model) => {
                return Err(malformed(format!(
                    "\"type\" \"{}\" does not match \"{}\"",
                    model,
                    schema.name()
                )));
            }
            None => return Err(malformed("\"type\" is required")),
        }

        let mut changes = ResourceChanges {
            id,
            ..Default::default()
        };

        for (name, raw) in object_member(data, "attributes")?.into_iter().flatten() {
            let property = Self::declared(schema, name)?;
            if property.is_relation() {
                return Err(malformed(format!(
                    "\"{}\" is a relation and must be set through relationships",
                    name
                )));
            }
            changes
                .attributes
                .insert(name.clone(), Self::attribute(property, raw)?);
        }

        for (name, raw) in object_member(data, "relationships")?.into_iter().flatten() {
            let property = Self::declared(schema, name)?;
            if !property.is_relation() {
                return Err(malformed(format!("\"{}\" is not a relation", name)));
            }
            changes
                .relationships
                .insert(name.clone(), Self::relationship(schema, name, raw)?);
        }

        Ok(changes)
    }

    /// Validate a relationship body `{ "data": pointer | [pointer] | null }`
    pub fn relationship(
        schema: &Schema,
        relation: &str,
        body: &Value,
    ) -> Result<PropertyValue, ValidationError> {
        let property = Self::declared(schema, relation)?;
        let target = property
            .property_type
            .target()
            .ok_or_else(|| malformed(format!("\"{}\" is not a relation", relation)))?;

        let data = body
            .as_object()
            .and_then(|object| object.get("data"))
            .ok_or_else(|| malformed("\"data\" is required"))?;

        if property.is_multi() {
            let items = data
                .as_array()
                .ok_or_else(|| malformed(format!("\"{}\" must be an array", relation)))?;
            let references = items
                .iter()
                .map(|item| pointer(relation, target, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(PropertyValue::Many(references))
        } else if data.is_null() {
            Ok(PropertyValue::One(None))
        } else {
            Ok(PropertyValue::One(Some(pointer(relation, target, data)?)))
        }
    }

    fn declared<'s>(schema: &'s Schema, name: &str) -> Result<&'s PropertyDef, ValidationError> {
        match schema.get(name) {
            Some(property) if name != ID_PROPERTY => Ok(property),
            _ => Err(ValidationError::SchemaViolation {
                model: schema.name().to_string(),
                property: name.to_string(),
            }),
        }
    }

    fn attribute(property: &PropertyDef, raw: &Value) -> Result<PropertyValue, ValidationError> {
        let coerce = |value: &Value| {
            FieldValue::coerce(value, &property.property_type)
                .map_err(|e| malformed(format!("\"{}\" {}", property.name, e)))
        };

        if !property.is_multi() {
            return Ok(PropertyValue::Scalar(coerce(raw)?));
        }

        match raw {
            Value::Null => Ok(PropertyValue::List(Vec::new())),
            Value::Array(items) => Ok(PropertyValue::List(
                items.iter().map(coerce).collect::<Result<_, _>>()?,
            )),
            _ => Err(malformed(format!("\"{}\" must be an array", property.name))),
        }
    }
}

fn malformed(infos: impl Into<String>) -> ValidationError {
    ValidationError::MalformedPayload {
        infos: Some(infos.into()),
    }
}

/// Optional object member; absent and null read as `None`
fn object_member<'v>(
    data: &'v Map<String, Value>,
    key: &str,
) -> Result<Option<&'v Map<String, Value>>, ValidationError> {
    match data.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(members)) => Ok(Some(members)),
        Some(_) => Err(malformed(format!("\"{}\" must be an object", key))),
    }
}

fn pointer(relation: &str, target: &str, raw: &Value) -> Result<Reference, ValidationError> {
    let reference: Reference = serde_json::from_value(raw.clone()).map_err(|_| {
        malformed(format!(
            "\"{}\" must hold resource identifiers {{\"type\", \"id\"}}",
            relation
        ))
    })?;

    if reference.model != target {
        return Err(malformed(format!(
            "\"{}\" must reference \"{}\", got \"{}\"",
            relation, target, reference.model
        )));
    }
    Ok(reference)
}
