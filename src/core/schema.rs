//! Per-model schemas and the registry that resolves property paths
//!
//! The registry is built once at startup through [`SchemaRegistryBuilder`]
//! and never mutated afterwards; every request shares it behind an `Arc`.

use crate::core::pluralize::Pluralizer;
use indexmap::IndexMap;
use std::collections::HashMap;
use thiserror::Error;

/// Name of the implicit identifier property present on every model
pub const ID_PROPERTY: &str = "id";

/// Names that cannot be declared as properties
const RESERVED_PROPERTIES: &[&str] = &[ID_PROPERTY, "type"];

/// Declared type of a property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    /// Reference(s) to records of another model
    Relation { target: String },
}

impl PropertyType {
    /// Parse a type name as written in schema configuration
    ///
    /// Scalar type names are recognised; anything else is read as the name
    /// of the related model.
    pub fn parse(name: &str) -> Self {
        match name {
            "string" => PropertyType::String,
            "integer" => PropertyType::Integer,
            "float" => PropertyType::Float,
            "boolean" => PropertyType::Boolean,
            "date" => PropertyType::Date,
            "datetime" => PropertyType::DateTime,
            target => PropertyType::Relation {
                target: target.to_string(),
            },
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Float => "float",
            PropertyType::Boolean => "boolean",
            PropertyType::Date => "date",
            PropertyType::DateTime => "datetime",
            PropertyType::Relation { target } => target,
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(self, PropertyType::Relation { .. })
    }

    /// Target model for relations
    pub fn target(&self) -> Option<&str> {
        match self {
            PropertyType::Relation { target } => Some(target),
            _ => None,
        }
    }

    /// Whether `$gt`/`$gte`/`$lt`/`$lte` make sense on this type
    pub fn is_orderable(&self) -> bool {
        !matches!(self, PropertyType::Boolean | PropertyType::Relation { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    #[default]
    Single,
    Multi,
}

/// Definition of one property of a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDef {
    pub name: String,
    pub property_type: PropertyType,
    pub multiplicity: Multiplicity,
    /// Identifying property: no two records of the model may share a value
    pub unique: bool,
}

impl PropertyDef {
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            multiplicity: Multiplicity::Single,
            unique: false,
        }
    }

    pub fn multi(mut self) -> Self {
        self.multiplicity = Multiplicity::Multi;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn is_multi(&self) -> bool {
        self.multiplicity == Multiplicity::Multi
    }

    pub fn is_relation(&self) -> bool {
        self.property_type.is_relation()
    }
}

/// Schema of a single model
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    plural: String,
    id: PropertyDef,
    properties: IndexMap<String, PropertyDef>,
}

impl Schema {
    /// Create an empty schema; the plural defaults to the pluralized
    /// kebab-case model name (`GenericRelation` → `generic-relations`)
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            plural: Pluralizer::resource_name(&name),
            name,
            id: PropertyDef::new(ID_PROPERTY, PropertyType::String),
            properties: IndexMap::new(),
        }
    }

    pub fn with_plural(mut self, plural: impl Into<String>) -> Self {
        self.plural = plural.into();
        self
    }

    /// Add a property definition
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.insert(property.name.clone(), property);
        self
    }

    /// Shorthand for a single-valued property of the given type
    pub fn property(self, name: &str, property_type: PropertyType) -> Self {
        self.with_property(PropertyDef::new(name, property_type))
    }

    /// Shorthand for a single relation to `target`
    pub fn relation(self, name: &str, target: &str) -> Self {
        self.property(name, PropertyType::parse(target))
    }

    /// Shorthand for a multi relation to `target`
    pub fn relations(self, name: &str, target: &str) -> Self {
        self.with_property(PropertyDef::new(name, PropertyType::parse(target)).multi())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plural(&self) -> &str {
        &self.plural
    }

    /// Look up a declared property, or the implicit `id`
    pub fn get(&self, name: &str) -> Option<&PropertyDef> {
        if name == ID_PROPERTY {
            Some(&self.id)
        } else {
            self.properties.get(name)
        }
    }

    /// Declared properties in declaration order (without `id`)
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.values()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties().filter(|p| !p.is_relation())
    }

    pub fn relations_iter(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties().filter(|p| p.is_relation())
    }
}

/// One relation traversal in a resolved path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    /// Model owning the relation
    pub model: String,
    /// Relation property name
    pub relation: String,
    /// Model the relation points to
    pub target: String,
}

/// Result of resolving a dotted property path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Path as written by the client
    pub path: String,
    /// Relations crossed before reaching the terminal property
    pub hops: Vec<Hop>,
    /// Model that owns the terminal property
    pub model: String,
    pub property: PropertyDef,
}

impl ResolvedPath {
    /// True if any hop or the terminal property is multi-valued
    pub fn is_multi_valued(&self, registry: &SchemaRegistry) -> bool {
        self.property.is_multi()
            || self.hops.iter().any(|hop| {
                registry
                    .schema(&hop.model)
                    .ok()
                    .and_then(|s| s.get(&hop.relation))
                    .is_some_and(PropertyDef::is_multi)
            })
    }
}

/// Errors raised while building or querying the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unknown model \"{model}\"")]
    UnknownModel { model: String },

    #[error("unknown property \"{property}\" on model \"{model}\"")]
    UnknownProperty { model: String, property: String },

    #[error("relation \"{property}\" on model \"{model}\" targets unknown model \"{target}\"")]
    UnknownTarget {
        model: String,
        property: String,
        target: String,
    },

    #[error("property name \"{property}\" is reserved (model \"{model}\")")]
    ReservedProperty { model: String, property: String },

    #[error("model \"{model}\" is declared twice")]
    DuplicateModel { model: String },

    #[error("plural \"{plural}\" is used by both \"{first}\" and \"{second}\"")]
    DuplicatePlural {
        plural: String,
        first: String,
        second: String,
    },
}

/// Immutable set of model schemas, in registration order
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: IndexMap<String, Schema>,
    plurals: HashMap<String, String>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    pub fn schema(&self, model: &str) -> Result<&Schema, SchemaError> {
        self.schemas
            .get(model)
            .ok_or_else(|| SchemaError::UnknownModel {
                model: model.to_string(),
            })
    }

    /// Find the model exposed under a plural resource name
    pub fn by_plural(&self, plural: &str) -> Option<&Schema> {
        self.plurals
            .get(plural)
            .and_then(|model| self.schemas.get(model))
    }

    pub fn models(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    /// Resolve a dotted property path starting at `model`
    ///
    /// The first segment must be a property of `model`; when it is a relation
    /// the remaining segments resolve against the target schema. A path that
    /// ends on a relation resolves to the relation itself.
    pub fn resolve(&self, model: &str, path: &str) -> Result<ResolvedPath, SchemaError> {
        let unknown = || SchemaError::UnknownProperty {
            model: model.to_string(),
            property: path.to_string(),
        };

        let mut schema = self.schema(model)?;
        let mut hops = Vec::new();
        let mut segments = path.split('.').peekable();

        while let Some(segment) = segments.next() {
            let property = schema.get(segment).ok_or_else(unknown)?;

            if segments.peek().is_none() {
                return Ok(ResolvedPath {
                    path: path.to_string(),
                    hops,
                    model: schema.name().to_string(),
                    property: property.clone(),
                });
            }

            let target = property.property_type.target().ok_or_else(unknown)?;
            hops.push(Hop {
                model: schema.name().to_string(),
                relation: segment.to_string(),
                target: target.to_string(),
            });
            schema = self.schema(target)?;
        }

        Err(unknown())
    }

    pub fn list_properties(&self, model: &str) -> Result<Vec<&PropertyDef>, SchemaError> {
        Ok(self.schema(model)?.properties().collect())
    }

    pub fn list_relations(&self, model: &str) -> Result<Vec<&PropertyDef>, SchemaError> {
        Ok(self.schema(model)?.relations_iter().collect())
    }
}

/// Collects schemas and checks them as a whole before freezing the registry
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    schemas: Vec<Schema>,
}

impl SchemaRegistryBuilder {
    pub fn register(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut registry = SchemaRegistry::default();

        for schema in self.schemas {
            if let Some(reserved) = RESERVED_PROPERTIES
                .iter()
                .find(|name| schema.properties.contains_key(**name))
            {
                return Err(SchemaError::ReservedProperty {
                    model: schema.name.clone(),
                    property: reserved.to_string(),
                });
            }

            if let Some(first) = registry.plurals.get(&schema.plural) {
                return Err(SchemaError::DuplicatePlural {
                    plural: schema.plural.clone(),
                    first: first.clone(),
                    second: schema.name.clone(),
                });
            }

            if registry.schemas.contains_key(&schema.name) {
                return Err(SchemaError::DuplicateModel {
                    model: schema.name.clone(),
                });
            }

            registry
                .plurals
                .insert(schema.plural.clone(), schema.name.clone());
            registry.schemas.insert(schema.name.clone(), schema);
        }

        for schema in registry.schemas.values() {
            for relation in schema.relations_iter() {
                let target = relation.property_type.target().unwrap_or_default();
                if !registry.schemas.contains_key(target) {
                    return Err(SchemaError::UnknownTarget {
                        model: schema.name.clone(),
                        property: relation.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        tracing::debug!(models = registry.schemas.len(), "schema registry built");
        Ok(registry)
    }
}
