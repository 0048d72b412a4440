//! Configuration loading and management
//!
//! ```yaml
//! host: 127.0.0.1
//! port: 3000
//! api_root_prefix: /api/1
//! log: info
//! models:
//!   Generic:
//!     properties:
//!       text: string
//!       array: { type: string, multi: true }
//!       relation: GenericRelation
//!   GenericRelation:
//!     plural: generic-relations
//!     properties:
//!       text: string
//! ```

use crate::core::schema::{PropertyDef, PropertyType, Schema, SchemaRegistry};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log() -> String {
    "info".to_string()
}

/// Complete configuration of an eureka server
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EurekaConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    #[validate(length(min = 1, message = "host must not be empty"))]
    pub host: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1, message = "port must be at least 1"))]
    pub port: u16,

    /// Prefix of every resource route, empty to mount them at the root
    #[serde(default)]
    #[validate(custom(function = "validate_prefix"))]
    pub api_root_prefix: String,

    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log")]
    pub log: String,

    /// Model name -> model declaration
    #[serde(default)]
    pub models: IndexMap<String, ModelConfig>,
}

/// Declaration of one model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Collection name; defaults to the pluralized kebab-case model name
    #[serde(default)]
    pub plural: Option<String>,

    #[serde(default)]
    pub properties: IndexMap<String, PropertyConfig>,
}

/// A property, either as a bare type name or spelled out
///
/// The type is a scalar type name (`string`, `integer`, `float`, `boolean`,
/// `date`, `datetime`) or the name of the related model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyConfig {
    Type(String),
    Detailed {
        #[serde(rename = "type")]
        property_type: String,
        #[serde(default)]
        multi: bool,
        #[serde(default)]
        unique: bool,
    },
}

impl PropertyConfig {
    pub fn to_definition(&self, name: &str) -> PropertyDef {
        match self {
            PropertyConfig::Type(property_type) => {
                PropertyDef::new(name, PropertyType::parse(property_type))
            }
            PropertyConfig::Detailed {
                property_type,
                multi,
                unique,
            } => {
                let mut definition = PropertyDef::new(name, PropertyType::parse(property_type));
                if *multi {
                    definition = definition.multi();
                }
                if *unique {
                    definition = definition.unique();
                }
                definition
            }
        }
    }
}

fn validate_prefix(prefix: &str) -> Result<(), validator::ValidationError> {
    if prefix.is_empty() || prefix.starts_with('/') {
        Ok(())
    } else {
        Err(validator::ValidationError::new("prefix")
            .with_message("api_root_prefix must start with '/'".into()))
    }
}

impl Default for EurekaConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_root_prefix: String::new(),
            log: default_log(),
            models: IndexMap::new(),
        }
    }
}

impl EurekaConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// `host:port`
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Turn the model declarations into a checked registry
    pub fn schema_registry(&self) -> Result<SchemaRegistry> {
        let mut builder = SchemaRegistry::builder();

        for (name, model) in &self.models {
            let mut schema = Schema::new(name.as_str());
            if let Some(plural) = &model.plural {
                schema = schema.with_plural(plural.as_str());
            }
            for (property, config) in &model.properties {
                schema = schema.with_property(config.to_definition(property));
            }
            builder = builder.register(schema);
        }

        Ok(builder.build()?)
    }
}
