//! Record schema: which fields are dimensions and how they match.
//!
//! ```yaml
//! entity: build
//! identity: id
//! orderBy: id
//! settings:
//!   defaultCount: 100
//! fields:
//!   - name: id
//!     kind: long
//!   - name: branch
//!     kind: string
//!     matchType: equals
//!   - name: status
//!     kind: enum
//!     values: [SUCCESS, FAILURE]
//!   - name: personal
//!     kind: boolean
//!     default: "false"
//!     defaultFilter: true
//!   - name: finishDate
//!     kind: time
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use sift_locator::{
    ConditionDefaults, DimensionKind, DimensionSpec, EngineSettings, MatchType, ORDERED,
    RESERVED, STROB, STRUCTURAL,
};

use crate::error::{read_file, ConfigError};

/// How a field is stored and matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Integer compared for equality.
    Long,
    /// Text matched with a value condition, `contains` by default.
    String,
    /// `/`-separated path matched exactly by default and ordered naturally.
    Path,
    Boolean,
    Enum,
    /// Timestamp: RFC 3339 text, the compact locator format, or epoch millis.
    Time,
}

/// One record field exposed as a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    /// Legal symbols of an enum field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Apply `default` only while default filtering is active.
    #[serde(default)]
    pub default_filter: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Field {
    /// Value-condition defaults for text fields.
    pub fn condition_defaults(&self) -> Result<ConditionDefaults, ConfigError> {
        let fallback = match self.kind {
            FieldKind::Path => MatchType::Equals,
            _ => MatchType::Contains,
        };
        let match_type = match &self.match_type {
            Some(text) => text
                .parse()
                .map_err(|e| ConfigError::schema(format!("field '{}': {e}", self.name)))?,
            None => fallback,
        };
        Ok(ConditionDefaults::new(match_type))
    }

    /// The dimension declaration for this field. Time fields accept the
    /// given anchor dimensions.
    pub fn spec(&self, anchors: &[&str]) -> Result<DimensionSpec, ConfigError> {
        let kind = match self.kind {
            FieldKind::Long => DimensionKind::Long,
            FieldKind::String | FieldKind::Path => {
                DimensionKind::ValueCondition(self.condition_defaults()?)
            }
            FieldKind::Boolean => DimensionKind::Boolean,
            FieldKind::Enum => DimensionKind::enum_set(self.values.iter().cloned()),
            FieldKind::Time => {
                DimensionKind::TimeCondition(anchors.iter().map(|a| a.to_string()).collect())
            }
        };
        let mut spec = DimensionSpec::new(self.name.clone(), kind);
        if let Some(value) = &self.default {
            spec = spec.default_value(value.clone());
        }
        if self.default_filter {
            spec = spec.in_default_filter();
        }
        if self.hidden {
            spec = spec.hidden();
        }
        if let Some(text) = &self.description {
            spec = spec.description(text.clone());
        }
        Ok(spec)
    }
}

/// A record entity: its fields, identity and settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Entity name, also the anchor dimension of time conditions.
    pub entity: String,
    /// Field identifying a record.
    pub identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default)]
    pub settings: EngineSettings,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let schema: Schema = serde_yaml::from_str(text)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Schema::from_yaml(&read_file(path)?)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn identity_field(&self) -> Result<&Field, ConfigError> {
        self.field(&self.identity).ok_or_else(|| {
            ConfigError::schema(format!("identity field '{}' is not declared", self.identity))
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let taken: Vec<&str> = RESERVED
            .iter()
            .chain(STRUCTURAL.iter())
            .copied()
            .chain([ORDERED, STROB])
            .collect();

        for (i, field) in self.fields.iter().enumerate() {
            if taken.contains(&field.name.as_str()) || field.name == self.entity {
                return Err(ConfigError::schema(format!(
                    "field '{}' uses a reserved dimension name",
                    field.name
                )));
            }
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(ConfigError::schema(format!(
                    "field '{}' is declared more than once",
                    field.name
                )));
            }
            if field.kind == FieldKind::Enum && field.values.is_empty() {
                return Err(ConfigError::schema(format!(
                    "enum field '{}' has no values",
                    field.name
                )));
            }
            field.condition_defaults()?;
        }

        self.identity_field()?;
        if let Some(name) = &self.order_by {
            if self.field(name).is_none() {
                return Err(ConfigError::schema(format!(
                    "orderBy field '{name}' is not declared"
                )));
            }
        }
        Ok(())
    }
}
