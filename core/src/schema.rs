use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

use crate::diag::Diagnostic;
use crate::error::SchemaError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    List,
    Set,
    Map,
}

impl ValueType {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            ValueType::Bool | ValueType::Int | ValueType::Float | ValueType::String
        )
    }
}

/// Attributes keyed by name; iteration order is the name order.
pub type SchemaMap = BTreeMap<String, Schema>;

/// Definition of a single attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Schema {
    pub value_type: ValueType,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub force_new: bool,
    pub sensitive: bool,
    pub default: Option<Value>,
    pub description: String,
    /// Element type of a list, set or map.
    pub elem: Option<Box<Schema>>,
}

impl Schema {
    pub fn new(value_type: ValueType) -> Self {
        Schema {
            value_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            description: String::new(),
            elem: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, v: impl Into<Value>) -> Self {
        self.default = Some(v.into());
        self
    }

    pub fn with_description(mut self, s: impl Into<String>) -> Self {
        self.description = s.into();
        self
    }

    pub fn with_elem(mut self, elem: Schema) -> Self {
        self.elem = Some(Box::new(elem));
        self
    }

    /// Settable from configuration.
    pub fn is_configurable(&self) -> bool {
        self.required || self.optional
    }

    pub fn internal_validate(&self, name: &str) -> Result<(), SchemaError> {
        validate_name(name)?;

        if !self.required && !self.optional && !self.computed {
            return Err(SchemaError::attr(
                name,
                "one of required, optional or computed must be set",
            ));
        }
        if self.required && self.optional {
            return Err(SchemaError::attr(
                name,
                "required and optional are mutually exclusive",
            ));
        }
        if self.required && self.computed {
            return Err(SchemaError::attr(name, "required attributes cannot be computed"));
        }
        if self.required && self.default.is_some() {
            return Err(SchemaError::attr(name, "default cannot be set with required"));
        }
        if self.computed && !self.optional && self.default.is_some() {
            return Err(SchemaError::attr(
                name,
                "default cannot be set on a computed-only attribute",
            ));
        }

        self.validate_shape(name)?;

        if let Some(default) = &self.default {
            if !self.value_type.is_primitive() {
                return Err(SchemaError::attr(
                    name,
                    format!("default is not valid for {} attributes", self.value_type),
                ));
            }
            if !check_value(self, default) {
                return Err(SchemaError::attr(
                    name,
                    format!("default value {} is not a {}", default, self.value_type),
                ));
            }
        }
        Ok(())
    }

    // elem rules, applied recursively through nested collections
    fn validate_shape(&self, name: &str) -> Result<(), SchemaError> {
        match (self.value_type, &self.elem) {
            (ValueType::List | ValueType::Set, None) => Err(SchemaError::attr(
                name,
                format!("elem must be set for {} attributes", self.value_type),
            )),
            (t, Some(_)) if t.is_primitive() => Err(SchemaError::attr(
                name,
                format!("elem is not valid for {} attributes", t),
            )),
            (_, Some(elem)) => elem.validate_shape(name),
            (_, None) => Ok(()),
        }
    }
}

pub(crate) fn validate_name(name: &str) -> Result<(), SchemaError> {
    let valid = match name.chars().next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(SchemaError::InvalidName(name.to_string()))
    }
}

pub fn validate_map(schema: &SchemaMap) -> Result<(), SchemaError> {
    schema
        .iter()
        .try_for_each(|(name, s)| s.internal_validate(name))
}

/// Whether `value` conforms to the type of `schema`. Null conforms to everything.
pub fn check_value(schema: &Schema, value: &Value) -> bool {
    match (schema.value_type, value) {
        (_, Value::Null) => true,
        (ValueType::Bool, Value::Bool(_)) => true,
        (ValueType::Int, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (ValueType::Float, Value::Number(_)) => true,
        (ValueType::String, Value::String(_)) => true,
        (ValueType::List | ValueType::Set, Value::Array(items)) => match &schema.elem {
            Some(elem) => items.iter().all(|i| check_value(elem, i)),
            None => true,
        },
        (ValueType::Map, Value::Object(m)) => match &schema.elem {
            Some(elem) => m.values().all(|v| check_value(elem, v)),
            None => true,
        },
        _ => false,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Checks a configuration object against `schema`. Null is treated as an empty object.
pub fn validate_config(schema: &SchemaMap, config: &Value) -> Vec<Diagnostic> {
    let empty = Map::new();
    let obj = match config {
        Value::Null => &empty,
        Value::Object(m) => m,
        other => {
            return vec![Diagnostic::error("Invalid configuration")
                .with_detail(format!("expected an object, got {}", json_kind(other)))]
        }
    };

    let mut diags = Vec::new();
    for (key, value) in obj {
        match schema.get(key) {
            None => diags.push(
                Diagnostic::error("Unsupported argument")
                    .with_detail(format!("An argument named {:?} is not expected here.", key))
                    .with_attribute(key.as_str()),
            ),
            Some(s) if !s.is_configurable() => {
                if !value.is_null() {
                    diags.push(
                        Diagnostic::error("Value for unconfigurable attribute")
                            .with_detail(format!("{:?} is computed and cannot be set.", key))
                            .with_attribute(key.as_str()),
                    );
                }
            }
            Some(s) if !check_value(s, value) => diags.push(
                Diagnostic::error("Incorrect attribute value type")
                    .with_detail(format!(
                        "expected {}, got {}",
                        s.value_type,
                        json_kind(value)
                    ))
                    .with_attribute(key.as_str()),
            ),
            Some(_) => {}
        }
    }

    for (key, s) in schema {
        if s.required && obj.get(key).map_or(true, Value::is_null) {
            diags.push(
                Diagnostic::error("Missing required argument")
                    .with_detail(format!("The argument {:?} is required.", key))
                    .with_attribute(key.as_str()),
            );
        }
    }
    tracing::debug!(
        attributes = obj.len(),
        diagnostics = diags.len(),
        "validate config"
    );
    diags
}

/// Fills absent or null attributes that declare a default.
pub fn apply_defaults(schema: &SchemaMap, attrs: &mut Map<String, Value>) {
    for (key, s) in schema {
        if let Some(default) = &s.default {
            if attrs.get(key).map_or(true, Value::is_null) {
                attrs.insert(key.clone(), default.clone());
            }
        }
    }
}
