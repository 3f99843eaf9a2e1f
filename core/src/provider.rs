use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::diag::{self, Diagnostic};
use crate::error::{ProviderError, SchemaError};
use crate::resource::{Meta, Resource, ResourceData};
use crate::schema::{self, Schema, SchemaMap, ValueType};
use crate::Result;

/// Names the host reserves in provider configuration blocks.
pub const RESERVED_PROVIDER_FIELDS: &[&str] = &["alias", "version"];

pub type ConfigureFn = dyn Fn(&Map<String, Value>) -> Result<Meta> + Send + Sync;

/// The top-level object a plugin hands to the host: configuration schema,
/// resource types and the configure hook.
#[derive(Clone, Default)]
pub struct Provider {
    pub schema: SchemaMap,
    pub resources_map: BTreeMap<String, Resource>,
    pub configure_func: Option<Arc<ConfigureFn>>,
    meta: Option<Meta>,
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("schema", &self.schema)
            .field("resources_map", &self.resources_map)
            .field("configure_func", &self.configure_func.is_some())
            .field("configured", &self.meta.is_some())
            .finish()
    }
}

impl Provider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, name: impl Into<String>, s: Schema) -> Self {
        self.schema.insert(name.into(), s);
        self
    }

    pub fn with_resource(mut self, name: impl Into<String>, r: Resource) -> Self {
        self.resources_map.insert(name.into(), r);
        self
    }

    pub fn with_configure<F>(mut self, f: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Meta> + Send + Sync + 'static,
    {
        self.configure_func = Some(Arc::new(f));
        self
    }

    pub fn resources(&self) -> Vec<&str> {
        self.resources_map.keys().map(String::as_str).collect()
    }

    pub fn resource(&self, type_name: &str) -> Option<&Resource> {
        self.resources_map.get(type_name)
    }

    pub fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    pub fn internal_validate(&self) -> Result<(), SchemaError> {
        tracing::debug!(
            attributes = self.schema.len(),
            resources = self.resources_map.len(),
            "provider internal validate"
        );
        for (name, s) in &self.schema {
            if RESERVED_PROVIDER_FIELDS.contains(&name.as_str()) {
                return Err(SchemaError::Provider(format!(
                    "{} is a reserved field name",
                    name
                )));
            }
            if s.computed {
                return Err(SchemaError::Provider(format!(
                    "{} cannot be computed in provider configuration",
                    name
                )));
            }
            if s.force_new {
                return Err(SchemaError::Provider(format!(
                    "{} cannot be force_new in provider configuration",
                    name
                )));
            }
        }
        schema::validate_map(&self.schema)?;

        for (name, r) in &self.resources_map {
            r.internal_validate(name, true)?;
        }
        Ok(())
    }

    pub fn validate_config(&self, config: &Value) -> Vec<Diagnostic> {
        schema::validate_config(&self.schema, config)
    }

    pub fn validate_resource(&self, type_name: &str, config: &Value) -> Vec<Diagnostic> {
        match self.resource(type_name) {
            Some(r) => schema::validate_config(&r.schema, config),
            None => vec![Diagnostic::error("Invalid resource type").with_detail(format!(
                "The provider does not support resource type {:?}.",
                type_name
            ))],
        }
    }

    /// Validates `config`, fills defaults and runs the configure hook.
    /// Without a hook the provider stays unconfigured and this still succeeds.
    pub fn configure(&mut self, config: &Value) -> Result<()> {
        let diags = self.validate_config(config);
        if diag::has_errors(&diags) {
            let msg = diags
                .iter()
                .filter(|d| d.is_error())
                .map(|d| match &d.attribute {
                    Some(attr) => format!("{}: {}", attr, d.summary),
                    None => d.summary.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ProviderError::InvalidConfig(msg));
        }

        let mut attrs = match config {
            Value::Object(m) => m.clone(),
            _ => Map::new(),
        };
        schema::apply_defaults(&self.schema, &mut attrs);

        if let Some(f) = &self.configure_func {
            let meta = f(&attrs)?;
            self.meta = Some(meta);
        }
        tracing::debug!(configured = self.meta.is_some(), "provider configure");
        Ok(())
    }

    /// Meta handed to resource callbacks. A provider without a configure hook
    /// gets the empty meta; one with a hook must be configured first.
    pub fn callback_meta(&self) -> Result<Meta> {
        match (&self.meta, &self.configure_func) {
            (Some(meta), _) => Ok(meta.clone()),
            (None, Some(_)) => Err(ProviderError::NotConfigured),
            (None, None) => Ok(Meta::empty()),
        }
    }

    fn resource_or_err(&self, type_name: &str) -> Result<&Resource> {
        self.resource(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    pub fn create_resource(&self, type_name: &str, data: &mut ResourceData) -> Result<()> {
        let r = self.resource_or_err(type_name)?;
        r.apply_create(data, &self.callback_meta()?)
    }

    /// `None` when the remote object is gone.
    pub fn read_resource(
        &self,
        type_name: &str,
        data: ResourceData,
    ) -> Result<Option<ResourceData>> {
        let r = self.resource_or_err(type_name)?;
        r.refresh(data, &self.callback_meta()?)
    }

    pub fn update_resource(&self, type_name: &str, data: &mut ResourceData) -> Result<()> {
        let r = self.resource_or_err(type_name)?;
        r.apply_update(data, &self.callback_meta()?)
    }

    pub fn delete_resource(&self, type_name: &str, data: &mut ResourceData) -> Result<()> {
        let r = self.resource_or_err(type_name)?;
        r.apply_delete(data, &self.callback_meta()?)
    }

    pub fn schema_document(&self) -> ProviderSchemaDoc {
        ProviderSchemaDoc {
            provider: SchemaDoc {
                version: 0,
                block: BlockDoc::from_map(&self.schema),
            },
            resource_schemas: self
                .resources_map
                .iter()
                .map(|(name, r)| {
                    (
                        name.clone(),
                        SchemaDoc {
                            version: r.schema_version,
                            block: BlockDoc::from_map(&r.schema),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// JSON shape of `terraform providers schema -json` for one provider.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProviderSchemaDoc {
    pub provider: SchemaDoc,
    pub resource_schemas: BTreeMap<String, SchemaDoc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SchemaDoc {
    pub version: u64,
    pub block: BlockDoc,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockDoc {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeDoc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AttributeDoc {
    #[serde(rename = "type")]
    pub type_: Value,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub computed: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub sensitive: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl BlockDoc {
    fn from_map(schema: &SchemaMap) -> Self {
        BlockDoc {
            attributes: schema
                .iter()
                .map(|(name, s)| {
                    (
                        name.clone(),
                        AttributeDoc {
                            type_: type_expr(s),
                            description: s.description.clone(),
                            required: s.required,
                            optional: s.optional,
                            computed: s.computed,
                            sensitive: s.sensitive,
                        },
                    )
                })
                .collect(),
        }
    }
}

// host type expression: "string", ["list", "number"], ...
fn type_expr(s: &Schema) -> Value {
    let elem = || {
        s.elem
            .as_deref()
            .map(type_expr)
            .unwrap_or_else(|| Value::from("string"))
    };
    match s.value_type {
        ValueType::Bool => Value::from("bool"),
        ValueType::Int | ValueType::Float => Value::from("number"),
        ValueType::String => Value::from("string"),
        ValueType::List => Value::Array(vec![Value::from("list"), elem()]),
        ValueType::Set => Value::Array(vec![Value::from("set"), elem()]),
        ValueType::Map => Value::Array(vec![Value::from("map"), elem()]),
    }
}
