use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{ProviderError, SchemaError};
use crate::schema::{self, Schema, SchemaMap};
use crate::Result;

/// Names the host reserves for meta-arguments in resource blocks.
pub const RESERVED_RESOURCE_FIELDS: &[&str] = &[
    "connection",
    "count",
    "depends_on",
    "for_each",
    "id",
    "lifecycle",
    "provider",
    "provisioner",
];

/// The value a provider's configure hook produced, handed to every callback.
#[derive(Clone)]
pub struct Meta(Arc<dyn Any + Send + Sync>);

impl Meta {
    pub fn new<T: Any + Send + Sync>(v: T) -> Self {
        Meta(Arc::new(v))
    }

    pub fn empty() -> Self {
        Meta::new(())
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Meta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Meta(..)")
    }
}

/// State of one resource instance as seen by the callbacks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    id: Option<String>,
    attrs: Map<String, Value>,
}

impl ResourceData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attrs(attrs: Map<String, Value>) -> Self {
        ResourceData { id: None, attrs }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// An empty id clears it, marking the instance as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.id = if id.is_empty() { None } else { Some(id) };
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, v: impl Into<Value>) {
        self.attrs.insert(key.into(), v.into());
    }

    pub fn attrs(&self) -> &Map<String, Value> {
        &self.attrs
    }
}

pub type CrudFn = dyn Fn(&mut ResourceData, &Meta) -> Result<()> + Send + Sync;
pub type ExistsFn = dyn Fn(&ResourceData, &Meta) -> Result<bool> + Send + Sync;

/// Definition of a managed resource type: its schema and lifecycle callbacks.
#[derive(Clone, Default)]
pub struct Resource {
    pub schema: SchemaMap,
    pub schema_version: u64,
    pub description: String,
    pub create: Option<Arc<CrudFn>>,
    pub read: Option<Arc<CrudFn>>,
    pub update: Option<Arc<CrudFn>>,
    pub delete: Option<Arc<CrudFn>>,
    pub exists: Option<Arc<ExistsFn>>,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("schema", &self.schema)
            .field("schema_version", &self.schema_version)
            .field("create", &self.create.is_some())
            .field("read", &self.read.is_some())
            .field("update", &self.update.is_some())
            .field("delete", &self.delete.is_some())
            .field("exists", &self.exists.is_some())
            .finish()
    }
}

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, s: Schema) -> Self {
        self.schema.insert(name.into(), s);
        self
    }

    pub fn with_schema_version(mut self, v: u64) -> Self {
        self.schema_version = v;
        self
    }

    pub fn with_description(mut self, s: impl Into<String>) -> Self {
        self.description = s.into();
        self
    }

    pub fn with_create<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ResourceData, &Meta) -> Result<()> + Send + Sync + 'static,
    {
        self.create = Some(Arc::new(f));
        self
    }

    pub fn with_read<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ResourceData, &Meta) -> Result<()> + Send + Sync + 'static,
    {
        self.read = Some(Arc::new(f));
        self
    }

    pub fn with_update<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ResourceData, &Meta) -> Result<()> + Send + Sync + 'static,
    {
        self.update = Some(Arc::new(f));
        self
    }

    pub fn with_delete<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut ResourceData, &Meta) -> Result<()> + Send + Sync + 'static,
    {
        self.delete = Some(Arc::new(f));
        self
    }

    pub fn with_exists<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResourceData, &Meta) -> Result<bool> + Send + Sync + 'static,
    {
        self.exists = Some(Arc::new(f));
        self
    }

    /// Structural checks run by the host before any callback is used.
    /// `writable` is false for read-only resources, which need no CRUD callbacks.
    pub fn internal_validate(&self, name: &str, writable: bool) -> Result<(), SchemaError> {
        schema::validate_name(name)?;

        for (attr, s) in &self.schema {
            if RESERVED_RESOURCE_FIELDS.contains(&attr.as_str()) {
                return Err(SchemaError::resource(
                    name,
                    format!("{} is a reserved field name", attr),
                ));
            }
            s.internal_validate(attr)
                .map_err(|e| SchemaError::resource(name, e.to_string()))?;
        }

        if !writable {
            return Ok(());
        }

        if self.create.is_none() {
            return Err(SchemaError::resource(name, "create must be implemented"));
        }
        if self.read.is_none() {
            return Err(SchemaError::resource(name, "read must be implemented"));
        }
        if self.delete.is_none() {
            return Err(SchemaError::resource(name, "delete must be implemented"));
        }

        // computed attributes never require update, optional+computed ones still allow it
        let needs_update = self
            .schema
            .values()
            .any(|s| !s.computed && !s.force_new);
        let can_update = self
            .schema
            .values()
            .any(|s| s.is_configurable() && !s.force_new);
        match (self.update.is_some(), needs_update, can_update) {
            (false, true, _) => Err(SchemaError::resource(
                name,
                "update must be implemented: some attributes can change in place",
            )),
            (true, _, false) => Err(SchemaError::resource(
                name,
                "update is superfluous: every attribute is force_new or computed",
            )),
            _ => Ok(()),
        }
    }

    pub fn apply_create(&self, data: &mut ResourceData, meta: &Meta) -> Result<()> {
        let f = self.create.as_ref().ok_or(ProviderError::NotImplemented("create"))?;
        schema::apply_defaults(&self.schema, &mut data.attrs);
        f(data, meta)?;
        if data.is_new() {
            return Err(ProviderError::InvalidState(
                "create finished without setting an id".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns `None` when the remote object no longer exists.
    pub fn refresh(&self, mut data: ResourceData, meta: &Meta) -> Result<Option<ResourceData>> {
        let f = self.read.as_ref().ok_or(ProviderError::NotImplemented("read"))?;
        if let Some(exists) = &self.exists {
            if !exists(&data, meta)? {
                return Ok(None);
            }
        }
        f(&mut data, meta)?;
        Ok(if data.is_new() { None } else { Some(data) })
    }

    pub fn apply_update(&self, data: &mut ResourceData, meta: &Meta) -> Result<()> {
        let f = self.update.as_ref().ok_or(ProviderError::NotImplemented("update"))?;
        f(data, meta)
    }

    pub fn apply_delete(&self, data: &mut ResourceData, meta: &Meta) -> Result<()> {
        let f = self.delete.as_ref().ok_or(ProviderError::NotImplemented("delete"))?;
        f(data, meta)?;
        data.id = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ValueType;
    use serde_json::json;

    fn noop(_: &mut ResourceData, _: &Meta) -> Result<()> {
        Ok(())
    }

    fn file_resource() -> Resource {
        Resource::new()
            .with_attribute("path", Schema::new(ValueType::String).required().force_new())
            .with_attribute("mode", Schema::new(ValueType::String).optional().with_default("0644"))
            .with_attribute("size", Schema::new(ValueType::Int).computed())
            .with_create(|d, _| {
                let path = d.get("path").and_then(Value::as_str).unwrap_or_default().to_string();
                d.set_id(path);
                d.set("size", 0);
                Ok(())
            })
            .with_read(noop)
            .with_update(noop)
            .with_delete(noop)
    }

    #[test]
    fn test_resource_data_id() {
        let mut d = ResourceData::new();
        assert!(d.is_new());
        d.set_id("abc");
        assert_eq!(d.id(), Some("abc"));
        d.set_id("");
        assert!(d.is_new());
    }

    #[test]
    fn test_meta_downcast() {
        let m = Meta::new(String::from("token"));
        assert_eq!(m.downcast_ref::<String>().map(String::as_str), Some("token"));
        assert!(m.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn test_internal_validate_ok() {
        assert!(file_resource().internal_validate("custom_file", true).is_ok());
    }

    #[test]
    fn test_internal_validate_reserved() {
        let r = file_resource().with_attribute("count", Schema::new(ValueType::Int).optional());
        assert_eq!(
            r.internal_validate("custom_file", true).unwrap_err(),
            SchemaError::Resource {
                resource: "custom_file".into(),
                reason: "count is a reserved field name".into()
            }
        );
    }

    #[test]
    fn test_internal_validate_callbacks() {
        let mut r = file_resource();
        r.delete = None;
        assert!(r.internal_validate("custom_file", true).is_err());
        // read-only resources skip callback checks
        assert!(r.internal_validate("custom_file", false).is_ok());

        let mut r = file_resource();
        r.update = None;
        assert!(r.internal_validate("custom_file", true).is_err());

        let immutable = Resource::new()
            .with_attribute("path", Schema::new(ValueType::String).required().force_new())
            .with_create(noop)
            .with_read(noop)
            .with_delete(noop);
        assert!(immutable.internal_validate("custom_file", true).is_ok());
        assert!(immutable
            .with_update(noop)
            .internal_validate("custom_file", true)
            .is_err());
    }

    #[test]
    fn test_internal_validate_optional_computed() {
        let r = Resource::new()
            .with_attribute("name", Schema::new(ValueType::String).required().force_new())
            .with_attribute("arn", Schema::new(ValueType::String).optional().computed())
            .with_create(noop)
            .with_read(noop)
            .with_delete(noop);
        assert!(r.internal_validate("custom_x", true).is_ok());
        // update is allowed too: arn can be changed in place
        assert!(r.with_update(noop).internal_validate("custom_x", true).is_ok());
    }

    #[test]
    fn test_internal_validate_attribute_error() {
        let r = file_resource().with_attribute("Bad", Schema::new(ValueType::Int).optional());
        match r.internal_validate("custom_file", true) {
            Err(SchemaError::Resource { resource, .. }) => assert_eq!(resource, "custom_file"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_lifecycle() {
        let r = file_resource();
        let meta = Meta::empty();
        let mut d = ResourceData::from_attrs(
            json!({"path": "/tmp/a"}).as_object().cloned().unwrap(),
        );
        r.apply_create(&mut d, &meta).unwrap();
        assert_eq!(d.id(), Some("/tmp/a"));
        assert_eq!(d.get("mode"), Some(&json!("0644")));
        assert_eq!(d.get("size"), Some(&json!(0)));

        let d = r.refresh(d, &meta).unwrap().unwrap();
        let mut d = d;
        r.apply_delete(&mut d, &meta).unwrap();
        assert!(d.is_new());
    }

    #[test]
    fn test_create_without_id() {
        let r = Resource::new().with_create(noop);
        let err = r.apply_create(&mut ResourceData::new(), &Meta::empty()).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidState(_)));
    }

    #[test]
    fn test_refresh_gone() {
        let r = Resource::new()
            .with_read(|d, _| {
                d.set_id("");
                Ok(())
            });
        let mut d = ResourceData::new();
        d.set_id("x");
        assert!(r.refresh(d.clone(), &Meta::empty()).unwrap().is_none());

        let r = Resource::new().with_read(noop).with_exists(|_, _| Ok(false));
        assert!(r.refresh(d, &Meta::empty()).unwrap().is_none());
    }

    #[test]
    fn test_missing_callback() {
        let r = Resource::new();
        let err = r.apply_update(&mut ResourceData::new(), &Meta::empty()).unwrap_err();
        assert!(matches!(err, ProviderError::NotImplemented("update")));
    }
}
