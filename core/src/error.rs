use thiserror::Error;

pub type Result<T, E = ProviderError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Not configured")]
    NotConfigured,
    #[error("Not Implemented: {0}")]
    NotImplemented(&'static str),
}

/// Structural problems in a provider, resource or attribute definition.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("{0:?}: names must be lowercase alphanumeric or '_', not starting with a digit")]
    InvalidName(String),
    #[error("{attr}: {reason}")]
    Attribute { attr: String, reason: String },
    #[error("resource {resource}: {reason}")]
    Resource { resource: String, reason: String },
    #[error("provider: {0}")]
    Provider(String),
}

impl SchemaError {
    pub(crate) fn attr(attr: &str, reason: impl Into<String>) -> Self {
        SchemaError::Attribute {
            attr: attr.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn resource(resource: &str, reason: impl Into<String>) -> Self {
        SchemaError::Resource {
            resource: resource.to_string(),
            reason: reason.into(),
        }
    }
}
