//! Error types for the factory engine

use thiserror::Error;

/// Errors that can occur while defining or building fixtures
#[derive(Debug, Error)]
pub enum FactoryError {
    /// `use` was called with a trait name that was never registered
    #[error("Trait (\"{trait_name}\") is not defined for factory {type_name}")]
    TraitNotFound {
        trait_name: String,
        type_name: String,
    },

    /// A field's deferred computation failed
    #[error("Failed to resolve field `{field}`: {source}")]
    FieldResolution {
        field: String,
        #[source]
        source: Box<FactoryError>,
    },

    /// Error raised from inside a user-supplied resolver
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// No factory with this name is registered in the catalog
    #[error("Factory not found: {0}")]
    UnknownFactory(String),

    /// A resolved object could not be converted into the requested type
    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// Template rendering failed
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    /// Any other error surfaced by caller code
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FactoryError {
    /// Convenience constructor for errors raised inside deferred computations.
    pub fn resolver(message: impl Into<String>) -> Self {
        FactoryError::Resolver(message.into())
    }

    /// Attach the failing field name. Errors that already name a field keep
    /// the innermost one.
    pub(crate) fn in_field(self, field: &str) -> Self {
        match self {
            FactoryError::FieldResolution { .. } => self,
            other => FactoryError::FieldResolution {
                field: field.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Name of the field whose resolution failed, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            FactoryError::FieldResolution { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Result type alias for factory operations
pub type FactoryResult<T> = Result<T, FactoryError>;
