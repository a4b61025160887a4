use crate::adapters::pagination::connection_from_list;
use crate::adapters::resolution::resolve_fields;
use crate::adapters::sequence_registry::{SequenceId, SequenceRegistry};
use crate::domain::connection::{Connection, ConnectionArgs};
use crate::domain::error::{FactoryError, FactoryResult};
use crate::domain::field::FieldMap;
use crate::domain::resolved::ResolvedObject;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// A named overlay of default fields.
#[derive(Clone, Debug, Default)]
pub struct Trait {
    pub default_fields: FieldMap,
}

impl Trait {
    pub fn new(default_fields: FieldMap) -> Self {
        Self { default_fields }
    }
}

impl From<FieldMap> for Trait {
    fn from(default_fields: FieldMap) -> Self {
        Self::new(default_fields)
    }
}

/// Options passed to [`FactoryBuilder::define`].
#[derive(Clone, Debug, Default)]
pub struct FactoryOptions {
    pub default_fields: FieldMap,
    pub traits: IndexMap<String, Trait>,
}

impl FactoryOptions {
    pub fn new(default_fields: FieldMap) -> Self {
        Self {
            default_fields,
            traits: IndexMap::new(),
        }
    }

    pub fn with_trait(mut self, name: impl Into<String>, overlay: impl Into<Trait>) -> Self {
        self.traits.insert(name.into(), overlay.into());
        self
    }
}

/// Entry point for defining factories of one object type.
///
/// `field_names` is the ordered list of the type's fields. Builders are
/// immutable: every `with_*` call returns a new builder, so one base builder
/// can be reused for several definitions.
#[derive(Clone, Debug)]
pub struct FactoryBuilder {
    type_name: String,
    field_names: Vec<String>,
    transient_fields: FieldMap,
    registry: Option<SequenceRegistry>,
}

impl FactoryBuilder {
    pub fn new<I, S>(type_name: impl Into<String>, field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            type_name: type_name.into(),
            field_names: field_names.into_iter().map(Into::into).collect(),
            transient_fields: FieldMap::new(),
            registry: None,
        }
    }

    /// Declare transient fields with their defaults. Transient fields can be
    /// read through `get` and overridden at build time, but never appear in
    /// built objects. Repeated calls merge, later defaults winning.
    pub fn with_transient_fields(&self, defaults: FieldMap) -> Self {
        Self {
            transient_fields: self.transient_fields.merged(&defaults),
            ..self.clone()
        }
    }

    /// Extend the type with fields that the schema does not declare.
    pub fn with_additional_fields<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut field_names = self.field_names.clone();
        for name in names {
            let name = name.into();
            if !field_names.contains(&name) {
                field_names.push(name);
            }
        }
        Self {
            field_names,
            ..self.clone()
        }
    }

    /// Use `registry` for sequence numbers instead of the process-wide one.
    pub fn with_registry(&self, registry: SequenceRegistry) -> Self {
        Self {
            registry: Some(registry),
            ..self.clone()
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn define(&self, options: FactoryOptions) -> Factory {
        let field_names: Vec<String> = self
            .field_names
            .iter()
            .filter(|name| !self.transient_fields.contains_key(name))
            .cloned()
            .collect();
        let default_fields = self.transient_fields.merged(&options.default_fields);
        let registry = self
            .registry
            .clone()
            .unwrap_or_else(|| SequenceRegistry::global().clone());

        tracing::debug!(
            "Defined factory {} with {} default field(s) and {} trait(s)",
            self.type_name,
            default_fields.len(),
            options.traits.len()
        );

        Factory {
            type_name: Arc::from(self.type_name.as_str()),
            field_names: Arc::from(field_names),
            default_fields: Arc::new(default_fields),
            traits: Arc::new(options.traits),
            sequence_id: SequenceId::new(),
            registry,
        }
    }
}

/// Define a factory without transient or additional fields.
pub fn define_factory<I, S>(
    type_name: impl Into<String>,
    field_names: I,
    options: FactoryOptions,
) -> Factory
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    FactoryBuilder::new(type_name, field_names).define(options)
}

/// Builds fixture objects of one type.
///
/// Cloning is cheap. Trait variants produced by [`Factory::use_trait`] share
/// this factory's sequence counter.
#[derive(Clone, Debug)]
pub struct Factory {
    type_name: Arc<str>,
    field_names: Arc<[String]>,
    default_fields: Arc<FieldMap>,
    traits: Arc<IndexMap<String, Trait>>,
    sequence_id: SequenceId,
    registry: SequenceRegistry,
}

impl Factory {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Fields that appear in built objects.
    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn default_fields(&self) -> &FieldMap {
        &self.default_fields
    }

    pub fn trait_names(&self) -> impl Iterator<Item = &str> {
        self.traits.keys().map(String::as_str)
    }

    pub fn sequence_id(&self) -> SequenceId {
        self.sequence_id
    }

    pub async fn build(&self) -> FactoryResult<ResolvedObject> {
        self.build_inner(Arc::new(FieldMap::new())).await
    }

    /// Build one object, with `inputs` taking precedence over the defaults.
    pub async fn build_with(&self, inputs: FieldMap) -> FactoryResult<ResolvedObject> {
        self.build_inner(Arc::new(inputs)).await
    }

    /// Build one object and deserialize it into `T`.
    pub async fn build_as<T: DeserializeOwned>(&self, inputs: FieldMap) -> FactoryResult<T> {
        self.build_with(inputs).await?.deserialize()
    }

    pub async fn build_list(&self, count: usize) -> FactoryResult<Vec<ResolvedObject>> {
        self.build_list_inner(count, Arc::new(FieldMap::new())).await
    }

    /// Build `count` objects one after another with the same inputs.
    pub async fn build_list_with(
        &self,
        count: usize,
        inputs: FieldMap,
    ) -> FactoryResult<Vec<ResolvedObject>> {
        self.build_list_inner(count, Arc::new(inputs)).await
    }

    pub async fn build_connection(
        &self,
        count: usize,
        args: &ConnectionArgs,
    ) -> FactoryResult<Connection<ResolvedObject>> {
        let list = self.build_list(count).await?;
        Ok(connection_from_list(&list, args))
    }

    pub async fn build_connection_with(
        &self,
        count: usize,
        args: &ConnectionArgs,
        inputs: FieldMap,
    ) -> FactoryResult<Connection<ResolvedObject>> {
        let list = self.build_list_with(count, inputs).await?;
        Ok(connection_from_list(&list, args))
    }

    /// Factory whose defaults are overlaid with the named trait's fields.
    pub fn use_trait(&self, trait_name: &str) -> FactoryResult<Factory> {
        let overlay = self
            .traits
            .get(trait_name)
            .ok_or_else(|| FactoryError::TraitNotFound {
                trait_name: trait_name.to_string(),
                type_name: self.type_name.to_string(),
            })?;

        tracing::debug!("Applying trait '{}' to factory {}", trait_name, self.type_name);

        Ok(Factory {
            default_fields: Arc::new(self.default_fields.merged(&overlay.default_fields)),
            ..self.clone()
        })
    }

    /// Restart this factory's sequence (and its trait variants') at 0.
    pub fn reset_sequence(&self) {
        self.registry.reset(self.sequence_id);
    }

    async fn build_inner(&self, inputs: Arc<FieldMap>) -> FactoryResult<ResolvedObject> {
        let seq = self.registry.next_value(self.sequence_id);
        tracing::debug!("Building {} (seq {})", self.type_name, seq);
        resolve_fields(&self.field_names, seq, self.default_fields.clone(), inputs).await
    }

    async fn build_list_inner(
        &self,
        count: usize,
        inputs: Arc<FieldMap>,
    ) -> FactoryResult<Vec<ResolvedObject>> {
        let mut list = Vec::with_capacity(count);
        for _ in 0..count {
            list.push(self.build_inner(inputs.clone()).await?);
        }
        Ok(list)
    }
}
