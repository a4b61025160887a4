use crate::adapters::factory::{Factory, FactoryBuilder, FactoryOptions, Trait};
use crate::adapters::field_strategy::field_spec;
use crate::adapters::sequence_registry::SequenceRegistry;
use crate::config::{FieldConfig, Settings};
use crate::domain::error::{FactoryError, FactoryResult};
use crate::domain::field::FieldMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

pub(crate) type FactoryTable = RwLock<IndexMap<String, Factory>>;

/// Named factories, typically assembled from [`Settings`].
///
/// Fields using the `factory` strategy look their target up here at build
/// time, so definitions may reference each other in any order. Those fields
/// hold the table itself, so factories taken from the catalog keep working
/// after the catalog handle is dropped. Call [`FactoryCatalog::clear`] to
/// release the definitions.
#[derive(Clone, Default)]
pub struct FactoryCatalog {
    factories: Arc<FactoryTable>,
}

impl FactoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, anyhow::Error> {
        Self::from_settings_with_registry(settings, SequenceRegistry::global().clone())
    }

    pub fn from_settings_with_registry(
        settings: &Settings,
        registry: SequenceRegistry,
    ) -> Result<Self, anyhow::Error> {
        let catalog = Self::new();
        let table = catalog.factories.clone();

        for factory_config in &settings.factories {
            let name = factory_config.factory_name();
            let type_config = settings.type_config(&factory_config.type_name).ok_or_else(|| {
                anyhow::anyhow!(
                    "Factory '{}' references unknown type '{}'",
                    name,
                    factory_config.type_name
                )
            })?;

            let mut options =
                FactoryOptions::new(field_map(&factory_config.default_fields, &table));
            for (trait_name, overlay) in &factory_config.traits {
                options = options.with_trait(
                    trait_name.clone(),
                    Trait::new(field_map(&overlay.default_fields, &table)),
                );
            }

            let factory = FactoryBuilder::new(&type_config.name, &type_config.fields)
                .with_additional_fields(&factory_config.additional_fields)
                .with_transient_fields(field_map(&factory_config.transient_fields, &table))
                .with_registry(registry.clone())
                .define(options);

            catalog.register(name, factory);
        }

        tracing::info!("Factory catalog ready with {} factories", catalog.len());
        Ok(catalog)
    }

    pub fn register(&self, name: impl Into<String>, factory: Factory) {
        self.factories.write().insert(name.into(), factory);
    }

    pub fn get(&self, name: &str) -> FactoryResult<Factory> {
        self.factories
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| FactoryError::UnknownFactory(name.to_string()))
    }

    pub fn names(&self) -> Vec<String> {
        self.factories.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Remove every factory. Factories already taken from the catalog keep
    /// their own fields, but their nested `factory` fields fail from now on.
    pub fn clear(&self) {
        let factories = std::mem::take(&mut *self.factories.write());
        tracing::debug!("Cleared {} factories from the catalog", factories.len());
    }

    /// Reset the sequence of every registered factory.
    pub fn reset_sequences(&self) {
        for factory in self.factories.read().values() {
            factory.reset_sequence();
        }
    }
}

fn field_map(fields: &IndexMap<String, FieldConfig>, table: &Arc<FactoryTable>) -> FieldMap {
    fields
        .iter()
        .map(|(name, config)| (name.clone(), field_spec(config, table)))
        .collect()
}
