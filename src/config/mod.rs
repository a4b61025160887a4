use config::{Config, File};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub mod validator;

use crate::cli::Cli;

/// Declarative fixture definitions.
///
/// `types` carries the per-type field lists that schema tooling would
/// generate; `factories` describes the default fields and traits of each
/// factory built on top of them.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub types: Vec<TypeConfig>,
    #[serde(default)]
    pub factories: Vec<FactoryConfig>,
}

/// Ordered field names of one object type
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TypeConfig {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FactoryConfig {
    /// Name the factory is registered under (defaults to the type name)
    #[serde(default)]
    pub name: Option<String>,
    pub type_name: String,
    /// Extra output fields not declared by the type
    #[serde(default)]
    pub additional_fields: Vec<String>,
    /// Inputs readable by other fields but excluded from built objects
    #[serde(default)]
    pub transient_fields: IndexMap<String, FieldConfig>,
    #[serde(default)]
    pub default_fields: IndexMap<String, FieldConfig>,
    #[serde(default)]
    pub traits: IndexMap<String, TraitConfig>,
}

impl FactoryConfig {
    pub fn factory_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.type_name)
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct TraitConfig {
    #[serde(default)]
    pub default_fields: IndexMap<String, FieldConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldStrategyType {
    /// The build's sequence number, optionally rendered through `template`
    Sequence,
    /// Tera template over `seq` and the `depends_on` fields
    Template,
    /// Random value from the fake crate
    Faker,
    /// Nested object (or list with `count`) built by another factory
    Factory,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FakerKind {
    FirstName,
    LastName,
    FullName,
    Username,
    Email,
    Phone,
    StreetAddress,
    City,
    State,
    Country,
    PostalCode,
    Word,
    Sentence,
    Paragraph,
    Integer,
    Float,
    Boolean,
    Uuid,
}

/// How one field is produced.
///
/// A field with a `strategy` is computed at build time. Otherwise it is a
/// literal: `value`, or undefined when `undefined = true`. An entry with
/// neither resolves to `null`.
#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct FieldConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default)]
    pub undefined: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<FieldStrategyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Fields exposed to `template` by name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faker: Option<FakerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Factory used by the `factory` strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,
    /// Trait applied to the nested factory
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_trait: Option<String>,
    /// Build a list of this many objects instead of a single object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl FieldConfig {
    pub fn literal(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn strategy(strategy: FieldStrategyType) -> Self {
        Self {
            strategy: Some(strategy),
            ..Default::default()
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_root(".")
    }

    /// Load settings from the CLI `--config` file, plus the factory files
    /// next to it.
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let config_path = &cli.config;
        let root = config_path
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(".");

        let s = Config::builder()
            .add_source(File::from(config_path.clone()).required(false))
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;
        settings.load_external_configs(root)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_root(root: &str) -> Result<Self, anyhow::Error> {
        let config_path = Path::new(root).join("fabricator");
        let s = Config::builder()
            .add_source(File::from(config_path).required(false))
            .build()?;

        let mut settings: Settings = s.try_deserialize()?;
        settings.load_external_configs(root)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }

    fn load_external_configs(&mut self, root: &str) -> Result<(), anyhow::Error> {
        self.load_types_from_dir(&format!("{}/config/types", root))?;
        self.load_factories_from_dir(&format!("{}/config/factories", root))?;
        tracing::info!(
            "Loaded {} type(s) and {} factory definition(s)",
            self.types.len(),
            self.factories.len()
        );
        Ok(())
    }

    fn load_types_from_dir(&mut self, path: &str) -> Result<(), anyhow::Error> {
        let types = load_dir::<TypeConfig>(path)?;
        self.types.extend(types);
        Ok(())
    }

    fn load_factories_from_dir(&mut self, path: &str) -> Result<(), anyhow::Error> {
        let factories = load_dir::<FactoryConfig>(path)?;
        self.factories.extend(factories);
        Ok(())
    }

    /// Merge another settings object into this one. Entries of `other`
    /// replace same-named entries here.
    pub fn merge(&mut self, other: Settings) {
        Self::merge_vec_by_key(&mut self.types, other.types, |t| t.name.clone());
        Self::merge_vec_by_key(&mut self.factories, other.factories, |f| {
            f.factory_name().to_string()
        });
    }

    fn merge_vec_by_key<T, F>(base: &mut Vec<T>, other: Vec<T>, key_fn: F)
    where
        F: Fn(&T) -> String,
    {
        for item in other {
            let key = key_fn(&item);
            if let Some(pos) = base.iter().position(|existing| key_fn(existing) == key) {
                base[pos] = item;
            } else {
                base.push(item);
            }
        }
    }

    pub fn type_config(&self, name: &str) -> Option<&TypeConfig> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn factory_config(&self, name: &str) -> Option<&FactoryConfig> {
        self.factories.iter().find(|f| f.factory_name() == name)
    }
}

/// Read every `.json`, `.yaml`, `.yml` and `.toml` file directly under `path`.
fn load_dir<T: serde::de::DeserializeOwned>(path: &str) -> Result<Vec<T>, anyhow::Error> {
    let pattern = format!("{}/*", path);
    let mut paths: Vec<_> = glob::glob(&pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("Failed to read glob entry: {}", e);
                None
            }
        })
        .collect();
    paths.sort();

    let mut items = Vec::new();
    for path in paths {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if matches!(ext, "json" | "yaml" | "yml" | "toml") {
                let content = std::fs::read_to_string(&path)?;
                let item: T = match ext {
                    "json" => serde_json::from_str(&content)?,
                    "toml" => toml::from_str(&content)?,
                    _ => serde_yaml::from_str(&content)?,
                };
                tracing::debug!("Loaded definition from {}", path.display());
                items.push(item);
            }
        }
    }
    Ok(items)
}
