use indexmap::IndexMap;
use std::collections::HashSet;
use thiserror::Error;

use crate::config::{FactoryConfig, FieldConfig, FieldStrategyType, Settings, TypeConfig};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cross-reference error: {0}")]
    CrossReference(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_types(&settings.types) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_factories(settings) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_types(types: &[TypeConfig]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut names = HashSet::new();

        for type_config in types {
            if type_config.name.is_empty() {
                errors.push(ValidationError::MissingField("types.name".to_string()));
                continue;
            }
            if !names.insert(type_config.name.as_str()) {
                errors.push(ValidationError::Duplicate(format!("type '{}'", type_config.name)));
            }

            let mut fields = HashSet::new();
            for field in &type_config.fields {
                if !fields.insert(field.as_str()) {
                    errors.push(ValidationError::Duplicate(format!(
                        "field '{}' in type '{}'",
                        field, type_config.name
                    )));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_factories(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut names = HashSet::new();
        let factory_names: HashSet<&str> =
            settings.factories.iter().map(|f| f.factory_name()).collect();

        for factory in &settings.factories {
            let name = factory.factory_name();
            if !names.insert(name) {
                errors.push(ValidationError::Duplicate(format!("factory '{}'", name)));
            }

            let Some(type_config) = settings.type_config(&factory.type_name) else {
                errors.push(ValidationError::CrossReference(format!(
                    "factory '{}' references unknown type '{}'",
                    name, factory.type_name
                )));
                continue;
            };

            let allowed: HashSet<&str> = type_config
                .fields
                .iter()
                .chain(factory.additional_fields.iter())
                .chain(factory.transient_fields.keys())
                .map(String::as_str)
                .collect();

            let context = format!("factories.{}", name);
            Self::validate_fields(
                &format!("{}.transient_fields", context),
                &factory.transient_fields,
                None,
                &factory_names,
                &mut errors,
            );
            Self::validate_fields(
                &format!("{}.default_fields", context),
                &factory.default_fields,
                Some(&allowed),
                &factory_names,
                &mut errors,
            );
            for (trait_name, overlay) in &factory.traits {
                Self::validate_fields(
                    &format!("{}.traits.{}", context, trait_name),
                    &overlay.default_fields,
                    Some(&allowed),
                    &factory_names,
                    &mut errors,
                );
            }

            Self::validate_nested_traits(factory, settings, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_fields(
        context: &str,
        fields: &IndexMap<String, FieldConfig>,
        allowed: Option<&HashSet<&str>>,
        factory_names: &HashSet<&str>,
        errors: &mut Vec<ValidationError>,
    ) {
        for (field_name, field) in fields {
            let path = format!("{}.{}", context, field_name);

            if let Some(allowed) = allowed {
                if !allowed.contains(field_name.as_str()) {
                    errors.push(ValidationError::InvalidValue {
                        field: path.clone(),
                        reason: "Field is not declared by the type, additional_fields or \
                                 transient_fields"
                            .to_string(),
                    });
                }
            }

            if field.value.is_some() && (field.strategy.is_some() || field.undefined) {
                errors.push(ValidationError::InvalidValue {
                    field: path.clone(),
                    reason: "`value` cannot be combined with `strategy` or `undefined`".to_string(),
                });
            }

            match field.strategy {
                Some(FieldStrategyType::Template) if field.template.is_none() => {
                    errors.push(ValidationError::MissingField(format!("{}.template", path)));
                }
                Some(FieldStrategyType::Faker) => match field.faker {
                    None => errors.push(ValidationError::MissingField(format!("{}.faker", path))),
                    Some(_) => {
                        if let (Some(min), Some(max)) = (field.min, field.max) {
                            if min > max {
                                errors.push(ValidationError::InvalidValue {
                                    field: path.clone(),
                                    reason: format!("min ({}) is greater than max ({})", min, max),
                                });
                            }
                        }
                    }
                },
                Some(FieldStrategyType::Factory) => match field.factory.as_deref() {
                    None => errors.push(ValidationError::MissingField(format!("{}.factory", path))),
                    Some(target) if !factory_names.contains(target) => {
                        errors.push(ValidationError::CrossReference(format!(
                            "{} references unknown factory '{}'",
                            path, target
                        )));
                    }
                    Some(_) => {}
                },
                _ => {}
            }
        }
    }

    /// `use` on a factory field must name a trait of the target factory.
    fn validate_nested_traits(
        factory: &FactoryConfig,
        settings: &Settings,
        errors: &mut Vec<ValidationError>,
    ) {
        let all_fields = factory
            .transient_fields
            .iter()
            .chain(factory.default_fields.iter())
            .chain(factory.traits.values().flat_map(|t| t.default_fields.iter()));

        for (field_name, field) in all_fields {
            let (Some(target), Some(trait_name)) =
                (field.factory.as_deref(), field.use_trait.as_deref())
            else {
                continue;
            };
            if let Some(target_config) = settings.factory_config(target) {
                if !target_config.traits.contains_key(trait_name) {
                    errors.push(ValidationError::CrossReference(format!(
                        "field '{}' of factory '{}' uses unknown trait '{}' of factory '{}'",
                        field_name,
                        factory.factory_name(),
                        trait_name,
                        target
                    )));
                }
            }
        }
    }
}
