use crate::adapters::catalog::FactoryTable;
use crate::config::{FakerKind, FieldConfig, FieldStrategyType};
use crate::domain::error::{FactoryError, FactoryResult};
use crate::domain::field::{Dynamic, FieldContext, FieldResolver, FieldSpec, FieldValue};
use async_trait::async_trait;
use fake::faker::address::en::{CityName, CountryName, PostCode, StateAbbr, StreetName};
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use tera::{Context, Tera};

/// Turn a declarative field entry into a [`FieldSpec`].
pub fn field_spec(config: &FieldConfig, factories: &Arc<FactoryTable>) -> FieldSpec {
    match config.strategy {
        None if config.undefined => FieldSpec::undefined(),
        None => FieldSpec::Literal(Some(config.value.clone().unwrap_or(Value::Null))),
        Some(FieldStrategyType::Sequence) => Dynamic::new(TemplateResolver {
            template: config.template.clone(),
            depends_on: Vec::new(),
        })
        .into(),
        Some(FieldStrategyType::Template) => Dynamic::new(TemplateResolver {
            template: config.template.clone(),
            depends_on: config.depends_on.clone(),
        })
        .into(),
        Some(FieldStrategyType::Faker) => Dynamic::new(FakerResolver {
            kind: config.faker.unwrap_or(FakerKind::Word),
            min: config.min,
            max: config.max,
        })
        .into(),
        Some(FieldStrategyType::Factory) => Dynamic::new(NestedFactoryResolver {
            factory: config.factory.clone().unwrap_or_default(),
            use_trait: config.use_trait.clone(),
            count: config.count,
            factories: factories.clone(),
        })
        .into(),
    }
}

/// Renders a tera template with `seq` and the `depends_on` fields in scope.
/// Without a template the bare sequence number is produced.
struct TemplateResolver {
    template: Option<String>,
    depends_on: Vec<String>,
}

#[async_trait]
impl FieldResolver for TemplateResolver {
    async fn resolve(&self, ctx: FieldContext) -> FactoryResult<FieldValue> {
        let Some(template) = &self.template else {
            return Ok(Some(json!(ctx.seq())));
        };

        let mut context = Context::new();
        context.insert("seq", &ctx.seq());
        for name in &self.depends_on {
            // Undefined dependencies stay out of scope so `default()` applies.
            if let Some(value) = ctx.get(name).await? {
                context.insert(name.as_str(), &value);
            }
        }

        let rendered = Tera::one_off(template, &context, false)?;
        if let Ok(json_val) = serde_json::from_str::<Value>(&rendered) {
            Ok(Some(json_val))
        } else {
            Ok(Some(Value::String(rendered)))
        }
    }
}

struct FakerResolver {
    kind: FakerKind,
    min: Option<f64>,
    max: Option<f64>,
}

#[async_trait]
impl FieldResolver for FakerResolver {
    async fn resolve(&self, _ctx: FieldContext) -> FactoryResult<FieldValue> {
        fake_value(self.kind, self.min, self.max).map(Some)
    }
}

pub fn fake_value(kind: FakerKind, min: Option<f64>, max: Option<f64>) -> FactoryResult<Value> {
    let value = match kind {
        // Personal
        FakerKind::FirstName => json!(FirstName().fake::<String>()),
        FakerKind::LastName => json!(LastName().fake::<String>()),
        FakerKind::FullName => json!(Name().fake::<String>()),
        FakerKind::Username => json!(Username().fake::<String>()),

        // Contact
        FakerKind::Email => json!(SafeEmail().fake::<String>()),
        FakerKind::Phone => json!(PhoneNumber().fake::<String>()),

        // Address
        FakerKind::StreetAddress => json!(StreetName().fake::<String>()),
        FakerKind::City => json!(CityName().fake::<String>()),
        FakerKind::State => json!(StateAbbr().fake::<String>()),
        FakerKind::Country => json!(CountryName().fake::<String>()),
        FakerKind::PostalCode => json!(PostCode().fake::<String>()),

        // Text
        FakerKind::Word => json!(Word().fake::<String>()),
        FakerKind::Sentence => json!(Sentence(1..10).fake::<String>()),
        FakerKind::Paragraph => json!(Paragraph(1..3).fake::<String>()),

        // Numbers
        FakerKind::Integer => {
            let min = min.unwrap_or(0.0) as i64;
            let max = max.unwrap_or(100.0) as i64;
            if min > max {
                return Err(FactoryError::resolver(format!(
                    "Invalid integer range {}..={}",
                    min, max
                )));
            }
            json!(rand::thread_rng().gen_range(min..=max))
        }
        FakerKind::Float => {
            let min = min.unwrap_or(0.0);
            let max = max.unwrap_or(100.0);
            if min > max {
                return Err(FactoryError::resolver(format!(
                    "Invalid float range {}..={}",
                    min, max
                )));
            }
            json!(rand::thread_rng().gen_range(min..=max))
        }
        FakerKind::Boolean => json!(rand::thread_rng().gen_bool(0.5)),

        // Identifiers
        FakerKind::Uuid => json!(uuid::Uuid::new_v4().to_string()),
    };
    Ok(value)
}

/// Builds a nested object (or a list of them) with another catalog factory.
struct NestedFactoryResolver {
    factory: String,
    use_trait: Option<String>,
    count: Option<usize>,
    factories: Arc<FactoryTable>,
}

#[async_trait]
impl FieldResolver for NestedFactoryResolver {
    async fn resolve(&self, _ctx: FieldContext) -> FactoryResult<FieldValue> {
        let factory = self
            .factories
            .read()
            .get(&self.factory)
            .cloned()
            .ok_or_else(|| FactoryError::UnknownFactory(self.factory.clone()))?;
        let factory = match &self.use_trait {
            Some(trait_name) => factory.use_trait(trait_name)?,
            None => factory,
        };

        let value = match self.count {
            Some(count) => serde_json::to_value(factory.build_list(count).await?)?,
            None => factory.build().await?.to_json(),
        };
        Ok(Some(value))
    }
}
