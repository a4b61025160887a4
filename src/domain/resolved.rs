use super::error::FactoryResult;
use super::field::{FieldSpec, FieldValue};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A fully resolved fixture object.
///
/// Fields resolved to undefined are kept (so `contains_key` reports them) but
/// are omitted when the object is serialized or converted to JSON.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedObject {
    fields: IndexMap<String, FieldValue>,
}

impl ResolvedObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, name: String, value: FieldValue) {
        self.fields.insert(name, value);
    }

    /// Value of a defined field. Returns `None` both for absent and for
    /// undefined fields; use [`ResolvedObject::contains_key`] to tell them apart.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).and_then(Option::as_ref)
    }

    /// Raw slot for a field: `None` if absent, `Some(None)` if undefined.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_undefined(&self, name: &str) -> bool {
        matches!(self.fields.get(name), Some(None))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// JSON object of the defined fields.
    pub fn to_json(&self) -> Value {
        let object = self
            .fields
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.clone(), v.clone())))
            .collect::<serde_json::Map<_, _>>();
        Value::Object(object)
    }

    /// Convert into a caller-defined type.
    pub fn deserialize<T: DeserializeOwned>(&self) -> FactoryResult<T> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

impl Serialize for ResolvedObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let defined = self.fields.iter().filter(|(_, v)| v.is_some()).count();
        let mut map = serializer.serialize_map(Some(defined))?;
        for (name, value) in &self.fields {
            if let Some(value) = value {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

impl From<ResolvedObject> for Value {
    fn from(object: ResolvedObject) -> Self {
        object.to_json()
    }
}

impl From<ResolvedObject> for FieldSpec {
    fn from(object: ResolvedObject) -> Self {
        FieldSpec::Literal(Some(object.to_json()))
    }
}

impl From<Vec<ResolvedObject>> for FieldSpec {
    fn from(objects: Vec<ResolvedObject>) -> Self {
        FieldSpec::Literal(Some(Value::Array(
            objects.iter().map(ResolvedObject::to_json).collect(),
        )))
    }
}

impl FromIterator<(String, FieldValue)> for ResolvedObject {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
