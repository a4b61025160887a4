//! Field specifications.
//!
//! A field is either a literal value or a [`Dynamic`] computation evaluated
//! at build time. Dynamic fields receive a [`FieldContext`] carrying the
//! build's sequence number and a `get` accessor for sibling fields.

use super::error::FactoryResult;
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A resolved field value. `None` means the field is undefined, which is
/// distinct from `Some(Value::Null)`.
pub type FieldValue = Option<Value>;

/// Port through which a deferred computation reads sibling fields of the
/// object being built.
#[async_trait]
pub trait FieldLookup: Send + Sync {
    async fn lookup(&self, field_name: &str) -> FactoryResult<FieldValue>;
}

/// Context handed to every deferred computation.
#[derive(Clone)]
pub struct FieldContext {
    seq: u64,
    lookup: Arc<dyn FieldLookup>,
}

impl FieldContext {
    pub fn new(seq: u64, lookup: Arc<dyn FieldLookup>) -> Self {
        Self { seq, lookup }
    }

    /// Sequence number drawn for the current build.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Resolve another field of the same object. Each field is computed at
    /// most once per build; repeated reads return the cached value.
    pub async fn get(&self, field_name: &str) -> FactoryResult<FieldValue> {
        self.lookup.lookup(field_name).await
    }

    /// Resolve another field and deserialize it. Undefined and `null` both
    /// come back as `None`.
    pub async fn get_as<T: DeserializeOwned>(&self, field_name: &str) -> FactoryResult<Option<T>> {
        match self.get(field_name).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }
}

impl fmt::Debug for FieldContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldContext").field("seq", &self.seq).finish()
    }
}

/// A deferred field computation.
#[async_trait]
pub trait FieldResolver: Send + Sync {
    async fn resolve(&self, ctx: FieldContext) -> FactoryResult<FieldValue>;
}

type ResolveFuture = BoxFuture<'static, FactoryResult<FieldValue>>;
type ResolveFn = dyn Fn(FieldContext) -> ResolveFuture + Send + Sync;

struct FnResolver {
    f: Box<ResolveFn>,
}

#[async_trait]
impl FieldResolver for FnResolver {
    async fn resolve(&self, ctx: FieldContext) -> FactoryResult<FieldValue> {
        (self.f)(ctx).await
    }
}

/// Wrapper that delays field generation until build time.
#[derive(Clone)]
pub struct Dynamic {
    resolver: Arc<dyn FieldResolver>,
}

impl Dynamic {
    pub fn new(resolver: impl FieldResolver + 'static) -> Self {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    fn from_fn<F>(f: F) -> Self
    where
        F: Fn(FieldContext) -> ResolveFuture + Send + Sync + 'static,
    {
        Self::new(FnResolver { f: Box::new(f) })
    }

    pub async fn resolve(&self, ctx: FieldContext) -> FactoryResult<FieldValue> {
        self.resolver.resolve(ctx).await
    }
}

impl fmt::Debug for Dynamic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dynamic(..)")
    }
}

/// Wrap an async computation producing a defined value.
///
/// ```rust
/// use fabricator::dynamic;
/// use serde_json::json;
///
/// let id = dynamic(|ctx| async move { Ok(json!(format!("Book-{}", ctx.seq()))) });
/// ```
pub fn dynamic<F, Fut>(f: F) -> Dynamic
where
    F: Fn(FieldContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FactoryResult<Value>> + Send + 'static,
{
    Dynamic::from_fn(move |ctx| {
        let fut = f(ctx);
        async move { fut.await.map(Some) }.boxed()
    })
}

/// Wrap an async computation that may leave the field undefined.
pub fn dynamic_optional<F, Fut>(f: F) -> Dynamic
where
    F: Fn(FieldContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FactoryResult<FieldValue>> + Send + 'static,
{
    Dynamic::from_fn(move |ctx| f(ctx).boxed())
}

/// Wrap a synchronous computation.
pub fn dynamic_sync<F>(f: F) -> Dynamic
where
    F: Fn(&FieldContext) -> Value + Send + Sync + 'static,
{
    Dynamic::from_fn(move |ctx| {
        let value = f(&ctx);
        futures::future::ready(Ok(Some(value))).boxed()
    })
}

/// Specification of a single field: a literal or a deferred computation.
#[derive(Clone, Debug)]
pub enum FieldSpec {
    Literal(FieldValue),
    Dynamic(Dynamic),
}

impl FieldSpec {
    /// Literal override that forces the field to be undefined.
    pub fn undefined() -> Self {
        FieldSpec::Literal(None)
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        FieldSpec::Literal(Some(value.into()))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, FieldSpec::Dynamic(_))
    }

    /// Resolve this specification. Literals pass through unchanged.
    pub async fn resolve(&self, ctx: FieldContext) -> FactoryResult<FieldValue> {
        match self {
            FieldSpec::Literal(value) => Ok(value.clone()),
            FieldSpec::Dynamic(dynamic) => dynamic.resolve(ctx).await,
        }
    }
}

impl From<Dynamic> for FieldSpec {
    fn from(dynamic: Dynamic) -> Self {
        FieldSpec::Dynamic(dynamic)
    }
}

impl From<Value> for FieldSpec {
    fn from(value: Value) -> Self {
        FieldSpec::Literal(Some(value))
    }
}

impl From<Option<Value>> for FieldSpec {
    fn from(value: Option<Value>) -> Self {
        FieldSpec::Literal(value)
    }
}

impl From<&str> for FieldSpec {
    fn from(value: &str) -> Self {
        FieldSpec::literal(value)
    }
}

impl From<String> for FieldSpec {
    fn from(value: String) -> Self {
        FieldSpec::literal(value)
    }
}

impl From<bool> for FieldSpec {
    fn from(value: bool) -> Self {
        FieldSpec::literal(value)
    }
}

impl From<i64> for FieldSpec {
    fn from(value: i64) -> Self {
        FieldSpec::literal(value)
    }
}

impl From<i32> for FieldSpec {
    fn from(value: i32) -> Self {
        FieldSpec::literal(value)
    }
}

impl From<u64> for FieldSpec {
    fn from(value: u64) -> Self {
        FieldSpec::literal(value)
    }
}

impl From<f64> for FieldSpec {
    fn from(value: f64) -> Self {
        FieldSpec::literal(value)
    }
}

impl From<Vec<Value>> for FieldSpec {
    fn from(value: Vec<Value>) -> Self {
        FieldSpec::literal(value)
    }
}

/// Ordered mapping from field name to [`FieldSpec`]. Used for default
/// fields, trait overlays, transient defaults and per-build inputs.
#[derive(Clone, Debug, Default)]
pub struct FieldMap {
    fields: IndexMap<String, FieldSpec>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) -> Self {
        self.insert(name, spec);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, spec: impl Into<FieldSpec>) {
        self.fields.insert(name.into(), spec.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Shallow merge: every field of `overlay` replaces the same-named field
    /// here. Existing keys keep their position, new keys are appended.
    pub fn merged(&self, overlay: &FieldMap) -> FieldMap {
        let mut fields = self.fields.clone();
        for (name, spec) in &overlay.fields {
            fields.insert(name.clone(), spec.clone());
        }
        FieldMap { fields }
    }

    /// Build a map of literal fields from a JSON object.
    pub fn from_json(object: serde_json::Map<String, Value>) -> Self {
        object.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<FieldSpec>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (name, spec) in iter {
            map.insert(name, spec);
        }
        map
    }
}
