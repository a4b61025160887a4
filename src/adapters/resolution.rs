use crate::domain::error::FactoryResult;
use crate::domain::field::{FieldContext, FieldLookup, FieldMap, FieldValue};
use crate::domain::resolved::ResolvedObject;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One resolution pass: the memoization cache for a single build.
#[derive(Clone)]
struct ResolutionPass {
    state: Arc<PassState>,
}

struct PassState {
    seq: u64,
    defaults: Arc<FieldMap>,
    inputs: Arc<FieldMap>,
    cache: RwLock<IndexMap<String, FieldValue>>,
}

impl ResolutionPass {
    fn new(seq: u64, defaults: Arc<FieldMap>, inputs: Arc<FieldMap>) -> Self {
        Self {
            state: Arc::new(PassState {
                seq,
                defaults,
                inputs,
                cache: RwLock::new(IndexMap::new()),
            }),
        }
    }

    async fn resolve_field_and_update_cache(&self, name: &str) -> FactoryResult<FieldValue> {
        {
            let cache = self.state.cache.read().await;
            if let Some(value) = cache.get(name) {
                return Ok(value.clone());
            }
        }

        // Inputs win over defaults, including an explicit undefined input.
        let spec = match self
            .state
            .inputs
            .get(name)
            .or_else(|| self.state.defaults.get(name))
        {
            Some(spec) => spec.clone(),
            None => return Ok(None),
        };

        let ctx = FieldContext::new(self.state.seq, Arc::new(self.clone()));
        let value = spec.resolve(ctx).await.map_err(|e| e.in_field(name))?;

        let mut cache = self.state.cache.write().await;
        cache.insert(name.to_string(), value.clone());
        Ok(value)
    }

    async fn into_cache(self) -> IndexMap<String, FieldValue> {
        let cache = self.state.cache.read().await;
        cache.clone()
    }
}

#[async_trait]
impl FieldLookup for ResolutionPass {
    async fn lookup(&self, field_name: &str) -> FactoryResult<FieldValue> {
        self.resolve_field_and_update_cache(field_name).await
    }
}

/// Resolve every field present in `defaults` or `inputs` for one build.
///
/// Fields are resolved one at a time in declaration order (defaults first,
/// then input-only keys). Each field is computed at most once; `get` calls
/// from deferred computations resolve their target on demand. The result
/// only contains `known_field_names`, in that order.
///
/// Mutually dependent deferred fields (A reads B while B reads A) are not
/// detected and recurse without bound.
pub async fn resolve_fields(
    known_field_names: &[String],
    seq: u64,
    defaults: Arc<FieldMap>,
    inputs: Arc<FieldMap>,
) -> FactoryResult<ResolvedObject> {
    let field_names: Vec<String> = defaults
        .keys()
        .chain(inputs.keys().filter(|name| !defaults.contains_key(name)))
        .map(str::to_string)
        .collect();

    let pass = ResolutionPass::new(seq, defaults, inputs);
    for name in &field_names {
        pass.resolve_field_and_update_cache(name).await?;
    }

    let mut cache = pass.into_cache().await;
    let resolved = known_field_names
        .iter()
        .filter_map(|name| cache.shift_remove(name).map(|value| (name.clone(), value)))
        .collect::<ResolvedObject>();

    tracing::debug!(
        "Resolved {} field(s) for seq {} ({} transient)",
        resolved.len(),
        seq,
        cache.len()
    );
    Ok(resolved)
}
