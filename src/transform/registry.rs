//! Profile id → transformer lookup table.

use super::Transformer;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of transformers keyed by profile id.
///
/// Constructed explicitly and handed to the orchestrator; there is no
/// process-wide instance.
#[derive(Default, Clone)]
pub struct TransformerRegistry {
    transformers: HashMap<String, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transformer under its own profile id.
    ///
    /// Re-registering an id replaces the previous entry, which is returned.
    pub fn register<T: Transformer + 'static>(&mut self, transformer: T) -> Option<Arc<dyn Transformer>> {
        self.register_arc(Arc::new(transformer))
    }

    /// Register an already shared transformer.
    pub fn register_arc(&mut self, transformer: Arc<dyn Transformer>) -> Option<Arc<dyn Transformer>> {
        let id = transformer.profile_id().to_string();
        let replaced = self.transformers.insert(id.clone(), transformer);
        if replaced.is_some() {
            debug!(profile = %id, "transformer replaced");
        }
        replaced
    }

    /// Exact lookup by profile id.
    pub fn get(&self, profile_id: &str) -> Option<Arc<dyn Transformer>> {
        self.transformers.get(profile_id).cloned()
    }

    /// Whether a transformer is registered for `profile_id`.
    pub fn contains(&self, profile_id: &str) -> bool {
        self.transformers.contains_key(profile_id)
    }

    /// All registered transformers, ordered by profile id.
    pub fn list(&self) -> Vec<Arc<dyn Transformer>> {
        let mut all: Vec<_> = self.transformers.values().cloned().collect();
        all.sort_by(|a, b| a.profile_id().cmp(b.profile_id()));
        all
    }

    /// Registered profile ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.transformers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformerRegistry").field("profiles", &self.ids()).finish()
    }
}
