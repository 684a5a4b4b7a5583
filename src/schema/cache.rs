//! Process-wide cache of schema trees.

use dashmap::DashMap;
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace};

use super::{SchemaTree, TypeInfo, TypeKey};
use crate::data_type::DataType;
use crate::error::{Result, WireError};
use crate::reflect::WireObject;

/// Default bound on schema nesting.
pub const DEFAULT_MAX_DEPTH: usize = 10;

static GLOBAL: LazyLock<Arc<SchemaCache>> = LazyLock::new(|| Arc::new(SchemaCache::default()));

/// Concurrent map from (type, generic arguments) to its built [`SchemaTree`].
///
/// Trees are built outside the map's locks; when two threads race on the same key,
/// the first insert wins and every caller gets that same `Arc`.
#[derive(Debug)]
pub struct SchemaCache {
    trees: DashMap<TypeKey, Arc<SchemaTree>>,
    max_depth: usize,
}

impl Default for SchemaCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl SchemaCache {
    /// Creates an empty cache with the given depth bound.
    pub fn new(max_depth: usize) -> Self {
        Self {
            trees: DashMap::new(),
            max_depth,
        }
    }

    /// The process-wide cache, using [`DEFAULT_MAX_DEPTH`].
    pub fn global() -> Arc<SchemaCache> {
        Arc::clone(&GLOBAL)
    }

    /// Depth bound applied when building trees.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Number of cached trees.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// True if nothing has been described yet.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Returns the tree for `T`, building it on first use.
    pub fn describe<T: WireObject>(&self) -> Result<Arc<SchemaTree>> {
        let key = TypeKey::new(&T::type_ref(), &T::generics());
        if let Some(tree) = self.trees.get(&key) {
            return Ok(Arc::clone(tree.value()));
        }
        self.insert(key, &T::type_info())
    }

    /// Returns the tree for an explicit description, building it on first use.
    pub fn describe_info(&self, info: &TypeInfo) -> Result<Arc<SchemaTree>> {
        let key = info.key();
        if let Some(tree) = self.trees.get(&key) {
            return Ok(Arc::clone(tree.value()));
        }
        self.insert(key, info)
    }

    fn insert(&self, key: TypeKey, info: &TypeInfo) -> Result<Arc<SchemaTree>> {
        let built = Arc::new(self.build(key.clone(), info)?);
        let entry = self.trees.entry(key).or_insert(built);
        let tree = Arc::clone(entry.value());
        debug!(
            type_name = info.type_ref.name,
            nodes = tree.len(),
            "schema tree cached"
        );
        Ok(tree)
    }

    fn build(&self, key: TypeKey, info: &TypeInfo) -> Result<SchemaTree> {
        let mut tree = SchemaTree::new(key, info.type_ref, info.generics.clone());
        self.expand(&mut tree, 0, info, 0, 0)?;
        Ok(tree)
    }

    fn expand(
        &self,
        tree: &mut SchemaTree,
        parent: usize,
        info: &TypeInfo,
        depth: usize,
        base_depth: usize,
    ) -> Result<()> {
        if let Some(base) = info.base {
            let base = base();
            if !base.is_empty_base() {
                if base_depth >= self.max_depth {
                    return Err(self.too_deep(info));
                }
                trace!(type_name = info.type_ref.name, base = base.type_ref.name, "expanding base");
                self.expand(tree, parent, &base, depth, base_depth + 1)?;
            }
        }

        for field in &info.fields {
            if field.modifiers.is_excluded() {
                continue;
            }
            let child_depth = depth + 1;
            if child_depth > self.max_depth {
                return Err(self.too_deep(info));
            }
            let index = tree.push(parent, field, child_depth);
            if field.data_type == DataType::Other
                && let Some(nested) = (field.nested)()
                && !nested.is_empty_base()
            {
                self.expand(tree, index, &nested, child_depth, 0)?;
            }
        }
        Ok(())
    }

    fn too_deep(&self, info: &TypeInfo) -> WireError {
        WireError::SchemaDepth {
            type_name: info.type_ref.name.to_string(),
            max_depth: self.max_depth,
        }
    }
}
