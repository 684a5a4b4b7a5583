//! Arena-backed schema tree.
//!
//! Nodes live in one `Vec`; children and the parent back-reference are indices into
//! it, so a tree is a single allocation-friendly value that can be shared behind an
//! `Arc` and never mutated after it is built.

use std::hash::Hasher;
use twox_hash::XxHash64;

use super::{FieldInfo, Modifiers, TypeKey, TypeRef};
use crate::data_type::DataType;
use crate::dispatch::FieldCodec;
use crate::format::hash_field_name;

#[derive(Debug, Clone)]
pub(crate) struct SchemaNode {
    name: &'static str,
    name_hash: u64,
    path: String,
    type_ref: TypeRef,
    generics: Vec<TypeRef>,
    data_type: DataType,
    modifiers: Modifiers,
    depth: usize,
    parent: Option<usize>,
    children: Vec<usize>,
    codec: Option<FieldCodec>,
}

/// Immutable field tree of one (type, generic arguments) pair.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    key: TypeKey,
    hash: u64,
    nodes: Vec<SchemaNode>,
}

impl SchemaTree {
    pub(crate) fn new(key: TypeKey, root_type: TypeRef, generics: Vec<TypeRef>) -> Self {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(key.name.as_bytes());
        for generic in &key.generics {
            hasher.write_u8(0);
            hasher.write(generic.as_bytes());
        }
        let root = SchemaNode {
            name: root_type.name,
            name_hash: hash_field_name(root_type.name),
            path: String::new(),
            type_ref: root_type,
            generics,
            data_type: DataType::Other,
            modifiers: Modifiers::default(),
            depth: 0,
            parent: None,
            children: Vec::new(),
            codec: None,
        };
        Self {
            key,
            hash: hasher.finish(),
            nodes: vec![root],
        }
    }

    /// Appends a node for `field` below `parent` and returns its index.
    pub(crate) fn push(&mut self, parent: usize, field: &FieldInfo, depth: usize) -> usize {
        let index = self.nodes.len();
        let path = match self.nodes.get(parent).map(|p| p.path.as_str()) {
            Some("") | None => field.name.to_string(),
            Some(prefix) => format!("{prefix}.{}", field.name),
        };
        self.nodes.push(SchemaNode {
            name: field.name,
            name_hash: hash_field_name(field.name),
            path,
            type_ref: field.type_ref,
            generics: field.generics.clone(),
            data_type: field.data_type,
            modifiers: field.modifiers,
            depth,
            parent: Some(parent),
            children: Vec::new(),
            codec: field.codec.clone(),
        });
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(index);
        }
        index
    }

    /// Cache key this tree was built for.
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// Identity hash over the type name and ordered generic names.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The root node, standing for the described type itself.
    pub fn root(&self) -> FieldRef<'_> {
        FieldRef {
            tree: self,
            index: 0,
        }
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth of the deepest node.
    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// All nodes in build order (pre-order).
    pub fn iter(&self) -> impl Iterator<Item = FieldRef<'_>> {
        (0..self.nodes.len()).map(move |index| FieldRef { tree: self, index })
    }

    /// Looks a node up by dot path.
    pub fn find(&self, path: &str) -> Option<FieldRef<'_>> {
        self.iter().find(|f| f.path() == path)
    }
}

/// Borrowed handle to one node of a [`SchemaTree`].
#[derive(Debug, Clone, Copy)]
pub struct FieldRef<'a> {
    tree: &'a SchemaTree,
    index: usize,
}

impl<'a> FieldRef<'a> {
    fn node(&self) -> &'a SchemaNode {
        // Handles are only created for indices inside the arena.
        &self.tree.nodes[self.index]
    }

    /// Field name. For the root, the type name.
    pub fn name(&self) -> &'static str {
        self.node().name
    }

    /// xxHash64 of the name.
    pub fn name_hash(&self) -> u64 {
        self.node().name_hash
    }

    /// Dot path from the root; empty for the root.
    pub fn path(&self) -> &'a str {
        &self.node().path
    }

    /// Tag this field is written with.
    pub fn data_type(&self) -> DataType {
        self.node().data_type
    }

    /// Declared type.
    pub fn type_ref(&self) -> &'a TypeRef {
        &self.node().type_ref
    }

    /// Generic arguments of the declared type.
    pub fn generics(&self) -> &'a [TypeRef] {
        &self.node().generics
    }

    /// Field modifiers.
    pub fn modifiers(&self) -> Modifiers {
        self.node().modifiers
    }

    /// Nesting depth, 0 for the root.
    pub fn depth(&self) -> usize {
        self.node().depth
    }

    /// Leaf codec derived from the declared type, if any.
    pub fn codec(&self) -> Option<&'a FieldCodec> {
        self.node().codec.as_ref()
    }

    /// Enclosing node; `None` for the root.
    pub fn parent(&self) -> Option<FieldRef<'a>> {
        self.node().parent.map(|index| FieldRef {
            tree: self.tree,
            index,
        })
    }

    /// Child nodes in declaration order (base fields first).
    pub fn children(&self) -> impl Iterator<Item = FieldRef<'a>> + 'a {
        let tree = self.tree;
        self.node()
            .children
            .iter()
            .map(move |&index| FieldRef { tree, index })
    }

    /// True if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.node().children.is_empty()
    }

    /// Finds a direct child by name hash, confirming with the name itself.
    pub fn find_child(&self, hash: u64, name: &str) -> Option<FieldRef<'a>> {
        self.children()
            .find(|c| c.name_hash() == hash && c.name() == name)
    }
}
