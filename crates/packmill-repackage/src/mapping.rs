//! The global old→new type mapping.
//!
//! Grows monotonically while the decision engine walks packages; identity
//! entries are legitimate (they mark a destination as occupied for collision
//! checks) and are pruned before the tree fixer runs.

use packmill_model::TypeRef;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Default)]
pub struct TypeMapping {
    map: FxHashMap<TypeRef, TypeRef>,
    image: FxHashSet<TypeRef>,
}

impl TypeMapping {
    pub fn get(&self, source: &TypeRef) -> Option<&TypeRef> {
        self.map.get(source)
    }

    pub fn contains_source(&self, source: &TypeRef) -> bool {
        self.map.contains_key(source)
    }

    /// Whether some source already claimed this destination.
    pub fn is_destination(&self, destination: &TypeRef) -> bool {
        self.image.contains(destination)
    }

    pub fn insert(&mut self, source: TypeRef, destination: TypeRef) {
        self.image.insert(destination.clone());
        self.map.insert(source, destination);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The actual moves: identity entries dropped. Empty means the whole
    /// pass is a no-op.
    pub fn into_moves(self) -> FxHashMap<TypeRef, TypeRef> {
        self.map.into_iter().filter(|(source, destination)| source != destination).collect()
    }
}
