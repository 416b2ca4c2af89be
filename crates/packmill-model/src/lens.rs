//! Original↔renamed identity mapping.
//!
//! A rewriting pass records every identifier it changes into a lens; every
//! later consumer of original identifiers (mapping writers, annotation
//! fixers, further rewriting passes) queries the lens instead of the raw
//! program. Lenses are immutable once built and compose by wrapping: a later
//! pass never edits an earlier lens, it chains its own in front.

use crate::identity::{FieldRef, MethodRef, TypeRef};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Bidirectional identity mapping, total over all identifiers: queries
/// outside the recorded domain pass through unchanged.
///
/// Members are keyed by full signature. Renaming a type changes the exact
/// signature of every member mentioning it, so lookups must present the
/// complete signature for the side of the mapping they hold.
pub trait Lens: Send + Sync {
    /// The current name of an identifier as it was before this lens's pass
    /// (walks the whole chain: give it a pre-pipeline identifier).
    fn renamed_type_of(&self, ty: &TypeRef) -> TypeRef;

    /// The pre-pipeline name of a current identifier.
    fn original_type_of(&self, ty: &TypeRef) -> TypeRef;

    fn renamed_field_of(&self, field: &FieldRef) -> FieldRef;

    fn original_field_of(&self, field: &FieldRef) -> FieldRef;

    fn renamed_method_of(&self, method: &MethodRef) -> MethodRef;

    fn original_method_of(&self, method: &MethodRef) -> MethodRef;
}

/// The lens produced by a repackaging run.
pub struct RepackagingLens {
    type_map: FxHashMap<TypeRef, TypeRef>,
    type_map_inverse: FxHashMap<TypeRef, TypeRef>,
    field_map: FxHashMap<FieldRef, FieldRef>,
    field_map_inverse: FxHashMap<FieldRef, FieldRef>,
    method_map: FxHashMap<MethodRef, MethodRef>,
    method_map_inverse: FxHashMap<MethodRef, MethodRef>,
    previous: Option<Arc<dyn Lens>>,
}

impl RepackagingLens {
    pub fn builder() -> RepackagingLensBuilder {
        RepackagingLensBuilder::default()
    }

    /// Number of recorded type moves.
    pub fn type_move_count(&self) -> usize {
        self.type_map.len()
    }

    pub fn recorded_type_moves(&self) -> impl Iterator<Item = (&TypeRef, &TypeRef)> {
        self.type_map.iter()
    }

    pub fn recorded_field_moves(&self) -> impl Iterator<Item = (&FieldRef, &FieldRef)> {
        self.field_map.iter()
    }

    pub fn recorded_method_moves(&self) -> impl Iterator<Item = (&MethodRef, &MethodRef)> {
        self.method_map.iter()
    }

    /// Apply just this lens's recorded moves to a type taken from the
    /// program this lens's pass rewrote. Unlike [`Lens::renamed_type_of`]
    /// this does not walk the chain of previous lenses: payload-fixup passes
    /// hold references in the pass's own "before" namespace.
    pub fn lookup_type(&self, ty: &TypeRef) -> TypeRef {
        self.map_type_forward(ty)
    }

    /// As [`RepackagingLens::lookup_type`] for a field reference. A miss on
    /// the recorded member map still rewrites the holder and value types:
    /// references to members outside the program change shape when their
    /// types move.
    pub fn lookup_field(&self, field: &FieldRef) -> FieldRef {
        if let Some(hit) = self.field_map.get(field) {
            return hit.clone();
        }
        FieldRef {
            holder: self.map_type_forward(&field.holder),
            name: field.name.clone(),
            field_type: self.map_type_forward(&field.field_type),
        }
    }

    /// As [`RepackagingLens::lookup_field`] for a method reference.
    pub fn lookup_method(&self, method: &MethodRef) -> MethodRef {
        if let Some(hit) = self.method_map.get(method) {
            return hit.clone();
        }
        MethodRef {
            holder: self.map_type_forward(&method.holder),
            name: method.name.clone(),
            proto: crate::identity::Proto {
                return_type: self.map_type_forward(&method.proto.return_type),
                parameters: method
                    .proto
                    .parameters
                    .iter()
                    .map(|p| self.map_type_forward(p))
                    .collect(),
            },
        }
    }

    /// Apply the forward type map to a possibly-array type.
    fn map_type_forward(&self, ty: &TypeRef) -> TypeRef {
        Self::map_via(&self.type_map, ty)
    }

    fn map_type_backward(&self, ty: &TypeRef) -> TypeRef {
        Self::map_via(&self.type_map_inverse, ty)
    }

    fn map_via(map: &FxHashMap<TypeRef, TypeRef>, ty: &TypeRef) -> TypeRef {
        if ty.is_array() {
            let base = ty.base_type();
            match map.get(&base) {
                Some(mapped) => ty.replace_base(mapped),
                None => ty.clone(),
            }
        } else {
            map.get(ty).cloned().unwrap_or_else(|| ty.clone())
        }
    }
}

impl Lens for RepackagingLens {
    fn renamed_type_of(&self, ty: &TypeRef) -> TypeRef {
        let current = match &self.previous {
            Some(previous) => previous.renamed_type_of(ty),
            None => ty.clone(),
        };
        self.map_type_forward(&current)
    }

    fn original_type_of(&self, ty: &TypeRef) -> TypeRef {
        let before = self.map_type_backward(ty);
        match &self.previous {
            Some(previous) => previous.original_type_of(&before),
            None => before,
        }
    }

    fn renamed_field_of(&self, field: &FieldRef) -> FieldRef {
        let current = match &self.previous {
            Some(previous) => previous.renamed_field_of(field),
            None => field.clone(),
        };
        self.field_map.get(&current).cloned().unwrap_or(current)
    }

    fn original_field_of(&self, field: &FieldRef) -> FieldRef {
        let before = self.field_map_inverse.get(field).cloned().unwrap_or_else(|| field.clone());
        match &self.previous {
            Some(previous) => previous.original_field_of(&before),
            None => before,
        }
    }

    fn renamed_method_of(&self, method: &MethodRef) -> MethodRef {
        let current = match &self.previous {
            Some(previous) => previous.renamed_method_of(method),
            None => method.clone(),
        };
        self.method_map.get(&current).cloned().unwrap_or(current)
    }

    fn original_method_of(&self, method: &MethodRef) -> MethodRef {
        let before = self.method_map_inverse.get(method).cloned().unwrap_or_else(|| method.clone());
        match &self.previous {
            Some(previous) => previous.original_method_of(&before),
            None => before,
        }
    }
}

/// Accumulates moves while a pass rewrites the program.
///
/// Entries are recorded at the moment of each rewrite; the builder tolerates
/// identity entries (they are pruned at build time) so callers can record
/// unconditionally.
#[derive(Default)]
pub struct RepackagingLensBuilder {
    type_map: FxHashMap<TypeRef, TypeRef>,
    field_map: FxHashMap<FieldRef, FieldRef>,
    method_map: FxHashMap<MethodRef, MethodRef>,
}

impl RepackagingLensBuilder {
    pub fn record_type_move(&mut self, old: TypeRef, new: TypeRef) {
        debug_assert!(
            !self.type_map.values().any(|existing| *existing == new && new != old),
            "duplicate destination type {new}"
        );
        self.type_map.insert(old, new);
    }

    pub fn record_field_move(&mut self, old: FieldRef, new: FieldRef) {
        self.field_map.insert(old, new);
    }

    pub fn record_method_move(&mut self, old: MethodRef, new: MethodRef) {
        self.method_map.insert(old, new);
    }

    pub fn is_empty(&self) -> bool {
        self.type_map.iter().all(|(old, new)| old == new)
            && self.field_map.iter().all(|(old, new)| old == new)
            && self.method_map.iter().all(|(old, new)| old == new)
    }

    /// Build the lens over whatever lens preceded this pass.
    ///
    /// Returns `None` when nothing actually moved: a no-op pass must signal
    /// "nothing to do" rather than produce an identity lens.
    pub fn build(self, previous: Option<Arc<dyn Lens>>) -> Option<RepackagingLens> {
        let type_map: FxHashMap<TypeRef, TypeRef> =
            self.type_map.into_iter().filter(|(old, new)| old != new).collect();
        let field_map: FxHashMap<FieldRef, FieldRef> =
            self.field_map.into_iter().filter(|(old, new)| old != new).collect();
        let method_map: FxHashMap<MethodRef, MethodRef> =
            self.method_map.into_iter().filter(|(old, new)| old != new).collect();

        if type_map.is_empty() && field_map.is_empty() && method_map.is_empty() {
            return None;
        }
        tracing::debug!(
            types = type_map.len(),
            fields = field_map.len(),
            methods = method_map.len(),
            chained = previous.is_some(),
            "lens built"
        );

        let type_map_inverse = type_map.iter().map(|(k, v)| (v.clone(), k.clone())).collect();
        let field_map_inverse = field_map.iter().map(|(k, v)| (v.clone(), k.clone())).collect();
        let method_map_inverse = method_map.iter().map(|(k, v)| (v.clone(), k.clone())).collect();

        Some(RepackagingLens {
            type_map,
            type_map_inverse,
            field_map,
            field_map_inverse,
            method_map,
            method_map_inverse,
            previous,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Proto;
    use pretty_assertions::assert_eq;

    #[test]
    fn identity_outside_recorded_domain() {
        let mut builder = RepackagingLens::builder();
        builder.record_type_move(TypeRef::class("a/X"), TypeRef::class("z/X"));
        let lens = builder.build(None).unwrap();

        let untouched = TypeRef::class("b/Y");
        assert_eq!(lens.renamed_type_of(&untouched), untouched);
        assert_eq!(lens.original_type_of(&untouched), untouched);
    }

    #[test]
    fn round_trip_over_recorded_domain() {
        let mut builder = RepackagingLens::builder();
        builder.record_type_move(TypeRef::class("a/X"), TypeRef::class("z/X"));
        let lens = builder.build(None).unwrap();

        let old = TypeRef::class("a/X");
        assert_eq!(lens.original_type_of(&lens.renamed_type_of(&old)), old);
    }

    #[test]
    fn arrays_map_through_their_base() {
        let mut builder = RepackagingLens::builder();
        builder.record_type_move(TypeRef::class("a/X"), TypeRef::class("z/X"));
        let lens = builder.build(None).unwrap();

        let arr = TypeRef::array_of(&TypeRef::class("a/X"), 2);
        assert_eq!(lens.renamed_type_of(&arr).descriptor(), "[[Lz/X;");
    }

    #[test]
    fn no_moves_builds_no_lens() {
        let mut builder = RepackagingLens::builder();
        builder.record_type_move(TypeRef::class("a/X"), TypeRef::class("a/X"));
        assert!(builder.build(None).is_none());
    }

    #[test]
    fn chains_walk_to_the_pre_pipeline_original() {
        let mut first = RepackagingLens::builder();
        first.record_type_move(TypeRef::class("a/X"), TypeRef::class("b/X"));
        first.record_method_move(
            MethodRef::new(TypeRef::class("a/X"), "m", Proto::new(TypeRef::primitive('V'), vec![])),
            MethodRef::new(TypeRef::class("b/X"), "m", Proto::new(TypeRef::primitive('V'), vec![])),
        );
        let first: Arc<dyn Lens> = Arc::new(first.build(None).unwrap());

        let mut second = RepackagingLens::builder();
        second.record_type_move(TypeRef::class("b/X"), TypeRef::class("c/X"));
        second.record_method_move(
            MethodRef::new(TypeRef::class("b/X"), "m", Proto::new(TypeRef::primitive('V'), vec![])),
            MethodRef::new(TypeRef::class("c/X"), "m", Proto::new(TypeRef::primitive('V'), vec![])),
        );
        let second = second.build(Some(first)).unwrap();

        assert_eq!(
            second.renamed_type_of(&TypeRef::class("a/X")),
            TypeRef::class("c/X"),
        );
        assert_eq!(
            second.original_type_of(&TypeRef::class("c/X")),
            TypeRef::class("a/X"),
        );
        let pre = MethodRef::new(
            TypeRef::class("a/X"),
            "m",
            Proto::new(TypeRef::primitive('V'), vec![]),
        );
        assert_eq!(second.renamed_method_of(&pre).holder, TypeRef::class("c/X"));
        assert_eq!(second.original_method_of(&second.renamed_method_of(&pre)), pre);
    }
}
