//! The arena-backed definition graph.
//!
//! Definitions are addressed by arena ids, never by structural hashing: two
//! distinct definitions may compare equal field-for-field before a renaming
//! pass distinguishes them, so passes key their maps on ids.

use crate::class::{ClassDef, FieldDef, MethodDef};
use crate::identity::{FieldRef, MethodRef, TypeRef};
use crate::values::Annotation;
use id_arena::{Arena, Id};
use rustc_hash::{FxHashMap, FxHashSet};

pub type ClassId = Id<ClassDef>;
pub type FieldId = Id<FieldDef>;
pub type MethodId = Id<MethodDef>;

/// Any definition in a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemId {
    Class(ClassId),
    Field(FieldId),
    Method(MethodId),
}

/// Outcome of resolving a member reference against the program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution<T> {
    /// The holder or the member lives outside the program (library or
    /// classpath); no constraint can or need be derived.
    Unknown,
    /// Exactly one definition answers the reference. `initial_holder` is the
    /// class named by the reference itself, which may differ from the
    /// definition's holder when resolution walked up the hierarchy.
    Single { definition: T, initial_holder: ClassId },
    /// Several unrelated definitions answer the reference (interface
    /// diamonds). Treated as "no constraint" by analyses.
    Ambiguous,
}

/// The full set of classes under transformation.
#[derive(Default)]
pub struct Program {
    pub(crate) classes: Arena<ClassDef>,
    pub(crate) fields: Arena<FieldDef>,
    pub(crate) methods: Arena<MethodDef>,
    pub(crate) class_index: FxHashMap<TypeRef, ClassId>,
    pub(crate) field_index: FxHashMap<FieldRef, FieldId>,
    pub(crate) method_index: FxHashMap<MethodRef, MethodId>,
}

impl Program {
    pub fn class(&self, id: ClassId) -> &ClassDef {
        &self.classes[id]
    }

    pub fn field(&self, id: FieldId) -> &FieldDef {
        &self.fields[id]
    }

    pub fn method(&self, id: MethodId) -> &MethodDef {
        &self.methods[id]
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// The class defining `ty`, if `ty` is a program class.
    pub fn class_by_type(&self, ty: &TypeRef) -> Option<ClassId> {
        self.class_index.get(ty).copied()
    }

    pub fn field_by_ref(&self, field: &FieldRef) -> Option<FieldId> {
        self.field_index.get(field).copied()
    }

    pub fn method_by_ref(&self, method: &MethodRef) -> Option<MethodId> {
        self.method_index.get(method).copied()
    }

    pub fn classes(&self) -> impl Iterator<Item = (ClassId, &ClassDef)> {
        self.classes.iter()
    }

    /// All class ids in deterministic (type-sorted) order. Every whole-program
    /// pass iterates in this order so reruns are byte-for-byte identical.
    pub fn classes_sorted(&self) -> Vec<ClassId> {
        let mut ids: Vec<ClassId> = self.classes.iter().map(|(id, _)| id).collect();
        ids.sort_by(|a, b| self.classes[*a].ty.cmp(&self.classes[*b].ty));
        ids
    }

    /// Visit every annotation of every class, field and method mutably.
    ///
    /// Annotation payloads are not part of any definition's structural
    /// signature, so fixup passes adjust them in place after the structural
    /// rewrite instead of rebuilding the arenas.
    pub fn for_each_annotation_mut(&mut self, mut f: impl FnMut(&mut Annotation)) {
        for (_, class) in self.classes.iter_mut() {
            for annotation in &mut class.annotations {
                f(annotation);
            }
        }
        for (_, field) in self.fields.iter_mut() {
            for annotation in &mut field.annotations {
                f(annotation);
            }
        }
        for (_, method) in self.methods.iter_mut() {
            for annotation in &mut method.annotations {
                f(annotation);
            }
        }
    }

    /// Whether `sub` is `sup` or a program-visible subtype of it. The walk
    /// stops at library types: unknown ancestry counts as "not a subtype".
    pub fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        if sub == sup {
            return true;
        }
        let mut visited: FxHashSet<ClassId> = FxHashSet::default();
        let mut worklist: Vec<ClassId> = match self.class_by_type(sub) {
            Some(id) => vec![id],
            None => return false,
        };
        while let Some(id) = worklist.pop() {
            if !visited.insert(id) {
                continue;
            }
            let class = &self.classes[id];
            if &class.ty == sup {
                return true;
            }
            for parent in class.super_type.iter().chain(class.interfaces.iter()) {
                if parent == sup {
                    return true;
                }
                if let Some(parent_id) = self.class_by_type(parent) {
                    worklist.push(parent_id);
                }
            }
        }
        false
    }

    /// Resolve a field reference: the holder's own fields first, then the
    /// superclass chain, then interfaces.
    pub fn resolve_field(&self, field: &FieldRef) -> Resolution<FieldId> {
        let Some(initial_holder) = self.class_by_type(&field.holder) else {
            return Resolution::Unknown;
        };
        let mut visited = FxHashSet::default();
        match self.lookup_field_in(initial_holder, field, &mut visited) {
            Some(definition) => Resolution::Single { definition, initial_holder },
            None => Resolution::Unknown,
        }
    }

    fn lookup_field_in(
        &self,
        class_id: ClassId,
        field: &FieldRef,
        visited: &mut FxHashSet<ClassId>,
    ) -> Option<FieldId> {
        if !visited.insert(class_id) {
            return None;
        }
        let class = &self.classes[class_id];
        for &field_id in &class.fields {
            let candidate = &self.fields[field_id].field;
            if candidate.name == field.name && candidate.field_type == field.field_type {
                return Some(field_id);
            }
        }
        if let Some(super_id) = class.super_type.as_ref().and_then(|t| self.class_by_type(t)) {
            if let Some(found) = self.lookup_field_in(super_id, field, visited) {
                return Some(found);
            }
        }
        for iface_id in class.interfaces.iter().filter_map(|t| self.class_by_type(t)) {
            if let Some(found) = self.lookup_field_in(iface_id, field, visited) {
                return Some(found);
            }
        }
        None
    }

    /// Resolve a method reference: the holder's class chain first; interface
    /// lookup only when the class chain has no answer. Two distinct interface
    /// answers make the resolution ambiguous.
    pub fn resolve_method(&self, method: &MethodRef) -> Resolution<MethodId> {
        let Some(initial_holder) = self.class_by_type(&method.holder) else {
            return Resolution::Unknown;
        };
        // Class chain. The visited set guards against malformed cyclic
        // hierarchies.
        let mut seen = FxHashSet::default();
        let mut current = Some(initial_holder);
        while let Some(class_id) = current {
            if !seen.insert(class_id) {
                break;
            }
            let class = &self.classes[class_id];
            for &method_id in &class.methods {
                let candidate = &self.methods[method_id].method;
                if candidate.name == method.name && candidate.proto == method.proto {
                    return Resolution::Single { definition: method_id, initial_holder };
                }
            }
            current = class.super_type.as_ref().and_then(|t| self.class_by_type(t));
        }
        // Interface lookup across the whole hierarchy.
        let mut matches: Vec<MethodId> = Vec::new();
        let mut visited = FxHashSet::default();
        self.collect_interface_methods(initial_holder, method, &mut visited, &mut matches);
        match matches.len() {
            0 => Resolution::Unknown,
            1 => Resolution::Single { definition: matches[0], initial_holder },
            _ => Resolution::Ambiguous,
        }
    }

    fn collect_interface_methods(
        &self,
        class_id: ClassId,
        method: &MethodRef,
        visited: &mut FxHashSet<ClassId>,
        matches: &mut Vec<MethodId>,
    ) {
        if !visited.insert(class_id) {
            return;
        }
        let class = &self.classes[class_id];
        if class.access.is_interface {
            for &method_id in &class.methods {
                let candidate = &self.methods[method_id].method;
                if candidate.name == method.name
                    && candidate.proto == method.proto
                    && !matches.contains(&method_id)
                {
                    matches.push(method_id);
                }
            }
        }
        for parent_id in class
            .super_type
            .iter()
            .chain(class.interfaces.iter())
            .filter_map(|t| self.class_by_type(t))
        {
            self.collect_interface_methods(parent_id, method, visited, matches);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AccessFlags;
    use crate::builder::{ClassBuilder, ProgramBuilder};
    use crate::identity::Proto;

    fn void_proto() -> Proto {
        Proto::new(TypeRef::primitive('V'), vec![])
    }

    fn build_hierarchy() -> Program {
        let mut builder = ProgramBuilder::new();
        builder
            .add_class(
                ClassBuilder::new(TypeRef::class("a/Base"), AccessFlags::public()).method(
                    MethodDef::new(
                        MethodRef::new(TypeRef::class("a/Base"), "m", void_proto()),
                        AccessFlags::package_private(),
                    ),
                ),
            )
            .unwrap();
        builder
            .add_class(
                ClassBuilder::new(TypeRef::class("a/Sub"), AccessFlags::public())
                    .extends(TypeRef::class("a/Base")),
            )
            .unwrap();
        builder.build()
    }

    #[test]
    fn subtype_walk_and_library_cutoff() {
        let program = build_hierarchy();
        assert!(program.is_subtype(&TypeRef::class("a/Sub"), &TypeRef::class("a/Base")));
        assert!(!program.is_subtype(&TypeRef::class("a/Base"), &TypeRef::class("a/Sub")));
        // java/lang/Object is not a program class; unknown ancestry is not a subtype.
        assert!(!program.is_subtype(&TypeRef::class("a/Sub"), &TypeRef::class("java/lang/Object")));
    }

    #[test]
    fn method_resolution_walks_superclasses() {
        let program = build_hierarchy();
        let via_sub = MethodRef::new(TypeRef::class("a/Sub"), "m", void_proto());
        match program.resolve_method(&via_sub) {
            Resolution::Single { definition, initial_holder } => {
                assert_eq!(program.method(definition).method.holder, TypeRef::class("a/Base"));
                assert_eq!(program.class(initial_holder).ty, TypeRef::class("a/Sub"));
            }
            other => panic!("expected single resolution, got {other:?}"),
        }
    }

    #[test]
    fn unknown_holder_resolves_to_unknown() {
        let program = build_hierarchy();
        let external = MethodRef::new(TypeRef::class("lib/Ext"), "m", void_proto());
        assert_eq!(program.resolve_method(&external), Resolution::Unknown);
    }
}
