//! Whole-program structural rewrite.
//!
//! One deterministic pass over every class builds a brand-new program
//! consistent with the computed type mapping. Definitions are never mutated
//! in place; every identity change is recorded into the lens builder at the
//! moment of the rewrite, so a run that dies halfway never leaves a lens
//! missing entries for members it already rewrote.
//!
//! The upstream mapping is internally consistent by construction, so this
//! component has no recoverable error conditions: anything the program
//! builder rejects here is a mapping invariant violation and fails the run.

use crate::error::RepackageError;
use crate::RepackageSummary;
use packmill_model::identity::INNER_CLASS_SEPARATOR;
use packmill_model::{
    Annotation, ClassBuilder, ClassDef, EnclosingMethodAttr, FieldDef, FieldRef, InnerClassAttr,
    Insn, MethodDef, MethodHandle, MethodRef, Program, ProgramBuilder, Proto,
    RepackagingLensBuilder, TypeRef, Value,
};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

pub(crate) struct TreeFixer<'p> {
    program: &'p Program,
    type_map: &'p FxHashMap<TypeRef, TypeRef>,
    lens: RepackagingLensBuilder,
    proto_cache: FxHashMap<Proto, Proto>,
    /// Compute-once memo for synthesized-from back-references: shared
    /// synthesis origins (which may form cycles) are fixed up exactly once
    /// per original identity.
    synthesized_cache: FxHashMap<TypeRef, TypeRef>,
}

impl<'p> TreeFixer<'p> {
    pub fn new(program: &'p Program, type_map: &'p FxHashMap<TypeRef, TypeRef>) -> TreeFixer<'p> {
        TreeFixer {
            program,
            type_map,
            lens: RepackagingLensBuilder::default(),
            proto_cache: FxHashMap::default(),
            synthesized_cache: FxHashMap::default(),
        }
    }

    /// Rewrite every class and return the replacement program plus the lens
    /// builder holding all recorded moves.
    pub fn run(
        mut self,
        summary: &mut RepackageSummary,
    ) -> Result<(Program, RepackagingLensBuilder), RepackageError> {
        let mut builder = ProgramBuilder::new();
        for class_id in self.program.classes_sorted() {
            let class = self.program.class(class_id);
            let fixed = self.fix_class(class, summary);
            builder.add_class(fixed)?;
        }
        debug!(
            classes = self.program.class_count(),
            moved = summary.classes_moved,
            "tree fixup complete"
        );
        Ok((builder.build(), self.lens))
    }

    fn fix_class(&mut self, class: &ClassDef, summary: &mut RepackageSummary) -> ClassBuilder {
        let new_ty = self.fix_type(&class.ty);
        let mut fixed = ClassBuilder::new(new_ty.clone(), class.access);
        fixed.super_type = class.super_type.as_ref().map(|t| self.fix_type(t));
        fixed.interfaces = class.interfaces.iter().map(|t| self.fix_type(t)).collect();

        for &field_id in &class.fields {
            let field = self.program.field(field_id);
            let new_ref = self.fix_field_ref(&field.field);
            if new_ref != field.field {
                self.lens.record_field_move(field.field.clone(), new_ref.clone());
                summary.members_renamed += 1;
            }
            fixed.fields.push(
                FieldDef::new(new_ref, field.access).with_annotations(field.annotations.clone()),
            );
        }
        for &method_id in &class.methods {
            let method = self.program.method(method_id);
            let new_ref = self.fix_method_ref(&method.method);
            if new_ref != method.method {
                self.lens.record_method_move(method.method.clone(), new_ref.clone());
                summary.members_renamed += 1;
            }
            let mut new_method = MethodDef::new(new_ref, method.access)
                .with_annotations(method.annotations.clone());
            new_method.body = method
                .body
                .as_ref()
                .map(|body| body.iter().map(|insn| self.fix_insn(insn)).collect());
            fixed.methods.push(new_method);
        }

        fixed.inner_classes = class
            .inner_classes
            .iter()
            .map(|attr| self.fix_inner_class_attr(attr, summary))
            .collect();
        fixed.enclosing_method = class.enclosing_method.as_ref().map(|attr| match attr {
            EnclosingMethodAttr::Class(ty) => EnclosingMethodAttr::Class(self.fix_type(ty)),
            EnclosingMethodAttr::Method(method) => {
                EnclosingMethodAttr::Method(self.fix_method_ref(method))
            }
        });
        fixed.nest_host = class.nest_host.as_ref().map(|t| self.fix_type(t));
        fixed.nest_members = class.nest_members.iter().map(|t| self.fix_type(t)).collect();
        fixed.permitted_subclasses =
            class.permitted_subclasses.iter().map(|t| self.fix_type(t)).collect();
        fixed.synthesized_from = class
            .synthesized_from
            .iter()
            .map(|t| self.fix_synthesized_origin(t))
            .collect();
        // Annotation payloads are rewritten against the final lens in a
        // separate pass; carry them over verbatim here.
        fixed.annotations = class.annotations.clone();

        if new_ty != class.ty {
            self.lens.record_type_move(class.ty.clone(), new_ty);
            summary.classes_moved += 1;
        }
        fixed
    }

    /// Unwrap arrays to the base type, map the base, and rewrap only when
    /// the base actually changed.
    fn fix_type(&self, ty: &TypeRef) -> TypeRef {
        if ty.is_array() {
            let base = ty.base_type();
            match self.type_map.get(&base) {
                Some(mapped) => ty.replace_base(mapped),
                None => ty.clone(),
            }
        } else {
            self.type_map.get(ty).cloned().unwrap_or_else(|| ty.clone())
        }
    }

    fn fix_proto(&mut self, proto: &Proto) -> Proto {
        if let Some(hit) = self.proto_cache.get(proto) {
            return hit.clone();
        }
        let fixed = Proto {
            return_type: self.fix_type(&proto.return_type),
            parameters: proto.parameters.iter().map(|p| self.fix_type(p)).collect(),
        };
        self.proto_cache.insert(proto.clone(), fixed.clone());
        fixed
    }

    fn fix_field_ref(&mut self, field: &FieldRef) -> FieldRef {
        FieldRef {
            holder: self.fix_type(&field.holder),
            name: field.name.clone(),
            field_type: self.fix_type(&field.field_type),
        }
    }

    fn fix_method_ref(&mut self, method: &MethodRef) -> MethodRef {
        MethodRef {
            holder: self.fix_type(&method.holder),
            name: method.name.clone(),
            proto: self.fix_proto(&method.proto),
        }
    }

    fn fix_synthesized_origin(&mut self, ty: &TypeRef) -> TypeRef {
        if let Some(hit) = self.synthesized_cache.get(ty) {
            return hit.clone();
        }
        let fixed = self.fix_type(ty);
        self.synthesized_cache.insert(ty.clone(), fixed.clone());
        fixed
    }

    fn fix_inner_class_attr(
        &mut self,
        attr: &InnerClassAttr,
        summary: &mut RepackageSummary,
    ) -> InnerClassAttr {
        let new_inner = self.fix_type(&attr.inner);
        let new_outer = attr.outer.as_ref().map(|t| self.fix_type(t));
        let changed = new_inner != attr.inner || new_outer.as_ref() != attr.outer.as_ref();
        let mut inner_name = attr.inner_name.clone();
        if changed && attr.inner_name.is_some() {
            if let Some(new_outer_ty) = &new_outer {
                let outer_simple = new_outer_ty.simple_name();
                let inner_simple = new_inner.simple_name();
                if inner_simple.len() > outer_simple.len() + 1
                    && inner_simple.starts_with(outer_simple)
                    && inner_simple[outer_simple.len()..].starts_with(INNER_CLASS_SEPARATOR)
                {
                    inner_name = Some(inner_simple[outer_simple.len() + 1..].to_string());
                } else {
                    // Best-effort degrade: keep the recorded simple name, but
                    // say so loudly; the display name may now be stale.
                    warn!(
                        inner = %new_inner,
                        outer = %new_outer_ty,
                        "inner class does not follow the Outer$Inner naming convention; keeping its recorded simple name"
                    );
                    summary.inner_name_mismatches += 1;
                }
            }
        }
        InnerClassAttr { inner: new_inner, outer: new_outer, inner_name }
    }

    fn fix_handle(&mut self, handle: &MethodHandle) -> MethodHandle {
        match handle {
            MethodHandle::Field { kind, field } => {
                MethodHandle::Field { kind: *kind, field: self.fix_field_ref(field) }
            }
            MethodHandle::Method { kind, method } => {
                MethodHandle::Method { kind: *kind, method: self.fix_method_ref(method) }
            }
        }
    }

    fn fix_insn(&mut self, insn: &Insn) -> Insn {
        match insn {
            Insn::Invoke { kind, method } => {
                Insn::Invoke { kind: *kind, method: self.fix_method_ref(method) }
            }
            Insn::FieldAccess { kind, field } => {
                Insn::FieldAccess { kind: *kind, field: self.fix_field_ref(field) }
            }
            Insn::NewInstance(ty) => Insn::NewInstance(self.fix_type(ty)),
            Insn::NewArray(ty) => Insn::NewArray(self.fix_type(ty)),
            Insn::InstanceOf(ty) => Insn::InstanceOf(self.fix_type(ty)),
            Insn::CheckCast(ty) => Insn::CheckCast(self.fix_type(ty)),
            Insn::ConstClass(ty) => Insn::ConstClass(self.fix_type(ty)),
            Insn::InitClass(ty) => Insn::InitClass(self.fix_type(ty)),
            Insn::ConstMethodHandle(handle) => Insn::ConstMethodHandle(self.fix_handle(handle)),
            Insn::ConstMethodType(proto) => Insn::ConstMethodType(self.fix_proto(proto)),
            Insn::Opaque => Insn::Opaque,
        }
    }
}

/// Rewrite every annotation payload of `program` against the final lens,
/// with the same traversal shape as the reference tracer. Annotation values
/// are not part of any structural signature, so this runs after the
/// structural pass has fixed every definition.
pub(crate) fn fix_annotations(program: &mut Program, lens: &packmill_model::RepackagingLens) {
    program.for_each_annotation_mut(|annotation| {
        *annotation = fix_annotation(annotation, lens);
    });
}

fn fix_annotation(
    annotation: &Annotation,
    lens: &packmill_model::RepackagingLens,
) -> Annotation {
    let mut fixed = Annotation::new(lens.lookup_type(&annotation.annotation_type));
    for element in &annotation.elements {
        fixed = fixed.with_element(element.name.clone(), fix_value(&element.value, lens));
    }
    fixed
}

fn fix_value(value: &Value, lens: &packmill_model::RepackagingLens) -> Value {
    match value {
        Value::Type(ty) => Value::Type(lens.lookup_type(ty)),
        Value::EnumConstant(field) => Value::EnumConstant(lens.lookup_field(field)),
        Value::Field(field) => Value::Field(lens.lookup_field(field)),
        Value::Method(method) => Value::Method(lens.lookup_method(method)),
        Value::MethodHandle(MethodHandle::Field { kind, field }) => {
            Value::MethodHandle(MethodHandle::Field { kind: *kind, field: lens.lookup_field(field) })
        }
        Value::MethodHandle(MethodHandle::Method { kind, method }) => Value::MethodHandle(
            MethodHandle::Method { kind: *kind, method: lens.lookup_method(method) },
        ),
        Value::MethodType(proto) => Value::MethodType(Proto {
            return_type: lens.lookup_type(&proto.return_type),
            parameters: proto.parameters.iter().map(|p| lens.lookup_type(p)).collect(),
        }),
        Value::Annotation(annotation) => Value::Annotation(fix_annotation(annotation, lens)),
        Value::Array(values) => {
            Value::Array(values.iter().map(|v| fix_value(v, lens)).collect())
        }
        Value::Primitive => Value::Primitive,
    }
}
