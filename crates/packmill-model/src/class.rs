//! Class, field and method definitions.

use crate::access::AccessFlags;
use crate::body::Insn;
use crate::identity::{FieldRef, MethodRef, TypeRef, INNER_CLASS_SEPARATOR};
use crate::program::{FieldId, MethodId};
use crate::values::Annotation;

/// One inner-class record: the inner type, its immediate outer type (absent
/// for local/anonymous classes recorded without one) and the declared simple
/// name (absent for anonymous classes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InnerClassAttr {
    pub inner: TypeRef,
    pub outer: Option<TypeRef>,
    pub inner_name: Option<String>,
}

/// The enclosing-method attribute: a local/anonymous class is enclosed either
/// directly by a class or by a specific method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnclosingMethodAttr {
    Class(TypeRef),
    Method(MethodRef),
}

/// A class definition.
///
/// Members are arena ids into the owning [`crate::Program`]; the definition
/// itself carries every attribute the repackaging passes must keep
/// consistent when types move.
#[derive(Clone, Debug)]
pub struct ClassDef {
    pub ty: TypeRef,
    pub access: AccessFlags,
    pub super_type: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<FieldId>,
    pub methods: Vec<MethodId>,
    pub inner_classes: Vec<InnerClassAttr>,
    pub enclosing_method: Option<EnclosingMethodAttr>,
    pub nest_host: Option<TypeRef>,
    pub nest_members: Vec<TypeRef>,
    pub permitted_subclasses: Vec<TypeRef>,
    /// Back-references from a compiler-generated class to the classes whose
    /// compilation produced it. May form cycles through shared helpers.
    pub synthesized_from: Vec<TypeRef>,
    pub annotations: Vec<Annotation>,
}

impl ClassDef {
    /// The inner-class record describing this class itself, if any.
    pub fn own_inner_class_attr(&self) -> Option<&InnerClassAttr> {
        self.inner_classes.iter().find(|attr| attr.inner == self.ty)
    }

    /// The immediate outer class, per this class's own inner-class record.
    pub fn outer_type(&self) -> Option<&TypeRef> {
        self.own_inner_class_attr().and_then(|attr| attr.outer.as_ref())
    }

    /// Whether the simple name follows the `Outer$Inner` derivation
    /// convention with respect to the given outer type.
    pub fn has_conventional_inner_name(&self, outer: &TypeRef) -> bool {
        let simple = self.ty.simple_name();
        let outer_simple = outer.simple_name();
        simple.len() > outer_simple.len() + 1
            && simple.starts_with(outer_simple)
            && simple[outer_simple.len()..].starts_with(INNER_CLASS_SEPARATOR)
    }
}

/// A field definition.
#[derive(Clone, Debug)]
pub struct FieldDef {
    pub field: FieldRef,
    pub access: AccessFlags,
    pub annotations: Vec<Annotation>,
}

impl FieldDef {
    pub fn new(field: FieldRef, access: AccessFlags) -> FieldDef {
        FieldDef { field, access, annotations: Vec::new() }
    }

    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> FieldDef {
        self.annotations = annotations;
        self
    }
}

/// A method definition. Abstract and native methods have no body.
#[derive(Clone, Debug)]
pub struct MethodDef {
    pub method: MethodRef,
    pub access: AccessFlags,
    pub body: Option<Vec<Insn>>,
    pub annotations: Vec<Annotation>,
}

impl MethodDef {
    pub fn new(method: MethodRef, access: AccessFlags) -> MethodDef {
        MethodDef { method, access, body: None, annotations: Vec::new() }
    }

    pub fn with_body(mut self, body: Vec<Insn>) -> MethodDef {
        self.body = Some(body);
        self
    }

    pub fn with_annotations(mut self, annotations: Vec<Annotation>) -> MethodDef {
        self.annotations = annotations;
        self
    }
}
