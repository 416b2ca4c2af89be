//! Reference tracing.
//!
//! [`UseVisitor`] is the seam every reference-consuming pass is built
//! against: the tracer walks a definition's signature, body, metadata and
//! annotation values and reports each discovered reference exactly once,
//! classified by kind. Array types are unwrapped to their element type and
//! primitives are dropped, so visitors only ever see class types.
//!
//! The tracer does not judge legality or resolve anything; references into
//! libraries are reported like any other and it is the visitor's business to
//! ignore what it cannot resolve. Malformed descriptors, on the other hand,
//! are an error here: a body that cannot be traced completely must abort the
//! surrounding pass rather than silently under-report references.

use crate::body::{FieldAccessKind, Insn, InvokeKind, MethodHandle};
use crate::class::{ClassDef, EnclosingMethodAttr, FieldDef, MethodDef};
use crate::identity::{FieldRef, MethodRef, Proto, TypeRef};
use crate::values::{Annotation, Value};
use thiserror::Error;

/// A reference that could not be enumerated.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("malformed type descriptor `{descriptor}` in {context}")]
    MalformedDescriptor { context: String, descriptor: String },
}

/// Callbacks for every reference kind the tracer can discover.
pub trait UseVisitor {
    fn on_type_reference(&mut self, ty: &TypeRef);
    fn on_field_access(&mut self, kind: FieldAccessKind, field: &FieldRef);
    fn on_method_reference(&mut self, kind: InvokeKind, method: &MethodRef);
    fn on_new_instance(&mut self, ty: &TypeRef);
    fn on_instance_of(&mut self, ty: &TypeRef);
    fn on_init_class(&mut self, ty: &TypeRef);
}

/// Trace one method: signature, annotations and body.
pub fn trace_method<V: UseVisitor>(method: &MethodDef, visitor: &mut V) -> Result<(), TraceError> {
    let context = method.method.to_string();
    let mut tracer = Tracer { visitor, context: &context };
    tracer.proto(&method.method.proto)?;
    for annotation in &method.annotations {
        tracer.annotation(annotation)?;
    }
    if let Some(body) = &method.body {
        for insn in body {
            tracer.insn(insn)?;
        }
    }
    Ok(())
}

/// Trace one field: its type and annotations.
pub fn trace_field<V: UseVisitor>(field: &FieldDef, visitor: &mut V) -> Result<(), TraceError> {
    let context = field.field.to_string();
    let mut tracer = Tracer { visitor, context: &context };
    tracer.ty(&field.field.field_type)?;
    for annotation in &field.annotations {
        tracer.annotation(annotation)?;
    }
    Ok(())
}

/// Trace a class's structural metadata: supertypes, nest and inner-class
/// links, synthesis origins and annotations.
///
/// The enclosing-method attribute is reported at the type level (holder and
/// proto types); passes that need the member-level link read the attribute
/// directly off the [`ClassDef`].
pub fn trace_class<V: UseVisitor>(class: &ClassDef, visitor: &mut V) -> Result<(), TraceError> {
    let context = class.ty.to_string();
    let mut tracer = Tracer { visitor, context: &context };
    if let Some(super_type) = &class.super_type {
        tracer.ty(super_type)?;
    }
    for interface in &class.interfaces {
        tracer.ty(interface)?;
    }
    for attr in &class.inner_classes {
        tracer.ty(&attr.inner)?;
        if let Some(outer) = &attr.outer {
            tracer.ty(outer)?;
        }
    }
    match &class.enclosing_method {
        Some(EnclosingMethodAttr::Class(ty)) => tracer.ty(ty)?,
        Some(EnclosingMethodAttr::Method(method)) => {
            tracer.ty(&method.holder)?;
            tracer.proto(&method.proto)?;
        }
        None => {}
    }
    if let Some(host) = &class.nest_host {
        tracer.ty(host)?;
    }
    for ty in class
        .nest_members
        .iter()
        .chain(class.permitted_subclasses.iter())
        .chain(class.synthesized_from.iter())
    {
        tracer.ty(ty)?;
    }
    for annotation in &class.annotations {
        tracer.annotation(annotation)?;
    }
    Ok(())
}

/// Trace a single annotation value tree. Exposed so passes fixing up
/// annotation payloads share the exact traversal shape of the tracer.
pub fn trace_value<V: UseVisitor>(
    value: &Value,
    context: &str,
    visitor: &mut V,
) -> Result<(), TraceError> {
    Tracer { visitor, context }.value(value)
}

struct Tracer<'a, V> {
    visitor: &'a mut V,
    context: &'a str,
}

impl<V: UseVisitor> Tracer<'_, V> {
    fn check(&self, ty: &TypeRef) -> Result<(), TraceError> {
        if ty.is_well_formed() {
            Ok(())
        } else {
            Err(TraceError::MalformedDescriptor {
                context: self.context.to_string(),
                descriptor: ty.descriptor().to_string(),
            })
        }
    }

    /// Report the class base of a type, if any.
    fn ty(&mut self, ty: &TypeRef) -> Result<(), TraceError> {
        self.check(ty)?;
        let base = ty.base_type();
        if base.is_class() {
            self.visitor.on_type_reference(&base);
        }
        Ok(())
    }

    fn proto(&mut self, proto: &Proto) -> Result<(), TraceError> {
        self.ty(&proto.return_type)?;
        for param in &proto.parameters {
            self.ty(param)?;
        }
        Ok(())
    }

    fn field_ref(&mut self, kind: FieldAccessKind, field: &FieldRef) -> Result<(), TraceError> {
        self.check(&field.holder)?;
        self.check(&field.field_type)?;
        self.visitor.on_field_access(kind, field);
        Ok(())
    }

    fn method_ref(&mut self, kind: InvokeKind, method: &MethodRef) -> Result<(), TraceError> {
        self.check(&method.holder)?;
        self.check(&method.proto.return_type)?;
        for param in &method.proto.parameters {
            self.check(param)?;
        }
        self.visitor.on_method_reference(kind, method);
        Ok(())
    }

    fn handle(&mut self, handle: &MethodHandle) -> Result<(), TraceError> {
        match handle {
            MethodHandle::Field { kind, field } => self.field_ref(*kind, field),
            MethodHandle::Method { kind, method } => self.method_ref(*kind, method),
        }
    }

    fn insn(&mut self, insn: &Insn) -> Result<(), TraceError> {
        match insn {
            Insn::Invoke { kind, method } => self.method_ref(*kind, method),
            Insn::FieldAccess { kind, field } => self.field_ref(*kind, field),
            Insn::NewInstance(ty) => {
                self.check(ty)?;
                let base = ty.base_type();
                if base.is_class() {
                    self.visitor.on_new_instance(&base);
                }
                Ok(())
            }
            Insn::InstanceOf(ty) => {
                self.check(ty)?;
                let base = ty.base_type();
                if base.is_class() {
                    self.visitor.on_instance_of(&base);
                }
                Ok(())
            }
            Insn::InitClass(ty) => {
                self.check(ty)?;
                let base = ty.base_type();
                if base.is_class() {
                    self.visitor.on_init_class(&base);
                }
                Ok(())
            }
            Insn::NewArray(ty) | Insn::CheckCast(ty) | Insn::ConstClass(ty) => self.ty(ty),
            Insn::ConstMethodHandle(handle) => self.handle(handle),
            Insn::ConstMethodType(proto) => self.proto(proto),
            Insn::Opaque => Ok(()),
        }
    }

    fn annotation(&mut self, annotation: &Annotation) -> Result<(), TraceError> {
        self.ty(&annotation.annotation_type)?;
        for element in &annotation.elements {
            self.value(&element.value)?;
        }
        Ok(())
    }

    fn value(&mut self, value: &Value) -> Result<(), TraceError> {
        match value {
            Value::Type(ty) => self.ty(ty),
            // Enum constants and plain field values are static reads of the
            // holding field.
            Value::EnumConstant(field) | Value::Field(field) => {
                self.field_ref(FieldAccessKind::StaticGet, field)
            }
            // Values carry no dispatch; static is the closest kind.
            Value::Method(method) => self.method_ref(InvokeKind::Static, method),
            Value::MethodHandle(handle) => self.handle(handle),
            Value::MethodType(proto) => self.proto(proto),
            Value::Annotation(annotation) => self.annotation(annotation),
            Value::Array(values) => {
                for value in values {
                    self.value(value)?;
                }
                Ok(())
            }
            Value::Primitive => Ok(()),
        }
    }
}
