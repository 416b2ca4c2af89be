//! Construction of programs.
//!
//! The builder is the seam the bytecode parser feeds, and the tree fixer
//! assembles replacement programs through it as well. Duplicate identities
//! are rejected at insertion time so a program can never hold two
//! definitions with the same signature.

use crate::access::AccessFlags;
use crate::class::{ClassDef, EnclosingMethodAttr, FieldDef, InnerClassAttr, MethodDef};
use crate::error::ModelError;
use crate::identity::TypeRef;
use crate::program::{ClassId, Program};
use crate::values::Annotation;

/// Owned data for one class plus its members, before arena insertion.
#[derive(Clone, Debug)]
pub struct ClassBuilder {
    pub ty: TypeRef,
    pub access: AccessFlags,
    pub super_type: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    pub inner_classes: Vec<InnerClassAttr>,
    pub enclosing_method: Option<EnclosingMethodAttr>,
    pub nest_host: Option<TypeRef>,
    pub nest_members: Vec<TypeRef>,
    pub permitted_subclasses: Vec<TypeRef>,
    pub synthesized_from: Vec<TypeRef>,
    pub annotations: Vec<Annotation>,
}

impl ClassBuilder {
    pub fn new(ty: TypeRef, access: AccessFlags) -> ClassBuilder {
        ClassBuilder {
            ty,
            access,
            super_type: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            inner_classes: Vec::new(),
            enclosing_method: None,
            nest_host: None,
            nest_members: Vec::new(),
            permitted_subclasses: Vec::new(),
            synthesized_from: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn extends(mut self, super_type: TypeRef) -> ClassBuilder {
        self.super_type = Some(super_type);
        self
    }

    pub fn implements(mut self, interface: TypeRef) -> ClassBuilder {
        self.interfaces.push(interface);
        self
    }

    pub fn field(mut self, field: FieldDef) -> ClassBuilder {
        self.fields.push(field);
        self
    }

    pub fn method(mut self, method: MethodDef) -> ClassBuilder {
        self.methods.push(method);
        self
    }

    pub fn inner_class(mut self, attr: InnerClassAttr) -> ClassBuilder {
        self.inner_classes.push(attr);
        self
    }

    pub fn enclosed_by(mut self, attr: EnclosingMethodAttr) -> ClassBuilder {
        self.enclosing_method = Some(attr);
        self
    }

    pub fn nest_host(mut self, host: TypeRef) -> ClassBuilder {
        self.nest_host = Some(host);
        self
    }

    pub fn nest_member(mut self, member: TypeRef) -> ClassBuilder {
        self.nest_members.push(member);
        self
    }

    pub fn permits(mut self, subclass: TypeRef) -> ClassBuilder {
        self.permitted_subclasses.push(subclass);
        self
    }

    pub fn synthesized_from(mut self, origin: TypeRef) -> ClassBuilder {
        self.synthesized_from.push(origin);
        self
    }

    pub fn annotation(mut self, annotation: Annotation) -> ClassBuilder {
        self.annotations.push(annotation);
        self
    }
}

/// Incrementally builds a [`Program`].
#[derive(Default)]
pub struct ProgramBuilder {
    program: Program,
}

impl ProgramBuilder {
    pub fn new() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    /// Insert a class and its members. Member refs whose holder differs from
    /// the class type are rejected; so are duplicate identities.
    pub fn add_class(&mut self, class: ClassBuilder) -> Result<ClassId, ModelError> {
        if self.program.class_index.contains_key(&class.ty) {
            return Err(ModelError::DuplicateClass(class.ty));
        }
        for field in &class.fields {
            if field.field.holder != class.ty {
                return Err(ModelError::ForeignMember {
                    class: class.ty.clone(),
                    member: field.field.to_string(),
                });
            }
            if self.program.field_index.contains_key(&field.field) {
                return Err(ModelError::DuplicateField(field.field.clone()));
            }
        }
        for method in &class.methods {
            if method.method.holder != class.ty {
                return Err(ModelError::ForeignMember {
                    class: class.ty.clone(),
                    member: method.method.to_string(),
                });
            }
            if self.program.method_index.contains_key(&method.method) {
                return Err(ModelError::DuplicateMethod(method.method.clone()));
            }
        }

        let mut field_ids = Vec::with_capacity(class.fields.len());
        for field in class.fields {
            let key = field.field.clone();
            let id = self.program.fields.alloc(field);
            self.program.field_index.insert(key, id);
            field_ids.push(id);
        }
        let mut method_ids = Vec::with_capacity(class.methods.len());
        for method in class.methods {
            let key = method.method.clone();
            let id = self.program.methods.alloc(method);
            self.program.method_index.insert(key, id);
            method_ids.push(id);
        }

        let ty = class.ty.clone();
        let id = self.program.classes.alloc(ClassDef {
            ty: class.ty,
            access: class.access,
            super_type: class.super_type,
            interfaces: class.interfaces,
            fields: field_ids,
            methods: method_ids,
            inner_classes: class.inner_classes,
            enclosing_method: class.enclosing_method,
            nest_host: class.nest_host,
            nest_members: class.nest_members,
            permitted_subclasses: class.permitted_subclasses,
            synthesized_from: class.synthesized_from,
            annotations: class.annotations,
        });
        self.program.class_index.insert(ty, id);
        Ok(id)
    }

    pub fn build(self) -> Program {
        self.program
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::FieldRef;

    #[test]
    fn duplicate_class_rejected() {
        let mut builder = ProgramBuilder::new();
        builder
            .add_class(ClassBuilder::new(TypeRef::class("a/X"), AccessFlags::public()))
            .unwrap();
        let err = builder
            .add_class(ClassBuilder::new(TypeRef::class("a/X"), AccessFlags::public()))
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateClass(_)));
    }

    #[test]
    fn foreign_member_rejected() {
        let mut builder = ProgramBuilder::new();
        let err = builder
            .add_class(
                ClassBuilder::new(TypeRef::class("a/X"), AccessFlags::public()).field(
                    FieldDef::new(
                        FieldRef::new(
                            TypeRef::class("a/Y"),
                            "f",
                            TypeRef::primitive('I'),
                        ),
                        AccessFlags::package_private(),
                    ),
                ),
            )
            .unwrap_err();
        assert!(matches!(err, ModelError::ForeignMember { .. }));
    }
}
