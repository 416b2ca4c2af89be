//! Annotations and annotation element values.

use crate::body::MethodHandle;
use crate::identity::{FieldRef, MethodRef, Proto, TypeRef};
use serde::{Deserialize, Serialize};

/// An annotation instance on a class, field or method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub annotation_type: TypeRef,
    pub elements: Vec<AnnotationElement>,
}

impl Annotation {
    pub fn new(annotation_type: TypeRef) -> Annotation {
        Annotation { annotation_type, elements: Vec::new() }
    }

    pub fn with_element(mut self, name: impl Into<String>, value: Value) -> Annotation {
        self.elements.push(AnnotationElement { name: name.into(), value });
        self
    }
}

/// A named element inside an annotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationElement {
    pub name: String,
    pub value: Value,
}

/// An annotation element value.
///
/// The composite variants nest arbitrarily; consumers must recurse all the
/// way down or they will miss references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Type(TypeRef),
    /// An enum constant, referenced as the field holding it.
    EnumConstant(FieldRef),
    Field(FieldRef),
    Method(MethodRef),
    MethodHandle(MethodHandle),
    MethodType(Proto),
    Annotation(Annotation),
    Array(Vec<Value>),
    /// Strings, numbers, booleans: no outgoing references.
    Primitive,
}
