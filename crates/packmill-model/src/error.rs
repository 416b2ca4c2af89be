//! Error types for program construction.

use crate::identity::{FieldRef, MethodRef, TypeRef};
use thiserror::Error;

/// Errors raised while assembling a program.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("duplicate class definition: {0}")]
    DuplicateClass(TypeRef),

    #[error("duplicate field definition: {0}")]
    DuplicateField(FieldRef),

    #[error("duplicate method definition: {0}")]
    DuplicateMethod(MethodRef),

    #[error("member {member} does not belong to class {class}")]
    ForeignMember { class: TypeRef, member: String },
}
