//! Method body representation.
//!
//! Bodies are kept as flat instruction lists carrying only what the analysis
//! passes need: the outgoing references and their kinds. Operand stacks,
//! registers and control flow are deliberately absent.

use crate::identity::{FieldRef, MethodRef, Proto, TypeRef};
use serde::{Deserialize, Serialize};

/// Dispatch kind of a method invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvokeKind {
    Virtual,
    Static,
    Direct,
    Interface,
    Super,
}

/// Kind of a field access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldAccessKind {
    InstanceGet,
    InstancePut,
    StaticGet,
    StaticPut,
}

/// A loaded method handle, as found in `const-method-handle` payloads and
/// annotation values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodHandle {
    Field { kind: FieldAccessKind, field: FieldRef },
    Method { kind: InvokeKind, method: MethodRef },
}

/// One instruction of a method body, reduced to its reference payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Insn {
    Invoke { kind: InvokeKind, method: MethodRef },
    FieldAccess { kind: FieldAccessKind, field: FieldRef },
    NewInstance(TypeRef),
    NewArray(TypeRef),
    InstanceOf(TypeRef),
    CheckCast(TypeRef),
    ConstClass(TypeRef),
    /// Explicit class initialization barrier.
    InitClass(TypeRef),
    ConstMethodHandle(MethodHandle),
    ConstMethodType(Proto),
    /// Anything with no outgoing reference.
    Opaque,
}
