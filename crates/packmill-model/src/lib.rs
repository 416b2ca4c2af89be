//! packmill-model: the in-memory program model shared by the packmill passes.
//!
//! A [`Program`] is an arena-backed graph of class, field and method
//! definitions with typed references between them. Passes consume it
//! read-only and produce replacement programs through [`ProgramBuilder`];
//! definitions are never mutated in place once built.
//!
//! The crate also owns the two seams every rewriting pass is built against:
//!
//! - [`trace::UseVisitor`]: enumerate every outgoing reference of a
//!   definition, including references buried in annotation values, method
//!   handles and array types.
//! - [`lens::Lens`]: the immutable, composable original-to-renamed mapping a
//!   rewriting pass hands to downstream consumers.

pub mod access;
pub mod body;
pub mod builder;
pub mod class;
pub mod error;
pub mod identity;
pub mod keep;
pub mod lens;
pub mod packages;
pub mod program;
pub mod trace;
pub mod values;

pub use access::{AccessFlags, Visibility};
pub use body::{FieldAccessKind, Insn, InvokeKind, MethodHandle};
pub use builder::{ClassBuilder, ProgramBuilder};
pub use class::{ClassDef, EnclosingMethodAttr, FieldDef, InnerClassAttr, MethodDef};
pub use error::ModelError;
pub use identity::{FieldRef, MethodRef, Proto, TypeRef};
pub use keep::{ItemRef, KeepNone, KeepPredicate};
pub use lens::{Lens, RepackagingLens, RepackagingLensBuilder};
pub use packages::{Package, Packages};
pub use program::{ClassId, FieldId, ItemId, MethodId, Program, Resolution};
pub use values::{Annotation, AnnotationElement, Value};
