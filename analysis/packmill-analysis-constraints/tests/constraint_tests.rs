//! Integration tests for the per-package constraint graph.

use packmill_analysis_constraints::{ConstraintGraph, SequentialExecutor};
use packmill_model::keep::{ItemRef, KeepNone};
use packmill_model::{
    AccessFlags, ClassBuilder, EnclosingMethodAttr, Insn, InnerClassAttr, InvokeKind, MethodDef,
    MethodRef, Package, Packages, Program, ProgramBuilder, Proto, TypeRef,
};

fn void_proto() -> Proto {
    Proto::new(TypeRef::primitive('V'), vec![])
}

fn call(holder: &str, name: &str) -> Insn {
    Insn::Invoke {
        kind: InvokeKind::Virtual,
        method: MethodRef::new(TypeRef::class(holder), name, void_proto()),
    }
}

fn package<'a>(packages: &'a Packages, descriptor: &str) -> &'a Package {
    packages
        .iter()
        .find(|p| p.descriptor() == descriptor)
        .expect("package missing")
}

fn names(program: &Program, ids: &[packmill_model::ClassId]) -> Vec<String> {
    ids.iter().map(|&id| program.class(id).ty.to_string()).collect()
}

/// a/X is pinned and package-private; a/Y calls a package-private method on
/// it, a/Z has no interaction. Only Z may leave.
#[test]
fn package_private_call_holds_caller() {
    let mut builder = ProgramBuilder::new();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/X"), AccessFlags::package_private()).method(
                MethodDef::new(
                    MethodRef::new(TypeRef::class("a/X"), "hidden", void_proto()),
                    AccessFlags::package_private(),
                ),
            ),
        )
        .unwrap();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/Y"), AccessFlags::public()).method(
                MethodDef::new(
                    MethodRef::new(TypeRef::class("a/Y"), "caller", void_proto()),
                    AccessFlags::public(),
                )
                .with_body(vec![call("a/X", "hidden")]),
            ),
        )
        .unwrap();
    builder
        .add_class(ClassBuilder::new(TypeRef::class("a/Z"), AccessFlags::public()))
        .unwrap();
    let program = builder.build();

    let pin_x = |item: ItemRef<'_>| {
        matches!(item, ItemRef::Class(class) if class.ty == TypeRef::class("a/X"))
    };

    let packages = Packages::group(&program);
    let pkg = package(&packages, "a");
    let mut graph = ConstraintGraph::new(&program);
    assert!(!graph.initialize(pkg, &pin_x));
    graph.populate_constraints(pkg, &SequentialExecutor).unwrap();

    let movable = graph.compute_repackagable_classes(&pin_x);
    assert_eq!(names(&program, &movable), vec!["La/Z;".to_string()]);
}

/// With nothing pinned the fast path licenses skipping tracing entirely.
#[test]
fn unpinned_package_takes_fast_path() {
    let mut builder = ProgramBuilder::new();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/X"), AccessFlags::package_private()).method(
                MethodDef::new(
                    MethodRef::new(TypeRef::class("a/X"), "hidden", void_proto()),
                    AccessFlags::package_private(),
                ),
            ),
        )
        .unwrap();
    builder
        .add_class(ClassBuilder::new(TypeRef::class("a/Y"), AccessFlags::public()))
        .unwrap();
    let program = builder.build();

    let packages = Packages::group(&program);
    let pkg = package(&packages, "a");
    let mut graph = ConstraintGraph::new(&program);
    assert!(graph.initialize(pkg, &KeepNone));

    let movable = graph.compute_repackagable_classes(&KeepNone);
    assert_eq!(movable.len(), 2);
}

/// A pinned public class still disables the fast path: its package-private
/// members can pin callers.
#[test]
fn pinned_public_class_disables_fast_path() {
    let mut builder = ProgramBuilder::new();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/X"), AccessFlags::public()).method(
                MethodDef::new(
                    MethodRef::new(TypeRef::class("a/X"), "hidden", void_proto()),
                    AccessFlags::package_private(),
                ),
            ),
        )
        .unwrap();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/Y"), AccessFlags::public()).method(
                MethodDef::new(
                    MethodRef::new(TypeRef::class("a/Y"), "caller", void_proto()),
                    AccessFlags::public(),
                )
                .with_body(vec![call("a/X", "hidden")]),
            ),
        )
        .unwrap();
    let program = builder.build();

    let pin_x = |item: ItemRef<'_>| {
        matches!(item, ItemRef::Class(class) if class.ty == TypeRef::class("a/X"))
    };

    let packages = Packages::group(&program);
    let pkg = package(&packages, "a");
    let mut graph = ConstraintGraph::new(&program);
    assert!(!graph.initialize(pkg, &pin_x));
    graph.populate_constraints(pkg, &SequentialExecutor).unwrap();

    // Y depends on X.hidden surviving in the same package, so Y is held.
    assert!(graph.compute_repackagable_classes(&pin_x).is_empty());
}

/// Protected access from a subtype does not constrain; from a non-subtype it
/// does.
#[test]
fn protected_access_subtype_exemption() {
    let mut builder = ProgramBuilder::new();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/Base"), AccessFlags::public()).method(
                MethodDef::new(
                    MethodRef::new(TypeRef::class("a/Base"), "guarded", void_proto()),
                    AccessFlags::protected(),
                ),
            ),
        )
        .unwrap();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/Sub"), AccessFlags::public())
                .extends(TypeRef::class("a/Base"))
                .method(
                    MethodDef::new(
                        MethodRef::new(TypeRef::class("a/Sub"), "viaInheritance", void_proto()),
                        AccessFlags::public(),
                    )
                    .with_body(vec![call("a/Base", "guarded")]),
                ),
        )
        .unwrap();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/Stranger"), AccessFlags::public()).method(
                MethodDef::new(
                    MethodRef::new(TypeRef::class("a/Stranger"), "viaPackage", void_proto()),
                    AccessFlags::public(),
                )
                .with_body(vec![call("a/Base", "guarded")]),
            ),
        )
        .unwrap();
    let program = builder.build();

    let pin_base = |item: ItemRef<'_>| {
        matches!(item, ItemRef::Class(class) if class.ty == TypeRef::class("a/Base"))
    };

    let packages = Packages::group(&program);
    let pkg = package(&packages, "a");
    let mut graph = ConstraintGraph::new(&program);
    assert!(!graph.initialize(pkg, &pin_base));
    graph.populate_constraints(pkg, &SequentialExecutor).unwrap();

    // Sub reaches guarded as a subtype and stays free; Stranger only reaches
    // it through the shared package and is held.
    let movable = names(&program, &graph.compute_repackagable_classes(&pin_base));
    assert_eq!(movable, vec!["La/Sub;".to_string()]);
}

/// Inner-class and enclosing-method links always force co-location, even
/// between public classes.
#[test]
fn attribute_links_force_co_location() {
    let mut builder = ProgramBuilder::new();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/Outer"), AccessFlags::public()).inner_class(
                InnerClassAttr {
                    inner: TypeRef::class("a/Outer$Inner"),
                    outer: Some(TypeRef::class("a/Outer")),
                    inner_name: Some("Inner".to_string()),
                },
            ),
        )
        .unwrap();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/Outer$Inner"), AccessFlags::public())
                .inner_class(InnerClassAttr {
                    inner: TypeRef::class("a/Outer$Inner"),
                    outer: Some(TypeRef::class("a/Outer")),
                    inner_name: Some("Inner".to_string()),
                })
                .enclosed_by(EnclosingMethodAttr::Method(MethodRef::new(
                    TypeRef::class("a/Outer"),
                    "make",
                    void_proto(),
                ))),
        )
        .unwrap();
    builder
        .add_class(ClassBuilder::new(TypeRef::class("a/Free"), AccessFlags::public()))
        .unwrap();
    let program = builder.build();

    let pin_outer = |item: ItemRef<'_>| {
        matches!(item, ItemRef::Class(class) if class.ty == TypeRef::class("a/Outer"))
    };

    let packages = Packages::group(&program);
    let pkg = package(&packages, "a");
    let mut graph = ConstraintGraph::new(&program);
    assert!(!graph.initialize(pkg, &pin_outer));
    graph.populate_constraints(pkg, &SequentialExecutor).unwrap();

    // Inner is chained to the pinned Outer through its attributes; Free is not.
    let movable = names(&program, &graph.compute_repackagable_classes(&pin_outer));
    assert_eq!(movable, vec!["La/Free;".to_string()]);
}

/// References into classes outside the program add no constraints.
#[test]
fn library_references_are_ignored() {
    let mut builder = ProgramBuilder::new();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/X"), AccessFlags::public()).method(
                MethodDef::new(
                    MethodRef::new(TypeRef::class("a/X"), "m", void_proto()),
                    AccessFlags::public(),
                )
                .with_body(vec![call("java/lang/Object", "toString")]),
            ),
        )
        .unwrap();
    builder
        .add_class(
            ClassBuilder::new(TypeRef::class("a/Pinned"), AccessFlags::package_private()),
        )
        .unwrap();
    let program = builder.build();

    let pin = |item: ItemRef<'_>| {
        matches!(item, ItemRef::Class(class) if class.ty == TypeRef::class("a/Pinned"))
    };

    let packages = Packages::group(&program);
    let pkg = package(&packages, "a");
    let mut graph = ConstraintGraph::new(&program);
    assert!(!graph.initialize(pkg, &pin));
    graph.populate_constraints(pkg, &SequentialExecutor).unwrap();

    let movable = names(&program, &graph.compute_repackagable_classes(&pin));
    assert_eq!(movable, vec!["La/X;".to_string()]);
}
