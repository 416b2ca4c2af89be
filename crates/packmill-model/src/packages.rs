//! Grouping of a program's classes by originating package.
//!
//! The grouping is a read view, recomputed per run; packages iterate in
//! sorted descriptor order and member classes in sorted type order so every
//! pass over the same program is deterministic.

use crate::class::{ClassDef, FieldDef, MethodDef};
use crate::program::{ClassId, Program};
use rustc_hash::FxHashMap;

/// The classes of one package.
#[derive(Clone, Debug)]
pub struct Package {
    descriptor: String,
    classes: Vec<ClassId>,
}

impl Package {
    /// The package in binary form, e.g. `a/b`; empty for the default package.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn classes(&self) -> &[ClassId] {
        &self.classes
    }

    pub fn contains(&self, id: ClassId) -> bool {
        self.classes.contains(&id)
    }

    pub fn for_each_class(&self, program: &Program, mut visitor: impl FnMut(ClassId, &ClassDef)) {
        for &id in &self.classes {
            visitor(id, program.class(id));
        }
    }

    pub fn for_each_field(&self, program: &Program, mut visitor: impl FnMut(&FieldDef)) {
        for &id in &self.classes {
            for &field_id in &program.class(id).fields {
                visitor(program.field(field_id));
            }
        }
    }

    pub fn for_each_method(&self, program: &Program, mut visitor: impl FnMut(&MethodDef)) {
        for &id in &self.classes {
            for &method_id in &program.class(id).methods {
                visitor(program.method(method_id));
            }
        }
    }
}

/// All packages of a program, in sorted descriptor order.
pub struct Packages {
    packages: Vec<Package>,
}

impl Packages {
    pub fn group(program: &Program) -> Packages {
        let mut by_descriptor: FxHashMap<String, Vec<ClassId>> = FxHashMap::default();
        for id in program.classes_sorted() {
            let descriptor = program.class(id).ty.package().to_string();
            by_descriptor.entry(descriptor).or_default().push(id);
        }
        let mut packages: Vec<Package> = by_descriptor
            .into_iter()
            .map(|(descriptor, classes)| Package { descriptor, classes })
            .collect();
        packages.sort_by(|a, b| a.descriptor.cmp(&b.descriptor));
        Packages { packages }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Package> {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Remove and return a processed package.
    pub fn remove(&mut self, descriptor: &str) -> Option<Package> {
        let idx = self.packages.iter().position(|p| p.descriptor == descriptor)?;
        Some(self.packages.remove(idx))
    }

    /// Drain all packages in order, consuming the view.
    pub fn into_iter(self) -> impl Iterator<Item = Package> {
        self.packages.into_iter()
    }
}
