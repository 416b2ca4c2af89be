//! Destination naming.
//!
//! The naming strategy is pluggable: the engine hands it the package (and,
//! for inner classes, the already-relocated outer class) and gets concrete
//! destinations back. Strategies must be deterministic for identical inputs
//! and must consult the sets they are given; the engine still guards every
//! returned type with its own disambiguation loop.

use crate::mapping::TypeMapping;
use packmill_model::identity::INNER_CLASS_SEPARATOR;
use packmill_model::{ClassDef, Package, TypeRef};
use rustc_hash::FxHashSet;

/// How source packages are laid out under the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackagingMode {
    /// Every package collapses into the single destination package.
    RepackageToSingle,
    /// Each source package becomes its own subpackage of the destination,
    /// named after its last segment and disambiguated on collision.
    FlattenHierarchy,
}

/// Decides destination packages and types.
pub trait RepackagingConfiguration {
    /// The destination package for `package`, in binary form.
    ///
    /// `seen` holds every destination descriptor already emitted this run;
    /// strategies that keep packages distinct must avoid it.
    fn new_package_descriptor(&self, package: &Package, seen: &FxHashSet<String>) -> String;

    /// The destination type for one movable class.
    ///
    /// `outer` is present when the class is an inner class whose outer class
    /// has already been relocated by this run; the mapping then holds the
    /// outer's destination and the returned type is expected to preserve the
    /// `Outer$Inner` relationship. Must never return a type already in the
    /// mapping's image for a different source; the engine retries with a
    /// numeric suffix if it does.
    fn repackaged_type(
        &self,
        class: &ClassDef,
        outer: Option<&ClassDef>,
        new_package: &str,
        mapping: &TypeMapping,
    ) -> TypeRef;
}

/// The stock strategy: single-package collapse or hierarchy flattening.
pub struct DefaultRepackagingConfiguration {
    destination: String,
    mode: PackagingMode,
}

impl DefaultRepackagingConfiguration {
    pub fn new(destination: impl Into<String>, mode: PackagingMode) -> DefaultRepackagingConfiguration {
        DefaultRepackagingConfiguration { destination: destination.into(), mode }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

impl RepackagingConfiguration for DefaultRepackagingConfiguration {
    fn new_package_descriptor(&self, package: &Package, seen: &FxHashSet<String>) -> String {
        if self.mode == PackagingMode::RepackageToSingle {
            return self.destination.clone();
        }
        let last_segment = package
            .descriptor()
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty());
        let candidate = match (self.destination.is_empty(), last_segment) {
            (_, None) => self.destination.clone(),
            (true, Some(segment)) => segment.to_string(),
            (false, Some(segment)) => format!("{}/{segment}", self.destination),
        };
        disambiguate_package(&candidate, seen)
    }

    fn repackaged_type(
        &self,
        class: &ClassDef,
        outer: Option<&ClassDef>,
        new_package: &str,
        mapping: &TypeMapping,
    ) -> TypeRef {
        let relocated = class.ty.with_package(new_package);
        let candidate = match outer.and_then(|o| mapping.get(&o.ty).map(|new| (o, new))) {
            Some((outer_class, new_outer)) if class.has_conventional_inner_name(&outer_class.ty) => {
                // Rebuild the simple name on the outer's new name so the
                // Outer$Inner convention survives the move.
                let suffix = &class.ty.simple_name()[outer_class.ty.simple_name().len()..];
                let new_simple = format!("{}{suffix}", new_outer.simple_name());
                TypeRef::class(&qualify(new_outer.package(), &new_simple))
            }
            _ => relocated,
        };
        disambiguate_type(&candidate, mapping)
    }
}

/// Append `$1`, `$2`, ... until the descriptor is unused.
pub fn disambiguate_package(candidate: &str, seen: &FxHashSet<String>) -> String {
    if !seen.contains(candidate) {
        return candidate.to_string();
    }
    let mut counter = 1usize;
    loop {
        let attempt = format!("{candidate}{INNER_CLASS_SEPARATOR}{counter}");
        if !seen.contains(&attempt) {
            return attempt;
        }
        counter += 1;
    }
}

/// Append `$1`, `$2`, ... to the simple name until the type is not already a
/// destination in the mapping.
pub fn disambiguate_type(candidate: &TypeRef, mapping: &TypeMapping) -> TypeRef {
    if !mapping.is_destination(candidate) {
        return candidate.clone();
    }
    let mut counter = 1usize;
    loop {
        let attempt = TypeRef::class(&format!(
            "{}{INNER_CLASS_SEPARATOR}{counter}",
            candidate.binary_name()
        ));
        if !mapping.is_destination(&attempt) {
            return attempt;
        }
        counter += 1;
    }
}

fn qualify(package: &str, simple_name: &str) -> String {
    if package.is_empty() {
        simple_name.to_string()
    } else {
        format!("{package}/{simple_name}")
    }
}

/// Binary package descriptor grammar: empty (the default package) or
/// `/`-separated non-empty segments free of descriptor metacharacters.
pub fn is_valid_package_descriptor(descriptor: &str) -> bool {
    descriptor.is_empty()
        || descriptor.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| !matches!(c, ';' | '[' | '.' | '<' | '>' | '(' | ')'))
        })
}
