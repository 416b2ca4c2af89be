//! The repackaging decision engine.
//!
//! Packages are decided sequentially; only the per-method constraint tracing
//! inside a package runs in parallel. All decisions accumulate into one
//! global old→new type mapping, and nothing is rewritten until every package
//! has been decided.

use crate::error::RepackageError;
use crate::mapping::TypeMapping;
use crate::naming::{is_valid_package_descriptor, RepackagingConfiguration};
use crate::RepackageSummary;
use packmill_analysis_constraints::{ConstraintGraph, Executor};
use packmill_model::identity::INNER_CLASS_SEPARATOR;
use packmill_model::keep::{ItemRef, KeepPredicate};
use packmill_model::{ClassId, Package, Packages, Program, TypeRef};
use rustc_hash::FxHashSet;
use tracing::{debug, info};

pub(crate) struct DecisionEngine<'a> {
    pub program: &'a Program,
    pub config: &'a dyn RepackagingConfiguration,
    pub keep: &'a dyn KeepPredicate,
}

impl DecisionEngine<'_> {
    /// Decide a destination for every class. Returns the accumulated type
    /// mapping, identity entries included.
    pub fn compute_mapping(
        &self,
        executor: &impl Executor,
        summary: &mut RepackageSummary,
    ) -> Result<TypeMapping, RepackageError> {
        let mut packages = Packages::group(self.program);
        summary.packages_seen = packages.len();

        let mut seen_packages: FxHashSet<String> = FxHashSet::default();
        let mut mapping = TypeMapping::default();

        // Phase 1: packages already at their destination. Their pinned
        // classes are committed as identity entries so collision checks see
        // those names as occupied; the package then leaves the worklist.
        let descriptors: Vec<String> =
            packages.iter().map(|p| p.descriptor().to_string()).collect();
        for descriptor in descriptors {
            let package = match packages.iter().find(|p| p.descriptor() == descriptor) {
                Some(package) => package,
                None => continue,
            };
            let destination = self.config.new_package_descriptor(package, &seen_packages);
            if !is_valid_package_descriptor(&destination) {
                return Err(RepackageError::InvalidPackageDescriptor(destination));
            }
            if destination == package.descriptor() {
                debug!(package = package.descriptor(), "package already at destination");
                package.for_each_class(self.program, |_, class| {
                    if self.keep.is_pinned(ItemRef::Class(class)) {
                        mapping.insert(class.ty.clone(), class.ty.clone());
                    }
                });
                seen_packages.insert(destination);
                packages.remove(&descriptor);
            }
        }

        // Phase 2: constraint-driven moves for everything else.
        for package in packages.into_iter() {
            let destination = self.config.new_package_descriptor(&package, &seen_packages);
            if !is_valid_package_descriptor(&destination) {
                return Err(RepackageError::InvalidPackageDescriptor(destination));
            }

            let movable = self.compute_movable(&package, executor)?;
            let movable_set: FxHashSet<ClassId> = movable.iter().copied().collect();
            summary.classes_held += package.classes().len() - movable.len();

            info!(
                package = package.descriptor(),
                destination = destination.as_str(),
                movable = movable.len(),
                held = package.classes().len() - movable.len(),
                "package decided"
            );

            for &class_id in &movable {
                self.repackage_class(class_id, &movable_set, &package, &destination, &mut mapping);
            }
            seen_packages.insert(destination);
        }

        Ok(mapping)
    }

    fn compute_movable(
        &self,
        package: &Package,
        executor: &impl Executor,
    ) -> Result<Vec<ClassId>, RepackageError> {
        let mut graph = ConstraintGraph::new(self.program);
        if !graph.initialize(package, self.keep) {
            graph.populate_constraints(package, executor)?;
        }
        Ok(graph.compute_repackagable_classes(self.keep))
    }

    /// Pick a destination for one movable class, its outer class first so
    /// inner/outer renames stay consistent.
    fn repackage_class(
        &self,
        class_id: ClassId,
        movable: &FxHashSet<ClassId>,
        package: &Package,
        destination: &str,
        mapping: &mut TypeMapping,
    ) {
        let class = self.program.class(class_id);
        if mapping.contains_source(&class.ty) {
            return;
        }
        let mut outer = None;
        if let Some(outer_ty) = class.outer_type() {
            if let Some(outer_id) = self.program.class_by_type(outer_ty) {
                if package.contains(outer_id) && movable.contains(&outer_id) {
                    self.repackage_class(outer_id, movable, package, destination, mapping);
                    outer = Some(self.program.class(outer_id));
                }
            }
        }
        let candidate = self.config.repackaged_type(class, outer, destination, mapping);
        let chosen = self.next_available_type(&class.ty, &candidate, mapping);
        mapping.insert(class.ty.clone(), chosen);
    }

    /// Engine-side collision guard over whatever the strategy returned:
    /// a destination is occupied if some other source already claimed it, or
    /// if a program class that has not been given a destination still owns
    /// the name. Each retry bumps a strictly increasing counter, so the loop
    /// terminates.
    fn next_available_type(
        &self,
        source: &TypeRef,
        candidate: &TypeRef,
        mapping: &TypeMapping,
    ) -> TypeRef {
        let occupied = |ty: &TypeRef| {
            if mapping.is_destination(ty) {
                return true;
            }
            match self.program.class_by_type(ty) {
                Some(id) => {
                    let resident = &self.program.class(id).ty;
                    resident != source && !mapping.contains_source(resident)
                }
                None => false,
            }
        };
        if !occupied(candidate) {
            return candidate.clone();
        }
        let mut counter = 1usize;
        loop {
            let attempt = TypeRef::class(&format!(
                "{}{INNER_CLASS_SEPARATOR}{counter}",
                candidate.binary_name()
            ));
            if !occupied(&attempt) {
                return attempt;
            }
            counter += 1;
        }
    }
}
