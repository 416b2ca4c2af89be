//! The per-package co-location constraint graph.

use crate::error::ConstraintError;
use crate::executor::Executor;
use dashmap::DashSet;
use packmill_model::keep::{ItemRef, KeepPredicate};
use packmill_model::trace::{self, UseVisitor};
use packmill_model::{
    ClassId, EnclosingMethodAttr, FieldAccessKind, FieldRef, InvokeKind, ItemId, MethodRef,
    Package, Program, Resolution, TypeRef, Visibility,
};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use tracing::debug;

/// One node per class, field and method of the package under analysis.
struct Node {
    item: ItemId,
    /// Indexes of neighboring nodes. Undirected: every edge is present in
    /// both endpoints' sets. Concurrent tracers insert from both directions,
    /// so insertion must be insert-if-absent with no lost updates.
    neighbors: DashSet<usize>,
}

/// Builds and evaluates co-location constraints for a single package.
///
/// Lifetime: scoped to one package; discard after
/// [`ConstraintGraph::compute_repackagable_classes`].
pub struct ConstraintGraph<'p> {
    program: &'p Program,
    nodes: Vec<Node>,
    node_index: FxHashMap<ItemId, usize>,
    /// Nodes whose definitions are pinned by keep rules; traversal roots.
    pinned: Vec<usize>,
    /// Set when the cheap pre-check found no pinned item in the package;
    /// tracing is skipped entirely.
    everything_movable: bool,
}

impl<'p> ConstraintGraph<'p> {
    pub fn new(program: &'p Program) -> ConstraintGraph<'p> {
        ConstraintGraph {
            program,
            nodes: Vec::new(),
            node_index: FxHashMap::default(),
            pinned: Vec::new(),
            everything_movable: false,
        }
    }

    /// Insert one node per class and member of `package`.
    ///
    /// Returns `true` when the package holds no pinned item at all: the
    /// whole package then moves as one unit, co-location is trivially
    /// preserved, and the expensive tracing step is skipped. With any pinned
    /// item present the fast path is off: even a public pinned class can
    /// hold package-sensitive members that movers depend on. A conservative,
    /// cheap pre-check, not the final answer.
    pub fn initialize(&mut self, package: &Package, keep: &dyn KeepPredicate) -> bool {
        for &class_id in package.classes() {
            let class = self.program.class(class_id);
            let class_node = self.insert(ItemId::Class(class_id));
            if keep.is_pinned(ItemRef::Class(class)) {
                self.pinned.push(class_node);
            }
            // Members live and move with their class: tie their nodes to the
            // class node so pinning propagates both ways.
            for &field_id in &class.fields {
                let field = self.program.field(field_id);
                let node = self.insert(ItemId::Field(field_id));
                self.add_edge(class_node, node);
                if keep.is_pinned(ItemRef::Field(field)) {
                    self.pinned.push(node);
                }
            }
            for &method_id in &class.methods {
                let method = self.program.method(method_id);
                let node = self.insert(ItemId::Method(method_id));
                self.add_edge(class_node, node);
                if keep.is_pinned(ItemRef::Method(method)) {
                    self.pinned.push(node);
                }
            }
        }
        self.everything_movable = self.pinned.is_empty();
        debug!(
            package = package.descriptor(),
            nodes = self.nodes.len(),
            pinned = self.pinned.len(),
            fast_path = self.everything_movable,
            "constraint graph initialized"
        );
        self.everything_movable
    }

    fn insert(&mut self, item: ItemId) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node { item, neighbors: DashSet::new() });
        self.node_index.insert(item, index);
        index
    }

    /// Trace every definition of the package and record co-location edges.
    ///
    /// Class and field definitions are traced inline; method bodies run as
    /// independent executor jobs. A tracing failure anywhere aborts: an
    /// under-approximated graph could license an illegal move.
    pub fn populate_constraints(
        &self,
        package: &Package,
        executor: &impl Executor,
    ) -> Result<(), ConstraintError> {
        // Attribute links first: enclosing-method and inner-class pairs are
        // forced together regardless of visibility, since splitting them
        // corrupts reflection metadata even when access checks still pass.
        for &class_id in package.classes() {
            let class = self.program.class(class_id);
            let class_node = self.node_index[&ItemId::Class(class_id)];
            for attr in &class.inner_classes {
                self.register_forced_type_link(class_node, &attr.inner);
                if let Some(outer) = &attr.outer {
                    self.register_forced_type_link(class_node, outer);
                }
            }
            match &class.enclosing_method {
                Some(EnclosingMethodAttr::Class(ty)) => {
                    self.register_forced_type_link(class_node, ty);
                }
                Some(EnclosingMethodAttr::Method(method)) => {
                    self.register_forced_type_link(class_node, &method.holder);
                }
                None => {}
            }

            let mut registry = AccessRegistry {
                graph: self,
                node: class_node,
                context: class_id,
            };
            trace::trace_class(class, &mut registry)?;
            for &field_id in &class.fields {
                let field_node = self.node_index[&ItemId::Field(field_id)];
                let mut registry = AccessRegistry {
                    graph: self,
                    node: field_node,
                    context: class_id,
                };
                trace::trace_field(self.program.field(field_id), &mut registry)?;
            }
        }

        // Method bodies, concurrently. Jobs are collected in deterministic
        // order; edge sets make insertion order irrelevant to the outcome.
        let mut jobs: Vec<(usize, ClassId, packmill_model::MethodId)> = Vec::new();
        for &class_id in package.classes() {
            for &method_id in &self.program.class(class_id).methods {
                jobs.push((self.node_index[&ItemId::Method(method_id)], class_id, method_id));
            }
        }
        executor.run(jobs.len(), &|i| {
            let (node, context, method_id) = jobs[i];
            let mut registry = AccessRegistry { graph: self, node, context };
            trace::trace_method(self.program.method(method_id), &mut registry)
                .map_err(ConstraintError::from)
        })
    }

    /// Attribute-level link: always an edge when the referenced class is in
    /// this package.
    fn register_forced_type_link(&self, from: usize, ty: &TypeRef) {
        let Some(class_id) = self.program.class_by_type(&ty.base_type()) else {
            return;
        };
        if let Some(&target) = self.node_index.get(&ItemId::Class(class_id)) {
            self.add_edge(from, target);
        }
    }

    fn add_edge(&self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.nodes[a].neighbors.insert(b);
        self.nodes[b].neighbors.insert(a);
    }

    /// Whether `target_visibility` on `target_holder` is only accessible
    /// from `context` because the two currently share a package.
    fn is_package_dependent(
        &self,
        context: ClassId,
        target_holder: &TypeRef,
        target_visibility: Visibility,
    ) -> bool {
        match target_visibility {
            Visibility::PackagePrivate => true,
            Visibility::Protected => {
                let context_ty = &self.program.class(context).ty;
                !self.program.is_subtype(context_ty, target_holder)
            }
            Visibility::Public | Visibility::Private => false,
        }
    }

    fn register_type_access(&self, from: usize, context: ClassId, ty: &TypeRef) {
        let Some(class_id) = self.program.class_by_type(ty) else {
            // External reference: no program node, no constraint.
            return;
        };
        let Some(&target) = self.node_index.get(&ItemId::Class(class_id)) else {
            return;
        };
        let class = self.program.class(class_id);
        if self.is_package_dependent(context, &class.ty, class.access.visibility) {
            tracing::trace!(from = %self.program.class(context).ty, to = %class.ty, "type constraint");
            self.add_edge(from, target);
        }
    }

    fn register_member_access(
        &self,
        from: usize,
        context: ClassId,
        item: ItemId,
        holder: &TypeRef,
        visibility: Visibility,
        initial_holder: ClassId,
    ) {
        if let Some(&target) = self.node_index.get(&item) {
            if self.is_package_dependent(context, holder, visibility) {
                self.add_edge(from, target);
            }
        }
        // The initial lookup holder also pins the access: virtual dispatch
        // resolves through it, so its own visibility must survive the move.
        if let Some(&holder_node) = self.node_index.get(&ItemId::Class(initial_holder)) {
            let holder_class = self.program.class(initial_holder);
            if self.is_package_dependent(context, &holder_class.ty, holder_class.access.visibility)
            {
                self.add_edge(from, holder_node);
            }
        }
    }

    /// Classes free to leave the package: those with no direct or transitive
    /// co-location edge to any pinned definition.
    pub fn compute_repackagable_classes(&self, keep: &dyn KeepPredicate) -> Vec<ClassId> {
        let class_ids: Vec<ClassId> = self
            .nodes
            .iter()
            .filter_map(|node| match node.item {
                ItemId::Class(id) => Some(id),
                _ => None,
            })
            .collect();

        if self.everything_movable {
            return class_ids
                .into_iter()
                .filter(|&id| !keep.is_pinned(ItemRef::Class(self.program.class(id))))
                .collect();
        }

        // Everything reachable from a pinned node must stay put.
        let mut marked = vec![false; self.nodes.len()];
        let mut worklist: VecDeque<usize> = self.pinned.iter().copied().collect();
        for &root in &self.pinned {
            marked[root] = true;
        }
        while let Some(node) = worklist.pop_front() {
            for neighbor in self.nodes[node].neighbors.iter() {
                if !marked[*neighbor] {
                    marked[*neighbor] = true;
                    worklist.push_back(*neighbor);
                }
            }
        }

        class_ids
            .into_iter()
            .filter(|&class_id| {
                let class = self.program.class(class_id);
                let class_clear = !marked[self.node_index[&ItemId::Class(class_id)]];
                class_clear
                    && class
                        .fields
                        .iter()
                        .all(|f| !marked[self.node_index[&ItemId::Field(*f)]])
                    && class
                        .methods
                        .iter()
                        .all(|m| !marked[self.node_index[&ItemId::Method(*m)]])
            })
            .collect()
    }
}

/// Translates traced references into constraint registrations for one
/// accessing definition.
struct AccessRegistry<'g, 'p> {
    graph: &'g ConstraintGraph<'p>,
    node: usize,
    context: ClassId,
}

impl AccessRegistry<'_, '_> {
    fn field(&mut self, field: &FieldRef) {
        match self.graph.program.resolve_field(field) {
            Resolution::Single { definition, initial_holder } => {
                let def = self.graph.program.field(definition);
                self.graph.register_member_access(
                    self.node,
                    self.context,
                    ItemId::Field(definition),
                    &def.field.holder,
                    def.access.visibility,
                    initial_holder,
                );
            }
            // Unknown and ambiguous resolutions add no constraint: that can
            // only keep a class where it is, never move one illegally.
            Resolution::Unknown | Resolution::Ambiguous => {}
        }
    }

    fn method(&mut self, method: &MethodRef) {
        match self.graph.program.resolve_method(method) {
            Resolution::Single { definition, initial_holder } => {
                let def = self.graph.program.method(definition);
                self.graph.register_member_access(
                    self.node,
                    self.context,
                    ItemId::Method(definition),
                    &def.method.holder,
                    def.access.visibility,
                    initial_holder,
                );
            }
            Resolution::Unknown | Resolution::Ambiguous => {}
        }
    }

    fn ty(&mut self, ty: &TypeRef) {
        self.graph.register_type_access(self.node, self.context, ty);
    }
}

impl UseVisitor for AccessRegistry<'_, '_> {
    fn on_type_reference(&mut self, ty: &TypeRef) {
        self.ty(ty);
    }

    fn on_field_access(&mut self, _kind: FieldAccessKind, field: &FieldRef) {
        self.field(field);
    }

    fn on_method_reference(&mut self, _kind: InvokeKind, method: &MethodRef) {
        self.method(method);
    }

    fn on_new_instance(&mut self, ty: &TypeRef) {
        self.ty(ty);
    }

    fn on_instance_of(&mut self, ty: &TypeRef) {
        self.ty(ty);
    }

    fn on_init_class(&mut self, ty: &TypeRef) {
        self.ty(ty);
    }
}
