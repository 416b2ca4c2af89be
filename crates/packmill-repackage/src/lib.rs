//! Whole-program repackaging.
//!
//! Moves every class of a program into a caller-chosen destination package
//! while preserving the accessibility semantics of the original: classes
//! whose package-private or protected interactions pin them together either
//! move together or stay together. After the decision phase a single
//! structural rewrite replaces the whole program and produces a
//! [`packmill_model::RepackagingLens`] for downstream consumers of original
//! names.
//!
//! ```no_run
//! use packmill_analysis_constraints::RayonExecutor;
//! use packmill_model::keep::KeepNone;
//! use packmill_repackage::{
//!     DefaultRepackagingConfiguration, PackagingMode, Repackaging,
//! };
//! # fn demo(program: packmill_model::Program) -> Result<(), packmill_repackage::RepackageError> {
//! let config =
//!     DefaultRepackagingConfiguration::new("z", PackagingMode::RepackageToSingle);
//! let outcome = Repackaging::new(&config, &KeepNone).run(program, &RayonExecutor)?;
//! if let Some(lens) = &outcome.lens {
//!     // feed the lens to the mapping writer / later passes
//! }
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod mapping;
mod naming;
mod tree_fixer;

pub use error::RepackageError;
pub use mapping::TypeMapping;
pub use naming::{
    disambiguate_package, disambiguate_type, is_valid_package_descriptor,
    DefaultRepackagingConfiguration, PackagingMode, RepackagingConfiguration,
};

use engine::DecisionEngine;
use packmill_analysis_constraints::Executor;
use packmill_model::keep::KeepPredicate;
use packmill_model::{Lens, Program, RepackagingLens};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use tree_fixer::{fix_annotations, TreeFixer};

/// Counters describing what a run did. Serialized into build reports.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RepackageSummary {
    pub packages_seen: usize,
    pub classes_moved: usize,
    /// Classes that stayed put because keep rules or co-location constraints
    /// pinned them.
    pub classes_held: usize,
    pub members_renamed: usize,
    /// Inner classes whose simple name did not follow the `Outer$Inner`
    /// convention; their display name may be stale after the move. Alarm on
    /// this rather than ignoring it.
    pub inner_name_mismatches: usize,
}

/// What a run returns: the replacement program, the lens (absent when no
/// class moved, so callers can skip downstream rewriting entirely), and the
/// run summary.
pub struct RepackageOutcome {
    pub program: Program,
    pub lens: Option<RepackagingLens>,
    pub summary: RepackageSummary,
}

/// The repackaging pass.
pub struct Repackaging<'a> {
    config: &'a dyn RepackagingConfiguration,
    keep: &'a dyn KeepPredicate,
    previous_lens: Option<Arc<dyn Lens>>,
}

impl<'a> Repackaging<'a> {
    pub fn new(
        config: &'a dyn RepackagingConfiguration,
        keep: &'a dyn KeepPredicate,
    ) -> Repackaging<'a> {
        Repackaging { config, keep, previous_lens: None }
    }

    /// Chain this run's lens on top of an earlier pass's lens. The earlier
    /// lens is wrapped, never modified.
    pub fn with_previous_lens(mut self, lens: Arc<dyn Lens>) -> Repackaging<'a> {
        self.previous_lens = Some(lens);
        self
    }

    /// Run the pass. Either the whole program is decided and rewritten, or
    /// the run fails with no partial output; there is no resumable state.
    pub fn run(
        self,
        program: Program,
        executor: &impl Executor,
    ) -> Result<RepackageOutcome, RepackageError> {
        let mut summary = RepackageSummary::default();

        let engine = DecisionEngine { program: &program, config: self.config, keep: self.keep };
        let mapping = engine.compute_mapping(executor, &mut summary)?;
        let moves = mapping.into_moves();
        if moves.is_empty() {
            info!(packages = summary.packages_seen, "repackaging is a no-op");
            return Ok(RepackageOutcome { program, lens: None, summary });
        }

        let fixer = TreeFixer::new(&program, &moves);
        let (mut new_program, lens_builder) = fixer.run(&mut summary)?;
        match lens_builder.build(self.previous_lens) {
            Some(lens) => {
                fix_annotations(&mut new_program, &lens);
                info!(
                    classes_moved = summary.classes_moved,
                    members_renamed = summary.members_renamed,
                    "repackaging complete"
                );
                Ok(RepackageOutcome { program: new_program, lens: Some(lens), summary })
            }
            // Every planned move was an identity once applied; report the
            // run as a no-op over the original program.
            None => Ok(RepackageOutcome { program, lens: None, summary }),
        }
    }
}
