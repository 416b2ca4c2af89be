//! Error types for the repackaging pass.

use packmill_analysis_constraints::ConstraintError;
use packmill_model::ModelError;
use thiserror::Error;

/// Errors aborting a repackaging run.
///
/// Collisions never surface here: the engine always resolves them locally
/// with its disambiguation loop. What does surface is either a rejected
/// configuration (before any rewriting starts) or an internal mapping
/// inconsistency, which is unrecoverable by design.
#[derive(Debug, Error)]
pub enum RepackageError {
    /// The naming strategy produced a malformed package descriptor.
    #[error("invalid destination package descriptor `{0}`")]
    InvalidPackageDescriptor(String),

    /// A method body could not be traced. Fatal: an under-approximated
    /// constraint graph risks an illegal move.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// The computed mapping violated an invariant while the tree fixer
    /// rebuilt the program (duplicate destination, dangling reference).
    #[error("mapping invariant violation: {0}")]
    Inconsistent(#[from] ModelError),
}
