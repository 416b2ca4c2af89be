//! Error types for constraint analysis.

use packmill_model::trace::TraceError;
use thiserror::Error;

/// Errors that abort constraint analysis.
///
/// There is no partial recovery here: an under-approximated constraint graph
/// risks an illegal move, so a single untraceable method fails the package
/// and with it the whole pass.
#[derive(Debug, Error)]
pub enum ConstraintError {
    #[error("constraint tracing aborted: {0}")]
    Tracing(#[from] TraceError),
}
