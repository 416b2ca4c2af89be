//! Co-location constraint analysis.
//!
//! For one package at a time, this crate builds an undirected graph whose
//! edges mean "these two definitions must stay in the same package": a
//! reference that is only legal because accessor and target currently share
//! a package. Classes unreachable from any keep-pinned definition are free
//! to move together.
//!
//! Population runs the reference tracer over every method concurrently; the
//! graph is the only shared mutable state and its neighbor sets accept
//! concurrent insert-if-absent writers from both directions of an edge.

mod error;
mod executor;
mod graph;

pub use error::ConstraintError;
pub use executor::{Executor, RayonExecutor, SequentialExecutor};
pub use graph::ConstraintGraph;
