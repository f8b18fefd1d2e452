//! Ligand concentration over distance and time.
//!
//! The field answers "what is the local ligand concentration at distance d,
//! time t" from a precomputed PDE solution when one is available, and from a
//! linear-gradient model otherwise. All failures on the PDE path are
//! recoverable: the field degrades to the linear model and the run continues.

pub mod channel;
pub mod field;
pub mod solver;

pub use channel::MicrofluidicChannel;
pub use field::{ConcentrationField, FieldMode};
pub use solver::SolverFiles;
