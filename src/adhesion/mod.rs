//! Adhesion constraint lifecycle.
//!
//! A qualifying contact between a cell segment and a ligand-coated
//! substrate consumes free adhesion receptors and becomes a mechanical
//! joint. The constraint matures through a quorum of check-ins from both
//! bodies, ages under a stochastic decay model, and returns its receptors
//! to the free pool if it is destroyed before ever activating.

pub mod constraint;
pub mod registry;

pub use constraint::{AdhesionConstraint, BondState, DecayModel, ForceFactor};
pub use registry::{ConstraintHandle, ConstraintRegistry};
