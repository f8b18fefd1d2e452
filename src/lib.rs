//! Cell Migration Simulator - biochemical kinetics and adhesion engine
//!
//! This library models migrating cells exposed to a diffusing ligand gradient
//! inside a microfluidic channel. It tracks per-segment membrane receptor
//! populations and the adhesion bonds cells form with a ligand-coated
//! substrate. Rigid-body dynamics, collision detection, and constraint
//! solving are supplied by an external physics engine behind the
//! [`physics::PhysicsWorld`] trait.

// Allow non-snake-case for unit suffixes in field names (nM, uM, etc.)
// This follows the project convention of including units in names.
#![allow(non_snake_case)]

pub mod adhesion;
pub mod concentration;
pub mod config;
pub mod export;
pub mod geometry;
pub mod kinetics;
pub mod physics;
pub mod sim;
pub mod state;

pub use adhesion::{AdhesionConstraint, BondState, ConstraintRegistry, DecayModel};
pub use concentration::{ConcentrationField, FieldMode, MicrofluidicChannel};
pub use config::Parameters;
pub use geometry::SphereMesh;
pub use kinetics::{
    MembraneProteinSpecies, ProteinInteraction, RateKind, SegmentKinetics, SpeciesKind,
};
pub use physics::{BodyId, ContactPoint, JointHandle, JointLimits, PhysicsWorld};
pub use sim::{Simulation, SimulationClock};
pub use state::{CellGroup, SegmentedCell};
