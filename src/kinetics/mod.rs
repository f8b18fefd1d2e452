//! Membrane receptor kinetics.
//!
//! Each cell surface segment carries free and bound receptor counts for
//! every protein species. Counts are integrated each tick by forward Euler
//! from the species' rate constants, with the local ligand concentration as
//! input and cross-species interactions modulating the trafficking rates.

pub mod interaction;
pub mod segment;
pub mod species;

pub use interaction::{ProteinInteraction, RateKind};
pub use segment::SegmentKinetics;
pub use species::{MembraneProteinSpecies, SpeciesKind};
