//! Simulated entities.

pub mod cell;
pub mod group;

pub use cell::SegmentedCell;
pub use group::CellGroup;
