//! Simulation configuration.

pub mod parameters;

pub use parameters::{
    AdhesionParameters, CellParameters, ChannelParameters, Parameters, RunParameters,
};
