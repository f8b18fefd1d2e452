//! Parameter structures for a simulation run.
//!
//! Parameters are grouped by concern and load from JSON files with logged
//! fallback to defaults, so a run can be reproduced from its parameter
//! directory alone.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level parameters container
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Parameters {
    /// Run control (seed, timing, output)
    pub run: RunParameters,
    /// Microfluidic channel and ligand gradient
    pub channel: ChannelParameters,
    /// Cell population and geometry
    pub cells: CellParameters,
    /// Adhesion constraint constants
    pub adhesion: AdhesionParameters,
}

impl Parameters {
    /// Load parameters from JSON files, or use defaults if files don't exist
    pub fn load_or_default() -> Self {
        Self::load_from_dir("data/parameters")
    }

    /// Load parameters from a specific directory
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            run: load_section(dir.join("run.json"), "run"),
            channel: load_section(dir.join("channel.json"), "channel"),
            cells: load_section(dir.join("cells.json"), "cells"),
            adhesion: load_section(dir.join("adhesion.json"), "adhesion"),
        }
    }
}

fn load_section<T, P>(path: P, name: &str) -> T
where
    T: serde::de::DeserializeOwned + Default,
    P: AsRef<Path>,
{
    match std::fs::read_to_string(path.as_ref()) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(params) => {
                log::info!("Loaded {} parameters from {:?}", name, path.as_ref());
                params
            }
            Err(e) => {
                log::warn!("Failed to parse {} parameters: {}, using defaults", name, e);
                T::default()
            }
        },
        Err(_) => {
            log::info!("{} parameters file not found, using defaults", name);
            T::default()
        }
    }
}

/// Run control parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParameters {
    /// Seed for the single random generator owned by the orchestrator.
    /// All stochastic decisions (jitter, bond formation, breakage) draw
    /// from it, so a fixed seed reproduces a run exactly.
    pub seed: u64,

    /// Simulation tick length (ms)
    pub tick_ms: u64,

    /// Total simulated time before the run stops (seconds)
    pub end_time_sec: u64,

    /// Minimum simulated time between output rows (seconds)
    pub sec_between_output: f64,

    /// Base directory for exported tables; `None` disables export
    pub data_dir: Option<PathBuf>,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            seed: 0,
            tick_ms: 100,
            end_time_sec: 30,
            sec_between_output: 0.5,
            data_dir: None,
        }
    }
}

/// Microfluidic channel and ligand gradient parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelParameters {
    /// Ligand concentration at the source reservoir (nM)
    pub source_conc_nM: f64,

    /// Ligand concentration at the sink reservoir (nM)
    pub sink_conc_nM: f64,

    /// Total source-to-sink length of the gradient (μm)
    /// Reference: 13 mm channel, Abhyankar et al., Lab Chip 2006
    pub total_length_um: f64,

    /// Distance of the observed channel window from the source (μm)
    pub dist_from_source_um: f64,

    /// Length of the observed channel window along x (μm)
    pub channel_width_um: f32,

    /// Channel interior height (μm)
    pub channel_height_um: f32,

    /// Channel interior depth (μm)
    pub channel_depth_um: f32,

    /// Time for the gradient to reach steady state (seconds)
    /// Reference: ~11 h for a 13 mm channel at D = 200 μm²/s
    pub time_to_steady_sec: u64,

    /// Directory holding the external PDE solver (pdepe scripts)
    pub solver_dir: PathBuf,

    /// Time horizon handed to the external solver (seconds)
    pub solve_time_sec: u64,

    /// Number of distance grid points in the solver output
    pub dist_steps: usize,

    /// Number of time rows requested from the solver
    pub time_steps: usize,

    /// Number of evenly spaced stations sampled for the ligand table
    pub measure_segments: usize,
}

impl Default for ChannelParameters {
    fn default() -> Self {
        Self {
            source_conc_nM: 10.0,
            sink_conc_nM: 0.0,
            total_length_um: 13_000.0,
            dist_from_source_um: 0.0,
            channel_width_um: 300.0,
            channel_height_um: 90.0,
            channel_depth_um: 100.0,
            time_to_steady_sec: 11 * 60 * 60,
            solver_dir: PathBuf::from("pdepe"),
            solve_time_sec: 90_000,
            dist_steps: 200,
            time_steps: 100,
            measure_segments: 5,
        }
    }
}

impl ChannelParameters {
    /// Time to steady state in milliseconds
    pub fn time_to_steady_ms(&self) -> u64 {
        self.time_to_steady_sec * 1000
    }
}

/// Cell population and geometry parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellParameters {
    /// Number of cells seeded above the substrate
    pub num_cells: usize,

    /// Cell radius (μm)
    /// Reference: retinal progenitor cells, ~10 μm radius
    pub radius_um: f32,

    /// Icosphere subdivision level for surface segmentation (clamped 0-3)
    pub detail_level: u32,

    /// Cytoplasm density (pg/μm³); water is 1.0
    pub density_pg_per_um3: f32,

    /// Spacing between seeded cells and the substrate (μm)
    pub seed_padding_um: f32,
}

impl Default for CellParameters {
    fn default() -> Self {
        Self {
            num_cells: 1,
            radius_um: 10.0,
            detail_level: 1,
            density_pg_per_um3: 1.1,
            seed_padding_um: 6.0,
        }
    }
}

/// Adhesion constraint constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdhesionParameters {
    /// Contact points deeper than this do not qualify for adhesion (μm).
    /// Accounts for the combined length of laminin and integrin.
    pub contact_depth_threshold_um: f32,

    /// Free receptors a segment must hold before a constraint can form
    pub receptors_per_constraint: f64,

    /// Bond count below which a constraint retires on its next update
    pub min_bonds: f64,

    /// Mean constraint lifespan (ms)
    pub mean_lifespan_ms: f64,

    /// Gaussian spread of the drawn lifespan (ms)
    pub lifespan_sd_ms: f64,

    /// Constant force factor of the breakage probability, in [0, 1]
    pub force_factor: f64,

    /// Fraction of bonds lost per tick while a constraint is active
    pub bond_attrition_per_tick: f64,

    /// Linear joint travel allowed at zero bond strength (μm)
    pub max_bond_length_um: f32,

    /// Substrate ligand surface density (molecules/μm²)
    /// Reference: laminin coating, ~700 molecules/μm²
    pub substrate_density_per_um2: f64,

    /// Fractional loss of substrate coating per tick
    pub substrate_decay_per_tick: f64,
}

impl Default for AdhesionParameters {
    fn default() -> Self {
        Self {
            contact_depth_threshold_um: 0.05,
            receptors_per_constraint: 100.0,
            min_bonds: 10.0,
            mean_lifespan_ms: 5000.0,
            lifespan_sd_ms: 50.0,
            force_factor: 0.5,
            bond_attrition_per_tick: 0.1,
            max_bond_length_um: 1.5,
            substrate_density_per_um2: 700.0,
            substrate_decay_per_tick: 6.42e-9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_channel_params() {
        let params = ChannelParameters::default();
        assert!((params.total_length_um - 13_000.0).abs() < 1e-9);
        assert_eq!(params.time_to_steady_ms(), 11 * 60 * 60 * 1000);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let params = Parameters::default();
        let json = serde_json::to_string_pretty(&params).unwrap();
        let parsed: Parameters = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run.seed, params.run.seed);
        assert!((parsed.channel.source_conc_nM - params.channel.source_conc_nM).abs() < 1e-12);
    }

    #[test]
    fn test_missing_dir_falls_back_to_defaults() {
        let params = Parameters::load_from_dir("no/such/directory");
        assert_eq!(params.cells.num_cells, CellParameters::default().num_cells);
    }
}
