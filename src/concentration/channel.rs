//! Microfluidic channel window onto the gradient.
//!
//! The simulated channel is a short window of a much longer source-to-sink
//! gradient. The channel maps world x-coordinates to distance from the
//! source and reports experimental time, which runs ahead of simulation time
//! by the time the gradient needed to first reach the window.

use super::field::ConcentrationField;
use crate::config::ChannelParameters;

/// Threshold used to decide when the gradient has "reached" the window (nM)
const ARRIVAL_THRESHOLD_NM: f64 = 0.01;

pub struct MicrofluidicChannel {
    dist_from_source_um: f64,
    total_length_um: f64,
    channel_width_um: f32,
    min_x_um: f32,
    measure_segments: usize,
    time_to_reach_ms: u64,
}

impl MicrofluidicChannel {
    pub fn new(params: &ChannelParameters, field: &mut ConcentrationField) -> Self {
        let mut dist_from_source_um = params.dist_from_source_um;
        if dist_from_source_um + params.channel_width_um as f64 > params.total_length_um {
            dist_from_source_um = params.total_length_um - params.channel_width_um as f64;
            log::warn!(
                "Channel window extends past the sink; moved to {} μm from source",
                dist_from_source_um
            );
        }
        let time_to_reach_ms = field.time_to_reach(dist_from_source_um, ARRIVAL_THRESHOLD_NM);

        Self {
            dist_from_source_um,
            total_length_um: params.total_length_um,
            channel_width_um: params.channel_width_um,
            min_x_um: -params.channel_width_um / 2.0,
            measure_segments: params.measure_segments,
            time_to_reach_ms,
        }
    }

    /// Distance from the source reservoir of a world x-coordinate (μm)
    pub fn distance_from_source_um(&self, world_x_um: f32) -> f64 {
        self.dist_from_source_um + (world_x_um - self.min_x_um) as f64
    }

    /// Simulation time offset by the gradient's arrival at the window
    pub fn experimental_time_ms(&self, sim_time_ms: u64) -> u64 {
        sim_time_ms + self.time_to_reach_ms
    }

    pub fn time_to_reach_ms(&self) -> u64 {
        self.time_to_reach_ms
    }

    pub fn dist_from_source_um(&self) -> f64 {
        self.dist_from_source_um
    }

    pub fn total_length_um(&self) -> f64 {
        self.total_length_um
    }

    /// Distances from the source of the evenly spaced measurement stations
    /// sampled for the ligand export table (μm)
    pub fn measure_stations_um(&self) -> Vec<f64> {
        let spacing = self.channel_width_um as f64 / (self.measure_segments.max(2) - 1) as f64;
        (0..self.measure_segments)
            .map(|i| self.dist_from_source_um + i as f64 * spacing)
            .collect()
    }
}
