//! Concentration field queries.
//!
//! Two modes:
//! - **Pde**: backed by the external solver's output files. Rows are read
//!   lazily as queries cross each time boundary; the scan only moves forward.
//!   Within the bracketing rows the field interpolates linearly in distance,
//!   then linearly in time. Past the last row the field freezes (steady
//!   state).
//! - **Linear**: a diffusion front advances from the source at constant
//!   speed. A point ahead of the front holds the sink value; a point the
//!   front has passed holds the steady-state linear profile value.
//!
//! Any failure on the Pde path (missing files, malformed rows, time moving
//! backwards) flips the field to Linear for the remainder of the run.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::solver::SolverFiles;

/// Which model is answering queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Interpolating the external solver's output rows
    Pde,
    /// Linear-gradient fallback
    Linear,
}

/// Ligand concentration over 1-D distance and time.
///
/// Distances are μm from the source; times are experimental milliseconds.
pub struct ConcentrationField {
    source_nM: f64,
    sink_nM: f64,
    total_length_um: f64,
    time_to_steady_ms: u64,

    mode: FieldMode,
    output_dir: PathBuf,

    distances_um: Vec<f64>,
    previous_row: Vec<f64>,
    next_row: Vec<f64>,
    last_time_ms: u64,
    next_time_ms: u64,
    final_time_reached: bool,
    reader: Option<BufReader<File>>,
}

impl ConcentrationField {
    /// Build a field backed by the solver's output files in `output_dir`.
    ///
    /// Falls back to the linear model if either file is missing or its first
    /// rows are malformed. `source == sink` short-circuits every query, so
    /// no files are touched in that case.
    pub fn from_solver_output(
        output_dir: &Path,
        source_nM: f64,
        sink_nM: f64,
        total_length_um: f64,
        time_to_steady_ms: u64,
    ) -> Self {
        let mut field = Self {
            source_nM,
            sink_nM,
            total_length_um,
            time_to_steady_ms,
            mode: FieldMode::Pde,
            output_dir: output_dir.to_path_buf(),
            distances_um: Vec::new(),
            previous_row: Vec::new(),
            next_row: Vec::new(),
            last_time_ms: 0,
            next_time_ms: 0,
            final_time_reached: false,
            reader: None,
        };

        if source_nM <= sink_nM {
            // No gradient to interpolate; the linear model answers trivially
            field.mode = FieldMode::Linear;
            return field;
        }

        if let Err(e) = field.open_solution() {
            log::warn!("Cannot read PDE solution ({}); using linear gradient", e);
            field.fall_back();
        }
        field
    }

    /// Build a field that only ever uses the linear-gradient model
    pub fn linear(
        source_nM: f64,
        sink_nM: f64,
        total_length_um: f64,
        time_to_steady_ms: u64,
    ) -> Self {
        Self {
            source_nM,
            sink_nM,
            total_length_um,
            time_to_steady_ms,
            mode: FieldMode::Linear,
            output_dir: PathBuf::new(),
            distances_um: Vec::new(),
            previous_row: Vec::new(),
            next_row: Vec::new(),
            last_time_ms: 0,
            next_time_ms: 0,
            final_time_reached: false,
            reader: None,
        }
    }

    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    pub fn source_concentration_nM(&self) -> f64 {
        self.source_nM
    }

    pub fn sink_concentration_nM(&self) -> f64 {
        self.sink_nM
    }

    /// Ligand concentration (nM) at `dist_um` from the source, at
    /// experimental time `time_ms`.
    ///
    /// In Pde mode queries must not move backwards in time; a backwards
    /// query is logged and flips the field to the linear model.
    pub fn concentration(&mut self, dist_um: f64, time_ms: u64) -> f64 {
        if self.source_nM == self.sink_nM {
            return self.source_nM;
        }
        if self.mode == FieldMode::Linear {
            return self.linear_concentration(dist_um, time_ms);
        }

        if dist_um <= 0.0 {
            return self.source_nM;
        }
        if dist_um >= self.total_length_um {
            return self.sink_nM;
        }
        if time_ms == 0 {
            // At t = 0 the channel holds sink concentration everywhere but
            // the source itself
            return self.sink_nM;
        }

        if time_ms < self.last_time_ms {
            log::error!(
                "Experimental time went backwards ({} < {} ms); using linear gradient",
                time_ms,
                self.last_time_ms
            );
            self.fall_back();
            return self.linear_concentration(dist_um, time_ms);
        }

        while time_ms > self.next_time_ms && !self.final_time_reached {
            if self.read_next_row().is_err() {
                self.fall_back();
                return self.linear_concentration(dist_um, time_ms);
            }
        }

        let query_ms = if self.final_time_reached {
            // Concentrations no longer change after the last row
            self.next_time_ms.min(time_ms)
        } else {
            time_ms
        };

        let span = self.next_time_ms.saturating_sub(self.last_time_ms);
        let time_per = if span == 0 {
            0.0
        } else {
            query_ms.saturating_sub(self.last_time_ms) as f64 / span as f64
        };

        // First grid point at or past the query distance
        let mut idx = 0;
        while idx < self.distances_um.len() && dist_um > self.distances_um[idx] {
            idx += 1;
        }
        if idx >= self.distances_um.len() {
            return self.sink_nM;
        }
        if idx == 0 {
            return self.source_nM;
        }

        let d0 = self.distances_um[idx - 1];
        let d1 = self.distances_um[idx];
        let dist_per = if d1 > d0 { (dist_um - d0) / (d1 - d0) } else { 0.0 };

        let next_c = self.next_row[idx - 1] + dist_per * (self.next_row[idx] - self.next_row[idx - 1]);
        let prev_c =
            self.previous_row[idx - 1] + dist_per * (self.previous_row[idx] - self.previous_row[idx - 1]);

        prev_c + time_per * (next_c - prev_c)
    }

    /// Earliest time (ms) at which the concentration at `dist_um` exceeds
    /// `threshold_nM`.
    pub fn time_to_reach(&mut self, dist_um: f64, threshold_nM: f64) -> u64 {
        if threshold_nM > self.source_nM {
            log::warn!(
                "Threshold {} nM exceeds source concentration {} nM; returning time to steady state",
                threshold_nM,
                self.source_nM
            );
            return self.time_to_steady_ms;
        }
        if self.source_nM == self.sink_nM || dist_um <= 0.0 {
            return 0;
        }
        if dist_um > self.total_length_um {
            log::warn!(
                "Distance {} μm is outside the channel; returning time to steady state",
                dist_um
            );
            return self.time_to_steady_ms;
        }

        if self.mode == FieldMode::Linear {
            return self.linear_time_to_reach(dist_um, threshold_nM);
        }

        match self.scan_for_crossing(dist_um, threshold_nM) {
            Ok(time_ms) => time_ms,
            Err(e) => {
                log::warn!("Cannot scan PDE solution for threshold crossing: {}", e);
                self.time_to_steady_ms
            }
        }
    }

    /// Release the open row reader. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.reader = None;
    }

    // --- Linear model -----------------------------------------------------

    /// Distance the diffusion front has advanced by `time_ms` (μm)
    fn front_position_um(&self, time_ms: u64) -> f64 {
        if self.time_to_steady_ms == 0 {
            return self.total_length_um;
        }
        let front = self.total_length_um * time_ms as f64 / self.time_to_steady_ms as f64;
        front.min(self.total_length_um)
    }

    /// Steady-state linear profile value at `dist_um`
    fn steady_profile_nM(&self, dist_um: f64) -> f64 {
        self.source_nM - (self.source_nM - self.sink_nM) * dist_um / self.total_length_um
    }

    fn linear_concentration(&self, dist_um: f64, time_ms: u64) -> f64 {
        if dist_um <= 0.0 {
            return self.source_nM;
        }
        if dist_um >= self.total_length_um {
            return self.sink_nM;
        }
        let front = self.front_position_um(time_ms);
        if front < dist_um {
            // The front hasn't gotten there yet
            self.sink_nM
        } else {
            self.steady_profile_nM(dist_um)
        }
    }

    fn linear_time_to_reach(&self, dist_um: f64, threshold_nM: f64) -> u64 {
        if self.steady_profile_nM(dist_um) < threshold_nM {
            // This point never exceeds the threshold
            return self.time_to_steady_ms;
        }
        // The concentration at a point jumps when the front arrives
        (dist_um / self.total_length_um * self.time_to_steady_ms as f64) as u64
    }

    // --- Pde row handling -------------------------------------------------

    fn fall_back(&mut self) {
        self.mode = FieldMode::Linear;
        self.reader = None;
    }

    fn open_solution(&mut self) -> anyhow::Result<()> {
        let files = SolverFiles::in_dir(&self.output_dir);

        let dist_line = std::fs::read_to_string(&files.distances)?;
        let first_line = dist_line
            .lines()
            .next()
            .ok_or_else(|| anyhow::anyhow!("empty distances file"))?;
        self.distances_um = parse_csv_row(first_line)?;
        if self.distances_um.len() < 2 {
            anyhow::bail!("distances file has fewer than two grid points");
        }

        let file = File::open(&files.concentrations)?;
        self.reader = Some(BufReader::new(file));

        let n = self.distances_um.len();
        self.previous_row = vec![self.sink_nM; n];
        self.next_row = vec![self.sink_nM; n];
        self.last_time_ms = 0;
        self.next_time_ms = 0;

        // Prime the two bracketing rows
        self.read_next_row()?;
        self.read_next_row()?;
        Ok(())
    }

    fn read_next_row(&mut self) -> anyhow::Result<()> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("no open concentration reader"))?;

        let mut line = String::new();
        let bytes = reader.read_line(&mut line)?;
        if bytes == 0 || line.trim().is_empty() {
            self.final_time_reached = true;
            return Ok(());
        }

        let values = parse_csv_row(line.trim())?;
        if values.len() != self.distances_um.len() + 1 {
            anyhow::bail!(
                "concentration row has {} values, expected {}",
                values.len(),
                self.distances_um.len() + 1
            );
        }

        // Row timestamps are in seconds
        let new_time_ms = (values[0] * 1000.0) as u64;

        self.last_time_ms = self.next_time_ms;
        self.next_time_ms = new_time_ms;
        std::mem::swap(&mut self.previous_row, &mut self.next_row);
        self.next_row.clear();
        self.next_row.extend_from_slice(&values[1..]);
        Ok(())
    }

    /// Scan the concentration file from the start for the first time the
    /// threshold is exceeded at the grid points bracketing `dist_um`, then
    /// interpolate between them.
    fn scan_for_crossing(&self, dist_um: f64, threshold_nM: f64) -> anyhow::Result<u64> {
        let mut idx = 0;
        while idx < self.distances_um.len() && dist_um > self.distances_um[idx] {
            idx += 1;
        }
        if idx == 0 {
            return Ok(0);
        }
        if idx >= self.distances_um.len() {
            return Ok(self.time_to_steady_ms);
        }

        let files = SolverFiles::in_dir(&self.output_dir);
        let reader = BufReader::new(File::open(&files.concentrations)?);

        // Crossing time at the grid point nearer the source (t1) and at the
        // farther one (t2)
        let mut t1: Option<f64> = None;
        let mut t2: Option<f64> = None;
        let mut old_near = 0.0;
        let mut old_far = 0.0;
        let mut old_time_ms = 0.0;

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let values = parse_csv_row(line.trim())?;
            if values.len() != self.distances_um.len() + 1 {
                anyhow::bail!("malformed concentration row during threshold scan");
            }
            let time_ms = values[0] * 1000.0;
            let near = values[idx];
            let far = values[idx + 1];

            if near > threshold_nM && t1.is_none() {
                t1 = Some(crossing_time(old_time_ms, time_ms, old_near, near, threshold_nM));
            }
            if far > threshold_nM && t2.is_none() {
                t2 = Some(crossing_time(old_time_ms, time_ms, old_far, far, threshold_nM));
            }
            if t1.is_some() && t2.is_some() {
                break;
            }
            old_near = near;
            old_far = far;
            old_time_ms = time_ms;
        }

        match (t1, t2) {
            (Some(t1), Some(t2)) => {
                let d0 = self.distances_um[idx - 1];
                let d1 = self.distances_um[idx];
                let frac = if d0 < d1 { (dist_um - d1) / (d0 - d1) } else { 1.0 };
                Ok((t2 + (t1 - t2) * frac).max(0.0) as u64)
            }
            // The threshold was never exceeded in the available rows
            _ => Ok(old_time_ms as u64),
        }
    }
}

fn crossing_time(t0_ms: f64, t1_ms: f64, c0: f64, c1: f64, threshold: f64) -> f64 {
    if c1 <= c0 {
        return t1_ms;
    }
    t0_ms + (t1_ms - t0_ms) * (threshold - c0) / (c1 - c0)
}

fn parse_csv_row(line: &str) -> anyhow::Result<Vec<f64>> {
    line.split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| anyhow::anyhow!("bad numeric value {:?}: {}", v, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_field() -> ConcentrationField {
        // 10 nM source, 0 nM sink, 13 mm channel, 1 h to steady state
        ConcentrationField::linear(10.0, 0.0, 13_000.0, 3_600_000)
    }

    #[test]
    fn test_linear_boundaries_at_time_zero() {
        let mut field = linear_field();
        assert!((field.concentration(0.0, 0) - 10.0).abs() < 1e-9);
        assert!((field.concentration(13_000.0, 0) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_front_halfway() {
        let mut field = linear_field();
        // Front has advanced 6500 μm at half the steady-state time; the
        // midpoint sits right at the front and holds the profile value
        let c = field.concentration(6_500.0, 1_800_000);
        assert!((c - 5.0).abs() < 1e-9, "got {}", c);
    }

    #[test]
    fn test_linear_ahead_of_front_is_sink() {
        let mut field = linear_field();
        assert_eq!(field.concentration(10_000.0, 1_800_000), 0.0);
    }

    #[test]
    fn test_flat_gradient_returns_source_everywhere() {
        let mut field = ConcentrationField::linear(4.0, 4.0, 13_000.0, 3_600_000);
        for (d, t) in [(0.0, 0), (500.0, 0), (13_000.0, 99_999), (2.0, 7)] {
            assert_eq!(field.concentration(d, t), 4.0);
        }
    }

    #[test]
    fn test_no_nan_at_zero_front() {
        let mut field = linear_field();
        let c = field.concentration(0.0, 0);
        assert!(c.is_finite());
        let c = field.concentration(1.0, 0);
        assert!(c.is_finite());
        assert_eq!(c, 0.0);
    }

    #[test]
    fn test_linear_time_to_reach() {
        let mut field = linear_field();
        assert_eq!(field.time_to_reach(0.0, 0.1), 0);
        // Front arrives at 6500 μm at half the steady time
        let t = field.time_to_reach(6_500.0, 0.1);
        assert_eq!(t, 1_800_000);
        // A point whose steady value stays below the threshold never crosses
        let t = field.time_to_reach(12_999.0, 5.0);
        assert_eq!(t, 3_600_000);
    }

    #[test]
    fn test_time_to_reach_threshold_above_source() {
        let mut field = linear_field();
        assert_eq!(field.time_to_reach(100.0, 11.0), 3_600_000);
    }

    #[test]
    fn test_missing_files_fall_back() {
        let field = ConcentrationField::from_solver_output(
            Path::new("no/such/dir"),
            10.0,
            0.0,
            13_000.0,
            3_600_000,
        );
        assert_eq!(field.mode(), FieldMode::Linear);
    }

    #[test]
    fn test_teardown_idempotent() {
        let mut field = linear_field();
        field.teardown();
        field.teardown();
        assert!(field.concentration(100.0, 0).is_finite());
    }
}
