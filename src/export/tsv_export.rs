//! Tab-separated time-series export.
//!
//! Four tables are written per run, each with a fixed header:
//! - `groupData.tsv`: per-group center of mass and membership count
//! - `cellData.tsv`: per-body position and linear velocity
//! - `membraneData.tsv`: per-segment free/bound counts and local ligand
//! - `ligandData.tsv`: gradient samples at the channel's measurement
//!   stations
//!
//! Rows are written at a configured interval and are reproducible
//! byte-for-byte for a given run, which is what the verification tooling
//! diffs against.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

/// One row of the group table
#[derive(Debug, Clone, Serialize)]
pub struct GroupRecord {
    pub time_ms: u64,
    pub experimental_time_ms: u64,
    pub group: String,
    pub com_x_um: f32,
    pub com_y_um: f32,
    pub com_z_um: f32,
    pub count: usize,
}

/// One row of the cell table
#[derive(Debug, Clone, Serialize)]
pub struct CellRecord {
    pub time_ms: u64,
    pub cell_id: u32,
    pub x_um: f32,
    pub y_um: f32,
    pub z_um: f32,
    pub vx_um_per_sec: f32,
    pub vy_um_per_sec: f32,
    pub vz_um_per_sec: f32,
}

/// One row of the membrane table
#[derive(Debug, Clone, Serialize)]
pub struct MembraneRecord {
    pub time_ms: u64,
    pub species: &'static str,
    pub cell_id: u32,
    pub segment: usize,
    pub bound_receptors: f64,
    pub free_receptors: f64,
    pub ligand_nM: f64,
}

/// The set of writers for one run
pub struct ExportSet {
    group: csv::Writer<File>,
    cells: csv::Writer<File>,
    membrane: csv::Writer<File>,
    ligand: csv::Writer<File>,
    interval_ms: u64,
    last_write_ms: Option<u64>,
    dir: PathBuf,
}

impl ExportSet {
    /// Create the writers inside the run directory `dir`.
    ///
    /// `ligand_stations_um` labels the ligand table's columns with each
    /// measurement station's distance from the source.
    pub fn new(dir: &Path, interval_ms: u64, ligand_stations_um: &[f64]) -> Result<Self> {
        let dir = dir.to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let tsv = |name: &str| -> Result<csv::Writer<File>> {
            Ok(csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_path(dir.join(name))?)
        };

        let group = tsv("groupData.tsv")?;
        let cells = tsv("cellData.tsv")?;
        let membrane = tsv("membraneData.tsv")?;
        let mut ligand = tsv("ligandData.tsv")?;

        // The ligand table's width depends on the station count, so its
        // header is written by hand
        let mut header = vec!["time_ms".to_string(), "experimental_time_ms".to_string()];
        header.extend(
            ligand_stations_um
                .iter()
                .map(|d| format!("{:.3} mm", d / 1000.0)),
        );
        ligand.write_record(&header)?;

        log::info!("Export started: {}", dir.display());

        Ok(Self {
            group,
            cells,
            membrane,
            ligand,
            interval_ms,
            last_write_ms: None,
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True when the interval since the last written rows has elapsed.
    /// The first call always reports due.
    pub fn due(&self, time_ms: u64) -> bool {
        match self.last_write_ms {
            None => true,
            Some(last) => time_ms.saturating_sub(last) >= self.interval_ms,
        }
    }

    pub fn mark_written(&mut self, time_ms: u64) {
        self.last_write_ms = Some(time_ms);
    }

    pub fn write_group(&mut self, record: &GroupRecord) -> Result<()> {
        self.group.serialize(record)?;
        Ok(())
    }

    pub fn write_cell(&mut self, record: &CellRecord) -> Result<()> {
        self.cells.serialize(record)?;
        Ok(())
    }

    pub fn write_membrane(&mut self, record: &MembraneRecord) -> Result<()> {
        self.membrane.serialize(record)?;
        Ok(())
    }

    pub fn write_ligand_row(
        &mut self,
        time_ms: u64,
        experimental_time_ms: u64,
        concentrations_nM: &[f64],
    ) -> Result<()> {
        let mut row = vec![time_ms.to_string(), experimental_time_ms.to_string()];
        row.extend(concentrations_nM.iter().map(|c| c.to_string()));
        self.ligand.write_record(&row)?;
        Ok(())
    }

    /// Flush all tables; called once at teardown
    pub fn finish(&mut self) -> Result<()> {
        self.group.flush()?;
        self.cells.flush()?;
        self.membrane.flush()?;
        self.ligand.flush()?;
        log::info!("Export completed: {}", self.dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_created_with_headers() {
        let base = tempfile::tempdir().unwrap();
        let mut set = ExportSet::new(base.path(), 500, &[2600.0, 2675.0, 2750.0]).unwrap();

        set.write_cell(&CellRecord {
            time_ms: 0,
            cell_id: 0,
            x_um: 1.0,
            y_um: 2.0,
            z_um: 3.0,
            vx_um_per_sec: 0.0,
            vy_um_per_sec: 0.0,
            vz_um_per_sec: 0.0,
        })
        .unwrap();
        set.write_ligand_row(0, 720_000, &[8.0, 7.94, 7.88]).unwrap();
        set.finish().unwrap();

        let cell_data = std::fs::read_to_string(set.dir().join("cellData.tsv")).unwrap();
        let mut lines = cell_data.lines();
        assert_eq!(
            lines.next().unwrap(),
            "time_ms\tcell_id\tx_um\ty_um\tz_um\tvx_um_per_sec\tvy_um_per_sec\tvz_um_per_sec"
        );
        assert!(lines.next().unwrap().starts_with("0\t0\t1"));

        let ligand_data = std::fs::read_to_string(set.dir().join("ligandData.tsv")).unwrap();
        assert!(ligand_data.starts_with("time_ms\texperimental_time_ms\t2.600 mm"));
    }

    #[test]
    fn test_interval_gating() {
        let base = tempfile::tempdir().unwrap();
        let mut set = ExportSet::new(base.path(), 500, &[0.0]).unwrap();
        assert!(set.due(0));
        set.mark_written(0);
        assert!(!set.due(499));
        assert!(set.due(500));
    }
}
