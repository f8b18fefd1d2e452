//! External PDE solver invocation.
//!
//! The diffusion equation is solved by an external Octave `pdepe` run. We
//! write a driver script and a problem template into the output directory,
//! spawn the solver, and relay its stderr to the log. The solver writes two
//! CSV files: a single row of grid distances and one row of concentrations
//! per time step. A missing interpreter or non-zero exit is reported as an
//! error; the caller degrades to the linear-gradient model.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};

const SCRIPT_FILE: &str = "script";
const TEMPLATE_FILE: &str = "template";
const CONCENTRATION_FILE: &str = "concentrations.csv";
const DISTANCE_FILE: &str = "distancesFromSource.csv";

/// Paths of the solver's output files inside one run directory
pub struct SolverFiles {
    pub distances: PathBuf,
    pub concentrations: PathBuf,
}

impl SolverFiles {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            distances: dir.join(DISTANCE_FILE),
            concentrations: dir.join(CONCENTRATION_FILE),
        }
    }
}

/// Problem definition handed to the external solver
#[derive(Debug, Clone)]
pub struct SolverProblem {
    /// First grid distance from the source (μm)
    pub min_x_um: f64,
    /// Last grid distance from the source (μm)
    pub max_x_um: f64,
    /// Number of distance grid points
    pub dist_steps: usize,
    /// Number of time rows
    pub time_steps: usize,
    /// Time horizon of the solve (seconds)
    pub solve_time_sec: u64,
    /// Source reservoir concentration (nM)
    pub source_conc_nM: f64,
    /// Diffusion coefficient (μm²/s); EGF in agarose is ~200
    pub diffusion_um2_per_sec: f64,
}

/// Write the solver inputs and run it, blocking until it exits.
///
/// `output_dir` receives the script, the template, and the two output CSVs.
/// `solver_dir` holds the pdepe support scripts and is added to the solver's
/// path.
pub fn run_solver(output_dir: &Path, solver_dir: &Path, problem: &SolverProblem) -> Result<()> {
    write_template(output_dir, solver_dir, problem)
        .context("writing solver script and template")?;

    log::info!("Solving concentration differential equations; this can take a while");
    let script_path = output_dir.join(SCRIPT_FILE);
    let output = Command::new("octave")
        .arg(&script_path)
        .output()
        .context("spawning octave")?;

    for line in String::from_utf8_lossy(&output.stderr).lines() {
        log::warn!("solver: {}", line);
    }
    if !output.status.success() {
        bail!("solver exited with status {}", output.status);
    }

    let files = SolverFiles::in_dir(output_dir);
    if !files.distances.exists() || !files.concentrations.exists() {
        bail!("solver exited cleanly but did not produce its output files");
    }
    Ok(())
}

fn write_template(output_dir: &Path, solver_dir: &Path, problem: &SolverProblem) -> Result<()> {
    let mut script = File::create(output_dir.join(SCRIPT_FILE))?;
    writeln!(script, "addpath(\"{}\");", output_dir.display())?;
    writeln!(script, "addpath(\"{}\");", solver_dir.display())?;
    writeln!(script, "{}", TEMPLATE_FILE)?;

    let files = SolverFiles::in_dir(output_dir);
    let mut template = File::create(output_dir.join(format!("{}.m", TEMPLATE_FILE)))?;
    writeln!(template, "function {}", TEMPLATE_FILE)?;
    writeln!(
        template,
        "m=0;\n min_x = {};\n max_x = {};\n x_steps = {};",
        problem.min_x_um, problem.max_x_um, problem.dist_steps
    )?;
    writeln!(template, "x = linspace(min_x, max_x, x_steps);")?;
    writeln!(
        template,
        "min_t = 0;\n max_t = {};\n t_steps = {};",
        problem.solve_time_sec, problem.time_steps
    )?;
    writeln!(template, "t = linspace(min_t, max_t, t_steps);")?;
    writeln!(
        template,
        "sol = pdepe(m,@pdex1pde,@pdex1ic,@pdex1bc,x,t);"
    )?;
    writeln!(template, "u = sol(:,:,1);")?;
    writeln!(template, "u=fliplr(u);")?;
    writeln!(template, "x = {} .- x;", problem.max_x_um)?;
    writeln!(template, "x=flipdim(x);")?;
    writeln!(
        template,
        "csvwrite('{}', x)",
        files.distances.display()
    )?;
    writeln!(
        template,
        "csvwrite('{}', [t(:) u])",
        files.concentrations.display()
    )?;

    // The problem itself: pure diffusion from a source held at a fixed
    // concentration, into a channel initially at zero
    writeln!(template, "function [c,f,s] = pdex1pde(x,t,u,DuDx)")?;
    writeln!(template, "  c = 1;")?;
    writeln!(template, "  f ={}*DuDx;", problem.diffusion_um2_per_sec)?;
    writeln!(template, "  s = 0;")?;

    writeln!(template, "function u0 = pdex1ic(x)")?;
    writeln!(template, "  if x<{}", problem.max_x_um)?;
    writeln!(template, "    u0=0;")?;
    writeln!(template, "  else u0 = {};", problem.source_conc_nM)?;
    writeln!(template, "end")?;

    writeln!(template, "function [pl,ql,pr,qr] = pdex1bc(xl,ul,xr,ur,t)")?;
    writeln!(template, "  pl = ul;")?;
    writeln!(template, "  ql = 0;")?;
    writeln!(template, "  pr = ur-{};", problem.source_conc_nM)?;
    writeln!(template, "  qr = 0;")?;
    Ok(())
}
