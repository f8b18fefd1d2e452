//! Simulation orchestration.
//!
//! The orchestrator drives the per-tick update ordering:
//! integrate kinetics → step external physics → scan contacts →
//! create/check-in constraints → age/retire constraints → periodic export.
//!
//! It owns the single seeded random generator and the id allocator, so a
//! run is reproducible from its parameters alone and nothing leaks through
//! global state between runs.

pub mod clock;

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::adhesion::constraint::{limits_for_strength, UpdateOutcome};
use crate::adhesion::{AdhesionConstraint, ConstraintRegistry, DecayModel};
use crate::concentration::solver::{run_solver, SolverProblem};
use crate::concentration::{ConcentrationField, MicrofluidicChannel};
use crate::config::Parameters;
use crate::export::{CellRecord, ExportSet, GroupRecord, MembraneRecord};
use crate::kinetics::{MembraneProteinSpecies, ProteinInteraction};
use crate::physics::{BodyId, ContactPoint, PhysicsWorld};
use crate::state::{CellGroup, SegmentedCell};

pub use clock::SimulationClock;

/// Sequential id allocation, owned by the orchestrator
#[derive(Debug, Default)]
pub struct IdAllocator {
    next_cell: u32,
    next_collision: u64,
}

impl IdAllocator {
    pub fn next_cell_id(&mut self) -> u32 {
        let id = self.next_cell;
        self.next_cell += 1;
        id
    }

    pub fn next_collision_id(&mut self) -> u64 {
        let id = self.next_collision;
        self.next_collision = self.next_collision.wrapping_add(1);
        id
    }
}

/// Running totals for the end-of-run summary
#[derive(Debug, Default, Clone)]
pub struct SimulationStats {
    pub contacts_observed: u64,
    pub constraints_created: u64,
    pub constraints_retired: u64,
}

pub struct Simulation<W: PhysicsWorld> {
    params: Parameters,
    clock: SimulationClock,
    rng: StdRng,
    ids: IdAllocator,
    stats: SimulationStats,

    field: ConcentrationField,
    channel: MicrofluidicChannel,
    species: Vec<MembraneProteinSpecies>,
    interactions: Vec<ProteinInteraction>,
    decay: DecayModel,

    cells: Vec<SegmentedCell>,
    cell_by_body: HashMap<BodyId, usize>,
    groups: Vec<CellGroup>,
    /// Ligand-coated bodies and their current surface density
    substrates: HashMap<BodyId, f64>,

    registry: ConstraintRegistry,
    world: W,
    exporter: Option<ExportSet>,
    torn_down: bool,
}

impl<W: PhysicsWorld> Simulation<W> {
    /// Build a simulation around an external physics world.
    ///
    /// Fails only on configuration that cannot produce a consistent run
    /// (sink above source). A missing or failing external PDE solver is
    /// recoverable and leaves the field in linear-gradient mode.
    pub fn new(params: Parameters, world: W) -> Result<Self> {
        let chan = &params.channel;
        if chan.sink_conc_nM > chan.source_conc_nM {
            bail!(
                "sink concentration {} nM exceeds source concentration {} nM; no consistent gradient exists",
                chan.sink_conc_nM,
                chan.source_conc_nM
            );
        }

        let run_dir = params.run.data_dir.as_ref().map(|base| {
            base.join(format!(
                "CM-{}",
                chrono::Local::now().format("%Y-%m-%d-%H-%M-%S")
            ))
        });

        let mut field = build_field(&params, run_dir.as_ref());
        let channel = MicrofluidicChannel::new(chan, &mut field);

        let exporter = match &run_dir {
            Some(dir) => {
                let interval_ms = (params.run.sec_between_output * 1000.0) as u64;
                match ExportSet::new(dir, interval_ms, &channel.measure_stations_um()) {
                    Ok(set) => Some(set),
                    Err(e) => {
                        log::error!("Cannot create output files: {}", e);
                        None
                    }
                }
            }
            None => None,
        };

        let species = vec![
            MembraneProteinSpecies::egfr(),
            MembraneProteinSpecies::integrin(),
        ];
        let decay = DecayModel::from_params(&params.adhesion);
        let rng = StdRng::seed_from_u64(params.run.seed);
        let clock = SimulationClock::new(params.run.tick_ms, params.run.end_time_sec);

        Ok(Self {
            params,
            clock,
            rng,
            ids: IdAllocator::default(),
            stats: SimulationStats::default(),
            field,
            channel,
            species,
            interactions: Vec::new(),
            decay,
            cells: Vec::new(),
            cell_by_body: HashMap::new(),
            groups: Vec::new(),
            substrates: HashMap::new(),
            registry: ConstraintRegistry::new(),
            world,
            exporter,
            torn_down: false,
        })
    }

    // --- Setup ------------------------------------------------------------

    /// Register an externally created body as a cell and assign it to a
    /// named group. Returns the cell id.
    pub fn add_cell(&mut self, body: BodyId, group_name: &str) -> u32 {
        let id = self.ids.next_cell_id();
        let cell = SegmentedCell::new(id, body, &self.params.cells, &self.species);
        self.world.set_gravity(body, cell.buoyant_acceleration());
        self.cell_by_body.insert(body, self.cells.len());
        self.cells.push(cell);

        match self.groups.iter_mut().find(|g| g.name == group_name) {
            Some(group) => group.add_member(id),
            None => {
                let mut group = CellGroup::new(group_name);
                group.add_member(id);
                self.groups.push(group);
            }
        }
        id
    }

    /// Register an externally created body as a ligand-coated substrate
    pub fn add_substrate(&mut self, body: BodyId) {
        self.substrates
            .insert(body, self.params.adhesion.substrate_density_per_um2);
    }

    pub fn add_interaction(&mut self, interaction: ProteinInteraction) {
        self.interactions.push(interaction);
    }

    // --- Accessors --------------------------------------------------------

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn time_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn finished(&self) -> bool {
        self.clock.finished()
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    pub fn cells(&self) -> &[SegmentedCell] {
        &self.cells
    }

    pub fn groups(&self) -> &[CellGroup] {
        &self.groups
    }

    pub fn species(&self) -> &[MembraneProteinSpecies] {
        &self.species
    }

    pub fn registry(&self) -> &ConstraintRegistry {
        &self.registry
    }

    pub fn field_mut(&mut self) -> &mut ConcentrationField {
        &mut self.field
    }

    pub fn channel(&self) -> &MicrofluidicChannel {
        &self.channel
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    // --- Per-tick update --------------------------------------------------

    /// One simulation tick. Recoverable failures (export I/O) are logged
    /// and never stop the loop.
    pub fn step(&mut self) {
        let now = self.clock.now_ms();

        self.integrate_kinetics(now);
        self.decay_substrate_coating();
        self.world.step(self.clock.dt_sec());
        self.scan_contacts(now);
        self.age_constraints(now);
        self.maybe_export(now);

        self.clock.advance();
    }

    /// Run until the configured end time, then tear down
    pub fn run(&mut self) {
        while !self.clock.finished() {
            self.step();
        }
        self.teardown();
    }

    /// Release joints, readers, and writers. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        for handle in self.registry.handles() {
            if let Some(mut con) = self.registry.remove(handle) {
                let cell = &mut self.cells[con.cell];
                con.destroy(&mut cell.kinetics, &mut self.world);
                self.stats.constraints_retired += 1;
            }
        }
        self.field.teardown();
        if let Some(exporter) = &mut self.exporter {
            if let Err(e) = exporter.finish() {
                log::error!("Unable to close output files: {}", e);
            }
        }
        self.torn_down = true;
    }

    fn integrate_kinetics(&mut self, now: u64) {
        let dt_min = self.clock.dt_min();
        let exp_time = self.channel.experimental_time_ms(now);

        for cell in &mut self.cells {
            // Random tumbling: angular velocity on one random axis
            let axis = (self.rng.gen::<f64>() * 3.0) as usize % 3;
            let vel = self.rng.gen::<f64>() * 2.0 - 1.0;
            let mut angular = Vec3::ZERO;
            angular[axis] = vel as f32;
            self.world.set_angular_velocity(cell.body, angular);

            let position = self.world.body_position(cell.body);
            let orientation = self.world.body_orientation(cell.body);
            let distances: Vec<f64> = (0..cell.num_segments())
                .map(|s| {
                    let centroid = cell.segment_world_centroid(s, position, orientation);
                    self.channel.distance_from_source_um(centroid.x)
                })
                .collect();

            cell.kinetics.integrate(
                &self.species,
                &self.interactions,
                &distances,
                &mut self.field,
                exp_time,
                dt_min,
            );
        }
    }

    fn decay_substrate_coating(&mut self) {
        let rate = self.params.adhesion.substrate_decay_per_tick;
        for density in self.substrates.values_mut() {
            *density -= *density * rate;
        }
    }

    fn scan_contacts(&mut self, now: u64) {
        let threshold = self.params.adhesion.contact_depth_threshold_um;
        let qualifying: Vec<ContactPoint> = self
            .world
            .contacts()
            .iter()
            .filter(|c| c.penetration_depth_um < threshold)
            .copied()
            .collect();

        for contact in qualifying {
            self.stats.contacts_observed += 1;
            let collision_id = self.ids.next_collision_id();
            // Both bodies see the contact, in order; whichever side is the
            // cell may create the constraint, and the other side's
            // observation supplies the second check-in
            self.observe_contact(contact.body_a, contact.body_b, &contact, collision_id, now);
            self.observe_contact(contact.body_b, contact.body_a, &contact, collision_id, now);
        }
    }

    fn observe_contact(
        &mut self,
        subject: BodyId,
        other: BodyId,
        contact: &ContactPoint,
        collision_id: u64,
        now: u64,
    ) {
        if let Some(handle) = self.registry.find_by_collision(collision_id) {
            if let Some(con) = self.registry.get_mut(handle) {
                con.check_in();
            }
            return;
        }

        // Only a cell touching a coated substrate can start a constraint.
        // A substrate observing a fresh contact delegates to the cell, so
        // quorum is reached no matter which body the engine lists first.
        let (cell_body, substrate_body) = if self.cell_by_body.contains_key(&subject)
            && self.substrates.contains_key(&other)
        {
            (subject, other)
        } else if self.substrates.contains_key(&subject) && self.cell_by_body.contains_key(&other)
        {
            (other, subject)
        } else {
            return;
        };
        let Some(&cell_idx) = self.cell_by_body.get(&cell_body) else {
            return;
        };
        let Some(&ligand_density) = self.substrates.get(&substrate_body) else {
            return;
        };
        let Some(segment) = contact.segment_index() else {
            return;
        };
        let segment = segment as usize;

        let cell = &mut self.cells[cell_idx];
        if segment >= cell.num_segments() {
            return;
        }
        let ligand_sites = (ligand_density * cell.kinetics.segment_area_um2(segment) as f64) as u64;

        for (i, sp) in self.species.iter().enumerate() {
            if !sp.binds_to_substrate() {
                continue;
            }
            let free = cell.kinetics.free_count(segment, i);
            if free < self.params.adhesion.receptors_per_constraint {
                continue;
            }
            let bound = cell.kinetics.bound_count(segment, i);

            let bonds = sp.bind_receptors(ligand_sites, free as u64, &mut self.rng);
            if bonds == 0 {
                continue;
            }
            let debited = cell.kinetics.debit_free(segment, i, bonds as f64);

            let lifespan = self.decay.draw_lifespan_ms(&mut self.rng);
            let max_bonds = free + bound;
            let strength = if max_bonds > 0.0 { debited / max_bonds } else { 0.0 };
            let limits = limits_for_strength(strength as f32, &self.decay);
            let joint = self
                .world
                .add_joint(substrate_body, cell_body, contact.point, limits);
            let con = AdhesionConstraint::new(
                collision_id,
                substrate_body,
                cell_body,
                cell_idx,
                segment,
                i,
                debited,
                max_bonds,
                joint,
                now,
                lifespan,
            );

            let handle = self.registry.insert(con);
            if let Some(con) = self.registry.get_mut(handle) {
                con.check_in();
            }
            self.stats.constraints_created += 1;
            log::debug!(
                "Constraint {} created: cell {} segment {} bonds {}",
                collision_id,
                cell_idx,
                segment,
                debited
            );
            // One constraint per collision id
            break;
        }
    }

    fn age_constraints(&mut self, now: u64) {
        for handle in self.registry.handles() {
            let Some(con) = self.registry.get_mut(handle) else {
                continue;
            };
            match con.update(now, &self.decay, &mut self.rng) {
                UpdateOutcome::Keep => {
                    if let Some(joint) = con.joint() {
                        let limits = con.joint_limits(&self.decay);
                        self.world.set_joint_limits(joint, limits);
                    }
                }
                UpdateOutcome::Retire => {
                    if let Some(mut con) = self.registry.remove(handle) {
                        let cell = &mut self.cells[con.cell];
                        con.destroy(&mut cell.kinetics, &mut self.world);
                        self.stats.constraints_retired += 1;
                    }
                }
            }
        }
    }

    fn maybe_export(&mut self, now: u64) {
        let Self {
            exporter,
            field,
            channel,
            cells,
            groups,
            species,
            world,
            ..
        } = self;
        let Some(exporter) = exporter.as_mut() else {
            return;
        };
        if !exporter.due(now) {
            return;
        }
        let exp_time = channel.experimental_time_ms(now);

        let result: Result<()> = (|| {
            for group in groups.iter() {
                let positions: Vec<Vec3> = group
                    .members
                    .iter()
                    .filter_map(|id| cells.iter().find(|c| c.id == *id))
                    .map(|c| world.body_position(c.body))
                    .collect();
                let com = group.center_of_mass(&positions);
                exporter.write_group(&GroupRecord {
                    time_ms: now,
                    experimental_time_ms: exp_time,
                    group: group.name.clone(),
                    com_x_um: com.x,
                    com_y_um: com.y,
                    com_z_um: com.z,
                    count: group.count(),
                })?;
            }

            for cell in cells.iter() {
                let pos = world.body_position(cell.body);
                let vel = world.body_linear_velocity(cell.body);
                exporter.write_cell(&CellRecord {
                    time_ms: now,
                    cell_id: cell.id,
                    x_um: pos.x,
                    y_um: pos.y,
                    z_um: pos.z,
                    vx_um_per_sec: vel.x,
                    vy_um_per_sec: vel.y,
                    vz_um_per_sec: vel.z,
                })?;

                for (i, sp) in species.iter().enumerate() {
                    for seg in 0..cell.num_segments() {
                        exporter.write_membrane(&MembraneRecord {
                            time_ms: now,
                            species: sp.name,
                            cell_id: cell.id,
                            segment: seg,
                            bound_receptors: cell.kinetics.bound_count(seg, i),
                            free_receptors: cell.kinetics.free_count(seg, i),
                            ligand_nM: cell.kinetics.ligand_nM(seg),
                        })?;
                    }
                }
            }

            let samples: Vec<f64> = channel
                .measure_stations_um()
                .iter()
                .map(|&d| field.concentration(d, exp_time))
                .collect();
            exporter.write_ligand_row(now, exp_time, &samples)?;
            Ok(())
        })();

        if let Err(e) = result {
            log::error!("Error writing output rows: {}", e);
        }
        exporter.mark_written(now);
    }
}

impl<W: PhysicsWorld> Drop for Simulation<W> {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn build_field(params: &Parameters, run_dir: Option<&PathBuf>) -> ConcentrationField {
    let chan = &params.channel;
    let source = chan.source_conc_nM;
    let sink = chan.sink_conc_nM;
    let tts_ms = chan.time_to_steady_ms();

    if source == sink {
        return ConcentrationField::linear(source, sink, chan.total_length_um, tts_ms);
    }

    let Some(dir) = run_dir else {
        log::info!("No data directory configured; using linear gradient");
        return ConcentrationField::linear(source, sink, chan.total_length_um, tts_ms);
    };
    if let Err(e) = std::fs::create_dir_all(dir) {
        log::warn!("Cannot create run directory ({}); using linear gradient", e);
        return ConcentrationField::linear(source, sink, chan.total_length_um, tts_ms);
    }

    let problem = SolverProblem {
        min_x_um: 1.0,
        max_x_um: chan.total_length_um,
        dist_steps: chan.dist_steps,
        time_steps: chan.time_steps,
        solve_time_sec: chan.solve_time_sec,
        source_conc_nM: source,
        diffusion_um2_per_sec: 200.0,
    };
    match run_solver(dir, &chan.solver_dir, &problem) {
        Ok(()) => {
            ConcentrationField::from_solver_output(dir, source, sink, chan.total_length_um, tts_ms)
        }
        Err(e) => {
            log::warn!("Cannot use differential equations ({}); using linear gradient", e);
            ConcentrationField::linear(source, sink, chan.total_length_um, tts_ms)
        }
    }
}

/// Seeding positions for cells just above the substrate: a shuffled grid
/// across the channel floor, one cell per grid square.
pub fn seed_positions(params: &Parameters, rng: &mut StdRng) -> Vec<Vec3> {
    let chan = &params.channel;
    let cells = &params.cells;
    let r = cells.radius_um;
    let padding = cells.seed_padding_um;

    let min = Vec3::new(
        -chan.channel_width_um / 2.0,
        -chan.channel_height_um / 2.0,
        -chan.channel_depth_um / 2.0,
    );
    let max = -min;

    let x_cells = (((max.x - min.x) / (2.0 * r + padding)) as usize).max(1);
    let z_cells = (((max.z - min.z) / (2.0 * r + padding)) as usize).max(1);
    let col_width = (max.x - min.x) / x_cells as f32;
    let row_width = (max.z - min.z) / z_cells as f32;
    let center_y = min.y + r + padding / 2.0;

    let max_cells = x_cells * z_cells;
    let count = cells.num_cells.min(max_cells);
    if cells.num_cells > max_cells {
        log::warn!(
            "Only {} of {} requested cells fit above the substrate",
            max_cells,
            cells.num_cells
        );
    }

    // Shuffle the grid squares so repeated runs with different seeds place
    // cells differently
    let mut indices: Vec<usize> = (0..max_cells).collect();
    for i in 0..max_cells {
        let swap = (rng.gen::<f64>() * max_cells as f64) as usize % max_cells;
        indices.swap(i, swap);
    }

    indices
        .into_iter()
        .take(count)
        .map(|idx| {
            let row = idx / x_cells;
            let col = idx % x_cells;
            Vec3::new(
                min.x + col as f32 * col_width + padding / 2.0 + r,
                center_y,
                min.z + row as f32 * row_width + padding / 2.0 + r,
            )
        })
        .collect()
}
