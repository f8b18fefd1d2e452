//! Cell Migration Simulator - entry point
//!
//! Runs the biochemical kinetics and adhesion core headless against the
//! kinematic stub world. A real deployment swaps the stub for an engine
//! binding implementing `PhysicsWorld`.
//!
//! CLI Usage:
//!   cargo run                          # Default parameters, linear gradient
//!   cargo run -- -p data/parameters    # Load parameter JSONs from a dir
//!   cargo run -- --seed 7 --cells 3    # Override seed and population
//!   cargo run -- --adhesion-demo      # Inject a substrate contact per tick

use anyhow::Result;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use cell_migration_sim::physics::{ContactPoint, PhysicsWorld, StubPhysicsWorld};
use cell_migration_sim::sim::{seed_positions, Simulation};
use cell_migration_sim::Parameters;

struct CliArgs {
    params_dir: Option<String>,
    seed: Option<u64>,
    cells: Option<usize>,
    adhesion_demo: bool,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = CliArgs {
        params_dir: None,
        seed: None,
        cells: None,
        adhesion_demo: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-p" | "--params" => {
                i += 1;
                if i < args.len() {
                    parsed.params_dir = Some(args[i].clone());
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    parsed.seed = args[i].parse().ok();
                }
            }
            "--cells" => {
                i += 1;
                if i < args.len() {
                    parsed.cells = args[i].parse().ok();
                }
            }
            "--adhesion-demo" => parsed.adhesion_demo = true,
            "--help" | "-h" => {
                println!("Cell Migration Simulator");
                println!();
                println!("Usage: cell-migration-sim [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --params DIR    Load parameter JSONs from DIR");
                println!("      --seed N        Override the random seed");
                println!("      --cells N       Override the cell count");
                println!("      --adhesion-demo Inject a substrate contact each tick");
                println!("  -h, --help          Show this help");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument {:?}; try --help", other);
            }
        }
        i += 1;
    }
    parsed
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args();

    let mut params = match &args.params_dir {
        Some(dir) => Parameters::load_from_dir(dir),
        None => Parameters::load_or_default(),
    };
    if let Some(seed) = args.seed {
        params.run.seed = seed;
    }
    if let Some(cells) = args.cells {
        params.cells.num_cells = cells;
    }

    log::info!(
        "Starting run: seed {}, {} cells, {} -> {} nM over {} μm",
        params.run.seed,
        params.cells.num_cells,
        params.channel.source_conc_nM,
        params.channel.sink_conc_nM,
        params.channel.total_length_um
    );

    // Scene: a floor substrate and cells seeded just above it. Bodies are
    // owned by the physics side; the simulation only keeps their handles.
    let mut world = StubPhysicsWorld::new();
    let floor = world.spawn_static_body(Vec3::new(
        0.0,
        -params.channel.channel_height_um / 2.0,
        0.0,
    ));

    let mut placement_rng = StdRng::seed_from_u64(params.run.seed);
    let positions = seed_positions(&params, &mut placement_rng);
    let cell_bodies: Vec<_> = positions.iter().map(|&p| world.spawn_body(p)).collect();

    let mut sim = Simulation::new(params, world)?;
    sim.add_substrate(floor);
    for body in &cell_bodies {
        sim.add_cell(*body, "RPC");
    }

    println!("=== Cell Migration Simulator ===");
    println!("Cells: {}", sim.cells().len());
    println!(
        "Segments per cell: {}",
        sim.cells().first().map_or(0, |c| c.num_segments())
    );
    println!("Gradient mode: {:?}", sim.field_mut().mode());
    println!(
        "Time for gradient to reach window: {} ms",
        sim.channel().time_to_reach_ms()
    );
    println!();

    let demo_segment = sim.cells().first().map(|cell| {
        // Lowest segment of the first cell, the one a floor contact would hit
        (0..cell.num_segments())
            .min_by(|&a, &b| {
                let ya = cell.mesh().triangle_centroid(a).y;
                let yb = cell.mesh().triangle_centroid(b).y;
                ya.total_cmp(&yb)
            })
            .unwrap_or(0)
    });

    while !sim.finished() {
        if args.adhesion_demo {
            if let (Some(cell), Some(segment)) = (sim.cells().first(), demo_segment) {
                let body = cell.body;
                let radius = cell.radius_um();
                let position = sim.world().body_position(body);
                let contact = ContactPoint {
                    body_a: body,
                    body_b: floor,
                    point: position - Vec3::new(0.0, radius, 0.0),
                    penetration_depth_um: 0.01,
                    segment_a: Some(segment as u32),
                    segment_b: None,
                };
                sim.world_mut().set_contacts(vec![contact]);
            }
        }
        sim.step();
    }
    sim.teardown();

    println!("=== Run complete (t = {} ms) ===", sim.time_ms());
    let stats = sim.stats();
    println!("Contacts observed:   {}", stats.contacts_observed);
    println!("Constraints created: {}", stats.constraints_created);
    println!("Constraints retired: {}", stats.constraints_retired);
    println!();
    for (i, sp) in sim.species().iter().enumerate() {
        let free: f64 = sim.cells().iter().map(|c| c.kinetics.total_free(i)).sum();
        let bound: f64 = sim.cells().iter().map(|c| c.kinetics.total_bound(i)).sum();
        println!("{}: {:.0} free, {:.0} bound", sp.name, free, bound);
    }
    for cell in sim.cells() {
        let pos = sim.world().body_position(cell.body);
        println!(
            "Cell {}: position ({:.2}, {:.2}, {:.2}) μm",
            cell.id, pos.x, pos.y, pos.z
        );
    }

    Ok(())
}
