use clap::{Parser, ValueEnum};
use seepage_core::{
    CapillaryRule, FluDef, Injector, InjectorMode, InjectorTarget, Interp1, PoreModel, Reaction,
    ReactionComponent, Seepage, SeepageConfig, SeepageError, ThermalBinding, Vec3,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Reference models the runner can build
#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    /// Two cells at 1 MPa and 0 Pa joined by one face
    Pair,
    /// One isolated cell fed by a scheduled water injector
    Injector,
    /// Vertical column of water with methane rising under gravity
    Column,
    /// Hydrate dissociating in a heated chain of cells
    Hydrate,
}

/// Seepage engine headless runner
#[derive(Parser, Debug)]
#[command(name = "seepage-headless")]
#[command(about = "Run seepage reference scenarios from the command line", long_about = None)]
struct Args {
    /// Scenario to build
    #[arg(short, long, value_enum, default_value_t = Scenario::Pair)]
    scenario: Scenario,

    /// Simulated duration in seconds
    #[arg(short, long, default_value_t = 200.0)]
    duration: f64,

    /// Initial step size in seconds (adapted afterwards)
    #[arg(long, default_value_t = 1.0)]
    dt: f64,

    /// Report interval in seconds
    #[arg(short, long, default_value_t = 20.0)]
    report_interval: f64,

    /// Number of cells for the column and hydrate scenarios
    #[arg(short, long, default_value_t = 10)]
    cells: usize,

    /// Run every loop on a single thread
    #[arg(long)]
    sequential: bool,

    /// Continue from a saved model instead of building a scenario
    #[arg(long)]
    load: Option<String>,

    /// Save the final model as JSON
    #[arg(long)]
    save: Option<String>,

    /// Run the reference checks and exit
    #[arg(short, long)]
    validate: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    if args.validate {
        let failed = run_validation_checks();
        std::process::exit(i32::from(failed > 0));
    }

    if let Err(message) = run(&args) {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), String> {
    println!("=== Seepage Simulation ===\n");

    let mut model = match &args.load {
        Some(path) => Seepage::load(path).map_err(|e| e.to_string())?,
        None => build(args.scenario, args.cells).map_err(|e| e.to_string())?,
    };
    model.config.parallel = !args.sequential;
    model.set_dt(args.dt);

    println!(
        "Model: {} cells, {} faces, {} fluids, {} reactions, {} injectors",
        model.cell_count(),
        model.face_count(),
        model.fludefs().len(),
        model.reactions().len(),
        model.injectors().len()
    );
    let initial_mass = model.total_fluid_mass();
    println!("Initial fluid mass: {initial_mass:.6} kg\n");

    println!("Time(s)   | Steps | dt(s)     | P min(Pa)    | P max(Pa)    | Mass(kg)");
    println!("----------|-------|-----------|--------------|--------------|------------");
    let end = model.time() + args.duration;
    let interval = args.report_interval.max(f64::EPSILON);
    let mut next_report = model.time();
    let mut steps = 0;
    while model.time() < end {
        if model.time() >= next_report {
            print_row(&model, steps);
            next_report += interval;
        }
        let target = next_report.min(end);
        steps += model.run_until(target).map_err(|e| e.to_string())?;
    }
    print_row(&model, steps);

    println!("\n=== Simulation Complete ===");
    println!("Final time: {:.1}s after {} steps", model.time(), model.step());
    println!(
        "Fluid mass change: {:+.6e} kg",
        model.total_fluid_mass() - initial_mass
    );
    for (slot, def) in model.fludefs().iter().enumerate() {
        println!("  {:<10} {:.6} kg", def.name(), model.fluid_mass(slot));
    }

    if let Some(path) = &args.save {
        model.save(path).map_err(|e| e.to_string())?;
        info!(path = %path, "Saved model");
    }
    Ok(())
}

fn print_row(model: &Seepage, steps: u64) {
    let snapshot = model.snapshot();
    let (low, high) = snapshot.pressure_range().unwrap_or((0.0, 0.0));
    println!(
        "{:9.1} | {:5} | {:9.3e} | {:12.1} | {:12.1} | {:10.4}",
        snapshot.time,
        steps,
        model.dt(),
        low,
        high,
        snapshot.total_mass()
    );
}

fn water() -> Result<FluDef, SeepageError> {
    FluDef::constant("water", 1000.0, 1.0e-3, 4200.0)
}

fn methane() -> Result<FluDef, SeepageError> {
    FluDef::constant("methane", 100.0, 1.1e-5, 2200.0)
}

fn build(scenario: Scenario, cells: usize) -> Result<Seepage, SeepageError> {
    match scenario {
        Scenario::Pair => build_pair(),
        Scenario::Injector => build_injector(),
        Scenario::Column => build_column(cells.max(2)),
        Scenario::Hydrate => build_hydrate(cells.max(2)),
    }
}

fn build_pair() -> Result<Seepage, SeepageError> {
    let mut model = Seepage::default();
    model.add_fludef(water()?);
    let pore = PoreModel::new(1.0, 1.0e-9)?;
    let a = model.add_cell(Vec3::zeros(), pore);
    let b = model.add_cell(Vec3::new(1.0, 0.0, 0.0), pore);
    model.add_face(a, b, 1.0e-6)?;
    model.fill(a, 1.0e6, &[1.0.into()])?;
    model.fill(b, 0.0, &[1.0.into()])?;
    Ok(model)
}

fn build_injector() -> Result<Seepage, SeepageError> {
    let mut model = Seepage::default();
    model.add_fludef(water()?);
    let cell = model.add_cell(Vec3::zeros(), PoreModel::new(1.0, 1.0e-9)?);
    model.fill(cell, 0.0, &[1.0.into()])?;
    model.add_injector(Injector::new(
        cell,
        InjectorTarget::Fluid { path: vec![0] },
        vec![(0.0, InjectorMode::Rate(1.0e-6)), (100.0, InjectorMode::Rate(0.0))],
    )?)?;
    Ok(model)
}

fn build_column(cells: usize) -> Result<Seepage, SeepageError> {
    let mut model = Seepage::new(SeepageConfig {
        gravity: Vec3::new(0.0, 0.0, -9.81),
        ..SeepageConfig::default()
    });
    model.add_fludef(water()?);
    model.add_fludef(methane()?);
    let kr = model.add_kr_curve(Interp1::new(vec![0.0, 0.1, 1.0], vec![0.0, 0.0, 1.0])?);
    model.add_capillary_rule(CapillaryRule {
        wetting: 0,
        non_wetting: 1,
        pc: Interp1::new(vec![0.0, 0.3, 1.0], vec![5.0e4, 1.0e4, 0.0])?,
    })?;

    let pore = PoreModel::new(1.0, 1.0e-9)?;
    for k in 0..cells {
        let depth = (cells - k) as f64;
        let cell = model.add_cell(Vec3::new(0.0, 0.0, k as f64), pore);
        let s_gas = if k < cells / 3 { 0.6 } else { 0.05 };
        model.fill(cell, 1.0e6 + 1.0e4 * depth, &[(1.0 - s_gas).into(), s_gas.into()])?;
        if k > 0 {
            let face = model.add_face(cell - 1, cell, 1.0e-12)?;
            model.set_face_kr(face, 1, Some(kr))?;
        }
    }
    Ok(model)
}

fn build_hydrate(cells: usize) -> Result<Seepage, SeepageError> {
    let mut model = Seepage::new(SeepageConfig {
        solid_fluids: vec![2],
        ..SeepageConfig::default()
    });
    let t_key = model.reg_cell_key("temperature");
    let mc_key = model.reg_cell_key("heat_capacity");
    let g_key = model.reg_face_key("heat_conductance");
    model.config.thermal = Some(ThermalBinding {
        cell_temp: t_key,
        cell_capacity: mc_key,
        face_conductance: g_key,
    });
    model.add_fludef(water()?);
    model.add_fludef(methane()?);
    model.add_fludef(FluDef::constant("hydrate", 910.0, 1.0, 2100.0)?);

    let pore = PoreModel::new(1.0, 1.0e-9)?;
    for i in 0..cells {
        let cell = model.add_cell(Vec3::new(i as f64, 0.0, 0.0), pore);
        model.fill(cell, 5.0e6, &[0.3.into(), 0.1.into(), 0.6.into()])?;
        if let Some(state) = model.cell_mut(cell) {
            state.attrs.set(t_key, 280.0);
            state.attrs.set(mc_key, 2.0e6);
        }
        if i > 0 {
            let face = model.add_face(cell - 1, cell, 1.0e-13)?;
            if let Some(face) = model.face_mut(face) {
                face.attrs.set(g_key, 50.0);
            }
        }
    }
    model.add_injector(Injector::new(
        0,
        InjectorTarget::Heat {
            temp_attr: t_key,
            capacity_attr: mc_key,
        },
        vec![(0.0, InjectorMode::Temperature { value: 320.0, conductance: 500.0 })],
    )?)?;

    let mut reaction = Reaction::new(
        "hydrate dissociation",
        Interp1::linear(1.0e6, 275.0, 1.0e7, 290.0)?,
        Interp1::new(vec![-20.0, 0.0, 20.0], vec![-1.0e-3, 0.0, 1.0e-3])?,
    )
    .with_heat(-4.3e5, 285.0)
    .with_cell_thermal(t_key, Some(mc_key));
    reaction
        .add_component(ReactionComponent::new(vec![2], -1.0))
        .add_component(ReactionComponent::new(vec![0], 0.87))
        .add_component(ReactionComponent::new(vec![1], 0.13));
    model.add_reaction(reaction)?;
    Ok(model)
}

/// Run the reference scenarios, returning the number of failed checks
fn run_validation_checks() -> usize {
    println!("\n=== Running Validation Checks ===\n");
    let checks: [(&str, fn() -> Result<bool, String>); 3] = [
        ("Pair equilibrates at the mean pressure", check_pair),
        ("Injector delivers 0.1 kg", check_injector),
        ("Column conserves mass", check_column),
    ];
    let mut failed = 0;
    for (name, check) in checks {
        match check() {
            Ok(true) => println!("  PASS: {name}"),
            Ok(false) => {
                println!("  FAIL: {name}");
                failed += 1;
            }
            Err(message) => {
                warn!(check = name, error = %message, "Check could not run");
                println!("  ERROR: {name}: {message}");
                failed += 1;
            }
        }
    }
    println!("\n{} of {} checks passed", checks.len() - failed, checks.len());
    failed
}

fn check_pair() -> Result<bool, String> {
    let mut model = build_pair().map_err(|e| e.to_string())?;
    model.run_until(10.0).map_err(|e| e.to_string())?;
    let snapshot = model.snapshot();
    println!(
        "  Pressures: {:.1} Pa / {:.1} Pa",
        snapshot.cells[0].pressure, snapshot.cells[1].pressure
    );
    Ok(snapshot
        .cells
        .iter()
        .all(|c| (c.pressure - 5.0e5).abs() < 1.0))
}

fn check_injector() -> Result<bool, String> {
    let mut model = build_injector().map_err(|e| e.to_string())?;
    let before = model.total_fluid_mass();
    model.run_until(200.0).map_err(|e| e.to_string())?;
    let added = model.total_fluid_mass() - before;
    println!("  Added mass: {added:.9} kg");
    Ok((added - 0.1).abs() < 1.0e-9)
}

fn check_column() -> Result<bool, String> {
    let mut model = build_column(10).map_err(|e| e.to_string())?;
    let before = model.total_fluid_mass();
    model.run_until(1.0e3).map_err(|e| e.to_string())?;
    let drift = (model.total_fluid_mass() - before).abs() / before;
    println!("  Relative mass drift: {drift:.3e}");
    Ok(drift < 1.0e-10)
}
