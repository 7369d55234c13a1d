use clap::Parser;
use wind_sim_core::{SnapshotPair, Vec3, WindField, WindFieldConfig, WindInjector};

/// Wind field simulation demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "wind-sim-demo")]
#[command(about = "Volumetric wind field simulation demo", long_about = None)]
struct Args {
    /// Simulation duration in seconds
    #[arg(short, long, default_value_t = 10.0)]
    duration: f32,

    /// Time step in seconds
    #[arg(long, default_value_t = 0.016)]
    dt: f32,

    /// Grid cells along X
    #[arg(long, default_value_t = 16)]
    size_x: usize,

    /// Grid cells along Y
    #[arg(long, default_value_t = 16)]
    size_y: usize,

    /// Grid cells along Z
    #[arg(long, default_value_t = 8)]
    size_z: usize,

    /// Cell size in world units
    #[arg(long, default_value_t = 50.0)]
    cell_size: f32,

    /// Noise seed
    #[arg(long, default_value_t = 1337)]
    seed: u32,

    /// Turbulence strength multiplier
    #[arg(long, default_value_t = 2.0)]
    turbulence: f32,

    /// Prevailing wind along X (world units/s)
    #[arg(long, default_value_t = 0.0)]
    bias_x: f32,

    /// Injected updraft speed (world units/s, 0 disables the injector)
    #[arg(short, long, default_value_t = 10.0)]
    inject_speed: f32,

    /// Injection radius in world units
    #[arg(long, default_value_t = 100.0)]
    inject_radius: f32,

    /// Seconds between injections
    #[arg(long, default_value_t = 0.2)]
    inject_interval: f32,

    /// Report interval in seconds
    #[arg(short, long, default_value_t = 1.0)]
    report_interval: f32,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = WindFieldConfig {
        size_x: args.size_x,
        size_y: args.size_y,
        size_z: args.size_z,
        cell_size: args.cell_size,
        noise_seed: args.seed,
        turbulence_strength: args.turbulence,
        wind_bias: Vec3::new(args.bias_x, 0.0, 0.0),
        ..Default::default()
    };

    let mut field = WindField::new(config);
    if let Err(e) = field.initialize() {
        eprintln!("Failed to initialize wind field: {e}");
        std::process::exit(1);
    }

    let extent = Vec3::new(
        (args.size_x - 1) as f32,
        (args.size_y - 1) as f32,
        (args.size_z - 1) as f32,
    ) * args.cell_size;
    let center = extent * 0.5;

    let mut injector = WindInjector::default();
    injector.position = Vec3::new(center.x, center.y, 0.0);
    injector.velocity = Vec3::new(0.0, 0.0, args.inject_speed);
    injector.radius = args.inject_radius;
    injector.enabled = args.inject_speed > 0.0;
    injector.injection_interval = args.inject_interval;

    let mut snapshots = SnapshotPair::new(&field);

    let probes = [
        ("center      ", center),
        ("above source", Vec3::new(center.x, center.y, args.cell_size)),
        ("corner      ", Vec3::zeros()),
    ];

    println!(
        "Wind field: {}x{}x{} cells, cell_size={:.1}, seed={}",
        args.size_x, args.size_y, args.size_z, args.cell_size, args.seed
    );
    println!(
        "Running {:.1}s at dt={:.3}s, injector={}",
        args.duration,
        args.dt,
        if injector.enabled { "on" } else { "off" }
    );

    let mut time = 0.0_f32;
    let mut next_report = 0.0_f32;

    while time < args.duration {
        field.update(args.dt);
        injector.tick(&mut field, args.dt);
        snapshots.publish(&field);
        time += args.dt;

        if time >= next_report {
            next_report += args.report_interval;
            let frame = snapshots.latest();
            println!("t={time:6.2}s");
            for (name, pos) in probes {
                let v = frame.sample_at(pos);
                println!(
                    "  {name} ({:7.1},{:7.1},{:7.1}) -> ({:6.2}, {:6.2}, {:6.2})  |v|={:.2}",
                    pos.x,
                    pos.y,
                    pos.z,
                    v.x,
                    v.y,
                    v.z,
                    v.norm()
                );
            }
        }
    }

    let frame = snapshots.latest();
    let peak = frame
        .cells()
        .iter()
        .map(|v| v.norm())
        .fold(0.0_f32, f32::max);
    println!("Done: peak cell speed {peak:.2} across {} cells", frame.cells().len());
}
