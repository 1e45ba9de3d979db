use anyhow::{Result, bail};
use cartosphere::cartogram::{FiniteElementGlobe, SpectralGlobe};
use cartosphere::fem::SteadyStateSolver;
use cartosphere::io::{load_csm, read_points, save_csm, write_mtl, write_obj, write_obj_poly, write_points};
use cartosphere::sht::{Synthesis, Workspace, analysis, harmonic_index, spherical_harmonic};
use cartosphere::{Integrator, Point, TriangularMesh};
use clap::{Parser, Subcommand};
use log::{LevelFilter, info};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(
    name = "cartosphere",
    version,
    about = "Scalar fields on the unit sphere: spectral and finite-element engines",
    after_help = "See Z. Li and S. A. Aryana (2018)."
)]
struct Cli {
    /// Generate more messages
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a demo scenario
    Demo {
        /// Which demo to run (use "list" to enumerate)
        #[arg(default_value = "list")]
        scenario: String,
        /// Extra scenario arguments
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run the transform round-trip benchmark
    Benchmark,
    /// Visualize a mesh file
    Viz {
        /// Path of the input file
        input: PathBuf,
        /// Path of the output file
        output: PathBuf,
        /// Input format (csm)
        #[arg(short = 'i', long = "input-format", default_value = "csm")]
        input_format: String,
        /// Output format (obj | json)
        #[arg(short = 'o', long = "output-format", default_value = "obj")]
        output_format: String,
    },
    /// Generate a spherical cartogram from a point list
    Transform {
        /// Path of the input point list
        input: PathBuf,
        /// Path of the output point list
        output: PathBuf,
        /// Input format (points)
        #[arg(short = 'i', long = "input-format", default_value = "points")]
        input_format: String,
        /// Background mesh for the finite-element engine; disables -b
        #[arg(short = 'm', long = "mesh")]
        mesh: Option<PathBuf>,
        /// Bandlimit for the spectral engine
        #[arg(short = 'b', long = "bandlimit", default_value_t = 32)]
        bandlimit: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    match cli.command {
        Command::Demo { scenario, args } => run_demo(&scenario, &args),
        Command::Benchmark => run_benchmark(),
        Command::Viz {
            input,
            output,
            input_format,
            output_format,
        } => run_viz(&input, &output, &input_format, &output_format),
        Command::Transform {
            input,
            output,
            input_format,
            mesh,
            bandlimit,
        } => run_transform(&input, &output, &input_format, mesh.as_deref(), bandlimit),
    }
}

fn print_statistics(mesh: &TriangularMesh) {
    let stats = mesh.statistics();
    println!(
        "Statistics:\n    Euler: V - E + F = {} - {} + {} = {}\n    Area ratio: {:.6} (max {:.6}, min {:.6})\n    Max diameter: {:.6}",
        stats.vertices,
        stats.edges,
        stats.faces,
        stats.euler(),
        stats.area_disparity,
        stats.area_max,
        stats.area_min,
        stats.diameter_max
    );
}

fn run_demo(scenario: &str, args: &[String]) -> Result<()> {
    match scenario {
        "default" => demo_default(),
        "diffusion" => demo_diffusion(),
        "quadrature" => demo_quadrature(),
        "steady" => {
            if args.len() != 2 {
                bail!("this demo needs 2 arguments: L M");
            }
            demo_steady(args[0].parse()?, args[1].parse()?)
        }
        "cartogram" => demo_cartogram(),
        "refine" => {
            if args.len() != 1 {
                bail!("this demo needs 1 argument: PATH");
            }
            demo_refine(Path::new(&args[0]))
        }
        "list" => {
            println!(
                "Available demo SCENARIO:\n\
                 default            mesh statistics and a steady solve\n\
                 diffusion          implicit-Euler heat flow to the mean\n\
                 quadrature         refinement convergence on the octant\n\
                 steady L M         eigenfunction convergence for Y_L^M\n\
                 cartogram          equator ring advected by -grad u\n\
                 refine PATH        refine a CSM mesh five times\n\n\
                 Usage: cartosphere demo SCENARIO [ARGS...]"
            );
            Ok(())
        }
        other => bail!("unknown demo name: {other}"),
    }
}

fn demo_default() -> Result<()> {
    let mesh = TriangularMesh::icosahedron();
    println!("Built-in icosahedron mesh\n");
    print_statistics(&mesh);

    let mut solver = SteadyStateSolver::new(&mesh, Integrator::Centroid);
    solver.solve(|p| p.x() + p.y() + p.z());
    println!("\nSolver statistics:");
    println!("# Iterations:    {}", solver.iterations());
    println!("Estimated error: {:.3e}", solver.error());

    let solution = solver.solution().to_vec();
    write_obj_poly(Path::new("demo.obj"), &mesh, &solution)?;
    write_mtl(Path::new("cartosphere.mtl"))?;
    println!("Wrote demo.obj");
    Ok(())
}

fn demo_diffusion() -> Result<()> {
    let mut mesh = TriangularMesh::icosahedron();
    mesh.refine();
    print_statistics(&mesh);

    let mut solver = cartosphere::fem::TimeDependentSolver::new(&mesh, Integrator::Centroid);
    solver.set_forcing(|_| 0.0);
    solver.initialize(|p| 2.0 + p.z());
    for step in 0..20 {
        let indicator = solver.advance(1.0);
        let (min, max) = solver
            .solution()
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &u| {
                (lo.min(u), hi.max(u))
            });
        println!(
            "Iteration #{step}\n Time Step  1\n Indicator {indicator:.6e}\n Range     {:.6e} [{min:.6}, {max:.6}]",
            max - min
        );
    }
    Ok(())
}

fn demo_quadrature() -> Result<()> {
    let octant = cartosphere::Triangle::new(
        Point::from_cartesian(0., 0., 1.),
        Point::from_cartesian(1., 0., 0.),
        Point::from_cartesian(0., 1., 0.),
    );
    let original = TriangularMesh::from_triangle(octant);
    print_statistics(&original);
    println!("Exact value for integral: {}", std::f64::consts::FRAC_PI_4);

    for (label, rule) in [
        ("centroid", Integrator::Centroid),
        ("three-vertex", Integrator::ThreeVertices),
    ] {
        println!("Power-2 refinement of the {label} rule:");
        let mut mesh = original.clone();
        for level in 1..=10 {
            mesh.refine();
            let integral = mesh.integrate(|p| p.x(), rule);
            println!("Level {level} integral: {integral:.12}");
        }
    }
    Ok(())
}

fn demo_steady(l: usize, m: isize) -> Result<()> {
    if m.unsigned_abs() > l {
        bail!("need |M| <= L");
    }
    let mut mesh = TriangularMesh::icosahedron();
    let eigenvalue = (l * (l + 1)) as f64;
    for level in 0..=3 {
        let mut solver = SteadyStateSolver::new(&mesh, Integrator::Centroid);
        solver.solve(|p| eigenvalue * spherical_harmonic(l, m, p.p(), p.a()));
        // The solution is determined up to a constant; align the means
        // before measuring the error.
        let solution = solver.solution();
        let mean = solution.iter().sum::<f64>() / solution.len() as f64;
        let aligned: Vec<f64> = solution.iter().map(|u| u - mean).collect();
        let error = mesh.lebesgue(
            &aligned,
            |p| spherical_harmonic(l, m, p.p(), p.a()),
            Integrator::ThreeVertices,
        );
        println!(
            "level={level} h={:.6} e={error:.6e}",
            mesh.statistics().diameter_max
        );
        mesh.refine();
    }
    Ok(())
}

fn demo_cartogram() -> Result<()> {
    let mut mesh = TriangularMesh::icosahedron();
    for _ in 0..3 {
        mesh.refine();
    }
    print_statistics(&mesh);

    let mut globe = FiniteElementGlobe::new(&mesh, Integrator::Centroid);
    globe.initialize(|p| 2.0 + p.z());
    let mut points: Vec<Point> = (-180..180)
        .map(|k| Point::from_spherical(std::f64::consts::FRAC_PI_2, (k as f64).to_radians()))
        .collect();
    let steps = globe.transform(&mut points);

    // Reference target of the research scenario.
    let target = (-0.25_f64).acos();
    let colatitudes: Vec<f64> = points.iter().map(|p| p.p()).collect();
    let mean = colatitudes.iter().sum::<f64>() / colatitudes.len() as f64;
    let spread = (colatitudes
        .iter()
        .map(|p| (p - mean) * (p - mean))
        .sum::<f64>()
        / colatitudes.len() as f64)
        .sqrt();
    println!("Advected {} points in {steps} steps", points.len());
    println!(
        "Final colatitude {:.4} +/- {:.2e} (reference target acos(-1/4) = {:.4})",
        mean, spread, target
    );
    Ok(())
}

fn demo_refine(path: &Path) -> Result<()> {
    let mut mesh = load_csm(path)?;
    if !mesh.is_ready() {
        for message in mesh.messages() {
            eprintln!("{message}");
        }
        bail!("mesh is not ready");
    }
    for k in 1..=5 {
        mesh.refine();
        let name = format!("{}.{k}.csm", path.display());
        save_csm(Path::new(&name), &mesh)?;
        println!("Wrote {name}");
    }
    Ok(())
}

fn run_benchmark() -> Result<()> {
    println!("[STARTING BENCHMARK]");
    println!("#1: Discrete Real S2-Fourier Transforms\n");
    println!("  hat(l,m)=1/(1+l+|m|), synthesized then analyzed back.");
    println!("  Max error is the largest absolute error among all harmonics.\n");
    println!("  | ## |  BW  | makews (s) | synthesis (s) | analysis (s) |  max error  |");
    println!("  | --:| ----:| ----------:| -------------:| ------------:| -----------:|");

    for i in 1..=9u32 {
        let b = 1usize << i;
        let mut hats = vec![0.0; b * b];
        for l in 0..b {
            for m in -(l as isize)..=(l as isize) {
                hats[harmonic_index(b, l, m)] = 1.0 / (1 + l + m.unsigned_abs()) as f64;
            }
        }

        let start = Instant::now();
        let ws = Workspace::new(b);
        let t_make = start.elapsed().as_secs_f64();

        let start = Instant::now();
        let mut synth = Synthesis::new(b);
        let data = synth.synthesis(&ws, &hats);
        let t_synthesis = start.elapsed().as_secs_f64();

        let start = Instant::now();
        let recovered = analysis(&ws, &data);
        let t_analysis = start.elapsed().as_secs_f64();

        let mut max_error = 0.0_f64;
        for (a, r) in hats.iter().zip(&recovered) {
            let error = (a - r).abs();
            if error.is_nan() {
                max_error = f64::NAN;
                break;
            }
            max_error = max_error.max(error);
        }
        println!(
            "  | {i:2} | {b:4} | {t_make:10.3} | {t_synthesis:13.3} | {t_analysis:12.3} | {max_error:11.4e} |"
        );
    }
    Ok(())
}

fn run_viz(input: &Path, output: &Path, input_format: &str, output_format: &str) -> Result<()> {
    info!("Input path: {} (format: {input_format})", input.display());
    info!("Output path: {} (format: {output_format})", output.display());
    if input_format != "csm" {
        bail!("unhandled input format: {input_format}");
    }
    let mesh = load_csm(input)?;
    if !mesh.is_ready() {
        for message in mesh.messages() {
            eprintln!("{message}");
        }
        bail!("mesh is not ready");
    }
    match output_format {
        "obj" => {
            write_obj(output, &mesh, None)?;
            write_mtl(&output.with_file_name("cartosphere.mtl"))?;
        }
        "json" => {
            let file = std::fs::File::create(output)?;
            serde_json::to_writer_pretty(file, &mesh.statistics())?;
        }
        other => bail!("unhandled output format: {other}"),
    }
    println!("Wrote {}", output.display());
    Ok(())
}

fn run_transform(
    input: &Path,
    output: &Path,
    input_format: &str,
    mesh: Option<&Path>,
    bandlimit: usize,
) -> Result<()> {
    if input_format != "points" {
        bail!("unhandled input format: {input_format}");
    }
    println!("Collecting points to be transformed...");
    let mut points = read_points(input)?;
    println!("Points loaded: {}", points.len());

    match mesh {
        Some(mesh_path) => {
            println!("Mesh specified: {}", mesh_path.display());
            println!("Invoking the finite-element engine...");
            let mesh = load_csm(mesh_path)?;
            if !mesh.is_ready() {
                for message in mesh.messages() {
                    eprintln!("{message}");
                }
                bail!("mesh is not ready");
            }
            let density = nodal_density(&mesh, &points);
            let mut globe = FiniteElementGlobe::new(&mesh, Integrator::Centroid);
            globe.initialize(|p| 1.0 + mesh_density(&mesh, &density, p));
            globe.transform(&mut points);
        }
        None => {
            println!("Bandlimit specified: {bandlimit}");
            println!("Invoking the spectral engine...");
            let mut globe = SpectralGlobe::new(bandlimit);
            let samples = points.clone();
            globe.initialize(|p| grid_density(&samples, p));
            globe.transform(&mut points);
        }
    }
    write_points(output, &points)?;
    println!("Wrote {}", output.display());
    Ok(())
}

/// Barycentric scatter of the point set onto the mesh vertices: the
/// density field the cartogram flow equalizes.
fn nodal_density(mesh: &TriangularMesh, points: &[Point]) -> Vec<f64> {
    let mut density = vec![0.0; mesh.vertices().len()];
    for p in points {
        if let Some(k) = mesh.lookup(p) {
            let weights = mesh.triangles()[k].barycentric(p);
            for (i, &v) in mesh.face_vertices()[k].iter().enumerate() {
                density[v] += weights[i];
            }
        }
    }
    let scale = points.len().max(1) as f64;
    for d in &mut density {
        *d /= scale;
    }
    density
}

fn mesh_density(mesh: &TriangularMesh, density: &[f64], p: &Point) -> f64 {
    match mesh.lookup(p) {
        Some(k) => {
            let weights = mesh.triangles()[k].barycentric(p);
            mesh.face_vertices()[k]
                .iter()
                .zip(weights)
                .map(|(&v, w)| density[v] * w)
                .sum()
        }
        None => 0.0,
    }
}

/// Gaussian-bump density estimate of the point set, sampled at `p`.
fn grid_density(points: &[Point], p: &Point) -> f64 {
    let width = 0.2_f64;
    let scale = 1.0 / (points.len().max(1) as f64);
    1.0 + points
        .iter()
        .map(|q| {
            let d = cartosphere::geom::point::distance(p, q);
            (-d * d / (2.0 * width * width)).exp() * scale
        })
        .sum::<f64>()
}
