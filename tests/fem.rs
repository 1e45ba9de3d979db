//! End-to-end checks of the mesh, quadrature, and finite-element engine.

use cartosphere::cartogram::FiniteElementGlobe;
use cartosphere::fem::SteadyStateSolver;
use cartosphere::fem::TimeDependentSolver;
use cartosphere::io::{load_csm, save_csm};
use cartosphere::sht::spherical_harmonic;
use cartosphere::{Integrator, Point, Triangle, TriangularMesh};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::path::Path;

fn icosahedron_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/icosahedron.csm"))
}

#[test]
fn icosahedron_file_loads() {
    let mesh = load_csm(icosahedron_path()).unwrap();
    assert!(mesh.is_ready(), "messages: {:?}", mesh.messages());
    let stats = mesh.statistics();
    assert_eq!((stats.vertices, stats.edges, stats.faces), (12, 30, 20));
    assert_eq!(stats.euler(), 2);
}

#[test]
fn euler_invariant_under_refinement() {
    let mut mesh = load_csm(icosahedron_path()).unwrap();
    for k in 1..=3u32 {
        mesh.refine();
        let stats = mesh.statistics();
        assert_eq!(stats.euler(), 2);
        assert_eq!(stats.faces, 20 * 4usize.pow(k));
        assert_eq!(stats.edges, 30 * 4usize.pow(k));
        assert_eq!(stats.vertices, 2 + 10 * 4usize.pow(k));
    }
}

#[test]
fn integral_of_one_is_sphere_area() {
    let mut mesh = TriangularMesh::icosahedron();
    for _ in 0..3 {
        let integral = mesh.integrate(|_| 1.0, Integrator::Centroid);
        assert!((integral - 4.0 * PI).abs() < 1e-9);
        mesh.refine();
    }
}

#[test]
fn octant_quadrature_converges() {
    // Integral of x over the octant triangle is pi/4; the refinement
    // error of the three-vertex rule at least halves per level.
    let octant = Triangle::new(
        Point::from_cartesian(1., 0., 0.),
        Point::from_cartesian(0., 1., 0.),
        Point::from_cartesian(0., 0., 1.),
    );
    let mut mesh = TriangularMesh::from_triangle(octant);
    let mut previous = f64::MAX;
    for _ in 1..=5 {
        mesh.refine();
        let error = (mesh.integrate(|p| p.x(), Integrator::ThreeVertices) - FRAC_PI_4).abs();
        assert!(error < 0.55 * previous, "error {error:.3e} vs {previous:.3e}");
        previous = error;
    }
    // The centroid rule at level 5 is already inside the tolerance of
    // the reference scenario.
    let centroid = (mesh.integrate(|p| p.x(), Integrator::Centroid) - FRAC_PI_4).abs();
    assert!(centroid < 1e-3);
}

#[test]
fn save_load_is_idempotent() {
    let mesh = load_csm(icosahedron_path()).unwrap();
    let path = std::env::temp_dir().join("cartosphere_idempotent.csm");
    save_csm(&path, &mesh).unwrap();
    let reloaded = load_csm(&path).unwrap();
    assert!(reloaded.is_ready());
    assert_eq!(mesh.vertices().len(), reloaded.vertices().len());
    assert_eq!(mesh.edges().len(), reloaded.edges().len());
    assert_eq!(mesh.faces().len(), reloaded.faces().len());
    for (a, b) in mesh.vertices().iter().zip(reloaded.vertices()) {
        assert!((a.p() - b.p()).abs() < 1e-14);
        assert!((a.a() - b.a()).abs() < 1e-14);
    }
}

#[test]
fn laplace_eigenfunctions_converge() {
    // -lapl u = l(l+1) Y_{l,m} recovers u = Y_{l,m} up to a constant,
    // with the L2 error shrinking under refinement.
    for (l, m) in [(1usize, 0isize), (2, 1), (3, -2)] {
        let mut mesh = TriangularMesh::icosahedron();
        mesh.refine();
        let mut errors = Vec::new();
        for _ in 0..3 {
            let mut solver = SteadyStateSolver::new(&mesh, Integrator::Centroid);
            let eigenvalue = (l * (l + 1)) as f64;
            solver.solve(move |p| eigenvalue * spherical_harmonic(l, m, p.p(), p.a()));
            let solution = solver.solution();
            let mean = solution.iter().sum::<f64>() / solution.len() as f64;
            let aligned: Vec<f64> = solution.iter().map(|u| u - mean).collect();
            let error = mesh.lebesgue(
                &aligned,
                move |p| spherical_harmonic(l, m, p.p(), p.a()),
                Integrator::ThreeVertices,
            );
            errors.push(error);
            mesh.refine();
        }
        assert!(
            errors[1] < errors[0] && errors[2] < errors[1],
            "Y({l},{m}) errors not decreasing: {errors:?}"
        );
        assert!(errors[2] < 2e-2, "Y({l},{m}) final error {:.3e}", errors[2]);
    }
}

#[test]
fn steady_state_of_quadratic_harmonic() {
    // u = x^2 + y^2 - 2/3 is a combination of Y_{0,0} and Y_{2,m};
    // feeding -lapl u back through the solver recovers it.
    let u_exact = |p: &Point| p.x() * p.x() + p.y() * p.y() - 2.0 / 3.0;
    // -lapl u on the sphere: u has the l = 2 eigenvalue 6 on its
    // zero-mean part.
    let forcing = |p: &Point| 6.0 * u_exact(p);
    let mut errors = Vec::new();
    let mut mesh = TriangularMesh::icosahedron();
    mesh.refine();
    for _ in 0..3 {
        let mut solver = SteadyStateSolver::new(&mesh, Integrator::Centroid);
        solver.solve(forcing);
        let solution = solver.solution();
        let mean = solution.iter().sum::<f64>() / solution.len() as f64;
        let aligned: Vec<f64> = solution.iter().map(|u| u - mean).collect();
        errors.push(mesh.lebesgue(&aligned, u_exact, Integrator::ThreeVertices));
        mesh.refine();
    }
    assert!(
        errors[2] < errors[1] && errors[1] < errors[0],
        "errors not decreasing: {errors:?}"
    );
    assert!(errors[2] < 2e-2);
}

#[test]
fn diffusion_reaches_the_spherical_mean() {
    // g = 2 + z diffuses to the constant 2 with zero forcing.
    let mut mesh = TriangularMesh::icosahedron();
    mesh.refine();
    mesh.refine();
    let mut solver = TimeDependentSolver::new(&mesh, Integrator::Centroid);
    solver.set_forcing(|_| 0.0);
    solver.initialize(|p| 2.0 + p.z());
    let mut last_change = f64::MAX;
    for _ in 0..50 {
        last_change = solver.advance(1.0);
    }
    assert!(last_change < 1e-6);
    let worst = solver
        .solution()
        .iter()
        .map(|u| (u - 2.0).abs())
        .fold(0.0, f64::max);
    assert!(worst < 1e-2, "steady state off by {worst:.3e}");
}

#[test]
fn cartogram_ring_settles_south_of_the_equator() {
    // An equatorial ring advected by -grad u with u(0) = 2 + z drifts
    // to a common colatitude south of the equator, near the reference
    // target acos(-1/4).
    let mut mesh = TriangularMesh::icosahedron();
    mesh.refine();
    mesh.refine();
    let mut globe = FiniteElementGlobe::new(&mesh, Integrator::Centroid);
    globe.initialize(|p| 2.0 + p.z());
    let mut points: Vec<Point> = (0..24)
        .map(|k| Point::from_spherical(FRAC_PI_2, 2.0 * PI * k as f64 / 24.0))
        .collect();
    let azimuths: Vec<f64> = points.iter().map(|p| p.a()).collect();
    globe.transform(&mut points);

    for (p, &a) in points.iter().zip(&azimuths) {
        // The flow is meridional up to the mesh asymmetry: azimuths
        // stay close while colatitudes settle in a band south of the
        // equator.
        assert!((p.a() - a).abs() < 0.3, "azimuth drifted by {}", p.a() - a);
        assert!(
            (1.7..=2.25).contains(&p.p()),
            "colatitude {:.4} outside the settling band",
            p.p()
        );
    }
    let mean = points.iter().map(|p| p.p()).sum::<f64>() / points.len() as f64;
    assert!((1.95..=2.12).contains(&mean), "mean colatitude {mean:.4}");
}
