//! Galerkin assembly of the stiffness and mass operators and the load
//! vector over a triangular mesh.
//!
//! The piecewise-linear nodal basis on each spherical triangle is
//! expressed through the poles of the directed edges opposite each
//! vertex: taking the pole of the edge *as traversed by the face* keeps
//! it on the triangle's side, so no orientation fixups are needed
//! downstream. The gradient inner products reduce to the cosine of the
//! spherical angle subtended at the quadrature point by two poles, times
//! the two gradient magnitudes.

use crate::Point;
use crate::fem::sparse::CsrMatrix;
use crate::geom::mesh::TriangularMesh;
use crate::geom::point::angle;
use crate::geom::triangle::Integrator;
use std::f64::consts::FRAC_PI_2;

/// Poles of the directed edges opposite each vertex of face `k`.
fn face_poles(mesh: &TriangularMesh, k: usize) -> [Point; 3] {
    let face = &mesh.faces()[k];
    let mut poles = [Point::invalid(); 3];
    for i in 0..3 {
        // Opposite vertex 0 (A) is the second directed edge (B -> C),
        // and so on cyclically.
        let de = face.edges[(i + 1) % 3];
        let tail = mesh.vertices()[de.tail(mesh.edges())];
        let head = mesh.vertices()[de.head(mesh.edges())];
        poles[i] = Point::from_vector(&tail.to_vector().cross(&head.to_vector()));
    }
    poles
}

/// Inverse heights 1 / (pi/2 - d(pole_i, v_i)) of the three bases.
fn face_magnitudes(mesh: &TriangularMesh, k: usize, poles: &[Point; 3]) -> [f64; 3] {
    let fv = mesh.face_vertices()[k];
    let mut magnitudes = [0.0; 3];
    for i in 0..3 {
        let vertex = &mesh.vertices()[fv[i]];
        magnitudes[i] = 1.0 / (FRAC_PI_2 - crate::geom::point::distance(&poles[i], vertex));
    }
    magnitudes
}

/// Scatters per-face local 3x3 blocks into a CSR matrix.
///
/// Candidate entries are the diagonal plus both directions of every
/// undirected edge; each candidate sums the local contributions of the
/// faces incident to both of its vertices.
fn assemble(mesh: &TriangularMesh, local: &[[[f64; 3]; 3]]) -> CsrMatrix {
    let n = mesh.vertices().len();
    let mut candidates = Vec::with_capacity(n + 2 * mesh.edges().len());
    for i in 0..n {
        candidates.push((i, i));
    }
    for edge in mesh.edges() {
        candidates.push((edge.first, edge.second));
        candidates.push((edge.second, edge.first));
    }

    let vertex_faces = mesh.vertex_faces();
    let face_vertices = mesh.face_vertices();
    let mut triplets = Vec::with_capacity(candidates.len());
    for (row, col) in candidates {
        // The common support: faces incident to both vertices. The
        // per-vertex face lists are increasing, so intersect by merge.
        let (a, b) = (&vertex_faces[row], &vertex_faces[col]);
        let mut value = 0.0;
        let (mut p, mut q) = (0, 0);
        while p < a.len() && q < b.len() {
            if a[p] < b[q] {
                p += 1;
            } else if b[q] < a[p] {
                q += 1;
            } else {
                let face = a[p];
                let fv = &face_vertices[face];
                let i = fv.iter().position(|&v| v == row).unwrap();
                let j = fv.iter().position(|&v| v == col).unwrap();
                value += local[face][i][j];
                p += 1;
                q += 1;
            }
        }
        triplets.push((row, col, value));
    }
    CsrMatrix::from_triplets(n, n, &triplets)
}

/// Stiffness matrix A with A_ij = integral of grad e_i . grad e_j.
pub fn stiffness(mesh: &TriangularMesh, rule: Integrator) -> CsrMatrix {
    let mut local = vec![[[0.0; 3]; 3]; mesh.faces().len()];
    for (k, t) in mesh.triangles().iter().enumerate() {
        let poles = face_poles(mesh, k);
        let magnitudes = face_magnitudes(mesh, k, &poles);
        let block = &mut local[k];

        // Diagonals integrate unity against the squared magnitude; the
        // exact closed form would disagree with the quadrature used on
        // the off-diagonal entries.
        let area = t.integrate(|_| 1.0, rule);
        for i in 0..3 {
            block[i][i] = area * magnitudes[i] * magnitudes[i];
        }
        for i in 0..3 {
            for j in i + 1..3 {
                let integrand =
                    |x: &Point| angle(&poles[i], x, &poles[j]).cos();
                let value = t.integrate(integrand, rule) * magnitudes[i] * magnitudes[j];
                block[i][j] = value;
                block[j][i] = value;
            }
        }
    }
    assemble(mesh, &local)
}

/// Mass matrix M with M_ij = integral of e_i e_j.
pub fn mass(mesh: &TriangularMesh, rule: Integrator) -> CsrMatrix {
    let mut local = vec![[[0.0; 3]; 3]; mesh.faces().len()];
    for (k, t) in mesh.triangles().iter().enumerate() {
        let block = &mut local[k];
        for i in 0..3 {
            for j in i..3 {
                let integrand = |x: &Point| t.basis(i, x) * t.basis(j, x);
                let value = t.integrate(integrand, rule);
                block[i][j] = value;
                block[j][i] = value;
            }
        }
    }
    assemble(mesh, &local)
}

/// Load vector b with b_i = integral of f e_i over the star of vertex i.
pub fn load<F>(mesh: &TriangularMesh, f: F, rule: Integrator) -> Vec<f64>
where
    F: Fn(&Point) -> f64,
{
    let mut b = vec![0.0; mesh.vertices().len()];
    for (i, entry) in b.iter_mut().enumerate() {
        for &k in &mesh.vertex_faces()[i] {
            let t = &mesh.triangles()[k];
            let fv = mesh.face_vertices()[k];
            let local = fv.iter().position(|&v| v == i).unwrap();
            *entry += t.integrate(|p| f(p) * t.basis(local, p), rule);
        }
    }
    b
}
