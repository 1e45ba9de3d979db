//! Geodesic triangular meshes on the unit sphere.
//!
//! A mesh owns vertices, undirected edges, and faces given as triples of
//! directed edges. Derived adjacency tables (face vertices, vertex edges,
//! vertex faces, realized triangles) are regenerated after every
//! structural change. A per-vertex scalar field and its accumulated
//! gradient field can be attached for interpolation queries.

pub mod integrate;
pub mod refine;

use crate::Point;
use crate::Vector;
use crate::geom::triangle::Triangle;
use serde::Serialize;
use std::collections::HashMap;
use std::f64::consts::PI;

/// A pair of vertex indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndirectedEdge {
    pub first: usize,
    pub second: usize,
}

impl UndirectedEdge {
    pub fn new(first: usize, second: usize) -> Self {
        Self { first, second }
    }
}

/// An undirected edge with a traversal direction.
///
/// `forward` means the edge is walked first-to-second; the resolvers below
/// replace the index-swapping of a signed representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectedEdge {
    pub edge: usize,
    pub forward: bool,
}

impl DirectedEdge {
    pub fn new(edge: usize, forward: bool) -> Self {
        Self { edge, forward }
    }

    /// Vertex this directed edge starts from.
    pub fn tail(&self, edges: &[UndirectedEdge]) -> usize {
        let e = &edges[self.edge];
        if self.forward { e.first } else { e.second }
    }

    /// Vertex this directed edge arrives at.
    pub fn head(&self, edges: &[UndirectedEdge]) -> usize {
        let e = &edges[self.edge];
        if self.forward { e.second } else { e.first }
    }
}

/// A face as a closed chain of three directed edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub edges: [DirectedEdge; 3],
}

impl Face {
    pub fn new(e0: DirectedEdge, e1: DirectedEdge, e2: DirectedEdge) -> Self {
        Self { edges: [e0, e1, e2] }
    }
}

/// Entity counts and element statistics of a mesh.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Statistics {
    pub vertices: usize,
    pub edges: usize,
    pub faces: usize,
    pub area_min: f64,
    pub area_max: f64,
    pub area_disparity: f64,
    pub diameter_max: f64,
}

impl Statistics {
    /// V - E + F; 2 for a closed topological sphere.
    pub fn euler(&self) -> isize {
        self.vertices as isize - self.edges as isize + self.faces as isize
    }
}

/// A triangular mesh over the unit sphere.
#[derive(Debug, Clone, Default)]
pub struct TriangularMesh {
    vertices: Vec<Point>,
    edges: Vec<UndirectedEdge>,
    faces: Vec<Face>,
    // Derived, rebuilt by populate():
    face_vertices: Vec<[usize; 3]>,
    vertex_edges: Vec<Vec<usize>>,
    vertex_faces: Vec<Vec<usize>>,
    triangles: Vec<Triangle>,
    // Optional nodal scalar field and its per-vertex gradient field.
    values: Vec<f64>,
    gradients: Vec<Vector>,
    // Parse / validation diagnostics.
    messages: Vec<String>,
    ready: bool,
}

impl TriangularMesh {
    /// Builds a mesh from raw entity lists and validates the topology.
    ///
    /// On a topology violation the mesh is returned with
    /// `is_ready() == false` and the problem described in `messages()`.
    pub fn from_parts(
        vertices: Vec<Point>,
        edges: Vec<UndirectedEdge>,
        faces: Vec<Face>,
    ) -> Self {
        let mut mesh = Self {
            vertices,
            edges,
            faces,
            ..Self::default()
        };
        mesh.populate();
        mesh
    }

    /// A mesh consisting of a single triangle.
    pub fn from_triangle(t: Triangle) -> Self {
        Self::from_parts(
            vec![t.a, t.b, t.c],
            vec![
                UndirectedEdge::new(0, 1),
                UndirectedEdge::new(1, 2),
                UndirectedEdge::new(2, 0),
            ],
            vec![Face::new(
                DirectedEdge::new(0, true),
                DirectedEdge::new(1, true),
                DirectedEdge::new(2, true),
            )],
        )
    }

    /// The regular icosahedron: 12 vertices, 30 edges, 20 faces, with all
    /// faces oriented counter-clockwise.
    pub fn icosahedron() -> Self {
        let lat = 0.5_f64.atan();
        let mut vertices = vec![Point::from_spherical(0.0, 0.0)];
        for k in 0..5 {
            vertices.push(Point::from_spherical(
                PI / 2.0 - lat,
                2.0 * PI * k as f64 / 5.0,
            ));
        }
        for k in 0..5 {
            vertices.push(Point::from_spherical(
                PI / 2.0 + lat,
                2.0 * PI * k as f64 / 5.0 + PI / 5.0,
            ));
        }
        vertices.push(Point::from_spherical(PI, 0.0));

        // Two polar caps and two staggered bands of triangles.
        let mut triples: Vec<[usize; 3]> = Vec::with_capacity(20);
        for k in 0..5 {
            let kn = (k + 1) % 5;
            triples.push([0, 1 + k, 1 + kn]);
            triples.push([1 + k, 6 + k, 1 + kn]);
            triples.push([1 + kn, 6 + k, 6 + kn]);
            triples.push([6 + k, 11, 6 + kn]);
        }

        let mut edges: Vec<UndirectedEdge> = Vec::with_capacity(30);
        let mut seen: HashMap<(usize, usize), usize> = HashMap::new();
        let mut resolve = |a: usize, b: usize| -> DirectedEdge {
            if let Some(&e) = seen.get(&(a, b)) {
                DirectedEdge::new(e, true)
            } else if let Some(&e) = seen.get(&(b, a)) {
                DirectedEdge::new(e, false)
            } else {
                let e = edges.len();
                seen.insert((a, b), e);
                edges.push(UndirectedEdge::new(a, b));
                DirectedEdge::new(e, true)
            }
        };
        let faces = triples
            .iter()
            .map(|&[a, b, c]| Face::new(resolve(a, b), resolve(b, c), resolve(c, a)))
            .collect();
        Self::from_parts(vertices, edges, faces)
    }

    /// Whether the last load or structural change validated cleanly.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Accumulated parse / validation messages.
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub(crate) fn log_message(&mut self, message: String) {
        self.messages.push(message);
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn edges(&self) -> &[UndirectedEdge] {
        &self.edges
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    /// Vertex indices of each face, in traversal order.
    pub fn face_vertices(&self) -> &[[usize; 3]] {
        &self.face_vertices
    }

    /// Indices of the faces incident to each vertex, increasing.
    pub fn vertex_faces(&self) -> &[Vec<usize>] {
        &self.vertex_faces
    }

    /// Indices of the edges whose first endpoint is each vertex.
    pub fn vertex_edges(&self) -> &[Vec<usize>] {
        &self.vertex_edges
    }

    /// Realized spherical triangles, one per face.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn statistics(&self) -> Statistics {
        let mut area_min = f64::MAX;
        let mut area_max = f64::MIN;
        let mut diameter_max = f64::MIN;
        for t in &self.triangles {
            let area = t.area();
            area_min = area_min.min(area);
            area_max = area_max.max(area);
            diameter_max = diameter_max.max(t.diameter());
        }
        Statistics {
            vertices: self.vertices.len(),
            edges: self.edges.len(),
            faces: self.faces.len(),
            area_min,
            area_max,
            area_disparity: area_max / area_min,
            diameter_max,
        }
    }

    /// Total spherical area; 4 pi for a closed mesh.
    pub fn area(&self) -> f64 {
        self.triangles.iter().map(Triangle::area).sum()
    }

    /// Total area of the flat triangles.
    pub fn area_euclidean(&self) -> f64 {
        self.triangles.iter().map(Triangle::area_euclidean).sum()
    }

    /// Rebuilds the derived tables and validates that every face's
    /// directed edges chain head-to-tail. The readiness flag is set only
    /// after validation passes.
    pub(crate) fn populate(&mut self) {
        self.ready = false;
        self.face_vertices.clear();
        self.vertex_edges.clear();
        self.vertex_faces.clear();
        self.triangles.clear();

        self.face_vertices.reserve(self.faces.len());
        self.triangles.reserve(self.faces.len());
        for (index, face) in self.faces.iter().enumerate() {
            let [d0, d1, d2] = face.edges;
            let a = d0.tail(&self.edges);
            let b = d1.tail(&self.edges);
            let c = d2.tail(&self.edges);
            let chains = d0.head(&self.edges) == b
                && d1.head(&self.edges) == c
                && d2.head(&self.edges) == a
                && a != b
                && b != c
                && c != a;
            if !chains {
                self.messages.push(format!(
                    "Error in Face #{index}: edges do not form a valid simplex"
                ));
                return;
            }
            self.face_vertices.push([a, b, c]);
            self.triangles.push(Triangle::new(
                self.vertices[a],
                self.vertices[b],
                self.vertices[c],
            ));
        }

        self.vertex_edges = vec![Vec::new(); self.vertices.len()];
        for (k, edge) in self.edges.iter().enumerate() {
            self.vertex_edges[edge.first].push(k);
        }

        self.vertex_faces = vec![Vec::new(); self.vertices.len()];
        for (k, fv) in self.face_vertices.iter().enumerate() {
            for &v in fv {
                self.vertex_faces[v].push(k);
            }
        }

        self.ready = true;
    }

    /// Index of the first face containing `p`, by linear scan.
    pub fn lookup(&self, p: &Point) -> Option<usize> {
        self.triangles.iter().position(|t| t.contains(p))
    }

    /// Attaches a nodal scalar field and accumulates the per-vertex
    /// gradient field from the face-local basis gradients.
    pub fn set_values(&mut self, values: Vec<f64>) {
        self.gradients = vec![Vector::default(); self.vertices.len()];
        for (k, t) in self.triangles.iter().enumerate() {
            for (i, &v) in self.face_vertices[k].iter().enumerate() {
                self.gradients[v] += t.basis_gradient(i) * values[v];
            }
        }
        self.values = values;
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn gradients(&self) -> &[Vector] {
        &self.gradients
    }

    /// Barycentric blend of the attached nodal values at `p`.
    ///
    /// Returns 0 when no values are attached or `p` cannot be located.
    pub fn interpolate(&self, p: &Point) -> f64 {
        let Some(k) = self.lookup(p) else { return 0.0 };
        if self.values.is_empty() {
            return 0.0;
        }
        let w = self.triangles[k].barycentric(p);
        let fv = self.face_vertices[k];
        w[0] * self.values[fv[0]] + w[1] * self.values[fv[1]] + w[2] * self.values[fv[2]]
    }

    /// Gradient of the piecewise-linear reconstruction at `p`, blending
    /// the basis gradients of the located face by the attached values.
    ///
    /// Returns the zero vector when no values are attached or `p` cannot
    /// be located.
    pub fn gradient(&self, p: &Point) -> Vector {
        let Some(k) = self.lookup(p) else {
            return Vector::default();
        };
        self.gradient_on_face(k, p, &self.values)
    }

    /// Gradient of the reconstruction of `values` at `p` on face `k`.
    pub(crate) fn gradient_on_face(&self, k: usize, p: &Point, values: &[f64]) -> Vector {
        if values.is_empty() {
            return Vector::default();
        }
        let t = &self.triangles[k];
        let fv = self.face_vertices[k];
        let mut g = Vector::default();
        for i in 0..3 {
            g += t.basis_gradient_at(i, p) * values[fv[i]];
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icosahedron_counts() {
        let mesh = TriangularMesh::icosahedron();
        assert!(mesh.is_ready());
        let stats = mesh.statistics();
        assert_eq!(stats.vertices, 12);
        assert_eq!(stats.edges, 30);
        assert_eq!(stats.faces, 20);
        assert_eq!(stats.euler(), 2);
    }

    #[test]
    fn test_icosahedron_orientation_and_area() {
        let mesh = TriangularMesh::icosahedron();
        for t in mesh.triangles() {
            assert_eq!(t.orientation(), 1);
        }
        assert!((mesh.area() - 4.0 * PI).abs() < 1e-10);
    }

    #[test]
    fn test_single_triangle_mesh() {
        let t = Triangle::new(
            Point::from_cartesian(1., 0., 0.),
            Point::from_cartesian(0., 1., 0.),
            Point::from_cartesian(0., 0., 1.),
        );
        let mesh = TriangularMesh::from_triangle(t);
        assert!(mesh.is_ready());
        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.faces().len(), 1);
        assert_eq!(mesh.face_vertices()[0], [0, 1, 2]);
    }

    #[test]
    fn test_bad_face_not_ready() {
        // Two edges sharing no chainable endpoint.
        let mesh = TriangularMesh::from_parts(
            vec![
                Point::from_cartesian(1., 0., 0.),
                Point::from_cartesian(0., 1., 0.),
                Point::from_cartesian(0., 0., 1.),
                Point::from_cartesian(0., 0., -1.),
            ],
            vec![
                UndirectedEdge::new(0, 1),
                UndirectedEdge::new(2, 3),
                UndirectedEdge::new(3, 0),
            ],
            vec![Face::new(
                DirectedEdge::new(0, true),
                DirectedEdge::new(1, true),
                DirectedEdge::new(2, true),
            )],
        );
        assert!(!mesh.is_ready());
        assert!(!mesh.messages().is_empty());
    }

    #[test]
    fn test_lookup_and_interpolate() {
        let mut mesh = TriangularMesh::icosahedron();
        let values: Vec<f64> = mesh.vertices().iter().map(|v| v.z()).collect();
        mesh.set_values(values);
        // Interpolating the nodal field reproduces it at the vertices.
        let v0 = mesh.vertices()[3];
        assert!((mesh.interpolate(&v0) - v0.z()).abs() < 1e-10);
        // Any point on the sphere lands in some face.
        let p = Point::from_spherical(1.0, 2.0);
        assert!(mesh.lookup(&p).is_some());
    }

    #[test]
    fn test_gradient_of_linear_field() {
        // The gradient of the reconstruction of z is tangent and points
        // towards the north pole in the upper hemisphere.
        let mut mesh = TriangularMesh::icosahedron();
        let values: Vec<f64> = mesh.vertices().iter().map(|v| v.z()).collect();
        mesh.set_values(values);
        let p = Point::from_spherical(0.8, 0.3);
        let g = mesh.gradient(&p);
        assert!(g.dot(&p.to_vector()).abs() < 1e-9);
        assert!(g.dz > 0.0);
    }
}
