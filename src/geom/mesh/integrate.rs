//! Mesh-level quadrature: area-weighted sums of per-triangle integrals,
//! plus the L2 functionals of piecewise-linear nodal reconstructions.

use crate::Point;
use crate::geom::mesh::TriangularMesh;
use crate::geom::polygon::Polygon;
use crate::geom::triangle::Integrator;

impl TriangularMesh {
    /// Integral of `f` over the whole mesh: the sum of per-triangle
    /// integrals under the chosen rule.
    pub fn integrate<F>(&self, f: F, rule: Integrator) -> f64
    where
        F: Fn(&Point) -> f64,
    {
        self.integrate_dyn(&f, rule)
    }

    /// Non-generic core of [`TriangularMesh::integrate`]; see
    /// [`crate::geom::triangle::Triangle::integrate_dyn`] for why this
    /// takes a trait object rather than a generic parameter.
    pub(crate) fn integrate_dyn(&self, f: &dyn Fn(&Point) -> f64, rule: Integrator) -> f64 {
        self.triangles()
            .iter()
            .map(|t| t.integrate_dyn(f, rule))
            .sum()
    }

    /// Squared L2 norm of the piecewise-linear reconstruction of the
    /// nodal `values`.
    pub fn integrate_nodal(&self, values: &[f64], rule: Integrator) -> f64 {
        let mut integral = 0.0;
        for (k, t) in self.triangles().iter().enumerate() {
            let fv = self.face_vertices()[k];
            let f = |p: &Point| {
                let r = values[fv[0]] * t.basis(0, p)
                    + values[fv[1]] * t.basis(1, p)
                    + values[fv[2]] * t.basis(2, p);
                r * r
            };
            integral += t.integrate(f, rule);
        }
        integral
    }

    /// Squared L2 norm of the nodal `values` over the dual tessellation:
    /// each vertex weighs its value by the area of the spherical polygon
    /// through the centroids of its incident faces, sorted by bearing.
    /// The dual polygons tile the sphere exactly.
    pub fn integrate_dual(&self, values: &[f64]) -> f64 {
        let mut integral = 0.0;
        for (i, vertex) in self.vertices().iter().enumerate() {
            let mut corners: Vec<(f64, Point)> = self.vertex_faces()[i]
                .iter()
                .map(|&k| {
                    let centroid = self.triangles()[k].centroid();
                    (vertex.azimuth(&centroid), centroid)
                })
                .collect();
            // Ascending bearing walks the dual polygon counter-clockwise.
            corners.sort_by(|a, b| a.0.total_cmp(&b.0));
            let polygon = Polygon::new(corners.into_iter().map(|(_, p)| p).collect());
            integral += values[i] * values[i] * polygon.area();
        }
        integral
    }

    /// L2 distance between the reconstruction of `values` and `func`.
    pub fn lebesgue<F>(&self, values: &[f64], func: F, rule: Integrator) -> f64
    where
        F: Fn(&Point) -> f64,
    {
        let mut integral = 0.0;
        for (k, t) in self.triangles().iter().enumerate() {
            let fv = self.face_vertices()[k];
            let f = |p: &Point| {
                let r = values[fv[0]] * t.basis(0, p)
                    + values[fv[1]] * t.basis(1, p)
                    + values[fv[2]] * t.basis(2, p)
                    - func(p);
                r * r
            };
            integral += t.integrate(f, rule);
        }
        integral.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_integrate_one_is_sphere_area() {
        let mut mesh = TriangularMesh::icosahedron();
        for _ in 0..2 {
            let integral = mesh.integrate(|_| 1.0, Integrator::Centroid);
            assert!((integral - 4.0 * PI).abs() < 1e-9);
            mesh.refine();
        }
    }

    #[test]
    fn test_nodal_norm_of_ones() {
        // The three-vertex rule samples the reconstruction only at the
        // nodes, where it is exactly 1, so the squared norm is the area.
        let mesh = TriangularMesh::icosahedron();
        let ones = vec![1.0; mesh.vertices().len()];
        let integral = mesh.integrate_nodal(&ones, Integrator::ThreeVertices);
        assert!((integral - 4.0 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_dual_polygons_tile_the_sphere() {
        // The all-ones field turns the dual norm into the total area of
        // the dual tessellation.
        let mut mesh = TriangularMesh::icosahedron();
        for _ in 0..2 {
            let ones = vec![1.0; mesh.vertices().len()];
            let integral = mesh.integrate_dual(&ones);
            assert!((integral - 4.0 * PI).abs() < 1e-9);
            mesh.refine();
        }
    }

    #[test]
    fn test_lebesgue_of_exact_reconstruction() {
        // Comparing the all-ones reconstruction against the constant 1
        // at the nodes gives zero error.
        let mesh = TriangularMesh::icosahedron();
        let ones = vec![1.0; mesh.vertices().len()];
        let err = mesh.lebesgue(&ones, |_| 1.0, Integrator::ThreeVertices);
        assert!(err < 1e-9);
    }
}
