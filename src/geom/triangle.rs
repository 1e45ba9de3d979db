use crate::Point;
use crate::Vector;
use crate::geom::arc::Arc;
use crate::geom::clamp_unit;
use crate::geom::mesh::TriangularMesh;
use crate::geom::point::{angle, distance};
use std::f64::consts::{FRAC_PI_2, PI};

/// Quadrature rule for integrals over a spherical triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Integrator {
    /// Function value at the centroid times the area.
    Centroid,
    /// Mean of the three vertex values times the area.
    ThreeVertices,
    /// Simpson-like blend: (f(A)+f(B)+f(C)+3 f(centroid))/6 times the area.
    Simpsons,
    /// Mid-edge refinement `k` times, then the centroid rule per piece.
    Refinement(u32),
}

/// A spherical triangle with ordered vertices.
///
/// Vertices are assumed to form a valid, non-degenerate triangle with a
/// consistent (counter-clockwise) orientation.
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub a: Point,
    pub b: Point,
    pub c: Point,
}

impl Triangle {
    pub fn new(a: Point, b: Point, c: Point) -> Self {
        Self { a, b, c }
    }

    pub fn vertex(&self, index: usize) -> &Point {
        match index {
            0 => &self.a,
            1 => &self.b,
            _ => &self.c,
        }
    }

    /// The arc opposite vertex `index`, traversed in face order.
    fn opposite_arc(&self, index: usize) -> Arc {
        match index {
            0 => Arc::new(self.b, self.c),
            1 => Arc::new(self.c, self.a),
            _ => Arc::new(self.a, self.b),
        }
    }

    /// Sign of the mixed product (A-B) x (B-C) . C: +1 for
    /// counter-clockwise orientation, -1 for clockwise, 0 if degenerate.
    pub fn orientation(&self) -> i32 {
        let ab = self.a.to_vector() - self.b.to_vector();
        let bc = self.b.to_vector() - self.c.to_vector();
        let product = ab.cross(&bc).dot(&self.c.to_vector());
        if product > 0.0 {
            1
        } else if product < 0.0 {
            -1
        } else {
            0
        }
    }

    /// Area by the spherical excess A + B + C - pi.
    pub fn area(&self) -> f64 {
        let la = distance(&self.b, &self.c);
        let lb = distance(&self.c, &self.a);
        let lc = distance(&self.a, &self.b);
        let aa = clamp_unit((la.cos() - lb.cos() * lc.cos()) / (lb.sin() * lc.sin())).acos();
        let ab = clamp_unit((lb.cos() - lc.cos() * la.cos()) / (lc.sin() * la.sin())).acos();
        let ac = clamp_unit((lc.cos() - la.cos() * lb.cos()) / (la.sin() * lb.sin())).acos();
        aa + ab + ac - PI
    }

    /// Area of the flat triangle through the three vertices.
    pub fn area_euclidean(&self) -> f64 {
        let ab = self.b.to_vector() - self.a.to_vector();
        let ac = self.c.to_vector() - self.a.to_vector();
        0.5 * ab.cross(&ac).length()
    }

    /// Normalized vertex sum.
    pub fn centroid(&self) -> Point {
        let sum = self.a.to_vector() + self.b.to_vector() + self.c.to_vector();
        Point::from_vector(&sum)
    }

    /// Whether `p` is on the inside half of each bounding arc.
    pub fn contains(&self, p: &Point) -> bool {
        Arc::new(self.a, self.b).encloses(p)
            && Arc::new(self.b, self.c).encloses(p)
            && Arc::new(self.c, self.a).encloses(p)
    }

    /// Diameter of the circumscribed cap, from the distance of the origin
    /// to the plane through the three vertices.
    pub fn diameter(&self) -> f64 {
        let ab = self.b.to_vector() - self.a.to_vector();
        let ac = self.c.to_vector() - self.a.to_vector();
        match ab.cross(&ac).normalize() {
            Some(n) => 2.0 * clamp_unit(self.a.to_vector().dot(&n)).acos(),
            None => 0.0,
        }
    }

    /// Spherical barycentric coordinates of `p`, normalized to sum 1.
    ///
    /// Each weight is the ratio of the distance of `p` to the opposite
    /// great circle over the distance of the matching vertex to it.
    pub fn barycentric(&self, p: &Point) -> [f64; 3] {
        let mut t = [0.0; 3];
        for (i, w) in t.iter_mut().enumerate() {
            let arc = self.opposite_arc(i);
            *w = arc.distance(p) / arc.distance(self.vertex(i));
        }
        let sum = t[0] + t[1] + t[2];
        [t[0] / sum, t[1] / sum, t[2] / sum]
    }

    /// Value of the piecewise-linear nodal basis of vertex `index` at `p`:
    /// 1 at the vertex, 0 on the opposite edge.
    pub fn basis(&self, index: usize, p: &Point) -> f64 {
        let pole = self.opposite_arc(index).pole_point();
        let height = FRAC_PI_2 - distance(&pole, self.vertex(index));
        (FRAC_PI_2 - distance(&pole, p)) / height
    }

    /// Ambient gradient of the nodal basis of vertex `index`, evaluated at
    /// the vertex itself: the unit tangent towards the opposite edge's
    /// pole, scaled by the inverse height.
    pub fn basis_gradient(&self, index: usize) -> Vector {
        self.basis_gradient_at(index, self.vertex(index))
    }

    /// Ambient gradient of the nodal basis of vertex `index` evaluated at
    /// an arbitrary point of the triangle.
    pub fn basis_gradient_at(&self, index: usize, p: &Point) -> Vector {
        let pole = self.opposite_arc(index).pole_point();
        let height = FRAC_PI_2 - Arc::new(*self.vertex(index), pole).length();
        Arc::new(*p, pole).tangent(0.0) * (1.0 / height)
    }

    /// Integral of `f` over the triangle by the chosen quadrature.
    pub fn integrate<F>(&self, f: F, rule: Integrator) -> f64
    where
        F: Fn(&Point) -> f64,
    {
        self.integrate_dyn(&f, rule)
    }

    /// Non-generic core of [`Triangle::integrate`]. Recursing through a
    /// trait object (rather than a generic `F`) keeps the `Refinement`
    /// mutual recursion with [`TriangularMesh::integrate_dyn`] from
    /// growing a new monomorphized type at every level.
    pub(crate) fn integrate_dyn(&self, f: &dyn Fn(&Point) -> f64, rule: Integrator) -> f64 {
        match rule {
            Integrator::Centroid => f(&self.centroid()) * self.area(),
            Integrator::ThreeVertices => {
                (f(&self.a) + f(&self.b) + f(&self.c)) / 3.0 * self.area()
            }
            Integrator::Simpsons => {
                (f(&self.a) + f(&self.b) + f(&self.c) + 3.0 * f(&self.centroid())) / 6.0
                    * self.area()
            }
            Integrator::Refinement(levels) => {
                let mut mesh = TriangularMesh::from_triangle(*self);
                for _ in 0..levels {
                    mesh.refine();
                }
                mesh.integrate_dyn(f, Integrator::Centroid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::IsClose;

    fn octant() -> Triangle {
        Triangle::new(
            Point::from_cartesian(1., 0., 0.),
            Point::from_cartesian(0., 1., 0.),
            Point::from_cartesian(0., 0., 1.),
        )
    }

    #[test]
    fn test_octant_area() {
        // One eighth of the sphere.
        assert!(octant().area().is_close(&(PI / 2.)));
        assert_eq!(octant().orientation(), 1);
    }

    #[test]
    fn test_centroid_and_contains() {
        let t = octant();
        let c = t.centroid();
        assert!(t.contains(&c));
        assert!(t.contains(&t.a));
        assert!(!t.contains(&Point::from_cartesian(-1., 0., 0.)));
    }

    #[test]
    fn test_barycentric() {
        let t = octant();
        let w = t.barycentric(&t.a);
        assert!(w[0].is_close(&1.0) && w[1].abs() < 1e-12 && w[2].abs() < 1e-12);
        let w = t.barycentric(&t.centroid());
        assert!(w[0].is_close(&w[1]) && w[1].is_close(&w[2]));
    }

    #[test]
    fn test_basis_values() {
        let t = octant();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                let got = t.basis(i, t.vertex(j));
                assert!((got - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_basis_gradient_is_tangent() {
        let t = octant();
        for i in 0..3 {
            let g = t.basis_gradient(i);
            // Tangent vectors are orthogonal to the position.
            assert!(g.dot(&t.vertex(i).to_vector()).abs() < 1e-12);
        }
    }

    #[test]
    fn test_quadrature_rules_agree_on_constants() {
        let t = octant();
        let area = t.area();
        for rule in [
            Integrator::Centroid,
            Integrator::ThreeVertices,
            Integrator::Simpsons,
            Integrator::Refinement(2),
        ] {
            let integral = t.integrate(|_| 1.0, rule);
            assert!((integral - area).abs() < 1e-10);
        }
    }

    #[test]
    fn test_diameter() {
        // The octant triangle's circumcircle passes through all three
        // vertices; its apex is the centroid direction.
        let t = octant();
        let radius = t.diameter() / 2.;
        assert!(radius.is_close(&distance(&t.centroid(), &t.a)));
    }
}
