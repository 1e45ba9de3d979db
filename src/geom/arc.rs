use crate::Point;
use crate::Vector;
use crate::geom::point::distance;
use crate::geom::{EPS, clamp_unit};
use std::f64::consts::FRAC_PI_2;

/// An oriented great-circle arc from `a` to `b` (the minor arc).
///
/// The pole is the unit normal of the carrying plane, oriented so that the
/// arc runs counter-clockwise around it. Arcs between identical or
/// antipodal endpoints are degenerate: their pole is the zero vector and
/// the rotation operations fall back to the identity.
#[derive(Debug, Clone, Copy)]
pub struct Arc {
    a: Point,
    b: Point,
    pole: Vector,
    length: f64,
}

impl Arc {
    pub fn new(a: Point, b: Point) -> Self {
        let pole = a
            .to_vector()
            .cross(&b.to_vector())
            .normalize()
            .unwrap_or_default();
        let length = distance(&a, &b);
        Self { a, b, pole, length }
    }

    /// Arc endpoints.
    pub fn start(&self) -> &Point {
        &self.a
    }

    pub fn end(&self) -> &Point {
        &self.b
    }

    /// Geodesic length of the arc.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Unit normal of the great-circle plane, zero when degenerate.
    pub fn pole(&self) -> Vector {
        self.pole
    }

    /// The pole as a point on the sphere, invalid when degenerate.
    pub fn pole_point(&self) -> Point {
        Point::from_vector(&self.pole)
    }

    pub fn is_degenerate(&self) -> bool {
        self.pole.length() < 0.5
    }

    /// Unit tangent of the arc at arclength `t` from the start.
    pub fn tangent(&self, t: f64) -> Vector {
        let u = self.pole.cross(&self.a.to_vector());
        self.a.to_vector() * (-t.sin()) + u * t.cos()
    }

    /// The point at arclength `u` from the start.
    pub fn local(&self, u: f64) -> Point {
        let dir = self.pole.cross(&self.a.to_vector());
        Point::from_vector(&(self.a.to_vector() * u.cos() + dir * u.sin()))
    }

    /// The point at arclength `u`, offset laterally by the signed angular
    /// width `w` towards the pole. Used to emit tube strips.
    pub fn local_offset(&self, u: f64, w: f64) -> Point {
        let on_arc = self.local(u).to_vector();
        Point::from_vector(&(on_arc * w.cos() + self.pole * w.sin()))
    }

    /// Midpoint of the arc.
    pub fn midpoint(&self) -> Point {
        self.local(self.length / 2.0)
    }

    /// Signed angular distance from `p` to the great circle carrying the
    /// arc: positive on the pole side, zero on the circle.
    pub fn distance(&self, p: &Point) -> f64 {
        FRAC_PI_2 - clamp_unit(self.pole.dot(&p.to_vector())).acos()
    }

    /// Whether `p` lies on the closed pole-side hemisphere of the arc's
    /// great circle. Triangle containment tests one arc per side.
    pub fn encloses(&self, p: &Point) -> bool {
        self.distance(p) >= -EPS
    }

    /// Rotates `v` about the arc's pole by the arc length (Rodrigues).
    ///
    /// This is the parallel transport of a tangent vector from the start
    /// of the arc to its end. Degenerate arcs rotate by the identity.
    pub fn rotate(&self, v: &Vector) -> Vector {
        if self.is_degenerate() {
            return *v;
        }
        let k = self.pole;
        let (sin, cos) = self.length.sin_cos();
        *v * cos + k.cross(v) * sin + k * (k.dot(v) * (1.0 - cos))
    }
}

/// Parallel transport of `v` along the arc from one point to another.
///
/// Identity when the endpoints coincide or are antipodal.
pub fn transport(from: &Point, to: &Point, v: &Vector) -> Vector {
    Arc::new(*from, *to).rotate(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::IsClose;
    use std::f64::consts::FRAC_PI_2;

    fn px() -> Point {
        Point::from_cartesian(1., 0., 0.)
    }

    fn py() -> Point {
        Point::from_cartesian(0., 1., 0.)
    }

    fn pz() -> Point {
        Point::from_cartesian(0., 0., 1.)
    }

    #[test]
    fn test_pole_and_length() {
        let arc = Arc::new(px(), py());
        assert!(arc.pole().is_close(&Vector::new(0., 0., 1.)));
        assert!(arc.length().is_close(&FRAC_PI_2));
        assert!(!arc.is_degenerate());
        assert!(Arc::new(px(), px()).is_degenerate());
    }

    #[test]
    fn test_local_walks_the_arc() {
        let arc = Arc::new(px(), py());
        assert!(arc.local(0.).is_close(&px()));
        assert!(arc.local(FRAC_PI_2).is_close(&py()));
        let mid = arc.midpoint();
        let s = 0.5_f64.sqrt();
        assert!(mid.is_close(&Point::from_cartesian(s, s, 0.)));
    }

    #[test]
    fn test_tangent() {
        let arc = Arc::new(px(), py());
        assert!(arc.tangent(0.).is_close(&Vector::new(0., 1., 0.)));
        assert!(arc.tangent(FRAC_PI_2).is_close(&Vector::new(-1., 0., 0.)));
    }

    #[test]
    fn test_signed_distance() {
        let arc = Arc::new(px(), py());
        // The pole (north pole here) is at distance pi/2.
        assert!(arc.distance(&pz()).is_close(&FRAC_PI_2));
        // Points on the great circle are at distance zero.
        assert!(arc.distance(&arc.midpoint()).abs() < 1e-12);
        // The south pole is on the far side.
        let south = Point::from_cartesian(0., 0., -1.);
        assert!(arc.distance(&south).is_close(&(-FRAC_PI_2)));
        assert!(arc.encloses(&pz()));
        assert!(!arc.encloses(&south));
    }

    #[test]
    fn test_local_offset() {
        let arc = Arc::new(px(), py());
        let off = arc.local_offset(0., 0.25);
        assert!(distance(&px(), &off).is_close(&0.25));
        assert!(arc.distance(&off).is_close(&0.25));
    }

    #[test]
    fn test_transport() {
        // Transport the tangent pointing at the north pole from +x to +y:
        // it still points at the north pole.
        let v = Vector::new(0., 0., 1.);
        let t = transport(&px(), &py(), &v);
        assert!(t.is_close(&Vector::new(0., 0., 1.)));
        // Transport a vector along the arc direction keeps it along it.
        let t = transport(&px(), &py(), &Vector::new(0., 1., 0.));
        assert!(t.is_close(&Vector::new(-1., 0., 0.)));
        // Antipodal transport is the identity.
        let anti = Point::from_cartesian(-1., 0., 0.);
        let t = transport(&px(), &anti, &Vector::new(0., 1., 0.));
        assert!(t.is_close(&Vector::new(0., 1., 0.)));
    }

    #[test]
    fn test_rotate_preserves_length() {
        let arc = Arc::new(px(), Point::from_spherical(1.0, 2.0));
        let v = Vector::new(0.3, -0.4, 0.5);
        let r = arc.rotate(&v);
        assert!(r.length().is_close(&v.length()));
    }
}
