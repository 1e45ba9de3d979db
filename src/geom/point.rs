use crate::Vector;
use crate::geom::{EPS, clamp_unit};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

/// A point on the unit sphere.
///
/// Both charts are stored coherently: the preimage `(p, a)` with polar
/// angle (colatitude) `p` in `[0, pi]` and azimuth `a` in `[-pi, pi)`,
/// and the image `(x, y, z)` with `x^2 + y^2 + z^2 = 1`.
///
/// The all-zero value is the invalid sentinel returned by operations with
/// no well-defined answer (e.g. the midpoint of antipodal points).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    p: f64,
    a: f64,
    x: f64,
    y: f64,
    z: f64,
}

/// Wraps an angle into `[-pi, pi)`.
fn wrap_azimuth(a: f64) -> f64 {
    (a + PI).rem_euclid(2.0 * PI) - PI
}

impl Point {
    /// Point from polar angle `p` and azimuth `a`, in radians. The
    /// azimuth is wrapped into `[-pi, pi)`.
    pub fn from_spherical(p: f64, a: f64) -> Self {
        let a = wrap_azimuth(a);
        let (x, y, z) = (p.sin() * a.cos(), p.sin() * a.sin(), p.cos());
        Self { p, a, x, y, z }
    }

    /// Point from Cartesian coordinates, normalized onto the sphere.
    ///
    /// Returns the invalid sentinel for a (near-)zero input.
    pub fn from_cartesian(x: f64, y: f64, z: f64) -> Self {
        match Vector::new(x, y, z).normalize() {
            Some(v) => Self::from_unit(v.dx, v.dy, v.dz),
            None => Self::invalid(),
        }
    }

    /// Point from a position vector, normalized onto the sphere.
    pub fn from_vector(v: &Vector) -> Self {
        Self::from_cartesian(v.dx, v.dy, v.dz)
    }

    fn from_unit(x: f64, y: f64, z: f64) -> Self {
        let p = clamp_unit(z).acos();
        let a = if x.abs() + y.abs() > EPS {
            wrap_azimuth(y.atan2(x))
        } else {
            0.0
        };
        Self { p, a, x, y, z }
    }

    /// The invalid sentinel.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Returns false for the invalid sentinel.
    pub fn is_valid(&self) -> bool {
        (self.x * self.x + self.y * self.y + self.z * self.z - 1.0).abs() < 1e-9
    }

    /// Polar angle (colatitude) in `[0, pi]`.
    pub fn p(&self) -> f64 {
        self.p
    }

    /// Azimuth in `[-pi, pi)`.
    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    /// The image as a position vector.
    pub fn to_vector(&self) -> Vector {
        Vector::new(self.x, self.y, self.z)
    }

    pub fn is_close(&self, other: &Self) -> bool {
        (self.x - other.x).abs() < EPS
            && (self.y - other.y).abs() < EPS
            && (self.z - other.z).abs() < EPS
    }

    pub fn is_antipodal_to(&self, other: &Self) -> bool {
        (self.x + other.x).abs() < EPS
            && (self.y + other.y).abs() < EPS
            && (self.z + other.z).abs() < EPS
    }

    /// Bearing of `other` as seen from this point.
    pub fn azimuth(&self, other: &Self) -> f64 {
        let t = (self.a - other.a).sin() * other.p.sin();
        let b = other.p.cos() * self.p.sin()
            - other.p.sin() * self.p.cos() * (self.a - other.a).cos();
        t.atan2(b)
    }

    /// Walks along the great circle tangent to `v` by arclength `|v|`.
    ///
    /// Returns the point unchanged when `v` has no tangential component.
    pub fn displace(&self, v: &Vector) -> Self {
        let len = v.length();
        if len < EPS {
            return *self;
        }
        // Project out the radial component, keep the tangent direction.
        let pos = self.to_vector();
        let tangent = *v - pos * v.dot(&pos);
        match tangent.normalize() {
            Some(t) => {
                let moved = pos * len.cos() + t * len.sin();
                Self::from_vector(&moved)
            }
            None => *self,
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = f.precision().unwrap_or(3);
        write!(
            f,
            "({:.digits$}, {:.digits$}, {:.digits$})",
            self.x, self.y, self.z
        )
    }
}

/// Geodesic distance between two points.
pub fn distance(a: &Point, b: &Point) -> f64 {
    clamp_unit(a.to_vector().dot(&b.to_vector())).acos()
}

/// Spherical angle at `b` of the triangle `a-b-c` (law of cosines).
///
/// Returns `pi/2` when either adjacent side is sub-epsilon.
pub fn angle(a: &Point, b: &Point, c: &Point) -> f64 {
    let bc = distance(b, c);
    let ca = distance(c, a);
    let ab = distance(a, b);
    if ab < EPS || bc < EPS {
        FRAC_PI_2
    } else {
        clamp_unit((ca.cos() - ab.cos() * bc.cos()) / (ab.sin() * bc.sin())).acos()
    }
}

/// Midpoint of the minor arc between two points.
///
/// Antipodal pairs have no unique midpoint; the invalid sentinel is
/// returned instead.
pub fn midpoint(a: &Point, b: &Point) -> Point {
    if a.is_antipodal_to(b) {
        return Point::invalid();
    }
    let chord = (a.to_vector() + b.to_vector()) * 0.5;
    Point::from_vector(&chord)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::IsClose;

    #[test]
    fn test_charts_coherent() {
        let pt = Point::from_spherical(PI / 3., PI / 4.);
        let rt = Point::from_cartesian(pt.x(), pt.y(), pt.z());
        assert!(pt.p().is_close(&rt.p()));
        assert!(pt.a().is_close(&rt.a()));
    }

    #[test]
    fn test_distance() {
        let px = Point::from_cartesian(1., 0., 0.);
        let pz = Point::from_cartesian(0., 0., 1.);
        assert!(distance(&px, &pz).is_close(&FRAC_PI_2));
        assert!(distance(&px, &px).abs() < EPS);
    }

    #[test]
    fn test_angle_octant() {
        // All three angles of the octant triangle are right angles.
        let px = Point::from_cartesian(1., 0., 0.);
        let py = Point::from_cartesian(0., 1., 0.);
        let pz = Point::from_cartesian(0., 0., 1.);
        assert!(angle(&px, &py, &pz).is_close(&FRAC_PI_2));
        assert!(angle(&py, &pz, &px).is_close(&FRAC_PI_2));
    }

    #[test]
    fn test_midpoint() {
        let px = Point::from_cartesian(1., 0., 0.);
        let py = Point::from_cartesian(0., 1., 0.);
        let mid = midpoint(&px, &py);
        let s = 0.5_f64.sqrt();
        assert!(mid.is_close(&Point::from_cartesian(s, s, 0.)));

        let antipode = Point::from_cartesian(-1., 0., 0.);
        assert!(!midpoint(&px, &antipode).is_valid());
    }

    #[test]
    fn test_displace() {
        let px = Point::from_cartesian(1., 0., 0.);
        let moved = px.displace(&Vector::new(0., FRAC_PI_2, 0.));
        assert!(moved.is_close(&Point::from_cartesian(0., 1., 0.)));
        // Radial displacement is a no-op.
        let stuck = px.displace(&Vector::new(0.5, 0., 0.));
        assert!(stuck.is_close(&px));
    }

    #[test]
    fn test_azimuth() {
        // Looking north from the equator.
        let eq = Point::from_spherical(FRAC_PI_2, 0.);
        let north = Point::from_spherical(0.25, 0.);
        assert!(eq.azimuth(&north).abs() < 1e-12);
    }
}
