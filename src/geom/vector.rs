use crate::Point;
use crate::geom::EPS;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// An ambient vector in R^3.
///
/// Carries tangents, gradients, and displacements. Unlike [`Point`] it
/// is not confined to the unit sphere and may have any length,
/// including zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// Chord vector from `beg` to `end` through the ambient space.
    pub fn from_points(beg: &Point, end: &Point) -> Self {
        end.to_vector() - beg.to_vector()
    }

    pub fn dot(&self, rhs: &Self) -> f64 {
        self.dx * rhs.dx + self.dy * rhs.dy + self.dz * rhs.dz
    }

    pub fn cross(&self, rhs: &Self) -> Self {
        Self::new(
            self.dy * rhs.dz - self.dz * rhs.dy,
            self.dz * rhs.dx - self.dx * rhs.dz,
            self.dx * rhs.dy - self.dy * rhs.dx,
        )
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// The unit vector in the same direction, or `None` when the length
    /// is below the geometric precision.
    pub fn normalize(&self) -> Option<Self> {
        let length = self.length();
        (length >= EPS).then(|| *self * (1.0 / length))
    }

    /// Componentwise comparison within the geometric precision.
    pub fn is_close(&self, rhs: &Self) -> bool {
        let worst = (self.dx - rhs.dx)
            .abs()
            .max((self.dy - rhs.dy).abs())
            .max((self.dz - rhs.dz).abs());
        worst < EPS
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = f.precision().unwrap_or(3);
        write!(
            f,
            "<{:.digits$}, {:.digits$}, {:.digits$}>",
            self.dx, self.dy, self.dz
        )
    }
}

impl Add for Vector {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.dx + rhs.dx, self.dy + rhs.dy, self.dz + rhs.dz)
    }
}

impl AddAssign for Vector {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for Vector {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.dx, -self.dy, -self.dz)
    }
}

impl Sub for Vector {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self + -rhs
    }
}

impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, factor: f64) -> Self {
        Self::new(self.dx * factor, self.dy * factor, self.dz * factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_follows_the_right_hand_rule() {
        let ex = Vector::new(1., 0., 0.);
        let ey = Vector::new(0., 1., 0.);
        let ez = Vector::new(0., 0., 1.);
        assert!(ex.cross(&ey).is_close(&ez));
        assert!(ey.cross(&ez).is_close(&ex));
        assert!(ez.cross(&ex).is_close(&ey));
        // Parallel vectors have a vanishing cross product.
        assert!(ex.cross(&ex).is_close(&Vector::default()));
    }

    #[test]
    fn test_dot_and_length() {
        let v = Vector::new(2., -3., 6.);
        assert_eq!(v.dot(&Vector::new(1., 1., 1.)), 5.);
        assert_eq!(v.length(), 7.);
    }

    #[test]
    fn test_normalize() {
        let unit = Vector::new(0., -5., 0.).normalize().unwrap();
        assert!(unit.is_close(&Vector::new(0., -1., 0.)));
        assert!(Vector::default().normalize().is_none());
    }

    #[test]
    fn test_operators() {
        let a = Vector::new(1., 2., 3.);
        let b = Vector::new(0.5, -2., 1.);
        assert!((a + b).is_close(&Vector::new(1.5, 0., 4.)));
        assert!((a - b).is_close(&Vector::new(0.5, 4., 2.)));
        assert!((-a).is_close(&(a * -1.)));
        let mut sum = a;
        sum += b;
        assert!(sum.is_close(&(a + b)));
    }

    #[test]
    fn test_from_points() {
        let beg = Point::from_cartesian(1., 0., 0.);
        let end = Point::from_cartesian(0., 0., 1.);
        assert!(Vector::from_points(&beg, &end).is_close(&Vector::new(-1., 0., 1.)));
    }
}
