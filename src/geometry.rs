//! Geometry helpers for node placement and range checks.
//!
//! Contains:
//! - [`Point`], a 3D location in world units
//! - Euclidean and squared distances
//! - Toroidal (wrap-around) distance on a bounded XY plane
//! - Heading helpers used by movement code

use serde::{Deserialize, Serialize};

/// A location in world coordinates.
///
/// Most scenarios are planar and leave `z` at zero; distances are
/// nevertheless always computed in three dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0, z: 0.0 };

    /// A point on the XY plane.
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y, z: 0.0 }
    }

    pub fn with_z(x: f64, y: f64, z: f64) -> Self {
        Point { x, y, z }
    }

    /// Squared Euclidean distance (no sqrt, for comparisons).
    pub fn distance2(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Euclidean distance.
    pub fn distance(&self, other: &Point) -> f64 {
        self.distance2(other).sqrt()
    }

    /// Distance on a torus of the given XY dimensions.
    ///
    /// Each planar axis takes the shorter of the direct and the wrapped
    /// difference; `z` is never wrapped.
    pub fn toroidal_distance(&self, other: &Point, width: f64, height: f64) -> f64 {
        let dx = wrapped_delta(self.x - other.x, width);
        let dy = wrapped_delta(self.y - other.y, height);
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Heading (radians, XY plane) from `self` towards `target`.
    pub fn heading_to(&self, target: &Point) -> f64 {
        (target.y - self.y).atan2(target.x - self.x)
    }

    /// The point reached by travelling `distance` along `heading`.
    pub fn translated(&self, heading: f64, distance: f64) -> Point {
        Point {
            x: self.x + distance * heading.cos(),
            y: self.y + distance * heading.sin(),
            z: self.z,
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.z == 0.0 {
            write!(f, "({:.2}, {:.2})", self.x, self.y)
        } else {
            write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
        }
    }
}

/// Shortest signed difference along an axis that wraps every `span` units.
fn wrapped_delta(delta: f64, span: f64) -> f64 {
    let d = delta.abs() % span;
    d.min(span - d)
}
